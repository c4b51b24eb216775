//! In-process implementation of the store traits.
//!
//! Mirrors the key rules of the PostgreSQL schema: generated ids, the
//! `(person_id, course_id)` primary key with insert-or-ignore, and foreign keys
//! from `person_course` to both parent tables. Individual operations can be
//! made to fail with [`MemoryStore::fail_on`] to exercise error paths.

use crate::store::{CourseStore, PersonStore};
use crate::DbError;
use async_trait::async_trait;
use core_types::{Course, Person, PersonFields, PersonFilter};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Store operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    CourseExists,
    PersonExists,
    FindPerson,
    FindPersonIdByName,
    InsertPerson,
    InsertEnrollment,
    UpdatePerson,
    DeleteEnrollments,
    DeletePerson,
    ListPeople,
}

#[derive(Debug, Default)]
struct Tables {
    courses: BTreeMap<i32, String>,
    people: BTreeMap<i32, PersonFields>,
    enrollments: BTreeSet<(i32, i32)>,
    last_course_id: i32,
    last_person_id: i32,
    failing: HashSet<StoreOp>,
}

impl Tables {
    fn check(&self, op: StoreOp) -> Result<(), DbError> {
        if self.failing.contains(&op) {
            tracing::debug!(?op, "Injected store failure.");
            return Err(DbError::QueryError(sqlx::Error::PoolClosed));
        }
        Ok(())
    }

    fn course_ids_for(&self, person_id: i32) -> Vec<i32> {
        self.enrollments
            .range((person_id, i32::MIN)..=(person_id, i32::MAX))
            .map(|&(_, course_id)| course_id)
            .collect()
    }

    fn person(&self, id: i32) -> Option<Person> {
        self.people
            .get(&id)
            .map(|fields| Person::from_fields(id, fields.clone(), self.course_ids_for(id)))
    }

    fn id_by_name(&self, name: &str) -> Option<i32> {
        self.people
            .iter()
            .find(|(_, fields)| fields.first_name == name)
            .map(|(id, _)| *id)
    }

    fn check_foreign_keys(&self, person_id: i32, course_id: i32) -> Result<(), DbError> {
        if !self.people.contains_key(&person_id) {
            return Err(DbError::ConstraintViolation(format!(
                "person_course.person_id {person_id} references a missing person"
            )));
        }
        if !self.courses.contains_key(&course_id) {
            return Err(DbError::ConstraintViolation(format!(
                "person_course.course_id {course_id} references a missing course"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later call of `op` fail with a connection-style error.
    pub fn fail_on(&self, op: StoreOp) {
        self.tables().failing.insert(op);
    }

    pub fn clear_failures(&self) {
        self.tables().failing.clear();
    }

    /// A snapshot of the association table.
    pub fn enrollment_rows(&self) -> Vec<(i32, i32)> {
        self.tables().enrollments.iter().copied().collect()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CourseStore for MemoryStore {
    async fn list_courses(&self) -> Result<Vec<Course>, DbError> {
        let tables = self.tables();
        Ok(tables
            .courses
            .iter()
            .map(|(id, name)| Course {
                id: *id,
                name: name.clone(),
            })
            .collect())
    }

    async fn find_course(&self, id: i32) -> Result<Option<Course>, DbError> {
        let tables = self.tables();
        Ok(tables.courses.get(&id).map(|name| Course {
            id,
            name: name.clone(),
        }))
    }

    async fn course_exists(&self, id: i32) -> Result<bool, DbError> {
        let tables = self.tables();
        tables.check(StoreOp::CourseExists)?;
        Ok(tables.courses.contains_key(&id))
    }

    async fn create_course(&self, name: &str) -> Result<Course, DbError> {
        let mut tables = self.tables();
        tables.last_course_id += 1;
        let id = tables.last_course_id;
        tables.courses.insert(id, name.to_string());
        Ok(Course {
            id,
            name: name.to_string(),
        })
    }

    async fn update_course(&self, id: i32, name: &str) -> Result<Option<Course>, DbError> {
        let mut tables = self.tables();
        Ok(tables.courses.get_mut(&id).map(|stored| {
            *stored = name.to_string();
            Course {
                id,
                name: name.to_string(),
            }
        }))
    }

    async fn delete_course(&self, id: i32) -> Result<bool, DbError> {
        let mut tables = self.tables();
        if tables.enrollments.iter().any(|&(_, course_id)| course_id == id) {
            return Err(DbError::ConstraintViolation(format!(
                "course {id} is still referenced by person_course"
            )));
        }
        Ok(tables.courses.remove(&id).is_some())
    }
}

#[async_trait]
impl PersonStore for MemoryStore {
    async fn find_all_people(&self, filter: &PersonFilter) -> Result<Vec<Person>, DbError> {
        let tables = self.tables();
        tables.check(StoreOp::ListPeople)?;
        Ok(tables
            .people
            .iter()
            .filter(|(_, fields)| filter.matches(fields))
            .filter_map(|(id, _)| tables.person(*id))
            .collect())
    }

    async fn find_person(&self, id: i32) -> Result<Option<Person>, DbError> {
        let tables = self.tables();
        tables.check(StoreOp::FindPerson)?;
        Ok(tables.person(id))
    }

    async fn find_person_by_name(&self, name: &str) -> Result<Option<Person>, DbError> {
        let tables = self.tables();
        tables.check(StoreOp::FindPerson)?;
        Ok(tables.id_by_name(name).and_then(|id| tables.person(id)))
    }

    async fn find_person_id_by_name(&self, name: &str) -> Result<Option<i32>, DbError> {
        let tables = self.tables();
        tables.check(StoreOp::FindPersonIdByName)?;
        Ok(tables.id_by_name(name))
    }

    async fn person_exists(&self, id: i32) -> Result<bool, DbError> {
        let tables = self.tables();
        tables.check(StoreOp::PersonExists)?;
        Ok(tables.people.contains_key(&id))
    }

    async fn course_ids_for_person(&self, person_id: i32) -> Result<Vec<i32>, DbError> {
        Ok(self.tables().course_ids_for(person_id))
    }

    async fn insert_person_with_enrollments(
        &self,
        fields: &PersonFields,
        course_ids: &[i32],
    ) -> Result<i32, DbError> {
        let mut tables = self.tables();
        tables.check(StoreOp::InsertPerson)?;

        // The id is consumed even when the insert is rolled back, like a sequence.
        tables.last_person_id += 1;
        let person_id = tables.last_person_id;
        tables.people.insert(person_id, fields.clone());

        for &course_id in course_ids {
            let inserted = tables
                .check(StoreOp::InsertEnrollment)
                .and_then(|()| tables.check_foreign_keys(person_id, course_id));
            if let Err(err) = inserted {
                tables.enrollments.retain(|&(owner, _)| owner != person_id);
                tables.people.remove(&person_id);
                tracing::debug!(person_id, course_id, "Person insert rolled back.");
                return Err(err);
            }
            tables.enrollments.insert((person_id, course_id));
        }
        Ok(person_id)
    }

    async fn update_person(&self, id: i32, fields: &PersonFields) -> Result<bool, DbError> {
        let mut tables = self.tables();
        tables.check(StoreOp::UpdatePerson)?;
        Ok(match tables.people.get_mut(&id) {
            Some(stored) => {
                *stored = fields.clone();
                true
            }
            None => false,
        })
    }

    async fn insert_enrollment(&self, person_id: i32, course_id: i32) -> Result<(), DbError> {
        let mut tables = self.tables();
        tables.check(StoreOp::InsertEnrollment)?;
        tables.check_foreign_keys(person_id, course_id)?;
        tables.enrollments.insert((person_id, course_id));
        Ok(())
    }

    async fn delete_enrollments_for_person(&self, person_id: i32) -> Result<u64, DbError> {
        let mut tables = self.tables();
        tables.check(StoreOp::DeleteEnrollments)?;
        let before = tables.enrollments.len();
        tables.enrollments.retain(|&(owner, _)| owner != person_id);
        Ok((before - tables.enrollments.len()) as u64)
    }

    async fn delete_person(&self, id: i32) -> Result<bool, DbError> {
        let mut tables = self.tables();
        tables.check(StoreOp::DeletePerson)?;
        if !tables.course_ids_for(id).is_empty() {
            return Err(DbError::ConstraintViolation(format!(
                "person {id} is still referenced by person_course"
            )));
        }
        Ok(tables.people.remove(&id).is_some())
    }
}
