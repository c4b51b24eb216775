//! The entity-store boundary.
//!
//! The enrollment layer and the HTTP handlers only ever talk to these traits,
//! so the PostgreSQL repository and the in-memory store are interchangeable.
//! Every method maps to one statement (or one transaction, where noted) and
//! surfaces store errors unchanged; nothing here retries.

use crate::DbError;
use async_trait::async_trait;
use core_types::{Course, Person, PersonFields, PersonFilter};

/// Single-table access to `course`.
#[async_trait]
pub trait CourseStore: Send + Sync {
    async fn list_courses(&self) -> Result<Vec<Course>, DbError>;

    async fn find_course(&self, id: i32) -> Result<Option<Course>, DbError>;

    /// Confirms a course row exists without loading it.
    async fn course_exists(&self, id: i32) -> Result<bool, DbError>;

    /// Inserts a course and returns it with its generated id.
    async fn create_course(&self, name: &str) -> Result<Course, DbError>;

    /// Renames a course. Returns `None` when no row has this id.
    async fn update_course(&self, id: i32, name: &str) -> Result<Option<Course>, DbError>;

    /// Deletes a course. Returns `false` when no row has this id.
    ///
    /// Enrollments are not cascaded; a course that still has enrollments
    /// fails with [`DbError::ConstraintViolation`].
    async fn delete_course(&self, id: i32) -> Result<bool, DbError>;
}

/// Access to `person` and its `person_course` association rows.
#[async_trait]
pub trait PersonStore: Send + Sync {
    /// Lists people matching `filter`, each with its enrolled course ids.
    async fn find_all_people(&self, filter: &PersonFilter) -> Result<Vec<Person>, DbError>;

    async fn find_person(&self, id: i32) -> Result<Option<Person>, DbError>;

    /// Looks a person up by first name. `Ok(None)` means no such row.
    async fn find_person_by_name(&self, name: &str) -> Result<Option<Person>, DbError>;

    async fn find_person_id_by_name(&self, name: &str) -> Result<Option<i32>, DbError>;

    async fn person_exists(&self, id: i32) -> Result<bool, DbError>;

    /// Course ids with an association row for this person, ordered by course id.
    async fn course_ids_for_person(&self, person_id: i32) -> Result<Vec<i32>, DbError>;

    /// Inserts the person and one association row per course id inside a
    /// single transaction, returning the generated person id.
    ///
    /// If any insert fails nothing is persisted.
    async fn insert_person_with_enrollments(
        &self,
        fields: &PersonFields,
        course_ids: &[i32],
    ) -> Result<i32, DbError>;

    /// Overwrites the mutable columns. Returns `false` when no row has this id.
    async fn update_person(&self, id: i32, fields: &PersonFields) -> Result<bool, DbError>;

    /// Inserts an association row. An existing pair is left untouched and is
    /// not an error.
    async fn insert_enrollment(&self, person_id: i32, course_id: i32) -> Result<(), DbError>;

    /// Removes every association row of a person, returning how many went.
    async fn delete_enrollments_for_person(&self, person_id: i32) -> Result<u64, DbError>;

    /// Deletes the person row. Returns `false` when no row has this id.
    async fn delete_person(&self, id: i32) -> Result<bool, DbError>;
}

/// Everything the service needs from the store.
pub trait EntityStore: CourseStore + PersonStore {}

impl<T: CourseStore + PersonStore> EntityStore for T {}
