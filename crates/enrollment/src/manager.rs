use crate::error::{BatchEnrollError, EnrollmentError, EnrollmentFailure, FailureReason};
use core_types::{Person, PersonFields};
use database::{CourseStore, EntityStore, PersonStore};
use std::sync::Arc;

/// Orchestrates the multi-row mutations spanning `person`, `course` and
/// `person_course`.
///
/// The store handle is injected; the manager holds no other state.
pub struct EnrollmentManager<S: EntityStore + ?Sized> {
    store: Arc<S>,
}

impl<S: EntityStore + ?Sized> Clone for EnrollmentManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: EntityStore + ?Sized> EnrollmentManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Creates a person and enrolls them in `course_ids`, all or nothing.
    ///
    /// The returned person carries the generated id and `course_ids` as given;
    /// the join table is not re-read. Callers validate the fields beforehand.
    #[tracing::instrument(level = "debug", skip(self, fields), fields(first_name = %fields.first_name))]
    pub async fn create_person_with_enrollments(
        &self,
        fields: &PersonFields,
        course_ids: &[i32],
    ) -> Result<Person, EnrollmentError> {
        let id = self
            .store
            .insert_person_with_enrollments(fields, course_ids)
            .await?;
        tracing::debug!(person_id = id, "Person created.");
        Ok(Person::from_fields(id, fields.clone(), course_ids.to_vec()))
    }

    /// Enrolls an existing person in each of `course_ids`, independently.
    ///
    /// A failing item is recorded and the rest are still processed; successful
    /// enrollments are kept even when the batch as a whole reports an error.
    /// Enrolling in a course the person already has is a no-op.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn batch_enroll(
        &self,
        person_id: i32,
        course_ids: &[i32],
    ) -> Result<(), BatchEnrollError> {
        let mut failures = Vec::new();

        for &course_id in course_ids {
            if let Err(reason) = self.enroll_one(person_id, course_id).await {
                tracing::debug!(course_id, %reason, "Enrollment item failed.");
                failures.push(EnrollmentFailure { course_id, reason });
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(BatchEnrollError { failures })
        }
    }

    async fn enroll_one(&self, person_id: i32, course_id: i32) -> Result<(), FailureReason> {
        match self.store.course_exists(course_id).await {
            Ok(true) => {}
            Ok(false) => return Err(FailureReason::CourseNotFound),
            Err(e) => return Err(FailureReason::Store(e)),
        }
        match self.store.person_exists(person_id).await {
            Ok(true) => {}
            Ok(false) => return Err(FailureReason::PersonNotFound),
            Err(e) => return Err(FailureReason::Store(e)),
        }
        self.store
            .insert_enrollment(person_id, course_id)
            .await
            .map_err(FailureReason::Store)
    }

    /// Overwrites the person currently named `name`, then adds `course_ids`.
    ///
    /// Existing enrollments are never removed. The returned person is re-read
    /// after both steps, so its `courses` reflect the join table.
    #[tracing::instrument(level = "debug", skip(self, fields))]
    pub async fn update_person_with_enrollments(
        &self,
        name: &str,
        fields: &PersonFields,
        course_ids: &[i32],
    ) -> Result<Person, EnrollmentError> {
        let id = self.resolve_person_id(name).await?;

        let updated = self
            .store
            .update_person(id, fields)
            .await
            .map_err(EnrollmentError::Update)?;
        if !updated {
            return Err(EnrollmentError::PersonNotFound(name.to_string()));
        }

        if !course_ids.is_empty() {
            self.batch_enroll(id, course_ids).await?;
        }

        self.store
            .find_person(id)
            .await?
            .ok_or_else(|| EnrollmentError::PersonNotFound(fields.first_name.clone()))
    }

    /// Deletes the person named `name` and every association row of theirs.
    ///
    /// Associations go first. If removing them fails the person row is left
    /// untouched.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn delete_person_cascade(&self, name: &str) -> Result<(), EnrollmentError> {
        let id = self.resolve_person_id(name).await?;

        let removed = self
            .store
            .delete_enrollments_for_person(id)
            .await
            .map_err(EnrollmentError::Cascade)?;
        tracing::debug!(person_id = id, removed, "Enrollments removed.");

        if !self.store.delete_person(id).await? {
            return Err(EnrollmentError::PersonNotFound(name.to_string()));
        }
        Ok(())
    }

    async fn resolve_person_id(&self, name: &str) -> Result<i32, EnrollmentError> {
        self.store
            .find_person_id_by_name(name)
            .await
            .map_err(EnrollmentError::Lookup)?
            .ok_or_else(|| EnrollmentError::PersonNotFound(name.to_string()))
    }
}
