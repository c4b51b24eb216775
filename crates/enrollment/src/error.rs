use database::DbError;
use thiserror::Error;

/// Why a single course id could not be added in a batch.
#[derive(Error, Debug)]
pub enum FailureReason {
    #[error("course not found")]
    CourseNotFound,

    #[error("person not found")]
    PersonNotFound,

    #[error(transparent)]
    Store(DbError),
}

#[derive(Error, Debug)]
#[error("failed to add course {course_id}: {reason}")]
pub struct EnrollmentFailure {
    pub course_id: i32,
    pub reason: FailureReason,
}

/// Every per-course failure of one batch enrollment.
///
/// Courses that are not listed here were enrolled successfully and stay
/// enrolled.
#[derive(Error, Debug)]
#[error("failed to add some courses: [{}]", join_failures(.failures))]
pub struct BatchEnrollError {
    pub failures: Vec<EnrollmentFailure>,
}

impl BatchEnrollError {
    pub fn failed_course_ids(&self) -> Vec<i32> {
        self.failures.iter().map(|f| f.course_id).collect()
    }
}

fn join_failures(failures: &[EnrollmentFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Error, Debug)]
pub enum EnrollmentError {
    #[error("person '{0}' not found")]
    PersonNotFound(String),

    #[error("failed to look up person: {0}")]
    Lookup(#[source] DbError),

    #[error("failed to update person: {0}")]
    Update(#[source] DbError),

    #[error("failed to update courses: {0}")]
    Enrollment(#[from] BatchEnrollError),

    #[error("failed to remove enrollments: {0}")]
    Cascade(#[source] DbError),

    #[error(transparent)]
    Store(#[from] DbError),
}
