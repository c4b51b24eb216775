use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use database::DbError;
use enrollment::{BatchEnrollError, EnrollmentError};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),
    #[error("Enrollment error: {0}")]
    Enrollment(#[from] EnrollmentError),
    #[error("Validation error: {0}")]
    Validation(#[from] core_types::CoreError),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<BatchEnrollError> for AppError {
    fn from(err: BatchEnrollError) -> Self {
        AppError::Enrollment(EnrollmentError::Enrollment(err))
    }
}

fn internal(error: &dyn std::error::Error, message: &str) -> (StatusCode, String) {
    tracing::error!(error = %error, "{message}");
    (StatusCode::INTERNAL_SERVER_ERROR, message.to_string())
}

fn database_response(db_err: DbError) -> Response {
    let (status, message) = match &db_err {
        DbError::ConstraintViolation(detail) => (StatusCode::CONFLICT, detail.clone()),
        _ => internal(&db_err, "An internal database error occurred"),
    };
    (status, Json(json!({ "error": message }))).into_response()
}

fn partial_enrollment_response(batch: &BatchEnrollError) -> Response {
    let failures: Vec<_> = batch
        .failures
        .iter()
        .map(|f| json!({ "courseId": f.course_id, "reason": f.reason.to_string() }))
        .collect();
    let body = Json(json!({ "error": batch.to_string(), "failures": failures }));
    (StatusCode::UNPROCESSABLE_ENTITY, body).into_response()
}

/// Converts our custom `AppError` into an HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Database(db_err) => return database_response(db_err),
            AppError::Enrollment(err) => match err {
                EnrollmentError::PersonNotFound(name) => {
                    (StatusCode::NOT_FOUND, format!("Person '{name}' not found"))
                }
                EnrollmentError::Enrollment(batch) => return partial_enrollment_response(&batch),
                EnrollmentError::Store(db_err) => return database_response(db_err),
                other => internal(&other, "Failed to apply person changes"),
            },
            AppError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, message),
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
