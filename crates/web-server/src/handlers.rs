use crate::{error::AppError, AppState};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use core_types::{Course, Person, PersonFields, PersonFilter};
use database::{CourseStore, PersonStore};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct CoursePayload {
    pub name: String,
}

/// Request body for creating or updating a person.
#[derive(Debug, Deserialize)]
pub struct PersonPayload {
    #[serde(flatten)]
    pub fields: PersonFields,
    #[serde(default)]
    pub courses: Vec<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentPayload {
    pub person_id: i32,
    pub course_ids: Vec<i32>,
}

/// Query parameters are kept as strings so a malformed age is a 400 with our
/// own error body.
#[derive(Debug, Default, Deserialize)]
pub struct PeopleQuery {
    #[serde(default)]
    name: String,
    #[serde(default)]
    age: String,
}

fn require_course_name(payload: &CoursePayload) -> Result<(), AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("Course name is required".to_string()));
    }
    Ok(())
}

fn parse_id(raw: &str) -> Result<i32, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid id '{raw}'")))
}

// ==============================================================================
// Courses
// ==============================================================================

/// # GET /api/course
pub async fn get_courses(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Course>>, AppError> {
    let courses = state.store.list_courses().await?;
    Ok(Json(courses))
}

/// # GET /api/course/:id
pub async fn get_course(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Course>, AppError> {
    let id = parse_id(&id)?;
    let course = state
        .store
        .find_course(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Course {id} not found")))?;
    Ok(Json(course))
}

/// # POST /api/course
pub async fn create_course(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CoursePayload>,
) -> Result<(StatusCode, Json<Course>), AppError> {
    require_course_name(&payload)?;
    let course = state.store.create_course(&payload.name).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

/// # PUT /api/course/:id
pub async fn update_course(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CoursePayload>,
) -> Result<Json<Course>, AppError> {
    let id = parse_id(&id)?;
    require_course_name(&payload)?;
    let course = state
        .store
        .update_course(id, &payload.name)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Course {id} not found")))?;
    Ok(Json(course))
}

/// # DELETE /api/course/:id
/// Fails with 409 while people are still enrolled in the course.
pub async fn delete_course(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;
    if !state.store.delete_course(id).await? {
        return Err(AppError::NotFound(format!("Course {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ==============================================================================
// People
// ==============================================================================

/// # GET /api/person?name=&age=
/// Both filters are optional; an empty name or an age of 0 matches everyone.
pub async fn get_people(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PeopleQuery>,
) -> Result<Json<Vec<Person>>, AppError> {
    let age = if query.age.is_empty() {
        0
    } else {
        query
            .age
            .parse()
            .map_err(|_| AppError::BadRequest(format!("Invalid age '{}'", query.age)))?
    };
    let people = state
        .store
        .find_all_people(&PersonFilter::new(&query.name, age))
        .await?;
    Ok(Json(people))
}

/// # GET /api/person/:name
pub async fn get_person(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Person>, AppError> {
    let person = state
        .store
        .find_person_by_name(&name)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Person '{name}' not found")))?;
    Ok(Json(person))
}

/// # POST /api/person
pub async fn create_person(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PersonPayload>,
) -> Result<(StatusCode, Json<Person>), AppError> {
    payload.fields.validate()?;
    let person = state
        .enrollment
        .create_person_with_enrollments(&payload.fields, &payload.courses)
        .await?;
    tracing::info!(person_id = person.id, "Person created.");
    Ok((StatusCode::CREATED, Json(person)))
}

/// # PUT /api/person/:name
/// Courses in the body are added to the person's enrollments; none are removed.
pub async fn update_person(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PersonPayload>,
) -> Result<Json<Person>, AppError> {
    payload.fields.validate()?;
    let person = state
        .enrollment
        .update_person_with_enrollments(&name, &payload.fields, &payload.courses)
        .await?;
    Ok(Json(person))
}

/// # DELETE /api/person/:name
pub async fn delete_person(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, AppError> {
    state.enrollment.delete_person_cascade(&name).await?;
    tracing::info!(%name, "Person deleted.");
    Ok(StatusCode::NO_CONTENT)
}

// ==============================================================================
// Enrollments
// ==============================================================================

/// # POST /api/enrollments
/// Enrolls an existing person in a batch of courses. Valid courses are kept
/// even when others fail; the failures come back as a 422.
pub async fn enroll(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EnrollmentPayload>,
) -> Result<StatusCode, AppError> {
    state
        .enrollment
        .batch_enroll(payload.person_id, &payload.course_ids)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
