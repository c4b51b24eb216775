use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use database::{CourseStore, EntityStore, MemoryStore, StoreOp};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use web_server::{build_router, AppState};

fn app() -> (Arc<MemoryStore>, Router) {
    let store = Arc::new(MemoryStore::new());
    let shared: Arc<dyn EntityStore> = store.clone();
    (store, build_router(AppState::new(shared)))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, value)
}

fn john(courses: Value) -> Value {
    json!({
        "firstName": "John",
        "lastName": "Doe",
        "type": "student",
        "age": 20,
        "courses": courses,
    })
}

#[tokio::test]
async fn health_check_responds() {
    let (_, app) = app();
    let (status, body) = send(&app, "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".to_string()));
}

#[tokio::test]
async fn course_crud_round_trip() {
    let (_, app) = app();

    let (status, created) =
        send(&app, "POST", "/api/course", Some(json!({ "name": "Math" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created, json!({ "id": 1, "name": "Math" }));

    let (status, renamed) =
        send(&app, "PUT", "/api/course/1", Some(json!({ "name": "Algebra" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["name"], "Algebra");

    let (status, listed) = send(&app, "GET", "/api/course", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed, json!([{ "id": 1, "name": "Algebra" }]));

    let (status, _) = send(&app, "DELETE", "/api/course/1", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "GET", "/api/course/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Course 1 not found");
}

#[tokio::test]
async fn malformed_course_id_is_a_bad_request() {
    let (_, app) = app();
    let (status, body) = send(&app, "GET", "/api/course/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid id 'abc'");
}

#[tokio::test]
async fn enrolled_course_cannot_be_deleted() {
    let (store, app) = app();
    let math = store.create_course("Math").await.unwrap();
    send(&app, "POST", "/api/person", Some(john(json!([math.id])))).await;

    let (status, _) = send(&app, "DELETE", &format!("/api/course/{}", math.id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn create_then_delete_john_doe() {
    let (store, app) = app();
    store.create_course("Math").await.unwrap();

    let (status, created) = send(&app, "POST", "/api/person", Some(john(json!([1])))).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().unwrap();
    assert!(id > 0);
    assert_eq!(created["courses"], json!([1]));
    assert_eq!(created["type"], "student");

    let (status, fetched) = send(&app, "GET", "/api/person/John", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);

    let (status, _) = send(&app, "DELETE", "/api/person/John", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, everyone) = send(&app, "GET", "/api/person", None).await;
    assert_eq!(everyone, json!([]));
    assert!(store
        .enrollment_rows()
        .iter()
        .all(|&(person_id, _)| i64::from(person_id) != id));

    let (status, _) = send(&app, "GET", "/api/person/John", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_requires_names() {
    let (_, app) = app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/person",
        Some(json!({ "firstName": "", "lastName": "Doe" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("firstName"));
}

#[tokio::test]
async fn missing_names_are_a_bad_request() {
    let (_, app) = app();
    let (status, body) =
        send(&app, "POST", "/api/person", Some(json!({ "lastName": "Doe" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid input for firstName: must not be empty");

    send(&app, "POST", "/api/person", Some(john(json!([])))).await;
    let (status, body) =
        send(&app, "PUT", "/api/person/John", Some(json!({ "firstName": "John" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("lastName"));
}

#[tokio::test]
async fn course_rename_requires_a_name() {
    let (store, app) = app();
    let math = store.create_course("Math").await.unwrap();

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/course/{}", math.id),
        Some(json!({ "name": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Course name is required");

    let (_, unchanged) = send(&app, "GET", &format!("/api/course/{}", math.id), None).await;
    assert_eq!(unchanged["name"], "Math");
}

#[tokio::test]
async fn create_with_unknown_course_creates_nobody() {
    let (store, app) = app();
    store.create_course("Math").await.unwrap();

    let (status, _) = send(&app, "POST", "/api/person", Some(john(json!([1, 2])))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, "GET", "/api/person/John", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(store.enrollment_rows().is_empty());
}

#[tokio::test]
async fn people_are_filtered_by_query() {
    let (_, app) = app();
    send(&app, "POST", "/api/person", Some(john(json!([])))).await;
    send(
        &app,
        "POST",
        "/api/person",
        Some(json!({ "firstName": "Jane", "lastName": "Roe", "type": "professor", "age": 30 })),
    )
    .await;

    let (_, all) = send(&app, "GET", "/api/person", None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (_, janes) = send(&app, "GET", "/api/person?name=Jane", None).await;
    assert_eq!(janes.as_array().unwrap().len(), 1);
    assert_eq!(janes[0]["firstName"], "Jane");

    let (_, thirty) = send(&app, "GET", "/api/person?age=30", None).await;
    assert_eq!(thirty.as_array().unwrap().len(), 1);
    assert_eq!(thirty[0]["age"], 30);

    let (_, nobody) = send(&app, "GET", "/api/person?name=John&age=30", None).await;
    assert_eq!(nobody, json!([]));

    let (status, _) = send(&app, "GET", "/api/person?age=old", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_adds_courses_and_renames() {
    let (store, app) = app();
    store.create_course("Math").await.unwrap();
    store.create_course("Science").await.unwrap();
    send(&app, "POST", "/api/person", Some(john(json!([1])))).await;

    let mut body = john(json!([2]));
    body["age"] = json!(21);
    let (status, updated) = send(&app, "PUT", "/api/person/John", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["age"], 21);
    assert_eq!(updated["courses"], json!([1, 2]));
}

#[tokio::test]
async fn update_of_unknown_person_is_not_found() {
    let (_, app) = app();
    let (status, body) = send(&app, "PUT", "/api/person/Ghost", Some(john(json!([])))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Person 'Ghost' not found");
}

#[tokio::test]
async fn batch_enrollment_reports_partial_failure() {
    let (store, app) = app();
    store.create_course("Math").await.unwrap();
    let (_, created) = send(&app, "POST", "/api/person", Some(john(json!([])))).await;
    let person_id = created["id"].clone();

    let (status, body) = send(
        &app,
        "POST",
        "/api/enrollments",
        Some(json!({ "personId": person_id, "courseIds": [1, 9] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["failures"],
        json!([{ "courseId": 9, "reason": "course not found" }])
    );
    assert!(body["error"].as_str().unwrap().contains("course 9"));

    let (_, john) = send(&app, "GET", "/api/person/John", None).await;
    assert_eq!(john["courses"], json!([1]));

    let (status, _) = send(
        &app,
        "POST",
        "/api/enrollments",
        Some(json!({ "personId": person_id, "courseIds": [1] })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn store_outage_is_an_internal_error() {
    let (store, app) = app();
    store.fail_on(StoreOp::ListPeople);

    let (status, body) = send(&app, "GET", "/api/person", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "An internal database error occurred");
}
