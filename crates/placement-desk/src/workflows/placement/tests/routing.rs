use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::{read_json_body, Fixture};
use crate::workflows::placement::router::{failure_response, status_for};
use crate::workflows::placement::{Actor, FailureKind, PlacementError, UserId, USER_HEADER};

fn request(method: Method, uri: &str, actor: Option<&Actor>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder.header(USER_HEADER, actor.id().0.to_string());
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

#[tokio::test]
async fn student_applies_and_reads_available_actions() {
    let fixture = Fixture::new();
    let position = fixture.open_position(2);
    let student = fixture.student;
    let app = fixture.router();

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/v1/applications",
            Some(&student),
            Some(json!({ "position_id": position.id.0 })),
        ))
        .await
        .expect("apply");
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = read_json_body(response).await;
    assert_eq!(created["status"], "pending");
    assert_eq!(
        created["available_actions"],
        json!(["shortlist", "accept", "reject", "withdraw"])
    );

    let uri = format!("/api/v1/applications/{}", created["id"]);
    let response = app
        .oneshot(request(Method::GET, &uri, Some(&student), None))
        .await
        .expect("get");
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = read_json_body(response).await;
    assert_eq!(fetched["id"], created["id"]);
}

#[tokio::test]
async fn missing_or_unknown_user_is_unauthorized() {
    let fixture = Fixture::new();
    let app = fixture.router();

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/api/v1/applications", None, None))
        .await
        .expect("no header");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let ghost = Actor::Student { id: UserId(4242) };
    let response = app
        .oneshot(request(Method::GET, "/api/v1/applications", Some(&ghost), None))
        .await
        .expect("unknown user");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = read_json_body(response).await;
    assert!(body["error"]
        .as_str()
        .unwrap_or_default()
        .contains("4242"));
}

#[tokio::test]
async fn invalid_transition_echoes_current_status() {
    let fixture = Fixture::new();
    let (_, application) = fixture.pending_application(1);
    fixture
        .service
        .accept(&fixture.staff, application.id)
        .expect("accept");
    let student = fixture.student;
    let app = fixture.router();

    let uri = format!("/api/v1/applications/{}/withdraw", application.id.0);
    let response = app
        .oneshot(request(Method::PUT, &uri, Some(&student), None))
        .await
        .expect("withdraw");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json_body(response).await;
    assert_eq!(body["kind"], "invalid_transition");
    assert_eq!(body["status"], "accepted");
    assert_eq!(body["application"]["available_actions"], json!(["reject"]));
}

#[tokio::test]
async fn staff_transitions_through_action_path() {
    let fixture = Fixture::new();
    let (_, application) = fixture.pending_application(1);
    let (staff, rival) = (fixture.staff, fixture.rival_staff);
    let app = fixture.router();

    let uri = format!("/api/v1/applications/{}/Shortlist", application.id.0);
    let response = app
        .clone()
        .oneshot(request(Method::PUT, &uri, Some(&staff), None))
        .await
        .expect("shortlist");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "shortlisted");
    assert_eq!(body["last_modified_by"], json!(staff.id().0));

    let uri = format!("/api/v1/applications/{}/accept", application.id.0);
    let response = app
        .clone()
        .oneshot(request(Method::PUT, &uri, Some(&rival), None))
        .await
        .expect("rival accept");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let uri = format!("/api/v1/applications/{}/approve", application.id.0);
    let response = app
        .oneshot(request(Method::PUT, &uri, Some(&staff), None))
        .await
        .expect("unknown action");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn accepting_without_capacity_is_a_conflict() {
    let fixture = Fixture::new();
    let (_, application) = fixture.pending_application(0);
    let staff = fixture.staff;
    let app = fixture.router();

    let uri = format!("/api/v1/applications/{}/accept", application.id.0);
    let response = app
        .oneshot(request(Method::PUT, &uri, Some(&staff), None))
        .await
        .expect("accept");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = read_json_body(response).await;
    assert_eq!(body["kind"], "capacity_exhausted");
    assert_eq!(body["status"], "pending");
}

#[tokio::test]
async fn employer_manages_positions_over_http() {
    let fixture = Fixture::new();
    let (employer, student) = (fixture.employer, fixture.student);
    let app = fixture.router();

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/v1/positions",
            Some(&employer),
            Some(json!({ "title": "QA Engineer", "capacity": 2 })),
        ))
        .await
        .expect("create");
    assert_eq!(response.status(), StatusCode::CREATED);
    let position = read_json_body(response).await;
    assert_eq!(position["status"], "open");
    assert_eq!(position["remaining_count"], 2);

    let uri = format!("/api/v1/positions/{}/close", position["id"]);
    let response = app
        .clone()
        .oneshot(request(Method::PUT, &uri, Some(&employer), None))
        .await
        .expect("close");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/v1/applications",
            Some(&student),
            Some(json!({ "position_id": position["id"] })),
        ))
        .await
        .expect("apply to closed");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/api/v1/positions", None, None))
        .await
        .expect("open positions");
    assert_eq!(read_json_body(response).await, json!([]));

    let response = app
        .oneshot(request(
            Method::POST,
            "/api/v1/positions",
            Some(&employer),
            Some(json!({ "title": " ", "capacity": 1 })),
        ))
        .await
        .expect("blank title");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn staff_nominates_student_over_http() {
    let fixture = Fixture::new();
    let position = fixture.open_position(1);
    let (staff, student) = (fixture.staff, fixture.other_student);
    let app = fixture.router();

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/v1/shortlist",
            Some(&staff),
            Some(json!({ "student_id": student.id().0, "position_id": position.id.0 })),
        ))
        .await
        .expect("nominate");
    assert_eq!(response.status(), StatusCode::CREATED);

    let uri = format!("/api/v1/positions/{}/applications", position.id.0);
    let response = app
        .oneshot(request(Method::GET, &uri, Some(&staff), None))
        .await
        .expect("review");
    assert_eq!(response.status(), StatusCode::OK);
    let listed = read_json_body(response).await;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
    assert_eq!(listed[0]["student_id"], json!(student.id().0));
}

#[test]
fn failure_kinds_map_to_http_statuses() {
    assert_eq!(status_for(FailureKind::NotFound), StatusCode::NOT_FOUND);
    assert_eq!(status_for(FailureKind::Forbidden), StatusCode::FORBIDDEN);
    assert_eq!(status_for(FailureKind::InvalidTransition), StatusCode::BAD_REQUEST);
    assert_eq!(status_for(FailureKind::Conflict), StatusCode::CONFLICT);
    assert_eq!(status_for(FailureKind::CapacityExhausted), StatusCode::CONFLICT);
    assert_eq!(status_for(FailureKind::InvalidState), StatusCode::CONFLICT);
    assert_eq!(status_for(FailureKind::InvalidInput), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        status_for(FailureKind::Unavailable),
        StatusCode::INTERNAL_SERVER_ERROR
    );

    let response = failure_response(PlacementError::InvalidInput("bad".to_string()));
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn malformed_user_header_is_unauthorized() {
    let app = Fixture::new().router();

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/v1/applications")
        .header(USER_HEADER, "not-a-number")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("malformed header");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = read_json_body(response).await;
    assert!(body["error"]
        .as_str()
        .unwrap_or_default()
        .contains(USER_HEADER));
}

#[tokio::test]
async fn null_description_in_edit_clears_it() {
    let fixture = Fixture::new();
    let position = fixture.open_position(1);
    let employer = fixture.employer;
    let app = fixture.router();
    let uri = format!("/api/v1/positions/{}", position.id.0);

    let response = app
        .clone()
        .oneshot(request(
            Method::PUT,
            &uri,
            Some(&employer),
            Some(json!({ "title": "Site Reliability Engineer" })),
        ))
        .await
        .expect("rename");
    assert_eq!(response.status(), StatusCode::OK);
    let renamed = read_json_body(response).await;
    assert_eq!(renamed["description"], "Backend internship");

    let response = app
        .oneshot(request(
            Method::PUT,
            &uri,
            Some(&employer),
            Some(json!({ "description": null })),
        ))
        .await
        .expect("clear");
    assert_eq!(response.status(), StatusCode::OK);
    let cleared = read_json_body(response).await;
    assert!(cleared.get("description").is_none());
    assert_eq!(cleared["title"], "Site Reliability Engineer");
}
