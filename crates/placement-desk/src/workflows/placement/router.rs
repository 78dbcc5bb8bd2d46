use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    Application, ApplicationId, ApplicationView, Position, PositionDraft, PositionEdit,
    PositionId, PositionView, UserId,
};
use super::guard::Actor;
use super::lifecycle::ApplicationAction;
use super::repository::PlacementRepository;
use super::service::{FailureKind, PlacementError, PlacementService};

/// Header carrying the authenticated user id, set by whatever fronts this service.
pub const USER_HEADER: &str = "x-user-id";

type SharedService<R> = Arc<PlacementService<R>>;

#[derive(Debug, Deserialize)]
pub(crate) struct ApplyRequest {
    pub(crate) position_id: PositionId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ShortlistStudentRequest {
    pub(crate) student_id: UserId,
    pub(crate) position_id: PositionId,
}

/// Router builder exposing the placement operations over HTTP.
pub fn placement_router<R>(service: SharedService<R>) -> Router
where
    R: PlacementRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/positions",
            get(open_positions_handler::<R>).post(create_position_handler::<R>),
        )
        .route(
            "/api/v1/positions/:position_id",
            put(edit_position_handler::<R>),
        )
        .route(
            "/api/v1/positions/:position_id/close",
            put(close_position_handler::<R>),
        )
        .route(
            "/api/v1/positions/:position_id/reopen",
            put(reopen_position_handler::<R>),
        )
        .route(
            "/api/v1/positions/:position_id/applications",
            get(position_applications_handler::<R>),
        )
        .route(
            "/api/v1/employer/positions",
            get(employer_positions_handler::<R>),
        )
        .route(
            "/api/v1/applications",
            get(list_applications_handler::<R>).post(apply_handler::<R>),
        )
        .route(
            "/api/v1/applications/:application_id",
            get(application_handler::<R>),
        )
        .route(
            "/api/v1/applications/:application_id/:action",
            put(transition_handler::<R>),
        )
        .route("/api/v1/shortlist", post(shortlist_student_handler::<R>))
        .with_state(service)
}

pub(crate) async fn open_positions_handler<R>(State(service): State<SharedService<R>>) -> Response
where
    R: PlacementRepository + 'static,
{
    positions_response(service.list_open_positions())
}

pub(crate) async fn employer_positions_handler<R>(
    State(service): State<SharedService<R>>,
    Authenticated(actor): Authenticated,
) -> Response
where
    R: PlacementRepository + 'static,
{
    positions_response(service.list_positions_for_employer(&actor))
}

pub(crate) async fn create_position_handler<R>(
    State(service): State<SharedService<R>>,
    Authenticated(actor): Authenticated,
    Json(draft): Json<PositionDraft>,
) -> Response
where
    R: PlacementRepository + 'static,
{
    position_response(StatusCode::CREATED, service.create_position(&actor, draft))
}

pub(crate) async fn edit_position_handler<R>(
    State(service): State<SharedService<R>>,
    Authenticated(actor): Authenticated,
    Path(position_id): Path<u64>,
    Json(edit): Json<PositionEdit>,
) -> Response
where
    R: PlacementRepository + 'static,
{
    position_response(
        StatusCode::OK,
        service.edit_position(&actor, PositionId(position_id), edit),
    )
}

pub(crate) async fn close_position_handler<R>(
    State(service): State<SharedService<R>>,
    Authenticated(actor): Authenticated,
    Path(position_id): Path<u64>,
) -> Response
where
    R: PlacementRepository + 'static,
{
    position_response(
        StatusCode::OK,
        service.close_position(&actor, PositionId(position_id)),
    )
}

pub(crate) async fn reopen_position_handler<R>(
    State(service): State<SharedService<R>>,
    Authenticated(actor): Authenticated,
    Path(position_id): Path<u64>,
) -> Response
where
    R: PlacementRepository + 'static,
{
    position_response(
        StatusCode::OK,
        service.reopen_position(&actor, PositionId(position_id)),
    )
}

pub(crate) async fn position_applications_handler<R>(
    State(service): State<SharedService<R>>,
    Authenticated(actor): Authenticated,
    Path(position_id): Path<u64>,
) -> Response
where
    R: PlacementRepository + 'static,
{
    applications_response(service.list_applications_for_position(&actor, PositionId(position_id)))
}

pub(crate) async fn list_applications_handler<R>(
    State(service): State<SharedService<R>>,
    Authenticated(actor): Authenticated,
) -> Response
where
    R: PlacementRepository + 'static,
{
    applications_response(service.list_applications(&actor))
}

pub(crate) async fn apply_handler<R>(
    State(service): State<SharedService<R>>,
    Authenticated(actor): Authenticated,
    Json(request): Json<ApplyRequest>,
) -> Response
where
    R: PlacementRepository + 'static,
{
    application_response(
        StatusCode::CREATED,
        service.apply(&actor, request.position_id),
    )
}

pub(crate) async fn shortlist_student_handler<R>(
    State(service): State<SharedService<R>>,
    Authenticated(actor): Authenticated,
    Json(request): Json<ShortlistStudentRequest>,
) -> Response
where
    R: PlacementRepository + 'static,
{
    application_response(
        StatusCode::CREATED,
        service.shortlist_student(&actor, request.student_id, request.position_id),
    )
}

pub(crate) async fn application_handler<R>(
    State(service): State<SharedService<R>>,
    Authenticated(actor): Authenticated,
    Path(application_id): Path<u64>,
) -> Response
where
    R: PlacementRepository + 'static,
{
    application_response(
        StatusCode::OK,
        service.get_application(&actor, ApplicationId(application_id)),
    )
}

pub(crate) async fn transition_handler<R>(
    State(service): State<SharedService<R>>,
    Authenticated(actor): Authenticated,
    Path((application_id, action)): Path<(u64, String)>,
) -> Response
where
    R: PlacementRepository + 'static,
{
    let Some(action) = ApplicationAction::parse(&action) else {
        let payload = json!({ "error": format!("unknown action '{action}'") });
        return (StatusCode::NOT_FOUND, Json(payload)).into_response();
    };
    application_response(
        StatusCode::OK,
        service.perform(&actor, ApplicationId(application_id), action),
    )
}

/// Caller resolved from the [`USER_HEADER`] header. Rejects with 401 when the header is missing,
/// malformed, or names an unknown user.
pub(crate) struct Authenticated(pub(crate) Actor);

#[async_trait]
impl<R> FromRequestParts<SharedService<R>> for Authenticated
where
    R: PlacementRepository + 'static,
{
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        service: &SharedService<R>,
    ) -> Result<Self, Self::Rejection> {
        authenticate(service, &parts.headers).map(Authenticated)
    }
}

fn authenticate<R>(service: &PlacementService<R>, headers: &HeaderMap) -> Result<Actor, Response>
where
    R: PlacementRepository + 'static,
{
    let user_id = headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .ok_or_else(|| unauthorized(format!("missing or malformed {USER_HEADER} header")))?;

    match service.identify(UserId(user_id)) {
        Ok(actor) => Ok(actor),
        Err(PlacementError::NotFound { .. }) => Err(unauthorized(format!("unknown user {user_id}"))),
        Err(other) => Err(failure_response(other)),
    }
}

fn unauthorized(message: String) -> Response {
    let payload = json!({ "error": message });
    (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
}

fn application_response(status: StatusCode, result: Result<Application, PlacementError>) -> Response {
    match result {
        Ok(application) => (status, Json(application.view())).into_response(),
        Err(error) => failure_response(error),
    }
}

fn applications_response(result: Result<Vec<Application>, PlacementError>) -> Response {
    match result {
        Ok(applications) => {
            let views: Vec<ApplicationView> = applications.iter().map(Application::view).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(error) => failure_response(error),
    }
}

fn position_response(status: StatusCode, result: Result<Position, PlacementError>) -> Response {
    match result {
        Ok(position) => (status, Json(position.view())).into_response(),
        Err(error) => failure_response(error),
    }
}

fn positions_response(result: Result<Vec<Position>, PlacementError>) -> Response {
    match result {
        Ok(positions) => {
            let views: Vec<PositionView> = positions.iter().map(Position::view).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(error) => failure_response(error),
    }
}

pub(crate) fn status_for(kind: FailureKind) -> StatusCode {
    match kind {
        FailureKind::NotFound => StatusCode::NOT_FOUND,
        FailureKind::Forbidden => StatusCode::FORBIDDEN,
        FailureKind::InvalidTransition => StatusCode::BAD_REQUEST,
        FailureKind::Conflict | FailureKind::CapacityExhausted | FailureKind::InvalidState => {
            StatusCode::CONFLICT
        }
        FailureKind::InvalidInput => StatusCode::UNPROCESSABLE_ENTITY,
        FailureKind::Unavailable => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Error body echoing the application's actual state when the failure carries it.
pub(crate) fn failure_response(error: PlacementError) -> Response {
    let kind = error.kind();
    let mut payload = json!({
        "error": error.to_string(),
        "kind": kind.label(),
    });
    if let Some(current) = error.current_application() {
        payload["status"] = json!(current.status.label());
        payload["application"] = json!(current.view());
    }
    (status_for(kind), Json(payload)).into_response()
}
