pub mod response;

use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query};
use axum::error_handling::HandleErrorLayer;
use axum::{BoxError, Json, middleware};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde::Deserialize;
use tower::ServiceBuilder;
use tracing::error;

use crate::auth::require_access;
use crate::error::AppError;
use crate::models::{NewCourseRequest, UpdateCourseRequest};
use crate::services::{CourseReply, CourseRequest, ListCoursesRequest};
use crate::state::AppState;

/// Query string of `GET /courses`. Page and limit stay text so a
/// non-numeric value falls back to the defaults instead of failing.
#[derive(Debug, Default, Deserialize)]
struct ListQueryParams {
    name: Option<String>,
    page: Option<String>,
    limit: Option<String>,
}

impl ListQueryParams {
    fn into_request(self) -> ListCoursesRequest {
        ListCoursesRequest {
            name: self.name.filter(|name| !name.is_empty()),
            page: lenient_int(self.page.as_deref()),
            limit: lenient_int(self.limit.as_deref()),
        }
    }
}

fn lenient_int(raw: Option<&str>) -> i64 {
    raw.and_then(|value| value.trim().parse().ok()).unwrap_or(0)
}

pub fn router(state: AppState, request_timeout: Duration) -> Router {
    let courses = Router::new()
        .route("/courses", get(list_courses).post(create_course))
        .route(
            "/courses/{id}",
            get(get_course).patch(update_course).delete(delete_course),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_access));

    Router::new()
        .route("/health", get(health))
        .merge(courses)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .timeout(request_timeout),
        )
        .with_state(state)
}

async fn handle_middleware_error(err: BoxError) -> AppError {
    if err.is::<tower::timeout::error::Elapsed>() {
        AppError::Timeout
    } else {
        error!("unhandled middleware error: {}", err);
        AppError::InternalServerError
    }
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn dispatch(state: &AppState, request: CourseRequest) -> Result<CourseReply, AppError> {
    Ok(state.courses.handle(request).await?)
}

fn invalid_body(rejection: JsonRejection) -> AppError {
    AppError::BadRequest(format!("Invalid request format: '{}'", rejection.body_text()))
}

async fn list_courses(
    State(state): State<AppState>,
    Query(params): Query<ListQueryParams>,
) -> Result<CourseReply, AppError> {
    dispatch(&state, CourseRequest::List(params.into_request())).await
}

async fn create_course(
    State(state): State<AppState>,
    payload: Result<Json<NewCourseRequest>, JsonRejection>,
) -> Result<CourseReply, AppError> {
    let Json(req) = payload.map_err(invalid_body)?;
    dispatch(&state, CourseRequest::Create(req)).await
}

async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<CourseReply, AppError> {
    dispatch(&state, CourseRequest::Get { id }).await
}

async fn update_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateCourseRequest>, JsonRejection>,
) -> Result<CourseReply, AppError> {
    let Json(changes) = payload.map_err(invalid_body)?;
    dispatch(&state, CourseRequest::Update { id, changes }).await
}

async fn delete_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<CourseReply, AppError> {
    dispatch(&state, CourseRequest::Delete { id }).await
}
