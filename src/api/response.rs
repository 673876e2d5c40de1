use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use serde::Serialize;

use crate::pagination::PageMeta;
use crate::services::CourseReply;

/// Success body shared by every course route.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: u16,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
}

fn envelope<T: Serialize>(status: StatusCode, data: Option<T>, meta: Option<PageMeta>) -> Response {
    let body = Json(Envelope {
        status: status.as_u16(),
        message: "success",
        data,
        meta,
    });
    (status, body).into_response()
}

impl IntoResponse for CourseReply {
    fn into_response(self) -> Response {
        match self {
            CourseReply::Created(course) => envelope(StatusCode::CREATED, Some(course), None),
            CourseReply::Found(course) => envelope(StatusCode::OK, Some(course), None),
            CourseReply::Page { courses, meta } => envelope(StatusCode::OK, Some(courses), Some(meta)),
            CourseReply::Updated | CourseReply::Deleted => envelope::<()>(StatusCode::OK, None, None),
        }
    }
}
