pub mod course_service;
pub mod endpoint;

pub use course_service::{CourseService, UpdateDatePolicy};
pub use endpoint::{CourseEndpoints, CourseReply, CourseRequest, ListCoursesRequest};
