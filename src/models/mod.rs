pub mod course;
pub mod field_update;
pub mod filter;

pub use course::{Course, CourseChanges, NewCourse, NewCourseRequest, UpdateCourseRequest, DATE_FORMAT, parse_date};
pub use field_update::FieldUpdate;
pub use filter::CourseFilter;
