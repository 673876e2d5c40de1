use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::CourseError;
use crate::models::FieldUpdate;

/// Calendar format used for dates on the wire and in the store.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /courses`. Missing fields decode as empty strings so the
/// service reports them as validation failures instead of decode failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCourseRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
}

/// Body of `PATCH /courses/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCourseRequest {
    #[serde(default)]
    pub name: FieldUpdate<String>,
    #[serde(default)]
    pub start_date: FieldUpdate<String>,
    #[serde(default)]
    pub end_date: FieldUpdate<String>,
}

/// A course that passed validation and is ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCourse {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Partial set of column changes handed to the repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseChanges {
    pub name: FieldUpdate<String>,
    pub start_date: FieldUpdate<NaiveDate>,
    pub end_date: FieldUpdate<NaiveDate>,
}

impl CourseChanges {
    pub fn is_empty(&self) -> bool {
        !self.name.is_set() && !self.start_date.is_set() && !self.end_date.is_set()
    }
}

/// Parses a strict `YYYY-MM-DD` date. Inputs chrono would otherwise accept,
/// such as unpadded months or a leading sign, are rejected.
pub fn parse_date(field: &'static str, text: &str) -> Result<NaiveDate, CourseError> {
    let parse_error = || CourseError::Parse {
        field,
        value: text.to_string(),
    };

    let date = NaiveDate::parse_from_str(text, DATE_FORMAT).map_err(|_| parse_error())?;
    if date.format(DATE_FORMAT).to_string() != text {
        return Err(parse_error());
    }
    Ok(date)
}
