use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{Course, CourseChanges, CourseFilter, NewCourse};

/// Shared by `list` and `count` so both always select the same rows.
/// Splicing it into both statements is why these queries use the runtime
/// `query_as` API instead of the checked `query_as!` macro. `name_lower` is
/// folded in Rust because SQLite's `lower()` and `LIKE` only fold ASCII.
const NAME_FILTER: &str = r"(?1 IS NULL OR name_lower LIKE ?1 ESCAPE '\')";

const COURSE_COLUMNS: &str = "id, name, start_date, end_date, created_at, updated_at";

/// Persistence operations the course service depends on.
///
/// Absence is reported in the `Ok` value (`None` / `false`); `Err` is
/// reserved for the store itself failing.
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Inserts the course and returns it with its assigned id and timestamps.
    async fn create(&self, course: NewCourse) -> Result<Course, sqlx::Error>;

    async fn get(&self, id: &str) -> Result<Option<Course>, sqlx::Error>;

    /// Matching courses, newest first, starting at `offset`.
    async fn list(
        &self,
        filter: &CourseFilter,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<Course>, sqlx::Error>;

    async fn count(&self, filter: &CourseFilter) -> Result<u64, sqlx::Error>;

    /// Applies the set fields. Returns `false` when no row has `id`.
    async fn update(&self, id: &str, changes: &CourseChanges) -> Result<bool, sqlx::Error>;

    /// Returns `false` when no row has `id`.
    async fn delete(&self, id: &str) -> Result<bool, sqlx::Error>;
}

#[derive(Clone)]
pub struct SqliteCourseRepository {
    db: SqlitePool,
}

impl SqliteCourseRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CourseRepository for SqliteCourseRepository {
    async fn create(&self, course: NewCourse) -> Result<Course, sqlx::Error> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO courses
                (id, name, name_lower, start_date, end_date, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            "#,
        )
        .bind(&id)
        .bind(&course.name)
        .bind(course.name.to_lowercase())
        .bind(course.start_date)
        .bind(course.end_date)
        .bind(now)
        .execute(&self.db)
        .await?;

        info!("course created with id: {}", id);

        Ok(Course {
            id,
            name: course.name,
            start_date: course.start_date,
            end_date: course.end_date,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get(&self, id: &str) -> Result<Option<Course>, sqlx::Error> {
        let sql = format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = ?1");
        sqlx::query_as::<_, Course>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
    }

    async fn list(
        &self,
        filter: &CourseFilter,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<Course>, sqlx::Error> {
        let sql = format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE {NAME_FILTER} \
             ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3"
        );
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);

        sqlx::query_as::<_, Course>(&sql)
            .bind(filter.name_pattern())
            .bind(i64::from(limit))
            .bind(offset)
            .fetch_all(&self.db)
            .await
    }

    async fn count(&self, filter: &CourseFilter) -> Result<u64, sqlx::Error> {
        let sql = format!("SELECT COUNT(*) FROM courses WHERE {NAME_FILTER}");
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(filter.name_pattern())
            .fetch_one(&self.db)
            .await?;

        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn update(&self, id: &str, changes: &CourseChanges) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE courses
            SET name = COALESCE(?1, name),
                name_lower = COALESCE(?2, name_lower),
                start_date = COALESCE(?3, start_date),
                end_date = COALESCE(?4, end_date),
                updated_at = ?5
            WHERE id = ?6
            "#,
        )
        .bind(changes.name.as_set())
        .bind(changes.name.as_set().map(|name| name.to_lowercase()))
        .bind(changes.start_date.as_set().copied())
        .bind(changes.end_date.as_set().copied())
        .bind(Utc::now())
        .bind(id)
        .execute(&self.db)
        .await?
        .rows_affected();

        debug!("update of course {} touched {} row(s)", id, result);
        Ok(result > 0)
    }

    async fn delete(&self, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM courses WHERE id = ?1")
            .bind(id)
            .execute(&self.db)
            .await?
            .rows_affected();

        Ok(result > 0)
    }
}
