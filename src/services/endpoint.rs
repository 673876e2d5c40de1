//! One request variant per boundary operation, dispatched through
//! [`CourseEndpoints::handle`].

use tracing::debug;

use crate::error::CourseError;
use crate::models::{Course, CourseFilter, FieldUpdate, NewCourseRequest, UpdateCourseRequest};
use crate::pagination::{DefaultLimit, PageMeta};
use crate::services::CourseService;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListCoursesRequest {
    pub name: Option<String>,
    /// Requested page; zero or negative means the first page.
    pub page: i64,
    /// Requested page size; zero or negative means the default limit.
    pub limit: i64,
}

#[derive(Debug, Clone)]
pub enum CourseRequest {
    Create(NewCourseRequest),
    Get { id: String },
    List(ListCoursesRequest),
    Update { id: String, changes: UpdateCourseRequest },
    Delete { id: String },
}

#[derive(Debug, Clone)]
pub enum CourseReply {
    Created(Course),
    Found(Course),
    Page { courses: Vec<Course>, meta: PageMeta },
    Updated,
    Deleted,
}

#[derive(Clone)]
pub struct CourseEndpoints {
    service: CourseService,
    default_limit: DefaultLimit,
}

impl CourseEndpoints {
    pub fn new(service: CourseService, default_limit: DefaultLimit) -> Self {
        Self {
            service,
            default_limit,
        }
    }

    pub async fn handle(&self, request: CourseRequest) -> Result<CourseReply, CourseError> {
        match request {
            CourseRequest::Create(req) => self.create(req).await,
            CourseRequest::Get { id } => self.service.get(&id).await.map(CourseReply::Found),
            CourseRequest::List(req) => self.list(req).await,
            CourseRequest::Update { id, changes } => self.update(&id, changes).await,
            CourseRequest::Delete { id } => {
                self.service.delete(&id).await?;
                Ok(CourseReply::Deleted)
            }
        }
    }

    async fn create(&self, req: NewCourseRequest) -> Result<CourseReply, CourseError> {
        require(&req.name, "Name is required")?;
        require(&req.start_date, "Start date is required")?;
        require(&req.end_date, "End date is required")?;

        let course = self
            .service
            .create(&req.name, &req.start_date, &req.end_date)
            .await?;
        Ok(CourseReply::Created(course))
    }

    /// Counts first so the metadata can size the window, then fetches the
    /// page with the same filter. The two reads are not one snapshot.
    async fn list(&self, req: ListCoursesRequest) -> Result<CourseReply, CourseError> {
        let filter = CourseFilter::by_name(req.name.unwrap_or_default());

        let total = self.service.count(&filter).await?;
        let meta = PageMeta::new(req.page, req.limit, total, self.default_limit);
        debug!(?meta, "listing courses");

        let courses = self.service.get_all(&filter, meta.offset, meta.limit).await?;
        Ok(CourseReply::Page { courses, meta })
    }

    async fn update(&self, id: &str, changes: UpdateCourseRequest) -> Result<CourseReply, CourseError> {
        require_if_set(&changes.name, "Name is required")?;
        require_if_set(&changes.start_date, "Start date is required")?;
        require_if_set(&changes.end_date, "End date is required")?;

        self.service
            .update(id, changes.name, changes.start_date, changes.end_date)
            .await?;
        Ok(CourseReply::Updated)
    }
}

fn require(value: &str, message: &str) -> Result<(), CourseError> {
    if value.is_empty() {
        return Err(CourseError::Validation(message.to_string()));
    }
    Ok(())
}

fn require_if_set(value: &FieldUpdate<String>, message: &str) -> Result<(), CourseError> {
    match value.as_set() {
        Some(value) => require(value, message),
        None => Ok(()),
    }
}
