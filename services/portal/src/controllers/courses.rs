//! services/portal/src/controllers/courses.rs
//!
//! Course catalogue, course detail, and the create/edit course forms.

use super::view::{describe, View};
use crate::api::{courses, modules, PortalApi};
use crate::cache::Subscription;
use course_portal_core::domain::{Course, CourseDraft, CourseFilter, Level, Module, ModuleDraft};
use course_portal_core::ports::PortResult;
use std::sync::Arc;
use tracing::info;

pub const COURSE_NOT_FOUND: &str = "Course not found";

//=========================================================================================
// Course List
//=========================================================================================

/// The catalogue. Stays subscribed, so course mutations elsewhere refresh it.
pub struct CourseListController {
    api: PortalApi,
    filter: CourseFilter,
    courses: Subscription<Vec<Course>>,
}

impl CourseListController {
    pub fn new(api: PortalApi, filter: CourseFilter) -> Self {
        let courses = api.watch(courses::list(&filter));
        Self {
            api,
            filter,
            courses,
        }
    }

    pub fn filter(&self) -> &CourseFilter {
        &self.filter
    }

    /// A new filter is a new query; the previous one is released.
    pub fn set_filter(&mut self, filter: CourseFilter) {
        if filter == self.filter {
            return;
        }
        self.courses = self.api.watch(courses::list(&filter));
        self.filter = filter;
    }

    pub fn view(&self) -> View<Arc<Vec<Course>>> {
        View::from_query(self.courses.state(), "No courses found")
    }

    /// Waits for the current fetch to finish, then renders.
    pub async fn ready(&self) -> View<Arc<Vec<Course>>> {
        let _ = self.courses.result().await;
        self.view()
    }

    pub fn refresh(&self) {
        self.courses.refetch();
    }

    /// Re-renders after the list changes. Returns `None` once the query is gone.
    pub async fn changed(&mut self) -> Option<View<Arc<Vec<Course>>>> {
        if self.courses.changed().await {
            Some(self.view())
        } else {
            None
        }
    }
}

//=========================================================================================
// Course Detail
//=========================================================================================

/// One course with its module list. The module list is held locally and kept in
/// step with confirmed mutations instead of re-fetching the page.
pub struct CourseDetailController {
    api: PortalApi,
    course_id: String,
    course: View<Arc<Course>>,
    modules: Vec<Module>,
}

impl CourseDetailController {
    /// Loads the course and its modules concurrently.
    pub async fn load(api: PortalApi, course_id: impl Into<String>) -> Self {
        let course_id = course_id.into();
        let (course, module_list) = tokio::join!(
            api.fetch(courses::by_id(&course_id)),
            api.fetch(modules::list(&course_id)),
        );

        let (course, modules) = match (course, module_list) {
            (Err(e), _) => (View::from_error(&e, COURSE_NOT_FOUND), Vec::new()),
            (Ok(_), Err(e)) => (
                View::Error(format!("Modules could not be loaded: {}", describe(&e))),
                Vec::new(),
            ),
            (Ok(course), Ok(list)) => {
                let mut modules = list.as_ref().clone();
                modules.sort_by_key(|m| m.order);
                (View::Content(course), modules)
            }
        };

        Self {
            api,
            course_id,
            course,
            modules,
        }
    }

    pub fn course_id(&self) -> &str {
        &self.course_id
    }

    pub fn view(&self) -> &View<Arc<Course>> {
        &self.course
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Creates a module and, once the backend confirms, appends it to the local list.
    pub async fn create_module(&mut self, draft: &ModuleDraft) -> PortResult<Module> {
        let created = self
            .api
            .run(modules::create(&self.course_id, draft)?)
            .await?;
        self.modules.push(created.clone());
        self.modules.sort_by_key(|m| m.order);
        Ok(created)
    }

    /// Deletes a module and, once the backend confirms, drops it from the local list.
    pub async fn delete_module(&mut self, module_id: &str) -> PortResult<()> {
        self.api.run(modules::delete(module_id)).await?;
        self.modules.retain(|m| m.id != module_id);
        info!("Module {} removed from course {}", module_id, self.course_id);
        Ok(())
    }
}

//=========================================================================================
// Course Forms
//=========================================================================================

/// The edit form, pre-filled from `GET /courses/:id`.
pub struct EditCourseController {
    api: PortalApi,
    course_id: String,
    course: View<Arc<Course>>,
}

impl EditCourseController {
    pub async fn load(api: PortalApi, course_id: impl Into<String>) -> Self {
        let course_id = course_id.into();
        let course = View::from_result(api.fetch(courses::by_id(&course_id)).await, COURSE_NOT_FOUND);
        Self {
            api,
            course_id,
            course,
        }
    }

    pub fn view(&self) -> &View<Arc<Course>> {
        &self.course
    }

    /// The form values: the fetched course minus server-managed fields.
    pub fn form(&self) -> Option<CourseDraft> {
        self.course.content().map(|course| CourseDraft::from(course.as_ref()))
    }

    pub async fn submit(&mut self, draft: &CourseDraft) -> PortResult<Course> {
        let updated = self
            .api
            .run(courses::update(&self.course_id, draft)?)
            .await?;
        self.course = View::Content(Arc::new(updated.clone()));
        info!("Course {} updated", self.course_id);
        Ok(updated)
    }
}

pub struct CreateCourseController {
    api: PortalApi,
}

impl CreateCourseController {
    pub fn new(api: PortalApi) -> Self {
        Self { api }
    }

    pub fn blank_form() -> CourseDraft {
        CourseDraft {
            title: String::new(),
            description: String::new(),
            thumbnail_url: None,
            category: None,
            instructor_name: None,
            instructor: None,
            level: Level::Beginner,
            duration: 0,
            rating: None,
            price: 0.0,
            is_published: false,
        }
    }

    pub async fn submit(&self, draft: &CourseDraft) -> PortResult<Course> {
        let created = self.api.run(courses::create(draft)?).await?;
        info!("Course {} created", created.id);
        Ok(created)
    }
}
