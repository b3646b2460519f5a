//! services/portal/src/controllers/dashboard.rs
//!
//! The learner dashboard: progress across enrolled courses, per-course progress,
//! and lesson completion.

use super::view::View;
use crate::api::{progress, PortalApi};
use crate::cache::Subscription;
use course_portal_core::domain::{CourseProgress, LessonProgress, LessonProgressUpdate};
use course_portal_core::ports::PortResult;
use std::sync::Arc;

pub const PROGRESS_NOT_FOUND: &str = "No progress recorded for this course yet";

pub struct DashboardController {
    api: PortalApi,
    enrolled: Subscription<Vec<CourseProgress>>,
}

impl DashboardController {
    pub fn new(api: PortalApi) -> Self {
        let enrolled = api.watch(progress::enrolled());
        Self { api, enrolled }
    }

    pub fn view(&self) -> View<Arc<Vec<CourseProgress>>> {
        View::from_query(self.enrolled.state(), "No enrolled courses")
    }

    pub async fn ready(&self) -> View<Arc<Vec<CourseProgress>>> {
        let _ = self.enrolled.result().await;
        self.view()
    }

    pub async fn course_progress(&self, course_id: &str) -> View<Arc<CourseProgress>> {
        View::from_result(
            self.api.fetch(progress::course(course_id)).await,
            PROGRESS_NOT_FOUND,
        )
    }

    /// Records a lesson as complete or not. The enrolled summary is re-fetched
    /// through invalidation, after any fetch already running settles.
    pub async fn mark_lesson(
        &self,
        course_id: &str,
        lesson_id: &str,
        completed: bool,
    ) -> PortResult<LessonProgress> {
        let update = LessonProgressUpdate {
            completed: Some(completed),
            last_position: None,
        };
        self.api
            .run(progress::update_lesson(course_id, lesson_id, &update)?)
            .await
    }
}
