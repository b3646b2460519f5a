//! services/portal/src/controllers/mod.rs
//!
//! Per-screen controllers. Each one reads through `PortalApi`, renders a `View`,
//! and applies local list updates only after a mutation is confirmed.

pub mod auth;
pub mod courses;
pub mod dashboard;
pub mod modules;
pub mod view;

pub use auth::AuthController;
pub use courses::{
    CourseDetailController, CourseListController, CreateCourseController, EditCourseController,
};
pub use dashboard::DashboardController;
pub use modules::{LessonDetailController, ModuleDetailController};
pub use view::{describe, View};
