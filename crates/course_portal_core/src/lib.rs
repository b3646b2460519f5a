pub mod domain;
pub mod ports;

pub use domain::{
    AuthResponse, Course, CourseDraft, CourseFilter, CourseProgress, Instructor, Lesson,
    LessonDraft, LessonProgress, LessonProgressUpdate, Level, LoginCredentials, Module,
    ModuleDraft, ModuleProgress, ProfileUpdate, RegisterCredentials, Role, User,
};
pub use ports::{
    ApiRequest, ApiResponse, HttpMethod, HttpTransport, PortError, PortResult, TokenStorage,
};
