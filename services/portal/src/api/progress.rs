//! services/portal/src/api/progress.rs

use super::endpoint::{segment, with_json, MutationDef, QueryDef};
use crate::cache::{Tag, TagRef};
use course_portal_core::domain::{CourseProgress, LessonProgress, LessonProgressUpdate};
use course_portal_core::ports::{ApiRequest, HttpMethod, PortResult};

/// Progress of every course the current user has started.
pub fn enrolled() -> QueryDef<Vec<CourseProgress>> {
    QueryDef::new(
        ApiRequest::get("/progress/courses"),
        vec![TagRef::all(Tag::Progress)],
    )
}

pub fn course(course_id: &str) -> QueryDef<CourseProgress> {
    QueryDef::new(
        ApiRequest::get(format!("/progress/courses/{}", segment(course_id))),
        vec![TagRef::id(Tag::Progress, course_id)],
    )
}

pub fn update_lesson(
    course_id: &str,
    lesson_id: &str,
    update: &LessonProgressUpdate,
) -> PortResult<MutationDef<LessonProgress>> {
    let request = with_json(
        ApiRequest::new(
            HttpMethod::Patch,
            format!("/progress/courses/{}/lessons/{}", segment(course_id), segment(lesson_id)),
        ),
        update,
    )?;
    Ok(MutationDef::new(
        request,
        vec![TagRef::id(Tag::Progress, course_id), TagRef::all(Tag::Progress)],
    ))
}
