//! services/portal/src/api/lessons.rs

use super::endpoint::{segment, with_json, MutationDef, QueryDef};
use crate::cache::{Tag, TagRef};
use course_portal_core::domain::{Lesson, LessonDraft};
use course_portal_core::ports::{ApiRequest, HttpMethod, PortResult};

fn invalidated() -> Vec<TagRef> {
    vec![
        TagRef::all(Tag::Lesson),
        TagRef::all(Tag::Module),
        TagRef::all(Tag::Course),
    ]
}

pub fn list(module_id: &str) -> QueryDef<Vec<Lesson>> {
    QueryDef::new(
        ApiRequest::get(format!("/modules/{}/lessons", segment(module_id))),
        vec![TagRef::all(Tag::Lesson)],
    )
}

pub fn by_id(id: &str) -> QueryDef<Lesson> {
    QueryDef::new(
        ApiRequest::get(format!("/lessons/{}", segment(id))),
        vec![TagRef::id(Tag::Lesson, id)],
    )
}

pub fn create(module_id: &str, draft: &LessonDraft) -> PortResult<MutationDef<Lesson>> {
    let request = with_json(
        ApiRequest::new(HttpMethod::Post, format!("/modules/{}/lessons", segment(module_id))),
        draft,
    )?;
    Ok(MutationDef::new(request, invalidated()))
}

pub fn update(id: &str, draft: &LessonDraft) -> PortResult<MutationDef<Lesson>> {
    let request = with_json(
        ApiRequest::new(HttpMethod::Put, format!("/lessons/{}", segment(id))),
        draft,
    )?;
    Ok(MutationDef::new(request, invalidated()))
}

pub fn delete(id: &str) -> MutationDef<()> {
    MutationDef::new(
        ApiRequest::new(HttpMethod::Delete, format!("/lessons/{}", segment(id))),
        invalidated(),
    )
}
