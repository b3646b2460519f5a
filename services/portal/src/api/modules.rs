//! services/portal/src/api/modules.rs

use super::endpoint::{segment, with_json, MutationDef, QueryDef};
use crate::cache::{Tag, TagRef};
use course_portal_core::domain::{Module, ModuleDraft};
use course_portal_core::ports::{ApiRequest, HttpMethod, PortResult};

/// Module writes change the owning course's nested module list too.
fn invalidated() -> Vec<TagRef> {
    vec![TagRef::all(Tag::Module), TagRef::all(Tag::Course)]
}

pub fn list(course_id: &str) -> QueryDef<Vec<Module>> {
    QueryDef::new(
        ApiRequest::get(format!("/courses/{}/modules", segment(course_id))),
        vec![TagRef::all(Tag::Module)],
    )
}

pub fn by_id(id: &str) -> QueryDef<Module> {
    QueryDef::new(
        ApiRequest::get(format!("/modules/{}", segment(id))),
        vec![TagRef::id(Tag::Module, id)],
    )
}

pub fn create(course_id: &str, draft: &ModuleDraft) -> PortResult<MutationDef<Module>> {
    let request = with_json(
        ApiRequest::new(HttpMethod::Post, format!("/courses/{}/modules", segment(course_id))),
        draft,
    )?;
    Ok(MutationDef::new(request, invalidated()))
}

pub fn update(id: &str, draft: &ModuleDraft) -> PortResult<MutationDef<Module>> {
    let request = with_json(
        ApiRequest::new(HttpMethod::Put, format!("/modules/{}", segment(id))),
        draft,
    )?;
    Ok(MutationDef::new(request, invalidated()))
}

pub fn delete(id: &str) -> MutationDef<()> {
    MutationDef::new(
        ApiRequest::new(HttpMethod::Delete, format!("/modules/{}", segment(id))),
        invalidated(),
    )
}
