//! services/portal/src/api/courses.rs

use super::endpoint::{segment, with_json, MutationDef, QueryDef};
use crate::cache::{Tag, TagRef};
use course_portal_core::domain::{Course, CourseDraft, CourseFilter};
use course_portal_core::ports::{ApiRequest, HttpMethod, PortResult};

pub fn list(filter: &CourseFilter) -> QueryDef<Vec<Course>> {
    QueryDef::new(
        ApiRequest::get("/courses").with_query(filter.to_params()),
        vec![TagRef::all(Tag::Course)],
    )
}

pub fn by_id(id: &str) -> QueryDef<Course> {
    QueryDef::new(
        ApiRequest::get(format!("/courses/{}", segment(id))),
        vec![TagRef::id(Tag::Course, id)],
    )
}

pub fn create(draft: &CourseDraft) -> PortResult<MutationDef<Course>> {
    let request = with_json(ApiRequest::new(HttpMethod::Post, "/courses"), draft)?;
    Ok(MutationDef::new(request, vec![TagRef::all(Tag::Course)]))
}

pub fn update(id: &str, draft: &CourseDraft) -> PortResult<MutationDef<Course>> {
    let request = with_json(
        ApiRequest::new(HttpMethod::Put, format!("/courses/{}", segment(id))),
        draft,
    )?;
    Ok(MutationDef::new(
        request,
        vec![TagRef::id(Tag::Course, id), TagRef::all(Tag::Course)],
    ))
}

pub fn delete(id: &str) -> MutationDef<()> {
    MutationDef::new(
        ApiRequest::new(HttpMethod::Delete, format!("/courses/{}", segment(id))),
        vec![TagRef::all(Tag::Course)],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_key_includes_filter_params() {
        let filter = CourseFilter {
            level: Some("beginner".to_string()),
            search: Some("rust".to_string()),
            ..CourseFilter::default()
        };
        assert_eq!(
            list(&filter).key().to_string(),
            "GET /courses?level=beginner&search=rust"
        );
    }

    #[test]
    fn detail_provides_an_id_scoped_tag() {
        let def = by_id("42");
        assert_eq!(def.request.path, "/courses/42");
        assert_eq!(def.provides, vec![TagRef::id(Tag::Course, "42")]);
    }

    #[test]
    fn hostile_ids_cannot_reshape_the_path() {
        assert_eq!(by_id("42?x=1").request.path, "/courses/42%3Fx%3D1");
        assert!(by_id("42?x=1").request.query.is_empty());
        assert_eq!(delete("../admin").request.path, "/courses/..%2Fadmin");
        assert_eq!(by_id("42?x=1").provides, vec![TagRef::id(Tag::Course, "42?x=1")]);
    }
}
