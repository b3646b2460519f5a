//! services/portal/src/controllers/modules.rs
//!
//! Module detail with its lessons, and the single-lesson screen.

use super::view::{describe, View};
use crate::api::{lessons, modules, PortalApi};
use course_portal_core::domain::{Lesson, LessonDraft, Module, ModuleDraft};
use course_portal_core::ports::PortResult;
use std::sync::Arc;
use tracing::info;

pub const MODULE_NOT_FOUND: &str = "Module not found";
pub const LESSON_NOT_FOUND: &str = "Lesson not found";

//=========================================================================================
// Module Detail
//=========================================================================================

pub struct ModuleDetailController {
    api: PortalApi,
    module_id: String,
    module: View<Arc<Module>>,
    lessons: Vec<Lesson>,
}

impl ModuleDetailController {
    pub async fn load(api: PortalApi, module_id: impl Into<String>) -> Self {
        let module_id = module_id.into();
        let (module, lesson_list) = tokio::join!(
            api.fetch(modules::by_id(&module_id)),
            api.fetch(lessons::list(&module_id)),
        );

        let (module, lessons) = match (module, lesson_list) {
            (Err(e), _) => (View::from_error(&e, MODULE_NOT_FOUND), Vec::new()),
            (Ok(_), Err(e)) => (
                View::Error(format!("Lessons could not be loaded: {}", describe(&e))),
                Vec::new(),
            ),
            (Ok(module), Ok(list)) => {
                let mut lessons = list.as_ref().clone();
                lessons.sort_by_key(|l| l.order);
                (View::Content(module), lessons)
            }
        };

        Self {
            api,
            module_id,
            module,
            lessons,
        }
    }

    pub fn view(&self) -> &View<Arc<Module>> {
        &self.module
    }

    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    pub fn form(&self) -> Option<ModuleDraft> {
        self.module.content().map(|module| ModuleDraft::from(module.as_ref()))
    }

    pub async fn update(&mut self, draft: &ModuleDraft) -> PortResult<Module> {
        let updated = self.api.run(modules::update(&self.module_id, draft)?).await?;
        self.module = View::Content(Arc::new(updated.clone()));
        info!("Module {} updated", self.module_id);
        Ok(updated)
    }

    pub async fn create_lesson(&mut self, draft: &LessonDraft) -> PortResult<Lesson> {
        let created = self.api.run(lessons::create(&self.module_id, draft)?).await?;
        self.lessons.push(created.clone());
        self.lessons.sort_by_key(|l| l.order);
        Ok(created)
    }

    pub async fn delete_lesson(&mut self, lesson_id: &str) -> PortResult<()> {
        self.api.run(lessons::delete(lesson_id)).await?;
        self.lessons.retain(|l| l.id != lesson_id);
        info!("Lesson {} removed from module {}", lesson_id, self.module_id);
        Ok(())
    }
}

//=========================================================================================
// Lesson Detail
//=========================================================================================

pub struct LessonDetailController {
    api: PortalApi,
    lesson_id: String,
    lesson: View<Arc<Lesson>>,
}

impl LessonDetailController {
    pub async fn load(api: PortalApi, lesson_id: impl Into<String>) -> Self {
        let lesson_id = lesson_id.into();
        let lesson = View::from_result(api.fetch(lessons::by_id(&lesson_id)).await, LESSON_NOT_FOUND);
        Self {
            api,
            lesson_id,
            lesson,
        }
    }

    pub fn view(&self) -> &View<Arc<Lesson>> {
        &self.lesson
    }

    pub fn form(&self) -> Option<LessonDraft> {
        self.lesson.content().map(|lesson| LessonDraft::from(lesson.as_ref()))
    }

    pub async fn update(&mut self, draft: &LessonDraft) -> PortResult<Lesson> {
        let updated = self.api.run(lessons::update(&self.lesson_id, draft)?).await?;
        self.lesson = View::Content(Arc::new(updated.clone()));
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryTokenStorage;
    use crate::cache::QueryCache;
    use crate::store::SessionStore;
    use crate::test_support::{lesson_json, module_json, FakeTransport};
    use course_portal_core::ports::HttpMethod;
    use serde_json::json;

    fn api(transport: Arc<FakeTransport>) -> PortalApi {
        let session = Arc::new(SessionStore::new(Arc::new(MemoryTokenStorage::new())));
        PortalApi::new(transport, session, QueryCache::default())
    }

    #[tokio::test]
    async fn lessons_are_listed_in_order_and_deleted_locally() {
        let transport = Arc::new(FakeTransport::new());
        transport
            .respond(HttpMethod::Get, "/modules/m1", 200, module_json("m1", "1", 1))
            .respond(
                HttpMethod::Get,
                "/modules/m1/lessons",
                200,
                json!([lesson_json("b", "m1", 20), lesson_json("a", "m1", 5)]),
            )
            .respond_empty(HttpMethod::Delete, "/lessons/a", 204);

        let mut detail = ModuleDetailController::load(api(transport.clone()), "m1").await;
        let ids: Vec<&str> = detail.lessons().iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        detail.delete_lesson("a").await.unwrap();
        assert_eq!(detail.lessons().len(), 1);
        assert_eq!(transport.count(HttpMethod::Get, "/modules/m1/lessons"), 1);
    }

    #[tokio::test]
    async fn failed_lesson_list_keeps_the_module_distinct_from_missing() {
        let transport = Arc::new(FakeTransport::new());
        transport
            .respond(HttpMethod::Get, "/modules/m1", 200, module_json("m1", "1", 1))
            .respond(HttpMethod::Get, "/modules/m1/lessons", 500, json!({ "detail": "Database unavailable" }));

        let detail = ModuleDetailController::load(api(transport), "m1").await;
        assert_eq!(
            detail.view(),
            &View::Error("Lessons could not be loaded: Database unavailable".to_string())
        );
        assert!(detail.lessons().is_empty());
    }

    #[tokio::test]
    async fn missing_lesson_renders_not_found() {
        let transport = Arc::new(FakeTransport::new());
        let lesson = LessonDetailController::load(api(transport), "zz").await;
        assert_eq!(lesson.view(), &View::NotFound(LESSON_NOT_FOUND.to_string()));
        assert!(lesson.form().is_none());
    }

    #[tokio::test]
    async fn lesson_edit_replaces_the_shown_lesson() {
        let transport = Arc::new(FakeTransport::new());
        let mut updated = lesson_json("l1", "m1", 1);
        updated["title"] = json!("Renamed");
        transport
            .respond(HttpMethod::Get, "/lessons/l1", 200, lesson_json("l1", "m1", 1))
            .respond(HttpMethod::Put, "/lessons/l1", 200, updated);

        let mut lesson = LessonDetailController::load(api(transport), "l1").await;
        let mut draft = lesson.form().unwrap();
        draft.title = "Renamed".to_string();
        lesson.update(&draft).await.unwrap();
        assert_eq!(lesson.view().content().unwrap().title, "Renamed");
    }
}
