//! services/portal/src/test_support.rs
//!
//! In-process `HttpTransport` double and JSON fixtures shared by unit tests.

use async_trait::async_trait;
use bytes::Bytes;
use course_portal_core::ports::{
    ApiRequest, ApiResponse, HttpMethod, HttpTransport, PortError, PortResult,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

type Reply = PortResult<ApiResponse>;

/// Scripted backend. Each route holds a queue of replies; the last reply is
/// repeated once the queue is down to one. Unknown routes answer 404.
#[derive(Default)]
pub struct FakeTransport {
    routes: Mutex<HashMap<(HttpMethod, String), VecDeque<Reply>>>,
    requests: Mutex<Vec<ApiRequest>>,
    delay: Duration,
    route_delays: Mutex<HashMap<(HttpMethod, String), Duration>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every response is delayed, keeping requests in flight long enough to overlap.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Delays one route only, on top of any transport-wide delay.
    pub fn slow(&self, method: HttpMethod, path: &str, delay: Duration) -> &Self {
        self.route_delays.lock().insert((method, path.to_string()), delay);
        self
    }

    fn push(&self, method: HttpMethod, path: &str, reply: Reply) -> &Self {
        self.routes
            .lock()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    pub fn respond(&self, method: HttpMethod, path: &str, status: u16, body: Value) -> &Self {
        let body = Bytes::from(body.to_string());
        self.push(method, path, Ok(ApiResponse { status, body }))
    }

    pub fn respond_empty(&self, method: HttpMethod, path: &str, status: u16) -> &Self {
        self.push(
            method,
            path,
            Ok(ApiResponse {
                status,
                body: Bytes::new(),
            }),
        )
    }

    pub fn fail(&self, method: HttpMethod, path: &str, error: PortError) -> &Self {
        self.push(method, path, Err(error))
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    pub fn count(&self, method: HttpMethod, path: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    pub fn last_body(&self, method: HttpMethod, path: &str) -> Option<Value> {
        self.requests
            .lock()
            .iter()
            .rev()
            .find(|r| r.method == method && r.path == path)
            .and_then(|r| r.body.clone())
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn send(&self, request: ApiRequest) -> PortResult<ApiResponse> {
        let route = (request.method, request.path.clone());
        self.requests.lock().push(request);
        let delay = self.delay + self.route_delays.lock().get(&route).copied().unwrap_or_default();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut routes = self.routes.lock();
        match routes.get_mut(&route) {
            Some(queue) if queue.len() > 1 => queue
                .pop_front()
                .unwrap_or_else(|| Err(PortError::Unexpected("empty route".to_string()))),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| Err(PortError::Unexpected("empty route".to_string()))),
            None => Ok(ApiResponse {
                status: 404,
                body: Bytes::from(json!({ "detail": "Not Found" }).to_string()),
            }),
        }
    }
}

//=========================================================================================
// Fixtures
//=========================================================================================

pub fn user_json(id: &str) -> Value {
    json!({
        "id": id,
        "email": format!("{}@example.com", id),
        "name": "Ada Lovelace",
        "role": "student",
        "createdAt": "2024-01-01T00:00:00Z",
        "updatedAt": "2024-01-02T00:00:00Z"
    })
}

pub fn course_json(id: &str, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "description": "An introduction",
        "instructorName": "Grace Hopper",
        "instructor": { "id": "u-7", "name": "Grace Hopper", "bio": "Compiler pioneer" },
        "level": "beginner",
        "duration": 90,
        "rating": 4.5,
        "price": 19.99,
        "isPublished": true,
        "createdAt": "2024-01-01T00:00:00Z",
        "updatedAt": "2024-01-05T00:00:00Z"
    })
}

pub fn module_json(id: &str, course_id: &str, order: i32) -> Value {
    json!({
        "id": id,
        "courseId": course_id,
        "title": format!("Module {}", id),
        "description": "Module description",
        "order": order,
        "createdAt": "2024-01-01T00:00:00Z",
        "updatedAt": "2024-01-01T00:00:00Z"
    })
}

pub fn lesson_json(id: &str, module_id: &str, order: i32) -> Value {
    json!({
        "id": id,
        "moduleId": module_id,
        "title": format!("Lesson {}", id),
        "description": "Lesson description",
        "content": "Body text",
        "duration": 12,
        "order": order,
        "createdAt": "2024-01-01T00:00:00Z",
        "updatedAt": "2024-01-01T00:00:00Z"
    })
}

pub fn progress_json(course_id: &str) -> Value {
    json!({
        "courseId": course_id,
        "completed": false,
        "lastAccessedAt": "2024-03-01T10:00:00Z",
        "modules": [
            { "moduleId": "m1", "completed": false, "lessons": [
                { "lessonId": "l1", "completed": true },
                { "lessonId": "l2", "completed": false }
            ]}
        ],
        "currentLessonId": "l2",
        "currentModuleId": "m1"
    })
}
