//! services/portal/src/store/ui.rs
//!
//! Transient view state: global loading flag, the active modal and its payload,
//! toast notifications, and the sidebar toggle.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
    /// `None` keeps the notification until it is removed explicitly.
    pub timeout: Option<Duration>,
}

impl Notification {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.timeout
            .map(|timeout| self.created_at + timeout <= now)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UiState {
    pub is_loading: bool,
    pub active_modal: Option<String>,
    pub modal_data: Option<serde_json::Value>,
    pub notifications: Vec<Notification>,
    pub sidebar_open: bool,
}

/// Injectable container for `UiState`, mutated only through its actions.
#[derive(Debug, Default)]
pub struct UiStore {
    state: RwLock<UiState>,
}

impl UiStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> UiState {
        self.state.read().clone()
    }

    pub fn set_loading(&self, loading: bool) {
        self.state.write().is_loading = loading;
    }

    pub fn open_modal(&self, modal_id: impl Into<String>, data: Option<serde_json::Value>) {
        let mut state = self.state.write();
        state.active_modal = Some(modal_id.into());
        state.modal_data = data;
    }

    pub fn close_modal(&self) {
        let mut state = self.state.write();
        state.active_modal = None;
        state.modal_data = None;
    }

    /// Queues a notification and returns its id.
    pub fn add_notification(
        &self,
        kind: NotificationKind,
        message: impl Into<String>,
        timeout: Option<Duration>,
    ) -> String {
        let id = Uuid::new_v4().to_string();
        self.state.write().notifications.push(Notification {
            id: id.clone(),
            kind,
            message: message.into(),
            created_at: Utc::now(),
            timeout,
        });
        id
    }

    pub fn remove_notification(&self, id: &str) {
        self.state.write().notifications.retain(|n| n.id != id);
    }

    pub fn clear_notifications(&self) {
        self.state.write().notifications.clear();
    }

    /// Drops notifications whose timeout has elapsed; returns how many went.
    pub fn prune_expired(&self, now: DateTime<Utc>) -> usize {
        let mut state = self.state.write();
        let before = state.notifications.len();
        state.notifications.retain(|n| !n.is_expired(now));
        before - state.notifications.len()
    }

    pub fn toggle_sidebar(&self) {
        let mut state = self.state.write();
        state.sidebar_open = !state.sidebar_open;
    }

    pub fn set_sidebar_open(&self, open: bool) {
        self.state.write().sidebar_open = open;
    }
}
