//! services/portal/src/store/session.rs
//!
//! The process-wide session: current user, bearer token and auth-flow flags.
//!
//! `SessionStore` is an injectable container. Its only mutation API is the fixed
//! action set below; every action leaves `is_authenticated() == token.is_some()`.

use course_portal_core::domain::User;
use course_portal_core::ports::TokenStorage;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, warn};

//=========================================================================================
// SessionState
//=========================================================================================

/// A snapshot of the session. `Default` is the logged-out shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub user: Option<User>,
    pub token: Option<String>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl SessionState {
    /// Derived from the token so it can never disagree with it.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn clear_auth(&mut self) {
        self.user = None;
        self.token = None;
    }
}

//=========================================================================================
// SessionStore
//=========================================================================================

pub struct SessionStore {
    state: RwLock<SessionState>,
    storage: Arc<dyn TokenStorage>,
}

impl SessionStore {
    /// Creates a logged-out store. Nothing is read from storage.
    pub fn new(storage: Arc<dyn TokenStorage>) -> Self {
        Self {
            state: RwLock::new(SessionState::default()),
            storage,
        }
    }

    /// Creates the store at process start, seeded from the persisted token.
    /// An unreadable token file is treated as absent.
    pub fn restore(storage: Arc<dyn TokenStorage>) -> Self {
        let token = storage.load().unwrap_or_else(|e| {
            warn!("Ignoring unreadable persisted token: {}", e);
            None
        });
        debug!("Session restored (token present: {})", token.is_some());
        Self {
            state: RwLock::new(SessionState {
                token,
                ..SessionState::default()
            }),
            storage,
        }
    }

    // --- Reads ---

    pub fn snapshot(&self) -> SessionState {
        self.state.read().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.state.read().token.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.state.read().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().is_authenticated()
    }

    // --- Login ---

    pub fn login_start(&self) {
        self.begin();
    }

    pub fn login_success(&self, user: User, token: String) {
        self.authenticate(user, token);
    }

    pub fn login_failure(&self, message: impl Into<String>) {
        self.reject(message.into());
    }

    // --- Registration ---

    pub fn register_start(&self) {
        self.begin();
    }

    pub fn register_success(&self, user: User, token: String) {
        self.authenticate(user, token);
    }

    pub fn register_failure(&self, message: impl Into<String>) {
        self.reject(message.into());
    }

    // --- Logout ---

    /// Clears every field and the persisted token. Safe to call repeatedly.
    pub fn logout(&self) {
        *self.state.write() = SessionState::default();
        self.forget_token();
    }

    // --- Profile Update ---

    pub fn update_user_start(&self) {
        self.begin();
    }

    pub fn update_user_success(&self, user: User) {
        let mut state = self.state.write();
        state.is_loading = false;
        state.user = Some(user);
        state.error = None;
    }

    /// The session stays intact; only the error is surfaced.
    pub fn update_user_failure(&self, message: impl Into<String>) {
        let mut state = self.state.write();
        state.is_loading = false;
        state.error = Some(message.into());
    }

    // --- Startup Auth Check ---

    pub fn check_auth_start(&self) {
        self.state.write().is_loading = true;
    }

    pub fn check_auth_success(&self, user: User) {
        let mut state = self.state.write();
        state.is_loading = false;
        state.user = Some(user);
        state.error = None;
    }

    /// The persisted token is treated as invalid. No user-facing error is set.
    pub fn check_auth_failure(&self) {
        {
            let mut state = self.state.write();
            state.is_loading = false;
            state.clear_auth();
        }
        self.forget_token();
    }

    pub fn clear_error(&self) {
        self.state.write().error = None;
    }

    //=====================================================================================
    // Shared transitions
    //=====================================================================================

    fn begin(&self) {
        let mut state = self.state.write();
        state.is_loading = true;
        state.error = None;
    }

    fn authenticate(&self, user: User, token: String) {
        if let Err(e) = self.storage.save(&token) {
            warn!("Failed to persist auth token: {}", e);
        }
        let mut state = self.state.write();
        state.is_loading = false;
        state.user = Some(user);
        state.token = Some(token);
        state.error = None;
    }

    fn reject(&self, message: String) {
        let mut state = self.state.write();
        state.is_loading = false;
        state.clear_auth();
        state.error = Some(message);
    }

    fn forget_token(&self) {
        if let Err(e) = self.storage.clear() {
            warn!("Failed to remove persisted auth token: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryTokenStorage;
    use chrono::Utc;
    use course_portal_core::domain::Role;
    use course_portal_core::ports::{PortError, PortResult};
    use mockall::mock;

    mock! {
        Storage {}
        impl TokenStorage for Storage {
            fn load(&self) -> PortResult<Option<String>>;
            fn save(&self, token: &str) -> PortResult<()>;
            fn clear(&self) -> PortResult<()>;
        }
    }

    fn user() -> User {
        User {
            id: "u1".to_string(),
            email: "ada@example.com".to_string(),
            name: "Ada".to_string(),
            avatar_url: None,
            role: Role::Student,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn store() -> (Arc<MemoryTokenStorage>, SessionStore) {
        let storage = Arc::new(MemoryTokenStorage::new());
        let store = SessionStore::new(storage.clone());
        (storage, store)
    }

    fn assert_invariant(store: &SessionStore) {
        let state = store.snapshot();
        assert_eq!(state.is_authenticated(), state.token.is_some());
        assert_eq!(store.is_authenticated(), store.token().is_some());
    }

    #[test]
    fn login_then_logout_returns_to_initial_shape() {
        let (storage, store) = store();
        let initial = store.snapshot();

        store.login_start();
        store.login_success(user(), "tok-1".to_string());
        assert!(store.is_authenticated());
        assert_eq!(storage.load().unwrap().as_deref(), Some("tok-1"));

        store.logout();
        assert_eq!(store.snapshot(), initial);
        assert_eq!(store.snapshot(), SessionState::default());
        assert_eq!(storage.load().unwrap(), None);

        // Idempotent.
        store.logout();
        assert_eq!(store.snapshot(), initial);
    }

    #[test]
    fn invariant_holds_across_every_action() {
        let (_storage, store) = store();
        let steps: Vec<Box<dyn Fn(&SessionStore)>> = vec![
            Box::new(|s| s.login_start()),
            Box::new(|s| s.login_failure("bad password")),
            Box::new(|s| s.register_start()),
            Box::new(|s| s.register_success(user(), "tok-2".to_string())),
            Box::new(|s| s.update_user_start()),
            Box::new(|s| s.update_user_failure("name too short")),
            Box::new(|s| s.update_user_success(user())),
            Box::new(|s| s.check_auth_start()),
            Box::new(|s| s.check_auth_success(user())),
            Box::new(|s| s.check_auth_failure()),
            Box::new(|s| s.login_success(user(), "tok-3".to_string())),
            Box::new(|s| s.register_failure("email taken")),
            Box::new(|s| s.logout()),
        ];
        assert_invariant(&store);
        for step in steps {
            step(&store);
            assert_invariant(&store);
        }
    }

    #[test]
    fn login_failure_records_error_and_clears_auth() {
        let (_storage, store) = store();
        store.login_success(user(), "tok".to_string());
        store.login_start();
        assert!(store.snapshot().is_loading);

        store.login_failure("Invalid credentials");
        let state = store.snapshot();
        assert!(!state.is_loading);
        assert!(state.user.is_none());
        assert!(!state.is_authenticated());
        assert_eq!(state.error.as_deref(), Some("Invalid credentials"));
    }

    #[test]
    fn failed_auth_check_drops_persisted_token_silently() {
        let storage = Arc::new(MemoryTokenStorage::with_token("stale"));
        let store = SessionStore::restore(storage.clone());
        assert!(store.is_authenticated());

        store.check_auth_start();
        store.check_auth_failure();

        let state = store.snapshot();
        assert!(!state.is_authenticated());
        assert!(state.error.is_none());
        assert_eq!(storage.load().unwrap(), None);
    }

    #[test]
    fn profile_failure_keeps_the_session() {
        let (_storage, store) = store();
        store.login_success(user(), "tok".to_string());
        store.update_user_start();
        store.update_user_failure("rejected");

        let state = store.snapshot();
        assert!(state.is_authenticated());
        assert!(state.user.is_some());
        assert_eq!(state.error.as_deref(), Some("rejected"));
    }

    #[test]
    fn storage_failures_never_abort_a_transition() {
        let mut storage = MockStorage::new();
        storage
            .expect_load()
            .times(1)
            .returning(|| Err(PortError::Unexpected("disk unreadable".to_string())));
        storage
            .expect_save()
            .times(1)
            .returning(|_| Err(PortError::Unexpected("disk full".to_string())));
        storage
            .expect_clear()
            .times(1)
            .returning(|| Err(PortError::Unexpected("read-only".to_string())));

        let store = SessionStore::restore(Arc::new(storage));
        assert_eq!(store.snapshot(), SessionState::default());

        store.login_success(user(), "tok".to_string());
        assert!(store.is_authenticated());

        store.logout();
        assert_eq!(store.snapshot(), SessionState::default());
    }
}
