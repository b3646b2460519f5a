//! services/portal/src/controllers/auth.rs
//!
//! Login, registration, logout, start-up token validation and profile edits.
//! Every flow drives the session action set and reports its outcome as a
//! notification.

use super::view::describe;
use crate::api::{auth, PortalApi};
use crate::store::{NotificationKind, SessionStore, UiStore};
use course_portal_core::domain::{
    AuthResponse, LoginCredentials, ProfileUpdate, RegisterCredentials, User,
};
use course_portal_core::ports::PortResult;
use std::sync::Arc;
use tracing::{info, warn};

pub struct AuthController {
    api: PortalApi,
    ui: Arc<UiStore>,
    notification_timeout: Option<chrono::Duration>,
}

impl AuthController {
    pub fn new(api: PortalApi, ui: Arc<UiStore>, notification_timeout: std::time::Duration) -> Self {
        Self {
            api,
            ui,
            notification_timeout: chrono::Duration::from_std(notification_timeout).ok(),
        }
    }

    fn session(&self) -> &Arc<SessionStore> {
        self.api.session()
    }

    fn notify(&self, kind: NotificationKind, message: impl Into<String>) {
        self.ui.add_notification(kind, message, self.notification_timeout);
    }

    pub async fn login(&self, credentials: &LoginCredentials) -> PortResult<User> {
        self.session().login_start();
        let result = match auth::login(credentials) {
            Ok(def) => self.api.run(def).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(AuthResponse { user, token }) => {
                info!("Logged in as {}", user.email);
                self.session().login_success(user.clone(), token);
                self.notify(NotificationKind::Success, format!("Welcome back, {}!", user.name));
                Ok(user)
            }
            Err(e) => {
                let message = describe(&e);
                self.session().login_failure(message.clone());
                self.notify(NotificationKind::Error, message);
                Err(e)
            }
        }
    }

    pub async fn register(&self, credentials: &RegisterCredentials) -> PortResult<User> {
        self.session().register_start();
        let result = match auth::register(credentials) {
            Ok(def) => self.api.run(def).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(AuthResponse { user, token }) => {
                info!("Registered {} as {}", user.email, user.role.as_str());
                self.session().register_success(user.clone(), token);
                self.notify(NotificationKind::Success, "Account created");
                Ok(user)
            }
            Err(e) => {
                let message = describe(&e);
                self.session().register_failure(message.clone());
                self.notify(NotificationKind::Error, message);
                Err(e)
            }
        }
    }

    /// Always ends logged out with an empty cache, even if the backend call fails.
    pub async fn logout(&self) {
        if self.session().token().is_some() {
            if let Err(e) = self.api.run(auth::logout()).await {
                warn!("Backend logout failed, clearing the local session anyway: {}", e);
            }
        }
        self.session().logout();
        self.api.cache().reset();
        self.notify(NotificationKind::Info, "You have been logged out");
    }

    /// Validates a persisted token at start-up. An invalid token is dropped
    /// silently. Returns the signed-in user, if any.
    pub async fn check_auth(&self) -> Option<User> {
        self.session().token()?;
        self.session().check_auth_start();
        match self.api.fetch(auth::me()).await {
            Ok(user) => {
                let user = user.as_ref().clone();
                info!("Session restored for {}", user.email);
                self.session().check_auth_success(user.clone());
                Some(user)
            }
            Err(e) => {
                warn!("Persisted token rejected: {}", e);
                self.session().check_auth_failure();
                None
            }
        }
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> PortResult<User> {
        self.session().update_user_start();
        let result = match auth::update_profile(update) {
            Ok(def) => self.api.run(def).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(user) => {
                self.session().update_user_success(user.clone());
                self.notify(NotificationKind::Success, "Profile updated");
                Ok(user)
            }
            Err(e) => {
                let message = describe(&e);
                self.session().update_user_failure(message.clone());
                self.notify(NotificationKind::Error, message);
                Err(e)
            }
        }
    }
}
