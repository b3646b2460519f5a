pub mod session;
pub mod ui;

pub use session::{SessionState, SessionStore};
pub use ui::{Notification, NotificationKind, UiState, UiStore};
