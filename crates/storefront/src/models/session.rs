//! Session-stored data outside client storage.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

/// Session keys.
pub mod keys {
    /// Key holding the visitor's client storage map.
    pub const CLIENT_STORAGE: &str = "client_storage";

    /// Key for the pending contact form captcha.
    pub const CONTACT_CAPTCHA: &str = "contact_captcha";

    /// Key for the one-shot notice shown after a redirect.
    pub const FLASH: &str = "flash";
}

/// Tone of a [`Flash`] notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

/// A notice carried across one redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    /// Success notice.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    /// Error notice.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    /// CSS class for the toast.
    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        match self.kind {
            FlashKind::Success => "toast toast-success",
            FlashKind::Error => "toast toast-error",
        }
    }

    /// Queue this notice for the next page view. Failures are logged.
    pub async fn push(self, session: &Session) {
        if let Err(e) = session.insert(keys::FLASH, self).await {
            tracing::warn!(error = %e, "failed to store flash notice");
        }
    }

    /// Take the queued notice, if any.
    pub async fn take(session: &Session) -> Option<Self> {
        session.remove::<Self>(keys::FLASH).await.ok().flatten()
    }
}
