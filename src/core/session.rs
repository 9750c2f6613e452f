//! Connection session - where and as whom to talk to Nimbus

use serde::{Deserialize, Serialize};

/// Session credentials for one Nimbus connection.
///
/// Obtained from a successful authentication elsewhere; this crate only
/// carries them to the HTTP layer.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub base_url: String,
    pub user_id: Option<i32>,
    pub auth_token: Option<String>,
}

impl Session {
    /// Create a session without credentials
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            user_id: None,
            auth_token: None,
        }
    }

    pub fn with_user_id(mut self, user_id: i32) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Identify the connection without exposing credentials
    pub fn connection_key(&self) -> String {
        match self.user_id {
            Some(id) => format!("{}#{}", self.base_url.trim_end_matches('/'), id),
            None => self.base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.base_url)
            .field("user_id", &self.user_id)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
