//! Boundary with the external conferencing SDK.
//!
//! The SDK is an opaque capability provider: it owns media transport,
//! signaling and encryption. This crate only decides when and whether to
//! call into it. Platform shells implement these traits over the native SDK
//! and complete each future from the SDK's own completion callback.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// Default SDK domain.
pub const DEFAULT_SDK_DOMAIN: &str = "zoom.us";

/// Raw error reported by the SDK. Re-classified before leaving the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkError {
    pub code: String,
    pub message: String,
}

impl SdkError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// `code` alone, or `code: message` when the SDK gave a message.
    pub fn describe(&self) -> String {
        if self.message.is_empty() {
            self.code.clone()
        } else {
            format!("{}: {}", self.code, self.message)
        }
    }
}

/// Parameters handed to the SDK's native init entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkConfig {
    pub domain: String,
    pub app_key: Option<String>,
    pub enable_log: bool,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            domain: DEFAULT_SDK_DOMAIN.to_string(),
            app_key: None,
            enable_log: true,
        }
    }
}

/// Role of the local user in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Participant,
    Host,
}

impl Role {
    /// Map the numeric role type used by UI commands (0 participant, 1 host).
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Participant),
            1 => Some(Self::Host),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Participant => 0,
            Self::Host => 1,
        }
    }
}

/// Validated join request passed to [`ConferencingSdk::join_session`].
#[derive(Clone, PartialEq, Eq)]
pub struct JoinParams {
    pub session_name: String,
    pub token: String,
    pub user_name: String,
    pub identity: Option<String>,
    pub role: Role,
}

// The token is a credential and must never reach the logs.
impl fmt::Debug for JoinParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinParams")
            .field("session_name", &self.session_name)
            .field("token", &"<redacted>")
            .field("user_name", &self.user_name)
            .field("identity", &self.identity)
            .field("role", &self.role)
            .finish()
    }
}

/// Asynchronous notifications the SDK raises for a joined session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkSessionEvent {
    /// The session ended without a local `leave` (host ended it, network loss).
    Ended { reason: String },
}

/// Process-wide entry points of the SDK.
#[async_trait]
pub trait ConferencingSdk: Send + Sync {
    /// Whether the native SDK library is present in this build.
    fn is_available(&self) -> bool;

    async fn initialize(&self, config: &SdkConfig) -> Result<(), SdkError>;

    async fn join_session(&self, params: JoinParams) -> Result<Arc<dyn SdkSession>, SdkError>;

    /// Release the SDK instance. Called once by `SdkProvider::teardown`.
    fn cleanup(&self);
}

/// A joined session as exposed by the SDK.
#[async_trait]
pub trait SdkSession: Send + Sync {
    async fn leave(&self, end_session: bool) -> Result<(), SdkError>;

    fn audio_helper(&self) -> Option<Arc<dyn AudioHelper>>;

    fn video_helper(&self) -> Option<Arc<dyn VideoHelper>>;

    /// Session event stream. Taken once, right after the join completes.
    fn events(&self) -> Option<BoxStream<'static, SdkSessionEvent>> {
        None
    }
}

#[async_trait]
pub trait AudioHelper: Send + Sync {
    async fn mute(&self) -> Result<(), SdkError>;
    async fn unmute(&self) -> Result<(), SdkError>;
}

#[async_trait]
pub trait VideoHelper: Send + Sync {
    async fn start_video(&self) -> Result<(), SdkError>;
    async fn stop_video(&self) -> Result<(), SdkError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_codes() {
        assert_eq!(Role::from_code(0), Some(Role::Participant));
        assert_eq!(Role::from_code(1), Some(Role::Host));
        assert_eq!(Role::from_code(7), None);
        assert_eq!(Role::Host.code(), 1);
    }

    #[test]
    fn join_params_debug_redacts_token() {
        let params = JoinParams {
            session_name: "room1".into(),
            token: "secret-jwt".into(),
            user_name: "alice".into(),
            identity: None,
            role: Role::Participant,
        };
        let dbg = format!("{params:?}");
        assert!(dbg.contains("room1"));
        assert!(!dbg.contains("secret-jwt"));
    }

    #[test]
    fn default_sdk_config() {
        let cfg = SdkConfig::default();
        assert_eq!(cfg.domain, "zoom.us");
        assert!(cfg.enable_log);
        assert_eq!(cfg.app_key, None);
    }
}
