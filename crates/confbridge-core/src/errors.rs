use thiserror::Error;

use crate::permissions::Capability;
use crate::sdk::SdkError;

/// Classified failure of a bridge command.
///
/// Raw [`SdkError`] values are converted into one of these variants at the
/// SDK boundary and never reach callers directly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("another session transition is in progress")]
    OperationInProgress,
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("conferencing SDK unavailable: {0}")]
    SdkUnavailable(String),
    #[error("SDK initialization failed: {0}")]
    SdkInitError(String),
    #[error("join failed: {0}")]
    JoinFailed(String),
    #[error("leave failed: {0}")]
    LeaveFailed(String),
    #[error("{0} permission denied")]
    PermissionDenied(Capability),
    #[error("{0} permission pending")]
    PermissionPending(Capability),
    #[error("{0} unavailable, rejoin the session")]
    CapabilityUnavailable(Capability),
    #[error("toggle failed: {0}")]
    ToggleFailed(String),
    #[error("no camera hardware")]
    NoCameraHardware,
    #[error("internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Stable code reported to the UI layer.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArguments(_) => "INVALID_ARGUMENTS",
            Self::OperationInProgress => "OPERATION_IN_PROGRESS",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::SdkUnavailable(_) => "SDK_UNAVAILABLE",
            Self::SdkInitError(_) => "SDK_INIT_ERROR",
            Self::JoinFailed(_) => "JOIN_FAILED",
            Self::LeaveFailed(_) => "LEAVE_FAILED",
            Self::PermissionDenied(_) => "PERMISSION_DENIED",
            Self::PermissionPending(_) => "PERMISSION_PENDING",
            Self::CapabilityUnavailable(_) => "CAPABILITY_UNAVAILABLE",
            Self::ToggleFailed(_) => "TOGGLE_FAILED",
            Self::NoCameraHardware => "NO_CAMERA_HARDWARE",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Whether the same command may succeed if issued again unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::OperationInProgress
                | Self::SdkInitError(_)
                | Self::JoinFailed(_)
                | Self::LeaveFailed(_)
                | Self::ToggleFailed(_)
        )
    }

    /// Whether the user has to act (grant a permission) before a retry helps.
    pub fn requires_user_action(&self) -> bool {
        matches!(self, Self::PermissionDenied(_) | Self::PermissionPending(_))
    }

    pub(crate) fn init_failed(e: SdkError) -> Self {
        Self::SdkInitError(e.describe())
    }

    pub(crate) fn join_failed(e: SdkError) -> Self {
        Self::JoinFailed(e.describe())
    }

    pub(crate) fn leave_failed(e: SdkError) -> Self {
        Self::LeaveFailed(e.describe())
    }

    pub(crate) fn toggle_failed(e: SdkError) -> Self {
        Self::ToggleFailed(e.describe())
    }
}
