//! Conferencing bridge core.
//!
//! Session lifecycle, capability toggles and permission gating between a
//! native UI shell and an external conferencing SDK.
//! Pure Rust crate with no platform dependencies; consumed through UniFFI.

pub mod bridge;
pub mod camera;
pub mod config;
pub mod controls;
pub mod dispatch;
pub mod errors;
pub mod events;
pub mod permissions;
pub mod provider;
pub mod sdk;
pub mod session;

#[cfg(test)]
mod fake;

pub use bridge::ConferenceBridge;
pub use camera::{CameraEnumerator, CameraProbe};
pub use config::{BridgeConfig, ConfigStore};
pub use controls::CapabilityToggle;
pub use dispatch::{Dispatcher, UiExecutor, UiTask};
pub use errors::BridgeError;
pub use events::{
    BridgeEvent, BridgeEventListener, EventEmitter, ListenerId, SdkState, SessionState,
};
pub use permissions::{Capability, PermissionGate, PermissionPlatform, PermissionState};
pub use provider::{SdkHandle, SdkLease, SdkProvider};
pub use sdk::{
    AudioHelper, ConferencingSdk, JoinParams, Role, SdkConfig, SdkError, SdkSession,
    SdkSessionEvent, VideoHelper,
};
pub use session::{CapabilityHelper, JoinRequest, SessionController, SessionInfo};
