use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use uuid::Uuid;

use crate::errors::BridgeError;
use crate::events::{BridgeEvent, EventEmitter, SessionState};
use crate::permissions::Capability;
use crate::provider::{SdkLease, SdkProvider};
use crate::sdk::{
    AudioHelper, JoinParams, Role, SdkConfig, SdkSession, SdkSessionEvent, VideoHelper,
};

/// Join arguments as received from the UI. Validated by [`SessionController::join`].
#[derive(Clone, Default)]
pub struct JoinRequest {
    pub session_name: Option<String>,
    pub token: Option<String>,
    pub user_name: Option<String>,
    pub identity: Option<String>,
    pub role: i32,
}

impl JoinRequest {
    pub fn new(
        session_name: impl Into<String>,
        token: impl Into<String>,
        user_name: impl Into<String>,
    ) -> Self {
        Self {
            session_name: Some(session_name.into()),
            token: Some(token.into()),
            user_name: Some(user_name.into()),
            identity: None,
            role: Role::Participant.code(),
        }
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    pub fn with_role(mut self, role: i32) -> Self {
        self.role = role;
        self
    }

    fn validate(self) -> Result<JoinParams, BridgeError> {
        fn required(value: Option<String>, name: &str) -> Result<String, BridgeError> {
            match value {
                Some(v) if !v.trim().is_empty() => Ok(v),
                _ => Err(BridgeError::InvalidArguments(format!("{name} is required"))),
            }
        }

        let session_name = required(self.session_name, "sessionName")?;
        let token = required(self.token, "token")?;
        let user_name = required(self.user_name, "userName")?;
        let role = Role::from_code(self.role).ok_or_else(|| {
            BridgeError::InvalidArguments(format!("unknown role {}", self.role))
        })?;

        Ok(JoinParams {
            session_name,
            token,
            user_name,
            identity: self.identity.filter(|id| !id.trim().is_empty()),
            role,
        })
    }
}

impl fmt::Debug for JoinRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinRequest")
            .field("session_name", &self.session_name)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("user_name", &self.user_name)
            .field("identity", &self.identity)
            .field("role", &self.role)
            .finish()
    }
}

/// Snapshot of the active session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: Uuid,
    pub session_name: String,
    pub user_name: String,
    pub identity: Option<String>,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

/// A joined session and the capability helpers captured at join time.
struct ActiveSession {
    info: SessionInfo,
    sdk_session: Arc<dyn SdkSession>,
    audio: Option<Arc<dyn AudioHelper>>,
    video: Option<Arc<dyn VideoHelper>>,
    _lease: SdkLease,
}

/// Back-reference to a capability of the active session.
///
/// Usable only while the controller is `Active` on the session the helper
/// was issued for. During a leave, after the session is discarded, or once
/// the controller is gone, every call fails with `CapabilityUnavailable`
/// instead of reaching the SDK.
#[derive(Clone)]
pub struct CapabilityHelper {
    capability: Capability,
    session_id: Uuid,
    controller: Weak<Mutex<ControllerState>>,
}

impl CapabilityHelper {
    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn is_stale(&self) -> bool {
        self.live_session().is_none()
    }

    fn live_session(&self) -> Option<Arc<ActiveSession>> {
        let controller = self.controller.upgrade()?;
        let inner = lock(&controller);
        let session = match &inner.session {
            Some(s) if inner.state == SessionState::Active && s.info.id == self.session_id => {
                Some(s.clone())
            }
            _ => None,
        };
        session
    }

    /// Unmute/mute the microphone or start/stop the camera.
    pub async fn set_enabled(&self, enabled: bool) -> Result<(), BridgeError> {
        let unavailable = BridgeError::CapabilityUnavailable(self.capability);
        let session = self.live_session().ok_or_else(|| unavailable.clone())?;
        let result = match self.capability {
            Capability::Microphone => {
                let audio = session.audio.clone().ok_or(unavailable)?;
                drop(session);
                if enabled { audio.unmute().await } else { audio.mute().await }
            }
            Capability::Camera => {
                let video = session.video.clone().ok_or(unavailable)?;
                drop(session);
                if enabled { video.start_video().await } else { video.stop_video().await }
            }
        };
        result.map_err(BridgeError::toggle_failed)
    }
}

struct ControllerState {
    state: SessionState,
    session: Option<Arc<ActiveSession>>,
    // The SDK ended the session while a leave was in flight.
    ended_remotely: bool,
}

/// Manages membership of one conferencing session.
///
/// `Idle -> Joining -> Active -> Leaving -> Idle`. A failed join returns to
/// `Idle`; a failed leave returns to `Active` because the SDK may still
/// consider the session live. Calls made while a join or leave is in flight
/// are rejected with `OperationInProgress`.
pub struct SessionController {
    provider: Arc<SdkProvider>,
    sdk_config: SdkConfig,
    emitter: EventEmitter,
    inner: Arc<Mutex<ControllerState>>,
}

impl SessionController {
    pub fn new(provider: Arc<SdkProvider>, sdk_config: SdkConfig, emitter: EventEmitter) -> Self {
        Self {
            provider,
            sdk_config,
            emitter,
            inner: Arc::new(Mutex::new(ControllerState {
                state: SessionState::Idle,
                session: None,
                ended_remotely: false,
            })),
        }
    }

    pub fn state(&self) -> SessionState {
        lock(&self.inner).state
    }

    pub fn session_info(&self) -> Option<SessionInfo> {
        let inner = lock(&self.inner);
        match inner.state {
            SessionState::Active => inner.session.as_ref().map(|s| s.info.clone()),
            _ => None,
        }
    }

    /// Capability helper of the active session, if the SDK exposed one.
    pub fn helper(&self, capability: Capability) -> Option<CapabilityHelper> {
        let inner = lock(&self.inner);
        if inner.state != SessionState::Active {
            return None;
        }
        let session = inner.session.as_ref()?;
        let present = match capability {
            Capability::Microphone => session.audio.is_some(),
            Capability::Camera => session.video.is_some(),
        };
        present.then(|| CapabilityHelper {
            capability,
            session_id: session.info.id,
            controller: Arc::downgrade(&self.inner),
        })
    }

    /// Join a session, initializing the SDK first if needed.
    pub async fn join(&self, request: JoinRequest) -> Result<(), BridgeError> {
        let params = request.validate()?;
        let transition = self.begin(SessionState::Idle, SessionState::Joining)?;

        let lease = self.provider.acquire(&self.sdk_config).await?;

        tracing::info!(session = %params.session_name, user = %params.user_name, "joining session");
        let sdk_session = match lease.handle().join_session(params.clone()).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(session = %params.session_name, "join failed: {}", e.describe());
                return Err(BridgeError::join_failed(e));
            }
        };

        let events = sdk_session.events();
        let session = Arc::new(ActiveSession {
            info: SessionInfo {
                id: Uuid::new_v4(),
                session_name: params.session_name,
                user_name: params.user_name,
                identity: params.identity,
                role: params.role,
                joined_at: Utc::now(),
            },
            audio: sdk_session.audio_helper(),
            video: sdk_session.video_helper(),
            sdk_session,
            _lease: lease,
        });
        if session.audio.is_none() || session.video.is_none() {
            tracing::warn!(
                audio = session.audio.is_some(),
                video = session.video.is_some(),
                "session joined without all capability helpers"
            );
        }

        let id = session.info.id;
        transition.finish(|inner| {
            inner.state = SessionState::Active;
            inner.session = Some(session);
            inner.ended_remotely = false;
        });
        tracing::info!(%id, "session active");

        if let Some(events) = events {
            let inner = self.inner.clone();
            let emitter = self.emitter.clone();
            tokio::spawn(async move {
                Self::event_loop(events, id, inner, emitter).await;
            });
        }
        Ok(())
    }

    /// Leave the session without ending it for other participants.
    pub async fn leave(&self) -> Result<(), BridgeError> {
        self.leave_with(false).await
    }

    /// Leave the session; `end_session` ends it for everyone (host only).
    ///
    /// A no-op success when no session is joined.
    pub async fn leave_with(&self, end_session: bool) -> Result<(), BridgeError> {
        let session = {
            let mut inner = lock(&self.inner);
            if inner.state == SessionState::Idle {
                tracing::debug!("leave requested while idle, nothing to do");
                return Ok(());
            }
            Self::check_transition(&inner, SessionState::Active, SessionState::Leaving)?;
            inner.state = SessionState::Leaving;
            inner.session.clone()
        };
        let transition = self.transition(SessionState::Active, SessionState::Leaving);
        let Some(session) = session else {
            return Err(BridgeError::Internal("active state without a session".into()));
        };

        tracing::info!(id = %session.info.id, end_session, "leaving session");
        let sdk_session = session.sdk_session.clone();
        drop(session);
        match sdk_session.leave(end_session).await {
            Ok(()) => {
                transition.finish(|inner| {
                    inner.state = SessionState::Idle;
                    inner.session = None;
                    inner.ended_remotely = false;
                });
                tracing::info!("session left");
                Ok(())
            }
            Err(e) => {
                if transition.revert() == SessionState::Idle {
                    tracing::info!("leave failed after the SDK ended the session: {}", e.describe());
                    return Ok(());
                }
                tracing::warn!("leave failed, session still active: {}", e.describe());
                Err(BridgeError::leave_failed(e))
            }
        }
    }

    /// Best-effort leave before the process releases the SDK.
    ///
    /// Failures are logged only; there is no caller left to report to.
    pub async fn shutdown(&self) {
        if self.state() != SessionState::Active {
            return;
        }
        if let Err(e) = self.leave().await {
            tracing::warn!("leave during shutdown failed: {e}");
        }
    }

    fn begin(&self, from: SessionState, to: SessionState) -> Result<Transition, BridgeError> {
        {
            let mut inner = lock(&self.inner);
            Self::check_transition(&inner, from, to)?;
            inner.state = to;
        }
        Ok(self.transition(from, to))
    }

    fn check_transition(
        inner: &ControllerState,
        from: SessionState,
        to: SessionState,
    ) -> Result<(), BridgeError> {
        if inner.state.is_transitioning() {
            tracing::debug!("{to:?} rejected, {:?} in progress", inner.state);
            return Err(BridgeError::OperationInProgress);
        }
        if inner.state != from {
            return Err(BridgeError::InvalidState(format!(
                "cannot move to {to:?} from {:?}",
                inner.state
            )));
        }
        Ok(())
    }

    /// Announce a state change already written under the lock.
    fn transition(&self, from: SessionState, to: SessionState) -> Transition {
        self.emitter.emit(BridgeEvent::SessionStateChanged(to));
        Transition {
            inner: self.inner.clone(),
            emitter: self.emitter.clone(),
            during: to,
            revert_to: from,
            finished: false,
        }
    }

    async fn event_loop(
        mut events: BoxStream<'static, SdkSessionEvent>,
        id: Uuid,
        inner: Arc<Mutex<ControllerState>>,
        emitter: EventEmitter,
    ) {
        while let Some(event) = events.next().await {
            match event {
                SdkSessionEvent::Ended { reason } => {
                    let (ended, deferred) = {
                        let mut state = lock(&inner);
                        let current = state.session.as_ref().is_some_and(|s| s.info.id == id);
                        match state.state {
                            SessionState::Active if current => {
                                state.state = SessionState::Idle;
                                state.session = None;
                                (true, false)
                            }
                            // applied when the in-flight leave settles
                            SessionState::Leaving if current => {
                                state.ended_remotely = true;
                                (false, true)
                            }
                            _ => (false, false),
                        }
                    };
                    if ended {
                        tracing::info!(%id, "session ended by SDK: {reason}");
                        emitter.emit(BridgeEvent::SessionStateChanged(SessionState::Idle));
                    } else if deferred {
                        tracing::info!(%id, "session ended by SDK during leave: {reason}");
                    } else {
                        tracing::debug!(%id, "ignoring end of non-active session: {reason}");
                    }
                    break;
                }
            }
        }
        tracing::debug!(%id, "session event loop ended");
    }
}

/// An in-flight join or leave. Reverts the state unless finished, so a
/// failed or dropped operation never leaves the controller stuck.
struct Transition {
    inner: Arc<Mutex<ControllerState>>,
    emitter: EventEmitter,
    during: SessionState,
    revert_to: SessionState,
    finished: bool,
}

impl Transition {
    fn finish(mut self, apply: impl FnOnce(&mut ControllerState)) {
        let state = {
            let mut inner = lock(&self.inner);
            apply(&mut inner);
            inner.state
        };
        self.finished = true;
        self.emitter.emit(BridgeEvent::SessionStateChanged(state));
    }

    /// Undo the transition and return the state it settled in. A session
    /// the SDK ended during a leave is discarded instead of going back to
    /// `Active`.
    fn revert(mut self) -> SessionState {
        self.finished = true;
        self.undo()
    }

    fn undo(&self) -> SessionState {
        let target = {
            let mut inner = lock(&self.inner);
            if inner.state != self.during {
                return inner.state;
            }
            let target = if self.revert_to == SessionState::Active && inner.ended_remotely {
                SessionState::Idle
            } else {
                self.revert_to
            };
            inner.state = target;
            if target == SessionState::Idle {
                inner.session = None;
                inner.ended_remotely = false;
            }
            target
        };
        self.emitter.emit(BridgeEvent::SessionStateChanged(target));
        target
    }
}

impl Drop for Transition {
    fn drop(&mut self) {
        if !self.finished {
            self.undo();
        }
    }
}

fn lock(inner: &Mutex<ControllerState>) -> MutexGuard<'_, ControllerState> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::SdkState;
    use crate::events::tests::EventCapture;
    use crate::fake::{FakeSdk, wait_until};
    use crate::sdk::SdkError;

    fn controller(sdk: &Arc<FakeSdk>) -> Arc<SessionController> {
        let provider = Arc::new(SdkProvider::new(sdk.clone()));
        Arc::new(SessionController::new(
            provider,
            SdkConfig::default(),
            EventEmitter::new(),
        ))
    }

    fn request() -> JoinRequest {
        JoinRequest::new("room1", "tok", "alice")
    }

    #[tokio::test]
    async fn join_initializes_sdk_then_becomes_active() {
        let sdk = FakeSdk::new();
        let provider = Arc::new(SdkProvider::new(sdk.clone()));
        let emitter = EventEmitter::new();
        let capture = Arc::new(EventCapture::default());
        emitter.add_listener(capture.clone());
        provider.add_listener(capture.clone());
        let controller = SessionController::new(provider.clone(), SdkConfig::default(), emitter);

        controller
            .join(JoinRequest::new("room1", "tok", "alice").with_role(0))
            .await
            .unwrap();

        assert_eq!(provider.state(), SdkState::Ready);
        assert_eq!(controller.state(), SessionState::Active);
        assert_eq!(
            capture.snapshot(),
            vec![
                BridgeEvent::SessionStateChanged(SessionState::Joining),
                BridgeEvent::SdkStateChanged(SdkState::Initializing),
                BridgeEvent::SdkStateChanged(SdkState::Ready),
                BridgeEvent::SessionStateChanged(SessionState::Active),
            ]
        );
        let info = controller.session_info().unwrap();
        assert_eq!(info.session_name, "room1");
        assert_eq!(info.role, Role::Participant);
    }

    #[tokio::test]
    async fn empty_arguments_are_rejected_without_transition() {
        let sdk = FakeSdk::new();
        let controller = controller(&sdk);

        for bad in [
            JoinRequest::new("", "tok", "alice"),
            JoinRequest::new("room1", "  ", "alice"),
            JoinRequest { user_name: None, ..request() },
            request().with_role(9),
        ] {
            let err = controller.join(bad).await.err().unwrap();
            assert!(matches!(err, BridgeError::InvalidArguments(_)));
        }

        assert_eq!(controller.state(), SessionState::Idle);
        assert_eq!(controller.provider.state(), SdkState::Uninitialized);
        assert_eq!(sdk.init_calls.get(), 0);
    }

    #[tokio::test]
    async fn join_params_reach_sdk() {
        let sdk = FakeSdk::new();
        let controller = controller(&sdk);

        controller
            .join(request().with_identity("alice@example.com").with_role(1))
            .await
            .unwrap();

        let params = sdk.last_params().unwrap();
        assert_eq!(params.session_name, "room1");
        assert_eq!(params.token, "tok");
        assert_eq!(params.identity.as_deref(), Some("alice@example.com"));
        assert_eq!(params.role, Role::Host);
    }

    #[tokio::test]
    async fn joins_while_joining_are_rejected() {
        let sdk = FakeSdk::new();
        sdk.join_gate.hold();
        let controller = controller(&sdk);

        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.join(request()).await })
        };
        wait_until(|| sdk.join_calls.get() == 1).await;
        assert_eq!(controller.state(), SessionState::Joining);

        for _ in 0..5 {
            assert_eq!(
                controller.join(request()).await,
                Err(BridgeError::OperationInProgress)
            );
        }
        assert_eq!(controller.leave().await, Err(BridgeError::OperationInProgress));

        sdk.join_gate.release();
        first.await.unwrap().unwrap();
        assert_eq!(sdk.join_calls.get(), 1);
        assert_eq!(controller.state(), SessionState::Active);
    }

    #[tokio::test]
    async fn failed_join_returns_to_idle_and_can_be_retried() {
        let sdk = FakeSdk::new();
        sdk.push_join_result(Err(SdkError::new("AUTH", "")));
        let controller = controller(&sdk);

        let err = controller.join(request()).await.err().unwrap();
        assert_eq!(err, BridgeError::JoinFailed("AUTH".into()));
        assert_eq!(controller.state(), SessionState::Idle);
        assert!(controller.helper(Capability::Microphone).is_none());
        assert!(controller.helper(Capability::Camera).is_none());
        assert!(controller.session_info().is_none());

        controller.join(request()).await.unwrap();
        assert_eq!(controller.state(), SessionState::Active);
        assert_eq!(sdk.join_calls.get(), 2);
    }

    #[tokio::test]
    async fn sdk_init_failure_fails_join() {
        let sdk = FakeSdk::new();
        sdk.push_init_result(Err(SdkError::new("BAD_DOMAIN", "")));
        let controller = controller(&sdk);

        let err = controller.join(request()).await.err().unwrap();
        assert_eq!(err, BridgeError::SdkInitError("BAD_DOMAIN".into()));
        assert_eq!(controller.state(), SessionState::Idle);
        assert_eq!(sdk.join_calls.get(), 0);
    }

    #[tokio::test]
    async fn join_while_active_is_invalid() {
        let sdk = FakeSdk::new();
        let controller = controller(&sdk);
        controller.join(request()).await.unwrap();

        let err = controller.join(request()).await.err().unwrap();
        assert!(matches!(err, BridgeError::InvalidState(_)));
        assert_eq!(controller.state(), SessionState::Active);
    }

    #[tokio::test]
    async fn leave_while_idle_does_not_reach_sdk() {
        let sdk = FakeSdk::new();
        let controller = controller(&sdk);

        controller.leave().await.unwrap();

        assert_eq!(controller.state(), SessionState::Idle);
        assert_eq!(sdk.init_calls.get(), 0);
    }

    #[tokio::test]
    async fn leave_discards_session_and_helpers() {
        let sdk = FakeSdk::new();
        let controller = controller(&sdk);
        controller.join(request()).await.unwrap();
        let helper = controller.helper(Capability::Camera).unwrap();

        controller.leave_with(true).await.unwrap();

        let session = sdk.session();
        assert_eq!(session.leave_calls.get(), 1);
        assert!(session.ended_for_all.load(std::sync::atomic::Ordering::SeqCst));
        assert_eq!(controller.state(), SessionState::Idle);
        assert!(helper.is_stale());
        assert_eq!(
            helper.set_enabled(true).await,
            Err(BridgeError::CapabilityUnavailable(Capability::Camera))
        );
        assert_eq!(session.video.as_ref().unwrap().start_calls.get(), 0);
    }

    #[tokio::test]
    async fn failed_leave_keeps_session_active() {
        let sdk = FakeSdk::new();
        let controller = controller(&sdk);
        controller.join(request()).await.unwrap();
        sdk.session().push_leave_result(Err(SdkError::new("NETWORK", "timeout")));

        let err = controller.leave().await.err().unwrap();

        assert_eq!(err, BridgeError::LeaveFailed("NETWORK: timeout".into()));
        assert_eq!(controller.state(), SessionState::Active);
        assert!(controller.helper(Capability::Microphone).is_some());

        controller.leave().await.unwrap();
        assert_eq!(controller.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn dropped_join_reverts_to_idle() {
        let sdk = FakeSdk::new();
        sdk.join_gate.hold();
        let controller = controller(&sdk);

        let pending = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.join(request()).await })
        };
        wait_until(|| sdk.join_calls.get() == 1).await;
        pending.abort();
        let _ = pending.await;

        assert_eq!(controller.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn missing_helper_is_not_exposed() {
        let sdk = FakeSdk::new();
        sdk.without_audio();
        let controller = controller(&sdk);
        controller.join(request()).await.unwrap();

        assert!(controller.helper(Capability::Microphone).is_none());
        assert!(controller.helper(Capability::Camera).is_some());
    }

    #[tokio::test]
    async fn remote_end_returns_to_idle() {
        let sdk = FakeSdk::new();
        let controller = controller(&sdk);
        controller.join(request()).await.unwrap();
        let helper = controller.helper(Capability::Microphone).unwrap();

        sdk.session().raise(SdkSessionEvent::Ended { reason: "host ended".into() });
        wait_until(|| controller.state() == SessionState::Idle).await;

        assert!(helper.is_stale());
        controller.join(request()).await.unwrap();
        assert_eq!(controller.state(), SessionState::Active);
    }

    #[tokio::test]
    async fn helper_is_refused_while_leaving() {
        let sdk = FakeSdk::new();
        let controller = controller(&sdk);
        controller.join(request()).await.unwrap();
        let helper = controller.helper(Capability::Camera).unwrap();
        let session = sdk.session();
        session.leave_gate.hold();

        let leaving = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.leave().await })
        };
        wait_until(|| controller.state() == SessionState::Leaving).await;

        assert!(helper.is_stale());
        assert_eq!(
            helper.set_enabled(true).await,
            Err(BridgeError::CapabilityUnavailable(Capability::Camera))
        );
        assert_eq!(session.video.as_ref().unwrap().start_calls.get(), 0);

        session.leave_gate.release();
        leaving.await.unwrap().unwrap();
        assert_eq!(controller.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn helper_from_previous_session_stays_stale() {
        let sdk = FakeSdk::new();
        let controller = controller(&sdk);
        controller.join(request()).await.unwrap();
        let old = controller.helper(Capability::Microphone).unwrap();
        controller.leave().await.unwrap();
        controller.join(request()).await.unwrap();

        assert!(old.is_stale());
        assert!(!controller.helper(Capability::Microphone).unwrap().is_stale());
    }

    #[tokio::test]
    async fn remote_end_during_failed_leave_settles_idle() {
        let sdk = FakeSdk::new();
        let controller = controller(&sdk);
        controller.join(request()).await.unwrap();
        let session = sdk.session();
        session.leave_gate.hold();
        session.push_leave_result(Err(SdkError::new("NETWORK", "timeout")));

        let leaving = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.leave().await })
        };
        wait_until(|| controller.state() == SessionState::Leaving).await;
        session.raise(SdkSessionEvent::Ended { reason: "host ended".into() });
        wait_until(|| lock(&controller.inner).ended_remotely).await;
        session.leave_gate.release();

        assert_eq!(leaving.await.unwrap(), Ok(()));
        assert_eq!(controller.state(), SessionState::Idle);
        assert!(controller.session_info().is_none());
        assert!(controller.helper(Capability::Camera).is_none());
        assert!(!lock(&controller.inner).ended_remotely);

        controller.join(request()).await.unwrap();
        assert_eq!(controller.state(), SessionState::Active);
    }

    #[tokio::test]
    async fn leave_after_remote_end_does_not_reach_sdk() {
        let sdk = FakeSdk::new();
        let controller = controller(&sdk);
        controller.join(request()).await.unwrap();
        let session = sdk.session();

        session.raise(SdkSessionEvent::Ended { reason: "host ended".into() });
        wait_until(|| controller.state() == SessionState::Idle).await;

        assert_eq!(controller.leave().await, Ok(()));
        assert_eq!(session.leave_calls.get(), 0);
    }

    #[tokio::test]
    async fn session_holds_sdk_lease_until_discarded() {
        let sdk = FakeSdk::new();
        let provider = Arc::new(SdkProvider::new(sdk.clone()));
        let controller =
            SessionController::new(provider.clone(), SdkConfig::default(), EventEmitter::new());

        controller.join(request()).await.unwrap();
        assert_eq!(provider.live_sessions(), 1);

        controller.leave().await.unwrap();
        assert_eq!(provider.live_sessions(), 0);
    }

    #[tokio::test]
    async fn shutdown_leaves_active_session_and_swallows_failure() {
        let sdk = FakeSdk::new();
        let controller = controller(&sdk);
        controller.join(request()).await.unwrap();
        sdk.session().push_leave_result(Err(SdkError::new("GONE", "")));

        controller.shutdown().await;

        assert_eq!(sdk.session().leave_calls.get(), 1);
    }

    #[test]
    fn join_request_debug_redacts_token() {
        let dbg = format!("{:?}", JoinRequest::new("room1", "secret-token", "alice"));
        assert!(!dbg.contains("secret-token"));
        assert!(dbg.contains("<redacted>"));
    }
}
