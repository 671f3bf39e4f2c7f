//! UniFFI bindings for confbridge-core.
//!
//! Provides a ConferenceClient object that routes UI commands into a
//! ConferenceBridge and reports each result on the host's UI thread.
//! The host supplies the conferencing SDK, permissions, cameras and its UI
//! executor as callback interfaces.

use std::future::Future;
use std::sync::{Arc, Mutex, Once, OnceLock, PoisonError};

use async_trait::async_trait;
use confbridge_core::{
    AudioHelper, BridgeConfig as CoreBridgeConfig, BridgeError as CoreBridgeError,
    BridgeEvent as CoreBridgeEvent, BridgeEventListener, CameraEnumerator,
    Capability as CoreCapability, ConferenceBridge, ConferencingSdk, ConfigStore, Dispatcher,
    JoinParams, JoinRequest, PermissionPlatform, PermissionState as CorePermissionState,
    SdkConfig, SdkError, SdkProvider, SdkSession, SdkSessionEvent, SdkState as CoreSdkState,
    SessionInfo, SessionState as CoreSessionState, UiExecutor, UiTask, VideoHelper,
};
use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

uniffi::include_scaffolding!("confbridge");

const DEFAULT_LOG_FILTER: &str = "confbridge_core=debug,confbridge_ffi=debug";

// ── Platform log helper ──────────────────────────────────────────────

/// Write a message to logcat on Android, syslog on iOS, or stderr elsewhere.
/// Used before tracing is initialized.
fn bridge_log(msg: &str) {
    #[cfg(target_os = "android")]
    {
        use std::ffi::CString;
        #[link(name = "log")]
        unsafe extern "C" {
            fn __android_log_write(prio: i32, tag: *const std::ffi::c_char, text: *const std::ffi::c_char) -> i32;
        }
        let text = CString::new(msg).unwrap_or_else(|_| c"(invalid utf8)".to_owned());
        unsafe { __android_log_write(4 /* INFO */, c"CONFBRIDGE_FFI".as_ptr(), text.as_ptr()); }
    }
    #[cfg(target_os = "ios")]
    {
        use std::ffi::CString;
        unsafe extern "C" {
            fn syslog(priority: i32, message: *const std::ffi::c_char, ...);
        }
        let text = CString::new(msg).unwrap_or_else(|_| c"(invalid utf8)".to_owned());
        unsafe { syslog(6 /* LOG_INFO */, c"%s".as_ptr(), text.as_ptr()); }
    }
    #[cfg(not(any(target_os = "android", target_os = "ios")))]
    eprintln!("{msg}");
}

// ── Namespace functions ──────────────────────────────────────────────

/// Initialize tracing. Call once from the host before creating a client.
/// `RUST_LOG` overrides the default filter.
fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));
        let installed = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .try_init();
        if installed.is_err() {
            bridge_log("CONFBRIDGE FFI: tracing subscriber already installed");
        }
    });
}

// ── Process-wide runtime and SDK provider ────────────────────────────

fn runtime() -> &'static tokio::runtime::Runtime {
    static RUNTIME: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
    RUNTIME.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .thread_name("confbridge")
            .enable_all()
            .build()
            .expect("failed to create tokio runtime")
    })
}

/// The SDK is a process-wide resource: the first client installs its
/// delegate, later clients share it.
fn shared_provider(sdk: Box<dyn ConferencingSdkDelegate>) -> Arc<SdkProvider> {
    static PROVIDER: OnceLock<Arc<SdkProvider>> = OnceLock::new();
    let mut installed = false;
    let provider = PROVIDER
        .get_or_init(|| {
            installed = true;
            Arc::new(SdkProvider::new(Arc::new(ForeignSdk::new(sdk))))
        })
        .clone();
    if !installed {
        tracing::debug!("SDK provider already installed, ignoring new delegate");
    }
    provider
}

// ── FFI-safe type conversions ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Microphone,
    Camera,
}

impl From<CoreCapability> for Capability {
    fn from(c: CoreCapability) -> Self {
        match c {
            CoreCapability::Microphone => Self::Microphone,
            CoreCapability::Camera => Self::Camera,
        }
    }
}

impl From<Capability> for CoreCapability {
    fn from(c: Capability) -> Self {
        match c {
            Capability::Microphone => Self::Microphone,
            Capability::Camera => Self::Camera,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Unknown,
    Granted,
    Denied,
}

impl From<CorePermissionState> for PermissionState {
    fn from(s: CorePermissionState) -> Self {
        match s {
            CorePermissionState::Unknown => Self::Unknown,
            CorePermissionState::Granted => Self::Granted,
            CorePermissionState::Denied => Self::Denied,
        }
    }
}

impl From<PermissionState> for CorePermissionState {
    fn from(s: PermissionState) -> Self {
        match s {
            PermissionState::Unknown => Self::Unknown,
            PermissionState::Granted => Self::Granted,
            PermissionState::Denied => Self::Denied,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdkState {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

impl From<CoreSdkState> for SdkState {
    fn from(s: CoreSdkState) -> Self {
        match s {
            CoreSdkState::Uninitialized => Self::Uninitialized,
            CoreSdkState::Initializing => Self::Initializing,
            CoreSdkState::Ready => Self::Ready,
            CoreSdkState::Failed => Self::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Joining,
    Active,
    Leaving,
}

impl From<CoreSessionState> for SessionState {
    fn from(s: CoreSessionState) -> Self {
        match s {
            CoreSessionState::Idle => Self::Idle,
            CoreSessionState::Joining => Self::Joining,
            CoreSessionState::Active => Self::Active,
            CoreSessionState::Leaving => Self::Leaving,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    SdkStateChanged {
        state: SdkState,
    },
    SessionStateChanged {
        state: SessionState,
    },
    CapabilityChanged {
        capability: Capability,
        enabled: bool,
    },
    PermissionChanged {
        capability: Capability,
        state: PermissionState,
    },
}

impl From<CoreBridgeEvent> for BridgeEvent {
    fn from(e: CoreBridgeEvent) -> Self {
        match e {
            CoreBridgeEvent::SdkStateChanged(s) => Self::SdkStateChanged { state: s.into() },
            CoreBridgeEvent::SessionStateChanged(s) => Self::SessionStateChanged { state: s.into() },
            CoreBridgeEvent::CapabilityChanged { capability, enabled } => Self::CapabilityChanged {
                capability: capability.into(),
                enabled,
            },
            CoreBridgeEvent::PermissionChanged { capability, state } => Self::PermissionChanged {
                capability: capability.into(),
                state: state.into(),
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct JoinArgs {
    pub session_name: Option<String>,
    pub token: Option<String>,
    pub user_name: Option<String>,
    pub identity: Option<String>,
    pub role: i32,
}

impl From<JoinArgs> for JoinRequest {
    fn from(a: JoinArgs) -> Self {
        Self {
            session_name: a.session_name,
            token: a.token,
            user_name: a.user_name,
            identity: a.identity,
            role: a.role,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkInitConfig {
    pub domain: String,
    pub app_key: Option<String>,
    pub enable_log: bool,
}

impl From<&SdkConfig> for SdkInitConfig {
    fn from(c: &SdkConfig) -> Self {
        Self {
            domain: c.domain.clone(),
            app_key: c.app_key.clone(),
            enable_log: c.enable_log,
        }
    }
}

pub struct SdkJoinParams {
    pub session_name: String,
    pub token: String,
    pub user_name: String,
    pub identity: Option<String>,
    pub role: i32,
}

impl From<JoinParams> for SdkJoinParams {
    fn from(p: JoinParams) -> Self {
        Self {
            session_name: p.session_name,
            token: p.token,
            user_name: p.user_name,
            identity: p.identity,
            role: p.role.code(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub id: String,
    pub session_name: String,
    pub user_name: String,
    pub identity: Option<String>,
    pub role: i32,
    pub joined_at_ms: i64,
}

impl From<SessionInfo> for SessionSnapshot {
    fn from(s: SessionInfo) -> Self {
        Self {
            id: s.id.to_string(),
            session_name: s.session_name,
            user_name: s.user_name,
            identity: s.identity,
            role: s.role.code(),
            joined_at_ms: s.joined_at.timestamp_millis(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    pub sdk_domain: String,
    pub app_key: Option<String>,
    pub enable_sdk_log: bool,
    pub default_user_name: Option<String>,
}

impl From<CoreBridgeConfig> for BridgeConfig {
    fn from(c: CoreBridgeConfig) -> Self {
        Self {
            sdk_domain: c.sdk_domain,
            app_key: c.app_key,
            enable_sdk_log: c.enable_sdk_log,
            default_user_name: c.default_user_name,
        }
    }
}

// ── Command results ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidArguments,
    OperationInProgress,
    InvalidState,
    SdkUnavailable,
    SdkInitError,
    JoinFailed,
    LeaveFailed,
    PermissionDenied,
    PermissionPending,
    CapabilityUnavailable,
    ToggleFailed,
    NoCameraHardware,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandError {
    pub code: ErrorCode,
    pub message: String,
    pub retryable: bool,
    pub requires_user_action: bool,
}

impl From<CoreBridgeError> for CommandError {
    fn from(e: CoreBridgeError) -> Self {
        tracing::warn!("command failed: {} ({e})", e.code());
        let code = match &e {
            CoreBridgeError::InvalidArguments(_) => ErrorCode::InvalidArguments,
            CoreBridgeError::OperationInProgress => ErrorCode::OperationInProgress,
            CoreBridgeError::InvalidState(_) => ErrorCode::InvalidState,
            CoreBridgeError::SdkUnavailable(_) => ErrorCode::SdkUnavailable,
            CoreBridgeError::SdkInitError(_) => ErrorCode::SdkInitError,
            CoreBridgeError::JoinFailed(_) => ErrorCode::JoinFailed,
            CoreBridgeError::LeaveFailed(_) => ErrorCode::LeaveFailed,
            CoreBridgeError::PermissionDenied(_) => ErrorCode::PermissionDenied,
            CoreBridgeError::PermissionPending(_) => ErrorCode::PermissionPending,
            CoreBridgeError::CapabilityUnavailable(_) => ErrorCode::CapabilityUnavailable,
            CoreBridgeError::ToggleFailed(_) => ErrorCode::ToggleFailed,
            CoreBridgeError::NoCameraHardware => ErrorCode::NoCameraHardware,
            CoreBridgeError::Internal(_) => ErrorCode::Internal,
        };
        Self {
            code,
            message: e.to_string(),
            retryable: e.is_retryable(),
            requires_user_action: e.requires_user_action(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    Completed,
    CameraAvailability { available: bool },
    Failed { error: CommandError },
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid arguments: {msg}")]
    InvalidArguments { msg: String },
}

// ── Callback interfaces ──────────────────────────────────────────────

pub trait CommandListener: Send + Sync {
    fn on_result(&self, request_id: u64, result: CommandResult);
    fn on_event(&self, event: BridgeEvent);
}

pub trait UiThreadExecutor: Send + Sync {
    fn post(&self, callback: Arc<UiCallback>);
}

pub trait ConferencingSdkDelegate: Send + Sync {
    fn is_available(&self) -> bool;
    fn initialize(&self, config: SdkInitConfig, completion: Arc<SdkCompletion>);
    fn join_session(&self, params: SdkJoinParams, completion: Arc<JoinCompletion>);
    fn cleanup(&self);
}

pub trait SdkSessionDelegate: Send + Sync {
    fn leave(&self, end_session: bool, completion: Arc<SdkCompletion>);
    fn has_audio_helper(&self) -> bool;
    fn has_video_helper(&self) -> bool;
    fn mute_audio(&self, completion: Arc<SdkCompletion>);
    fn unmute_audio(&self, completion: Arc<SdkCompletion>);
    fn start_video(&self, completion: Arc<SdkCompletion>);
    fn stop_video(&self, completion: Arc<SdkCompletion>);
}

pub trait PermissionDelegate: Send + Sync {
    fn check(&self, capability: Capability) -> PermissionState;
    fn request(&self, capability: Capability);
}

pub trait CameraDelegate: Send + Sync {
    fn camera_ids(&self) -> Option<Vec<String>>;
}

// ── Completion objects ───────────────────────────────────────────────
//
// The host SDK reports asynchronously on its own threads. Each call hands
// over a completion that resolves a oneshot exactly once; a completion the
// host drops without firing resolves as COMPLETION_DROPPED.

type Reply<T> = Mutex<Option<oneshot::Sender<Result<T, SdkError>>>>;

fn take<T>(slot: &Mutex<Option<T>>) -> Option<T> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}

async fn settle<T>(operation: &str, rx: oneshot::Receiver<Result<T, SdkError>>) -> Result<T, SdkError> {
    rx.await.unwrap_or_else(|_| {
        Err(SdkError::new(
            "COMPLETION_DROPPED",
            format!("{operation} completion was dropped"),
        ))
    })
}

pub struct SdkCompletion {
    operation: &'static str,
    reply: Reply<()>,
}

impl SdkCompletion {
    fn pending(operation: &'static str) -> (Arc<Self>, oneshot::Receiver<Result<(), SdkError>>) {
        let (tx, rx) = oneshot::channel();
        let completion = Self {
            operation,
            reply: Mutex::new(Some(tx)),
        };
        (Arc::new(completion), rx)
    }

    pub fn succeed(&self) {
        self.resolve(Ok(()));
    }

    pub fn fail(&self, code: String, message: String) {
        self.resolve(Err(SdkError::new(code, message)));
    }

    fn resolve(&self, result: Result<(), SdkError>) {
        match take(&self.reply) {
            Some(tx) => {
                let _ = tx.send(result);
            }
            None => tracing::warn!("{} completion fired twice, ignoring", self.operation),
        }
    }
}

pub struct JoinCompletion {
    reply: Reply<Arc<dyn SdkSession>>,
}

impl JoinCompletion {
    fn pending() -> (Arc<Self>, oneshot::Receiver<Result<Arc<dyn SdkSession>, SdkError>>) {
        let (tx, rx) = oneshot::channel();
        (Arc::new(Self { reply: Mutex::new(Some(tx)) }), rx)
    }

    /// The SDK joined. The returned handle reports session-level events.
    pub fn joined(&self, session: Box<dyn SdkSessionDelegate>) -> Arc<SessionEvents> {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = ForeignSession {
            delegate: Arc::from(session),
            events: Mutex::new(Some(rx)),
        };
        match take(&self.reply) {
            Some(reply) => {
                if reply.send(Ok(Arc::new(session))).is_err() {
                    tracing::warn!("join completed after the request was abandoned");
                }
            }
            None => tracing::warn!("join completion fired twice, ignoring"),
        }
        Arc::new(SessionEvents { tx })
    }

    pub fn fail(&self, code: String, message: String) {
        match take(&self.reply) {
            Some(reply) => {
                let _ = reply.send(Err(SdkError::new(code, message)));
            }
            None => tracing::warn!("join completion fired twice, ignoring"),
        }
    }
}

pub struct SessionEvents {
    tx: mpsc::UnboundedSender<SdkSessionEvent>,
}

impl SessionEvents {
    /// The SDK ended the session without a local leave.
    pub fn ended(&self, reason: String) {
        if self.tx.send(SdkSessionEvent::Ended { reason }).is_err() {
            tracing::debug!("session end reported for a session no longer tracked");
        }
    }
}

pub struct UiCallback {
    task: Mutex<Option<UiTask>>,
}

impl UiCallback {
    /// Run on the UI thread. Only the first call does anything.
    pub fn run(&self) {
        if let Some(task) = take(&self.task) {
            task();
        }
    }
}

// ── Host adapters: FFI callbacks → core traits ───────────────────────

struct ForeignSdk {
    delegate: Box<dyn ConferencingSdkDelegate>,
}

impl ForeignSdk {
    fn new(delegate: Box<dyn ConferencingSdkDelegate>) -> Self {
        Self { delegate }
    }
}

#[async_trait]
impl ConferencingSdk for ForeignSdk {
    fn is_available(&self) -> bool {
        self.delegate.is_available()
    }

    async fn initialize(&self, config: &SdkConfig) -> Result<(), SdkError> {
        let (completion, rx) = SdkCompletion::pending("initialize");
        self.delegate.initialize(config.into(), completion);
        settle("initialize", rx).await
    }

    async fn join_session(&self, params: JoinParams) -> Result<Arc<dyn SdkSession>, SdkError> {
        let (completion, rx) = JoinCompletion::pending();
        self.delegate.join_session(params.into(), completion);
        settle("joinSession", rx).await
    }

    fn cleanup(&self) {
        self.delegate.cleanup();
    }
}

struct ForeignSession {
    delegate: Arc<dyn SdkSessionDelegate>,
    events: Mutex<Option<mpsc::UnboundedReceiver<SdkSessionEvent>>>,
}

#[async_trait]
impl SdkSession for ForeignSession {
    async fn leave(&self, end_session: bool) -> Result<(), SdkError> {
        let (completion, rx) = SdkCompletion::pending("leave");
        self.delegate.leave(end_session, completion);
        settle("leave", rx).await
    }

    fn audio_helper(&self) -> Option<Arc<dyn AudioHelper>> {
        self.delegate.has_audio_helper().then(|| {
            Arc::new(ForeignAudio {
                delegate: self.delegate.clone(),
            }) as Arc<dyn AudioHelper>
        })
    }

    fn video_helper(&self) -> Option<Arc<dyn VideoHelper>> {
        self.delegate.has_video_helper().then(|| {
            Arc::new(ForeignVideo {
                delegate: self.delegate.clone(),
            }) as Arc<dyn VideoHelper>
        })
    }

    fn events(&self) -> Option<BoxStream<'static, SdkSessionEvent>> {
        let rx = take(&self.events)?;
        Some(stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|e| (e, rx)) }).boxed())
    }
}

struct ForeignAudio {
    delegate: Arc<dyn SdkSessionDelegate>,
}

#[async_trait]
impl AudioHelper for ForeignAudio {
    async fn mute(&self) -> Result<(), SdkError> {
        let (completion, rx) = SdkCompletion::pending("muteAudio");
        self.delegate.mute_audio(completion);
        settle("muteAudio", rx).await
    }

    async fn unmute(&self) -> Result<(), SdkError> {
        let (completion, rx) = SdkCompletion::pending("unmuteAudio");
        self.delegate.unmute_audio(completion);
        settle("unmuteAudio", rx).await
    }
}

struct ForeignVideo {
    delegate: Arc<dyn SdkSessionDelegate>,
}

#[async_trait]
impl VideoHelper for ForeignVideo {
    async fn start_video(&self) -> Result<(), SdkError> {
        let (completion, rx) = SdkCompletion::pending("startVideo");
        self.delegate.start_video(completion);
        settle("startVideo", rx).await
    }

    async fn stop_video(&self) -> Result<(), SdkError> {
        let (completion, rx) = SdkCompletion::pending("stopVideo");
        self.delegate.stop_video(completion);
        settle("stopVideo", rx).await
    }
}

struct ForeignPermissions {
    delegate: Box<dyn PermissionDelegate>,
}

impl PermissionPlatform for ForeignPermissions {
    fn check(&self, capability: CoreCapability) -> CorePermissionState {
        self.delegate.check(capability.into()).into()
    }

    fn request(&self, capability: CoreCapability) {
        self.delegate.request(capability.into());
    }
}

struct ForeignCameras {
    delegate: Box<dyn CameraDelegate>,
}

impl CameraEnumerator for ForeignCameras {
    fn camera_ids(&self) -> Option<Vec<String>> {
        self.delegate.camera_ids()
    }
}

struct HostUiExecutor {
    host: Box<dyn UiThreadExecutor>,
}

impl UiExecutor for HostUiExecutor {
    fn post(&self, task: UiTask) {
        self.host.post(Arc::new(UiCallback {
            task: Mutex::new(Some(task)),
        }));
    }
}

// ── Event listener: core listener → FFI callback ─────────────────────

struct EventForwarder {
    listener: Arc<dyn CommandListener>,
}

impl BridgeEventListener for EventForwarder {
    fn on_event(&self, event: CoreBridgeEvent) {
        self.listener.on_event(event.into());
    }
}

// ── ConferenceClient: main FFI object ────────────────────────────────

pub struct ConferenceClient {
    bridge: Arc<ConferenceBridge>,
    dispatcher: Dispatcher,
    config: ConfigStore,
    listener: Arc<dyn CommandListener>,
}

impl ConferenceClient {
    pub fn new(
        data_dir: String,
        sdk: Box<dyn ConferencingSdkDelegate>,
        permissions: Box<dyn PermissionDelegate>,
        cameras: Box<dyn CameraDelegate>,
        ui: Box<dyn UiThreadExecutor>,
        listener: Box<dyn CommandListener>,
    ) -> Self {
        bridge_log("CONFBRIDGE FFI: ConferenceClient::new() called");
        let provider = shared_provider(sdk);
        let client = Self::with_provider(
            runtime().handle().clone(),
            provider,
            &data_dir,
            permissions,
            cameras,
            ui,
            listener,
        );
        bridge_log("CONFBRIDGE FFI: ConferenceClient::new() completed");
        client
    }

    fn with_provider(
        runtime: Handle,
        provider: Arc<SdkProvider>,
        data_dir: &str,
        permissions: Box<dyn PermissionDelegate>,
        cameras: Box<dyn CameraDelegate>,
        ui: Box<dyn UiThreadExecutor>,
        listener: Box<dyn CommandListener>,
    ) -> Self {
        let config = ConfigStore::with_runtime(data_dir, runtime.clone());
        let bridge = Arc::new(ConferenceBridge::new(
            provider,
            config.get().sdk_config(),
            Arc::new(ForeignPermissions { delegate: permissions }),
            Arc::new(ForeignCameras { delegate: cameras }),
        ));
        let dispatcher = Dispatcher::new(runtime, Arc::new(HostUiExecutor { host: ui }));
        let listener: Arc<dyn CommandListener> = Arc::from(listener);
        bridge.add_listener(dispatcher.ui_listener(Arc::new(EventForwarder {
            listener: listener.clone(),
        })));
        Self {
            bridge,
            dispatcher,
            config,
            listener,
        }
    }

    pub fn join_session(&self, request_id: u64, args: JoinArgs) {
        tracing::info!(request_id, "joinSession");
        let bridge = self.bridge.clone();
        let request = JoinRequest::from(args);
        self.submit(request_id, "joinSession", async move {
            bridge.join_session(request).await?;
            Ok(CommandResult::Completed)
        });
    }

    pub fn leave_session(&self, request_id: u64, end_session: bool) {
        tracing::info!(request_id, end_session, "leaveSession");
        let bridge = self.bridge.clone();
        self.submit(request_id, "leaveSession", async move {
            bridge.leave_session(end_session).await?;
            Ok(CommandResult::Completed)
        });
    }

    pub fn toggle_mic(&self, request_id: u64, on: bool) {
        tracing::info!(request_id, on, "toggleMic");
        let bridge = self.bridge.clone();
        self.submit(request_id, "toggleMic", async move {
            bridge.toggle_mic(on).await?;
            Ok(CommandResult::Completed)
        });
    }

    pub fn toggle_cam(&self, request_id: u64, on: bool) {
        tracing::info!(request_id, on, "toggleCam");
        let bridge = self.bridge.clone();
        self.submit(request_id, "toggleCam", async move {
            bridge.toggle_cam(on).await?;
            Ok(CommandResult::Completed)
        });
    }

    pub fn check_camera_available(&self, request_id: u64) {
        tracing::info!(request_id, "checkCameraAvailable");
        let bridge = self.bridge.clone();
        self.submit(request_id, "checkCameraAvailable", async move {
            let available = bridge.check_camera_available()?;
            Ok(CommandResult::CameraAvailability { available })
        });
    }

    /// Leave any active session, then release the SDK.
    pub fn shutdown(&self, request_id: u64) {
        tracing::info!(request_id, "shutdown");
        let bridge = self.bridge.clone();
        self.submit(request_id, "shutdown", async move {
            bridge.shutdown().await;
            Ok(CommandResult::Completed)
        });
    }

    pub fn on_permission_result(&self, capability: Capability, state: PermissionState) {
        self.bridge.on_permission_result(capability.into(), state.into());
    }

    pub fn session_state(&self) -> SessionState {
        self.bridge.session_state().into()
    }

    pub fn sdk_state(&self) -> SdkState {
        self.bridge.sdk_state().into()
    }

    pub fn session_info(&self) -> Option<SessionSnapshot> {
        self.bridge.session_info().map(Into::into)
    }

    pub fn get_config(&self) -> BridgeConfig {
        self.config.get().into()
    }

    /// Configuration changes apply to clients created afterwards.
    pub fn set_sdk_domain(&self, domain: String) -> Result<(), ClientError> {
        if domain.trim().is_empty() {
            return Err(ClientError::InvalidArguments {
                msg: "domain is required".into(),
            });
        }
        self.config.set_sdk_domain(domain);
        Ok(())
    }

    pub fn set_app_key(&self, key: Option<String>) {
        self.config.set_app_key(key);
    }

    pub fn set_enable_sdk_log(&self, enabled: bool) {
        self.config.set_enable_sdk_log(enabled);
    }

    pub fn set_default_user_name(&self, name: Option<String>) {
        self.config.set_default_user_name(name);
    }

    fn submit<F>(&self, request_id: u64, name: &'static str, command: F)
    where
        F: Future<Output = Result<CommandResult, CoreBridgeError>> + Send + 'static,
    {
        let listener = self.listener.clone();
        self.dispatcher.submit(name, command, move |result| {
            let result = result.unwrap_or_else(|e| CommandResult::Failed { error: e.into() });
            listener.on_result(request_id, result);
        });
    }
}
