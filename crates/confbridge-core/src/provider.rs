use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::FutureExt;
use tokio::sync::oneshot;

use crate::errors::BridgeError;
use crate::events::{BridgeEvent, BridgeEventListener, EventEmitter, ListenerId, SdkState};
use crate::sdk::{ConferencingSdk, JoinParams, SdkConfig, SdkError, SdkSession};

/// Capability to use an initialized SDK instance.
#[derive(Clone)]
pub struct SdkHandle {
    sdk: Arc<dyn ConferencingSdk>,
}

impl SdkHandle {
    pub async fn join_session(&self, params: JoinParams) -> Result<Arc<dyn SdkSession>, SdkError> {
        self.sdk.join_session(params).await
    }
}

/// Keeps the SDK from being torn down while a session depends on it.
///
/// Taken before a join reaches the SDK and held for the life of the session.
pub struct SdkLease {
    handle: SdkHandle,
    shared: Arc<Shared>,
}

impl SdkLease {
    pub fn handle(&self) -> &SdkHandle {
        &self.handle
    }
}

impl Drop for SdkLease {
    fn drop(&mut self) {
        self.shared.leases.fetch_sub(1, Ordering::SeqCst);
    }
}

type Waiter = oneshot::Sender<Result<SdkHandle, BridgeError>>;

enum Phase {
    Uninitialized,
    Initializing(Vec<Waiter>),
    Ready(SdkHandle),
    Failed(BridgeError),
}

impl Phase {
    fn state(&self) -> SdkState {
        match self {
            Self::Uninitialized => SdkState::Uninitialized,
            Self::Initializing(_) => SdkState::Initializing,
            Self::Ready(_) => SdkState::Ready,
            Self::Failed(_) => SdkState::Failed,
        }
    }
}

struct Shared {
    sdk: Arc<dyn ConferencingSdk>,
    emitter: EventEmitter,
    phase: Mutex<Phase>,
    // Raised only while `phase` is locked.
    leases: AtomicUsize,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owns the process-wide SDK instance.
///
/// `Uninitialized -> Initializing -> Ready | Failed`. At most one native
/// initialization runs at a time: callers arriving while one is in flight
/// wait for its outcome instead of starting another. `SdkUnavailable` is
/// permanent; `SdkInitError` may be retried by calling `initialize` again.
///
/// One provider is shared by every session controller in the process.
/// Each live session holds an [`SdkLease`]; `teardown` is refused while any
/// lease is outstanding.
pub struct SdkProvider {
    shared: Arc<Shared>,
}

impl SdkProvider {
    pub fn new(sdk: Arc<dyn ConferencingSdk>) -> Self {
        Self {
            shared: Arc::new(Shared {
                sdk,
                emitter: EventEmitter::new(),
                phase: Mutex::new(Phase::Uninitialized),
                leases: AtomicUsize::new(0),
            }),
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn BridgeEventListener>) -> ListenerId {
        self.shared.emitter.add_listener(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) {
        self.shared.emitter.remove_listener(id);
    }

    /// Number of sessions currently holding the SDK.
    pub fn live_sessions(&self) -> usize {
        self.shared.leases.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub(crate) fn listener_count(&self) -> usize {
        self.shared.emitter.listener_count()
    }

    pub fn state(&self) -> SdkState {
        self.shared.lock().state()
    }

    /// Handle of the ready SDK, if any.
    pub fn handle(&self) -> Option<SdkHandle> {
        match &*self.shared.lock() {
            Phase::Ready(handle) => Some(handle.clone()),
            _ => None,
        }
    }

    /// Initialize the SDK, or join the initialization already in flight.
    pub async fn initialize(&self, config: &SdkConfig) -> Result<SdkHandle, BridgeError> {
        let (tx, rx) = oneshot::channel();
        let start = {
            let mut phase = self.shared.lock();
            match &mut *phase {
                Phase::Ready(handle) => return Ok(handle.clone()),
                Phase::Failed(err @ BridgeError::SdkUnavailable(_)) => return Err(err.clone()),
                Phase::Initializing(waiters) => {
                    waiters.push(tx);
                    false
                }
                Phase::Uninitialized | Phase::Failed(_) => {
                    *phase = Phase::Initializing(vec![tx]);
                    true
                }
            }
        };

        if start {
            tracing::info!(domain = %config.domain, "initializing conferencing SDK");
            self.shared
                .emitter
                .emit(BridgeEvent::SdkStateChanged(SdkState::Initializing));
            // Runs detached so a dropped caller cannot strand the Initializing phase.
            tokio::spawn(Self::run_initialization(self.shared.clone(), config.clone()));
        } else {
            tracing::debug!("SDK initialization already in flight, waiting");
        }

        rx.await
            .unwrap_or_else(|_| Err(BridgeError::Internal("SDK initialization abandoned".into())))
    }

    /// Initialize if needed and take a lease on the ready SDK.
    pub async fn acquire(&self, config: &SdkConfig) -> Result<SdkLease, BridgeError> {
        let handle = self.initialize(config).await?;
        let phase = self.shared.lock();
        if !matches!(*phase, Phase::Ready(_)) {
            return Err(BridgeError::InvalidState(
                "SDK was torn down during initialization".into(),
            ));
        }
        self.shared.leases.fetch_add(1, Ordering::SeqCst);
        drop(phase);
        Ok(SdkLease {
            handle,
            shared: self.shared.clone(),
        })
    }

    async fn run_initialization(shared: Arc<Shared>, config: SdkConfig) {
        let outcome = if !shared.sdk.is_available() {
            Err(BridgeError::SdkUnavailable(
                "native conferencing SDK is not present in this build".into(),
            ))
        } else {
            match AssertUnwindSafe(shared.sdk.initialize(&config)).catch_unwind().await {
                Ok(Ok(())) => Ok(SdkHandle { sdk: shared.sdk.clone() }),
                Ok(Err(e)) => Err(BridgeError::init_failed(e)),
                Err(_) => Err(BridgeError::SdkInitError("SDK init entry point panicked".into())),
            }
        };

        let waiters = {
            let mut phase = shared.lock();
            let next = match &outcome {
                Ok(handle) => Phase::Ready(handle.clone()),
                Err(e) => Phase::Failed(e.clone()),
            };
            match std::mem::replace(&mut *phase, next) {
                Phase::Initializing(waiters) => waiters,
                _ => Vec::new(),
            }
        };

        match &outcome {
            Ok(_) => {
                tracing::info!("conferencing SDK ready");
                shared.emitter.emit(BridgeEvent::SdkStateChanged(SdkState::Ready));
            }
            Err(e) => {
                tracing::error!("conferencing SDK initialization failed: {e}");
                shared.emitter.emit(BridgeEvent::SdkStateChanged(SdkState::Failed));
            }
        }

        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }

    /// Release the SDK. Only valid while `Ready` and no session holds a
    /// lease; returns to `Uninitialized`.
    pub fn teardown(&self) -> Result<(), BridgeError> {
        {
            let mut phase = self.shared.lock();
            match &*phase {
                Phase::Ready(_) => {
                    let live = self.shared.leases.load(Ordering::SeqCst);
                    if live > 0 {
                        return Err(BridgeError::InvalidState(format!(
                            "{live} session(s) still use the SDK"
                        )));
                    }
                }
                Phase::Initializing(_) => return Err(BridgeError::OperationInProgress),
                Phase::Uninitialized | Phase::Failed(_) => {
                    return Err(BridgeError::InvalidState("SDK is not initialized".into()));
                }
            }
            // cleanup runs under the lock so no initialization can overlap it
            self.shared.sdk.cleanup();
            *phase = Phase::Uninitialized;
        }
        tracing::info!("conferencing SDK torn down");
        self.shared
            .emitter
            .emit(BridgeEvent::SdkStateChanged(SdkState::Uninitialized));
        Ok(())
    }
}
