//! Marshaling of command results onto the UI thread.
//!
//! Commands run on the tokio runtime and SDK completions arrive on SDK
//! threads. Nothing is reported from there: each result is wrapped in a
//! [`UiTask`] and posted to the host's [`UiExecutor`], which runs it on the
//! UI-affine thread.

use std::future::Future;
use std::sync::Arc;

use tokio::runtime::Handle;

use crate::errors::BridgeError;
use crate::events::{BridgeEvent, BridgeEventListener};

pub type UiTask = Box<dyn FnOnce() + Send + 'static>;

/// Runs tasks on the UI-affine thread (Android main looper, iOS main queue).
pub trait UiExecutor: Send + Sync {
    fn post(&self, task: UiTask);
}

/// Runs bridge commands off the UI thread and reports each result exactly
/// once on the UI executor.
#[derive(Clone)]
pub struct Dispatcher {
    runtime: Handle,
    ui: Arc<dyn UiExecutor>,
}

impl Dispatcher {
    pub fn new(runtime: Handle, ui: Arc<dyn UiExecutor>) -> Self {
        Self { runtime, ui }
    }

    /// Spawn `command` and post `reply` with its result to the UI thread.
    ///
    /// Returns immediately. A panicking command resolves as `Internal`.
    pub fn submit<T, F, R>(&self, name: &'static str, command: F, reply: R)
    where
        T: Send + 'static,
        F: Future<Output = Result<T, BridgeError>> + Send + 'static,
        R: FnOnce(Result<T, BridgeError>) + Send + 'static,
    {
        let ui = self.ui.clone();
        let worker = self.runtime.spawn(command);
        self.runtime.spawn(async move {
            let result = match worker.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!("{name} task failed: {e}");
                    Err(BridgeError::Internal(format!("{name} did not complete")))
                }
            };
            if let Err(e) = &result {
                tracing::debug!("{name} failed: {e}");
            }
            ui.post(Box::new(move || reply(result)));
        });
    }

    /// Wrap `listener` so it receives bridge events on the UI thread.
    pub fn ui_listener(&self, listener: Arc<dyn BridgeEventListener>) -> Arc<dyn BridgeEventListener> {
        Arc::new(UiEventRelay {
            ui: self.ui.clone(),
            listener,
        })
    }
}

struct UiEventRelay {
    ui: Arc<dyn UiExecutor>,
    listener: Arc<dyn BridgeEventListener>,
}

impl BridgeEventListener for UiEventRelay {
    fn on_event(&self, event: BridgeEvent) {
        let listener = self.listener.clone();
        self.ui.post(Box::new(move || listener.on_event(event)));
    }
}
