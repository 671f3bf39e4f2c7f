//! In-process stand-in for the conferencing SDK used by unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use tokio::sync::{mpsc, watch};

use crate::sdk::{
    AudioHelper, ConferencingSdk, JoinParams, SdkConfig, SdkError, SdkSession, SdkSessionEvent,
    VideoHelper,
};

/// Holds calls in flight until released.
pub(crate) struct Gate {
    open: watch::Sender<bool>,
}

impl Gate {
    fn new() -> Self {
        let (open, _) = watch::channel(true);
        Self { open }
    }

    pub(crate) fn hold(&self) {
        self.open.send_replace(false);
    }

    pub(crate) fn release(&self) {
        self.open.send_replace(true);
    }

    async fn pass(&self) {
        let mut rx = self.open.subscribe();
        let _ = rx.wait_for(|open| *open).await;
    }
}

#[derive(Default)]
pub(crate) struct Counter(AtomicUsize);

impl Counter {
    fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

pub(crate) struct FakeSdk {
    available: AtomicBool,
    pub(crate) init_calls: Counter,
    pub(crate) join_calls: Counter,
    pub(crate) cleanup_calls: Counter,
    pub(crate) init_gate: Gate,
    pub(crate) join_gate: Gate,
    init_results: Mutex<VecDeque<Result<(), SdkError>>>,
    join_results: Mutex<VecDeque<Result<(), SdkError>>>,
    with_audio: AtomicBool,
    with_video: AtomicBool,
    last_session: Mutex<Option<Arc<FakeSession>>>,
    last_params: Mutex<Option<JoinParams>>,
}

impl FakeSdk {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            available: AtomicBool::new(true),
            init_calls: Counter::default(),
            join_calls: Counter::default(),
            cleanup_calls: Counter::default(),
            init_gate: Gate::new(),
            join_gate: Gate::new(),
            init_results: Mutex::new(VecDeque::new()),
            join_results: Mutex::new(VecDeque::new()),
            with_audio: AtomicBool::new(true),
            with_video: AtomicBool::new(true),
            last_session: Mutex::new(None),
            last_params: Mutex::new(None),
        })
    }

    pub(crate) fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Queue the outcome of the next `initialize` call. Unqueued calls succeed.
    pub(crate) fn push_init_result(&self, result: Result<(), SdkError>) {
        self.init_results.lock().unwrap().push_back(result);
    }

    /// Queue the outcome of the next `join_session` call. Unqueued calls succeed.
    pub(crate) fn push_join_result(&self, result: Result<(), SdkError>) {
        self.join_results.lock().unwrap().push_back(result);
    }

    pub(crate) fn without_video(&self) {
        self.with_video.store(false, Ordering::SeqCst);
    }

    pub(crate) fn without_audio(&self) {
        self.with_audio.store(false, Ordering::SeqCst);
    }

    pub(crate) fn session(&self) -> Arc<FakeSession> {
        self.last_session
            .lock()
            .unwrap()
            .clone()
            .expect("no session joined yet")
    }

    pub(crate) fn last_params(&self) -> Option<JoinParams> {
        self.last_params.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConferencingSdk for FakeSdk {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn initialize(&self, _config: &SdkConfig) -> Result<(), SdkError> {
        self.init_calls.hit();
        self.init_gate.pass().await;
        self.init_results.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }

    async fn join_session(&self, params: JoinParams) -> Result<Arc<dyn SdkSession>, SdkError> {
        self.join_calls.hit();
        *self.last_params.lock().unwrap() = Some(params);
        self.join_gate.pass().await;
        self.join_results.lock().unwrap().pop_front().unwrap_or(Ok(()))?;

        let session = FakeSession::new(
            self.with_audio.load(Ordering::SeqCst),
            self.with_video.load(Ordering::SeqCst),
        );
        *self.last_session.lock().unwrap() = Some(session.clone());
        Ok(session as Arc<dyn SdkSession>)
    }

    fn cleanup(&self) {
        self.cleanup_calls.hit();
    }
}

pub(crate) struct FakeSession {
    pub(crate) leave_calls: Counter,
    pub(crate) leave_gate: Gate,
    leave_results: Mutex<VecDeque<Result<(), SdkError>>>,
    pub(crate) ended_for_all: AtomicBool,
    pub(crate) audio: Option<Arc<FakeAudio>>,
    pub(crate) video: Option<Arc<FakeVideo>>,
    events_tx: mpsc::UnboundedSender<SdkSessionEvent>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<SdkSessionEvent>>>,
}

impl FakeSession {
    fn new(with_audio: bool, with_video: bool) -> Arc<Self> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            leave_calls: Counter::default(),
            leave_gate: Gate::new(),
            leave_results: Mutex::new(VecDeque::new()),
            ended_for_all: AtomicBool::new(false),
            audio: with_audio.then(|| Arc::new(FakeAudio::default())),
            video: with_video.then(|| Arc::new(FakeVideo::default())),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
        })
    }

    pub(crate) fn push_leave_result(&self, result: Result<(), SdkError>) {
        self.leave_results.lock().unwrap().push_back(result);
    }

    pub(crate) fn raise(&self, event: SdkSessionEvent) {
        let _ = self.events_tx.send(event);
    }
}

#[async_trait]
impl SdkSession for FakeSession {
    async fn leave(&self, end_session: bool) -> Result<(), SdkError> {
        self.leave_calls.hit();
        self.leave_gate.pass().await;
        self.ended_for_all.store(end_session, Ordering::SeqCst);
        self.leave_results.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }

    fn audio_helper(&self) -> Option<Arc<dyn AudioHelper>> {
        self.audio.clone().map(|a| a as Arc<dyn AudioHelper>)
    }

    fn video_helper(&self) -> Option<Arc<dyn VideoHelper>> {
        self.video.clone().map(|v| v as Arc<dyn VideoHelper>)
    }

    fn events(&self) -> Option<BoxStream<'static, SdkSessionEvent>> {
        let rx = self.events_rx.lock().unwrap().take()?;
        Some(
            futures_util::stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|event| (event, rx))
            })
            .boxed(),
        )
    }
}

#[derive(Default)]
pub(crate) struct FakeAudio {
    pub(crate) mute_calls: Counter,
    pub(crate) unmute_calls: Counter,
    results: Mutex<VecDeque<Result<(), SdkError>>>,
}

impl FakeAudio {
    pub(crate) fn push_result(&self, result: Result<(), SdkError>) {
        self.results.lock().unwrap().push_back(result);
    }
}

#[async_trait]
impl AudioHelper for FakeAudio {
    async fn mute(&self) -> Result<(), SdkError> {
        self.mute_calls.hit();
        self.results.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }

    async fn unmute(&self) -> Result<(), SdkError> {
        self.unmute_calls.hit();
        self.results.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

#[derive(Default)]
pub(crate) struct FakeVideo {
    pub(crate) start_calls: Counter,
    pub(crate) stop_calls: Counter,
    results: Mutex<VecDeque<Result<(), SdkError>>>,
}

impl FakeVideo {
    pub(crate) fn push_result(&self, result: Result<(), SdkError>) {
        self.results.lock().unwrap().push_back(result);
    }
}

#[async_trait]
impl VideoHelper for FakeVideo {
    async fn start_video(&self) -> Result<(), SdkError> {
        self.start_calls.hit();
        self.results.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }

    async fn stop_video(&self) -> Result<(), SdkError> {
        self.stop_calls.hit();
        self.results.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

/// Yield to spawned tasks until `cond` holds. Panics after one second.
pub(crate) async fn wait_until(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(1), async {
        while !cond() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached in time");
}
