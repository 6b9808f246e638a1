//! Feed synchronization for the home screen.
//!
//! `FeedScreen` owns the feed state and is driven from a single task: gestures
//! (`mount`, `refresh`, `dispatch`) start work, and the results of that work come
//! back as [`FeedEvent`]s over a channel to be committed by [`FeedScreen::apply`].
//! Every fetch is stamped with a generation and shares the screen's cancellation
//! token, so results arriving after unmount, or for a superseded fetch, are dropped
//! without touching state.

use std::sync::Arc;
use std::time::Duration;

use strum_macros::Display;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::api::{FeedSource, FetchError};
use crate::internal::models::FeedItem;
use crate::internal::navigation::{DetailParams, to_detail_params};

/// Immutable, wholesale-replaced list of feed items.
pub type FeedItems = Arc<[FeedItem]>;

fn no_items() -> FeedItems {
    Arc::from(Vec::new())
}

/// Where the feed is in its load cycle.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FeedPhase {
    #[default]
    Idle,
    /// First fetch after mount.
    Loading,
    Loaded(FeedItems),
    /// User refresh in flight; the current list stays on screen.
    Refreshing(FeedItems),
}

impl FeedPhase {
    pub fn items(&self) -> FeedItems {
        match self {
            FeedPhase::Idle | FeedPhase::Loading => no_items(),
            FeedPhase::Loaded(items) | FeedPhase::Refreshing(items) => Arc::clone(items),
        }
    }
}

/// What a renderer sees: the items plus the two indicator flags.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedState {
    pub items: FeedItems,
    pub is_loading: bool,
    pub is_refreshing: bool,
}

impl From<&FeedPhase> for FeedState {
    fn from(phase: &FeedPhase) -> Self {
        Self {
            items: phase.items(),
            is_loading: matches!(phase, FeedPhase::Loading),
            is_refreshing: matches!(phase, FeedPhase::Refreshing(_)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Lifecycle {
    Fresh,
    Mounted,
    Unmounted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum FetchKind {
    Initial,
    Refresh,
}

/// Results of background work, delivered back to the owning screen.
#[derive(Debug)]
pub enum FeedEvent {
    Fetched {
        generation: u64,
        kind: FetchKind,
        result: Result<Vec<FeedItem>, FetchError>,
    },
    /// The refresh indicator has been visible long enough and may be cleared.
    RefreshSettled { generation: u64 },
}

/// Gestures reported by a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedIntent {
    Refresh,
    Select(usize),
}

pub struct FeedScreen {
    source: Arc<dyn FeedSource>,
    phase: FeedPhase,
    lifecycle: Lifecycle,
    generation: u64,
    cancel: CancellationToken,
    refresh_indicator: Duration,
    event_tx: UnboundedSender<FeedEvent>,
    event_rx: UnboundedReceiver<FeedEvent>,
}

impl FeedScreen {
    /// `refresh_indicator` is the minimum time `is_refreshing` stays true after a
    /// refresh gesture, however fast the fetch returns.
    pub fn new(source: Arc<dyn FeedSource>, refresh_indicator: Duration) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            source,
            phase: FeedPhase::Idle,
            lifecycle: Lifecycle::Fresh,
            generation: 0,
            cancel: CancellationToken::new(),
            refresh_indicator,
            event_tx,
            event_rx,
        }
    }

    pub fn phase(&self) -> &FeedPhase {
        &self.phase
    }

    pub fn state(&self) -> FeedState {
        FeedState::from(&self.phase)
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_mounted(&self) -> bool {
        self.lifecycle == Lifecycle::Mounted
    }

    /// Start the initial load. Only the first call on a fresh screen does anything.
    ///
    /// Spawns the fetch with `tokio::spawn`, so this must be called from within a
    /// Tokio runtime.
    pub fn mount(&mut self) -> bool {
        if self.lifecycle != Lifecycle::Fresh {
            tracing::warn!(lifecycle = %self.lifecycle, "mount ignored");
            return false;
        }
        self.lifecycle = Lifecycle::Mounted;
        self.phase = FeedPhase::Loading;
        self.spawn_fetch(FetchKind::Initial);
        true
    }

    /// Start a user refresh. Only valid once loaded; a refresh while another fetch
    /// is pending is a no-op.
    ///
    /// Like [`FeedScreen::mount`], must be called from within a Tokio runtime.
    pub fn refresh(&mut self) -> bool {
        if !self.is_mounted() {
            return false;
        }
        let items = match &self.phase {
            FeedPhase::Loaded(items) => Arc::clone(items),
            other => {
                tracing::debug!(phase = ?phase_name(other), "refresh ignored");
                return false;
            }
        };
        self.phase = FeedPhase::Refreshing(items);
        self.spawn_fetch(FetchKind::Refresh);
        true
    }

    /// Stop committing results. In-flight work is cancelled; whatever still arrives
    /// is discarded by `apply`.
    pub fn unmount(&mut self) {
        if self.lifecycle == Lifecycle::Unmounted {
            return;
        }
        self.lifecycle = Lifecycle::Unmounted;
        self.cancel.cancel();
        tracing::debug!(generation = self.generation, "feed screen unmounted");
    }

    /// Detail parameters for the item at `index`, if there is one.
    pub fn select(&self, index: usize) -> Option<DetailParams> {
        match &self.phase {
            FeedPhase::Loaded(items) | FeedPhase::Refreshing(items) => {
                items.get(index).map(to_detail_params)
            }
            FeedPhase::Idle | FeedPhase::Loading => None,
        }
    }

    /// Handle a renderer gesture. Returns the navigation payload for selections.
    pub fn dispatch(&mut self, intent: FeedIntent) -> Option<DetailParams> {
        match intent {
            FeedIntent::Refresh => {
                self.refresh();
                None
            }
            FeedIntent::Select(index) => self.select(index),
        }
    }

    /// Wait for the next background result.
    pub async fn next_event(&mut self) -> Option<FeedEvent> {
        self.event_rx.recv().await
    }

    /// Wait for one background result and apply it.
    pub async fn pump(&mut self) -> bool {
        match self.next_event().await {
            Some(event) => self.apply(event),
            None => false,
        }
    }

    /// Apply every result that is already queued without waiting.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.event_rx.try_recv() {
            if self.apply(event) {
                applied += 1;
            }
        }
        applied
    }

    /// Commit a background result. Returns whether the state changed.
    pub fn apply(&mut self, event: FeedEvent) -> bool {
        if !self.is_mounted() {
            tracing::debug!(lifecycle = %self.lifecycle, "discarding feed event");
            return false;
        }

        match event {
            FeedEvent::Fetched {
                generation,
                kind,
                result,
            } => {
                if generation != self.generation {
                    tracing::debug!(generation, current = self.generation, %kind, "discarding stale fetch");
                    return false;
                }
                self.commit_fetch(kind, result)
            }
            FeedEvent::RefreshSettled { generation } => {
                if generation != self.generation {
                    return false;
                }
                match &self.phase {
                    FeedPhase::Refreshing(items) => {
                        self.phase = FeedPhase::Loaded(Arc::clone(items));
                        true
                    }
                    _ => false,
                }
            }
        }
    }

    fn commit_fetch(
        &mut self,
        kind: FetchKind,
        result: Result<Vec<FeedItem>, FetchError>,
    ) -> bool {
        match (&self.phase, kind) {
            (FeedPhase::Loading, FetchKind::Initial) => {
                let items = match result {
                    Ok(items) => {
                        tracing::info!(count = items.len(), "feed loaded");
                        FeedItems::from(items)
                    }
                    Err(e) => {
                        tracing::warn!(kind = e.kind(), "initial feed fetch failed: {e}");
                        no_items()
                    }
                };
                self.phase = FeedPhase::Loaded(items);
                true
            }
            (FeedPhase::Refreshing(_), FetchKind::Refresh) => match result {
                Ok(items) => {
                    tracing::info!(count = items.len(), "feed refreshed");
                    self.phase = FeedPhase::Refreshing(FeedItems::from(items));
                    true
                }
                Err(e) => {
                    tracing::warn!(kind = e.kind(), "feed refresh failed, keeping current items: {e}");
                    false
                }
            },
            (phase, kind) => {
                tracing::debug!(phase = ?phase_name(phase), %kind, "fetch result does not match phase");
                false
            }
        }
    }

    fn spawn_fetch(&mut self, kind: FetchKind) {
        self.generation += 1;
        let generation = self.generation;
        let source = Arc::clone(&self.source);
        let tx = self.event_tx.clone();
        let cancel = self.cancel.clone();
        let indicator = match kind {
            FetchKind::Initial => Duration::ZERO,
            FetchKind::Refresh => self.refresh_indicator,
        };

        tracing::debug!(generation, %kind, "starting feed fetch");

        tokio::spawn(async move {
            let started = Instant::now();
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                result = source.fetch_feed() => result,
            };

            if tx
                .send(FeedEvent::Fetched {
                    generation,
                    kind,
                    result,
                })
                .is_err()
            {
                return;
            }

            if kind == FetchKind::Refresh {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep_until(started + indicator) => {
                        let _ = tx.send(FeedEvent::RefreshSettled { generation });
                    }
                }
            }
        });
    }
}

impl Drop for FeedScreen {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn phase_name(phase: &FeedPhase) -> &'static str {
    match phase {
        FeedPhase::Idle => "idle",
        FeedPhase::Loading => "loading",
        FeedPhase::Loaded(_) => "loaded",
        FeedPhase::Refreshing(_) => "refreshing",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal::models::FeedId;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Semaphore;

    type Response = Result<Vec<FeedItem>, FetchError>;

    /// Serves queued responses; each call waits for a permit on `gate`.
    struct ScriptedSource {
        calls: AtomicUsize,
        gate: Semaphore,
        responses: Mutex<VecDeque<Response>>,
    }

    impl ScriptedSource {
        fn gated(responses: Vec<Response>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                gate: Semaphore::new(0),
                responses: Mutex::new(responses.into()),
            })
        }

        fn open(responses: Vec<Response>) -> Arc<Self> {
            let source = Self::gated(responses);
            source.release(1024);
            source
        }

        fn release(&self, n: usize) {
            self.gate.add_permits(n);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FeedSource for ScriptedSource {
        async fn fetch_feed(&self) -> Result<Vec<FeedItem>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.acquire().await.expect("gate closed").forget();
            let next = self.responses.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn item(id: u64) -> FeedItem {
        FeedItem {
            id: FeedId::Post(id),
            title: format!("Post {id}"),
            content_html: format!("<p>{id}</p>"),
            image_url: None,
            published_at: "2024-05-01T10:20:30".to_string(),
        }
    }

    fn decode_error() -> FetchError {
        FetchError::Decode {
            reason: "test".to_string(),
        }
    }

    fn ids(state: &FeedState) -> Vec<FeedId> {
        state.items.iter().map(|i| i.id.clone()).collect()
    }

    const INDICATOR: Duration = Duration::from_millis(2000);

    async fn loaded_screen(source: Arc<ScriptedSource>) -> FeedScreen {
        let mut screen = FeedScreen::new(source, INDICATOR);
        assert!(screen.mount());
        assert!(screen.pump().await);
        screen
    }

    #[test]
    fn test_initial_state_is_idle_and_empty() {
        let screen = FeedScreen::new(ScriptedSource::open(vec![]), INDICATOR);
        let state = screen.state();
        assert_eq!(screen.phase(), &FeedPhase::Idle);
        assert!(state.items.is_empty());
        assert!(!state.is_loading);
        assert!(!state.is_refreshing);
    }

    #[tokio::test]
    async fn test_mount_loads_items() {
        let source = ScriptedSource::open(vec![Ok(vec![item(1), item(2)])]);
        let mut screen = FeedScreen::new(source.clone(), INDICATOR);

        assert!(screen.mount());
        assert!(screen.state().is_loading);

        assert!(screen.pump().await);
        let state = screen.state();
        assert!(!state.is_loading);
        assert!(!state.is_refreshing);
        assert_eq!(ids(&state), vec![FeedId::Post(1), FeedId::Post(2)]);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_mount_twice_is_ignored() {
        let source = ScriptedSource::open(vec![Ok(vec![item(1)])]);
        let mut screen = loaded_screen(source.clone()).await;
        assert!(!screen.mount());
        tokio::task::yield_now().await;
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_result_is_loaded() {
        let screen = loaded_screen(ScriptedSource::open(vec![Ok(vec![])])).await;
        assert_eq!(screen.phase(), &FeedPhase::Loaded(no_items()));
        assert!(!screen.state().is_loading);
    }

    #[tokio::test]
    async fn test_initial_failure_settles_on_empty_list() {
        let screen = loaded_screen(ScriptedSource::open(vec![Err(decode_error())])).await;
        let state = screen.state();
        assert!(state.items.is_empty());
        assert!(!state.is_loading);
        assert!(matches!(screen.phase(), FeedPhase::Loaded(_)));
    }

    #[tokio::test]
    async fn test_refresh_requires_loaded() {
        let source = ScriptedSource::gated(vec![Ok(vec![item(1)])]);
        let mut screen = FeedScreen::new(source.clone(), INDICATOR);
        assert!(!screen.refresh(), "refresh before mount");

        screen.mount();
        assert!(!screen.refresh(), "refresh while loading");
        assert_eq!(screen.phase(), &FeedPhase::Loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_replaces_items_and_holds_indicator() {
        let source = ScriptedSource::open(vec![Ok(vec![item(1)]), Ok(vec![item(2), item(3)])]);
        let mut screen = loaded_screen(source.clone()).await;

        let started = Instant::now();
        assert!(screen.refresh());
        assert!(screen.state().is_refreshing);
        assert_eq!(ids(&screen.state()), vec![FeedId::Post(1)]);

        assert!(screen.pump().await);
        let state = screen.state();
        assert_eq!(ids(&state), vec![FeedId::Post(2), FeedId::Post(3)]);
        assert!(state.is_refreshing, "indicator stays up after instant fetch");

        assert!(screen.pump().await);
        assert!(!screen.state().is_refreshing);
        assert!(started.elapsed() >= INDICATOR);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_failure_keeps_items() {
        let source = ScriptedSource::open(vec![Ok(vec![item(1), item(2)]), Err(decode_error())]);
        let mut screen = loaded_screen(source).await;
        let before = screen.state().items;

        assert!(screen.refresh());
        assert!(!screen.pump().await);
        assert!(screen.state().is_refreshing);

        assert!(screen.pump().await);
        let state = screen.state();
        assert!(!state.is_refreshing);
        assert_eq!(state.items, before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_recovers_after_initial_failure() {
        let source = ScriptedSource::open(vec![Err(decode_error()), Ok(vec![item(4), item(5)])]);
        let mut screen = loaded_screen(source.clone()).await;
        assert!(screen.state().items.is_empty());

        assert!(screen.refresh());
        assert!(screen.pump().await);
        assert!(screen.pump().await);

        let state = screen.state();
        assert!(!state.is_loading);
        assert!(!state.is_refreshing);
        assert_eq!(ids(&state), vec![FeedId::Post(4), FeedId::Post(5)]);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_accepted_again_after_failed_refresh() {
        let source = ScriptedSource::open(vec![
            Ok(vec![item(1)]),
            Err(decode_error()),
            Ok(vec![item(2)]),
        ]);
        let mut screen = loaded_screen(source.clone()).await;

        assert!(screen.refresh());
        assert!(!screen.pump().await);
        assert!(screen.pump().await);
        assert_eq!(ids(&screen.state()), vec![FeedId::Post(1)]);
        assert!(!screen.state().is_refreshing);

        assert!(screen.refresh());
        assert!(screen.pump().await);
        assert!(screen.pump().await);

        let state = screen.state();
        assert!(!state.is_refreshing);
        assert_eq!(ids(&state), vec![FeedId::Post(2)]);
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_refresh_while_pending_is_ignored() {
        let source = ScriptedSource::gated(vec![
            Ok(vec![item(1)]),
            Ok(vec![item(2)]),
            Ok(vec![item(3)]),
        ]);
        source.release(1);
        let mut screen = loaded_screen(source.clone()).await;

        assert!(screen.refresh());
        assert!(!screen.refresh());
        assert!(screen.dispatch(FeedIntent::Refresh).is_none());

        source.release(2);
        assert!(screen.pump().await);
        assert!(screen.pump().await);
        tokio::time::sleep(INDICATOR).await;
        assert_eq!(screen.drain(), 0);

        assert_eq!(source.calls(), 2);
        assert_eq!(ids(&screen.state()), vec![FeedId::Post(2)]);
        assert!(!screen.state().is_refreshing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolution_after_unmount_is_discarded() {
        let source = ScriptedSource::gated(vec![Ok(vec![item(1)])]);
        let mut screen = FeedScreen::new(source.clone(), INDICATOR);
        screen.mount();
        tokio::task::yield_now().await;

        screen.unmount();
        let at_unmount = screen.state();

        source.release(1);
        tokio::time::sleep(Duration::from_millis(50)).await;
        screen.drain();

        assert_eq!(screen.state(), at_unmount);
        assert_eq!(screen.lifecycle(), Lifecycle::Unmounted);
    }

    #[tokio::test]
    async fn test_event_after_unmount_does_not_mutate() {
        let source = ScriptedSource::gated(vec![]);
        let mut screen = FeedScreen::new(source, INDICATOR);
        screen.mount();
        screen.unmount();
        let at_unmount = screen.state();

        let applied = screen.apply(FeedEvent::Fetched {
            generation: 1,
            kind: FetchKind::Initial,
            result: Ok(vec![item(9)]),
        });

        assert!(!applied);
        assert_eq!(screen.state(), at_unmount);
        assert!(!screen.refresh());
    }

    #[tokio::test]
    async fn test_stale_generation_is_discarded() {
        let source = ScriptedSource::gated(vec![]);
        let mut screen = FeedScreen::new(source, INDICATOR);
        screen.mount();

        let applied = screen.apply(FeedEvent::Fetched {
            generation: 0,
            kind: FetchKind::Initial,
            result: Ok(vec![item(9)]),
        });

        assert!(!applied);
        assert!(screen.state().is_loading);
    }

    #[tokio::test]
    async fn test_select_builds_detail_params_without_fetching() {
        let source = ScriptedSource::open(vec![Ok(vec![item(1), item(2)])]);
        let mut screen = loaded_screen(source.clone()).await;

        let params = screen.dispatch(FeedIntent::Select(1)).unwrap();
        assert_eq!(params.title, "Post 2");
        assert_eq!(params.content_html, "<p>2</p>");
        assert!(screen.dispatch(FeedIntent::Select(5)).is_none());

        tokio::task::yield_now().await;
        assert_eq!(source.calls(), 1);
    }
}
