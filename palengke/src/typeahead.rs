//! Interactive suggest input: debounce, cancellation, keyboard navigation.
//!
//! The component is an actor: UI events go in through a channel, state
//! snapshots come out through a watch, committed selections come out as
//! routes. Each debounce tick issues one request guarded by a
//! `CancellationToken`; issuing a new request cancels the previous token
//! first, so at most one request is live per input and a slow stale response
//! can never overwrite a newer one. Stale and cancelled responses are also
//! fenced by sequence number and discarded silently.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::interface::{PalengkeError, Route, SearchResult};
use crate::service::MIN_QUERY_LEN;

/// Quiet period after the last keystroke before a request fires.
pub const DEBOUNCE: Duration = Duration::from_millis(300);

/// Something that can answer suggest queries for the input.
#[async_trait]
pub trait SuggestClient: Send + Sync {
    async fn suggest(
        &self,
        query: &str,
        include_out_of_stock: bool,
    ) -> Result<Vec<SearchResult>, PalengkeError>;
}

/// Keyboard events the suggestion panel reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Down,
    Up,
    Enter,
    Escape,
}

/// The explicit states of the input, derived from the state snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Query below the minimum length, nothing pending.
    Idle,
    /// A keystroke armed the 300ms timer.
    Debouncing,
    /// Request in flight.
    Loading,
    /// Panel open with at least one suggestion.
    Open,
    /// Request succeeded with no results (or panel dismissed).
    Empty,
    /// Request failed for a reason other than cancellation.
    Error,
}

/// Snapshot of the input's visible state.
#[derive(Debug, Clone, Default)]
pub struct TypeaheadState {
    pub query: String,
    pub suggestions: Vec<SearchResult>,
    pub open: bool,
    pub loading: bool,
    pub debouncing: bool,
    /// `None` is the "nothing selected" position.
    pub selected: Option<usize>,
    pub error: Option<String>,
    pub focused: bool,
}

impl TypeaheadState {
    pub fn phase(&self) -> Phase {
        if self.loading {
            Phase::Loading
        } else if self.debouncing {
            Phase::Debouncing
        } else if self.error.is_some() {
            Phase::Error
        } else if self.open {
            Phase::Open
        } else if self.query.chars().count() < MIN_QUERY_LEN {
            Phase::Idle
        } else {
            Phase::Empty
        }
    }
}

enum Event {
    Input(String),
    Key(Key),
    ClickResult(usize),
    ClickOutside,
    Clear,
    Focus,
}

struct ResponseMsg {
    seq: u64,
    outcome: Result<Vec<SearchResult>, PalengkeError>,
}

/// Handle to a spawned typeahead actor. Dropping it shuts the actor down and
/// cancels any in-flight request.
pub struct Typeahead {
    events: mpsc::UnboundedSender<Event>,
    state_rx: watch::Receiver<TypeaheadState>,
    nav_rx: mpsc::UnboundedReceiver<Route>,
}

impl Typeahead {
    pub fn spawn(client: Arc<dyn SuggestClient>, include_out_of_stock: bool) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (resp_tx, resp_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(TypeaheadState::default());
        let (nav_tx, nav_rx) = mpsc::unbounded_channel();

        let actor = Actor {
            client,
            include_out_of_stock,
            state: TypeaheadState::default(),
            state_tx,
            nav_tx,
            resp_tx,
            seq: 0,
            inflight: None,
            debounce_deadline: None,
        };
        tokio::spawn(actor.run(events_rx, resp_rx));

        Self { events: events_tx, state_rx, nav_rx }
    }

    /// The input's current value changed (a keystroke, paste, etc).
    pub fn input(&self, text: impl Into<String>) {
        let _ = self.events.send(Event::Input(text.into()));
    }

    pub fn key(&self, key: Key) {
        let _ = self.events.send(Event::Key(key));
    }

    /// A suggestion was clicked directly; commits regardless of the current
    /// selection index.
    pub fn click_result(&self, index: usize) {
        let _ = self.events.send(Event::ClickResult(index));
    }

    pub fn click_outside(&self) {
        let _ = self.events.send(Event::ClickOutside);
    }

    /// The clear button: reset everything and refocus the input.
    pub fn clear(&self) {
        let _ = self.events.send(Event::Clear);
    }

    pub fn focus(&self) {
        let _ = self.events.send(Event::Focus);
    }

    pub fn state(&self) -> TypeaheadState {
        self.state_rx.borrow().clone()
    }

    /// Wait for the next published state change.
    pub async fn changed(&mut self) {
        let _ = self.state_rx.changed().await;
    }

    /// Route committed by the most recent selection, if any.
    pub fn try_navigation(&mut self) -> Option<Route> {
        self.nav_rx.try_recv().ok()
    }
}

struct Actor {
    client: Arc<dyn SuggestClient>,
    include_out_of_stock: bool,
    state: TypeaheadState,
    state_tx: watch::Sender<TypeaheadState>,
    nav_tx: mpsc::UnboundedSender<Route>,
    resp_tx: mpsc::UnboundedSender<ResponseMsg>,
    /// Fences stale responses: only the newest request's seq is accepted.
    seq: u64,
    inflight: Option<CancellationToken>,
    debounce_deadline: Option<Instant>,
}

impl Actor {
    async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<Event>,
        mut responses: mpsc::UnboundedReceiver<ResponseMsg>,
    ) {
        loop {
            tokio::select! {
                biased;
                ev = events.recv() => match ev {
                    Some(ev) => self.handle_event(ev),
                    // Handle dropped: tear down
                    None => break,
                },
                Some(msg) = responses.recv() => self.handle_response(msg),
                _ = async { tokio::time::sleep_until(self.debounce_deadline.unwrap()).await },
                    if self.debounce_deadline.is_some() =>
                {
                    self.debounce_deadline = None;
                    self.fire_request();
                }
            }
        }
        self.cancel_inflight();
    }

    fn handle_event(&mut self, ev: Event) {
        match ev {
            Event::Input(text) => self.on_input(text),
            Event::Key(key) => self.on_key(key),
            Event::ClickResult(index) => {
                if let Some(result) = self.state.suggestions.get(index).cloned() {
                    self.commit(result);
                }
            }
            Event::ClickOutside => {
                self.state.open = false;
                self.state.selected = None;
                self.state.focused = false;
                self.publish();
            }
            Event::Clear => {
                self.cancel_pending();
                self.state.query.clear();
                self.state.suggestions.clear();
                self.state.open = false;
                self.state.selected = None;
                self.state.error = None;
                self.state.focused = true;
                self.publish();
            }
            Event::Focus => {
                self.state.focused = true;
                if !self.state.suggestions.is_empty() {
                    self.state.open = true;
                }
                self.publish();
            }
        }
    }

    fn on_input(&mut self, text: String) {
        self.state.query = text;
        if self.state.query.chars().count() < MIN_QUERY_LEN {
            // Hard floor: no request, no pending work, panel closed
            self.cancel_pending();
            self.state.suggestions.clear();
            self.state.open = false;
            self.state.selected = None;
            self.state.error = None;
        } else {
            // Trailing debounce: every keystroke restarts the timer
            self.state.debouncing = true;
            self.debounce_deadline = Some(Instant::now() + DEBOUNCE);
        }
        self.publish();
    }

    fn on_key(&mut self, key: Key) {
        if !self.state.open {
            return;
        }
        match key {
            Key::Down => {
                let last = self.state.suggestions.len().saturating_sub(1);
                self.state.selected = match self.state.selected {
                    None => Some(0),
                    // Clamp at the last index, no wraparound
                    Some(i) if i < last => Some(i + 1),
                    keep => keep,
                };
            }
            Key::Up => {
                self.state.selected = match self.state.selected {
                    Some(0) | None => None,
                    Some(i) => Some(i - 1),
                };
            }
            Key::Enter => {
                if let Some(i) = self.state.selected {
                    if let Some(result) = self.state.suggestions.get(i).cloned() {
                        self.commit(result);
                        return;
                    }
                }
            }
            Key::Escape => {
                self.state.open = false;
                self.state.selected = None;
            }
        }
        self.publish();
    }

    fn commit(&mut self, result: SearchResult) {
        self.cancel_pending();
        self.state.query = result.name.clone();
        self.state.open = false;
        self.state.selected = None;
        let _ = self.nav_tx.send(result.route());
        self.publish();
    }

    fn fire_request(&mut self) {
        self.state.debouncing = false;
        // At most one live request: supersede the previous one first
        self.cancel_inflight();
        self.seq += 1;
        let seq = self.seq;
        let token = CancellationToken::new();
        self.inflight = Some(token.clone());
        self.state.loading = true;
        self.state.error = None;
        self.publish();

        let client = Arc::clone(&self.client);
        let query = self.state.query.clone();
        let include_out_of_stock = self.include_out_of_stock;
        let resp_tx = self.resp_tx.clone();
        tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => Err(PalengkeError::Cancelled),
                r = client.suggest(&query, include_out_of_stock) => r,
            };
            let _ = resp_tx.send(ResponseMsg { seq, outcome });
        });
    }

    fn handle_response(&mut self, msg: ResponseMsg) {
        if msg.seq != self.seq {
            // Superseded request; discard unconditionally
            return;
        }
        self.inflight = None;
        self.state.loading = false;
        match msg.outcome {
            Ok(results) => {
                self.state.open = !results.is_empty();
                self.state.suggestions = results;
                self.state.selected = None;
                self.state.error = None;
            }
            Err(err) if err.is_cancellation() => {
                // Cancellation is silent, never user-visible
                return;
            }
            Err(err) => {
                self.state.suggestions.clear();
                self.state.open = false;
                self.state.selected = None;
                self.state.error = Some(err.to_string());
            }
        }
        self.publish();
    }

    /// Cancel both the debounce timer and any in-flight request.
    fn cancel_pending(&mut self) {
        self.debounce_deadline = None;
        self.state.debouncing = false;
        self.cancel_inflight();
        self.state.loading = false;
    }

    fn cancel_inflight(&mut self) {
        if let Some(token) = self.inflight.take() {
            token.cancel();
            // The request may have finished and queued its response before
            // the cancel landed. Advance the fence so that response can no
            // longer pass the seq check in handle_response.
            self.seq += 1;
        }
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.state.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::ResultKind;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn result(kind: ResultKind, id: i64, name: &str) -> SearchResult {
        match kind {
            ResultKind::Stall => SearchResult::stall(id, name.into(), None, None, None, 80),
            ResultKind::Item => SearchResult::item(
                id,
                name.into(),
                None,
                None,
                None,
                None,
                "Stall".into(),
                true,
                80,
            ),
        }
    }

    /// Scripted client: per-query delay and canned results, call recording.
    struct ScriptedClient {
        calls: Mutex<Vec<(String, Instant)>>,
        delays: HashMap<String, Duration>,
        responses: HashMap<String, Vec<SearchResult>>,
        failures: AtomicUsize,
    }

    impl ScriptedClient {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                delays: HashMap::new(),
                responses: HashMap::new(),
                failures: AtomicUsize::new(0),
            }
        }

        fn respond(mut self, query: &str, results: Vec<SearchResult>) -> Self {
            self.responses.insert(query.into(), results);
            self
        }

        fn delay(mut self, query: &str, delay: Duration) -> Self {
            self.delays.insert(query.into(), delay);
            self
        }

        /// Fail the next N calls before any canned response applies.
        fn fail_next(self, n: usize) -> Self {
            self.failures.store(n, Ordering::SeqCst);
            self
        }

        fn call_count(&self) -> usize {
            self.calls.lock().len()
        }

        fn calls(&self) -> Vec<(String, Instant)> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl SuggestClient for ScriptedClient {
        async fn suggest(
            &self,
            query: &str,
            _include_out_of_stock: bool,
        ) -> Result<Vec<SearchResult>, PalengkeError> {
            self.calls.lock().push((query.to_string(), Instant::now()));
            if let Some(delay) = self.delays.get(query) {
                tokio::time::sleep(*delay).await;
            }
            if self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(PalengkeError::Http("connection refused".into()));
            }
            Ok(self.responses.get(query).cloned().unwrap_or_default())
        }
    }

    /// Client that holds its response until the test releases it, so a test
    /// can line the response up against a competing user event.
    struct GatedClient {
        release: tokio::sync::Notify,
        results: Vec<SearchResult>,
    }

    impl GatedClient {
        fn new(results: Vec<SearchResult>) -> Self {
            Self { release: tokio::sync::Notify::new(), results }
        }
    }

    #[async_trait]
    impl SuggestClient for GatedClient {
        async fn suggest(
            &self,
            _query: &str,
            _include_out_of_stock: bool,
        ) -> Result<Vec<SearchResult>, PalengkeError> {
            self.release.notified().await;
            Ok(self.results.clone())
        }
    }

    async fn wait_for<F>(ta: &mut Typeahead, what: &str, f: F) -> TypeaheadState
    where
        F: Fn(&TypeaheadState) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(30), async {
            loop {
                let state = ta.state();
                if f(&state) {
                    return state;
                }
                ta.changed().await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {what}"))
    }

    fn two_results() -> Vec<SearchResult> {
        vec![
            result(ResultKind::Stall, 1, "Tomato Corner"),
            result(ResultKind::Item, 2, "Fresh Tomatoes"),
        ]
    }

    // ── debounce ─────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn test_rapid_keystrokes_issue_one_request() {
        let client = Arc::new(
            ScriptedClient::new().respond("tom", two_results()),
        );
        let mut ta = Typeahead::spawn(client.clone(), false);

        let start = Instant::now();
        ta.input("t");
        tokio::time::sleep(Duration::from_millis(100)).await;
        ta.input("to");
        tokio::time::sleep(Duration::from_millis(100)).await;
        ta.input("tom");
        // One tick short of the debounce window: nothing fired yet
        tokio::time::sleep(Duration::from_millis(299)).await;
        assert_eq!(client.call_count(), 0);

        let state = wait_for(&mut ta, "open panel", |s| s.phase() == Phase::Open).await;
        assert_eq!(state.suggestions.len(), 2);
        assert_eq!(state.selected, None);

        let calls = client.calls();
        assert_eq!(calls.len(), 1, "burst must coalesce into one request");
        assert_eq!(calls[0].0, "tom");
        // Fired 300ms after the last keystroke (which came 200ms in)
        assert_eq!(calls[0].1.duration_since(start), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_query_never_calls_client() {
        let client = Arc::new(ScriptedClient::new());
        let mut ta = Typeahead::spawn(client.clone(), false);

        ta.input("t");
        tokio::time::sleep(Duration::from_secs(2)).await;
        let state = wait_for(&mut ta, "idle", |s| s.phase() == Phase::Idle).await;
        assert_eq!(client.call_count(), 0);
        assert!(state.suggestions.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shrinking_below_floor_cancels_pending_request() {
        let client = Arc::new(
            ScriptedClient::new()
                .respond("to", two_results())
                .delay("to", Duration::from_millis(500)),
        );
        let mut ta = Typeahead::spawn(client.clone(), false);

        ta.input("to");
        tokio::time::sleep(Duration::from_millis(350)).await; // request now in flight
        assert_eq!(client.call_count(), 1);
        ta.input("t"); // below floor: pending request must die silently
        tokio::time::sleep(Duration::from_secs(2)).await;

        let state = wait_for(&mut ta, "idle", |s| s.phase() == Phase::Idle).await;
        assert!(state.suggestions.is_empty());
        assert!(state.error.is_none());
    }

    // ── cancellation / last-request-wins ─────────────────────────

    #[tokio::test(start_paused = true)]
    async fn test_superseded_response_is_never_rendered() {
        // "ab" is slow, "abc" is fast; the stale "ab" response would land
        // after "abc" opened the panel if cancellation didn't fence it.
        let client = Arc::new(
            ScriptedClient::new()
                .respond("ab", vec![result(ResultKind::Stall, 9, "STALE")])
                .delay("ab", Duration::from_millis(500))
                .respond("abc", two_results())
                .delay("abc", Duration::from_millis(50)),
        );
        let mut ta = Typeahead::spawn(client.clone(), false);

        ta.input("ab");
        // Let the "ab" request start (debounce 300ms)
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(client.call_count(), 1);
        ta.input("abc");

        let state = wait_for(&mut ta, "abc results", |s| s.phase() == Phase::Open).await;
        assert_eq!(state.suggestions, two_results());

        // Even after the slow response's scheduled arrival time, nothing changes
        tokio::time::sleep(Duration::from_secs(2)).await;
        let state = ta.state();
        assert_eq!(state.suggestions, two_results());
        assert!(state.suggestions.iter().all(|r| r.name != "STALE"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_fences_out_response_already_queued() {
        // The request can complete and queue its response in the same
        // stretch as the clear. The cleared state must win regardless of
        // which lands first.
        let client = Arc::new(GatedClient::new(two_results()));
        let mut ta = Typeahead::spawn(client.clone(), false);

        ta.input("tomato");
        wait_for(&mut ta, "loading", |s| s.loading).await;

        client.release.notify_one();
        ta.clear();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let state = ta.state();
        assert!(state.query.is_empty());
        assert!(state.suggestions.is_empty(), "cleared suggestions came back");
        assert!(!state.open, "cleared panel reopened");
        assert_eq!(state.phase(), Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shrink_below_floor_fences_out_queued_response() {
        let client = Arc::new(GatedClient::new(two_results()));
        let mut ta = Typeahead::spawn(client.clone(), false);

        ta.input("tomato");
        wait_for(&mut ta, "loading", |s| s.loading).await;

        client.release.notify_one();
        ta.input("t");
        tokio::time::sleep(Duration::from_millis(50)).await;

        let state = ta.state();
        assert_eq!(state.phase(), Phase::Idle);
        assert!(state.suggestions.is_empty());
        assert!(!state.loading);
    }

    // ── keyboard navigation ──────────────────────────────────────

    async fn open_panel(client: Arc<ScriptedClient>) -> Typeahead {
        let mut ta = Typeahead::spawn(client, false);
        ta.input("tomato");
        wait_for(&mut ta, "open panel", |s| s.phase() == Phase::Open).await;
        ta
    }

    #[tokio::test(start_paused = true)]
    async fn test_arrow_navigation_clamps() {
        let client = Arc::new(ScriptedClient::new().respond("tomato", two_results()));
        let mut ta = open_panel(client).await;

        ta.key(Key::Down);
        let s = wait_for(&mut ta, "select 0", |s| s.selected == Some(0)).await;
        assert_eq!(s.phase(), Phase::Open);
        ta.key(Key::Down);
        wait_for(&mut ta, "select 1", |s| s.selected == Some(1)).await;
        // Past the end: stays on the last index
        ta.key(Key::Down);
        ta.key(Key::Down);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(ta.state().selected, Some(1));

        ta.key(Key::Up);
        wait_for(&mut ta, "select 0", |s| s.selected == Some(0)).await;
        // Above the top: back to "none selected"
        ta.key(Key::Up);
        wait_for(&mut ta, "select none", |s| s.selected.is_none()).await;
        ta.key(Key::Up);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(ta.state().selected, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enter_commits_selection_and_navigates() {
        let client = Arc::new(ScriptedClient::new().respond("tomato", two_results()));
        let mut ta = open_panel(client).await;

        // Enter with nothing selected does not commit
        ta.key(Key::Enter);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(ta.try_navigation().is_none());

        ta.key(Key::Down);
        ta.key(Key::Down);
        ta.key(Key::Enter);
        let state = wait_for(&mut ta, "committed", |s| !s.open && s.query == "Fresh Tomatoes").await;
        assert_eq!(state.selected, None);
        assert_eq!(ta.try_navigation(), Some(Route::Item(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_commits_regardless_of_selection() {
        let client = Arc::new(ScriptedClient::new().respond("tomato", two_results()));
        let mut ta = open_panel(client).await;

        ta.click_result(0);
        wait_for(&mut ta, "committed", |s| s.query == "Tomato Corner").await;
        assert_eq!(ta.try_navigation(), Some(Route::Stall(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_escape_and_click_outside_close_panel() {
        let client = Arc::new(ScriptedClient::new().respond("tomato", two_results()));
        let mut ta = open_panel(client).await;

        ta.key(Key::Down);
        ta.key(Key::Escape);
        let state = wait_for(&mut ta, "closed", |s| !s.open).await;
        assert_eq!(state.selected, None);
        // Suggestions survive; focus reopens the panel
        assert_eq!(state.suggestions.len(), 2);
        ta.focus();
        wait_for(&mut ta, "reopened", |s| s.open).await;

        ta.click_outside();
        let state = wait_for(&mut ta, "closed again", |s| !s.open).await;
        assert!(!state.focused);
    }

    // ── clear / error ────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn test_clear_resets_everything_and_refocuses() {
        let client = Arc::new(ScriptedClient::new().respond("tomato", two_results()));
        let mut ta = open_panel(client).await;

        ta.clear();
        let state = wait_for(&mut ta, "cleared", |s| s.query.is_empty()).await;
        assert!(state.suggestions.is_empty());
        assert!(!state.open);
        assert!(state.error.is_none());
        assert!(state.focused);
        assert_eq!(state.phase(), Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_surfaces_error_and_retry_recovers() {
        let client = Arc::new(
            ScriptedClient::new()
                .respond("tomato", two_results())
                .fail_next(1),
        );
        let mut ta = Typeahead::spawn(client.clone(), false);

        ta.input("tomato");
        let state = wait_for(&mut ta, "error", |s| s.phase() == Phase::Error).await;
        assert!(!state.open);
        assert!(state.suggestions.is_empty());
        assert!(state.error.as_deref().unwrap().contains("connection refused"));

        // The next keystroke naturally retries
        ta.input("tomato ");
        ta.input("tomato");
        let state = wait_for(&mut ta, "recovered", |s| s.phase() == Phase::Open).await;
        assert!(state.error.is_none());
        assert_eq!(state.suggestions.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_response_closes_panel() {
        let client = Arc::new(ScriptedClient::new());
        let mut ta = Typeahead::spawn(client.clone(), false);

        ta.input("nothing here");
        let state =
            wait_for(&mut ta, "empty", |s| !s.loading && !s.debouncing && s.phase() == Phase::Empty)
                .await;
        assert!(state.suggestions.is_empty());
        assert_eq!(client.call_count(), 1);
    }
}
