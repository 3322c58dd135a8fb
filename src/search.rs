// Debounced user search
// Turns raw keystrokes into at most one outstanding search request and makes
// sure an old response can never overwrite a newer one.
//
// `QueryMachine` holds the pure state transitions; `DebouncedSearch` drives it
// with Tokio timers and the backend API.

use log::{debug, info};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api::{search_terms, SocialApi};
use crate::error::SyncError;
use crate::models::SearchResult;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(400);

/// Queries this short (after trimming) never reach the network
pub const MAX_IGNORED_QUERY_LEN: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryState {
    Idle,
    /// Waiting out the debounce window
    Pending { query: String },
    /// Request `seq` is on the wire
    Querying { seq: u64, query: String },
    /// Results for request `seq` are displayed
    Resolved { seq: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    /// Results were cleared; nothing to schedule
    Cleared,
    /// (Re)start the debounce timer for this query
    Schedule { query: String },
}

/// A request the driver should send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedQuery {
    pub seq: u64,
    pub terms: Vec<String>,
}

#[derive(Debug)]
pub struct QueryMachine {
    state: QueryState,
    results: Vec<SearchResult>,
    last_issued: u64,
    // Only a response carrying this sequence number may touch `results`
    accepting: Option<u64>,
}

impl QueryMachine {
    pub fn new() -> Self {
        QueryMachine {
            state: QueryState::Idle,
            results: Vec::new(),
            last_issued: 0,
            accepting: None,
        }
    }

    pub fn input(&mut self, raw: &str) -> InputAction {
        let query = raw.trim();
        if query.chars().count() <= MAX_IGNORED_QUERY_LEN {
            self.reset();
            return InputAction::Cleared;
        }

        self.state = QueryState::Pending { query: query.to_string() };
        InputAction::Schedule { query: query.to_string() }
    }

    /// Debounce window elapsed: move to `Querying` with a fresh sequence number
    pub fn fire(&mut self) -> Option<IssuedQuery> {
        let QueryState::Pending { query } = &self.state else {
            return None;
        };
        let query = query.clone();

        self.last_issued += 1;
        let seq = self.last_issued;
        self.accepting = Some(seq);
        let terms = search_terms(&query);
        self.state = QueryState::Querying { seq, query };
        Some(IssuedQuery { seq, terms })
    }

    /// Apply the outcome of request `seq`. Returns false if it was stale.
    pub fn complete(&mut self, seq: u64, outcome: Result<Vec<SearchResult>, SyncError>) -> bool {
        if self.accepting != Some(seq) {
            debug!("Discarding stale search response #{} (accepting {:?})", seq, self.accepting);
            return false;
        }

        let in_flight = matches!(&self.state, QueryState::Querying { seq: current, .. } if *current == seq);
        match outcome {
            Ok(users) => {
                debug!("Search #{} returned {} users", seq, users.len());
                self.results = users;
                if in_flight {
                    self.state = QueryState::Resolved { seq };
                }
            }
            Err(e) => {
                // Search is advisory; failures only empty the list
                debug!("Search #{} failed: {}", seq, e);
                self.results.clear();
                self.accepting = None;
                if in_flight {
                    self.state = QueryState::Idle;
                }
            }
        }
        true
    }

    pub fn reset(&mut self) {
        self.state = QueryState::Idle;
        self.results.clear();
        self.accepting = None;
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    pub fn last_issued(&self) -> u64 {
        self.last_issued
    }
}

impl Default for QueryMachine {
    fn default() -> Self {
        Self::new()
    }
}

struct Driver {
    machine: QueryMachine,
    timer: Option<JoinHandle<()>>,
    // Identifies the live debounce timer; older timers see a mismatch and bail
    timer_generation: u64,
}

struct Inner {
    api: Arc<dyn SocialApi>,
    delay: Duration,
    driver: Mutex<Driver>,
    results_tx: watch::Sender<Vec<SearchResult>>,
    state_tx: watch::Sender<QueryState>,
}

impl Inner {
    fn driver(&self) -> MutexGuard<'_, Driver> {
        self.driver.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, machine: &QueryMachine) {
        let results = machine.results();
        self.results_tx.send_if_modified(|current| {
            if current.as_slice() == results {
                false
            } else {
                *current = results.to_vec();
                true
            }
        });
        let state = machine.state();
        self.state_tx.send_if_modified(|current| {
            if *current == *state {
                false
            } else {
                *current = state.clone();
                true
            }
        });
    }
}

/// Search box controller. Cloning shares the same state.
#[derive(Clone)]
pub struct DebouncedSearch {
    inner: Arc<Inner>,
}

impl DebouncedSearch {
    pub fn new(api: Arc<dyn SocialApi>) -> Self {
        Self::with_delay(api, DEFAULT_DEBOUNCE)
    }

    pub fn with_delay(api: Arc<dyn SocialApi>, delay: Duration) -> Self {
        let (results_tx, _) = watch::channel(Vec::new());
        let (state_tx, _) = watch::channel(QueryState::Idle);
        DebouncedSearch {
            inner: Arc::new(Inner {
                api,
                delay,
                driver: Mutex::new(Driver {
                    machine: QueryMachine::new(),
                    timer: None,
                    timer_generation: 0,
                }),
                results_tx,
                state_tx,
            }),
        }
    }

    /// Feed the current contents of the search box.
    /// Must be called from inside a Tokio runtime.
    pub fn input(&self, raw: &str) {
        let mut driver = self.inner.driver();
        if let Some(timer) = driver.timer.take() {
            timer.abort();
        }
        driver.timer_generation += 1;

        let action = driver.machine.input(raw);
        self.inner.publish(&driver.machine);

        if let InputAction::Schedule { query } = action {
            debug!("Debouncing search for '{}'", query);
            let generation = driver.timer_generation;
            let inner = self.inner.clone();
            driver.timer = Some(tokio::spawn(async move {
                tokio::time::sleep(inner.delay).await;
                run_query(inner, generation).await;
            }));
        }
    }

    /// Drop any pending or in-flight query and empty the results
    pub fn clear(&self) {
        self.input("");
    }

    pub fn results(&self) -> Vec<SearchResult> {
        self.inner.results_tx.borrow().clone()
    }

    pub fn state(&self) -> QueryState {
        self.inner.state_tx.borrow().clone()
    }

    pub fn subscribe_results(&self) -> watch::Receiver<Vec<SearchResult>> {
        self.inner.results_tx.subscribe()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<QueryState> {
        self.inner.state_tx.subscribe()
    }

    /// Number of requests issued so far
    pub fn issued(&self) -> u64 {
        self.inner.driver().machine.last_issued()
    }
}

async fn run_query(inner: Arc<Inner>, generation: u64) {
    let issued = {
        let mut driver = inner.driver();
        if driver.timer_generation != generation {
            return;
        }
        // Detach from the timer slot so later keystrokes can't abort the request
        driver.timer = None;
        let issued = driver.machine.fire();
        inner.publish(&driver.machine);
        issued
    };
    let Some(IssuedQuery { seq, terms }) = issued else {
        return;
    };

    info!("Searching users #{}: {:?}", seq, terms);
    let outcome = inner.api.search_users(&terms).await;

    let mut driver = inner.driver();
    if driver.machine.complete(seq, outcome) {
        inner.publish(&driver.machine);
    }
}
