//! Paginated single-index fetch orchestration
//!
//! Pages accumulate in arrival order for one query; a query change discards
//! the whole accumulation and restarts from page zero. At most one page
//! request is in flight at a time.

use crate::client::{SearchClient, SearchParams, SearchRequest};
use crate::config::SearchOptions;
use crate::error::SearchError;
use crate::index::Index;
use crate::results::{decode_response, SearchResponse};
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Snapshot of a paginated fetch
#[derive(Debug, Clone)]
pub struct PaginatedState<T> {
    /// Fetched pages, in increasing page order
    pub pages: Vec<SearchResponse<T>>,
    /// A page request is in flight
    pub is_fetching: bool,
    /// The most recently fetched page is not the last one
    pub has_next_page: bool,
    /// Failure of the latest page request, if any
    pub error: Option<Arc<SearchError>>,
}

impl<T> Default for PaginatedState<T> {
    fn default() -> Self {
        Self {
            pages: Vec::new(),
            is_fetching: false,
            has_next_page: false,
            error: None,
        }
    }
}

impl<T> PaginatedState<T> {
    /// All hits fetched so far, across pages
    pub fn hits(&self) -> impl Iterator<Item = &crate::results::Hit<T>> {
        self.pages.iter().flat_map(|page| page.hits.iter())
    }
}

struct PaginatedInner<T> {
    client: Arc<dyn SearchClient>,
    index: Index<T>,
    options: SearchOptions,
    generation: AtomicU64,
    in_flight: AtomicBool,
    // Also serializes state commits against query resets
    query: Mutex<Option<String>>,
    state: watch::Sender<PaginatedState<T>>,
}

/// Orchestrator for incremental pagination over one index
#[derive(Clone)]
pub struct PaginatedSearch<T = serde_json::Value> {
    inner: Arc<PaginatedInner<T>>,
}

/// Next page to request after `last`, or `None` when `last` is terminal
fn next_page_param<T>(last: &SearchResponse<T>) -> Option<u32> {
    if last.has_next_page() {
        Some(last.page + 1)
    } else {
        None
    }
}

impl<T> PaginatedSearch<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn new(client: Arc<dyn SearchClient>, index: Index<T>, options: SearchOptions) -> Self {
        let (state, _) = watch::channel(PaginatedState::default());
        Self {
            inner: Arc::new(PaginatedInner {
                client,
                index,
                options,
                generation: AtomicU64::new(0),
                in_flight: AtomicBool::new(false),
                query: Mutex::new(None),
                state,
            }),
        }
    }

    /// Observe pagination state
    pub fn state(&self) -> watch::Receiver<PaginatedState<T>> {
        self.inner.state.subscribe()
    }

    /// React to a query change: discard all accumulated pages and restart
    /// from page zero. Setting the same query again is a no-op.
    pub fn set_query(&self, query: impl Into<String>) {
        let query = query.into();
        let generation = {
            let mut current = self.inner.query.lock().unwrap_or_else(|e| e.into_inner());
            if current.as_deref() == Some(query.as_str()) {
                return;
            }
            *current = Some(query.clone());
            let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            // The superseded query's accumulation is replaced wholesale
            self.inner.state.send_replace(PaginatedState::default());
            self.inner.in_flight.store(false, Ordering::SeqCst);
            generation
        };

        if !self.inner.options.enabled_for(&query) {
            debug!(%query, "query gated, pagination idle");
            return;
        }
        self.inner.in_flight.store(true, Ordering::SeqCst);
        self.spawn_fetch(generation, query, 0);
    }

    /// Request the next page. Returns false without issuing anything when no
    /// next page exists or a page request is already in flight.
    pub fn fetch_next_page(&self) -> bool {
        let next = {
            let state = self.inner.state.borrow();
            if !state.has_next_page {
                return false;
            }
            match state.pages.last().and_then(next_page_param) {
                Some(next) => next,
                None => return false,
            }
        };
        if self
            .inner
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        let query = self
            .inner
            .query
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let Some(query) = query else {
            self.inner.in_flight.store(false, Ordering::SeqCst);
            return false;
        };
        let generation = self.inner.generation.load(Ordering::SeqCst);
        self.spawn_fetch(generation, query, next);
        true
    }

    fn spawn_fetch(&self, generation: u64, query: String, page: u32) {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            inner.fetch_page(generation, query, page).await;
        });
    }
}

impl<T> PaginatedInner<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    async fn fetch_page(&self, generation: u64, query: String, page: u32) {
        {
            let _commit = self.query.lock().unwrap_or_else(|e| e.into_inner());
            if !self.is_current(generation) {
                return;
            }
            self.state.send_modify(|state| state.is_fetching = true);
        }

        let params = SearchParams {
            query,
            page: Some(page),
            hits_per_page: self.options.hits_per_page,
        };
        let request = SearchRequest::new(&self.index.name, params);
        let result = self.client.search_single_index(request).await;

        // Commit under the query lock so a concurrent reset either happens
        // entirely before or entirely after this delivery
        let _commit = self.query.lock().unwrap_or_else(|e| e.into_inner());
        if !self.is_current(generation) {
            debug!(index = %self.index.name, page, "dropping page for superseded query");
            return;
        }
        match result {
            Ok(raw) => {
                let response = decode_response::<T>(raw);
                self.state.send_modify(|state| {
                    state.is_fetching = false;
                    state.error = None;
                    if response.page as usize == state.pages.len() {
                        state.has_next_page = response.has_next_page();
                        state.pages.push(response);
                    } else {
                        warn!(
                            index = %self.index.name,
                            got = response.page,
                            expected = state.pages.len(),
                            "dropping out-of-sequence page"
                        );
                    }
                });
            }
            Err(e) => {
                self.state.send_modify(|state| {
                    state.is_fetching = false;
                    state.error = Some(Arc::new(e));
                });
            }
        }
        self.in_flight.store(false, Ordering::SeqCst);
    }
}
