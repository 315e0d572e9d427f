//! Deferred multi-index fetch orchestration
//!
//! One combined request per query change, dedup through the request cache,
//! and generation-counter stale suppression: only the latest query's result
//! is ever surfaced, no matter in which order responses resolve.

pub mod paginated;

pub use paginated::{PaginatedSearch, PaginatedState};

use crate::cache::{request_cache_key, RequestCache};
use crate::client::{SearchClient, SearchParams, SearchRequest};
use crate::config::SearchOptions;
use crate::error::SearchError;
use crate::index::IndexSet;
use crate::results::SearchResponse;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info};

/// Snapshot of a deferred fetch
#[derive(Debug, Clone)]
pub struct FetchState<D> {
    /// Latest responses, positionally typed per the index set
    pub data: Option<D>,
    /// A request for the current query is in flight
    pub is_fetching: bool,
    /// Failure of the latest request, if any
    pub error: Option<Arc<SearchError>>,
}

impl<D> Default for FetchState<D> {
    fn default() -> Self {
        Self {
            data: None,
            is_fetching: false,
            error: None,
        }
    }
}

struct MultiInner<S: IndexSet> {
    client: Arc<dyn SearchClient>,
    indices: S,
    options: SearchOptions,
    cache: RequestCache,
    generation: AtomicU64,
    query: Mutex<Option<String>>,
    state: watch::Sender<FetchState<S::Responses>>,
}

/// Orchestrator issuing one combined request per query change over a fixed
/// tuple of indices
#[derive(Clone)]
pub struct MultiSearch<S: IndexSet> {
    inner: Arc<MultiInner<S>>,
}

impl<S: IndexSet> MultiSearch<S> {
    /// Create an orchestrator with a default request cache
    pub fn new(client: Arc<dyn SearchClient>, indices: S, options: SearchOptions) -> Self {
        Self::with_cache(client, indices, options, RequestCache::default())
    }

    /// Create an orchestrator sharing a request cache
    pub fn with_cache(
        client: Arc<dyn SearchClient>,
        indices: S,
        options: SearchOptions,
        cache: RequestCache,
    ) -> Self {
        let (state, _) = watch::channel(FetchState::default());
        Self {
            inner: Arc::new(MultiInner {
                client,
                indices,
                options,
                cache,
                generation: AtomicU64::new(0),
                query: Mutex::new(None),
                state,
            }),
        }
    }

    /// Observe fetch state
    pub fn state(&self) -> watch::Receiver<FetchState<S::Responses>> {
        self.inner.state.subscribe()
    }

    /// React to a query change. Supersedes any in-flight request; an empty
    /// query issues nothing unless the orchestrator is `immediate`. Setting
    /// the query it already holds is a no-op.
    pub fn set_query(&self, query: impl Into<String>) {
        let query = query.into();
        {
            let mut current = self
                .inner
                .query
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            if current.as_deref() == Some(query.as_str()) {
                debug!(%query, "query unchanged, keeping surfaced state");
                return;
            }
            *current = Some(query.clone());
        }
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if !self.inner.options.enabled_for(&query) {
            debug!(%query, "query gated, clearing fetch state");
            self.inner.send_if_current(generation, FetchState::default());
            return;
        }

        let inner = self.inner.clone();
        tokio::spawn(async move {
            inner.fetch(generation, query).await;
        });
    }
}

impl<S: IndexSet> MultiInner<S> {
    fn send_if_current(&self, generation: u64, state: FetchState<S::Responses>) {
        if self.generation.load(Ordering::SeqCst) == generation {
            self.state.send_replace(state);
        } else {
            debug!("dropping stale fetch result");
        }
    }

    async fn fetch(&self, generation: u64, query: String) {
        let names = self.indices.names();
        info!(indices = names.len(), %query, "issuing combined search");
        self.send_if_current(
            generation,
            FetchState {
                data: None,
                is_fetching: true,
                error: None,
            },
        );

        let key = request_cache_key(&names, &query, &self.options);
        let raw = if let Some(cached) = self.cache.get(&key).await {
            debug!(%query, "request cache hit");
            (*cached).clone()
        } else {
            let requests = names
                .iter()
                .map(|name| {
                    SearchRequest::new(name, SearchParams::with_options(&query, &self.options))
                })
                .collect();
            match self.client.search(requests).await {
                Ok(raw) => {
                    let raw = align_by_name(&names, raw);
                    self.cache.set(key, Arc::new(raw.clone())).await;
                    raw
                }
                Err(e) => {
                    self.send_if_current(
                        generation,
                        FetchState {
                            data: None,
                            is_fetching: false,
                            error: Some(Arc::new(e)),
                        },
                    );
                    return;
                }
            }
        };

        let state = match self.indices.decode(raw) {
            Ok(data) => FetchState {
                data: Some(data),
                is_fetching: false,
                error: None,
            },
            Err(e) => FetchState {
                data: None,
                is_fetching: false,
                error: Some(Arc::new(e)),
            },
        };
        self.send_if_current(generation, state);
    }
}

/// Restore positional correspondence when the backend reordered the combined
/// responses. Only applies when every response names its index and the names
/// are a permutation of the requested ones; otherwise positional order is
/// trusted as-is.
fn align_by_name(names: &[String], raw: Vec<SearchResponse>) -> Vec<SearchResponse> {
    if raw.len() != names.len() || raw.iter().any(|response| response.index.is_none()) {
        return raw;
    }

    let mut counts: HashMap<&str, i64> = HashMap::new();
    for name in names {
        *counts.entry(name.as_str()).or_default() += 1;
    }
    for response in &raw {
        let index = response.index.as_deref().unwrap_or_default();
        match counts.get_mut(index) {
            Some(count) => *count -= 1,
            None => return raw,
        }
    }
    if counts.values().any(|count| *count != 0) {
        return raw;
    }

    let mut by_name: HashMap<String, VecDeque<SearchResponse>> = HashMap::new();
    for response in raw {
        let index = response.index.clone().unwrap_or_default();
        by_name.entry(index).or_default().push_back(response);
    }
    names
        .iter()
        .map(|name| {
            by_name
                .get_mut(name)
                .and_then(VecDeque::pop_front)
                .expect("multiset equality checked")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Index;
    use crate::results::Hit;
    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::Semaphore;

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Product {
        name: String,
    }

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Page {
        title: String,
    }

    fn response_for(request: &SearchRequest) -> SearchResponse {
        let field = if request.index_name == "pages" {
            "title"
        } else {
            "name"
        };
        SearchResponse {
            hits: vec![Hit::new(
                format!("{}-{}", request.index_name, request.params.query),
                json!({ field: request.params.query }),
            )],
            index: Some(request.index_name.clone()),
            nb_pages: 1,
            ..Default::default()
        }
    }

    /// Combined-query client; responses optionally reversed and gated behind
    /// semaphore permits.
    struct MultiClient {
        permits: Arc<Semaphore>,
        calls: AtomicUsize,
        reversed: bool,
    }

    impl MultiClient {
        fn open() -> Self {
            Self {
                permits: Arc::new(Semaphore::new(Semaphore::MAX_PERMITS)),
                calls: AtomicUsize::new(0),
                reversed: false,
            }
        }

        fn gated() -> Self {
            Self {
                permits: Arc::new(Semaphore::new(0)),
                calls: AtomicUsize::new(0),
                reversed: false,
            }
        }

        fn reversed() -> Self {
            Self {
                reversed: true,
                ..Self::open()
            }
        }
    }

    #[async_trait]
    impl SearchClient for MultiClient {
        async fn search(
            &self,
            requests: Vec<SearchRequest>,
        ) -> Result<Vec<SearchResponse>, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let _permit = self.permits.acquire().await.expect("semaphore open");
            let mut responses: Vec<SearchResponse> = requests.iter().map(response_for).collect();
            if self.reversed {
                responses.reverse();
            }
            Ok(responses)
        }

        async fn search_single_index(
            &self,
            request: SearchRequest,
        ) -> Result<SearchResponse, SearchError> {
            Ok(response_for(&request))
        }
    }

    struct FailingClient;

    #[async_trait]
    impl SearchClient for FailingClient {
        async fn search(
            &self,
            _requests: Vec<SearchRequest>,
        ) -> Result<Vec<SearchResponse>, SearchError> {
            Err(SearchError::Http {
                status: 500,
                body: "boom".to_string(),
            })
        }

        async fn search_single_index(
            &self,
            _request: SearchRequest,
        ) -> Result<SearchResponse, SearchError> {
            Err(SearchError::Http {
                status: 500,
                body: "boom".to_string(),
            })
        }
    }

    fn indices() -> (Index<Product>, Index<Page>) {
        (Index::new("products"), Index::new("pages"))
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..500 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn test_empty_query_issues_no_request() {
        let client = Arc::new(MultiClient::open());
        let search = MultiSearch::new(client.clone(), indices(), SearchOptions::new());
        let state = search.state();

        search.set_query("");
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
        assert!(state.borrow().data.is_none());
        assert!(!state.borrow().is_fetching);
    }

    #[tokio::test]
    async fn test_immediate_fetches_empty_query() {
        let client = Arc::new(MultiClient::open());
        let search =
            MultiSearch::new(client.clone(), indices(), SearchOptions::new().immediate());
        let state = search.state();

        search.set_query("");
        wait_until(|| state.borrow().data.is_some()).await;
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_positional_typing() {
        let client = Arc::new(MultiClient::open());
        let search = MultiSearch::new(client, indices(), SearchOptions::new());
        let state = search.state();

        search.set_query("boot");
        wait_until(|| state.borrow().data.is_some()).await;

        let snapshot = state.borrow().clone();
        let (products, pages) = snapshot.data.unwrap();
        assert_eq!(products.hits[0].data.name, "boot");
        assert_eq!(pages.hits[0].data.title, "boot");
    }

    #[tokio::test]
    async fn test_reordered_responses_realigned_by_index_name() {
        let client = Arc::new(MultiClient::reversed());
        let search = MultiSearch::new(client, indices(), SearchOptions::new());
        let state = search.state();

        search.set_query("boot");
        wait_until(|| state.borrow().data.is_some()).await;

        let snapshot = state.borrow().clone();
        let (products, pages) = snapshot.data.unwrap();
        assert_eq!(products.index.as_deref(), Some("products"));
        assert_eq!(products.hits[0].data.name, "boot");
        assert_eq!(pages.index.as_deref(), Some("pages"));
    }

    #[tokio::test]
    async fn test_stale_resolution_never_overwrites_newer_result() {
        let client = Arc::new(MultiClient::gated());
        let search = MultiSearch::new(client.clone(), indices(), SearchOptions::new());
        let state = search.state();

        search.set_query("x");
        wait_until(|| client.calls.load(Ordering::SeqCst) == 1).await;
        search.set_query("y");
        wait_until(|| client.calls.load(Ordering::SeqCst) == 2).await;

        // Resolve both; only the latest query's data may surface
        client.permits.add_permits(2);
        wait_until(|| state.borrow().data.is_some()).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        let snapshot = state.borrow().clone();
        let (products, _pages) = snapshot.data.unwrap();
        assert_eq!(products.hits[0].data.name, "y");
        assert!(!snapshot.is_fetching);
    }

    #[tokio::test]
    async fn test_repeated_key_answered_from_cache() {
        let client = Arc::new(MultiClient::open());
        let search = MultiSearch::new(client.clone(), indices(), SearchOptions::new());
        let state = search.state();

        search.set_query("boot");
        wait_until(|| state.borrow().data.is_some()).await;
        search.set_query("");
        wait_until(|| state.borrow().data.is_none()).await;
        search.set_query("boot");
        wait_until(|| state.borrow().data.is_some()).await;

        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unchanged_query_keeps_surfaced_data() {
        let client = Arc::new(MultiClient::open());
        let search = MultiSearch::new(client.clone(), indices(), SearchOptions::new());
        let mut state = search.state();

        search.set_query("boot");
        wait_until(|| state.borrow().data.is_some()).await;
        state.borrow_and_update();

        // Re-setting the identical query must not re-fetch or flicker the
        // surfaced state through a fetching snapshot.
        search.set_query("boot");
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(!state.has_changed().unwrap());
        assert!(state.borrow().data.is_some());
        assert!(!state.borrow().is_fetching);
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_request_failure_surfaces_error_state() {
        let search = MultiSearch::new(Arc::new(FailingClient), indices(), SearchOptions::new());
        let state = search.state();

        search.set_query("boot");
        wait_until(|| state.borrow().error.is_some()).await;

        let snapshot = state.borrow().clone();
        assert!(snapshot.data.is_none());
        assert!(!snapshot.is_fetching);
        assert!(snapshot.error.unwrap().is_transport());
    }

    #[test]
    fn test_align_by_name_permutation() {
        let names = vec!["a".to_string(), "b".to_string()];
        let raw = vec![
            SearchResponse {
                index: Some("b".to_string()),
                ..Default::default()
            },
            SearchResponse {
                index: Some("a".to_string()),
                ..Default::default()
            },
        ];
        let aligned = align_by_name(&names, raw);
        assert_eq!(aligned[0].index.as_deref(), Some("a"));
        assert_eq!(aligned[1].index.as_deref(), Some("b"));
    }

    #[test]
    fn test_align_by_name_falls_back_on_unknown_names() {
        let names = vec!["a".to_string(), "b".to_string()];
        let raw = vec![
            SearchResponse {
                index: Some("c".to_string()),
                ..Default::default()
            },
            SearchResponse {
                index: Some("a".to_string()),
                ..Default::default()
            },
        ];
        let aligned = align_by_name(&names, raw);
        assert_eq!(aligned[0].index.as_deref(), Some("c"));
    }
}
