//! Reactive search state
//!
//! Hook-style owners that keep an attachment slot, rebind on input changes,
//! and expose current results through watch channels.

mod grouped;

pub use grouped::GroupedSearch;

use crate::binder::{bind, Teardown};
use crate::client::SearchClient;
use crate::index::Index;
use crate::input::InputElement;
use crate::results::Hit;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Reactive search over one index.
///
/// Holds at most one live binding; attaching an element, changing the index,
/// or changing the client tears the previous binding down and starts fresh.
/// Results are observed through [`SingleIndexSearch::results`] and start
/// empty for every new binding.
pub struct SingleIndexSearch<T = serde_json::Value> {
    client: Arc<dyn SearchClient>,
    index: Index<T>,
    element: Option<Arc<dyn InputElement>>,
    results: Arc<watch::Sender<Vec<Hit<T>>>>,
    generation: Arc<AtomicU64>,
    binding: Teardown,
}

impl<T> SingleIndexSearch<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Create an unbound hook for `index`
    pub fn new(client: Arc<dyn SearchClient>, index: Index<T>) -> Self {
        let (results, _) = watch::channel(Vec::new());
        Self {
            client,
            index,
            element: None,
            results: Arc::new(results),
            generation: Arc::new(AtomicU64::new(0)),
            binding: Teardown::noop(),
        }
    }

    /// Observe the current result batch
    pub fn results(&self) -> watch::Receiver<Vec<Hit<T>>> {
        self.results.subscribe()
    }

    /// Attach (or re-attach) the input element
    pub fn attach(&mut self, element: Arc<dyn InputElement>) {
        self.element = Some(element);
        self.rebind();
    }

    /// Drop the current binding and attachment
    pub fn detach(&mut self) {
        self.binding.run();
        self.binding = Teardown::noop();
        self.element = None;
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Switch to a different index, rebinding if it actually changed
    pub fn set_index(&mut self, index: Index<T>) {
        if self.index == index {
            return;
        }
        self.index = index;
        self.rebind();
    }

    /// Switch to a different client, rebinding if it actually changed
    pub fn set_client(&mut self, client: Arc<dyn SearchClient>) {
        if Arc::ptr_eq(&self.client, &client) {
            return;
        }
        self.client = client;
        self.rebind();
    }

    fn rebind(&mut self) {
        self.binding.run();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.results.send_replace(Vec::new());

        let results = self.results.clone();
        let guard = self.generation.clone();
        self.binding = bind(
            self.element.clone(),
            self.client.clone(),
            &self.index,
            move |hits| {
                // A superseded binding's deliveries never reach current state
                if guard.load(Ordering::SeqCst) == generation {
                    results.send_replace(hits);
                }
            },
        );
    }
}

impl<T> Drop for SingleIndexSearch<T> {
    fn drop(&mut self) {
        self.binding.run();
    }
}
