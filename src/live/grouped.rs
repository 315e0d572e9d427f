//! Grouped multi-index reactive search
//!
//! N bindings share one attachment element; each delivery updates exactly one
//! key of the grouped state map.

use crate::binder::{bind, Teardown};
use crate::client::SearchClient;
use crate::index::Index;
use crate::input::InputElement;
use crate::results::BaseHit;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Reactive search fanning one input out to a fixed set of keyed indices.
///
/// The state map's key set is exactly the entry set of the current
/// generation; no key is ever added or removed by deliveries.
pub struct GroupedSearch {
    client: Arc<dyn SearchClient>,
    entries: Vec<(String, Index)>,
    element: Option<Arc<dyn InputElement>>,
    state: Arc<watch::Sender<HashMap<String, Vec<BaseHit>>>>,
    generation: Arc<AtomicU64>,
    bindings: Vec<Teardown>,
}

impl GroupedSearch {
    /// Create an unbound grouped hook over `(key, index)` entries
    pub fn new(client: Arc<dyn SearchClient>, entries: Vec<(String, Index)>) -> Self {
        let (state, _) = watch::channel(Self::empty_state(&entries));
        Self {
            client,
            entries,
            element: None,
            state: Arc::new(state),
            generation: Arc::new(AtomicU64::new(0)),
            bindings: Vec::new(),
        }
    }

    fn empty_state(entries: &[(String, Index)]) -> HashMap<String, Vec<BaseHit>> {
        entries
            .iter()
            .map(|(key, _)| (key.clone(), Vec::new()))
            .collect()
    }

    /// Observe the grouped result state
    pub fn results(&self) -> watch::Receiver<HashMap<String, Vec<BaseHit>>> {
        self.state.subscribe()
    }

    /// Attach (or re-attach) the shared input element
    pub fn attach(&mut self, element: Arc<dyn InputElement>) {
        self.element = Some(element);
        self.rebind();
    }

    /// Drop all bindings and the attachment
    pub fn detach(&mut self) {
        self.teardown_all();
        self.element = None;
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Replace the entry set.
    ///
    /// Compared by shallow equality (keys and index names); a referentially
    /// new but equal set does not rebind.
    pub fn set_entries(&mut self, entries: Vec<(String, Index)>) {
        let unchanged = self.entries.len() == entries.len()
            && self
                .entries
                .iter()
                .zip(entries.iter())
                .all(|((k1, i1), (k2, i2))| k1 == k2 && i1 == i2);
        if unchanged {
            return;
        }
        self.entries = entries;
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

    fn teardown_all(&mut self) {
        // Old binders are fully stopped before any new one is created
        for binding in self.bindings.drain(..) {
            binding.run();
        }
    }

    fn rebind(&mut self) {
        self.teardown_all();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_replace(Self::empty_state(&self.entries));

        let Some(ref element) = self.element else {
            return;
        };
        for (key, index) in &self.entries {
            let key = key.clone();
            let state = self.state.clone();
            let guard = self.generation.clone();
            let binding = bind(
                Some(element.clone()),
                self.client.clone(),
                index,
                move |hits| {
                    if guard.load(Ordering::SeqCst) != generation {
                        return;
                    }
                    state.send_modify(|map| {
                        map.insert(key.clone(), hits);
                    });
                },
            );
            self.bindings.push(binding);
        }
    }
}

impl Drop for GroupedSearch {
    fn drop(&mut self) {
        self.teardown_all();
    }
}
