//! Live search session
//!
//! A `SearchSession` is the per-binding context object between one index and
//! one search client. Widgets register against it, `start()` fires the first
//! render and spawns the refinement pump, and `dispose()` tears everything
//! down. Each binding owns its own session; there is no shared session graph.

use crate::client::{SearchClient, SearchParams, SearchRequest};
use crate::results::BaseHit;
use crate::scheduler::{Dispatcher, Lane};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Handle for pushing query refinements into a session
#[derive(Clone)]
pub struct RefineHandle {
    tx: Arc<watch::Sender<Option<String>>>,
}

impl RefineHandle {
    /// Replace the pending refinement with `text`
    pub fn refine(&self, text: &str) {
        self.tx.send_replace(Some(text.to_string()));
    }
}

/// Widgets a session can drive.
///
/// Every widget callback is invoked once at `start()` with
/// `is_first_render = true`; the search box receives its refine handle there,
/// the hits widget an empty batch. Hits callbacks then fire once per result
/// delivery with `is_first_render = false`.
pub enum Widget {
    SearchBox(Box<dyn FnMut(&RefineHandle, bool) + Send>),
    Hits(Box<dyn FnMut(&[BaseHit], bool) + Send>),
}

struct SessionInner {
    index_name: String,
    client: Arc<dyn SearchClient>,
    refine_tx: Arc<watch::Sender<Option<String>>>,
    widgets: Arc<Mutex<Vec<Widget>>>,
    dispatcher: Dispatcher,
    pump: Mutex<Option<JoinHandle<()>>>,
    started: AtomicBool,
    disposed: AtomicBool,
}

/// A live search session scoped to one index
#[derive(Clone)]
pub struct SearchSession {
    inner: Arc<SessionInner>,
}

impl SearchSession {
    /// Create a session for `index_name` backed by `client`
    pub fn new(client: Arc<dyn SearchClient>, index_name: impl Into<String>) -> Self {
        let (refine_tx, _) = watch::channel(None);
        Self {
            inner: Arc::new(SessionInner {
                index_name: index_name.into(),
                client,
                refine_tx: Arc::new(refine_tx),
                widgets: Arc::new(Mutex::new(Vec::new())),
                dispatcher: Dispatcher::new(),
                pump: Mutex::new(None),
                started: AtomicBool::new(false),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Register a widget; must be called before `start()`
    pub fn add_widget(&self, widget: Widget) {
        self.inner
            .widgets
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(widget);
    }

    /// Register several widgets
    pub fn add_widgets(&self, widgets: Vec<Widget>) {
        for widget in widgets {
            self.add_widget(widget);
        }
    }

    /// The session's job dispatcher
    pub fn dispatcher(&self) -> Dispatcher {
        self.inner.dispatcher.clone()
    }

    /// Push a refinement programmatically
    pub fn refine(&self, text: &str) {
        self.inner.refine_tx.send_replace(Some(text.to_string()));
    }

    /// Fire the first render and start the refinement pump
    pub fn start(&self) {
        if self.inner.disposed.load(Ordering::SeqCst)
            || self.inner.started.swap(true, Ordering::SeqCst)
        {
            return;
        }

        let refine = RefineHandle {
            tx: self.inner.refine_tx.clone(),
        };
        {
            let mut widgets = self.inner.widgets.lock().unwrap_or_else(|e| e.into_inner());
            for widget in widgets.iter_mut() {
                match widget {
                    Widget::SearchBox(cb) => cb(&refine, true),
                    Widget::Hits(cb) => cb(&[], true),
                }
            }
        }

        let inner = self.inner.clone();
        // Subscribe before spawning: a receiver created inside the task would
        // treat any refinement issued between start() and the task's first
        // poll as already seen and never issue its search.
        let mut rx = self.inner.refine_tx.subscribe();
        let pump = tokio::spawn(async move {
            loop {
                if rx.changed().await.is_err() {
                    break;
                }
                let query = match rx.borrow_and_update().clone() {
                    Some(query) => query,
                    None => continue,
                };
                debug!(index = %inner.index_name, %query, "issuing refinement");

                let request =
                    SearchRequest::new(&inner.index_name, SearchParams::query(&query));
                match inner.client.search_single_index(request).await {
                    Ok(response) => {
                        // The session only reports results for its current
                        // refinement; anything superseded in flight is dropped.
                        if rx.has_changed().unwrap_or(true) {
                            debug!(index = %inner.index_name, "dropping superseded delivery");
                            continue;
                        }
                        let hits = response.hits;
                        let widgets = inner.widgets.clone();
                        inner.dispatcher.dispatch(Lane::Deferred, move || {
                            let mut widgets =
                                widgets.lock().unwrap_or_else(|e| e.into_inner());
                            for widget in widgets.iter_mut() {
                                if let Widget::Hits(cb) = widget {
                                    cb(&hits, false);
                                }
                            }
                        });
                    }
                    Err(e) => {
                        warn!(index = %inner.index_name, "refinement request failed: {}", e);
                    }
                }
            }
        });
        *self.inner.pump.lock().unwrap_or_else(|e| e.into_inner()) = Some(pump);
    }

    /// Tear the session down. Safe to call more than once.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(pump) = self
            .inner
            .pump
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            pump.abort();
        }
        self.inner.dispatcher.shutdown();
        // Dropping the widgets releases whatever their closures captured
        self.inner
            .widgets
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Whether `dispose` has run
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }
}
