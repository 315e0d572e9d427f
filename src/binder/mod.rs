//! Subscription binder
//!
//! Bridges one input element and one search client to one index descriptor,
//! producing a push stream of typed result batches. The returned teardown is
//! idempotent and is the only way to stop the binding's listeners.

use crate::client::SearchClient;
use crate::index::Index;
use crate::input::{InputElement, ListenerId};
use crate::results::{decode_hits, Hit};
use crate::scheduler::Lane;
use crate::session::{SearchSession, Widget};
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Idempotent teardown for one binding.
///
/// The first `run()` removes the binding's input listener and disposes its
/// session; every later call is a no-op.
pub struct Teardown {
    action: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Teardown {
    /// Teardown that does nothing, for bindings that never attached
    pub fn noop() -> Self {
        Self {
            action: Mutex::new(None),
        }
    }

    fn new(action: impl FnOnce() + Send + 'static) -> Self {
        Self {
            action: Mutex::new(Some(Box::new(action))),
        }
    }

    /// Run the teardown. Safe to call more than once.
    pub fn run(&self) {
        let action = self.action.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(action) = action {
            action();
        }
    }

    /// Whether `run` has already executed (or there was nothing to do)
    pub fn is_spent(&self) -> bool {
        self.action
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_none()
    }
}

/// Delivery phase of one subscription: nothing is applied until the first
/// signal (the initial render) has been observed.
enum Phase {
    AwaitingFirstSignal,
    Live,
}

/// Attach `element` to `index` through `client`.
///
/// Registers an input listener that forwards text changes as query
/// refinements on the immediate lane, and a hits widget that invokes
/// `on_result` with decoded batches on the deferred lane. With no element to
/// attach, binding is skipped and a no-op teardown is returned.
pub fn bind<T, F>(
    element: Option<Arc<dyn InputElement>>,
    client: Arc<dyn SearchClient>,
    index: &Index<T>,
    on_result: F,
) -> Teardown
where
    T: DeserializeOwned + Send + 'static,
    F: Fn(Vec<Hit<T>>) + Send + 'static,
{
    let Some(element) = element else {
        debug!(index = %index.name, "no input element attached, skipping bind");
        return Teardown::noop();
    };

    let session = SearchSession::new(client, &index.name);
    let dispatcher = session.dispatcher();
    let listener_id: Arc<Mutex<Option<ListenerId>>> = Arc::new(Mutex::new(None));

    let search_box = {
        let element = element.clone();
        let listener_id = listener_id.clone();
        Widget::SearchBox(Box::new(move |refine, is_first_render| {
            if !is_first_render {
                return;
            }
            let refine = refine.clone();
            let dispatcher = dispatcher.clone();
            let id = element.add_input_listener(Arc::new(move |text| {
                let refine = refine.clone();
                let text = text.to_string();
                dispatcher.dispatch(Lane::Immediate, move || refine.refine(&text));
            }));
            *listener_id.lock().unwrap_or_else(|e| e.into_inner()) = Some(id);
        }))
    };

    let hits = {
        let mut phase = Phase::AwaitingFirstSignal;
        Widget::Hits(Box::new(move |items, _is_first_render| {
            if matches!(phase, Phase::AwaitingFirstSignal) {
                phase = Phase::Live;
                return;
            }
            on_result(decode_hits(items));
        }))
    };

    session.add_widgets(vec![search_box, hits]);
    session.start();

    Teardown::new(move || {
        if let Some(id) = listener_id.lock().unwrap_or_else(|e| e.into_inner()).take() {
            element.remove_input_listener(id);
        }
        session.dispose();
    })
}
