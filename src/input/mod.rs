//! Attachment elements: live text-input sources
//!
//! An `InputElement` is anything that can hand its current text value to
//! registered listeners, the addEventListener/removeEventListener contract of
//! the embedding UI. `TextInput` is the in-memory implementation used by
//! tests and headless embedders.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Callback receiving the element's current text value
pub type InputListener = Arc<dyn Fn(&str) + Send + Sync>;

/// Handle identifying one registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// A live text-input source
pub trait InputElement: Send + Sync {
    /// Register a listener for input changes
    fn add_input_listener(&self, listener: InputListener) -> ListenerId;

    /// Remove a listener; returns false if it was already removed
    fn remove_input_listener(&self, id: ListenerId) -> bool;

    /// Current text value
    fn value(&self) -> String;
}

#[derive(Default)]
struct TextInputState {
    value: String,
    listeners: Vec<(ListenerId, InputListener)>,
}

/// In-memory input element with an observable listener registry
#[derive(Default)]
pub struct TextInput {
    state: Mutex<TextInputState>,
    next_id: AtomicU64,
}

impl TextInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value and notify every listener with it
    pub fn set_value(&self, value: impl Into<String>) {
        let value = value.into();
        let listeners: Vec<InputListener> = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.value = value.clone();
            state.listeners.iter().map(|(_, l)| l.clone()).collect()
        };
        // Invoke outside the lock so a listener may re-enter the registry
        for listener in listeners {
            listener(&value);
        }
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .listeners
            .len()
    }
}

impl InputElement for TextInput {
    fn add_input_listener(&self, listener: InputListener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .listeners
            .push((id, listener));
        id
    }

    fn remove_input_listener(&self, id: ListenerId) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let before = state.listeners.len();
        state.listeners.retain(|(listener_id, _)| *listener_id != id);
        state.listeners.len() != before
    }

    fn value(&self) -> String {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .value
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listeners_receive_values() {
        let input = TextInput::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let id = input.add_input_listener(Arc::new(move |value| {
            sink.lock().unwrap().push(value.to_string());
        }));

        input.set_value("s");
        input.set_value("sh");
        assert_eq!(*seen.lock().unwrap(), vec!["s", "sh"]);
        assert_eq!(input.value(), "sh");

        assert!(input.remove_input_listener(id));
        input.set_value("sho");
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_remove_twice_is_a_noop() {
        let input = TextInput::new();
        let id = input.add_input_listener(Arc::new(|_| {}));
        assert_eq!(input.listener_count(), 1);
        assert!(input.remove_input_listener(id));
        assert!(!input.remove_input_listener(id));
        assert_eq!(input.listener_count(), 0);
    }
}
