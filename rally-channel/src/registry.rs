//! Event-name → listener registry.
//!
//! Listeners are kept per event name in registration order. The same
//! listener may be registered more than once; each registration is invoked
//! and each must be removed separately. Identity is `Arc` pointer equality.
//!
//! The registry carries a generation counter. The channel bumps it on every
//! disconnect so that a session still draining events from a torn-down
//! transport can tell its deliveries are stale.

use rally_core::RoomUpdate;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Callback invoked with the event payload.
pub type Listener = Arc<dyn Fn(&Value) + Send + Sync>;

/// Wrap a closure as a [`Listener`].
pub fn listener<F>(f: F) -> Listener
where
    F: Fn(&Value) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap a closure taking decoded `roomUpdate` payloads.
///
/// Payloads that do not decode are logged and skipped.
pub fn room_update_listener<F>(f: F) -> Listener
where
    F: Fn(RoomUpdate) + Send + Sync + 'static,
{
    listener(move |payload| match RoomUpdate::from_payload(payload) {
        Ok(update) => f(update),
        Err(e) => log::warn!("Ignoring malformed roomUpdate payload: {e}"),
    })
}

fn same_listener(a: &Listener, b: &Listener) -> bool {
    // Data pointers only, vtables can be duplicated.
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

#[derive(Default)]
pub struct ListenerRegistry {
    listeners: HashMap<String, Vec<Listener>>,
    generation: u64,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener for `event`.
    pub fn add(&mut self, event: &str, listener: Listener) {
        self.listeners
            .entry(event.to_string())
            .or_default()
            .push(listener);
    }

    /// Remove the first registration of `listener` under `event`.
    ///
    /// Returns whether one was removed.
    pub fn remove(&mut self, event: &str, listener: &Listener) -> bool {
        let Some(list) = self.listeners.get_mut(event) else {
            return false;
        };
        let Some(index) = list.iter().position(|l| same_listener(l, listener)) else {
            return false;
        };
        list.remove(index);
        if list.is_empty() {
            self.listeners.remove(event);
        }
        true
    }

    /// Clone out the listeners for `event` so they can be invoked without
    /// holding whatever lock guards the registry.
    pub fn snapshot(&self, event: &str) -> Vec<Listener> {
        self.listeners.get(event).cloned().unwrap_or_default()
    }

    /// Drop every listener and start a new generation.
    pub fn reset(&mut self) -> u64 {
        self.listeners.clear();
        self.generation += 1;
        self.generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn count(&self, event: &str) -> usize {
        self.listeners.get(event).map_or(0, Vec::len)
    }

}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<&str, usize> = self
            .listeners
            .iter()
            .map(|(name, list)| (name.as_str(), list.len()))
            .collect();
        f.debug_struct("ListenerRegistry")
            .field("listeners", &counts)
            .field("generation", &self.generation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> Listener {
        let log = log.clone();
        listener(move |_| log.lock().unwrap().push(tag))
    }

    fn deliver(registry: &ListenerRegistry, event: &str, payload: &Value) {
        for l in registry.snapshot(event) {
            l(payload);
        }
    }

    #[test]
    fn test_delivery_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::new();
        registry.add("roomUpdate", recorder(&log, "a"));
        registry.add("roomUpdate", recorder(&log, "b"));
        registry.add("roomUpdate", recorder(&log, "c"));

        deliver(&registry, "roomUpdate", &json!({}));
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_duplicates_retained_and_removed_one_at_a_time() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::new();
        let a = recorder(&log, "a");
        registry.add("roomUpdate", a.clone());
        registry.add("roomUpdate", a.clone());
        assert_eq!(registry.count("roomUpdate"), 2);

        deliver(&registry, "roomUpdate", &Value::Null);
        assert_eq!(log.lock().unwrap().len(), 2);

        assert!(registry.remove("roomUpdate", &a));
        assert_eq!(registry.count("roomUpdate"), 1);
        assert!(registry.remove("roomUpdate", &a));
        assert!(!registry.remove("roomUpdate", &a));
        assert_eq!(registry.count("roomUpdate"), 0);
    }

    #[test]
    fn test_remove_only_touches_matching_listener() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::new();
        let a = recorder(&log, "a");
        let b = recorder(&log, "b");
        registry.add("roomUpdate", a.clone());
        registry.add("roomUpdate", b.clone());
        registry.add("roomUpdate", a.clone());

        registry.remove("roomUpdate", &a);
        deliver(&registry, "roomUpdate", &Value::Null);
        assert_eq!(*log.lock().unwrap(), vec!["b", "a"]);
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::new();
        let a = recorder(&log, "a");
        let stranger = recorder(&log, "a");
        registry.add("roomUpdate", a);

        assert!(!registry.remove("nothing", &stranger));
        assert!(!registry.remove("roomUpdate", &stranger));
        assert_eq!(registry.count("roomUpdate"), 1);
    }

    #[test]
    fn test_room_update_listener_decodes() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let l = room_update_listener(move |update| s.lock().unwrap().push(update));

        l(&json!({"roomId": 3, "groupList": []}));
        l(&json!({"groupList": "not a list"}));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].id, Some(3));
        assert_eq!(seen[0].groups, Some(vec![]));
    }

    #[test]
    fn test_events_are_independent() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::new();
        registry.add("roomUpdate", recorder(&log, "room"));
        registry.add("error", recorder(&log, "error"));

        deliver(&registry, "error", &Value::Null);
        assert_eq!(*log.lock().unwrap(), vec!["error"]);
        assert_eq!(registry.count("roomUpdate"), 1);
        assert_eq!(registry.count("error"), 1);
    }

    #[test]
    fn test_reset_clears_and_bumps_generation() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::new();
        registry.add("roomUpdate", recorder(&log, "a"));
        assert_eq!(registry.generation(), 0);

        assert_eq!(registry.reset(), 1);
        assert_eq!(registry.count("roomUpdate"), 0);
        assert_eq!(registry.generation(), 1);
    }

    #[test]
    fn test_snapshot_unaffected_by_later_changes() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::new();
        let a = recorder(&log, "a");
        registry.add("roomUpdate", a.clone());

        let snapshot = registry.snapshot("roomUpdate");
        registry.remove("roomUpdate", &a);
        assert_eq!(snapshot.len(), 1);
        assert!(registry.snapshot("roomUpdate").is_empty());
    }
}
