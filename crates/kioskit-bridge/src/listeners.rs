use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Ordered listeners for one channel.
///
/// Removal is by reference: `off` drops the first registration whose `Arc`
/// points at the same closure, so callers keep a clone of what they registered.
pub struct ListenerSet<T> {
    listeners: Mutex<Vec<Listener<T>>>,
}

impl<T> Default for ListenerSet<T> {
    fn default() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
        }
    }
}

impl<T> ListenerSet<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Listener<T>>> {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn on(&self, listener: Listener<T>) {
        self.lock().push(listener);
    }

    /// Returns whether a registration was removed.
    pub fn off(&self, listener: &Listener<T>) -> bool {
        let mut listeners = self.lock();
        match listeners
            .iter()
            .position(|registered| Arc::ptr_eq(registered, listener))
        {
            Some(index) => {
                listeners.remove(index);
                true
            }
            None => false,
        }
    }

    /// Call every listener in registration order.
    ///
    /// Runs over a snapshot, so listeners may register or remove listeners.
    pub fn emit(&self, value: &T) {
        let snapshot: Vec<Listener<T>> = self.lock().clone();
        for listener in snapshot {
            listener(value);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::{Listener, ListenerSet};

    fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &'static str) -> Listener<u32> {
        let log = Arc::clone(log);
        Arc::new(move |value: &u32| {
            log.lock()
                .expect("log lock should not be poisoned")
                .push(format!("{tag}:{value}"));
        })
    }

    #[test]
    fn emit_calls_listeners_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let set = ListenerSet::new();
        set.on(recorder(&log, "a"));
        set.on(recorder(&log, "b"));

        set.emit(&1);
        set.emit(&2);

        assert_eq!(
            *log.lock().expect("log lock should not be poisoned"),
            vec!["a:1", "b:1", "a:2", "b:2"]
        );
    }

    #[test]
    fn off_removes_only_the_matching_reference() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let set = ListenerSet::new();
        let first = recorder(&log, "first");
        let lookalike = recorder(&log, "first");
        set.on(Arc::clone(&first));
        set.on(lookalike);

        assert!(set.off(&first));
        assert!(!set.off(&first));
        assert_eq!(set.len(), 1);

        set.emit(&7);
        assert_eq!(
            *log.lock().expect("log lock should not be poisoned"),
            vec!["first:7"]
        );
    }

    #[test]
    fn duplicate_registration_needs_two_removals() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let set = ListenerSet::new();
        let listener = recorder(&log, "dup");
        set.on(Arc::clone(&listener));
        set.on(Arc::clone(&listener));

        set.off(&listener);
        assert_eq!(set.len(), 1);
        set.off(&listener);
        assert!(set.is_empty());
    }

    #[test]
    fn listener_can_remove_itself_during_emit() {
        let set: Arc<ListenerSet<u32>> = Arc::new(ListenerSet::new());
        let calls = Arc::new(Mutex::new(0));
        let slot: Arc<Mutex<Option<Listener<u32>>>> = Arc::new(Mutex::new(None));

        let listener: Listener<u32> = {
            let set = Arc::clone(&set);
            let calls = Arc::clone(&calls);
            let slot = Arc::clone(&slot);
            Arc::new(move |_: &u32| {
                *calls.lock().expect("calls lock should not be poisoned") += 1;
                if let Some(me) = slot.lock().expect("slot lock should not be poisoned").take() {
                    set.off(&me);
                }
            })
        };
        *slot.lock().expect("slot lock should not be poisoned") = Some(Arc::clone(&listener));
        set.on(listener);

        set.emit(&1);
        set.emit(&2);

        assert_eq!(*calls.lock().expect("calls lock should not be poisoned"), 1);
        assert!(set.is_empty());
    }
}
