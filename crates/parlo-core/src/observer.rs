use std::sync::{Arc, Weak};

use crate::session::CallSession;
use crate::state::CallState;

/// Receives synchronous notifications when a call session changes.
///
/// Callbacks are invoked while the session's exclusive lock is held, so
/// the values they receive are always consistent with every other field
/// of the session. The flip side is a reentrancy hazard: a callback
/// must not call any locking method on the same session (`set_state`,
/// `state`, `connection_duration`, ...), or it deadlocks. The lock-free
/// accessors (`local_id`, `signaling_id`, `remote_number`, `direction`,
/// `created_at`) are safe to call from inside a callback.
///
/// Callbacks run on whichever thread performed the mutation (signaling,
/// UI, or telephony integration) and must return quickly: a slow
/// observer blocks every other thread touching the session.
pub trait CallObserver: Send + Sync {
    /// The call entered `state`.
    fn state_did_change(&self, session: &CallSession, state: CallState);

    /// Local video was enabled or disabled.
    fn has_video_did_change(&self, session: &CallSession, has_video: bool);

    /// The microphone was muted or unmuted.
    fn mute_did_change(&self, session: &CallSession, is_muted: bool);

    /// The speakerphone was enabled or disabled.
    fn speakerphone_did_change(&self, session: &CallSession, is_enabled: bool);
}

/// Ordered collection of non-owning observer handles.
///
/// Entries never extend the lifetime of the observer they point to. A
/// UI view that is torn down mid-call simply drops its observer; the
/// stale handle is skipped and removed on the next notification pass.
///
/// Lives inside the session's lock, so none of these methods need their
/// own synchronization.
pub(crate) struct ObserverRegistry {
    entries: Vec<Weak<dyn CallObserver>>,
}

impl ObserverRegistry {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a handle. Registration order is delivery order.
    pub(crate) fn add(&mut self, observer: Weak<dyn CallObserver>) {
        self.entries.push(observer);
    }

    /// Remove every handle referring to `target` (pointer identity, not
    /// equality), as well as any handle whose observer is gone.
    pub(crate) fn remove(&mut self, target: &Arc<dyn CallObserver>) {
        self.entries.retain(|entry| match entry.upgrade() {
            Some(observer) => !Arc::ptr_eq(&observer, target),
            None => false,
        });
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of handles whose observer is still alive.
    pub(crate) fn live_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.strong_count() > 0)
            .count()
    }

    /// Invoke `notify` once per live observer, in registration order,
    /// compacting dead handles along the way.
    pub(crate) fn for_each_live<F>(&mut self, mut notify: F)
    where
        F: FnMut(&Arc<dyn CallObserver>),
    {
        self.entries.retain(|entry| match entry.upgrade() {
            Some(observer) => {
                notify(&observer);
                true
            }
            None => false,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopObserver;

    impl CallObserver for NoopObserver {
        fn state_did_change(&self, _session: &CallSession, _state: CallState) {}
        fn has_video_did_change(&self, _session: &CallSession, _has_video: bool) {}
        fn mute_did_change(&self, _session: &CallSession, _is_muted: bool) {}
        fn speakerphone_did_change(&self, _session: &CallSession, _is_enabled: bool) {}
    }

    fn make_observer() -> Arc<dyn CallObserver> {
        Arc::new(NoopObserver)
    }

    #[test]
    fn notifies_each_live_handle_once() {
        let mut registry = ObserverRegistry::new();
        let a = make_observer();
        let b = make_observer();
        registry.add(Arc::downgrade(&a));
        registry.add(Arc::downgrade(&b));

        let mut visited = 0;
        registry.for_each_live(|_| visited += 1);
        assert_eq!(visited, 2);
    }

    #[test]
    fn dead_handles_are_skipped_and_compacted() {
        let mut registry = ObserverRegistry::new();
        let a = make_observer();
        let b = make_observer();
        registry.add(Arc::downgrade(&a));
        registry.add(Arc::downgrade(&b));
        drop(a);

        let mut visited = 0;
        registry.for_each_live(|_| visited += 1);
        assert_eq!(visited, 1);
        assert_eq!(registry.entries.len(), 1);
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn remove_drops_all_handles_for_the_same_observer() {
        let mut registry = ObserverRegistry::new();
        let a = make_observer();
        let b = make_observer();
        // Double registration of `a` is defensive territory: a single
        // remove must still drop both handles.
        registry.add(Arc::downgrade(&a));
        registry.add(Arc::downgrade(&b));
        registry.add(Arc::downgrade(&a));

        registry.remove(&a);
        assert_eq!(registry.live_count(), 1);

        let mut visited = 0;
        registry.for_each_live(|observer| {
            assert!(Arc::ptr_eq(observer, &b));
            visited += 1;
        });
        assert_eq!(visited, 1);
    }

    #[test]
    fn remove_absent_observer_is_a_noop() {
        let mut registry = ObserverRegistry::new();
        let a = make_observer();
        let stranger = make_observer();
        registry.add(Arc::downgrade(&a));

        registry.remove(&stranger);
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn clear_empties_the_registry() {
        let mut registry = ObserverRegistry::new();
        let a = make_observer();
        registry.add(Arc::downgrade(&a));
        registry.clear();
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn delivery_follows_registration_order() {
        let mut registry = ObserverRegistry::new();
        let observers: Vec<Arc<dyn CallObserver>> =
            (0..4).map(|_| make_observer()).collect();
        for observer in &observers {
            registry.add(Arc::downgrade(observer));
        }

        let mut order = Vec::new();
        registry.for_each_live(|observer| {
            let index = observers
                .iter()
                .position(|o| Arc::ptr_eq(o, observer))
                .unwrap();
            order.push(index);
        });
        assert_eq!(order, vec![0, 1, 2, 3]);
    }
}
