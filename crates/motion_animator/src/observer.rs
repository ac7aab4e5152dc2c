//! Per-tick update observers

use crate::scheduler::Animator;
use slotmap::{new_key_type, SlotMap};
use std::sync::Arc;

new_key_type! {
    /// Handle to a registered update observer
    pub struct ObserverKey;
}

/// Notified once per tick, after deferred removal has run
pub trait AnimatorObserver: Send + Sync {
    fn animator_did_update(&self, animator: &Animator, dt: f32);
}

impl<F> AnimatorObserver for F
where
    F: Fn(&Animator, f32) + Send + Sync,
{
    fn animator_did_update(&self, animator: &Animator, dt: f32) {
        self(animator, dt)
    }
}

/// Keyed storage for update observers
///
/// Slotmap keys carry a generation, so a removed key never matches a later
/// registration.
#[derive(Default)]
pub(crate) struct ObserverRegistry {
    observers: SlotMap<ObserverKey, Arc<dyn AnimatorObserver>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, observer: Arc<dyn AnimatorObserver>) -> ObserverKey {
        self.observers.insert(observer)
    }

    pub fn get(&self, key: ObserverKey) -> Option<Arc<dyn AnimatorObserver>> {
        self.observers.get(key).cloned()
    }

    pub fn remove(&mut self, key: ObserverKey) {
        self.observers.remove(key);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Copy of every observer, for notification outside the animator lock
    pub fn snapshot(&self) -> Vec<Arc<dyn AnimatorObserver>> {
        self.observers.values().cloned().collect()
    }
}
