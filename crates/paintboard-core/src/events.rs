//! Pixel update notifications.

use serde::{Deserialize, Serialize};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// An accepted paint operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelUpdate {
    pub x: usize,
    pub y: usize,
    pub color: u8,
}

/// Handle returned by [`Subscribers::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&PixelUpdate) + Send + Sync>;

/// Callback registry for [`PixelUpdate`]s.
///
/// Delivery is synchronous and best-effort: a listener that panics is
/// logged and skipped, and the remaining listeners still run.
#[derive(Default)]
pub struct Subscribers {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(SubscriptionId, Listener)>>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl Fn(&PixelUpdate) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, Arc::new(listener)));
        id
    }

    /// Returns `false` if the subscription was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        let before = listeners.len();
        listeners.retain(|(sid, _)| *sid != id);
        listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn emit(&self, update: &PixelUpdate) {
        // Listeners run outside the registry lock so they may (un)subscribe.
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, l)| l.clone())
            .collect();

        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(update))).is_err() {
                log::error!("Pixel update listener panicked on {update:?}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_emit_reaches_all() {
        let subs = Subscribers::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for n in 0..3 {
            let seen = seen.clone();
            subs.subscribe(move |u| seen.lock().unwrap().push((n, u.color)));
        }
        subs.emit(&PixelUpdate { x: 1, y: 2, color: 7 });
        assert_eq!(*seen.lock().unwrap(), vec![(0, 7), (1, 7), (2, 7)]);
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let subs = Subscribers::new();
        let hits = Arc::new(AtomicU64::new(0));
        subs.subscribe(|_| panic!("listener failure"));
        let counter = hits.clone();
        subs.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        subs.emit(&PixelUpdate { x: 0, y: 0, color: 1 });
        subs.emit(&PixelUpdate { x: 0, y: 0, color: 2 });
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unsubscribe() {
        let subs = Subscribers::new();
        let id = subs.subscribe(|_| {});
        assert_eq!(subs.len(), 1);
        assert!(subs.unsubscribe(id));
        assert!(!subs.unsubscribe(id));
        assert!(subs.is_empty());
    }
}
