//! Subscription fan-out — delivers decoded status readings to listeners.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use meshlight_domain::address::MeshAddress;
use meshlight_domain::color::ColorReading;

/// Receives every decoded status reading.
///
/// Listeners run on the dispatching task and must return promptly; a
/// listener that panics is logged and skipped.
pub trait StatusListener: Send + Sync {
    fn on_status(&self, address: MeshAddress, reading: &ColorReading);
}

impl<F> StatusListener for F
where
    F: Fn(MeshAddress, &ColorReading) + Send + Sync,
{
    fn on_status(&self, address: MeshAddress, reading: &ColorReading) {
        self(address, reading);
    }
}

/// Handle returned by [`ListenerRegistry::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Entry = (ListenerId, Arc<dyn StatusListener>);

/// Ordered collection of listeners, invoked in registration order.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: RwLock<Vec<Entry>>,
}

impl ListenerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl StatusListener + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let listener: Arc<dyn StatusListener> = Arc::new(listener);
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(entry_id, _)| *entry_id != id);
        listeners.len() != before
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke every listener with one reading.
    ///
    /// Works on a snapshot, so listeners may subscribe or unsubscribe from
    /// inside their callback.
    pub fn dispatch(&self, address: MeshAddress, reading: &ColorReading) {
        let snapshot: Vec<Entry> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for (id, listener) in snapshot {
            let outcome = catch_unwind(AssertUnwindSafe(|| listener.on_status(address, reading)));
            if outcome.is_err() {
                tracing::warn!(listener = id.0, %address, "status listener panicked");
            }
        }
    }
}
