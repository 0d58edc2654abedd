//! Listener registry and fan-out.
//!
//! Dispatch iterates over a snapshot taken under a brief lock, so listeners
//! may register or unsubscribe (themselves included) from inside a callback.

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rotel_parser::DeviceMessage;
use tracing::error;

/// Callback invoked for every decoded message.
pub type Listener = Arc<dyn Fn(&DeviceMessage) + Send + Sync>;

/// Unique identifier of a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// The set of listeners of one client.
#[derive(Default)]
pub(crate) struct ListenerSet {
    next_id: AtomicU64,
    listeners: Mutex<BTreeMap<ListenerId, Listener>>,
}

impl ListenerSet {
    pub(crate) fn add(&self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.listeners.lock().insert(id, listener);
        id
    }

    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        self.listeners.lock().remove(&id).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    fn snapshot(&self) -> Vec<(ListenerId, Listener)> {
        self.listeners
            .lock()
            .iter()
            .map(|(id, listener)| (*id, Arc::clone(listener)))
            .collect()
    }

    /// Deliver a message to every listener registered at call time.
    ///
    /// A panicking listener is logged and skipped.
    pub(crate) fn dispatch(&self, message: &DeviceMessage) {
        for (id, listener) in self.snapshot() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener(message)));
            if outcome.is_err() {
                error!("Listener {} panicked while handling {}", id, message);
            }
        }
    }
}

/// Handle returned by `add_listener`; removes the listener when asked.
///
/// Dropping the handle leaves the listener registered. Use
/// [`into_guard`](Self::into_guard) for scope-bound registration.
#[derive(Clone)]
pub struct ListenerHandle {
    id: ListenerId,
    set: Weak<ListenerSet>,
}

impl ListenerHandle {
    pub(crate) fn new(id: ListenerId, set: &Arc<ListenerSet>) -> Self {
        Self {
            id,
            set: Arc::downgrade(set),
        }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Remove the listener. Returns false if it was already removed or the
    /// client is gone; never panics.
    pub fn unsubscribe(&self) -> bool {
        self.set
            .upgrade()
            .map(|set| set.remove(self.id))
            .unwrap_or(false)
    }

    /// Convert into a guard that unsubscribes on drop.
    pub fn into_guard(self) -> ListenerGuard {
        ListenerGuard { handle: self }
    }
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandle").field("id", &self.id).finish()
    }
}

/// Unsubscribes its listener when dropped.
#[derive(Debug)]
pub struct ListenerGuard {
    handle: ListenerHandle,
}

impl ListenerGuard {
    pub fn id(&self) -> ListenerId {
        self.handle.id
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.handle.unsubscribe();
    }
}
