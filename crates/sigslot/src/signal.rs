#![forbid(unsafe_code)]

//! The publisher side: [`Signal<T>`] and its copy-on-write subscriber table.
//!
//! # Architecture
//!
//! The subscriber table is an immutable `Arc<Vec<Slot>>` published through
//! [`arc_swap::ArcSwap`]. Structural mutation (connect, disconnect_all) never
//! edits the current vector: writers build a replacement under a single write
//! `Mutex` and publish it atomically. Delivery takes no lock at all — `emit`
//! captures the snapshot pointer once and iterates it, so a delivery that is
//! already running keeps its table even while writers replace the published
//! one.
//!
//! Revocation is flag-only: `disconnect` flips the entry's shared
//! [`Connection`] state and leaves the entry physically in place. Dead entries
//! are dropped lazily, the next time `connect` rebuilds the vector.
//!
//! # Invariants
//!
//! 1. Subscribers are delivered to in connection (insertion) order.
//! 2. Once published, a snapshot's entry sequence never changes; only the
//!    entries' shared `connected` flags may flip.
//! 3. A subscriber connected from inside a callback is invisible to the emit
//!    that is currently running and visible to every later emit.
//! 4. A subscriber disconnected mid-delivery (including by itself) is skipped
//!    by the per-connection re-check on invocation, never by table surgery.
//!
//! # Failure modes
//!
//! A panicking callback propagates out of [`Signal::emit`]; subscribers later
//! in that snapshot are not invoked. The dispatcher does not intercept it.

use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;

use crate::connection::Connection;

/// One subscriber-table entry: the shared connection state plus the callback.
struct Slot<T> {
    conn: Connection,
    callback: Arc<dyn Fn(&T) + Send + Sync>,
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
            callback: Arc::clone(&self.callback),
        }
    }
}

/// A thread-safe subject delivering values to every connected subscriber.
///
/// `T` is the argument payload; use a tuple for multi-argument signals.
/// Callbacks receive the payload by reference, so `T` needs no `Clone` bound.
///
/// ```
/// use sigslot::Signal;
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicI32, Ordering};
///
/// let sig = Signal::<i32>::new();
/// let hits = Arc::new(AtomicI32::new(0));
///
/// let h = Arc::clone(&hits);
/// let conn = sig.connect(move |v| {
///     h.fetch_add(*v, Ordering::SeqCst);
/// });
///
/// sig.emit(&21);
/// sig.emit(&21);
/// conn.disconnect(false);
/// sig.emit(&100); // not delivered
///
/// assert_eq!(hits.load(Ordering::SeqCst), 42);
/// ```
pub struct Signal<T> {
    slots: ArcSwap<Vec<Slot<T>>>,
    /// Serializes snapshot replacement; delivery never takes it.
    write: Mutex<()>,
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Signal<T> {
    /// A signal with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: ArcSwap::from_pointee(Vec::new()),
            write: Mutex::new(()),
        }
    }

    /// Subscribe `callback` and return its [`Connection`] handle.
    ///
    /// Rebuilds the table from all still-connected entries plus the new one
    /// and publishes it atomically. Deliveries already in progress keep the
    /// snapshot they captured and will not see the new subscriber.
    pub fn connect<F>(&self, callback: F) -> Connection
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let conn = Connection::live();
        let slot = Slot {
            conn: conn.clone(),
            callback: Arc::new(callback),
        };

        let _write = self.write.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.slots.load();
        let mut next: Vec<Slot<T>> = Vec::with_capacity(current.len() + 1);
        // Compaction point: entries flagged dead since the last rebuild are
        // dropped here.
        next.extend(current.iter().filter(|s| s.conn.connected()).cloned());
        next.push(slot);
        let len = next.len();
        self.slots.store(Arc::new(next));

        tracing::trace!(target: "sigslot", subscribers = len, "connected");
        conn
    }

    /// Subscribe a bound method on a shared target object.
    ///
    /// Convenience form of [`connect`](Self::connect) that captures a clone of
    /// `target` and forwards each payload to `method(&target, args)`.
    pub fn connect_to<O, F>(&self, target: &Arc<O>, method: F) -> Connection
    where
        O: Send + Sync + 'static,
        F: Fn(&O, &T) + Send + Sync + 'static,
    {
        let target = Arc::clone(target);
        self.connect(move |args| method(&target, args))
    }

    /// Revoke one subscription of this signal.
    ///
    /// Returns `false` if `conn` is not currently connected or does not belong
    /// to this signal. On success the entry is flagged disconnected but stays
    /// physically present until the table is next rebuilt; future deliveries
    /// skip it via the per-connection re-check.
    pub fn disconnect(&self, conn: &Connection) -> bool {
        if !conn.connected() {
            return false;
        }

        let _write = self.write.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.slots.load();
        if current.iter().any(|s| s.conn == *conn) {
            conn.disconnect(false);
            true
        } else {
            false
        }
    }

    /// Revoke every subscription.
    ///
    /// Publishes an empty table first (no new delivery can see the old
    /// subscribers), then flags every previous entry disconnected. Deliveries
    /// already iterating the old snapshot skip the flagged entries.
    pub fn disconnect_all(&self) {
        let _write = self.write.lock().unwrap_or_else(PoisonError::into_inner);
        let old = self.slots.swap(Arc::new(Vec::new()));
        for slot in old.iter() {
            slot.conn.disconnect(false);
        }
        if !old.is_empty() {
            tracing::trace!(target: "sigslot", dropped = old.len(), "cleared all subscribers");
        }
    }

    /// Whether `conn` is an active subscription of *this* signal.
    pub fn connected(&self, conn: &Connection) -> bool {
        if !conn.connected() {
            return false;
        }
        self.slots.load().iter().any(|s| s.conn == *conn)
    }

    /// Deliver `args` to every subscriber connected at snapshot capture.
    ///
    /// Lock-free: reads the published table pointer once and visits entries in
    /// insertion order. Subscribers added after that read are invisible to
    /// this call; subscribers disconnected mid-delivery are skipped.
    ///
    /// A panic in a callback propagates to the caller of `emit`; subscribers
    /// later in the snapshot are not invoked.
    pub fn emit(&self, args: &T) {
        let snapshot = self.slots.load_full();
        for slot in snapshot.iter() {
            slot.conn.call(|| (slot.callback)(args));
        }
    }
}

impl<T> Drop for Signal<T> {
    fn drop(&mut self) {
        self.disconnect_all();
    }
}
