#![forbid(unsafe_code)]

//! Batch ownership of connections for a logical scope.
//!
//! A [`ConnectionSet`] tracks connections obtained from one or more signals so
//! a composite owner (typically a struct whose callbacks capture `self`'s
//! shared state) can release them all at once. Dropping the set performs a
//! *waiting* teardown: when the destructor returns, no callback through any
//! previously-tracked connection is still executing — the guarantee an owner
//! needs before its own members start to destruct.
//!
//! Teardown is two-phase: every tracked connection is flagged first, and only
//! then waited on. Concurrently running callbacks across different
//! connections drain in parallel instead of being serialized one wait at a
//! time.

use crate::connection::Connection;
use crate::signal::Signal;
use std::sync::Arc;

/// Ordered collection of tracked [`Connection`]s.
///
/// ```
/// use sigslot::{ConnectionSet, Signal};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicI32, Ordering};
///
/// let sig = Signal::<i32>::new();
/// let total = Arc::new(AtomicI32::new(0));
///
/// let mut conns = ConnectionSet::new();
/// let t = Arc::clone(&total);
/// conns.connect(&sig, move |v| {
///     t.fetch_add(*v, Ordering::SeqCst);
/// });
///
/// sig.emit(&42);
/// drop(conns); // flags, then waits: no callback runs past this line
///
/// sig.emit(&100); // not delivered
/// assert_eq!(total.load(Ordering::SeqCst), 42);
/// ```
#[derive(Default)]
pub struct ConnectionSet {
    conns: Vec<Connection>,
}

impl ConnectionSet {
    /// An empty set.
    #[must_use]
    pub fn new() -> Self {
        Self { conns: Vec::new() }
    }

    /// Subscribe `callback` on `signal`, track the resulting connection, and
    /// return it.
    pub fn connect<T, F>(&mut self, signal: &Signal<T>, callback: F) -> Connection
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let conn = signal.connect(callback);
        self.conns.push(conn.clone());
        conn
    }

    /// Subscribe a bound method on a shared target, tracking the connection.
    ///
    /// Mirrors [`Signal::connect_to`].
    pub fn connect_to<T, O, F>(
        &mut self,
        signal: &Signal<T>,
        target: &Arc<O>,
        method: F,
    ) -> Connection
    where
        O: Send + Sync + 'static,
        F: Fn(&O, &T) + Send + Sync + 'static,
    {
        let conn = signal.connect_to(target, method);
        self.conns.push(conn.clone());
        conn
    }

    /// Adopt an externally created connection into this set's lifecycle.
    pub fn hold(&mut self, conn: Connection) {
        self.conns.push(conn);
    }

    /// Number of tracked connections (including already-disconnected ones).
    #[must_use]
    pub fn len(&self) -> usize {
        self.conns.len()
    }

    /// Whether the set tracks no connections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conns.is_empty()
    }

    /// Disconnect every tracked connection and forget them.
    ///
    /// With `wait = true`: flag all connections first, then wait on each in
    /// turn. By the time this returns, no callback through any of them is
    /// still executing. Must not be called (with `wait = true`) from inside
    /// one of the tracked callbacks; see [`Connection::disconnect`].
    pub fn disconnect_all(&mut self, wait: bool) {
        for conn in &self.conns {
            conn.disconnect(false);
        }
        if wait {
            for conn in &self.conns {
                conn.wait_idle();
            }
        }
        self.conns.clear();
    }
}

impl Drop for ConnectionSet {
    fn drop(&mut self) {
        self.disconnect_all(true);
    }
}

impl std::fmt::Debug for ConnectionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSet")
            .field("tracked", &self.conns.len())
            .finish()
    }
}
