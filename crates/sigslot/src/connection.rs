#![forbid(unsafe_code)]

//! Subscription handles and the shared liveness state behind them.
//!
//! A [`Connection`] identifies one subscription on a [`Signal`](crate::Signal)
//! without granting access to the signal itself. Every clone of the handle and
//! the signal's own table entry share a single reference-counted state block
//! `{connected, in_flight}`:
//!
//! - `connected` flips true → false exactly once, on the first effective
//!   disconnect. It is never set back.
//! - `in_flight` counts callback invocations currently routed through this
//!   connection. [`Connection::disconnect`] with `wait = true` spins until it
//!   reaches zero, which is the guarantee that no callback reachable only
//!   through this connection is still executing when the call returns.
//!
//! # Invariants
//!
//! 1. `in_flight` is incremented before the `connected` re-check on delivery
//!    and decremented exactly once per increment, even if the callback panics
//!    (RAII guard).
//! 2. All flag traffic uses `SeqCst`: a disconnect that flags the state and
//!    then reads `in_flight == 0` must not miss a delivery that observed
//!    `connected == true` before the flag landed.
//! 3. Handle equality is shared-state identity, never callback identity; two
//!    detached handles compare equal.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

/// Shared liveness block for one subscription.
///
/// Exactly one exists per subscription. The signal's table entry and every
/// [`Connection`] clone extend its lifetime; the entry is the sole structural
/// owner, so there is no ownership cycle.
pub(crate) struct ConnectionState {
    connected: AtomicBool,
    in_flight: AtomicUsize,
}

impl ConnectionState {
    fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            in_flight: AtomicUsize::new(0),
        }
    }
}

/// Decrements `in_flight` when dropped, so a panicking callback cannot strand
/// a waiter in `disconnect(wait = true)`.
struct InFlightGuard<'a> {
    state: &'a ConnectionState,
}

impl<'a> InFlightGuard<'a> {
    fn enter(state: &'a ConnectionState) -> Self {
        state.in_flight.fetch_add(1, Ordering::SeqCst);
        Self { state }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Caller-held handle for one subscription.
///
/// Cheap to clone; all clones refer to the same shared state. A
/// default-constructed handle is *detached*: it reports not-connected and
/// disconnecting it is a no-op.
#[derive(Clone, Default)]
pub struct Connection {
    state: Option<Arc<ConnectionState>>,
}

impl Connection {
    /// A fresh handle in the connected state. Called by `Signal::connect`.
    pub(crate) fn live() -> Self {
        Self {
            state: Some(Arc::new(ConnectionState::new())),
        }
    }

    /// Whether this subscription is still active.
    ///
    /// A detached handle always reports `false`.
    #[must_use]
    pub fn connected(&self) -> bool {
        self.state
            .as_ref()
            .is_some_and(|s| s.connected.load(Ordering::SeqCst))
    }

    /// Revoke the subscription.
    ///
    /// Returns `true` iff this call performed the true → false transition;
    /// repeated calls (and calls on a detached handle) return `false`.
    ///
    /// With `wait = true`, busy-polls (spin + yield, never parking on a lock)
    /// until no callback is in flight through this connection, regardless of
    /// whether this call was the effective disconnect. There is no timeout:
    /// the wait is bounded only by the duration of the running callbacks.
    ///
    /// Calling `disconnect(true)` from *inside* this connection's own callback
    /// spins forever — the in-flight count includes the running invocation.
    /// Use `wait = false` for self-disconnect.
    pub fn disconnect(&self, wait: bool) -> bool {
        let Some(state) = &self.state else {
            return false;
        };
        let was_connected = state.connected.swap(false, Ordering::SeqCst);
        if was_connected {
            tracing::trace!(target: "sigslot", wait, "connection disconnected");
        }
        if wait {
            self.wait_idle();
        }
        was_connected
    }

    /// Spin until no callback is executing through this connection.
    pub(crate) fn wait_idle(&self) {
        if let Some(state) = &self.state {
            while state.in_flight.load(Ordering::SeqCst) != 0 {
                std::hint::spin_loop();
                thread::yield_now();
            }
        }
    }

    /// Route one callback invocation through this connection.
    ///
    /// Increments `in_flight`, re-checks `connected` (the subscription may
    /// have been revoked between snapshot capture and now), invokes only if
    /// still connected, and decrements on scope exit. This is the only path
    /// through which subscriber callbacks execute.
    pub(crate) fn call(&self, invoke: impl FnOnce()) {
        let Some(state) = &self.state else {
            return;
        };
        let _in_flight = InFlightGuard::enter(state);
        if state.connected.load(Ordering::SeqCst) {
            invoke();
        }
    }
}

impl PartialEq for Connection {
    /// Shared-state identity: a handle found in a signal's table can be
    /// matched even after being logically disconnected. Detached handles
    /// compare equal to each other.
    fn eq(&self, other: &Self) -> bool {
        match (&self.state, &other.state) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl Eq for Connection {}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("attached", &self.state.is_some())
            .field("connected", &self.connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn detached_handle_is_inert() {
        let conn = Connection::default();
        assert!(!conn.connected());
        assert!(!conn.disconnect(false));
        assert!(!conn.disconnect(true), "wait on detached must not spin");
    }

    #[test]
    fn disconnect_is_effective_exactly_once() {
        let conn = Connection::live();
        assert!(conn.connected());

        assert!(conn.disconnect(false));
        assert!(!conn.connected());
        assert!(!conn.disconnect(false), "second disconnect is a no-op");
        assert!(!conn.disconnect(true));
    }

    #[test]
    fn clones_share_state() {
        let conn = Connection::live();
        let other = conn.clone();

        assert!(other.disconnect(false));
        assert!(!conn.connected(), "disconnect through a clone must be seen");
        assert!(!conn.disconnect(false));
    }

    #[test]
    fn equality_is_state_identity() {
        let a = Connection::live();
        let b = Connection::live();

        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_ne!(a, Connection::default());
        assert_eq!(Connection::default(), Connection::default());

        // Identity survives logical disconnect.
        let a2 = a.clone();
        a.disconnect(false);
        assert_eq!(a, a2);
    }

    #[test]
    fn call_invokes_while_connected() {
        let conn = Connection::live();
        let hits = AtomicUsize::new(0);

        conn.call(|| {
            hits.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        conn.disconnect(false);
        conn.call(|| {
            hits.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(hits.load(Ordering::SeqCst), 1, "skipped after disconnect");
    }

    #[test]
    fn call_on_detached_is_a_no_op() {
        let conn = Connection::default();
        let mut hit = false;
        conn.call(|| hit = true);
        assert!(!hit);
    }

    #[test]
    fn in_flight_unwinds_on_panic() {
        let conn = Connection::live();

        let result = catch_unwind(AssertUnwindSafe(|| {
            conn.call(|| panic!("subscriber failure"));
        }));
        assert!(result.is_err());

        // The guard must have decremented; a waiting disconnect may not spin.
        assert!(conn.disconnect(true));
    }

    #[test]
    fn self_disconnect_inside_call_completes_invocation() {
        let conn = Connection::live();
        let conn2 = conn.clone();
        let mut completed = false;

        conn.call(|| {
            assert!(conn2.disconnect(false));
            completed = true;
        });
        assert!(completed);
        assert!(!conn.connected());
    }
}
