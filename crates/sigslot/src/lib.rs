#![forbid(unsafe_code)]

//! Thread-safe signal/slot dispatch with lock-free emit.
//!
//! This crate provides:
//! - [`Signal`]: the publisher, owning a dynamic set of callback subscriptions
//!   and delivering payloads to every active subscriber from any thread
//! - [`Connection`]: the caller-held handle identifying one subscription and
//!   exposing its liveness and (optionally waiting) revocation
//! - [`ConnectionSet`]: batch ownership that revokes everything it tracks on
//!   drop, waiting for in-flight callbacks to drain
//!
//! # Architecture
//!
//! The subscriber table is an immutable, reference-counted snapshot replaced
//! wholesale on every structural change (copy-on-write via `arc-swap`).
//! Delivery never locks: `emit` captures the published snapshot once and
//! walks it in insertion order, routing each invocation through the entry's
//! shared `{connected, in_flight}` state. Revocation flags that state rather
//! than mutating any table, which makes connect/disconnect safe from inside a
//! callback invoked by the very delivery it participates in — including
//! self-disconnect — and makes a cross-thread `disconnect(wait = true)` able
//! to spin until the in-flight delivery finishes.
//!
//! # Invariants
//!
//! 1. Within one `emit`, subscribers run in connection order, each at most
//!    once; concurrent emits on the same signal are each internally
//!    consistent but mutually unordered.
//! 2. A subscriber connected during an emit is invisible to that emit and
//!    visible to the next.
//! 3. A subscriber disconnected during an emit (by any thread) completes any
//!    invocation already entered and is skipped from then on.
//! 4. After `disconnect(wait = true)` or `ConnectionSet` drop returns, no
//!    callback through the affected connection(s) is still executing.
//!
//! # Failure modes
//!
//! A panicking callback propagates out of [`Signal::emit`]; subscribers later
//! in that emit's order are not invoked. The dispatcher never swallows it.

pub mod connection;
pub mod connection_set;
pub mod signal;

pub use connection::Connection;
pub use connection_set::ConnectionSet;
pub use signal::Signal;
