//! Lock-step sequencing for multi-threaded dispatch tests.
//!
//! A [`Stepper`] is a shared monotonically increasing step counter. Each
//! participant parks (spin + yield) until the counter reaches its step, runs
//! its action, and advances the counter by one. This turns inherently racy
//! cross-thread scenarios into deterministic scripts: every interleaving the
//! test cares about is forced, not hoped for.

use std::sync::atomic::{AtomicI32, Ordering};
use std::thread;
use std::time::Duration;

pub struct Stepper {
    value: AtomicI32,
}

impl Stepper {
    pub fn new() -> Self {
        Self {
            value: AtomicI32::new(0),
        }
    }

    /// Wait for step `v`, then advance.
    pub fn reached(&self, v: i32) {
        self.execute_at(v, || {});
    }

    /// Wait for step `v`, sleep for `dur`, then advance.
    pub fn delay(&self, v: i32, dur: Duration) {
        self.execute_at(v, || thread::sleep(dur));
    }

    /// Wait for step `v`, run `f`, then advance.
    ///
    /// Panics if steps run out of order (two participants claiming the same
    /// step, or a step skipped).
    pub fn execute_at<F: FnOnce()>(&self, v: i32, f: F) {
        while self.value.load(Ordering::SeqCst) < v {
            thread::yield_now();
        }
        assert_eq!(self.value.load(Ordering::SeqCst), v, "step claimed twice");
        f();
        assert_eq!(self.value.load(Ordering::SeqCst), v, "step advanced during action");
        self.value.store(v + 1, Ordering::SeqCst);
    }

    /// Run `f` immediately; report whether the counter had passed `v` by the
    /// time it returned. Used to prove a blocking call outlasted a step.
    pub fn returns_after<F: FnOnce()>(&self, v: i32, f: F) -> bool {
        f();
        self.value.load(Ordering::SeqCst) > v
    }
}
