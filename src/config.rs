//! Process-wide configuration flags.
//!
//! These are read-mostly: set once near process start (or left at their
//! defaults), then read on every node creation / stabilization step. A
//! `Relaxed` atomic is enough since there's no cross-thread synchronization
//! to order against: the whole engine is single-threaded.

use std::sync::atomic::{AtomicBool, Ordering};

static KEEP_NODE_CREATION_BACKTRACE: AtomicBool = AtomicBool::new(false);
static VERBOSE: AtomicBool = AtomicBool::new(false);
static DEBUG: AtomicBool = AtomicBool::new(false);

/// When enabled, every newly created node captures a `creation_backtrace`.
/// Expensive; off by default.
pub fn keep_node_creation_backtrace() -> bool {
    KEEP_NODE_CREATION_BACKTRACE.load(Ordering::Relaxed)
}

pub fn set_keep_node_creation_backtrace(enabled: bool) {
    KEEP_NODE_CREATION_BACKTRACE.store(enabled, Ordering::Relaxed);
}

pub fn verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

pub fn set_verbose(enabled: bool) {
    VERBOSE.store(enabled, Ordering::Relaxed);
}

pub fn debug() -> bool {
    DEBUG.load(Ordering::Relaxed)
}

pub fn set_debug(enabled: bool) {
    DEBUG.store(enabled, Ordering::Relaxed);
}

/// Trace line gated on `verbose`. No-op, zero-cost-ish, when disabled.
macro_rules! trace {
    ($($arg:tt)*) => {
        if $crate::config::verbose() {
            eprintln!($($arg)*);
        }
    };
}

pub(crate) use trace;
