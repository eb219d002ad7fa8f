//! Process-wide once-only warning flag.
//!
//! A handler dropping its request without replying is recovered (the slot
//! is answered with a 503), so it warrants one warning, not one per drop.
//! The flag is never reset; `swap` makes exactly one concurrent caller the
//! winner.

use std::sync::atomic::{AtomicBool, Ordering};

static DROPPED_REPLY_WARNED: AtomicBool = AtomicBool::new(false);

/// True exactly once per process: for the first dropped reply slot.
pub(crate) fn first_dropped_reply() -> bool {
    !DROPPED_REPLY_WARNED.swap(true, Ordering::Relaxed)
}
