//! Process-wide configuration knobs.
//!
//! The only knob THE CORE exposes is the worker cap for
//! [`crate::reduce::ParallelReducer`]. It's modelled as a single atomic
//! rather than threaded through every call, per the Design Notes:
//! readers snapshot it once per reduction and never re-read it inside
//! a hot loop.

use std::sync::atomic::{AtomicUsize, Ordering};

/// `0` means "unset": fall back to `std::thread::available_parallelism()`.
static MAX_THREADS: AtomicUsize = AtomicUsize::new(0);

/// Cap the number of workers a [`crate::reduce::ParallelReducer`] will
/// spawn. `None` clears the cap (hardware parallelism is used again);
/// `Some(1)` forces sequential, byte-deterministic execution.
pub fn set_max_threads(threads: Option<usize>) {
    MAX_THREADS.store(threads.unwrap_or(0), Ordering::SeqCst);
}

/// The worker cap that will be used by the next reduction.
///
/// Resolves an unset cap against `std::thread::available_parallelism()`,
/// falling back to `1` if the platform can't report it.
pub fn get_max_threads() -> usize {
    match MAX_THREADS.load(Ordering::SeqCst) {
        0 => std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
        n => n,
    }
}
