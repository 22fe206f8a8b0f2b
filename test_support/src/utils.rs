// Common utilities for tests, demos and benches

use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// How long a thread has to stay parked before we believe it is blocked rather than slow.
pub const BLOCKED_GRACE: Duration = Duration::from_millis(100);

/// Split `total` items across `parts` workers, handing the remainder out one each to the first
/// workers.
pub fn split_evenly(total: u32, parts: u32) -> Vec<u32> {
    assert!(parts > 0, "need at least one worker");

    let base = total / parts;
    let extra = total % parts;
    (0..parts)
        .map(|idx| if idx < extra { base + 1 } else { base })
        .collect()
}

/// Poll `condition` until it holds or `timeout` passes. Returns whether it held.
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
}

/// Give `handle` [`BLOCKED_GRACE`] to finish and assert that it didn't.
pub fn assert_blocked<T>(handle: &JoinHandle<T>, what: &str) {
    std::thread::sleep(BLOCKED_GRACE);
    assert!(!handle.is_finished(), "{what} should still be blocked");
}

/// Join `handle`, panicking if it doesn't finish within `timeout`.
pub fn join_within<T>(handle: JoinHandle<T>, timeout: Duration, what: &str) -> T {
    assert!(
        wait_for(timeout, || handle.is_finished()),
        "{what} did not finish within {timeout:?}"
    );
    match handle.join() {
        Ok(value) => value,
        Err(e) => std::panic::resume_unwind(e),
    }
}
