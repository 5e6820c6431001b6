// Shared helpers for the property/scenario tests.
//
// DALi Adaptor Contributors

use std::time::{Duration, Instant};

/// Polls `predicate` until it returns true or `timeout` elapses,
/// panicking with `message` on timeout. Used instead of a fixed sleep
/// wherever a test needs to wait for a background worker thread to
/// observe state this thread just changed.
pub fn wait_until<F: Fn() -> bool>(timeout: Duration, message: &str, predicate: F) {
    let start = Instant::now();
    while !predicate() {
        if start.elapsed() > timeout {
            panic!("timed out waiting for: {}", message);
        }
        std::thread::sleep(Duration::from_millis(2));
    }
}
