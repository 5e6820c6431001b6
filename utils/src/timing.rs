// Helpers for tracking frame timing
//
// DALi Adaptor Contributors
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Number of microseconds in one second. Used to convert the (sec, usec)
/// pair vended by `get_time_of_day` into a single duration.
pub const MICROSECONDS_PER_SECOND: u32 = 1_000_000;

/// Nominal time between two vsyncs at 60Hz, used when no hardware vsync
/// source is available.
pub const NOMINAL_VSYNC_PERIOD_MICROSECONDS: u32 = 16_667;

pub fn get_current_time() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Error getting system time")
}

/// Helper to get the current time in milliseconds
#[allow(dead_code)]
pub fn get_current_millis() -> u32 {
    get_current_time().as_millis() as u32
}

/// Splits the current wall clock time into (seconds, microseconds),
/// the representation used throughout the vsync/update/render handshake.
pub fn get_time_of_day() -> (u32, u32) {
    let now = get_current_time();
    (now.as_secs() as u32, now.subsec_micros())
}

/// Computes the elapsed microseconds between two (sec, usec) samples,
/// handling the microsecond rollover the same way the vsync fallback does.
pub fn microseconds_between(earlier: (u32, u32), later: (u32, u32)) -> u32 {
    let mut delta = MICROSECONDS_PER_SECOND.wrapping_mul(later.0.wrapping_sub(earlier.0));
    if later.1 < earlier.1 {
        delta = delta.wrapping_add((later.1 + MICROSECONDS_PER_SECOND) - earlier.1);
    } else {
        delta = delta.wrapping_add(later.1 - earlier.1);
    }
    delta
}

// Manages subsystem timings
//
// The motivation for this is frame callbacks, which need to take
// place once every 16 ms (once a frame at 60 fps). This struct keeps
// track of how much time is remaining before an action needs to be
// called, and callers can use this number for their timeout values.
//
// This isn't a timing subsystem, but rather a helper for tracking
// timing information.
pub struct TimingManager {
    // length of time we are counting down from
    tm_period: Duration,
    // the last time we reset this manager
    tm_start: Duration,
}

impl TimingManager {
    // create a new manager to track time periods of length `period`
    pub fn new(period_micros: u32) -> TimingManager {
        TimingManager {
            tm_period: Duration::from_micros(period_micros as u64),
            tm_start: get_current_time(),
        }
    }

    // Reset the manager to the current time
    pub fn reset(&mut self) {
        self.tm_start = get_current_time();
    }

    // Returns true if period has elapsed since this manager was reset
    pub fn is_overdue(&mut self) -> bool {
        let time = get_current_time();
        time - self.tm_start >= self.tm_period
    }

    // Returns the number of microseconds remaining in this tracker.
    //
    // If 0 is returned, it is overdue and the caller should reset it.
    pub fn time_remaining(&mut self) -> u32 {
        if self.is_overdue() {
            return 0;
        }
        let elapsed = get_current_time() - self.tm_start;
        (self.tm_period - elapsed).as_micros() as u32
    }
}

// A stopclock for measuring time intervals
//
// The order of use MUST be `new`, `start`, `end`, after that the
// recorded duration can be read with `get_duration`.
#[allow(dead_code)]
pub struct StopWatch {
    sw_start: Duration,
    sw_end: Duration,
}

impl StopWatch {
    pub fn new() -> StopWatch {
        StopWatch {
            sw_start: Duration::from_millis(0),
            sw_end: Duration::from_millis(0),
        }
    }

    pub fn start(&mut self) {
        self.sw_start = get_current_time();
    }

    pub fn end(&mut self) {
        self.sw_end = get_current_time();
    }

    pub fn get_duration(&mut self) -> Duration {
        self.sw_end - self.sw_start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn microseconds_between_no_rollover() {
        assert_eq!(microseconds_between((10, 100), (10, 16_767)), 16_667);
    }

    #[test]
    fn microseconds_between_with_rollover() {
        // earlier usec is larger than later usec: we crossed a second boundary
        assert_eq!(
            microseconds_between((10, 999_000), (11, 15_667)),
            16_667
        );
    }

    #[test]
    fn timing_manager_overdue() {
        let mut tm = TimingManager::new(1);
        std::thread::sleep(Duration::from_millis(5));
        assert!(tm.is_overdue());
        assert_eq!(tm.time_remaining(), 0);
    }
}
