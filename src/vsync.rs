// VSyncMonitor contract and the VSyncNotifier thread
//
// DALi Adaptor Contributors
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use utils::log;
use utils::timing::{self, NOMINAL_VSYNC_PERIOD_MICROSECONDS};

use crate::core_iface::Core;
use crate::platform::PlatformAbstraction;
use crate::sync::ThreadSynchronization;

/// A single vsync sample as deposited under the synchronizer's lock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VSyncSample {
    pub sequence: u32,
    pub sec: u32,
    pub usec: u32,
    pub valid: bool,
}

impl VSyncSample {
    pub fn invalid() -> VSyncSample {
        VSyncSample {
            sequence: 0,
            sec: 0,
            usec: 0,
            valid: false,
        }
    }
}

/// The hardware (or mocked) vsync source. A real implementation lives
/// behind DRM/libdrm; this crate only defines the contract it must
/// satisfy.
pub trait VSyncMonitor: Send + Sync {
    fn initialize(&self);
    fn terminate(&self);

    /// Whether a hardware vsync source is available. When false, the
    /// notifier falls back to a software timer with a nominal 16,667us
    /// period.
    fn use_hardware(&self) -> bool;

    /// Blocks until the next vsync. Returns `Some((sequence, sec, usec))`
    /// on a valid sample, `None` on a spurious/invalid one.
    fn do_sync(&self) -> Option<(u32, u32, u32)>;
}

/// Drives the vsync_ready handshake with ThreadSynchronization.
///
/// Runs `VSyncMonitor::do_sync` (or a software timer fallback) in a
/// loop, stamping a monotonically increasing frame number and handing
/// each tick to the synchronizer and to `Core::vsync`.
pub struct VSyncNotifier {
    monitor: Arc<dyn VSyncMonitor>,
    core: Arc<dyn Core>,
    platform: Arc<dyn PlatformAbstraction>,
    sync: Arc<ThreadSynchronization>,
    /// Forces timer-fallback mode even if the monitor reports hardware
    /// support. Set from `Config::no_vsync`.
    force_timer_fallback: bool,
}

impl VSyncNotifier {
    pub fn new(
        monitor: Arc<dyn VSyncMonitor>,
        core: Arc<dyn Core>,
        platform: Arc<dyn PlatformAbstraction>,
        sync: Arc<ThreadSynchronization>,
        force_timer_fallback: bool,
    ) -> VSyncNotifier {
        VSyncNotifier {
            monitor,
            core,
            platform,
            sync,
            force_timer_fallback,
        }
    }

    /// Spawns the notifier thread, consuming self into the closure.
    pub fn spawn(self) -> thread::JoinHandle<()> {
        thread::Builder::new()
            .name("vsync_notifier".to_string())
            .spawn(move || self.run())
            .expect("failed to spawn vsync_notifier thread")
    }

    fn run(&self) {
        self.monitor.initialize();

        let mut frame_number: u32 = 0;
        let mut current_seconds: u32 = 0;
        let mut current_microseconds: u32 = 0;
        let mut running = true;

        while running {
            if !self.sync.vsync_wait_while_paused() {
                break;
            }

            let mut valid_sync = true;
            let mut sequence = 0u32;

            if !self.force_timer_fallback && self.monitor.use_hardware() {
                match self.monitor.do_sync() {
                    Some((seq, sec, usec)) => {
                        sequence = seq;
                        current_seconds = sec;
                        current_microseconds = usec;
                    }
                    None => valid_sync = false,
                }
            } else {
                let (seconds, microseconds) = self.platform.get_time_microseconds();
                let time_delta = timing::microseconds_between(
                    (current_seconds, current_microseconds),
                    (seconds, microseconds),
                );

                if time_delta < NOMINAL_VSYNC_PERIOD_MICROSECONDS {
                    thread::sleep(Duration::from_micros(
                        (NOMINAL_VSYNC_PERIOD_MICROSECONDS - time_delta) as u64,
                    ));
                } else {
                    thread::sleep(Duration::from_micros(
                        NOMINAL_VSYNC_PERIOD_MICROSECONDS as u64,
                    ));
                }

                current_seconds = seconds;
                current_microseconds = microseconds;
            }

            if valid_sync {
                frame_number += 1;
                self.core.vsync(frame_number, current_seconds, current_microseconds);
                log::verbose!(
                    "vsync frame={} seq={} sec={} usec={}",
                    frame_number,
                    sequence,
                    current_seconds,
                    current_microseconds
                );
            } else {
                log::debug!("vsync: skipping invalid/spurious sample");
            }

            running = self
                .sync
                .vsync_ready(frame_number, current_seconds, current_microseconds);
        }

        self.monitor.terminate();
        log::debug!("vsync_notifier thread exiting");
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Mutex;

    /// A deterministic vsync source for tests: either plays back a
    /// fixed sequence of (sec, usec) samples (hardware mode) or
    /// reports no hardware, forcing the notifier's software fallback.
    pub struct MockVSyncMonitor {
        hardware: bool,
        samples: Mutex<Vec<(u32, u32, u32)>>,
        cursor: AtomicU32,
        terminated: AtomicBool,
    }

    impl MockVSyncMonitor {
        /// A monitor that plays back `samples` as hardware vsyncs.
        pub fn hardware(samples: Vec<(u32, u32, u32)>) -> MockVSyncMonitor {
            MockVSyncMonitor {
                hardware: true,
                samples: Mutex::new(samples),
                cursor: AtomicU32::new(0),
                terminated: AtomicBool::new(false),
            }
        }

        /// A monitor with no hardware support; the notifier will fall
        /// back to the software timer using whatever PlatformAbstraction
        /// it was given.
        pub fn software() -> MockVSyncMonitor {
            MockVSyncMonitor {
                hardware: false,
                samples: Mutex::new(Vec::new()),
                cursor: AtomicU32::new(0),
                terminated: AtomicBool::new(false),
            }
        }

        pub fn was_terminated(&self) -> bool {
            self.terminated.load(Ordering::SeqCst)
        }
    }

    impl VSyncMonitor for MockVSyncMonitor {
        fn initialize(&self) {}

        fn terminate(&self) {
            self.terminated.store(true, Ordering::SeqCst);
        }

        fn use_hardware(&self) -> bool {
            self.hardware
        }

        fn do_sync(&self) -> Option<(u32, u32, u32)> {
            let samples = self.samples.lock().unwrap();
            let idx = self.cursor.fetch_add(1, Ordering::SeqCst) as usize;
            samples.get(idx).copied()
        }
    }

    /// A deterministic platform clock for the software-timer path:
    /// each call advances by a fixed microsecond step rather than
    /// reading the wall clock, so tests never depend on scheduling.
    pub struct SteppedPlatform {
        step_usec: u32,
        state: Mutex<(u32, u32)>,
    }

    impl SteppedPlatform {
        pub fn new(step_usec: u32) -> SteppedPlatform {
            SteppedPlatform {
                step_usec,
                state: Mutex::new((0, 0)),
            }
        }
    }

    impl PlatformAbstraction for SteppedPlatform {
        fn get_time_microseconds(&self) -> (u32, u32) {
            let mut state = self.state.lock().unwrap();
            let (mut sec, mut usec) = *state;
            usec += self.step_usec;
            while usec >= timing::MICROSECONDS_PER_SECOND {
                usec -= timing::MICROSECONDS_PER_SECOND;
                sec += 1;
            }
            *state = (sec, usec);
            (sec, usec)
        }
    }
}
