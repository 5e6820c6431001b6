// The narrow interface the synchronization core uses to drive the
// scene-graph. `Core` itself lives outside this crate (it is treated
// as an opaque collaborator); this module only defines the contract.
//
// DALi Adaptor Contributors

bitflags::bitflags! {
    /// Status bitset returned by `Core::update`.
    pub struct RenderStatus: u8 {
        /// The update pass produced new draw commands for Render to consume.
        const HAS_UPDATES = 0x01;
        /// Core wants another Update pass even without further requests
        /// (e.g. a running animation).
        const KEEP_UPDATING = 0x02;
        /// Core wants the event thread notified once this frame is presented.
        const NEEDS_NOTIFICATION = 0x04;
    }
}

/// The scene-graph entry points consumed by the Update/Render/VSync
/// threads. A real implementation lives in the (out of scope) core
/// renderer; tests substitute `mock::MockCore`.
pub trait Core: Send + Sync {
    /// Advances the scene by one frame. `last/this/next_time_sec` are
    /// wall-clock seconds (with sub-second precision) derived from the
    /// most recent VSync sample.
    fn update(&self, last_time_sec: f32, this_time_sec: f32, next_time_sec: f32) -> RenderStatus;

    /// Executes GPU work for the most recently committed update buffer.
    fn render(&self, status: RenderStatus);

    /// Informational vsync hook; called from the VSync thread after
    /// every valid sample. Must tolerate being invoked off the event
    /// thread and must not block.
    fn vsync(&self, frame: u32, sec: u32, usec: u32);
}

#[cfg(any(test, feature = "test-support"))]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Records every call it receives, for asserting on Update/Render/
    /// VSync call counts and arguments from test code.
    pub struct MockCore {
        update_calls: AtomicU32,
        render_calls: AtomicU32,
        vsync_calls: AtomicU32,
        update_frame_times: Mutex<Vec<(f32, f32, f32)>>,
        render_statuses: Mutex<Vec<RenderStatus>>,
        status_to_return: RenderStatus,
    }

    impl MockCore {
        pub fn new() -> MockCore {
            MockCore {
                update_calls: AtomicU32::new(0),
                render_calls: AtomicU32::new(0),
                vsync_calls: AtomicU32::new(0),
                update_frame_times: Mutex::new(Vec::new()),
                render_statuses: Mutex::new(Vec::new()),
                status_to_return: RenderStatus::HAS_UPDATES,
            }
        }

        pub fn with_status(status: RenderStatus) -> MockCore {
            let mut core = MockCore::new();
            core.status_to_return = status;
            core
        }

        pub fn update_calls(&self) -> u32 {
            self.update_calls.load(Ordering::SeqCst)
        }

        pub fn render_calls(&self) -> u32 {
            self.render_calls.load(Ordering::SeqCst)
        }

        pub fn vsync_calls(&self) -> u32 {
            self.vsync_calls.load(Ordering::SeqCst)
        }

        pub fn update_frame_times(&self) -> Vec<(f32, f32, f32)> {
            self.update_frame_times.lock().unwrap().clone()
        }
    }

    impl Core for MockCore {
        fn update(&self, last_time_sec: f32, this_time_sec: f32, next_time_sec: f32) -> RenderStatus {
            self.update_calls.fetch_add(1, Ordering::SeqCst);
            self.update_frame_times
                .lock()
                .unwrap()
                .push((last_time_sec, this_time_sec, next_time_sec));
            self.status_to_return
        }

        fn render(&self, status: RenderStatus) {
            self.render_calls.fetch_add(1, Ordering::SeqCst);
            self.render_statuses.lock().unwrap().push(status);
        }

        fn vsync(&self, _frame: u32, _sec: u32, _usec: u32) {
            self.vsync_calls.fetch_add(1, Ordering::SeqCst);
        }
    }
}
