// The Update thread loop.
//
// DALi Adaptor Contributors

use std::sync::Arc;
use std::thread;

use utils::log;

use crate::core_iface::Core;
use crate::sync::{ThreadSynchronization, UpdateVerdict};

pub struct UpdateThread {
    core: Arc<dyn Core>,
    sync: Arc<ThreadSynchronization>,
}

impl UpdateThread {
    pub fn new(core: Arc<dyn Core>, sync: Arc<ThreadSynchronization>) -> UpdateThread {
        UpdateThread { core, sync }
    }

    pub fn spawn(self) -> thread::JoinHandle<()> {
        thread::Builder::new()
            .name("update".to_string())
            .spawn(move || self.run())
            .expect("failed to spawn update thread")
    }

    fn run(&self) {
        let mut last_time_sec: f32 = 0.0;

        loop {
            match self.sync.update_ready() {
                UpdateVerdict::Exit => break,
                UpdateVerdict::RunUpdate => {}
            }

            let sample = self.sync.latest_vsync();
            let this_time_sec = sample.sec as f32 + (sample.usec as f32 / 1_000_000.0);
            let next_time_sec =
                this_time_sec + (utils::timing::NOMINAL_VSYNC_PERIOD_MICROSECONDS as f32 / 1_000_000.0);

            let status = self.core.update(last_time_sec, this_time_sec, next_time_sec);
            log::verbose!("update: last={} this={} next={} status={:?}",
                last_time_sec, this_time_sec, next_time_sec, status);
            last_time_sec = this_time_sec;

            self.sync.update_ready_to_render(status);
        }

        log::debug!("update thread exiting");
    }
}
