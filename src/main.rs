// Thin demo binary: wires Config, a no-op Core, and a window surface
// together through Controller, then runs until interrupted.
//
// A real scene-graph and a real hardware VSyncMonitor live outside
// this crate; this binary exists to exercise the synchronization core
// end to end with stand-ins for both.
//
// DALi Adaptor Contributors

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use dali_adaptor_sync::core_iface::{Core, RenderStatus};
use dali_adaptor_sync::vsync::VSyncMonitor;
use dali_adaptor_sync::{Config, Controller, PositionSize, StdPlatform, WindowSurface};
use utils::log;

/// A scene-graph stand-in: acknowledges every pass but draws nothing.
struct NullCore;

impl Core for NullCore {
    fn update(&self, _last_time_sec: f32, _this_time_sec: f32, _next_time_sec: f32) -> RenderStatus {
        RenderStatus::HAS_UPDATES
    }

    fn render(&self, _status: RenderStatus) {}

    fn vsync(&self, _frame: u32, _sec: u32, _usec: u32) {}
}

/// No hardware vsync source; always falls back to the software timer.
struct NullVSyncMonitor;

impl VSyncMonitor for NullVSyncMonitor {
    fn initialize(&self) {}
    fn terminate(&self) {}
    fn use_hardware(&self) -> bool {
        false
    }
    fn do_sync(&self) -> Option<(u32, u32, u32)> {
        None
    }
}

fn main() -> anyhow::Result<()> {
    let config = Config::from_args();
    let dpi = config.parsed_dpi()?.unwrap_or((96.0, 96.0));

    log::info!(
        "starting dali-adaptor-sync: {}x{} dpi={:?} no_vsync={}",
        config.width,
        config.height,
        dpi,
        config.no_vsync
    );

    let surface = WindowSurface::new(
        PositionSize {
            x: 0,
            y: 0,
            width: config.width.max(1),
            height: config.height.max(1),
        },
        dpi,
    );

    let mut controller = Controller::initialize(
        &config,
        Arc::new(NullCore),
        Arc::new(StdPlatform),
        Arc::new(NullVSyncMonitor),
        Box::new(surface),
    )?;
    controller.start();

    // No real windowing event loop in this demo binary; just run for a
    // while so the three worker threads are observably alive, then
    // shut down cleanly.
    thread::sleep(Duration::from_secs(2));

    controller.stop();
    log::info!("dali-adaptor-sync stopped");
    Ok(())
}
