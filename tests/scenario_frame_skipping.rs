// Scenario 2: vsyncs_per_render = 2. Update stays decoupled from the
// render cadence (one Update per vsync) while Render only fires on
// every other tick.
//
// DALi Adaptor Contributors

mod common;

use std::sync::Arc;
use std::time::Duration;

use dali_adaptor_sync::core_iface::mock::MockCore;
use dali_adaptor_sync::render_thread::RenderThread;
use dali_adaptor_sync::surface::mock::MockRenderSurface;
use dali_adaptor_sync::sync::ThreadSynchronization;
use dali_adaptor_sync::update_thread::UpdateThread;

#[test]
fn render_fires_on_every_other_vsync() {
    let sync = Arc::new(ThreadSynchronization::new(2));
    sync.initialise();
    sync.start();

    let core = Arc::new(MockCore::new());
    let update_handle = UpdateThread::new(core.clone(), sync.clone()).spawn();
    let render_handle = RenderThread::new(
        core.clone(),
        sync.clone(),
        Box::new(MockRenderSurface::new()),
    )
    .spawn();

    for frame in 1..=60u32 {
        sync.vsync_ready(frame, frame, 0);
        common::wait_until(Duration::from_secs(1), "update to observe this vsync tick", || {
            core.update_calls() >= frame
        });

        let expected_renders = frame / 2;
        common::wait_until(
            Duration::from_secs(1),
            "render to catch up to expected even-frame count",
            || core.render_calls() >= expected_renders,
        );
    }

    sync.stop();
    update_handle.join().unwrap();
    render_handle.join().unwrap();

    assert_eq!(core.update_calls(), 60, "update runs once per vsync, decoupled from render cadence");
    assert_eq!(core.render_calls(), 30, "render only fires on even frame numbers");
}
