// Scenario 1: steady-state 60Hz, vsyncs_per_render = 1. Every vsync
// tick should produce exactly one Update pass and one Render pass.
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
fn sixty_vsyncs_produce_sixty_updates_and_sixty_renders() {
    let sync = Arc::new(ThreadSynchronization::new(1));
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
        common::wait_until(Duration::from_secs(1), "render to observe this update", || {
            core.render_calls() >= frame
        });
    }

    sync.stop();
    update_handle.join().unwrap();
    render_handle.join().unwrap();

    assert_eq!(core.update_calls(), 60);
    assert_eq!(core.render_calls(), 60);
}
