// Scenario 4: replacing the render surface while running blocks the
// event thread until the Render thread has switched over, and
// rendering continues normally afterward.
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
fn replace_surface_blocks_until_render_thread_switches_over() {
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

    sync.vsync_ready(1, 1, 0);
    common::wait_until(Duration::from_secs(1), "the first frame to render", || {
        core.render_calls() >= 1
    });

    let new_surface = Box::new(MockRenderSurface::new());
    sync.replace_surface(new_surface).expect("replace_surface should succeed while running");

    assert_eq!(sync.state(), dali_adaptor_sync::sync::SyncState::Running);

    // Rendering should resume normally with the new surface.
    sync.vsync_ready(2, 2, 0);
    common::wait_until(Duration::from_secs(1), "a frame rendered through the new surface", || {
        core.render_calls() >= 2
    });

    sync.stop();
    update_handle.join().unwrap();
    render_handle.join().unwrap();
}
