// Scenario 5: calling stop() while the event thread is blocked inside
// replace_surface() must cancel that wait rather than hang forever.
//
// DALi Adaptor Contributors

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use dali_adaptor_sync::core_iface::mock::MockCore;
use dali_adaptor_sync::error::AdaptorError;
use dali_adaptor_sync::render_thread::RenderThread;
use dali_adaptor_sync::surface::mock::MockRenderSurface;
use dali_adaptor_sync::sync::ThreadSynchronization;
use dali_adaptor_sync::update_thread::UpdateThread;

#[test]
fn stop_cancels_a_pending_surface_replace() {
    let sync = Arc::new(ThreadSynchronization::new(1));
    sync.initialise();
    sync.start();

    let core = Arc::new(MockCore::new());
    let update_handle = UpdateThread::new(core.clone(), sync.clone()).spawn();
    // Note: no RenderThread is spawned here, so the replace handshake
    // never gets a chance to complete on its own; only stop() can
    // unblock the event thread.
    let render_handle: Option<thread::JoinHandle<()>> = None;
    let _ = render_handle;

    let sync_for_stop = sync.clone();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(40));
        sync_for_stop.stop();
    });

    let new_surface = Box::new(MockRenderSurface::new());
    let result = sync.replace_surface(new_surface);
    assert_eq!(result, Err(AdaptorError::Cancelled));

    stopper.join().unwrap();
    update_handle.join().unwrap();
}

#[test]
fn stop_cancels_replace_even_with_render_thread_busy_elsewhere() {
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

    // Drive one steady frame so the render thread is parked back in
    // render_ready() before we race it with stop()+replace_surface().
    sync.vsync_ready(1, 1, 0);
    thread::sleep(Duration::from_millis(20));

    let sync_for_stop = sync.clone();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(5));
        sync_for_stop.stop();
    });

    let new_surface = Box::new(MockRenderSurface::new());
    let result = sync.replace_surface(new_surface);
    // Either the render thread won the race and completed the
    // handshake, or stop() cancelled it first -- both are legal
    // outcomes of the race, but it must never hang.
    assert!(result.is_ok() || result == Err(AdaptorError::Cancelled));

    stopper.join().unwrap();
    update_handle.join().unwrap();
    render_handle.join().unwrap();
}
