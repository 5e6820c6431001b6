// Controller: the event-thread facade over the synchronization core.
//
// Owns the Update/Render/VSync thread handles and forwards the public
// lifecycle API to ThreadSynchronization. This is the only type
// application code needs to touch directly.
//
// DALi Adaptor Contributors

use std::sync::Arc;
use std::thread::JoinHandle;

use utils::log;

use crate::config::Config;
use crate::core_iface::Core;
use crate::error::Result;
use crate::platform::PlatformAbstraction;
use crate::render_thread::RenderThread;
use crate::surface::RenderSurface;
use crate::sync::ThreadSynchronization;
use crate::update_thread::UpdateThread;
use crate::vsync::{VSyncMonitor, VSyncNotifier};

/// Owns the three worker threads and the ThreadSynchronization they
/// share. Dropping a Controller without calling `stop()` first leaves
/// the worker threads detached; callers should always `stop()` before
/// letting it go out of scope.
pub struct Controller {
    sync: Arc<ThreadSynchronization>,
    update_handle: Option<JoinHandle<()>>,
    render_handle: Option<JoinHandle<()>>,
    vsync_handle: Option<JoinHandle<()>>,
}

impl Controller {
    /// Spawns the Update, Render and VSync threads and brings the
    /// synchronizer to `Initialising`. Call `start()` once the caller is
    /// ready for `Running` to begin. `config` seeds the initial render
    /// refresh rate and the timer-fallback override; it is not retained
    /// past this call.
    pub fn initialize(
        config: &Config,
        core: Arc<dyn Core>,
        platform: Arc<dyn PlatformAbstraction>,
        vsync_monitor: Arc<dyn VSyncMonitor>,
        surface: Box<dyn RenderSurface>,
    ) -> Result<Controller> {
        let refresh_rate = config.initial_render_refresh_rate()?;
        let sync = Arc::new(ThreadSynchronization::new(refresh_rate));

        sync.initialise();

        let update_handle = UpdateThread::new(core.clone(), sync.clone()).spawn();
        let render_handle = RenderThread::new(core.clone(), sync.clone(), surface).spawn();
        let vsync_handle = VSyncNotifier::new(
            vsync_monitor,
            core,
            platform,
            sync.clone(),
            config.no_vsync,
        )
        .spawn();

        Ok(Controller {
            sync,
            update_handle: Some(update_handle),
            render_handle: Some(render_handle),
            vsync_handle: Some(vsync_handle),
        })
    }

    /// Brings the synchronizer from `Initialising` to `Running`, letting
    /// the worker threads spawned by `initialize` start processing.
    pub fn start(&self) {
        log::debug!("controller: start");
        self.sync.start();
    }

    pub fn pause(&self) {
        log::debug!("controller: pause");
        self.sync.pause();
    }

    pub fn resume(&self) {
        log::debug!("controller: resume");
        self.sync.resume();
    }

    pub fn request_update(&self) {
        self.sync.update_request();
    }

    pub fn request_update_once(&self) {
        self.sync.update_once();
    }

    pub fn set_render_refresh_rate(&self, vsyncs_per_render: u32) {
        self.sync.set_render_refresh_rate(vsyncs_per_render);
    }

    /// Blocks the calling (event) thread until the Render thread has
    /// switched to `new_surface`, or returns `Err(Cancelled)` if `stop`
    /// was called first.
    pub fn replace_surface(&self, new_surface: Box<dyn RenderSurface>) -> Result<()> {
        self.sync.replace_surface(new_surface)
    }

    /// Blocks the calling (event) thread until the Render thread has
    /// rebuilt its surface for the current size, or returns
    /// `Err(Cancelled)` if `stop` was called first.
    pub fn resize_surface(&self) -> Result<()> {
        self.sync.resize_surface()
    }

    /// Signals every worker thread to exit and joins them. Safe to call
    /// more than once.
    pub fn stop(&mut self) {
        self.sync.stop();

        if let Some(handle) = self.update_handle.take() {
            Self::join_worker("update", handle);
        }
        if let Some(handle) = self.render_handle.take() {
            Self::join_worker("render", handle);
        }
        if let Some(handle) = self.vsync_handle.take() {
            Self::join_worker("vsync", handle);
        }

        log::debug!("controller: all worker threads joined");
    }

    /// Joins a worker thread, logging rather than silently swallowing a
    /// panic -- a panicked worker usually means it hit a poisoned lock
    /// after another thread died mid-update with `ThreadSynchronization`'s
    /// mutex held, which is this crate's Fatal error path (see
    /// `AdaptorError::Fatal`).
    fn join_worker(name: &str, handle: JoinHandle<()>) {
        if handle.join().is_err() {
            log::error!("controller: {} thread panicked, treating as fatal", name);
        }
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        if self.update_handle.is_some() || self.render_handle.is_some() || self.vsync_handle.is_some() {
            self.stop();
        }
    }
}
