//! ThreadSynchronization: the state machine and condition-variable
//! handshake that mediates every blocking interaction between the
//! Update, Render, VSync and event threads.
//!
//! All externally visible operations are serialized by a single
//! mutex; three condition variables bound to that mutex (plus a
//! fourth, private one for the native-image post-render handshake)
//! target wakeups at the role that needs them, following this
//! codebase's preference for a dedicated wait/notify pair per role
//! over a single shotgun broadcast.
//!
//! DALi Adaptor Contributors

mod state;

pub use state::{Event, RenderAction, UpdateVerdict};
pub use state::State as SyncState;

use std::sync::{Condvar, Mutex};

use utils::log;

use crate::core_iface::RenderStatus;
use crate::error::{AdaptorError, Result};
use crate::surface::RenderSurface;
use crate::vsync::VSyncSample;

struct Inner {
    state: SyncState,
    request_count: u32,
    run_once: bool,
    vsyncs_per_render: u32,

    /// The frame number of the most recent vsync tick, as reported by
    /// the VSyncNotifier. Doubles as the generation counter Update
    /// paces off and the value used for the render refresh-rate
    /// modulo.
    latest_vsync_frame: u32,
    latest_vsync: VSyncSample,
    /// The last vsync frame an Update pass has been released for.
    update_consumed_frame: u32,

    /// The frame number of the most recently completed Update pass.
    update_frame_number: u32,
    /// The RenderStatus the matching Update pass returned, forwarded
    /// into Core::render alongside `update_frame_number`.
    update_render_status: RenderStatus,
    /// True once Update has produced a frame Render hasn't consumed yet.
    render_frame_pending: bool,

    pending_surface: Option<Box<dyn RenderSurface>>,
    /// Set by Render's render_finished() to wake the event thread
    /// blocked in replace_surface()/resize_surface().
    handshake_done: bool,
    /// Count of event threads currently waiting to start a
    /// replace_surface() handshake. While non-zero, a resize_surface()
    /// call waiting for the in-flight handshake to end defers to them,
    /// implementing the "ReplaceSurface wins the tie" rule.
    replace_waiting: u32,

    post_render_ack: bool,
    post_render_frame_count: u32,

    exit: bool,
}

impl Inner {
    fn new() -> Inner {
        Inner {
            state: SyncState::Stopped,
            request_count: 0,
            run_once: false,
            vsyncs_per_render: 1,
            latest_vsync_frame: 0,
            latest_vsync: VSyncSample::invalid(),
            update_consumed_frame: 0,
            update_frame_number: 0,
            update_render_status: RenderStatus::empty(),
            render_frame_pending: false,
            pending_surface: None,
            handshake_done: false,
            replace_waiting: 0,
            post_render_ack: false,
            post_render_frame_count: 0,
            exit: false,
        }
    }
}

pub struct ThreadSynchronization {
    inner: Mutex<Inner>,
    cv_update: Condvar,
    cv_render: Condvar,
    cv_vsync: Condvar,
    cv_post_render: Condvar,
}

impl ThreadSynchronization {
    pub fn new(vsyncs_per_render: u32) -> ThreadSynchronization {
        let mut inner = Inner::new();
        inner.vsyncs_per_render = vsyncs_per_render.max(1);

        ThreadSynchronization {
            inner: Mutex::new(inner),
            cv_update: Condvar::new(),
            cv_render: Condvar::new(),
            cv_vsync: Condvar::new(),
            cv_post_render: Condvar::new(),
        }
    }

    fn apply_transition(&self, inner: &mut Inner, event: Event) -> bool {
        match state::is_legal_transition(inner.state, event) {
            Some(next) => {
                log::debug!("thread-sync: {:?} --{:?}--> {:?}", inner.state, event, next);
                inner.state = next;
                true
            }
            None => {
                log::debug!(
                    "thread-sync: ignoring illegal transition {:?} from {:?}",
                    event,
                    inner.state
                );
                false
            }
        }
    }

    // ---------------------------------------------------------------
    // Event thread API
    // ---------------------------------------------------------------

    pub fn initialise(&self) {
        let mut inner = self.inner.lock().unwrap();
        if self.apply_transition(&mut inner, Event::Initialize) {
            inner.request_count = 0;
            inner.run_once = false;
            inner.latest_vsync_frame = 0;
            inner.update_consumed_frame = 0;
            inner.update_frame_number = 0;
            inner.render_frame_pending = false;
            inner.exit = false;
        }
    }

    pub fn start(&self) {
        {
            let mut inner = self.inner.lock().unwrap();
            self.apply_transition(&mut inner, Event::Start);
        }
        self.cv_update.notify_all();
        self.cv_render.notify_all();
        self.cv_vsync.notify_all();
    }

    pub fn stop(&self) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.state = SyncState::Stopped;
            inner.exit = true;
        }
        self.cv_update.notify_all();
        self.cv_render.notify_all();
        self.cv_vsync.notify_all();
        self.cv_post_render.notify_all();
    }

    pub fn pause(&self) {
        let mut inner = self.inner.lock().unwrap();
        self.apply_transition(&mut inner, Event::Pause);
    }

    pub fn resume(&self) {
        {
            let mut inner = self.inner.lock().unwrap();
            self.apply_transition(&mut inner, Event::Resume);
        }
        self.cv_update.notify_all();
        self.cv_render.notify_all();
        self.cv_vsync.notify_all();
    }

    pub fn update_request(&self) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.request_count += 1;
        }
        self.cv_update.notify_one();
    }

    pub fn update_once(&self) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.run_once = true;
        }
        self.cv_update.notify_one();
    }

    pub fn set_render_refresh_rate(&self, n: u32) {
        if n == 0 {
            log::error!("set_render_refresh_rate: ignoring 0, must be >= 1");
            return;
        }
        let mut inner = self.inner.lock().unwrap();
        inner.vsyncs_per_render = n;
    }

    fn handshake_in_progress(state: SyncState) -> bool {
        matches!(state, SyncState::SurfaceReplacing | SyncState::Resizing)
    }

    /// Synchronous: blocks the event thread until the Render thread has
    /// torn down the old surface and brought the new one current, or
    /// until `stop()` cancels the handshake. If a resize is already in
    /// flight, waits for it to finish first -- ReplaceSurface always
    /// wins the tie against a concurrent Resize (spec's documented
    /// tie-break rule).
    pub fn replace_surface(&self, new_surface: Box<dyn RenderSurface>) -> Result<()> {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.replace_waiting += 1;
            inner = self
                .cv_render
                .wait_while(inner, |i| !i.exit && Self::handshake_in_progress(i.state))
                .unwrap();
            inner.replace_waiting -= 1;

            if inner.exit {
                return Err(AdaptorError::Cancelled);
            }
            if !self.apply_transition(&mut inner, Event::BeginReplaceSurface) {
                return Err(AdaptorError::ConfigInvalid(format!(
                    "replace_surface is illegal from state {:?}",
                    inner.state
                )));
            }
            inner.pending_surface = Some(new_surface);
            inner.handshake_done = false;
        }
        self.cv_render.notify_all();
        self.wait_for_handshake(Event::EndReplaceSurface)
    }

    /// Synchronous: blocks the event thread until the Render thread has
    /// rebuilt its swapchain for the new size, or until `stop()`
    /// cancels the handshake. Defers to any waiting or in-flight
    /// replace_surface() call (spec's documented tie-break rule).
    pub fn resize_surface(&self) -> Result<()> {
        {
            let mut inner = self.inner.lock().unwrap();
            inner = self
                .cv_render
                .wait_while(inner, |i| {
                    !i.exit && (Self::handshake_in_progress(i.state) || i.replace_waiting > 0)
                })
                .unwrap();

            if inner.exit {
                return Err(AdaptorError::Cancelled);
            }
            if !self.apply_transition(&mut inner, Event::BeginResize) {
                return Err(AdaptorError::ConfigInvalid(format!(
                    "resize_surface is illegal from state {:?}",
                    inner.state
                )));
            }
            inner.handshake_done = false;
        }
        self.cv_render.notify_all();
        self.wait_for_handshake(Event::EndResize)
    }

    fn wait_for_handshake(&self, end_event: Event) -> Result<()> {
        let inner = self.inner.lock().unwrap();
        let mut inner = self
            .cv_render
            .wait_while(inner, |i| !i.handshake_done && !i.exit)
            .unwrap();

        if inner.exit && !inner.handshake_done {
            return Err(AdaptorError::Cancelled);
        }

        inner.handshake_done = false;
        self.apply_transition(&mut inner, end_event);
        drop(inner);

        // Wake any replace_surface()/resize_surface() callers parked
        // waiting for this handshake to end.
        self.cv_render.notify_all();
        Ok(())
    }

    // ---------------------------------------------------------------
    // Update thread API
    // ---------------------------------------------------------------

    pub fn update_ready(&self) -> UpdateVerdict {
        let inner = self.inner.lock().unwrap();
        let mut inner = self
            .cv_update
            .wait_while(inner, |i| Self::update_should_block(i))
            .unwrap();

        if inner.exit {
            return UpdateVerdict::Exit;
        }

        if inner.run_once {
            inner.run_once = false;
        } else if inner.request_count > 0 {
            inner.request_count -= 1;
        }
        inner.update_consumed_frame = inner.latest_vsync_frame;

        UpdateVerdict::RunUpdate
    }

    fn update_should_block(inner: &Inner) -> bool {
        if inner.exit {
            return false;
        }
        match inner.state {
            SyncState::Initialising => true,
            SyncState::Paused => !inner.run_once && inner.request_count == 0,
            SyncState::Running | SyncState::SurfaceReplacing | SyncState::Resizing => {
                !inner.run_once
                    && inner.request_count == 0
                    && inner.latest_vsync_frame == inner.update_consumed_frame
            }
            SyncState::Stopped => false,
        }
    }

    /// Returns the most recently deposited vsync sample, for UpdateThread
    /// to derive its (last, this, next) frame times from.
    pub fn latest_vsync(&self) -> VSyncSample {
        self.inner.lock().unwrap().latest_vsync
    }

    pub fn update_ready_to_render(&self, status: RenderStatus) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.update_frame_number = inner.update_consumed_frame;
            inner.update_render_status = status;
            inner.render_frame_pending = true;
        }
        self.cv_render.notify_one();
    }

    // ---------------------------------------------------------------
    // Render thread API
    // ---------------------------------------------------------------

    pub fn render_ready(&self) -> RenderAction {
        let inner = self.inner.lock().unwrap();
        let mut inner = self
            .cv_render
            .wait_while(inner, |i| Self::render_should_block(i))
            .unwrap();

        if inner.exit {
            return RenderAction::Exit;
        }
        match inner.state {
            SyncState::SurfaceReplacing => return RenderAction::ReplaceSurface,
            SyncState::Resizing => return RenderAction::Resize,
            _ => {}
        }

        let frame_number = inner.update_frame_number;
        let status = inner.update_render_status;
        inner.render_frame_pending = false;
        RenderAction::RunRender {
            buffer_index: frame_number,
            status,
        }
    }

    fn render_should_block(inner: &Inner) -> bool {
        if inner.exit {
            return false;
        }
        if matches!(inner.state, SyncState::SurfaceReplacing | SyncState::Resizing) {
            return false;
        }
        // Gate on the pending frame's own number, not the newest vsync's
        // parity: Update and Render are both woken by vsync_ready, so
        // racing against latest_vsync_frame can let a frame produced on
        // a skipped tick slip through once the next tick's parity lines
        // up, rendering it twice as often as vsyncs_per_render allows.
        let render_ready_for_refresh = inner.update_frame_number % inner.vsyncs_per_render == 0;
        !(inner.render_frame_pending && render_ready_for_refresh)
    }

    pub fn render_finished(&self, action: RenderAction) {
        match action {
            RenderAction::ReplaceSurface | RenderAction::Resize => {
                {
                    let mut inner = self.inner.lock().unwrap();
                    inner.handshake_done = true;
                }
                self.cv_render.notify_all();
            }
            RenderAction::RunRender { .. } | RenderAction::Exit => {}
        }
    }

    /// Consumes the surface stored by `replace_surface`. Must be called
    /// exactly once per `RenderAction::ReplaceSurface`.
    pub fn take_pending_surface(&self) -> Option<Box<dyn RenderSurface>> {
        self.inner.lock().unwrap().pending_surface.take()
    }

    /// Called by RenderSurface::post_render right after presenting, for
    /// native-image/offscreen surfaces that need to announce a frame
    /// before handing the buffer to their consumer.
    pub fn post_render_started(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.post_render_frame_count += 1;
    }

    /// Blocks the Render thread until the event-thread consumer of an
    /// offscreen buffer calls `post_render_complete`, or until `stop()`
    /// cancels the wait.
    pub fn post_render_wait_for_completion(&self) {
        let inner = self.inner.lock().unwrap();
        let mut inner = self
            .cv_post_render
            .wait_while(inner, |i| !i.post_render_ack && !i.exit)
            .unwrap();
        inner.post_render_ack = false;
    }

    /// Called by the event thread once it is done consuming an
    /// offscreen buffer.
    pub fn post_render_complete(&self) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.post_render_ack = true;
        }
        self.cv_post_render.notify_one();
    }

    // ---------------------------------------------------------------
    // VSync thread API
    // ---------------------------------------------------------------

    /// Returns false when the VSync thread should exit.
    pub fn vsync_ready(&self, frame: u32, sec: u32, usec: u32) -> bool {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.latest_vsync = VSyncSample {
                sequence: frame,
                sec,
                usec,
                valid: true,
            };
            inner.latest_vsync_frame = frame;
        }
        self.cv_update.notify_one();
        self.cv_render.notify_one();

        !self.inner.lock().unwrap().exit
    }

    /// While Paused, lets the VSync thread idle instead of burning
    /// cycles producing ticks nothing will consume. Returns false when
    /// the VSync thread should exit.
    pub fn vsync_wait_while_paused(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        let inner = self
            .cv_vsync
            .wait_while(inner, |i| i.state == SyncState::Paused && !i.exit)
            .unwrap();
        !inner.exit
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn state(&self) -> SyncState {
        self.inner.lock().unwrap().state
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn request_count(&self) -> u32 {
        self.inner.lock().unwrap().request_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::mock::MockRenderSurface;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn started(vsyncs_per_render: u32) -> Arc<ThreadSynchronization> {
        let sync = Arc::new(ThreadSynchronization::new(vsyncs_per_render));
        sync.initialise();
        sync.start();
        sync
    }

    #[test]
    fn initial_state_is_stopped() {
        let sync = ThreadSynchronization::new(1);
        assert_eq!(sync.state(), SyncState::Stopped);
    }

    #[test]
    fn initialise_then_start_reaches_running() {
        let sync = started(1);
        assert_eq!(sync.state(), SyncState::Running);
    }

    #[test]
    fn update_blocks_until_vsync_advances() {
        let sync = started(1);
        let sync2 = sync.clone();
        let handle = thread::spawn(move || sync2.update_ready());

        // give the update thread a chance to actually block
        thread::sleep(Duration::from_millis(20));
        assert!(!handle.is_finished());

        sync.vsync_ready(1, 0, 0);
        let verdict = handle.join().unwrap();
        assert_eq!(verdict, UpdateVerdict::RunUpdate);
    }

    #[test]
    fn render_waits_for_update_frame() {
        let sync = started(1);
        sync.vsync_ready(1, 0, 0);
        assert_eq!(sync.update_ready(), UpdateVerdict::RunUpdate);
        sync.update_ready_to_render(RenderStatus::HAS_UPDATES);

        assert_eq!(
            sync.render_ready(),
            RenderAction::RunRender {
                buffer_index: 1,
                status: RenderStatus::HAS_UPDATES,
            }
        );
    }

    #[test]
    fn frame_skipping_gates_render_but_not_update() {
        let sync = started(2);

        sync.vsync_ready(1, 0, 0);
        assert_eq!(sync.update_ready(), UpdateVerdict::RunUpdate);
        sync.update_ready_to_render(RenderStatus::HAS_UPDATES);

        // frame 1 is odd: vsyncs_per_render=2 means render should not be
        // ready yet. We can't easily assert "blocks forever" without a
        // timeout race, so instead assert the predicate directly.
        assert!(ThreadSynchronization::render_should_block(
            &*sync.inner.lock().unwrap()
        ));

        sync.vsync_ready(2, 0, 0);
        assert_eq!(sync.update_ready(), UpdateVerdict::RunUpdate);
        sync.update_ready_to_render(RenderStatus::HAS_UPDATES);

        assert_eq!(
            sync.render_ready(),
            RenderAction::RunRender {
                buffer_index: 2,
                status: RenderStatus::HAS_UPDATES,
            }
        );
    }

    #[test]
    fn pause_blocks_update_until_update_once() {
        let sync = started(1);
        sync.pause();
        assert_eq!(sync.state(), SyncState::Paused);

        let sync2 = sync.clone();
        let handle = thread::spawn(move || sync2.update_ready());
        thread::sleep(Duration::from_millis(20));
        assert!(!handle.is_finished());

        sync.update_once();
        assert_eq!(handle.join().unwrap(), UpdateVerdict::RunUpdate);
    }

    #[test]
    fn stop_unblocks_update_and_render() {
        let sync = started(1);
        let su = sync.clone();
        let su_handle = thread::spawn(move || su.update_ready());
        let sr = sync.clone();
        let sr_handle = thread::spawn(move || sr.render_ready());

        thread::sleep(Duration::from_millis(20));
        sync.stop();

        assert_eq!(su_handle.join().unwrap(), UpdateVerdict::Exit);
        assert_eq!(sr_handle.join().unwrap(), RenderAction::Exit);
    }

    #[test]
    fn replace_surface_round_trips_through_render_thread() {
        let sync = Arc::new(ThreadSynchronization::new(1));
        sync.initialise();
        sync.start();

        let render_sync = sync.clone();
        let render_handle = thread::spawn(move || {
            let action = render_sync.render_ready();
            assert_eq!(action, RenderAction::ReplaceSurface);
            let _new_surface = render_sync.take_pending_surface().unwrap();
            render_sync.render_finished(action);
        });

        let new_surface: Box<dyn RenderSurface> = Box::new(MockRenderSurface::new());
        sync.replace_surface(new_surface).unwrap();
        render_handle.join().unwrap();
        assert_eq!(sync.state(), SyncState::Running);
    }

    #[test]
    fn replace_wins_the_tie_over_a_resize_that_asked_first() {
        use std::sync::Mutex as StdMutex;

        let sync = Arc::new(ThreadSynchronization::new(1));
        sync.initialise();
        sync.start();

        let order: Arc<StdMutex<Vec<&'static str>>> = Arc::new(StdMutex::new(Vec::new()));

        let render_sync = sync.clone();
        let render_order = order.clone();
        let render_handle = thread::spawn(move || {
            for _ in 0..3 {
                let action = render_sync.render_ready();
                match action {
                    RenderAction::ReplaceSurface => {
                        render_order.lock().unwrap().push("replace");
                        render_sync.take_pending_surface().unwrap();
                    }
                    RenderAction::Resize => {
                        render_order.lock().unwrap().push("resize");
                    }
                    other => panic!("unexpected action {:?}", other),
                }
                // Give the other two callers a chance to get parked
                // waiting on this handshake before it ends.
                thread::sleep(Duration::from_millis(30));
                render_sync.render_finished(action);
            }
        });

        // A first replace occupies the handshake slot so the next two
        // requests both end up genuinely waiting at the same time.
        let blocker_sync = sync.clone();
        let blocker_handle = thread::spawn(move || {
            blocker_sync.replace_surface(Box::new(MockRenderSurface::new()))
        });

        thread::sleep(Duration::from_millis(10));
        // Resize asks first...
        let resize_sync = sync.clone();
        let resize_handle = thread::spawn(move || resize_sync.resize_surface());

        thread::sleep(Duration::from_millis(10));
        // ...but a second replace arrives while both are still waiting
        // on the first handshake, and must be serviced before resize.
        let second_replace_sync = sync.clone();
        let second_replace_handle = thread::spawn(move || {
            second_replace_sync.replace_surface(Box::new(MockRenderSurface::new()))
        });

        blocker_handle.join().unwrap().unwrap();
        second_replace_handle.join().unwrap().unwrap();
        resize_handle.join().unwrap().unwrap();
        render_handle.join().unwrap();

        assert_eq!(*order.lock().unwrap(), vec!["replace", "replace", "resize"]);
    }

    #[test]
    fn stop_during_replace_cancels_event_thread_wait() {
        let sync = Arc::new(ThreadSynchronization::new(1));
        sync.initialise();
        sync.start();

        let sync2 = sync.clone();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            sync2.stop();
        });

        let new_surface: Box<dyn RenderSurface> = Box::new(MockRenderSurface::new());
        let result = sync.replace_surface(new_surface);
        assert_eq!(result, Err(AdaptorError::Cancelled));

        stopper.join().unwrap();
    }
}
