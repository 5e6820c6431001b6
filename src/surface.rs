// RenderSurface: the per-backend target the Render thread draws into.
//
// A surface owns the platform-specific swapchain/EGL-surface/tbm-queue
// and is the only place backend differences should leak into; the
// synchronization core above only ever sees this trait.
//
// DALi Adaptor Contributors

use std::sync::Arc;

use utils::log;
use utils::region::DamageRect;

use crate::error::Result;
use crate::sync::ThreadSynchronization;

/// Position and size of a surface, in platform pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSize {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// The buffer-age contract a RenderSurface offers the Render thread for
/// partial updates: how many frames ago the surface's current back
/// buffer was last presented. `None` means "unknown -- treat as a full
/// redraw" (the usual case right after a resize or surface replace, or
/// for a backend that cannot report age at all). The Render thread
/// itself, not the surface, turns an age into the actual damage-rect
/// list to present (see `RenderThread`'s damage ring).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreRenderInfo {
    pub buffer_age: Option<u32>,
}

/// A render target: a window surface, an off-screen pixmap, or a
/// native-image (tbm/dma-buf) producer/consumer surface. Concrete
/// backends differ in `create_surface`/`pre_render`/`post_render`;
/// everything else is handled generically by the Render thread.
pub trait RenderSurface: Send {
    /// One-time graphics-subsystem setup (EGL/GL context creation and
    /// the like). Called once, before the first `create_surface`.
    fn initialize_graphics(&mut self) -> Result<()>;

    /// Creates the native surface/swapchain. Called once at startup and
    /// again after `replace_graphics_surface`.
    fn create_surface(&mut self) -> Result<()>;

    /// Tears down the native surface. Called on Stop and immediately
    /// before a surface replace/resize rebuild.
    fn destroy_surface(&mut self);

    /// Rebuilds the surface in place for a new size (resize) or to pick
    /// up new graphics state after `replace_surface` swapped the
    /// backing `RenderSurface` implementation. Must leave the surface
    /// ready for `pre_render` when it returns.
    fn replace_graphics_surface(&mut self) -> Result<()>;

    /// Called by the Render thread immediately before drawing. Returns
    /// the current back buffer's age, which the Render thread combines
    /// with its own damage ring to decide between a partial and a full
    /// redraw.
    fn pre_render(&mut self) -> PreRenderInfo;

    /// Called by the Render thread immediately after drawing, with the
    /// damage rects the Render thread's ring reconstructed for this
    /// buffer age (`SetDamageRegion`-equivalent input). Presents the
    /// frame (swap buffers / submit to the compositor). For
    /// native-image surfaces this is also where the producer/consumer
    /// handshake with `ThreadSynchronization::post_render_*` happens.
    fn post_render(&mut self, damage: &[DamageRect]);

    fn position_size(&self) -> PositionSize;
    fn dpi(&self) -> (f32, f32);

    /// Wires the surface to the synchronizer it belongs to, so
    /// native-image implementations can drive the post-render
    /// handshake. Called once, right after construction.
    fn set_thread_synchronization(&mut self, sync: Arc<ThreadSynchronization>);
}

/// A window-backed surface: the common case. Presentation is a plain
/// buffer swap with no cross-thread handshake beyond the one the
/// synchronizer already provides.
pub struct WindowSurface {
    position_size: PositionSize,
    dpi: (f32, f32),
    created: bool,
}

impl WindowSurface {
    pub fn new(position_size: PositionSize, dpi: (f32, f32)) -> WindowSurface {
        WindowSurface {
            position_size,
            dpi,
            created: false,
        }
    }
}

impl RenderSurface for WindowSurface {
    fn initialize_graphics(&mut self) -> Result<()> {
        log::debug!("window surface: initializing graphics");
        Ok(())
    }

    fn create_surface(&mut self) -> Result<()> {
        log::debug!("window surface: creating native surface");
        self.created = true;
        Ok(())
    }

    fn destroy_surface(&mut self) {
        log::debug!("window surface: destroying native surface");
        self.created = false;
    }

    fn replace_graphics_surface(&mut self) -> Result<()> {
        self.destroy_surface();
        self.create_surface()
    }

    fn pre_render(&mut self) -> PreRenderInfo {
        PreRenderInfo { buffer_age: None }
    }

    fn post_render(&mut self, damage: &[DamageRect]) {
        log::verbose!("window surface: presenting with {} damage rects", damage.len());
    }

    fn position_size(&self) -> PositionSize {
        self.position_size
    }

    fn dpi(&self) -> (f32, f32) {
        self.dpi
    }

    fn set_thread_synchronization(&mut self, _sync: Arc<ThreadSynchronization>) {}
}

/// An offscreen pixmap surface. Like a window surface but never
/// presented to a compositor; used for snapshotting / headless
/// rendering.
pub struct PixmapSurface {
    position_size: PositionSize,
    dpi: (f32, f32),
}

impl PixmapSurface {
    pub fn new(position_size: PositionSize, dpi: (f32, f32)) -> PixmapSurface {
        PixmapSurface { position_size, dpi }
    }
}

impl RenderSurface for PixmapSurface {
    fn initialize_graphics(&mut self) -> Result<()> {
        Ok(())
    }

    fn create_surface(&mut self) -> Result<()> {
        Ok(())
    }

    fn destroy_surface(&mut self) {}

    fn replace_graphics_surface(&mut self) -> Result<()> {
        Ok(())
    }

    fn pre_render(&mut self) -> PreRenderInfo {
        PreRenderInfo { buffer_age: None }
    }

    fn post_render(&mut self, _damage: &[DamageRect]) {}

    fn position_size(&self) -> PositionSize {
        self.position_size
    }

    fn dpi(&self) -> (f32, f32) {
        self.dpi
    }

    fn set_thread_synchronization(&mut self, _sync: Arc<ThreadSynchronization>) {}
}

/// A native-image (tbm/dma-buf) offscreen surface shared with an
/// external consumer (e.g. a second compositor client). Presentation
/// requires the producer/consumer handshake on `ThreadSynchronization`:
/// the Render thread announces a frame with `post_render_started`, then
/// blocks in `post_render_wait_for_completion` until the consumer has
/// finished reading the previous buffer.
pub struct NativeImageSurface {
    position_size: PositionSize,
    dpi: (f32, f32),
    sync: Option<Arc<ThreadSynchronization>>,
    /// No prior buffer has been handed to the consumer yet, so the
    /// first `pre_render` must not wait for a release that will never
    /// come.
    first_frame: bool,
}

impl NativeImageSurface {
    pub fn new(position_size: PositionSize, dpi: (f32, f32)) -> NativeImageSurface {
        NativeImageSurface {
            position_size,
            dpi,
            sync: None,
            first_frame: true,
        }
    }
}

impl RenderSurface for NativeImageSurface {
    fn initialize_graphics(&mut self) -> Result<()> {
        Ok(())
    }

    fn create_surface(&mut self) -> Result<()> {
        Ok(())
    }

    fn destroy_surface(&mut self) {}

    fn replace_graphics_surface(&mut self) -> Result<()> {
        Ok(())
    }

    fn pre_render(&mut self) -> PreRenderInfo {
        if self.first_frame {
            self.first_frame = false;
        } else if let Some(sync) = &self.sync {
            // Wait for the previous buffer to be released by the
            // consumer before drawing into it again.
            sync.post_render_wait_for_completion();
        }
        PreRenderInfo { buffer_age: None }
    }

    fn post_render(&mut self, _damage: &[DamageRect]) {
        if let Some(sync) = &self.sync {
            sync.post_render_started();
        }
    }

    fn position_size(&self) -> PositionSize {
        self.position_size
    }

    fn dpi(&self) -> (f32, f32) {
        self.dpi
    }

    fn set_thread_synchronization(&mut self, sync: Arc<ThreadSynchronization>) {
        self.sync = Some(sync);
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// A surface that records calls instead of touching any graphics
    /// API, for driving the synchronizer's surface-replace/resize
    /// handshake in tests. `buffer_age` is fixed at construction so
    /// tests can exercise the Render thread's damage ring against a
    /// known age sequence.
    pub struct MockRenderSurface {
        position_size: PositionSize,
        dpi: (f32, f32),
        buffer_age: Option<u32>,
        create_calls: AtomicU32,
        destroy_calls: AtomicU32,
        pre_render_calls: AtomicU32,
        post_render_calls: AtomicU32,
        last_damage: Mutex<Vec<DamageRect>>,
    }

    impl MockRenderSurface {
        pub fn new() -> MockRenderSurface {
            MockRenderSurface {
                position_size: PositionSize {
                    x: 0,
                    y: 0,
                    width: 480,
                    height: 800,
                },
                dpi: (96.0, 96.0),
                buffer_age: None,
                create_calls: AtomicU32::new(0),
                destroy_calls: AtomicU32::new(0),
                pre_render_calls: AtomicU32::new(0),
                post_render_calls: AtomicU32::new(0),
                last_damage: Mutex::new(Vec::new()),
            }
        }

        /// A surface that reports a fixed buffer age to every `pre_render`
        /// call, for tests that need a deterministic damage-ring history.
        pub fn with_buffer_age(age: u32) -> MockRenderSurface {
            let mut surface = MockRenderSurface::new();
            surface.buffer_age = Some(age);
            surface
        }

        pub fn create_calls(&self) -> u32 {
            self.create_calls.load(Ordering::SeqCst)
        }

        pub fn post_render_calls(&self) -> u32 {
            self.post_render_calls.load(Ordering::SeqCst)
        }

        /// The damage list passed to the most recent `post_render` call.
        pub fn last_damage(&self) -> Vec<DamageRect> {
            self.last_damage.lock().unwrap().clone()
        }
    }

    impl RenderSurface for MockRenderSurface {
        fn initialize_graphics(&mut self) -> Result<()> {
            Ok(())
        }

        fn create_surface(&mut self) -> Result<()> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn destroy_surface(&mut self) {
            self.destroy_calls.fetch_add(1, Ordering::SeqCst);
        }

        fn replace_graphics_surface(&mut self) -> Result<()> {
            self.destroy_surface();
            self.create_surface()
        }

        fn pre_render(&mut self) -> PreRenderInfo {
            self.pre_render_calls.fetch_add(1, Ordering::SeqCst);
            PreRenderInfo {
                buffer_age: self.buffer_age,
            }
        }

        fn post_render(&mut self, damage: &[DamageRect]) {
            self.post_render_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_damage.lock().unwrap() = damage.to_vec();
        }

        fn position_size(&self) -> PositionSize {
            self.position_size
        }

        fn dpi(&self) -> (f32, f32) {
            self.dpi
        }

        fn set_thread_synchronization(&mut self, _sync: Arc<ThreadSynchronization>) {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_surface_replace_destroys_then_creates() {
        let mut surface = WindowSurface::new(
            PositionSize {
                x: 0,
                y: 0,
                width: 100,
                height: 100,
            },
            (96.0, 96.0),
        );
        surface.create_surface().unwrap();
        assert!(surface.created);
        surface.replace_graphics_surface().unwrap();
        assert!(surface.created);
    }
}
