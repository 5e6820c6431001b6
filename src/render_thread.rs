// The Render thread loop.
//
// Owns the current RenderSurface and is the only thread that ever
// touches it, so surface replace/resize can run without any locking
// beyond the ThreadSynchronization handshake that hands a new surface
// across.
//
// DALi Adaptor Contributors

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;

use utils::log;
use utils::region::DamageRect;

use crate::core_iface::Core;
use crate::surface::RenderSurface;
use crate::sync::{RenderAction, ThreadSynchronization};

/// How many frames of damage history the ring keeps. Bounds its memory
/// use; a buffer age beyond this is treated the same as an unknown age
/// (full redraw), matching `thundr`'s per-swapchain-image truncation.
const MAX_DAMAGE_HISTORY: usize = 4;

pub struct RenderThread {
    core: Arc<dyn Core>,
    sync: Arc<ThreadSynchronization>,
    surface: Box<dyn RenderSurface>,
    /// Damage produced by each of the last `MAX_DAMAGE_HISTORY` frames,
    /// newest first. `pre_render`'s reported buffer age selects how many
    /// of these entries must be combined to reconstruct the full damage
    /// since that back buffer was last presented.
    damage_ring: VecDeque<Vec<DamageRect>>,
}

impl RenderThread {
    pub fn new(
        core: Arc<dyn Core>,
        sync: Arc<ThreadSynchronization>,
        mut surface: Box<dyn RenderSurface>,
    ) -> RenderThread {
        surface.set_thread_synchronization(sync.clone());
        RenderThread {
            core,
            sync,
            surface,
            damage_ring: VecDeque::new(),
        }
    }

    pub fn spawn(mut self) -> thread::JoinHandle<()> {
        thread::Builder::new()
            .name("render".to_string())
            .spawn(move || {
                if let Err(e) = self.surface.initialize_graphics() {
                    log::error!("render thread: failed to initialize graphics: {}", e);
                    return;
                }
                if let Err(e) = self.surface.create_surface() {
                    log::error!("render thread: failed to create surface: {}", e);
                    return;
                }
                self.run();
                self.surface.destroy_surface();
            })
            .expect("failed to spawn render thread")
    }

    fn run(&mut self) {
        loop {
            let action = self.sync.render_ready();
            match action {
                RenderAction::Exit => break,
                RenderAction::RunRender { buffer_index, status } => {
                    self.do_render(buffer_index, status);
                }
                RenderAction::ReplaceSurface => {
                    self.do_replace_surface();
                    self.sync.render_finished(action);
                }
                RenderAction::Resize => {
                    self.do_resize();
                    self.sync.render_finished(action);
                }
            }
        }

        log::debug!("render thread exiting");
    }

    fn do_render(&mut self, frame_number: u32, status: crate::core_iface::RenderStatus) {
        let pre = self.surface.pre_render();
        let damage = self.damage_for_age(pre.buffer_age);
        log::verbose!(
            "render: frame={} buffer_age={:?} damage_rects={} status={:?}",
            frame_number,
            pre.buffer_age,
            damage.len(),
            status
        );

        self.core.render(status);

        self.push_frame_damage();
        self.surface.post_render(&damage);
    }

    /// Combines the damage ring entries needed to reconstruct everything
    /// that changed since a back buffer of the given age was last
    /// presented. An unknown or zero age, or an age deeper than the ring
    /// keeps history for, means the caller cannot trust partial damage
    /// and must redraw the full surface -- matching §4.3's "when age is
    /// 0 or unknown, it submits a full-surface damage".
    fn damage_for_age(&self, buffer_age: Option<u32>) -> Vec<DamageRect> {
        match buffer_age {
            Some(age) if age > 0 && (age as usize) <= self.damage_ring.len() => self
                .damage_ring
                .iter()
                .take(age as usize)
                .flatten()
                .copied()
                .collect(),
            _ => vec![self.full_surface_damage()],
        }
    }

    fn full_surface_damage(&self) -> DamageRect {
        let pos_size = self.surface.position_size();
        DamageRect::new(
            pos_size.x,
            pos_size.y,
            pos_size.width as i32,
            pos_size.height as i32,
        )
    }

    /// Records this frame's damage at the front of the ring and trims
    /// the tail once it exceeds `MAX_DAMAGE_HISTORY`. The scene-graph
    /// core is opaque to this crate, so it cannot report sub-surface
    /// damage; every frame is conservatively recorded as fully damaged,
    /// which keeps the ring's combine logic exercised and correct for
    /// the day a finer-grained damage source is wired in.
    fn push_frame_damage(&mut self) {
        self.damage_ring.push_front(vec![self.full_surface_damage()]);
        self.damage_ring.truncate(MAX_DAMAGE_HISTORY);
    }

    /// Resets the damage ring, used whenever the back buffer set
    /// changes underneath the Render thread (surface replace/resize):
    /// stale entries would otherwise be combined with damage from a
    /// buffer the new surface has never seen.
    fn reset_damage_history(&mut self) {
        self.damage_ring.clear();
    }

    fn do_replace_surface(&mut self) {
        log::debug!("render: replacing surface");
        self.surface.destroy_surface();

        let mut new_surface = match self.sync.take_pending_surface() {
            Some(s) => s,
            None => {
                log::error!("render: ReplaceSurface action with no pending surface");
                return;
            }
        };

        new_surface.set_thread_synchronization(self.sync.clone());
        if let Err(e) = new_surface.initialize_graphics() {
            log::error!("render: failed to initialize graphics for new surface: {}", e);
        }
        if let Err(e) = new_surface.create_surface() {
            log::error!("render: failed to create new surface: {}", e);
        }

        self.surface = new_surface;
        self.reset_damage_history();
    }

    fn do_resize(&mut self) {
        log::debug!("render: resizing surface");
        if let Err(e) = self.surface.replace_graphics_surface() {
            log::error!("render: failed to rebuild surface for resize: {}", e);
        }
        self.reset_damage_history();
    }
}
