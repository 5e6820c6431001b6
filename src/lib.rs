// DALi adaptor Update/Render/VSync thread synchronization core.
//
// This crate implements the three-thread (Update, Render, VSync)
// execution model and the double-buffered render-surface protocol
// DALi's adaptor layer runs its scene-graph on. The scene-graph itself
// (`Core`) and the platform windowing glue are treated as opaque
// collaborators behind the `core_iface`/`surface`/`platform` traits.
//
// DALi Adaptor Contributors

pub mod config;
pub mod controller;
pub mod core_iface;
pub mod error;
pub mod platform;
pub mod render_thread;
pub mod surface;
pub mod sync;
pub mod update_thread;
pub mod vsync;

pub use config::Config;
pub use controller::Controller;
pub use core_iface::{Core, RenderStatus};
pub use error::{AdaptorError, Result};
pub use platform::{PlatformAbstraction, StdPlatform};
pub use surface::{PixmapSurface, PositionSize, PreRenderInfo, RenderSurface, WindowSurface};
pub use vsync::{VSyncMonitor, VSyncNotifier, VSyncSample};
