// Platform time source abstraction
//
// Used by the VSyncNotifier when no hardware VSync monitor is
// available. Kept as a trait (rather than calling `utils::timing`
// directly) so tests can substitute a fully deterministic clock.
//
// DALi Adaptor Contributors
use utils::timing;

pub trait PlatformAbstraction: Send + Sync {
    /// Returns the current monotonic time as (seconds, microseconds).
    fn get_time_microseconds(&self) -> (u32, u32);
}

/// The real, wall-clock backed platform abstraction.
pub struct StdPlatform;

impl PlatformAbstraction for StdPlatform {
    fn get_time_microseconds(&self) -> (u32, u32) {
        timing::get_time_of_day()
    }
}
