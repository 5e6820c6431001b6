// A set of helper modules shared by the synchronization core and
// its platform glue.
//
// DALi Adaptor Contributors

pub mod timing;
#[macro_use]
pub mod logging;
pub mod log;
pub mod region;

extern crate anyhow;
pub use anyhow::{anyhow, Context, Error, Result};
