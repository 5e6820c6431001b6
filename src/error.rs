// Error taxonomy for the synchronization core
//
// DALi Adaptor Contributors
//
// Transient-skip and graphics-context-lost conditions (see the crate's
// error handling design) are handled locally by the thread that hits
// them and never surface here; this enum only carries the errors that
// cross a public API boundary.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdaptorError {
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("fatal synchronization failure: {0}")]
    Fatal(String),

    #[error("operation cancelled by stop()")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, AdaptorError>;
