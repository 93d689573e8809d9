//! Minimal FTP client over implicit TLS (`ftps://`, port 990 by default).
//!
//! [`FtpsSession`] exposes upload, listing, download, size and delete against
//! one remote directory. Protocol work is done by a [`TransferEngine`]; the
//! built-in [`FtpsEngine`] is used unless another one is supplied.
//!
//! Two operations are lenient on purpose: [`FtpsSession::download`] returns an
//! empty string and [`FtpsSession::remote_file_size`] returns `-1` when the
//! transfer fails, instead of an error.

// Module declarations
mod engine;
mod error;
mod operations;
mod session;
mod transport;
mod types;
mod utils;

pub mod blocking;

// Public API exports
pub use engine::{EngineFactory, FtpsEngine, TransferEngine};
pub use error::{EngineError, EngineErrorCode, Error, Result};
pub use session::FtpsSession;
pub use transport::TransportHandle;
pub use types::{
    ActivePort, AuthMethod, Credentials, DEFAULT_PORT, DEFAULT_TIMEOUT, DeleteOutcome,
    SecurityLevel, SessionConfig, TransferOption, TransferOptions,
};
pub use utils::split_listing;

// Re-export commonly used external types for convenience
pub use bytes::Bytes;
