//! The transfer engine seam.
//!
//! A session never speaks the wire protocol itself: it configures an engine
//! through [`TransferOption`]s and asks it to perform one transfer at a time.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::EngineError;
use crate::types::TransferOption;

mod codec;
mod data;
mod ftps;

#[cfg(test)]
pub(crate) mod mock;

pub use ftps::FtpsEngine;

/// Creates engine instances for a [`TransportHandle`](crate::TransportHandle)
pub type EngineFactory<E> = Box<dyn Fn() -> Result<E, EngineError> + Send + Sync>;

/// A configurable, reusable transfer handle
#[async_trait]
pub trait TransferEngine: Send {
    /// Clears every option back to its initial value.
    ///
    /// Returns `false` when the engine has no bulk reset; the caller then
    /// clears per-call options one by one.
    fn reset(&mut self) -> bool;

    fn set_option(&mut self, option: TransferOption) -> Result<(), EngineError>;

    /// Runs one transfer with the current options and returns the captured body
    async fn perform(&mut self) -> Result<Bytes, EngineError>;

    /// Content length of the last transfer, `None` when unknown
    fn content_length(&self) -> Option<u64>;

    fn close(&mut self) -> Result<(), EngineError>;
}
