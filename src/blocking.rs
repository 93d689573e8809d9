//! Synchronous wrapper around [`FtpsSession`](crate::FtpsSession).
//!
//! Every call blocks the current thread until the transfer completes or the
//! engine's timeout fires. Must not be used from inside an async runtime.

use std::path::Path;
use tokio::runtime::{Builder, Runtime};

use crate::engine::{EngineFactory, FtpsEngine, TransferEngine};
use crate::error::{Error, Result};
use crate::types::{DeleteOutcome, SessionConfig};

/// Blocking FTPS session; owns a single-threaded runtime to drive transfers
#[derive(Debug)]
pub struct FtpsSession<E: TransferEngine = FtpsEngine> {
    inner: crate::FtpsSession<E>,
    runtime: Runtime,
}

impl FtpsSession<FtpsEngine> {
    pub fn new(
        username: &str,
        password: &str,
        server: &str,
        port: u16,
        initial_path: &str,
        passive_mode: bool,
    ) -> Result<Self> {
        Self::from_config(
            SessionConfig::new(username, password, server)
                .port(port)
                .initial_path(initial_path)
                .passive_mode(passive_mode),
        )
    }

    pub fn from_config(config: SessionConfig) -> Result<Self> {
        Self::with_engine(config, Box::new(FtpsEngine::new))
    }
}

impl<E: TransferEngine> FtpsSession<E> {
    pub fn with_engine(config: SessionConfig, factory: EngineFactory<E>) -> Result<Self> {
        let inner = crate::FtpsSession::with_engine(config, factory)?;
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Initialization(format!("could not start runtime: {e}")))?;
        Ok(Self { inner, runtime })
    }

    pub fn url(&self) -> &str {
        self.inner.url()
    }

    pub fn upload(&mut self, file_name: &str, local_path: impl AsRef<Path>) -> Result<()> {
        self.runtime
            .block_on(self.inner.upload(file_name, local_path))
    }

    pub fn raw_list(&mut self) -> Result<Vec<String>> {
        self.runtime.block_on(self.inner.raw_list())
    }

    pub fn n_list(&mut self) -> Result<Vec<String>> {
        self.runtime.block_on(self.inner.n_list())
    }

    pub fn download(
        &mut self,
        local_path: impl AsRef<Path>,
        remote_file_name: &str,
    ) -> Result<String> {
        self.runtime
            .block_on(self.inner.download(local_path, remote_file_name))
    }

    pub fn remote_file_size(&mut self, file_name: &str) -> Result<i64> {
        self.runtime.block_on(self.inner.remote_file_size(file_name))
    }

    pub fn delete(&mut self, file_name: &str) -> Result<DeleteOutcome> {
        self.runtime.block_on(self.inner.delete(file_name))
    }

    pub fn close(&mut self) {
        self.inner.close();
    }
}
