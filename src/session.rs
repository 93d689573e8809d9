use std::fmt;
use std::path::Path;
use tracing::info;

use crate::engine::{EngineFactory, FtpsEngine, TransferEngine};
use crate::error::Result;
use crate::operations::{delete, download, list, size, upload};
use crate::transport::TransportHandle;
use crate::types::{DeleteOutcome, SessionConfig};

/// File operations against one remote directory over FTP with implicit TLS
///
/// Operations take `&mut self`: a session runs one transfer at a time. Use
/// one session per concurrent transfer.
pub struct FtpsSession<E: TransferEngine = FtpsEngine> {
    pub(crate) url: String,
    pub(crate) transport: TransportHandle<E>,
}

impl FtpsSession<FtpsEngine> {
    /// Creates a session using the built-in engine
    ///
    /// # Arguments
    ///
    /// * `username` - Login name, must not be blank
    /// * `password` - Login password
    /// * `server` - Host name or address, must not be blank
    /// * `port` - Control port, usually [`DEFAULT_PORT`](crate::DEFAULT_PORT) (990)
    /// * `initial_path` - Remote directory operations are relative to, e.g. `"outgoing/"`
    /// * `passive_mode` - Use `PASV` instead of `PORT` for data connections
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`](crate::Error::Validation) for a blank
    /// username, a blank server or a zero port.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let mut session = FtpsSession::new("user", "secret", "ftp.example.com", 990, "", false)?;
    /// let files = session.n_list().await?;
    /// ```
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
    /// Creates a session whose transfers run on engines from `factory`
    pub fn with_engine(config: SessionConfig, factory: EngineFactory<E>) -> Result<Self> {
        config.validate()?;
        let url = config.url();
        info!("FTPS session for {}@{}", config.username, url);
        let transport = TransportHandle::new(
            config.credentials(),
            config.port,
            config.passive_mode,
            factory,
        );
        Ok(Self { url, transport })
    }

    /// `ftps://server/initial_path`; remote file names are appended to it
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Uploads `local_path` as `file_name` in the remote directory
    ///
    /// # Example
    ///
    /// ```ignore
    /// session.upload("report.csv", "/tmp/report.csv").await?;
    /// ```
    pub async fn upload(&mut self, file_name: &str, local_path: impl AsRef<Path>) -> Result<()> {
        upload::upload(self, file_name, local_path.as_ref()).await
    }

    /// Full listing lines of the remote directory
    pub async fn raw_list(&mut self) -> Result<Vec<String>> {
        list::get_list(self, false).await
    }

    /// File names in the remote directory
    pub async fn n_list(&mut self) -> Result<Vec<String>> {
        list::get_list(self, true).await
    }

    /// Downloads `remote_file_name` into `local_path` and returns its content
    ///
    /// A failed transfer returns an empty string rather than an error; see
    /// the note on leniency in the crate docs.
    pub async fn download(
        &mut self,
        local_path: impl AsRef<Path>,
        remote_file_name: &str,
    ) -> Result<String> {
        download::download(self, local_path.as_ref(), remote_file_name).await
    }

    /// Size of `file_name` in bytes, or `-1` when unknown
    pub async fn remote_file_size(&mut self, file_name: &str) -> Result<i64> {
        size::remote_file_size(self, file_name).await
    }

    /// Deletes `file_name`, then confirms it no longer appears in the listing
    ///
    /// # Example
    ///
    /// ```ignore
    /// match session.delete("old.log").await? {
    ///     DeleteOutcome::Deleted(url) => println!("removed {url}"),
    ///     DeleteOutcome::NotConfirmed => println!("still there"),
    /// }
    /// ```
    pub async fn delete(&mut self, file_name: &str) -> Result<DeleteOutcome> {
        delete::delete(self, file_name).await
    }

    /// Releases the underlying engine now instead of on drop
    pub fn close(&mut self) {
        self.transport.close();
    }
}

impl<E: TransferEngine> fmt::Debug for FtpsSession<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FtpsSession")
            .field("url", &self.url)
            .field("connected", &self.transport.is_initialized())
            .finish()
    }
}
