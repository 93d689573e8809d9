use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{EngineError, EngineErrorCode, Error, Result};

/// Default port for FTP over implicit TLS
pub const DEFAULT_PORT: u16 = 990;

/// Timeout applied to every transfer
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection parameters for an [`FtpsSession`](crate::FtpsSession)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub username: String,
    pub password: String,
    /// Host name or address of the server
    pub server: String,
    pub port: u16,
    /// Remote directory every operation is relative to, e.g. `incoming/`
    pub initial_path: String,
    /// Let the server pick the data port (PASV) instead of connecting back (PORT)
    pub passive_mode: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            server: String::new(),
            port: DEFAULT_PORT,
            initial_path: String::new(),
            passive_mode: false,
        }
    }
}

impl SessionConfig {
    /// Creates a configuration with the default port, root path and active mode
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        server: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            server: server.into(),
            ..Self::default()
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn initial_path(mut self, initial_path: impl Into<String>) -> Self {
        self.initial_path = initial_path.into();
        self
    }

    pub fn passive_mode(mut self, passive_mode: bool) -> Self {
        self.passive_mode = passive_mode;
        self
    }

    /// Rejects a blank username, a blank server and a zero port
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(Error::Validation("FTP username is blank".to_string()));
        }
        if self.server.trim().is_empty() {
            return Err(Error::Validation("FTP server is blank".to_string()));
        }
        if self.port == 0 {
            return Err(Error::Validation("FTP port is blank".to_string()));
        }
        Ok(())
    }

    /// `ftps://server/initial_path`
    pub fn url(&self) -> String {
        format!("ftps://{}/{}", self.server, self.initial_path)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

/// Login pair sent to the server
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// `username:password`, the form engines take for basic auth
    pub fn user_pass(&self) -> String {
        format!("{}:{}", self.username, self.password)
    }

    /// Splits `username:password` at the first colon
    #[cfg(test)]
    pub(crate) fn parse(user_pass: &str) -> Self {
        let (username, password) = user_pass.split_once(':').unwrap_or((user_pass, ""));
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Which channels must be encrypted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecurityLevel {
    #[default]
    None,
    /// Control channel only (`PROT C`)
    Control,
    /// Control and data channels (`PROT P`)
    All,
}

/// Authentication command preference for TLS negotiation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMethod {
    /// Let the engine decide
    #[default]
    Default,
    Ssl,
    Tls,
}

/// Address announced for active-mode data connections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivePort {
    /// Same local address as the control connection
    Auto,
    Address(IpAddr),
}

/// A single engine option. Baseline and per-operation settings are both
/// expressed as a sequence of these.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferOption {
    Credentials(Credentials),
    VerifyPeer(bool),
    VerifyHost(bool),
    Security(SecurityLevel),
    Auth(AuthMethod),
    Upload(bool),
    Port(u16),
    Timeout(Duration),
    ReturnTransfer(bool),
    /// `None` selects passive mode
    ActivePort(Option<ActivePort>),
    Url(Option<String>),
    InFileSize(u64),
    ListOnly(bool),
    Header(bool),
    NoBody(bool),
    /// Raw commands sent after login and before the transfer
    Quote(Vec<String>),
    ReadFrom(Option<PathBuf>),
    WriteTo(Option<PathBuf>),
}

impl TransferOption {
    /// Label used when the engine rejects this option
    pub fn name(&self) -> &'static str {
        match self {
            TransferOption::Credentials(_) => "credentials",
            TransferOption::VerifyPeer(_) => "verify_peer",
            TransferOption::VerifyHost(_) => "verify_host",
            TransferOption::Security(_) => "security",
            TransferOption::Auth(_) => "auth",
            TransferOption::Upload(_) => "upload",
            TransferOption::Port(_) => "port",
            TransferOption::Timeout(_) => "timeout",
            TransferOption::ReturnTransfer(_) => "return_transfer",
            TransferOption::ActivePort(_) => "active_port",
            TransferOption::Url(_) => "url",
            TransferOption::InFileSize(_) => "in_file_size",
            TransferOption::ListOnly(_) => "list_only",
            TransferOption::Header(_) => "header",
            TransferOption::NoBody(_) => "no_body",
            TransferOption::Quote(_) => "quote",
            TransferOption::ReadFrom(_) => "read_from",
            TransferOption::WriteTo(_) => "write_to",
        }
    }
}

/// The complete option state of one engine handle
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransferOptions {
    pub credentials: Option<Credentials>,
    pub verify_peer: bool,
    pub verify_host: bool,
    pub security: SecurityLevel,
    pub auth: AuthMethod,
    pub upload: bool,
    /// Zero means "from the URL"
    pub port: u16,
    pub timeout: Option<Duration>,
    pub return_transfer: bool,
    pub active_port: Option<ActivePort>,
    pub url: Option<String>,
    pub in_file_size: u64,
    pub list_only: bool,
    pub header: bool,
    pub no_body: bool,
    pub quote: Vec<String>,
    pub read_from: Option<PathBuf>,
    pub write_to: Option<PathBuf>,
}

impl TransferOptions {
    /// Options as they stand on a freshly created handle
    pub fn new() -> Self {
        Self {
            verify_peer: true,
            verify_host: true,
            ..Self::default()
        }
    }

    /// Validates and stores one option
    pub fn apply(&mut self, option: TransferOption) -> std::result::Result<(), EngineError> {
        match option {
            TransferOption::Credentials(credentials) => self.credentials = Some(credentials),
            TransferOption::VerifyPeer(verify) => self.verify_peer = verify,
            TransferOption::VerifyHost(verify) => self.verify_host = verify,
            TransferOption::Security(level) => self.security = level,
            TransferOption::Auth(method) => self.auth = method,
            TransferOption::Upload(upload) => self.upload = upload,
            TransferOption::Port(port) => {
                if port == 0 {
                    return Err(EngineError::new(
                        EngineErrorCode::BadFunctionArgument,
                        "port must be non-zero",
                    ));
                }
                self.port = port;
            }
            TransferOption::Timeout(timeout) => {
                if timeout.is_zero() {
                    return Err(EngineError::new(
                        EngineErrorCode::BadFunctionArgument,
                        "timeout must be non-zero",
                    ));
                }
                self.timeout = Some(timeout);
            }
            TransferOption::ReturnTransfer(capture) => self.return_transfer = capture,
            TransferOption::ActivePort(active) => self.active_port = active,
            TransferOption::Url(url) => {
                if let Some(url) = &url {
                    url::Url::parse(url).map_err(|e| {
                        EngineError::new(EngineErrorCode::UrlMalformat, format!("{url}: {e}"))
                    })?;
                }
                self.url = url;
            }
            TransferOption::InFileSize(size) => self.in_file_size = size,
            TransferOption::ListOnly(list_only) => self.list_only = list_only,
            TransferOption::Header(header) => self.header = header,
            TransferOption::NoBody(no_body) => self.no_body = no_body,
            TransferOption::Quote(commands) => self.quote = commands,
            TransferOption::ReadFrom(path) => self.read_from = path,
            TransferOption::WriteTo(path) => self.write_to = path,
        }
        Ok(())
    }
}

/// Result of [`FtpsSession::delete`](crate::FtpsSession::delete)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The file is gone; carries its full remote URL
    Deleted(String),
    /// The listing taken after `DELE` still shows the file
    NotConfirmed,
}

impl DeleteOutcome {
    pub fn is_deleted(&self) -> bool {
        matches!(self, DeleteOutcome::Deleted(_))
    }
}
