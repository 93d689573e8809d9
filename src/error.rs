use std::fmt;

/// Errors surfaced by session and transport operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Constructor arguments were rejected
    #[error("invalid argument: {0}")]
    Validation(String),

    /// The transfer engine could not be created
    #[error("could not initialize transfer engine: {0}")]
    Initialization(String),

    /// The engine rejected an option
    #[error("could not set option {option}: {message}")]
    Configuration {
        option: &'static str,
        message: String,
    },

    /// Executing a transfer failed
    #[error("transfer failed: [{code}] - {message}")]
    Transfer { code: u32, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn configuration(option: &'static str, err: EngineError) -> Self {
        Error::Configuration {
            option,
            message: err.message,
        }
    }

    pub(crate) fn transfer(context: &str, err: EngineError) -> Self {
        Error::Transfer {
            code: err.code as u32,
            message: format!("{}: {}", context, err.message),
        }
    }
}

/// Numeric failure categories reported by a transfer engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum EngineErrorCode {
    UnsupportedProtocol = 1,
    UrlMalformat = 3,
    CouldntResolveHost = 6,
    CouldntConnect = 7,
    WeirdServerReply = 8,
    RemoteAccessDenied = 9,
    QuoteError = 21,
    WriteError = 23,
    UploadFailed = 25,
    ReadError = 26,
    OperationTimedout = 28,
    PortFailed = 30,
    SslConnectError = 35,
    BadFunctionArgument = 43,
    SendError = 55,
    RecvError = 56,
    LoginDenied = 67,
    RemoteFileNotFound = 78,
}

impl EngineErrorCode {
    pub fn description(self) -> &'static str {
        match self {
            EngineErrorCode::UnsupportedProtocol => "unsupported protocol",
            EngineErrorCode::UrlMalformat => "URL using bad/illegal format",
            EngineErrorCode::CouldntResolveHost => "could not resolve host name",
            EngineErrorCode::CouldntConnect => "could not connect to server",
            EngineErrorCode::WeirdServerReply => "weird server reply",
            EngineErrorCode::RemoteAccessDenied => "access denied to remote resource",
            EngineErrorCode::QuoteError => "quote command returned error",
            EngineErrorCode::WriteError => "failed writing received data",
            EngineErrorCode::UploadFailed => "upload failed",
            EngineErrorCode::ReadError => "failed reading local data",
            EngineErrorCode::OperationTimedout => "timeout was reached",
            EngineErrorCode::PortFailed => "active data connection setup failed",
            EngineErrorCode::SslConnectError => "TLS connect error",
            EngineErrorCode::BadFunctionArgument => "a function argument was not okay",
            EngineErrorCode::SendError => "failed sending data to the peer",
            EngineErrorCode::RecvError => "failure when receiving data from the peer",
            EngineErrorCode::LoginDenied => "login denied",
            EngineErrorCode::RemoteFileNotFound => "remote file not found",
        }
    }
}

/// Error reported by a [`TransferEngine`](crate::TransferEngine)
#[derive(Debug, Clone)]
pub struct EngineError {
    pub code: EngineErrorCode,
    pub message: String,
}

impl EngineError {
    pub fn new(code: EngineErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code as u32,
            self.code.description(),
            self.message
        )
    }
}

impl std::error::Error for EngineError {}
