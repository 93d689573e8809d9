use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::io;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use percent_encoding::percent_decode_str;
use tokio_native_tls::TlsConnector;
use tracing::{debug, info, warn};
use url::{Host, Url};

use crate::engine::TransferEngine;
use crate::engine::codec::{BoxStream, ControlChannel, Reply};
use crate::engine::data::{self, ControlAddrs};
use crate::error::{EngineError, EngineErrorCode};
use crate::types::{Credentials, SecurityLevel, TransferOption, TransferOptions};

/// Transfer engine speaking FTP over implicit TLS (`ftps://`) or plain
/// TCP (`ftp://`).
///
/// Each [`perform`](TransferEngine::perform) opens its own control
/// connection, runs a single transfer and quits, so nothing stays open
/// between calls.
///
/// The data channel under `PROT P` gets a fresh TLS handshake; the control
/// channel's TLS session is not reused for it. Servers that insist on
/// session reuse (vsftpd's `require_ssl_reuse`, for one) will refuse
/// protected transfers.
#[derive(Debug)]
pub struct FtpsEngine {
    options: TransferOptions,
    content_length: Option<u64>,
}

impl FtpsEngine {
    pub fn new() -> Result<Self, EngineError> {
        Ok(Self {
            options: TransferOptions::new(),
            content_length: None,
        })
    }

    pub fn options(&self) -> &TransferOptions {
        &self.options
    }
}

#[async_trait]
impl TransferEngine for FtpsEngine {
    fn reset(&mut self) -> bool {
        self.options = TransferOptions::new();
        self.content_length = None;
        true
    }

    fn set_option(&mut self, option: TransferOption) -> Result<(), EngineError> {
        debug!("Setting option {}", option.name());
        self.options.apply(option)
    }

    async fn perform(&mut self) -> Result<Bytes, EngineError> {
        self.content_length = None;
        let options = self.options.clone();
        let target = Target::from_options(&options)?;

        let transfer = run(&options, &target);
        let outcome = match options.timeout {
            Some(limit) => tokio::time::timeout(limit, transfer).await.map_err(|_| {
                EngineError::new(
                    EngineErrorCode::OperationTimedout,
                    format!("operation timed out after {} ms", limit.as_millis()),
                )
            })??,
            None => transfer.await?,
        };
        self.content_length = outcome.content_length;

        if let Some(sink) = &options.write_to {
            fs::write(sink, &outcome.body).await.map_err(|e| {
                EngineError::new(EngineErrorCode::WriteError, format!("{}: {e}", sink.display()))
            })?;
        }

        if options.return_transfer {
            Ok(outcome.body)
        } else {
            if options.write_to.is_none() && !outcome.body.is_empty() {
                let mut stdout = tokio::io::stdout();
                stdout
                    .write_all(&outcome.body)
                    .await
                    .map_err(|e| EngineError::new(EngineErrorCode::WriteError, e.to_string()))?;
                stdout.flush().await.ok();
            }
            Ok(Bytes::new())
        }
    }

    fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    fn close(&mut self) -> Result<(), EngineError> {
        self.content_length = None;
        Ok(())
    }
}

/// Where a transfer goes, resolved from the URL option
#[derive(Debug, PartialEq, Eq)]
struct Target {
    tls: bool,
    host: String,
    port: u16,
    /// Directory to `CWD` into, relative to the login directory
    dir: Option<String>,
    /// Empty for directory targets
    file: String,
}

impl Target {
    fn from_options(options: &TransferOptions) -> Result<Self, EngineError> {
        let raw = options
            .url
            .as_deref()
            .ok_or_else(|| EngineError::new(EngineErrorCode::UrlMalformat, "no URL set"))?;
        let url = Url::parse(raw)
            .map_err(|e| EngineError::new(EngineErrorCode::UrlMalformat, format!("{raw}: {e}")))?;

        let tls = match url.scheme() {
            "ftps" => true,
            "ftp" => false,
            other => {
                return Err(EngineError::new(
                    EngineErrorCode::UnsupportedProtocol,
                    format!("protocol \"{other}\" not supported"),
                ));
            }
        };
        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(ip)) => ip.to_string(),
            Some(Host::Ipv6(ip)) => ip.to_string(),
            None => {
                return Err(EngineError::new(
                    EngineErrorCode::UrlMalformat,
                    format!("no host in {raw}"),
                ));
            }
        };
        let port = match options.port {
            0 => url.port().unwrap_or(if tls { 990 } else { 21 }),
            port => port,
        };

        let path = url.path();
        let path = path.strip_prefix('/').unwrap_or(path);
        let (dir, file) = match path.rfind('/') {
            Some(idx) => (
                Some(decode_segment(&path[..idx])?),
                decode_segment(&path[idx + 1..])?,
            ),
            None => (None, decode_segment(path)?),
        };

        Ok(Self {
            tls,
            host,
            port,
            dir: dir.filter(|d| !d.is_empty()),
            file,
        })
    }
}

/// Percent-decodes a path piece. Pieces that decode to a line break are
/// refused, they would end the command line they are sent on.
fn decode_segment(segment: &str) -> Result<String, EngineError> {
    let decoded = percent_decode_str(segment).decode_utf8_lossy();
    if decoded.contains(['\r', '\n']) {
        return Err(EngineError::new(
            EngineErrorCode::UrlMalformat,
            format!("line break in URL path: {segment}"),
        ));
    }
    Ok(decoded.into_owned())
}

struct Outcome {
    body: Bytes,
    content_length: Option<u64>,
}

fn tls_connector(options: &TransferOptions) -> Result<TlsConnector, EngineError> {
    let mut builder = native_tls::TlsConnector::builder();
    builder.danger_accept_invalid_certs(!options.verify_peer);
    builder.danger_accept_invalid_hostnames(!options.verify_host);
    let connector = builder
        .build()
        .map_err(|e| EngineError::new(EngineErrorCode::SslConnectError, e.to_string()))?;
    Ok(TlsConnector::from(connector))
}

async fn run(options: &TransferOptions, target: &Target) -> Result<Outcome, EngineError> {
    info!("Connecting to {}:{}", target.host, target.port);
    let tcp = TcpStream::connect((target.host.as_str(), target.port))
        .await
        .map_err(|e| {
            EngineError::new(
                EngineErrorCode::CouldntConnect,
                format!("{}:{}: {e}", target.host, target.port),
            )
        })?;
    tcp.set_nodelay(true).ok();
    let addrs = ControlAddrs {
        local: tcp
            .local_addr()
            .map_err(|e| EngineError::new(EngineErrorCode::CouldntConnect, e.to_string()))?
            .ip(),
        peer: tcp
            .peer_addr()
            .map_err(|e| EngineError::new(EngineErrorCode::CouldntConnect, e.to_string()))?
            .ip(),
    };

    let connector = if target.tls {
        Some(tls_connector(options)?)
    } else {
        None
    };
    let stream: BoxStream = match &connector {
        Some(connector) => {
            let tls = connector.connect(&target.host, tcp).await.map_err(|e| {
                EngineError::new(
                    EngineErrorCode::SslConnectError,
                    format!("implicit TLS handshake: {e}"),
                )
            })?;
            Box::new(tls)
        }
        None => Box::new(tcp),
    };
    let mut control = ControlChannel::new(stream);

    let banner = control.read_reply().await?;
    if !banner.is_completion() {
        return Err(EngineError::new(
            EngineErrorCode::CouldntConnect,
            banner.text(),
        ));
    }

    login(&mut control, options.credentials.as_ref()).await?;

    let mut protect_data = false;
    if target.tls && options.security != SecurityLevel::None {
        debug!("Channel protection {:?}, auth {:?}", options.security, options.auth);
        control
            .expect_completion("PBSZ 0", EngineErrorCode::SslConnectError)
            .await?;
        let prot = match options.security {
            SecurityLevel::All => "PROT P",
            _ => "PROT C",
        };
        control
            .expect_completion(prot, EngineErrorCode::SslConnectError)
            .await?;
        protect_data = options.security == SecurityLevel::All;
    }

    if let Some(dir) = &target.dir {
        control
            .expect_completion(&format!("CWD {dir}"), EngineErrorCode::RemoteAccessDenied)
            .await?;
    }

    for command in &options.quote {
        control
            .expect_completion(command, EngineErrorCode::QuoteError)
            .await?;
    }

    let data_tls = if protect_data {
        connector.as_ref().map(|c| (c, target.host.as_str()))
    } else {
        None
    };

    let outcome = if options.upload {
        store(&mut control, options, target, addrs, data_tls).await?
    } else if target.file.is_empty() {
        let command = if options.list_only { "NLST" } else { "LIST" };
        set_type(&mut control, "A").await?;
        let body = receive(&mut control, options, addrs, data_tls, command).await?;
        Outcome {
            body,
            content_length: None,
        }
    } else if options.no_body {
        set_type(&mut control, "I").await?;
        let size = remote_size(&mut control, &target.file).await?;
        let body = match (options.header, size) {
            (true, Some(size)) => {
                Bytes::from(format!("Content-Length: {size}\r\nAccept-ranges: bytes\r\n"))
            }
            _ => Bytes::new(),
        };
        Outcome {
            body,
            content_length: size,
        }
    } else {
        set_type(&mut control, "I").await?;
        let command = format!("RETR {}", target.file);
        let body = receive(&mut control, options, addrs, data_tls, &command).await?;
        info!("Received {} bytes of {}", body.len(), target.file);
        Outcome {
            content_length: Some(body.len() as u64),
            body,
        }
    };

    if let Err(e) = control.command("QUIT").await {
        debug!("QUIT failed: {}", e);
    }
    Ok(outcome)
}

async fn login<S: AsyncRead + AsyncWrite + Unpin>(
    control: &mut ControlChannel<S>,
    credentials: Option<&Credentials>,
) -> Result<(), EngineError> {
    let anonymous = Credentials {
        username: "anonymous".to_string(),
        password: String::new(),
    };
    let credentials = credentials.unwrap_or(&anonymous);

    let mut reply = control
        .command(&format!("USER {}", credentials.username))
        .await?;
    if reply.is_intermediate() {
        reply = control
            .command(&format!("PASS {}", credentials.password))
            .await?;
    }
    if !reply.is_completion() {
        return Err(EngineError::new(EngineErrorCode::LoginDenied, reply.text()));
    }
    info!("Logged in as {}", credentials.username);
    Ok(())
}

async fn set_type<S: AsyncRead + AsyncWrite + Unpin>(
    control: &mut ControlChannel<S>,
    kind: &str,
) -> Result<(), EngineError> {
    control
        .expect_completion(&format!("TYPE {kind}"), EngineErrorCode::WeirdServerReply)
        .await
        .map(|_| ())
}

/// `SIZE`; a missing file is an error, other refusals leave the size unknown
async fn remote_size<S: AsyncRead + AsyncWrite + Unpin>(
    control: &mut ControlChannel<S>,
    file: &str,
) -> Result<Option<u64>, EngineError> {
    let reply = control.command(&format!("SIZE {file}")).await?;
    match reply.code {
        213 => Ok(reply.message().trim().parse::<u64>().ok()),
        550 => Err(EngineError::new(
            EngineErrorCode::RemoteFileNotFound,
            reply.text(),
        )),
        _ => {
            warn!("SIZE not supported: {}", reply.text());
            Ok(None)
        }
    }
}

fn transfer_refused(reply: &Reply, fallback: EngineErrorCode) -> EngineError {
    let code = match reply.code {
        550 => EngineErrorCode::RemoteFileNotFound,
        530 | 532 => EngineErrorCode::RemoteAccessDenied,
        _ => fallback,
    };
    EngineError::new(code, reply.text())
}

/// Runs a download-direction command (`LIST`, `NLST`, `RETR`) and collects
/// everything the server sends on the data connection.
async fn receive<S: AsyncRead + AsyncWrite + Unpin>(
    control: &mut ControlChannel<S>,
    options: &TransferOptions,
    addrs: ControlAddrs,
    tls: Option<(&TlsConnector, &str)>,
    command: &str,
) -> Result<Bytes, EngineError> {
    let pending = data::open(control, options.active_port, addrs).await?;
    let reply = control.command(command).await?;
    if !reply.is_preliminary() {
        return Err(transfer_refused(&reply, EngineErrorCode::WeirdServerReply));
    }

    let mut stream = pending.establish(tls).await?;
    let mut body = BytesMut::new();
    loop {
        match stream.read_buf(&mut body).await {
            Ok(0) => break,
            Ok(_) => {}
            // servers often drop the data connection without a TLS close_notify
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => {
                return Err(EngineError::new(EngineErrorCode::RecvError, e.to_string()));
            }
        }
    }
    drop(stream);

    let done = control.read_reply().await?;
    if !done.is_completion() {
        return Err(EngineError::new(EngineErrorCode::RecvError, done.text()));
    }
    Ok(body.freeze())
}

async fn store<S: AsyncRead + AsyncWrite + Unpin>(
    control: &mut ControlChannel<S>,
    options: &TransferOptions,
    target: &Target,
    addrs: ControlAddrs,
    tls: Option<(&TlsConnector, &str)>,
) -> Result<Outcome, EngineError> {
    if target.file.is_empty() {
        return Err(EngineError::new(
            EngineErrorCode::UrlMalformat,
            "upload target has no file name",
        ));
    }
    let source = options
        .read_from
        .as_ref()
        .ok_or_else(|| EngineError::new(EngineErrorCode::ReadError, "no upload source set"))?;
    let mut file = fs::File::open(source).await.map_err(|e| {
        EngineError::new(EngineErrorCode::ReadError, format!("{}: {e}", source.display()))
    })?;

    set_type(control, "I").await?;
    let pending = data::open(control, options.active_port, addrs).await?;
    let reply = control.command(&format!("STOR {}", target.file)).await?;
    if !reply.is_preliminary() {
        return Err(transfer_refused(&reply, EngineErrorCode::UploadFailed));
    }

    let mut stream = pending.establish(tls).await?;
    let sent = tokio::io::copy(&mut file, &mut stream)
        .await
        .map_err(|e| EngineError::new(EngineErrorCode::SendError, e.to_string()))?;
    stream
        .shutdown()
        .await
        .map_err(|e| EngineError::new(EngineErrorCode::SendError, e.to_string()))?;
    drop(stream);

    if options.in_file_size != 0 && sent != options.in_file_size {
        warn!(
            "Uploaded {} bytes but {} were announced",
            sent, options.in_file_size
        );
    }

    let done = control.read_reply().await?;
    if !done.is_completion() {
        return Err(EngineError::new(EngineErrorCode::UploadFailed, done.text()));
    }
    info!("Stored {} bytes as {}", sent, target.file);
    Ok(Outcome {
        body: Bytes::new(),
        content_length: None,
    })
}
