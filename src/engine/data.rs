//! Data connection setup for passive (`PASV`) and active (`PORT`/`EPRT`) mode.

use regex::Regex;
use std::net::{IpAddr, SocketAddr};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio_native_tls::TlsConnector;
use tracing::debug;

use crate::engine::codec::{BoxStream, ControlChannel};
use crate::error::{EngineError, EngineErrorCode};
use crate::types::ActivePort;

/// A data connection whose transfer command has not been sent yet
pub(crate) enum PendingData {
    /// Already connected to the server's passive port
    Passive(TcpStream),
    /// Waiting for the server to connect back
    Active(TcpListener),
}

/// Endpoints of the control connection, needed to place the data connection
#[derive(Debug, Clone, Copy)]
pub(crate) struct ControlAddrs {
    pub local: IpAddr,
    pub peer: IpAddr,
}

pub(crate) async fn open<S: AsyncRead + AsyncWrite + Unpin>(
    control: &mut ControlChannel<S>,
    active: Option<ActivePort>,
    addrs: ControlAddrs,
) -> Result<PendingData, EngineError> {
    match active {
        None => open_passive(control, addrs.peer).await,
        Some(ActivePort::Auto) => open_active(control, addrs.local).await,
        Some(ActivePort::Address(ip)) => open_active(control, ip).await,
    }
}

/// Connects to the port announced by `PASV`. The announced address is
/// ignored in favour of the control peer, which survives NAT.
async fn open_passive<S: AsyncRead + AsyncWrite + Unpin>(
    control: &mut ControlChannel<S>,
    peer: IpAddr,
) -> Result<PendingData, EngineError> {
    let reply = control
        .expect_completion("PASV", EngineErrorCode::WeirdServerReply)
        .await?;
    let announced = parse_pasv(&reply.text())?;
    let addr = SocketAddr::new(peer, announced.port());
    debug!("Passive data connection to {}", addr);
    let stream = TcpStream::connect(addr).await.map_err(|e| {
        EngineError::new(
            EngineErrorCode::CouldntConnect,
            format!("data connection to {addr}: {e}"),
        )
    })?;
    Ok(PendingData::Passive(stream))
}

async fn open_active<S: AsyncRead + AsyncWrite + Unpin>(
    control: &mut ControlChannel<S>,
    bind_ip: IpAddr,
) -> Result<PendingData, EngineError> {
    let listener = TcpListener::bind(SocketAddr::new(bind_ip, 0))
        .await
        .map_err(|e| EngineError::new(EngineErrorCode::PortFailed, format!("bind: {e}")))?;
    let local = listener
        .local_addr()
        .map_err(|e| EngineError::new(EngineErrorCode::PortFailed, e.to_string()))?;

    let command = port_command(local);
    debug!("Active data connection on {}", local);
    control
        .expect_completion(&command, EngineErrorCode::PortFailed)
        .await?;
    Ok(PendingData::Active(listener))
}

impl PendingData {
    /// Completes the connection after the server accepted the transfer
    /// command, wrapping it in TLS when `tls` is given.
    pub async fn establish(
        self,
        tls: Option<(&TlsConnector, &str)>,
    ) -> Result<BoxStream, EngineError> {
        let tcp = match self {
            PendingData::Passive(stream) => stream,
            PendingData::Active(listener) => {
                let (stream, from) = listener.accept().await.map_err(|e| {
                    EngineError::new(EngineErrorCode::PortFailed, format!("accept: {e}"))
                })?;
                debug!("Server connected back from {}", from);
                stream
            }
        };

        match tls {
            Some((connector, domain)) => {
                let stream = connector.connect(domain, tcp).await.map_err(|e| {
                    EngineError::new(
                        EngineErrorCode::SslConnectError,
                        format!("data channel handshake: {e}"),
                    )
                })?;
                Ok(Box::new(stream))
            }
            None => Ok(Box::new(tcp)),
        }
    }
}

/// `PORT h1,h2,h3,h4,p1,p2` for IPv4, `EPRT |2|addr|port|` for IPv6
fn port_command(addr: SocketAddr) -> String {
    match addr.ip() {
        IpAddr::V4(ip) => {
            let o = ip.octets();
            format!(
                "PORT {},{},{},{},{},{}",
                o[0],
                o[1],
                o[2],
                o[3],
                addr.port() >> 8,
                addr.port() & 0xff
            )
        }
        IpAddr::V6(ip) => format!("EPRT |2|{}|{}|", ip, addr.port()),
    }
}

/// Parses `227 Entering Passive Mode (h1,h2,h3,h4,p1,p2)`; the parentheses
/// are optional.
fn parse_pasv(text: &str) -> Result<SocketAddr, EngineError> {
    let weird = || {
        EngineError::new(
            EngineErrorCode::WeirdServerReply,
            format!("cannot parse PASV reply: {text}"),
        )
    };

    let re = Regex::new(r"\(?(\d+),(\d+),(\d+),(\d+),(\d+),(\d+)\)?")
        .map_err(|e| EngineError::new(EngineErrorCode::WeirdServerReply, e.to_string()))?;
    let caps = re.captures(text).ok_or_else(weird)?;
    let mut numbers = [0u8; 6];
    for (i, n) in numbers.iter_mut().enumerate() {
        *n = caps[i + 1].parse().map_err(|_| weird())?;
    }

    let ip = IpAddr::from([numbers[0], numbers[1], numbers[2], numbers[3]]);
    let port = u16::from(numbers[4]) << 8 | u16::from(numbers[5]);
    Ok(SocketAddr::new(ip, port))
}
