//! Test doubles: a scriptable in-memory engine and a loopback FTP server.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::engine::{EngineFactory, TransferEngine};
use crate::error::{EngineError, EngineErrorCode};
use crate::types::{TransferOption, TransferOptions};

#[derive(Debug, Default)]
pub(crate) struct MockState {
    pub created: usize,
    pub resets: usize,
    pub closed: usize,
    pub options: TransferOptions,
    /// Every option set, in order
    pub history: Vec<TransferOption>,
    /// Option state at each `perform`
    pub performed: Vec<TransferOptions>,
    pub responses: VecDeque<Result<Bytes, EngineError>>,
    pub content_length: Option<u64>,
    pub reject: Option<&'static str>,
    pub fail_create: bool,
    pub no_bulk_reset: bool,
    pub fail_close: bool,
}

/// Shared view of every [`MockEngine`] a factory creates
#[derive(Debug, Clone, Default)]
pub(crate) struct MockProbe(Arc<Mutex<MockState>>);

impl MockProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn factory(&self) -> EngineFactory<MockEngine> {
        let state = self.0.clone();
        Box::new(move || {
            let mut guard = state.lock().unwrap();
            if guard.fail_create {
                return Err(EngineError::new(
                    EngineErrorCode::BadFunctionArgument,
                    "out of handles",
                ));
            }
            guard.created += 1;
            guard.options = TransferOptions::new();
            Ok(MockEngine {
                state: state.clone(),
            })
        })
    }

    pub fn respond(&self, response: Result<&str, EngineError>) {
        self.state()
            .responses
            .push_back(response.map(|body| Bytes::from(body.to_string())));
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.0.lock().unwrap()
    }
}

#[derive(Debug)]
pub(crate) struct MockEngine {
    state: Arc<Mutex<MockState>>,
}

#[async_trait]
impl TransferEngine for MockEngine {
    fn reset(&mut self) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.no_bulk_reset {
            return false;
        }
        state.resets += 1;
        state.options = TransferOptions::new();
        true
    }

    fn set_option(&mut self, option: TransferOption) -> Result<(), EngineError> {
        let mut state = self.state.lock().unwrap();
        if state.reject == Some(option.name()) {
            return Err(EngineError::new(
                EngineErrorCode::BadFunctionArgument,
                "rejected by mock",
            ));
        }
        state.history.push(option.clone());
        state.options.apply(option)
    }

    async fn perform(&mut self) -> Result<Bytes, EngineError> {
        let mut state = self.state.lock().unwrap();
        let snapshot = state.options.clone();
        state.performed.push(snapshot.clone());
        let response = state.responses.pop_front().unwrap_or_else(|| Ok(Bytes::new()));
        if let (Ok(body), Some(sink)) = (&response, &snapshot.write_to) {
            std::fs::write(sink, body)
                .map_err(|e| EngineError::new(EngineErrorCode::WriteError, e.to_string()))?;
        }
        response
    }

    fn content_length(&self) -> Option<u64> {
        self.state.lock().unwrap().content_length
    }

    fn close(&mut self) -> Result<(), EngineError> {
        let mut state = self.state.lock().unwrap();
        state.closed += 1;
        if state.fail_close {
            return Err(EngineError::new(EngineErrorCode::SendError, "close failed"));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct ServerState {
    commands: Vec<String>,
    uploaded: Vec<u8>,
}

/// Minimal plain-text FTP server on loopback.
///
/// Accepts `alice`/`secret`, knows `big.bin` is 4096 bytes, and answers the
/// listed transfer commands with their payloads. Unknown `RETR`s get 550.
pub(crate) struct FakeFtpServer {
    addr: SocketAddr,
    state: Arc<tokio::sync::Mutex<ServerState>>,
}

enum DataPlan {
    Listen(TcpListener),
    Connect(SocketAddr),
}

impl FakeFtpServer {
    pub async fn start(transfers: Vec<(&'static str, &'static str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(tokio::sync::Mutex::new(ServerState::default()));
        let transfers: Arc<HashMap<&'static str, &'static str>> =
            Arc::new(transfers.into_iter().collect());

        let shared = state.clone();
        tokio::spawn(async move {
            while let Ok((conn, _)) = listener.accept().await {
                let state = shared.clone();
                let transfers = transfers.clone();
                tokio::spawn(async move {
                    serve(conn, state, transfers).await;
                });
            }
        });

        Self { addr, state }
    }

    pub fn url(&self, path: &str) -> String {
        format!("ftp://{}/{}", self.addr, path)
    }

    pub async fn commands(&self) -> Vec<String> {
        self.state.lock().await.commands.clone()
    }

    pub async fn uploaded(&self) -> Vec<u8> {
        self.state.lock().await.uploaded.clone()
    }
}

async fn open_data(plan: Option<DataPlan>) -> TcpStream {
    match plan.expect("no PASV/PORT before transfer") {
        DataPlan::Listen(listener) => listener.accept().await.unwrap().0,
        DataPlan::Connect(addr) => TcpStream::connect(addr).await.unwrap(),
    }
}

fn parse_port(arg: &str) -> SocketAddr {
    let n: Vec<u16> = arg.split(',').map(|p| p.parse().unwrap()).collect();
    let ip = std::net::Ipv4Addr::new(n[0] as u8, n[1] as u8, n[2] as u8, n[3] as u8);
    SocketAddr::new(ip.into(), n[4] * 256 + n[5])
}

async fn serve(
    conn: TcpStream,
    state: Arc<tokio::sync::Mutex<ServerState>>,
    transfers: Arc<HashMap<&'static str, &'static str>>,
) {
    let (read, mut write) = conn.into_split();
    let mut lines = BufReader::new(read).lines();
    let mut plan: Option<DataPlan> = None;
    write.write_all(b"220 fake ready\r\n").await.unwrap();

    while let Ok(Some(line)) = lines.next_line().await {
        state.lock().await.commands.push(line.clone());
        let (verb, arg) = line.split_once(' ').unwrap_or((line.as_str(), ""));

        let reply = match verb {
            "USER" => "331 Password required".to_string(),
            "PASS" if arg == "secret" => "230 Logged in".to_string(),
            "PASS" => "530 Login incorrect".to_string(),
            "CWD" | "DELE" => "250 OK".to_string(),
            "TYPE" | "PBSZ" | "PROT" => "200 OK".to_string(),
            "SIZE" if arg == "big.bin" => "213 4096".to_string(),
            "SIZE" => "550 No such file".to_string(),
            "PASV" => {
                let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
                let port = listener.local_addr().unwrap().port();
                plan = Some(DataPlan::Listen(listener));
                format!(
                    "227 Entering Passive Mode (127,0,0,1,{},{})",
                    port >> 8,
                    port & 0xff
                )
            }
            "PORT" => {
                plan = Some(DataPlan::Connect(parse_port(arg)));
                "200 PORT command successful".to_string()
            }
            "LIST" | "NLST" | "RETR" => match transfers.get(line.as_str()) {
                None if verb == "RETR" => "550 No such file".to_string(),
                payload => {
                    write.write_all(b"150 Opening data connection\r\n").await.unwrap();
                    let mut data = open_data(plan.take()).await;
                    data.write_all(payload.unwrap_or(&"").as_bytes())
                        .await
                        .unwrap();
                    data.shutdown().await.unwrap();
                    drop(data);
                    "226 Transfer complete".to_string()
                }
            },
            "STOR" => {
                write.write_all(b"150 Ok to send data\r\n").await.unwrap();
                let mut data = open_data(plan.take()).await;
                let mut received = Vec::new();
                data.read_to_end(&mut received).await.unwrap();
                state.lock().await.uploaded = received;
                "226 Transfer complete".to_string()
            }
            "QUIT" => {
                write.write_all(b"221 Bye\r\n").await.unwrap();
                break;
            }
            _ => "502 Command not implemented".to_string(),
        };
        write
            .write_all(format!("{reply}\r\n").as_bytes())
            .await
            .unwrap();
    }
}
