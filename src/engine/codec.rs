//! Control channel command/reply codec (RFC 959 §4.2).

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, trace};

use crate::error::{EngineError, EngineErrorCode};

/// Any byte stream a control or data connection can run over
pub(crate) trait Stream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Stream for T {}

pub(crate) type BoxStream = Box<dyn Stream>;

/// A complete, possibly multi-line, server reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Reply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl Reply {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Text of the final line after the code
    pub fn message(&self) -> &str {
        self.lines
            .last()
            .map(|line| line.get(4..).unwrap_or(""))
            .unwrap_or("")
    }

    pub fn is_preliminary(&self) -> bool {
        self.code / 100 == 1
    }

    pub fn is_completion(&self) -> bool {
        self.code / 100 == 2
    }

    pub fn is_intermediate(&self) -> bool {
        self.code / 100 == 3
    }
}

pub(crate) struct ControlChannel<S> {
    stream: BufReader<S>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> ControlChannel<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufReader::new(stream),
        }
    }

    pub async fn send(&mut self, command: &str) -> Result<(), EngineError> {
        if command.contains(['\r', '\n']) {
            return Err(EngineError::new(
                EngineErrorCode::BadFunctionArgument,
                "command contains a line break",
            ));
        }
        if command.starts_with("PASS ") {
            debug!(">>> PASS ***");
        } else {
            debug!(">>> {}", command);
        }
        let line = format!("{command}\r\n");
        self.stream
            .write_all(line.as_bytes())
            .await
            .map_err(|e| EngineError::new(EngineErrorCode::SendError, e.to_string()))?;
        self.stream
            .flush()
            .await
            .map_err(|e| EngineError::new(EngineErrorCode::SendError, e.to_string()))
    }

    async fn read_line(&mut self) -> Result<String, EngineError> {
        let mut line = String::new();
        let n = self
            .stream
            .read_line(&mut line)
            .await
            .map_err(|e| EngineError::new(EngineErrorCode::RecvError, e.to_string()))?;
        if n == 0 {
            return Err(EngineError::new(
                EngineErrorCode::RecvError,
                "server closed the control connection",
            ));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Reads one reply. `NNN-` opens a multi-line reply that runs until a
    /// line starting with `NNN `.
    pub async fn read_reply(&mut self) -> Result<Reply, EngineError> {
        let first = self.read_line().await?;
        let code = parse_code(&first)?;
        let mut lines = vec![first];

        if lines[0].as_bytes().get(3) == Some(&b'-') {
            let terminator = format!("{code} ");
            loop {
                let next = self.read_line().await?;
                let done = next.starts_with(&terminator) || next == code.to_string();
                lines.push(next);
                if done {
                    break;
                }
            }
        }

        let reply = Reply { code, lines };
        trace!("<<< {}", reply.text());
        Ok(reply)
    }

    pub async fn command(&mut self, command: &str) -> Result<Reply, EngineError> {
        self.send(command).await?;
        self.read_reply().await
    }

    /// Sends `command` and requires a 2xx reply
    pub async fn expect_completion(
        &mut self,
        command: &str,
        code: EngineErrorCode,
    ) -> Result<Reply, EngineError> {
        let reply = self.command(command).await?;
        if !reply.is_completion() {
            return Err(EngineError::new(code, reply.text()));
        }
        Ok(reply)
    }
}

fn parse_code(line: &str) -> Result<u16, EngineError> {
    line.get(..3)
        .filter(|code| code.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| {
            EngineError::new(
                EngineErrorCode::WeirdServerReply,
                format!("invalid reply: {line:?}"),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, duplex};

    #[tokio::test]
    async fn reads_single_and_multi_line_replies() {
        let (client, mut server) = duplex(1024);
        let mut control = ControlChannel::new(client);

        server
            .write_all(b"220-Welcome\r\n220-second line\r\n220 ready\r\n331 Password required\r\n")
            .await
            .unwrap();

        let banner = control.read_reply().await.unwrap();
        assert_eq!(banner.code, 220);
        assert_eq!(banner.lines.len(), 3);
        assert_eq!(banner.message(), "ready");
        assert!(banner.is_completion());

        let reply = control.read_reply().await.unwrap();
        assert_eq!(reply.code, 331);
        assert!(reply.is_intermediate());
    }

    #[tokio::test]
    async fn command_writes_crlf_terminated_line() {
        let (client, mut server) = duplex(1024);
        let mut control = ControlChannel::new(client);

        server.write_all(b"200 Type set to I\r\n").await.unwrap();
        let reply = control
            .expect_completion("TYPE I", EngineErrorCode::WeirdServerReply)
            .await
            .unwrap();
        assert_eq!(reply.code, 200);

        let mut sent = [0u8; 8];
        server.read_exact(&mut sent).await.unwrap();
        assert_eq!(&sent, b"TYPE I\r\n");
    }

    #[tokio::test]
    async fn refuses_commands_with_line_breaks() {
        let (client, mut server) = duplex(1024);
        let mut control = ControlChannel::new(client);

        let err = control.send("DELE a.txt\r\nRMD /").await.unwrap_err();
        assert_eq!(err.code, EngineErrorCode::BadFunctionArgument);

        control.send("NOOP").await.unwrap();
        let mut sent = [0u8; 6];
        server.read_exact(&mut sent).await.unwrap();
        assert_eq!(&sent, b"NOOP\r\n");
    }

    #[tokio::test]
    async fn rejects_garbage_and_closed_connections() {
        let (client, mut server) = duplex(1024);
        let mut control = ControlChannel::new(client);

        server.write_all(b"hello\r\n").await.unwrap();
        let err = control.read_reply().await.unwrap_err();
        assert_eq!(err.code, EngineErrorCode::WeirdServerReply);

        drop(server);
        let err = control.read_reply().await.unwrap_err();
        assert_eq!(err.code, EngineErrorCode::RecvError);
    }

    #[tokio::test]
    async fn expect_completion_maps_failure_code() {
        let (client, mut server) = duplex(1024);
        let mut control = ControlChannel::new(client);

        server.write_all(b"550 No such file\r\n").await.unwrap();
        let err = control
            .expect_completion("DELE x.txt", EngineErrorCode::QuoteError)
            .await
            .unwrap_err();
        assert_eq!(err.code, EngineErrorCode::QuoteError);
        assert!(err.message.contains("550"));
    }
}
