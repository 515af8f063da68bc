//! The Unix-socket command server.
//!
//! Framing is newline-delimited JSON: each connection is a sequence of
//! request/response pairs until EOF. Reads are bounded so a runaway client
//! cannot balloon memory; responses are written whole, newline-terminated,
//! by the one task that owns the connection, which also keeps responses in
//! request order.

use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::daemon::ShutdownSignal;
use crate::dispatch::{dispatch, CommandContext, DispatchOutcome};

pub mod protocol;

use protocol::{CmdError, Request, Response};

/// How long a probe of an existing socket may take before the file is
/// declared stale.
const STALE_PROBE_TIMEOUT: Duration = Duration::from_millis(500);
/// Grace period for in-flight handlers at shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);
/// Poll interval while watching a connection for client disconnect during an
/// in-flight command.
const DISCONNECT_POLL: Duration = Duration::from_millis(250);

#[derive(Debug, Error)]
pub enum IpcError {
    /// A live daemon already answers on the socket.
    #[error("already running")]
    AlreadyRunning,
    #[error("{0}")]
    Io(#[from] io::Error),
}

enum FrameError {
    TooLarge,
    Io(io::Error),
}

pub struct IpcServer {
    listener: UnixListener,
    socket_path: PathBuf,
    max_frame: usize,
}

impl IpcServer {
    /// Binds the daemon socket, probing and clearing a stale file first.
    pub async fn bind(paths: &crate::config::RuntimePaths, max_frame: usize) -> Result<Self, IpcError> {
        std::fs::create_dir_all(&paths.dir)?;
        std::fs::set_permissions(&paths.dir, std::fs::Permissions::from_mode(0o700))?;

        if paths.socket.exists() {
            match tokio::time::timeout(STALE_PROBE_TIMEOUT, UnixStream::connect(&paths.socket))
                .await
            {
                Ok(Ok(_)) => return Err(IpcError::AlreadyRunning),
                _ => {
                    debug!(socket = %paths.socket.display(), "removing stale socket");
                    std::fs::remove_file(&paths.socket)?;
                }
            }
        }

        let listener = UnixListener::bind(&paths.socket)?;
        std::fs::set_permissions(&paths.socket, std::fs::Permissions::from_mode(0o600))?;
        info!(socket = %paths.socket.display(), "listening");

        Ok(Self {
            listener,
            socket_path: paths.socket.clone(),
            max_frame,
        })
    }

    pub fn socket_path(&self) -> &PathBuf {
        &self.socket_path
    }

    /// Accepts connections until shutdown, then drains in-flight handlers
    /// and removes the socket file.
    pub async fn serve(self, ctx: CommandContext, shutdown: ShutdownSignal) {
        let mut handlers = JoinSet::new();
        let mut shutdown_rx = shutdown.subscribe();

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        let ctx = ctx.clone();
                        let shutdown = shutdown.clone();
                        let max_frame = self.max_frame;
                        handlers.spawn(async move {
                            handle_connection(stream, ctx, shutdown, max_frame).await;
                        });
                    }
                    Err(err) => warn!("accept failed: {err}"),
                },
                _ = shutdown_rx.changed() => break,
            }
        }

        drop(self.listener);
        let drain = async {
            while handlers.join_next().await.is_some() {}
        };
        if tokio::time::timeout(DRAIN_TIMEOUT, drain).await.is_err() {
            warn!("connection handlers did not drain in time, aborting");
            handlers.abort_all();
            while handlers.join_next().await.is_some() {}
        }

        if let Err(err) = std::fs::remove_file(&self.socket_path) {
            if err.kind() != io::ErrorKind::NotFound {
                warn!("failed to remove socket file: {err}");
            }
        }
        info!("ipc server stopped");
    }
}

async fn handle_connection(
    stream: UnixStream,
    ctx: CommandContext,
    shutdown: ShutdownSignal,
    max_frame: usize,
) {
    let (read_half, mut writer) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut shutdown_rx = shutdown.subscribe();

    loop {
        if *shutdown_rx.borrow() {
            break;
        }
        let frame = tokio::select! {
            frame = read_frame(&mut reader, max_frame) => frame,
            _ = shutdown_rx.changed() => break,
        };

        let outcome = match frame {
            Ok(None) => break,
            Ok(Some(line)) => match serde_json::from_str::<Request>(&line) {
                Ok(req) => {
                    debug!(cmd = %req.cmd, "request");
                    // own task so a handler panic becomes an internal error
                    // instead of tearing the connection down
                    let handler_ctx = ctx.clone();
                    let mut handler =
                        tokio::spawn(async move { dispatch(&handler_ctx, req).await });
                    // client disconnect cancels the in-flight handler
                    tokio::select! {
                        joined = &mut handler => match joined {
                            Ok(outcome) => outcome,
                            Err(err) => {
                                warn!("command handler failed: {err}");
                                DispatchOutcome {
                                    response: Response::failure(CmdError::internal(
                                        "command handler panicked",
                                    )),
                                    shutdown: false,
                                }
                            }
                        },
                        _ = peer_gone(&mut reader) => {
                            handler.abort();
                            break;
                        }
                    }
                }
                Err(err) => DispatchOutcome {
                    response: Response::failure(CmdError::bad_request(format!(
                        "invalid request: {err}"
                    ))),
                    shutdown: false,
                },
            },
            Err(FrameError::TooLarge) => {
                let resp = Response::failure(CmdError::bad_request("request frame too large"));
                let _ = write_response(&mut writer, &resp).await;
                break;
            }
            Err(FrameError::Io(_)) => break,
        };

        if write_response(&mut writer, &outcome.response).await.is_err() {
            break;
        }
        if outcome.shutdown {
            info!("shutdown requested over ipc");
            shutdown.trigger();
        }
    }
}

async fn write_response(
    writer: &mut (impl AsyncWriteExt + Unpin),
    resp: &Response,
) -> io::Result<()> {
    let mut buf = serde_json::to_vec(resp)?;
    buf.push(b'\n');
    writer.write_all(&buf).await?;
    writer.flush().await
}

/// Reads one newline-terminated frame without buffering more than `max`
/// bytes of it. `Ok(None)` is a clean EOF between frames.
async fn read_frame<R>(reader: &mut R, max: usize) -> Result<Option<String>, FrameError>
where
    R: AsyncBufReadExt + Unpin,
{
    let mut buf: Vec<u8> = Vec::new();
    loop {
        let available = reader.fill_buf().await.map_err(FrameError::Io)?;
        if available.is_empty() {
            if buf.is_empty() {
                return Ok(None);
            }
            // final frame without trailing newline
            return Ok(Some(String::from_utf8_lossy(&buf).into_owned()));
        }

        match available.iter().position(|&b| b == b'\n') {
            Some(pos) => {
                if buf.len() + pos > max {
                    reader.consume(pos + 1);
                    return Err(FrameError::TooLarge);
                }
                buf.extend_from_slice(&available[..pos]);
                reader.consume(pos + 1);
                return Ok(Some(String::from_utf8_lossy(&buf).into_owned()));
            }
            None => {
                let len = available.len();
                if buf.len() + len > max {
                    reader.consume(len);
                    return Err(FrameError::TooLarge);
                }
                buf.extend_from_slice(available);
                reader.consume(len);
            }
        }
    }
}

/// Resolves when the peer has gone away. Data sitting in the buffer means
/// the client is alive (and pipelining), so this only polls for EOF.
async fn peer_gone<R>(reader: &mut R)
where
    R: AsyncBufReadExt + Unpin,
{
    loop {
        match reader.fill_buf().await {
            Ok([]) => return,
            Ok(_) => tokio::time::sleep(DISCONNECT_POLL).await,
            Err(_) => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimePaths;
    use crate::dispatch::tests::disconnected_ctx;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    async fn read_line(reader: &mut (impl AsyncBufReadExt + Unpin)) -> String {
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        line
    }

    #[tokio::test]
    async fn frame_at_cap_passes_one_over_fails() {
        let (mut client, server) = tokio::io::duplex(256);
        let mut reader = BufReader::new(server);

        let frame = "x".repeat(16);
        client.write_all(frame.as_bytes()).await.unwrap();
        client.write_all(b"\n").await.unwrap();
        let got = read_frame(&mut reader, 16).await;
        assert!(matches!(got, Ok(Some(ref s)) if s.len() == 16));

        let frame = "x".repeat(17);
        client.write_all(frame.as_bytes()).await.unwrap();
        client.write_all(b"\n").await.unwrap();
        assert!(matches!(
            read_frame(&mut reader, 16).await,
            Err(FrameError::TooLarge)
        ));
    }

    #[tokio::test]
    async fn eof_between_frames_is_clean() {
        let (client, server) = tokio::io::duplex(64);
        let mut reader = BufReader::new(server);
        drop(client);
        assert!(matches!(read_frame(&mut reader, 16).await, Ok(None)));
    }

    #[tokio::test]
    async fn serves_requests_in_order_and_recovers_from_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let paths = RuntimePaths::in_dir(dir.path().to_path_buf());
        let server = IpcServer::bind(&paths, 1024).await.unwrap();
        let ctx = disconnected_ctx();
        let (shutdown, _rx) = ShutdownSignal::new();
        let serve = tokio::spawn(server.serve(ctx, shutdown.clone()));

        let stream = UnixStream::connect(&paths.socket).await.unwrap();
        let (read, mut write) = stream.into_split();
        let mut reader = BufReader::new(read);

        // two pipelined requests answer in order
        write
            .write_all(b"{\"cmd\":\"status\"}\n{\"cmd\":\"console\"}\n")
            .await
            .unwrap();
        let first: Response = serde_json::from_str(&read_line(&mut reader).await).unwrap();
        assert!(first.ok);
        assert_eq!(first.data.as_ref().unwrap()["running"], true);
        let second: Response = serde_json::from_str(&read_line(&mut reader).await).unwrap();
        assert!(second.ok);
        assert!(second.data.as_ref().unwrap()["entries"].is_array());

        // malformed json fails that frame but keeps the connection
        write.write_all(b"this is not json\n").await.unwrap();
        let bad: Response = serde_json::from_str(&read_line(&mut reader).await).unwrap();
        assert!(!bad.ok);
        assert!(bad.error.unwrap().starts_with("invalid request"));

        write.write_all(b"{\"cmd\":\"status\"}\n").await.unwrap();
        let again: Response = serde_json::from_str(&read_line(&mut reader).await).unwrap();
        assert!(again.ok);

        shutdown.trigger();
        serve.await.unwrap();
        assert!(!paths.socket.exists());
    }

    #[tokio::test]
    async fn oversize_frame_errors_and_closes() {
        let dir = tempfile::tempdir().unwrap();
        let paths = RuntimePaths::in_dir(dir.path().to_path_buf());
        let server = IpcServer::bind(&paths, 64).await.unwrap();
        let ctx = disconnected_ctx();
        let (shutdown, _rx) = ShutdownSignal::new();
        let serve = tokio::spawn(server.serve(ctx, shutdown.clone()));

        let stream = UnixStream::connect(&paths.socket).await.unwrap();
        let (read, mut write) = stream.into_split();
        let mut reader = BufReader::new(read);

        let big = format!("{{\"cmd\":\"{}\"}}\n", "x".repeat(128));
        write.write_all(big.as_bytes()).await.unwrap();
        let resp: Response = serde_json::from_str(&read_line(&mut reader).await).unwrap();
        assert!(!resp.ok);
        assert_eq!(resp.error.as_deref(), Some("request frame too large"));

        // the server closed this connection
        let mut rest = String::new();
        reader.read_line(&mut rest).await.unwrap();
        assert!(rest.is_empty());

        shutdown.trigger();
        serve.await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_command_stops_the_server() {
        let dir = tempfile::tempdir().unwrap();
        let paths = RuntimePaths::in_dir(dir.path().to_path_buf());
        let server = IpcServer::bind(&paths, 1024).await.unwrap();
        let ctx = disconnected_ctx();
        let (shutdown, _rx) = ShutdownSignal::new();
        let serve = tokio::spawn(server.serve(ctx, shutdown.clone()));

        let stream = UnixStream::connect(&paths.socket).await.unwrap();
        let (read, mut write) = stream.into_split();
        let mut reader = BufReader::new(read);

        write.write_all(b"{\"cmd\":\"shutdown\"}\n").await.unwrap();
        let resp: Response = serde_json::from_str(&read_line(&mut reader).await).unwrap();
        assert!(resp.ok);

        serve.await.unwrap();
        assert!(!paths.socket.exists());
        assert!(UnixStream::connect(&paths.socket).await.is_err());
    }

    #[tokio::test]
    async fn second_bind_detects_live_instance() {
        let dir = tempfile::tempdir().unwrap();
        let paths = RuntimePaths::in_dir(dir.path().to_path_buf());
        let server = IpcServer::bind(&paths, 1024).await.unwrap();

        let second = IpcServer::bind(&paths, 1024).await;
        assert!(matches!(second, Err(IpcError::AlreadyRunning)));
        drop(server);
    }

    #[tokio::test]
    async fn stale_socket_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let paths = RuntimePaths::in_dir(dir.path().to_path_buf());
        std::fs::create_dir_all(&paths.dir).unwrap();
        // a socket file nobody listens on
        drop(std::os::unix::net::UnixListener::bind(&paths.socket).unwrap());

        let server = IpcServer::bind(&paths, 1024).await;
        assert!(server.is_ok());
    }
}
