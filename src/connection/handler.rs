//! Session Handler Module
//!
//! This module runs the per-connection protocol state machine. Each
//! client gets its own session task that reads newline-delimited lines,
//! resolves them to commands, and writes responses back on the same
//! socket.
//!
//! ## Session States
//!
//! ```text
//!                      ┌──────────────────┐
//!        line is a     │ AwaitingCommand  │◄────────────┐
//!      ┌──────────────►│                  │             │
//!      │   command     └────────┬─────────┘             │
//!      │                        │                       │
//!      │                        │ set <key>             │ value line
//!      │                        ▼                       │ stored
//!      │               ┌──────────────────┐             │
//!      │               │ AwaitingSetValue │─────────────┘
//!      │               │      (key)       │
//!      │               └──────────────────┘
//!      │
//!      │  quit / bad set key / read failure
//!      └─────────────────────► Closed
//! ```
//!
//! The set exchange spans two lines: `set <key>` records the pending
//! key, and whatever line arrives next is consumed as the value, even
//! if its first token looks like a command. All cross-session state
//! lives in the shared store; the only per-connection state is the
//! pending key.
//!
//! ## Buffer Management
//!
//! Incoming data accumulates in a `BytesMut` buffer. TCP is a stream
//! protocol, so a single read may carry a partial line or several
//! complete ones; the framer consumes exactly one line at a time.

use crate::commands::{validate_key, Command, CommandError, CommandHandler, InvalidKey};
use crate::protocol::parser::{first_token, nth_token};
use crate::protocol::types;
use crate::protocol::{FrameError, LineParser, Reply};
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, info, trace, warn};

/// Initial capacity of the read buffer
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Statistics for connection handling, shared across all sessions.
///
/// These are server-level metrics, distinct from the protocol-visible
/// counters the `stats` command reports.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Errors that can occur while running a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The inbound stream could not be framed into lines
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Client disconnected normally
    #[error("client disconnected")]
    ClientDisconnected,

    /// Connection closed mid-line
    #[error("unexpected end of stream")]
    UnexpectedEof,
}

/// The protocol state of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SessionState {
    /// Next line's first token names a command.
    AwaitingCommand,
    /// A `set <key>` line was consumed; the next line is its value.
    AwaitingSetValue(String),
    /// Terminal: the session writes nothing further and releases the
    /// connection.
    Closed,
}

/// Runs the protocol state machine for a single client connection.
pub struct Session {
    /// The TCP stream for this connection
    stream: BufWriter<TcpStream>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Buffer for incoming data
    buffer: BytesMut,

    /// Line framer
    parser: LineParser,

    /// Executes commands against the shared store
    handler: CommandHandler,

    /// Protocol state, including the pending set key
    state: SessionState,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,
}

impl Session {
    /// Creates a session for an accepted connection.
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        handler: CommandHandler,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            parser: LineParser::new(),
            handler,
            state: SessionState::AwaitingCommand,
            stats,
        }
    }

    /// Runs the session until the client disconnects, `quit` is
    /// received, or an error terminates it.
    pub async fn run(mut self) -> Result<(), SessionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected gracefully"),
            Err(e) => match e {
                SessionError::ClientDisconnected => {
                    debug!(client = %self.addr, "Client disconnected")
                }
                SessionError::Io(io_err)
                    if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
                {
                    debug!(client = %self.addr, "Connection reset by client")
                }
                _ => warn!(client = %self.addr, error = %e, "Session error"),
            },
        }

        self.stats.connection_closed();
        result
    }

    /// The main read-dispatch-respond loop.
    async fn main_loop(&mut self) -> Result<(), SessionError> {
        loop {
            while let Some(line) = self.try_next_line()? {
                self.process_line(&line).await?;

                if self.state == SessionState::Closed {
                    return Ok(());
                }
            }

            // Need more data - read from the socket
            self.read_more_data().await?;
        }
    }

    /// Attempts to frame one line from the buffer.
    fn try_next_line(&mut self) -> Result<Option<String>, SessionError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        match self.parser.parse(&self.buffer)? {
            Some((line, consumed)) => {
                let _ = self.buffer.split_to(consumed);
                trace!(
                    client = %self.addr,
                    consumed = consumed,
                    remaining = self.buffer.len(),
                    "Framed line"
                );
                Ok(Some(line))
            }
            None => {
                trace!(
                    client = %self.addr,
                    buffered = self.buffer.len(),
                    "Incomplete line, need more data"
                );
                Ok(None)
            }
        }
    }

    /// Reads more data from the socket into the buffer.
    async fn read_more_data(&mut self) -> Result<(), SessionError> {
        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(4096);
        }

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;

        if n == 0 {
            // Connection closed by client. The framer consumes through
            // the `\n` and leaves the terminator's trailing `\r` to be
            // prefix-stripped off the next line, so a buffer holding
            // nothing but stray CRs is a clean close, not a truncated
            // line.
            if self.buffer.iter().all(|&b| b == b'\r') {
                return Err(SessionError::ClientDisconnected);
            }
            // Partial line in buffer
            return Err(SessionError::UnexpectedEof);
        }

        trace!(client = %self.addr, bytes = n, "Read data");

        Ok(())
    }

    /// Runs one line through the state machine.
    async fn process_line(&mut self, line: &str) -> Result<(), SessionError> {
        match std::mem::replace(&mut self.state, SessionState::AwaitingCommand) {
            SessionState::AwaitingSetValue(key) => self.process_value_line(key, line).await,
            SessionState::AwaitingCommand => self.process_command_line(line).await,
            SessionState::Closed => {
                self.state = SessionState::Closed;
                Ok(())
            }
        }
    }

    /// Consumes a line as the value of the pending set exchange.
    ///
    /// The value is the line's first whitespace token; the synthetic
    /// `"<value> <key>"` record goes through the `default` command.
    async fn process_value_line(&mut self, key: String, line: &str) -> Result<(), SessionError> {
        let synthetic = match first_token(line) {
            Some(value) => format!("{value} {key}"),
            None => String::new(),
        };

        match self.handler.execute(Command::Default, &synthetic) {
            Ok(reply) => {
                self.stats.command_processed();
                self.write_reply(&reply).await?;
            }
            Err(CommandError::CacheFull { limit }) => {
                warn!(client = %self.addr, key = %key, limit, "Insert refused, cache full");
                self.write_raw(types::ERR_CACHE_FULL).await?;
            }
            Err(e) => {
                // Malformed continuation: the pending key stays armed
                // until a usable value line arrives.
                warn!(client = %self.addr, error = %e, "Malformed set continuation");
                self.state = SessionState::AwaitingSetValue(key);
            }
        }

        Ok(())
    }

    /// Resolves a line's first token to a command and dispatches it.
    async fn process_command_line(&mut self, line: &str) -> Result<(), SessionError> {
        let Some(token) = first_token(line) else {
            trace!(client = %self.addr, "Ignoring empty line");
            return Ok(());
        };

        match Command::parse(token) {
            Some(Command::Quit) => {
                // The handler produces the goodbye and cannot fail;
                // closing the socket is the session's job.
                let reply = self
                    .handler
                    .execute(Command::Quit, line)
                    .unwrap_or(Reply::Goodbye);
                self.stats.command_processed();
                self.write_reply(&reply).await?;
                self.state = SessionState::Closed;
            }
            Some(Command::Set) => {
                self.begin_set(line).await?;
            }
            Some(command) => match self.handler.execute(command, line) {
                Ok(reply) => {
                    self.stats.command_processed();
                    self.write_reply(&reply).await?;
                }
                Err(e) => {
                    warn!(client = %self.addr, error = %e, "Command failed");
                }
            },
            None => {
                // Not a command and no set pending: dispatched through
                // `default` with an empty pending key, which rejects it.
                // Nothing is written back.
                if let Err(e) = self.handler.execute(Command::Default, token) {
                    warn!(client = %self.addr, error = %e, "Unknown command");
                }
            }
        }

        Ok(())
    }

    /// Handles a `set <key>` line: validates the key and arms the
    /// pending-value state. A bad key writes an error line and closes
    /// the session; a malformed `set` aborts the whole connection, not
    /// just the command.
    async fn begin_set(&mut self, line: &str) -> Result<(), SessionError> {
        let key = match nth_token(line, 1) {
            Some(key) => key,
            None => {
                warn!(client = %self.addr, "Set line has no key");
                self.write_raw(types::ERR_MISSING_KEY).await?;
                self.state = SessionState::Closed;
                return Ok(());
            }
        };

        if let Err(reason) = validate_key(key) {
            warn!(client = %self.addr, key = %key, error = %reason, "Rejected set key");
            let msg = match reason {
                InvalidKey::NonAscii => types::ERR_NON_ASCII,
                InvalidKey::TooLong => types::ERR_KEY_TOO_LONG,
                InvalidKey::Missing => types::ERR_MISSING_KEY,
            };
            self.write_raw(msg).await?;
            self.state = SessionState::Closed;
            return Ok(());
        }

        // Phase one records the counter only; no response is written
        // until the value line completes the exchange.
        if let Err(e) = self.handler.execute(Command::Set, line) {
            warn!(client = %self.addr, error = %e, "Set command failed");
        }
        self.stats.command_processed();
        self.state = SessionState::AwaitingSetValue(key.to_string());

        Ok(())
    }

    /// Serializes a reply and performs the command's single write.
    async fn write_reply(&mut self, reply: &Reply) -> Result<(), SessionError> {
        if reply.is_none() {
            return Ok(());
        }
        self.write_raw(&reply.serialize()).await
    }

    /// Writes raw bytes to the client.
    async fn write_raw(&mut self, bytes: &[u8]) -> Result<(), SessionError> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        trace!(client = %self.addr, bytes = bytes.len(), "Sent response");
        Ok(())
    }
}

/// Handles a client connection to completion.
///
/// This is a convenience function that creates a [`Session`] and runs
/// it, logging any terminal error.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    handler: CommandHandler,
    stats: Arc<ConnectionStats>,
) {
    let session = Session::new(stream, addr, handler, stats);
    if let Err(e) = session.run().await {
        match e {
            SessionError::ClientDisconnected => {}
            SessionError::Io(ref io_err)
                if io_err.kind() == std::io::ErrorKind::ConnectionReset => {}
            _ => {
                debug!(client = %addr, error = %e, "Session ended with error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Store;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn create_test_server(capacity: usize) -> (SocketAddr, Arc<Store>, Arc<ConnectionStats>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let store = Arc::new(Store::with_capacity(capacity));
        let stats = Arc::new(ConnectionStats::new());

        let store_clone = Arc::clone(&store);
        let stats_clone = Arc::clone(&stats);

        tokio::spawn(async move {
            while let Ok((stream, client_addr)) = listener.accept().await {
                let handler = CommandHandler::new(Arc::clone(&store_clone));
                let stats = Arc::clone(&stats_clone);
                tokio::spawn(handle_connection(stream, client_addr, handler, stats));
            }
        });

        (addr, store, stats)
    }

    /// Accepts one connection and runs its session to completion,
    /// exposing the session's result to the test.
    async fn run_single_session(
        capacity: usize,
    ) -> (
        SocketAddr,
        tokio::task::JoinHandle<Result<(), SessionError>>,
    ) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let store = Arc::new(Store::with_capacity(capacity));
        let stats = Arc::new(ConnectionStats::new());

        let server = tokio::spawn(async move {
            let (stream, client_addr) = listener.accept().await.unwrap();
            let handler = CommandHandler::new(store);
            Session::new(stream, client_addr, handler, stats).run().await
        });

        (addr, server)
    }

    /// Reads until the accumulated response ends with `suffix` or the
    /// peer goes quiet, with a safety deadline.
    async fn read_until(client: &mut TcpStream, suffix: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        let mut buf = [0u8; 1024];
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);

        while !data.ends_with(suffix) && tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(Duration::from_millis(500), client.read(&mut buf)).await {
                Ok(Ok(n)) if n > 0 => data.extend_from_slice(&buf[..n]),
                _ => break,
            }
        }

        data
    }

    #[tokio::test]
    async fn test_set_get_round_trip() {
        let (addr, _, _) = create_test_server(1024).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"set name\n\rAriz\n\r").await.unwrap();
        let response = read_until(&mut client, b"STORED \n\r").await;
        assert_eq!(response, b"STORED \n\r");

        client.write_all(b"get name\n\r").await.unwrap();
        let response = read_until(&mut client, b"END\n\r").await;
        assert_eq!(response, b"VALUE name\n\rAriz\n\rEND\n\r");
    }

    #[tokio::test]
    async fn test_get_miss_is_bare_end() {
        let (addr, _, _) = create_test_server(1024).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"get nothing\n\r").await.unwrap();
        let response = read_until(&mut client, b"END\n\r").await;
        assert_eq!(response, b"END\n\r");
    }

    #[tokio::test]
    async fn test_overwrite_returns_latest() {
        let (addr, store, _) = create_test_server(1024).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"set k\n\rv1\n\r").await.unwrap();
        let _ = read_until(&mut client, b"STORED \n\r").await;
        client.write_all(b"set k\n\rv2\n\r").await.unwrap();
        let _ = read_until(&mut client, b"STORED \n\r").await;

        assert_eq!(store.lookup(&["k"])[0].1.as_deref(), Some("v2"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_value_line_may_look_like_a_command() {
        let (addr, store, _) = create_test_server(1024).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        // "delete" here is a value, not a command.
        client.write_all(b"set k\n\rdelete\n\r").await.unwrap();
        let response = read_until(&mut client, b"STORED \n\r").await;
        assert_eq!(response, b"STORED \n\r");

        assert_eq!(store.lookup(&["k"])[0].1.as_deref(), Some("delete"));
    }

    #[tokio::test]
    async fn test_delete_hit_and_miss() {
        let (addr, store, _) = create_test_server(1024).await;
        store.insert("k", "v").unwrap();

        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"delete k\n\r").await.unwrap();
        let response = read_until(&mut client, b"DELETED \n\r").await;
        assert_eq!(response, b"DELETED \n\r");

        client.write_all(b"delete k\n\r").await.unwrap();
        let response = read_until(&mut client, b"NOT_FOUND \n\r").await;
        assert_eq!(response, b"NOT_FOUND \n\r");

        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_stats_response() {
        let (addr, _, _) = create_test_server(1024).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"get a\n\rstats\n\r").await.unwrap();
        let response = read_until(&mut client, b"END \n\r").await;
        let text = String::from_utf8_lossy(&response);

        // One miss invocation: hits count the call, misses the key.
        assert!(text.contains("cmd_get 2\n\r"));
        assert!(text.contains("get_hits 1\n\r"));
        assert!(text.contains("get_misses 1\n\r"));
        assert!(text.contains("limit_items 1024\n\r"));
        assert!(text.ends_with("END \n\r"));
    }

    #[tokio::test]
    async fn test_quit_closes_connection() {
        let (addr, _, _) = create_test_server(1024).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"quit\n\r").await.unwrap();
        let response = read_until(&mut client, b"Closing Connection!").await;
        assert_eq!(response, b"Closing Connection!");

        // Server side is gone: the next read sees EOF.
        let mut buf = [0u8; 16];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn test_oversized_set_key_closes_session() {
        let (addr, store, _) = create_test_server(1024).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        let request = format!("set {}\n\r", "k".repeat(251));
        client.write_all(request.as_bytes()).await.unwrap();

        let response = read_until(&mut client, b"\r\n").await;
        assert!(response.starts_with(b"ERROR exceeded"));

        let mut buf = [0u8; 16];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(n, 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_non_ascii_set_key_closes_session() {
        let (addr, store, _) = create_test_server(1024).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all("set café\n\r".as_bytes()).await.unwrap();

        let response = read_until(&mut client, b"\r\n").await;
        assert!(response.starts_with(b"ERROR non-ASCII"));

        let mut buf = [0u8; 16];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(n, 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_command_writes_nothing() {
        let (addr, store, _) = create_test_server(1024).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        // The bogus line produces no response; the session stays usable.
        client.write_all(b"flushdb now\n\rget a\n\r").await.unwrap();
        let response = read_until(&mut client, b"END\n\r").await;
        assert_eq!(response, b"END\n\r");
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_cache_full_surfaced_to_client() {
        let (addr, store, _) = create_test_server(1).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"set a\n\r1\n\r").await.unwrap();
        let response = read_until(&mut client, b"STORED \n\r").await;
        assert_eq!(response, b"STORED \n\r");

        client.write_all(b"set b\n\r2\n\r").await.unwrap();
        let response = read_until(&mut client, b"\n\r").await;
        assert!(response.starts_with(b"SERVER_ERROR"));

        // Session survives a refused insert.
        client.write_all(b"get a\n\r").await.unwrap();
        let response = read_until(&mut client, b"END\n\r").await;
        assert_eq!(response, b"VALUE a\n\r1\n\rEND\n\r");

        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_clean_close_after_command_is_graceful() {
        let (addr, server) = run_single_session(1024).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        // A full `\n\r`-terminated exchange leaves the terminator's
        // `\r` buffered; closing afterwards is still a normal
        // disconnect, not a truncated stream.
        client.write_all(b"get a\n\r").await.unwrap();
        let response = read_until(&mut client, b"END\n\r").await;
        assert_eq!(response, b"END\n\r");
        drop(client);

        let result = server.await.unwrap();
        assert!(matches!(result, Err(SessionError::ClientDisconnected)));
    }

    #[tokio::test]
    async fn test_mid_line_close_is_truncated_stream() {
        let (addr, server) = run_single_session(1024).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        // No terminator before the close: the buffered partial line is
        // a real truncation.
        client.write_all(b"get a").await.unwrap();
        drop(client);

        let result = server.await.unwrap();
        assert!(matches!(result, Err(SessionError::UnexpectedEof)));
    }

    #[tokio::test]
    async fn test_concurrent_sessions_no_lost_updates() {
        let (addr, store, _) = create_test_server(1024).await;

        let mut handles = Vec::new();
        for t in 0..8 {
            handles.push(tokio::spawn(async move {
                let mut client = TcpStream::connect(addr).await.unwrap();
                let request = format!("set key:{t}\n\rvalue:{t}\n\r");
                client.write_all(request.as_bytes()).await.unwrap();

                let response = read_until(&mut client, b"STORED \n\r").await;
                assert_eq!(response, b"STORED \n\r");
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.len(), 8);
        assert_eq!(store.stats().curr_items, 8);
        for t in 0..8 {
            let key = format!("key:{t}");
            assert_eq!(
                store.lookup(&[key.as_str()])[0].1,
                Some(format!("value:{t}"))
            );
        }
    }

    #[tokio::test]
    async fn test_connection_stats() {
        let (addr, _, stats) = create_test_server(1024).await;

        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);

        let mut client = TcpStream::connect(addr).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 1);

        client.write_all(b"stats\n\r").await.unwrap();
        let _ = read_until(&mut client, b"END \n\r").await;
        assert!(stats.commands_processed.load(Ordering::Relaxed) >= 1);

        drop(client);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
    }
}
