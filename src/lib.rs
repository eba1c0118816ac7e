//! # memline - A Small In-Memory Cache Server
//!
//! memline is a volatile key-value cache reachable over a line-oriented
//! TCP protocol, a small memcached-style text dialect. It is a single
//! process, single shard, no persistence: entries live until they are
//! deleted or the process exits.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                           memline                              │
//! │                                                                │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐         │
//! │  │ TCP Server  │───>│   Session   │───>│  Command    │         │
//! │  │ (Listener)  │    │ (per conn)  │    │  Handler    │         │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘         │
//! │                                               │                │
//! │                                               ▼                │
//! │  ┌─────────────┐    ┌──────────────────────────────────┐       │
//! │  │    Line     │    │              Store               │       │
//! │  │   Framer    │    │  ┌─────────────┬──────────────┐  │       │
//! │  │             │    │  │   Mutex     │              │  │       │
//! │  └─────────────┘    │  │ key → value │ stats counts │  │       │
//! │                     │  └─────────────┴──────────────┘  │       │
//! │                     └──────────────────────────────────┘       │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## The Protocol
//!
//! Requests are newline-delimited lines; responses end with the wire's
//! reversed-CRLF terminator `\n\r`.
//!
//! | Command  | Request                        | Response                                |
//! |----------|--------------------------------|-----------------------------------------|
//! | `get`    | `get <key> [<key>...]`         | `VALUE <key>\n\r<value>\n\r`... `END\n\r` |
//! | `set`    | `set <key>` then a value line  | `STORED \n\r`                           |
//! | `delete` | `delete <key>`                 | `DELETED \n\r` or `NOT_FOUND \n\r`      |
//! | `stats`  | `stats`                        | `<name> <count>\n\r`... `END \n\r`      |
//! | `quit`   | `quit`                         | `Closing Connection!`, then close       |
//!
//! A `set` spans two lines: the command line names the key, and the
//! first token of the following line is stored as the value - even if
//! that token spells a command name.
//!
//! ## Module Overview
//!
//! - [`protocol`]: line framing and wire replies
//! - [`storage`]: the bounded shared store and stats registry
//! - [`commands`]: the closed command set and its handlers
//! - [`connection`]: the per-client session state machine
//!
//! ## Design Highlights
//!
//! ### One Critical Section Per Command
//!
//! The store and the stats counters sit behind a single mutex, and each
//! logical command does its whole read-modify-write in one acquisition.
//! Concurrent sessions can never corrupt the entry count or lose an
//! update; mutations are linearizable.
//!
//! ### Task Per Connection
//!
//! Built on Tokio: the acceptor spawns one task per client, and each
//! session processes one line to completion (including its socket
//! write) before reading the next.
//!
//! ### Bounded Capacity
//!
//! The store refuses new keys once it holds `limit_items` entries,
//! reporting `SERVER_ERROR cache is full` to the client instead of
//! growing without bound. Overwrites are always allowed.
//!
//! ## Quick Start
//!
//! ```ignore
//! use memline::commands::CommandHandler;
//! use memline::connection::{handle_connection, ConnectionStats};
//! use memline::storage::Store;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Arc::new(Store::with_capacity(65535));
//!     let stats = Arc::new(ConnectionStats::new());
//!
//!     let listener = TcpListener::bind("127.0.0.1:11212").await.unwrap();
//!
//!     loop {
//!         let (stream, addr) = listener.accept().await.unwrap();
//!         let handler = CommandHandler::new(Arc::clone(&store));
//!         tokio::spawn(handle_connection(stream, addr, handler, Arc::clone(&stats)));
//!     }
//! }
//! ```

pub mod commands;
pub mod connection;
pub mod protocol;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::{Command, CommandError, CommandHandler, MAX_KEY_LENGTH};
pub use connection::{handle_connection, ConnectionStats, Session, SessionError};
pub use protocol::{FrameError, LineParser, Reply};
pub use storage::{StatsRegistry, Store, StoreError, DEFAULT_ITEM_LIMIT};

/// The default port memline listens on
pub const DEFAULT_PORT: u16 = 11212;

/// The default host memline binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of memline
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
