//! Command Handler Module
//!
//! This module implements the command processing layer. It receives one
//! framed line at a time from a session, together with the command
//! variant the session resolved from the line's first token, executes it
//! against the store, and returns the reply to put on the wire.
//!
//! ## Command Set
//!
//! - `get <key> [<key>...]` - look up one or more keys
//! - `set <key>` - phase one of the two-line set exchange (counter only)
//! - `delete <key>` - remove a key
//! - `stats` - report the counter registry
//! - `quit` - close the connection
//! - `default` - phase two of the set exchange: the value line, carried
//!   as a synthetic `"<value> <key>"` record built by the session
//!
//! The set is closed; there is no dynamic registration. Dispatch is a
//! match over [`Command`], one handler method per variant.
//!
//! ## Architecture
//!
//! ```text
//! Client line
//!       │
//!       ▼
//! ┌─────────────────┐
//! │   LineParser    │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! │                 │
//! │  - Dispatch     │
//! │  - Validate     │
//! │  - Execute      │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │     Store       │  (storage module)
//! └─────────────────┘
//! ```

use crate::protocol::parser::{first_token, nth_token};
use crate::protocol::Reply;
use crate::storage::{Store, StoreError};
use std::sync::Arc;
use thiserror::Error;

/// Maximum length of a cache key in bytes.
pub const MAX_KEY_LENGTH: usize = 250;

/// The closed set of protocol commands.
///
/// `Default` is the internal continuation command: it carries the value
/// line of a `set` exchange, and doubles as the fallback for lines whose
/// first token is not a recognized command name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Get,
    Set,
    Delete,
    Stats,
    Quit,
    Default,
}

impl Command {
    /// Resolves a line's first token to a command, case-sensitively.
    ///
    /// Returns `None` for unrecognized tokens; the session dispatches
    /// those as [`Command::Default`].
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "get" => Some(Command::Get),
            "set" => Some(Command::Set),
            "delete" => Some(Command::Delete),
            "stats" => Some(Command::Stats),
            "quit" => Some(Command::Quit),
            _ => None,
        }
    }
}

/// Why a `set` key was rejected.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InvalidKey {
    /// Key contains bytes outside 7-bit ASCII
    #[error("key contains non-ASCII characters")]
    NonAscii,

    /// Key exceeds [`MAX_KEY_LENGTH`] bytes
    #[error("key exceeds {MAX_KEY_LENGTH} bytes")]
    TooLong,

    /// The `set` line has no key token at all
    #[error("missing key")]
    Missing,
}

/// Validates a `set` key: pure 7-bit ASCII, at most
/// [`MAX_KEY_LENGTH`] bytes.
pub fn validate_key(key: &str) -> Result<(), InvalidKey> {
    if !key.is_ascii() {
        return Err(InvalidKey::NonAscii);
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(InvalidKey::TooLong);
    }
    Ok(())
}

/// Errors a handler can return for one command.
///
/// None of these abort other sessions: the session that dispatched the
/// command either logs the error or writes it to its own client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// A line that is neither a command nor a pending set value.
    /// Logged by the session, never written to the client.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// A command that requires a key argument arrived without one.
    #[error("missing key for '{0}' command")]
    MissingKey(&'static str),

    /// Insert refused because the store is at its item limit.
    /// Surfaced to the client as a `SERVER_ERROR` line.
    #[error("cache full: {limit} items")]
    CacheFull { limit: usize },
}

/// Executes protocol commands against the shared store.
///
/// One handler is created per connection; they all share the same
/// `Arc<Store>`, which is where cross-session state lives.
#[derive(Clone)]
pub struct CommandHandler {
    store: Arc<Store>,
}

impl CommandHandler {
    /// Creates a new command handler backed by the given store.
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Returns the store this handler executes against.
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Executes one command and returns the reply to write.
    ///
    /// `line` is the full request line for the ordinary commands, or the
    /// synthetic `"<value> <key>"` record for [`Command::Default`].
    pub fn execute(&self, command: Command, line: &str) -> Result<Reply, CommandError> {
        match command {
            Command::Get => self.cmd_get(line),
            Command::Set => self.cmd_set(line),
            Command::Delete => self.cmd_delete(line),
            Command::Stats => self.cmd_stats(line),
            Command::Quit => self.cmd_quit(line),
            Command::Default => self.cmd_default(line),
        }
    }

    /// `get <key> [<key>...]`
    ///
    /// Looks up every key after the command token in one critical
    /// section. Misses emit no `VALUE` block; the `END` terminator is
    /// always present.
    fn cmd_get(&self, line: &str) -> Result<Reply, CommandError> {
        let keys: Vec<&str> = line.split_whitespace().skip(1).collect();

        let hits = self
            .store
            .lookup(&keys)
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key, v)))
            .collect();

        Ok(Reply::Values(hits))
    }

    /// `set <key>` — phase one of the exchange.
    ///
    /// Only bumps `cmd_set`; nothing is stored and nothing is written
    /// until the value line arrives. Key validation happens in the
    /// session before dispatch, because a bad key closes the connection.
    fn cmd_set(&self, _line: &str) -> Result<Reply, CommandError> {
        self.store.note_set();
        Ok(Reply::None)
    }

    /// `delete <key>`
    fn cmd_delete(&self, line: &str) -> Result<Reply, CommandError> {
        let key = nth_token(line, 1).ok_or(CommandError::MissingKey("delete"))?;

        if self.store.remove(key) {
            Ok(Reply::Deleted)
        } else {
            Ok(Reply::NotFound)
        }
    }

    /// `stats` — pure read of the counter registry.
    fn cmd_stats(&self, _line: &str) -> Result<Reply, CommandError> {
        Ok(Reply::Stats(self.store.stats_snapshot()))
    }

    /// `quit` — the session performs the actual close.
    fn cmd_quit(&self, _line: &str) -> Result<Reply, CommandError> {
        Ok(Reply::Goodbye)
    }

    /// Phase two of the set exchange, or the unrecognized-line fallback.
    ///
    /// Expects the synthetic `"<value> <key>"` record: first token is
    /// the value, second the remembered key. With fewer than two tokens
    /// no set was pending, which makes the line an unknown command.
    fn cmd_default(&self, line: &str) -> Result<Reply, CommandError> {
        let value = first_token(line)
            .ok_or_else(|| CommandError::UnknownCommand(String::new()))?;
        let key = nth_token(line, 1)
            .ok_or_else(|| CommandError::UnknownCommand(value.to_string()))?;

        self.store.insert(key, value).map_err(|e| match e {
            StoreError::CacheFull { limit } => CommandError::CacheFull { limit },
        })?;

        Ok(Reply::Stored)
    }
}
