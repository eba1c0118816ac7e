//! Command Module
//!
//! The command processing layer: the closed set of protocol commands,
//! key validation, and the handler that executes commands against the
//! shared store.
//!
//! ## Supported Commands
//!
//! - `get <key> [<key>...]` - look up keys
//! - `set <key>` + value line - two-line set exchange
//! - `delete <key>` - remove a key
//! - `stats` - counter registry
//! - `quit` - close the connection
//!
//! Lines whose first token is none of the above go through the internal
//! `default` command, which completes a pending set exchange or fails as
//! an unknown command.

pub mod handler;

// Re-export the main command types
pub use handler::{
    validate_key, Command, CommandError, CommandHandler, InvalidKey, MAX_KEY_LENGTH,
};
