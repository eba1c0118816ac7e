//! Text Protocol Implementation
//!
//! This module implements the line-oriented wire protocol the server
//! speaks: a small memcached-style text dialect.
//!
//! ## Overview
//!
//! Requests are newline-delimited lines of whitespace-separated tokens.
//! Responses use the protocol's reversed-CRLF terminator `\n\r`.
//!
//! ## Modules
//!
//! - `types`: the `Reply` enum, wire constants, and serialization
//! - `parser`: incremental framing of the inbound byte stream into lines
//!
//! ## Example
//!
//! ```
//! use memline::protocol::{LineParser, Reply};
//!
//! // Framing incoming data
//! let parser = LineParser::new();
//! let (line, consumed) = parser.parse(b"get name\n\r").unwrap().unwrap();
//! assert_eq!(line, "get name");
//!
//! // Creating responses
//! let reply = Reply::Values(vec![("name".into(), "Ariz".into())]);
//! assert_eq!(reply.serialize(), b"VALUE name\n\rAriz\n\rEND\n\r");
//! ```

pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use parser::{first_token, nth_token, FrameError, FrameResult, LineParser, MAX_LINE_SIZE};
pub use types::Reply;
