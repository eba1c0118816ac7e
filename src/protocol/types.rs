//! Wire Reply Types
//!
//! This module defines the responses the server writes back to clients,
//! along with the literal byte sequences of the wire format.
//!
//! ## Protocol Format
//!
//! Every server-to-client line ends with the two-byte sequence `\n\r` —
//! the reverse of conventional CRLF. This is a quirk of the original
//! protocol and is reproduced byte-for-byte for compatibility. The
//! multi-line `get` response ends with `END\n\r` while the `stats`
//! response ends with `END \n\r` (trailing space); both spellings are
//! part of the wire contract.
//!
//! ## Examples
//!
//! Get hit: `VALUE name\n\rAriz\n\rEND\n\r`
//! Set acknowledgment: `STORED \n\r`
//! Delete miss: `NOT_FOUND \n\r`
//! Stats line: `curr_items 3\n\r`

/// The line terminator used by the protocol (reversed CRLF).
pub const LINE_END: &[u8] = b"\n\r";

/// Terminator block for a `get` response.
pub const END_GET: &[u8] = b"END\n\r";

/// Terminator block for a `stats` response (note the trailing space).
pub const END_STATS: &[u8] = b"END \n\r";

/// Acknowledgment for a completed `set` exchange.
pub const STORED: &[u8] = b"STORED \n\r";

/// Acknowledgment for a successful `delete`.
pub const DELETED: &[u8] = b"DELETED \n\r";

/// Response for a `delete` on an absent key.
pub const NOT_FOUND: &[u8] = b"NOT_FOUND \n\r";

/// Closing message written for `quit`.
pub const GOODBYE: &[u8] = b"Closing Connection!";

/// Error line for a `set` key containing non-ASCII bytes.
///
/// The invalid-key error lines end with conventional CRLF, unlike every
/// other response. The original server did this and clients depend on it.
pub const ERR_NON_ASCII: &[u8] = b"ERROR non-ASCII characters detected \r\n";

/// Error line for a `set` key longer than the allowed maximum.
pub const ERR_KEY_TOO_LONG: &[u8] = b"ERROR exceeded 250 character limit \r\n";

/// Error line for a `set` line with no key token.
pub const ERR_MISSING_KEY: &[u8] = b"ERROR missing key \r\n";

/// Error line written when an insert is refused because the store is full.
pub const ERR_CACHE_FULL: &[u8] = b"SERVER_ERROR cache is full \n\r";

/// A response produced by one command, ready to be put on the wire.
///
/// Handlers return a `Reply`; the session serializes it and performs the
/// single socket write for the command. `Reply::None` is the first phase
/// of a `set` exchange, which by protocol writes nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `STORED \n\r` — a value line was stored.
    Stored,

    /// `DELETED \n\r` — the key existed and was removed.
    Deleted,

    /// `NOT_FOUND \n\r` — `delete` on an absent key.
    NotFound,

    /// Zero or more `VALUE <key>\n\r<value>\n\r` blocks followed by
    /// `END\n\r`. Only hits appear; misses are silent.
    Values(Vec<(String, String)>),

    /// One `<name> <count>\n\r` line per counter, then `END \n\r`.
    Stats(Vec<(&'static str, u64)>),

    /// `Closing Connection!` — written before the session closes.
    Goodbye,

    /// No bytes on the wire (phase one of `set`).
    None,
}

impl Reply {
    /// Serializes the reply to bytes for sending over the wire.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the reply into an existing buffer.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            Reply::Stored => buf.extend_from_slice(STORED),
            Reply::Deleted => buf.extend_from_slice(DELETED),
            Reply::NotFound => buf.extend_from_slice(NOT_FOUND),
            Reply::Values(hits) => {
                for (key, value) in hits {
                    buf.extend_from_slice(b"VALUE ");
                    buf.extend_from_slice(key.as_bytes());
                    buf.extend_from_slice(LINE_END);
                    buf.extend_from_slice(value.as_bytes());
                    buf.extend_from_slice(LINE_END);
                }
                buf.extend_from_slice(END_GET);
            }
            Reply::Stats(counters) => {
                for (name, count) in counters {
                    buf.extend_from_slice(name.as_bytes());
                    buf.push(b' ');
                    buf.extend_from_slice(count.to_string().as_bytes());
                    buf.extend_from_slice(LINE_END);
                }
                buf.extend_from_slice(END_STATS);
            }
            Reply::Goodbye => buf.extend_from_slice(GOODBYE),
            Reply::None => {}
        }
    }

    /// Returns true if this reply puts no bytes on the wire.
    pub fn is_none(&self) -> bool {
        matches!(self, Reply::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_serialize() {
        assert_eq!(Reply::Stored.serialize(), b"STORED \n\r");
    }

    #[test]
    fn test_deleted_serialize() {
        assert_eq!(Reply::Deleted.serialize(), b"DELETED \n\r");
        assert_eq!(Reply::NotFound.serialize(), b"NOT_FOUND \n\r");
    }

    #[test]
    fn test_values_serialize() {
        let reply = Reply::Values(vec![("name".to_string(), "Ariz".to_string())]);
        assert_eq!(reply.serialize(), b"VALUE name\n\rAriz\n\rEND\n\r");
    }

    #[test]
    fn test_values_empty_still_terminated() {
        let reply = Reply::Values(vec![]);
        assert_eq!(reply.serialize(), b"END\n\r");
    }

    #[test]
    fn test_values_multiple_hits() {
        let reply = Reply::Values(vec![
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
        ]);
        assert_eq!(reply.serialize(), b"VALUE a\n\r1\n\rVALUE b\n\r2\n\rEND\n\r");
    }

    #[test]
    fn test_stats_serialize() {
        let reply = Reply::Stats(vec![("cmd_get", 2), ("curr_items", 1)]);
        assert_eq!(reply.serialize(), b"cmd_get 2\n\rcurr_items 1\n\rEND \n\r");
    }

    #[test]
    fn test_goodbye_has_no_terminator() {
        assert_eq!(Reply::Goodbye.serialize(), b"Closing Connection!");
    }

    #[test]
    fn test_none_serializes_to_nothing() {
        assert!(Reply::None.serialize().is_empty());
        assert!(Reply::None.is_none());
    }
}
