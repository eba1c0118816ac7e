//! Incremental Line Framer
//!
//! This module splits the raw byte stream from a client into protocol
//! lines. TCP is a stream, so a single read may contain a partial line,
//! or several lines at once; the parser handles both.
//!
//! ## How the Parser Works
//!
//! The parser reads from a buffer and returns either:
//! - `Ok(Some((line, consumed)))` - a complete line, `consumed` bytes were used
//! - `Ok(None)` - need more data, no full line in the buffer yet
//! - `Err(FrameError)` - the stream cannot be framed
//!
//! This design allows the caller to:
//! 1. Append incoming network data to a buffer
//! 2. Call `parse()` to attempt framing
//! 3. If successful, advance the buffer by `consumed` bytes
//! 4. If incomplete, wait for more data
//! 5. If error, disconnect the client
//!
//! ## Terminator Handling
//!
//! The canonical terminator is the two-byte sequence `\n\r`. A line is
//! framed at the `\n`; the trailing `\r` of the previous terminator shows
//! up as a leading `\r` on the next line and is stripped, as is a `\r`
//! immediately before the `\n` (so conventional CRLF clients also work).

use thiserror::Error;

/// Errors that can occur while framing the input stream.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FrameError {
    /// Line contains invalid UTF-8
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),

    /// No terminator within the allowed line length
    #[error("line too long: {size} bytes (max: {max})")]
    LineTooLong { size: usize, max: usize },
}

/// Result type for framing operations.
pub type FrameResult<T> = Result<T, FrameError>;

/// Maximum length of a single protocol line (key + value lines included).
pub const MAX_LINE_SIZE: usize = 8 * 1024;

/// An incremental line framer for the cache protocol.
///
/// # Example
///
/// ```
/// use memline::protocol::LineParser;
///
/// let parser = LineParser::new();
/// let buf = b"get name\n\r";
///
/// let (line, consumed) = parser.parse(buf).unwrap().unwrap();
/// assert_eq!(line, "get name");
/// assert_eq!(consumed, 9);
/// ```
#[derive(Debug, Default)]
pub struct LineParser;

impl LineParser {
    /// Creates a new parser instance.
    pub fn new() -> Self {
        Self
    }

    /// Attempts to frame one line from the buffer.
    ///
    /// # Returns
    ///
    /// - `Ok(Some((line, consumed)))` - a complete line was framed
    /// - `Ok(None)` - incomplete data, need more bytes
    /// - `Err(e)` - framing error
    pub fn parse(&self, buf: &[u8]) -> FrameResult<Option<(String, usize)>> {
        let newline = match buf.iter().position(|&b| b == b'\n') {
            Some(pos) => pos,
            None => {
                if buf.len() > MAX_LINE_SIZE {
                    return Err(FrameError::LineTooLong {
                        size: buf.len(),
                        max: MAX_LINE_SIZE,
                    });
                }
                return Ok(None);
            }
        };

        if newline > MAX_LINE_SIZE {
            return Err(FrameError::LineTooLong {
                size: newline,
                max: MAX_LINE_SIZE,
            });
        }

        let raw = &buf[..newline];
        let line = std::str::from_utf8(raw)
            .map_err(|e| FrameError::InvalidUtf8(e.to_string()))?;

        // Strip the CR halves of both terminator conventions.
        let line = line.strip_suffix('\r').unwrap_or(line);
        let line = line.strip_prefix('\r').unwrap_or(line);

        Ok(Some((line.to_string(), newline + 1)))
    }
}

/// Returns the first whitespace-delimited token of a line, if any.
#[inline]
pub fn first_token(line: &str) -> Option<&str> {
    line.split_whitespace().next()
}

/// Returns the nth whitespace-delimited token of a line, if any.
#[inline]
pub fn nth_token(line: &str, n: usize) -> Option<&str> {
    line.split_whitespace().nth(n)
}
