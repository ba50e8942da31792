//! Line protocol between clients and the recognizer server
//!
//! Every connection starts with a two-line handshake from the server:
//! `mgrep` then the protocol version `4`. After that:
//!
//! - Persistent mode: each request line is a 3-character command tag followed
//!   by the text to annotate. The reply is one line per annotation,
//!   `<conceptId>\t<start>\t<end>\t<matchedText>`, then a blank line. An empty
//!   line or end of stream ends the session.
//! - One-shot mode: a single `<ignored>\t<text>` line, answered with the
//!   annotation lines, then the connection closes.
//!
//! Lines are UTF-8 and end with `\n`; a trailing `\r` is ignored.

use crate::recognizer::AnnotationToken;
use std::io::{self, BufRead, Read, Write};
use thiserror::Error;

/// First handshake line
pub const SERVER_NAME: &str = "mgrep";

/// Second handshake line
pub const PROTOCOL_VERSION: &str = "4";

/// Characters stripped from the front of a persistent-mode request
pub const TAG_CHARS: usize = 3;

/// Tag sent by [`encode_request`]; the server never interprets it
pub const ANNOTATE_TAG: &str = "ANN";

/// Upper bound on one request line, newline included
pub const MAX_LINE_BYTES: u64 = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("line exceeds {limit} bytes")]
    LineTooLong { limit: u64 },

    #[error("line is not valid UTF-8")]
    InvalidUtf8,

    #[error("unexpected handshake line {found:?}")]
    BadHandshake { found: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A persistent-mode request line, interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request<'a> {
    /// Empty line: the client is done
    Close,
    /// Nothing left after the tag; no reply is sent
    Skip,
    /// Text to annotate
    Annotate(&'a str),
}

/// Write the handshake and flush it
pub fn write_handshake<W: Write>(writer: &mut W) -> io::Result<()> {
    writeln!(writer, "{SERVER_NAME}")?;
    writeln!(writer, "{PROTOCOL_VERSION}")?;
    writer.flush()
}

/// Read and check the server handshake
pub fn read_handshake<R: BufRead>(reader: &mut R) -> Result<(), ProtocolError> {
    let mut buf = Vec::new();
    for expected in [SERVER_NAME, PROTOCOL_VERSION] {
        let line = read_line(reader, &mut buf)?.unwrap_or_default();
        if line != expected {
            return Err(ProtocolError::BadHandshake { found: line });
        }
    }
    Ok(())
}

/// Read one line without its terminator. `None` at end of stream.
///
/// `buf` is scratch space kept by the caller between reads.
pub fn read_line<R: BufRead>(
    reader: &mut R,
    buf: &mut Vec<u8>,
) -> Result<Option<String>, ProtocolError> {
    buf.clear();
    let read = reader.by_ref().take(MAX_LINE_BYTES).read_until(b'\n', buf)?;
    if read == 0 {
        return Ok(None);
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    } else if read as u64 >= MAX_LINE_BYTES && !reader.fill_buf()?.is_empty() {
        // a final line of exactly the limit ends at EOF and is accepted
        return Err(ProtocolError::LineTooLong {
            limit: MAX_LINE_BYTES,
        });
    }

    match std::str::from_utf8(buf) {
        Ok(line) => Ok(Some(line.to_string())),
        Err(_) => Err(ProtocolError::InvalidUtf8),
    }
}

/// Interpret a persistent-mode request line
pub fn parse_request(line: &str) -> Request<'_> {
    if line.is_empty() {
        return Request::Close;
    }
    let text = match line.char_indices().nth(TAG_CHARS) {
        Some((offset, _)) => &line[offset..],
        None => "",
    };
    if text.is_empty() {
        Request::Skip
    } else {
        Request::Annotate(text)
    }
}

/// The text field of a one-shot request, `None` when there is no tab
pub fn parse_one_shot(line: &str) -> Option<&str> {
    line.split('\t').nth(1)
}

/// Build a persistent-mode request line, newline included.
///
/// Line breaks inside `text` become spaces so the request stays one line;
/// offsets in the reply are unaffected since the char count is unchanged.
pub fn encode_request(text: &str) -> String {
    let mut line = String::with_capacity(ANNOTATE_TAG.len() + text.len() + 1);
    line.push_str(ANNOTATE_TAG);
    line.extend(
        text.chars()
            .map(|c| if c == '\n' || c == '\r' { ' ' } else { c }),
    );
    line.push('\n');
    line
}

/// Write annotation lines, without the batch terminator
pub fn write_annotations<W: Write>(
    writer: &mut W,
    annotations: &[AnnotationToken],
) -> io::Result<()> {
    for annotation in annotations {
        writeln!(writer, "{annotation}")?;
    }
    Ok(())
}

/// Write a persistent-mode reply: annotation lines then a blank line
pub fn write_batch<W: Write>(writer: &mut W, annotations: &[AnnotationToken]) -> io::Result<()> {
    write_annotations(writer, annotations)?;
    writeln!(writer)?;
    writer.flush()
}
