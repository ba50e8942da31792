//! Blocking client for the recognizer line protocol

use crate::index::ConceptId;
use crate::server::protocol::{ProtocolError, encode_request, read_handshake, read_line};
use serde::{Deserialize, Serialize};
use std::io::{self, BufReader, BufWriter, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use thiserror::Error;

/// Default read/write timeout
pub const IO_TIMEOUT: Duration = Duration::from_secs(30);

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("malformed response line {line:?}")]
    MalformedResponse { line: String },

    #[error("server closed the connection mid-response")]
    Disconnected,
}

/// One annotation line as received from the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAnnotation {
    pub concept_id: ConceptId,
    /// Char offsets into the request text
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl RemoteAnnotation {
    /// Parse `<conceptId>\t<start>\t<end>\t<text>`
    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.splitn(4, '\t');
        let concept_id = fields.next()?.parse().ok()?;
        let start = fields.next()?.parse().ok()?;
        let end = fields.next()?.parse().ok()?;
        let text = fields.next()?.to_string();
        Some(Self {
            concept_id,
            start,
            end,
            text,
        })
    }
}

pub struct RecognizerClient {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    line: Vec<u8>,
}

impl RecognizerClient {
    /// Connect and check the server handshake
    pub fn connect<A: ToSocketAddrs>(addr: A, timeout: Option<Duration>) -> ClientResult<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_read_timeout(timeout)?;
        stream.set_write_timeout(timeout)?;

        let mut reader = BufReader::new(stream.try_clone()?);
        read_handshake(&mut reader)?;

        Ok(Self {
            reader,
            writer: BufWriter::new(stream),
            line: Vec::new(),
        })
    }

    /// Annotate one text.
    ///
    /// Empty text is answered locally since the server sends no reply for it.
    pub fn annotate(&mut self, text: &str) -> ClientResult<Vec<RemoteAnnotation>> {
        if text.is_empty() {
            return Ok(Vec::new());
        }

        self.writer.write_all(encode_request(text).as_bytes())?;
        self.writer.flush()?;

        let mut annotations = Vec::new();
        loop {
            let line = read_line(&mut self.reader, &mut self.line)?.ok_or(ClientError::Disconnected)?;
            if line.is_empty() {
                return Ok(annotations);
            }
            let annotation =
                RemoteAnnotation::parse(&line).ok_or(ClientError::MalformedResponse { line })?;
            annotations.push(annotation);
        }
    }

    /// End the session politely
    pub fn close(mut self) -> ClientResult<()> {
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_annotation_line() {
        let parsed = RemoteAnnotation::parse("12\t3\t21\tdouleur thoracique").unwrap();
        assert_eq!(
            parsed,
            RemoteAnnotation {
                concept_id: 12,
                start: 3,
                end: 21,
                text: "douleur thoracique".to_string(),
            }
        );
        // tabs inside the matched text stay in the last field
        let parsed = RemoteAnnotation::parse("1\t0\t8\tfoo\tbar").unwrap();
        assert_eq!(parsed.text, "foo\tbar");
    }

    #[test]
    fn test_parse_rejects_malformed_lines() {
        assert!(RemoteAnnotation::parse("mgrep").is_none());
        assert!(RemoteAnnotation::parse("x\t0\t1\ta").is_none());
        assert!(RemoteAnnotation::parse("1\t0\t1").is_none());
    }

    #[test]
    fn test_connect_refused() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        assert!(matches!(
            RecognizerClient::connect(addr, Some(IO_TIMEOUT)),
            Err(ClientError::Io(_))
        ));
    }
}
