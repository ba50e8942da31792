//! Per-connection protocol state machine
//!
//! `Greeting -> AwaitingRequest -> (Processing -> AwaitingRequest)* -> Closed`
//!
//! The handler owns nothing but the stream halves; recognizers are leased from
//! the shared pool for the duration of one request.

use crate::config::ProtocolMode;
use crate::recognizer::{MatchEngine, PoolError, Recognizer, RecognizerPool};
use crate::server::protocol::{
    ProtocolError, Request, parse_one_shot, parse_request, read_line, write_annotations,
    write_batch, write_handshake,
};
use std::io::{BufRead, Write};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerState {
    Greeting,
    AwaitingRequest,
    Processing,
    Closed,
}

pub struct ConnectionHandler<'p, R, W, E = MatchEngine> {
    reader: R,
    writer: W,
    pool: &'p RecognizerPool<E>,
    mode: ProtocolMode,
    state: HandlerState,
    line: Vec<u8>,
    /// Text waiting in `Processing`
    pending: String,
    requests: u64,
}

impl<'p, R, W, E> ConnectionHandler<'p, R, W, E>
where
    R: BufRead,
    W: Write,
    E: Recognizer,
{
    pub fn new(reader: R, writer: W, pool: &'p RecognizerPool<E>, mode: ProtocolMode) -> Self {
        Self {
            reader,
            writer,
            pool,
            mode,
            state: HandlerState::Greeting,
            line: Vec::new(),
            pending: String::new(),
            requests: 0,
        }
    }

    pub fn state(&self) -> HandlerState {
        self.state
    }

    /// Requests answered so far
    pub fn requests(&self) -> u64 {
        self.requests
    }

    /// Drive the connection until it closes.
    ///
    /// Any error closes the connection; nothing is retried.
    pub fn run(&mut self) -> Result<(), ProtocolError> {
        while self.state != HandlerState::Closed {
            if let Err(e) = self.step() {
                self.state = HandlerState::Closed;
                return Err(e);
            }
        }
        Ok(())
    }

    /// Perform one transition and return the new state
    pub fn step(&mut self) -> Result<HandlerState, ProtocolError> {
        self.state = match self.state {
            HandlerState::Greeting => {
                write_handshake(&mut self.writer)?;
                HandlerState::AwaitingRequest
            }
            HandlerState::AwaitingRequest => self.await_request()?,
            HandlerState::Processing => self.process()?,
            HandlerState::Closed => HandlerState::Closed,
        };
        Ok(self.state)
    }

    fn await_request(&mut self) -> Result<HandlerState, ProtocolError> {
        let Some(line) = read_line(&mut self.reader, &mut self.line)? else {
            return Ok(HandlerState::Closed);
        };

        let text = match self.mode {
            ProtocolMode::Persistent => match parse_request(&line) {
                Request::Close => return Ok(HandlerState::Closed),
                Request::Skip => return Ok(HandlerState::AwaitingRequest),
                Request::Annotate(text) => text,
            },
            ProtocolMode::OneShot => match parse_one_shot(&line) {
                Some(text) => text,
                None => {
                    debug!("one-shot request without a text field");
                    return Ok(HandlerState::Closed);
                }
            },
        };

        self.pending.clear();
        self.pending.push_str(text);
        Ok(HandlerState::Processing)
    }

    fn process(&mut self) -> Result<HandlerState, ProtocolError> {
        let annotations = match self.pool.borrow(self.pool.borrow_timeout()) {
            Ok(mut lease) => {
                let annotations = lease.recognize(&self.pending);
                self.pool.release(lease);
                annotations
            }
            Err(e @ PoolError::Exhausted { .. }) => {
                warn!(error = %e, chars = self.pending.chars().count(), "request dropped");
                Vec::new()
            }
            Err(e @ PoolError::Closed) => {
                warn!(error = %e, "request dropped");
                Vec::new()
            }
        };
        self.requests += 1;
        debug!(
            request = self.requests,
            annotations = annotations.len(),
            "request served"
        );

        match self.mode {
            ProtocolMode::Persistent => {
                write_batch(&mut self.writer, &annotations)?;
                Ok(HandlerState::AwaitingRequest)
            }
            ProtocolMode::OneShot => {
                write_annotations(&mut self.writer, &annotations)?;
                self.writer.flush()?;
                Ok(HandlerState::Closed)
            }
        }
    }
}
