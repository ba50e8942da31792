//! Network recognizer service
//!
//! The dictionary is loaded once and kept in memory; clients connect over TCP
//! and stream texts to annotate.
//!
//! Architecture:
//! - [`daemon`]: listening socket, accept loop, graceful shutdown
//! - [`workers`]: bounded thread pool, one worker per connection
//! - [`handler`]: per-connection protocol state machine
//! - [`protocol`]: line framing shared by server and client
//! - [`client`]: blocking client used by `clinrec-client` and the tests

pub mod client;
pub mod daemon;
pub mod handler;
pub mod protocol;
pub mod signals;
pub mod workers;

pub use client::{ClientError, RecognizerClient, RemoteAnnotation};
pub use daemon::{RecognizerServer, ShutdownHandle};
pub use handler::{ConnectionHandler, HandlerState};
pub use protocol::ProtocolError;
