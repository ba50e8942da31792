//! TCP recognizer server
//!
//! One listening socket, one worker per connection. The accept loop polls a
//! non-blocking listener so a shutdown request is noticed within
//! [`ACCEPT_POLL_INTERVAL`].

use crate::config::{ProtocolMode, ServerConfig};
use crate::recognizer::{MatchEngine, Recognizer, RecognizerPool};
use crate::server::handler::ConnectionHandler;
use crate::server::protocol::ProtocolError;
use crate::server::workers::WorkerPool;
use anyhow::{Context, Result};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::io::{self, BufReader, BufWriter};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Upper bound on the delay between a shutdown request and the listener closing
pub const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long running connections get to finish after shutdown
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Cloneable trigger for a graceful server stop
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Open client sockets, so shutdown can interrupt blocked reads
#[derive(Default)]
struct ConnectionRegistry {
    next_id: AtomicU64,
    streams: Mutex<FxHashMap<u64, TcpStream>>,
}

impl ConnectionRegistry {
    fn register(self: &Arc<Self>, stream: &TcpStream) -> io::Result<Registration> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.streams.lock().insert(id, stream.try_clone()?);
        Ok(Registration {
            registry: Arc::clone(self),
            id,
        })
    }

    fn len(&self) -> usize {
        self.streams.lock().len()
    }

    /// Shut down every registered socket in both directions
    fn interrupt_all(&self) -> usize {
        let streams = std::mem::take(&mut *self.streams.lock());
        for stream in streams.values() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        streams.len()
    }
}

/// Removes its socket from the registry when the connection is done
struct Registration {
    registry: Arc<ConnectionRegistry>,
    id: u64,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.streams.lock().remove(&self.id);
    }
}

pub struct RecognizerServer<E = MatchEngine> {
    listener: TcpListener,
    pool: Arc<RecognizerPool<E>>,
    workers: WorkerPool,
    registry: Arc<ConnectionRegistry>,
    shutdown: ShutdownHandle,
    mode: ProtocolMode,
    client_timeout: Option<Duration>,
}

impl<E: Recognizer + 'static> RecognizerServer<E> {
    /// Bind the listening socket. Nothing is accepted until [`run`](Self::run).
    pub fn bind(config: &ServerConfig, pool: Arc<RecognizerPool<E>>) -> Result<Self> {
        let addr = config.socket_addr();
        let listener =
            TcpListener::bind(addr).with_context(|| format!("Failed to bind to {addr}"))?;
        listener
            .set_nonblocking(true)
            .context("Failed to configure listening socket")?;

        Ok(Self {
            listener,
            pool,
            workers: WorkerPool::new(&config.workers),
            registry: Arc::new(ConnectionRegistry::default()),
            shutdown: ShutdownHandle::default(),
            mode: config.protocol,
            client_timeout: config.client_timeout(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Accept connections until the shutdown handle fires
    pub fn run(self) -> Result<()> {
        let addr = self.local_addr().context("Failed to read listening address")?;
        info!(
            %addr,
            pool_size = self.pool.size(),
            strategy = ?self.pool.strategy(),
            mode = ?self.mode,
            "listening"
        );

        while !self.shutdown.is_triggered() {
            match self.listener.accept() {
                Ok((stream, peer)) => self.dispatch(stream, peer),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        let Self {
            listener,
            workers,
            registry,
            ..
        } = self;

        info!("shutting down");
        drop(listener);

        let dropped = workers.shutdown();
        let interrupted = registry.interrupt_all();
        debug!(dropped, interrupted, "connections closed");

        if !workers.join(SHUTDOWN_GRACE) {
            warn!(
                workers = workers.live_workers(),
                "workers still running after shutdown grace period"
            );
        }
        info!("server stopped");
        Ok(())
    }

    fn dispatch(&self, stream: TcpStream, peer: SocketAddr) {
        if let Err(e) = self.configure(&stream) {
            warn!(%peer, error = %e, "failed to configure client socket");
            return;
        }
        let registration = match self.registry.register(&stream) {
            Ok(registration) => registration,
            Err(e) => {
                warn!(%peer, error = %e, "failed to register connection");
                return;
            }
        };

        let pool = Arc::clone(&self.pool);
        let mode = self.mode;
        let result = self.workers.execute(move || {
            let _registration = registration;
            serve_connection(stream, peer, &pool, mode);
        });

        match result {
            Ok(()) => debug!(%peer, open = self.registry.len(), "connection accepted"),
            Err(e) => warn!(%peer, error = %e, "connection rejected"),
        }
    }

    fn configure(&self, stream: &TcpStream) -> io::Result<()> {
        // accepted sockets inherit O_NONBLOCK on some platforms
        stream.set_nonblocking(false)?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(self.client_timeout)?;
        stream.set_write_timeout(self.client_timeout)?;
        Ok(())
    }
}

fn serve_connection<E: Recognizer>(
    stream: TcpStream,
    peer: SocketAddr,
    pool: &RecognizerPool<E>,
    mode: ProtocolMode,
) {
    let reader = match stream.try_clone() {
        Ok(read_half) => BufReader::new(read_half),
        Err(e) => {
            warn!(%peer, error = %e, "failed to clone client socket");
            return;
        }
    };
    let writer = BufWriter::new(stream);

    let mut handler = ConnectionHandler::new(reader, writer, pool, mode);
    match handler.run() {
        Ok(()) => debug!(%peer, requests = handler.requests(), "connection closed"),
        Err(ProtocolError::Io(e)) if is_disconnect(&e) => {
            debug!(%peer, error = %e, "client went away");
        }
        Err(e) => warn!(%peer, error = %e, "connection error"),
    }
}

fn is_disconnect(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::NotConnected
    )
}
