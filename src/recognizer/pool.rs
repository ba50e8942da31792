//! Bounded sharing of recognizers between connections
//!
//! A recognizer is cheap to clone around once its dictionary index exists
//! (engines share the index through an `Arc`), but a single instance must not
//! run two `recognize` calls at once. The pool hands out exclusive leases:
//!
//! - `Pooled`: a fixed set of instances, free slots cycled through a bounded channel
//! - `Shared`: one instance behind a lock, serializing every call
//!
//! Borrowing never waits longer than the given timeout. Instances are never
//! evicted; an idle instance costs memory, not a rebuild.

use crate::index::DictionaryIndex;
use crate::recognizer::{AnnotationToken, MatchEngine, Recognizer};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// How recognizer instances are shared
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum PoolStrategy {
    /// A fixed number of instances, one lease per instance
    #[default]
    Pooled,
    /// One instance guarded by a lock
    Shared,
}

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("no recognizer became available within {waited:?}")]
    Exhausted { waited: Duration },

    #[error("recognizer pool is closed")]
    Closed,
}

enum Slots<R> {
    /// Each instance sits behind its own lock; the channel carries the
    /// indexes of instances nobody holds
    Pooled {
        instances: Vec<Mutex<R>>,
        idle: Receiver<usize>,
        returns: Sender<usize>,
    },
    Shared(Mutex<R>),
}

/// Fixed-size pool of recognizers
pub struct RecognizerPool<R = MatchEngine> {
    slots: Slots<R>,
    borrow_timeout: Duration,
}

/// Default wait for [`RecognizerPool::recognize`]
pub const DEFAULT_BORROW_TIMEOUT: Duration = Duration::from_secs(5);

impl RecognizerPool<MatchEngine> {
    /// Build engines over one shared index.
    ///
    /// `size` is ignored for the shared strategy, which always holds exactly
    /// one engine.
    pub fn for_index(index: Arc<DictionaryIndex>, strategy: PoolStrategy, size: usize) -> Self {
        match strategy {
            PoolStrategy::Pooled => Self::pooled(
                (0..size)
                    .map(|_| MatchEngine::new(Arc::clone(&index)))
                    .collect(),
            ),
            PoolStrategy::Shared => Self::shared(MatchEngine::new(index)),
        }
    }
}

impl<R: Recognizer> RecognizerPool<R> {
    /// Pool over the given instances. An empty pool times out on every borrow.
    pub fn pooled(instances: Vec<R>) -> Self {
        let (returns, idle) = bounded(instances.len().max(1));
        for index in 0..instances.len() {
            // capacity equals the instance count, so this cannot block
            let _ = returns.send(index);
        }
        Self {
            slots: Slots::Pooled {
                instances: instances.into_iter().map(Mutex::new).collect(),
                idle,
                returns,
            },
            borrow_timeout: DEFAULT_BORROW_TIMEOUT,
        }
    }

    /// Serialize every call through one instance
    pub fn shared(instance: R) -> Self {
        Self {
            slots: Slots::Shared(Mutex::new(instance)),
            borrow_timeout: DEFAULT_BORROW_TIMEOUT,
        }
    }

    /// Timeout used by [`recognize`](Self::recognize)
    pub fn with_borrow_timeout(mut self, timeout: Duration) -> Self {
        self.borrow_timeout = timeout;
        self
    }

    pub fn borrow_timeout(&self) -> Duration {
        self.borrow_timeout
    }

    pub fn strategy(&self) -> PoolStrategy {
        match self.slots {
            Slots::Pooled { .. } => PoolStrategy::Pooled,
            Slots::Shared(_) => PoolStrategy::Shared,
        }
    }

    /// Number of instances owned by the pool
    pub fn size(&self) -> usize {
        match &self.slots {
            Slots::Pooled { instances, .. } => instances.len(),
            Slots::Shared(_) => 1,
        }
    }

    /// Instances not currently leased (a snapshot)
    pub fn available(&self) -> usize {
        match &self.slots {
            Slots::Pooled { idle, .. } => idle.len(),
            Slots::Shared(lock) => usize::from(!lock.is_locked()),
        }
    }

    /// Take an instance, waiting at most `timeout` for one to be released
    pub fn borrow(&self, timeout: Duration) -> Result<Lease<'_, R>, PoolError> {
        match &self.slots {
            Slots::Pooled {
                instances,
                idle,
                returns,
            } => {
                let index = match idle.recv_timeout(timeout) {
                    Ok(index) => index,
                    Err(RecvTimeoutError::Timeout) => {
                        return Err(PoolError::Exhausted { waited: timeout });
                    }
                    Err(RecvTimeoutError::Disconnected) => return Err(PoolError::Closed),
                };
                // the index is ours, so at most a returning lease still holds this lock
                let Some(instance) = instances.get(index) else {
                    return Err(PoolError::Closed);
                };
                Ok(Lease {
                    guard: instance.lock(),
                    returns: Some((index, returns)),
                })
            }
            Slots::Shared(lock) => match lock.try_lock_for(timeout) {
                Some(guard) => Ok(Lease {
                    guard,
                    returns: None,
                }),
                None => Err(PoolError::Exhausted { waited: timeout }),
            },
        }
    }

    /// Give a leased instance back. Dropping the lease does the same.
    pub fn release(&self, lease: Lease<'_, R>) {
        drop(lease);
    }

    /// Borrow with the pool's timeout, recognize, release
    pub fn recognize(&self, text: &str) -> Result<Vec<AnnotationToken>, PoolError> {
        let mut lease = self.borrow(self.borrow_timeout)?;
        let annotations = lease.recognize(text);
        self.release(lease);
        Ok(annotations)
    }
}

/// Exclusive use of one pooled recognizer, returned on drop
pub struct Lease<'a, R> {
    guard: MutexGuard<'a, R>,
    /// Slot index and the queue it goes back to; `None` for the shared instance
    returns: Option<(usize, &'a Sender<usize>)>,
}

impl<R> Deref for Lease<'_, R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.guard
    }
}

impl<R> DerefMut for Lease<'_, R> {
    fn deref_mut(&mut self) -> &mut R {
        &mut self.guard
    }
}

impl<R> Drop for Lease<'_, R> {
    fn drop(&mut self) {
        if let Some((index, returns)) = self.returns {
            // the pool owns the receiver, so the channel outlives every lease
            let _ = returns.send(index);
        }
    }
}

impl<R> fmt::Debug for Lease<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease")
            .field("slot", &self.returns.map(|(index, _)| index))
            .finish_non_exhaustive()
    }
}
