//! Last-write-wins holder for refresh results.
//!
//! Every pass takes a sequence number with [`SequencedStore::begin`] before it
//! starts fetching. Passes may overlap and finish in any order; only a result
//! newer than the one stored replaces it, so a slow stale pass can never
//! overwrite fresher data.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

/// A stored value and the sequence number of the pass that produced it.
#[derive(Debug)]
pub struct Versioned<T> {
    pub sequence: u64,
    pub value: Arc<T>,
}

impl<T> Clone for Versioned<T> {
    fn clone(&self) -> Self {
        Self {
            sequence: self.sequence,
            value: Arc::clone(&self.value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStatus {
    /// Sequence of the value currently served, 0 before the first success.
    pub sequence: u64,
    pub last_error: Option<String>,
}

/// The served value and the store status, read under one lock.
#[derive(Debug)]
pub struct Snapshot<T> {
    pub latest: Option<Versioned<T>>,
    pub status: StoreStatus,
}

#[derive(Debug)]
struct Failure {
    sequence: u64,
    message: String,
}

#[derive(Debug)]
struct Inner<T> {
    latest: Option<Versioned<T>>,
    failure: Option<Failure>,
}

#[derive(Debug)]
pub struct SequencedStore<T> {
    name: &'static str,
    next_sequence: AtomicU64,
    inner: RwLock<Inner<T>>,
}

impl<T> SequencedStore<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            next_sequence: AtomicU64::new(0),
            inner: RwLock::new(Inner {
                latest: None,
                failure: None,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Reserves the sequence number for a pass that is about to start.
    pub fn begin(&self) -> u64 {
        self.next_sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Stores `value` unless a newer pass already published. Returns whether it was kept.
    pub async fn publish(&self, sequence: u64, value: T) -> bool {
        let mut inner = self.inner.write().await;
        if let Some(current) = &inner.latest {
            if current.sequence >= sequence {
                tracing::debug!(
                    store = self.name,
                    sequence,
                    current = current.sequence,
                    "Dropping stale refresh result"
                );
                return false;
            }
        }
        inner.latest = Some(Versioned {
            sequence,
            value: Arc::new(value),
        });
        if inner.failure.as_ref().is_some_and(|f| f.sequence < sequence) {
            inner.failure = None;
        }
        tracing::debug!(store = self.name, sequence, "Refresh result published");
        true
    }

    /// Records a failed pass. The stored value is kept; the message is shown
    /// until a newer pass succeeds. Older failures than what is stored are ignored.
    pub async fn fail(&self, sequence: u64, message: impl Into<String>) -> bool {
        let message = message.into();
        let mut inner = self.inner.write().await;
        let newest_seen = inner
            .latest
            .as_ref()
            .map(|v| v.sequence)
            .max(inner.failure.as_ref().map(|f| f.sequence))
            .unwrap_or(0);
        if sequence <= newest_seen {
            tracing::debug!(store = self.name, sequence, "Ignoring failure from a stale pass");
            return false;
        }
        tracing::warn!(store = self.name, sequence, error = %message, "Refresh pass failed");
        inner.failure = Some(Failure { sequence, message });
        true
    }

    pub async fn latest(&self) -> Option<Versioned<T>> {
        self.inner.read().await.latest.clone()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.inner.read().await.failure.as_ref().map(|f| f.message.clone())
    }

    pub async fn status(&self) -> StoreStatus {
        Self::status_of(&*self.inner.read().await)
    }

    /// Value and status together, so a concurrent publish cannot pair a
    /// document with another pass's error.
    pub async fn snapshot(&self) -> Snapshot<T> {
        let inner = self.inner.read().await;
        Snapshot {
            latest: inner.latest.clone(),
            status: Self::status_of(&inner),
        }
    }

    fn status_of(inner: &Inner<T>) -> StoreStatus {
        StoreStatus {
            sequence: inner.latest.as_ref().map(|v| v.sequence).unwrap_or(0),
            last_error: inner.failure.as_ref().map(|f| f.message.clone()),
        }
    }
}
