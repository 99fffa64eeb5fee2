// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Snapshot broadcast for session observers.
//!
//! A new subscriber first receives the latest snapshot, then every later
//! publication in order. Publishing never waits on subscribers; a
//! subscriber that falls more than the channel capacity behind skips
//! ahead and is told how many snapshots it missed.

use futures_util::stream::{self, Stream};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::models::LiveSessionState;

/// Snapshots buffered per subscriber before it starts lagging.
pub const FEED_CAPACITY: usize = 256;

/// Single-writer feed of session snapshots.
#[derive(Debug)]
pub struct SnapshotFeed {
    latest: Mutex<Arc<LiveSessionState>>,
    sender: broadcast::Sender<Arc<LiveSessionState>>,
}

impl SnapshotFeed {
    pub fn new(initial: Arc<LiveSessionState>) -> Self {
        let (sender, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            latest: Mutex::new(initial),
            sender,
        }
    }

    /// Replace the latest snapshot and notify subscribers.
    pub fn publish(&self, state: Arc<LiveSessionState>) {
        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        *latest = Arc::clone(&state);
        // No receivers is fine; the value is kept as `latest`.
        let _ = self.sender.send(state);
    }

    /// Current snapshot.
    pub fn latest(&self) -> Arc<LiveSessionState> {
        let latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*latest)
    }

    /// Attach a subscriber.
    ///
    /// Reading the latest value and joining the channel happen under the same
    /// lock as `publish`, so the subscriber neither misses nor repeats a
    /// publication.
    pub fn subscribe(&self) -> SessionSubscription {
        let latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        SessionSubscription {
            pending: Some(Arc::clone(&*latest)),
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Read-only view of the snapshot feed.
#[derive(Debug)]
pub struct SessionSubscription {
    pending: Option<Arc<LiveSessionState>>,
    receiver: broadcast::Receiver<Arc<LiveSessionState>>,
}

impl SessionSubscription {
    /// Next snapshot, or `None` once the feed is gone.
    pub async fn next(&mut self) -> Option<Arc<LiveSessionState>> {
        if let Some(state) = self.pending.take() {
            return Some(state);
        }
        loop {
            match self.receiver.recv().await {
                Ok(state) => return Some(state),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Session subscriber lagged; skipping ahead");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Adapt into a stream (used by the SSE endpoint).
    pub fn into_stream(self) -> impl Stream<Item = Arc<LiveSessionState>> + Send {
        stream::unfold(self, |mut subscription| async move {
            let state = subscription.next().await?;
            Some((state, subscription))
        })
    }
}
