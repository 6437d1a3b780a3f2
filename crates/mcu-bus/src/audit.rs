//! # Audit Log Sink
//!
//! A bus consumer that keeps every operational event as an audit entry.
//! Entries start unread; operators page through them, mark them read, and
//! delete them. The log holds at most its retention cap; once full, the
//! oldest entry is evicted for each new one.

use crate::events::{EventChannel, EventFilter, EventKind, OperationalEvent};
use crate::publisher::InMemoryEventBus;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

/// Entries returned per page.
pub const AUDIT_PAGE_SIZE: usize = 20;

/// Entries kept by [`AuditLog::new`].
pub const DEFAULT_AUDIT_RETENTION: usize = 10_000;

/// Errors from audit log operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditError {
    /// Pages are numbered from 1.
    #[error("invalid page: {0} (pages start at 1)")]
    InvalidPage(usize),

    /// No entry with this id.
    #[error("audit entry not found: {0}")]
    NotFound(Uuid),
}

/// A recorded operational event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    /// Channel the event arrived on (`error` or `info`).
    #[serde(rename = "type")]
    pub channel: EventChannel,
    pub kind: EventKind,
    pub event: String,
    pub message: String,
    pub inprotype: bool,
    pub read: bool,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    fn from_event(event: OperationalEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: event.channel,
            kind: event.kind,
            event: event.event,
            message: event.message,
            inprotype: event.inprotype,
            read: false,
            recorded_at: event.occurred_at,
        }
    }
}

/// In-memory audit log, oldest entry first.
pub struct AuditLog {
    entries: RwLock<VecDeque<AuditEntry>>,
    retention: usize,
}

impl AuditLog {
    #[must_use]
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_AUDIT_RETENTION)
    }

    /// Create a log holding at most `retention` entries (minimum one).
    #[must_use]
    pub fn with_retention(retention: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::new()),
            retention: retention.max(1),
        }
    }

    /// Maximum number of entries held.
    #[must_use]
    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Record an event, returning the new entry's id.
    ///
    /// Evicts the oldest entry, read or not, when the log is full.
    pub fn record(&self, event: OperationalEvent) -> Uuid {
        let entry = AuditEntry::from_event(event);
        let id = entry.id;
        let mut entries = self.entries.write();
        if entries.len() >= self.retention {
            if let Some(evicted) = entries.pop_front() {
                debug!(entry = %evicted.id, "Audit entry evicted");
            }
        }
        entries.push_back(entry);
        id
    }

    /// Number of entries held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// One page of all entries.
    pub fn all(&self, page: usize) -> Result<Vec<AuditEntry>, AuditError> {
        self.page_where(page, |_| true)
    }

    /// One page of unread `error`-channel entries.
    pub fn unread_errors(&self, page: usize) -> Result<Vec<AuditEntry>, AuditError> {
        self.page_where(page, |entry| {
            entry.channel == EventChannel::Error && !entry.read
        })
    }

    /// Count of unread entries grouped by channel. Channels with no unread
    /// entries are absent.
    #[must_use]
    pub fn unread_counts(&self) -> HashMap<EventChannel, usize> {
        let mut counts = HashMap::new();
        for entry in self.entries.read().iter().filter(|e| !e.read) {
            *counts.entry(entry.channel).or_insert(0) += 1;
        }
        counts
    }

    /// Mark an entry as read.
    pub fn mark_read(&self, id: Uuid) -> Result<(), AuditError> {
        let mut entries = self.entries.write();
        let entry = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(AuditError::NotFound(id))?;
        entry.read = true;
        Ok(())
    }

    /// Delete an entry.
    pub fn delete(&self, id: Uuid) -> Result<(), AuditError> {
        let mut entries = self.entries.write();
        let index = entries
            .iter()
            .position(|e| e.id == id)
            .ok_or(AuditError::NotFound(id))?;
        entries.remove(index);
        Ok(())
    }

    fn page_where<P>(&self, page: usize, predicate: P) -> Result<Vec<AuditEntry>, AuditError>
    where
        P: Fn(&AuditEntry) -> bool,
    {
        if page == 0 {
            return Err(AuditError::InvalidPage(page));
        }
        let skip = (page - 1) * AUDIT_PAGE_SIZE;
        Ok(self
            .entries
            .read()
            .iter()
            .filter(|e| predicate(e))
            .skip(skip)
            .take(AUDIT_PAGE_SIZE)
            .cloned()
            .collect())
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Background task feeding bus events into an [`AuditLog`].
pub struct AuditSink;

impl AuditSink {
    /// Subscribe to every channel and record events until the bus closes.
    ///
    /// The subscription is registered before this returns.
    pub fn spawn(bus: &InMemoryEventBus, log: Arc<AuditLog>) -> JoinHandle<()> {
        let mut subscription = bus.subscribe(EventFilter::all());
        tokio::spawn(async move {
            info!("Audit sink started");
            while let Some(event) = subscription.recv().await {
                let id = log.record(event);
                debug!(entry = %id, "Audit entry recorded");
            }
            info!("Audit sink stopped (bus closed)");
        })
    }
}
