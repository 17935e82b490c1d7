//! Upload sessions.
//!
//! Each upload is parsed once and kept in memory under a random id so the
//! dashboard can re-filter it without re-reading the file. The store is
//! bounded: inserting past capacity evicts the oldest session.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use uuid::Uuid;

use crate::transform::ProcessedLog;

/// A processed upload with metadata
#[derive(Debug, Clone)]
pub struct StoredSession {
    pub id: Uuid,
    pub file_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed: Arc<ProcessedLog>,
}

/// Listing entry, without the table itself
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: Uuid,
    pub file_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub rows: usize,
}

impl StoredSession {
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            file_name: self.file_name.clone(),
            created_at: self.created_at,
            rows: self.processed.log.len(),
        }
    }
}

/// In-memory session registry, oldest first
#[derive(Debug)]
pub struct SessionStore {
    sessions: HashMap<Uuid, StoredSession>,
    order: VecDeque<Uuid>,
    capacity: usize,
}

impl SessionStore {
    /// A store holding at most `capacity` sessions (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Store a processed upload and return its id.
    pub fn insert(&mut self, processed: Arc<ProcessedLog>) -> Uuid {
        while self.sessions.len() >= self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.sessions.remove(&oldest);
        }

        let id = Uuid::new_v4();
        let stored = StoredSession {
            id,
            file_name: processed.source.file_name.clone(),
            created_at: Utc::now(),
            processed,
        };

        self.sessions.insert(id, stored);
        self.order.push_back(id);
        id
    }

    /// Get a session by id
    pub fn get(&self, id: &Uuid) -> Option<&StoredSession> {
        self.sessions.get(id)
    }

    /// Shared handle to the processed log of a session
    pub fn processed(&self, id: &Uuid) -> Option<Arc<ProcessedLog>> {
        self.sessions.get(id).map(|s| Arc::clone(&s.processed))
    }

    /// Live sessions, oldest first.
    pub fn summaries(&self) -> Vec<SessionSummary> {
        self.order
            .iter()
            .filter_map(|id| self.get(id))
            .map(StoredSession::summary)
            .collect()
    }

    /// Drop a session. Returns false if it did not exist.
    pub fn remove(&mut self, id: &Uuid) -> bool {
        if self.sessions.remove(id).is_none() {
            return false;
        }
        self.order.retain(|existing| existing != id);
        true
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
