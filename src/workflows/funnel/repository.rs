use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::FunnelStructure;

/// Persisted library entry for a generated funnel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelRecord {
    pub funnel: FunnelStructure,
    pub saved_at: NaiveDateTime,
}

/// Storage abstraction for the funnel library. Writes are last-writer-wins at
/// the record level; concurrent edits to the same generation target are not
/// an expected access pattern for this workload.
pub trait FunnelRepository: Send + Sync {
    fn save(&self, funnel: FunnelStructure) -> Result<FunnelRecord, FunnelRepositoryError>;
    fn fetch(&self, id: &str) -> Result<Option<FunnelRecord>, FunnelRepositoryError>;
    fn list(&self) -> Result<Vec<FunnelRecord>, FunnelRepositoryError>;
}

/// Error enumeration for funnel library failures.
#[derive(Debug, thiserror::Error)]
pub enum FunnelRepositoryError {
    #[error("funnel library unavailable: {0}")]
    Unavailable(String),
}

/// Mutex-guarded library used by tests and the demo server.
#[derive(Debug, Default)]
pub struct InMemoryFunnelRepository {
    records: Mutex<BTreeMap<String, FunnelRecord>>,
}

impl InMemoryFunnelRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FunnelRepository for InMemoryFunnelRepository {
    fn save(&self, funnel: FunnelStructure) -> Result<FunnelRecord, FunnelRepositoryError> {
        let record = FunnelRecord {
            funnel,
            saved_at: Utc::now().naive_utc(),
        };

        let mut records = self
            .records
            .lock()
            .map_err(|_| FunnelRepositoryError::Unavailable("funnel library poisoned".to_string()))?;
        records.insert(record.funnel.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &str) -> Result<Option<FunnelRecord>, FunnelRepositoryError> {
        let records = self
            .records
            .lock()
            .map_err(|_| FunnelRepositoryError::Unavailable("funnel library poisoned".to_string()))?;
        Ok(records.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<FunnelRecord>, FunnelRepositoryError> {
        let records = self
            .records
            .lock()
            .map_err(|_| FunnelRepositoryError::Unavailable("funnel library poisoned".to_string()))?;
        Ok(records.values().cloned().collect())
    }
}
