//! Store em memória.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{EleitoralError, EleitoralResult};

use super::{RecordFilter, Store, StoredRecord};

/// Store em memória com verificação de versão.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<(&'static str, String), StoredRecord>>,
}

impl MemoryStore {
    /// Cria um store vazio.
    pub fn new() -> Self {
        Self::default()
    }

    /// Número total de registros.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Verifica se está vazio.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn load(&self, kind: &'static str, id: &str) -> EleitoralResult<Option<StoredRecord>> {
        let records = self.records.read().await;
        Ok(records.get(&(kind, id.to_string())).cloned())
    }

    async fn save(&self, mut record: StoredRecord) -> EleitoralResult<u64> {
        let mut records = self.records.write().await;
        let key = (record.kind, record.id.clone());
        let stored_version = records.get(&key).map(|r| r.version).unwrap_or(0);

        if stored_version != record.version {
            return Err(EleitoralError::ConcurrencyConflict {
                kind: record.kind,
                id: record.id,
                expected: record.version,
            });
        }

        record.version += 1;
        let version = record.version;
        records.insert(key, record);
        Ok(version)
    }

    async fn list(
        &self,
        kind: &'static str,
        filter: &RecordFilter,
    ) -> EleitoralResult<Vec<StoredRecord>> {
        let records = self.records.read().await;
        let mut found: Vec<StoredRecord> = records
            .values()
            .filter(|r| r.kind == kind && filter.matches(r))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(found)
    }

    async fn delete(
        &self,
        kind: &'static str,
        id: &str,
        expected_version: u64,
    ) -> EleitoralResult<()> {
        let mut records = self.records.write().await;
        let key = (kind, id.to_string());
        match records.get(&key) {
            None => Err(EleitoralError::not_found(kind, id)),
            Some(r) if r.version != expected_version => Err(EleitoralError::ConcurrencyConflict {
                kind,
                id: id.to_string(),
                expected: expected_version,
            }),
            Some(_) => {
                records.remove(&key);
                Ok(())
            }
        }
    }
}
