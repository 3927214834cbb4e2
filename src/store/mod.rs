//! Colaborador de persistência.
//!
//! Cada entidade é gravada como um registro versionado. Gravações usam
//! concorrência otimista: o chamador informa a versão que carregou e a
//! gravação falha com [`EleitoralError::ConcurrencyConflict`] se outra escrita
//! aconteceu no meio. O núcleo nunca tenta novamente por conta própria.
//!
//! ## Implementações
//!
//! - [`MemoryStore`]: em memória, para testes e simulações
//! - [`SqliteStore`]: SQLite com corpo JSON e coluna de versão

mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::MemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{EleitoralError, EleitoralResult};

/// Entidade persistível.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Nome da coleção/tipo.
    const KIND: &'static str;

    /// Identificador.
    fn id(&self) -> &str;

    /// Eleição à qual a entidade pertence.
    fn election_id(&self) -> &str;

    /// Status atual, usado para consultas por status.
    fn status_label(&self) -> String;

    /// Versão carregada (0 para entidade ainda não gravada).
    fn version(&self) -> u64;

    /// Atualiza a versão após uma gravação.
    fn set_version(&mut self, version: u64);
}

/// Registro bruto gravado pelo [`Store`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub kind: &'static str,
    pub id: String,
    pub election_id: String,
    pub status: String,
    pub version: u64,
    pub body: serde_json::Value,
}

/// Filtro de listagem.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub election_id: Option<String>,
    pub status: Option<String>,
}

impl RecordFilter {
    /// Filtra por eleição.
    pub fn election(election_id: impl Into<String>) -> Self {
        Self {
            election_id: Some(election_id.into()),
            status: None,
        }
    }

    /// Filtra por status.
    pub fn status(status: impl Into<String>) -> Self {
        Self {
            election_id: None,
            status: Some(status.into()),
        }
    }

    /// Verifica se o registro atende ao filtro.
    pub fn matches(&self, record: &StoredRecord) -> bool {
        self.election_id
            .as_ref()
            .map_or(true, |e| *e == record.election_id)
            && self.status.as_ref().map_or(true, |s| *s == record.status)
    }
}

/// Carga e gravação de registros com concorrência otimista.
#[async_trait]
pub trait Store: Send + Sync {
    /// Carrega um registro.
    async fn load(&self, kind: &'static str, id: &str) -> EleitoralResult<Option<StoredRecord>>;

    /// Grava um registro. `record.version` é a versão carregada pelo chamador
    /// (0 = inserção). Retorna a nova versão.
    async fn save(&self, record: StoredRecord) -> EleitoralResult<u64>;

    /// Lista registros de um tipo.
    async fn list(
        &self,
        kind: &'static str,
        filter: &RecordFilter,
    ) -> EleitoralResult<Vec<StoredRecord>>;

    /// Remove um registro na versão esperada.
    async fn delete(&self, kind: &'static str, id: &str, expected_version: u64)
        -> EleitoralResult<()>;
}

/// Repositório tipado sobre um [`Store`].
pub struct Repository<E> {
    store: Arc<dyn Store>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Repository<E> {
    /// Cria um repositório.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    /// Busca por id, retornando `NotFound` se ausente.
    pub async fn get(&self, id: &str) -> EleitoralResult<E> {
        self.find(id)
            .await?
            .ok_or_else(|| EleitoralError::not_found(E::KIND, id))
    }

    /// Busca por id.
    pub async fn find(&self, id: &str) -> EleitoralResult<Option<E>> {
        match self.store.load(E::KIND, id).await? {
            Some(record) => Ok(Some(Self::decode(record)?)),
            None => Ok(None),
        }
    }

    /// Grava a entidade e devolve-a com a nova versão.
    pub async fn save(&self, mut entity: E) -> EleitoralResult<E> {
        let record = StoredRecord {
            kind: E::KIND,
            id: entity.id().to_string(),
            election_id: entity.election_id().to_string(),
            status: entity.status_label(),
            version: entity.version(),
            body: serde_json::to_value(&entity)?,
        };
        let version = self.store.save(record).await?;
        entity.set_version(version);
        Ok(entity)
    }

    /// Lista entidades de uma eleição.
    pub async fn by_election(&self, election_id: &str) -> EleitoralResult<Vec<E>> {
        self.list(&RecordFilter::election(election_id)).await
    }

    /// Lista entidades em um status.
    pub async fn by_status(&self, status: impl std::fmt::Display) -> EleitoralResult<Vec<E>> {
        self.list(&RecordFilter::status(status.to_string())).await
    }

    /// Lista com filtro arbitrário.
    pub async fn list(&self, filter: &RecordFilter) -> EleitoralResult<Vec<E>> {
        self.store
            .list(E::KIND, filter)
            .await?
            .into_iter()
            .map(Self::decode)
            .collect()
    }

    /// Remove a entidade na versão carregada.
    pub async fn delete(&self, entity: &E) -> EleitoralResult<()> {
        self.store
            .delete(E::KIND, entity.id(), entity.version())
            .await
    }

    fn decode(record: StoredRecord) -> EleitoralResult<E> {
        let mut entity: E = serde_json::from_value(record.body)?;
        entity.set_version(record.version);
        Ok(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Note {
        id: String,
        election_id: String,
        status: String,
        #[serde(skip)]
        version: u64,
    }

    impl Entity for Note {
        const KIND: &'static str = "note";

        fn id(&self) -> &str {
            &self.id
        }

        fn election_id(&self) -> &str {
            &self.election_id
        }

        fn status_label(&self) -> String {
            self.status.clone()
        }

        fn version(&self) -> u64 {
            self.version
        }

        fn set_version(&mut self, version: u64) {
            self.version = version;
        }
    }

    fn note(id: &str, status: &str) -> Note {
        Note {
            id: id.to_string(),
            election_id: "e-1".to_string(),
            status: status.to_string(),
            version: 0,
        }
    }

    #[tokio::test]
    async fn test_repository_roundtrip_and_versions() {
        let repo: Repository<Note> = Repository::new(Arc::new(MemoryStore::new()));

        let saved = repo.save(note("n-1", "open")).await.unwrap();
        assert_eq!(saved.version(), 1);

        let loaded = repo.get("n-1").await.unwrap();
        assert_eq!(loaded.version(), 1);

        let mut updated = loaded.clone();
        updated.status = "closed".to_string();
        let updated = repo.save(updated).await.unwrap();
        assert_eq!(updated.version(), 2);

        assert_eq!(repo.by_status("closed").await.unwrap().len(), 1);
        assert_eq!(repo.by_election("e-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stale_write_fails() {
        let repo: Repository<Note> = Repository::new(Arc::new(MemoryStore::new()));
        let saved = repo.save(note("n-1", "open")).await.unwrap();

        let first = saved.clone();
        let second = saved;
        repo.save(first).await.unwrap();

        let err = repo.save(second).await.unwrap_err();
        assert!(matches!(err, EleitoralError::ConcurrencyConflict { .. }));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let repo: Repository<Note> = Repository::new(Arc::new(MemoryStore::new()));
        let err = repo.get("nope").await.unwrap_err();
        assert!(matches!(err, EleitoralError::NotFound { kind: "note", .. }));
    }
}
