//! Fonte dos registros de voto.
//!
//! Os registros são imutáveis e pertencem a um sistema externo; a apuração
//! apenas os lê.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::EleitoralResult;

/// Escolha registrada em uma cédula.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case", tag = "type", content = "slate_id")]
pub enum BallotChoice {
    Slate(String),
    Blank,
    Null,
}

impl std::fmt::Display for BallotChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BallotChoice::Slate(id) => write!(f, "slate:{}", id),
            BallotChoice::Blank => write!(f, "blank"),
            BallotChoice::Null => write!(f, "null"),
        }
    }
}

/// Registro imutável de um voto.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteRecord {
    pub ballot_id: String,
    pub election_id: String,
    pub choice: BallotChoice,
    pub cast_at: DateTime<Utc>,
}

impl VoteRecord {
    /// Cria um registro.
    pub fn new(
        ballot_id: impl Into<String>,
        election_id: impl Into<String>,
        choice: BallotChoice,
        cast_at: DateTime<Utc>,
    ) -> Self {
        Self {
            ballot_id: ballot_id.into(),
            election_id: election_id.into(),
            choice,
            cast_at,
        }
    }
}

/// Fonte de votos de uma eleição.
#[async_trait]
pub trait VoteSource: Send + Sync {
    /// Todos os registros da eleição.
    async fn records(&self, election_id: &str) -> EleitoralResult<Vec<VoteRecord>>;

    /// Total de cédulas declarado pela urna/sistema de votação.
    async fn declared_total(&self, election_id: &str) -> EleitoralResult<u64>;

    /// Tamanho do eleitorado, quando conhecido.
    async fn electorate_size(&self, election_id: &str) -> EleitoralResult<Option<u64>>;
}

/// Votos de uma eleição em um arquivo JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoteBatch {
    pub election_id: String,
    /// Total declarado; quando ausente, assume a quantidade de registros.
    #[serde(default)]
    pub declared_total: Option<u64>,
    #[serde(default)]
    pub electorate_size: Option<u64>,
    pub records: Vec<VoteRecord>,
}

impl VoteBatch {
    /// Lê um lote de votos de um arquivo JSON.
    pub fn load<P: AsRef<Path>>(path: P) -> EleitoralResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Total declarado efetivo.
    pub fn declared(&self) -> u64 {
        self.declared_total.unwrap_or(self.records.len() as u64)
    }
}

/// Fonte de votos em memória.
#[derive(Default)]
pub struct MemoryVoteSource {
    batches: RwLock<HashMap<String, VoteBatch>>,
}

impl MemoryVoteSource {
    /// Cria uma fonte vazia.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra (ou substitui) o lote de uma eleição.
    pub async fn load_batch(&self, batch: VoteBatch) {
        self.batches
            .write()
            .await
            .insert(batch.election_id.clone(), batch);
    }
}

#[async_trait]
impl VoteSource for MemoryVoteSource {
    async fn records(&self, election_id: &str) -> EleitoralResult<Vec<VoteRecord>> {
        Ok(self
            .batches
            .read()
            .await
            .get(election_id)
            .map(|b| b.records.clone())
            .unwrap_or_default())
    }

    async fn declared_total(&self, election_id: &str) -> EleitoralResult<u64> {
        Ok(self
            .batches
            .read()
            .await
            .get(election_id)
            .map(|b| b.declared())
            .unwrap_or(0))
    }

    async fn electorate_size(&self, election_id: &str) -> EleitoralResult<Option<u64>> {
        Ok(self
            .batches
            .read()
            .await
            .get(election_id)
            .and_then(|b| b.electorate_size))
    }
}
