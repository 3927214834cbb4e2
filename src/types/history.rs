//! Histórico append-only das transições de cada entidade.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Uma entrada do histórico.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Momento da transição.
    pub at: DateTime<Utc>,

    /// Ator que executou a operação.
    pub actor: String,

    /// Nome da operação.
    pub operation: String,

    /// Status anterior.
    pub from: String,

    /// Status resultante.
    pub to: String,

    /// Motivo ou observação.
    #[serde(default)]
    pub note: Option<String>,
}

/// Log de histórico. Só cresce: não há API de remoção ou edição.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct History(Vec<HistoryEntry>);

impl History {
    /// Cria um histórico vazio.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Acrescenta uma entrada.
    pub fn record(
        &mut self,
        at: DateTime<Utc>,
        actor: &str,
        operation: &str,
        from: impl std::fmt::Display,
        to: impl std::fmt::Display,
        note: Option<String>,
    ) {
        self.0.push(HistoryEntry {
            at,
            actor: actor.to_string(),
            operation: operation.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            note,
        });
    }

    /// Entradas em ordem cronológica.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.0
    }

    /// Última entrada.
    pub fn last(&self) -> Option<&HistoryEntry> {
        self.0.last()
    }

    /// Número de entradas.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Indica se o histórico está vazio.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Exige um motivo não vazio, devolvendo-o aparado.
pub fn require_reason(reason: &str) -> crate::EleitoralResult<String> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err(crate::types::errors::Violation::MissingReason.into());
    }
    Ok(trimmed.to_string())
}
