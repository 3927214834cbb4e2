//! Rodadas com prazo do processo contencioso.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::deadline::Deadline;
use crate::types::config::DeadlinesConfig;

use super::ProcessStatus;

/// Tipo de rodada.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RoundKind {
    Defense,
    Allegations,
    CounterAllegations,
}

impl RoundKind {
    /// Status enquanto a rodada está aberta.
    pub fn awaiting(self) -> ProcessStatus {
        match self {
            RoundKind::Defense => ProcessStatus::AwaitingDefense,
            RoundKind::Allegations => ProcessStatus::AwaitingAllegations,
            RoundKind::CounterAllegations => ProcessStatus::AwaitingCounterAllegations,
        }
    }

    /// Status após manifestação tempestiva.
    pub fn presented(self) -> ProcessStatus {
        match self {
            RoundKind::Defense => ProcessStatus::DefensePresented,
            RoundKind::Allegations => ProcessStatus::AllegationsPresented,
            RoundKind::CounterAllegations => ProcessStatus::CounterAllegationsPresented,
        }
    }

    /// Status após o fechamento de uma janela sem manifestação.
    pub fn not_presented(self) -> ProcessStatus {
        match self {
            RoundKind::Defense => ProcessStatus::DefenseNotPresented,
            RoundKind::Allegations => ProcessStatus::AllegationsNotPresented,
            RoundKind::CounterAllegations => ProcessStatus::CounterAllegationsNotPresented,
        }
    }

    /// Rodada reservada ao autor do processo; as demais cabem à parte demandada.
    pub fn by_author(self) -> bool {
        matches!(self, RoundKind::CounterAllegations)
    }

    /// Prazo configurado, em dias.
    pub fn days(self, config: &DeadlinesConfig) -> i64 {
        match self {
            RoundKind::Defense => config.defense_days,
            RoundKind::Allegations => config.allegations_days,
            RoundKind::CounterAllegations => config.counter_allegations_days,
        }
    }
}

impl std::fmt::Display for RoundKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoundKind::Defense => write!(f, "defense"),
            RoundKind::Allegations => write!(f, "allegations"),
            RoundKind::CounterAllegations => write!(f, "counter_allegations"),
        }
    }
}

/// Manifestação apresentada em uma rodada.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Submission {
    pub actor_id: String,
    pub content: String,
    pub submitted_at: DateTime<Utc>,
}

/// Tentativa de manifestação após o prazo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LateSubmission {
    pub round: RoundKind,
    pub actor_id: String,
    pub attempted_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
}

/// Uma rodada aberta.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Round {
    pub kind: RoundKind,
    pub deadline: Deadline,
    #[serde(default)]
    pub submission: Option<Submission>,
    /// Fechada por decurso de prazo.
    #[serde(default)]
    pub lapsed: bool,
}

impl Round {
    pub(crate) fn open(kind: RoundKind, deadline: Deadline) -> Self {
        Self {
            kind,
            deadline,
            submission: None,
            lapsed: false,
        }
    }

    /// Rodada encerrada (com ou sem manifestação).
    pub fn is_closed(&self) -> bool {
        self.submission.is_some() || self.lapsed
    }
}
