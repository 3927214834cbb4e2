//! Eventos de decisão e fila de despacho.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DecisionKind, SessionSubject, SubjectDecision};

/// Decisão emitida pela conclusão de uma sessão.
///
/// Precisa ser despachada ao processo de origem; descartá-la deixaria o
/// processo parado em AwaitingJudgment.
#[must_use = "o evento de decisão deve ser despachado ao processo de origem"]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionEvent {
    pub session_id: String,
    pub election_id: String,
    pub subject: SessionSubject,
    pub decision: SubjectDecision,
    pub kind: DecisionKind,
    pub decided_at: DateTime<Utc>,
}

/// Evento cujo despacho falhou.
#[derive(Debug, Clone)]
pub struct FailedDispatch {
    pub event: DecisionEvent,
    pub error: String,
}

/// Fila de eventos pendentes de despacho.
#[derive(Debug, Default)]
pub struct DecisionOutbox {
    pending: VecDeque<DecisionEvent>,
    failed: Vec<FailedDispatch>,
}

impl DecisionOutbox {
    /// Cria uma fila vazia.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enfileira um evento.
    pub fn push(&mut self, event: DecisionEvent) {
        self.pending.push_back(event);
    }

    /// Retira o próximo evento.
    pub fn pop(&mut self) -> Option<DecisionEvent> {
        self.pending.pop_front()
    }

    /// Guarda um evento cujo despacho falhou.
    pub fn fail(&mut self, event: DecisionEvent, error: impl Into<String>) {
        self.failed.push(FailedDispatch {
            event,
            error: error.into(),
        });
    }

    /// Devolve os eventos com falha à fila, para nova tentativa.
    pub fn requeue_failed(&mut self) -> usize {
        let n = self.failed.len();
        for failed in self.failed.drain(..) {
            self.pending.push_back(failed.event);
        }
        n
    }

    /// Eventos com falha.
    pub fn failed(&self) -> &[FailedDispatch] {
        &self.failed
    }

    /// Eventos pendentes.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
