//! Hooks padrão.
//!
//! - `LoggingHook`: registra transições, decisões e apurações no log
//! - `MetricsHook`: contadores de transições, decisões e apurações

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::adjudication::DecisionKind;
use crate::EleitoralResult;

use super::{Hook, HookContext, HookEvent};

// ═══════════════════════════════════════════════════════════════════════════
// LoggingHook
// ═══════════════════════════════════════════════════════════════════════════

/// Hook que registra a atividade do núcleo no log (tracing).
#[derive(Debug, Default)]
pub struct LoggingHook;

impl LoggingHook {
    /// Cria um novo LoggingHook.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Hook for LoggingHook {
    fn name(&self) -> &str {
        "logging"
    }

    fn events(&self) -> &[HookEvent] {
        &[
            HookEvent::Transition,
            HookEvent::Decision,
            HookEvent::TallyFinalized,
        ]
    }

    async fn execute(&self, context: &HookContext<'_>) -> EleitoralResult<()> {
        match context {
            HookContext::Transition(info) => {
                tracing::info!(
                    kind = info.kind,
                    id = %info.id,
                    operation = %info.operation,
                    from = %info.from,
                    to = %info.to,
                    actor = %info.actor,
                    "Transition committed"
                );
            }
            HookContext::Decision { event } => {
                tracing::info!(
                    session_id = %event.session_id,
                    subject = %event.subject,
                    decision = %event.decision,
                    kind = %event.kind,
                    "Decision dispatched"
                );
            }
            HookContext::TallyFinalized { tally } => {
                if let Some(result) = &tally.result {
                    tracing::info!(
                        tally_id = %tally.id,
                        election_id = %tally.election_id,
                        total = result.total,
                        valid = result.valid,
                        winner = ?tally.winner,
                        "Tally sealed"
                    );

                    if !result.anomalies.is_empty() {
                        tracing::warn!(
                            tally_id = %tally.id,
                            anomalies = result.anomalies.len(),
                            "Tally sealed with anomalies - review required"
                        );
                    }
                }
            }
        }

        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// MetricsHook
// ═══════════════════════════════════════════════════════════════════════════

/// Hook que coleta métricas.
#[derive(Debug, Default)]
pub struct MetricsHook {
    /// Total de transições gravadas.
    transitions: AtomicU64,

    /// Decisões unânimes.
    unanimous: AtomicU64,

    /// Decisões por maioria.
    majority: AtomicU64,

    /// Decisões por voto de qualidade.
    casting: AtomicU64,

    /// Apurações seladas.
    tallies: AtomicU64,

    /// Anomalias encontradas nas apurações seladas.
    anomalies: AtomicU64,
}

impl MetricsHook {
    /// Cria um novo MetricsHook.
    pub fn new() -> Self {
        Self::default()
    }

    /// Retorna o total de transições.
    pub fn total_transitions(&self) -> u64 {
        self.transitions.load(Ordering::Relaxed)
    }

    /// Retorna o total de decisões.
    pub fn total_decisions(&self) -> u64 {
        self.unanimous.load(Ordering::Relaxed)
            + self.majority.load(Ordering::Relaxed)
            + self.casting.load(Ordering::Relaxed)
    }

    /// Fração das decisões que exigiram voto de qualidade.
    pub fn casting_vote_rate(&self) -> f64 {
        let total = self.total_decisions();
        if total == 0 {
            0.0
        } else {
            self.casting.load(Ordering::Relaxed) as f64 / total as f64
        }
    }

    /// Retorna as métricas em formato estruturado.
    pub fn metrics(&self) -> Metrics {
        Metrics {
            transitions: self.total_transitions(),
            decisions: self.total_decisions(),
            unanimous: self.unanimous.load(Ordering::Relaxed),
            casting_votes: self.casting.load(Ordering::Relaxed),
            tallies_sealed: self.tallies.load(Ordering::Relaxed),
            anomalies: self.anomalies.load(Ordering::Relaxed),
        }
    }
}

/// Métricas coletadas pelo MetricsHook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metrics {
    pub transitions: u64,
    pub decisions: u64,
    pub unanimous: u64,
    pub casting_votes: u64,
    pub tallies_sealed: u64,
    pub anomalies: u64,
}

#[async_trait]
impl Hook for MetricsHook {
    fn name(&self) -> &str {
        "metrics"
    }

    fn events(&self) -> &[HookEvent] {
        &[
            HookEvent::Transition,
            HookEvent::Decision,
            HookEvent::TallyFinalized,
        ]
    }

    async fn execute(&self, context: &HookContext<'_>) -> EleitoralResult<()> {
        match context {
            HookContext::Transition(_) => {
                self.transitions.fetch_add(1, Ordering::Relaxed);
            }
            HookContext::Decision { event } => {
                let counter = match event.kind {
                    DecisionKind::Unanimous => &self.unanimous,
                    DecisionKind::Majority => &self.majority,
                    DecisionKind::CastingVote => &self.casting,
                };
                counter.fetch_add(1, Ordering::Relaxed);
            }
            HookContext::TallyFinalized { tally } => {
                self.tallies.fetch_add(1, Ordering::Relaxed);
                let anomalies = tally
                    .result
                    .as_ref()
                    .map(|r| r.anomalies.len() as u64)
                    .unwrap_or(0);
                self.anomalies.fetch_add(anomalies, Ordering::Relaxed);
            }
        }

        Ok(())
    }
}
