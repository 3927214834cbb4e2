//! Ciclo de vida da eleição.
//!
//! A fase avança de forma monotônica; chegar em `Concluded` encerra a eleição.
//! Suspensão é reversível, cancelamento é terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::store::Entity;
use crate::types::history::{require_reason, History};
use crate::types::identity::{Actor, Claim};
use crate::types::new_id;
use crate::{EleitoralError, EleitoralResult};

const KIND: &str = "election";

/// Status da eleição.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ElectionStatus {
    NotStarted,
    Ongoing,
    Suspended,
    Cancelled,
    Closed,
}

impl std::fmt::Display for ElectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElectionStatus::NotStarted => write!(f, "not_started"),
            ElectionStatus::Ongoing => write!(f, "ongoing"),
            ElectionStatus::Suspended => write!(f, "suspended"),
            ElectionStatus::Cancelled => write!(f, "cancelled"),
            ElectionStatus::Closed => write!(f, "closed"),
        }
    }
}

/// Fase do calendário eleitoral. A ordem das variantes é a ordem do calendário.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ElectionPhase {
    Registration,
    Review,
    Voting,
    Tally,
    Appeals,
    Concluded,
}

impl ElectionPhase {
    /// Próxima fase, se houver.
    pub fn next(self) -> Option<Self> {
        match self {
            ElectionPhase::Registration => Some(ElectionPhase::Review),
            ElectionPhase::Review => Some(ElectionPhase::Voting),
            ElectionPhase::Voting => Some(ElectionPhase::Tally),
            ElectionPhase::Tally => Some(ElectionPhase::Appeals),
            ElectionPhase::Appeals => Some(ElectionPhase::Concluded),
            ElectionPhase::Concluded => None,
        }
    }
}

impl std::fmt::Display for ElectionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElectionPhase::Registration => write!(f, "registration"),
            ElectionPhase::Review => write!(f, "review"),
            ElectionPhase::Voting => write!(f, "voting"),
            ElectionPhase::Tally => write!(f, "tally"),
            ElectionPhase::Appeals => write!(f, "appeals"),
            ElectionPhase::Concluded => write!(f, "concluded"),
        }
    }
}

/// Uma eleição.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Election {
    pub id: String,
    pub name: String,
    pub status: ElectionStatus,
    pub phase: ElectionPhase,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub history: History,
    #[serde(default)]
    pub version: u64,
}

impl Election {
    /// Cria uma eleição ainda não iniciada, na fase de registro.
    pub fn new(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            status: ElectionStatus::NotStarted,
            phase: ElectionPhase::Registration,
            created_at: now,
            started_at: None,
            ended_at: None,
            history: History::new(),
            version: 0,
        }
    }

    /// NotStarted → Ongoing.
    pub fn start(&self, actor: &Actor, now: DateTime<Utc>) -> EleitoralResult<Self> {
        actor.require(Claim::Admin)?;
        self.expect(&[ElectionStatus::NotStarted], "start")?;

        let mut next = self.clone();
        next.status = ElectionStatus::Ongoing;
        next.started_at = Some(now);
        next.history
            .record(now, &actor.id, "start", self.status, next.status, None);
        Ok(next)
    }

    /// Avança para a próxima fase. Chegar em `Concluded` fecha a eleição.
    pub fn advance_phase(&self, actor: &Actor, now: DateTime<Utc>) -> EleitoralResult<Self> {
        actor.require(Claim::Admin)?;
        self.expect(&[ElectionStatus::Ongoing], "advance_phase")?;

        let phase = self
            .phase
            .next()
            .ok_or_else(|| EleitoralError::invalid_transition(KIND, self.phase, "advance_phase"))?;

        let mut next = self.clone();
        next.phase = phase;
        if phase == ElectionPhase::Concluded {
            next.status = ElectionStatus::Closed;
            next.ended_at = Some(now);
        }
        next.history
            .record(now, &actor.id, "advance_phase", self.phase, phase, None);

        info!(election = %self.id, from = %self.phase, to = %phase, "Fase avançada");
        Ok(next)
    }

    /// Ongoing → Suspended.
    pub fn suspend(&self, actor: &Actor, reason: &str, now: DateTime<Utc>) -> EleitoralResult<Self> {
        actor.require(Claim::Admin)?;
        let reason = require_reason(reason)?;
        self.expect(&[ElectionStatus::Ongoing], "suspend")?;

        let mut next = self.clone();
        next.status = ElectionStatus::Suspended;
        next.history
            .record(now, &actor.id, "suspend", self.status, next.status, Some(reason));
        Ok(next)
    }

    /// Suspended → Ongoing.
    pub fn resume(&self, actor: &Actor, now: DateTime<Utc>) -> EleitoralResult<Self> {
        actor.require(Claim::Admin)?;
        self.expect(&[ElectionStatus::Suspended], "resume")?;

        let mut next = self.clone();
        next.status = ElectionStatus::Ongoing;
        next.history
            .record(now, &actor.id, "resume", self.status, next.status, None);
        Ok(next)
    }

    /// Cancela a eleição (terminal).
    pub fn cancel(&self, actor: &Actor, reason: &str, now: DateTime<Utc>) -> EleitoralResult<Self> {
        actor.require(Claim::Admin)?;
        let reason = require_reason(reason)?;
        self.expect(
            &[
                ElectionStatus::NotStarted,
                ElectionStatus::Ongoing,
                ElectionStatus::Suspended,
            ],
            "cancel",
        )?;

        let mut next = self.clone();
        next.status = ElectionStatus::Cancelled;
        next.ended_at = Some(now);
        next.history
            .record(now, &actor.id, "cancel", self.status, next.status, Some(reason));
        Ok(next)
    }

    /// Verifica se a eleição está em andamento em uma das fases dadas.
    pub fn is_in_phase(&self, phases: &[ElectionPhase]) -> bool {
        self.status == ElectionStatus::Ongoing && phases.contains(&self.phase)
    }

    fn expect(&self, allowed: &[ElectionStatus], operation: &'static str) -> EleitoralResult<()> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(EleitoralError::invalid_transition(KIND, self.status, operation))
        }
    }
}

impl Entity for Election {
    const KIND: &'static str = KIND;

    fn id(&self) -> &str {
        &self.id
    }

    fn election_id(&self) -> &str {
        &self.id
    }

    fn status_label(&self) -> String {
        self.status.to_string()
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}
