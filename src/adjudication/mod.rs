//! Sessões de julgamento colegiado.
//!
//! Uma sessão reúne o colegiado, colhe votos e, com quórum, produz uma decisão
//! imutável. A conclusão emite um [`DecisionEvent`] que o serviço despacha ao
//! processo de origem; a sessão não conhece o processo que julga.

mod events;
mod rules;
mod session;

pub use events::{DecisionEvent, DecisionOutbox, FailedDispatch};
pub use rules::{MotionOutcome, VoteCount};
pub use session::{AdjudicationSession, ConcludedSession, SessionStatus};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Resultado do julgamento.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Procedente.
    Upheld,
    /// Improcedente.
    Dismissed,
    /// Parcialmente procedente.
    PartiallyUpheld,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Upheld => write!(f, "upheld"),
            Verdict::Dismissed => write!(f, "dismissed"),
            Verdict::PartiallyUpheld => write!(f, "partially_upheld"),
        }
    }
}

/// Decisão de uma sessão de recurso de candidatura.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppealRuling {
    /// Candidatura mantida.
    Maintained,
    /// Candidatura cassada.
    Revoked,
}

impl std::fmt::Display for AppealRuling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppealRuling::Maintained => write!(f, "maintained"),
            AppealRuling::Revoked => write!(f, "revoked"),
        }
    }
}

/// Objeto do julgamento.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case", tag = "type", content = "id")]
pub enum SessionSubject {
    Complaint(String),
    Challenge(String),
    /// Recurso de candidatura, identificado pela chapa.
    CandidacyAppeal(String),
}

impl SessionSubject {
    /// Identificador da entidade julgada.
    pub fn entity_id(&self) -> &str {
        match self {
            SessionSubject::Complaint(id)
            | SessionSubject::Challenge(id)
            | SessionSubject::CandidacyAppeal(id) => id,
        }
    }
}

impl std::fmt::Display for SessionSubject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionSubject::Complaint(id) => write!(f, "complaint:{}", id),
            SessionSubject::Challenge(id) => write!(f, "challenge:{}", id),
            SessionSubject::CandidacyAppeal(id) => write!(f, "candidacy_appeal:{}", id),
        }
    }
}

/// Voto de um membro do colegiado.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VoteChoice {
    For,
    Against,
    Abstain,
}

impl std::fmt::Display for VoteChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoteChoice::For => write!(f, "for"),
            VoteChoice::Against => write!(f, "against"),
            VoteChoice::Abstain => write!(f, "abstain"),
        }
    }
}

/// Voto registrado.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CastVote {
    pub member_id: String,
    pub choice: VoteChoice,
    #[serde(default)]
    pub justification: Option<String>,
    pub cast_at: DateTime<Utc>,
}

/// Como a decisão foi alcançada.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Unanimous,
    Majority,
    CastingVote,
}

impl std::fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionKind::Unanimous => write!(f, "unanimous"),
            DecisionKind::Majority => write!(f, "majority"),
            DecisionKind::CastingVote => write!(f, "casting_vote"),
        }
    }
}

/// Decisão conforme o tipo de objeto julgado.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubjectDecision {
    /// Denúncia ou impugnação.
    Verdict(Verdict),
    /// Recurso de candidatura.
    Appeal(AppealRuling),
}

impl std::fmt::Display for SubjectDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubjectDecision::Verdict(v) => write!(f, "{}", v),
            SubjectDecision::Appeal(r) => write!(f, "{}", r),
        }
    }
}

/// Registro imutável da decisão de uma sessão.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionDecision {
    pub outcome: SubjectDecision,
    pub kind: DecisionKind,
    pub count: VoteCount,
    pub rationale: String,
    pub decided_by: String,
    pub decided_at: DateTime<Utc>,
}
