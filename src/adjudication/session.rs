//! Máquina de estados da sessão de julgamento.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::store::Entity;
use crate::types::errors::Violation;
use crate::types::history::{require_reason, History};
use crate::types::identity::{Actor, Claim};
use crate::types::{ensure_status, new_id};
use crate::{EleitoralError, EleitoralResult};

use super::events::DecisionEvent;
use super::rules::{MotionOutcome, VoteCount};
use super::{
    AppealRuling, CastVote, DecisionKind, SessionDecision, SessionSubject, SubjectDecision, Verdict,
    VoteChoice,
};

const KIND: &str = "adjudication_session";

/// Status da sessão.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Scheduled,
    InProgress,
    Suspended,
    Concluded,
    Cancelled,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Scheduled => write!(f, "scheduled"),
            SessionStatus::InProgress => write!(f, "in_progress"),
            SessionStatus::Suspended => write!(f, "suspended"),
            SessionStatus::Concluded => write!(f, "concluded"),
            SessionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Sessão de julgamento.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdjudicationSession {
    pub id: String,
    pub election_id: String,
    pub subject: SessionSubject,
    pub status: SessionStatus,
    /// Membros do colegiado.
    pub deciding_body: Vec<String>,
    pub presiding_member_id: String,
    pub quorum: usize,
    #[serde(default)]
    pub votes: Vec<CastVote>,
    #[serde(default)]
    pub decision: Option<SessionDecision>,
    pub created_at: DateTime<Utc>,
    pub history: History,
    #[serde(default)]
    pub version: u64,
}

/// Sessão concluída e o evento a despachar.
#[must_use = "o evento de decisão deve ser despachado ao processo de origem"]
#[derive(Debug, Clone)]
pub struct ConcludedSession {
    pub session: AdjudicationSession,
    pub event: DecisionEvent,
}

impl AdjudicationSession {
    /// Agenda uma sessão.
    pub fn schedule(
        actor: &Actor,
        election_id: impl Into<String>,
        subject: SessionSubject,
        deciding_body: Vec<String>,
        presiding_member_id: impl Into<String>,
        quorum: usize,
        now: DateTime<Utc>,
    ) -> EleitoralResult<Self> {
        actor.require(Claim::Adjudicator)?;
        let presiding_member_id = presiding_member_id.into();

        let mut body: Vec<String> = Vec::with_capacity(deciding_body.len());
        for member in deciding_body {
            if !body.contains(&member) {
                body.push(member);
            }
        }

        if body.is_empty() {
            return Err(Violation::InvalidArgument("colegiado vazio".to_string()).into());
        }
        if !body.contains(&presiding_member_id) {
            return Err(Violation::NotInDecidingBody(presiding_member_id).into());
        }
        if quorum == 0 || quorum > body.len() {
            return Err(Violation::InvalidArgument(format!(
                "quórum {} incompatível com colegiado de {} membro(s)",
                quorum,
                body.len()
            ))
            .into());
        }

        let mut session = Self {
            id: new_id(),
            election_id: election_id.into(),
            subject,
            status: SessionStatus::Scheduled,
            deciding_body: body,
            presiding_member_id,
            quorum,
            votes: Vec::new(),
            decision: None,
            created_at: now,
            history: History::new(),
            version: 0,
        };
        session.history.record(
            now,
            &actor.id,
            "schedule",
            "-",
            session.status,
            Some(session.subject.to_string()),
        );
        Ok(session)
    }

    /// Scheduled → InProgress.
    pub fn start(&self, actor: &Actor, now: DateTime<Utc>) -> EleitoralResult<Self> {
        actor.require(Claim::Adjudicator)?;
        ensure_status(KIND, self.status, &[SessionStatus::Scheduled], "start")?;
        Ok(self.transition(actor, "start", SessionStatus::InProgress, None, now))
    }

    /// InProgress → Suspended.
    pub fn suspend(&self, actor: &Actor, reason: &str, now: DateTime<Utc>) -> EleitoralResult<Self> {
        actor.require(Claim::Adjudicator)?;
        let reason = require_reason(reason)?;
        ensure_status(KIND, self.status, &[SessionStatus::InProgress], "suspend")?;
        Ok(self.transition(actor, "suspend", SessionStatus::Suspended, Some(reason), now))
    }

    /// Suspended → InProgress.
    pub fn resume(&self, actor: &Actor, now: DateTime<Utc>) -> EleitoralResult<Self> {
        actor.require(Claim::Adjudicator)?;
        ensure_status(KIND, self.status, &[SessionStatus::Suspended], "resume")?;
        Ok(self.transition(actor, "resume", SessionStatus::InProgress, None, now))
    }

    /// Registra o voto do ator.
    pub fn cast_vote(
        &self,
        actor: &Actor,
        choice: VoteChoice,
        justification: Option<String>,
        now: DateTime<Utc>,
    ) -> EleitoralResult<Self> {
        ensure_status(KIND, self.status, &[SessionStatus::InProgress], "cast_vote")?;
        if !self.deciding_body.contains(&actor.id) {
            return Err(Violation::NotInDecidingBody(actor.id.clone()).into());
        }
        if self.votes.iter().any(|v| v.member_id == actor.id) {
            return Err(Violation::DuplicateVote(actor.id.clone()).into());
        }

        debug!(session = %self.id, member = %actor.id, choice = %choice, "Voto registrado");
        let mut next = self.clone();
        next.votes.push(CastVote {
            member_id: actor.id.clone(),
            choice,
            justification: justification
                .map(|j| j.trim().to_string())
                .filter(|j| !j.is_empty()),
            cast_at: now,
        });
        next.history.record(
            now,
            &actor.id,
            "cast_vote",
            self.status,
            self.status,
            Some(choice.to_string()),
        );
        Ok(next)
    }

    /// Contagem atual.
    pub fn count(&self) -> VoteCount {
        VoteCount::from_votes(&self.votes)
    }

    /// Conclui por maioria simples.
    ///
    /// `partial` qualifica uma procedência como parcial (só para denúncias e
    /// impugnações). Empate falha com `UnresolvedTie`.
    pub fn conclude(
        &self,
        actor: &Actor,
        rationale: &str,
        partial: bool,
        now: DateTime<Utc>,
    ) -> EleitoralResult<ConcludedSession> {
        actor.require(Claim::Adjudicator)?;
        let rationale = require_reason(rationale)?;
        let count = self.ready_to_conclude()?;

        let carried = match count.outcome() {
            MotionOutcome::Carried => true,
            MotionOutcome::Defeated => false,
            MotionOutcome::Tied => return Err(Violation::UnresolvedTie.into()),
        };

        self.finish(actor, count, carried, count.decision_kind(), rationale, partial, now)
    }

    /// Conclui um empate pelo voto de qualidade do presidente da sessão.
    pub fn conclude_with_casting_vote(
        &self,
        actor: &Actor,
        choice: VoteChoice,
        rationale: &str,
        partial: bool,
        now: DateTime<Utc>,
    ) -> EleitoralResult<ConcludedSession> {
        if actor.id != self.presiding_member_id {
            return Err(EleitoralError::Unauthorized {
                actor: actor.id.clone(),
                claim: "presiding_member".to_string(),
            });
        }
        let rationale = require_reason(rationale)?;
        let count = self.ready_to_conclude()?;

        if count.outcome() != MotionOutcome::Tied {
            return Err(Violation::TieBreakNotApplicable.into());
        }
        let carried = match choice {
            VoteChoice::For => true,
            VoteChoice::Against => false,
            VoteChoice::Abstain => {
                return Err(Violation::InvalidArgument(
                    "voto de qualidade não pode ser abstenção".to_string(),
                )
                .into())
            }
        };

        self.finish(actor, count, carried, DecisionKind::CastingVote, rationale, partial, now)
    }

    /// Cancela uma sessão agendada ou suspensa.
    pub fn cancel(&self, actor: &Actor, reason: &str, now: DateTime<Utc>) -> EleitoralResult<Self> {
        actor.require(Claim::Adjudicator)?;
        let reason = require_reason(reason)?;
        ensure_status(
            KIND,
            self.status,
            &[SessionStatus::Scheduled, SessionStatus::Suspended],
            "cancel",
        )?;
        Ok(self.transition(actor, "cancel", SessionStatus::Cancelled, Some(reason), now))
    }

    /// Exclusão só de sessão agendada e sem votos.
    pub fn ensure_deletable(&self) -> EleitoralResult<()> {
        ensure_status(KIND, self.status, &[SessionStatus::Scheduled], "delete")?;
        if !self.votes.is_empty() {
            return Err(Violation::HasDependents.into());
        }
        Ok(())
    }

    fn ready_to_conclude(&self) -> EleitoralResult<VoteCount> {
        ensure_status(KIND, self.status, &[SessionStatus::InProgress], "conclude")?;
        let count = self.count();
        if count.cast() < self.quorum {
            return Err(Violation::QuorumNotMet {
                cast: count.cast(),
                required: self.quorum,
            }
            .into());
        }
        Ok(count)
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        actor: &Actor,
        count: VoteCount,
        carried: bool,
        kind: DecisionKind,
        rationale: String,
        partial: bool,
        now: DateTime<Utc>,
    ) -> EleitoralResult<ConcludedSession> {
        let outcome = match (&self.subject, carried) {
            (SessionSubject::CandidacyAppeal(_), _) if partial => {
                return Err(Violation::InvalidArgument(
                    "recurso de candidatura não admite procedência parcial".to_string(),
                )
                .into())
            }
            (SessionSubject::CandidacyAppeal(_), true) => {
                SubjectDecision::Appeal(AppealRuling::Maintained)
            }
            (SessionSubject::CandidacyAppeal(_), false) => {
                SubjectDecision::Appeal(AppealRuling::Revoked)
            }
            (_, true) if partial => SubjectDecision::Verdict(Verdict::PartiallyUpheld),
            (_, true) => SubjectDecision::Verdict(Verdict::Upheld),
            (_, false) => SubjectDecision::Verdict(Verdict::Dismissed),
        };

        info!(
            session = %self.id,
            subject = %self.subject,
            outcome = %outcome,
            kind = %kind,
            for_votes = count.for_votes,
            against = count.against,
            abstain = count.abstain,
            "Sessão concluída"
        );

        let mut session = self.transition(
            actor,
            "conclude",
            SessionStatus::Concluded,
            Some(format!("{} ({})", outcome, kind)),
            now,
        );
        session.decision = Some(SessionDecision {
            outcome,
            kind,
            count,
            rationale,
            decided_by: actor.id.clone(),
            decided_at: now,
        });

        let event = DecisionEvent {
            session_id: self.id.clone(),
            election_id: self.election_id.clone(),
            subject: self.subject.clone(),
            decision: outcome,
            kind,
            decided_at: now,
        };
        Ok(ConcludedSession { session, event })
    }

    fn transition(
        &self,
        actor: &Actor,
        operation: &str,
        to: SessionStatus,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut next = self.clone();
        next.status = to;
        next.history
            .record(now, &actor.id, operation, self.status, to, note);
        next
    }
}

impl Entity for AdjudicationSession {
    const KIND: &'static str = KIND;

    fn id(&self) -> &str {
        &self.id
    }

    fn election_id(&self) -> &str {
        &self.election_id
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

#[cfg(test)]
mod tests {
    use super::*;

    fn clerk() -> Actor {
        Actor::new("secretaria").with_claim(Claim::Adjudicator)
    }

    fn member(id: &str) -> Actor {
        Actor::new(id)
    }

    fn session(subject: SessionSubject, quorum: usize) -> AdjudicationSession {
        let now = Utc::now();
        AdjudicationSession::schedule(
            &clerk(),
            "e-1",
            subject,
            vec!["m-1".into(), "m-2".into(), "m-3".into(), "m-4".into(), "m-5".into()],
            "m-1",
            quorum,
            now,
        )
        .unwrap()
        .start(&clerk(), now)
        .unwrap()
    }

    fn vote(s: AdjudicationSession, id: &str, choice: VoteChoice) -> AdjudicationSession {
        s.cast_vote(&member(id), choice, None, Utc::now()).unwrap()
    }

    #[test]
    fn test_schedule_validations() {
        let now = Utc::now();
        let subject = SessionSubject::Complaint("d-1".into());
        assert!(AdjudicationSession::schedule(
            &clerk(), "e-1", subject.clone(), vec!["m-1".into()], "m-9", 1, now
        )
        .is_err());
        assert!(AdjudicationSession::schedule(
            &clerk(), "e-1", subject.clone(), vec!["m-1".into()], "m-1", 2, now
        )
        .is_err());
        assert!(AdjudicationSession::schedule(
            &member("m-1"), "e-1", subject, vec!["m-1".into()], "m-1", 1, now
        )
        .is_err());
    }

    #[test]
    fn test_quorum_not_met() {
        let s = session(SessionSubject::Complaint("d-1".into()), 3);
        let s = vote(s, "m-1", VoteChoice::For);
        let s = vote(s, "m-2", VoteChoice::For);

        let err = s.conclude(&clerk(), "fundamentação", false, Utc::now()).unwrap_err();
        assert_eq!(
            err.violation(),
            Some(&Violation::QuorumNotMet { cast: 2, required: 3 })
        );
    }

    #[test]
    fn test_abstain_tie_is_unresolved() {
        let s = session(SessionSubject::Complaint("d-1".into()), 3);
        let s = vote(s, "m-1", VoteChoice::For);
        let s = vote(s, "m-2", VoteChoice::Against);
        let s = vote(s, "m-3", VoteChoice::Abstain);

        let err = s.conclude(&clerk(), "fundamentação", false, Utc::now()).unwrap_err();
        assert_eq!(err.violation(), Some(&Violation::UnresolvedTie));

        let resolved = s
            .conclude_with_casting_vote(&member("m-1"), VoteChoice::Against, "voto de qualidade", false, Utc::now())
            .unwrap();
        let decision = resolved.session.decision.as_ref().unwrap();
        assert_eq!(decision.kind, DecisionKind::CastingVote);
        assert_eq!(resolved.event.decision, SubjectDecision::Verdict(Verdict::Dismissed));
    }

    #[test]
    fn test_casting_vote_only_by_presiding_member_on_tie() {
        let s = session(SessionSubject::Complaint("d-1".into()), 1);
        let s = vote(s, "m-1", VoteChoice::For);

        assert!(matches!(
            s.conclude_with_casting_vote(&member("m-2"), VoteChoice::For, "x", false, Utc::now()),
            Err(EleitoralError::Unauthorized { .. })
        ));
        let err = s
            .conclude_with_casting_vote(&member("m-1"), VoteChoice::For, "x", false, Utc::now())
            .unwrap_err();
        assert_eq!(err.violation(), Some(&Violation::TieBreakNotApplicable));
    }

    #[test]
    fn test_duplicate_and_foreign_votes() {
        let s = session(SessionSubject::Challenge("i-1".into()), 3);
        let s = vote(s, "m-1", VoteChoice::For);

        let err = s.cast_vote(&member("m-1"), VoteChoice::Against, None, Utc::now()).unwrap_err();
        assert_eq!(err.violation(), Some(&Violation::DuplicateVote("m-1".into())));

        let err = s.cast_vote(&member("x-9"), VoteChoice::For, None, Utc::now()).unwrap_err();
        assert_eq!(err.violation(), Some(&Violation::NotInDecidingBody("x-9".into())));
    }

    #[test]
    fn test_votes_rejected_while_suspended() {
        let s = session(SessionSubject::Complaint("d-1".into()), 3)
            .suspend(&clerk(), "falta de energia", Utc::now())
            .unwrap();
        assert!(matches!(
            s.cast_vote(&member("m-1"), VoteChoice::For, None, Utc::now()),
            Err(EleitoralError::InvalidTransition { .. })
        ));
        let cancelled = s.cancel(&clerk(), "adiada", Utc::now()).unwrap();
        assert_eq!(cancelled.status, SessionStatus::Cancelled);
    }

    #[test]
    fn test_unanimous_partial_verdict() {
        let s = session(SessionSubject::Challenge("i-1".into()), 3);
        let s = vote(s, "m-1", VoteChoice::For);
        let s = vote(s, "m-2", VoteChoice::For);
        let s = vote(s, "m-3", VoteChoice::For);

        let done = s.conclude(&clerk(), "procedente em parte", true, Utc::now()).unwrap();
        assert_eq!(done.session.status, SessionStatus::Concluded);
        assert_eq!(
            done.event.decision,
            SubjectDecision::Verdict(Verdict::PartiallyUpheld)
        );
        assert_eq!(done.event.kind, DecisionKind::Unanimous);
        assert!(done.session.cancel(&clerk(), "x", Utc::now()).is_err());
    }

    #[test]
    fn test_candidacy_appeal_decision() {
        let s = session(SessionSubject::CandidacyAppeal("s-1".into()), 3);
        let s = vote(s, "m-1", VoteChoice::Against);
        let s = vote(s, "m-2", VoteChoice::Against);
        let s = vote(s, "m-3", VoteChoice::For);

        assert!(s.conclude(&clerk(), "x", true, Utc::now()).is_err());
        let done = s.conclude(&clerk(), "cassada", false, Utc::now()).unwrap();
        assert_eq!(
            done.event.decision,
            SubjectDecision::Appeal(AppealRuling::Revoked)
        );
    }
}
