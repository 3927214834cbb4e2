//! Máquina de estados da chapa.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::adjudication::Verdict;
use crate::election::{Election, ElectionPhase};
use crate::store::Entity;
use crate::types::errors::Violation;
use crate::types::history::{require_reason, History};
use crate::types::identity::{Actor, Claim};
use crate::types::{ensure_status, new_id};
use crate::{EleitoralError, EleitoralResult};

use super::{AppealRuling, MemberRole, MemberStatus, SlateMember};

const KIND: &str = "candidacy_slate";

/// Status da chapa.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CandidacyStatus {
    Draft,
    PendingDocuments,
    AwaitingReview,
    UnderReview,
    Approved,
    Rejected,
    Challenged,
    AwaitingAppealJudgment,
    Registered,
    Cancelled,
}

impl CandidacyStatus {
    /// Estados sem transições de saída.
    pub fn is_terminal(self) -> bool {
        matches!(self, CandidacyStatus::Registered | CandidacyStatus::Cancelled)
    }

    /// Estados em que a composição da chapa pode ser alterada.
    pub fn allows_member_changes(self) -> bool {
        matches!(
            self,
            CandidacyStatus::Draft | CandidacyStatus::PendingDocuments | CandidacyStatus::UnderReview
        )
    }
}

impl std::fmt::Display for CandidacyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CandidacyStatus::Draft => "draft",
            CandidacyStatus::PendingDocuments => "pending_documents",
            CandidacyStatus::AwaitingReview => "awaiting_review",
            CandidacyStatus::UnderReview => "under_review",
            CandidacyStatus::Approved => "approved",
            CandidacyStatus::Rejected => "rejected",
            CandidacyStatus::Challenged => "challenged",
            CandidacyStatus::AwaitingAppealJudgment => "awaiting_appeal_judgment",
            CandidacyStatus::Registered => "registered",
            CandidacyStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// Chapa de candidatura.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidacySlate {
    pub id: String,
    pub election_id: String,
    pub number: u32,
    pub name: String,
    pub status: CandidacyStatus,
    /// Responsável pela chapa.
    pub author_id: String,
    /// Membros, na ordem de composição.
    pub members: Vec<SlateMember>,
    /// Documentos pendentes solicitados na análise.
    #[serde(default)]
    pub checklist: Vec<String>,
    /// Impugnações abertas contra a chapa.
    #[serde(default)]
    pub open_challenges: BTreeSet<String>,
    /// Impugnações julgadas procedentes que mantêm a chapa indeferida.
    #[serde(default)]
    pub upheld_challenges: BTreeSet<String>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub history: History,
    #[serde(default)]
    pub version: u64,
}

impl CandidacySlate {
    /// Cria uma chapa em rascunho.
    pub fn new(
        election_id: impl Into<String>,
        number: u32,
        name: impl Into<String>,
        author: &Actor,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: new_id(),
            election_id: election_id.into(),
            number,
            name: name.into(),
            status: CandidacyStatus::Draft,
            author_id: author.id.clone(),
            members: Vec::new(),
            checklist: Vec::new(),
            open_challenges: BTreeSet::new(),
            upheld_challenges: BTreeSet::new(),
            rejection_reason: None,
            created_at: now,
            history: History::new(),
            version: 0,
        }
    }

    /// Busca um membro.
    pub fn member(&self, member_id: &str) -> Option<&SlateMember> {
        self.members.iter().find(|m| m.member_id == member_id)
    }

    /// Inclui um membro.
    pub fn add_member(
        &self,
        actor: &Actor,
        member: SlateMember,
        now: DateTime<Utc>,
    ) -> EleitoralResult<Self> {
        self.require_author_or_admin(actor)?;
        self.ensure_member_changes("add_member")?;
        self.check_can_hold(&member, None)?;

        let mut next = self.clone();
        let note = format!("{} ({})", member.member_id, member.role);
        next.members.push(SlateMember {
            status: MemberStatus::Pending,
            rejection_reason: None,
            ..member
        });
        next.history
            .record(now, &actor.id, "add_member", self.status, next.status, Some(note));
        Ok(next)
    }

    /// Remove um membro. Falha se o cargo obrigatório ficaria sem titular.
    pub fn remove_member(
        &self,
        actor: &Actor,
        member_id: &str,
        mandatory_roles: &[MemberRole],
        now: DateTime<Utc>,
    ) -> EleitoralResult<Self> {
        self.require_author_or_admin(actor)?;
        self.ensure_member_changes("remove_member")?;
        let index = self.member_index(member_id)?;

        let mut next = self.clone();
        let removed = next.members.remove(index);
        if mandatory_roles.contains(&removed.role)
            && removed.holds(removed.role)
            && !next.members.iter().any(|m| m.holds(removed.role))
        {
            return Err(Violation::MandatoryRoleUnfilled(removed.role.to_string()).into());
        }

        next.history.record(
            now,
            &actor.id,
            "remove_member",
            self.status,
            next.status,
            Some(member_id.to_string()),
        );
        Ok(next)
    }

    /// Substitui um membro por outro no mesmo cargo, de forma atômica.
    pub fn replace_member(
        &self,
        actor: &Actor,
        member_id: &str,
        replacement: SlateMember,
        now: DateTime<Utc>,
    ) -> EleitoralResult<Self> {
        self.require_author_or_admin(actor)?;
        self.ensure_member_changes("replace_member")?;
        let index = self.member_index(member_id)?;
        self.check_can_hold(&replacement, Some(member_id))?;

        let old = &self.members[index];
        if replacement.role != old.role || replacement.titular != old.titular {
            return Err(Violation::InvalidArgument(
                "substituto deve ocupar o mesmo cargo".to_string(),
            )
            .into());
        }

        let mut next = self.clone();
        let note = format!("{} -> {}", member_id, replacement.member_id);
        next.members[index] = SlateMember {
            status: MemberStatus::Pending,
            rejection_reason: None,
            ..replacement
        };
        next.history
            .record(now, &actor.id, "replace_member", self.status, next.status, Some(note));
        Ok(next)
    }

    /// Draft → AwaitingReview. Todos os cargos obrigatórios precisam de titular.
    pub fn submit(
        &self,
        actor: &Actor,
        mandatory_roles: &[MemberRole],
        now: DateTime<Utc>,
    ) -> EleitoralResult<Self> {
        self.require_author_or_admin(actor)?;
        ensure_status(KIND, self.status, &[CandidacyStatus::Draft], "submit")?;

        for role in mandatory_roles {
            if !self.members.iter().any(|m| m.holds(*role)) {
                return Err(Violation::MandatoryRoleUnfilled(role.to_string()).into());
            }
        }

        Ok(self.transition(actor, "submit", CandidacyStatus::AwaitingReview, None, now))
    }

    /// AwaitingReview → UnderReview.
    pub fn start_review(&self, actor: &Actor, now: DateTime<Utc>) -> EleitoralResult<Self> {
        actor.require(Claim::Reviewer)?;
        ensure_status(
            KIND,
            self.status,
            &[CandidacyStatus::AwaitingReview],
            "start_review",
        )?;
        Ok(self.transition(actor, "start_review", CandidacyStatus::UnderReview, None, now))
    }

    /// Aprova a elegibilidade de um membro durante a análise.
    pub fn approve_member(
        &self,
        actor: &Actor,
        member_id: &str,
        now: DateTime<Utc>,
    ) -> EleitoralResult<Self> {
        self.set_member_status(actor, member_id, MemberStatus::Approved, None, now)
    }

    /// Indefere a elegibilidade de um membro durante a análise.
    pub fn reject_member(
        &self,
        actor: &Actor,
        member_id: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> EleitoralResult<Self> {
        let reason = require_reason(reason)?;
        self.set_member_status(actor, member_id, MemberStatus::Rejected, Some(reason), now)
    }

    /// UnderReview → PendingDocuments.
    pub fn request_documents(
        &self,
        actor: &Actor,
        checklist: Vec<String>,
        now: DateTime<Utc>,
    ) -> EleitoralResult<Self> {
        actor.require(Claim::Reviewer)?;
        ensure_status(
            KIND,
            self.status,
            &[CandidacyStatus::UnderReview],
            "request_documents",
        )?;

        let checklist: Vec<String> = checklist
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect();
        if checklist.is_empty() {
            return Err(Violation::EmptyChecklist.into());
        }

        let note = checklist.join("; ");
        let mut next = self.transition(
            actor,
            "request_documents",
            CandidacyStatus::PendingDocuments,
            Some(note),
            now,
        );
        next.checklist = checklist;
        Ok(next)
    }

    /// PendingDocuments → AwaitingReview.
    pub fn resubmit(&self, actor: &Actor, now: DateTime<Utc>) -> EleitoralResult<Self> {
        self.require_author_or_admin(actor)?;
        ensure_status(
            KIND,
            self.status,
            &[CandidacyStatus::PendingDocuments],
            "resubmit",
        )?;

        let mut next = self.transition(actor, "resubmit", CandidacyStatus::AwaitingReview, None, now);
        next.checklist.clear();
        Ok(next)
    }

    /// UnderReview → Approved. Cargos obrigatórios precisam de titular aprovado.
    pub fn approve(
        &self,
        actor: &Actor,
        mandatory_roles: &[MemberRole],
        now: DateTime<Utc>,
    ) -> EleitoralResult<Self> {
        actor.require(Claim::Reviewer)?;
        ensure_status(KIND, self.status, &[CandidacyStatus::UnderReview], "approve")?;
        self.check_mandatory_roles_approved(mandatory_roles)?;

        info!(slate = %self.id, number = self.number, "Chapa aprovada");
        Ok(self.transition(actor, "approve", CandidacyStatus::Approved, None, now))
    }

    /// UnderReview → Rejected.
    pub fn reject(&self, actor: &Actor, reason: &str, now: DateTime<Utc>) -> EleitoralResult<Self> {
        actor.require(Claim::Reviewer)?;
        let reason = require_reason(reason)?;
        ensure_status(KIND, self.status, &[CandidacyStatus::UnderReview], "reject")?;

        let mut next =
            self.transition(actor, "reject", CandidacyStatus::Rejected, Some(reason.clone()), now);
        next.rejection_reason = Some(reason);
        Ok(next)
    }

    /// Approved/Challenged → Challenged, registrando a impugnação aberta.
    pub fn mark_challenged(
        &self,
        actor: &Actor,
        challenge_id: &str,
        now: DateTime<Utc>,
    ) -> EleitoralResult<Self> {
        ensure_status(
            KIND,
            self.status,
            &[CandidacyStatus::Approved, CandidacyStatus::Challenged],
            "mark_challenged",
        )?;

        let mut next = self.transition(
            actor,
            "mark_challenged",
            CandidacyStatus::Challenged,
            Some(challenge_id.to_string()),
            now,
        );
        next.open_challenges.insert(challenge_id.to_string());
        Ok(next)
    }

    /// Aplica o julgamento de uma impugnação, em primeira instância ou em
    /// recurso.
    ///
    /// Enquanto houver impugnação julgada procedente a chapa fica indeferida.
    /// Sem procedentes, volta a Challenged ou Approved conforme as impugnações
    /// ainda abertas; um indeferimento que não veio de impugnação não é
    /// revertido. Chapa cancelada ou com recurso de candidatura pendente
    /// apenas registra o resultado.
    pub fn resolve_challenge(
        &self,
        actor: &Actor,
        challenge_id: &str,
        verdict: Verdict,
        now: DateTime<Utc>,
    ) -> EleitoralResult<Self> {
        ensure_status(
            KIND,
            self.status,
            &[
                CandidacyStatus::Approved,
                CandidacyStatus::Challenged,
                CandidacyStatus::Rejected,
                CandidacyStatus::AwaitingAppealJudgment,
                CandidacyStatus::Cancelled,
            ],
            "resolve_challenge",
        )?;

        let reversible =
            self.status != CandidacyStatus::Rejected || !self.upheld_challenges.is_empty();
        let mut open = self.open_challenges.clone();
        open.remove(challenge_id);
        let mut upheld = self.upheld_challenges.clone();
        match verdict {
            Verdict::Dismissed => upheld.remove(challenge_id),
            Verdict::Upheld | Verdict::PartiallyUpheld => upheld.insert(challenge_id.to_string()),
        };

        let to = match self.status {
            CandidacyStatus::Cancelled | CandidacyStatus::AwaitingAppealJudgment => self.status,
            _ if !upheld.is_empty() || !reversible => CandidacyStatus::Rejected,
            _ if !open.is_empty() => CandidacyStatus::Challenged,
            _ => CandidacyStatus::Approved,
        };

        let note = format!("{}: {}", challenge_id, verdict);
        let mut next = self.transition(actor, "resolve_challenge", to, Some(note), now);
        next.open_challenges = open;
        next.upheld_challenges = upheld;
        match to {
            CandidacyStatus::Rejected if verdict != Verdict::Dismissed => {
                next.rejection_reason =
                    Some(format!("impugnação {} julgada {}", challenge_id, verdict));
            }
            CandidacyStatus::Approved | CandidacyStatus::Challenged => next.rejection_reason = None,
            _ => {}
        }
        Ok(next)
    }

    /// Rejected → AwaitingAppealJudgment.
    pub fn appeal_rejection(&self, actor: &Actor, now: DateTime<Utc>) -> EleitoralResult<Self> {
        self.require_author_or_admin(actor)?;
        ensure_status(
            KIND,
            self.status,
            &[CandidacyStatus::Rejected],
            "appeal_rejection",
        )?;
        Ok(self.transition(
            actor,
            "appeal_rejection",
            CandidacyStatus::AwaitingAppealJudgment,
            None,
            now,
        ))
    }

    /// Aplica a decisão de uma sessão de recurso de candidatura.
    ///
    /// A decisão substitui os julgamentos de impugnação aplicados até aqui;
    /// impugnações ainda abertas continuam bloqueando a chapa.
    pub fn apply_appeal_ruling(
        &self,
        actor: &Actor,
        ruling: AppealRuling,
        now: DateTime<Utc>,
    ) -> EleitoralResult<Self> {
        ensure_status(
            KIND,
            self.status,
            &[CandidacyStatus::AwaitingAppealJudgment],
            "apply_appeal_ruling",
        )?;

        let to = match ruling {
            AppealRuling::Maintained if self.open_challenges.is_empty() => CandidacyStatus::Approved,
            AppealRuling::Maintained => CandidacyStatus::Challenged,
            AppealRuling::Revoked => CandidacyStatus::Rejected,
        };
        let mut next = self.transition(
            actor,
            "apply_appeal_ruling",
            to,
            Some(ruling.to_string()),
            now,
        );
        next.upheld_challenges.clear();
        next.rejection_reason = match ruling {
            AppealRuling::Maintained => None,
            AppealRuling::Revoked => Some("candidatura cassada em recurso".to_string()),
        };
        Ok(next)
    }

    /// Approved → Registered.
    pub fn register(
        &self,
        actor: &Actor,
        election: &Election,
        mandatory_roles: &[MemberRole],
        now: DateTime<Utc>,
    ) -> EleitoralResult<Self> {
        actor.require(Claim::Admin)?;
        ensure_status(KIND, self.status, &[CandidacyStatus::Approved], "register")?;

        if election.id != self.election_id {
            return Err(EleitoralError::not_found("election", &self.election_id));
        }
        if !election.is_in_phase(&[ElectionPhase::Registration, ElectionPhase::Review]) {
            return Err(Violation::ElectionPhase(election.phase.to_string()).into());
        }
        if !self.open_challenges.is_empty() {
            return Err(Violation::OpenChallenges(self.open_challenges.len()).into());
        }
        self.check_mandatory_roles_approved(mandatory_roles)?;

        info!(slate = %self.id, number = self.number, "Chapa registrada");
        Ok(self.transition(actor, "register", CandidacyStatus::Registered, None, now))
    }

    /// Qualquer estado não terminal → Cancelled.
    pub fn cancel(&self, actor: &Actor, reason: &str, now: DateTime<Utc>) -> EleitoralResult<Self> {
        self.require_author_or_admin(actor)?;
        let reason = require_reason(reason)?;
        if self.status.is_terminal() {
            return Err(EleitoralError::invalid_transition(KIND, self.status, "cancel"));
        }
        Ok(self.transition(actor, "cancel", CandidacyStatus::Cancelled, Some(reason), now))
    }

    /// Exclusão só é permitida em rascunho.
    pub fn ensure_deletable(&self) -> EleitoralResult<()> {
        ensure_status(KIND, self.status, &[CandidacyStatus::Draft], "delete")?;
        if !self.open_challenges.is_empty() {
            return Err(Violation::HasDependents.into());
        }
        Ok(())
    }

    fn transition(
        &self,
        actor: &Actor,
        operation: &str,
        to: CandidacyStatus,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        debug!(slate = %self.id, from = %self.status, to = %to, operation, "Transição de chapa");
        let mut next = self.clone();
        next.status = to;
        next.history
            .record(now, &actor.id, operation, self.status, to, note);
        next
    }

    fn set_member_status(
        &self,
        actor: &Actor,
        member_id: &str,
        status: MemberStatus,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> EleitoralResult<Self> {
        actor.require(Claim::Reviewer)?;
        ensure_status(
            KIND,
            self.status,
            &[CandidacyStatus::UnderReview],
            "review_member",
        )?;
        let index = self.member_index(member_id)?;

        let mut next = self.clone();
        let member = &mut next.members[index];
        let from = member.status;
        member.status = status;
        member.rejection_reason = reason.clone();
        next.history.record(
            now,
            &actor.id,
            "review_member",
            from,
            status,
            Some(reason.unwrap_or_else(|| member_id.to_string())),
        );
        Ok(next)
    }

    fn check_can_hold(&self, member: &SlateMember, replacing: Option<&str>) -> EleitoralResult<()> {
        let others = self
            .members
            .iter()
            .filter(|m| Some(m.member_id.as_str()) != replacing);

        let mut role_taken = false;
        for existing in others {
            if existing.member_id == member.member_id {
                return Err(Violation::DuplicateMember(member.member_id.clone()).into());
            }
            if member.titular && member.role.is_single_holder() && existing.holds(member.role) {
                role_taken = true;
            }
        }
        if role_taken {
            return Err(Violation::RoleAlreadyFilled(member.role.to_string()).into());
        }
        Ok(())
    }

    fn check_mandatory_roles_approved(&self, mandatory_roles: &[MemberRole]) -> EleitoralResult<()> {
        for role in mandatory_roles {
            let filled = self.members.iter().any(|m| {
                m.titular && m.role == *role && m.status == MemberStatus::Approved
            });
            if !filled {
                return Err(Violation::MandatoryRoleUnfilled(role.to_string()).into());
            }
        }
        Ok(())
    }

    fn member_index(&self, member_id: &str) -> EleitoralResult<usize> {
        self.members
            .iter()
            .position(|m| m.member_id == member_id)
            .ok_or_else(|| Violation::UnknownMember(member_id.to_string()).into())
    }

    fn ensure_member_changes(&self, operation: &'static str) -> EleitoralResult<()> {
        if self.status.allows_member_changes() {
            Ok(())
        } else {
            Err(EleitoralError::invalid_transition(KIND, self.status, operation))
        }
    }

    fn require_author_or_admin(&self, actor: &Actor) -> EleitoralResult<()> {
        if actor.id == self.author_id {
            return Ok(());
        }
        actor.require(Claim::Admin)
    }
}

impl Entity for CandidacySlate {
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
