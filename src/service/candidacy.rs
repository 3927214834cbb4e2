//! Operações sobre chapas.

use crate::adversarial::{ChallengeProcess, ComplaintProcess};
use crate::candidacy::{CandidacySlate, CandidacyStatus, SlateMember};
use crate::election::{Election, ElectionPhase};
use crate::store::Entity;
use crate::types::errors::Violation;
use crate::types::identity::Actor;
use crate::EleitoralResult;

use super::ElectoralCore;

/// Chave de serialização da numeração de chapas de uma eleição.
const SLATE_NUMBERING: &str = "slate_numbering";

impl ElectoralCore {
    /// Cria uma chapa em rascunho. O número é único na eleição.
    pub async fn create_slate(
        &self,
        actor: &Actor,
        election_id: &str,
        number: u32,
        name: &str,
    ) -> EleitoralResult<CandidacySlate> {
        let election = self.repo::<Election>().get(election_id).await?;
        if !election.is_in_phase(&[ElectionPhase::Registration]) {
            return Err(Violation::ElectionPhase(election.phase.to_string()).into());
        }

        let _guard = self.locks.acquire(SLATE_NUMBERING, election_id).await;
        let taken = self
            .repo::<CandidacySlate>()
            .by_election(election_id)
            .await?
            .iter()
            .any(|s| s.number == number && s.status != CandidacyStatus::Cancelled);
        if taken {
            return Err(Violation::InvalidArgument(format!(
                "número {} já utilizado nesta eleição",
                number
            ))
            .into());
        }

        let slate = CandidacySlate::new(election_id, number, name.trim(), actor, self.now());
        self.insert(slate, actor, "create").await
    }

    pub async fn add_member(
        &self,
        actor: &Actor,
        slate_id: &str,
        member: SlateMember,
    ) -> EleitoralResult<CandidacySlate> {
        self.apply(slate_id, actor, "add_member", |s: &CandidacySlate, now| {
            s.add_member(actor, member, now)
        })
        .await
    }

    pub async fn remove_member(
        &self,
        actor: &Actor,
        slate_id: &str,
        member_id: &str,
    ) -> EleitoralResult<CandidacySlate> {
        let mandatory = &self.config.candidacy.mandatory_roles;
        self.apply(slate_id, actor, "remove_member", |s: &CandidacySlate, now| {
            s.remove_member(actor, member_id, mandatory, now)
        })
        .await
    }

    /// Substitui um membro por outro no mesmo cargo.
    pub async fn replace_member(
        &self,
        actor: &Actor,
        slate_id: &str,
        member_id: &str,
        replacement: SlateMember,
    ) -> EleitoralResult<CandidacySlate> {
        self.apply(slate_id, actor, "replace_member", |s: &CandidacySlate, now| {
            s.replace_member(actor, member_id, replacement, now)
        })
        .await
    }

    pub async fn submit_slate(&self, actor: &Actor, slate_id: &str) -> EleitoralResult<CandidacySlate> {
        let mandatory = &self.config.candidacy.mandatory_roles;
        self.apply(slate_id, actor, "submit", |s: &CandidacySlate, now| {
            s.submit(actor, mandatory, now)
        })
        .await
    }

    pub async fn start_review(&self, actor: &Actor, slate_id: &str) -> EleitoralResult<CandidacySlate> {
        self.apply(slate_id, actor, "start_review", |s: &CandidacySlate, now| {
            s.start_review(actor, now)
        })
        .await
    }

    pub async fn approve_member(
        &self,
        actor: &Actor,
        slate_id: &str,
        member_id: &str,
    ) -> EleitoralResult<CandidacySlate> {
        self.apply(slate_id, actor, "approve_member", |s: &CandidacySlate, now| {
            s.approve_member(actor, member_id, now)
        })
        .await
    }

    pub async fn reject_member(
        &self,
        actor: &Actor,
        slate_id: &str,
        member_id: &str,
        reason: &str,
    ) -> EleitoralResult<CandidacySlate> {
        self.apply(slate_id, actor, "reject_member", |s: &CandidacySlate, now| {
            s.reject_member(actor, member_id, reason, now)
        })
        .await
    }

    pub async fn request_documents(
        &self,
        actor: &Actor,
        slate_id: &str,
        checklist: Vec<String>,
    ) -> EleitoralResult<CandidacySlate> {
        self.apply(slate_id, actor, "request_documents", |s: &CandidacySlate, now| {
            s.request_documents(actor, checklist, now)
        })
        .await
    }

    pub async fn resubmit_slate(&self, actor: &Actor, slate_id: &str) -> EleitoralResult<CandidacySlate> {
        self.apply(slate_id, actor, "resubmit", |s: &CandidacySlate, now| {
            s.resubmit(actor, now)
        })
        .await
    }

    pub async fn approve_slate(&self, actor: &Actor, slate_id: &str) -> EleitoralResult<CandidacySlate> {
        let mandatory = &self.config.candidacy.mandatory_roles;
        self.apply(slate_id, actor, "approve", |s: &CandidacySlate, now| {
            s.approve(actor, mandatory, now)
        })
        .await
    }

    pub async fn reject_slate(
        &self,
        actor: &Actor,
        slate_id: &str,
        reason: &str,
    ) -> EleitoralResult<CandidacySlate> {
        self.apply(slate_id, actor, "reject", |s: &CandidacySlate, now| {
            s.reject(actor, reason, now)
        })
        .await
    }

    /// Recurso contra o indeferimento; o julgamento vem de uma sessão.
    pub async fn appeal_rejection(
        &self,
        actor: &Actor,
        slate_id: &str,
    ) -> EleitoralResult<CandidacySlate> {
        self.apply(slate_id, actor, "appeal_rejection", |s: &CandidacySlate, now| {
            s.appeal_rejection(actor, now)
        })
        .await
    }

    /// Registra a chapa, conferindo a fase da eleição.
    ///
    /// Nenhuma impugnação contra a chapa pode estar pendente, inclusive as
    /// julgadas ainda sujeitas a recurso.
    pub async fn register_slate(&self, actor: &Actor, slate_id: &str) -> EleitoralResult<CandidacySlate> {
        let mandatory = &self.config.candidacy.mandatory_roles;
        let _guard = self.locks.acquire(CandidacySlate::KIND, slate_id).await;
        let current = self.repo::<CandidacySlate>().get(slate_id).await?;
        let election = self.repo::<Election>().get(&current.election_id).await?;
        let now = self.now();
        let next = current.register(actor, &election, mandatory, now)?;

        let pending = self
            .repo::<ChallengeProcess>()
            .by_election(&current.election_id)
            .await?
            .iter()
            .filter(|p| p.target.as_ref().map(|t| t.slate_id()) == Some(slate_id))
            .filter(|p| !p.is_settled(now))
            .count();
        if pending > 0 {
            return Err(Violation::OpenChallenges(pending).into());
        }

        self.commit(&current, next, actor, "register").await
    }

    pub async fn cancel_slate(
        &self,
        actor: &Actor,
        slate_id: &str,
        reason: &str,
    ) -> EleitoralResult<CandidacySlate> {
        self.apply(slate_id, actor, "cancel", |s: &CandidacySlate, now| {
            s.cancel(actor, reason, now)
        })
        .await
    }

    /// Exclui uma chapa em rascunho sem processos vinculados.
    pub async fn delete_slate(&self, slate_id: &str) -> EleitoralResult<()> {
        let slate = self.repo::<CandidacySlate>().get(slate_id).await?;
        let targeted = |target: Option<&str>| target == Some(slate_id);

        let complaints = self
            .repo::<ComplaintProcess>()
            .by_election(&slate.election_id)
            .await?;
        let challenges = self
            .repo::<ChallengeProcess>()
            .by_election(&slate.election_id)
            .await?;
        let has_dependents = complaints
            .iter()
            .any(|p| targeted(p.target.as_ref().map(|t| t.slate_id())))
            || challenges
                .iter()
                .any(|p| targeted(p.target.as_ref().map(|t| t.slate_id())));
        if has_dependents {
            return Err(Violation::HasDependents.into());
        }

        self.remove::<CandidacySlate, _>(slate_id, |s| s.ensure_deletable())
            .await
    }

    pub async fn slate(&self, id: &str) -> EleitoralResult<CandidacySlate> {
        self.repo::<CandidacySlate>().get(id).await
    }

    pub async fn slates_by_election(&self, election_id: &str) -> EleitoralResult<Vec<CandidacySlate>> {
        self.repo::<CandidacySlate>().by_election(election_id).await
    }

    pub async fn slates_by_status(
        &self,
        status: CandidacyStatus,
    ) -> EleitoralResult<Vec<CandidacySlate>> {
        self.repo::<CandidacySlate>().by_status(status).await
    }
}
