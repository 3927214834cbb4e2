//! Sessões de julgamento e despacho das decisões.

use tracing::{info, warn};

use crate::adjudication::{
    AdjudicationSession, ConcludedSession, DecisionEvent, FailedDispatch, SessionStatus,
    SessionSubject, SubjectDecision, VoteChoice,
};
use crate::adversarial::{AdversarialProcess, Challenge, Complaint, ProcessKind, ProcessStatus};
use crate::candidacy::{CandidacySlate, CandidacyStatus};
use crate::hooks::HookContext;
use crate::store::Entity;
use crate::types::errors::Violation;
use crate::types::identity::Actor;
use crate::{EleitoralError, EleitoralResult};

use super::ElectoralCore;

impl ElectoralCore {
    /// Agenda uma sessão para um processo aguardando julgamento.
    ///
    /// Sem `quorum`, usa `adjudication.default_quorum`.
    pub async fn schedule_session(
        &self,
        actor: &Actor,
        subject: SessionSubject,
        deciding_body: Vec<String>,
        presiding_member_id: &str,
        quorum: Option<usize>,
    ) -> EleitoralResult<AdjudicationSession> {
        let election_id = match &subject {
            SessionSubject::Complaint(id) => self.awaiting_judgment::<Complaint>(id).await?,
            SessionSubject::Challenge(id) => self.awaiting_judgment::<Challenge>(id).await?,
            SessionSubject::CandidacyAppeal(id) => {
                let slate = self.repo::<CandidacySlate>().get(id).await?;
                if slate.status != CandidacyStatus::AwaitingAppealJudgment {
                    return Err(EleitoralError::invalid_transition(
                        CandidacySlate::KIND,
                        slate.status,
                        "schedule_session",
                    ));
                }
                slate.election_id
            }
        };

        let active = self
            .repo::<AdjudicationSession>()
            .by_election(&election_id)
            .await?
            .into_iter()
            .any(|s| {
                s.subject == subject
                    && matches!(
                        s.status,
                        SessionStatus::Scheduled | SessionStatus::InProgress | SessionStatus::Suspended
                    )
            });
        if active {
            return Err(Violation::InvalidArgument(format!(
                "já existe sessão ativa para {}",
                subject
            ))
            .into());
        }

        let quorum = quorum.unwrap_or(self.config.adjudication.default_quorum);
        let session = AdjudicationSession::schedule(
            actor,
            election_id,
            subject,
            deciding_body,
            presiding_member_id,
            quorum,
            self.now(),
        )?;
        self.insert(session, actor, "schedule").await
    }

    async fn awaiting_judgment<K: ProcessKind>(&self, id: &str) -> EleitoralResult<String> {
        let process = self.repo::<AdversarialProcess<K>>().get(id).await?;
        match process.status {
            ProcessStatus::AwaitingJudgment | ProcessStatus::OnAppeal => Ok(process.election_id),
            status => Err(EleitoralError::invalid_transition(
                K::KIND,
                status,
                "schedule_session",
            )),
        }
    }

    pub async fn start_session(&self, actor: &Actor, id: &str) -> EleitoralResult<AdjudicationSession> {
        self.apply(id, actor, "start", |s: &AdjudicationSession, now| {
            s.start(actor, now)
        })
        .await
    }

    pub async fn suspend_session(
        &self,
        actor: &Actor,
        id: &str,
        reason: &str,
    ) -> EleitoralResult<AdjudicationSession> {
        self.apply(id, actor, "suspend", |s: &AdjudicationSession, now| {
            s.suspend(actor, reason, now)
        })
        .await
    }

    pub async fn resume_session(&self, actor: &Actor, id: &str) -> EleitoralResult<AdjudicationSession> {
        self.apply(id, actor, "resume", |s: &AdjudicationSession, now| {
            s.resume(actor, now)
        })
        .await
    }

    /// Voto do ator, que deve integrar o colegiado.
    pub async fn cast_vote(
        &self,
        actor: &Actor,
        id: &str,
        choice: VoteChoice,
        justification: Option<String>,
    ) -> EleitoralResult<AdjudicationSession> {
        self.apply(id, actor, "cast_vote", |s: &AdjudicationSession, now| {
            s.cast_vote(actor, choice, justification, now)
        })
        .await
    }

    /// Conclui por maioria e despacha a decisão ao processo de origem.
    pub async fn conclude_session(
        &self,
        actor: &Actor,
        id: &str,
        rationale: &str,
        partial: bool,
    ) -> EleitoralResult<AdjudicationSession> {
        self.conclude_with(actor, id, |s, now| s.conclude(actor, rationale, partial, now))
            .await
    }

    /// Desempate pelo voto de qualidade do presidente da sessão.
    pub async fn conclude_with_casting_vote(
        &self,
        actor: &Actor,
        id: &str,
        choice: VoteChoice,
        rationale: &str,
        partial: bool,
    ) -> EleitoralResult<AdjudicationSession> {
        self.conclude_with(actor, id, |s, now| {
            s.conclude_with_casting_vote(actor, choice, rationale, partial, now)
        })
        .await
    }

    async fn conclude_with<F>(
        &self,
        actor: &Actor,
        id: &str,
        conclude: F,
    ) -> EleitoralResult<AdjudicationSession>
    where
        F: FnOnce(&AdjudicationSession, chrono::DateTime<chrono::Utc>) -> EleitoralResult<ConcludedSession>,
    {
        let saved = {
            let _guard = self.locks.acquire(AdjudicationSession::KIND, id).await;
            let current = self.repo::<AdjudicationSession>().get(id).await?;
            let ConcludedSession { session, event } = conclude(&current, self.now())?;
            let saved = self.commit(&current, session, actor, "conclude").await?;
            self.outbox.lock().await.push(event);
            saved
        };

        self.dispatch_pending(actor).await;
        Ok(saved)
    }

    pub async fn cancel_session(
        &self,
        actor: &Actor,
        id: &str,
        reason: &str,
    ) -> EleitoralResult<AdjudicationSession> {
        self.apply(id, actor, "cancel", |s: &AdjudicationSession, now| {
            s.cancel(actor, reason, now)
        })
        .await
    }

    /// Exclui uma sessão agendada sem votos.
    pub async fn delete_session(&self, id: &str) -> EleitoralResult<()> {
        self.remove::<AdjudicationSession, _>(id, |s| s.ensure_deletable())
            .await
    }

    pub async fn session(&self, id: &str) -> EleitoralResult<AdjudicationSession> {
        self.repo::<AdjudicationSession>().get(id).await
    }

    pub async fn sessions_by_election(
        &self,
        election_id: &str,
    ) -> EleitoralResult<Vec<AdjudicationSession>> {
        self.repo::<AdjudicationSession>().by_election(election_id).await
    }

    pub async fn sessions_by_status(
        &self,
        status: SessionStatus,
    ) -> EleitoralResult<Vec<AdjudicationSession>> {
        self.repo::<AdjudicationSession>().by_status(status).await
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Despacho
    // ═══════════════════════════════════════════════════════════════════════

    /// Despacha os eventos pendentes. Retorna quantos foram aplicados.
    ///
    /// Um despacho que falha não desfaz a conclusão da sessão: o evento fica
    /// retido em [`Self::failed_dispatches`].
    pub async fn dispatch_pending(&self, actor: &Actor) -> usize {
        let mut applied = 0;
        loop {
            let Some(event) = self.outbox.lock().await.pop() else {
                break;
            };

            match self.dispatch(actor, &event).await {
                Ok(()) => {
                    applied += 1;
                    self.hooks.run(&HookContext::Decision { event: &event }).await;
                }
                Err(e) => {
                    warn!(
                        session = %event.session_id,
                        subject = %event.subject,
                        error = %e,
                        "Falha ao despachar decisão"
                    );
                    self.outbox.lock().await.fail(event, e.to_string());
                }
            }
        }
        applied
    }

    /// Reenfileira e tenta de novo os despachos que falharam.
    pub async fn retry_failed_dispatches(&self, actor: &Actor) -> usize {
        let requeued = self.outbox.lock().await.requeue_failed();
        if requeued > 0 {
            info!(count = requeued, "Reprocessando despachos com falha");
        }
        self.dispatch_pending(actor).await
    }

    /// Despachos retidos após falha.
    pub async fn failed_dispatches(&self) -> Vec<FailedDispatch> {
        self.outbox.lock().await.failed().to_vec()
    }

    async fn dispatch(&self, actor: &Actor, event: &DecisionEvent) -> EleitoralResult<()> {
        let appeal_days = self.config.deadlines.appeal_days;
        let session_id = event.session_id.as_str();

        match (&event.subject, event.decision) {
            (SessionSubject::Complaint(id), SubjectDecision::Verdict(verdict)) => {
                self.apply(id, actor, "judge", |p: &AdversarialProcess<Complaint>, now| {
                    p.apply_judgment(actor, session_id, verdict, appeal_days, now)
                })
                .await?;
            }
            (SessionSubject::Challenge(id), SubjectDecision::Verdict(verdict)) => {
                self.judge_challenge(actor, id, session_id, verdict).await?;
            }
            (SessionSubject::CandidacyAppeal(id), SubjectDecision::Appeal(ruling)) => {
                self.apply(id, actor, "apply_appeal_ruling", |s: &CandidacySlate, now| {
                    s.apply_appeal_ruling(actor, ruling, now)
                })
                .await?;
            }
            (subject, decision) => {
                return Err(Violation::InvalidArgument(format!(
                    "decisão {} incompatível com {}",
                    decision, subject
                ))
                .into())
            }
        }

        info!(
            session = %event.session_id,
            subject = %event.subject,
            decision = %event.decision,
            "Decisão despachada"
        );
        Ok(())
    }
}
