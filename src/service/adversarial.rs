//! Operações sobre denúncias e impugnações.
//!
//! As operações genéricas recebem o tipo de processo como parâmetro:
//! `core.open_next_round::<Complaint>(&actor, &id)`.

use tracing::{info, warn};

use crate::adversarial::{
    Admissibility, AdversarialProcess, Challenge, ChallengeProcess, Complaint, ComplaintProcess,
    ProcessKind, ProcessStatus, Target, Verdict,
};
use crate::candidacy::CandidacySlate;
use crate::election::{Election, ElectionStatus};
use crate::store::Entity;
use crate::types::errors::Violation;
use crate::types::identity::Actor;
use crate::{EleitoralError, EleitoralResult};

use super::ElectoralCore;

impl ElectoralCore {
    /// Protocola uma denúncia.
    pub async fn file_complaint(
        &self,
        actor: &Actor,
        election_id: &str,
        target: Option<Target>,
        description: &str,
    ) -> EleitoralResult<ComplaintProcess> {
        self.file::<Complaint>(actor, election_id, target, description)
            .await
    }

    /// Protocola uma impugnação contra uma chapa ou um de seus membros.
    pub async fn file_challenge(
        &self,
        actor: &Actor,
        election_id: &str,
        target: Target,
        description: &str,
    ) -> EleitoralResult<ChallengeProcess> {
        self.file::<Challenge>(actor, election_id, Some(target), description)
            .await
    }

    async fn file<K: ProcessKind>(
        &self,
        actor: &Actor,
        election_id: &str,
        target: Option<Target>,
        description: &str,
    ) -> EleitoralResult<AdversarialProcess<K>> {
        let election = self.repo::<Election>().get(election_id).await?;
        if election.status != ElectionStatus::Ongoing {
            return Err(EleitoralError::invalid_transition(
                Election::KIND,
                election.status,
                "file",
            ));
        }
        let respondents = match &target {
            Some(target) => self.respondents(election_id, target).await?,
            None => Vec::new(),
        };

        let process = AdversarialProcess::<K>::new(election_id, target, actor, description, self.now())?
            .with_respondents(respondents);
        self.insert(process, actor, "file").await
    }

    /// Confere o alvo e devolve a parte demandada: o responsável pela chapa e,
    /// se for o caso, o membro alvo.
    async fn respondents(&self, election_id: &str, target: &Target) -> EleitoralResult<Vec<String>> {
        let slate = self.repo::<CandidacySlate>().get(target.slate_id()).await?;
        if slate.election_id != election_id {
            return Err(EleitoralError::not_found(CandidacySlate::KIND, target.slate_id()));
        }
        let mut respondents = vec![slate.author_id.clone()];
        if let Target::Member { member_id, .. } = target {
            if slate.member(member_id).is_none() {
                return Err(Violation::UnknownMember(member_id.clone()).into());
            }
            respondents.push(member_id.clone());
        }
        Ok(respondents)
    }

    /// Received → AdmissibilityReview.
    pub async fn begin_review<K: ProcessKind>(
        &self,
        actor: &Actor,
        id: &str,
    ) -> EleitoralResult<AdversarialProcess<K>> {
        self.apply(id, actor, "begin_review", |p: &AdversarialProcess<K>, now| {
            p.begin_review(actor, now)
        })
        .await
    }

    /// Juízo de admissibilidade.
    ///
    /// Admitir uma impugnação marca a chapa alvo como impugnada; as duas
    /// gravações acontecem sob os mutexes do processo e da chapa.
    pub async fn decide_admissibility<K: ProcessKind>(
        &self,
        actor: &Actor,
        id: &str,
        decision: Admissibility,
    ) -> EleitoralResult<AdversarialProcess<K>> {
        let _guard = self.locks.acquire(K::KIND, id).await;
        let current = self.repo::<AdversarialProcess<K>>().get(id).await?;
        let now = self.now();
        let admitted = decision == Admissibility::Admit;
        let next = current.decide_admissibility(actor, decision, now)?;

        let blocked_slate = match (&current.target, admitted && K::BLOCKS_TARGET) {
            (Some(target), true) => Some(target.slate_id().to_string()),
            _ => None,
        };
        let Some(slate_id) = blocked_slate else {
            return self.commit(&current, next, actor, "decide_admissibility").await;
        };

        let _slate_guard = self.locks.acquire(CandidacySlate::KIND, &slate_id).await;
        let slate = self.repo::<CandidacySlate>().get(&slate_id).await?;
        let marked = slate.mark_challenged(actor, &current.id, now)?;

        let saved = self.commit(&current, next, actor, "decide_admissibility").await?;
        self.commit(&slate, marked, actor, "mark_challenged").await?;
        Ok(saved)
    }

    /// Abre a próxima rodada com o prazo configurado para ela.
    pub async fn open_next_round<K: ProcessKind>(
        &self,
        actor: &Actor,
        id: &str,
    ) -> EleitoralResult<AdversarialProcess<K>> {
        let deadlines = &self.config.deadlines;
        self.apply(id, actor, "open_round", |p: &AdversarialProcess<K>, now| {
            let days = match p.next_round() {
                Some(kind) => kind.days(deadlines),
                None => {
                    return Err(EleitoralError::invalid_transition(K::KIND, p.status, "open_round"))
                }
            };
            p.open_next_round(actor, days, now)
        })
        .await
    }

    /// Manifestação na rodada aberta, pela parte a quem ela cabe.
    ///
    /// Uma manifestação intempestiva é gravada no histórico e na lista de
    /// tentativas tardias, e a chamada falha com `LateSubmission`.
    pub async fn submit_round<K: ProcessKind>(
        &self,
        actor: &Actor,
        id: &str,
        content: &str,
    ) -> EleitoralResult<AdversarialProcess<K>> {
        let _guard = self.locks.acquire(K::KIND, id).await;
        let current = self.repo::<AdversarialProcess<K>>().get(id).await?;
        let now = self.now();

        match current.submit_round(actor, content, now) {
            Ok(next) => self.commit(&current, next, actor, "submit_round").await,
            Err(err) if matches!(err.violation(), Some(Violation::LateSubmission { .. })) => {
                let late = current.record_late_submission(actor, now)?;
                self.commit(&current, late, actor, "late_submission").await?;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Fecha uma janela vencida sem manifestação.
    pub async fn close_round<K: ProcessKind>(
        &self,
        actor: &Actor,
        id: &str,
    ) -> EleitoralResult<AdversarialProcess<K>> {
        self.apply(id, actor, "close_round", |p: &AdversarialProcess<K>, now| {
            p.close_round(actor, now)
        })
        .await
    }

    pub async fn send_to_judgment<K: ProcessKind>(
        &self,
        actor: &Actor,
        id: &str,
    ) -> EleitoralResult<AdversarialProcess<K>> {
        self.apply(id, actor, "send_to_judgment", |p: &AdversarialProcess<K>, now| {
            p.send_to_judgment(actor, now)
        })
        .await
    }

    /// Recurso contra o julgamento de primeira instância.
    pub async fn file_appeal<K: ProcessKind>(
        &self,
        actor: &Actor,
        id: &str,
        reason: &str,
    ) -> EleitoralResult<AdversarialProcess<K>> {
        self.apply(id, actor, "file_appeal", |p: &AdversarialProcess<K>, now| {
            p.file_appeal(actor, reason, now)
        })
        .await
    }

    /// Arquiva o processo. Uma impugnação admitida deixa de bloquear a chapa.
    pub async fn archive<K: ProcessKind>(
        &self,
        actor: &Actor,
        id: &str,
        reason: &str,
    ) -> EleitoralResult<AdversarialProcess<K>> {
        let _guard = self.locks.acquire(K::KIND, id).await;
        let current = self.repo::<AdversarialProcess<K>>().get(id).await?;
        let now = self.now();
        let next = current.archive(actor, reason, now)?;

        let target = current.target.as_ref().filter(|_| K::BLOCKS_TARGET);
        let Some(target) = target else {
            return self.commit(&current, next, actor, "archive").await;
        };

        let _slate_guard = self.locks.acquire(CandidacySlate::KIND, target.slate_id()).await;
        let slate = self.repo::<CandidacySlate>().get(target.slate_id()).await?;
        let settled = settle_on_slate(actor, &slate, &current.id, Verdict::Dismissed, false, now)?;

        let saved = self.commit(&current, next, actor, "archive").await?;
        if let Some(settled) = settled {
            self.commit(&slate, settled, actor, "resolve_challenge").await?;
        }
        Ok(saved)
    }

    /// Exclui um processo ainda não analisado.
    pub async fn delete_process<K: ProcessKind>(&self, id: &str) -> EleitoralResult<()> {
        self.remove::<AdversarialProcess<K>, _>(id, |p| p.ensure_deletable())
            .await
    }

    pub async fn process<K: ProcessKind>(&self, id: &str) -> EleitoralResult<AdversarialProcess<K>> {
        self.repo::<AdversarialProcess<K>>().get(id).await
    }

    pub async fn processes_by_election<K: ProcessKind>(
        &self,
        election_id: &str,
    ) -> EleitoralResult<Vec<AdversarialProcess<K>>> {
        self.repo::<AdversarialProcess<K>>()
            .by_election(election_id)
            .await
    }

    pub async fn processes_by_status<K: ProcessKind>(
        &self,
        status: ProcessStatus,
    ) -> EleitoralResult<Vec<AdversarialProcess<K>>> {
        self.repo::<AdversarialProcess<K>>().by_status(status).await
    }

    /// Aplica o julgamento de uma sessão à impugnação e à chapa alvo.
    ///
    /// As duas transições são calculadas antes de qualquer gravação. Se o
    /// processo já recebeu o resultado desta sessão, só a chapa é atualizada.
    pub(super) async fn judge_challenge(
        &self,
        actor: &Actor,
        id: &str,
        session_id: &str,
        verdict: Verdict,
    ) -> EleitoralResult<()> {
        let _guard = self.locks.acquire(Challenge::KIND, id).await;
        let current = self.repo::<ChallengeProcess>().get(id).await?;
        let now = self.now();

        let judged = if current.was_judged_by(session_id) {
            warn!(challenge = id, session = session_id, "Julgamento já aplicado ao processo");
            None
        } else {
            let appeal_days = self.config.deadlines.appeal_days;
            Some(current.apply_judgment(actor, session_id, verdict, appeal_days, now)?)
        };
        let on_appeal = judged.as_ref().unwrap_or(&current).judgments >= 2;

        let settled = match &current.target {
            Some(target) => {
                let guard = self.locks.acquire(CandidacySlate::KIND, target.slate_id()).await;
                let slate = self.repo::<CandidacySlate>().get(target.slate_id()).await?;
                settle_on_slate(actor, &slate, id, verdict, on_appeal, now)?
                    .map(|next| (guard, slate, next))
            }
            None => None,
        };

        if let Some(next) = judged {
            self.commit(&current, next, actor, "judge").await?;
        }
        if let Some((_slate_guard, slate, next)) = settled {
            info!(slate = %slate.id, challenge = id, to = %next.status, "Impugnação resolvida na chapa");
            self.commit(&slate, next, actor, "resolve_challenge").await?;
        }
        Ok(())
    }
}

/// Reflexo de um julgamento de impugnação na chapa, sem gravar.
///
/// Em primeira instância só alcança impugnações ainda abertas na chapa; em
/// recurso o julgamento é definitivo e sempre é aplicado.
fn settle_on_slate(
    actor: &Actor,
    slate: &CandidacySlate,
    challenge_id: &str,
    verdict: Verdict,
    on_appeal: bool,
    now: chrono::DateTime<chrono::Utc>,
) -> EleitoralResult<Option<CandidacySlate>> {
    if !on_appeal && !slate.open_challenges.contains(challenge_id) {
        warn!(slate = %slate.id, challenge = challenge_id, "Impugnação não está aberta na chapa");
        return Ok(None);
    }
    slate
        .resolve_challenge(actor, challenge_id, verdict, now)
        .map(Some)
}
