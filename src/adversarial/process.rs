//! Processo contencioso genérico.

use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::deadline::Deadline;
use crate::store::Entity;
use crate::types::errors::Violation;
use crate::types::history::{require_reason, History};
use crate::types::identity::{Actor, Claim};
use crate::types::{ensure_status, new_id};
use crate::{EleitoralError, EleitoralResult};

use super::round::{LateSubmission, Round, RoundKind, Submission};
use super::{Challenge, Complaint, ProcessKind, ProcessStatus, Verdict};

/// Denúncia.
pub type ComplaintProcess = AdversarialProcess<Complaint>;

/// Impugnação.
pub type ChallengeProcess = AdversarialProcess<Challenge>;

/// Alvo do processo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Target {
    /// Chapa inteira.
    Slate { slate_id: String },
    /// Um membro de uma chapa.
    Member { slate_id: String, member_id: String },
}

impl Target {
    /// Chapa afetada.
    pub fn slate_id(&self) -> &str {
        match self {
            Target::Slate { slate_id } | Target::Member { slate_id, .. } => slate_id,
        }
    }
}

/// Decisão de admissibilidade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admissibility {
    Admit,
    Reject { reason: String },
}

/// Processo contencioso parametrizado pelo plano de rodadas de `K`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(bound = "")]
pub struct AdversarialProcess<K: ProcessKind> {
    pub id: String,
    pub election_id: String,
    #[serde(default)]
    pub target: Option<Target>,
    /// Autor (denunciante/impugnante).
    pub author_id: String,
    /// Parte demandada: responsável pela chapa alvo e membro alvo.
    #[serde(default)]
    pub respondents: Vec<String>,
    pub description: String,
    pub status: ProcessStatus,
    /// Rodadas abertas, na ordem do plano.
    #[serde(default)]
    pub rounds: Vec<Round>,
    /// Manifestações intempestivas, registradas sem mudança de status.
    #[serde(default)]
    pub late_submissions: Vec<LateSubmission>,
    #[serde(default)]
    pub verdict: Option<Verdict>,
    /// Número de julgamentos (1 = primeira instância, 2 = recurso).
    #[serde(default)]
    pub judgments: u8,
    #[serde(default)]
    pub appeal_deadline: Option<Deadline>,
    /// Sessões cujo resultado já foi aplicado.
    #[serde(default)]
    pub judged_by: Vec<String>,
    #[serde(default)]
    pub closing_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub history: History,
    #[serde(default)]
    pub version: u64,
    #[serde(skip)]
    _kind: PhantomData<K>,
}

impl<K: ProcessKind> AdversarialProcess<K> {
    /// Protocola um novo processo.
    pub fn new(
        election_id: impl Into<String>,
        target: Option<Target>,
        author: &Actor,
        description: &str,
        now: DateTime<Utc>,
    ) -> EleitoralResult<Self> {
        let description = require_reason(description)?;
        Ok(Self {
            id: new_id(),
            election_id: election_id.into(),
            target,
            author_id: author.id.clone(),
            respondents: Vec::new(),
            description,
            status: ProcessStatus::Received,
            rounds: Vec::new(),
            late_submissions: Vec::new(),
            verdict: None,
            judgments: 0,
            appeal_deadline: None,
            judged_by: Vec::new(),
            closing_reason: None,
            created_at: now,
            history: History::new(),
            version: 0,
            _kind: PhantomData,
        })
    }

    /// Define a parte demandada.
    pub fn with_respondents(mut self, respondents: Vec<String>) -> Self {
        self.respondents = respondents;
        self
    }

    /// Rodada corrente (a última aberta).
    pub fn current_round(&self) -> Option<&Round> {
        self.rounds.last()
    }

    /// Rodada aguardando manifestação e seu prazo.
    pub fn open_window(&self) -> Option<(RoundKind, Deadline)> {
        self.current_round()
            .filter(|r| self.status == r.kind.awaiting())
            .map(|r| (r.kind, r.deadline))
    }

    /// Próxima rodada do plano ainda não aberta.
    pub fn next_round(&self) -> Option<RoundKind> {
        K::ROUNDS.get(self.rounds.len()).copied()
    }

    /// Julgamento em grau de recurso já proferido.
    pub fn is_final(&self) -> bool {
        self.status == ProcessStatus::Judged && self.judgments >= 2
    }

    /// Nada mais a decidir: inadmitido, arquivado, ou julgado sem recurso
    /// possível em `now`.
    pub fn is_settled(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            ProcessStatus::Rejected | ProcessStatus::Archived => true,
            ProcessStatus::Judged => {
                self.is_final() || self.appeal_deadline.map_or(true, |d| d.is_expired(now))
            }
            _ => false,
        }
    }

    /// Resultado da sessão já aplicado ao processo.
    pub fn was_judged_by(&self, session_id: &str) -> bool {
        self.judged_by.iter().any(|s| s == session_id)
    }

    /// Received → AdmissibilityReview.
    pub fn begin_review(&self, actor: &Actor, now: DateTime<Utc>) -> EleitoralResult<Self> {
        actor.require(Claim::Adjudicator)?;
        ensure_status(K::KIND, self.status, &[ProcessStatus::Received], "begin_review")?;
        Ok(self.transition(actor, "begin_review", ProcessStatus::AdmissibilityReview, None, now))
    }

    /// Juízo de admissibilidade.
    pub fn decide_admissibility(
        &self,
        actor: &Actor,
        decision: Admissibility,
        now: DateTime<Utc>,
    ) -> EleitoralResult<Self> {
        actor.require(Claim::Adjudicator)?;
        ensure_status(
            K::KIND,
            self.status,
            &[ProcessStatus::Received, ProcessStatus::AdmissibilityReview],
            "decide_admissibility",
        )?;

        match decision {
            Admissibility::Admit => {
                info!(kind = K::KIND, process = %self.id, "Processo admitido");
                Ok(self.transition(actor, "admit", ProcessStatus::Admitted, None, now))
            }
            Admissibility::Reject { reason } => {
                let reason = require_reason(&reason)?;
                let mut next = self.transition(
                    actor,
                    "reject",
                    ProcessStatus::Rejected,
                    Some(reason.clone()),
                    now,
                );
                next.closing_reason = Some(reason);
                Ok(next)
            }
        }
    }

    /// Abre a próxima rodada com prazo de `days` dias.
    ///
    /// A primeira rodada parte de Admitted; as seguintes exigem a rodada
    /// anterior encerrada.
    pub fn open_next_round(
        &self,
        actor: &Actor,
        days: i64,
        now: DateTime<Utc>,
    ) -> EleitoralResult<Self> {
        actor.require(Claim::Adjudicator)?;
        let kind = self
            .next_round()
            .ok_or_else(|| EleitoralError::invalid_transition(K::KIND, self.status, "open_round"))?;

        let ready = match self.current_round() {
            None => self.status == ProcessStatus::Admitted,
            Some(previous) => {
                previous.is_closed()
                    && (self.status == previous.kind.presented()
                        || self.status == previous.kind.not_presented())
            }
        };
        if !ready {
            return Err(EleitoralError::invalid_transition(K::KIND, self.status, "open_round"));
        }

        let deadline = Deadline::days_from(now, days)?;
        let note = format!("{} até {}", kind, deadline.due_at.to_rfc3339());
        let mut next = self.transition(actor, "open_round", kind.awaiting(), Some(note), now);
        next.rounds.push(Round::open(kind, deadline));
        Ok(next)
    }

    /// Manifestação na rodada corrente.
    ///
    /// Após o prazo falha com `LateSubmission`; o chamador registra a tentativa
    /// com [`Self::record_late_submission`].
    pub fn submit_round(
        &self,
        actor: &Actor,
        content: &str,
        now: DateTime<Utc>,
    ) -> EleitoralResult<Self> {
        let round = self.awaiting_round("submit_round")?;
        self.ensure_party(actor, round.kind)?;
        if round.deadline.is_expired(now) {
            return Err(Violation::LateSubmission {
                round: round.kind.to_string(),
            }
            .into());
        }
        let content = require_reason(content)?;

        let kind = round.kind;
        let mut next = self.transition(actor, "submit_round", kind.presented(), None, now);
        if let Some(round) = next.rounds.last_mut() {
            round.submission = Some(Submission {
                actor_id: actor.id.clone(),
                content,
                submitted_at: now,
            });
        }
        Ok(next)
    }

    /// Registra uma manifestação intempestiva, sem mudar o status.
    pub fn record_late_submission(
        &self,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> EleitoralResult<Self> {
        let round = self.awaiting_round("record_late_submission")?;
        if !round.deadline.is_expired(now) {
            return Err(Violation::InvalidArgument("manifestação dentro do prazo".to_string()).into());
        }

        warn!(
            kind = K::KIND,
            process = %self.id,
            round = %round.kind,
            actor = %actor.id,
            "Manifestação intempestiva"
        );

        let late = LateSubmission {
            round: round.kind,
            actor_id: actor.id.clone(),
            attempted_at: now,
            due_at: round.deadline.due_at,
        };
        let mut next = self.transition(
            actor,
            "late_submission",
            self.status,
            Some(format!("{} intempestiva", late.round)),
            now,
        );
        next.late_submissions.push(late);
        Ok(next)
    }

    /// Fecha uma janela expirada sem manifestação.
    pub fn close_round(&self, actor: &Actor, now: DateTime<Utc>) -> EleitoralResult<Self> {
        let round = self.awaiting_round("close_round")?;
        if !round.deadline.is_expired(now) {
            return Err(Violation::DeadlineNotElapsed {
                round: round.kind.to_string(),
            }
            .into());
        }

        let kind = round.kind;
        let mut next = self.transition(actor, "close_round", kind.not_presented(), None, now);
        if let Some(round) = next.rounds.last_mut() {
            round.lapsed = true;
        }
        Ok(next)
    }

    /// Encaminha a julgamento após o encerramento da última rodada.
    pub fn send_to_judgment(&self, actor: &Actor, now: DateTime<Utc>) -> EleitoralResult<Self> {
        actor.require(Claim::Adjudicator)?;
        let done = self.next_round().is_none()
            && self
                .current_round()
                .map(|r| {
                    r.is_closed()
                        && (self.status == r.kind.presented()
                            || self.status == r.kind.not_presented())
                })
                .unwrap_or(false);
        if !done {
            return Err(EleitoralError::invalid_transition(
                K::KIND,
                self.status,
                "send_to_judgment",
            ));
        }
        Ok(self.transition(actor, "send_to_judgment", ProcessStatus::AwaitingJudgment, None, now))
    }

    /// Aplica o resultado de uma sessão de julgamento.
    ///
    /// Em primeira instância abre prazo de recurso de `appeal_days` dias; em
    /// grau de recurso o julgamento é definitivo.
    pub fn apply_judgment(
        &self,
        actor: &Actor,
        session_id: &str,
        verdict: Verdict,
        appeal_days: i64,
        now: DateTime<Utc>,
    ) -> EleitoralResult<Self> {
        ensure_status(
            K::KIND,
            self.status,
            &[ProcessStatus::AwaitingJudgment, ProcessStatus::OnAppeal],
            "apply_judgment",
        )?;

        let on_appeal = self.status == ProcessStatus::OnAppeal;
        let appeal_deadline = if on_appeal {
            None
        } else {
            Some(Deadline::days_from(now, appeal_days)?)
        };

        info!(kind = K::KIND, process = %self.id, verdict = %verdict, on_appeal, "Processo julgado");
        let mut next = self.transition(
            actor,
            "judge",
            ProcessStatus::Judged,
            Some(verdict.to_string()),
            now,
        );
        next.verdict = Some(verdict);
        next.judgments = self.judgments + 1;
        next.appeal_deadline = appeal_deadline;
        next.judged_by.push(session_id.to_string());
        Ok(next)
    }

    /// Judged → OnAppeal, dentro do prazo de recurso.
    pub fn file_appeal(&self, actor: &Actor, reason: &str, now: DateTime<Utc>) -> EleitoralResult<Self> {
        ensure_status(K::KIND, self.status, &[ProcessStatus::Judged], "file_appeal")?;
        if self.is_final() {
            return Err(EleitoralError::invalid_transition(
                K::KIND,
                "judged (final)",
                "file_appeal",
            ));
        }
        let reason = require_reason(reason)?;

        match self.appeal_deadline {
            Some(deadline) if !deadline.is_expired(now) => {}
            _ => return Err(Violation::AppealWindowElapsed.into()),
        }

        Ok(self.transition(actor, "file_appeal", ProcessStatus::OnAppeal, Some(reason), now))
    }

    /// Arquiva o processo antes do julgamento.
    pub fn archive(&self, actor: &Actor, reason: &str, now: DateTime<Utc>) -> EleitoralResult<Self> {
        actor.require(Claim::Adjudicator)?;
        let reason = require_reason(reason)?;
        if !self.status.is_pre_judgment() {
            return Err(EleitoralError::invalid_transition(K::KIND, self.status, "archive"));
        }

        let mut next = self.transition(
            actor,
            "archive",
            ProcessStatus::Archived,
            Some(reason.clone()),
            now,
        );
        next.closing_reason = Some(reason);
        Ok(next)
    }

    /// Exclusão só enquanto recebido.
    pub fn ensure_deletable(&self) -> EleitoralResult<()> {
        ensure_status(K::KIND, self.status, &[ProcessStatus::Received], "delete")
    }

    /// Contra-alegações cabem ao autor. As demais rodadas cabem à parte
    /// demandada, ou a qualquer um que não seja o autor quando ela não é
    /// conhecida.
    fn ensure_party(&self, actor: &Actor, kind: RoundKind) -> EleitoralResult<()> {
        let allowed = if kind.by_author() {
            actor.id == self.author_id
        } else if self.respondents.is_empty() {
            actor.id != self.author_id
        } else {
            self.respondents.contains(&actor.id)
        };
        if !allowed {
            return Err(EleitoralError::Unauthorized {
                actor: actor.id.clone(),
                claim: format!("parte na rodada de {}", kind),
            });
        }
        Ok(())
    }

    fn awaiting_round(&self, operation: &'static str) -> EleitoralResult<&Round> {
        self.current_round()
            .filter(|r| self.status == r.kind.awaiting())
            .ok_or_else(|| EleitoralError::invalid_transition(K::KIND, self.status, operation))
    }

    fn transition(
        &self,
        actor: &Actor,
        operation: &str,
        to: ProcessStatus,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        debug!(kind = K::KIND, process = %self.id, from = %self.status, to = %to, operation, "Transição");
        let mut next = self.clone();
        next.status = to;
        next.history
            .record(now, &actor.id, operation, self.status, to, note);
        next
    }
}

impl<K: ProcessKind> Entity for AdversarialProcess<K> {
    const KIND: &'static str = K::KIND;

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
