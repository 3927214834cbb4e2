//! Máquina de estados da apuração.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::election::{Election, ElectionPhase};
use crate::store::Entity;
use crate::types::errors::Violation;
use crate::types::history::{require_reason, History};
use crate::types::identity::{Actor, Claim};
use crate::types::{ensure_status, new_id};
use crate::{EleitoralError, EleitoralResult};

use super::aggregator::{Aggregation, EligibleSlate, VoteAggregator};
use super::source::VoteRecord;

const KIND: &str = "tally";

/// Status da apuração.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TallyStatus {
    NotStarted,
    InProgress,
    Paused,
    Finalized,
    Homologated,
    Published,
    /// Resultado finalizado e contestado; aguarda reprocessamento.
    Contested,
}

impl std::fmt::Display for TallyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TallyStatus::NotStarted => write!(f, "not_started"),
            TallyStatus::InProgress => write!(f, "in_progress"),
            TallyStatus::Paused => write!(f, "paused"),
            TallyStatus::Finalized => write!(f, "finalized"),
            TallyStatus::Homologated => write!(f, "homologated"),
            TallyStatus::Published => write!(f, "published"),
            TallyStatus::Contested => write!(f, "contested"),
        }
    }
}

/// Desempate explícito do topo do ranking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TieResolution {
    pub slate_id: String,
    pub rationale: String,
    pub resolved_by: String,
    pub resolved_at: DateTime<Utc>,
}

/// Entrada de uma agregação.
#[derive(Debug, Clone, Copy)]
pub struct TallyInput<'a> {
    pub records: &'a [VoteRecord],
    /// Chapas registradas.
    pub slates: &'a [EligibleSlate],
    pub decimal_places: u32,
}

/// Apuração de uma eleição.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tally {
    pub id: String,
    pub election_id: String,
    pub status: TallyStatus,
    /// Total de cédulas declarado pela fonte de votos.
    #[serde(default)]
    pub declared_total: u64,
    #[serde(default)]
    pub electorate_size: Option<u64>,
    #[serde(default)]
    pub voided_ballots: BTreeSet<String>,
    #[serde(default)]
    pub result: Option<Aggregation>,
    #[serde(default)]
    pub winner: Option<String>,
    #[serde(default)]
    pub tie_resolution: Option<TieResolution>,
    #[serde(default)]
    pub homologated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub history: History,
    #[serde(default)]
    pub version: u64,
}

impl Tally {
    /// Cria uma apuração não iniciada.
    pub fn new(election_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            election_id: election_id.into(),
            status: TallyStatus::NotStarted,
            declared_total: 0,
            electorate_size: None,
            voided_ballots: BTreeSet::new(),
            result: None,
            winner: None,
            tie_resolution: None,
            homologated_by: None,
            created_at: now,
            history: History::new(),
            version: 0,
        }
    }

    /// NotStarted → InProgress, com a eleição na fase de apuração.
    pub fn start(
        &self,
        actor: &Actor,
        election: &Election,
        declared_total: u64,
        electorate_size: Option<u64>,
        now: DateTime<Utc>,
    ) -> EleitoralResult<Self> {
        actor.require(Claim::Admin)?;
        ensure_status(KIND, self.status, &[TallyStatus::NotStarted], "start")?;
        if election.id != self.election_id {
            return Err(EleitoralError::not_found("election", &self.election_id));
        }
        if !election.is_in_phase(&[ElectionPhase::Tally]) {
            return Err(Violation::ElectionPhase(election.phase.to_string()).into());
        }

        let mut next = self.transition(actor, "start", TallyStatus::InProgress, None, now);
        next.declared_total = declared_total;
        next.electorate_size = electorate_size;
        Ok(next)
    }

    /// InProgress → Paused.
    pub fn pause(&self, actor: &Actor, reason: &str, now: DateTime<Utc>) -> EleitoralResult<Self> {
        actor.require(Claim::Admin)?;
        let reason = require_reason(reason)?;
        ensure_status(KIND, self.status, &[TallyStatus::InProgress], "pause")?;
        Ok(self.transition(actor, "pause", TallyStatus::Paused, Some(reason), now))
    }

    /// Paused → InProgress.
    pub fn resume(&self, actor: &Actor, now: DateTime<Utc>) -> EleitoralResult<Self> {
        actor.require(Claim::Admin)?;
        ensure_status(KIND, self.status, &[TallyStatus::Paused], "resume")?;
        Ok(self.transition(actor, "resume", TallyStatus::InProgress, None, now))
    }

    /// Agregação parcial, sem mudar o status.
    pub fn snapshot(&self, input: TallyInput<'_>) -> EleitoralResult<Aggregation> {
        VoteAggregator::aggregate(
            &self.election_id,
            input.records,
            input.slates,
            &self.voided_ballots,
            self.electorate_size,
            input.decimal_places,
        )
    }

    /// Recalcula o resultado parcial durante a apuração.
    pub fn recount(
        &self,
        actor: &Actor,
        input: TallyInput<'_>,
        now: DateTime<Utc>,
    ) -> EleitoralResult<Self> {
        ensure_status(
            KIND,
            self.status,
            &[TallyStatus::InProgress, TallyStatus::Paused],
            "recount",
        )?;
        let aggregation = self.snapshot(input)?;
        let note = format!("{} registro(s)", aggregation.total);

        let mut next = self.transition(actor, "recount", self.status, Some(note), now);
        next.result = Some(aggregation);
        Ok(next)
    }

    /// Anula uma cédula durante a apuração.
    pub fn void_ballot(
        &self,
        actor: &Actor,
        ballot_id: &str,
        reason: &str,
        records: &[VoteRecord],
        now: DateTime<Utc>,
    ) -> EleitoralResult<Self> {
        actor.require(Claim::Admin)?;
        let reason = require_reason(reason)?;
        ensure_status(
            KIND,
            self.status,
            &[TallyStatus::InProgress, TallyStatus::Paused],
            "void_ballot",
        )?;
        if !records.iter().any(|r| r.ballot_id == ballot_id) {
            return Err(Violation::UnknownBallot(ballot_id.to_string()).into());
        }

        warn!(tally = %self.id, ballot = ballot_id, "Cédula anulada");
        let mut next = self.transition(
            actor,
            "void_ballot",
            self.status,
            Some(format!("{}: {}", ballot_id, reason)),
            now,
        );
        next.voided_ballots.insert(ballot_id.to_string());
        Ok(next)
    }

    /// Desempata o topo do ranking, escolhendo uma das chapas empatadas.
    pub fn resolve_tie(
        &self,
        actor: &Actor,
        slate_id: &str,
        rationale: &str,
        input: TallyInput<'_>,
        now: DateTime<Utc>,
    ) -> EleitoralResult<Self> {
        actor.require(Claim::Admin)?;
        let rationale = require_reason(rationale)?;
        ensure_status(
            KIND,
            self.status,
            &[TallyStatus::InProgress, TallyStatus::Paused, TallyStatus::Contested],
            "resolve_tie",
        )?;

        let aggregation = self.snapshot(input)?;
        if aggregation.clear_winner().is_some() {
            return Err(Violation::TieBreakNotApplicable.into());
        }
        if !aggregation.top_slates().iter().any(|s| s.slate_id == slate_id) {
            return Err(Violation::InvalidArgument(format!(
                "chapa '{}' não está empatada no topo",
                slate_id
            ))
            .into());
        }

        let mut next = self.transition(
            actor,
            "resolve_tie",
            self.status,
            Some(format!("{}: {}", slate_id, rationale)),
            now,
        );
        next.tie_resolution = Some(TieResolution {
            slate_id: slate_id.to_string(),
            rationale,
            resolved_by: actor.id.clone(),
            resolved_at: now,
        });
        Ok(next)
    }

    /// InProgress → Finalized. Exige a contagem completa e vencedor definido;
    /// sem chapas registradas, sela sem vencedora.
    pub fn finalize(
        &self,
        actor: &Actor,
        input: TallyInput<'_>,
        now: DateTime<Utc>,
    ) -> EleitoralResult<Self> {
        actor.require(Claim::Admin)?;
        ensure_status(KIND, self.status, &[TallyStatus::InProgress], "finalize")?;
        self.seal(actor, "finalize", input, now)
    }

    /// Finalized/Contested → Finalized, recalculando do zero.
    pub fn reprocess(
        &self,
        actor: &Actor,
        input: TallyInput<'_>,
        now: DateTime<Utc>,
    ) -> EleitoralResult<Self> {
        actor.require(Claim::Admin)?;
        ensure_status(
            KIND,
            self.status,
            &[TallyStatus::Finalized, TallyStatus::Contested],
            "reprocess",
        )?;
        self.seal(actor, "reprocess", input, now)
    }

    /// Finalized → Contested.
    pub fn contest(&self, actor: &Actor, reason: &str, now: DateTime<Utc>) -> EleitoralResult<Self> {
        actor.require_any(&[Claim::Admin, Claim::Adjudicator])?;
        let reason = require_reason(reason)?;
        ensure_status(KIND, self.status, &[TallyStatus::Finalized], "contest")?;
        Ok(self.transition(actor, "contest", TallyStatus::Contested, Some(reason), now))
    }

    /// Finalized → Homologated.
    pub fn homologate(&self, actor: &Actor, now: DateTime<Utc>) -> EleitoralResult<Self> {
        actor.require(Claim::Homologator)?;
        ensure_status(KIND, self.status, &[TallyStatus::Finalized], "homologate")?;

        info!(tally = %self.id, winner = ?self.winner, "Apuração homologada");
        let mut next = self.transition(actor, "homologate", TallyStatus::Homologated, None, now);
        next.homologated_by = Some(actor.id.clone());
        Ok(next)
    }

    /// Homologated → Published.
    pub fn publish(&self, actor: &Actor, now: DateTime<Utc>) -> EleitoralResult<Self> {
        actor.require(Claim::Admin)?;
        ensure_status(KIND, self.status, &[TallyStatus::Homologated], "publish")?;
        Ok(self.transition(actor, "publish", TallyStatus::Published, None, now))
    }

    fn seal(
        &self,
        actor: &Actor,
        operation: &'static str,
        input: TallyInput<'_>,
        now: DateTime<Utc>,
    ) -> EleitoralResult<Self> {
        let aggregation = self.snapshot(input)?;
        if aggregation.total != self.declared_total {
            return Err(Violation::CountIncomplete {
                counted: aggregation.total,
                total: self.declared_total,
            }
            .into());
        }

        let winner = match aggregation.clear_winner() {
            Some(slate) => Some(slate.slate_id.clone()),
            None if aggregation.slates.is_empty() => {
                warn!(tally = %self.id, "Nenhuma chapa registrada; apuração selada sem vencedora");
                None
            }
            None => match &self.tie_resolution {
                Some(resolution)
                    if aggregation
                        .top_slates()
                        .iter()
                        .any(|s| s.slate_id == resolution.slate_id) =>
                {
                    Some(resolution.slate_id.clone())
                }
                _ => return Err(Violation::UnresolvedTie.into()),
            },
        };

        info!(
            tally = %self.id,
            operation,
            total = aggregation.total,
            valid = aggregation.valid,
            winner = ?winner,
            digest = %aggregation.digest,
            "Apuração selada"
        );

        let mut next = self.transition(
            actor,
            operation,
            TallyStatus::Finalized,
            Some(aggregation.digest.clone()),
            now,
        );
        next.result = Some(aggregation);
        next.winner = winner;
        Ok(next)
    }

    fn transition(
        &self,
        actor: &Actor,
        operation: &str,
        to: TallyStatus,
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

impl Entity for Tally {
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
