//! Agregador de votos da apuração.
//!
//! Responsável por:
//! - Contar votos por chapa registrada, brancos, nulos e anulados
//! - Calcular percentuais sobre os votos válidos
//! - Ordenar o ranking
//! - Produzir o digest do conjunto de registros
//!
//! A agregação sempre parte do conjunto completo de registros; nunca há
//! contagem incremental, então repetir a mesma entrada produz o mesmo
//! resultado.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::errors::Violation;
use crate::EleitoralResult;

use super::source::{BallotChoice, VoteRecord};

/// Chapa apta a receber votos.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EligibleSlate {
    pub id: String,
    pub number: u32,
    pub name: String,
}

/// Resultado de uma chapa.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlateResult {
    pub slate_id: String,
    pub number: u32,
    pub name: String,
    pub votes: u64,
    /// Percentual sobre os votos válidos.
    pub percentage: f64,
}

/// Irregularidade encontrada na agregação.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Anomaly {
    /// Voto para chapa não registrada: vai para o bucket de anulados.
    IneligibleSlate { ballot_id: String, slate_id: String },
    /// Cédula repetida: a repetição vai para o bucket de anulados.
    DuplicateBallot { ballot_id: String },
}

/// Resultado agregado.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Aggregation {
    /// Registros contados.
    pub total: u64,
    pub valid: u64,
    pub blank: u64,
    pub null: u64,
    pub voided: u64,
    /// Ranking, do mais votado para o menos votado.
    pub slates: Vec<SlateResult>,
    #[serde(default)]
    pub anomalies: Vec<Anomaly>,
    /// SHA-256 dos registros e anulações.
    pub digest: String,
    /// Comparecimento sobre o eleitorado, quando conhecido.
    #[serde(default)]
    pub turnout: Option<f64>,
}

impl Aggregation {
    /// `valid + blank + null + voided == total` e `Σ chapas == valid`.
    pub fn is_consistent(&self) -> bool {
        let per_slate: u64 = self.slates.iter().map(|s| s.votes).sum();
        self.valid + self.blank + self.null + self.voided == self.total && per_slate == self.valid
    }

    /// Chapas empatadas no topo. Sem votos válidos, todas estão empatadas.
    pub fn top_slates(&self) -> Vec<&SlateResult> {
        if self.valid == 0 {
            return self.slates.iter().collect();
        }
        let top = self.slates.first().map(|s| s.votes).unwrap_or(0);
        self.slates.iter().filter(|s| s.votes == top).collect()
    }

    /// Vencedor inequívoco, se houver.
    pub fn clear_winner(&self) -> Option<&SlateResult> {
        match self.top_slates().as_slice() {
            [only] if self.valid > 0 => Some(*only),
            _ => None,
        }
    }
}

/// Agregador de votos.
pub struct VoteAggregator;

impl VoteAggregator {
    /// Agrega os registros de uma eleição.
    pub fn aggregate(
        election_id: &str,
        records: &[VoteRecord],
        slates: &[EligibleSlate],
        voided_ballots: &BTreeSet<String>,
        electorate_size: Option<u64>,
        decimal_places: u32,
    ) -> EleitoralResult<Aggregation> {
        let eligible: HashSet<&str> = slates.iter().map(|s| s.id.as_str()).collect();
        let mut counts: HashMap<&str, u64> = HashMap::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut anomalies = Vec::new();
        let (mut blank, mut null, mut voided) = (0u64, 0u64, 0u64);

        for record in records {
            if record.election_id != election_id {
                return Err(Violation::ForeignVoteRecord(record.ballot_id.clone()).into());
            }

            if !seen.insert(record.ballot_id.as_str()) {
                anomalies.push(Anomaly::DuplicateBallot {
                    ballot_id: record.ballot_id.clone(),
                });
                voided += 1;
                continue;
            }

            if voided_ballots.contains(&record.ballot_id) {
                voided += 1;
                continue;
            }

            match &record.choice {
                BallotChoice::Blank => blank += 1,
                BallotChoice::Null => null += 1,
                BallotChoice::Slate(slate_id) if eligible.contains(slate_id.as_str()) => {
                    *counts.entry(slate_id.as_str()).or_insert(0) += 1;
                }
                BallotChoice::Slate(slate_id) => {
                    anomalies.push(Anomaly::IneligibleSlate {
                        ballot_id: record.ballot_id.clone(),
                        slate_id: slate_id.clone(),
                    });
                    voided += 1;
                }
            }
        }

        let valid: u64 = counts.values().sum();
        let mut results: Vec<SlateResult> = slates
            .iter()
            .map(|slate| {
                let votes = counts.get(slate.id.as_str()).copied().unwrap_or(0);
                SlateResult {
                    slate_id: slate.id.clone(),
                    number: slate.number,
                    name: slate.name.clone(),
                    votes,
                    percentage: Self::percentage(votes, valid, decimal_places),
                }
            })
            .collect();

        // Mais votado primeiro; empate desempatado pelo número da chapa só para ordem estável
        results.sort_by(|a, b| b.votes.cmp(&a.votes).then(a.number.cmp(&b.number)));

        let total = records.len() as u64;
        let turnout = electorate_size
            .filter(|n| *n > 0)
            .map(|n| Self::percentage(total, n, decimal_places));

        Ok(Aggregation {
            total,
            valid,
            blank,
            null,
            voided,
            slates: results,
            anomalies,
            digest: Self::digest(records, voided_ballots),
            turnout,
        })
    }

    /// `part / whole * 100`, arredondado. Zero quando `whole` é zero.
    pub fn percentage(part: u64, whole: u64, decimal_places: u32) -> f64 {
        if whole == 0 {
            return 0.0;
        }
        let factor = 10f64.powi(decimal_places as i32);
        (part as f64 / whole as f64 * 100.0 * factor).round() / factor
    }

    /// Digest SHA-256 independente da ordem dos registros.
    pub fn digest(records: &[VoteRecord], voided_ballots: &BTreeSet<String>) -> String {
        let mut lines: Vec<String> = records
            .iter()
            .map(|r| format!("{}|{}|{}", r.election_id, r.ballot_id, r.choice))
            .collect();
        lines.sort();

        let mut hasher = Sha256::new();
        for line in &lines {
            hasher.update(line.as_bytes());
            hasher.update(b"\n");
        }
        for ballot in voided_ballots {
            hasher.update(b"void:");
            hasher.update(ballot.as_bytes());
            hasher.update(b"\n");
        }

        hex::encode(hasher.finalize())
    }
}
