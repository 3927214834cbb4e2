//! Regra de maioria simples do colegiado.
//!
//! Abstenções contam para o quórum mas não para a maioria: decide quem tiver
//! mais votos entre "a favor" e "contra". Empate não tem regra implícita.

use serde::{Deserialize, Serialize};

use super::{CastVote, DecisionKind, VoteChoice};

/// Contagem dos votos de uma sessão.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteCount {
    pub for_votes: usize,
    pub against: usize,
    pub abstain: usize,
}

/// Resultado da votação da proposta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionOutcome {
    Carried,
    Defeated,
    Tied,
}

impl VoteCount {
    /// Conta os votos registrados.
    pub fn from_votes(votes: &[CastVote]) -> Self {
        votes.iter().fold(Self::default(), |mut count, vote| {
            match vote.choice {
                VoteChoice::For => count.for_votes += 1,
                VoteChoice::Against => count.against += 1,
                VoteChoice::Abstain => count.abstain += 1,
            }
            count
        })
    }

    /// Total de votos registrados (inclui abstenções).
    pub fn cast(&self) -> usize {
        self.for_votes + self.against + self.abstain
    }

    /// Maioria simples entre a favor e contra.
    pub fn outcome(&self) -> MotionOutcome {
        use std::cmp::Ordering;
        match self.for_votes.cmp(&self.against) {
            Ordering::Greater => MotionOutcome::Carried,
            Ordering::Less => MotionOutcome::Defeated,
            Ordering::Equal => MotionOutcome::Tied,
        }
    }

    /// Unânime quando todos os votos registrados seguem o lado vencedor.
    pub fn decision_kind(&self) -> DecisionKind {
        let unanimous = match self.outcome() {
            MotionOutcome::Carried => self.for_votes == self.cast(),
            MotionOutcome::Defeated => self.against == self.cast(),
            MotionOutcome::Tied => false,
        };
        if unanimous {
            DecisionKind::Unanimous
        } else {
            DecisionKind::Majority
        }
    }
}
