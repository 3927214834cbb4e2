//! Processos contenciosos: denúncias e impugnações.
//!
//! Denúncia e impugnação são o mesmo processo, parametrizado pela sequência de
//! rodadas com prazo:
//!
//! - Denúncia: `[Defense]`
//! - Impugnação: `[Allegations, CounterAllegations]`
//!
//! ```text
//! Received → AdmissibilityReview → Admitted → Awaiting<r> → <r>Presented | <r>NotPresented
//!     ↘ Rejected                                  ... → AwaitingJudgment → Judged → OnAppeal → Judged
//! ```

mod process;
mod round;

pub use process::{AdversarialProcess, Admissibility, ChallengeProcess, ComplaintProcess, Target};
pub use round::{LateSubmission, Round, RoundKind, Submission};

pub use crate::adjudication::Verdict;

use serde::{Deserialize, Serialize};

/// Tipo de processo, com seu plano de rodadas.
pub trait ProcessKind:
    std::fmt::Debug + Clone + Copy + PartialEq + Default + Send + Sync + 'static
{
    /// Nome da coleção.
    const KIND: &'static str;

    /// Rodadas, na ordem em que são abertas.
    const ROUNDS: &'static [RoundKind];

    /// Admissão suspende o registro da chapa alvo até o julgamento.
    const BLOCKS_TARGET: bool = false;
}

/// Denúncia: uma rodada de defesa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Complaint;

impl ProcessKind for Complaint {
    const KIND: &'static str = "complaint";
    const ROUNDS: &'static [RoundKind] = &[RoundKind::Defense];
}

/// Impugnação: alegações seguidas de contra-alegações.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Challenge;

impl ProcessKind for Challenge {
    const KIND: &'static str = "challenge";
    const ROUNDS: &'static [RoundKind] = &[RoundKind::Allegations, RoundKind::CounterAllegations];
    const BLOCKS_TARGET: bool = true;
}

/// Status do processo.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    Received,
    AdmissibilityReview,
    Admitted,
    Rejected,
    AwaitingDefense,
    DefensePresented,
    DefenseNotPresented,
    AwaitingAllegations,
    AllegationsPresented,
    AllegationsNotPresented,
    AwaitingCounterAllegations,
    CounterAllegationsPresented,
    CounterAllegationsNotPresented,
    AwaitingJudgment,
    Judged,
    OnAppeal,
    Archived,
}

impl ProcessStatus {
    /// Estados antes do julgamento que ainda podem ser arquivados.
    pub fn is_pre_judgment(self) -> bool {
        !matches!(
            self,
            ProcessStatus::Rejected
                | ProcessStatus::Judged
                | ProcessStatus::OnAppeal
                | ProcessStatus::Archived
        )
    }
}

impl std::fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProcessStatus::Received => "received",
            ProcessStatus::AdmissibilityReview => "admissibility_review",
            ProcessStatus::Admitted => "admitted",
            ProcessStatus::Rejected => "rejected",
            ProcessStatus::AwaitingDefense => "awaiting_defense",
            ProcessStatus::DefensePresented => "defense_presented",
            ProcessStatus::DefenseNotPresented => "defense_not_presented",
            ProcessStatus::AwaitingAllegations => "awaiting_allegations",
            ProcessStatus::AllegationsPresented => "allegations_presented",
            ProcessStatus::AllegationsNotPresented => "allegations_not_presented",
            ProcessStatus::AwaitingCounterAllegations => "awaiting_counter_allegations",
            ProcessStatus::CounterAllegationsPresented => "counter_allegations_presented",
            ProcessStatus::CounterAllegationsNotPresented => "counter_allegations_not_presented",
            ProcessStatus::AwaitingJudgment => "awaiting_judgment",
            ProcessStatus::Judged => "judged",
            ProcessStatus::OnAppeal => "on_appeal",
            ProcessStatus::Archived => "archived",
        };
        write!(f, "{}", s)
    }
}
