//! Chapas de candidatura.
//!
//! Uma chapa passa por análise documental antes de ser admitida e só é
//! registrada quando todos os cargos obrigatórios têm titular aprovado e
//! nenhuma impugnação está aberta contra ela.
//!
//! ## Fluxo
//!
//! ```text
//! Draft → AwaitingReview → UnderReview → Approved → Registered
//!                 ↑             ↓    ↘ Rejected → AwaitingAppealJudgment
//!                 └── PendingDocuments      Approved ⇄ Challenged
//! ```

mod slate;

pub use slate::{CandidacySlate, CandidacyStatus};

pub use crate::adjudication::AppealRuling;

use serde::{Deserialize, Serialize};

/// Cargo de um membro na chapa.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    President,
    VicePresident,
    FirstSecretary,
    SecondSecretary,
    FirstTreasurer,
    SecondTreasurer,
    Councillor,
    Delegate,
}

impl MemberRole {
    /// Cargos de diretoria admitem um único titular.
    pub fn is_single_holder(self) -> bool {
        !matches!(self, MemberRole::Councillor | MemberRole::Delegate)
    }
}

impl std::fmt::Display for MemberRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemberRole::President => write!(f, "president"),
            MemberRole::VicePresident => write!(f, "vice_president"),
            MemberRole::FirstSecretary => write!(f, "first_secretary"),
            MemberRole::SecondSecretary => write!(f, "second_secretary"),
            MemberRole::FirstTreasurer => write!(f, "first_treasurer"),
            MemberRole::SecondTreasurer => write!(f, "second_treasurer"),
            MemberRole::Councillor => write!(f, "councillor"),
            MemberRole::Delegate => write!(f, "delegate"),
        }
    }
}

/// Situação de elegibilidade do membro.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemberStatus::Pending => write!(f, "pending"),
            MemberStatus::Approved => write!(f, "approved"),
            MemberStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// Membro de uma chapa.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlateMember {
    /// Identificador do profissional.
    pub member_id: String,
    pub name: String,
    pub role: MemberRole,
    /// `false` para suplente.
    pub titular: bool,
    pub status: MemberStatus,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

impl SlateMember {
    /// Titular com situação pendente.
    pub fn titular(member_id: impl Into<String>, name: impl Into<String>, role: MemberRole) -> Self {
        Self {
            member_id: member_id.into(),
            name: name.into(),
            role,
            titular: true,
            status: MemberStatus::Pending,
            rejection_reason: None,
        }
    }

    /// Suplente com situação pendente.
    pub fn alternate(
        member_id: impl Into<String>,
        name: impl Into<String>,
        role: MemberRole,
    ) -> Self {
        Self {
            titular: false,
            ..Self::titular(member_id, name, role)
        }
    }

    /// Membro conta para o cargo enquanto não for rejeitado.
    pub fn holds(&self, role: MemberRole) -> bool {
        self.titular && self.role == role && self.status != MemberStatus::Rejected
    }
}
