//! Relógio e prazos.
//!
//! Prazos são dados (timestamps) avaliados de forma preguiçosa a cada chamada
//! que altera estado. Não há timer em segundo plano no núcleo: a varredura
//! periódica que fecha janelas expiradas é um colaborador externo, que usa
//! [`Deadline::is_expired`] para decidir o que fechar.

mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::errors::Violation;
use crate::EleitoralResult;

/// Um prazo aberto em `opened_at` e que vence em `due_at` (inclusivo).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Deadline {
    /// Abertura da janela.
    pub opened_at: DateTime<Utc>,

    /// Vencimento. Manifestações em `due_at` ainda são tempestivas.
    pub due_at: DateTime<Utc>,
}

impl Deadline {
    /// Abre um prazo de `days` dias a partir de `now`.
    pub fn days_from(now: DateTime<Utc>, days: i64) -> EleitoralResult<Self> {
        if days <= 0 {
            return Err(Violation::InvalidArgument(format!(
                "prazo deve ser positivo, recebido {} dia(s)",
                days
            ))
            .into());
        }
        Ok(Self {
            opened_at: now,
            due_at: now + Duration::days(days),
        })
    }

    /// Verifica se o prazo expirou em `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.due_at
    }

    /// Tempo restante (zero quando expirado).
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        if self.is_expired(now) {
            Duration::zero()
        } else {
            self.due_at - now
        }
    }
}
