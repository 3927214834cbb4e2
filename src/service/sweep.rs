//! Varredura de prazos vencidos.
//!
//! O núcleo não tem timer: um agendador externo chama [`ElectoralCore::sweep_expired`]
//! e decide o que fechar com `close_round`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::adversarial::{AdversarialProcess, Challenge, Complaint, ProcessKind, RoundKind};
use crate::store::RecordFilter;
use crate::EleitoralResult;

use super::ElectoralCore;

/// Janela de manifestação vencida e ainda aberta.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExpiredWindow {
    pub kind: &'static str,
    pub process_id: String,
    pub election_id: String,
    pub round: RoundKind,
    pub due_at: DateTime<Utc>,
}

impl ElectoralCore {
    /// Lista janelas vencidas, das mais antigas para as mais recentes.
    pub async fn sweep_expired(&self) -> EleitoralResult<Vec<ExpiredWindow>> {
        let now = self.now();
        let mut expired = self.expired_windows::<Complaint>(now).await?;
        expired.extend(self.expired_windows::<Challenge>(now).await?);
        expired.sort_by(|a, b| a.due_at.cmp(&b.due_at));

        info!(count = expired.len(), "Varredura de prazos concluída");
        Ok(expired)
    }

    async fn expired_windows<K: ProcessKind>(
        &self,
        now: DateTime<Utc>,
    ) -> EleitoralResult<Vec<ExpiredWindow>> {
        let processes = self
            .repo::<AdversarialProcess<K>>()
            .list(&RecordFilter::default())
            .await?;

        Ok(processes
            .into_iter()
            .filter_map(|p| {
                let (round, deadline) = p.open_window()?;
                deadline.is_expired(now).then(|| ExpiredWindow {
                    kind: K::KIND,
                    process_id: p.id.clone(),
                    election_id: p.election_id.clone(),
                    round,
                    due_at: deadline.due_at,
                })
            })
            .collect())
    }
}
