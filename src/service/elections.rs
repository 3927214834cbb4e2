//! Operações sobre eleições.

use crate::election::{Election, ElectionStatus};
use crate::types::identity::{Actor, Claim};
use crate::EleitoralResult;

use super::ElectoralCore;

impl ElectoralCore {
    /// Cria uma eleição não iniciada.
    pub async fn create_election(&self, actor: &Actor, name: &str) -> EleitoralResult<Election> {
        actor.require(Claim::Admin)?;
        let election = Election::new(name.trim(), self.now());
        self.insert(election, actor, "create").await
    }

    pub async fn start_election(&self, actor: &Actor, id: &str) -> EleitoralResult<Election> {
        self.apply(id, actor, "start", |e: &Election, now| e.start(actor, now))
            .await
    }

    /// Avança para a próxima fase do calendário.
    pub async fn advance_phase(&self, actor: &Actor, id: &str) -> EleitoralResult<Election> {
        self.apply(id, actor, "advance_phase", |e: &Election, now| {
            e.advance_phase(actor, now)
        })
        .await
    }

    pub async fn suspend_election(
        &self,
        actor: &Actor,
        id: &str,
        reason: &str,
    ) -> EleitoralResult<Election> {
        self.apply(id, actor, "suspend", |e: &Election, now| {
            e.suspend(actor, reason, now)
        })
        .await
    }

    pub async fn resume_election(&self, actor: &Actor, id: &str) -> EleitoralResult<Election> {
        self.apply(id, actor, "resume", |e: &Election, now| e.resume(actor, now))
            .await
    }

    pub async fn cancel_election(
        &self,
        actor: &Actor,
        id: &str,
        reason: &str,
    ) -> EleitoralResult<Election> {
        self.apply(id, actor, "cancel", |e: &Election, now| {
            e.cancel(actor, reason, now)
        })
        .await
    }

    pub async fn election(&self, id: &str) -> EleitoralResult<Election> {
        self.repo::<Election>().get(id).await
    }

    /// Eleições em um status.
    pub async fn elections_by_status(
        &self,
        status: ElectionStatus,
    ) -> EleitoralResult<Vec<Election>> {
        self.repo::<Election>().by_status(status).await
    }
}
