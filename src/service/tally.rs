//! Operações de apuração.

use tracing::debug;

use crate::cache::AggregationCache;
use crate::candidacy::{CandidacySlate, CandidacyStatus};
use crate::election::Election;
use crate::hooks::HookContext;
use crate::store::{Entity, RecordFilter};
use crate::tally::{
    Aggregation, EligibleSlate, Tally, TallyInput, TallyStatus, VoteAggregator, VoteRecord,
};
use crate::types::errors::Violation;
use crate::types::identity::{Actor, Claim};
use crate::EleitoralResult;

use super::ElectoralCore;

/// Chave de serialização da criação de apurações de uma eleição.
const TALLY_CREATION: &str = "tally_creation";

/// Registros e chapas aptas de uma eleição.
struct Ballots {
    records: Vec<VoteRecord>,
    slates: Vec<EligibleSlate>,
}

impl ElectoralCore {
    /// Cria a apuração de uma eleição (uma por eleição).
    pub async fn create_tally(&self, actor: &Actor, election_id: &str) -> EleitoralResult<Tally> {
        actor.require(Claim::Admin)?;
        self.repo::<Election>().get(election_id).await?;

        let _guard = self.locks.acquire(TALLY_CREATION, election_id).await;
        if !self.repo::<Tally>().by_election(election_id).await?.is_empty() {
            return Err(Violation::InvalidArgument(format!(
                "eleição '{}' já possui apuração",
                election_id
            ))
            .into());
        }

        let tally = Tally::new(election_id, self.now());
        self.insert(tally, actor, "create").await
    }

    /// Inicia a apuração com o total declarado pela fonte de votos.
    pub async fn start_tally(&self, actor: &Actor, id: &str) -> EleitoralResult<Tally> {
        let _guard = self.locks.acquire(Tally::KIND, id).await;
        let current = self.repo::<Tally>().get(id).await?;
        let election = self.repo::<Election>().get(&current.election_id).await?;
        let declared = self.votes.declared_total(&current.election_id).await?;
        let electorate = self.votes.electorate_size(&current.election_id).await?;

        let next = current.start(actor, &election, declared, electorate, self.now())?;
        self.commit(&current, next, actor, "start").await
    }

    pub async fn pause_tally(&self, actor: &Actor, id: &str, reason: &str) -> EleitoralResult<Tally> {
        self.apply(id, actor, "pause", |t: &Tally, now| t.pause(actor, reason, now))
            .await
    }

    pub async fn resume_tally(&self, actor: &Actor, id: &str) -> EleitoralResult<Tally> {
        self.apply(id, actor, "resume", |t: &Tally, now| t.resume(actor, now))
            .await
    }

    /// Recalcula o resultado parcial.
    pub async fn recount(&self, actor: &Actor, id: &str) -> EleitoralResult<Tally> {
        let ballots = self.ballots_for(id).await?;
        let places = self.config.tally.decimal_places;
        self.apply(id, actor, "recount", |t: &Tally, now| {
            t.recount(actor, ballots.input(places), now)
        })
        .await
    }

    /// Anula uma cédula.
    pub async fn void_ballot(
        &self,
        actor: &Actor,
        id: &str,
        ballot_id: &str,
        reason: &str,
    ) -> EleitoralResult<Tally> {
        let ballots = self.ballots_for(id).await?;
        self.apply(id, actor, "void_ballot", |t: &Tally, now| {
            t.void_ballot(actor, ballot_id, reason, &ballots.records, now)
        })
        .await
    }

    /// Escolhe o vencedor entre as chapas empatadas no topo.
    pub async fn resolve_tie(
        &self,
        actor: &Actor,
        id: &str,
        slate_id: &str,
        rationale: &str,
    ) -> EleitoralResult<Tally> {
        let ballots = self.ballots_for(id).await?;
        let places = self.config.tally.decimal_places;
        self.apply(id, actor, "resolve_tie", |t: &Tally, now| {
            t.resolve_tie(actor, slate_id, rationale, ballots.input(places), now)
        })
        .await
    }

    /// Finaliza a apuração, exigindo contagem completa.
    pub async fn finalize_tally(&self, actor: &Actor, id: &str) -> EleitoralResult<Tally> {
        let ballots = self.ballots_for(id).await?;
        let places = self.config.tally.decimal_places;
        let sealed = self
            .apply(id, actor, "finalize", |t: &Tally, now| {
                t.finalize(actor, ballots.input(places), now)
            })
            .await?;
        self.hooks
            .run(&HookContext::TallyFinalized { tally: &sealed })
            .await;
        Ok(sealed)
    }

    /// Recalcula do zero um resultado finalizado ou contestado.
    pub async fn reprocess_tally(&self, actor: &Actor, id: &str) -> EleitoralResult<Tally> {
        let ballots = self.ballots_for(id).await?;
        let places = self.config.tally.decimal_places;
        let sealed = self
            .apply(id, actor, "reprocess", |t: &Tally, now| {
                t.reprocess(actor, ballots.input(places), now)
            })
            .await?;
        self.hooks
            .run(&HookContext::TallyFinalized { tally: &sealed })
            .await;
        Ok(sealed)
    }

    pub async fn contest_tally(&self, actor: &Actor, id: &str, reason: &str) -> EleitoralResult<Tally> {
        self.apply(id, actor, "contest", |t: &Tally, now| t.contest(actor, reason, now))
            .await
    }

    pub async fn homologate_tally(&self, actor: &Actor, id: &str) -> EleitoralResult<Tally> {
        self.apply(id, actor, "homologate", |t: &Tally, now| t.homologate(actor, now))
            .await
    }

    pub async fn publish_tally(&self, actor: &Actor, id: &str) -> EleitoralResult<Tally> {
        self.apply(id, actor, "publish", |t: &Tally, now| t.publish(actor, now))
            .await
    }

    /// Agregação parcial em qualquer status, servida pelo cache quando possível.
    pub async fn tally_snapshot(&self, id: &str) -> EleitoralResult<Aggregation> {
        let tally = self.repo::<Tally>().get(id).await?;
        let ballots = self.load_ballots(&tally.election_id).await?;
        let places = self.config.tally.decimal_places;

        let Some(cache) = &self.cache else {
            return tally.snapshot(ballots.input(places));
        };

        let digest = VoteAggregator::digest(&ballots.records, &tally.voided_ballots);
        let key = AggregationCache::cache_key(&digest, &ballots.slates, tally.electorate_size, places);
        if let Some(hit) = cache.lock().await.get(&key) {
            debug!(tally = id, "Agregação servida do cache");
            return Ok(hit.clone());
        }

        let aggregation = tally.snapshot(ballots.input(places))?;
        cache.lock().await.insert(key, aggregation.clone());
        Ok(aggregation)
    }

    pub async fn tally(&self, id: &str) -> EleitoralResult<Tally> {
        self.repo::<Tally>().get(id).await
    }

    pub async fn tally_by_election(&self, election_id: &str) -> EleitoralResult<Option<Tally>> {
        Ok(self
            .repo::<Tally>()
            .by_election(election_id)
            .await?
            .into_iter()
            .next())
    }

    pub async fn tallies_by_status(&self, status: TallyStatus) -> EleitoralResult<Vec<Tally>> {
        self.repo::<Tally>().by_status(status).await
    }

    async fn ballots_for(&self, tally_id: &str) -> EleitoralResult<Ballots> {
        let tally = self.repo::<Tally>().get(tally_id).await?;
        self.load_ballots(&tally.election_id).await
    }

    /// Registros imutáveis e chapas registradas da eleição.
    async fn load_ballots(&self, election_id: &str) -> EleitoralResult<Ballots> {
        let records = self.votes.records(election_id).await?;
        let filter = RecordFilter {
            election_id: Some(election_id.to_string()),
            status: Some(CandidacyStatus::Registered.to_string()),
        };
        let slates = self
            .repo::<CandidacySlate>()
            .list(&filter)
            .await?
            .into_iter()
            .map(|s| EligibleSlate {
                id: s.id,
                number: s.number,
                name: s.name,
            })
            .collect();
        Ok(Ballots { records, slates })
    }
}

impl Ballots {
    fn input(&self, decimal_places: u32) -> TallyInput<'_> {
        TallyInput {
            records: &self.records,
            slates: &self.slates,
            decimal_places,
        }
    }
}
