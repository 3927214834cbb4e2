//! Serviço que orquestra os fluxos.
//!
//! O [`ElectoralCore`] é a fronteira externa do núcleo: cada operação recebe o
//! ator e o payload, serializa a instância afetada, carrega, aplica a
//! transição pura da entidade e grava com concorrência otimista. Depois da
//! gravação os hooks são notificados.
//!
//! Decisões de sessões vão para uma fila ([`DecisionOutbox`]) e são
//! despachadas ao processo de origem logo após a conclusão. Um despacho que
//! falha fica retido para nova tentativa.

mod adjudication;
mod adversarial;
mod candidacy;
mod elections;
mod locks;
mod sweep;
mod tally;

pub use locks::InstanceLocks;
pub use sweep::ExpiredWindow;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::info;

use crate::adjudication::DecisionOutbox;
use crate::cache::AggregationCache;
use crate::deadline::{Clock, SystemClock};
use crate::hooks::{HookContext, HookSystem, TransitionInfo};
use crate::store::{Entity, MemoryStore, Repository, Store};
use crate::tally::VoteSource;
use crate::types::config::Config;
use crate::types::identity::Actor;
use crate::EleitoralResult;

/// Núcleo eleitoral.
pub struct ElectoralCore {
    config: Config,
    store: Arc<dyn Store>,
    votes: Arc<dyn VoteSource>,
    clock: Arc<dyn Clock>,
    locks: InstanceLocks,
    outbox: Mutex<DecisionOutbox>,
    hooks: HookSystem,
    cache: Option<Mutex<AggregationCache>>,
}

impl ElectoralCore {
    /// Cria o núcleo com os colaboradores informados.
    pub fn new(
        config: Config,
        store: Arc<dyn Store>,
        votes: Arc<dyn VoteSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = if config.cache.enabled {
            Some(Mutex::new(AggregationCache::new(config.cache.capacity)))
        } else {
            None
        };

        Self {
            config,
            store,
            votes,
            clock,
            locks: InstanceLocks::new(),
            outbox: Mutex::new(DecisionOutbox::new()),
            hooks: HookSystem::with_defaults(),
            cache,
        }
    }

    /// Núcleo em memória com relógio do sistema.
    pub fn in_memory(config: Config, votes: Arc<dyn VoteSource>) -> Self {
        Self::new(
            config,
            Arc::new(MemoryStore::new()),
            votes,
            Arc::new(SystemClock),
        )
    }

    /// Abre o store conforme a configuração (SQLite quando habilitado).
    #[cfg(feature = "sqlite")]
    pub fn open(config: Config, votes: Arc<dyn VoteSource>) -> EleitoralResult<Self> {
        let store: Arc<dyn Store> = if config.storage.enabled {
            info!(path = %config.storage.db_path.display(), "Opening SQLite store");
            Arc::new(crate::store::SqliteStore::open(&config.storage.db_path)?)
        } else {
            Arc::new(MemoryStore::new())
        };
        Ok(Self::new(config, store, votes, Arc::new(SystemClock)))
    }

    /// Substitui o sistema de hooks.
    pub fn with_hooks(mut self, hooks: HookSystem) -> Self {
        self.hooks = hooks;
        self
    }

    /// Configuração ativa.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Momento atual segundo o relógio injetado.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Estatísticas do cache de agregações, se habilitado.
    pub async fn cache_stats(&self) -> Option<crate::cache::CacheStats> {
        match &self.cache {
            Some(cache) => Some(cache.lock().await.stats()),
            None => None,
        }
    }

    fn repo<E: Entity>(&self) -> Repository<E> {
        Repository::new(self.store.clone())
    }

    /// Carrega, transiciona e grava uma instância sob seu mutex.
    async fn apply<E, F>(
        &self,
        id: &str,
        actor: &Actor,
        operation: &'static str,
        transition: F,
    ) -> EleitoralResult<E>
    where
        E: Entity,
        F: FnOnce(&E, DateTime<Utc>) -> EleitoralResult<E>,
    {
        let _guard = self.locks.acquire(E::KIND, id).await;
        let current = self.repo::<E>().get(id).await?;
        let next = transition(&current, self.clock.now())?;
        self.commit(&current, next, actor, operation).await
    }

    /// Grava `next` (derivado de `current`) e notifica os hooks.
    async fn commit<E: Entity>(
        &self,
        current: &E,
        next: E,
        actor: &Actor,
        operation: &'static str,
    ) -> EleitoralResult<E> {
        let saved = self.repo::<E>().save(next).await?;
        self.hooks
            .run(&HookContext::Transition(TransitionInfo {
                kind: E::KIND,
                id: saved.id(),
                operation,
                from: current.status_label(),
                to: saved.status_label(),
                actor: &actor.id,
            }))
            .await;
        Ok(saved)
    }

    /// Insere uma entidade nova.
    async fn insert<E: Entity>(
        &self,
        entity: E,
        actor: &Actor,
        operation: &'static str,
    ) -> EleitoralResult<E> {
        let saved = self.repo::<E>().save(entity).await?;
        info!(kind = E::KIND, id = %saved.id(), actor = %actor.id, "{}", operation);
        self.hooks
            .run(&HookContext::Transition(TransitionInfo {
                kind: E::KIND,
                id: saved.id(),
                operation,
                from: "-".to_string(),
                to: saved.status_label(),
                actor: &actor.id,
            }))
            .await;
        Ok(saved)
    }

    /// Remove uma entidade sob seu mutex, após `check`.
    async fn remove<E, F>(&self, id: &str, check: F) -> EleitoralResult<()>
    where
        E: Entity,
        F: FnOnce(&E) -> EleitoralResult<()>,
    {
        let _guard = self.locks.acquire(E::KIND, id).await;
        let repo = self.repo::<E>();
        let current = repo.get(id).await?;
        check(&current)?;
        repo.delete(&current).await?;
        info!(kind = E::KIND, id, "Entity deleted");
        Ok(())
    }
}
