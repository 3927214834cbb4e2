//! Cache LRU de agregações.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use lru::LruCache;
use sha2::{Digest, Sha256};

use crate::tally::{Aggregation, EligibleSlate};

/// Agregação em cache.
#[derive(Debug, Clone)]
pub struct CachedAggregation {
    /// Resultado da agregação.
    pub aggregation: Aggregation,

    /// Momento em que foi cacheado.
    pub cached_at: DateTime<Utc>,
}

/// Estatísticas do cache.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Número atual de entradas.
    pub size: usize,

    /// Capacidade máxima.
    pub capacity: usize,

    /// Número de acertos (cache hits).
    pub hits: u64,

    /// Número de erros (cache misses).
    pub misses: u64,
}

impl CacheStats {
    /// Calcula a taxa de acerto.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Cache LRU de agregações.
pub struct AggregationCache {
    cache: LruCache<String, CachedAggregation>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl AggregationCache {
    /// Cria um novo cache com `capacity` entradas (mínimo 1).
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(cap),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Gera a chave a partir do digest dos registros, das chapas aptas e da
    /// precisão dos percentuais.
    ///
    /// O digest dos registros já inclui as cédulas anuladas.
    pub fn cache_key(
        vote_digest: &str,
        slates: &[EligibleSlate],
        electorate_size: Option<u64>,
        decimal_places: u32,
    ) -> String {
        let mut ids: Vec<&str> = slates.iter().map(|s| s.id.as_str()).collect();
        ids.sort_unstable();

        let mut hasher = Sha256::new();
        hasher.update(vote_digest.as_bytes());
        for id in ids {
            hasher.update(b"|");
            hasher.update(id.as_bytes());
        }
        hasher.update(format!("|e={:?}|p={}", electorate_size, decimal_places).as_bytes());

        hex::encode(hasher.finalize())
    }

    /// Busca no cache.
    pub fn get(&mut self, key: &str) -> Option<&Aggregation> {
        match self.cache.get(key) {
            Some(cached) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(&cached.aggregation)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insere no cache.
    pub fn insert(&mut self, key: String, aggregation: Aggregation) {
        self.cache.put(
            key,
            CachedAggregation {
                aggregation,
                cached_at: Utc::now(),
            },
        );
    }

    /// Limpa todo o cache.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Retorna estatísticas do cache.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.cache.len(),
            capacity: self.cache.cap().get(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
