//! Cache LRU de agregações.
//!
//! A agregação é determinística para um mesmo conjunto de registros, chapas e
//! anulações, então o resultado pode ser reaproveitado enquanto a entrada não
//! mudar. A chave é um hash SHA-256 dessa entrada.

mod lru;

pub use lru::{AggregationCache, CacheStats, CachedAggregation};
