//! Serialização por instância.
//!
//! Cada entidade é uma unidade de serialização: o serviço segura o mutex da
//! instância do carregamento até a gravação. Instâncias diferentes seguem em
//! paralelo.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Mapa de mutexes por `(tipo, id)`.
#[derive(Default)]
pub struct InstanceLocks {
    locks: StdMutex<HashMap<(&'static str, String), Arc<Mutex<()>>>>,
}

impl InstanceLocks {
    /// Cria um mapa vazio.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adquire o mutex da instância.
    pub async fn acquire(&self, kind: &'static str, id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks
                .entry((kind, id.to_string()))
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Remove mutexes que ninguém segura.
    pub fn prune(&self) -> usize {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        let before = locks.len();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - locks.len()
    }

    /// Número de instâncias conhecidas.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Indica se não há instâncias conhecidas.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_instance_is_serialized() {
        let locks = Arc::new(InstanceLocks::new());
        let guard = locks.acquire("tally", "t-1").await;

        let other = locks.clone();
        let waiter = tokio::spawn(async move {
            let _guard = other.acquire("tally", "t-1").await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_instances_run_in_parallel() {
        let locks = InstanceLocks::new();
        let _a = locks.acquire("tally", "t-1").await;
        let _b = locks.acquire("tally", "t-2").await;
        let _c = locks.acquire("election", "t-1").await;
        assert_eq!(locks.len(), 3);
    }

    #[tokio::test]
    async fn test_prune_keeps_held_locks() {
        let locks = InstanceLocks::new();
        let held = locks.acquire("tally", "t-1").await;
        drop(locks.acquire("tally", "t-2").await);

        assert_eq!(locks.prune(), 1);
        assert_eq!(locks.len(), 1);
        drop(held);
        assert_eq!(locks.prune(), 1);
        assert!(locks.is_empty());
    }
}
