//! Sistema de hooks.
//!
//! Hooks observam o núcleo depois que uma mudança foi gravada:
//!
//! - `transition`: toda transição de estado persistida
//! - `decision`: decisão de sessão despachada ao processo de origem
//! - `tally_finalized`: apuração selada (finalizada ou reprocessada)
//!
//! Hooks não alteram o fluxo: uma falha é registrada no log e não desfaz a
//! transição já gravada.

mod builtin;

pub use builtin::{LoggingHook, Metrics, MetricsHook};

use std::sync::Arc;

use async_trait::async_trait;

use crate::adjudication::DecisionEvent;
use crate::tally::Tally;
use crate::EleitoralResult;

// ═══════════════════════════════════════════════════════════════════════════
// Tipos de eventos
// ═══════════════════════════════════════════════════════════════════════════

/// Evento que dispara um hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    /// Transição persistida.
    Transition,

    /// Decisão despachada.
    Decision,

    /// Apuração selada.
    TallyFinalized,
}

impl std::fmt::Display for HookEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookEvent::Transition => write!(f, "transition"),
            HookEvent::Decision => write!(f, "decision"),
            HookEvent::TallyFinalized => write!(f, "tally_finalized"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Contexto de hooks
// ═══════════════════════════════════════════════════════════════════════════

/// Dados de uma transição persistida.
#[derive(Debug, Clone)]
pub struct TransitionInfo<'a> {
    pub kind: &'static str,
    pub id: &'a str,
    pub operation: &'a str,
    pub from: String,
    pub to: String,
    pub actor: &'a str,
}

/// Contexto passado para hooks.
pub enum HookContext<'a> {
    Transition(TransitionInfo<'a>),

    Decision {
        event: &'a DecisionEvent,
    },

    TallyFinalized {
        tally: &'a Tally,
    },
}

impl<'a> HookContext<'a> {
    /// Retorna o evento correspondente ao contexto.
    pub fn event(&self) -> HookEvent {
        match self {
            HookContext::Transition(_) => HookEvent::Transition,
            HookContext::Decision { .. } => HookEvent::Decision,
            HookContext::TallyFinalized { .. } => HookEvent::TallyFinalized,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Trait Hook
// ═══════════════════════════════════════════════════════════════════════════

/// Trait para hooks customizáveis.
#[async_trait]
pub trait Hook: Send + Sync {
    /// Nome do hook.
    fn name(&self) -> &str;

    /// Eventos que disparam este hook.
    fn events(&self) -> &[HookEvent];

    /// Executa o hook.
    async fn execute(&self, context: &HookContext<'_>) -> EleitoralResult<()>;
}

#[async_trait]
impl<H: Hook + ?Sized> Hook for Arc<H> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn events(&self) -> &[HookEvent] {
        (**self).events()
    }

    async fn execute(&self, context: &HookContext<'_>) -> EleitoralResult<()> {
        (**self).execute(context).await
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Sistema de hooks
// ═══════════════════════════════════════════════════════════════════════════

/// Gerenciador de hooks.
#[derive(Default)]
pub struct HookSystem {
    hooks: Vec<Box<dyn Hook>>,
}

impl HookSystem {
    /// Cria um novo sistema de hooks vazio.
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    /// Cria um sistema com hooks padrão (logging).
    pub fn with_defaults() -> Self {
        let mut system = Self::new();
        system.register(Box::new(LoggingHook));
        system
    }

    /// Registra um hook.
    pub fn register(&mut self, hook: Box<dyn Hook>) {
        tracing::debug!(
            hook_name = hook.name(),
            events = ?hook.events(),
            "Registering hook"
        );
        self.hooks.push(hook);
    }

    /// Executa os hooks interessados no contexto. Falhas são apenas logadas.
    pub async fn run(&self, context: &HookContext<'_>) {
        let event = context.event();
        for hook in self.hooks.iter().filter(|h| h.events().contains(&event)) {
            if let Err(e) = hook.execute(context).await {
                tracing::warn!(hook = hook.name(), event = %event, error = %e, "Hook failed");
            }
        }
    }

    /// Retorna o número total de hooks registrados.
    pub fn count(&self) -> usize {
        self.hooks.len()
    }

    /// Retorna o número de hooks para um evento específico.
    pub fn count_for_event(&self, event: HookEvent) -> usize {
        self.hooks
            .iter()
            .filter(|h| h.events().contains(&event))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EleitoralError;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // Hook de teste que conta execuções
    struct CountingHook {
        events: Vec<HookEvent>,
        count: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl Hook for CountingHook {
        fn name(&self) -> &str {
            "counting"
        }

        fn events(&self) -> &[HookEvent] {
            &self.events
        }

        async fn execute(&self, _context: &HookContext<'_>) -> EleitoralResult<()> {
            self.count.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(EleitoralError::storage("indisponível"));
            }
            Ok(())
        }
    }

    fn transition() -> HookContext<'static> {
        HookContext::Transition(TransitionInfo {
            kind: "tally",
            id: "t-1",
            operation: "pause",
            from: "in_progress".to_string(),
            to: "paused".to_string(),
            actor: "admin",
        })
    }

    #[test]
    fn test_hook_system_with_defaults() {
        let system = HookSystem::with_defaults();
        assert_eq!(system.count(), 1);
        assert_eq!(system.count_for_event(HookEvent::Transition), 1);
    }

    #[tokio::test]
    async fn test_only_matching_hooks_run() {
        let mut system = HookSystem::new();
        let count = Arc::new(AtomicUsize::new(0));

        system.register(Box::new(CountingHook {
            events: vec![HookEvent::TallyFinalized],
            count: count.clone(),
            fail: false,
        }));

        system.run(&transition()).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        let tally = Tally::new("e-1", Utc::now());
        system.run(&HookContext::TallyFinalized { tally: &tally }).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failing_hook_does_not_stop_chain() {
        let mut system = HookSystem::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        system.register(Box::new(CountingHook {
            events: vec![HookEvent::Transition],
            count: first.clone(),
            fail: true,
        }));
        system.register(Box::new(CountingHook {
            events: vec![HookEvent::Transition],
            count: second.clone(),
            fail: false,
        }));

        system.run(&transition()).await;

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_hook_event_display() {
        assert_eq!(format!("{}", HookEvent::Transition), "transition");
        assert_eq!(format!("{}", HookEvent::TallyFinalized), "tally_finalized");
    }
}
