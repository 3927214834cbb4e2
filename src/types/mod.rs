//! Tipos compartilhados.

pub mod config;
pub mod errors;
pub mod history;
pub mod identity;

/// Gera um novo identificador de entidade.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Falha com `InvalidTransition` se `current` não estiver em `allowed`.
pub(crate) fn ensure_status<S>(
    kind: &'static str,
    current: S,
    allowed: &[S],
    operation: &'static str,
) -> crate::EleitoralResult<()>
where
    S: PartialEq + std::fmt::Display,
{
    if allowed.contains(&current) {
        Ok(())
    } else {
        Err(crate::EleitoralError::invalid_transition(
            kind, current, operation,
        ))
    }
}
