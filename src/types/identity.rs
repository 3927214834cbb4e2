//! Identidade do ator e credenciais (claims).
//!
//! A emissão das credenciais pertence ao provedor de identidade externo; o
//! núcleo apenas verifica que a credencial exigida foi apresentada.

use serde::{Deserialize, Serialize};

use crate::{EleitoralError, EleitoralResult};

/// Credencial apresentada pelo ator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Claim {
    /// Administração da comissão eleitoral.
    Admin,
    /// Autoridade julgadora (admissibilidade, arquivamento, sessões).
    Adjudicator,
    /// Análise documental de chapas.
    Reviewer,
    /// Homologação da apuração.
    Homologator,
}

impl std::fmt::Display for Claim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Claim::Admin => write!(f, "admin"),
            Claim::Adjudicator => write!(f, "adjudicator"),
            Claim::Reviewer => write!(f, "reviewer"),
            Claim::Homologator => write!(f, "homologator"),
        }
    }
}

/// Identidade que executa uma operação.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    /// Identificador do membro/usuário.
    pub id: String,

    /// Credenciais apresentadas.
    #[serde(default)]
    pub claims: Vec<Claim>,
}

impl Actor {
    /// Cria um ator sem credenciais.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            claims: Vec::new(),
        }
    }

    /// Adiciona uma credencial.
    pub fn with_claim(mut self, claim: Claim) -> Self {
        if !self.claims.contains(&claim) {
            self.claims.push(claim);
        }
        self
    }

    /// Verifica se a credencial foi apresentada.
    pub fn has(&self, claim: Claim) -> bool {
        self.claims.contains(&claim)
    }

    /// Exige a credencial, retornando `Unauthorized` se ausente.
    pub fn require(&self, claim: Claim) -> EleitoralResult<()> {
        if self.has(claim) {
            Ok(())
        } else {
            Err(EleitoralError::Unauthorized {
                actor: self.id.clone(),
                claim: claim.to_string(),
            })
        }
    }

    /// Exige qualquer uma das credenciais.
    pub fn require_any(&self, claims: &[Claim]) -> EleitoralResult<()> {
        if claims.iter().any(|c| self.has(*c)) {
            return Ok(());
        }
        Err(EleitoralError::Unauthorized {
            actor: self.id.clone(),
            claim: claims
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join("|"),
        })
    }
}
