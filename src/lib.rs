//! # Eleitoral
//!
//! Núcleo do ciclo de vida de eleições de conselho.
//!
//! Chapas passam por análise documental antes do registro; denúncias e
//! impugnações passam por admissibilidade, defesa e rodadas contraditórias
//! antes do julgamento; sessões de julgamento exigem quórum; a apuração
//! concilia todos os votos antes de homologar um vencedor.
//!
//! ## Módulos
//!
//! - [`election`] - Status e fases da eleição
//! - [`candidacy`] - Ciclo de vida das chapas
//! - [`adversarial`] - Processo contencioso genérico (denúncia, impugnação)
//! - [`adjudication`] - Sessões de julgamento e eventos de decisão
//! - [`tally`] - Agregação de votos e apuração
//! - [`deadline`] - Relógio e prazos
//! - [`service`] - Orquestração, serialização por instância e despacho
//! - [`store`] - Persistência com concorrência otimista
//! - [`hooks`] - Observadores de transições
//! - [`cache`] - Cache LRU de agregações
//! - [`cli`] - Interface de linha de comando
//! - [`types`] - Tipos compartilhados

pub mod adjudication;
pub mod adversarial;
pub mod cache;
pub mod candidacy;
#[cfg(feature = "cli")]
pub mod cli;
pub mod deadline;
pub mod election;
pub mod hooks;
pub mod service;
pub mod store;
pub mod tally;
pub mod types;

pub use service::ElectoralCore;
pub use types::config::Config;
pub use types::errors::{EleitoralError, EleitoralResult, Violation};
pub use types::identity::{Actor, Claim};
