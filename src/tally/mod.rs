//! Apuração.
//!
//! ```text
//! NotStarted → InProgress ⇄ Paused
//!                  ↓ finalize
//!              Finalized → Homologated → Published
//!                  ↕ contest / reprocess
//!              Contested
//! ```
//!
//! A agregação é pura ([`VoteAggregator`]); a máquina de estados ([`Tally`])
//! guarda o resultado selado, o vencedor e as anulações.

mod aggregator;
mod engine;
mod source;

pub use aggregator::{Aggregation, Anomaly, EligibleSlate, SlateResult, VoteAggregator};
pub use engine::{Tally, TallyInput, TallyStatus, TieResolution};
pub use source::{BallotChoice, MemoryVoteSource, VoteBatch, VoteRecord, VoteSource};
