//! Incremental sync of Clash Royale ranked-ladder data into a relational
//! warehouse.
//!
//! A [`Pipeline`] pulls seasons, leaderboards, players, clans, the card
//! catalogue, and battle logs from any [`royale_core::source::GameSource`]
//! and writes only what the warehouse does not hold yet.

pub mod config;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod orchestrator;
pub mod pipeline;
pub mod purge;
pub mod quarantine_file;
pub mod summary;

pub use config::EtlConfig;
pub use error::{PipelineError, StageError};
pub use pipeline::{Pipeline, PipelineSettings, Stage};
pub use summary::RunSummary;
