//! # Pipeline Module
//!
//! Modulo pipeline che separa le responsabilità in sottomoduli:
//! - `driver`: Orchestratore principale della run
//! - `worker`: Worker per singoli file
//! - `report`: Esiti per-file e statistiche aggregate

pub mod driver;
pub mod report;
pub mod worker;

// Re-export delle struct principali
pub use driver::MediaPipeline;
pub use report::{FileOutcome, FileReport, RunStats};
pub use worker::{FileJob, FileWorker, MatchedRule};
