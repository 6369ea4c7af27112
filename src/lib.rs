//! # Web Media Compressor Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore custom per diverse operazioni
//! - `rules`: Tabella ordinata di regole regex e trasformazioni
//! - `file_manager`: Operazioni sui file e discovery media
//! - `image`: Ridimensionamento e ricompressione immagini (JPEG/PNG)
//! - `video`: Transcodifica video via ffmpeg esterno
//! - `pipeline`: Orchestratore della run, worker e reportistica
//! - `progress`: Progress tracking
//! - `platform`: Risoluzione comandi cross-platform
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use web_media_compressor::{FfmpegTranscoder, MediaPipeline, PipelineConfig};
//!
//! let config = PipelineConfig::default();
//! let transcoder = FfmpegTranscoder::new(config.transcode_timeout());
//! let pipeline = MediaPipeline::new(config, transcoder)?;
//! let stats = pipeline.run().await?;
//! ```

pub mod config;
pub mod error;
pub mod file_manager;
pub mod image;
pub mod pipeline;
pub mod platform;
pub mod progress;
pub mod rules;
pub mod utils;
pub mod video;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use pipeline::{FileOutcome, FileReport, MediaPipeline, RunStats};
pub use rules::{RuleSet, RuleSpec};
pub use video::{FfmpegTranscoder, VideoTranscoder};
