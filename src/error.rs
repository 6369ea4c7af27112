//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce `PipelineError` enum per categorizzare tutti gli errori possibili
//! - Distingue errori fatali (ambiente) da errori recuperabili (per-file)
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `Io`: Errori di I/O (file non trovati, permessi, etc.)
//! - `Decode`: Errori di decodifica immagini (file corrotti, formati non supportati)
//! - `Encode`: Errori di codifica JPEG in uscita
//! - `Transcode`: Il transcoder esterno è fallito su un file
//! - `Task`: Un worker è morto senza produrre un esito
//! - `TranscodeTimeout`: Il transcoder ha superato il timeout configurato
//! - `MissingDependency`: Tool esterno mancante (ffmpeg), errore fatale
//! - `SourceMissing`: La directory sorgente non esiste (fatale, pre-flight)
//! - `Pattern`: Pattern regex non valido nella tabella delle regole
//! - `Validation`: Errori di validazione configurazione
//!
//! ## Esempio:
//! ```rust,ignore
//! if !ffmpeg_available {
//!     return Err(PipelineError::MissingDependency("ffmpeg".to_string()));
//! }
//! ```

use std::path::PathBuf;

/// Custom error types for the compression pipeline
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image decode error: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Image encode error: {0}")]
    Encode(String),

    #[error("Transcoder error: {0}")]
    Transcode(String),

    /// A worker task died before producing a result
    #[error("Worker task failed: {0}")]
    Task(String),

    #[error("Transcoder timed out after {0}s")]
    TranscodeTimeout(u64),

    #[error("Dependency missing: {0}")]
    MissingDependency(String),

    #[error("Source directory not found: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("Invalid rule pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("Configuration error: {0}")]
    Validation(String),
}

impl PipelineError {
    /// Fatal errors abort the whole run; everything else is scoped to
    /// the single file that produced it.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::MissingDependency(_) | PipelineError::SourceMissing(_)
        )
    }
}
