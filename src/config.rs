//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione della pipeline.
//!
//! ## Responsabilità:
//! - Definisce la struct `PipelineConfig` con tutti i parametri della run
//! - Fornisce validazione dei parametri e della tabella delle regole
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default per l'albero media del sito
//!
//! ## Parametri di configurazione:
//! - `source_root`: Directory sorgente (default: "static/media")
//! - `dest_root`: Directory di destinazione (default: "static/media_optimized")
//! - `rules`: Tabella ordinata delle regole (default: tabella del sito)
//! - `workers`: Numero di worker paralleli (default: 4)
//! - `transcode_timeout_secs`: Timeout per singolo video (default: 600)
//! - `quiet`: Sopprime la progress bar (default: false)
//!
//! ## Validazione:
//! - Controlla che workers e timeout siano > 0
//! - Controlla che sorgente e destinazione non coincidano
//! - Compila la tabella delle regole (pattern e parametri)
//!
//! ## Esempio:
//! ```rust
//! use web_media_compressor::config::PipelineConfig;
//!
//! let config = PipelineConfig {
//!     workers: 8,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use crate::error::PipelineError;
use crate::rules::{default_rules, RuleSet, RuleSpec};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for a compression pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory the pipeline reads from
    #[serde(default = "default_source_root")]
    pub source_root: PathBuf,
    /// Directory transformed and copied files are written to
    #[serde(default = "default_dest_root")]
    pub dest_root: PathBuf,
    /// Ordered rule table, evaluated first-match-wins
    #[serde(default = "default_rules")]
    pub rules: Vec<RuleSpec>,
    /// Number of parallel workers
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Per-video transcode timeout in seconds
    #[serde(default = "default_transcode_timeout")]
    pub transcode_timeout_secs: u64,
    /// Suppress the progress bar
    #[serde(default)]
    pub quiet: bool,
}

fn default_source_root() -> PathBuf {
    PathBuf::from("static/media")
}

fn default_dest_root() -> PathBuf {
    PathBuf::from("static/media_optimized")
}

fn default_workers() -> usize {
    4
}

fn default_transcode_timeout() -> u64 {
    600
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_root: default_source_root(),
            dest_root: default_dest_root(),
            rules: default_rules(),
            workers: default_workers(),
            transcode_timeout_secs: default_transcode_timeout(),
            quiet: false,
        }
    }
}

impl PipelineConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.workers == 0 {
            return Err(PipelineError::Validation(
                "Number of workers must be greater than 0".to_string(),
            ));
        }

        if self.transcode_timeout_secs == 0 {
            return Err(PipelineError::Validation(
                "Transcode timeout must be greater than 0".to_string(),
            ));
        }

        if self.source_root == self.dest_root {
            return Err(PipelineError::Validation(format!(
                "Source and destination must differ: {}",
                self.source_root.display()
            )));
        }

        // An empty table is valid: every file just gets copied.
        RuleSet::compile(&self.rules)?;

        Ok(())
    }

    /// Budget for a single external transcode
    pub fn transcode_timeout(&self) -> Duration {
        Duration::from_secs(self.transcode_timeout_secs)
    }

    /// Load configuration from a JSON file
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: PipelineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}
