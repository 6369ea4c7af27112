//! # Web Media Compressor - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Caricamento della configurazione (file JSON + override da CLI)
//! - Conferma interattiva e avvio della pipeline
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (source, dest, config, workers, etc.)
//! 2. Configura il logging (INFO o DEBUG a seconda del flag verbose)
//! 3. Carica la configurazione e applica gli override da CLI
//! 4. Chiede conferma all'utente (saltabile con --yes)
//! 5. Istanzia MediaPipeline con il transcoder ffmpeg e avvia la run
//!
//! ## Esempio di utilizzo:
//! ```bash
//! media-compress static/media --output static/media_optimized --workers 8 --yes
//! ```

use anyhow::Result;
use clap::Parser;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use web_media_compressor::{FfmpegTranscoder, MediaPipeline, PipelineConfig};

#[derive(Parser)]
#[command(name = "media-compress")]
#[command(about = "Compress a website media tree with per-path rules")]
struct Args {
    /// Directory containing source media (overrides config)
    source: Option<PathBuf>,

    /// Directory for compressed output (overrides config)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON configuration file with a custom rule table
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of parallel workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Per-video transcode timeout in seconds
    #[arg(short = 't', long)]
    video_timeout: Option<u64>,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    yes: bool,

    /// Suppress the progress bar
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging, honoring RUST_LOG when set
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(if args.verbose { "debug" } else { "info" })
    });
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path).await?,
        None => PipelineConfig::default(),
    };

    // CLI arguments win over the configuration file
    if let Some(source) = args.source {
        config.source_root = source;
    }
    if let Some(output) = args.output {
        config.dest_root = output;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(timeout) = args.video_timeout {
        config.transcode_timeout_secs = timeout;
    }
    config.quiet = config.quiet || args.quiet;

    if !config.source_root.exists() {
        return Err(anyhow::anyhow!(
            "Source directory does not exist: {}",
            config.source_root.display()
        ));
    }

    if !args.yes && !confirm_run(&config.source_root, &config.dest_root)? {
        println!("Operation cancelled.");
        return Ok(());
    }

    let transcoder = FfmpegTranscoder::new(config.transcode_timeout());
    let pipeline = MediaPipeline::new(config, transcoder)?;
    pipeline.run().await?;

    Ok(())
}

/// Ask the user to confirm the run before touching anything
fn confirm_run(source: &Path, dest: &Path) -> Result<bool> {
    println!(
        "This script will process files from '{}' and save them to '{}'.",
        source.display(),
        dest.display()
    );
    print!("Do you want to continue? (y/n): ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;

    Ok(matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes"
    ))
}
