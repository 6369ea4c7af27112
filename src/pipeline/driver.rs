//! # Pipeline Driver Module
//!
//! Orchestratore principale della run: discovery, classificazione dei
//! percorsi, dispatch concorrente dei job e raccolta degli esiti.
//!
//! ## Flusso di una run:
//! 1. Discovery ricorsiva sotto la radice sorgente (mancante = fatale)
//! 2. Classificazione: prima regola che combacia, o copia verbatim
//! 3. Dedup dei percorsi canonici (ogni file fisico al più una volta)
//! 4. Probe del transcoder, solo se la run contiene video
//! 5. Dispatch: pool limitato di worker, transcodifiche sempre seriali
//! 6. Raccolta esiti: errori per-file registrati, run prosegue;
//!    errori fatali interrompono i task rimanenti
//!
//! ## Esempio:
//! ```rust,ignore
//! let pipeline = MediaPipeline::new(config, FfmpegTranscoder::new(timeout))?;
//! let stats = pipeline.run().await?;
//! println!("{}", stats.format_summary());
//! ```

use crate::{
    config::PipelineConfig,
    error::PipelineError,
    file_manager::FileManager,
    pipeline::{
        report::{FileOutcome, FileReport, RunStats},
        worker::{FileJob, FileWorker, MatchedRule},
    },
    progress::ProgressManager,
    rules::{RuleSet, Transform},
    video::VideoTranscoder,
};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// Orchestratore principale della pipeline di compressione
pub struct MediaPipeline<T: VideoTranscoder> {
    config: PipelineConfig,
    rules: RuleSet,
    transcoder: Arc<T>,
}

impl<T: VideoTranscoder> MediaPipeline<T> {
    /// Create a pipeline, validating the configuration and compiling the
    /// rule table.
    pub fn new(config: PipelineConfig, transcoder: T) -> Result<Self, PipelineError> {
        config.validate()?;
        let rules = RuleSet::compile(&config.rules)?;

        Ok(Self {
            config,
            rules,
            transcoder: Arc::new(transcoder),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline over the whole source tree.
    ///
    /// Returns `Err` only for fatal environment errors (missing source
    /// root, missing transcoder). Everything scoped to a single file is
    /// reported in the returned stats instead.
    pub async fn run(&self) -> Result<RunStats, PipelineError> {
        let start_time = Instant::now();

        info!(
            "Starting media compression: {} -> {}",
            self.config.source_root.display(),
            self.config.dest_root.display()
        );

        let files = FileManager::find_source_files(&self.config.source_root)?;
        info!("Found {} files to process", files.len());

        let mut stats = RunStats::new();

        if files.is_empty() {
            info!("No files found to process");
            return Ok(stats);
        }

        let total_files = files.len() as u64;
        let (jobs, duplicates) = self.partition_jobs(files);

        // Probe the transcoder only when this run actually has video work
        if jobs.iter().any(|job| job.is_video()) {
            if self.config.quiet {
                self.transcoder.check_available().await?;
            } else {
                let spinner = ProgressManager::spinner("Checking video transcoder...");
                let result = self.transcoder.check_available().await;
                spinner.finish_and_clear();
                result?;
            }
        }

        self.log_job_summary(&jobs);

        let progress = if self.config.quiet {
            ProgressManager::hidden(total_files)
        } else {
            ProgressManager::new(total_files)
        };

        for report in duplicates {
            progress.update(&format!("[SKIP] {}: duplicate", report.relative_path));
            stats.record(report);
        }

        let worker_pool = Arc::new(Semaphore::new(self.config.workers));
        let video_gate = Arc::new(Semaphore::new(1));
        let worker = FileWorker::new(Arc::clone(&self.transcoder));

        let mut tasks: Vec<(
            String,
            tokio::task::JoinHandle<Result<FileReport, PipelineError>>,
        )> = Vec::new();

        for job in jobs {
            let worker = worker.clone();
            let progress = progress.clone();
            let worker_pool = Arc::clone(&worker_pool);
            let video_gate = Arc::clone(&video_gate);
            let relative_path = job.relative_path.clone();

            let task = tokio::spawn(async move {
                // Videos go through their own single permit so the external
                // transcoder never runs twice at once; everything else
                // shares the worker pool.
                let _permit = if job.is_video() {
                    video_gate.acquire_owned().await
                } else {
                    worker_pool.acquire_owned().await
                }
                .map_err(|e| PipelineError::Task(e.to_string()))?;

                let outcome = worker.process(&job).await?;
                progress.update(&outcome_message(&job, &outcome));

                Ok(FileReport {
                    relative_path: job.relative_path,
                    outcome,
                })
            });

            tasks.push((relative_path, task));
        }

        let mut fatal: Option<PipelineError> = None;
        for (relative_path, task) in tasks {
            if fatal.is_some() {
                // Outputs already completed stay in place; pending work is
                // cancelled, killing any in-flight transcoder process.
                task.abort();
                continue;
            }
            match task.await {
                Ok(Ok(report)) => {
                    if let FileOutcome::Failed { error } = &report.outcome {
                        error!("Failed to process '{}': {}", report.relative_path, error);
                    }
                    stats.record(report);
                }
                Ok(Err(e)) => {
                    error!("❌ Fatal error, aborting run: {}", e);
                    fatal = Some(e);
                }
                Err(e) => {
                    warn!("Worker for '{}' died: {}", relative_path, e);
                    stats.record(FileReport {
                        relative_path,
                        outcome: FileOutcome::Failed {
                            error: format!("worker task died: {}", e),
                        },
                    });
                }
            }
        }

        if let Some(e) = fatal {
            progress.finish("aborted");
            return Err(e);
        }

        progress.finish(&stats.format_summary());
        self.log_final_stats(&stats, start_time.elapsed().as_secs_f64());

        Ok(stats)
    }

    /// Turn discovered files into classified jobs, discarding duplicates.
    ///
    /// Dedup runs on canonicalized absolute paths, so the same physical
    /// file reached twice in one run is only processed once.
    fn partition_jobs(&self, files: Vec<PathBuf>) -> (Vec<FileJob>, Vec<FileReport>) {
        let mut processed = HashSet::new();
        let mut jobs = Vec::new();
        let mut duplicates = Vec::new();

        for file in files {
            let relative_path =
                match FileManager::relative_media_path(&self.config.source_root, &file) {
                    Ok(rel) => rel,
                    Err(e) => {
                        warn!("Skipping {}: {}", file.display(), e);
                        continue;
                    }
                };

            let canonical = file.canonicalize().unwrap_or_else(|_| file.clone());
            if !processed.insert(canonical) {
                debug!("Skipping '{}', already handled this run", relative_path);
                duplicates.push(FileReport {
                    relative_path,
                    outcome: FileOutcome::DuplicateSkipped,
                });
                continue;
            }

            let dest = self.config.dest_root.join(&relative_path);
            let matched = self.rules.classify(&relative_path).map(|rule| MatchedRule {
                pattern: rule.pattern().to_string(),
                transform: rule.transform(),
            });

            jobs.push(FileJob {
                source: file,
                dest,
                relative_path,
                matched,
            });
        }

        (jobs, duplicates)
    }

    fn log_job_summary(&self, jobs: &[FileJob]) {
        let videos = jobs.iter().filter(|j| j.is_video()).count();
        let images = jobs
            .iter()
            .filter(|j| {
                matches!(
                    j.matched,
                    Some(MatchedRule {
                        transform: Transform::Image(_),
                        ..
                    })
                )
            })
            .count();
        let copies = jobs.len() - videos - images;

        info!("📊 Job distribution:");
        info!("  • Image transforms: {} files", images);
        info!("  • Video transcodes: {} files", videos);
        info!("  • Verbatim copies: {} files", copies);
        info!("  • Rule table: {} rules", self.rules.len());
        info!(
            "  • Workers: {} (video transcodes serialized)",
            self.config.workers
        );
    }

    fn log_final_stats(&self, stats: &RunStats, duration: f64) {
        info!("=== Compression Complete ===");
        info!("Files processed: {}", stats.files_total);
        info!("Transformed: {}", stats.transformed);
        info!("Copied verbatim: {}", stats.copied);
        info!("Duplicates skipped: {}", stats.duplicates_skipped);
        info!("Errors: {}", stats.failed);
        info!(
            "Transformed bytes: {} in, {} out",
            FileManager::format_size(stats.bytes_in),
            FileManager::format_size(stats.bytes_out)
        );
        info!(
            "Bytes saved: {}",
            FileManager::format_size(stats.bytes_saved())
        );
        info!(
            "Average reduction: {:.2}%",
            stats.overall_reduction_percent()
        );
        info!("Elapsed: {:.1}s", duration);
        info!(
            "✅ Compressed media written to {}",
            self.config.dest_root.display()
        );
    }
}

/// Progress-bar line for one finished file
fn outcome_message(job: &FileJob, outcome: &FileOutcome) -> String {
    match outcome {
        FileOutcome::Transformed {
            bytes_in,
            bytes_out,
            ..
        } => {
            let reduction = FileManager::calculate_reduction(*bytes_in, *bytes_out);
            format!("[OK] {}: {:.1}% saved", job.file_name(), reduction)
        }
        FileOutcome::Copied { .. } => {
            format!("[COPY] {}: no rule matched", job.file_name())
        }
        FileOutcome::DuplicateSkipped => format!("[SKIP] {}: duplicate", job.file_name()),
        FileOutcome::Failed { error } => format!("[ERROR] {}: {}", job.file_name(), error),
    }
}
