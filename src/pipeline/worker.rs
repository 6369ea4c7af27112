//! # File Worker Module
//!
//! Worker per l'elaborazione del singolo file.
//! Separato dal driver principale per maggiore modularità.
//!
//! Il contratto con il driver: `Err` solo per errori fatali di ambiente,
//! ogni fallimento legato al singolo file diventa `FileOutcome::Failed`.

use crate::{
    error::PipelineError,
    file_manager::FileManager,
    image::ImageTransformer,
    pipeline::report::FileOutcome,
    rules::{MediaKind, Transform},
    video::{TranscodeSpec, VideoTranscoder},
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Un file scoperto e già classificato, pronto per l'elaborazione
#[derive(Debug, Clone)]
pub struct FileJob {
    pub source: PathBuf,
    pub dest: PathBuf,
    /// `/`-normalized path the rule table was matched against
    pub relative_path: String,
    /// The winning rule, or None for verbatim copy
    pub matched: Option<MatchedRule>,
}

/// The rule that won the matching for this file
#[derive(Debug, Clone)]
pub struct MatchedRule {
    pub pattern: String,
    pub transform: Transform,
}

impl FileJob {
    pub fn is_video(&self) -> bool {
        self.matched
            .as_ref()
            .is_some_and(|m| m.transform.kind() == MediaKind::Video)
    }

    /// Last path segment, for progress messages
    pub fn file_name(&self) -> &str {
        self.relative_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.relative_path)
    }
}

/// Worker per singoli file
pub struct FileWorker<T: VideoTranscoder> {
    transcoder: Arc<T>,
}

impl<T: VideoTranscoder> Clone for FileWorker<T> {
    fn clone(&self) -> Self {
        Self {
            transcoder: Arc::clone(&self.transcoder),
        }
    }
}

impl<T: VideoTranscoder> FileWorker<T> {
    pub fn new(transcoder: Arc<T>) -> Self {
        Self { transcoder }
    }

    /// Process one file end to end.
    ///
    /// Fatal environment errors come back as `Err` and abort the run;
    /// anything scoped to this file becomes `Ok(FileOutcome::Failed)` so
    /// the run can continue.
    pub async fn process(&self, job: &FileJob) -> Result<FileOutcome, PipelineError> {
        match self.transform(job).await {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => Ok(FileOutcome::Failed {
                error: match &job.matched {
                    Some(matched) => format!("rule '{}': {}", matched.pattern, e),
                    None => e.to_string(),
                },
            }),
        }
    }

    async fn transform(&self, job: &FileJob) -> Result<FileOutcome, PipelineError> {
        let Some(matched) = &job.matched else {
            debug!("Copying '{}' (no rule matched)", job.relative_path);
            let bytes = FileManager::copy_verbatim(&job.source, &job.dest).await?;
            return Ok(FileOutcome::Copied { bytes });
        };

        debug!("Processing '{}' (rule: {})", job.relative_path, matched.pattern);
        let bytes_in = FileManager::file_size(&job.source).await?;

        match matched.transform {
            Transform::Image(params) => {
                // Decode/resize/encode is CPU-bound, keep it off the runtime
                let source = job.source.clone();
                let dest = job.dest.clone();
                let outcome = tokio::task::spawn_blocking(move || {
                    ImageTransformer::process(&source, &dest, params)
                })
                .await
                .map_err(|e| PipelineError::Task(e.to_string()))??;
                debug!("Image result for '{}': {:?}", job.relative_path, outcome);
            }
            Transform::Video(params) => {
                self.transcoder
                    .transcode(TranscodeSpec {
                        source: job.source.clone(),
                        dest: job.dest.clone(),
                        params,
                    })
                    .await?;
            }
        }

        let bytes_out = FileManager::file_size(&job.dest).await?;
        Ok(FileOutcome::Transformed {
            rule_pattern: matched.pattern.clone(),
            bytes_in,
            bytes_out,
        })
    }
}
