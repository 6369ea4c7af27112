//! # Video Transcoding Module
//!
//! Questo modulo gestisce la transcodifica dei video tramite FFmpeg.
//!
//! ## Responsabilità:
//! - Costruzione degli argomenti FFmpeg (scale, codec, qualità, audio)
//! - Esecuzione del processo esterno con timeout e kill-on-drop
//! - Staging dell'output su file temporaneo: il file di destinazione
//!   appare solo a transcodifica riuscita
//! - Distinzione tra binario mancante (fatale) e job fallito (per-file)
//!
//! ## Pipeline di transcodifica:
//! 1. Scala a `-2:height` (larghezza pari, aspect ratio preservato)
//! 2. Ricodifica video con libx264, preset slow, CRF o bitrate target
//! 3. Ricodifica audio AAC a 128k
//! 4. `+faststart` per lo streaming web progressivo
//!
//! ## Controllo qualità (CRF):
//! - 18-23: Alta qualità (file più grandi)
//! - 24-28: Buona qualità web (default 28)
//! - 29+: Qualità in calo rapido
//!
//! ## Esempio:
//! ```rust,ignore
//! let transcoder = FfmpegTranscoder::new(Duration::from_secs(600));
//! transcoder.check_available().await?;
//! transcoder.transcode(spec).await?;
//! ```

use crate::args;
use crate::error::PipelineError;
use crate::platform::PlatformCommands;
use crate::rules::{VideoParams, VideoQuality};
use crate::utils::to_string_vec;
use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::debug;

/// One video job: where to read, where to write, how to encode
#[derive(Debug, Clone)]
pub struct TranscodeSpec {
    pub source: PathBuf,
    pub dest: PathBuf,
    pub params: VideoParams,
}

/// Capability seam over the external transcoder.
///
/// The pipeline is generic over this trait so tests can substitute a fake
/// that records jobs instead of spawning processes. Returned futures are
/// `Send` so implementations can run inside spawned tasks.
pub trait VideoTranscoder: Send + Sync + 'static {
    /// Verify the transcoder can run at all. Called once per run before
    /// any video job starts.
    fn check_available(&self) -> impl Future<Output = Result<(), PipelineError>> + Send;

    /// Transcode one video. On error the destination file must not exist.
    fn transcode(&self, spec: TranscodeSpec) -> impl Future<Output = Result<(), PipelineError>> + Send;
}

/// FFmpeg-backed transcoder
pub struct FfmpegTranscoder {
    command: String,
    timeout: Duration,
}

impl FfmpegTranscoder {
    pub fn new(timeout: Duration) -> Self {
        Self::with_command("ffmpeg", timeout)
    }

    /// Use a different binary name, mainly for tests
    pub fn with_command(command: &str, timeout: Duration) -> Self {
        Self {
            command: command.to_string(),
            timeout,
        }
    }
}

impl VideoTranscoder for FfmpegTranscoder {
    async fn check_available(&self) -> Result<(), PipelineError> {
        let platform = PlatformCommands::instance();
        if !platform.is_command_available(&self.command).await {
            return Err(PipelineError::MissingDependency(format!(
                "{} is required for video processing",
                self.command
            )));
        }
        Ok(())
    }

    async fn transcode(&self, spec: TranscodeSpec) -> Result<(), PipelineError> {
        debug!(
            "🎬 Transcoding {} to {}p",
            spec.source.display(),
            spec.params.target_height
        );

        let parent = match spec.dest.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                tokio::fs::create_dir_all(parent).await?;
                parent.to_path_buf()
            }
            _ => PathBuf::from("."),
        };

        // Stage in the destination directory so persist() is a same-device
        // rename. The temp file vanishes on any error path.
        let temp_file = tempfile::Builder::new()
            .prefix(".transcode-")
            .suffix(".mp4")
            .tempfile_in(&parent)?;

        let platform = PlatformCommands::instance();
        let ffmpeg_cmd = platform.get_command(&self.command);

        let mut cmd = Command::new(ffmpeg_cmd);
        cmd.arg("-i").arg(&spec.source);
        cmd.args(encoder_args(&spec.params));

        // Suppress FFmpeg chatter unless in debug mode
        if !tracing::enabled!(tracing::Level::DEBUG) {
            cmd.args(["-loglevel", "error"]);
        }

        cmd.arg("-y").arg(temp_file.path());
        cmd.kill_on_drop(true);

        let start_time = Instant::now();

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    PipelineError::MissingDependency(format!(
                        "{} is required for video processing",
                        self.command
                    ))
                } else {
                    PipelineError::Io(e)
                }
            })?,
            // Dropping the future kills the child process.
            Err(_) => return Err(PipelineError::TranscodeTimeout(self.timeout.as_secs())),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            debug!(
                "❌ FFmpeg failed after {:.1}s: {}",
                start_time.elapsed().as_secs_f64(),
                stderr
            );
            return Err(PipelineError::Transcode(stderr));
        }

        temp_file
            .persist(&spec.dest)
            .map_err(|e| PipelineError::Io(e.error))?;

        debug!(
            "✅ Transcode completed in {:.1}s: {}",
            start_time.elapsed().as_secs_f64(),
            spec.dest.display()
        );

        Ok(())
    }
}

/// The codec/filter/audio argument block, between `-i <in>` and `-y <out>`
fn encoder_args(params: &VideoParams) -> Vec<String> {
    let mut args = args![
        "-vf",
        format!("scale=-2:{}", params.target_height),
        "-c:v",
        "libx264",
    ];

    match params.quality {
        VideoQuality::Crf(crf) => args.extend(args!["-crf", crf]),
        VideoQuality::BitrateKbps(kbps) => args.extend(args!["-b:v", format!("{}k", kbps)]),
    }

    args.extend(to_string_vec([
        "-preset",
        "slow",
        "-c:a",
        "aac",
        "-b:a",
        "128k",
        "-movflags",
        "+faststart",
    ]));

    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn params_crf(height: u32, crf: u8) -> VideoParams {
        VideoParams {
            target_height: height,
            quality: VideoQuality::Crf(crf),
        }
    }

    #[test]
    fn test_encoder_args_with_crf() {
        let args = encoder_args(&params_crf(720, 28));
        assert_eq!(
            args,
            vec![
                "-vf",
                "scale=-2:720",
                "-c:v",
                "libx264",
                "-crf",
                "28",
                "-preset",
                "slow",
                "-c:a",
                "aac",
                "-b:a",
                "128k",
                "-movflags",
                "+faststart",
            ]
        );
    }

    #[test]
    fn test_encoder_args_with_bitrate() {
        let args = encoder_args(&VideoParams {
            target_height: 480,
            quality: VideoQuality::BitrateKbps(1000),
        });
        assert!(args.contains(&"scale=-2:480".to_string()));
        assert!(args.contains(&"-b:v".to_string()));
        assert!(args.contains(&"1000k".to_string()));
        assert!(!args.contains(&"-crf".to_string()));
    }

    #[tokio::test]
    async fn test_missing_binary_is_fatal_dependency_error() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("clip.mp4");
        let dest = dir.path().join("out").join("clip.mp4");
        std::fs::write(&source, b"fake video").unwrap();

        let transcoder = FfmpegTranscoder::with_command(
            "definitely-not-a-transcoder",
            Duration::from_secs(5),
        );
        let result = transcoder
            .transcode(TranscodeSpec {
                source,
                dest: dest.clone(),
                params: params_crf(720, 28),
            })
            .await;

        match result {
            Err(e @ PipelineError::MissingDependency(_)) => assert!(e.is_fatal()),
            other => panic!("expected MissingDependency, got {:?}", other),
        }
        assert!(!dest.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_transcode_leaves_no_partial_output() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("clip.mp4");
        let dest = dir.path().join("out").join("clip.mp4");
        std::fs::write(&source, b"fake video").unwrap();

        // `false` exits non-zero immediately, standing in for a failed job
        let transcoder = FfmpegTranscoder::with_command("false", Duration::from_secs(5));
        let result = transcoder
            .transcode(TranscodeSpec {
                source,
                dest: dest.clone(),
                params: params_crf(720, 28),
            })
            .await;

        match result {
            Err(e @ PipelineError::Transcode(_)) => assert!(!e.is_fatal()),
            other => panic!("expected Transcode error, got {:?}", other),
        }
        assert!(!dest.exists());
        // The staged temp file must be cleaned up as well
        let leftovers: Vec<_> = std::fs::read_dir(dest.parent().unwrap())
            .unwrap()
            .collect();
        assert!(leftovers.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_transcoder_times_out() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let source = dir.path().join("clip.mp4");
        let dest = dir.path().join("out").join("clip.mp4");
        std::fs::write(&source, b"fake video").unwrap();

        // A stand-in transcoder that accepts any arguments and never finishes
        let script = dir.path().join("slow-transcoder.sh");
        std::fs::write(&script, "#!/bin/sh\nsleep 30\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let transcoder = FfmpegTranscoder::with_command(
            script.to_str().unwrap(),
            Duration::from_millis(200),
        );
        let result = transcoder
            .transcode(TranscodeSpec {
                source,
                dest: dest.clone(),
                params: params_crf(720, 28),
            })
            .await;

        match result {
            Err(e @ PipelineError::TranscodeTimeout(_)) => assert!(!e.is_fatal()),
            other => panic!("expected TranscodeTimeout, got {:?}", other),
        }
        assert!(!dest.exists());
    }

    #[ignore = "requires ffmpeg on PATH"]
    #[tokio::test]
    async fn test_real_ffmpeg_roundtrip() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("clip.mp4");
        let dest = dir.path().join("out").join("clip.mp4");

        // Generate a one-second synthetic clip
        let status = std::process::Command::new("ffmpeg")
            .args([
                "-f",
                "lavfi",
                "-i",
                "testsrc=duration=1:size=320x240:rate=10",
                "-pix_fmt",
                "yuv420p",
                "-y",
            ])
            .arg(&source)
            .status()
            .expect("ffmpeg not runnable");
        assert!(status.success());

        let transcoder = FfmpegTranscoder::new(Duration::from_secs(60));
        transcoder.check_available().await.unwrap();
        transcoder
            .transcode(TranscodeSpec {
                source,
                dest: dest.clone(),
                params: params_crf(120, 28),
            })
            .await
            .unwrap();

        assert!(dest.exists());
        assert!(std::fs::metadata(&dest).unwrap().len() > 0);
    }
}
