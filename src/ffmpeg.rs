use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::MediaError;
use crate::segment::SegmentPlan;

/// A probed source file. Immutable once created.
#[derive(Debug, Clone)]
pub struct SourceMedia {
    pub path: PathBuf,
    pub duration: f64,
    pub size_bytes: u64,
}

/// Local media collaborator: duration probing and clip extraction.
///
/// The pipeline only talks to this trait so tests can run without ffmpeg
/// on the machine.
pub trait MediaSplitter: Send + Sync {
    fn probe_duration_seconds(&self, path: &Path) -> Result<f64, MediaError>;

    /// Materialize one planned segment of `source` as an independent audio
    /// file at `output`.
    fn extract_clip(
        &self,
        source: &Path,
        plan: &SegmentPlan,
        output: &Path,
    ) -> Result<(), MediaError>;
}

pub fn probe_media(splitter: &dyn MediaSplitter, path: &Path) -> Result<SourceMedia, MediaError> {
    let duration = splitter.probe_duration_seconds(path)?;
    let size_bytes = fs::metadata(path)
        .map_err(|err| MediaError::Probe {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?
        .len();
    Ok(SourceMedia {
        path: path.to_path_buf(),
        duration,
        size_bytes,
    })
}

/// Splitter backed by the ffprobe and ffmpeg binaries on PATH.
pub struct FfmpegSplitter;

impl MediaSplitter for FfmpegSplitter {
    fn probe_duration_seconds(&self, path: &Path) -> Result<f64, MediaError> {
        let probe_error = |reason: String| MediaError::Probe {
            path: path.to_path_buf(),
            reason,
        };

        let output = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .output()
            .map_err(|err| probe_error(format!("failed to run ffprobe: {err}")))?;

        if !output.status.success() {
            return Err(probe_error(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let duration_str = String::from_utf8_lossy(&output.stdout);
        duration_str
            .trim()
            .parse()
            .map_err(|_| probe_error(format!("unparseable ffprobe duration '{}'", duration_str.trim())))
    }

    fn extract_clip(
        &self,
        source: &Path,
        plan: &SegmentPlan,
        output: &Path,
    ) -> Result<(), MediaError> {
        let split_error = |reason: String| MediaError::Split {
            index: plan.index,
            start: plan.start,
            end: plan.end,
            reason,
        };

        // Re-encode to mono mp3; the remote service only needs the audio
        // track and its upload ceiling is easier to stay under this way.
        let result = Command::new("ffmpeg")
            .arg("-v")
            .arg("error")
            .arg("-y")
            .arg("-i")
            .arg(source)
            .arg("-ss")
            .arg(plan.start.to_string())
            .arg("-to")
            .arg(plan.end.to_string())
            .arg("-vn")
            .arg("-ac")
            .arg("1")
            .arg("-c:a")
            .arg("libmp3lame")
            .arg("-b:a")
            .arg("192k")
            .arg(output)
            .output()
            .map_err(|err| split_error(format!("failed to run ffmpeg: {err}")))?;

        if !result.status.success() {
            return Err(split_error(
                String::from_utf8_lossy(&result.stderr).trim().to_string(),
            ));
        }

        Ok(())
    }
}
