use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures from the local media collaborators (ffprobe / ffmpeg).
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("failed to probe {path}: {reason}")]
    Probe { path: PathBuf, reason: String },

    #[error("failed to extract segment {index} ({start:.1}s - {end:.1}s): {reason}")]
    Split {
        index: usize,
        start: f64,
        end: f64,
        reason: String,
    },
}

/// Failures reported by (or on the way to) the remote transcription service.
///
/// Only transient variants are eligible for retry; everything else aborts the
/// run immediately.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("transcription service rate limited the request")]
    RateLimited,

    #[error("transcription service rejected credentials: {0}")]
    Auth(String),

    #[error("transcription service rejected the request: {0}")]
    Malformed(String),

    #[error("transcription service unavailable: {0}")]
    Unavailable(String),

    #[error("network error talking to transcription service: {0}")]
    Network(String),
}

impl ServiceError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ServiceError::RateLimited | ServiceError::Unavailable(_) | ServiceError::Network(_)
        )
    }
}

/// Defects detected while merging per-segment transcripts into one timeline.
///
/// These indicate a logic or upstream-data problem, never a user error, so
/// they carry enough position info to diagnose the offending segment.
#[derive(Error, Debug)]
pub enum StitchError {
    #[error(
        "segment {segment}: cue '{text}' ends at {end:?} before it starts at {start:?}"
    )]
    NegativeSpan {
        segment: usize,
        start: Duration,
        end: Duration,
        text: String,
    },

    #[error(
        "segment {segment}: cue start {current:?} is not after the previous cue start {previous:?}"
    )]
    NonMonotonic {
        segment: usize,
        previous: Duration,
        current: Duration,
    },
}
