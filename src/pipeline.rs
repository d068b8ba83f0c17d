use anyhow::{Context, Result};
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::ffmpeg::{MediaSplitter, probe_media};
use crate::segment::{SegmentPlan, plan_segments};
use crate::srt::{SrtCue, format_srt, format_transcript, parse_srt};
use crate::stitch::{StitchOptions, stitch};
use crate::transcribe::{RetryPolicy, Transcriber, with_retry};
use crate::ui::{Level, emit};
use crate::utils::compute_file_hash;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub source: PathBuf,
    pub output: PathBuf,
    pub segment_length: f64,
    pub overlap: f64,
    pub jobs: usize,
    pub max_repeats: usize,
    pub reuse: bool,
    pub keep_progress: bool,
    pub progress_dir: Option<PathBuf>,
}

#[derive(Debug)]
pub struct PipelineSummary {
    pub segments: usize,
    pub cues: usize,
    pub output: PathBuf,
}

/// Per-run scratch space for clips and per-segment transcripts.
///
/// The ephemeral variant is removed on every exit path when it drops; a
/// persistent directory survives failed runs so they can be resumed with
/// `--reuse`.
enum WorkDir {
    Ephemeral(TempDir),
    Persistent(PathBuf),
}

impl WorkDir {
    fn path(&self) -> &Path {
        match self {
            WorkDir::Ephemeral(dir) => dir.path(),
            WorkDir::Persistent(path) => path,
        }
    }

    fn is_persistent(&self) -> bool {
        matches!(self, WorkDir::Persistent(_))
    }
}

/// Run the whole pipeline: probe, segment, transcribe, stitch, write.
///
/// The subtitle file is written only after the full cue sequence has been
/// merged and validated; any failure leaves no partial output behind.
pub async fn run(
    splitter: &dyn MediaSplitter,
    transcriber: &dyn Transcriber,
    retry: &RetryPolicy,
    options: &PipelineOptions,
) -> Result<PipelineSummary> {
    let media = probe_media(splitter, &options.source)?;
    emit(
        Level::Info,
        "pipeline.probe",
        &format!(
            "{}: {:.1}s, {:.1} MiB",
            media.path.display(),
            media.duration,
            media.size_bytes as f64 / (1024.0 * 1024.0)
        ),
    );

    let plans = plan_segments(media.duration, options.segment_length, options.overlap)?;
    emit(
        Level::Info,
        "pipeline.plan",
        &format!(
            "{} segment(s) of up to {:.0}s each",
            plans.len(),
            options.segment_length
        ),
    );

    let workdir = resolve_workdir(options)?;
    let transcripts = transcribe_all(splitter, transcriber, retry, options, &plans, &workdir)
        .await?;

    let paired: Vec<(SegmentPlan, Vec<SrtCue>)> = plans.into_iter().zip(transcripts).collect();
    let cues = stitch(
        &paired,
        &StitchOptions {
            overlap: options.overlap,
            max_repeats: options.max_repeats,
        },
    )?;

    if cues.is_empty() {
        emit(
            Level::Warn,
            "pipeline.empty",
            "The service returned no usable captions; writing an empty subtitle file",
        );
    }

    fs::write(&options.output, format_srt(&cues))
        .with_context(|| format!("Failed to write subtitles to {}", options.output.display()))?;
    emit(
        Level::Success,
        "pipeline.done",
        &format!("Wrote {} cue(s) to {}", cues.len(), options.output.display()),
    );

    finish_workdir(workdir, options);

    Ok(PipelineSummary {
        segments: paired.len(),
        cues: cues.len(),
        output: options.output.clone(),
    })
}

fn resolve_workdir(options: &PipelineOptions) -> Result<WorkDir> {
    let persistent_root = if let Some(dir) = &options.progress_dir {
        Some(dir.clone())
    } else if options.reuse || options.keep_progress {
        Some(default_progress_dir(&options.source)?)
    } else {
        None
    };

    match persistent_root {
        Some(dir) => {
            fs::create_dir_all(&dir).with_context(|| {
                format!("Failed to create progress directory {}", dir.display())
            })?;
            emit(
                Level::Debug,
                "pipeline.workdir",
                &format!("Using progress directory {}", dir.display()),
            );
            Ok(WorkDir::Persistent(dir))
        }
        None => {
            let dir = tempfile::tempdir().context("Failed to create temporary work directory")?;
            Ok(WorkDir::Ephemeral(dir))
        }
    }
}

fn default_progress_dir(source: &Path) -> Result<PathBuf> {
    let hash = compute_file_hash(source)?;
    let root = dirs::cache_dir()
        .context("Unable to determine cache directory for progress files")?
        .join("substitch");
    Ok(root.join(&hash[..16]))
}

/// Dispatch segment transcriptions with bounded concurrency but consume the
/// results strictly in segment order, so the stitcher never sees anything
/// out of order regardless of which call finished first.
async fn transcribe_all(
    splitter: &dyn MediaSplitter,
    transcriber: &dyn Transcriber,
    retry: &RetryPolicy,
    options: &PipelineOptions,
    plans: &[SegmentPlan],
    workdir: &WorkDir,
) -> Result<Vec<Vec<SrtCue>>> {
    let progress = ProgressBar::new(plans.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} segments {msg}")
            .unwrap()
            .progress_chars("█▉▊▋▌▍▎▏ "),
    );

    let mut stream = futures_util::stream::iter(plans.iter().map(|plan| {
        transcribe_segment(splitter, transcriber, retry, options, plan, workdir)
    }))
    .buffered(options.jobs.max(1));

    let mut transcripts = Vec::with_capacity(plans.len());
    while let Some(result) = stream.next().await {
        transcripts.push(result?);
        progress.inc(1);
    }
    progress.finish_and_clear();
    Ok(transcripts)
}

async fn transcribe_segment(
    splitter: &dyn MediaSplitter,
    transcriber: &dyn Transcriber,
    retry: &RetryPolicy,
    options: &PipelineOptions,
    plan: &SegmentPlan,
    workdir: &WorkDir,
) -> Result<Vec<SrtCue>> {
    let stem = plan.file_stem();
    let clip_path = workdir.path().join(format!("{stem}.mp3"));
    let cache_path = workdir.path().join(format!("{stem}.srt"));

    if options.reuse && cache_path.exists() {
        emit(
            Level::Info,
            "segment.reuse",
            &format!("Segment {}: reusing cached transcript", plan.index + 1),
        );
        let cached = fs::read_to_string(&cache_path).with_context(|| {
            format!("Failed to read cached transcript {}", cache_path.display())
        })?;
        return parse_srt(&cached).with_context(|| {
            format!("Cached transcript {} is corrupt", cache_path.display())
        });
    }

    if !(options.reuse && clip_path.exists()) {
        emit(
            Level::Debug,
            "segment.split",
            &format!(
                "Segment {}: extracting {:.1}s - {:.1}s",
                plan.index + 1,
                plan.start,
                plan.end
            ),
        );
        splitter.extract_clip(&options.source, plan, &clip_path)?;
    }

    let cues = with_retry(retry, "segment.retry", || transcriber.transcribe(&clip_path))
        .await
        .with_context(|| {
            format!(
                "Transcription of segment {} ({:.1}s - {:.1}s) failed",
                plan.index + 1,
                plan.start,
                plan.end
            )
        })?;

    if workdir.is_persistent() {
        fs::write(&cache_path, format_transcript(&cues)).with_context(|| {
            format!("Failed to cache transcript at {}", cache_path.display())
        })?;
    } else {
        // The clip has served its purpose; reclaim disk before the other
        // segments finish.
        let _ = fs::remove_file(&clip_path);
    }

    Ok(cues)
}

fn finish_workdir(workdir: WorkDir, options: &PipelineOptions) {
    if let WorkDir::Persistent(dir) = workdir
        && !options.keep_progress
        && options.progress_dir.is_none()
    {
        if let Err(err) = fs::remove_dir_all(&dir) {
            emit(
                Level::Warn,
                "pipeline.cleanup",
                &format!("Failed to remove progress directory {}: {err}", dir.display()),
            );
        }
    }
}
