use anyhow::{Result, bail};
use clap::{Args, Subcommand, ValueHint};
use std::path::PathBuf;

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Transcribe a media file into an SRT subtitle track
    Transcribe(RunArgs),
    /// Transcribe and translate a media file to English subtitles
    Translate(RunArgs),
    /// Print duration and size of a media file
    Probe(ProbeArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ProbeArgs {
    /// Media file to probe
    #[arg(value_hint = ValueHint::FilePath)]
    pub input: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Source media file (audio or video)
    #[arg(value_hint = ValueHint::FilePath)]
    pub input: PathBuf,

    /// Optional output path; defaults to <inputname>.srt next to the input
    #[arg(short = 'o', long = "out-file", value_hint = ValueHint::FilePath)]
    pub out_file: Option<PathBuf>,

    /// Maximum segment length in seconds sent to the service per call
    #[arg(short = 's', long, default_value_t = 600.0)]
    pub segment_length: f64,

    /// Overlap window between adjacent segments in seconds
    #[arg(long, default_value_t = 0.0)]
    pub overlap: f64,

    /// Spoken language hint in ISO 639-1 format (transcription only)
    #[arg(short = 'l', long)]
    pub language: Option<String>,

    /// Drop runs of this many or more consecutive identical captions
    /// (silence hallucinations); 0 disables
    #[arg(long, default_value_t = 3)]
    pub max_repeats: usize,

    /// Number of segments transcribed concurrently
    #[arg(short = 'j', long, default_value_t = 2)]
    pub jobs: usize,

    /// Maximum retries per segment on transient service failures
    #[arg(long, default_value_t = 3)]
    pub max_retries: u32,

    /// Base delay in seconds for retry backoff
    #[arg(long, default_value_t = 1.0)]
    pub retry_delay: f64,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 120.0)]
    pub timeout: f64,

    /// API key for the transcription service
    #[arg(long)]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long)]
    pub api_base: Option<String>,

    /// Reuse clips and per-segment transcripts from a previous run
    #[arg(long)]
    pub reuse: bool,

    /// Keep the progress directory after a successful run
    #[arg(long)]
    pub keep_progress: bool,

    /// Directory for per-segment work files; implies keeping them around.
    /// Defaults to a temporary directory removed on exit
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub progress_dir: Option<PathBuf>,
}

impl RunArgs {
    pub fn validate(&self) -> Result<()> {
        if self.segment_length < 10.0 {
            bail!("segment length must be at least 10 seconds");
        }
        if self.overlap < 0.0 || self.overlap >= self.segment_length {
            bail!("overlap must be at least 0 and less than the segment length");
        }
        if self.max_repeats == 1 {
            bail!("max-repeats must be 0 (disabled) or at least 2");
        }
        if self.jobs == 0 {
            bail!("jobs must be at least 1");
        }
        if self.timeout <= 0.0 {
            bail!("timeout must be positive");
        }
        if self.retry_delay <= 0.0 {
            bail!("retry delay must be positive");
        }
        Ok(())
    }

    pub fn output_path(&self) -> PathBuf {
        self.out_file
            .clone()
            .unwrap_or_else(|| self.input.with_extension("srt"))
    }
}
