mod cli;
mod config;
mod error;
mod ffmpeg;
mod pipeline;
mod segment;
mod srt;
mod stitch;
mod transcribe;
mod ui;
mod utils;

use anyhow::Result;
use clap::Parser;
use std::time::Duration;

use crate::cli::{Commands, ProbeArgs, RunArgs};
use crate::config::ApiSettings;
use crate::ffmpeg::{FfmpegSplitter, probe_media};
use crate::transcribe::{Mode, RetryPolicy, WhisperApi};
use crate::ui::{Level, emit};
use crate::utils::canonicalize_existing;

/// Subtitle long media files by segmenting them through a remote
/// transcription service and stitching the results back together.
#[derive(Parser, Debug)]
#[command(name = "substitch", version, about, long_about = None)]
struct Cli {
    /// Activate debug output
    #[arg(short, long, global = true)]
    debug: bool,

    /// Emit machine-readable JSON events instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    ui::set_debug_mode(cli.debug);
    ui::set_json_output(cli.json);

    let result = match cli.command {
        Commands::Transcribe(args) => run_pipeline(args, Mode::Transcriptions).await,
        Commands::Translate(args) => run_pipeline(args, Mode::Translations).await,
        Commands::Probe(args) => probe(args),
    };

    if let Err(err) = result {
        emit(Level::Error, "fatal", &format!("{err:#}"));
        std::process::exit(1);
    }
}

fn probe(args: ProbeArgs) -> Result<()> {
    let path = canonicalize_existing(&args.input)?;
    let media = probe_media(&FfmpegSplitter, &path)?;
    emit(
        Level::Info,
        "probe.result",
        &format!(
            "{}: {:.3}s, {} bytes",
            media.path.display(),
            media.duration,
            media.size_bytes
        ),
    );
    Ok(())
}

async fn run_pipeline(args: RunArgs, mode: Mode) -> Result<()> {
    args.validate()?;
    let source = canonicalize_existing(&args.input)?;
    let output = args.output_path();
    let settings = ApiSettings::resolve(args.api_key.clone(), args.api_base.clone())?;

    let language = match mode {
        Mode::Transcriptions => args.language.clone(),
        Mode::Translations => {
            if args.language.is_some() {
                emit(
                    Level::Warn,
                    "run.language_ignored",
                    "--language is ignored when translating; the target is always English",
                );
            }
            None
        }
    };

    let transcriber = WhisperApi::new(
        settings.api_base,
        settings.api_key,
        mode,
        language,
        Duration::from_secs_f64(args.timeout),
    )?;
    let retry = RetryPolicy {
        max_retries: args.max_retries,
        base_delay: Duration::from_secs_f64(args.retry_delay),
    };
    let options = pipeline::PipelineOptions {
        source,
        output,
        segment_length: args.segment_length,
        overlap: args.overlap,
        jobs: args.jobs,
        max_repeats: args.max_repeats,
        reuse: args.reuse,
        keep_progress: args.keep_progress,
        progress_dir: args.progress_dir.clone(),
    };

    pipeline::run(&FfmpegSplitter, &transcriber, &retry, &options)
        .await
        .map(|_| ())
}
