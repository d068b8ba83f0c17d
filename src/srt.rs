use anyhow::{Context, Result, bail};
use std::time::Duration;

use crate::stitch::SubtitleCue;

/// One cue as parsed from an SRT document. Timestamps are relative to the
/// start of whatever media the document was transcribed from, which for a
/// segment transcript means segment-local time.
#[derive(Debug, Clone, PartialEq)]
pub struct SrtCue {
    pub start: Duration,
    pub end: Duration,
    pub text: String,
}

pub fn parse_srt(input: &str) -> Result<Vec<SrtCue>> {
    let mut cues = Vec::new();
    let mut lines = input.lines().peekable();

    while let Some(line) = lines.next() {
        let index_line = line.trim();
        if index_line.is_empty() {
            continue;
        }

        // Index line can sometimes be omitted; skip validation if it fails to parse
        let _ = index_line.parse::<usize>();

        let times = lines
            .next()
            .map(str::trim)
            .context("SRT cue is missing a timestamp line")?;

        let (start_raw, end_raw) = times
            .split_once("-->")
            .map(|(a, b)| (a.trim(), b.trim()))
            .context("SRT cue timestamp line must contain '-->'")?;

        let start = parse_timestamp(start_raw)
            .with_context(|| format!("Failed to parse SRT start timestamp '{start_raw}'"))?;
        let end = parse_timestamp(end_raw)
            .with_context(|| format!("Failed to parse SRT end timestamp '{end_raw}'"))?;

        if end < start {
            bail!("SRT cue ends before it starts: {start_raw} --> {end_raw}");
        }

        let mut text_lines = Vec::new();
        while let Some(next) = lines.peek() {
            if next.trim().is_empty() {
                break;
            }
            text_lines.push(lines.next().unwrap().trim().to_string());
        }

        // Consume trailing blank lines between cues
        while let Some(next) = lines.peek() {
            if next.trim().is_empty() {
                lines.next();
            } else {
                break;
            }
        }

        cues.push(SrtCue {
            start,
            end,
            text: text_lines.join(" "),
        });
    }

    cues.sort_by_key(|cue| cue.start);
    Ok(cues)
}

fn parse_timestamp(value: &str) -> Result<Duration> {
    let cleaned = value.trim().replace(',', ".");
    let mut parts = cleaned.split('.');
    let time_part = parts
        .next()
        .context("Timestamp is missing time component (HH:MM:SS)")?;
    let fractional_part = parts.next().unwrap_or("0");

    let mut hms = time_part.split(':');
    let hours = hms
        .next()
        .context("Timestamp missing hours")?
        .parse::<u64>()
        .context("Invalid hours in timestamp")?;
    let minutes = hms
        .next()
        .context("Timestamp missing minutes")?
        .parse::<u64>()
        .context("Invalid minutes in timestamp")?;
    let seconds = hms
        .next()
        .context("Timestamp missing seconds")?
        .parse::<u64>()
        .context("Invalid seconds in timestamp")?;

    if hms.next().is_some() {
        bail!("Timestamp has more than three components: {value}");
    }

    let mut millis_str = fractional_part.to_string();
    if millis_str.len() < 3 {
        millis_str.push_str(&"0".repeat(3 - millis_str.len()));
    }
    let millis = millis_str
        .chars()
        .take(3)
        .collect::<String>()
        .parse::<u64>()
        .context("Invalid millisecond component in timestamp")?;

    let total_seconds = hours * 3600 + minutes * 60 + seconds;
    Ok(Duration::from_secs(total_seconds) + Duration::from_millis(millis))
}

/// Format a timestamp as `HH:MM:SS,mmm`.
pub fn format_timestamp(value: Duration) -> String {
    let total_seconds = value.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    let millis = value.subsec_millis();
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}

/// Serialize segment-local cues as an SRT document with sequential 1-based
/// indexes. Used for the per-segment progress files.
pub fn format_transcript(cues: &[SrtCue]) -> String {
    let mut out = String::new();
    for (i, cue) in cues.iter().enumerate() {
        out.push_str(&(i + 1).to_string());
        out.push('\n');
        out.push_str(&format_timestamp(cue.start));
        out.push_str(" --> ");
        out.push_str(&format_timestamp(cue.end));
        out.push('\n');
        out.push_str(&cue.text);
        out.push_str("\n\n");
    }
    out
}

/// Serialize a finished cue sequence as an SRT document.
///
/// Pure formatting; the cues are written exactly as given, so the caller is
/// responsible for index and ordering invariants.
pub fn format_srt(cues: &[SubtitleCue]) -> String {
    let mut out = String::new();
    for cue in cues {
        out.push_str(&cue.index.to_string());
        out.push('\n');
        out.push_str(&format_timestamp(cue.start));
        out.push_str(" --> ");
        out.push_str(&format_timestamp(cue.end));
        out.push('\n');
        out.push_str(&cue.text);
        out.push_str("\n\n");
    }
    out
}
