use std::time::Duration;

use crate::error::StitchError;
use crate::segment::SegmentPlan;
use crate::srt::SrtCue;

/// One finalized caption in source time. `index` is 1-based and gap-free
/// across the whole output, `start` is strictly increasing.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleCue {
    pub index: usize,
    pub start: Duration,
    pub end: Duration,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct StitchOptions {
    /// Overlap window the segmenter was configured with, in seconds. Zero
    /// disables all boundary deduplication.
    pub overlap: f64,
    /// Drop runs of this many or more consecutive identical-text cues; these
    /// are hallucinations the service produces on silence. Zero disables.
    pub max_repeats: usize,
}

impl Default for StitchOptions {
    fn default() -> Self {
        Self {
            overlap: 0.0,
            max_repeats: 3,
        }
    }
}

struct MergedCue {
    segment: usize,
    start: Duration,
    end: Duration,
    text: String,
}

/// Merge per-segment transcripts into one continuous cue sequence.
///
/// Timestamps are shifted by a running offset that advances by each segment's
/// stride (its duration minus the overlap it shares with the next segment),
/// never by where its last cue happened to end; trailing silence in a segment
/// must not compress the rest of the timeline.
pub fn stitch(
    segments: &[(SegmentPlan, Vec<SrtCue>)],
    options: &StitchOptions,
) -> Result<Vec<SubtitleCue>, StitchError> {
    let mut merged: Vec<MergedCue> = Vec::new();
    let mut offset = Duration::ZERO;

    for (position, (plan, cues)) in segments.iter().enumerate() {
        let window = contribution_window(segments, position, options.overlap);

        for cue in cues {
            if cue.end < cue.start {
                return Err(StitchError::NegativeSpan {
                    segment: plan.index,
                    start: offset + cue.start,
                    end: offset + cue.end,
                    text: cue.text.clone(),
                });
            }

            let start = offset + cue.start;
            let end = offset + cue.end;

            if let Some((window_start, window_end)) = window {
                let start_secs = start.as_secs_f64();
                if start_secs < window_start || start_secs >= window_end {
                    continue;
                }
            }

            merged.push(MergedCue {
                segment: plan.index,
                start,
                end,
                text: cue.text.clone(),
            });
        }

        let stride = match segments.get(position + 1) {
            Some((next, _)) => plan.duration() - (plan.end - next.start),
            None => plan.duration(),
        };
        offset += Duration::from_secs_f64(stride.max(0.0));
    }

    if options.overlap > 0.0 {
        drop_seam_duplicates(&mut merged, options.overlap);
    }
    if options.max_repeats > 0 {
        drop_repeated_runs(&mut merged, options.max_repeats);
    }

    finalize(merged)
}

/// Half-open global time window a segment is allowed to contribute cues
/// within. Adjacent windows meet at the midpoint of the shared overlap, so
/// each cue is claimed by the segment holding the larger non-overlapping
/// share around it. `None` when no overlap is configured.
fn contribution_window(
    segments: &[(SegmentPlan, Vec<SrtCue>)],
    position: usize,
    overlap: f64,
) -> Option<(f64, f64)> {
    if overlap <= 0.0 {
        return None;
    }
    let plan = &segments[position].0;
    let start = match position.checked_sub(1).and_then(|p| segments.get(p)) {
        Some((previous, _)) => (plan.start + previous.end) / 2.0,
        None => 0.0,
    };
    let end = match segments.get(position + 1) {
        Some((next, _)) => (plan.end + next.start) / 2.0,
        None => f64::INFINITY,
    };
    Some((start, end))
}

/// Residual pass for utterances the midpoint windows kept twice: when the
/// leading cue of a segment repeats the text of the trailing cue before it
/// within the overlap window, the earlier copy wins.
fn drop_seam_duplicates(merged: &mut Vec<MergedCue>, overlap: f64) {
    let overlap = Duration::from_secs_f64(overlap);
    let mut index = 1;
    while index < merged.len() {
        let previous = &merged[index - 1];
        let current = &merged[index];
        if current.segment != previous.segment
            && current.text.trim() == previous.text.trim()
            && current.start.saturating_sub(previous.start) <= overlap
        {
            merged.remove(index);
        } else {
            index += 1;
        }
    }
}

/// Drop whole runs of `threshold` or more consecutive cues with identical
/// text. A long run of the same caption is not speech.
fn drop_repeated_runs(merged: &mut Vec<MergedCue>, threshold: usize) {
    let source = std::mem::take(merged);
    let mut kept = Vec::with_capacity(source.len());
    let mut iter = source.into_iter().peekable();
    while let Some(first) = iter.next() {
        let mut run = vec![first];
        while iter.peek().is_some_and(|next| next.text == run[0].text) {
            run.push(iter.next().unwrap());
        }
        if run.len() < threshold {
            kept.extend(run);
        }
    }
    *merged = kept;
}

fn finalize(merged: Vec<MergedCue>) -> Result<Vec<SubtitleCue>, StitchError> {
    let mut cues = Vec::with_capacity(merged.len());
    let mut previous: Option<Duration> = None;
    for cue in merged {
        if let Some(previous) = previous
            && cue.start <= previous
        {
            return Err(StitchError::NonMonotonic {
                segment: cue.segment,
                previous,
                current: cue.start,
            });
        }
        previous = Some(cue.start);
        cues.push(SubtitleCue {
            index: cues.len() + 1,
            start: cue.start,
            end: cue.end,
            text: cue.text,
        });
    }
    Ok(cues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::plan_segments;

    fn unit(start: f64, end: f64, text: &str) -> SrtCue {
        SrtCue {
            start: Duration::from_secs_f64(start),
            end: Duration::from_secs_f64(end),
            text: text.to_string(),
        }
    }

    fn paired(
        duration: f64,
        max_length: f64,
        overlap: f64,
        transcripts: Vec<Vec<SrtCue>>,
    ) -> Vec<(SegmentPlan, Vec<SrtCue>)> {
        let plans = plan_segments(duration, max_length, overlap).expect("plan");
        assert_eq!(plans.len(), transcripts.len());
        plans.into_iter().zip(transcripts).collect()
    }

    fn no_dedup() -> StitchOptions {
        StitchOptions {
            overlap: 0.0,
            max_repeats: 0,
        }
    }

    #[test]
    fn shifts_cues_by_segment_start() {
        // 150s source in 60s segments: the third segment starts at 120s.
        let segments = paired(
            150.0,
            60.0,
            0.0,
            vec![
                vec![unit(0.0, 2.0, "one")],
                vec![unit(1.0, 3.0, "two")],
                vec![unit(0.0, 2.0, "end")],
            ],
        );
        let cues = stitch(&segments, &no_dedup()).expect("stitch");
        assert_eq!(cues.len(), 3);
        assert_eq!(cues[2].start, Duration::from_secs(120));
        assert_eq!(cues[2].end, Duration::from_secs(122));
        assert_eq!(cues[2].text, "end");
    }

    #[test]
    fn offset_ignores_trailing_silence() {
        // The first segment's last cue ends at 55s of a 60s segment; the next
        // segment's first cue must still land at 60s, not 55s.
        let segments = paired(
            120.0,
            60.0,
            0.0,
            vec![
                vec![unit(0.0, 4.0, "early"), unit(50.0, 55.0, "late")],
                vec![unit(0.0, 2.0, "after the cut")],
            ],
        );
        let cues = stitch(&segments, &no_dedup()).expect("stitch");
        assert_eq!(cues[2].start, Duration::from_secs(60));
    }

    #[test]
    fn offset_accumulates_segment_durations() {
        let durations = [60.0, 60.0, 60.0, 45.5];
        let segments = paired(
            225.5,
            60.0,
            0.0,
            durations
                .iter()
                .map(|_| vec![unit(0.25, 1.0, "first"), unit(7.0, 9.0, "second")])
                .collect(),
        );
        let cues = stitch(&segments, &no_dedup()).expect("stitch");
        let mut expected_offset = 0.0;
        for (i, duration) in durations.iter().enumerate() {
            let first = &cues[i * 2];
            assert_eq!(
                first.start,
                Duration::from_secs_f64(expected_offset + 0.25)
            );
            expected_offset += duration;
        }
    }

    #[test]
    fn indexes_are_one_based_and_gap_free() {
        let segments = paired(
            120.0,
            60.0,
            0.0,
            vec![
                vec![unit(0.0, 1.0, "a"), unit(2.0, 3.0, "b")],
                vec![unit(1.0, 2.0, "c")],
            ],
        );
        let cues = stitch(&segments, &no_dedup()).expect("stitch");
        for (i, cue) in cues.iter().enumerate() {
            assert_eq!(cue.index, i + 1);
        }
        for pair in cues.windows(2) {
            assert!(pair[0].start < pair[1].start);
        }
    }

    #[test]
    fn overlapping_boundary_utterance_survives_once() {
        // 3s overlap; both segments transcribe the same utterance near the
        // 60s boundary. Exactly one copy may survive.
        let segments = paired(
            117.0,
            60.0,
            3.0,
            vec![
                vec![unit(10.0, 12.0, "body"), unit(57.5, 59.5, "shared words")],
                // Segment 2 spans [57, 117); the same utterance is at local 0.5s.
                vec![unit(0.5, 2.5, "shared words"), unit(10.0, 12.0, "tail")],
            ],
        );
        let cues = stitch(
            &segments,
            &StitchOptions {
                overlap: 3.0,
                max_repeats: 0,
            },
        )
        .expect("stitch");
        let shared: Vec<_> = cues.iter().filter(|c| c.text == "shared words").collect();
        assert_eq!(shared.len(), 1);
        assert_eq!(cues.iter().filter(|c| c.text == "tail").count(), 1);
        assert_eq!(cues.iter().filter(|c| c.text == "body").count(), 1);
    }

    #[test]
    fn zero_overlap_skips_deduplication() {
        // Identical text on both sides of a cut is kept when no overlap was
        // configured; without a shared window it is not a duplicate.
        let segments = paired(
            120.0,
            60.0,
            0.0,
            vec![vec![unit(58.0, 59.5, "again")], vec![unit(1.0, 2.5, "again")]],
        );
        let cues = stitch(&segments, &no_dedup()).expect("stitch");
        assert_eq!(cues.len(), 2);
    }

    #[test]
    fn long_identical_runs_are_dropped() {
        let segments = paired(
            60.0,
            60.0,
            0.0,
            vec![vec![
                unit(0.0, 1.0, "speech"),
                unit(5.0, 6.0, "thanks for watching"),
                unit(7.0, 8.0, "thanks for watching"),
                unit(9.0, 10.0, "thanks for watching"),
                unit(20.0, 21.0, "more speech"),
            ]],
        );
        let cues = stitch(
            &segments,
            &StitchOptions {
                overlap: 0.0,
                max_repeats: 3,
            },
        )
        .expect("stitch");
        let texts: Vec<_> = cues.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["speech", "more speech"]);
        assert_eq!(cues[1].index, 2);
    }

    #[test]
    fn short_identical_runs_survive_pruning() {
        let segments = paired(
            60.0,
            60.0,
            0.0,
            vec![vec![
                unit(0.0, 1.0, "yes"),
                unit(2.0, 3.0, "yes"),
                unit(4.0, 5.0, "no"),
            ]],
        );
        let cues = stitch(
            &segments,
            &StitchOptions {
                overlap: 0.0,
                max_repeats: 3,
            },
        )
        .expect("stitch");
        assert_eq!(cues.len(), 3);
    }

    #[test]
    fn non_monotonic_input_is_rejected() {
        // Hand-built plans with a broken layout: the second segment's cues
        // land before the first segment's because the transcript overshoots.
        let plans = plan_segments(120.0, 60.0, 0.0).expect("plan");
        let segments = vec![
            (plans[0].clone(), vec![unit(0.0, 2.0, "a"), unit(70.0, 72.0, "overshoot")]),
            (plans[1].clone(), vec![unit(0.0, 2.0, "b")]),
        ];
        let err = stitch(&segments, &no_dedup()).unwrap_err();
        assert!(matches!(err, StitchError::NonMonotonic { segment: 1, .. }));
    }

    #[test]
    fn negative_span_is_rejected() {
        let plans = plan_segments(60.0, 60.0, 0.0).expect("plan");
        let segments = vec![(
            plans[0].clone(),
            vec![SrtCue {
                start: Duration::from_secs(5),
                end: Duration::from_secs(3),
                text: "backwards".to_string(),
            }],
        )];
        let err = stitch(&segments, &no_dedup()).unwrap_err();
        assert!(matches!(err, StitchError::NegativeSpan { segment: 0, .. }));
    }

    #[test]
    fn single_segment_source_passes_through() {
        let segments = paired(45.0, 60.0, 0.0, vec![vec![unit(1.0, 2.0, "only")]]);
        let cues = stitch(&segments, &no_dedup()).expect("stitch");
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].index, 1);
        assert_eq!(cues[0].start, Duration::from_secs(1));
    }
}
