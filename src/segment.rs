use anyhow::{Result, bail};

/// One planned slice of the source media, in source time.
///
/// Plans are produced in index order and tile the whole source duration: the
/// only gap-free layouts are back-to-back ranges (zero overlap) or ranges that
/// share a configured overlap window with their neighbours.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentPlan {
    pub index: usize,
    pub start: f64,
    pub end: f64,
}

impl SegmentPlan {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// File stem used for this segment's clip and cached transcript,
    /// e.g. `00600-01200`.
    pub fn file_stem(&self) -> String {
        format!("{:05}-{:05}", self.start.round() as u64, self.end.round() as u64)
    }
}

/// Compute the segment layout for a source of `duration` seconds.
///
/// Walks forward from zero in steps of `max_length - overlap`, clipping the
/// final segment to the source duration. A source no longer than `max_length`
/// yields exactly one segment covering the whole file.
pub fn plan_segments(duration: f64, max_length: f64, overlap: f64) -> Result<Vec<SegmentPlan>> {
    if !duration.is_finite() || duration <= 0.0 {
        bail!("media duration must be positive, got {duration}");
    }
    if !max_length.is_finite() || max_length <= 0.0 {
        bail!("segment length must be positive, got {max_length}");
    }
    if !overlap.is_finite() || overlap < 0.0 || overlap >= max_length {
        bail!("overlap must be at least 0 and less than the segment length");
    }

    let mut plans = Vec::new();
    let mut start = 0.0_f64;
    loop {
        let end = (start + max_length).min(duration);
        plans.push(SegmentPlan {
            index: plans.len(),
            start,
            end,
        });
        if end >= duration {
            break;
        }
        start += max_length - overlap;
        // A step that lands exactly on the source end would plan an empty
        // trailing segment; the previous one already reaches the end.
        if start >= duration {
            break;
        }
    }

    Ok(plans)
}
