use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::{LatLng, SampleStatus, Track};

/// Where the vehicle is at some playback progress.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LivePosition {
    /// None only if no sample in the whole track has a valid position
    pub pos: Option<LatLng>,
    pub heading: f64,
    pub speed: f64,
    pub time: DateTime<Utc>,
    pub status: SampleStatus,
    pub idx: usize,
    pub next_idx: usize,
    /// In [0, 1)
    pub fraction: f64,
    /// The sample a synchronized table should highlight. Flips to `next_idx` past the midpoint of
    /// the segment, like `status`.
    pub row_index: usize,
}

impl Track {
    /// Progress is clamped to [0, 100]. None for an empty track.
    pub fn interpolate(&self, progress: f64) -> Option<LivePosition> {
        let n = self.len();
        if n == 0 {
            return None;
        }
        if n == 1 {
            let s = self.get(0)?;
            return Some(LivePosition {
                pos: s.pos,
                heading: s.heading,
                speed: s.speed,
                time: s.time,
                status: s.status,
                idx: 0,
                next_idx: 0,
                fraction: 0.0,
                row_index: 0,
            });
        }

        let progress = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 100.0)
        };
        let float_idx = (progress / 100.0) * ((n - 1) as f64);
        let idx = (float_idx.floor() as usize).min(n - 1);
        let next_idx = (float_idx.ceil() as usize).min(n - 1);
        let t = float_idx - (idx as f64);

        let s1 = self.get(idx)?;
        let s2 = self.get(next_idx)?;

        // Switch mid-segment, not at the segment start, so the boundary sample doesn't flicker
        let (status, row_index) = if t > 0.5 {
            (s2.status, next_idx)
        } else {
            (s1.status, idx)
        };

        let pos = match (s1.pos, s2.pos) {
            (Some(p1), Some(p2)) => Some(p1.lerp(p2, t)),
            (Some(p), None) | (None, Some(p)) => Some(p),
            (None, None) => self.nearest_valid(idx),
        };

        let dt_ms = (s2.time - s1.time).num_milliseconds() as f64;
        let time = s1.time + Duration::milliseconds((dt_ms * t).round() as i64);

        Some(LivePosition {
            pos,
            heading: lerp(s1.heading, s2.heading, t),
            speed: lerp(s1.speed, s2.speed, t),
            time,
            status,
            idx,
            next_idx,
            fraction: t,
            row_index,
        })
    }

    // Prefer looking backwards, where the vehicle has already been.
    fn nearest_valid(&self, idx: usize) -> Option<LatLng> {
        let samples = self.samples();
        samples[..idx]
            .iter()
            .rev()
            .find_map(|s| s.pos)
            .or_else(|| samples[idx..].iter().find_map(|s| s.pos))
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}
