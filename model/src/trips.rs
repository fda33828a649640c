use std::ops::Range;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::timestamps::parse_timestamp;
use crate::Track;

pub const DEFAULT_MAX_GAP_MINUTES: i64 = 30;
/// Trips shorter than this (in flat-earth km) are noise
pub const DEFAULT_MIN_TRIP_KM: f64 = 0.01;
/// The largest gap threshold `chrono::Duration` can hold in milliseconds
pub const MAX_GAP_MINUTES: i64 = i64::MAX / 60_000;

const START_ALIASES: [&str; 6] = ["startTime", "start_time", "start", "tripStart", "begin", "from"];
const END_ALIASES: [&str; 6] = ["endTime", "end_time", "end", "tripEnd", "finish", "to"];
const DISTANCE_ALIASES: [&str; 4] = ["distanceKm", "distance_km", "distance", "km"];
const COLOR_ALIASES: [&str; 3] = ["colorIndex", "color_index", "color"];
const LIST_KEYS: [&str; 3] = ["trips", "data", "items"];

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// A gap strictly longer than this between consecutive samples starts a new inferred trip
    pub max_gap_minutes: i64,
    pub min_trip_km: f64,
}

impl SegmenterConfig {
    /// Out-of-range thresholds are clamped rather than trusted.
    pub fn max_gap(&self) -> Duration {
        Duration::minutes(self.max_gap_minutes.clamp(0, MAX_GAP_MINUTES))
    }
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            max_gap_minutes: DEFAULT_MAX_GAP_MINUTES,
            min_trip_km: DEFAULT_MIN_TRIP_KM,
        }
    }
}

/// An externally supplied trip descriptor, normalized from any of the accepted field names.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TripInput {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub distance_km: Option<f64>,
    pub color_index: Option<usize>,
}

impl TripInput {
    /// None if there's no parseable start and end, or the window is backwards.
    pub fn from_json(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let start_time = START_ALIASES
            .iter()
            .find_map(|key| obj.get(*key).and_then(parse_timestamp))?;
        let end_time = END_ALIASES
            .iter()
            .find_map(|key| obj.get(*key).and_then(parse_timestamp))?;
        if end_time < start_time {
            return None;
        }
        let distance_km = DISTANCE_ALIASES
            .iter()
            .find_map(|key| obj.get(*key).and_then(as_f64));
        let color_index = COLOR_ALIASES
            .iter()
            .find_map(|key| obj.get(*key).and_then(|v| v.as_u64()))
            .map(|x| x as usize);
        Some(Self {
            start_time,
            end_time,
            distance_km,
            color_index,
        })
    }

    /// Accepts a bare array or an object wrapping one. Entries that can't be understood are
    /// skipped.
    pub fn parse_list(value: &Value) -> Result<Vec<TripInput>> {
        let list = match value {
            Value::Array(list) => list,
            Value::Object(obj) => match LIST_KEYS.iter().find_map(|key| obj.get(*key)) {
                Some(Value::Array(list)) => list,
                _ => bail!("Trip list object has none of {:?}", LIST_KEYS),
            },
            _ => bail!("Trip list isn't an array or object"),
        };
        let mut trips = Vec::new();
        for (idx, raw) in list.iter().enumerate() {
            match TripInput::from_json(raw) {
                Some(trip) => trips.push(trip),
                None => warn!("Skipping trip #{idx} without a usable start/end time: {raw}"),
            }
        }
        Ok(trips)
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|x: &f64| x.is_finite())
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Trip {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Flat-earth approximation over the point subset
    pub distance_km: f64,
    /// What the external source claimed, if anything. Only for display.
    pub reported_distance_km: Option<f64>,
    pub color_index: usize,
    /// The point subset, as indices into the track
    pub samples: Range<usize>,
}

/// With an explicit trip list, each trip's subset is the track window between its times. Without
/// one, trips are inferred by splitting on time gaps. Either way, trips shorter than the minimum
/// distance are dropped.
pub fn segment_trips(
    track: &Track,
    explicit: Option<&[TripInput]>,
    config: &SegmenterConfig,
) -> Vec<Trip> {
    // Paired with the color the source asked for, if any
    let candidates: Vec<(Trip, Option<usize>)> = match explicit {
        Some(list) => explicit_trips(track, list),
        None => infer_trips(track, config.max_gap())
            .into_iter()
            .map(|trip| (trip, None))
            .collect(),
    };

    let mut trips = Vec::new();
    for (mut trip, color_index) in candidates {
        trip.distance_km = track.approx_distance_km(trip.samples.clone());
        if trip.distance_km < config.min_trip_km {
            debug!(
                "Dropping trip from {} to {}, only {} km",
                trip.start_time, trip.end_time, trip.distance_km
            );
            continue;
        }
        trip.color_index = color_index.unwrap_or(trips.len());
        trips.push(trip);
    }
    trips
}

fn explicit_trips(track: &Track, list: &[TripInput]) -> Vec<(Trip, Option<usize>)> {
    list.iter()
        .map(|input| {
            let trip = Trip {
                start_time: input.start_time,
                end_time: input.end_time,
                distance_km: 0.0,
                reported_distance_km: input.distance_km,
                color_index: 0,
                samples: track.indices_between(input.start_time, input.end_time),
            };
            (trip, input.color_index)
        })
        .collect()
}

fn infer_trips(track: &Track, max_gap: Duration) -> Vec<Trip> {
    let samples = track.samples();
    let mut runs: Vec<Range<usize>> = Vec::new();
    let mut start = 0;
    for idx in 1..samples.len() {
        if samples[idx].time - samples[idx - 1].time > max_gap {
            runs.push(start..idx);
            start = idx;
        }
    }
    if !samples.is_empty() {
        runs.push(start..samples.len());
    }

    runs.into_iter()
        // A single point isn't a trip
        .filter(|run| run.len() >= 2)
        .map(|run| Trip {
            start_time: samples[run.start].time,
            end_time: samples[run.end - 1].time,
            distance_km: 0.0,
            reported_distance_km: None,
            color_index: 0,
            samples: run,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::track::tests::sample;

    fn gap_track() -> Track {
        // 40 minute gap between index 2 and 3
        Track::new(vec![
            sample(0.0, 0.00, 0),
            sample(0.0, 0.01, 5),
            sample(0.0, 0.02, 10),
            sample(0.0, 0.03, 50),
            sample(0.0, 0.04, 55),
        ])
    }

    #[test]
    fn infers_trips_from_gaps() {
        let trips = segment_trips(&gap_track(), None, &SegmenterConfig::default());
        assert_eq!(trips.len(), 2);
        assert_eq!(trips[0].samples, 0..3);
        assert_eq!(trips[1].samples, 3..5);
        assert_eq!(trips[0].color_index, 0);
        assert_eq!(trips[1].color_index, 1);
        approx::assert_relative_eq!(trips[0].distance_km, 0.02 * 111.0, epsilon = 1e-9);
    }

    #[test]
    fn gap_of_exactly_the_threshold_doesnt_split() {
        let track = Track::new(vec![
            sample(0.0, 0.00, 0),
            sample(0.0, 0.01, 30),
            sample(0.0, 0.02, 61),
        ]);
        let trips = segment_trips(&track, None, &SegmenterConfig::default());
        assert_eq!(trips.len(), 1);
        assert_eq!(trips[0].samples, 0..2);
    }

    #[test]
    fn inferred_runs_partition_the_track() {
        let minutes = [0, 1, 40, 41, 100, 101, 102];
        let track = Track::new(
            minutes
                .iter()
                .enumerate()
                .map(|(i, m)| sample(0.0, i as f64 * 0.01, *m))
                .collect(),
        );
        let trips = infer_trips(&track, Duration::minutes(30));
        let runs: Vec<Range<usize>> = trips.iter().map(|t| t.samples.clone()).collect();
        assert_eq!(runs, vec![0..2, 2..4, 4..7]);

        // A lone sample between two gaps belongs to no trip
        let track = Track::new(vec![
            sample(0.0, 0.0, 0),
            sample(0.0, 0.1, 1),
            sample(0.0, 0.2, 60),
            sample(0.0, 0.3, 120),
            sample(0.0, 0.4, 121),
        ]);
        let runs: Vec<Range<usize>> = infer_trips(&track, Duration::minutes(30))
            .into_iter()
            .map(|t| t.samples)
            .collect();
        assert_eq!(runs, vec![0..2, 3..5]);
    }

    #[test]
    fn tiny_trips_are_noise() {
        // About 5 meters apart at the equator
        let track = Track::new(vec![sample(0.0, 0.0, 0), sample(0.0, 0.00005, 1)]);
        assert!(segment_trips(&track, None, &SegmenterConfig::default()).is_empty());

        let config = SegmenterConfig {
            min_trip_km: 0.001,
            ..Default::default()
        };
        assert_eq!(segment_trips(&track, None, &config).len(), 1);
    }

    #[test]
    fn huge_gap_threshold_is_clamped() {
        let config = SegmenterConfig {
            max_gap_minutes: 200_000_000_000_000_000,
            ..Default::default()
        };
        assert_eq!(config.max_gap().num_minutes(), MAX_GAP_MINUTES);
        // Nothing is long enough to split on
        let trips = segment_trips(&gap_track(), None, &config);
        assert_eq!(trips.len(), 1);
        assert_eq!(trips[0].samples, 0..5);

        let config = SegmenterConfig {
            max_gap_minutes: -5,
            ..Default::default()
        };
        assert_eq!(config.max_gap(), Duration::zero());
    }

    #[test]
    fn single_sample_has_no_trips() {
        let track = Track::new(vec![sample(0.0, 0.0, 0)]);
        assert!(segment_trips(&track, None, &SegmenterConfig::default()).is_empty());
        assert!(segment_trips(&Track::empty(), None, &SegmenterConfig::default()).is_empty());
    }

    #[test]
    fn explicit_trips_use_time_windows() {
        let track = gap_track();
        let t = |idx: usize| track.get(idx).unwrap().time.to_rfc3339();
        let raw = json!([
            {"startTime": t(0), "endTime": t(1), "distanceKm": 4.5},
            {"start_time": t(3), "end_time": t(4), "colorIndex": 7},
            {"begin": t(2)},
            {"tripStart": "garbage", "tripEnd": t(4)},
        ]);
        let inputs = TripInput::parse_list(&raw).unwrap();
        assert_eq!(inputs.len(), 2);

        let trips = segment_trips(&track, Some(inputs.as_slice()), &SegmenterConfig::default());
        assert_eq!(trips.len(), 2);
        assert_eq!(trips[0].samples, 0..2);
        assert_eq!(trips[0].reported_distance_km, Some(4.5));
        assert_eq!(trips[0].color_index, 0);
        assert_eq!(trips[1].samples, 3..5);
        assert_eq!(trips[1].color_index, 7);
    }

    #[test]
    fn explicit_empty_list_doesnt_infer() {
        let trips = segment_trips(&gap_track(), Some(Vec::new().as_slice()), &SegmenterConfig::default());
        assert!(trips.is_empty());
    }

    #[test]
    fn list_wrappers() {
        let raw = json!({"trips": [{"start": 1_600_000_000, "end": "1600000600"}]});
        let trips = TripInput::parse_list(&raw).unwrap();
        assert_eq!(trips.len(), 1);
        assert_eq!((trips[0].end_time - trips[0].start_time).num_minutes(), 10);

        assert!(TripInput::parse_list(&json!({"nope": []})).is_err());
        assert!(TripInput::parse_list(&json!(5)).is_err());
        // Backwards windows are skipped
        let raw = json!([{"start": 1_600_000_600, "end": 1_600_000_000}]);
        assert!(TripInput::parse_list(&raw).unwrap().is_empty());
    }
}
