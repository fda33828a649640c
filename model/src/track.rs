use std::ops::Range;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::KM_PER_DEGREE;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// None if either coordinate is missing, non-finite, or out of range
    pub fn checked(lat: Option<f64>, lng: Option<f64>) -> Option<Self> {
        let pt = Self::new(lat?, lng?);
        if pt.is_valid() {
            Some(pt)
        } else {
            None
        }
    }

    pub fn is_valid(self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    pub fn lerp(self, other: LatLng, t: f64) -> LatLng {
        LatLng::new(
            self.lat + (other.lat - self.lat) * t,
            self.lng + (other.lng - self.lng) * t,
        )
    }

    /// Planar distance in degrees, treating lat/lng as cartesian.
    pub fn flat_dist_degrees(self, other: LatLng) -> f64 {
        let dlat = other.lat - self.lat;
        let dlng = other.lng - self.lng;
        (dlat * dlat + dlng * dlng).sqrt()
    }

    /// `sqrt(dlat^2 + dlng^2) * 111`. This is not a geodesic distance.
    pub fn approx_dist_km(self, other: LatLng) -> f64 {
        self.flat_dist_degrees(other) * KM_PER_DEGREE
    }

    pub fn offset(self, dlat: f64, dlng: f64) -> LatLng {
        LatLng::new(self.lat + dlat, self.lng + dlng)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLngBounds {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
}

impl LatLngBounds {
    /// None if there are no points
    pub fn from_points<I: IntoIterator<Item = LatLng>>(pts: I) -> Option<Self> {
        let mut iter = pts.into_iter();
        let first = iter.next()?;
        let mut b = LatLngBounds {
            min_lat: first.lat,
            min_lng: first.lng,
            max_lat: first.lat,
            max_lng: first.lng,
        };
        for pt in iter {
            b.update(pt);
        }
        Some(b)
    }

    pub fn update(&mut self, pt: LatLng) {
        self.min_lat = self.min_lat.min(pt.lat);
        self.min_lng = self.min_lng.min(pt.lng);
        self.max_lat = self.max_lat.max(pt.lat);
        self.max_lng = self.max_lng.max(pt.lng);
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }

    pub fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn lng_span(&self) -> f64 {
        self.max_lng - self.min_lng
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SampleStatus {
    Moving,
    Idle,
    Stop,
    Unknown,
}

impl SampleStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "moving" | "running" | "driving" | "move" => SampleStatus::Moving,
            "idle" | "idling" => SampleStatus::Idle,
            "stop" | "stopped" | "parked" => SampleStatus::Stop,
            _ => SampleStatus::Unknown,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GpsSample {
    /// None if the source had missing or invalid coordinates. These samples still occupy an index
    /// in the track, so progress and table rows stay aligned with the raw data.
    pub pos: Option<LatLng>,
    pub time: DateTime<Utc>,
    pub speed: f64,
    pub heading: f64,
    pub status: SampleStatus,
    pub vehicle_label: String,
}

/// The full ordered sequence of samples for one replay session.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Track {
    samples: Vec<GpsSample>,
}

impl Track {
    pub fn new(mut samples: Vec<GpsSample>) -> Self {
        if samples.windows(2).any(|pair| pair[0].time > pair[1].time) {
            warn!(
                "Track input of {} samples is out-of-order; sorting by timestamp",
                samples.len()
            );
            samples.sort_by_key(|s| s.time);
        }
        Self { samples }
    }

    pub fn empty() -> Self {
        Self {
            samples: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&GpsSample> {
        self.samples.get(idx)
    }

    pub fn samples(&self) -> &[GpsSample] {
        &self.samples
    }

    pub fn valid_points(&self) -> Vec<LatLng> {
        self.samples.iter().filter_map(|s| s.pos).collect()
    }

    pub fn valid_points_in(&self, range: Range<usize>) -> Vec<LatLng> {
        self.samples[range].iter().filter_map(|s| s.pos).collect()
    }

    pub fn bounds(&self) -> Option<LatLngBounds> {
        LatLngBounds::from_points(self.samples.iter().filter_map(|s| s.pos))
    }

    /// The contiguous range of samples with a timestamp inside `[start, end]`. Relies on the
    /// ordering established by `new`.
    pub fn indices_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Range<usize> {
        let first = self.samples.partition_point(|s| s.time < start);
        let last = self.samples.partition_point(|s| s.time <= end);
        first..last.max(first)
    }

    /// Sum of flat-earth distances between consecutive valid positions in the range. Invalid
    /// samples are skipped, so the path bridges over them.
    pub fn approx_distance_km(&self, range: Range<usize>) -> f64 {
        self.valid_points_in(range)
            .windows(2)
            .map(|pair| pair[0].approx_dist_km(pair[1]))
            .sum()
    }

    /// The progress value that lands exactly on this sample.
    pub fn progress_of_index(&self, idx: usize) -> f64 {
        if self.samples.len() <= 1 {
            return 0.0;
        }
        let idx = idx.min(self.samples.len() - 1);
        100.0 * (idx as f64) / ((self.samples.len() - 1) as f64)
    }
}
