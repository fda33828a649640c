use abstutil::Timer;
use anyhow::Result;
use geom::Duration;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use model::{LatLng, SegmenterConfig, MAX_GAP_MINUTES};

use crate::clock::SpeedSetting;

/// Every tunable in the replay. Missing keys fall back to the defaults.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    pub tick_interval_ms: f64,
    /// How long to sit at the end before looping back to the start
    pub end_grace_ms: f64,
    /// Percent of the track per tick, at normal speed
    pub base_step_percent: f64,
    pub speed: SpeedSetting,
    pub trips: SegmenterConfig,
    /// How far apart trip markers should be, in pixels. Converted to degrees per zoom level.
    pub marker_spacing_px: f64,
    pub max_fit_zoom: f64,
    pub fit_padding_px: f64,
    /// Shown when there's nothing to fit to
    pub default_center: LatLng,
    pub default_zoom: f64,
    /// Fixes the anti-collision jitter, for reproducible layouts
    pub collision_seed: Option<u64>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100.0,
            end_grace_ms: 600.0,
            base_step_percent: 0.2,
            speed: SpeedSetting::Normal,
            trips: SegmenterConfig::default(),
            marker_spacing_px: 24.0,
            max_fit_zoom: 16.0,
            fit_padding_px: 40.0,
            default_center: LatLng::new(20.0, 0.0),
            default_zoom: 2.0,
            collision_seed: None,
        }
    }
}

impl ReplayConfig {
    /// Reads the config document from the application's key/value store.
    pub fn from_json(value: &Value) -> Result<Self> {
        let config: ReplayConfig = serde_json::from_value(value.clone())?;
        config.validate()
    }

    pub fn load(path: String, timer: &mut Timer) -> Result<Self> {
        let config: ReplayConfig = abstio::maybe_read_json(path, timer)?;
        config.validate()
    }

    fn validate(self) -> Result<Self> {
        if !(self.tick_interval_ms > 0.0) {
            bail!("tick_interval_ms must be positive, not {}", self.tick_interval_ms);
        }
        if !(self.end_grace_ms >= 0.0) {
            bail!("end_grace_ms can't be {}", self.end_grace_ms);
        }
        if !(self.base_step_percent > 0.0) {
            bail!("base_step_percent must be positive, not {}", self.base_step_percent);
        }
        if self.trips.max_gap_minutes <= 0 || self.trips.max_gap_minutes > MAX_GAP_MINUTES {
            bail!(
                "trips.max_gap_minutes must be in (0, {}], not {}",
                MAX_GAP_MINUTES,
                self.trips.max_gap_minutes
            );
        }
        if !self.default_center.is_valid() {
            bail!("default_center {:?} isn't a real place", self.default_center);
        }
        Ok(self)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::seconds(self.tick_interval_ms / 1000.0)
    }

    pub fn end_grace(&self) -> Duration {
        Duration::seconds(self.end_grace_ms / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn defaults_fill_in() {
        let config = ReplayConfig::from_json(&json!({
            "speed": "Faster",
            "trips": {"min_trip_km": 0.5}
        }))
        .unwrap();
        assert_eq!(config.speed, SpeedSetting::Faster);
        assert_eq!(config.trips.min_trip_km, 0.5);
        assert_eq!(config.trips.max_gap_minutes, 30);
        assert_eq!(config.tick_interval_ms, 100.0);
        assert_eq!(config.end_grace_ms, 600.0);
    }

    #[test]
    fn rejects_nonsense() {
        assert!(ReplayConfig::from_json(&json!({"tick_interval_ms": 0})).is_err());
        assert!(ReplayConfig::from_json(&json!({"base_step_percent": -1})).is_err());
        assert!(ReplayConfig::from_json(&json!({"default_center": {"lat": 100, "lng": 0}})).is_err());
        assert!(ReplayConfig::from_json(&json!({"speed": "warp"})).is_err());
        assert!(ReplayConfig::from_json(&json!({
            "trips": {"max_gap_minutes": 200_000_000_000_000_000i64}
        }))
        .is_err());
        assert!(ReplayConfig::from_json(&json!({"trips": {"max_gap_minutes": 0}})).is_err());
        assert!(ReplayConfig::from_json(&json!({"trips": {"max_gap_minutes": 90}})).is_ok());
    }
}
