use anyhow::Result;
use serde::Deserialize;

use crate::timestamps::parse_timestamp_str;
use crate::{GpsSample, LatLng, SampleStatus, Track};

/// Reads one vehicle's samples from CSV. Rows without a usable timestamp are skipped; rows with
/// bad coordinates are kept without a position.
pub fn load_track<R: std::io::Read>(reader: R) -> Result<Track> {
    let mut samples = Vec::new();
    let mut skipped = 0;
    for (idx, rec) in csv::Reader::from_reader(reader).deserialize().enumerate() {
        let rec: AVL = rec?;

        let time = match parse_timestamp_str(&rec.timestamp) {
            Some(t) => t,
            None => {
                warn!("Row {}: can't parse timestamp {:?}", idx + 1, rec.timestamp);
                skipped += 1;
                continue;
            }
        };
        let pos = LatLng::checked(rec.latitude, rec.longitude);
        if pos.is_none() {
            debug!("Row {}: no valid position", idx + 1);
        }

        samples.push(GpsSample {
            pos,
            time,
            speed: rec.speed.filter(|x| x.is_finite()).unwrap_or(0.0),
            heading: rec.heading.filter(|x| x.is_finite()).unwrap_or(0.0),
            status: rec
                .status
                .as_deref()
                .map(SampleStatus::parse)
                .unwrap_or(SampleStatus::Unknown),
            vehicle_label: rec.vehicle.unwrap_or_default(),
        });
    }
    if skipped > 0 {
        warn!("Skipped {skipped} rows with bad timestamps");
    }
    info!("Loaded a track with {} samples", samples.len());
    Ok(Track::new(samples))
}

#[derive(Deserialize)]
struct AVL {
    #[serde(alias = "lat", alias = "LATITUDE", default, deserialize_with = "csv::invalid_option")]
    latitude: Option<f64>,
    #[serde(
        alias = "lng",
        alias = "lon",
        alias = "LONGITUDE",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    longitude: Option<f64>,
    #[serde(alias = "time", alias = "datetime", alias = "DATAHORACOORD")]
    timestamp: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    speed: Option<f64>,
    #[serde(alias = "course", default, deserialize_with = "csv::invalid_option")]
    heading: Option<f64>,
    #[serde(default)]
    status: Option<String>,
    #[serde(alias = "vehicle_label", alias = "plate", alias = "CODVEICULO", default)]
    vehicle: Option<String>,
}
