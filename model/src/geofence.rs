use anyhow::Result;
use geojson::{Feature, GeoJson};
use geom::Distance;
use serde::Serialize;
use serde_json::Value;

use crate::LatLng;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Geofence {
    pub name: String,
    pub shape: GeofenceShape,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum GeofenceShape {
    /// The center may be missing; such a fence can't be drawn at all
    Circle {
        center: Option<LatLng>,
        radius: Option<Distance>,
    },
    /// In order, without repeating the first vertex. May be too short to form a polygon.
    Polygon { vertices: Vec<LatLng> },
}

impl Geofence {
    /// Where to put a label for this fence. Circles use their center, polygons the average of
    /// their vertices.
    pub fn anchor(&self) -> Option<LatLng> {
        match &self.shape {
            GeofenceShape::Circle { center, .. } => *center,
            GeofenceShape::Polygon { vertices } => {
                if vertices.is_empty() {
                    return None;
                }
                let n = vertices.len() as f64;
                let lat = vertices.iter().map(|pt| pt.lat).sum::<f64>() / n;
                let lng = vertices.iter().map(|pt| pt.lng).sum::<f64>() / n;
                Some(LatLng::new(lat, lng))
            }
        }
    }

    /// Point features need a `radius` property in meters. Polygons use their outer ring. Other
    /// geometry is skipped.
    pub fn load_geojson(raw: &str) -> Result<Vec<Geofence>> {
        let features = match raw.parse::<GeoJson>()? {
            GeoJson::FeatureCollection(fc) => fc.features,
            GeoJson::Feature(f) => vec![f],
            GeoJson::Geometry(_) => bail!("Geofence GeoJSON needs features, not a bare geometry"),
        };
        let mut fences = Vec::new();
        for (idx, feature) in features.into_iter().enumerate() {
            match from_feature(idx, &feature) {
                Some(fence) => fences.push(fence),
                None => warn!("Skipping geofence feature #{idx}, unsupported geometry"),
            }
        }
        Ok(fences)
    }

    /// A plain JSON array of `{name, type, center, radius}` or `{name, type, points}` objects.
    /// Points can be `{lat, lng}` objects or `[lat, lng]` pairs. Unrecognized entries are
    /// skipped; coordinate problems are kept, so the connector can decide what to draw.
    pub fn from_json(value: &Value) -> Result<Vec<Geofence>> {
        let list = match value {
            Value::Array(list) => list,
            _ => bail!("Geofence list isn't an array"),
        };
        let mut fences = Vec::new();
        for (idx, raw) in list.iter().enumerate() {
            let name = raw
                .get("name")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("Geofence {}", idx + 1));
            let kind = raw
                .get("type")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_ascii_lowercase();
            let shape = match kind.as_str() {
                "circle" => GeofenceShape::Circle {
                    center: raw.get("center").and_then(json_point),
                    radius: raw.get("radius").and_then(|v| v.as_f64()).and_then(meters),
                },
                "polygon" => GeofenceShape::Polygon {
                    vertices: raw
                        .get("points")
                        .or_else(|| raw.get("vertices"))
                        .and_then(|v| v.as_array())
                        .map(|pts| pts.iter().filter_map(json_point).collect())
                        .unwrap_or_else(Vec::new),
                },
                _ => {
                    warn!("Skipping geofence #{idx} with unknown type {kind:?}");
                    continue;
                }
            };
            fences.push(Geofence { name, shape });
        }
        Ok(fences)
    }
}

fn from_feature(idx: usize, feature: &Feature) -> Option<Geofence> {
    let props = feature.properties.as_ref();
    let name = props
        .and_then(|p| p.get("name"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("Geofence {}", idx + 1));
    let shape = match &feature.geometry.as_ref()?.value {
        geojson::Value::Point(pt) => GeofenceShape::Circle {
            center: lng_lat(pt),
            radius: props
                .and_then(|p| p.get("radius"))
                .and_then(|v| v.as_f64())
                .and_then(meters),
        },
        geojson::Value::Polygon(rings) => {
            let mut vertices: Vec<LatLng> = rings.get(0)?.iter().filter_map(|pt| lng_lat(pt)).collect();
            if vertices.len() > 1 && vertices.first() == vertices.last() {
                vertices.pop();
            }
            GeofenceShape::Polygon { vertices }
        }
        _ => return None,
    };
    Some(Geofence { name, shape })
}

// GeoJSON positions are [longitude, latitude]
fn lng_lat(pt: &[f64]) -> Option<LatLng> {
    if pt.len() < 2 {
        return None;
    }
    LatLng::checked(Some(pt[1]), Some(pt[0]))
}

fn json_point(value: &Value) -> Option<LatLng> {
    match value {
        Value::Object(obj) => {
            let lat = obj.get("lat").or_else(|| obj.get("latitude"))?.as_f64();
            let lng = obj
                .get("lng")
                .or_else(|| obj.get("lon"))
                .or_else(|| obj.get("longitude"))?
                .as_f64();
            LatLng::checked(lat, lng)
        }
        Value::Array(pair) if pair.len() == 2 => LatLng::checked(pair[0].as_f64(), pair[1].as_f64()),
        _ => None,
    }
}

// Distance::meters doesn't accept garbage
fn meters(x: f64) -> Option<Distance> {
    if x.is_finite() && x > 0.0 {
        Some(Distance::meters(x))
    } else {
        None
    }
}
