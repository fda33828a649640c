use geom::Distance;
use serde::Serialize;

use model::LatLng;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct OverlayID(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum OverlayKind {
    TrackLine,
    StartFlag,
    EndFlag,
    SampleMarker,
    LiveVehicle,
    TripStart,
    TripEnd,
    TripLine,
    GeofenceMarker,
    GeofenceShape,
    RouteHighlight,
}

// Z bands. Higher draws on top. Each band leaves room for per-trip offsets, so nothing buries
// another kind unless listed that way here.
pub const Z_TRACK_LINE: i32 = 0;
pub const Z_ROUTE_HIGHLIGHT: i32 = 100;
pub const Z_GEOFENCE_SHAPE: i32 = 200;
pub const Z_TRIP_LINE: i32 = 500;
pub const Z_SELECTED_TRIP_LINE: i32 = 900;
pub const Z_SAMPLE_MARKER: i32 = 1_000;
pub const Z_GEOFENCE_MARKER: i32 = 2_000;
pub const Z_LIVE_VEHICLE: i32 = 5_000;
pub const Z_TRIP_MARKER: i32 = 10_000;
pub const Z_SELECTED_TRIP_MARKER: i32 = 50_000;
pub const Z_FLAG: i32 = 100_000;

const TRIP_MARKER_STRIDE: i32 = 10;
// Keeps the last trip's markers under the selected band, and its line under the selected line
const MAX_TRIP_SLOT: usize = 3_998;
const MAX_TRIP_LINE_SLOT: usize = 399;

/// Later trips draw above earlier ones. The start marker sits one above its end marker.
pub fn trip_marker_z(trip_idx: usize, selected: bool, start: bool) -> i32 {
    let base = if selected {
        Z_SELECTED_TRIP_MARKER
    } else {
        Z_TRIP_MARKER + TRIP_MARKER_STRIDE * (trip_idx.min(MAX_TRIP_SLOT) as i32)
    };
    if start {
        base + 1
    } else {
        base
    }
}

pub fn trip_line_z(trip_idx: usize, selected: bool) -> i32 {
    if selected {
        Z_SELECTED_TRIP_LINE
    } else {
        Z_TRIP_LINE + trip_idx.min(MAX_TRIP_LINE_SLOT) as i32
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const BLUE: Color = Color::rgb(33, 150, 243);
    pub const GREEN: Color = Color::rgb(76, 175, 80);
    pub const RED: Color = Color::rgb(244, 67, 54);
    pub const ORANGE: Color = Color::rgb(255, 152, 0);
    pub const PURPLE: Color = Color::rgb(156, 39, 176);
    pub const GREY: Color = Color::rgb(158, 158, 158);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Color {
        Color { r, g, b }
    }

    pub fn hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// A stable, distinguishable color per trip
    pub fn for_trip(color_index: usize) -> Color {
        let palette = colorous::TABLEAU10;
        let c = palette[color_index % palette.len()];
        Color::rgb(c.r, c.g, c.b)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LineStyle {
    pub color: Color,
    pub weight_px: f64,
    pub opacity: f64,
    /// (dash length, gap length) in pixels. None is solid.
    pub dash: Option<(f64, f64)>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum MarkerIcon {
    StartFlag,
    EndFlag,
    Dot,
    Vehicle,
    TripStart,
    TripEnd,
    Geofence,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MarkerStyle {
    pub icon: MarkerIcon,
    pub color: Color,
    pub diameter_px: f64,
    /// Drawn in a badge on top of the icon
    pub label: Option<String>,
    pub badge_px: f64,
    pub font_px: f64,
    /// Clockwise from north
    pub rotation_degrees: f64,
}

impl MarkerStyle {
    pub fn plain(icon: MarkerIcon, color: Color, diameter_px: f64) -> Self {
        Self {
            icon,
            color,
            diameter_px,
            label: None,
            badge_px: 0.0,
            font_px: 0.0,
            rotation_degrees: 0.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Shape {
    Circle { center: LatLng, radius: Distance },
    Polygon(Vec<LatLng>),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ShapeStyle {
    pub stroke: Color,
    pub fill: Color,
    pub fill_opacity: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Geometry {
    Line {
        points: Vec<LatLng>,
        style: LineStyle,
    },
    Marker {
        pos: LatLng,
        style: MarkerStyle,
    },
    Shape {
        shape: Shape,
        style: ShapeStyle,
    },
}

/// Something to draw, before it's been materialized and given an ID.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OverlayDraft {
    pub kind: OverlayKind,
    pub z: i32,
    pub geometry: Geometry,
}

impl OverlayDraft {
    pub fn line(kind: OverlayKind, z: i32, points: Vec<LatLng>, style: LineStyle) -> Self {
        Self {
            kind,
            z,
            geometry: Geometry::Line { points, style },
        }
    }

    pub fn marker(kind: OverlayKind, z: i32, pos: LatLng, style: MarkerStyle) -> Self {
        Self {
            kind,
            z,
            geometry: Geometry::Marker { pos, style },
        }
    }

    pub fn shape(kind: OverlayKind, z: i32, shape: Shape, style: ShapeStyle) -> Self {
        Self {
            kind,
            z,
            geometry: Geometry::Shape { shape, style },
        }
    }

    /// The point for markers, None otherwise
    pub fn marker_pos(&self) -> Option<LatLng> {
        match self.geometry {
            Geometry::Marker { pos, .. } => Some(pos),
            _ => None,
        }
    }
}

/// A materialized overlay, currently on the canvas.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Overlay {
    pub id: OverlayID,
    pub kind: OverlayKind,
    pub z: i32,
    pub geometry: Geometry,
}
