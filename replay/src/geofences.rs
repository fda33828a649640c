use model::{Geofence, GeofenceShape};

use crate::overlay::{
    Color, MarkerIcon, MarkerStyle, OverlayDraft, OverlayKind, Shape, ShapeStyle,
    Z_GEOFENCE_MARKER, Z_GEOFENCE_SHAPE,
};

const MARKER_DIAMETER_PX: f64 = 22.0;

/// Geofences supplied from outside, plus the two toggles controlling them.
#[derive(Clone, Debug, Default)]
pub struct GeofenceState {
    pub fences: Vec<Geofence>,
    pub show_geofences: bool,
    /// Only matters if `show_geofences` is also set
    pub show_shapes: bool,
}

impl GeofenceState {
    /// Markers for every fence with a usable anchor, and shapes for the ones that are
    /// well-formed. Malformed fences are skipped, never an error.
    pub fn overlays(&self) -> Vec<OverlayDraft> {
        let mut drafts = Vec::new();
        if !self.show_geofences {
            return drafts;
        }
        for fence in &self.fences {
            if let Some(pos) = fence.anchor() {
                let mut style = MarkerStyle::plain(MarkerIcon::Geofence, Color::PURPLE, MARKER_DIAMETER_PX);
                style.label = Some(fence.name.clone());
                drafts.push(OverlayDraft::marker(
                    OverlayKind::GeofenceMarker,
                    Z_GEOFENCE_MARKER,
                    pos,
                    style,
                ));
            }
            if self.show_shapes {
                match shape(fence) {
                    Some(shape) => drafts.push(OverlayDraft::shape(
                        OverlayKind::GeofenceShape,
                        Z_GEOFENCE_SHAPE,
                        shape,
                        ShapeStyle {
                            stroke: Color::PURPLE,
                            fill: Color::PURPLE,
                            fill_opacity: 0.15,
                        },
                    )),
                    None => debug!("Geofence {} has no drawable shape", fence.name),
                }
            }
        }
        drafts
    }
}

fn shape(fence: &Geofence) -> Option<Shape> {
    match &fence.shape {
        GeofenceShape::Circle { center, radius } => Some(Shape::Circle {
            center: (*center)?,
            radius: (*radius)?,
        }),
        GeofenceShape::Polygon { vertices } => {
            if vertices.len() < 3 {
                return None;
            }
            Some(Shape::Polygon(vertices.clone()))
        }
    }
}
