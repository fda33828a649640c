use std::collections::BTreeMap;

use model::LatLng;

use crate::overlay::{LineStyle, MarkerStyle, OverlayID, Shape, ShapeStyle};

/// The drawing surface, usually a slippy map. Only the overlay layers call the drawing methods.
pub trait MapCanvas {
    fn draw_polyline(&mut self, id: OverlayID, z: i32, points: &[LatLng], style: &LineStyle);
    fn draw_marker(&mut self, id: OverlayID, z: i32, pos: LatLng, style: &MarkerStyle);
    fn draw_shape(&mut self, id: OverlayID, z: i32, shape: &Shape, style: &ShapeStyle);
    /// Removes every object drawn through this trait
    fn remove_all(&mut self);

    fn set_view(&mut self, center: LatLng, zoom: f64);
    fn set_fullscreen(&mut self, fullscreen: bool);
    /// Width and height in pixels
    fn screen_size(&self) -> (f64, f64);
}

/// Camera events reported by the canvas. Only user-originated gestures should be reported as
/// `PanStart` or `ZoomStart`; programmatic `set_view` calls must not produce them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CanvasEvent {
    PanStart,
    ZoomStart,
    MoveEnd { center: LatLng },
    ZoomEnd { zoom: f64 },
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawnObject {
    Polyline {
        z: i32,
        points: Vec<LatLng>,
        style: LineStyle,
    },
    Marker {
        z: i32,
        pos: LatLng,
        style: MarkerStyle,
    },
    Shape {
        z: i32,
        shape: Shape,
        style: ShapeStyle,
    },
}

/// Keeps everything in memory. Useful for headless replays and for checking what the layers
/// actually put on the canvas.
pub struct RecordingCanvas {
    pub objects: BTreeMap<OverlayID, DrawnObject>,
    pub total_draws: usize,
    pub remove_all_calls: usize,
    pub center: Option<LatLng>,
    pub zoom: Option<f64>,
    pub fullscreen: bool,
    pub size: (f64, f64),
}

impl RecordingCanvas {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            objects: BTreeMap::new(),
            total_draws: 0,
            remove_all_calls: 0,
            center: None,
            zoom: None,
            fullscreen: false,
            size: (width, height),
        }
    }

    pub fn markers(&self) -> impl Iterator<Item = (LatLng, &MarkerStyle)> {
        self.objects.values().filter_map(|obj| match obj {
            DrawnObject::Marker { pos, style, .. } => Some((*pos, style)),
            _ => None,
        })
    }

    fn insert(&mut self, id: OverlayID, obj: DrawnObject) {
        self.total_draws += 1;
        if self.objects.insert(id, obj).is_some() {
            // The layers hand out fresh IDs every pass
            warn!("{:?} was drawn twice without being removed", id);
        }
    }
}

impl MapCanvas for RecordingCanvas {
    fn draw_polyline(&mut self, id: OverlayID, z: i32, points: &[LatLng], style: &LineStyle) {
        self.insert(
            id,
            DrawnObject::Polyline {
                z,
                points: points.to_vec(),
                style: style.clone(),
            },
        );
    }

    fn draw_marker(&mut self, id: OverlayID, z: i32, pos: LatLng, style: &MarkerStyle) {
        self.insert(
            id,
            DrawnObject::Marker {
                z,
                pos,
                style: style.clone(),
            },
        );
    }

    fn draw_shape(&mut self, id: OverlayID, z: i32, shape: &Shape, style: &ShapeStyle) {
        self.insert(
            id,
            DrawnObject::Shape {
                z,
                shape: shape.clone(),
                style: style.clone(),
            },
        );
    }

    fn remove_all(&mut self) {
        self.objects.clear();
        self.remove_all_calls += 1;
    }

    fn set_view(&mut self, center: LatLng, zoom: f64) {
        self.center = Some(center);
        self.zoom = Some(zoom);
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        self.fullscreen = fullscreen;
    }

    fn screen_size(&self) -> (f64, f64) {
        self.size
    }
}
