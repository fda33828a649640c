use serde::{Deserialize, Serialize};

use model::{LatLng, LatLngBounds, Track};

use crate::canvas::CanvasEvent;
use crate::sizing::degrees_per_pixel;

pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 20.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: LatLng,
    pub zoom: f64,
    /// The user moved the camera, so stop fitting it to the data
    pub user_overridden: bool,
    pub fullscreen: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraCommand {
    ZoomIn,
    ZoomOut,
    FitToBounds,
    ToggleFullscreen,
}

/// Owns the camera: auto-fits to the track until the user takes over.
pub struct ViewportController {
    viewport: Viewport,
    default_center: LatLng,
    default_zoom: f64,
    max_fit_zoom: f64,
    padding_px: f64,
}

impl ViewportController {
    pub fn new(default_center: LatLng, default_zoom: f64, max_fit_zoom: f64, padding_px: f64) -> Self {
        Self {
            viewport: Viewport {
                center: default_center,
                zoom: default_zoom,
                user_overridden: false,
                fullscreen: false,
            },
            default_center,
            default_zoom,
            max_fit_zoom: max_fit_zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            padding_px: padding_px.max(0.0),
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// A new track always takes the camera back from the user.
    pub fn on_track_loaded(&mut self, track: &Track, screen: (f64, f64)) {
        self.viewport.user_overridden = false;
        self.fit(track.bounds(), screen);
    }

    /// Same as loading a track: the override resets and the camera refits.
    pub fn on_render_mode_changed(&mut self, track: &Track, screen: (f64, f64)) {
        self.on_track_loaded(track, screen);
    }

    /// Fit to some part of the data, unless the user has taken over. Returns true if the camera
    /// moved.
    pub fn maybe_fit(&mut self, bounds: Option<LatLngBounds>, screen: (f64, f64)) -> bool {
        if self.viewport.user_overridden {
            return false;
        }
        let before = self.viewport;
        self.fit(bounds, screen);
        before != self.viewport
    }

    /// Returns true if the zoom level changed, meaning sizes need to be recalculated.
    pub fn on_canvas_event(&mut self, ev: CanvasEvent) -> bool {
        match ev {
            CanvasEvent::PanStart | CanvasEvent::ZoomStart => {
                if !self.viewport.user_overridden {
                    debug!("User took over the camera");
                }
                self.viewport.user_overridden = true;
                false
            }
            CanvasEvent::MoveEnd { center } => {
                if center.is_valid() {
                    self.viewport.center = center;
                }
                false
            }
            CanvasEvent::ZoomEnd { zoom } => {
                if !zoom.is_finite() {
                    return false;
                }
                let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
                let changed = zoom != self.viewport.zoom;
                self.viewport.zoom = zoom;
                changed
            }
        }
    }

    pub fn camera(&mut self, cmd: CameraCommand, track: &Track, screen: (f64, f64)) {
        match cmd {
            CameraCommand::ZoomIn => {
                self.viewport.user_overridden = true;
                self.viewport.zoom = (self.viewport.zoom + 1.0).min(MAX_ZOOM);
            }
            CameraCommand::ZoomOut => {
                self.viewport.user_overridden = true;
                self.viewport.zoom = (self.viewport.zoom - 1.0).max(MIN_ZOOM);
            }
            // Explicitly asking for the data means following it again
            CameraCommand::FitToBounds => {
                self.viewport.user_overridden = false;
                self.fit(track.bounds(), screen);
            }
            CameraCommand::ToggleFullscreen => {
                self.viewport.fullscreen = !self.viewport.fullscreen;
            }
        }
    }

    fn fit(&mut self, bounds: Option<LatLngBounds>, screen: (f64, f64)) {
        match bounds {
            Some(b) => {
                self.viewport.center = b.center();
                self.viewport.zoom = self.fit_zoom(&b, screen);
                info!(
                    "Fit camera to {:?} at zoom {}",
                    self.viewport.center, self.viewport.zoom
                );
            }
            None => {
                self.viewport.center = self.default_center;
                self.viewport.zoom = self.default_zoom;
            }
        }
    }

    /// The largest whole zoom level where the bounds fit on screen, with padding.
    fn fit_zoom(&self, b: &LatLngBounds, (width, height): (f64, f64)) -> f64 {
        let usable_w = (width - 2.0 * self.padding_px).max(1.0);
        let usable_h = (height - 2.0 * self.padding_px).max(1.0);
        // Mercator stretches latitude by sec(lat)
        let stretch = 1.0 / b.center().lat.to_radians().cos().max(0.01);
        let zoom_for = |span_degrees: f64, pixels: f64| -> f64 {
            if span_degrees <= 0.0 {
                return f64::INFINITY;
            }
            // degrees_per_pixel(z) * pixels >= span
            (degrees_per_pixel(0.0) * pixels / span_degrees).log2()
        };
        let zoom = zoom_for(b.lng_span(), usable_w).min(zoom_for(b.lat_span() * stretch, usable_h));
        if zoom.is_nan() {
            return self.max_fit_zoom;
        }
        zoom.floor().clamp(MIN_ZOOM, self.max_fit_zoom)
    }
}
