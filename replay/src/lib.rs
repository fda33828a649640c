//! Animated replay of a vehicle's GPS track on a map. The map itself is abstracted behind
//! `MapCanvas`; everything else (what to draw, where the camera goes, how playback advances)
//! lives here.

#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod canvas;
mod clock;
mod collision;
mod config;
mod geofences;
mod layers;
mod observe;
mod overlay;
mod render_mode;
mod session;
mod sizing;
mod viewport;

pub use self::canvas::{CanvasEvent, DrawnObject, MapCanvas, RecordingCanvas};
pub use self::clock::{PlaybackClock, SpeedSetting, TickOutcome};
pub use self::collision::{Placement, Placer, MAX_ATTEMPTS};
pub use self::config::ReplayConfig;
pub use self::geofences::GeofenceState;
pub use self::layers::{plan, OverlayLayers, RedrawInput};
pub use self::observe::{Observable, SessionState, SubscriptionID};
pub use self::overlay::{
    Color, Geometry, LineStyle, MarkerIcon, MarkerStyle, Overlay, OverlayDraft, OverlayID,
    OverlayKind, Shape, ShapeStyle,
};
pub use self::render_mode::{DisplayMode, RenderMode};
pub use self::session::ReplaySession;
pub use self::sizing::{degrees_per_pixel, MarkerSizes};
pub use self::viewport::{CameraCommand, Viewport, ViewportController, MAX_ZOOM, MIN_ZOOM};
