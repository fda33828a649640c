#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod avl;
mod geofence;
mod interpolate;
mod timestamps;
mod track;
mod trips;

pub use self::avl::load_track;
pub use self::geofence::{Geofence, GeofenceShape};
pub use self::interpolate::LivePosition;
pub use self::timestamps::parse_timestamp;
pub use self::track::{GpsSample, LatLng, LatLngBounds, SampleStatus, Track};
pub use self::trips::{
    segment_trips, SegmenterConfig, Trip, TripInput, DEFAULT_MAX_GAP_MINUTES, DEFAULT_MIN_TRIP_KM,
    MAX_GAP_MINUTES,
};

/// Flat-earth conversion factor from degrees to kilometers. Deliberately not geodesic; trip
/// filtering depends on this exact approximation.
pub const KM_PER_DEGREE: f64 = 111.0;
