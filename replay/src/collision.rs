//! Best-effort placement for trip markers that would otherwise sit on top of each other. There's
//! no guarantee of a collision-free layout: after `MAX_ATTEMPTS` nudges, the marker is accepted
//! at a randomly jittered spot even if that still overlaps.

use std::f64::consts::FRAC_PI_4;

use model::LatLng;

use crate::sizing::degrees_per_pixel;

pub const MAX_ATTEMPTS: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub pos: LatLng,
    /// 0 if the original spot was free
    pub attempts: usize,
    /// Every retry collided and the position was randomized
    pub exhausted: bool,
}

/// Tracks everything placed during one redraw pass.
pub struct Placer<'a> {
    placed: Vec<LatLng>,
    min_distance: f64,
    rng: &'a mut fastrand::Rng,
}

impl<'a> Placer<'a> {
    /// `min_distance` is in degrees
    pub fn new(min_distance: f64, rng: &'a mut fastrand::Rng) -> Self {
        Self {
            placed: Vec::new(),
            min_distance,
            rng,
        }
    }

    /// Markers need more room in degrees as the map zooms out.
    pub fn min_distance_for_zoom(spacing_px: f64, zoom: f64) -> f64 {
        spacing_px * degrees_per_pixel(zoom)
    }

    pub fn place(&mut self, original: LatLng) -> Placement {
        let placement = self.find_spot(original);
        self.placed.push(placement.pos);
        placement
    }

    fn find_spot(&mut self, original: LatLng) -> Placement {
        if self.is_free(original) {
            return Placement {
                pos: original,
                attempts: 0,
                exhausted: false,
            };
        }

        // Walk around the point, 45 degrees apart, moving further out each time
        for attempt in 0..MAX_ATTEMPTS {
            let angle = (attempt as f64) * FRAC_PI_4;
            let radius = self.min_distance * (1.25 + 0.5 * attempt as f64);
            let candidate = original.offset(radius * angle.cos(), radius * angle.sin());
            if self.is_free(candidate) {
                return Placement {
                    pos: candidate,
                    attempts: attempt + 1,
                    exhausted: false,
                };
            }
        }

        let dlat = (self.rng.f64() * 2.0 - 1.0) * self.min_distance;
        let dlng = (self.rng.f64() * 2.0 - 1.0) * self.min_distance;
        Placement {
            pos: original.offset(dlat, dlng),
            attempts: MAX_ATTEMPTS,
            exhausted: true,
        }
    }

    fn is_free(&self, pt: LatLng) -> bool {
        self.placed
            .iter()
            .all(|other| other.flat_dist_degrees(pt) >= self.min_distance)
    }
}
