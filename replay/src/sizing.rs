/// Pixel sizes for per-trip markers. Each is linear in the zoom level and clamped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarkerSizes {
    pub diameter_px: f64,
    pub badge_px: f64,
    pub font_px: f64,
}

pub const DIAMETER_RANGE_PX: (f64, f64) = (16.0, 36.0);
pub const BADGE_RANGE_PX: (f64, f64) = (10.0, 20.0);
pub const FONT_RANGE_PX: (f64, f64) = (9.0, 16.0);

impl MarkerSizes {
    pub fn for_zoom(zoom: f64) -> Self {
        Self {
            diameter_px: clamp(2.0 * zoom - 4.0, DIAMETER_RANGE_PX),
            badge_px: clamp(zoom - 2.0, BADGE_RANGE_PX),
            font_px: clamp(0.75 * zoom, FONT_RANGE_PX),
        }
    }
}

fn clamp(x: f64, (min, max): (f64, f64)) -> f64 {
    if x.is_nan() {
        return min;
    }
    x.clamp(min, max)
}

/// Web mercator scale at the equator, with 256 pixel tiles.
pub fn degrees_per_pixel(zoom: f64) -> f64 {
    360.0 / (256.0 * 2.0_f64.powf(zoom))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_with_zoom_then_clamps() {
        let far = MarkerSizes::for_zoom(3.0);
        assert_eq!(far.diameter_px, 16.0);
        assert_eq!(far.badge_px, 10.0);
        assert_eq!(far.font_px, 9.0);

        let mid = MarkerSizes::for_zoom(14.0);
        assert_eq!(mid.diameter_px, 24.0);
        assert_eq!(mid.badge_px, 12.0);
        assert_eq!(mid.font_px, 10.5);

        let close = MarkerSizes::for_zoom(22.0);
        assert_eq!(close.diameter_px, 36.0);
        assert_eq!(close.badge_px, 20.0);
        assert_eq!(close.font_px, 16.0);
    }

    #[test]
    fn scale_halves_per_zoom_level() {
        assert_eq!(degrees_per_pixel(0.0), 360.0 / 256.0);
        assert_eq!(degrees_per_pixel(4.0) * 2.0, degrees_per_pixel(3.0));
    }
}
