//! The only code that touches the canvas. Every redraw follows `CLEAR_THEN_REDRAW`: remove
//! everything, then materialize the full plan with fresh IDs. Nothing is patched in place, so the
//! overlays on the canvas after any redraw are a deterministic function of the inputs.

use model::{LatLng, LivePosition, SampleStatus, Track, Trip};

use crate::canvas::MapCanvas;
use crate::collision::Placer;
use crate::geofences::GeofenceState;
use crate::overlay::{
    trip_line_z, trip_marker_z, Color, Geometry, LineStyle, MarkerIcon, MarkerStyle, Overlay,
    OverlayDraft, OverlayID, OverlayKind, Z_FLAG, Z_LIVE_VEHICLE, Z_ROUTE_HIGHLIGHT,
    Z_SAMPLE_MARKER, Z_TRACK_LINE,
};
use crate::render_mode::{DisplayMode, RenderMode};
use crate::sizing::MarkerSizes;

/// Everything a redraw depends on. If two inputs are equal, so are the resulting overlays (up to
/// the anti-collision jitter, which is seeded).
pub struct RedrawInput<'a> {
    pub track: &'a Track,
    pub trips: &'a [Trip],
    pub render: RenderMode,
    pub playing: bool,
    pub live: Option<&'a LivePosition>,
    pub geofences: &'a GeofenceState,
    pub route_highlight: Option<&'a [LatLng]>,
    pub zoom: f64,
}

pub struct OverlayLayers {
    live: Vec<Overlay>,
    next_id: usize,
    rng: fastrand::Rng,
    spacing_px: f64,
}

impl OverlayLayers {
    /// Without a seed, anti-collision jitter differs between runs.
    pub fn new(spacing_px: f64, seed: Option<u64>) -> Self {
        Self {
            live: Vec::new(),
            next_id: 0,
            rng: match seed {
                Some(seed) => fastrand::Rng::with_seed(seed),
                None => fastrand::Rng::new(),
            },
            spacing_px,
        }
    }

    /// The overlays currently on the canvas, in draw order
    pub fn materialized(&self) -> &[Overlay] {
        &self.live
    }

    pub fn redraw<C: MapCanvas + ?Sized>(
        &mut self,
        canvas: &mut C,
        input: &RedrawInput,
    ) -> &[Overlay] {
        let drafts = plan(input, self.spacing_px, &mut self.rng);

        canvas.remove_all();
        self.live.clear();
        for draft in drafts {
            let id = OverlayID(self.next_id);
            self.next_id += 1;
            match &draft.geometry {
                Geometry::Line { points, style } => canvas.draw_polyline(id, draft.z, points, style),
                Geometry::Marker { pos, style } => canvas.draw_marker(id, draft.z, *pos, style),
                Geometry::Shape { shape, style } => canvas.draw_shape(id, draft.z, shape, style),
            }
            self.live.push(Overlay {
                id,
                kind: draft.kind,
                z: draft.z,
                geometry: draft.geometry,
            });
        }
        debug!("Redrew {} overlays at zoom {}", self.live.len(), input.zoom);
        &self.live
    }

    pub fn clear<C: MapCanvas + ?Sized>(&mut self, canvas: &mut C) {
        canvas.remove_all();
        self.live.clear();
    }
}

/// Decides what should be on the canvas, sorted by z. Equal z keeps insertion order.
pub fn plan(input: &RedrawInput, spacing_px: f64, rng: &mut fastrand::Rng) -> Vec<OverlayDraft> {
    let mut drafts = Vec::new();
    let sizes = MarkerSizes::for_zoom(input.zoom);
    let show_trips = input.render.show_trips();
    let valid = input.track.valid_points();

    // The whole track
    if valid.len() >= 2 {
        drafts.push(OverlayDraft::line(
            OverlayKind::TrackLine,
            Z_TRACK_LINE,
            valid.clone(),
            LineStyle {
                color: if show_trips { Color::GREY } else { Color::BLUE },
                weight_px: 4.0,
                opacity: if show_trips { 0.5 } else { 0.8 },
                dash: None,
            },
        ));
    }

    if let Some(route) = input.route_highlight {
        let points: Vec<LatLng> = route.iter().copied().filter(|pt| pt.is_valid()).collect();
        if points.len() >= 2 {
            drafts.push(OverlayDraft::line(
                OverlayKind::RouteHighlight,
                Z_ROUTE_HIGHLIGHT,
                points,
                LineStyle {
                    color: Color::ORANGE,
                    weight_px: 6.0,
                    opacity: 0.6,
                    dash: None,
                },
            ));
        }
    }

    let marker_mode = input.render.display == DisplayMode::Marker;
    // Marker mode is a paused-only view
    let hide_static_markers = marker_mode && input.playing;

    if !show_trips && !hide_static_markers {
        if let Some(first) = valid.first() {
            drafts.push(OverlayDraft::marker(
                OverlayKind::StartFlag,
                Z_FLAG,
                *first,
                MarkerStyle::plain(MarkerIcon::StartFlag, Color::GREEN, sizes.diameter_px),
            ));
        }
        if valid.len() >= 2 {
            if let Some(last) = valid.last() {
                drafts.push(OverlayDraft::marker(
                    OverlayKind::EndFlag,
                    Z_FLAG,
                    *last,
                    MarkerStyle::plain(MarkerIcon::EndFlag, Color::RED, sizes.diameter_px),
                ));
            }
        }
    }

    if marker_mode && !input.playing {
        for sample in input.track.samples() {
            if let Some(pos) = sample.pos.filter(|pt| pt.is_valid()) {
                drafts.push(OverlayDraft::marker(
                    OverlayKind::SampleMarker,
                    Z_SAMPLE_MARKER,
                    pos,
                    MarkerStyle::plain(
                        MarkerIcon::Dot,
                        status_color(sample.status),
                        (sizes.diameter_px / 2.0).max(6.0),
                    ),
                ));
            }
        }
    }

    if show_trips {
        drafts.extend(trip_overlays(input, sizes, spacing_px, rng));
    }

    drafts.extend(input.geofences.overlays());

    if let Some(live) = input.live {
        if let Some(pos) = live.pos.filter(|pt| pt.is_valid()) {
            let mut style = MarkerStyle::plain(MarkerIcon::Vehicle, Color::BLACK, sizes.diameter_px + 4.0);
            style.rotation_degrees = if live.heading.is_finite() {
                live.heading.rem_euclid(360.0)
            } else {
                0.0
            };
            drafts.push(OverlayDraft::marker(
                OverlayKind::LiveVehicle,
                Z_LIVE_VEHICLE,
                pos,
                style,
            ));
        }
    }

    drafts.sort_by_key(|d| d.z);
    drafts
}

fn trip_overlays(
    input: &RedrawInput,
    sizes: MarkerSizes,
    spacing_px: f64,
    rng: &mut fastrand::Rng,
) -> Vec<OverlayDraft> {
    let mut drafts = Vec::new();
    let mut placer = Placer::new(Placer::min_distance_for_zoom(spacing_px, input.zoom), rng);
    let selected = input.render.selected_trip;

    // The selected trip claims its true position first
    let mut order: Vec<usize> = (0..input.trips.len()).collect();
    if let Some(idx) = selected.filter(|idx| *idx < input.trips.len()) {
        order.retain(|x| *x != idx);
        order.insert(0, idx);
    }

    for idx in order {
        let trip = &input.trips[idx];
        let is_selected = selected == Some(idx);
        let color = Color::for_trip(trip.color_index);
        let points = input.track.valid_points_in(trip.samples.clone());

        if points.len() >= 2 {
            drafts.push(OverlayDraft::line(
                OverlayKind::TripLine,
                trip_line_z(idx, is_selected),
                points.clone(),
                if is_selected {
                    LineStyle {
                        color,
                        weight_px: 7.0,
                        opacity: 1.0,
                        dash: None,
                    }
                } else {
                    LineStyle {
                        color,
                        weight_px: 4.0,
                        opacity: 0.7,
                        dash: Some((6.0, 8.0)),
                    }
                },
            ));
        }

        let ends = [
            (points.first(), OverlayKind::TripStart, MarkerIcon::TripStart, true),
            (points.last(), OverlayKind::TripEnd, MarkerIcon::TripEnd, false),
        ];
        for (pt, kind, icon, start) in ends {
            let pt = match pt {
                Some(pt) => *pt,
                None => continue,
            };
            let placement = placer.place(pt);
            if placement.exhausted {
                debug!(
                    "No free spot for trip {} {:?} after {} attempts",
                    idx + 1,
                    kind,
                    placement.attempts
                );
            }
            drafts.push(OverlayDraft::marker(
                kind,
                trip_marker_z(idx, is_selected, start),
                placement.pos,
                MarkerStyle {
                    icon,
                    color,
                    diameter_px: sizes.diameter_px,
                    label: Some((idx + 1).to_string()),
                    badge_px: sizes.badge_px,
                    font_px: sizes.font_px,
                    rotation_degrees: 0.0,
                },
            ));
        }
    }
    drafts
}

fn status_color(status: SampleStatus) -> Color {
    match status {
        SampleStatus::Moving => Color::GREEN,
        SampleStatus::Idle => Color::ORANGE,
        SampleStatus::Stop => Color::RED,
        SampleStatus::Unknown => Color::GREY,
    }
}

#[cfg(test)]
mod tests {
    use geom::Distance;
    use model::{segment_trips, Geofence, GeofenceShape, SegmenterConfig};

    use super::*;
    use crate::canvas::RecordingCanvas;
    use crate::tests::straight_track;

    fn count(overlays: &[Overlay], kind: OverlayKind) -> usize {
        overlays.iter().filter(|o| o.kind == kind).count()
    }

    fn input<'a>(
        track: &'a Track,
        trips: &'a [Trip],
        render: RenderMode,
        geofences: &'a GeofenceState,
    ) -> RedrawInput<'a> {
        RedrawInput {
            track,
            trips,
            render,
            playing: false,
            live: None,
            geofences,
            route_highlight: None,
            zoom: 14.0,
        }
    }

    // Two trips, split by a long gap in the middle
    fn two_trip_track() -> Track {
        let mut samples = straight_track(10, 0.01).samples().to_vec();
        for s in samples.iter_mut().skip(5) {
            s.time = s.time + chrono::Duration::hours(2);
        }
        Track::new(samples)
    }

    #[test]
    fn clear_then_redraw_doesnt_leak() {
        let track = straight_track(20, 0.001);
        let geofences = GeofenceState::default();
        let mut layers = OverlayLayers::new(24.0, Some(3));
        let mut canvas = RecordingCanvas::new(800.0, 600.0);

        let live = track.interpolate(40.0).unwrap();
        let mut redraw_input = input(&track, &[], RenderMode::new(), &geofences);
        redraw_input.live = Some(&live);

        let first = layers.redraw(&mut canvas, &redraw_input).len();
        for _ in 0..10 {
            layers.redraw(&mut canvas, &redraw_input);
        }
        assert_eq!(layers.materialized().len(), first);
        assert_eq!(canvas.objects.len(), first);
        assert_eq!(canvas.remove_all_calls, 11);
        // Track line, 2 flags, the vehicle
        assert_eq!(first, 4);

        layers.clear(&mut canvas);
        assert!(canvas.objects.is_empty());
        assert!(layers.materialized().is_empty());
    }

    #[test]
    fn sorted_by_z() {
        let track = two_trip_track();
        let trips = segment_trips(&track, None, &SegmenterConfig::default());
        let geofences = GeofenceState::default();
        let mut render = RenderMode::new();
        render.select_trip(Some(1)).unwrap();
        let mut layers = OverlayLayers::new(24.0, Some(3));
        let mut canvas = RecordingCanvas::new(800.0, 600.0);

        let overlays = layers.redraw(&mut canvas, &input(&track, &trips, render, &geofences));
        assert!(overlays.windows(2).all(|pair| pair[0].z <= pair[1].z));
        assert!(overlays.windows(2).all(|pair| pair[0].id < pair[1].id));
    }

    #[test]
    fn trip_markers_replace_flags() {
        let track = two_trip_track();
        let trips = segment_trips(&track, None, &SegmenterConfig::default());
        assert_eq!(trips.len(), 2);
        let geofences = GeofenceState::default();
        let mut render = RenderMode::new();
        render.set_trip_markers_visible(true).unwrap();
        let mut layers = OverlayLayers::new(24.0, Some(3));
        let mut canvas = RecordingCanvas::new(800.0, 600.0);

        let overlays = layers.redraw(&mut canvas, &input(&track, &trips, render, &geofences));
        assert_eq!(count(overlays, OverlayKind::StartFlag), 0);
        assert_eq!(count(overlays, OverlayKind::EndFlag), 0);
        assert_eq!(count(overlays, OverlayKind::TripStart), 2);
        assert_eq!(count(overlays, OverlayKind::TripEnd), 2);
        assert_eq!(count(overlays, OverlayKind::TripLine), 2);

        let labels: Vec<String> = canvas
            .markers()
            .filter_map(|(_, style)| style.label.clone())
            .collect();
        assert!(labels.contains(&"1".to_string()));
        assert!(labels.contains(&"2".to_string()));
    }

    #[test]
    fn selected_trip_stands_out() {
        let track = two_trip_track();
        let trips = segment_trips(&track, None, &SegmenterConfig::default());
        let geofences = GeofenceState::default();
        let mut render = RenderMode::new();
        render.select_trip(Some(0)).unwrap();
        let mut rng = fastrand::Rng::with_seed(1);

        let drafts = plan(&input(&track, &trips, render, &geofences), 24.0, &mut rng);
        let lines: Vec<&OverlayDraft> = drafts
            .iter()
            .filter(|d| d.kind == OverlayKind::TripLine)
            .collect();
        assert_eq!(lines.len(), 2);
        // The selected line draws last
        match (&lines[0].geometry, &lines[1].geometry) {
            (Geometry::Line { style: other, .. }, Geometry::Line { style: selected, .. }) => {
                assert!(other.dash.is_some());
                assert!(selected.dash.is_none());
                assert!(selected.weight_px > other.weight_px);
                assert_eq!(selected.opacity, 1.0);
            }
            _ => panic!("trip lines should be lines"),
        }
    }

    #[test]
    fn marker_mode_hides_while_playing() {
        let track = straight_track(6, 0.01);
        let geofences = GeofenceState::default();
        let mut render = RenderMode::new();
        render.set_display_mode(DisplayMode::Marker);
        let live = track.interpolate(50.0).unwrap();
        let mut rng = fastrand::Rng::with_seed(1);

        let mut paused = input(&track, &[], render, &geofences);
        paused.live = Some(&live);
        let drafts = plan(&paused, 24.0, &mut rng);
        assert_eq!(drafts.iter().filter(|d| d.kind == OverlayKind::SampleMarker).count(), 6);
        assert_eq!(drafts.iter().filter(|d| d.kind == OverlayKind::StartFlag).count(), 1);

        let mut playing = input(&track, &[], render, &geofences);
        playing.live = Some(&live);
        playing.playing = true;
        let drafts = plan(&playing, 24.0, &mut rng);
        let kinds: Vec<OverlayKind> = drafts.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![OverlayKind::TrackLine, OverlayKind::LiveVehicle]);
    }

    #[test]
    fn line_mode_keeps_flags_while_playing() {
        let track = straight_track(6, 0.01);
        let geofences = GeofenceState::default();
        let mut rng = fastrand::Rng::with_seed(1);
        let mut redraw_input = input(&track, &[], RenderMode::new(), &geofences);
        redraw_input.playing = true;
        let drafts = plan(&redraw_input, 24.0, &mut rng);
        assert_eq!(drafts.iter().filter(|d| d.kind == OverlayKind::StartFlag).count(), 1);
        assert_eq!(drafts.iter().filter(|d| d.kind == OverlayKind::EndFlag).count(), 1);
    }

    #[test]
    fn single_sample_has_no_line_or_end_flag() {
        let track = straight_track(1, 0.01);
        let geofences = GeofenceState::default();
        let mut rng = fastrand::Rng::with_seed(1);
        let drafts = plan(&input(&track, &[], RenderMode::new(), &geofences), 24.0, &mut rng);
        let kinds: Vec<OverlayKind> = drafts.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![OverlayKind::StartFlag]);
    }

    #[test]
    fn vehicle_follows_heading() {
        let track = straight_track(3, 0.01);
        let geofences = GeofenceState::default();
        let mut live = track.interpolate(10.0).unwrap();
        live.heading = -90.0;
        let mut rng = fastrand::Rng::with_seed(1);
        let mut redraw_input = input(&track, &[], RenderMode::new(), &geofences);
        redraw_input.live = Some(&live);
        let drafts = plan(&redraw_input, 24.0, &mut rng);
        let vehicle = drafts
            .iter()
            .find(|d| d.kind == OverlayKind::LiveVehicle)
            .unwrap();
        match &vehicle.geometry {
            Geometry::Marker { style, .. } => assert_eq!(style.rotation_degrees, 270.0),
            _ => panic!("vehicle should be a marker"),
        }
    }

    #[test]
    fn overlapping_trip_markers_are_spread() {
        // Every trip starts and ends at the same two spots
        let base = straight_track(2, 0.0001);
        let mut samples = Vec::new();
        for trip in 0..6 {
            for s in base.samples() {
                let mut s = s.clone();
                s.time = s.time + chrono::Duration::hours(trip);
                samples.push(s);
            }
        }
        let track = Track::new(samples);
        let trips = segment_trips(
            &track,
            None,
            &SegmenterConfig {
                max_gap_minutes: 30,
                min_trip_km: 0.0,
            },
        );
        assert_eq!(trips.len(), 6);
        let geofences = GeofenceState::default();
        let mut render = RenderMode::new();
        render.set_trip_markers_visible(true).unwrap();
        let mut rng = fastrand::Rng::with_seed(9);

        let drafts = plan(&input(&track, &trips, render, &geofences), 24.0, &mut rng);
        let positions: Vec<LatLng> = drafts
            .iter()
            .filter(|d| matches!(d.kind, OverlayKind::TripStart | OverlayKind::TripEnd))
            .filter_map(|d| d.marker_pos())
            .collect();
        assert_eq!(positions.len(), 12);
        for (i, a) in positions.iter().enumerate() {
            for b in &positions[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    fn kind_counts(overlays: &[Overlay]) -> Vec<(OverlayKind, usize)> {
        let mut kinds: Vec<OverlayKind> = overlays.iter().map(|o| o.kind).collect();
        kinds.sort();
        kinds.dedup();
        kinds.into_iter().map(|k| (k, count(overlays, k))).collect()
    }

    #[test]
    fn repeated_redraws_with_everything_on_are_identical() {
        let track = two_trip_track();
        let trips = segment_trips(&track, None, &SegmenterConfig::default());
        assert_eq!(trips.len(), 2);
        let geofences = GeofenceState {
            fences: vec![
                Geofence {
                    name: "depot".to_string(),
                    shape: GeofenceShape::Circle {
                        center: Some(LatLng::new(0.001, 0.02)),
                        radius: Some(Distance::meters(150.0)),
                    },
                },
                Geofence {
                    name: "terminal".to_string(),
                    shape: GeofenceShape::Polygon {
                        vertices: vec![
                            LatLng::new(0.0, 0.07),
                            LatLng::new(0.0, 0.08),
                            LatLng::new(0.01, 0.08),
                            LatLng::new(0.01, 0.07),
                        ],
                    },
                },
            ],
            show_geofences: true,
            show_shapes: true,
        };
        let live = track.interpolate(30.0).unwrap();
        let mut render = RenderMode::new();
        render.select_trip(Some(1)).unwrap();
        let mut layers = OverlayLayers::new(24.0, Some(5));
        let mut canvas = RecordingCanvas::new(800.0, 600.0);

        let mut redraw_input = input(&track, &trips, render, &geofences);
        redraw_input.live = Some(&live);
        let first = kind_counts(layers.redraw(&mut canvas, &redraw_input));
        let total: usize = first.iter().map(|(_, n)| n).sum();
        // Track line, 2 trip lines, 4 trip markers, 2 geofence markers, 2 shapes, the vehicle
        assert_eq!(total, 12);
        for _ in 0..10 {
            let again = kind_counts(layers.redraw(&mut canvas, &redraw_input));
            assert_eq!(again, first);
            assert_eq!(layers.materialized().len(), total);
            assert_eq!(canvas.objects.len(), total);
        }

        // Marker mode, paused, with the geofences still on
        render.set_display_mode(DisplayMode::Marker);
        let mut redraw_input = input(&track, &trips, render, &geofences);
        redraw_input.live = Some(&live);
        let first = kind_counts(layers.redraw(&mut canvas, &redraw_input));
        let total: usize = first.iter().map(|(_, n)| n).sum();
        // Track line, 2 flags, 10 samples, 2 geofence markers, 2 shapes, the vehicle
        assert_eq!(total, 18);
        assert!(first.iter().all(|(k, _)| *k != OverlayKind::TripStart));
        for _ in 0..10 {
            let again = kind_counts(layers.redraw(&mut canvas, &redraw_input));
            assert_eq!(again, first);
            assert_eq!(canvas.objects.len(), total);
        }
        assert_eq!(canvas.remove_all_calls, 22);
    }

    #[test]
    fn samples_without_a_position_are_skipped() {
        let mut samples = straight_track(6, 0.01).samples().to_vec();
        samples[2].pos = None;
        let track = Track::new(samples);
        let geofences = GeofenceState::default();
        let live = track.interpolate(40.0);
        let mut layers = OverlayLayers::new(24.0, Some(2));
        let mut canvas = RecordingCanvas::new(800.0, 600.0);

        let mut redraw_input = input(&track, &[], RenderMode::new(), &geofences);
        redraw_input.live = live.as_ref();
        let overlays = layers.redraw(&mut canvas, &redraw_input);
        let line = overlays
            .iter()
            .find(|o| o.kind == OverlayKind::TrackLine)
            .unwrap();
        match &line.geometry {
            Geometry::Line { points, .. } => {
                assert_eq!(points.len(), 5);
                assert!(!points.contains(&LatLng::new(0.0, 0.02)));
            }
            _ => panic!("the track should be a line"),
        }
        assert_eq!(canvas.objects.len(), layers.materialized().len());

        let mut render = RenderMode::new();
        render.set_display_mode(DisplayMode::Marker);
        let mut redraw_input = input(&track, &[], render, &geofences);
        redraw_input.live = live.as_ref();
        let overlays = layers.redraw(&mut canvas, &redraw_input);
        assert_eq!(count(overlays, OverlayKind::SampleMarker), 5);
        assert_eq!(count(overlays, OverlayKind::StartFlag), 1);
        assert_eq!(count(overlays, OverlayKind::EndFlag), 1);
        assert_eq!(canvas.objects.len(), layers.materialized().len());
        assert_eq!(canvas.remove_all_calls, 2);
    }
}
