use anyhow::Result;
use geom::Duration;

use model::{segment_trips, LatLng, LatLngBounds, LivePosition, Track, Trip, TripInput};

use crate::canvas::{CanvasEvent, MapCanvas};
use crate::clock::{PlaybackClock, SpeedSetting, TickOutcome};
use crate::config::ReplayConfig;
use crate::geofences::GeofenceState;
use crate::layers::{OverlayLayers, RedrawInput};
use crate::observe::SessionState;
use crate::overlay::Overlay;
use crate::render_mode::{DisplayMode, RenderMode};
use crate::viewport::{CameraCommand, Viewport, ViewportController};

/// One replay of one track on one canvas. Every input is an explicit method call, and anything
/// that changes what's visible redraws synchronously before returning.
pub struct ReplaySession<C: MapCanvas> {
    canvas: C,
    config: ReplayConfig,
    track: Track,
    trip_input: Option<Vec<TripInput>>,
    trips: Vec<Trip>,
    render: RenderMode,
    viewport: ViewportController,
    clock: PlaybackClock,
    layers: OverlayLayers,
    geofences: GeofenceState,
    route_highlight: Option<Vec<LatLng>>,
    state: SessionState,
}

impl<C: MapCanvas> ReplaySession<C> {
    pub fn new(canvas: C, config: ReplayConfig) -> Self {
        let state = SessionState::new(Viewport {
            center: config.default_center,
            zoom: config.default_zoom,
            user_overridden: false,
            fullscreen: false,
        });
        Self::with_state(canvas, config, state)
    }

    /// Use state created (and maybe already subscribed to) elsewhere.
    pub fn with_state(canvas: C, config: ReplayConfig, state: SessionState) -> Self {
        let viewport = ViewportController::new(
            config.default_center,
            config.default_zoom,
            config.max_fit_zoom,
            config.fit_padding_px,
        );
        let clock = PlaybackClock::new(
            config.tick_interval(),
            config.end_grace(),
            config.base_step_percent,
            config.speed,
        );
        let layers = OverlayLayers::new(config.marker_spacing_px, config.collision_seed);
        Self {
            canvas,
            config,
            track: Track::empty(),
            trip_input: None,
            trips: Vec::new(),
            render: RenderMode::new(),
            viewport,
            clock,
            layers,
            geofences: GeofenceState::default(),
            route_highlight: None,
            state,
        }
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// For subscribing to the published row and viewport
    pub fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn trips(&self) -> &[Trip] {
        &self.trips
    }

    pub fn render_mode(&self) -> RenderMode {
        self.render
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport.viewport()
    }

    pub fn progress(&self) -> f64 {
        self.clock.progress()
    }

    pub fn is_playing(&self) -> bool {
        self.clock.is_playing()
    }

    pub fn speed(&self) -> SpeedSetting {
        self.clock.speed()
    }

    pub fn overlays(&self) -> &[Overlay] {
        self.layers.materialized()
    }

    pub fn live_position(&self) -> Option<LivePosition> {
        self.track.interpolate(self.clock.progress())
    }

    /// Replaces the track, rewinds, and takes the camera back from the user. `trip_input` of None
    /// means trips are inferred from time gaps.
    pub fn load_track(&mut self, track: Track, trip_input: Option<Vec<TripInput>>) {
        info!("Loading a track with {} samples", track.len());
        self.clock.stop();
        self.track = track;
        self.trip_input = trip_input;
        self.resegment();

        let screen = self.canvas.screen_size();
        self.viewport.on_track_loaded(&self.track, screen);
        self.sync_camera();
        self.redraw();
    }

    pub fn set_trip_input(&mut self, trip_input: Option<Vec<TripInput>>) {
        self.trip_input = trip_input;
        self.resegment();
        self.redraw();
    }

    /// Returns true if the mode changed. A change resets the camera, like loading a new track.
    pub fn set_display_mode(&mut self, display: DisplayMode) -> bool {
        if !self.render.set_display_mode(display) {
            return false;
        }
        let screen = self.canvas.screen_size();
        self.viewport.on_render_mode_changed(&self.track, screen);
        self.sync_camera();
        self.redraw();
        true
    }

    pub fn set_trip_markers_visible(&mut self, visible: bool) -> Result<bool> {
        let changed = self.render.set_trip_markers_visible(visible)?;
        if changed {
            self.redraw();
        }
        Ok(changed)
    }

    /// Trips are 0-indexed here, even though they're labeled from 1. Selecting a trip fits the
    /// camera to it, unless the user has taken over.
    pub fn select_trip(&mut self, trip: Option<usize>) -> Result<bool> {
        if let Some(idx) = trip {
            if idx >= self.trips.len() {
                bail!(
                    "Can't select trip {}; there are only {} trips",
                    idx + 1,
                    self.trips.len()
                );
            }
        }
        let changed = self.render.select_trip(trip)?;
        if !changed {
            return Ok(false);
        }
        if let Some(idx) = trip {
            let bounds =
                LatLngBounds::from_points(self.track.valid_points_in(self.trips[idx].samples.clone()));
            let screen = self.canvas.screen_size();
            if self.viewport.maybe_fit(bounds, screen) {
                self.sync_camera();
            }
        }
        self.redraw();
        Ok(true)
    }

    pub fn set_geofences(&mut self, geofences: GeofenceState) {
        self.geofences = geofences;
        self.redraw();
    }

    pub fn set_route_highlight(&mut self, route: Option<Vec<LatLng>>) {
        self.route_highlight = route;
        self.redraw();
    }

    pub fn play(&mut self) {
        if !self.clock.is_playing() {
            self.clock.play();
            self.redraw();
        }
    }

    /// Keeps the current position
    pub fn pause(&mut self) {
        if self.clock.is_playing() {
            self.clock.pause();
            self.redraw();
        }
    }

    /// Rewinds and removes everything from the canvas. The next redraw brings it all back.
    pub fn stop(&mut self) {
        self.clock.stop();
        self.layers.clear(&mut self.canvas);
        self.state.current_row.publish(None);
    }

    pub fn set_speed(&mut self, speed: SpeedSetting) {
        self.clock.set_speed(speed);
    }

    pub fn tick(&mut self) -> TickOutcome {
        let outcome = self.clock.tick();
        if outcome != TickOutcome::Idle {
            self.redraw();
        }
        outcome
    }

    /// Runs however many ticks fit in `real_dt`, redrawing after each.
    pub fn advance(&mut self, real_dt: Duration) -> Vec<TickOutcome> {
        let due = self.clock.due_ticks(real_dt);
        (0..due).map(|_| self.tick()).collect()
    }

    pub fn seek(&mut self, progress: f64) {
        self.clock.seek(progress);
        self.redraw();
    }

    /// Jump to a row of the track, like when a table row is clicked
    pub fn seek_to_index(&mut self, idx: usize) {
        self.clock.seek(self.track.progress_of_index(idx));
        self.redraw();
    }

    pub fn handle_canvas_event(&mut self, ev: CanvasEvent) {
        let zoom_changed = self.viewport.on_canvas_event(ev);
        self.state.viewport.publish(self.viewport.viewport());
        if zoom_changed {
            self.redraw();
        }
    }

    pub fn camera(&mut self, cmd: CameraCommand) {
        let before = self.viewport.viewport();
        let screen = self.canvas.screen_size();
        self.viewport.camera(cmd, &self.track, screen);
        self.sync_camera();
        if self.viewport.viewport().zoom != before.zoom {
            self.redraw();
        }
    }

    /// Removes every overlay and stops playback. The session can still be reused afterwards.
    pub fn teardown(&mut self) {
        self.clock.stop();
        self.layers.clear(&mut self.canvas);
        self.state.current_row.publish(None);
    }

    pub fn into_canvas(mut self) -> C {
        self.teardown();
        self.canvas
    }

    fn resegment(&mut self) {
        self.trips = segment_trips(&self.track, self.trip_input.as_deref(), &self.config.trips);
        info!("{} trips in the track", self.trips.len());
        if let Some(idx) = self.render.selected_trip {
            if idx >= self.trips.len() {
                self.render.clear_selection();
            }
        }
    }

    fn sync_camera(&mut self) {
        let vp = self.viewport.viewport();
        self.canvas.set_view(vp.center, vp.zoom);
        self.canvas.set_fullscreen(vp.fullscreen);
        self.state.viewport.publish(vp);
    }

    // Also publishes the row, since the vehicle may have moved
    fn redraw(&mut self) {
        let live = self.track.interpolate(self.clock.progress());
        let input = RedrawInput {
            track: &self.track,
            trips: &self.trips,
            render: self.render,
            playing: self.clock.is_playing(),
            live: live.as_ref(),
            geofences: &self.geofences,
            route_highlight: self.route_highlight.as_deref(),
            zoom: self.viewport.viewport().zoom,
        };
        self.layers.redraw(&mut self.canvas, &input);
        self.state
            .current_row
            .publish(live.as_ref().map(|pos| pos.row_index));
    }
}
