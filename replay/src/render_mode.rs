use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayMode {
    /// The track and its endpoints
    Line,
    /// Every sample as its own marker
    Marker,
}

/// Gates which overlays get materialized. Marker mode and per-trip overlays are mutually
/// exclusive, so every transition here keeps that true.
///
/// Each transition returns whether anything changed, so callers only redraw when needed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RenderMode {
    pub display: DisplayMode,
    pub trip_markers_visible: bool,
    pub selected_trip: Option<usize>,
}

impl Default for RenderMode {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderMode {
    pub fn new() -> Self {
        Self {
            display: DisplayMode::Line,
            trip_markers_visible: false,
            selected_trip: None,
        }
    }

    pub fn set_display_mode(&mut self, display: DisplayMode) -> bool {
        let before = *self;
        self.display = display;
        if display == DisplayMode::Marker {
            self.trip_markers_visible = false;
            self.selected_trip = None;
        }
        before != *self
    }

    /// Fails when trying to show trip markers in marker mode.
    pub fn set_trip_markers_visible(&mut self, visible: bool) -> Result<bool> {
        if visible && self.display == DisplayMode::Marker {
            bail!("Trip markers can't be shown in marker mode; switch to line mode first");
        }
        let before = *self;
        self.trip_markers_visible = visible;
        if !visible {
            self.selected_trip = None;
        }
        Ok(before != *self)
    }

    /// Selecting a trip shows the trip markers too, since that's the only way a selection is
    /// visible. Fails in marker mode, leaving everything as it was.
    pub fn select_trip(&mut self, trip: Option<usize>) -> Result<bool> {
        let before = *self;
        match trip {
            Some(idx) => {
                if self.display == DisplayMode::Marker {
                    bail!("Can't select trip {} in marker mode", idx + 1);
                }
                self.trip_markers_visible = true;
                self.selected_trip = Some(idx);
            }
            None => return Ok(self.clear_selection()),
        }
        Ok(before != *self)
    }

    /// Allowed in every mode, so this can't fail.
    pub fn clear_selection(&mut self) -> bool {
        self.selected_trip.take().is_some()
    }

    pub fn show_trips(&self) -> bool {
        self.display == DisplayMode::Line && self.trip_markers_visible
    }
}
