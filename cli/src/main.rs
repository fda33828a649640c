#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

use abstutil::{prettyprint_usize, Counter, Timer};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use structopt::StructOpt;

use model::{Geofence, LatLng, TripInput};
use replay::{
    DisplayMode, GeofenceState, OverlayKind, RecordingCanvas, ReplayConfig, ReplaySession,
    SpeedSetting, TickOutcome,
};

/// Replays a GPS track without a real map, reporting what would be drawn.
#[derive(StructOpt)]
struct Args {
    /// The path to an AVL CSV file
    #[structopt(long)]
    track: String,
    /// The path to a JSON list of trips. If missing, trips are inferred from gaps in the track.
    #[structopt(long)]
    trips: Option<String>,
    /// The path to geofences, as GeoJSON or a JSON list
    #[structopt(long)]
    geofences: Option<String>,
    /// Also draw geofence shapes, not just their markers
    #[structopt(long)]
    geofence_shapes: bool,
    /// The path to a JSON config file
    #[structopt(long)]
    config: Option<String>,
    /// "line" or "marker"
    #[structopt(long, default_value = "line", parse(try_from_str = parse_mode))]
    mode: DisplayMode,
    /// Show numbered markers for every trip
    #[structopt(long)]
    trip_markers: bool,
    /// The trip to select, numbered from 1
    #[structopt(long)]
    select: Option<usize>,
    /// Playback speed multiplier: 1, 2, 4, 8, or 16
    #[structopt(long, parse(try_from_str = parse_speed))]
    speed: Option<SpeedSetting>,
    /// How many ticks to play
    #[structopt(long, default_value = "0")]
    ticks: usize,
    /// Write the final camera and progress here
    #[structopt(long)]
    savestate: Option<String>,
    /// The simulated screen size, in pixels
    #[structopt(long, default_value = "1280")]
    width: f64,
    #[structopt(long, default_value = "800")]
    height: f64,
}

#[derive(Serialize, Deserialize)]
struct Savestate {
    center: LatLng,
    zoom: f64,
    progress: f64,
}

fn main() -> Result<()> {
    abstutil::logger::setup();
    let args = Args::from_iter(abstutil::cli_args());

    let mut timer = Timer::new("replay a track");
    let config = match args.config {
        Some(ref path) => ReplayConfig::load(path.clone(), &mut timer)?,
        None => ReplayConfig::default(),
    };

    timer.start("load track");
    let track = model::load_track(fs_err::File::open(&args.track)?)?;
    timer.stop("load track");

    let trips = match args.trips {
        Some(ref path) => Some(load_trips(path)?),
        None => None,
    };
    let fences = match args.geofences {
        Some(ref path) => load_geofences(path)?,
        None => Vec::new(),
    };

    let mut session = ReplaySession::new(RecordingCanvas::new(args.width, args.height), config);
    session
        .state_mut()
        .current_row
        .subscribe(|row| debug!("Current row is now {:?}", row));

    session.load_track(track, trips);
    info!(
        "{} samples, {} trips",
        prettyprint_usize(session.track().len()),
        prettyprint_usize(session.trips().len())
    );

    session.set_display_mode(args.mode);
    if !fences.is_empty() {
        session.set_geofences(GeofenceState {
            fences,
            show_geofences: true,
            show_shapes: args.geofence_shapes,
        });
    }
    if args.trip_markers {
        session.set_trip_markers_visible(true)?;
    }
    if let Some(n) = args.select {
        if n == 0 {
            bail!("Trips are numbered from 1");
        }
        session.select_trip(Some(n - 1))?;
    }
    if let Some(speed) = args.speed {
        session.set_speed(speed);
    }

    if args.ticks > 0 {
        session.play();
        let mut wrapped = 0;
        for _ in 0..args.ticks {
            if session.tick() == TickOutcome::Wrapped {
                wrapped += 1;
            }
        }
        session.pause();
        info!(
            "Played {} ticks ({} of real time), looping {} times. Progress is {:.1}%",
            prettyprint_usize(args.ticks),
            args.ticks as f64 * session.config().tick_interval(),
            wrapped,
            session.progress()
        );
    }

    let mut counts: Counter<OverlayKind> = Counter::new();
    for overlay in session.overlays() {
        counts.inc(overlay.kind);
    }
    for (kind, count) in counts.consume() {
        info!("{:?}: {}", kind, prettyprint_usize(count));
    }
    info!(
        "Current row: {:?}, canvas has {} objects after {} draws",
        session.state().current_row.get(),
        session.canvas().objects.len(),
        prettyprint_usize(session.canvas().total_draws)
    );

    if let Some(path) = args.savestate {
        let vp = session.viewport();
        abstio::write_json(
            path,
            &Savestate {
                center: vp.center,
                zoom: vp.zoom,
                progress: session.progress(),
            },
        );
    }

    session.teardown();
    Ok(())
}

fn load_trips(path: &str) -> Result<Vec<TripInput>> {
    let raw = fs_err::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&raw)?;
    TripInput::parse_list(&value)
}

fn load_geofences(path: &str) -> Result<Vec<Geofence>> {
    let raw = fs_err::read_to_string(path)?;
    if path.ends_with(".geojson") {
        return Geofence::load_geojson(&raw);
    }
    let value: serde_json::Value = serde_json::from_str(&raw)?;
    Geofence::from_json(&value)
}

fn parse_mode(x: &str) -> Result<DisplayMode> {
    match x {
        "line" => Ok(DisplayMode::Line),
        "marker" => Ok(DisplayMode::Marker),
        _ => bail!("Unknown mode {}; use line or marker", x),
    }
}

fn parse_speed(x: &str) -> Result<SpeedSetting> {
    match x {
        "1" => Ok(SpeedSetting::Normal),
        "2" => Ok(SpeedSetting::Fast),
        "4" => Ok(SpeedSetting::Faster),
        "8" => Ok(SpeedSetting::Fastest),
        "16" => Ok(SpeedSetting::Ludicrous),
        _ => bail!("Speed {} isn't one of 1, 2, 4, 8, 16", x),
    }
}
