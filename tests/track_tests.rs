#![allow(missing_docs)]
#![allow(clippy::float_cmp)]

use std::fs;

use evodrive::error::Error;
use evodrive::simulation::agent::Agent;
use evodrive::simulation::geometric_utils::{Pose, heading_vector, normalize_heading};
use evodrive::simulation::params::KinematicParams;
use evodrive::simulation::track::{Checkpoint, Track, TrackFile};

fn gate() -> Vec<Checkpoint> {
    vec![Checkpoint::new(2.0, 1.0, 2.0, 3.0)]
}

#[test]
fn test_from_ascii() {
    let rows = ["#####", "#. .#", "#####"];
    let track = Track::from_ascii(&rows, gate(), Pose::new(1.5, 1.5, 0.0)).unwrap();

    assert_eq!(track.width(), 5);
    assert_eq!(track.height(), 3);
    assert_eq!(track.is_drivable(0, 0), Some(false));
    assert_eq!(track.is_drivable(1, 1), Some(true));
    assert_eq!(track.is_drivable(2, 1), Some(true));
    assert_eq!(track.is_drivable(4, 1), Some(false));
    assert_eq!(track.is_drivable(5, 1), None);
    assert_eq!(track.is_drivable(-1, 1), None);

    assert_eq!(track.is_drivable_at(1.9, 1.2), Some(true));
    assert_eq!(track.is_drivable_at(0.9, 1.2), Some(false));
    assert_eq!(track.is_drivable_at(-0.1, 1.0), None);
    assert_eq!(track.is_drivable_at(f32::NAN, 1.0), None);
}

#[test]
fn test_invalid_tracks() {
    let start = Pose::new(1.0, 1.0, 0.0);

    let unknown = Track::from_ascii(&["#x#"], gate(), start);
    assert!(matches!(unknown, Err(Error::InvalidTrack(_))));

    let ragged = Track::from_ascii(&["###", "#."], gate(), start);
    assert!(matches!(ragged, Err(Error::InvalidTrack(_))));

    let empty: [&str; 0] = [];
    assert!(matches!(
        Track::from_ascii(&empty, gate(), start),
        Err(Error::InvalidTrack(_))
    ));

    let no_gates = Track::from_ascii(&["..."], Vec::new(), start);
    assert!(matches!(no_gates, Err(Error::InvalidTrack(_))));
}

#[test]
fn test_start_heading_is_normalized() {
    let track = Track::from_ascii(&["..."], gate(), Pose::new(1.0, 0.5, -90.0)).unwrap();
    assert_eq!(track.start().heading, 270.0);
}

#[test]
fn test_oval_track() {
    let track = Track::oval(200, 150, 30.0, 6).unwrap();
    let params = KinematicParams::default();

    assert_eq!(track.width(), 200);
    assert_eq!(track.height(), 150);
    assert_eq!(track.checkpoints().len(), 6);

    // Ring centre is open, the ring itself drivable.
    assert_eq!(track.is_drivable_at(100.0, 75.0), Some(false));
    let start = track.start();
    assert_eq!(track.is_drivable_at(start.x, start.y), Some(true));
    assert!(!Agent::new(start).collides(&track, &params));

    for checkpoint in track.checkpoints() {
        let mid_x = (checkpoint.start[0] + checkpoint.end[0]) / 2.0;
        let mid_y = (checkpoint.start[1] + checkpoint.end[1]) / 2.0;
        assert_eq!(track.is_drivable_at(mid_x, mid_y), Some(true));
    }

    // The last gate sits on the start line.
    let last = track.checkpoints()[5];
    assert!(last.distance_to(start.x, start.y) < 1.0);
}

#[test]
fn test_oval_rejects_impossible_sizes() {
    assert!(matches!(
        Track::oval(40, 40, 30.0, 4),
        Err(Error::InvalidTrack(_))
    ));
    assert!(matches!(
        Track::oval(200, 150, 30.0, 0),
        Err(Error::InvalidTrack(_))
    ));
}

#[test]
fn test_checkpoint_distance() {
    let checkpoint = Checkpoint::new(0.0, 0.0, 0.0, 10.0);

    assert!((checkpoint.distance_to(3.0, 5.0) - 3.0).abs() < 1e-5);
    assert!((checkpoint.distance_to(0.0, 14.0) - 4.0).abs() < 1e-5);
    assert_eq!(checkpoint.distance_to(0.0, 2.0), 0.0);
}

#[test]
fn test_load_track_file() {
    let track_file = TrackFile {
        rows: vec!["#####".into(), "#...#".into(), "#####".into()],
        checkpoints: gate(),
        start: Pose::new(1.5, 1.5, 0.0),
    };
    let path = std::env::temp_dir()
        .join(format!("evodrive-{}-track.json", std::process::id()))
        .to_string_lossy()
        .into_owned();

    fs::write(&path, serde_json::to_string(&track_file).unwrap()).unwrap();
    let track = Track::load_from_file(&path).unwrap();
    fs::remove_file(&path).ok();

    assert_eq!(track.width(), 5);
    assert_eq!(track.checkpoints(), track_file.checkpoints.as_slice());
    assert_eq!(track.start(), track_file.start);
}

#[test]
fn test_normalize_heading() {
    assert_eq!(normalize_heading(0.0), 0.0);
    assert_eq!(normalize_heading(360.0), 0.0);
    assert_eq!(normalize_heading(-10.0), 350.0);
    assert_eq!(normalize_heading(725.0), 5.0);
    assert!(normalize_heading(-1e-6) < 360.0);
}

#[test]
fn test_heading_vector() {
    let (x, y) = heading_vector(0.0);
    assert!((x - 1.0).abs() < 1e-6 && y.abs() < 1e-6);

    let (x, y) = heading_vector(90.0);
    assert!(x.abs() < 1e-6 && (y - 1.0).abs() < 1e-6);

    let (x, y) = heading_vector(180.0);
    assert!((x + 1.0).abs() < 1e-6 && y.abs() < 1e-6);
}
