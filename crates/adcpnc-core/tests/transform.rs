mod common;

use adcpnc_core::config::Declination;
use adcpnc_core::dataset::Dataset;
use adcpnc_core::error::{PipelineWarning, Stage};
use adcpnc_core::instrument::{CalibrationMatrix, CoordinateSystem, Orientation};
use adcpnc_core::transform::{
    add_agc, coord_transform, correct_declination, rotate_horizontal, rotation_matrix,
    transform_velocities, Attitude,
};
use common::{assert_close, raw_dataset, series};
use nalgebra::Matrix3;
use ndarray::{array, Array1, Array2};
use proptest::prelude::*;

fn values(ds: &Dataset, name: &str) -> Array2<f64> {
    ds.get(name).unwrap().values_2d().unwrap().to_owned()
}

#[test]
fn identity_calibration_with_level_attitude_passes_beams_through() {
    let ds = raw_dataset(6, 4);
    let ds = transform_velocities(
        ds,
        CoordinateSystem::Beam,
        &CalibrationMatrix::identity(),
        Orientation::Up,
    )
    .unwrap();

    assert_eq!(values(&ds, "U"), values(&ds, "VEL1"));
    assert_eq!(values(&ds, "V"), values(&ds, "VEL2"));
    assert_eq!(values(&ds, "W"), values(&ds, "VEL3"));
}

#[test]
fn downward_mounting_flips_the_vertical_component() {
    let calibration = CalibrationMatrix::from_row_major(&[
        1.5, -0.75, -0.75, 0.0, -1.3, 1.3, 0.35, 0.35, 0.35,
    ])
    .unwrap();
    let up = transform_velocities(
        raw_dataset(3, 2),
        CoordinateSystem::Beam,
        &calibration,
        Orientation::Up,
    )
    .unwrap();
    let down = transform_velocities(
        raw_dataset(3, 2),
        CoordinateSystem::Beam,
        &calibration,
        Orientation::Down,
    )
    .unwrap();

    let w_up = values(&up, "W");
    let w_down = values(&down, "W");
    for (a, b) in w_up.iter().zip(w_down.iter()) {
        assert_close(*b, -*a);
    }
    assert_eq!(values(&up, "U"), values(&down, "U"));
}

#[test]
fn each_time_index_uses_its_own_heading() {
    let vel1 = Array2::from_elem((2, 3), 1.0);
    let vel2 = Array2::zeros((2, 3));
    let vel3 = Array2::zeros((2, 3));
    let heading = array![0.0, 90.0];
    let level = Array1::zeros(2);
    let attitude = Attitude {
        heading: heading.view(),
        pitch: level.view(),
        roll: level.view(),
    };

    let [u, v, w] = coord_transform(
        [vel1.view(), vel2.view(), vel3.view()],
        &attitude,
        &CalibrationMatrix::identity(),
        Orientation::Up,
        CoordinateSystem::Beam,
    )
    .unwrap();

    for bin in 0..3 {
        assert_close(u[(0, bin)], 1.0);
        assert_close(v[(0, bin)], 0.0);
        assert_close(u[(1, bin)], 0.0);
        assert_close(v[(1, bin)], -1.0);
        assert_close(w[(1, bin)], 0.0);
    }
}

#[test]
fn earth_coordinates_are_not_rotated() {
    let rotation = rotation_matrix(
        CoordinateSystem::Earth,
        &CalibrationMatrix::identity(),
        Orientation::Down,
        123.0,
        4.0,
        -7.0,
    );
    assert_eq!(rotation, Matrix3::identity());
}

#[test]
fn missing_attitude_propagates_as_missing_velocity() {
    let mut ds = raw_dataset(3, 2);
    ds.insert(Stage::Load, "Heading", series(vec![0.0, f64::NAN, 0.0]))
        .unwrap();
    let ds = transform_velocities(
        ds,
        CoordinateSystem::Beam,
        &CalibrationMatrix::identity(),
        Orientation::Up,
    )
    .unwrap();
    let u = values(&ds, "U");
    assert!(u[(1, 0)].is_nan());
    assert!(!u[(0, 0)].is_nan());
}

proptest! {
    #[test]
    fn declination_rotation_round_trips(
        u in -500.0f64..500.0,
        v in -500.0f64..500.0,
        theta in -180.0f64..180.0,
    ) {
        let (ru, rv) = rotate_horizontal(u, v, theta);
        let (bu, bv) = rotate_horizontal(ru, rv, -theta);
        prop_assert!((bu - u).abs() < 1e-9);
        prop_assert!((bv - v).abs() < 1e-9);
    }
}

#[test]
fn declination_rotates_velocities_and_heading() {
    let mut ds = raw_dataset(2, 2);
    ds.insert(Stage::Load, "Heading", series(vec![350.0, 10.0])).unwrap();
    let ds = transform_velocities(
        ds,
        CoordinateSystem::Beam,
        &CalibrationMatrix::identity(),
        Orientation::Up,
    )
    .unwrap();
    let before_u = values(&ds, "U");
    let before_v = values(&ds, "V");
    let before_w = values(&ds, "W");

    let (ds, warning) = correct_declination(ds, Some(Declination::AtSite(20.0))).unwrap();
    assert!(warning.is_none());

    let (expected_u, expected_v) = rotate_horizontal(before_u[(0, 1)], before_v[(0, 1)], 20.0);
    assert_close(values(&ds, "U")[(0, 1)], expected_u);
    assert_close(values(&ds, "V")[(0, 1)], expected_v);
    assert_eq!(values(&ds, "W"), before_w);

    let heading = ds.get("Heading").unwrap().values_1d().unwrap().to_vec();
    assert_close(heading[0], 10.0);
    assert_close(heading[1], 30.0);
    assert!(ds
        .attrs
        .get_str("history")
        .unwrap()
        .starts_with("Rotated velocity data to account for magnetic variation of 20. "));
}

#[test]
fn missing_declination_is_a_warning() {
    let ds = raw_dataset(2, 2);
    let (ds, warning) = correct_declination(ds, None).unwrap();
    assert_eq!(warning, Some(PipelineWarning::DeclinationMissing));
    assert_eq!(ds.attrs.get_str("history"), Some("raw conversion. "));
}

#[test]
fn agc_averages_the_three_beams() {
    let ds = add_agc(raw_dataset(2, 3)).unwrap();
    let agc = values(&ds, "AGC");
    assert!(agc.iter().all(|value| (*value - 110.0).abs() < 1e-12));
}

fn rotate(system: CoordinateSystem, orientation: Orientation, attitude: (f64, f64, f64), vel: [f64; 3]) -> [f64; 3] {
    let (heading, pitch, roll) = attitude;
    let rotation = rotation_matrix(
        system,
        &CalibrationMatrix::identity(),
        orientation,
        heading,
        pitch,
        roll,
    );
    let out = rotation * nalgebra::Vector3::new(vel[0], vel[1], vel[2]);
    [out.x, out.y, out.z]
}

fn assert_vector(actual: [f64; 3], expected: [f64; 3]) {
    for (a, e) in actual.iter().zip(expected) {
        assert_close(*a, e);
    }
}

#[test]
fn instrument_frame_applies_heading() {
    let east = rotate(CoordinateSystem::Instrument, Orientation::Up, (90.0, 0.0, 0.0), [1.0, 0.0, 0.0]);
    assert_vector(east, [0.0, -1.0, 0.0]);
    let north = rotate(CoordinateSystem::Instrument, Orientation::Up, (90.0, 0.0, 0.0), [0.0, 1.0, 2.0]);
    assert_vector(north, [1.0, 0.0, 2.0]);
}

#[test]
fn instrument_frame_applies_tilt() {
    let (s, c) = 30f64.to_radians().sin_cos();
    let tilted = rotate(CoordinateSystem::Instrument, Orientation::Up, (0.0, 30.0, 0.0), [1.0, 0.0, 0.0]);
    assert_vector(tilted, [c, 0.0, s]);
}

#[test]
fn downward_instrument_frame_mirrors_y_and_z() {
    let level = rotate(CoordinateSystem::Instrument, Orientation::Down, (0.0, 0.0, 0.0), [1.0, 2.0, 3.0]);
    assert_vector(level, [1.0, -2.0, -3.0]);
    let turned = rotate(CoordinateSystem::Instrument, Orientation::Down, (90.0, 0.0, 0.0), [1.0, 2.0, 3.0]);
    assert_vector(turned, [-2.0, -1.0, -3.0]);
}

#[test]
fn ship_frame_removes_tilt_but_not_heading() {
    let (s, c) = 30f64.to_radians().sin_cos();
    let tilted = rotate(CoordinateSystem::Ship, Orientation::Up, (90.0, 30.0, 0.0), [1.0, 0.0, 0.0]);
    assert_vector(tilted, [c, 0.0, s]);
    let level = rotate(CoordinateSystem::Ship, Orientation::Up, (135.0, 0.0, 0.0), [1.0, 2.0, 3.0]);
    assert_vector(level, [1.0, 2.0, 3.0]);
}

#[test]
fn downward_ship_frame_mirrors_y_and_z() {
    let level = rotate(CoordinateSystem::Ship, Orientation::Down, (45.0, 0.0, 0.0), [1.0, 2.0, 3.0]);
    assert_vector(level, [1.0, -2.0, -3.0]);
}
