#![allow(dead_code)]

use adcpnc_core::dataset::{Dataset, Dim, Variable};
use adcpnc_core::error::Stage;
use ndarray::Array2;

/// 2017-05-17 14:00:00 UTC
pub const START: f64 = 1_495_029_600.0;
pub const SPACING: f64 = 60.0;

pub const IDENTITY: [f64; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

pub fn series(values: Vec<f64>) -> Variable {
    Variable::series(Dim::Time, values)
}

pub fn grid(times: usize, bins: usize, f: impl Fn(usize, usize) -> f64) -> Variable {
    Variable::grid(
        [Dim::Time, Dim::BinDist],
        Array2::from_shape_fn((times, bins), |(t, b)| f(t, b)),
    )
}

pub fn bindist(bins: usize) -> Vec<f64> {
    (0..bins).map(|b| 1.0 + b as f64).collect()
}

/// A beam-coordinate profiler record with constant pressure, zero attitude
/// and an identity calibration matrix.
pub fn raw_dataset(times: usize, bins: usize) -> Dataset {
    let mut ds = Dataset::new();
    let stage = Stage::Load;
    ds.insert(
        stage,
        "time",
        series((0..times).map(|t| START + t as f64 * SPACING).collect()),
    )
    .unwrap();
    ds.insert(stage, "bindist", Variable::series(Dim::BinDist, bindist(bins)))
        .unwrap();
    ds.insert(stage, "VEL1", grid(times, bins, |t, b| 10.0 + t as f64 + 0.1 * b as f64))
        .unwrap();
    ds.insert(stage, "VEL2", grid(times, bins, |t, _| -5.0 + t as f64))
        .unwrap();
    ds.insert(stage, "VEL3", grid(times, bins, |_, b| 0.5 * b as f64))
        .unwrap();
    ds.insert(stage, "AMP1", grid(times, bins, |_, _| 100.0)).unwrap();
    ds.insert(stage, "AMP2", grid(times, bins, |_, _| 110.0)).unwrap();
    ds.insert(stage, "AMP3", grid(times, bins, |_, _| 120.0)).unwrap();
    ds.insert(stage, "Pressure", series(vec![10.0; times])).unwrap();
    ds.insert(stage, "Temperature", series(vec![18.5; times])).unwrap();
    ds.insert(stage, "Heading", series(vec![0.0; times])).unwrap();
    ds.insert(stage, "Pitch", series(vec![0.0; times])).unwrap();
    ds.insert(stage, "Roll", series(vec![0.0; times])).unwrap();
    ds.insert(stage, "Battery", series(vec![12.1; times])).unwrap();

    ds.attrs.insert("AQDSerial_Number", "AQD 12345");
    ds.attrs.insert("INST_TYPE", "Nortek Aquadopp Profiler");
    ds.attrs.insert("AQDCoordinateSystem", "BEAM");
    ds.attrs.insert("AQDBlankingDistance", 0.1);
    ds.attrs.insert("AQDTransMatrix", IDENTITY.to_vec());
    ds.attrs.insert("latitude", 29.7148);
    ds.attrs.insert("longitude", -81.2283);
    ds.attrs.insert("initial_instrument_height", 1.0);
    ds.attrs.insert("history", "raw conversion. ");
    ds
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, found {actual}"
    );
}
