mod common;

use adcpnc_core::config::ConversionConfig;
use adcpnc_core::dataset::{Attributes, Dataset};
use adcpnc_core::depth::{create_water_depth, resolve_orientation, DepthSource};
use adcpnc_core::error::{PipelineError, PipelineWarning, Stage};
use adcpnc_core::instrument::{CalibrationMatrix, Orientation};
use common::{assert_close, raw_dataset, series};

fn config(entries: &[(&str, f64)]) -> ConversionConfig {
    let mut attrs = Attributes::new();
    attrs.insert("latitude", 41.5);
    attrs.insert("longitude", -70.6);
    for (key, value) in entries {
        attrs.insert(*key, *value);
    }
    ConversionConfig::from_attributes(&attrs).unwrap()
}

fn without_pressure() -> Dataset {
    let mut ds = raw_dataset(4, 2);
    ds.remove("Pressure");
    ds
}

#[test]
fn pressure_gives_nominal_depth() {
    let mut ds = raw_dataset(4, 2);
    ds.insert(Stage::Load, "Pressure", series(vec![9.0, f64::NAN, 11.0, 10.0]))
        .unwrap();
    let (ds, summary, warnings) =
        create_water_depth(ds, &config(&[("initial_instrument_height", 1.0)])).unwrap();

    assert!(warnings.is_empty());
    assert_eq!(summary.source, DepthSource::Pressure);
    assert_close(summary.nominal_instrument_depth, 10.0);
    assert_close(summary.water_depth, 11.0);
    assert_eq!(ds.attrs.get_f64("WATER_DEPTH"), Some(11.0));
    assert_eq!(
        ds.attrs.get_str("WATER_DEPTH_source"),
        Some("water depth = MSL from pressure sensor")
    );
    assert_eq!(ds.attrs.get_str("WATER_DEPTH_datum"), Some("MSL"));
    assert_eq!(ds.get("Depth").unwrap().scalar_value(), Some(10.0));
}

#[test]
fn corrected_pressure_wins_over_raw_pressure() {
    let mut ds = raw_dataset(4, 2);
    ds.insert(Stage::Load, "Pressure_ac", series(vec![9.0; 4])).unwrap();
    let (ds, summary, _) =
        create_water_depth(ds, &config(&[("initial_instrument_height", 0.5)])).unwrap();

    assert_eq!(summary.source, DepthSource::CorrectedPressure);
    assert_close(summary.water_depth, 9.5);
    assert_eq!(
        ds.attrs.get_str("WATER_DEPTH_source"),
        Some("water depth = MSL from pressure sensor, atmospherically corrected")
    );
}

#[test]
fn missing_height_defaults_to_zero_with_warning() {
    let (ds, summary, warnings) = create_water_depth(raw_dataset(3, 2), &config(&[])).unwrap();
    assert_eq!(warnings, vec![PipelineWarning::DefaultInstrumentHeight]);
    assert_eq!(summary.initial_instrument_height, 0.0);
    assert_eq!(ds.attrs.get_f64("initial_instrument_height"), Some(0.0));
}

#[test]
fn water_depth_and_height_give_nominal_depth() {
    let (_, summary, warnings) = create_water_depth(
        without_pressure(),
        &config(&[("WATER_DEPTH", 12.0), ("initial_instrument_height", 2.0)]),
    )
    .unwrap();
    assert!(warnings.is_empty());
    assert_eq!(summary.source, DepthSource::WaterDepthAndHeight);
    assert_close(summary.nominal_instrument_depth, 10.0);
}

#[test]
fn nominal_depth_and_water_depth_give_height() {
    let (_, summary, warnings) = create_water_depth(
        without_pressure(),
        &config(&[("WATER_DEPTH", 12.0), ("nominal_instrument_depth", 11.25)]),
    )
    .unwrap();
    assert!(warnings.is_empty());
    assert_eq!(summary.source, DepthSource::NominalDepth);
    assert_close(summary.initial_instrument_height, 0.75);
}

#[test]
fn water_depth_alone_assumes_a_bottom_instrument() {
    let (_, summary, warnings) =
        create_water_depth(without_pressure(), &config(&[("WATER_DEPTH", 7.0)])).unwrap();
    assert_eq!(warnings, vec![PipelineWarning::DefaultInstrumentHeight]);
    assert_eq!(summary.source, DepthSource::WaterDepth);
    assert_close(summary.nominal_instrument_depth, 7.0);
}

#[test]
fn no_depth_information_is_an_error() {
    let err = create_water_depth(without_pressure(), &config(&[])).unwrap_err();
    match err {
        PipelineError::MissingAttribute { stage, key } => {
            assert_eq!(stage, Stage::Depth);
            assert_eq!(key, "WATER_DEPTH");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

fn downward_matrix() -> CalibrationMatrix {
    CalibrationMatrix::from_row_major(&[
        1.5, -0.75, -0.75, 0.0, -1.3, 1.3, -0.35, -0.35, -0.35,
    ])
    .unwrap()
}

#[test]
fn only_an_explicit_down_declaration_gives_down() {
    let (orientation, warning) = resolve_orientation(Some(Orientation::Down), &downward_matrix());
    assert_eq!(orientation, Orientation::Down);
    assert!(warning.is_none());

    let (orientation, warning) = resolve_orientation(None, &CalibrationMatrix::identity());
    assert_eq!(orientation, Orientation::Up);
    assert!(warning.is_none());
}

#[test]
fn matrix_disagreement_is_reported() {
    let (orientation, warning) = resolve_orientation(None, &downward_matrix());
    assert_eq!(orientation, Orientation::Up);
    assert_eq!(
        warning,
        Some(PipelineWarning::OrientationMismatch {
            declared: "undeclared".to_string(),
            matrix_suggests: "DOWN".to_string(),
        })
    );

    let (orientation, warning) =
        resolve_orientation(Some(Orientation::Down), &CalibrationMatrix::identity());
    assert_eq!(orientation, Orientation::Down);
    assert!(warning.is_some());
}
