mod common;

use adcpnc_core::dataset::{Dataset, Dim, Variable};
use adcpnc_core::error::{PipelineError, Stage};
use common::{grid, raw_dataset, series};

#[test]
fn insert_rejects_disagreeing_axis_length() {
    let mut ds = Dataset::new();
    ds.insert(Stage::Load, "time", series(vec![0.0, 1.0, 2.0])).unwrap();

    let err = ds
        .insert(Stage::Load, "Pressure", series(vec![1.0, 2.0]))
        .unwrap_err();
    match err {
        PipelineError::ShapeMismatch {
            variable,
            dim,
            expected,
            found,
            ..
        } => {
            assert_eq!(variable, "Pressure");
            assert_eq!(dim, "time");
            assert_eq!(expected, 3);
            assert_eq!(found, 2);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn replacing_a_variable_may_change_its_own_length() {
    let mut ds = Dataset::new();
    ds.insert(Stage::Load, "time", series(vec![0.0, 1.0, 2.0])).unwrap();
    ds.insert(Stage::Load, "time", series(vec![0.0, 1.0])).unwrap();
    assert_eq!(ds.dim_len(&Dim::Time), Some(2));
}

#[test]
fn coordinates_are_one_dimensional_over_their_own_axis() {
    let ds = raw_dataset(4, 3);
    assert!(ds.is_coordinate("time"));
    assert!(ds.is_coordinate("bindist"));
    assert!(!ds.is_coordinate("Pressure"));
    assert!(!ds.is_coordinate("VEL1"));
}

#[test]
fn swap_turns_bindist_into_an_ordinary_variable() {
    let mut ds = raw_dataset(4, 3);
    ds.swap_vertical(Stage::Reshape, vec![9.0, 8.0, 7.0]).unwrap();

    assert_eq!(ds.get("bindist").unwrap().dims(), &[Dim::Depth]);
    assert!(ds.is_coordinate("depth"));
    assert!(!ds.is_coordinate("bindist"));
    assert_eq!(ds.get("VEL1").unwrap().dims(), &[Dim::Time, Dim::Depth]);
    assert_eq!(ds.dim_len(&Dim::BinDist), None);

    let err = ds
        .swap_vertical(Stage::Reshape, vec![9.0, 8.0, 7.0])
        .unwrap_err();
    assert!(matches!(err, PipelineError::AlreadySwapped));
}

#[test]
fn swap_requires_one_depth_per_bin() {
    let mut ds = raw_dataset(4, 3);
    let err = ds.swap_vertical(Stage::Reshape, vec![1.0]).unwrap_err();
    assert!(matches!(err, PipelineError::ShapeMismatch { .. }));
}

#[test]
fn rename_refuses_to_overwrite() {
    let mut ds = raw_dataset(2, 2);
    let err = ds.rename(Stage::Annotate, "VEL1", "VEL2").unwrap_err();
    assert!(matches!(err, PipelineError::DuplicateVariable { .. }));

    ds.rename(Stage::Annotate, "VEL1", "vel1_1277").unwrap();
    assert!(ds.contains("vel1_1277"));
    assert!(!ds.contains("VEL1"));
}

#[test]
fn isel_time_keeps_requested_order_in_every_time_variable() {
    let ds = raw_dataset(5, 2);
    let ds = ds.isel_time(&[3, 4, 0]).unwrap();

    let time = ds.time_seconds(Stage::Clip).unwrap();
    assert_eq!(
        time,
        vec![
            common::START + 180.0,
            common::START + 240.0,
            common::START
        ]
    );
    let vel1 = ds.get("VEL1").unwrap().values_2d().unwrap();
    assert_eq!(vel1[(0, 0)], 13.0);
    assert_eq!(ds.get("bindist").unwrap().shape(), &[2]);
    assert!(matches!(
        ds.validate(Stage::Clip),
        Err(PipelineError::InvalidTimeRange(_))
    ));
}

#[test]
fn transpose_and_expand_reorder_axes() {
    let var = grid(2, 3, |t, b| (t * 10 + b) as f64);
    let var = var
        .expand_dims(Dim::Lon, 2)
        .expand_dims(Dim::Lat, 3)
        .transpose(&[Dim::Time, Dim::Lon, Dim::Lat, Dim::BinDist])
        .unwrap();

    assert_eq!(var.shape(), &[2, 1, 1, 3]);
    assert_eq!(var.data()[&[1, 0, 0, 2][..]], 12.0);
}

#[test]
fn statistics_ignore_missing_values() {
    let var = Variable::series(Dim::Time, vec![1.0, f64::NAN, 3.0]);
    assert_eq!(var.nanmean(), Some(2.0));
    assert_eq!(var.min_max(), Some((1.0, 3.0)));

    let empty = Variable::series(Dim::Time, vec![f64::NAN]);
    assert_eq!(empty.nanmean(), None);
    assert_eq!(empty.min_max(), None);
}
