use ndarray::Array2;
use tracing::{debug, info};

use crate::config::OutputMode;
use crate::dataset::{Dataset, Dim, Variable};
use crate::error::{Result, Stage};
use crate::instrument::Orientation;
use crate::trim::pressure_reference;

const PROFILE_RECORD_VARIABLES: &[&str] = &[
    "U",
    "V",
    "W",
    "AGC",
    "Pressure",
    "Pressure_ac",
    "Temperature",
    "Heading",
    "Pitch",
    "Roll",
];

const WAVES_RECORD_VARIABLES: &[&str] = &[
    "VEL1",
    "VEL2",
    "VEL3",
    "AMP1",
    "AMP2",
    "AMP3",
    "Pressure",
    "Pressure_ac",
    "Temperature",
    "Heading",
    "Pitch",
    "Roll",
];

pub fn record_variables(mode: OutputMode) -> &'static [&'static str] {
    match mode {
        OutputMode::Profile => PROFILE_RECORD_VARIABLES,
        OutputMode::Waves => WAVES_RECORD_VARIABLES,
    }
}

/// Actual depth of every bin over time: pressure minus distance from the head.
pub fn make_bin_depth(mut ds: Dataset, nominal_depth: f64) -> Result<Dataset> {
    let stage = Stage::Reshape;
    let (reference, _) = pressure_reference(&ds, stage, nominal_depth)?;
    let bindist = ds.require(stage, "bindist")?.values_1d()?.to_vec();
    let bin_depth = Array2::from_shape_fn((reference.values.len(), bindist.len()), |(time, bin)| {
        reference.values[time] - bindist[bin]
    });
    ds.insert(stage, "bin_depth", Variable::grid([Dim::Time, Dim::BinDist], bin_depth))?;
    Ok(ds)
}

/// Adds singleton `lon` and `lat` axes to the per-record variables of the
/// mode and orders their axes as (time, lon, lat, remaining).
pub fn normalize_dims(mut ds: Dataset, mode: OutputMode, latitude: f64, longitude: f64) -> Result<Dataset> {
    let stage = Stage::Reshape;
    if !ds.contains("lat") {
        ds.insert(stage, "lat", Variable::series(Dim::Lat, vec![latitude]))?;
    }
    if !ds.contains("lon") {
        ds.insert(stage, "lon", Variable::series(Dim::Lon, vec![longitude]))?;
    }

    for name in record_variables(mode) {
        if !ds.contains(name) {
            continue;
        }
        let var = ds.take(stage, name)?;
        let reshaped = add_position_axes(var)?;
        debug!(variable = name, shape = ?reshaped.shape(), "reshaped");
        ds.insert(stage, *name, reshaped)?;
    }
    Ok(ds)
}

fn add_position_axes(var: Variable) -> Result<Variable> {
    let mut var = var;
    if !var.has_dim(&Dim::Lon) {
        let end = var.dims().len();
        var = var.expand_dims(Dim::Lon, end);
    }
    if !var.has_dim(&Dim::Lat) {
        let end = var.dims().len();
        var = var.expand_dims(Dim::Lat, end);
    }
    let leading = [Dim::Time, Dim::Lon, Dim::Lat];
    let mut order: Vec<Dim> = leading
        .iter()
        .filter(|dim| var.has_dim(dim))
        .cloned()
        .collect();
    order.extend(var.dims().iter().filter(|dim| !leading.contains(dim)).cloned());
    var.transpose(&order)
}

/// Depth below the surface of each bin center.
pub fn depth_coordinate(
    bindist: &[f64],
    orientation: Orientation,
    water_depth: f64,
    nominal_depth: f64,
) -> Vec<f64> {
    match orientation {
        Orientation::Up => bindist.iter().map(|d| water_depth - d).collect(),
        Orientation::Down => bindist.iter().map(|d| nominal_depth + d).collect(),
    }
}

/// Makes `depth` the vertical axis in place of `bindist`.
pub fn swap_vertical_axis(
    mut ds: Dataset,
    orientation: Orientation,
    water_depth: f64,
    nominal_depth: f64,
) -> Result<Dataset> {
    let stage = Stage::Reshape;
    let bindist = ds.require(stage, "bindist")?.values_1d()?.to_vec();
    let depth = depth_coordinate(&bindist, orientation, water_depth, nominal_depth);
    ds.swap_vertical(stage, depth)?;
    info!(%orientation, bins = bindist.len(), "swapped vertical axis from bindist to depth");
    Ok(ds)
}
