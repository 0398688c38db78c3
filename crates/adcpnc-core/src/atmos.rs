use std::collections::HashMap;

use ndarray::Axis;
use tracing::info;

use crate::dataset::{Dataset, Dim};
use crate::error::{PipelineError, Result, Stage};

/// Time stamps are matched to the millisecond.
fn time_key(seconds: f64) -> i64 {
    (seconds * 1000.0).round() as i64
}

/// Adds `Pressure_ac = Pressure - (atmpres - offset)`, pairing the two
/// records by time stamp. Samples with no atmospheric reading become missing.
pub fn apply_atmospheric_correction(mut ds: Dataset, atmospheric: &Dataset) -> Result<Dataset> {
    let stage = Stage::Atmospheric;
    let atmpres = atmospheric.require(stage, "atmpres")?;
    let offset = atmpres
        .attrs
        .get_f64("offset")
        .ok_or_else(|| PipelineError::missing_attribute(stage, "offset"))?;

    let atm_times = atmospheric.time_seconds(stage)?;
    let atm_values = atmpres.values_1d()?;
    if atm_values.len() != atm_times.len() {
        return Err(PipelineError::ShapeMismatch {
            stage,
            variable: "atmpres".to_string(),
            dim: Dim::Time.name().to_string(),
            expected: atm_times.len(),
            found: atm_values.len(),
        });
    }
    let by_time: HashMap<i64, f64> = atm_times
        .iter()
        .zip(atm_values.iter())
        .map(|(time, value)| (time_key(*time), value - offset))
        .collect();

    let corrections: Vec<f64> = ds
        .time_seconds(stage)?
        .into_iter()
        .map(|time| by_time.get(&time_key(time)).copied().unwrap_or(f64::NAN))
        .collect();
    let matched = corrections.iter().filter(|value| !value.is_nan()).count();

    let pressure = ds.require(stage, "Pressure")?;
    let time_axis = pressure
        .axis_of(&Dim::Time)
        .ok_or_else(|| PipelineError::invalid_attribute(stage, "Pressure", "has no time axis"))?;
    let mut corrected = pressure.clone();
    corrected.attrs = Default::default();
    for (mut lane, correction) in corrected
        .data_mut()
        .axis_iter_mut(Axis(time_axis))
        .zip(corrections.iter())
    {
        lane.mapv_inplace(|value| value - correction);
    }

    info!(
        offset,
        matched,
        samples = corrections.len(),
        "applied atmospheric pressure correction"
    );
    ds.insert(stage, "Pressure_ac", corrected)?;
    Ok(ds)
}
