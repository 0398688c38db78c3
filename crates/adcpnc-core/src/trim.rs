use tracing::{info, warn};

use crate::config::TrimPolicy;
use crate::dataset::{Dataset, Dim};
use crate::error::{PipelineError, PipelineWarning, Result, Stage};
use crate::instrument::Orientation;

const TRIMMED_VARIABLES: [&str; 4] = ["U", "V", "W", "AGC"];

/// Water level series used as the trimming reference.
#[derive(Debug, Clone, PartialEq)]
pub struct PressureReference {
    pub values: Vec<f64>,
    pub corrected: bool,
}

/// `Pressure_ac`, else `Pressure`, else the nominal depth repeated over time.
/// The last case comes with a warning.
pub fn pressure_reference(
    ds: &Dataset,
    stage: Stage,
    nominal_depth: f64,
) -> Result<(PressureReference, Option<PipelineWarning>)> {
    for (name, corrected) in [("Pressure_ac", true), ("Pressure", false)] {
        if let Some(var) = ds.get(name) {
            let values = var.values_1d()?.to_vec();
            return Ok((PressureReference { values, corrected }, None));
        }
    }
    let len = ds
        .dim_len(&Dim::Time)
        .ok_or_else(|| PipelineError::missing_variable(stage, "time"))?;
    Ok((
        PressureReference {
            values: vec![nominal_depth; len],
            corrected: false,
        },
        Some(PipelineWarning::TrimWithoutPressure),
    ))
}

/// Whether `trim_velocities` masks anything for this policy and mounting.
pub fn trims(policy: TrimPolicy, orientation: Orientation) -> bool {
    policy != TrimPolicy::None && orientation == Orientation::Up
}

/// Masks velocity bins that lie beyond the surface, or whose side lobes reach
/// it. Masked samples become NaN; shapes are unchanged.
pub fn trim_velocities(
    mut ds: Dataset,
    policy: TrimPolicy,
    beam_angle_deg: f64,
    orientation: Orientation,
    nominal_depth: f64,
) -> Result<(Dataset, Vec<PipelineWarning>)> {
    let stage = Stage::Trim;
    let mut warnings = Vec::new();

    if policy == TrimPolicy::None {
        info!("did not trim velocity data");
        return Ok((ds, warnings));
    }
    if orientation == Orientation::Down {
        let warning = PipelineWarning::TrimSkippedDownward;
        warn!(%warning, "trim");
        warnings.push(warning);
        return Ok((ds, warnings));
    }

    let (reference, warning) = pressure_reference(&ds, stage, nominal_depth)?;
    if let Some(warning) = warning {
        warn!(%warning, "trim");
        warnings.push(warning);
    }
    let bindist = ds.require(stage, "bindist")?.values_1d()?.to_vec();
    let scale = match policy {
        TrimPolicy::WaterLevelSideLobe => beam_angle_deg.to_radians().cos(),
        _ => 1.0,
    };
    let limits: Vec<f64> = reference.values.iter().map(|p| p * scale).collect();

    let mut masked = 0usize;
    for name in TRIMMED_VARIABLES {
        let Some(var) = ds.get_mut(name) else {
            if name == "AGC" {
                continue;
            }
            return Err(PipelineError::missing_variable(stage, name));
        };
        let (Some(time_axis), Some(bin_axis)) = (var.axis_of(&Dim::Time), var.axis_of(&Dim::BinDist)) else {
            return Err(PipelineError::invalid_attribute(
                stage,
                name,
                "expected time and bindist axes",
            ));
        };
        if var.shape()[time_axis] != limits.len() || var.shape()[bin_axis] != bindist.len() {
            return Err(PipelineError::ShapeMismatch {
                stage,
                variable: name.to_string(),
                dim: Dim::BinDist.name().to_string(),
                expected: bindist.len(),
                found: var.shape()[bin_axis],
            });
        }
        for (index, value) in var.data_mut().indexed_iter_mut() {
            let keep = bindist[index[bin_axis]] < limits[index[time_axis]];
            if !keep && !value.is_nan() {
                *value = f64::NAN;
                masked += 1;
            }
        }
    }

    let pressure_text = if reference.corrected {
        "atmospherically corrected"
    } else {
        "[NOT atmospherically corrected]"
    };
    let extent = match policy {
        TrimPolicy::WaterLevelSideLobe => "water level and sidelobes",
        _ => "water level",
    };
    ds.attrs.prepend_history(&format!(
        "Trimmed velocity data using {pressure_text} pressure ({extent}). "
    ));
    info!(%policy, masked, "trimmed velocity data");
    Ok((ds, warnings))
}
