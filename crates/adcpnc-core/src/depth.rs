use serde::Serialize;
use tracing::{info, warn};

use crate::config::ConversionConfig;
use crate::dataset::{Dataset, Variable};
use crate::error::{PipelineError, PipelineWarning, Result, Stage};
use crate::instrument::{CalibrationMatrix, Orientation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthSource {
    CorrectedPressure,
    Pressure,
    WaterDepthAndHeight,
    NominalDepth,
    WaterDepth,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepthSummary {
    pub nominal_instrument_depth: f64,
    pub water_depth: f64,
    pub initial_instrument_height: f64,
    pub source: DepthSource,
}

/// Derives the nominal instrument depth and water depth and makes sure the
/// instrument height is known. Results land in the dataset attributes and a
/// scalar `Depth` variable.
pub fn create_water_depth(
    mut ds: Dataset,
    config: &ConversionConfig,
) -> Result<(Dataset, DepthSummary, Vec<PipelineWarning>)> {
    let stage = Stage::Depth;
    let mut warnings = Vec::new();
    let height_or_default = |warnings: &mut Vec<PipelineWarning>| {
        config.initial_instrument_height.unwrap_or_else(|| {
            warnings.push(PipelineWarning::DefaultInstrumentHeight);
            0.0
        })
    };

    let pressure_source = [
        ("Pressure_ac", DepthSource::CorrectedPressure),
        ("Pressure", DepthSource::Pressure),
    ]
    .into_iter()
    .find(|(name, _)| ds.contains(name));

    let summary = if let Some((name, source)) = pressure_source {
        let nominal = ds.require(stage, name)?.nanmean().ok_or_else(|| {
            PipelineError::invalid_attribute(stage, name, "pressure record has no valid samples")
        })?;
        let height = height_or_default(&mut warnings);
        let note = match source {
            DepthSource::CorrectedPressure => {
                "water depth = MSL from pressure sensor, atmospherically corrected"
            }
            _ => "water depth = MSL from pressure sensor",
        };
        ds.attrs.insert("WATER_DEPTH_source", note);
        ds.attrs.insert("WATER_DEPTH_datum", "MSL");
        DepthSummary {
            nominal_instrument_depth: nominal,
            water_depth: nominal + height,
            initial_instrument_height: height,
            source,
        }
    } else {
        match (
            config.water_depth,
            config.initial_instrument_height,
            config.nominal_instrument_depth,
        ) {
            (Some(water_depth), Some(height), _) => DepthSummary {
                nominal_instrument_depth: water_depth - height,
                water_depth,
                initial_instrument_height: height,
                source: DepthSource::WaterDepthAndHeight,
            },
            (Some(water_depth), None, Some(nominal)) => DepthSummary {
                nominal_instrument_depth: nominal,
                water_depth,
                initial_instrument_height: water_depth - nominal,
                source: DepthSource::NominalDepth,
            },
            (None, _, Some(nominal)) => {
                let height = height_or_default(&mut warnings);
                DepthSummary {
                    nominal_instrument_depth: nominal,
                    water_depth: nominal + height,
                    initial_instrument_height: height,
                    source: DepthSource::NominalDepth,
                }
            }
            (Some(water_depth), None, None) => {
                let height = height_or_default(&mut warnings);
                DepthSummary {
                    nominal_instrument_depth: water_depth - height,
                    water_depth,
                    initial_instrument_height: height,
                    source: DepthSource::WaterDepth,
                }
            }
            (None, _, None) => return Err(PipelineError::missing_attribute(stage, "WATER_DEPTH")),
        }
    };

    ds.attrs.insert("nominal_instrument_depth", summary.nominal_instrument_depth);
    ds.attrs.insert("WATER_DEPTH", summary.water_depth);
    ds.attrs.insert("initial_instrument_height", summary.initial_instrument_height);
    ds.insert(stage, "Depth", Variable::scalar(summary.nominal_instrument_depth))?;

    for warning in &warnings {
        warn!(%warning, "depth resolution");
    }
    info!(
        nominal = summary.nominal_instrument_depth,
        water_depth = summary.water_depth,
        height = summary.initial_instrument_height,
        source = ?summary.source,
        "resolved water depth"
    );
    Ok((ds, summary, warnings))
}

/// Only an explicit `DOWN` declaration yields [`Orientation::Down`]. A
/// calibration matrix pointing the other way is reported, not obeyed.
pub fn resolve_orientation(
    declared: Option<Orientation>,
    calibration: &CalibrationMatrix,
) -> (Orientation, Option<PipelineWarning>) {
    let resolved = match declared {
        Some(Orientation::Down) => Orientation::Down,
        _ => Orientation::Up,
    };
    let suggested = if calibration.suggests_down() {
        Orientation::Down
    } else {
        Orientation::Up
    };
    let warning = (suggested != resolved).then(|| PipelineWarning::OrientationMismatch {
        declared: declared
            .map(|value| value.as_str().to_string())
            .unwrap_or_else(|| "undeclared".to_string()),
        matrix_suggests: suggested.as_str().to_string(),
    });
    (resolved, warning)
}

pub fn set_orientation(
    mut ds: Dataset,
    config: &ConversionConfig,
    calibration: &CalibrationMatrix,
) -> (Dataset, Orientation, Option<PipelineWarning>) {
    let (orientation, warning) = resolve_orientation(config.declared_orientation, calibration);
    if let Some(warning) = &warning {
        warn!(%warning, "orientation");
    }
    ds.attrs.insert("orientation", orientation.as_str());
    info!(%orientation, "resolved instrument orientation");
    (ds, orientation, warning)
}
