use serde::Serialize;
use tracing::{debug, info, warn};

use crate::atmos::apply_atmospheric_correction;
use crate::clip::{clip, ClipOutcome};
use crate::config::{ConversionConfig, OutputMode, TrimPolicy};
use crate::dataset::Dataset;
use crate::depth::{create_water_depth, set_orientation, DepthSummary};
use crate::epic::{annotate, AnnotationContext};
use crate::error::{PipelineWarning, Result, Stage};
use crate::instrument::{CoordinateSystem, InstrumentInfo, Orientation};
use crate::reshape::{make_bin_depth, normalize_dims, swap_vertical_axis};
use crate::timing::shift_time;
use crate::transform::{add_agc, correct_declination, transform_velocities};
use crate::trim::{trim_velocities, trims};

/// Everything the caller needs to know about a finished run besides the data.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub mode: OutputMode,
    pub serial_number: String,
    pub coordinate_system: CoordinateSystem,
    pub clip: ClipOutcome,
    pub depth: DepthSummary,
    pub orientation: Orientation,
    pub trim_policy: TrimPolicy,
    pub warnings: Vec<PipelineWarning>,
}

#[derive(Debug, Clone)]
pub struct Conversion {
    pub dataset: Dataset,
    pub report: ConversionReport,
}

fn checkpoint(ds: Dataset, stage: Stage) -> Result<Dataset> {
    ds.validate(stage)?;
    debug!(%stage, variables = ds.names().count(), "stage complete");
    Ok(ds)
}

/// Runs the raw dataset through every stage in order. Any error aborts the
/// run; nothing partial is returned.
pub fn convert(raw: Dataset, atmospheric: Option<&Dataset>, config: &ConversionConfig) -> Result<Conversion> {
    let mut warnings: Vec<PipelineWarning> = Vec::new();

    let ds = checkpoint(raw, Stage::Load)?;
    let instrument = InstrumentInfo::from_dataset(&ds)?;
    info!(
        serial_number = %instrument.serial_number,
        coordinate_system = instrument.coordinate_system.as_str(),
        mode = ?config.mode,
        "starting conversion"
    );

    let ds = match atmospheric {
        Some(atmospheric) => checkpoint(apply_atmospheric_correction(ds, atmospheric)?, Stage::Atmospheric)?,
        None => ds,
    };

    let ds = match config.timeshift {
        Some(seconds) => {
            let (ds, warning) = shift_time(ds, seconds)?;
            if let Some(warning) = warning {
                warn!(%warning, "time shift");
                warnings.push(warning);
            }
            ds
        }
        None => ds,
    };

    let (ds, clip_outcome) = clip(ds, config.clip.as_ref())?;
    let ds = checkpoint(ds, Stage::Clip)?;

    let (ds, depth, depth_warnings) = create_water_depth(ds, config)?;
    warnings.extend(depth_warnings);
    let (ds, orientation, warning) = set_orientation(ds, config, &instrument.calibration);
    warnings.extend(warning);
    let mut ds = checkpoint(ds, Stage::Depth)?;

    let mut declination_applied = None;
    let mut velocities_trimmed = false;
    if config.mode == OutputMode::Profile {
        ds = transform_velocities(
            ds,
            instrument.coordinate_system,
            &instrument.calibration,
            orientation,
        )?;
        let (corrected, warning) = correct_declination(ds, config.declination)?;
        warnings.extend(warning);
        declination_applied = config.declination.map(|declination| declination.degrees());
        ds = checkpoint(add_agc(corrected)?, Stage::Transform)?;

        let beam_angle = instrument.side_lobe_angle(config.beam_angle);
        let (trimmed, trim_warnings) = trim_velocities(
            ds,
            config.trim_policy,
            beam_angle,
            orientation,
            depth.nominal_instrument_depth,
        )?;
        warnings.extend(trim_warnings);
        velocities_trimmed = trims(config.trim_policy, orientation);
        ds = checkpoint(trimmed, Stage::Trim)?;
    }

    if ds.contains("bindist") {
        ds = make_bin_depth(ds, depth.nominal_instrument_depth)?;
    }
    ds = normalize_dims(ds, config.mode, config.latitude, config.longitude)?;
    if ds.contains("bindist") {
        ds = swap_vertical_axis(
            ds,
            orientation,
            depth.water_depth,
            depth.nominal_instrument_depth,
        )?;
    }
    let ds = checkpoint(ds, Stage::Reshape)?;

    let ctx = AnnotationContext {
        instrument: &instrument,
        mode: config.mode,
        trim_policy: config.trim_policy,
        trimmed: velocities_trimmed,
        declination: declination_applied,
    };
    let (ds, annotate_warnings) = annotate(ds, &ctx)?;
    warnings.extend(annotate_warnings);
    let dataset = checkpoint(ds, Stage::Annotate)?;

    info!(warnings = warnings.len(), "conversion complete");
    Ok(Conversion {
        dataset,
        report: ConversionReport {
            mode: config.mode,
            serial_number: instrument.serial_number.clone(),
            coordinate_system: instrument.coordinate_system,
            clip: clip_outcome,
            depth,
            orientation,
            trim_policy: config.trim_policy,
            warnings,
        },
    })
}
