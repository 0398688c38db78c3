use std::collections::HashMap;

use once_cell::sync::Lazy;
use tracing::{debug, info, warn};

use crate::config::{OutputMode, TrimPolicy};
use crate::dataset::{AttrValue, Attributes, Dataset, Dim, Encoding, Variable};
use crate::error::{PipelineError, PipelineWarning, Result, Stage};
use crate::instrument::InstrumentInfo;
use crate::timing::{delta_t, start_stop, EpicTime};

pub const PROCESSOR_NAME: &str = "adcpnc";

const COMMON_RENAMES: &[(&str, &str)] = &[
    ("Pressure", "P_1"),
    ("Pressure_ac", "P_1ac"),
    ("Temperature", "Tx_1211"),
    ("Heading", "Hdg_1215"),
    ("Pitch", "Ptch_1216"),
    ("Roll", "Roll_1217"),
];

const PROFILE_RENAMES: &[(&str, &str)] = &[
    ("U", "u_1205"),
    ("V", "v_1206"),
    ("W", "w_1204"),
    ("AGC", "AGC_1202"),
];

const WAVES_RENAMES: &[(&str, &str)] = &[
    ("VEL1", "vel1_1277"),
    ("VEL2", "vel2_1278"),
    ("VEL3", "vel3_1279"),
    ("AMP1", "AGC1_1221"),
    ("AMP2", "AGC2_1222"),
    ("AMP3", "AGC3_1223"),
];

pub const DROPPED_VARIABLES: &[&str] = &[
    "VEL1",
    "VEL2",
    "VEL3",
    "AMP1",
    "AMP2",
    "AMP3",
    "Battery",
    "TransMatrix",
    "AnalogInput1",
    "AnalogInput2",
    "jd",
    "Depth",
];

/// Names never given minimum/maximum attributes besides the axes.
const TIME_VARIABLES: &[&str] = &["epic_time", "epic_time2", "time", "time2", "TIM"];

const PROFILE_DATA_VARIABLES: &[&str] = &["AGC_1202", "u_1205", "v_1206", "w_1204"];
const WAVES_DATA_VARIABLES: &[&str] = &[
    "vel1_1277",
    "vel2_1278",
    "vel3_1279",
    "AGC1_1221",
    "AGC2_1222",
    "AGC3_1223",
];
const COMMON_DATA_VARIABLES: &[&str] = &[
    "P_1",
    "P_1ac",
    "Tx_1211",
    "Hdg_1215",
    "Ptch_1216",
    "Roll_1217",
    "bin_depth",
    "bindist",
];
const VELOCITY_VARIABLES: &[&str] = &["u_1205", "v_1206", "w_1204"];

macro_rules! attributes {
    ($($key:expr => $value:expr),* $(,)?) => {{
        let mut attrs = Attributes::new();
        $(attrs.insert($key, $value);)*
        attrs
    }};
}

static VARIABLE_ATTRIBUTES: Lazy<HashMap<&'static str, Attributes>> = Lazy::new(|| {
    HashMap::from([
        ("time", attributes! { "standard_name" => "time", "axis" => "T" }),
        (
            "epic_time",
            attributes! { "units" => "True Julian Day", "type" => "EVEN", "epic_code" => 624 },
        ),
        (
            "epic_time2",
            attributes! { "units" => "msec since 0:00 GMT", "type" => "EVEN", "epic_code" => 624 },
        ),
        (
            "lat",
            attributes! { "units" => "degree_north", "long_name" => "Latitude", "epic_code" => 500 },
        ),
        (
            "lon",
            attributes! { "units" => "degree_east", "long_name" => "Longitude", "epic_code" => 502 },
        ),
        (
            "u_1205",
            attributes! {
                "name" => "u", "long_name" => "Eastward Velocity", "generic_name" => "u", "epic_code" => 1205,
            },
        ),
        (
            "v_1206",
            attributes! {
                "name" => "v", "long_name" => "Northward Velocity", "generic_name" => "v", "epic_code" => 1206,
            },
        ),
        (
            "w_1204",
            attributes! {
                "name" => "w", "long_name" => "Vertical Velocity", "generic_name" => "w", "epic_code" => 1204,
            },
        ),
        (
            "AGC_1202",
            attributes! {
                "units" => "counts", "name" => "AGC", "long_name" => "Average Echo Intensity",
                "generic_name" => "AGC", "epic_code" => 1202,
            },
        ),
        (
            "vel1_1277",
            attributes! {
                "units" => "mm/s", "long_name" => "Beam 1 Velocity", "generic_name" => "vel1", "epic_code" => 1277,
            },
        ),
        (
            "vel2_1278",
            attributes! {
                "units" => "mm/s", "long_name" => "Beam 2 Velocity", "generic_name" => "vel2", "epic_code" => 1278,
            },
        ),
        (
            "vel3_1279",
            attributes! {
                "units" => "mm/s", "long_name" => "Beam 3 Velocity", "generic_name" => "vel3", "epic_code" => 1279,
            },
        ),
        (
            "AGC1_1221",
            attributes! {
                "units" => "counts", "long_name" => "Echo Intensity (AGC) Beam 1",
                "generic_name" => "AGC1", "epic_code" => 1221,
            },
        ),
        (
            "AGC2_1222",
            attributes! {
                "units" => "counts", "long_name" => "Echo Intensity (AGC) Beam 2",
                "generic_name" => "AGC2", "epic_code" => 1222,
            },
        ),
        (
            "AGC3_1223",
            attributes! {
                "units" => "counts", "long_name" => "Echo Intensity (AGC) Beam 3",
                "generic_name" => "AGC3", "epic_code" => 1223,
            },
        ),
        (
            "P_1",
            attributes! {
                "units" => "dbar", "name" => "P", "long_name" => "Pressure", "generic_name" => "depth", "epic_code" => 1,
            },
        ),
        (
            "P_1ac",
            attributes! { "units" => "dbar", "name" => "Pac", "long_name" => "Corrected pressure" },
        ),
        ("bin_depth", attributes! { "units" => "m", "name" => "bin depth" }),
        (
            "Tx_1211",
            attributes! {
                "units" => "C", "name" => "Tx", "long_name" => "Instrument Transducer Temperature",
                "generic_name" => "temp", "epic_code" => 1211,
            },
        ),
        (
            "Hdg_1215",
            attributes! {
                "units" => "degrees", "name" => "Hdg", "long_name" => "Instrument Heading",
                "generic_name" => "hdg", "epic_code" => 1215,
            },
        ),
        (
            "Ptch_1216",
            attributes! {
                "units" => "degrees", "name" => "Ptch", "long_name" => "Instrument Pitch",
                "generic_name" => "ptch", "epic_code" => 1216,
            },
        ),
        (
            "Roll_1217",
            attributes! {
                "units" => "degrees", "name" => "Roll", "long_name" => "Instrument Roll",
                "generic_name" => "roll", "epic_code" => 1217,
            },
        ),
        (
            "bindist",
            attributes! {
                "units" => "m", "long_name" => "distance from transducer head",
                "note" => "distance is along profile from instrument head to center of bin",
            },
        ),
    ])
});

pub fn rename_table(mode: OutputMode) -> Vec<(&'static str, &'static str)> {
    let specific = match mode {
        OutputMode::Profile => PROFILE_RENAMES,
        OutputMode::Waves => WAVES_RENAMES,
    };
    COMMON_RENAMES.iter().chain(specific).copied().collect()
}

/// Standard attributes for an EPIC variable name, if it has any.
pub fn standard_attributes(name: &str) -> Option<&'static Attributes> {
    VARIABLE_ATTRIBUTES.get(name)
}

/// Applies the mode's rename table to every variable that is present.
pub fn rename_variables(mut ds: Dataset, mode: OutputMode) -> Result<Dataset> {
    for (from, to) in rename_table(mode) {
        if ds.contains(from) {
            ds.rename(Stage::Annotate, from, to)?;
            debug!(from, to, "renamed variable");
        }
    }
    Ok(ds)
}

pub fn drop_variables(mut ds: Dataset) -> Dataset {
    for name in DROPPED_VARIABLES {
        if ds.remove(name).is_some() {
            debug!(variable = name, "dropped variable");
        }
    }
    ds
}

/// Adds `epic_time` (true Julian day) and `epic_time2` (msec since 0:00 GMT)
/// over the time axis.
pub fn add_epic_time(mut ds: Dataset) -> Result<(Dataset, Option<PipelineWarning>)> {
    let stage = Stage::Annotate;
    let epic = EpicTime::from_seconds(&ds.time_seconds(stage)?);
    let non_integer = epic.non_integer_days();
    let warning = (non_integer > 0).then(|| PipelineWarning::NonIntegerTimeEncoding { count: non_integer });
    if let Some(warning) = &warning {
        warn!(%warning, "epic time");
    }
    ds.insert(
        stage,
        "epic_time",
        Variable::series(Dim::Time, epic.days).with_encoding(Encoding::int()),
    )?;
    ds.insert(
        stage,
        "epic_time2",
        Variable::series(Dim::Time, epic.msec).with_encoding(Encoding::int()),
    )?;
    Ok((ds, warning))
}

/// What the annotator needs to know about the run.
#[derive(Debug, Clone)]
pub struct AnnotationContext<'a> {
    pub instrument: &'a InstrumentInfo,
    pub mode: OutputMode,
    pub trim_policy: TrimPolicy,
    /// Velocities were actually trimmed under `trim_policy`.
    pub trimmed: bool,
    /// Declination applied to the velocities, in degrees.
    pub declination: Option<f64>,
}

fn required_attr(ds: &Dataset, key: &str) -> Result<AttrValue> {
    ds.attrs
        .get(key)
        .cloned()
        .ok_or_else(|| PipelineError::missing_attribute(Stage::Annotate, key))
}

/// Sets per-variable EPIC attributes, provenance and encodings.
pub fn add_variable_attributes(mut ds: Dataset, ctx: &AnnotationContext<'_>) -> Result<Dataset> {
    let height = required_attr(&ds, "initial_instrument_height")?;
    let nominal = required_attr(&ds, "nominal_instrument_depth")?;
    let corrected = ds.contains("P_1ac");
    let p_1ac_note = ds.attrs.get("P_1ac_note").cloned();

    let data_variables = match ctx.mode {
        OutputMode::Profile => PROFILE_DATA_VARIABLES,
        OutputMode::Waves => WAVES_DATA_VARIABLES,
    };

    for (name, var) in ds.variables_mut() {
        if let Some(standard) = standard_attributes(name) {
            for (key, value) in standard {
                var.attrs.merge(key.as_str(), value.clone());
            }
        }

        if data_variables.contains(&name) || COMMON_DATA_VARIABLES.contains(&name) {
            var.attrs.merge("serial_number", ctx.instrument.serial_number.as_str());
            var.attrs.merge("initial_instrument_height", height.clone());
            var.attrs.merge("nominal_instrument_depth", nominal.clone());
            var.attrs.merge("height_depth_units", "m");
            var.attrs.merge("sensor_type", ctx.instrument.inst_type.as_str());
            var.encoding = Encoding::data();
        }

        if ctx.mode == OutputMode::Profile && VELOCITY_VARIABLES.contains(&name) {
            var.attrs.merge("units", "cm/s");
            var.attrs.merge(
                "data_cmnt",
                "Velocity in shallowest bin is often suspect and should be used with caution",
            );
            if ctx.trimmed && ctx.trim_policy == TrimPolicy::WaterLevelSideLobe {
                var.attrs.merge(
                    "note",
                    "Velocity bins trimmed if out of water or if side lobes intersect sea surface",
                );
            }
        }

        match name {
            "Hdg_1215" => {
                if let Some(theta) = ctx.declination {
                    var.attrs.merge(
                        "note",
                        format!("Heading is degrees true. Converted from magnetic with magnetic variation of {theta}"),
                    );
                }
            }
            "bindist" => {
                var.attrs.merge("blanking_distance", ctx.instrument.blanking_distance);
            }
            "bin_depth" => {
                let source = if corrected { "corrected pressure(P_1ac)" } else { "pressure(P_1)" };
                var.attrs.merge(
                    "note",
                    format!("Actual depth time series of velocity bins. Calculated as {source} - bindist."),
                );
            }
            "P_1ac" => {
                if let Some(note) = &p_1ac_note {
                    var.attrs.merge("note", note.clone());
                }
            }
            "depth" => {
                var.attrs.merge("units", "m");
                var.attrs.merge("long_name", "mean water depth");
                var.attrs.merge("initial_instrument_height", height.clone());
                var.attrs.merge("nominal_instrument_depth", nominal.clone());
                var.attrs.merge("epic_code", 3);
            }
            _ => {}
        }
    }
    Ok(ds)
}

/// `minimum` and `maximum` for every variable except axes and time variables.
pub fn add_min_max(mut ds: Dataset) -> Dataset {
    let axes: Vec<String> = ds.dims().keys().map(|dim| dim.name().to_string()).collect();
    for (name, var) in ds.variables_mut() {
        if axes.iter().any(|axis| axis == name) || TIME_VARIABLES.contains(&name) {
            continue;
        }
        let (minimum, maximum) = var.min_max().unwrap_or((f64::NAN, f64::NAN));
        var.attrs.merge("minimum", minimum);
        var.attrs.merge("maximum", maximum);
    }
    ds
}

pub fn add_delta_t(mut ds: Dataset) -> Result<(Dataset, Option<PipelineWarning>)> {
    let (seconds, warning) = delta_t(&ds.time_seconds(Stage::Annotate)?);
    if let Some(warning) = &warning {
        warn!(%warning, "delta t");
    }
    if let Some(seconds) = seconds {
        ds.attrs.merge("DELTA_T", seconds);
    }
    Ok((ds, warning))
}

pub fn add_start_stop_time(mut ds: Dataset) -> Result<Dataset> {
    let (start, stop) = start_stop(&ds, Stage::Annotate)?;
    ds.attrs.merge("start_time", start);
    ds.attrs.merge("stop_time", stop);
    Ok(ds)
}

pub fn add_epic_history(mut ds: Dataset) -> Dataset {
    ds.attrs
        .prepend_history(&format!("Processed to EPIC using {PROCESSOR_NAME}. "));
    ds
}

/// Renames, drops and annotates the dataset for EPIC archival.
pub fn annotate(ds: Dataset, ctx: &AnnotationContext<'_>) -> Result<(Dataset, Vec<PipelineWarning>)> {
    let mut warnings = Vec::new();

    let ds = rename_variables(ds, ctx.mode)?;
    let ds = drop_variables(ds);
    let (ds, warning) = add_epic_time(ds)?;
    warnings.extend(warning);

    let mut ds = add_variable_attributes(ds, ctx)?;
    ds.attrs.merge("COMPOSITE", 0);
    ds.attrs.merge("serial_number", ctx.instrument.serial_number.as_str());
    ds.attrs.merge("INST_TYPE", ctx.instrument.inst_type.as_str());
    if ds.contains("P_1ac") {
        ds.attrs.prepend_history("Atmospheric pressure compensated. ");
    }

    let ds = add_min_max(ds);
    let (ds, warning) = add_delta_t(ds)?;
    warnings.extend(warning);
    let ds = add_start_stop_time(ds)?;
    let ds = add_epic_history(ds);

    info!(variables = ds.names().count(), "annotated dataset for EPIC");
    Ok((ds, warnings))
}
