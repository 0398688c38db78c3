use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::dataset::{AttrValue, Attributes};
use crate::error::{PipelineError, Result, Stage};
use crate::instrument::Orientation;

pub const DEFAULT_BEAM_ANGLE: f64 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Number,
    Numbers,
    Text,
    Timestamp,
    Flag,
}

/// One metadata key the pipeline understands.
#[derive(Debug, Clone, Copy)]
pub struct KeySpec {
    pub key: &'static str,
    pub kind: KeyKind,
    pub stage: Stage,
    pub default: Option<&'static str>,
}

const fn key(key: &'static str, kind: KeyKind, stage: Stage, default: Option<&'static str>) -> KeySpec {
    KeySpec {
        key,
        kind,
        stage,
        default,
    }
}

pub static KEY_TABLE: &[KeySpec] = &[
    key("good_ens", KeyKind::Numbers, Stage::Clip, None),
    key("Deployment_date", KeyKind::Timestamp, Stage::Clip, None),
    key("Recovery_date", KeyKind::Timestamp, Stage::Clip, None),
    key("timeshift", KeyKind::Number, Stage::Clip, None),
    key("initial_instrument_height", KeyKind::Number, Stage::Depth, Some("0")),
    key("nominal_instrument_depth", KeyKind::Number, Stage::Depth, None),
    key("WATER_DEPTH", KeyKind::Number, Stage::Depth, None),
    key("orientation", KeyKind::Text, Stage::Depth, None),
    key("magnetic_variation_at_site", KeyKind::Number, Stage::Transform, None),
    key("magnetic_variation", KeyKind::Number, Stage::Transform, None),
    key("trim_method", KeyKind::Text, Stage::Trim, Some("none")),
    key("beam_angle", KeyKind::Number, Stage::Trim, Some("25")),
    key("latitude", KeyKind::Number, Stage::Reshape, None),
    key("longitude", KeyKind::Number, Stage::Reshape, None),
    key("waves", KeyKind::Flag, Stage::Load, Some("0")),
    key("filename", KeyKind::Text, Stage::Output, None),
];

pub fn key_spec(name: &str) -> Option<&'static KeySpec> {
    KEY_TABLE.iter().find(|spec| spec.key == name)
}

/// How the deployment window is expressed.
#[derive(Debug, Clone, PartialEq)]
pub enum ClipWindow {
    /// Half-open `[start, end)` sample index ranges, concatenated in order.
    Ensembles(Vec<(usize, usize)>),
    /// Closed timestamp interval.
    Dates {
        deployment: DateTime<Utc>,
        recovery: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "source", content = "degrees", rename_all = "snake_case")]
pub enum Declination {
    AtSite(f64),
    Regional(f64),
}

impl Declination {
    pub fn degrees(&self) -> f64 {
        match self {
            Declination::AtSite(value) | Declination::Regional(value) => *value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrimPolicy {
    WaterLevel,
    WaterLevelSideLobe,
    None,
}

impl TrimPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "water level" => Some(TrimPolicy::WaterLevel),
            "water level sl" | "water level side lobe" => Some(TrimPolicy::WaterLevelSideLobe),
            "none" => Some(TrimPolicy::None),
            _ => None,
        }
    }
}

impl fmt::Display for TrimPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TrimPolicy::WaterLevel => "water level",
            TrimPolicy::WaterLevelSideLobe => "water level sl",
            TrimPolicy::None => "none",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    Profile,
    Waves,
}

/// Typed view of the deployment metadata, validated once before the pipeline
/// runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionConfig {
    pub clip: Option<ClipWindow>,
    pub timeshift: Option<f64>,
    pub initial_instrument_height: Option<f64>,
    pub nominal_instrument_depth: Option<f64>,
    pub water_depth: Option<f64>,
    pub declared_orientation: Option<Orientation>,
    pub declination: Option<Declination>,
    pub trim_policy: TrimPolicy,
    /// Side-lobe angle from metadata; the instrument's own value wins.
    pub beam_angle: Option<f64>,
    pub latitude: f64,
    pub longitude: f64,
    pub mode: OutputMode,
    pub filename: Option<String>,
}

impl ConversionConfig {
    pub fn from_attributes(attrs: &Attributes) -> Result<Self> {
        for spec in KEY_TABLE {
            if let Some(value) = attrs.get(spec.key) {
                check_kind(spec, value)?;
            }
        }

        let clip = clip_window(attrs)?;

        let declared_orientation = match attrs.get_str("orientation") {
            Some(raw) => Some(Orientation::parse(raw).ok_or_else(|| {
                PipelineError::invalid_attribute(Stage::Depth, "orientation", format!("expected UP or DOWN, found '{raw}'"))
            })?),
            None => None,
        };

        let declination = attrs
            .get_f64("magnetic_variation_at_site")
            .map(Declination::AtSite)
            .or_else(|| attrs.get_f64("magnetic_variation").map(Declination::Regional));

        let trim_policy = match attrs.get("trim_method") {
            Some(value) => {
                let raw = value.to_string();
                TrimPolicy::parse(&raw).ok_or_else(|| {
                    PipelineError::invalid_attribute(Stage::Trim, "trim_method", format!("unknown trim method '{raw}'"))
                })?
            }
            None => TrimPolicy::None,
        };

        let beam_angle = attrs.get_f64("beam_angle");
        if let Some(angle) = beam_angle {
            check_beam_angle("beam_angle", angle)?;
        }

        let latitude = attrs
            .get_f64("latitude")
            .ok_or_else(|| PipelineError::missing_attribute(Stage::Reshape, "latitude"))?;
        let longitude = attrs
            .get_f64("longitude")
            .ok_or_else(|| PipelineError::missing_attribute(Stage::Reshape, "longitude"))?;

        let mode = match attrs.get("waves") {
            Some(value) if flag_value(value) == Some(true) => OutputMode::Waves,
            _ => OutputMode::Profile,
        };

        let config = Self {
            clip,
            timeshift: attrs.get_f64("timeshift"),
            initial_instrument_height: attrs.get_f64("initial_instrument_height"),
            nominal_instrument_depth: attrs.get_f64("nominal_instrument_depth"),
            water_depth: attrs.get_f64("WATER_DEPTH"),
            declared_orientation,
            declination,
            trim_policy,
            beam_angle,
            latitude,
            longitude,
            mode,
            filename: attrs.get("filename").map(|value| value.to_string()),
        };
        debug!(?config.mode, ?config.trim_policy, "validated conversion configuration");
        Ok(config)
    }

    pub fn with_mode(mut self, mode: OutputMode) -> Self {
        self.mode = mode;
        self
    }
}

fn check_kind(spec: &KeySpec, value: &AttrValue) -> Result<()> {
    let ok = match spec.kind {
        KeyKind::Number => value.as_f64().is_some(),
        KeyKind::Numbers => value.as_numbers().is_some(),
        KeyKind::Text => true,
        KeyKind::Timestamp => value.as_str().map(parse_timestamp).is_some_and(|parsed| parsed.is_some()),
        KeyKind::Flag => flag_value(value).is_some(),
    };
    if ok {
        Ok(())
    } else {
        Err(PipelineError::invalid_attribute(
            spec.stage,
            spec.key,
            format!("expected {:?}, found '{value}'", spec.kind),
        ))
    }
}

/// Beam angles are measured from the vertical and must lie in `[0, 90)`.
pub fn check_beam_angle(key: &str, angle: f64) -> Result<()> {
    if (0.0..90.0).contains(&angle) {
        Ok(())
    } else {
        Err(PipelineError::invalid_attribute(
            Stage::Trim,
            key,
            format!("{angle} is not between 0 and 90 degrees"),
        ))
    }
}

fn flag_value(value: &AttrValue) -> Option<bool> {
    match value {
        AttrValue::Number(number) => Some(*number != 0.0),
        AttrValue::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" | "" => Some(false),
            _ => None,
        },
        AttrValue::Numbers(_) => None,
    }
}

fn clip_window(attrs: &Attributes) -> Result<Option<ClipWindow>> {
    if let Some(values) = attrs.get("good_ens").and_then(AttrValue::as_numbers) {
        return ensemble_ranges(&values).map(|ranges| Some(ClipWindow::Ensembles(ranges)));
    }

    let deployment = attrs.get_str("Deployment_date").and_then(parse_timestamp);
    let recovery = attrs.get_str("Recovery_date").and_then(parse_timestamp);
    match (deployment, recovery) {
        (Some(deployment), Some(recovery)) => {
            if recovery < deployment {
                return Err(PipelineError::InvalidTimeRange(format!(
                    "Recovery_date {recovery} precedes Deployment_date {deployment}"
                )));
            }
            Ok(Some(ClipWindow::Dates {
                deployment,
                recovery,
            }))
        }
        _ => Ok(None),
    }
}

fn ensemble_ranges(values: &[f64]) -> Result<Vec<(usize, usize)>> {
    if values.is_empty() || values.len() % 2 != 0 {
        return Err(PipelineError::InvalidTimeRange(format!(
            "good_ens needs start/end pairs, found {} values",
            values.len()
        )));
    }
    values
        .chunks(2)
        .map(|pair| {
            let as_index = |value: f64| {
                (value >= 0.0 && value.fract() == 0.0 && value.is_finite())
                    .then_some(value as usize)
                    .ok_or_else(|| {
                        PipelineError::InvalidTimeRange(format!("good_ens value {value} is not a sample index"))
                    })
            };
            Ok((as_index(pair[0])?, as_index(pair[1])?))
        })
        .collect()
}

/// Parses the timestamp forms accepted in metadata files, all taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
    ];
    for format in FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
