use std::fmt;

use nalgebra::Matrix3;
use serde::Serialize;

use crate::config::{check_beam_angle, DEFAULT_BEAM_ANGLE};
use crate::dataset::{AttrValue, Dataset};
use crate::error::{PipelineError, Result, Stage};

/// Vertical mounting of the instrument head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Orientation {
    Up,
    Down,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Up => "UP",
            Orientation::Down => "DOWN",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "UP" => Some(Orientation::Up),
            "DOWN" => Some(Orientation::Down),
            _ => None,
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Frame the raw velocity components are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateSystem {
    Beam,
    Instrument,
    Ship,
    Earth,
}

impl CoordinateSystem {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "BEAM" => Some(CoordinateSystem::Beam),
            "XYZ" | "INSTRUMENT" => Some(CoordinateSystem::Instrument),
            "SHIP" => Some(CoordinateSystem::Ship),
            "ENU" | "EARTH" => Some(CoordinateSystem::Earth),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CoordinateSystem::Beam => "BEAM",
            CoordinateSystem::Instrument => "XYZ",
            CoordinateSystem::Ship => "SHIP",
            CoordinateSystem::Earth => "ENU",
        }
    }
}

/// Beam-to-instrument transformation matrix of one instrument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationMatrix(Matrix3<f64>);

impl CalibrationMatrix {
    pub fn new(matrix: Matrix3<f64>) -> Self {
        Self(matrix)
    }

    pub fn identity() -> Self {
        Self(Matrix3::identity())
    }

    /// Builds the matrix from nine values in row-major order.
    pub fn from_row_major(values: &[f64]) -> Option<Self> {
        (values.len() == 9 && values.iter().all(|v| v.is_finite()))
            .then(|| Self(Matrix3::from_row_slice(values)))
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.0
    }

    /// The vertical row's first-beam term is negative for heads mounted
    /// looking down.
    pub fn suggests_down(&self) -> bool {
        self.0[(2, 0)] < 0.0
    }

    /// The matrix with the second and third rows negated for a downward head.
    pub fn oriented(&self, orientation: Orientation) -> Matrix3<f64> {
        let mut matrix = self.0;
        if orientation == Orientation::Down {
            for row in 1..3 {
                for col in 0..3 {
                    matrix[(row, col)] = -matrix[(row, col)];
                }
            }
        }
        matrix
    }

    pub fn row_major(&self) -> Vec<f64> {
        self.0.transpose().iter().copied().collect()
    }

    /// Reads a `TransMatrix` variable, falling back to the nine-value
    /// `AQDTransMatrix` attribute.
    pub fn from_dataset(ds: &Dataset) -> Result<Self> {
        if let Some(var) = ds.get("TransMatrix") {
            let values = var.values_2d()?;
            if values.dim() != (3, 3) {
                return Err(PipelineError::invalid_attribute(
                    Stage::Depth,
                    "TransMatrix",
                    format!("expected a 3x3 matrix, found {:?}", values.dim()),
                ));
            }
            let flat: Vec<f64> = values.iter().copied().collect();
            return Self::from_row_major(&flat).ok_or_else(|| {
                PipelineError::invalid_attribute(Stage::Depth, "TransMatrix", "contains missing values")
            });
        }

        match ds.attrs.get("AQDTransMatrix") {
            Some(AttrValue::Numbers(values)) => Self::from_row_major(values).ok_or_else(|| {
                PipelineError::invalid_attribute(
                    Stage::Depth,
                    "AQDTransMatrix",
                    format!("expected nine finite values, found {}", values.len()),
                )
            }),
            Some(other) => Err(PipelineError::invalid_attribute(
                Stage::Depth,
                "AQDTransMatrix",
                format!("expected nine numbers, found '{other}'"),
            )),
            None => Err(PipelineError::missing_attribute(Stage::Depth, "TransMatrix")),
        }
    }
}

/// Description of the instrument that recorded the raw dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentInfo {
    pub serial_number: String,
    pub inst_type: String,
    pub coordinate_system: CoordinateSystem,
    pub blanking_distance: f64,
    /// `AQDBeamAngle`, degrees from the vertical.
    pub beam_angle: Option<f64>,
    pub calibration: CalibrationMatrix,
}

impl InstrumentInfo {
    pub fn from_dataset(ds: &Dataset) -> Result<Self> {
        let serial_number = ds
            .attrs
            .get("AQDSerial_Number")
            .map(|value| value.to_string())
            .ok_or_else(|| PipelineError::missing_attribute(Stage::Annotate, "AQDSerial_Number"))?;

        let inst_type = ds
            .attrs
            .get("INST_TYPE")
            .map(|value| value.to_string())
            .ok_or_else(|| PipelineError::missing_attribute(Stage::Annotate, "INST_TYPE"))?;

        let raw_system = ds
            .attrs
            .get_str("AQDCoordinateSystem")
            .ok_or_else(|| PipelineError::missing_attribute(Stage::Transform, "AQDCoordinateSystem"))?;
        let coordinate_system = CoordinateSystem::parse(raw_system).ok_or_else(|| {
            PipelineError::invalid_attribute(
                Stage::Transform,
                "AQDCoordinateSystem",
                format!("unknown coordinate system '{raw_system}'"),
            )
        })?;

        let blanking_distance = ds
            .attrs
            .get_f64("AQDBlankingDistance")
            .ok_or_else(|| PipelineError::missing_attribute(Stage::Annotate, "AQDBlankingDistance"))?;

        let beam_angle = match ds.attrs.get("AQDBeamAngle") {
            Some(value) => {
                let angle = value.as_f64().ok_or_else(|| {
                    PipelineError::invalid_attribute(Stage::Trim, "AQDBeamAngle", format!("expected a number, found '{value}'"))
                })?;
                check_beam_angle("AQDBeamAngle", angle)?;
                Some(angle)
            }
            None => None,
        };

        let calibration = CalibrationMatrix::from_dataset(ds)?;

        Ok(Self {
            serial_number,
            inst_type,
            coordinate_system,
            blanking_distance,
            beam_angle,
            calibration,
        })
    }

    /// Angle used for side-lobe trimming: the instrument's `AQDBeamAngle`,
    /// else the configured `beam_angle`, else 25 degrees.
    pub fn side_lobe_angle(&self, configured: Option<f64>) -> f64 {
        self.beam_angle.or(configured).unwrap_or(DEFAULT_BEAM_ANGLE)
    }
}
