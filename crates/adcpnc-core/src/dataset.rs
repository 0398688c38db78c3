use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2, ArrayD, ArrayView1, ArrayView2, Axis, ErrorKind, Ix1, Ix2, IxDyn, ShapeError};

pub use adcpnc_meta::{AttrValue, Attributes};

use crate::error::{PipelineError, Result, Stage};

/// Units of the in-memory time coordinate.
pub const TIME_UNITS: &str = "seconds since 1970-01-01 00:00:00";

/// Fill value written for missing samples of data variables.
pub const FILL_VALUE: f64 = 1e35;

/// Named axis of a variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dim {
    Time,
    BinDist,
    Depth,
    Lat,
    Lon,
    Named(String),
}

impl Dim {
    pub fn name(&self) -> &str {
        match self {
            Dim::Time => "time",
            Dim::BinDist => "bindist",
            Dim::Depth => "depth",
            Dim::Lat => "lat",
            Dim::Lon => "lon",
            Dim::Named(name) => name,
        }
    }

    pub fn from_name(name: &str) -> Dim {
        match name {
            "time" => Dim::Time,
            "bindist" => Dim::BinDist,
            "depth" => Dim::Depth,
            "lat" => Dim::Lat,
            "lon" => Dim::Lon,
            other => Dim::Named(other.to_string()),
        }
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    Double,
    Float,
    Int,
}

/// How a variable is stored when the dataset is serialized.
#[derive(Debug, Clone, PartialEq)]
pub struct Encoding {
    pub storage: StorageType,
    pub fill_value: Option<f64>,
}

impl Default for Encoding {
    fn default() -> Self {
        Self {
            storage: StorageType::Double,
            fill_value: None,
        }
    }
}

impl Encoding {
    pub fn data() -> Self {
        Self {
            storage: StorageType::Double,
            fill_value: Some(FILL_VALUE),
        }
    }

    pub fn int() -> Self {
        Self {
            storage: StorageType::Int,
            fill_value: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Variable {
    dims: Vec<Dim>,
    data: ArrayD<f64>,
    pub attrs: Attributes,
    pub encoding: Encoding,
}

impl Variable {
    pub fn new(dims: Vec<Dim>, data: ArrayD<f64>) -> Result<Self> {
        if data.ndim() != dims.len() {
            return Err(ShapeError::from_kind(ErrorKind::IncompatibleShape).into());
        }
        Ok(Self {
            dims,
            data,
            attrs: Attributes::new(),
            encoding: Encoding::default(),
        })
    }

    pub fn scalar(value: f64) -> Self {
        Self {
            dims: Vec::new(),
            data: ArrayD::from_elem(IxDyn(&[]), value),
            attrs: Attributes::new(),
            encoding: Encoding::default(),
        }
    }

    pub fn series(dim: Dim, values: Vec<f64>) -> Self {
        Self {
            dims: vec![dim],
            data: Array1::from(values).into_dyn(),
            attrs: Attributes::new(),
            encoding: Encoding::default(),
        }
    }

    pub fn grid(dims: [Dim; 2], data: Array2<f64>) -> Self {
        Self {
            dims: dims.to_vec(),
            data: data.into_dyn(),
            attrs: Attributes::new(),
            encoding: Encoding::default(),
        }
    }

    pub fn with_attrs(mut self, attrs: Attributes) -> Self {
        self.attrs = attrs;
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn dims(&self) -> &[Dim] {
        &self.dims
    }

    pub fn data(&self) -> &ArrayD<f64> {
        &self.data
    }

    /// Element access for in-place masking and rotation. The shape must not
    /// change; the orchestrator re-validates after every stage.
    pub fn data_mut(&mut self) -> &mut ArrayD<f64> {
        &mut self.data
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn axis_of(&self, dim: &Dim) -> Option<usize> {
        self.dims.iter().position(|d| d == dim)
    }

    pub fn len_of(&self, dim: &Dim) -> Option<usize> {
        self.axis_of(dim).map(|axis| self.data.len_of(Axis(axis)))
    }

    pub fn has_dim(&self, dim: &Dim) -> bool {
        self.dims.contains(dim)
    }

    pub fn values_1d(&self) -> Result<ArrayView1<'_, f64>> {
        Ok(self.data.view().into_dimensionality::<Ix1>()?)
    }

    pub fn values_2d(&self) -> Result<ArrayView2<'_, f64>> {
        Ok(self.data.view().into_dimensionality::<Ix2>()?)
    }

    /// The single value of a scalar (or length-one) variable.
    pub fn scalar_value(&self) -> Option<f64> {
        if self.data.len() == 1 {
            self.data.iter().next().copied()
        } else {
            None
        }
    }

    /// Mean over every sample, ignoring missing values.
    pub fn nanmean(&self) -> Option<f64> {
        let (sum, count) = self
            .data
            .iter()
            .filter(|value| !value.is_nan())
            .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
        (count > 0).then(|| sum / count as f64)
    }

    /// Minimum and maximum over every sample, ignoring missing values.
    pub fn min_max(&self) -> Option<(f64, f64)> {
        self.data
            .iter()
            .filter(|value| !value.is_nan())
            .fold(None, |acc, &value| match acc {
                None => Some((value, value)),
                Some((min, max)) => Some((min.min(value), max.max(value))),
            })
    }

    fn select(&self, dim: &Dim, indices: &[usize]) -> Variable {
        match self.axis_of(dim) {
            Some(axis) => Variable {
                dims: self.dims.clone(),
                data: self.data.select(Axis(axis), indices),
                attrs: self.attrs.clone(),
                encoding: self.encoding.clone(),
            },
            None => self.clone(),
        }
    }

    /// Inserts a new axis of length one at `position`.
    pub fn expand_dims(mut self, dim: Dim, position: usize) -> Variable {
        let position = position.min(self.dims.len());
        self.data = self.data.insert_axis(Axis(position));
        self.dims.insert(position, dim);
        self
    }

    /// Reorders the axes to `order`, which must name every axis exactly once.
    pub fn transpose(mut self, order: &[Dim]) -> Result<Variable> {
        if order.len() != self.dims.len() {
            return Err(ShapeError::from_kind(ErrorKind::IncompatibleShape).into());
        }
        let mut permutation = Vec::with_capacity(order.len());
        for dim in order {
            let axis = self
                .axis_of(dim)
                .ok_or_else(|| PipelineError::from(ShapeError::from_kind(ErrorKind::IncompatibleShape)))?;
            if permutation.contains(&axis) {
                return Err(ShapeError::from_kind(ErrorKind::IncompatibleShape).into());
            }
            permutation.push(axis);
        }
        let permuted = self.data.permuted_axes(IxDyn(&permutation));
        self.data = permuted.as_standard_layout().into_owned();
        self.dims = order.to_vec();
        Ok(self)
    }

    fn rename_dim(&mut self, from: &Dim, to: &Dim) {
        for dim in self.dims.iter_mut() {
            if dim == from {
                *dim = to.clone();
            }
        }
    }
}

/// The labeled multidimensional dataset threaded through the pipeline.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    variables: BTreeMap<String, Variable>,
    aux_coords: BTreeSet<String>,
    pub attrs: Attributes,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a variable. Its axis lengths must agree with every
    /// other variable sharing those axes.
    pub fn insert(&mut self, stage: Stage, name: impl Into<String>, variable: Variable) -> Result<()> {
        let name = name.into();
        for (axis, dim) in variable.dims.iter().enumerate() {
            let found = variable.data.len_of(Axis(axis));
            let existing = self
                .variables
                .iter()
                .filter(|(other, _)| **other != name)
                .find_map(|(_, other)| other.len_of(dim));
            if let Some(expected) = existing {
                if expected != found {
                    return Err(PipelineError::ShapeMismatch {
                        stage,
                        variable: name,
                        dim: dim.name().to_string(),
                        expected,
                        found,
                    });
                }
            }
        }
        self.variables.insert(name, variable);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.variables.get_mut(name)
    }

    pub fn require(&self, stage: Stage, name: &str) -> Result<&Variable> {
        self.variables
            .get(name)
            .ok_or_else(|| PipelineError::missing_variable(stage, name))
    }

    pub fn require_mut(&mut self, stage: Stage, name: &str) -> Result<&mut Variable> {
        self.variables
            .get_mut(name)
            .ok_or_else(|| PipelineError::missing_variable(stage, name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Variable> {
        self.aux_coords.remove(name);
        self.variables.remove(name)
    }

    /// Takes a variable out for reshaping; put it back with [`Dataset::insert`].
    pub fn take(&mut self, stage: Stage, name: &str) -> Result<Variable> {
        self.variables
            .remove(name)
            .ok_or_else(|| PipelineError::missing_variable(stage, name))
    }

    pub fn rename(&mut self, stage: Stage, from: &str, to: &str) -> Result<()> {
        if from == to {
            return Ok(());
        }
        if self.variables.contains_key(to) {
            return Err(PipelineError::DuplicateVariable {
                stage,
                name: to.to_string(),
            });
        }
        let variable = self.take(stage, from)?;
        if self.aux_coords.remove(from) {
            self.aux_coords.insert(to.to_string());
        }
        self.variables.insert(to.to_string(), variable);
        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    pub fn variables(&self) -> impl Iterator<Item = (&str, &Variable)> {
        self.variables.iter().map(|(name, var)| (name.as_str(), var))
    }

    pub fn variables_mut(&mut self) -> impl Iterator<Item = (&str, &mut Variable)> {
        self.variables.iter_mut().map(|(name, var)| (name.as_str(), var))
    }

    pub fn dim_len(&self, dim: &Dim) -> Option<usize> {
        self.variables.values().find_map(|var| var.len_of(dim))
    }

    /// Every axis in use with its length.
    pub fn dims(&self) -> BTreeMap<Dim, usize> {
        let mut dims = BTreeMap::new();
        for var in self.variables.values() {
            for (axis, dim) in var.dims.iter().enumerate() {
                dims.entry(dim.clone())
                    .or_insert_with(|| var.data.len_of(Axis(axis)));
            }
        }
        dims
    }

    /// A coordinate is a one-dimensional variable over the axis of the same
    /// name.
    pub fn is_coordinate(&self, name: &str) -> bool {
        self.variables
            .get(name)
            .map(|var| var.dims.len() == 1 && var.dims[0].name() == name)
            .unwrap_or(false)
    }

    pub fn set_aux_coord(&mut self, name: &str) {
        if self.variables.contains_key(name) {
            self.aux_coords.insert(name.to_string());
        }
    }

    pub fn aux_coords(&self) -> impl Iterator<Item = &str> {
        self.aux_coords.iter().map(String::as_str)
    }

    /// Checks that every variable agrees on the length of each shared axis
    /// and that the time coordinate never decreases.
    pub fn validate(&self, stage: Stage) -> Result<()> {
        self.check_time_order(stage)?;
        let mut seen: BTreeMap<&Dim, usize> = BTreeMap::new();
        for (name, var) in &self.variables {
            for (axis, dim) in var.dims.iter().enumerate() {
                let found = var.data.len_of(Axis(axis));
                match seen.get(dim) {
                    Some(&expected) if expected != found => {
                        return Err(PipelineError::ShapeMismatch {
                            stage,
                            variable: name.clone(),
                            dim: dim.name().to_string(),
                            expected,
                            found,
                        })
                    }
                    Some(_) => {}
                    None => {
                        seen.insert(dim, found);
                    }
                }
            }
        }
        Ok(())
    }

    /// Fails with [`PipelineError::InvalidTimeRange`] when a time stamp is
    /// earlier than the one before it. Missing stamps are not compared.
    pub fn check_time_order(&self, stage: Stage) -> Result<()> {
        let Some(time) = self.get("time") else {
            return Ok(());
        };
        if !time.has_dim(&Dim::Time) {
            return Ok(());
        }
        let values = time.values_1d()?;
        let mut previous: Option<f64> = None;
        for (index, &value) in values.iter().enumerate() {
            if value.is_nan() {
                continue;
            }
            if let Some(previous) = previous {
                if value < previous {
                    return Err(PipelineError::InvalidTimeRange(format!(
                        "{stage}: time decreases from {previous} to {value} at sample {index}"
                    )));
                }
            }
            previous = Some(value);
        }
        Ok(())
    }

    /// Keeps the listed time indices, in the order given, in every variable
    /// that has a time axis.
    pub fn isel_time(mut self, indices: &[usize]) -> Result<Dataset> {
        let len = self.dim_len(&Dim::Time).unwrap_or(0);
        if let Some(bad) = indices.iter().find(|&&index| index >= len) {
            return Err(PipelineError::InvalidTimeRange(format!(
                "index {bad} is outside a record of {len} samples"
            )));
        }
        for var in self.variables.values_mut() {
            if var.has_dim(&Dim::Time) {
                *var = var.select(&Dim::Time, indices);
            }
        }
        Ok(self)
    }

    /// Replaces the `bindist` axis with a `depth` axis whose coordinate holds
    /// `depth_values`. `bindist` survives as an ordinary variable over
    /// `depth`. Only one swap is possible.
    pub fn swap_vertical(&mut self, stage: Stage, depth_values: Vec<f64>) -> Result<()> {
        if self.dim_len(&Dim::Depth).is_some() {
            return Err(PipelineError::AlreadySwapped);
        }
        let bins = self
            .dim_len(&Dim::BinDist)
            .ok_or_else(|| PipelineError::missing_variable(stage, "bindist"))?;
        if bins != depth_values.len() {
            return Err(PipelineError::ShapeMismatch {
                stage,
                variable: "depth".to_string(),
                dim: Dim::Depth.name().to_string(),
                expected: bins,
                found: depth_values.len(),
            });
        }
        for var in self.variables.values_mut() {
            var.rename_dim(&Dim::BinDist, &Dim::Depth);
        }
        self.variables
            .insert("depth".to_string(), Variable::series(Dim::Depth, depth_values));
        Ok(())
    }

    /// Time coordinate in seconds since the Unix epoch.
    pub fn time_seconds(&self, stage: Stage) -> Result<Vec<f64>> {
        Ok(self.require(stage, "time")?.values_1d()?.to_vec())
    }

    pub fn time_datetimes(&self, stage: Stage) -> Result<Vec<DateTime<Utc>>> {
        self.time_seconds(stage)?
            .into_iter()
            .map(|seconds| {
                seconds_to_datetime(seconds).ok_or_else(|| {
                    PipelineError::InvalidTimeRange(format!("time value {seconds} is not representable"))
                })
            })
            .collect()
    }
}

pub fn seconds_to_datetime(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round() as u32;
    DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))
}

pub fn datetime_to_seconds(datetime: DateTime<Utc>) -> f64 {
    datetime.timestamp() as f64 + f64::from(datetime.timestamp_subsec_nanos()) / 1e9
}
