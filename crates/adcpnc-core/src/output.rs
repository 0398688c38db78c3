use tracing::info;

use crate::config::parse_timestamp;
use crate::dataset::{datetime_to_seconds, seconds_to_datetime, Dataset, Dim, Encoding, StorageType};
use crate::error::{PipelineError, Result, Stage};

/// Variables written without a fill value.
pub const COORDINATE_VARIABLES: &[&str] = &["lat", "lon", "depth", "time", "time2", "time_cf"];

/// Final time bookkeeping before writing: the CF time becomes `time_cf`
/// (int32 seconds since the first sample), `epic_time` becomes the `time`
/// coordinate and `epic_time2` the `time2` auxiliary coordinate.
pub fn prepare_for_output(mut ds: Dataset) -> Result<Dataset> {
    let stage = Stage::Output;
    let seconds = ds.time_seconds(stage)?;
    let first = seconds
        .first()
        .copied()
        .ok_or_else(|| PipelineError::InvalidTimeRange("record has no samples".to_string()))?;
    let origin = seconds_to_datetime(first)
        .ok_or_else(|| PipelineError::InvalidTimeRange(format!("time value {first} is not representable")))?;

    ds.rename(stage, "time", "time_cf")?;
    let time_cf = ds.require_mut(stage, "time_cf")?;
    time_cf
        .data_mut()
        .mapv_inplace(|value| (value - first).round());
    time_cf.attrs.insert(
        "units",
        format!("seconds since {}", origin.format("%Y-%m-%d %H:%M:%S")),
    );
    time_cf.encoding = Encoding::int();

    ds.rename(stage, "epic_time", "time")?;
    ds.rename(stage, "epic_time2", "time2")?;
    ds.set_aux_coord("time2");
    ds.set_aux_coord("time_cf");

    for name in COORDINATE_VARIABLES {
        if let Some(var) = ds.get_mut(name) {
            var.encoding.fill_value = None;
        }
    }
    info!(origin = %origin, "renamed time variables for EPIC output");
    Ok(ds)
}

/// Decodes CF time values (`<unit> since <timestamp>`) into seconds since
/// the Unix epoch.
pub fn decode_cf_time(values: &[f64], units: &str) -> Option<Vec<f64>> {
    let (unit, origin) = units.split_once(" since ")?;
    let scale = match unit.trim().to_ascii_lowercase().as_str() {
        "days" | "day" | "d" => 86_400.0,
        "hours" | "hour" | "h" => 3_600.0,
        "minutes" | "minute" | "min" => 60.0,
        "seconds" | "second" | "s" | "sec" => 1.0,
        "milliseconds" | "millisecond" | "ms" => 1e-3,
        _ => return None,
    };
    let origin = datetime_to_seconds(parse_timestamp(origin.trim().trim_end_matches(" UTC"))?);
    Some(values.iter().map(|value| origin + value * scale).collect())
}

/// `coordinates` attribute for a time-dimensioned data variable: the
/// auxiliary coordinates, space separated. `None` for coordinates themselves.
pub fn coordinates_attribute(ds: &Dataset, name: &str) -> Option<String> {
    let var = ds.get(name)?;
    if !var.has_dim(&Dim::Time) || ds.is_coordinate(name) || ds.aux_coords().any(|aux| aux == name) {
        return None;
    }
    let aux: Vec<&str> = ds.aux_coords().collect();
    (!aux.is_empty()).then(|| aux.join(" "))
}

/// Replaces missing samples with the fill value, when there is one.
pub fn fill_missing(values: &[f64], fill: Option<f64>) -> Vec<f64> {
    match fill {
        Some(fill) => values
            .iter()
            .map(|value| if value.is_nan() { fill } else { *value })
            .collect(),
        None => values.to_vec(),
    }
}

/// Rounds samples for int32 storage. A missing sample needs a fill value;
/// without one the variable cannot be stored.
pub fn encode_int(name: &str, values: &[f64], fill: Option<f64>) -> Result<Vec<i32>> {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            let value = match (value.is_finite(), fill) {
                (true, _) => *value,
                (false, Some(fill)) => fill,
                (false, None) => {
                    return Err(PipelineError::invalid_attribute(
                        Stage::Output,
                        name,
                        format!("sample {index} is missing and int32 storage has no fill value"),
                    ))
                }
            };
            Ok(value.round() as i32)
        })
        .collect()
}

pub fn storage_name(storage: StorageType) -> &'static str {
    match storage {
        StorageType::Double => "f64",
        StorageType::Float => "f32",
        StorageType::Int => "i32",
    }
}

#[cfg(feature = "netcdf")]
pub use self::netcdf_io::{read_netcdf, write_netcdf};

#[cfg(feature = "netcdf")]
mod netcdf_io {
    use std::path::Path;

    use ndarray::{ArrayD, IxDyn};
    use netcdf::AttributeValue;
    use tracing::{debug, info};

    use super::{coordinates_attribute, decode_cf_time, encode_int, fill_missing};
    use crate::dataset::{AttrValue, Attributes, Dataset, Dim, StorageType, Variable, TIME_UNITS};
    use crate::error::{PipelineError, Result, Stage};

    fn to_attribute_value(value: &AttrValue) -> AttributeValue {
        match value {
            AttrValue::Number(number) => AttributeValue::Double(*number),
            AttrValue::Numbers(numbers) => AttributeValue::Doubles(numbers.clone()),
            AttrValue::Text(text) => AttributeValue::Str(text.clone()),
        }
    }

    fn from_attribute_value(value: AttributeValue) -> Option<AttrValue> {
        let numbers = |values: Vec<f64>| Some(AttrValue::Numbers(values));
        match value {
            AttributeValue::Str(text) => Some(AttrValue::Text(text)),
            AttributeValue::Strs(texts) => Some(AttrValue::Text(texts.join("; "))),
            AttributeValue::Double(v) => Some(AttrValue::Number(v)),
            AttributeValue::Float(v) => Some(AttrValue::Number(f64::from(v))),
            AttributeValue::Int(v) => Some(AttrValue::Number(f64::from(v))),
            AttributeValue::Short(v) => Some(AttrValue::Number(f64::from(v))),
            AttributeValue::Schar(v) => Some(AttrValue::Number(f64::from(v))),
            AttributeValue::Uchar(v) => Some(AttrValue::Number(f64::from(v))),
            AttributeValue::Ushort(v) => Some(AttrValue::Number(f64::from(v))),
            AttributeValue::Uint(v) => Some(AttrValue::Number(f64::from(v))),
            AttributeValue::Longlong(v) => Some(AttrValue::Number(v as f64)),
            AttributeValue::Ulonglong(v) => Some(AttrValue::Number(v as f64)),
            AttributeValue::Doubles(v) => numbers(v),
            AttributeValue::Floats(v) => numbers(v.into_iter().map(f64::from).collect()),
            AttributeValue::Ints(v) => numbers(v.into_iter().map(f64::from).collect()),
            AttributeValue::Shorts(v) => numbers(v.into_iter().map(f64::from).collect()),
            _ => None,
        }
    }

    /// Writes the dataset to one NetCDF file with `time` unlimited.
    pub fn write_netcdf(ds: &Dataset, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut file = netcdf::create(path)?;

        for (dim, len) in ds.dims() {
            match dim {
                Dim::Time => {
                    file.add_unlimited_dimension(dim.name())?;
                }
                other => {
                    file.add_dimension(other.name(), len)?;
                }
            }
        }

        for (name, var) in ds.variables() {
            let dims: Vec<&str> = var.dims().iter().map(Dim::name).collect();
            let start = vec![0usize; dims.len()];
            let count = var.shape().to_vec();
            let values: Vec<f64> = var.data().iter().copied().collect();
            let fill = var.encoding.fill_value;
            let coordinates = coordinates_attribute(ds, name);

            macro_rules! write_as {
                ($ty:ty, $values:expr, $fill:expr) => {{
                    let converted: Vec<$ty> = $values;
                    let mut nc_var = file.add_variable::<$ty>(name, &dims)?;
                    if let Some(fill) = $fill {
                        nc_var.set_fill_value(fill)?;
                    }
                    for (key, value) in &var.attrs {
                        nc_var.put_attribute(key, to_attribute_value(value))?;
                    }
                    if let Some(coordinates) = &coordinates {
                        nc_var.put_attribute("coordinates", AttributeValue::Str(coordinates.clone()))?;
                    }
                    if dims.is_empty() {
                        nc_var.put_values(&converted, ..)?;
                    } else {
                        nc_var.put_values(&converted, (start.as_slice(), count.as_slice()))?;
                    }
                }};
            }

            match var.encoding.storage {
                StorageType::Double => write_as!(f64, fill_missing(&values, fill), fill),
                StorageType::Float => write_as!(
                    f32,
                    fill_missing(&values, fill).into_iter().map(|value| value as f32).collect(),
                    fill.map(|fill| fill as f32)
                ),
                StorageType::Int => write_as!(
                    i32,
                    encode_int(name, &values, fill)?,
                    fill.map(|fill| fill.round() as i32)
                ),
            }
            debug!(variable = name, "wrote variable");
        }

        for (key, value) in &ds.attrs {
            file.add_attribute(key, to_attribute_value(value))?;
        }
        info!(path = %path.display(), variables = ds.names().count(), "wrote NetCDF file");
        Ok(())
    }

    /// Loads a raw dataset. A CF-encoded `time` variable is decoded into
    /// seconds since the Unix epoch; `_FillValue` samples become NaN.
    pub fn read_netcdf(path: impl AsRef<Path>) -> Result<Dataset> {
        let path = path.as_ref();
        let file = netcdf::open(path)?;
        let stage = Stage::Load;
        let mut ds = Dataset::new();

        for attr in file.attributes() {
            if let Some(value) = from_attribute_value(attr.value()?) {
                ds.attrs.insert(attr.name(), value);
            }
        }

        for nc_var in file.variables() {
            let name = nc_var.name();
            let dims: Vec<Dim> = nc_var
                .dimensions()
                .iter()
                .map(|dim| Dim::from_name(&dim.name()))
                .collect();
            let shape: Vec<usize> = nc_var.dimensions().iter().map(|dim| dim.len()).collect();

            let mut attrs = Attributes::new();
            for attr in nc_var.attributes() {
                if let Some(value) = from_attribute_value(attr.value()?) {
                    attrs.insert(attr.name(), value);
                }
            }

            let mut values: Vec<f64> = match nc_var.get_values::<f64, _>(..) {
                Ok(values) => values,
                Err(err) => {
                    debug!(variable = %name, error = %err, "skipping non-numeric variable");
                    continue;
                }
            };
            if let Some(fill) = attrs.get_f64("_FillValue") {
                for value in values.iter_mut() {
                    if *value == fill {
                        *value = f64::NAN;
                    }
                }
            }
            if name == "time" {
                if let Some(units) = attrs.get_str("units") {
                    let decoded = decode_cf_time(&values, units).ok_or_else(|| {
                        PipelineError::invalid_attribute(stage, "time", format!("unsupported time units '{units}'"))
                    })?;
                    values = decoded;
                    attrs.insert("units", TIME_UNITS);
                }
            }

            let data = ArrayD::from_shape_vec(IxDyn(&shape), values)?;
            let variable = Variable::new(dims, data)?.with_attrs(attrs);
            ds.insert(stage, name, variable)?;
        }

        info!(path = %path.display(), variables = ds.names().count(), "read NetCDF file");
        Ok(ds)
    }
}
