use chrono::{DateTime, Utc};
use tracing::info;

use crate::dataset::{seconds_to_datetime, Dataset};
use crate::error::{PipelineError, PipelineWarning, Result, Stage};

const SECONDS_PER_DAY: f64 = 86_400.0;
const MSEC_PER_DAY: f64 = 86_400_000.0;
/// True Julian day number of 1970-01-01 (the day beginning at 00:00 UTC).
const UNIX_EPOCH_JULIAN_DAY: f64 = 2_440_588.0;

/// Shifts the time axis by a whole number of seconds. Fractional shifts are
/// refused with a warning and the dataset is returned untouched.
pub fn shift_time(mut ds: Dataset, seconds: f64) -> Result<(Dataset, Option<PipelineWarning>)> {
    if seconds.fract() != 0.0 || !seconds.is_finite() {
        return Ok((ds, Some(PipelineWarning::TimeNotShifted { seconds })));
    }
    let time = ds.require_mut(Stage::Clip, "time")?;
    time.data_mut().mapv_inplace(|value| value + seconds);
    info!(seconds, "time shifted");
    Ok((ds, None))
}

/// EPIC two-word time: true Julian day and milliseconds since 00:00 GMT.
#[derive(Debug, Clone, PartialEq)]
pub struct EpicTime {
    pub days: Vec<f64>,
    pub msec: Vec<f64>,
}

impl EpicTime {
    pub fn from_seconds(seconds: &[f64]) -> Self {
        let mut days = Vec::with_capacity(seconds.len());
        let mut msec = Vec::with_capacity(seconds.len());
        for &value in seconds {
            let whole_days = (value / SECONDS_PER_DAY).floor();
            let mut day = UNIX_EPOCH_JULIAN_DAY + whole_days;
            let mut millis = ((value - whole_days * SECONDS_PER_DAY) * 1000.0).round();
            if millis >= MSEC_PER_DAY {
                day += 1.0;
                millis -= MSEC_PER_DAY;
            }
            days.push(day);
            msec.push(millis);
        }
        Self { days, msec }
    }

    /// Day numbers that are not integral (missing or non-finite time values).
    pub fn non_integer_days(&self) -> usize {
        self.days
            .iter()
            .filter(|day| !day.is_finite() || day.fract() != 0.0)
            .count()
    }

    pub fn to_seconds(&self) -> Vec<f64> {
        self.days
            .iter()
            .zip(&self.msec)
            .map(|(day, msec)| (day - UNIX_EPOCH_JULIAN_DAY) * SECONDS_PER_DAY + msec / 1000.0)
            .collect()
    }
}

/// Whole seconds between the first two samples, or a warning when the
/// spacing is fractional. `None` for records shorter than two samples.
pub fn delta_t(times: &[f64]) -> (Option<f64>, Option<PipelineWarning>) {
    match times {
        [first, second, ..] => {
            let seconds = second - first;
            if seconds.fract() == 0.0 {
                (Some(seconds), None)
            } else {
                (
                    Some(seconds.trunc()),
                    Some(PipelineWarning::NonIntegerDeltaT { seconds }),
                )
            }
        }
        _ => (None, None),
    }
}

pub fn iso_timestamp(datetime: DateTime<Utc>) -> String {
    datetime.format("%Y-%m-%dT%H:%M:%S%.fZ").to_string()
}

/// First and last time stamps of the record in ISO 8601.
pub fn start_stop(ds: &Dataset, stage: Stage) -> Result<(String, String)> {
    let times = ds.time_seconds(stage)?;
    let (Some(first), Some(last)) = (times.first(), times.last()) else {
        return Err(PipelineError::InvalidTimeRange("record has no samples".to_string()));
    };
    let convert = |seconds: f64| {
        seconds_to_datetime(seconds)
            .map(iso_timestamp)
            .ok_or_else(|| PipelineError::InvalidTimeRange(format!("time value {seconds} is not representable")))
    };
    Ok((convert(*first)?, convert(*last)?))
}
