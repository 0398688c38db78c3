use serde::Serialize;
use tracing::info;

use crate::config::ClipWindow;
use crate::dataset::{datetime_to_seconds, Dataset, Dim};
use crate::error::{PipelineError, Result, Stage};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ClipOutcome {
    Ensembles {
        ranges: Vec<(usize, usize)>,
        samples: usize,
    },
    Dates {
        deployment: String,
        recovery: String,
        samples: usize,
    },
    Unclipped {
        samples: usize,
    },
}

impl ClipOutcome {
    pub fn samples(&self) -> usize {
        match self {
            ClipOutcome::Ensembles { samples, .. }
            | ClipOutcome::Dates { samples, .. }
            | ClipOutcome::Unclipped { samples } => *samples,
        }
    }
}

/// Restricts the time axis to the deployment window.
pub fn clip(ds: Dataset, window: Option<&ClipWindow>) -> Result<(Dataset, ClipOutcome)> {
    let len = ds
        .dim_len(&Dim::Time)
        .ok_or_else(|| PipelineError::missing_variable(Stage::Clip, "time"))?;
    ds.check_time_order(Stage::Clip)?;

    match window {
        Some(ClipWindow::Ensembles(ranges)) => {
            let indices = ensemble_indices(ranges, len)?;
            let mut ds = ds.isel_time(&indices)?;
            ds.attrs.prepend_history(&format!(
                "Data clipped using good_ens values of {}. ",
                format_ranges(ranges)
            ));
            info!(from = len, to = indices.len(), "clipped data using good_ens");
            Ok((
                ds,
                ClipOutcome::Ensembles {
                    ranges: ranges.clone(),
                    samples: indices.len(),
                },
            ))
        }
        Some(ClipWindow::Dates {
            deployment,
            recovery,
        }) => {
            if recovery < deployment {
                return Err(PipelineError::InvalidTimeRange(format!(
                    "Recovery_date {recovery} precedes Deployment_date {deployment}"
                )));
            }
            let start = datetime_to_seconds(*deployment);
            let end = datetime_to_seconds(*recovery);
            let indices: Vec<usize> = ds
                .time_seconds(Stage::Clip)?
                .iter()
                .enumerate()
                .filter(|(_, time)| **time >= start && **time <= end)
                .map(|(index, _)| index)
                .collect();
            if indices.is_empty() {
                return Err(PipelineError::InvalidTimeRange(format!(
                    "no samples between {deployment} and {recovery}"
                )));
            }
            let deployment = deployment.format("%Y-%m-%d %H:%M:%S").to_string();
            let recovery = recovery.format("%Y-%m-%d %H:%M:%S").to_string();
            let mut ds = ds.isel_time(&indices)?;
            ds.attrs.prepend_history(&format!(
                "Data clipped using Deployment_date and Recovery_date of {deployment}, {recovery}. "
            ));
            info!(from = len, to = indices.len(), "clipped data using Deployment_date and Recovery_date");
            Ok((
                ds,
                ClipOutcome::Dates {
                    deployment,
                    recovery,
                    samples: indices.len(),
                },
            ))
        }
        None => {
            info!("did not clip data; no values specified in metadata");
            Ok((ds, ClipOutcome::Unclipped { samples: len }))
        }
    }
}

/// Expands half-open `[start, end)` ranges into sample indices. Ranges must
/// be non-empty, ascending, non-overlapping and inside the record.
pub fn ensemble_indices(ranges: &[(usize, usize)], len: usize) -> Result<Vec<usize>> {
    if ranges.is_empty() {
        return Err(PipelineError::InvalidTimeRange("good_ens is empty".to_string()));
    }
    let mut indices = Vec::new();
    let mut previous_end = 0;
    for (position, &(start, end)) in ranges.iter().enumerate() {
        if start >= end {
            return Err(PipelineError::InvalidTimeRange(format!(
                "range [{start}, {end}) is empty or descending"
            )));
        }
        if end > len {
            return Err(PipelineError::InvalidTimeRange(format!(
                "range [{start}, {end}) exceeds the record length of {len}"
            )));
        }
        if position > 0 && start < previous_end {
            return Err(PipelineError::InvalidTimeRange(format!(
                "range [{start}, {end}) overlaps or precedes the range ending at {previous_end}"
            )));
        }
        indices.extend(start..end);
        previous_end = end;
    }
    Ok(indices)
}

fn format_ranges(ranges: &[(usize, usize)]) -> String {
    let pairs: Vec<String> = ranges
        .iter()
        .map(|(start, end)| format!("[{start}, {end}]"))
        .collect();
    format!("[{}]", pairs.join(", "))
}
