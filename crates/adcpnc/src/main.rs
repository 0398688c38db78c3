use std::fs;
use std::path::{Path, PathBuf};

use adcpnc_core::output::prepare_for_output;
use adcpnc_core::{convert, ConversionConfig, ConversionReport, OutputMode};
use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod io;
mod summary;

/// Convert a raw current-profiler .cdf file into an EPIC-compliant NetCDF file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Raw .cdf file to convert
    cdfname: PathBuf,

    /// .cdf file holding atmospheric pressure (`atmpres`) to subtract
    #[arg(long)]
    atmpres: Option<PathBuf>,

    /// Global attribute file (`key; value` rows) or TOML table merged over the raw attributes
    #[arg(long)]
    metadata: Option<PathBuf>,

    /// Keep beam velocities and amplitudes (waves burst output)
    #[arg(long)]
    waves: bool,

    /// Output file; defaults to `<filename>.nc`
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print a variable summary table
    #[arg(long)]
    summary: bool,

    /// Write the conversion report as JSON
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Serialize)]
struct RunReport<'a> {
    input: &'a Path,
    output: &'a Path,
    #[serde(flatten)]
    conversion: &'a ConversionReport,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();

    let mut raw = io::read_dataset(&cli.cdfname)
        .with_context(|| format!("failed to load raw file {}", cli.cdfname.display()))?;

    if let Some(path) = &cli.metadata {
        let metadata = adcpnc_meta::read_metadata_file(path)
            .with_context(|| format!("failed to read metadata file {}", path.display()))?;
        info!(keys = metadata.len(), path = %path.display(), "merging metadata");
        raw.attrs.extend_from(&metadata);
    }

    let mut config =
        ConversionConfig::from_attributes(&raw.attrs).context("invalid deployment metadata")?;
    if cli.waves {
        config = config.with_mode(OutputMode::Waves);
    }

    let atmospheric = cli
        .atmpres
        .as_deref()
        .map(|path| {
            io::read_dataset(path)
                .with_context(|| format!("failed to load atmospheric pressure file {}", path.display()))
        })
        .transpose()?;

    let conversion = convert(raw, atmospheric.as_ref(), &config).context("conversion failed")?;
    for warning in &conversion.report.warnings {
        warn!(%warning, "conversion warning");
    }

    let output = match &cli.output {
        Some(path) => path.clone(),
        None => default_output_path(&cli.cdfname, config.filename.as_deref()),
    };
    let dataset = prepare_for_output(conversion.dataset).context("failed to prepare output")?;
    io::write_dataset(&dataset, &output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!(path = %output.display(), "done writing netCDF file");

    if cli.summary {
        summary::print_summary(&dataset, &conversion.report);
    }

    if let Some(path) = &cli.report {
        write_report(path, &cli.cdfname, &output, &conversion.report)?;
    }
    Ok(())
}

fn default_output_path(input: &Path, filename: Option<&str>) -> PathBuf {
    let stem = filename
        .map(str::to_string)
        .or_else(|| input.file_stem().map(|stem| stem.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{stem}.nc"))
}

fn write_report(path: &Path, input: &Path, output: &Path, report: &ConversionReport) -> Result<()> {
    let report = RunReport {
        input,
        output,
        conversion: report,
    };
    let json = serde_json::to_string_pretty(&report).context("failed to serialize report")?;
    fs::write(path, json).with_context(|| format!("failed to write report {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_defaults_to_metadata_filename() {
        let path = default_output_path(Path::new("/data/1126aqd-raw.cdf"), Some("1126aqd"));
        assert_eq!(path, PathBuf::from("/data/1126aqd.nc"));
    }

    #[test]
    fn output_falls_back_to_input_stem() {
        let path = default_output_path(Path::new("/data/1126aqd-raw.cdf"), None);
        assert_eq!(path, PathBuf::from("/data/1126aqd-raw.nc"));
    }
}
