use std::path::Path;

use adcpnc_core::Dataset;
use anyhow::Result;

#[cfg(feature = "netcdf")]
pub fn read_dataset(path: &Path) -> Result<Dataset> {
    Ok(adcpnc_core::output::read_netcdf(path)?)
}

#[cfg(feature = "netcdf")]
pub fn write_dataset(ds: &Dataset, path: &Path) -> Result<()> {
    Ok(adcpnc_core::output::write_netcdf(ds, path)?)
}

#[cfg(not(feature = "netcdf"))]
pub fn read_dataset(path: &Path) -> Result<Dataset> {
    anyhow::bail!(
        "cannot read {}: adcpnc was built without NetCDF support (rebuild with `--features netcdf`)",
        path.display()
    )
}

#[cfg(not(feature = "netcdf"))]
pub fn write_dataset(_ds: &Dataset, path: &Path) -> Result<()> {
    anyhow::bail!(
        "cannot write {}: adcpnc was built without NetCDF support (rebuild with `--features netcdf`)",
        path.display()
    )
}
