use crate::error::{CloudMaskError, Result};
use crate::subdatasets::{open_container, subdatasets_of, Subdataset};
use gdal::cpl::CslStringList;
use gdal::{Dataset, DriverManager};
use log::{info, warn};
use std::path::{Path, PathBuf};

/// What to translate, resolved from the subdataset list and the requested index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionSource {
    WholeFile,
    Subdataset(String),
}

/// Resolve the requested subdataset index against the enumerated list
pub fn resolve_source(subdatasets: &[Subdataset], index: Option<i64>) -> Result<ConversionSource> {
    if subdatasets.is_empty() {
        return Ok(ConversionSource::WholeFile);
    }

    let Some(index) = index else {
        return Ok(ConversionSource::WholeFile);
    };

    let count = subdatasets.len();
    if index < 0 || index as usize >= count {
        return Err(CloudMaskError::IndexOutOfRange { index, count });
    }

    Ok(ConversionSource::Subdataset(subdatasets[index as usize].name.clone()))
}

/// Translate a subdataset (or the whole file) into NetCDF with GDAL.
///
/// `index = None` converts the whole file. Returns the output path.
pub fn convert_to_netcdf<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    index: Option<i64>,
    out_path: Q,
) -> Result<PathBuf> {
    let input = input.as_ref();
    let out_path = out_path.as_ref();

    let source = {
        let dataset = open_container(input)?;
        resolve_source(&subdatasets_of(&dataset), index)?
    };

    let dataset = match &source {
        ConversionSource::WholeFile => {
            warn!("No subdataset selected; attempting to translate the whole dataset");
            open_container(input)?
        }
        ConversionSource::Subdataset(name) => {
            info!("Converting subdataset: {}", name);
            Dataset::open(Path::new(name)).map_err(|e| {
                CloudMaskError::Conversion(format!("cannot open subdataset {}: {}", name, e))
            })?
        }
    };

    translate_to_netcdf(&dataset, out_path)?;
    Ok(out_path.to_path_buf())
}

fn translate_to_netcdf(dataset: &Dataset, out_path: &Path) -> Result<()> {
    let driver = DriverManager::get_driver_by_name("netCDF")
        .map_err(|e| CloudMaskError::Conversion(format!("netCDF driver unavailable: {}", e)))?;

    let options = CslStringList::new();
    let copy = dataset
        .create_copy(&driver, out_path, &options)
        .map_err(|e| {
            CloudMaskError::Conversion(format!(
                "GDAL could not translate to {}: {}",
                out_path.display(),
                e
            ))
        })?;

    // Flush and close before the file is reopened by libnetcdf
    drop(copy);
    info!("Wrote NetCDF: {}", out_path.display());
    Ok(())
}
