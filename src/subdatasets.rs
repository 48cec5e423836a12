use crate::error::{CloudMaskError, Result};
use gdal::{Dataset, Metadata};
use log::debug;
use std::collections::BTreeMap;
use std::path::Path;

/// A named sub-array addressable through GDAL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subdataset {
    /// GDAL connection string, e.g. `HDF5:"FY4B.HDF"://NOMChannel01`
    pub name: String,
    pub description: String,
}

/// Open a container with GDAL, mapping failure to `ContainerOpen`
pub fn open_container(path: &Path) -> Result<Dataset> {
    Dataset::open(path).map_err(|source| CloudMaskError::ContainerOpen {
        path: path.display().to_string(),
        source,
    })
}

/// List subdatasets of a container, in GDAL's order.
///
/// An empty list is not an error; the caller treats the whole file as one array.
pub fn list_subdatasets<P: AsRef<Path>>(path: P) -> Result<Vec<Subdataset>> {
    let dataset = open_container(path.as_ref())?;
    Ok(subdatasets_of(&dataset))
}

/// Read the SUBDATASETS metadata domain of an already-open dataset
pub fn subdatasets_of(dataset: &Dataset) -> Vec<Subdataset> {
    let entries = dataset.metadata_domain("SUBDATASETS").unwrap_or_default();
    debug!("SUBDATASETS domain has {} entries", entries.len());
    parse_subdataset_metadata(&entries)
}

/// Pair up `SUBDATASET_<n>_NAME` / `SUBDATASET_<n>_DESC` entries, ordered by `n`
pub fn parse_subdataset_metadata(entries: &[String]) -> Vec<Subdataset> {
    let mut names: BTreeMap<usize, String> = BTreeMap::new();
    let mut descriptions: BTreeMap<usize, String> = BTreeMap::new();

    for entry in entries {
        let Some((key, value)) = entry.split_once('=') else {
            continue;
        };
        let Some(rest) = key.strip_prefix("SUBDATASET_") else {
            continue;
        };
        let Some((index, field)) = rest.split_once('_') else {
            continue;
        };
        let Ok(index) = index.parse::<usize>() else {
            continue;
        };

        match field {
            "NAME" => {
                names.insert(index, value.to_string());
            }
            "DESC" => {
                descriptions.insert(index, value.to_string());
            }
            _ => {}
        }
    }

    names
        .into_iter()
        .map(|(index, name)| Subdataset {
            name,
            description: descriptions.remove(&index).unwrap_or_default(),
        })
        .collect()
}
