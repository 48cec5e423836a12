use crate::classify::{classify, count_true};
use crate::config::{RunConfig, TRUECOLOR_VARIABLE};
use crate::convert::convert_to_netcdf;
use crate::detect::{detect_container, ContainerKind};
use crate::error::Result;
use crate::io::{write_mask_netcdf, ConvertedDataset, RasterBand};
use crate::polygonize::{polygonize_mask, write_geojson};
use crate::subdatasets::list_subdatasets;
use crate::visualize::{plot_truecolor_with_mask, truecolor_from_band};
use log::{debug, info, warn};
use std::path::PathBuf;

/// What a run produced
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub container: ContainerKind,
    pub subdataset_count: usize,
    pub variable: String,
    pub mask_shape: (usize, usize),
    pub cloud_pixels: usize,
    pub converted_path: PathBuf,
    pub mask_path: PathBuf,
    pub plot_path: Option<PathBuf>,
    pub polygon_count: Option<usize>,
}

/// Detect, enumerate, convert, classify, export and plot, in that order
pub fn run(config: &RunConfig) -> Result<RunSummary> {
    let container = detect_container(&config.input);
    info!("Detected HDF type: {}", container);

    let subdatasets = list_subdatasets(&config.input)?;
    info!("Found {} subdatasets (GDAL)", subdatasets.len());
    for (i, sds) in subdatasets.iter().enumerate() {
        info!("  {} {}", i, sds.name);
        debug!("     {}", sds.description);
    }

    let converted_path =
        convert_to_netcdf(&config.input, config.subdataset_index, &config.out_nc)?;
    info!("Converted to {}", converted_path.display());

    let dataset = ConvertedDataset::open(&converted_path)?;
    let names: Vec<String> = dataset.variables().into_iter().map(|v| v.name).collect();
    info!("Converted dataset variables: {:?}", names);

    let variable = dataset.select_variable(&config.var_name)?;
    info!("Using variable {}", variable);

    let band = dataset.read_band(&variable)?;
    if let Some(units) = &band.units {
        debug!("Band units: {}", units);
    }

    let mask = classify(&band.data, &config.classifier)?;
    let cloud_pixels = count_true(&mask);

    let coordinates = dataset.coordinates(&band);
    write_mask_netcdf(&mask, &config.out_mask, Some(&coordinates), &config.mask_var_name)?;
    info!("Saved cloud mask to {}", config.out_mask.display());

    let plot_path = match truecolor_band(&dataset, &band, mask.dim()) {
        Some(truecolor) => {
            let rgb = truecolor_from_band(&truecolor.data);
            Some(plot_truecolor_with_mask(
                &rgb,
                &mask,
                config.out_plot.as_deref(),
                &config.plot,
            )?)
        }
        None => None,
    };

    let polygon_count = match &config.out_polygons {
        Some(path) => {
            let polygons = polygonize_mask(&mask, config.min_polygon_area);
            write_geojson(&polygons, path)?;
            Some(polygons.len())
        }
        None => None,
    };

    Ok(RunSummary {
        container,
        subdataset_count: subdatasets.len(),
        variable,
        mask_shape: mask.dim(),
        cloud_pixels,
        converted_path,
        mask_path: config.out_mask.clone(),
        plot_path,
        polygon_count,
    })
}

/// The `MULTI` band to draw under the mask, or `None` when it is absent or unusable
fn truecolor_band(
    dataset: &ConvertedDataset,
    band: &RasterBand,
    shape: (usize, usize),
) -> Option<RasterBand> {
    if !dataset.has_variable(TRUECOLOR_VARIABLE) {
        info!("No {} variable for true colour, skipping plot", TRUECOLOR_VARIABLE);
        return None;
    }

    let truecolor = if band.name == TRUECOLOR_VARIABLE {
        band.clone()
    } else {
        match dataset.read_band(TRUECOLOR_VARIABLE) {
            Ok(truecolor) => truecolor,
            Err(e) => {
                warn!(
                    "Cannot read {} for true colour, skipping plot: {}",
                    TRUECOLOR_VARIABLE, e
                );
                return None;
            }
        }
    };

    if truecolor.data.dim() != shape {
        warn!(
            "{} shape {:?} differs from mask {:?}, skipping plot",
            TRUECOLOR_VARIABLE,
            truecolor.data.dim(),
            shape
        );
        return None;
    }
    Some(truecolor)
}
