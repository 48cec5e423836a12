use crate::error::{CloudMaskError, Result};
use crate::morphology::{binary_closing, remove_small_objects};
use log::{debug, info};
use ndarray::Array2;

/// Visible-band cloud detector parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierParams {
    /// Reflectance threshold; pixels strictly above it are cloud candidates
    pub threshold: f32,
    /// Minimum connected-component area in pixels
    pub min_area: usize,
    /// Radius of the disk used for closing
    pub closing_radius: usize,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            threshold: 0.25,
            min_area: 100,
            closing_radius: 5,
        }
    }
}

/// Maximum ignoring NaN; `None` when every value is NaN (or the array is empty)
pub fn nanmax(data: &Array2<f32>) -> Option<f32> {
    data.iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(None, |acc, v| Some(acc.map_or(v, |m: f32| m.max(v))))
}

/// Magnitude-based DN to reflectance guess.
///
/// max in (1, 10000] divides by 1000, max in (1, 65535] divides by 65535,
/// anything else is returned unchanged.
pub fn auto_rescale(data: &Array2<f32>) -> Array2<f32> {
    let Some(max) = nanmax(data) else {
        debug!("All values are NaN, skipping rescale");
        return data.clone();
    };

    let divisor = if max > 1.0 && max <= 10000.0 {
        Some(1000.0)
    } else if max > 1.0 && max <= 65535.0 {
        Some(65535.0)
    } else {
        None
    };

    match divisor {
        Some(d) => {
            info!("Rescaling band (max {:.3}) by 1/{}", max, d);
            data.mapv(|v| v / d)
        }
        None => {
            debug!("Band max {:.3}, no rescale applied", max);
            data.clone()
        }
    }
}

/// Candidate pixels with value strictly greater than `threshold`
pub fn threshold_mask(data: &Array2<f32>, threshold: f32) -> Array2<bool> {
    // NaN > x is false
    data.mapv(|v| v > threshold)
}

/// Rule-based visible-band cloud mask: rescale, threshold, close, drop small objects
pub fn classify(vis: &Array2<f32>, params: &ClassifierParams) -> Result<Array2<bool>> {
    if !params.threshold.is_finite() {
        return Err(CloudMaskError::InvalidThreshold(params.threshold));
    }

    let (nrows, ncols) = vis.dim();
    info!(
        "Classifying {}x{} band (threshold {}, min area {})",
        ncols, nrows, params.threshold, params.min_area
    );

    let reflectance = auto_rescale(vis);
    let candidates = threshold_mask(&reflectance, params.threshold);
    debug!("{} candidate pixels", count_true(&candidates));

    let closed = binary_closing(&candidates, params.closing_radius);
    let mask = remove_small_objects(&closed, params.min_area);

    info!("Cloud pixels: {} of {}", count_true(&mask), nrows * ncols);
    Ok(mask)
}

pub fn count_true(mask: &Array2<bool>) -> usize {
    mask.iter().filter(|&&v| v).count()
}
