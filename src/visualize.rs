use crate::classify::nanmax;
use crate::error::{CloudMaskError, Result};
use crate::morphology::outer_boundary;
use image::{Rgb, RgbImage};
use log::{info, warn};
use ndarray::{Array2, Array3};
use std::path::{Path, PathBuf};
use std::process::Command;

const OVERLAY_GREY: [f32; 3] = [0.5, 0.5, 0.5];
const BOUNDARY_RED: Rgb<u8> = Rgb([255, 0, 0]);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotOptions {
    /// Opacity of the grey mask overlay
    pub alpha: f32,
    /// Each raster pixel becomes a `scale x scale` block
    pub scale: u32,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            alpha: 0.4,
            scale: 1,
        }
    }
}

/// Grey true-colour image from a single band; DN-scaled bands (max > 1) are divided by 10000
pub fn truecolor_from_band(band: &Array2<f32>) -> Array3<f32> {
    let divisor = match nanmax(band) {
        Some(max) if max > 1.0 => 10000.0,
        _ => 1.0,
    };

    let grey = band.mapv(|v| if v.is_nan() { 0.0 } else { v / divisor });
    let (nrows, ncols) = grey.dim();
    Array3::from_shape_fn((nrows, ncols, 3), |(r, c, _)| grey[[r, c]])
}

/// Render the mask over an RGB image with a red boundary.
///
/// Returns the image without writing it anywhere.
pub fn render_truecolor_with_mask(
    rgb: &Array3<f32>,
    mask: &Array2<bool>,
    options: &PlotOptions,
) -> Result<RgbImage> {
    let (nrows, ncols, channels) = rgb.dim();
    if channels != 3 {
        return Err(CloudMaskError::InvalidDimensions(
            "rgb".to_string(),
            rgb.shape().to_vec(),
        ));
    }
    if mask.dim() != (nrows, ncols) {
        return Err(CloudMaskError::ShapeMismatch {
            expected: (nrows, ncols),
            actual: mask.dim(),
        });
    }

    let boundary = outer_boundary(mask);
    let alpha = options.alpha.clamp(0.0, 1.0);
    let scale = options.scale.max(1);
    let (width, height) = match (
        u32::try_from(ncols).ok().and_then(|n| n.checked_mul(scale)),
        u32::try_from(nrows).ok().and_then(|n| n.checked_mul(scale)),
    ) {
        (Some(width), Some(height)) => (width, height),
        _ => {
            return Err(CloudMaskError::InvalidDimensions(
                "plot".to_string(),
                vec![nrows, ncols, scale as usize],
            ))
        }
    };
    let mut img = RgbImage::new(width, height);

    for r in 0..nrows {
        for c in 0..ncols {
            let color = if boundary[[r, c]] {
                BOUNDARY_RED
            } else {
                let mut out = [0u8; 3];
                for (k, value) in out.iter_mut().enumerate() {
                    let raw = rgb[[r, c, k]];
                    let mut v = if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 1.0) };
                    if mask[[r, c]] {
                        v = v * (1.0 - alpha) + OVERLAY_GREY[k] * alpha;
                    }
                    *value = (v * 255.0).round() as u8;
                }
                Rgb(out)
            };

            let (x0, y0) = (c as u32 * scale, r as u32 * scale);
            for dy in 0..scale {
                for dx in 0..scale {
                    img.put_pixel(x0 + dx, y0 + dy, color);
                }
            }
        }
    }

    Ok(img)
}

/// Plot to `out` as PNG, or to a temporary PNG opened in the system viewer when `out` is `None`
pub fn plot_truecolor_with_mask(
    rgb: &Array3<f32>,
    mask: &Array2<bool>,
    out: Option<&Path>,
    options: &PlotOptions,
) -> Result<PathBuf> {
    let img = render_truecolor_with_mask(rgb, mask, options)?;

    match out {
        Some(path) => {
            img.save(path)?;
            info!("Saved plot to {}", path.display());
            Ok(path.to_path_buf())
        }
        None => {
            let path = std::env::temp_dir().join(format!("fy4_clouds_{}.png", std::process::id()));
            img.save(&path)?;
            show(&path);
            Ok(path)
        }
    }
}

fn show(path: &Path) {
    let viewer = if cfg!(target_os = "macos") {
        Command::new("open").arg(path).spawn()
    } else if cfg!(target_os = "windows") {
        Command::new("cmd").args(["/C", "start", ""]).arg(path).spawn()
    } else {
        Command::new("xdg-open").arg(path).spawn()
    };

    match viewer {
        Ok(_) => info!("Opened plot {} in viewer", path.display()),
        Err(e) => warn!("No viewer available ({}); plot left at {}", e, path.display()),
    }
}
