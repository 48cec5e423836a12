use clap::Parser;
use env_logger::Env;
use log::info;

use fy4_cloud_mask::cli::Args;
use fy4_cloud_mask::{pipeline, Result, RunConfig};

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logger
    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    info!("=== FY-4 Cloud Detection ===");

    // Set thread pool size if specified
    if let Some(n_threads) = args.threads {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .build_global()
        {
            log::warn!("Failed to build thread pool: {}", e);
        } else {
            info!("Using {} threads", n_threads);
        }
    } else {
        info!("Using all available threads");
    }

    let config = RunConfig::from(&args);
    let summary = pipeline::run(&config)?;

    info!(
        "Cloud pixels: {} of {}x{} ({})",
        summary.cloud_pixels, summary.mask_shape.1, summary.mask_shape.0, summary.variable
    );
    if let Some(plot) = &summary.plot_path {
        info!("Saved plot to {}", plot.display());
    }
    if let Some(n) = summary.polygon_count {
        info!("Exported {} polygons", n);
    }

    info!("=== Done! ===");
    Ok(())
}
