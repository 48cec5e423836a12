use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "fy4-cloud-mask")]
#[command(about = "Rule-based visible-band cloud detection for FY-4 L1 HDF files")]
#[command(version)]
pub struct Args {
    /// Input FY-4 HDF file (HDF4 or HDF5)
    #[arg(short, long, value_name = "FILE")]
    pub input: String,

    /// Visible band variable name in the converted NetCDF
    #[arg(long, value_name = "NAME", default_value = "MULTI")]
    pub var_name: String,

    /// Subdataset to convert when the container has several
    #[arg(long, value_name = "INDEX", default_value_t = 0, allow_negative_numbers = true)]
    pub subdataset_index: i64,

    /// Convert the whole file instead of a subdataset
    #[arg(long)]
    pub whole_file: bool,

    /// Converted NetCDF path
    #[arg(long, value_name = "FILE", default_value = "fy4_converted.nc")]
    pub out_nc: String,

    /// Cloud mask NetCDF path
    #[arg(long, value_name = "FILE", default_value = "fy4_cloud_mask.nc")]
    pub out_mask: String,

    /// Visualization PNG path
    #[arg(long, value_name = "FILE", default_value = "fy4_clouds.png")]
    pub out_plot: String,

    /// Visible reflectance threshold
    #[arg(long, value_name = "VALUE", default_value_t = 0.25)]
    pub th_vis: f32,

    /// Minimum cloud component area in pixels
    #[arg(long, value_name = "PIXELS", default_value_t = 100)]
    pub min_area: usize,

    /// Export mask polygons as GeoJSON to this path
    #[arg(long, value_name = "FILE")]
    pub out_polygons: Option<String>,

    /// Minimum polygon area in pixels
    #[arg(long, value_name = "PIXELS", default_value_t = 10.0)]
    pub min_polygon_area: f64,

    /// Upsampling factor for the plot
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub plot_scale: u32,

    /// Number of threads (default: all available)
    #[arg(short, long, value_name = "N")]
    pub threads: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["fy4-cloud-mask", "--input", "FY4B.HDF"]).unwrap();
        assert_eq!(args.var_name, "MULTI");
        assert_eq!(args.subdataset_index, 0);
        assert_eq!(args.out_nc, "fy4_converted.nc");
        assert_eq!(args.out_mask, "fy4_cloud_mask.nc");
        assert_eq!(args.out_plot, "fy4_clouds.png");
        assert!((args.th_vis - 0.25).abs() < 1e-6);
        assert_eq!(args.min_area, 100);
        assert!(args.out_polygons.is_none());
    }

    #[test]
    fn test_input_required() {
        assert!(Args::try_parse_from(["fy4-cloud-mask"]).is_err());
    }

    #[test]
    fn test_negative_subdataset_index_parses() {
        let args = Args::try_parse_from([
            "fy4-cloud-mask",
            "-i",
            "FY4B.HDF",
            "--subdataset-index",
            "-1",
        ])
        .unwrap();
        assert_eq!(args.subdataset_index, -1);
    }
}
