use crate::classify::ClassifierParams;
use crate::cli::Args;
use crate::visualize::PlotOptions;
use std::path::PathBuf;

/// Variable name of the exported mask
pub const MASK_VARIABLE: &str = "cloud_mask";

/// Variable used to build the true-colour image
pub const TRUECOLOR_VARIABLE: &str = "MULTI";

/// Everything one run needs, passed explicitly into `pipeline::run`
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input: PathBuf,
    pub var_name: String,
    /// `None` converts the whole file
    pub subdataset_index: Option<i64>,
    pub out_nc: PathBuf,
    pub out_mask: PathBuf,
    pub mask_var_name: String,
    /// `None` shows the plot instead of saving it
    pub out_plot: Option<PathBuf>,
    pub out_polygons: Option<PathBuf>,
    pub min_polygon_area: f64,
    pub classifier: ClassifierParams,
    pub plot: PlotOptions,
}

impl RunConfig {
    pub fn new<P: Into<PathBuf>>(input: P) -> Self {
        Self {
            input: input.into(),
            var_name: TRUECOLOR_VARIABLE.to_string(),
            subdataset_index: Some(0),
            out_nc: PathBuf::from("fy4_converted.nc"),
            out_mask: PathBuf::from("fy4_cloud_mask.nc"),
            mask_var_name: MASK_VARIABLE.to_string(),
            out_plot: Some(PathBuf::from("fy4_clouds.png")),
            out_polygons: None,
            min_polygon_area: 10.0,
            classifier: ClassifierParams::default(),
            plot: PlotOptions::default(),
        }
    }
}

impl From<&Args> for RunConfig {
    fn from(args: &Args) -> Self {
        Self {
            input: PathBuf::from(&args.input),
            var_name: args.var_name.clone(),
            subdataset_index: if args.whole_file {
                None
            } else {
                Some(args.subdataset_index)
            },
            out_nc: PathBuf::from(&args.out_nc),
            out_mask: PathBuf::from(&args.out_mask),
            mask_var_name: MASK_VARIABLE.to_string(),
            out_plot: Some(PathBuf::from(&args.out_plot)),
            out_polygons: args.out_polygons.as_ref().map(PathBuf::from),
            min_polygon_area: args.min_polygon_area,
            classifier: ClassifierParams {
                threshold: args.th_vis,
                min_area: args.min_area,
                ..ClassifierParams::default()
            },
            plot: PlotOptions {
                scale: args.plot_scale,
                ..PlotOptions::default()
            },
        }
    }
}
