use thiserror::Error;

#[derive(Error, Debug)]
pub enum CloudMaskError {
    #[error("GDAL can not open file: {path}: {source}")]
    ContainerOpen {
        path: String,
        #[source]
        source: gdal::errors::GdalError,
    },

    #[error("Subdataset index {index} out of range (found {count} subdatasets)")]
    IndexOutOfRange { index: i64, count: usize },

    #[error("Conversion to NetCDF failed: {0}")]
    Conversion(String),

    #[error("No suitable 2D variable found in {0}; specify --var-name")]
    NoSuitableVariable(String),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Array shape error: {0}")]
    ShapeError(#[from] ndarray::ShapeError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Variable not found: {0}")]
    MissingVariable(String),

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Invalid threshold: {0} (must be finite)")]
    InvalidThreshold(f32),

    #[error("Variable {0} has invalid dimensions: {1:?}")]
    InvalidDimensions(String, Vec<usize>),
}

pub type Result<T> = std::result::Result<T, CloudMaskError>;
