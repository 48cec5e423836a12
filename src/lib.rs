// Library exports for testing and reuse

pub mod classify;
pub mod cli;
pub mod config;
pub mod convert;
pub mod detect;
pub mod error;
pub mod io;
pub mod morphology;
pub mod pipeline;
pub mod polygonize;
pub mod subdatasets;
pub mod visualize;

// Re-export commonly used types
pub use classify::{classify, ClassifierParams};
pub use config::RunConfig;
pub use error::{CloudMaskError, Result};
pub use pipeline::{run, RunSummary};
pub use polygonize::{polygonize_mask, PolygonSet};
