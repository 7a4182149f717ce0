pub mod chart;
pub mod config;
pub mod dates;
pub mod download;
pub mod error;
pub mod ingest;
pub mod metric;
pub mod population;
pub mod region;

pub use error::{Error, Result};
pub use metric::MetricConfig;
pub use region::{Region, Series};
