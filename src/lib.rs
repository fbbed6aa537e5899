pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;
pub use config::SalesConfig;

pub use crate::adapters::LocalStorage;
pub use crate::core::{etl::EtlEngine, pipeline::SalesPipeline};
pub use utils::error::{EtlError, Result};
