pub mod aggregate;
pub mod forecast;
pub mod loader;
pub mod margin;
pub mod render;
pub mod selector;

pub use forecast::ForecastSettings;
pub use loader::{ColumnMapping, TableReader};
