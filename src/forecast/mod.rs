pub mod fetcher;
pub mod normalizer;

pub use fetcher::{ForecastSource, SmhiForecastClient};
pub use normalizer::{normalize, render_forecast};
