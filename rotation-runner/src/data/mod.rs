//! Market data: provider trait, Yahoo and CSV sources, multi-ticker loading.

pub mod align;
pub mod csv_import;
pub mod provider;
pub mod yahoo;

pub use align::{fetch_histories, MarketHistory};
pub use csv_import::CsvProvider;
pub use provider::{normalize_bars, DataError, DataSource, MarketData};
pub use yahoo::YahooProvider;
