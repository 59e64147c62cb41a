//! Domain types for the rotation pipeline

pub mod bar;
pub mod portfolio;
pub mod signal;

pub use bar::PriceBar;
pub use portfolio::Portfolio;
pub use signal::{Leg, Signal, Tickers};
