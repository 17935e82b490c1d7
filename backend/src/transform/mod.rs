//! Fuel log transformation.
//!
//! - Normalize: raw text table to typed records
//! - Derive: total cost and per-vehicle mileage
//! - Filter: facet selections and sidebar options
//! - Aggregate: metrics and chart series
//! - Pipeline: the steps chained for an upload or a filter change

pub mod aggregate;
pub mod derive;
pub mod filter;
pub mod normalize;
pub mod pipeline;

pub use aggregate::{aggregate, charts, metrics, Aggregates};
pub use derive::derive;
pub use filter::{facet_options, filter};
pub use normalize::{normalize, normalize_header, parse_date, parse_number};
pub use pipeline::*;
