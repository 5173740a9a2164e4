//! Request syntax parsers.
//!
//! Untrusted HTTP query-string input is decoded into [`QueryParams`] and then
//! read by two parsers: [`QueryStringParser`] for the search parameters and
//! [`parse_aggregations`] for `agg[...]` bracket notation. Both report bad
//! input as [`ParseError`]; unknown parameters are skipped.

pub mod aggregation;
mod common;
pub mod filter;
pub mod params;
pub mod query_string;

pub use aggregation::parse_aggregations;
pub use filter::{parse_filter, FilterExpr, FilterSpec, RangeOp};
pub use params::QueryParams;
pub use query_string::{parse_sort, QueryStringParser};

use crate::builder::QueryBuilder;
use crate::config::QueryConfig;
use crate::error::ParseError;

/// Parse a whole search request (search parameters and aggregations)
pub fn parse_request(params: &QueryParams, config: &QueryConfig) -> Result<QueryBuilder, ParseError> {
    let builder = QueryStringParser::new(config.clone()).parse(params)?;
    let aggregations = parse_aggregations(params)?;
    Ok(builder.aggregations(aggregations))
}
