//! HTTP query-string parser.
//!
//! Turns the search parameters of a request into a [`QueryBuilder`]:
//! - `query=<text>` or `query=<field>:<text>` (fuzziness cascade)
//! - `filter=...`, repeatable (see [`crate::syntax::filter`])
//! - `sort=<field>[:asc|desc][,...]`
//! - `from=<int>`, `size=<int>`
//! - `fields=<csv>`, where a `-` prefix excludes the field
//! - `fuzziness=0..5`
//!
//! Unknown parameters and unparsable numbers are skipped. Aggregation keys
//! (`agg[...]`) are left to [`crate::syntax::aggregation`].

use crate::builder::QueryBuilder;
use crate::config::{QueryConfig, MAX_FUZZINESS};
use crate::error::ParseError;
use crate::ir::{Sort, SortOrder};
use crate::syntax::filter::parse_filter;
use crate::syntax::params::QueryParams;
use tracing::trace;

/// Query-string parser bound to a configuration
#[derive(Debug, Clone, Default)]
pub struct QueryStringParser {
    config: QueryConfig,
}

impl QueryStringParser {
    pub fn new(config: QueryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Parse the request parameters into an unbuilt query builder
    pub fn parse(&self, params: &QueryParams) -> Result<QueryBuilder, ParseError> {
        let mut builder = QueryBuilder::with_config(&self.config);

        for (key, value) in params.iter() {
            builder = match key {
                "query" => builder.query(value),
                "filter" => {
                    let clause = parse_filter(value)?.into_clause(&self.config.default_fields);
                    builder.filter(clause)
                }
                "sort" => builder.sorts(parse_sort(value)),
                "from" => match parse_count(key, value) {
                    Some(from) => builder.from(from),
                    None => builder,
                },
                "size" => match parse_count(key, value) {
                    Some(size) => builder.size(self.config.cap_size(size)),
                    None => builder,
                },
                "fields" => {
                    let (includes, excludes) = parse_fields(value);
                    builder.include(includes).exclude(excludes)
                }
                "fuzziness" => match value.trim().parse::<u8>() {
                    Ok(level) if level <= MAX_FUZZINESS => builder.fuzziness(level),
                    _ => {
                        trace!(value = %value, "ignoring out-of-range fuzziness");
                        builder
                    }
                },
                _ if key.starts_with("agg") => builder,
                _ => {
                    trace!(key = %key, "ignoring unknown query parameter");
                    builder
                }
            };
        }

        Ok(builder)
    }
}

fn parse_count(key: &str, value: &str) -> Option<usize> {
    match value.trim().parse::<usize>() {
        Ok(n) => Some(n),
        Err(_) => {
            trace!(key = %key, value = %value, "ignoring unparsable count");
            None
        }
    }
}

/// Parse `field[:order],...`; a missing or unknown order falls back to
/// [`SortOrder::default_for`]
pub fn parse_sort(value: &str) -> Vec<Sort> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| {
            let (field, order) = match part.split_once(':') {
                Some((field, order)) => (field.trim(), SortOrder::parse(order.trim())),
                None => (part, None),
            };
            if field.is_empty() {
                return None;
            }
            Some(Sort::new(
                field,
                order.unwrap_or_else(|| SortOrder::default_for(field)),
            ))
        })
        .collect()
}

/// Split a `fields` list into included and excluded source fields
fn parse_fields(value: &str) -> (Vec<String>, Vec<String>) {
    let mut includes = Vec::new();
    let mut excludes = Vec::new();

    for field in value.split(',').map(str::trim).filter(|f| !f.is_empty()) {
        match field.strip_prefix('-') {
            Some(excluded) if !excluded.is_empty() => excludes.push(excluded.to_string()),
            Some(_) => {}
            None => includes.push(field.to_string()),
        }
    }

    (includes, excludes)
}
