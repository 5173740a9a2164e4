//! Backend-agnostic query IR.
//!
//! The clause tree and aggregation descriptors produced by the builder and
//! the query-string parsers, and consumed by the renderers.

pub mod aggregation;
pub mod clause;

pub use aggregation::{
    Aggregation, AggregationKind, Aggregations, DateHistogramAggregation, DateRangeAggregation,
    DateRangeBucket, FilterAggregation, IntervalKind, MetricAggregation, MetricType,
    PercentilesAggregation, PipelineAggregation, PipelineType, TermsAggregation,
};
pub use clause::{
    bool_query, exists_query, filter_query, fuzzy_query, hybrid_query, in_query, match_phrase_query,
    match_query, multi_match_query, must_not_query, must_query, nested_query, not_in_query,
    prefix_query, query_string_query, range, regexp_query, semantic_query, should_query,
    term_query, wildcard_query, BoolClause, BoolKind, Clause, Leaf, LeafValue, Operator,
    RangeBuilder,
};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    /// Parse `asc`/`desc`, ignoring case
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("asc") {
            Some(SortOrder::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Some(SortOrder::Desc)
        } else {
            None
        }
    }

    /// Direction used when none is given: relevance sorts best-first,
    /// everything else ascending
    pub fn default_for(field: &str) -> Self {
        if field == "_score" {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One sort key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

impl Sort {
    pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            field: field.into(),
            order,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortOrder::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortOrder::Desc)
    }
}

/// A field name with an optional `^boost` suffix, e.g. `title^3`
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub boost: f64,
}

impl FieldSpec {
    /// Split `name^boost`; a missing or unparsable boost counts as 1
    pub fn parse(spec: &str) -> Self {
        let spec = spec.trim();
        match spec.rsplit_once('^') {
            Some((name, boost)) => match boost.parse::<f64>() {
                Ok(boost) if boost.is_finite() && boost > 0.0 => Self {
                    name: name.to_string(),
                    boost,
                },
                _ => Self {
                    name: name.to_string(),
                    boost: 1.0,
                },
            },
            None => Self {
                name: spec.to_string(),
                boost: 1.0,
            },
        }
    }
}
