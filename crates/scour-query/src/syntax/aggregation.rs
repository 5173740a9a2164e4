//! Bracket-notation aggregation parser.
//!
//! Request keys such as `agg[types][terms][field]=product.keyword` are
//! tokenized, folded into a nested parameter tree and then decoded into
//! [`Aggregation`] values:
//!
//! ```text
//! agg[<name>][terms|date_histogram|percentiles|avg|sum|min|max|cardinality][<param>]=<value>
//! agg[<name>][aggs][<sub>]...
//! ```
//!
//! Known parameters go through a decoder for their field; anything else is
//! kept in the aggregation's parameter bag with numbers coerced (integer,
//! then float, then a comma-separated float list).

use crate::error::ParseError;
use crate::ir::{
    Aggregation, Aggregations, DateHistogramAggregation, IntervalKind, MetricAggregation,
    MetricType, PercentilesAggregation, TermsAggregation,
};
use crate::syntax::params::{unescape, QueryParams};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Number, Value};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::trace;

/// A bare identifier followed by any number of bracketed segments
static KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^\[\]]+)((?:\[[^\[\]]*\])*)$").unwrap());

/// One bracketed segment
static BRACKET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\[\]]*)\]").unwrap());

/// Prefix shared by every aggregation key
const AGG_PREFIX: &str = "agg";

/// Metric keys recognised in bracket notation
const BRACKET_METRICS: [MetricType; 5] = [
    MetricType::Avg,
    MetricType::Sum,
    MetricType::Min,
    MetricType::Max,
    MetricType::Cardinality,
];

/// Node of the intermediate parameter tree
#[derive(Debug, Clone, PartialEq)]
enum ParamNode {
    Scalar(String),
    Map(BTreeMap<String, ParamNode>),
}

type ParamMap = BTreeMap<String, ParamNode>;

/// Parse every `agg[...]` parameter into named aggregations
pub fn parse_aggregations(params: &QueryParams) -> Result<Aggregations, ParseError> {
    let tree = build_tree(params)?;
    let mut aggregations = Aggregations::new();

    for (name, node) in &tree {
        match node {
            ParamNode::Map(map) => {
                if let Some(aggregation) = compile_node(name, map)? {
                    aggregations.insert(name.clone(), aggregation);
                }
            }
            ParamNode::Scalar(_) => trace!(name = %name, "ignoring aggregation without a type"),
        }
    }

    Ok(aggregations)
}

/// Split a key into its unescaped tokens, e.g. `agg[a][b]` into `[agg, a, b]`
fn tokenize(key: &str) -> Option<Vec<String>> {
    let captures = KEY_RE.captures(key)?;

    let mut tokens = vec![unescape(captures[1].trim())];
    tokens.extend(
        BRACKET_RE
            .captures_iter(&captures[2])
            .map(|segment| unescape(&segment[1]))
            .filter(|token| !token.is_empty()),
    );
    Some(tokens)
}

// ============================================================================
// Parameter tree
// ============================================================================

fn build_tree(params: &QueryParams) -> Result<ParamMap, ParseError> {
    let mut root = ParamMap::new();

    for (key, value) in params.iter() {
        if !key.starts_with(AGG_PREFIX) {
            continue;
        }

        let tokens = match tokenize(key) {
            Some(tokens) if tokens[0] == AGG_PREFIX && tokens.len() > 1 => tokens,
            _ => {
                trace!(key = %key, "ignoring malformed aggregation key");
                continue;
            }
        };

        insert(&mut root, &tokens[1..], value, key)?;
    }

    Ok(root)
}

/// Place `value` at `path`, creating groups on the way.
///
/// The first value for a path wins.
fn insert(root: &mut ParamMap, path: &[String], value: &str, key: &str) -> Result<(), ParseError> {
    let conflict = || ParseError::StructureConflict {
        key: key.to_string(),
    };

    let Some((last, parents)) = path.split_last() else {
        return Ok(());
    };

    let mut current = root;
    for token in parents {
        let node = current
            .entry(token.clone())
            .or_insert_with(|| ParamNode::Map(ParamMap::new()));
        current = match node {
            ParamNode::Map(map) => map,
            ParamNode::Scalar(_) => return Err(conflict()),
        };
    }

    match current.entry(last.clone()) {
        Entry::Occupied(entry) => match entry.get() {
            ParamNode::Map(_) => Err(conflict()),
            ParamNode::Scalar(_) => {
                trace!(key = %key, "ignoring repeated aggregation parameter");
                Ok(())
            }
        },
        Entry::Vacant(entry) => {
            entry.insert(ParamNode::Scalar(value.to_string()));
            Ok(())
        }
    }
}

// ============================================================================
// Aggregation compilation
// ============================================================================

fn compile_node(name: &str, map: &ParamMap) -> Result<Option<Aggregation>, ParseError> {
    let mut aggregation = if let Some(node) = map.get("terms") {
        decode_terms(name, group(name, "terms", node)?)?
    } else if let Some(node) = map.get("date_histogram") {
        decode_date_histogram(name, group(name, "date_histogram", node)?)?
    } else if let Some(node) = map.get("percentiles") {
        decode_percentiles(name, group(name, "percentiles", node)?)?
    } else {
        let metrics: Vec<MetricType> = BRACKET_METRICS
            .into_iter()
            .filter(|metric| map.contains_key(metric.as_str()))
            .collect();

        match metrics.as_slice() {
            [metric] => {
                let node = &map[metric.as_str()];
                decode_metric(name, *metric, group(name, metric.as_str(), node)?)?
            }
            _ => {
                trace!(name = %name, "ignoring aggregation with no known type");
                return Ok(None);
            }
        }
    };

    if let Some(node) = map.get("aggs") {
        for (sub_name, sub_node) in group(name, "aggs", node)? {
            let ParamNode::Map(sub_map) = sub_node else {
                trace!(name = %sub_name, "ignoring sub-aggregation without a type");
                continue;
            };
            if let Some(nested) = compile_node(sub_name, sub_map)? {
                aggregation.add_nested(sub_name.clone(), nested);
            }
        }
    }

    Ok(Some(aggregation))
}

fn decode_terms(name: &str, params: &ParamMap) -> Result<Aggregation, ParseError> {
    let mut terms = TermsAggregation::default();
    let mut extra = Map::new();

    for (key, node) in params {
        match key.as_str() {
            "field" => terms.field = string_param(name, key, node)?,
            "include" => terms.include = Some(string_param(name, key, node)?),
            "size" => terms.size = Some(u64_param(name, key, node)?),
            _ => {
                extra.insert(key.clone(), coerce_node(node));
            }
        }
    }

    require_field(name, &terms.field)?;
    Ok(with_params(terms.into(), extra))
}

fn decode_date_histogram(name: &str, params: &ParamMap) -> Result<Aggregation, ParseError> {
    let mut histogram = DateHistogramAggregation::default();
    let mut extra = Map::new();

    for (key, node) in params {
        match key.as_str() {
            "field" => histogram.field = string_param(name, key, node)?,
            "calendar_interval" => {
                histogram.interval = string_param(name, key, node)?;
                histogram.interval_kind = IntervalKind::Calendar;
            }
            "fixed_interval" => {
                histogram.interval = string_param(name, key, node)?;
                histogram.interval_kind = IntervalKind::Fixed;
            }
            "interval" => {
                histogram.interval = string_param(name, key, node)?;
                histogram.interval_kind = IntervalKind::Legacy;
            }
            "format" => histogram.format = Some(string_param(name, key, node)?),
            "time_zone" => histogram.time_zone = Some(string_param(name, key, node)?),
            _ => {
                extra.insert(key.clone(), coerce_node(node));
            }
        }
    }

    require_field(name, &histogram.field)?;
    Ok(with_params(histogram.into(), extra))
}

fn decode_percentiles(name: &str, params: &ParamMap) -> Result<Aggregation, ParseError> {
    let mut percentiles = PercentilesAggregation::default();
    let mut extra = Map::new();

    for (key, node) in params {
        match key.as_str() {
            "field" => percentiles.field = string_param(name, key, node)?,
            "percents" => percentiles.percents = float_list_param(name, key, node)?,
            _ => {
                extra.insert(key.clone(), coerce_node(node));
            }
        }
    }

    require_field(name, &percentiles.field)?;
    Ok(with_params(percentiles.into(), extra))
}

fn decode_metric(
    name: &str,
    metric: MetricType,
    params: &ParamMap,
) -> Result<Aggregation, ParseError> {
    let mut field = String::new();
    let mut extra = Map::new();

    for (key, node) in params {
        match key.as_str() {
            "field" => field = string_param(name, key, node)?,
            _ => {
                extra.insert(key.clone(), coerce_node(node));
            }
        }
    }

    require_field(name, &field)?;
    Ok(with_params(MetricAggregation::new(metric, field).into(), extra))
}

fn with_params(mut aggregation: Aggregation, params: Map<String, Value>) -> Aggregation {
    for (key, value) in params {
        aggregation.set_param(key, value);
    }
    aggregation
}

// ============================================================================
// Field decoders
// ============================================================================

fn invalid(name: &str, field: &str, expected: &'static str, found: impl Into<String>) -> ParseError {
    ParseError::InvalidField {
        aggregation: name.to_string(),
        field: field.to_string(),
        expected,
        found: found.into(),
    }
}

fn group<'a>(name: &str, key: &str, node: &'a ParamNode) -> Result<&'a ParamMap, ParseError> {
    match node {
        ParamNode::Map(map) => Ok(map),
        ParamNode::Scalar(value) => Err(invalid(name, key, "a parameter group", value.as_str())),
    }
}

fn scalar<'a>(
    name: &str,
    key: &str,
    expected: &'static str,
    node: &'a ParamNode,
) -> Result<&'a str, ParseError> {
    match node {
        ParamNode::Scalar(value) => Ok(value.trim()),
        ParamNode::Map(_) => Err(invalid(name, key, expected, "nested parameters")),
    }
}

fn string_param(name: &str, key: &str, node: &ParamNode) -> Result<String, ParseError> {
    scalar(name, key, "a string", node).map(str::to_string)
}

fn u64_param(name: &str, key: &str, node: &ParamNode) -> Result<u64, ParseError> {
    let value = scalar(name, key, "a non-negative integer", node)?;
    value
        .parse::<u64>()
        .map_err(|_| invalid(name, key, "a non-negative integer", value))
}

fn float_list_param(name: &str, key: &str, node: &ParamNode) -> Result<Vec<f64>, ParseError> {
    const EXPECTED: &str = "a comma-separated list of numbers";
    let value = scalar(name, key, EXPECTED, node)?;
    value
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid(name, key, EXPECTED, value))
}

fn require_field(name: &str, field: &str) -> Result<(), ParseError> {
    if field.is_empty() {
        Err(invalid(name, "field", "a field name", ""))
    } else {
        Ok(())
    }
}

/// Generic coercion for parameters without a dedicated decoder
fn coerce_node(node: &ParamNode) -> Value {
    match node {
        ParamNode::Scalar(value) => coerce_scalar(value),
        ParamNode::Map(map) => Value::Object(
            map.iter()
                .map(|(key, node)| (key.clone(), coerce_node(node)))
                .collect(),
        ),
    }
}

fn coerce_scalar(value: &str) -> Value {
    let trimmed = value.trim();

    if let Ok(int) = trimmed.parse::<i64>() {
        return Value::from(int);
    }
    if let Some(number) = parse_float(trimmed) {
        return Value::Number(number);
    }
    if trimmed.contains(',') {
        let numbers: Option<Vec<Value>> = trimmed
            .split(',')
            .map(|part| parse_float(part.trim()).map(Value::Number))
            .collect();
        if let Some(numbers) = numbers {
            return Value::Array(numbers);
        }
    }
    Value::String(value.to_string())
}

fn parse_float(value: &str) -> Option<Number> {
    value.parse::<f64>().ok().and_then(Number::from_f64)
}
