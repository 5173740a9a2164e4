//! Elasticsearch query DSL compiler.
//!
//! Compiles a finalized [`QueryBuilder`] into a search request body:
//! - leaves map to their native operator objects (`match`, `term`, `range`, ...)
//! - composites become `bool` objects holding only their non-empty lists
//! - aggregations become `aggs` entries, recursing into sub-aggregations
//!
//! Redundant same-list `bool` wrappers are spliced out afterwards by
//! [`flatten_bool_clauses`]. Top-level keys are left out when unset.

use crate::builder::QueryBuilder;
use crate::error::RenderError;
use crate::ir::{
    Aggregation, Aggregations, BoolClause, BoolKind, Clause, Leaf, LeafValue, MetricType,
    Operator, Sort,
};
use crate::render::flatten::{flatten_bool_clauses, merge_queries};
use crate::render::DslCompiler;
use crate::transform::simplify;
use serde_json::{json, Map, Value};
use tracing::debug;

/// Compiler targeting the Elasticsearch/OpenSearch query DSL
#[derive(Debug, Clone, Copy, Default)]
pub struct ElasticsearchCompiler;

impl DslCompiler for ElasticsearchCompiler {
    fn name(&self) -> &str {
        "elasticsearch"
    }

    fn compile(&self, builder: &QueryBuilder) -> Result<Value, RenderError> {
        if !builder.is_built() {
            return self.compile(&builder.clone().built());
        }

        debug!(
            compiler = self.name(),
            aggregations = builder.get_aggregations().len(),
            sorts = builder.get_sorts().len(),
            "compiling query document"
        );

        let mut document = Map::new();

        if let Some(query) = self.compile_query(builder.root())? {
            document.insert("query".to_string(), query);
        }

        if let Some(from) = builder.get_from().filter(|from| *from > 0) {
            document.insert("from".to_string(), json!(from));
        }

        if let Some(size) = builder.get_size() {
            document.insert("size".to_string(), json!(size));
        }

        if !builder.get_sorts().is_empty() {
            document.insert("sort".to_string(), self.compile_sorts(builder.get_sorts()));
        }

        let mut source = Map::new();
        if !builder.get_includes().is_empty() {
            source.insert("includes".to_string(), json!(builder.get_includes()));
        }
        if !builder.get_excludes().is_empty() {
            source.insert("excludes".to_string(), json!(builder.get_excludes()));
        }
        if !source.is_empty() {
            document.insert("_source".to_string(), Value::Object(source));
        }

        if let Some(field) = builder.get_collapse() {
            document.insert("collapse".to_string(), json!({ "field": field }));
        }

        if !builder.get_aggregations().is_empty() {
            document.insert(
                "aggs".to_string(),
                self.compile_aggregations(builder.get_aggregations())?,
            );
        }

        Ok(Value::Object(document))
    }
}

impl ElasticsearchCompiler {
    pub fn new() -> Self {
        Self
    }

    /// Compile `builder` and merge its query with a caller-supplied raw
    /// query clause.
    ///
    /// When both exist the result is `{"bool": {"must": [base, compiled]}}`;
    /// otherwise whichever exists is used.
    pub fn compile_on_top_of(
        &self,
        base: Option<&Value>,
        builder: &QueryBuilder,
    ) -> Result<Value, RenderError> {
        let mut document = match self.compile(builder)? {
            Value::Object(document) => document,
            _ => Map::new(),
        };

        let compiled = document.remove("query");
        debug!(
            has_base = base.is_some(),
            has_query = compiled.is_some(),
            "merging raw query document"
        );

        if let Some(query) = merge_queries(base.cloned(), compiled) {
            document.insert("query".to_string(), flatten_bool_clauses(query));
        }

        Ok(Value::Object(document))
    }

    /// Compile a clause tree; `None` for an empty tree
    pub fn compile_query(&self, clause: &Clause) -> Result<Option<Value>, RenderError> {
        if clause.is_empty() {
            return Ok(None);
        }
        Ok(Some(flatten_bool_clauses(self.compile_clause(clause)?)))
    }

    fn compile_clause(&self, clause: &Clause) -> Result<Value, RenderError> {
        match clause {
            Clause::Leaf(leaf) => self.compile_leaf(leaf),
            Clause::Bool(bool_clause) => self.compile_bool(bool_clause),
        }
    }

    fn compile_bool(&self, bool_clause: &BoolClause) -> Result<Value, RenderError> {
        let mut body = Map::new();

        for kind in BoolKind::ALL {
            let children = bool_clause.list(kind);
            if children.is_empty() {
                continue;
            }
            let compiled = children
                .iter()
                .map(|child| self.compile_clause(child))
                .collect::<Result<Vec<_>, _>>()?;
            body.insert(kind.key().to_string(), Value::Array(compiled));
        }

        decorate(&mut body, bool_clause.boost, &bool_clause.parameters);
        Ok(json!({ "bool": body }))
    }

    fn compile_leaf(&self, leaf: &Leaf) -> Result<Value, RenderError> {
        let field = leaf.field.as_str();

        match leaf.operator {
            Operator::Match => field_query("match", leaf, "query", json_value(leaf)?),
            Operator::MatchPhrase => field_query("match_phrase", leaf, "query", json_value(leaf)?),
            Operator::Term
            | Operator::Prefix
            | Operator::Wildcard
            | Operator::Regexp
            | Operator::Fuzzy => {
                field_query(leaf.operator.as_str(), leaf, "value", json_value(leaf)?)
            }
            Operator::MultiMatch => {
                let mut body = Map::new();
                body.insert("query".to_string(), json_value(leaf)?);
                decorate(&mut body, leaf.boost, &leaf.parameters);
                Ok(json!({ "multi_match": body }))
            }
            Operator::In => Ok(json!({ "terms": terms_body(leaf)? })),
            Operator::NotIn => Ok(json!({
                "bool": { "must_not": [{ "terms": terms_body(leaf)? }] }
            })),
            Operator::Exists => {
                let mut body = Map::new();
                body.insert("field".to_string(), json!(field));
                decorate(&mut body, leaf.boost, &leaf.parameters);
                Ok(json!({ "exists": body }))
            }
            Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
                let mut bounds = Map::new();
                bounds.insert(leaf.operator.as_str().to_string(), json_value(leaf)?);
                range_query(leaf, bounds)
            }
            Operator::Range => match json_value(leaf)? {
                Value::Object(bounds) if !bounds.is_empty() => range_query(leaf, bounds),
                other => Err(invalid(leaf, format!("expected range bounds, found {}", other))),
            },
            Operator::QueryString => {
                let mut body = Map::new();
                body.insert("query".to_string(), json_value(leaf)?);
                if !field.is_empty() {
                    body.insert("default_field".to_string(), json!(field));
                }
                decorate(&mut body, leaf.boost, &leaf.parameters);
                Ok(json!({ "query_string": body }))
            }
            Operator::Semantic => {
                let mut body = Map::new();
                body.insert("field".to_string(), json!(field));
                body.insert("query".to_string(), json_value(leaf)?);
                decorate(&mut body, leaf.boost, &leaf.parameters);
                Ok(json!({ "semantic": body }))
            }
            Operator::Hybrid => {
                let LeafValue::Hybrid(queries) = &leaf.value else {
                    return Err(invalid(leaf, "expected hybrid sub-queries".to_string()));
                };
                let compiled = queries
                    .iter()
                    .filter(|query| !query.is_empty())
                    .map(|query| self.compile_clause(query))
                    .collect::<Result<Vec<_>, _>>()?;

                let mut body = Map::new();
                body.insert("queries".to_string(), Value::Array(compiled));
                decorate(&mut body, leaf.boost, &leaf.parameters);
                Ok(json!({ "hybrid": body }))
            }
            Operator::Nested => {
                let LeafValue::Nested(query) = &leaf.value else {
                    return Err(invalid(leaf, "expected a nested query".to_string()));
                };
                let compiled = if query.is_empty() {
                    json!({ "match_all": {} })
                } else {
                    self.compile_clause(query)?
                };

                let mut body = Map::new();
                body.insert("path".to_string(), json!(field));
                body.insert("query".to_string(), compiled);
                decorate(&mut body, leaf.boost, &leaf.parameters);
                Ok(json!({ "nested": body }))
            }
        }
    }

    fn compile_sorts(&self, sorts: &[Sort]) -> Value {
        Value::Array(
            sorts
                .iter()
                .map(|sort| json!({ sort.field.as_str(): { "order": sort.order.as_str() } }))
                .collect(),
        )
    }

    // ------------------------------------------------------------------------
    // Aggregations
    // ------------------------------------------------------------------------

    fn compile_aggregations(&self, aggregations: &Aggregations) -> Result<Value, RenderError> {
        let mut compiled = Map::new();
        for (name, aggregation) in aggregations {
            compiled.insert(name.clone(), self.compile_aggregation(aggregation)?);
        }
        Ok(Value::Object(compiled))
    }

    fn compile_aggregation(&self, aggregation: &Aggregation) -> Result<Value, RenderError> {
        let mut params = aggregation.get_params().clone();

        let (kind, mut body) = match aggregation {
            Aggregation::Terms(terms) => {
                let mut body = Map::new();
                body.insert("field".to_string(), json!(terms.field));
                if let Some(include) = &terms.include {
                    body.insert("include".to_string(), json!(include));
                }
                if let Some(size) = terms.size {
                    body.insert("size".to_string(), json!(size));
                }
                ("terms", body)
            }
            Aggregation::Metric(metric) => {
                let mut body = Map::new();
                let kind = match metric.metric {
                    MetricType::Count => {
                        body.insert("field".to_string(), json!(metric.field));
                        "value_count"
                    }
                    MetricType::Median => {
                        body.insert("field".to_string(), json!(metric.field));
                        body.insert("percents".to_string(), json!([50]));
                        "percentiles"
                    }
                    MetricType::TopHits => {
                        body.insert(
                            "_source".to_string(),
                            json!({ "includes": [metric.field] }),
                        );
                        "top_hits"
                    }
                    other => {
                        body.insert("field".to_string(), json!(metric.field));
                        other.as_str()
                    }
                };
                (kind, body)
            }
            Aggregation::Percentiles(percentiles) => {
                let mut body = Map::new();
                body.insert("field".to_string(), json!(percentiles.field));
                if !percentiles.percents.is_empty() {
                    body.insert("percents".to_string(), json!(percentiles.percents));
                }
                ("percentiles", body)
            }
            Aggregation::DateHistogram(histogram) => {
                let mut body = Map::new();
                body.insert("field".to_string(), json!(histogram.field));
                if !histogram.interval.is_empty() {
                    body.insert(
                        histogram.interval_kind.key().to_string(),
                        json!(histogram.interval),
                    );
                }
                if let Some(format) = &histogram.format {
                    body.insert("format".to_string(), json!(format));
                }
                if let Some(time_zone) = &histogram.time_zone {
                    body.insert("time_zone".to_string(), json!(time_zone));
                }
                ("date_histogram", body)
            }
            Aggregation::DateRange(date_range) => {
                let ranges: Vec<Value> = date_range
                    .ranges
                    .iter()
                    .map(|bucket| {
                        let mut range = Map::new();
                        if let Some(key) = &bucket.key {
                            range.insert("key".to_string(), json!(key));
                        }
                        if let Some(from) = &bucket.from {
                            range.insert("from".to_string(), from.clone());
                        }
                        if let Some(to) = &bucket.to {
                            range.insert("to".to_string(), to.clone());
                        }
                        Value::Object(range)
                    })
                    .collect();

                let mut body = Map::new();
                body.insert("field".to_string(), json!(date_range.field));
                if let Some(format) = &date_range.format {
                    body.insert("format".to_string(), json!(format));
                }
                body.insert("ranges".to_string(), Value::Array(ranges));
                ("date_range", body)
            }
            Aggregation::Filter(filter) => {
                // The filter body is a query object; extra params have no place in it
                params.clear();
                let query = self
                    .compile_query(&simplify(filter.filter.clone()))?
                    .unwrap_or_else(|| json!({ "match_all": {} }));
                let body = match query {
                    Value::Object(body) => body,
                    _ => Map::new(),
                };
                ("filter", body)
            }
            Aggregation::Pipeline(pipeline) => {
                let mut body = Map::new();
                body.insert("buckets_path".to_string(), json!(pipeline.buckets_path));
                (pipeline.pipeline.as_str(), body)
            }
        };

        body.append(&mut params);

        let mut compiled = Map::new();
        compiled.insert(kind.to_string(), Value::Object(body));
        if !aggregation.get_nested().is_empty() {
            compiled.insert(
                "aggs".to_string(),
                self.compile_aggregations(aggregation.get_nested())?,
            );
        }
        Ok(Value::Object(compiled))
    }
}

// ============================================================================
// Leaf helpers
// ============================================================================

fn invalid(leaf: &Leaf, message: String) -> RenderError {
    RenderError::InvalidPayload {
        operator: leaf.operator.as_str(),
        message,
    }
}

/// The leaf's JSON value; other payloads and null are rejected
fn json_value(leaf: &Leaf) -> Result<Value, RenderError> {
    match &leaf.value {
        LeafValue::Json(value) if !value.is_null() => Ok(value.clone()),
        LeafValue::Json(_) | LeafValue::Null => Err(invalid(leaf, "missing value".to_string())),
        LeafValue::Hybrid(_) | LeafValue::Nested(_) => {
            Err(invalid(leaf, "expected a JSON value".to_string()))
        }
    }
}

/// Merge boost and parameters into an operator body
fn decorate(body: &mut Map<String, Value>, boost: Option<f64>, parameters: &Map<String, Value>) {
    if let Some(boost) = boost {
        body.insert("boost".to_string(), json!(boost));
    }
    for (key, value) in parameters {
        body.insert(key.clone(), value.clone());
    }
}

/// `{op: {field: {value_key: value, ...}}}`
fn field_query(operator: &str, leaf: &Leaf, value_key: &str, value: Value) -> Result<Value, RenderError> {
    let mut body = Map::new();
    body.insert(value_key.to_string(), value);
    decorate(&mut body, leaf.boost, &leaf.parameters);
    Ok(json!({ operator: { leaf.field.as_str(): body } }))
}

/// `{field: [...], boost?, ...}` for a `terms` query
fn terms_body(leaf: &Leaf) -> Result<Value, RenderError> {
    let values = match json_value(leaf)? {
        Value::Array(values) => values,
        other => return Err(invalid(leaf, format!("expected a list of values, found {}", other))),
    };

    let mut body = Map::new();
    body.insert(leaf.field.clone(), Value::Array(values));
    decorate(&mut body, leaf.boost, &leaf.parameters);
    Ok(Value::Object(body))
}

fn range_query(leaf: &Leaf, mut bounds: Map<String, Value>) -> Result<Value, RenderError> {
    decorate(&mut bounds, leaf.boost, &leaf.parameters);
    Ok(json!({ "range": { leaf.field.as_str(): bounds } }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{
        exists_query, filter_query, fuzzy_query, hybrid_query, in_query, match_phrase_query,
        match_query, multi_match_query, must_not_query, must_query, nested_query, not_in_query,
        prefix_query, query_string_query, range, semantic_query, should_query, term_query,
        DateHistogramAggregation, DateRangeAggregation, FilterAggregation, IntervalKind,
        MetricAggregation, PercentilesAggregation, PipelineAggregation, PipelineType,
        TermsAggregation,
    };
    use crate::ir::SortOrder;
    use insta::assert_json_snapshot;
    use test_case::test_case;

    fn compile(builder: QueryBuilder) -> Value {
        ElasticsearchCompiler::new().compile(&builder).unwrap()
    }

    fn compile_clause(clause: Clause) -> Value {
        ElasticsearchCompiler::new()
            .compile_query(&clause)
            .unwrap()
            .unwrap()
    }

    fn term(field: &str, value: i64) -> Value {
        json!({"term": {field: {"value": value}}})
    }

    // =========================================================================
    // Leaf shapes
    // =========================================================================

    #[test]
    fn test_match_literal() {
        assert_json_snapshot!(compile_clause(match_query("title", "golang")), @r###"
        {
          "match": {
            "title": {
              "query": "golang"
            }
          }
        }
        "###);
    }

    #[test]
    fn test_match_with_boost() {
        assert_eq!(
            compile_clause(match_query("title", "golang").boost(5.0)),
            json!({"match": {"title": {"query": "golang", "boost": 5.0}}})
        );
    }

    #[test]
    fn test_phrase_carries_slop() {
        assert_eq!(
            compile_clause(match_phrase_query("title", "rust book", 1)),
            json!({"match_phrase": {"title": {"query": "rust book", "slop": 1}}})
        );
    }

    #[test]
    fn test_multi_match() {
        assert_eq!(
            compile_clause(multi_match_query(["title^2", "body"], "golang")),
            json!({"multi_match": {"query": "golang", "fields": ["title^2", "body"]}})
        );
    }

    #[test_case(term_query("status", "active"), json!({"term": {"status": {"value": "active"}}}) ; "term")]
    #[test_case(prefix_query("title", "go"), json!({"prefix": {"title": {"value": "go"}}}) ; "prefix")]
    #[test_case(crate::ir::wildcard_query("title", "go*"), json!({"wildcard": {"title": {"value": "go*"}}}) ; "wildcard")]
    #[test_case(crate::ir::regexp_query("title", "go.*"), json!({"regexp": {"title": {"value": "go.*"}}}) ; "regexp")]
    #[test_case(fuzzy_query("title", "golnag", 2), json!({"fuzzy": {"title": {"value": "golnag", "fuzziness": 2}}}) ; "fuzzy")]
    #[test_case(exists_query("author"), json!({"exists": {"field": "author"}}) ; "exists")]
    fn test_value_leaves(clause: Clause, expected: Value) {
        assert_eq!(compile_clause(clause), expected);
    }

    #[test]
    fn test_terms_and_not_in() {
        assert_eq!(
            compile_clause(in_query("tag", ["a", "b"])),
            json!({"terms": {"tag": ["a", "b"]}})
        );
        assert_eq!(
            compile_clause(not_in_query("tag", ["a"])),
            json!({"bool": {"must_not": [{"terms": {"tag": ["a"]}}]}})
        );
    }

    #[test_case(range("age").gt(1).build(), "gt" ; "gt")]
    #[test_case(range("age").gte(1).build(), "gte" ; "gte")]
    #[test_case(range("age").lt(1).build(), "lt" ; "lt")]
    #[test_case(range("age").lte(1).build(), "lte" ; "lte")]
    fn test_range_directions(clause: Clause, key: &str) {
        assert_eq!(compile_clause(clause), json!({"range": {"age": {key: 1}}}));
    }

    #[test]
    fn test_range_with_several_bounds() {
        assert_eq!(
            compile_clause(range("age").gte(18).lt(65).build()),
            json!({"range": {"age": {"gte": 18, "lt": 65}}})
        );
    }

    #[test]
    fn test_query_string_semantic_hybrid_nested() {
        assert_eq!(
            compile_clause(query_string_query("rust AND async")),
            json!({"query_string": {"query": "rust AND async"}})
        );
        assert_eq!(
            compile_clause(semantic_query("body_semantic", "fast databases")),
            json!({"semantic": {"field": "body_semantic", "query": "fast databases"}})
        );
        assert_eq!(
            compile_clause(hybrid_query(vec![
                match_query("body", "db"),
                semantic_query("vec", "db"),
            ])),
            json!({"hybrid": {"queries": [
                {"match": {"body": {"query": "db"}}},
                {"semantic": {"field": "vec", "query": "db"}},
            ]}})
        );
        assert_eq!(
            compile_clause(nested_query("comments", term_query("comments.author", "ann"))),
            json!({"nested": {"path": "comments", "query": {"term": {"comments.author": {"value": "ann"}}}}})
        );
    }

    #[test]
    fn test_invalid_payloads_abort() {
        let compiler = ElasticsearchCompiler::new();

        let in_without_list = Clause::Leaf(Leaf::new(Operator::In, "tag", json!("a")));
        assert!(matches!(
            compiler.compile_query(&in_without_list),
            Err(RenderError::InvalidPayload { operator: "in", .. })
        ));

        let match_without_value = Clause::Leaf(Leaf::new(Operator::Match, "title", LeafValue::Null));
        assert!(compiler.compile_query(&match_without_value).is_err());

        let nested_with_json = Clause::Leaf(Leaf::new(Operator::Nested, "comments", json!(1)));
        assert!(compiler.compile_query(&nested_with_json).is_err());
    }

    // =========================================================================
    // Composites
    // =========================================================================

    #[test]
    fn test_bool_emits_only_non_empty_lists() {
        let clause = Clause::Bool(
            BoolClause::new()
                .filter(term_query("a", 1))
                .must_not(term_query("b", 2)),
        );
        assert_eq!(
            compile_clause(clause),
            json!({"bool": {"filter": [term("a", 1)], "must_not": [term("b", 2)]}})
        );
    }

    #[test]
    fn test_bool_boost_and_params() {
        let clause = should_query(vec![term_query("a", 1), term_query("b", 2)])
            .boost(2.0)
            .param("minimum_should_match", 1);
        assert_eq!(
            compile_clause(clause),
            json!({"bool": {
                "should": [term("a", 1), term("b", 2)],
                "boost": 2.0,
                "minimum_should_match": 1,
            }})
        );
    }

    #[test]
    fn test_same_list_wrappers_are_flattened() {
        let clause = Clause::Bool(
            BoolClause::new()
                .must(must_query(vec![term_query("a", 1), term_query("b", 2)]))
                .must(term_query("c", 3)),
        );
        assert_eq!(
            compile_clause(clause),
            json!({"bool": {"must": [term("a", 1), term("b", 2), term("c", 3)]}})
        );
    }

    #[test]
    fn test_minimum_should_match_parent_keeps_its_children() {
        let clause = should_query(vec![
            should_query(vec![term_query("a", 1), term_query("b", 2)]),
            term_query("c", 3),
        ])
        .param("minimum_should_match", 2);

        assert_eq!(
            compile_clause(clause),
            json!({"bool": {
                "should": [
                    {"bool": {"should": [term("a", 1), term("b", 2)]}},
                    term("c", 3),
                ],
                "minimum_should_match": 2,
            }})
        );
    }

    #[test]
    fn test_must_not_is_not_flattened() {
        let clause = Clause::Bool(
            BoolClause::new()
                .must_not(must_not_query(vec![term_query("a", 1), term_query("b", 2)]))
                .must_not(term_query("c", 3)),
        );
        assert_eq!(
            compile_clause(clause),
            json!({"bool": {"must_not": [
                {"bool": {"must_not": [term("a", 1), term("b", 2)]}},
                term("c", 3),
            ]}})
        );
    }

    // =========================================================================
    // Documents
    // =========================================================================

    #[test]
    fn test_empty_builder_is_empty_document() {
        assert_eq!(compile(QueryBuilder::new()), json!({}));
    }

    #[test]
    fn test_from_zero_is_omitted() {
        let doc = compile(QueryBuilder::new().from(0).size(10));
        assert_eq!(doc, json!({"size": 10}));
    }

    #[test]
    fn test_full_document() {
        let builder = QueryBuilder::new()
            .filter(term_query("lang", "en"))
            .must(match_query("title", "golang"))
            .sort("_score", SortOrder::Desc)
            .sort("created", SortOrder::Asc)
            .from(20)
            .size(10)
            .include(["title"])
            .exclude(["body"])
            .collapse("thread_id")
            .aggregation("types", TermsAggregation::new("type").with_size(5));

        assert_eq!(
            compile(builder),
            json!({
                "query": {"bool": {
                    "filter": [{"term": {"lang": {"value": "en"}}}],
                    "must": [{"match": {"title": {"query": "golang"}}}],
                }},
                "from": 20,
                "size": 10,
                "sort": [{"_score": {"order": "desc"}}, {"created": {"order": "asc"}}],
                "_source": {"includes": ["title"], "excludes": ["body"]},
                "collapse": {"field": "thread_id"},
                "aggs": {"types": {"terms": {"field": "type", "size": 5}}},
            })
        );
    }

    #[test]
    fn test_unbuilt_builder_is_built_on_a_copy() {
        let builder = QueryBuilder::new().query("title:golang");
        let doc = compile(builder.clone());

        assert_eq!(doc, json!({"query": {"match": {"title": {"query": "golang"}}}}));
        assert!(!builder.is_built());
    }

    #[test]
    fn test_compile_on_top_of() {
        let compiler = ElasticsearchCompiler::new();
        let builder = QueryBuilder::new()
            .must(term_query("a", 1))
            .must(term_query("b", 2))
            .size(5);
        let base = term("raw", 0);

        let doc = compiler.compile_on_top_of(Some(&base), &builder).unwrap();
        assert_eq!(
            doc,
            json!({
                "query": {"bool": {"must": [term("raw", 0), term("a", 1), term("b", 2)]}},
                "size": 5,
            })
        );

        let doc = compiler
            .compile_on_top_of(Some(&base), &QueryBuilder::new())
            .unwrap();
        assert_eq!(doc, json!({"query": term("raw", 0)}));

        let doc = compiler.compile_on_top_of(None, &builder).unwrap();
        assert_eq!(doc["query"], json!({"bool": {"must": [term("a", 1), term("b", 2)]}}));
    }

    // =========================================================================
    // Aggregations
    // =========================================================================

    fn compile_agg(aggregation: impl Into<Aggregation>) -> Value {
        compile(QueryBuilder::new().aggregation("agg", aggregation))["aggs"]["agg"].clone()
    }

    #[test_case(IntervalKind::Calendar, "calendar_interval" ; "calendar")]
    #[test_case(IntervalKind::Fixed, "fixed_interval" ; "fixed")]
    #[test_case(IntervalKind::Legacy, "interval" ; "legacy")]
    fn test_date_histogram_interval_key(kind: IntervalKind, key: &str) {
        let aggregation = DateHistogramAggregation::new("created", "1d", kind).with_time_zone("UTC");
        assert_eq!(
            compile_agg(aggregation),
            json!({"date_histogram": {"field": "created", key: "1d", "time_zone": "UTC"}})
        );
    }

    #[test_case(MetricType::Avg, json!({"avg": {"field": "price"}}) ; "avg")]
    #[test_case(MetricType::Cardinality, json!({"cardinality": {"field": "price"}}) ; "cardinality")]
    #[test_case(MetricType::Count, json!({"value_count": {"field": "price"}}) ; "count")]
    #[test_case(MetricType::Median, json!({"percentiles": {"field": "price", "percents": [50]}}) ; "median")]
    #[test_case(MetricType::TopHits, json!({"top_hits": {"_source": {"includes": ["price"]}}}) ; "top hits")]
    fn test_metric_shapes(metric: MetricType, expected: Value) {
        assert_eq!(compile_agg(MetricAggregation::new(metric, "price")), expected);
    }

    #[test]
    fn test_percentiles_and_pipeline() {
        assert_eq!(
            compile_agg(PercentilesAggregation::new("latency", vec![95.0, 99.0])),
            json!({"percentiles": {"field": "latency", "percents": [95.0, 99.0]}})
        );
        assert_eq!(
            compile_agg(PipelineAggregation::new(PipelineType::CumulativeSum, "sales")),
            json!({"cumulative_sum": {"buckets_path": "sales"}})
        );
    }

    #[test]
    fn test_date_range() {
        let aggregation = DateRangeAggregation::new("created")
            .with_range(Some("old"), None, Some(json!("now-1y")))
            .with_range(None, Some(json!("now-1y")), None);
        assert_eq!(
            compile_agg(aggregation),
            json!({"date_range": {"field": "created", "ranges": [
                {"key": "old", "to": "now-1y"},
                {"from": "now-1y"},
            ]}})
        );
    }

    #[test]
    fn test_filter_aggregation() {
        assert_eq!(
            compile_agg(FilterAggregation::new(filter_query(vec![term_query("a", 1)]))),
            json!({"filter": {"term": {"a": {"value": 1}}}})
        );
        assert_eq!(
            compile_agg(FilterAggregation::new(Clause::default())),
            json!({"filter": {"match_all": {}}})
        );
    }

    #[test]
    fn test_nested_aggregations_and_params() {
        let aggregation = Aggregation::from(TermsAggregation::new("category"))
            .with_param("min_doc_count", 2)
            .with_nested("avg_price", MetricAggregation::new(MetricType::Avg, "price"));

        assert_eq!(
            compile_agg(aggregation),
            json!({
                "terms": {"field": "category", "min_doc_count": 2},
                "aggs": {"avg_price": {"avg": {"field": "price"}}},
            })
        );
    }
}
