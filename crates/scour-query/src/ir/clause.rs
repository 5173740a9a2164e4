//! Clause tree.
//!
//! A [`Clause`] is either a leaf condition (operator, field, value) or a
//! boolean composite holding filter/must/should/must_not child lists. Leaves
//! and composites both carry an optional boost and a free-form parameter bag
//! that the compiler merges into the emitted operator object.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Leaf operators understood by the compilers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Match,
    MatchPhrase,
    MultiMatch,
    Term,
    In,
    NotIn,
    Prefix,
    Wildcard,
    Regexp,
    Exists,
    Fuzzy,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Several range bounds at once; the value is the bound object
    Range,
    QueryString,
    Semantic,
    Hybrid,
    Nested,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Match => "match",
            Operator::MatchPhrase => "match_phrase",
            Operator::MultiMatch => "multi_match",
            Operator::Term => "term",
            Operator::In => "in",
            Operator::NotIn => "not_in",
            Operator::Prefix => "prefix",
            Operator::Wildcard => "wildcard",
            Operator::Regexp => "regexp",
            Operator::Exists => "exists",
            Operator::Fuzzy => "fuzzy",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Range => "range",
            Operator::QueryString => "query_string",
            Operator::Semantic => "semantic",
            Operator::Hybrid => "hybrid",
            Operator::Nested => "nested",
        }
    }
}

/// Value carried by a leaf.
///
/// Most operators take a plain JSON value; the engine-specific extensions
/// carry typed sub-queries instead.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeafValue {
    #[default]
    Null,
    Json(Value),
    /// Sub-queries combined by a hybrid query
    Hybrid(Vec<Clause>),
    /// Query evaluated against a nested object path (the leaf field)
    Nested(Box<Clause>),
}

impl LeafValue {
    pub fn is_null(&self) -> bool {
        matches!(self, LeafValue::Null | LeafValue::Json(Value::Null))
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            LeafValue::Json(value) => Some(value),
            _ => None,
        }
    }
}

impl From<Value> for LeafValue {
    fn from(value: Value) -> Self {
        LeafValue::Json(value)
    }
}

/// A single condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaf {
    pub operator: Operator,
    pub field: String,
    pub value: LeafValue,
    pub boost: Option<f64>,
    pub parameters: Map<String, Value>,
}

impl Leaf {
    pub fn new(operator: Operator, field: impl Into<String>, value: impl Into<LeafValue>) -> Self {
        Self {
            operator,
            field: field.into(),
            value: value.into(),
            boost: None,
            parameters: Map::new(),
        }
    }

    /// A leaf with no field and no value carries no condition
    pub fn is_empty(&self) -> bool {
        self.field.is_empty() && self.value.is_null()
    }
}

/// The four boolean child lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoolKind {
    Filter,
    Must,
    Should,
    MustNot,
}

impl BoolKind {
    pub const ALL: [BoolKind; 4] = [
        BoolKind::Filter,
        BoolKind::Must,
        BoolKind::Should,
        BoolKind::MustNot,
    ];

    /// Key used in the emitted `bool` object
    pub fn key(&self) -> &'static str {
        match self {
            BoolKind::Filter => "filter",
            BoolKind::Must => "must",
            BoolKind::Should => "should",
            BoolKind::MustNot => "must_not",
        }
    }
}

/// Boolean composite.
///
/// - `filter`: all must match, no scoring
/// - `must`: all must match, scored
/// - `should`: at least one should match, scored
/// - `must_not`: none may match
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BoolClause {
    pub filter: Vec<Clause>,
    pub must: Vec<Clause>,
    pub should: Vec<Clause>,
    pub must_not: Vec<Clause>,
    pub boost: Option<f64>,
    pub parameters: Map<String, Value>,
}

impl BoolClause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self, kind: BoolKind) -> &Vec<Clause> {
        match kind {
            BoolKind::Filter => &self.filter,
            BoolKind::Must => &self.must,
            BoolKind::Should => &self.should,
            BoolKind::MustNot => &self.must_not,
        }
    }

    pub fn list_mut(&mut self, kind: BoolKind) -> &mut Vec<Clause> {
        match kind {
            BoolKind::Filter => &mut self.filter,
            BoolKind::Must => &mut self.must,
            BoolKind::Should => &mut self.should,
            BoolKind::MustNot => &mut self.must_not,
        }
    }

    /// Add a clause to the given list
    pub fn push(&mut self, kind: BoolKind, clause: impl Into<Clause>) {
        self.list_mut(kind).push(clause.into());
    }

    pub fn filter(mut self, clause: impl Into<Clause>) -> Self {
        self.push(BoolKind::Filter, clause);
        self
    }

    pub fn must(mut self, clause: impl Into<Clause>) -> Self {
        self.push(BoolKind::Must, clause);
        self
    }

    pub fn should(mut self, clause: impl Into<Clause>) -> Self {
        self.push(BoolKind::Should, clause);
        self
    }

    pub fn must_not(mut self, clause: impl Into<Clause>) -> Self {
        self.push(BoolKind::MustNot, clause);
        self
    }

    /// True when every child list is empty
    pub fn is_empty(&self) -> bool {
        BoolKind::ALL.iter().all(|kind| self.list(*kind).is_empty())
    }

    /// Lists that hold at least one child
    pub fn non_empty_kinds(&self) -> Vec<BoolKind> {
        BoolKind::ALL
            .into_iter()
            .filter(|kind| !self.list(*kind).is_empty())
            .collect()
    }

    /// The single list kind holding children, if exactly one does
    pub fn sole_kind(&self) -> Option<BoolKind> {
        match self.non_empty_kinds().as_slice() {
            [kind] => Some(*kind),
            _ => None,
        }
    }

    /// Whether boost or parameters are attached at this level
    pub fn is_decorated(&self) -> bool {
        self.boost.is_some() || !self.parameters.is_empty()
    }
}

/// One node of the query tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Clause {
    Leaf(Leaf),
    Bool(BoolClause),
}

impl Default for Clause {
    fn default() -> Self {
        Clause::Bool(BoolClause::default())
    }
}

impl From<Leaf> for Clause {
    fn from(leaf: Leaf) -> Self {
        Clause::Leaf(leaf)
    }
}

impl From<BoolClause> for Clause {
    fn from(bool_clause: BoolClause) -> Self {
        Clause::Bool(bool_clause)
    }
}

impl Clause {
    pub fn is_leaf(&self) -> bool {
        matches!(self, Clause::Leaf(_))
    }

    /// A vacuous node: an empty leaf or a composite without children
    pub fn is_empty(&self) -> bool {
        match self {
            Clause::Leaf(leaf) => leaf.is_empty(),
            Clause::Bool(bool_clause) => bool_clause.is_empty(),
        }
    }

    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            Clause::Leaf(leaf) => Some(leaf),
            Clause::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<&BoolClause> {
        match self {
            Clause::Bool(bool_clause) => Some(bool_clause),
            Clause::Leaf(_) => None,
        }
    }

    pub fn boost_value(&self) -> Option<f64> {
        match self {
            Clause::Leaf(leaf) => leaf.boost,
            Clause::Bool(bool_clause) => bool_clause.boost,
        }
    }

    /// Set the relevance weight
    pub fn boost(mut self, boost: f64) -> Self {
        match &mut self {
            Clause::Leaf(leaf) => leaf.boost = Some(boost),
            Clause::Bool(bool_clause) => bool_clause.boost = Some(boost),
        }
        self
    }

    /// Attach a parameter merged into the emitted object
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let parameters = match &mut self {
            Clause::Leaf(leaf) => &mut leaf.parameters,
            Clause::Bool(bool_clause) => &mut bool_clause.parameters,
        };
        parameters.insert(key.into(), value.into());
        self
    }

    pub fn parameters(&self) -> &Map<String, Value> {
        match self {
            Clause::Leaf(leaf) => &leaf.parameters,
            Clause::Bool(bool_clause) => &bool_clause.parameters,
        }
    }

    /// Turn this clause into a composite, wrapping a leaf into `must`
    pub fn into_bool(self) -> BoolClause {
        match self {
            Clause::Bool(bool_clause) => bool_clause,
            leaf @ Clause::Leaf(_) => BoolClause::new().must(leaf),
        }
    }
}

// ============================================================================
// Leaf factories
// ============================================================================

fn leaf(operator: Operator, field: impl Into<String>, value: impl Into<Value>) -> Clause {
    let value: Value = value.into();
    Clause::Leaf(Leaf::new(operator, field, value))
}

/// Full-text match
pub fn match_query(field: impl Into<String>, value: impl Into<Value>) -> Clause {
    leaf(Operator::Match, field, value)
}

/// Exact term equality
pub fn term_query(field: impl Into<String>, value: impl Into<Value>) -> Clause {
    leaf(Operator::Term, field, value)
}

/// Field value is one of `values`
pub fn in_query<I, V>(field: impl Into<String>, values: I) -> Clause
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let values: Vec<Value> = values.into_iter().map(Into::into).collect();
    leaf(Operator::In, field, Value::Array(values))
}

/// Field value is none of `values`
pub fn not_in_query<I, V>(field: impl Into<String>, values: I) -> Clause
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let values: Vec<Value> = values.into_iter().map(Into::into).collect();
    leaf(Operator::NotIn, field, Value::Array(values))
}

pub fn prefix_query(field: impl Into<String>, value: impl Into<Value>) -> Clause {
    leaf(Operator::Prefix, field, value)
}

pub fn wildcard_query(field: impl Into<String>, pattern: impl Into<Value>) -> Clause {
    leaf(Operator::Wildcard, field, pattern)
}

pub fn regexp_query(field: impl Into<String>, pattern: impl Into<Value>) -> Clause {
    leaf(Operator::Regexp, field, pattern)
}

/// Term match within `edits` edit distance
pub fn fuzzy_query(field: impl Into<String>, value: impl Into<Value>, edits: u8) -> Clause {
    leaf(Operator::Fuzzy, field, value).param("fuzziness", edits)
}

/// Field has any value
pub fn exists_query(field: impl Into<String>) -> Clause {
    Clause::Leaf(Leaf::new(Operator::Exists, field, LeafValue::Null))
}

/// Phrase match allowing `slop` positions between terms
pub fn match_phrase_query(field: impl Into<String>, value: impl Into<Value>, slop: u32) -> Clause {
    leaf(Operator::MatchPhrase, field, value).param("slop", slop)
}

/// Match across several fields (entries may carry `^boost`)
pub fn multi_match_query<I, S>(fields: I, value: impl Into<Value>) -> Clause
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let fields: Vec<Value> = fields
        .into_iter()
        .map(|field| Value::String(field.into()))
        .collect();
    leaf(Operator::MultiMatch, "", value).param("fields", Value::Array(fields))
}

/// Engine query-string syntax
pub fn query_string_query(query: impl Into<String>) -> Clause {
    leaf(Operator::QueryString, "", Value::String(query.into()))
}

/// Semantic (inference-backed) search on a semantic field
pub fn semantic_query(field: impl Into<String>, text: impl Into<String>) -> Clause {
    leaf(Operator::Semantic, field, Value::String(text.into()))
}

/// Hybrid query combining lexical and vector sub-queries
pub fn hybrid_query(queries: Vec<Clause>) -> Clause {
    Clause::Leaf(Leaf::new(Operator::Hybrid, "", LeafValue::Hybrid(queries)))
}

/// Query evaluated against the nested objects under `path`
pub fn nested_query(path: impl Into<String>, query: Clause) -> Clause {
    Clause::Leaf(Leaf::new(
        Operator::Nested,
        path,
        LeafValue::Nested(Box::new(query)),
    ))
}

/// Start a range condition on `field`
pub fn range(field: impl Into<String>) -> RangeBuilder {
    RangeBuilder {
        field: field.into(),
        bounds: Vec::new(),
    }
}

// ============================================================================
// Composite constructors
// ============================================================================

/// Empty composite, populated through the `BoolClause` methods
pub fn bool_query() -> BoolClause {
    BoolClause::new()
}

pub fn must_query(clauses: Vec<Clause>) -> Clause {
    Clause::Bool(BoolClause {
        must: clauses,
        ..Default::default()
    })
}

pub fn should_query(clauses: Vec<Clause>) -> Clause {
    Clause::Bool(BoolClause {
        should: clauses,
        ..Default::default()
    })
}

pub fn must_not_query(clauses: Vec<Clause>) -> Clause {
    Clause::Bool(BoolClause {
        must_not: clauses,
        ..Default::default()
    })
}

pub fn filter_query(clauses: Vec<Clause>) -> Clause {
    Clause::Bool(BoolClause {
        filter: clauses,
        ..Default::default()
    })
}

// ============================================================================
// Range builder
// ============================================================================

/// Collects range bounds for one field.
///
/// A single bound becomes the matching direction leaf (`gte`, ...); several
/// bounds become one [`Operator::Range`] leaf holding the bound object.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeBuilder {
    field: String,
    bounds: Vec<(Operator, Value)>,
}

impl RangeBuilder {
    fn bound(mut self, operator: Operator, value: impl Into<Value>) -> Self {
        self.bounds.retain(|(existing, _)| *existing != operator);
        self.bounds.push((operator, value.into()));
        self
    }

    pub fn gt(self, value: impl Into<Value>) -> Self {
        self.bound(Operator::Gt, value)
    }

    pub fn gte(self, value: impl Into<Value>) -> Self {
        self.bound(Operator::Gte, value)
    }

    pub fn lt(self, value: impl Into<Value>) -> Self {
        self.bound(Operator::Lt, value)
    }

    pub fn lte(self, value: impl Into<Value>) -> Self {
        self.bound(Operator::Lte, value)
    }

    pub fn build(mut self) -> Clause {
        match self.bounds.len() {
            0 => Clause::default(),
            1 => {
                let (operator, value) = self.bounds.remove(0);
                leaf(operator, self.field, value)
            }
            _ => {
                let bounds: Map<String, Value> = self
                    .bounds
                    .into_iter()
                    .map(|(operator, value)| (operator.as_str().to_string(), value))
                    .collect();
                leaf(Operator::Range, self.field, Value::Object(bounds))
            }
        }
    }
}

impl From<RangeBuilder> for Clause {
    fn from(builder: RangeBuilder) -> Self {
        builder.build()
    }
}
