//! Query builder.
//!
//! [`QueryBuilder`] accumulates one root clause plus sorting, paging, source
//! projection, collapsing, aggregations and an optional free-text query.
//! [`QueryBuilder::build`] finalizes it: the free-text query is expanded by
//! the fuzziness cascade and the clause tree is simplified.

use crate::config::{QueryConfig, MAX_FUZZINESS};
use crate::ir::{
    fuzzy_query, match_phrase_query, match_query, prefix_query, query_string_query,
    should_query, Aggregation, Aggregations, BoolKind, Clause, FieldSpec, Sort, SortOrder,
};
use crate::transform::simplify;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// `field:value` free-text form; the field may carry a `^boost` suffix
static FIELD_QUERY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9._-]+(?:\^[0-9]+(?:\.[0-9]+)?)?):(.+)$").unwrap()
});

/// Mutable accumulator for one search request
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryBuilder {
    root: Clause,
    sorts: Vec<Sort>,
    from: Option<usize>,
    size: Option<usize>,
    fuzziness: u8,
    query: Option<String>,
    includes: Vec<String>,
    excludes: Vec<String>,
    collapse: Option<String>,
    aggregations: Aggregations,
    default_fields: Vec<String>,
    built: bool,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder seeded with the config's default fields and fuzziness
    pub fn with_config(config: &QueryConfig) -> Self {
        Self {
            fuzziness: config.fuzziness(),
            size: config.default_size.map(|size| config.cap_size(size)),
            default_fields: config.default_fields.clone(),
            ..Self::default()
        }
    }

    // ------------------------------------------------------------------------
    // Clauses
    // ------------------------------------------------------------------------

    /// Replace the root clause
    pub fn root_clause(mut self, clause: impl Into<Clause>) -> Self {
        self.root = clause.into();
        self
    }

    fn push(mut self, kind: BoolKind, clause: impl Into<Clause>) -> Self {
        let mut root = std::mem::take(&mut self.root).into_bool();
        root.push(kind, clause);
        self.root = Clause::Bool(root);
        self
    }

    pub fn filter(self, clause: impl Into<Clause>) -> Self {
        self.push(BoolKind::Filter, clause)
    }

    pub fn must(self, clause: impl Into<Clause>) -> Self {
        self.push(BoolKind::Must, clause)
    }

    pub fn should(self, clause: impl Into<Clause>) -> Self {
        self.push(BoolKind::Should, clause)
    }

    pub fn must_not(self, clause: impl Into<Clause>) -> Self {
        self.push(BoolKind::MustNot, clause)
    }

    // ------------------------------------------------------------------------
    // Request options
    // ------------------------------------------------------------------------

    /// Free-text query expanded by the fuzziness cascade on build
    pub fn query(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.query = if text.trim().is_empty() {
            None
        } else {
            Some(text)
        };
        self
    }

    /// Fuzziness level, clamped to 0..=5
    pub fn fuzziness(mut self, level: u8) -> Self {
        self.fuzziness = level.min(MAX_FUZZINESS);
        self
    }

    /// Fields searched by a bare free-text query
    pub fn default_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sorts.push(Sort::new(field, order));
        self
    }

    pub fn sorts(mut self, sorts: impl IntoIterator<Item = Sort>) -> Self {
        self.sorts.extend(sorts);
        self
    }

    pub fn from(mut self, from: usize) -> Self {
        self.from = Some(from);
        self
    }

    pub fn size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    /// Source fields to return
    pub fn include<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.includes.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Source fields to leave out
    pub fn exclude<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Collapse hits on a field, keeping the top hit per value
    pub fn collapse(mut self, field: impl Into<String>) -> Self {
        self.collapse = Some(field.into());
        self
    }

    pub fn aggregation(mut self, name: impl Into<String>, aggregation: impl Into<Aggregation>) -> Self {
        self.aggregations.insert(name.into(), aggregation.into());
        self
    }

    pub fn aggregations(mut self, aggregations: Aggregations) -> Self {
        self.aggregations.extend(aggregations);
        self
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn root(&self) -> &Clause {
        &self.root
    }

    pub fn get_sorts(&self) -> &[Sort] {
        &self.sorts
    }

    pub fn get_from(&self) -> Option<usize> {
        self.from
    }

    pub fn get_size(&self) -> Option<usize> {
        self.size
    }

    pub fn get_fuzziness(&self) -> u8 {
        self.fuzziness
    }

    pub fn get_query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn get_includes(&self) -> &[String] {
        &self.includes
    }

    pub fn get_excludes(&self) -> &[String] {
        &self.excludes
    }

    pub fn get_collapse(&self) -> Option<&str> {
        self.collapse.as_deref()
    }

    pub fn get_aggregations(&self) -> &Aggregations {
        &self.aggregations
    }

    pub fn get_default_fields(&self) -> &[String] {
        &self.default_fields
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    // ------------------------------------------------------------------------
    // Finalization
    // ------------------------------------------------------------------------

    /// Expand the fuzziness cascade (once) and simplify the root clause
    pub fn build(&mut self) -> &mut Self {
        if !self.built {
            if let Some(text) = self.query.clone() {
                let expansion = self.expand_query(&text);
                let mut root = std::mem::take(&mut self.root).into_bool();
                root.push(BoolKind::Must, expansion);
                self.root = Clause::Bool(root);
            }
            self.built = true;
        }

        self.root = simplify(std::mem::take(&mut self.root));
        self
    }

    /// Builder form of [`QueryBuilder::build`]
    pub fn built(mut self) -> Self {
        self.build();
        self
    }

    /// Cascade for the free-text query: a fixed field for `field:value`,
    /// otherwise every default field, OR'ed together
    fn expand_query(&self, text: &str) -> Clause {
        let text = text.trim();

        if let Some(captures) = FIELD_QUERY_RE.captures(text) {
            let spec = FieldSpec::parse(&captures[1]);
            let value = captures[2].trim();
            debug!(
                field = %spec.name,
                level = self.fuzziness,
                "expanding fielded free-text query"
            );
            return fuzziness_cascade(&spec, value, self.fuzziness);
        }

        if self.default_fields.is_empty() {
            debug!("no default fields, falling back to query_string");
            return query_string_query(text);
        }

        debug!(
            fields = self.default_fields.len(),
            level = self.fuzziness,
            "expanding free-text query over default fields"
        );
        let mut groups: Vec<Clause> = self
            .default_fields
            .iter()
            .map(|field| fuzziness_cascade(&FieldSpec::parse(field), text, self.fuzziness))
            .collect();

        if groups.len() == 1 {
            groups.remove(0)
        } else {
            should_query(groups)
        }
    }
}

/// Boosted relevance expansion of `value` on one field.
///
/// | level | clauses (boost) |
/// |-------|-----------------|
/// | 0, 1  | match (1) |
/// | 2     | match (5), prefix (2) |
/// | 3     | match (5), prefix (3), phrase slop 0 (2) |
/// | 4     | match (5), prefix (3), phrase slop 1 (2), fuzzy 1 edit (1) |
/// | 5     | match (5), prefix (3), phrase slop 2 (2), fuzzy 2 edits (1) |
///
/// Every boost is multiplied by the field's `^boost`.
pub fn fuzziness_cascade(field: &FieldSpec, value: &str, level: u8) -> Clause {
    let name = field.name.as_str();
    let weight = |boost: f64| boost * field.boost;

    match level {
        0 | 1 => with_boost(match_query(name, value), weight(1.0)),
        2 => should_query(vec![
            with_boost(match_query(name, value), weight(5.0)),
            with_boost(prefix_query(name, value), weight(2.0)),
        ]),
        3 => should_query(vec![
            with_boost(match_query(name, value), weight(5.0)),
            with_boost(prefix_query(name, value), weight(3.0)),
            with_boost(match_phrase_query(name, value, 0), weight(2.0)),
        ]),
        4 => should_query(vec![
            with_boost(match_query(name, value), weight(5.0)),
            with_boost(prefix_query(name, value), weight(3.0)),
            with_boost(match_phrase_query(name, value, 1), weight(2.0)),
            with_boost(fuzzy_query(name, value, 1), weight(1.0)),
        ]),
        _ => should_query(vec![
            with_boost(match_query(name, value), weight(5.0)),
            with_boost(prefix_query(name, value), weight(3.0)),
            with_boost(match_phrase_query(name, value, 2), weight(2.0)),
            with_boost(fuzzy_query(name, value, 2), weight(1.0)),
        ]),
    }
}

/// Neutral weights are left unset so they do not show up in the output
fn with_boost(clause: Clause, boost: f64) -> Clause {
    if (boost - 1.0).abs() < f64::EPSILON {
        clause
    } else {
        clause.boost(boost)
    }
}
