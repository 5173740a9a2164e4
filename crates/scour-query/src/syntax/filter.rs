//! `filter=` expression parser using chumsky.
//!
//! ```text
//! filter := "-"? body
//! body   := "exists(" field ")"
//!         | field (">=" | "<=" | ">" | "<") value
//!         | field (":" | "=") value
//!         | text
//! ```
//!
//! Range operators are matched before `:`/`=`, so `url:a>b` is a range on
//! `url:a`. Anything that is not a comparison is free text.

use crate::error::ParseError;
use crate::ir::{
    exists_query, match_query, multi_match_query, must_not_query, range, term_query, Clause,
    FieldSpec,
};
use crate::syntax::common::{format_errors, remainder, text_until, Extra};
use chumsky::prelude::*;

/// Range comparison direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOp {
    Gt,
    Gte,
    Lt,
    Lte,
}

/// A parsed filter body
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    Exists(String),
    Range {
        field: String,
        op: RangeOp,
        value: String,
    },
    Term {
        field: String,
        value: String,
    },
    Text(String),
}

/// A parsed filter, possibly negated with a leading `-`
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    pub negated: bool,
    pub expr: FilterExpr,
}

impl FilterSpec {
    /// Convert into a clause; free text is matched against `default_fields`
    /// (every field when there are none)
    pub fn into_clause(self, default_fields: &[String]) -> Clause {
        let clause = match self.expr {
            FilterExpr::Exists(field) => exists_query(field),
            FilterExpr::Range { field, op, value } => {
                let builder = range(field);
                match op {
                    RangeOp::Gt => builder.gt(value),
                    RangeOp::Gte => builder.gte(value),
                    RangeOp::Lt => builder.lt(value),
                    RangeOp::Lte => builder.lte(value),
                }
                .build()
            }
            FilterExpr::Term { field, value } => term_query(field, value),
            FilterExpr::Text(text) => text_clause(text, default_fields),
        };

        if self.negated {
            must_not_query(vec![clause])
        } else {
            clause
        }
    }
}

fn text_clause(text: String, default_fields: &[String]) -> Clause {
    match default_fields {
        [] => multi_match_query(["*"], text),
        [field] => {
            let spec = FieldSpec::parse(field);
            let clause = match_query(spec.name, text);
            if spec.boost == 1.0 {
                clause
            } else {
                clause.boost(spec.boost)
            }
        }
        fields => multi_match_query(fields.iter().cloned(), text),
    }
}

/// Parse one `filter=` value
pub fn parse_filter(input: &str) -> Result<FilterSpec, ParseError> {
    let spec = filter_parser()
        .parse(input.trim())
        .into_result()
        .map_err(|errs| invalid(input, format_errors(&errs)))?;

    let missing = match &spec.expr {
        FilterExpr::Exists(field) if field.is_empty() => Some("missing field"),
        FilterExpr::Range { field, value, .. } | FilterExpr::Term { field, value } => {
            if field.is_empty() {
                Some("missing field")
            } else if value.is_empty() {
                Some("missing value")
            } else {
                None
            }
        }
        FilterExpr::Text(text) if text.is_empty() => Some("empty filter"),
        _ => None,
    };

    match missing {
        Some(reason) => Err(invalid(input, reason.to_string())),
        None => Ok(spec),
    }
}

fn invalid(input: &str, reason: String) -> ParseError {
    ParseError::InvalidFilter {
        filter: input.to_string(),
        reason,
    }
}

/// Possibly empty run of characters outside `stop`, trimmed
fn segment<'src>(stop: &'static str) -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    none_of(stop)
        .repeated()
        .to_slice()
        .map(|s: &str| s.trim().to_string())
}

/// Possibly empty rest of the input, trimmed
fn rest<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    any().repeated().to_slice().map(|s: &str| s.trim().to_string())
}

fn filter_parser<'src>() -> impl Parser<'src, &'src str, FilterSpec, Extra<'src>> {
    let exists = just("exists")
        .ignore_then(just('(').padded())
        .ignore_then(text_until("()"))
        .then_ignore(just(')').padded())
        .then_ignore(end())
        .map(FilterExpr::Exists)
        .labelled("exists(field)");

    let range_op = choice((
        just(">=").to(RangeOp::Gte),
        just("<=").to(RangeOp::Lte),
        just(">").to(RangeOp::Gt),
        just("<").to(RangeOp::Lt),
    ));

    let range = segment("<>")
        .then(range_op)
        .then(rest())
        .map(|((field, op), value)| FilterExpr::Range { field, op, value })
        .labelled("range comparison like price>=10");

    let term = segment(":=")
        .then_ignore(one_of(":="))
        .then(rest())
        .map(|(field, value)| FilterExpr::Term { field, value })
        .labelled("term like status:active");

    let text = remainder().map(FilterExpr::Text);

    just('-')
        .or_not()
        .then(choice((exists, range, term, text)))
        .map(|(negation, expr)| FilterSpec {
            negated: negation.is_some(),
            expr,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BoolKind, LeafValue, Operator};
    use serde_json::json;
    use test_case::test_case;

    fn term(field: &str, value: &str) -> FilterExpr {
        FilterExpr::Term {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    // =========================================================================
    // Grammar
    // =========================================================================

    #[test]
    fn test_parse_term_colon() {
        let spec = parse_filter("title:golang").unwrap();
        assert!(!spec.negated);
        assert_eq!(spec.expr, term("title", "golang"));
    }

    #[test]
    fn test_parse_term_equals() {
        let spec = parse_filter("status=active").unwrap();
        assert_eq!(spec.expr, term("status", "active"));
    }

    #[test]
    fn test_parse_term_value_keeps_colons() {
        let spec = parse_filter("url:http://example.com").unwrap();
        assert_eq!(spec.expr, term("url", "http://example.com"));
    }

    #[test]
    fn test_parse_negated() {
        let spec = parse_filter("-title:golang").unwrap();
        assert!(spec.negated);
        assert_eq!(spec.expr, term("title", "golang"));
    }

    #[test_case("price>=10", RangeOp::Gte ; "gte")]
    #[test_case("price<=10", RangeOp::Lte ; "lte")]
    #[test_case("price>10", RangeOp::Gt ; "gt")]
    #[test_case("price<10", RangeOp::Lt ; "lt")]
    fn test_parse_range(input: &str, expected: RangeOp) {
        let spec = parse_filter(input).unwrap();
        assert_eq!(
            spec.expr,
            FilterExpr::Range {
                field: "price".to_string(),
                op: expected,
                value: "10".to_string(),
            }
        );
    }

    #[test]
    fn test_range_wins_over_colon() {
        let spec = parse_filter("created:at>2024-01-01").unwrap();
        assert_eq!(
            spec.expr,
            FilterExpr::Range {
                field: "created:at".to_string(),
                op: RangeOp::Gt,
                value: "2024-01-01".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_exists() {
        let spec = parse_filter("exists( author )").unwrap();
        assert_eq!(spec.expr, FilterExpr::Exists("author".to_string()));
    }

    #[test]
    fn test_parse_text() {
        let spec = parse_filter("rust async").unwrap();
        assert_eq!(spec.expr, FilterExpr::Text("rust async".to_string()));
    }

    #[test_case(":golang" ; "missing field")]
    #[test_case("title: " ; "missing value")]
    #[test_case("" ; "empty")]
    #[test_case("-" ; "bare negation")]
    fn test_parse_invalid(input: &str) {
        assert!(matches!(
            parse_filter(input),
            Err(ParseError::InvalidFilter { .. })
        ));
    }

    // =========================================================================
    // Clause conversion
    // =========================================================================

    #[test]
    fn test_negated_term_clause() {
        let clause = parse_filter("-title:golang").unwrap().into_clause(&[]);
        assert_eq!(clause, must_not_query(vec![term_query("title", "golang")]));
    }

    #[test]
    fn test_range_clause() {
        let clause = parse_filter("price>=10").unwrap().into_clause(&[]);
        let leaf = clause.as_leaf().unwrap();
        assert_eq!(leaf.operator, Operator::Gte);
        assert_eq!(leaf.field, "price");
        assert_eq!(leaf.value, LeafValue::Json(json!("10")));
    }

    #[test]
    fn test_exists_clause() {
        let clause = parse_filter("-exists(author)").unwrap().into_clause(&[]);
        assert_eq!(
            clause.as_bool().unwrap().sole_kind(),
            Some(BoolKind::MustNot)
        );
    }

    #[test]
    fn test_text_clause_without_default_fields() {
        let clause = parse_filter("golang").unwrap().into_clause(&[]);
        let leaf = clause.as_leaf().unwrap();
        assert_eq!(leaf.operator, Operator::MultiMatch);
        assert_eq!(leaf.parameters.get("fields"), Some(&json!(["*"])));
    }

    #[test]
    fn test_text_clause_single_default_field() {
        let fields = vec!["title^2".to_string()];
        let clause = parse_filter("golang").unwrap().into_clause(&fields);
        assert_eq!(clause, match_query("title", "golang").boost(2.0));
    }

    #[test]
    fn test_text_clause_many_default_fields() {
        let fields = vec!["title^2".to_string(), "body".to_string()];
        let clause = parse_filter("golang").unwrap().into_clause(&fields);
        let leaf = clause.as_leaf().unwrap();
        assert_eq!(leaf.operator, Operator::MultiMatch);
        assert_eq!(leaf.parameters.get("fields"), Some(&json!(["title^2", "body"])));
    }
}
