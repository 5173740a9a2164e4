//! Clause simplification.
//!
//! Removes vacuous nodes and redundant boolean nesting, bottom-up:
//! - empty leaves and childless composites are dropped from child lists
//! - a composite child whose only list has the parent list's kind is spliced
//!   into the parent list
//! - a composite left with a single child in a single list is replaced by
//!   that child
//!
//! `must_not` lists are never spliced or unwrapped: `bool{must_not:[X]}` is
//! not `X`, and a negation nested in a negation is not a single negation.
//! Composites carrying a boost or parameters are kept as they are, and
//! nothing is spliced into a composite carrying parameters such as
//! `minimum_should_match`, which counts the parent's direct children.

use crate::ir::{BoolClause, BoolKind, Clause, Leaf, LeafValue};

/// Simplify a clause tree into an equivalent, minimal one
pub fn simplify(clause: Clause) -> Clause {
    match clause {
        Clause::Leaf(leaf) => Clause::Leaf(simplify_leaf(leaf)),
        Clause::Bool(bool_clause) => simplify_bool(bool_clause),
    }
}

/// Leaves stay as they are; embedded sub-queries are simplified in place
fn simplify_leaf(mut leaf: Leaf) -> Leaf {
    leaf.value = match leaf.value {
        LeafValue::Nested(query) => LeafValue::Nested(Box::new(simplify(*query))),
        LeafValue::Hybrid(queries) => LeafValue::Hybrid(queries.into_iter().map(simplify).collect()),
        value => value,
    };
    leaf
}

fn simplify_bool(mut bool_clause: BoolClause) -> Clause {
    let splice = bool_clause.parameters.is_empty();
    for kind in BoolKind::ALL {
        let children = std::mem::take(bool_clause.list_mut(kind));
        *bool_clause.list_mut(kind) = simplify_list(kind, children, splice);
    }

    match bool_clause.sole_kind() {
        Some(kind) if is_unwrappable(&bool_clause, kind) && bool_clause.list(kind).len() == 1 => {
            let mut only = std::mem::take(bool_clause.list_mut(kind));
            match only.pop() {
                Some(child) => child,
                None => Clause::Bool(bool_clause),
            }
        }
        _ => Clause::Bool(bool_clause),
    }
}

fn simplify_list(kind: BoolKind, children: Vec<Clause>, splice: bool) -> Vec<Clause> {
    let mut simplified = Vec::with_capacity(children.len());

    for child in children {
        let child = simplify(child);
        if child.is_empty() {
            continue;
        }

        match child {
            Clause::Bool(mut inner)
                if splice && inner.sole_kind() == Some(kind) && is_unwrappable(&inner, kind) =>
            {
                simplified.append(inner.list_mut(kind));
            }
            other => simplified.push(other),
        }
    }

    simplified
}

fn is_unwrappable(bool_clause: &BoolClause, kind: BoolKind) -> bool {
    kind != BoolKind::MustNot && !bool_clause.is_decorated()
}
