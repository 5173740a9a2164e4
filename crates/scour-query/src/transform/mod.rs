//! Clause tree transforms.
//!
//! Normalization passes run by [`QueryBuilder::build`](crate::QueryBuilder::build)
//! before a tree reaches a renderer.

mod simplify;

pub use simplify::simplify;
