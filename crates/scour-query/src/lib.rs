//! Backend-agnostic search query algebra for Scour
//!
//! This crate turns search intent into the JSON request body of a
//! document-oriented search engine. Intent is expressed either in code, as a
//! tree of boolean clauses and aggregation descriptors, or as untrusted HTTP
//! query-string input parsed into the same model.
//!
//! ## Pipeline
//!
//! - **Syntax**: `query`/`filter`/`sort`/... parameters and `agg[...]`
//!   bracket notation become a [`QueryBuilder`]
//! - **Build**: the free-text query expands into a fuzziness cascade and the
//!   clause tree is simplified
//! - **Render**: a [`DslCompiler`] emits the backend document
//!
//! ## Usage
//!
//! ```rust,ignore
//! use scour_query::{parse_request, DslCompiler, ElasticsearchCompiler, QueryConfig, QueryParams};
//!
//! let config = QueryConfig::with_default_fields(["title^2", "body"]);
//! let params = QueryParams::parse("query=golang&filter=-status:draft&sort=_score&size=10");
//!
//! let builder = parse_request(&params, &config)?.built();
//! let document = ElasticsearchCompiler::new().compile(&builder)?;
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod ir;
pub mod render;
pub mod syntax;
pub mod transform;

// Re-exports
pub use builder::{fuzziness_cascade, QueryBuilder};
pub use config::QueryConfig;
pub use error::{ParseError, RenderError, ScourError, ScourResult};
pub use render::{DslCompiler, ElasticsearchCompiler};
pub use syntax::{parse_aggregations, parse_request, QueryParams, QueryStringParser};
pub use transform::simplify;
