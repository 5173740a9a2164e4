//! Target compilers for the query IR.
//!
//! Compilers turn a finalized [`QueryBuilder`] into the native JSON request
//! document of a search engine.

mod elasticsearch;
pub mod flatten;

pub use elasticsearch::ElasticsearchCompiler;
pub use flatten::{flatten_bool_clauses, merge_queries};

use crate::builder::QueryBuilder;
use crate::error::RenderError;
use serde_json::Value;

/// Trait for compiling a query builder into a backend document.
pub trait DslCompiler: Send + Sync {
    /// Unique name for this compiler
    fn name(&self) -> &str;

    /// Compile the builder into a request document.
    ///
    /// An unbuilt builder is finalized on a copy first.
    fn compile(&self, builder: &QueryBuilder) -> Result<Value, RenderError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct MockCompiler;

    impl DslCompiler for MockCompiler {
        fn name(&self) -> &str {
            "mock"
        }

        fn compile(&self, builder: &QueryBuilder) -> Result<Value, RenderError> {
            Ok(json!({"size": builder.get_size()}))
        }
    }

    #[test]
    fn test_mock_compiler() {
        let compiler: Box<dyn DslCompiler> = Box::new(MockCompiler);
        let doc = compiler.compile(&QueryBuilder::new().size(3)).unwrap();

        assert_eq!(compiler.name(), "mock");
        assert_eq!(doc, json!({"size": 3}));
    }
}
