//! Query configuration
//!
//! Defaults applied by the query-string parser and the fuzziness cascade.

use serde::{Deserialize, Serialize};

/// Highest supported fuzziness level
pub const MAX_FUZZINESS: u8 = 5;

/// Query component configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Fields searched by free-text queries, optionally boosted (`title^3`)
    pub default_fields: Vec<String>,
    /// Fuzziness level used when a request does not set one
    pub default_fuzziness: u8,
    /// Upper bound applied to a requested page size
    pub max_size: Option<usize>,
    /// Page size used when a request does not set one
    pub default_size: Option<usize>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_fields: Vec::new(),
            default_fuzziness: 1,
            max_size: None,
            default_size: None,
        }
    }
}

impl QueryConfig {
    /// Create a config searching the given default fields
    pub fn with_default_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            default_fields: fields.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Default fuzziness clamped to the supported range
    pub fn fuzziness(&self) -> u8 {
        self.default_fuzziness.min(MAX_FUZZINESS)
    }

    /// Apply `max_size` to a requested size
    pub fn cap_size(&self, size: usize) -> usize {
        match self.max_size {
            Some(max) => size.min(max),
            None => size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = QueryConfig::default();
        assert!(config.default_fields.is_empty());
        assert_eq!(config.fuzziness(), 1);
        assert_eq!(config.cap_size(500), 500);
    }

    #[test]
    fn test_fuzziness_is_clamped() {
        let config = QueryConfig {
            default_fuzziness: 9,
            ..Default::default()
        };
        assert_eq!(config.fuzziness(), MAX_FUZZINESS);
    }

    #[test]
    fn test_cap_size() {
        let config = QueryConfig {
            max_size: Some(100),
            ..Default::default()
        };
        assert_eq!(config.cap_size(20), 20);
        assert_eq!(config.cap_size(1000), 100);
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: QueryConfig =
            serde_json::from_str(r#"{"default_fields": ["title^2", "body"]}"#).unwrap();
        assert_eq!(config.default_fields, vec!["title^2", "body"]);
        assert_eq!(config.default_fuzziness, 1);
        assert_eq!(config.max_size, None);
    }
}
