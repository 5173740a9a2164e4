//! Subcommand implementations. Each returns the text to print.

use crate::cli::ConfigFormat;
use crate::config::CliConfig;
use anyhow::{Context, Result};
use scour_query::{parse_request, DslCompiler, ElasticsearchCompiler, QueryParams};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

/// `scour compile`: query string to backend document
pub fn compile(config: &CliConfig, query: &str, base: Option<&Path>, pretty: bool) -> Result<String> {
    let params = QueryParams::parse(query);
    debug!(params = params.len(), "parsed query string");

    let builder = parse_request(&params, &config.query)
        .context("Invalid query string")?
        .built();

    let compiler = ElasticsearchCompiler::new();
    let document = match base {
        Some(path) => {
            let base = load_base_query(path)?;
            info!(path = %path.display(), "compiling on top of raw query");
            compiler.compile_on_top_of(Some(&base), &builder)
        }
        None => compiler.compile(&builder),
    }
    .context("Failed to compile query document")?;

    if pretty {
        serde_json::to_string_pretty(&document).context("Failed to serialize document")
    } else {
        serde_json::to_string(&document).context("Failed to serialize document")
    }
}

/// `scour config`: effective configuration
pub fn show_config(config: &CliConfig, format: ConfigFormat) -> Result<String> {
    match format {
        ConfigFormat::Toml => config.display_as_toml(),
        ConfigFormat::Json => config.display_as_json(),
    }
}

/// Read a raw query clause; a full request document contributes its `query`
fn load_base_query(path: &Path) -> Result<Value> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read base query: {}", path.display()))?;
    let mut value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse base query: {}", path.display()))?;

    Ok(match value.get_mut("query") {
        Some(query) => query.take(),
        None => value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn compile_json(config: &CliConfig, query: &str, base: Option<&Path>) -> Value {
        let output = compile(config, query, base, false).unwrap();
        serde_json::from_str(&output).unwrap()
    }

    #[test]
    fn test_compile_query_string() {
        let doc = compile_json(&CliConfig::default(), "?filter=-title:golang&size=5", None);
        assert_eq!(
            doc,
            json!({
                "query": {"bool": {"must_not": [{"term": {"title": {"value": "golang"}}}]}},
                "size": 5,
            })
        );
    }

    #[test]
    fn test_compile_uses_configured_default_fields() {
        let mut config = CliConfig::default();
        config.query.default_fields = vec!["title".to_string()];

        let doc = compile_json(&config, "query=golang", None);
        assert_eq!(doc, json!({"query": {"match": {"title": {"query": "golang"}}}}));
    }

    #[test]
    fn test_compile_on_top_of_base_document() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"query": {{"term": {{"tenant": {{"value": "acme"}}}}}}}}"#).unwrap();

        let doc = compile_json(&CliConfig::default(), "filter=lang:en", Some(file.path()));
        assert_eq!(
            doc,
            json!({"query": {"bool": {"must": [
                {"term": {"tenant": {"value": "acme"}}},
                {"term": {"lang": {"value": "en"}}},
            ]}}})
        );
    }

    #[test]
    fn test_compile_reports_invalid_input() {
        let err = compile(&CliConfig::default(), "agg[a][terms]=x&agg[a][terms][field]=y", None, false)
            .unwrap_err();
        assert!(err.to_string().contains("Invalid query string"));
    }

    #[test]
    fn test_pretty_output() {
        let output = compile(&CliConfig::default(), "size=1", None, true).unwrap();
        assert_eq!(output, "{\n  \"size\": 1\n}");
    }

    #[test]
    fn test_show_config_json() {
        let output = show_config(&CliConfig::default(), ConfigFormat::Json).unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["query"]["default_fuzziness"], json!(1));
    }
}
