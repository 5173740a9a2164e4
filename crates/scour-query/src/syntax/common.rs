//! Shared parser primitives for query-string syntaxes.

use chumsky::extra;
use chumsky::prelude::*;

/// Extra type for parsers - uses Rich errors for better messages
pub type Extra<'src> = extra::Err<Rich<'src, char>>;

/// Parser for a trimmed, non-empty run of characters outside `stop`
pub fn text_until<'src>(
    stop: &'static str,
) -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    none_of(stop)
        .repeated()
        .at_least(1)
        .to_slice()
        .map(|s: &str| s.trim().to_string())
}

/// Parser for the rest of the input, trimmed and non-empty
pub fn remainder<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    any()
        .repeated()
        .at_least(1)
        .to_slice()
        .map(|s: &str| s.trim().to_string())
}

/// Format chumsky errors as a single readable message
pub fn format_errors(errs: &[Rich<'_, char>]) -> String {
    errs.iter()
        .map(|e| {
            let found = e
                .found()
                .map_or("end of input".to_string(), |c| format!("'{}'", c));

            format!(
                "column {}: {} (found {})",
                e.span().start + 1,
                e.reason(),
                found
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_until_stops() {
        let result = text_until(":")
            .then_ignore(just(':'))
            .then(remainder())
            .parse(" title : golang")
            .into_result();
        assert_eq!(
            result.unwrap(),
            ("title".to_string(), "golang".to_string())
        );
    }

    #[test]
    fn test_remainder_requires_input() {
        assert!(remainder().parse("").into_result().is_err());
    }

    #[test]
    fn test_format_errors_mentions_column() {
        let errs = text_until(":")
            .then_ignore(just(':'))
            .parse("title")
            .into_result()
            .unwrap_err();
        let message = format_errors(&errs);
        assert!(message.starts_with("column "));
        assert!(message.contains("end of input"));
    }
}
