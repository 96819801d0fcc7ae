//! Pulls an arithmetic expression or a definable term out of free text.

use regex::Regex;
use std::sync::LazyLock;

static EXPRESSION_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(?:(?:calculate|compute|what\s+is|find)\b)?\s*").unwrap());

static TERM_TRIGGER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:define|what\s+is|meaning\s+of|definition\s+of)\s+(.+)$").unwrap()
});

static WORD_OPERATORS: LazyLock<[(Regex, &'static str); 5]> = LazyLock::new(|| {
    [
        (Regex::new(r"\bplus\b").unwrap(), "+"),
        (Regex::new(r"\bminus\b").unwrap(), "-"),
        (Regex::new(r"\btimes\b").unwrap(), "*"),
        (Regex::new(r"\bdivided\s+by\b").unwrap(), "/"),
        (Regex::new(r"\bsquare\s+root\s+of\b").unwrap(), "sqrt("),
    ]
});

const TRAILING_PUNCTUATION: &[char] = &['?', '.', '!'];

/// Extract the expression part of a calculator query.
///
/// Strips a leading "calculate"/"compute"/"what is"/"find" and trailing
/// punctuation. Returns `None` when nothing is left.
pub fn extract_expression(query: &str) -> Option<String> {
    let rest = EXPRESSION_PREFIX.replace(query, "");
    non_empty(rest.trim().trim_end_matches(TRAILING_PUNCTUATION).trim())
}

/// Rewrite word operators into symbols.
///
/// "square root of X" becomes `sqrt(X`, closed at the end of the expression
/// if the rewrite left a parenthesis open.
pub fn normalize_expression(expression: &str) -> String {
    let mut normalized = expression.to_lowercase();
    for (pattern, symbol) in WORD_OPERATORS.iter() {
        normalized = pattern.replace_all(&normalized, *symbol).into_owned();
    }

    if normalized.contains("sqrt(") {
        let open = normalized.matches('(').count();
        let close = normalized.matches(')').count();
        if open > close {
            normalized.push_str(&")".repeat(open - close));
        }
    }

    normalized
}

/// Extract the term a dictionary query asks about.
///
/// Takes the text after the leftmost "define"/"what is"/"meaning of"/
/// "definition of"; without any of them, the whole trimmed query.
pub fn extract_term(query: &str) -> Option<String> {
    match TERM_TRIGGER.captures(query) {
        Some(caps) => non_empty(caps[1].trim().trim_end_matches(TRAILING_PUNCTUATION).trim()),
        None => non_empty(query.trim()),
    }
}

fn non_empty(text: &str) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_expression_strips_trigger_and_punctuation() {
        assert_eq!(extract_expression("calculate 25 * 4").as_deref(), Some("25 * 4"));
        assert_eq!(extract_expression("What is 5*3?").as_deref(), Some("5*3"));
        assert_eq!(extract_expression("Compute 2 plus 2.").as_deref(), Some("2 plus 2"));
        assert_eq!(extract_expression("  find 10 / 4 ").as_deref(), Some("10 / 4"));
        assert_eq!(extract_expression("7 - 2").as_deref(), Some("7 - 2"));
        assert_eq!(extract_expression("findings 2+2").as_deref(), Some("findings 2+2"));
    }

    #[test]
    fn test_extract_expression_empty() {
        assert_eq!(extract_expression("calculate"), None);
        assert_eq!(extract_expression("what is ?"), None);
        assert_eq!(extract_expression("   "), None);
    }

    #[test]
    fn test_normalize_word_operators() {
        assert_eq!(normalize_expression("2 plus 3"), "2 + 3");
        assert_eq!(normalize_expression("10 MINUS 4"), "10 - 4");
        assert_eq!(normalize_expression("6 times 7"), "6 * 7");
        assert_eq!(normalize_expression("9 divided  by 3"), "9 / 3");
    }

    #[test]
    fn test_normalize_square_root_closes_paren() {
        assert_eq!(normalize_expression("square root of 16"), "sqrt( 16)");
        assert_eq!(normalize_expression("square root of (9)"), "sqrt( (9))");
        assert_eq!(normalize_expression("square root of 16)"), "sqrt( 16)");
    }

    #[test]
    fn test_normalize_keeps_word_fragments() {
        assert_eq!(normalize_expression("surplus"), "surplus");
    }

    #[test]
    fn test_extract_term() {
        assert_eq!(extract_term("define osmosis").as_deref(), Some("osmosis"));
        assert_eq!(extract_term("What is blockchain?").as_deref(), Some("blockchain"));
        assert_eq!(
            extract_term("meaning of serendipity.").as_deref(),
            Some("serendipity")
        );
        assert_eq!(
            extract_term("Definition of  Photosynthesis").as_deref(),
            Some("Photosynthesis")
        );
    }

    #[test]
    fn test_extract_term_falls_back_to_query() {
        assert_eq!(extract_term("  serendipity  ").as_deref(), Some("serendipity"));
        assert_eq!(extract_term("   "), None);
        assert_eq!(extract_term("define ?"), None);
    }
}
