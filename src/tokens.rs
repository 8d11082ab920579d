use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static GO_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:[a-z]:)?(?:go:)?").expect("GO prefix pattern is valid")
});

/// Split user input on commas and newlines into unique, trimmed, non-empty
/// tokens. First occurrence wins, so the output keeps input order.
pub fn parse_tokens(input: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    input
        .split(|ch| ch == ',' || ch == '\n' || ch == '\r')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter(|token| seen.insert(token.to_string()))
        .map(str::to_string)
        .collect()
}

/// Inverse of [`parse_tokens`] for display and form pre-filling.
pub fn tokens_to_string(tokens: &[String]) -> String {
    tokens.join(", ")
}

/// Canonical form of a GO identifier: `C:GO:0005634`, `GO:0005634`,
/// `go:0005634` and `0005634` all become `0005634`.
pub fn normalize_go_term(term: &str) -> String {
    let trimmed = term.trim();
    GO_PREFIX.replace(trimmed, "").into_owned()
}

/// Branch letter (`P`, `F` or `C`) carried by a prefixed GO id.
pub fn go_branch_of(term: &str) -> Option<char> {
    let trimmed = term.trim();
    let mut chars = trimmed.chars();
    let branch = chars.next()?;
    if branch.is_ascii_alphabetic() && chars.next() == Some(':') {
        let marker = trimmed.get(2..5);
        if marker.is_some_and(|m| m.eq_ignore_ascii_case("go:")) {
            return Some(branch.to_ascii_uppercase());
        }
    }
    None
}
