// comment stripping, whitespace collapsing and the leading-keyword tokenizer

use regex::Regex;
use std::sync::LazyLock;

static LINE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"--[^\n]*").expect("valid regex"));
static BLOCK_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static PUNCT_SPACING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*([(),;])\s*").expect("valid regex"));
static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+|[^\w\s]+").expect("valid regex"));

// words that sit between CREATE and the object keyword
const CREATE_MODIFIERS: &[&str] = &[
    "OR", "REPLACE", "UNIQUE", "TEMP", "TEMPORARY", "UNLOGGED", "MATERIALIZED", "RECURSIVE",
    "GLOBAL", "LOCAL", "TRUSTED", "PROCEDURAL", "CONSTRAINT",
];

/// Strip comments and collapse whitespace. Idempotent.
pub fn normalize(sql: &str) -> String {
    // upstream callers sometimes hand us escaped newlines; make them real
    // before comment stripping or a trailing "-- x" would eat the rest
    let sql = sql.replace("\\n", "\n");
    let sql = LINE_COMMENT.replace_all(&sql, "");
    // a space, not nothing, so "a/**/b" cannot glue into a new token
    let sql = BLOCK_COMMENT.replace_all(&sql, " ");
    let sql = WHITESPACE.replace_all(&sql, " ");
    let sql = PUNCT_SPACING.replace_all(&sql, "$1");
    sql.trim().to_string()
}

pub fn tokenize(normalized: &str) -> Vec<&str> {
    TOKEN
        .find_iter(normalized)
        .map(|m| m.as_str())
        .filter(|t| !t.trim().is_empty())
        .collect()
}

/// Leading keyword(s) of a statement, original case kept.
/// CREATE/ALTER/DROP take the object keyword too ("CREATE TABLE").
pub fn detect_operation(tokens: &[&str]) -> String {
    let Some(first) = tokens.first() else {
        return "UNKNOWN".to_string();
    };

    let upper = first.to_uppercase();
    if !matches!(upper.as_str(), "CREATE" | "ALTER" | "DROP") {
        return first.to_string();
    }

    let mut words = vec![*first];
    for token in &tokens[1..] {
        if !token.chars().all(|c| c.is_alphanumeric() || c == '_') {
            break;
        }
        words.push(token);
        let is_modifier =
            upper == "CREATE" && CREATE_MODIFIERS.contains(&token.to_uppercase().as_str());
        if !is_modifier {
            break;
        }
    }
    words.join(" ")
}
