// heuristic structure extraction: tables, columns, functions, schemas, flags
// a pattern that does not match yields an empty collection, never an error

use super::keywords::Keywords;
use super::normalize::{detect_operation, normalize, tokenize};
use super::types::ParsedQuery;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

const IDENT: &str = r#"(?:"[^"]+"|'[^']+'|`[^`]+`|[A-Za-z_][\w$]*)"#;

static TABLE_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    let clause = r"(FROM|(?:(?:INNER|LEFT|RIGHT|FULL|CROSS)\s+(?:OUTER\s+)?)?JOIN|INSERT\s+INTO|UPDATE|ALTER\s+TABLE(?:\s+IF\s+EXISTS)?|DELETE\s+FROM|CREATE\s+(?:\w+\s+)*?TABLE(?:\s+IF\s+NOT\s+EXISTS)?|DROP\s+TABLE(?:\s+IF\s+EXISTS)?|TRUNCATE(?:\s+TABLE)?|INDEX\s+(?:CONCURRENTLY\s+)?(?:IF\s+NOT\s+EXISTS\s+)?\w+\s+ON)";
    Regex::new(&format!(r"(?i)\b{clause}\s+(?:ONLY\s+)?({IDENT}(?:\.{IDENT})?)"))
        .expect("valid regex")
});

static SELECT_LIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\bSELECT\s+(?:DISTINCT\s+|ALL\s+)?(.+?)\s+FROM\b").expect("valid regex")
});

static FUNCTION_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\b(\w+)\s+)?\b((?:[A-Za-z_][\w$]*\.)?[A-Za-z_][\w$]*)\(")
        .expect("valid regex")
});

static THREE_PART_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Za-z_]\w*)\.[A-Za-z_]\w*\.[A-Za-z_]\w*\b").expect("valid regex")
});

static SYSTEM_QUALIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(pg_catalog|information_schema|pg_toast)\.\w+").expect("valid regex")
});

static SUBQUERY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\(\s*SELECT\b|\bEXISTS\s*\(|\bIN\s*\(\s*SELECT\b").expect("valid regex")
});

static CTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bWITH\s+(?:RECURSIVE\s+)?[A-Za-z_]\w*(?:\([^)]*\))?\s+AS\b")
        .expect("valid regex")
});

static WINDOW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bOVER\s*\(").expect("valid regex"));

static MODIFYING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:INSERT|UPDATE|DELETE|CREATE|ALTER|DROP|TRUNCATE|MERGE)\b")
        .expect("valid regex")
});

// words the table pattern can land on that are never table names
const NOT_TABLES: &[&str] = &[
    "IF", "ONLY", "LATERAL", "SET", "SELECT", "EXISTS", "NOT", "TABLE", "VALUES", "WHERE", "OF",
    "CASCADE", "RESTRICT", "NO", "NOTHING", "ON",
];

// a name after one of these followed by "(" is a definition or column list
const NOT_CALL_PREFIXES: &[&str] = &[
    "INTO", "TABLE", "EXISTS", "REFERENCES", "ON", "FUNCTION", "PROCEDURE", "VIEW", "TYPE",
    "TRIGGER", "AGGREGATE",
];

/// Run the normalizer and every extractor over one sql string.
pub fn parse(sql: &str) -> ParsedQuery {
    let normalized = normalize(sql);
    let tokens = tokenize(&normalized);
    let operation = detect_operation(&tokens);

    let tables = extract_tables(&normalized);
    let columns = extract_columns(&normalized);
    let functions = extract_functions(&normalized);
    let schemas = extract_schemas(&normalized, &tables);

    let is_modifying = MODIFYING.is_match(&normalized);

    ParsedQuery {
        original_sql: sql.to_string(),
        has_subqueries: SUBQUERY.is_match(&normalized),
        has_ctes: CTE.is_match(&normalized),
        has_window_functions: WINDOW.is_match(&normalized),
        is_modifying,
        is_read_only: !is_modifying,
        normalized_sql: normalized,
        operation,
        tables,
        columns,
        functions,
        schemas,
    }
}

pub fn extract_tables(normalized: &str) -> BTreeSet<String> {
    let mut tables = BTreeSet::new();

    for caps in TABLE_CLAUSE.captures_iter(normalized) {
        let (Some(clause), Some(name)) = (caps.get(1), caps.get(2)) else {
            continue;
        };

        // "FROM generate_series(...)" reads a function, not a table
        let clause = clause.as_str().to_uppercase();
        let followed_by_paren = normalized[name.end()..].starts_with('(');
        if followed_by_paren && (clause == "FROM" || clause.ends_with("JOIN")) {
            continue;
        }

        let name = clean_identifier(name.as_str());
        let bare = name.rsplit('.').next().unwrap_or(&name);
        if bare.is_empty() || NOT_TABLES.contains(&bare.to_uppercase().as_str()) {
            continue;
        }
        tables.insert(name);
    }

    tables
}

pub fn extract_columns(normalized: &str) -> BTreeSet<String> {
    let mut columns = BTreeSet::new();

    let Some(list) = SELECT_LIST.captures(normalized).and_then(|c| c.get(1)) else {
        return columns;
    };
    let list = list.as_str();
    if list.contains('*') {
        return columns;
    }

    for item in list.split(',') {
        let item = item.trim();
        // fragments of function calls, not columns
        if item.is_empty() || item.contains('(') || item.contains(')') {
            continue;
        }
        let column = strip_alias(item);
        if !column.is_empty() {
            columns.insert(column.to_string());
        }
    }

    columns
}

pub fn extract_functions(normalized: &str) -> BTreeSet<String> {
    let kw = Keywords::get();
    let mut functions = BTreeSet::new();

    for caps in FUNCTION_CALL.captures_iter(normalized) {
        let Some(name) = caps.get(2) else {
            continue;
        };
        // "pg_catalog.now(" is the call "now"
        let name = name.as_str().rsplit('.').next().unwrap_or_default();
        if kw.is_non_function_word(name) {
            continue;
        }
        if let Some(prefix) = caps.get(1)
            && NOT_CALL_PREFIXES.contains(&prefix.as_str().to_uppercase().as_str())
        {
            continue;
        }
        functions.insert(name.to_uppercase());
    }

    functions
}

pub fn extract_schemas(normalized: &str, tables: &BTreeSet<String>) -> BTreeSet<String> {
    let mut schemas: BTreeSet<String> = tables
        .iter()
        .filter_map(|t| t.rsplit_once('.').map(|(schema, _)| schema.to_string()))
        .collect();

    for caps in THREE_PART_NAME.captures_iter(normalized) {
        if let Some(schema) = caps.get(1) {
            schemas.insert(schema.as_str().to_string());
        }
    }
    for caps in SYSTEM_QUALIFIER.captures_iter(normalized) {
        if let Some(schema) = caps.get(1) {
            schemas.insert(schema.as_str().to_lowercase());
        }
    }

    if schemas.is_empty() {
        schemas.insert("public".to_string());
    }
    schemas
}

// strip quoting from each part of a possibly qualified name
fn clean_identifier(raw: &str) -> String {
    raw.split('.')
        .map(|part| part.trim_matches(|c: char| c == '"' || c == '\'' || c == '`'))
        .collect::<Vec<_>>()
        .join(".")
}

fn strip_alias(item: &str) -> &str {
    let upper = item.to_ascii_uppercase();
    let item = match upper.find(" AS ") {
        Some(idx) => &item[..idx],
        None => item,
    };
    // implicit alias: "col alias"
    item.split_whitespace().next().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_identifiers() {
        let tables = extract_tables(r#"SELECT * FROM "Order Items" JOIN `audit`.log ON x=y"#);
        assert!(tables.contains("Order Items"));
        assert!(tables.contains("audit.log"));
    }

    #[test]
    fn alias_stripping() {
        assert_eq!(strip_alias("u.name AS n"), "u.name");
        assert_eq!(strip_alias("email e"), "email");
        assert_eq!(strip_alias("id"), "id");
    }

    #[test]
    fn qualified_column_list_is_not_a_call() {
        let functions = extract_functions("INSERT INTO audit.events(id)VALUES(1)");
        assert!(functions.is_empty());
        let functions = extract_functions("SELECT pg_catalog.pg_read_file('x')");
        assert!(functions.contains("PG_READ_FILE"));
    }

    #[test]
    fn table_function_is_not_a_table() {
        let tables = extract_tables("SELECT * FROM generate_series(1,10)");
        assert!(tables.is_empty());
    }
}
