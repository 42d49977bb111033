// category/subcategory taxonomy and the coarse ai pre-filter
// everything here is a pure function of already extracted data

use super::complexity::{complexity, complexity_score};
use super::keywords::Keywords;
use super::types::{ParsedQuery, QueryCategory, QueryComplexity, QuerySubcategory, SafetyLevel};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static BARE_IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][\w$]*$").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub category: QueryCategory,
    pub subcategory: QuerySubcategory,
    pub complexity: QueryComplexity,
    pub complexity_score: u32,
    pub ai_prompt_type: &'static str,
    pub recommended_safety_level: SafetyLevel,
    pub pre_filter_executable: bool,
}

pub fn classify(query: &ParsedQuery) -> Classification {
    let category = category(&query.operation, &query.normalized_sql);
    let subcategory = subcategory(category, &query.operation);
    let complexity = complexity(query);

    Classification {
        category,
        subcategory,
        complexity,
        complexity_score: complexity_score(query),
        ai_prompt_type: ai_prompt_type(category, subcategory),
        recommended_safety_level: recommended_safety_level(category, subcategory),
        pre_filter_executable: is_ai_executable(category, subcategory, complexity),
    }
}

pub fn category(operation: &str, normalized: &str) -> QueryCategory {
    let kw = Keywords::get();
    let Some(first) = operation.split_whitespace().next() else {
        return QueryCategory::Unknown;
    };

    if let Some(category) = kw.category_of(first) {
        return category;
    }

    // "selet(...)" is a broken statement, not a call
    if kw.is_malformed_keyword(first) {
        return QueryCategory::Unknown;
    }

    let called = normalized
        .strip_prefix(first)
        .is_some_and(|rest| rest.starts_with('('));
    if BARE_IDENT.is_match(first) && called {
        return QueryCategory::Function;
    }

    QueryCategory::Unknown
}

pub fn subcategory(category: QueryCategory, operation: &str) -> QuerySubcategory {
    use QuerySubcategory::*;

    let upper = operation.to_uppercase();
    let words: Vec<&str> = upper.split_whitespace().collect();
    let has = |word: &str| words.iter().any(|w| *w == word);
    let first = words.first().copied().unwrap_or("");

    let found = match category {
        QueryCategory::Ddl => {
            if has("POLICY") {
                Some(RlsPolicy)
            } else if first == "CREATE" {
                if has("TABLE") {
                    Some(TableCreation)
                } else if has("INDEX") {
                    Some(IndexCreation)
                } else if has("VIEW") {
                    Some(ViewCreation)
                } else if has("FUNCTION") || has("PROCEDURE") {
                    Some(FunctionCreation)
                } else if has("SCHEMA") {
                    Some(SchemaCreation)
                } else if has("TRIGGER") {
                    Some(TriggerCreation)
                } else {
                    None
                }
            } else if first == "ALTER" && has("TABLE") {
                Some(TableModification)
            } else if first == "DROP" {
                if has("TABLE") {
                    Some(TableDeletion)
                } else if has("INDEX") {
                    Some(IndexDeletion)
                } else if has("VIEW") {
                    Some(ViewDeletion)
                } else if has("FUNCTION") || has("PROCEDURE") {
                    Some(FunctionDeletion)
                } else if has("SCHEMA") {
                    Some(SchemaDeletion)
                } else {
                    None
                }
            } else if first == "TRUNCATE" {
                Some(TableTruncation)
            } else {
                None
            }
        }
        QueryCategory::Dml => match first {
            "SELECT" | "WITH" | "VALUES" | "TABLE" => Some(DataQuery),
            "INSERT" => Some(DataInsert),
            "UPDATE" => Some(DataUpdate),
            "DELETE" => Some(DataDelete),
            "MERGE" => Some(DataMerge),
            _ => None,
        },
        QueryCategory::Dcl => match first {
            "GRANT" => Some(PermissionGrant),
            "REVOKE" => Some(PermissionRevoke),
            _ => None,
        },
        QueryCategory::Tcl => match first {
            "BEGIN" | "START" => Some(TransactionBegin),
            "COMMIT" | "END" => Some(TransactionCommit),
            "ROLLBACK" | "ABORT" => Some(TransactionRollback),
            "SAVEPOINT" | "RELEASE" => Some(Savepoint),
            _ => None,
        },
        QueryCategory::Utility => match first {
            "EXPLAIN" => Some(Explain),
            "VACUUM" | "ANALYZE" | "ANALYSE" | "REINDEX" | "CLUSTER" | "CHECKPOINT"
            | "REFRESH" => Some(Maintenance),
            "COPY" => Some(DataCopy),
            "SET" | "SHOW" | "RESET" | "DISCARD" => Some(SessionSetting),
            _ => None,
        },
        QueryCategory::Function => {
            let kw = Keywords::get();
            if kw.is_aggregate_function(first) {
                Some(Aggregate)
            } else if kw.is_window_function(first) {
                Some(Window)
            } else if kw.is_builtin_function(first) {
                Some(Builtin)
            } else {
                Some(UserFunction)
            }
        }
        QueryCategory::Unknown => Some(Unknown),
    };

    found.unwrap_or_else(|| QuerySubcategory::other_of(category))
}

pub fn ai_prompt_type(category: QueryCategory, subcategory: QuerySubcategory) -> &'static str {
    use QuerySubcategory::*;

    match (category, subcategory) {
        (QueryCategory::Ddl, TableCreation) => "create_table",
        (QueryCategory::Ddl, TableModification) => "alter_table",
        (QueryCategory::Ddl, TableDeletion) => "drop_table",
        (QueryCategory::Ddl, IndexCreation) => "create_index",
        (QueryCategory::Ddl, ViewCreation) => "create_view",
        (QueryCategory::Ddl, FunctionCreation) => "create_function",
        (QueryCategory::Ddl, RlsPolicy) => "rls_policy",
        (QueryCategory::Ddl, _) => "ddl_operation",
        (QueryCategory::Dml, DataQuery) => "data_query",
        (QueryCategory::Dml, DataInsert) => "data_insert",
        (QueryCategory::Dml, DataUpdate) => "data_update",
        (QueryCategory::Dml, DataDelete) => "data_delete",
        (QueryCategory::Dml, _) => "data_operation",
        (QueryCategory::Dcl, PermissionGrant) => "grant_permission",
        (QueryCategory::Dcl, PermissionRevoke) => "revoke_permission",
        (QueryCategory::Dcl, _) => "permission_operation",
        (QueryCategory::Tcl, _) => "transaction_control",
        (QueryCategory::Utility, Explain) => "explain_query",
        (QueryCategory::Utility, _) => "utility_operation",
        (QueryCategory::Function, Aggregate) => "aggregate_query",
        (QueryCategory::Function, Window) => "window_query",
        (QueryCategory::Function, Builtin) => "builtin_function",
        (QueryCategory::Function, _) => "function_call",
        (QueryCategory::Unknown, _) => "general_sql",
    }
}

/// Coarse pre-filter. The security analyzer makes the real call.
pub fn is_ai_executable(
    category: QueryCategory,
    subcategory: QuerySubcategory,
    complexity: QueryComplexity,
) -> bool {
    if matches!(category, QueryCategory::Dcl | QueryCategory::Utility) {
        return false;
    }
    if complexity == QueryComplexity::VeryComplex {
        return false;
    }

    match category {
        QueryCategory::Ddl => matches!(
            subcategory,
            QuerySubcategory::TableCreation | QuerySubcategory::IndexCreation
        ),
        QueryCategory::Dml => subcategory == QuerySubcategory::DataQuery,
        QueryCategory::Function => true,
        _ => false,
    }
}

pub fn recommended_safety_level(
    category: QueryCategory,
    subcategory: QuerySubcategory,
) -> SafetyLevel {
    use QuerySubcategory::*;

    match category {
        QueryCategory::Utility | QueryCategory::Dcl => SafetyLevel::Block,
        QueryCategory::Ddl => match subcategory {
            TableDeletion => SafetyLevel::Block,
            _ => SafetyLevel::Review,
        },
        QueryCategory::Dml => match subcategory {
            DataQuery => SafetyLevel::Allow,
            _ => SafetyLevel::Review,
        },
        QueryCategory::Function => match subcategory {
            Builtin | Aggregate => SafetyLevel::Allow,
            _ => SafetyLevel::Review,
        },
        _ => SafetyLevel::Review,
    }
}
