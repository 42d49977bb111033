// tests for categories, subcategories, complexity and the pre-filter

use sqlgate::{
    ParsedQuery, QueryCategory, QueryComplexity, QuerySubcategory, SafetyLevel, ai_prompt_type,
    bucket, classify, complexity, parse,
};
use std::collections::BTreeSet;

fn classify_sql(sql: &str) -> sqlgate::Classification {
    classify(&parse(sql))
}

fn names(n: usize, prefix: &str) -> BTreeSet<String> {
    (0..n).map(|i| format!("{prefix}{i}")).collect()
}

fn shaped(tables: usize, functions: usize, sub: bool, cte: bool, window: bool) -> ParsedQuery {
    ParsedQuery {
        original_sql: String::new(),
        normalized_sql: String::new(),
        operation: "SELECT".to_string(),
        tables: names(tables, "t"),
        columns: BTreeSet::new(),
        functions: names(functions, "F"),
        schemas: BTreeSet::from(["public".to_string()]),
        has_subqueries: sub,
        has_ctes: cte,
        has_window_functions: window,
        is_modifying: false,
        is_read_only: true,
    }
}

#[test]
fn test_categories() {
    let cases = [
        ("SELECT 1", QueryCategory::Dml),
        ("WITH x AS (SELECT 1) SELECT * FROM x", QueryCategory::Dml),
        ("CREATE TABLE t (id int)", QueryCategory::Ddl),
        ("GRANT SELECT ON t TO bob", QueryCategory::Dcl),
        ("BEGIN", QueryCategory::Tcl),
        ("EXPLAIN SELECT 1", QueryCategory::Utility),
        ("my_func(1)", QueryCategory::Function),
        ("SELET * FROM users", QueryCategory::Unknown),
        ("FORM users", QueryCategory::Unknown),
        ("", QueryCategory::Unknown),
    ];
    for (sql, expected) in cases {
        assert_eq!(classify_sql(sql).category, expected, "{sql}");
    }
}

#[test]
fn test_malformed_call_is_unknown() {
    let c = classify_sql("selet(1)");
    assert_eq!(c.category, QueryCategory::Unknown);
    assert_eq!(c.subcategory, QuerySubcategory::Unknown);
    assert_eq!(c.ai_prompt_type, "general_sql");
}

#[test]
fn test_subcategories() {
    let cases = [
        ("CREATE TABLE t (id int)", QuerySubcategory::TableCreation),
        ("CREATE UNIQUE INDEX i ON t (a)", QuerySubcategory::IndexCreation),
        ("CREATE POLICY p ON t USING (true)", QuerySubcategory::RlsPolicy),
        ("ALTER POLICY p ON t USING (true)", QuerySubcategory::RlsPolicy),
        ("DROP TABLE t", QuerySubcategory::TableDeletion),
        ("TRUNCATE t", QuerySubcategory::TableTruncation),
        ("ALTER TABLE t ADD COLUMN c int", QuerySubcategory::TableModification),
        ("SELECT 1", QuerySubcategory::DataQuery),
        ("DELETE FROM t WHERE id = 1", QuerySubcategory::DataDelete),
        ("REVOKE ALL ON t FROM bob", QuerySubcategory::PermissionRevoke),
        ("ROLLBACK", QuerySubcategory::TransactionRollback),
        ("VACUUM t", QuerySubcategory::Maintenance),
        ("count(*)", QuerySubcategory::Aggregate),
        ("row_number()", QuerySubcategory::Window),
        ("now()", QuerySubcategory::Builtin),
        ("my_func(1)", QuerySubcategory::UserFunction),
        ("CREATE SEQUENCE s", QuerySubcategory::OtherDdl),
    ];
    for (sql, expected) in cases {
        let c = classify_sql(sql);
        assert_eq!(c.subcategory, expected, "{sql}");
        // a subcategory always belongs to its category
        assert_eq!(c.subcategory.category(), c.category, "{sql}");
    }
}

#[test]
fn test_prompt_types() {
    assert_eq!(ai_prompt_type("SELECT * FROM users"), "data_query");
    assert_eq!(ai_prompt_type("CREATE TABLE t (id int)"), "create_table");
    assert_eq!(ai_prompt_type("CREATE POLICY p ON t USING (true)"), "rls_policy");
    assert_eq!(ai_prompt_type("GRANT SELECT ON t TO bob"), "grant_permission");
    assert_eq!(ai_prompt_type("COMMIT"), "transaction_control");
    assert_eq!(ai_prompt_type("EXPLAIN SELECT 1"), "explain_query");
    assert_eq!(ai_prompt_type("sum(x)"), "aggregate_query");
    assert_eq!(ai_prompt_type("xyzzy"), "general_sql");
}

#[test]
fn test_complexity_boundaries() {
    // 10 + 5
    assert_eq!(complexity(&shaped(2, 0, false, false, false)), QueryComplexity::Simple);
    // 10 + 20 + 5
    assert_eq!(complexity(&shaped(2, 0, true, false, false)), QueryComplexity::Moderate);
    // 10 + 15 + 25 + 10
    assert_eq!(complexity(&shaped(3, 0, false, true, true)), QueryComplexity::Complex);
    // 10 + 15 + 25 + 10 + 3
    assert_eq!(complexity(&shaped(3, 1, false, true, true)), QueryComplexity::VeryComplex);

    assert_eq!(bucket(15), QueryComplexity::Simple);
    assert_eq!(bucket(16), QueryComplexity::Moderate);
    assert_eq!(bucket(35), QueryComplexity::Moderate);
    assert_eq!(bucket(36), QueryComplexity::Complex);
    assert_eq!(bucket(60), QueryComplexity::Complex);
    assert_eq!(bucket(61), QueryComplexity::VeryComplex);
}

#[test]
fn test_complexity_score_reported() {
    let c = classify_sql("SELECT a.id FROM a JOIN b ON a.id = b.id");
    assert_eq!(c.complexity_score, 15);
    assert_eq!(c.complexity, QueryComplexity::Simple);
}

#[test]
fn test_pre_filter() {
    assert!(classify_sql("SELECT * FROM users").pre_filter_executable);
    assert!(classify_sql("CREATE TABLE t (id int)").pre_filter_executable);
    assert!(classify_sql("CREATE INDEX i ON t (a)").pre_filter_executable);
    assert!(classify_sql("count(*)").pre_filter_executable);

    assert!(!classify_sql("DROP TABLE t").pre_filter_executable);
    assert!(!classify_sql("INSERT INTO t VALUES (1)").pre_filter_executable);
    assert!(!classify_sql("GRANT SELECT ON t TO bob").pre_filter_executable);
    assert!(!classify_sql("VACUUM").pre_filter_executable);
    assert!(!classify_sql("BEGIN").pre_filter_executable);
    assert!(!classify_sql("SELET 1").pre_filter_executable);
}

#[test]
fn test_safety_levels() {
    let cases = [
        ("SELECT 1", SafetyLevel::Allow),
        ("UPDATE t SET a = 1 WHERE id = 1", SafetyLevel::Review),
        ("DROP TABLE t", SafetyLevel::Block),
        ("CREATE TABLE t (id int)", SafetyLevel::Review),
        ("GRANT SELECT ON t TO bob", SafetyLevel::Block),
        ("VACUUM", SafetyLevel::Block),
        ("count(*)", SafetyLevel::Allow),
        ("now()", SafetyLevel::Allow),
        ("row_number()", SafetyLevel::Review),
        ("my_func(1)", SafetyLevel::Review),
        ("BEGIN", SafetyLevel::Review),
        ("SELET 1", SafetyLevel::Review),
    ];
    for (sql, expected) in cases {
        assert_eq!(classify_sql(sql).recommended_safety_level, expected, "{sql}");
    }
}
