// tests for the ai execution verdict

use sqlgate::{AnalyzeOptions, QueryRiskLevel, WarningLevel, analyze, is_query_safe_for_ai};

fn check(sql: &str) -> sqlgate::AnalysisResult {
    analyze(sql, &AnalyzeOptions::default())
}

#[test]
fn test_safe_select() {
    let result = check("SELECT * FROM users");
    assert!(result.ai_executable);
    assert_eq!(result.security.risk_level, QueryRiskLevel::Low);
    assert!(
        result
            .security
            .warnings
            .iter()
            .all(|w| w.level == WarningLevel::Info)
    );
}

#[test]
fn test_dangerous_drop() {
    let result = check("DROP TABLE users");
    assert!(!result.ai_executable);
    assert_eq!(result.security.risk_level, QueryRiskLevel::Critical);
    assert!(
        result
            .security
            .warnings
            .iter()
            .any(|w| w.message.contains("DROP"))
    );
}

#[test]
fn test_dangerous_truncate() {
    let result = check("TRUNCATE TABLE users");
    assert!(!result.ai_executable);
    assert_eq!(result.security.risk_level, QueryRiskLevel::Critical);
    assert!(
        result
            .security
            .warnings
            .iter()
            .any(|w| w.message.contains("TRUNCATE"))
    );
}

#[test]
fn test_dangerous_delete_no_where() {
    let result = check("DELETE FROM users");
    assert!(!result.ai_executable);
    assert_eq!(result.security.risk_level, QueryRiskLevel::High);
    assert!(
        result
            .security
            .warnings
            .iter()
            .any(|w| w.message.contains("WHERE clause"))
    );
}

#[test]
fn test_safe_delete_with_where() {
    let result = check("DELETE FROM users WHERE id = 1");
    assert!(result.ai_executable);
    // still needs the delete privilege
    assert!(
        result
            .security
            .required_permissions
            .iter()
            .any(|p| p.kind.as_str() == "DELETE" && p.target == "users")
    );
}

#[test]
fn test_dangerous_update_no_where() {
    let result = check("UPDATE users SET name = 'test'");
    assert!(!result.ai_executable);
    assert!(result.security.risk_level >= QueryRiskLevel::High);
}

#[test]
fn test_safe_update_with_where() {
    assert!(is_query_safe_for_ai(
        "UPDATE users SET name = 'test' WHERE id = 1",
        &AnalyzeOptions::default()
    ));
}

#[test]
fn test_safe_insert() {
    let result = check("INSERT INTO users (name) VALUES ('test')");
    assert!(result.ai_executable);
    assert!(
        result
            .security
            .required_permissions
            .iter()
            .any(|p| p.kind.as_str() == "INSERT" && p.target == "users")
    );
}

#[test]
fn test_sql_injection_pattern() {
    let result = check("SELECT * FROM users; DROP TABLE users");
    assert!(!result.ai_executable);
    assert_eq!(result.security.risk_level, QueryRiskLevel::Critical);
}

#[test]
fn test_comment_does_not_hide_stacked_drop() {
    let result = check("SELECT * FROM users -- note\n; DROP TABLE users");
    assert!(!result.ai_executable);
    assert_eq!(result.security.risk_level, QueryRiskLevel::Critical);

    // a comment is not a statement
    let result = check("SELECT id FROM users WHERE id = 1 -- drop table later");
    assert!(result.ai_executable);
}

#[test]
fn test_comment_inside_drop() {
    for sql in ["DROP/**/TABLE users", "DROP -- x\nTABLE users"] {
        let result = check(sql);
        assert_eq!(result.operation(), "DROP TABLE", "{sql:?}");
        assert_eq!(result.security.risk_level, QueryRiskLevel::Critical, "{sql:?}");
        assert!(!result.ai_executable, "{sql:?}");
    }
}

#[test]
fn test_comment_inside_delete() {
    let result = check("DELETE/**/FROM users");
    assert_eq!(result.operation(), "DELETE");
    assert_eq!(result.security.risk_level, QueryRiskLevel::High);
    assert!(!result.ai_executable);

    // a WHERE that only exists in a comment does not count
    let result = check("DELETE FROM users -- WHERE id = 1");
    assert!(!result.ai_executable);

    let result = check("UPDATE users SET name = 'x' /* WHERE id = 1 */");
    assert!(!result.ai_executable);
}

#[test]
fn test_drop_inside_literal() {
    let result = check("SELECT * FROM notes WHERE body = 'please drop it' LIMIT 5");
    assert!(result.security.risk_level < QueryRiskLevel::High);
    assert!(result.ai_executable);
}

#[test]
fn test_alter_table_drop_column() {
    let result = check("ALTER TABLE t DROP COLUMN c");
    // ddl floor, not a drop statement
    assert_eq!(result.security.risk_level, QueryRiskLevel::Medium);
    assert!(result.ai_executable);
}

#[test]
fn test_read_only_blocks_obfuscated_writes() {
    let options = AnalyzeOptions::read_only();
    assert!(!is_query_safe_for_ai("DELETE/**/FROM users WHERE id = 1", &options));
    assert!(!is_query_safe_for_ai("INSERT -- x\nINTO t (a) VALUES (1)", &options));
}

#[test]
fn test_dangerous_function() {
    let result = check("SELECT pg_read_file('/etc/passwd')");
    assert!(!result.ai_executable);
    assert_eq!(result.security.risk_level, QueryRiskLevel::Critical);
    assert!(result.security.requires_elevated_privileges);
    assert!(
        result
            .security
            .warnings
            .iter()
            .any(|w| w.level == WarningLevel::Error)
    );
}

#[test]
fn test_read_only_blocks_writes() {
    let options = AnalyzeOptions::read_only();
    let result = analyze("INSERT INTO users (name) VALUES ('x')", &options);
    assert!(!result.ai_executable);
    assert!(
        result
            .security
            .warnings
            .iter()
            .any(|w| w.level == WarningLevel::Error && w.message.contains("read-only"))
    );

    assert!(is_query_safe_for_ai("SELECT id FROM users", &options));
}

#[test]
fn test_malformed_statement_not_executable() {
    let result = check("SELET * FORM users");
    assert_eq!(result.category().as_str(), "UNKNOWN");
    assert!(!result.ai_executable);
}

#[test]
fn test_risk_score_bounds() {
    let corpus = [
        "",
        "   ",
        ")))(((",
        "'unterminated",
        "--",
        "/* open",
        "SELECT 'ß' AS é FROM ü",
        "SELECT * FROM users",
        "DROP TABLE users; DROP TABLE orders; TRUNCATE t",
        "SELECT pg_read_file('a'), pg_ls_dir('b'), lo_import('c'), dblink('d'), \
         pg_sleep(1) FROM pg_catalog.pg_authid JOIN pg_shadow ON true",
        "GRANT ALL ON ALL TABLES IN SCHEMA public TO bob",
        "VACUUM FULL",
    ];
    for sql in corpus {
        let result = check(sql);
        assert!(result.security.risk_score <= 100, "{sql}");
    }
}
