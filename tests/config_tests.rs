// tests for policy files

use sqlgate::config;
use sqlgate::{AnalyzeOptions, Analyzer, QueryRiskLevel, RuleAction, SecurityConfig};
use std::io::Write;

const POLICY: &str = r#"
allowed_schemas = ["public", "reporting"]
blocked_functions = ["md5"]
max_complexity = 60

[[custom_rules]]
id = "no_orders"
name = "Orders are off limits"
pattern = '\borders\b'
action = "block"
risk_level = "high"
message = "orders table is off limits"

[[data_classification_rules]]
level = "confidential"
patterns = ["salary"]
"#;

#[test]
fn test_parse_policy() {
    let overrides = config::parse(POLICY).expect("valid policy");
    assert_eq!(overrides.max_complexity, Some(60));
    assert_eq!(overrides.read_only_mode, None);
    assert_eq!(overrides.custom_rules.len(), 1);
    assert_eq!(overrides.custom_rules[0].action, RuleAction::Block);
    assert_eq!(overrides.custom_rules[0].risk_level, QueryRiskLevel::High);

    let config = SecurityConfig::default().merged(&overrides);
    assert!(config.allows_schema("reporting"));
    assert!(!config.allows_schema("auth"));
    assert!(config.blocks_function("MD5"));
    assert_eq!(config.max_complexity, 60);
    // untouched keys keep their defaults
    assert!(!config.read_only_mode);
}

#[test]
fn test_empty_policy() {
    let overrides = config::parse("").expect("empty policy");
    assert_eq!(SecurityConfig::default().merged(&overrides), SecurityConfig::default());
}

#[test]
fn test_bad_policy() {
    assert!(config::parse("max_complexity = \"lots\"").is_err());
    assert!(config::load(std::path::Path::new("/definitely/not/here.toml")).is_err());
}

#[test]
fn test_load_policy_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(POLICY.as_bytes()).expect("write policy");

    let overrides = config::load(file.path()).expect("load policy");
    let analyzer = Analyzer::new(SecurityConfig::default().merged(&overrides));

    let options = AnalyzeOptions::default();

    let result = analyzer.analyze("SELECT id FROM orders WHERE id = 1", &options);
    assert!(!result.ai_executable);
    assert_eq!(result.security.risk_level, QueryRiskLevel::High);
    assert!(
        result
            .security
            .warnings
            .iter()
            .any(|w| w.message == "orders table is off limits")
    );

    let result = analyzer.analyze("SELECT id FROM salary_bands", &options);
    assert!(result.security.data_access.accesses_sensitive_data);
}
