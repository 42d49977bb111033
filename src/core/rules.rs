// declarative security rules
// defaults and caller rules are merged into one list and fully scanned

use super::normalize::normalize;
use super::types::QueryRiskLevel;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Warn,
    Block,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityRule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Matched case-insensitively against the raw and the normalized sql.
    pub pattern: String,
    /// The rule does not apply when this also matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unless: Option<String>,
    pub action: RuleAction,
    pub risk_level: QueryRiskLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Rule ids waived when this (allow) rule matches.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub rule: SecurityRule,
    pattern: Regex,
    unless: Option<Regex>,
}

impl CompiledRule {
    pub fn compile(rule: SecurityRule) -> Result<Self, regex::Error> {
        let pattern = build(&rule.pattern)?;
        let unless = rule.unless.as_deref().map(build).transpose()?;
        Ok(Self {
            rule,
            pattern,
            unless,
        })
    }

    pub fn matches(&self, sql: &str) -> bool {
        self.pattern.is_match(sql) && !self.unless.as_ref().is_some_and(|u| u.is_match(sql))
    }
}

fn build(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleMatch {
    pub rule: SecurityRule,
    /// Waived by a matching allow rule: reported, but neither raises
    /// the risk level nor blocks execution.
    pub waived: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidRule {
    pub id: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleCheck {
    pub matched: Vec<RuleMatch>,
    pub highest_risk_level: QueryRiskLevel,
    pub invalid: Vec<InvalidRule>,
}

impl RuleCheck {
    /// True when an un-waived block rule matched.
    pub fn blocks(&self) -> bool {
        self.matched
            .iter()
            .any(|m| !m.waived && m.rule.action == RuleAction::Block)
    }

    pub fn is_matched(&self, id: &str) -> bool {
        self.matched.iter().any(|m| m.rule.id == id)
    }
}

struct RuleDef {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    pattern: &'static str,
    unless: Option<&'static str>,
    action: RuleAction,
    risk_level: QueryRiskLevel,
    message: &'static str,
}

// statement rules are anchored at a statement start, so a keyword inside a
// string literal or an ALTER TABLE ... DROP COLUMN does not trip them
const DEFAULT_RULE_DEFS: &[RuleDef] = &[
    RuleDef {
        id: "drop_table",
        name: "Drop table",
        description: "DROP TABLE statements",
        pattern: r"(?:^|;)\s*DROP\s+TABLE\b",
        unless: None,
        action: RuleAction::Block,
        risk_level: QueryRiskLevel::Critical,
        message: "DROP TABLE permanently deletes the table and all of its data",
    },
    RuleDef {
        id: "drop_object",
        name: "Drop object",
        description: "DROP statements for any database object",
        pattern: r"(?:^|;)\s*DROP\s+\w+",
        unless: None,
        action: RuleAction::Block,
        risk_level: QueryRiskLevel::High,
        message: "DROP permanently removes a database object",
    },
    RuleDef {
        id: "truncate",
        name: "Truncate table",
        description: "TRUNCATE statements",
        pattern: r"(?:^|;)\s*TRUNCATE\b",
        unless: None,
        action: RuleAction::Block,
        risk_level: QueryRiskLevel::Critical,
        message: "TRUNCATE deletes every row in the table",
    },
    RuleDef {
        id: "delete_without_where",
        name: "Delete without WHERE",
        description: "DELETE statements without a WHERE clause",
        pattern: r"(?:^|[;()])\s*DELETE\s+FROM\b",
        unless: Some(r"\bWHERE\b"),
        action: RuleAction::Block,
        risk_level: QueryRiskLevel::High,
        message: "DELETE without a WHERE clause removes every row in the table",
    },
    RuleDef {
        id: "update_without_where",
        name: "Update without WHERE",
        description: "UPDATE statements without a WHERE clause",
        pattern: r"(?:^|[;()])\s*UPDATE\s+(?:ONLY\s+)?\S+(?:\s+(?:AS\s+)?\w+)?\s+SET\b",
        unless: Some(r"\bWHERE\b"),
        action: RuleAction::Block,
        risk_level: QueryRiskLevel::High,
        message: "UPDATE without a WHERE clause modifies every row in the table",
    },
    RuleDef {
        id: "dangerous_function",
        name: "Dangerous function",
        description: "Calls to file system, process or session control functions",
        pattern: r"\b(?:pg_read_file|pg_read_binary_file|pg_ls_dir|pg_stat_file|pg_file_write|lo_import|lo_export|pg_terminate_backend|pg_cancel_backend|pg_reload_conf|dblink(?:_exec|_connect)?)\s*\(",
        unless: None,
        action: RuleAction::Block,
        risk_level: QueryRiskLevel::Critical,
        message: "Query calls a function with server-level side effects",
    },
    RuleDef {
        id: "system_catalog_write",
        name: "System catalog write",
        description: "Writes to PostgreSQL system catalogs",
        pattern: r"\b(?:INSERT\s+INTO|UPDATE|DELETE\s+FROM)\s+(?:pg_catalog\.)?pg_\w+",
        unless: None,
        action: RuleAction::Block,
        risk_level: QueryRiskLevel::Critical,
        message: "Query modifies a system catalog",
    },
    RuleDef {
        id: "copy_file",
        name: "COPY to or from file",
        description: "COPY statements reading or writing server files or programs",
        pattern: r"\bCOPY\b[^;]*\b(?:FROM|TO)\s+(?:PROGRAM\s+)?'",
        unless: None,
        action: RuleAction::Block,
        risk_level: QueryRiskLevel::Critical,
        message: "COPY reads or writes files on the database server",
    },
    RuleDef {
        id: "dynamic_execute",
        name: "Dynamic SQL",
        description: "Dynamic SQL execution",
        pattern: r"\bEXECUTE\s+(?:format\s*\(|'|\$\w*\$|\w+\s*\|\|)",
        unless: None,
        action: RuleAction::Warn,
        risk_level: QueryRiskLevel::High,
        message: "Dynamic SQL execution cannot be analyzed statically",
    },
    RuleDef {
        id: "create_function",
        name: "Create function",
        description: "Function or procedure definitions",
        pattern: r"\bCREATE\s+(?:OR\s+REPLACE\s+)?(?:FUNCTION|PROCEDURE)\b",
        unless: None,
        action: RuleAction::Warn,
        risk_level: QueryRiskLevel::Medium,
        message: "Query defines server-side code",
    },
    RuleDef {
        id: "alter_system",
        name: "Alter system",
        description: "ALTER SYSTEM configuration changes",
        pattern: r"\bALTER\s+SYSTEM\b",
        unless: None,
        action: RuleAction::Block,
        risk_level: QueryRiskLevel::Critical,
        message: "ALTER SYSTEM changes server configuration",
    },
    RuleDef {
        id: "create_role",
        name: "Create user or role",
        description: "User and role creation",
        pattern: r"\bCREATE\s+(?:USER|ROLE)\b",
        unless: None,
        action: RuleAction::Block,
        risk_level: QueryRiskLevel::High,
        message: "Query creates a database user or role",
    },
    RuleDef {
        id: "superuser_grant",
        name: "Superuser privileges",
        description: "Grants of superuser-level role attributes",
        pattern: r"\b(?:SUPERUSER|BYPASSRLS|CREATEROLE|REPLICATION)\b",
        unless: None,
        action: RuleAction::Block,
        risk_level: QueryRiskLevel::Critical,
        message: "Query grants superuser-level privileges",
    },
    RuleDef {
        id: "grant_all",
        name: "Grant all privileges",
        description: "GRANT ALL statements",
        pattern: r"\bGRANT\s+ALL\b",
        unless: None,
        action: RuleAction::Warn,
        risk_level: QueryRiskLevel::High,
        message: "GRANT ALL hands out every privilege on the object",
    },
    RuleDef {
        id: "password_literal",
        name: "Password literal",
        description: "Plain text passwords in SQL",
        pattern: r"\bPASSWORD\s*=?\s*'[^']*'",
        unless: None,
        action: RuleAction::Warn,
        risk_level: QueryRiskLevel::High,
        message: "Query contains a plain text password",
    },
    RuleDef {
        id: "unbounded_select_star",
        name: "Unbounded SELECT *",
        description: "SELECT * without a LIMIT",
        pattern: r"\bSELECT\s+\*\s+FROM\b",
        unless: Some(r"\bLIMIT\b|\bFETCH\s+FIRST\b"),
        action: RuleAction::Warn,
        risk_level: QueryRiskLevel::Low,
        message: "SELECT * without LIMIT may return more data than needed",
    },
    RuleDef {
        id: "create_extension",
        name: "Create extension",
        description: "Extension installation",
        pattern: r"\bCREATE\s+EXTENSION\b",
        unless: None,
        action: RuleAction::Warn,
        risk_level: QueryRiskLevel::High,
        message: "Extensions can run arbitrary code inside the server",
    },
    RuleDef {
        id: "backup_operation",
        name: "Backup operation",
        description: "Backup and WAL control operations",
        pattern: r"\b(?:pg_start_backup|pg_stop_backup|pg_backup_start|pg_backup_stop|pg_switch_wal|pg_create_restore_point)\b",
        unless: None,
        action: RuleAction::Warn,
        risk_level: QueryRiskLevel::High,
        message: "Query controls backups or the write-ahead log",
    },
    RuleDef {
        id: "stacked_statements",
        name: "Stacked destructive statement",
        description: "A destructive statement chained after another one",
        pattern: r";\s*(?:DROP|DELETE|UPDATE|INSERT|ALTER|TRUNCATE|GRANT|REVOKE|CREATE)\b",
        unless: None,
        action: RuleAction::Block,
        risk_level: QueryRiskLevel::High,
        message: "A second statement modifies data or schema, possible injection",
    },
];

static DEFAULT_RULES: LazyLock<Vec<CompiledRule>> = LazyLock::new(|| {
    DEFAULT_RULE_DEFS
        .iter()
        .filter_map(|def| CompiledRule::compile(def.to_rule()).ok())
        .collect()
});

impl RuleDef {
    fn to_rule(&self) -> SecurityRule {
        SecurityRule {
            id: self.id.to_string(),
            name: self.name.to_string(),
            description: self.description.to_string(),
            pattern: self.pattern.to_string(),
            unless: self.unless.map(str::to_string),
            action: self.action,
            risk_level: self.risk_level,
            message: Some(self.message.to_string()),
            overrides: Vec::new(),
        }
    }
}

pub fn default_rules() -> &'static [CompiledRule] {
    &DEFAULT_RULES
}

/// Evaluate default plus custom rules. A rule matches when it matches
/// either the raw sql or its comment-free normalized form, so comments
/// can neither hide a keyword nor fake a WHERE/LIMIT.
/// Every rule is checked, the result does not depend on order.
pub fn check_security_rules(sql: &str, custom_rules: &[SecurityRule]) -> RuleCheck {
    let mut invalid = Vec::new();
    let mut custom = Vec::with_capacity(custom_rules.len());
    for rule in custom_rules {
        match CompiledRule::compile(rule.clone()) {
            Ok(compiled) => custom.push(compiled),
            Err(e) => {
                warn!(rule = %rule.id, error = %e, "skipping custom rule with invalid pattern");
                invalid.push(InvalidRule {
                    id: rule.id.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    let normalized = normalize(sql);
    let hits: Vec<&CompiledRule> = default_rules()
        .iter()
        .chain(custom.iter())
        .filter(|r| r.matches(sql) || r.matches(&normalized))
        .collect();

    let waived: HashSet<&str> = hits
        .iter()
        .filter(|r| r.rule.action == RuleAction::Allow)
        .flat_map(|r| r.rule.overrides.iter().map(String::as_str))
        .collect();

    let matched: Vec<RuleMatch> = hits
        .iter()
        .map(|r| RuleMatch {
            rule: r.rule.clone(),
            waived: waived.contains(r.rule.id.as_str()),
        })
        .collect();

    let highest_risk_level = matched
        .iter()
        .filter(|m| !m.waived)
        .map(|m| m.rule.risk_level)
        .max()
        .unwrap_or(QueryRiskLevel::Low);

    RuleCheck {
        matched,
        highest_risk_level,
        invalid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_default_rule_compiles() {
        assert_eq!(default_rules().len(), DEFAULT_RULE_DEFS.len());
    }

    #[test]
    fn rule_ids_are_unique() {
        let ids: HashSet<&str> = DEFAULT_RULE_DEFS.iter().map(|d| d.id).collect();
        assert_eq!(ids.len(), DEFAULT_RULE_DEFS.len());
    }

    #[test]
    fn unless_pattern_suppresses_match() {
        let check = check_security_rules("delete from users where id = 1", &[]);
        assert!(!check.is_matched("delete_without_where"));
        let check = check_security_rules("delete from users", &[]);
        assert!(check.is_matched("delete_without_where"));
    }

    #[test]
    fn comments_cannot_split_or_fake_keywords() {
        assert!(check_security_rules("DROP/**/TABLE users", &[]).is_matched("drop_table"));
        assert!(check_security_rules("DROP -- x\nTABLE users", &[]).is_matched("drop_table"));
        assert!(
            check_security_rules("DELETE/**/FROM users", &[]).is_matched("delete_without_where")
        );
        let check = check_security_rules("DELETE FROM users -- WHERE id = 1", &[]);
        assert!(check.is_matched("delete_without_where"));
    }

    #[test]
    fn keywords_mid_statement_do_not_match() {
        let check = check_security_rules("SELECT id FROM notes WHERE body = 'please drop it'", &[]);
        assert!(!check.is_matched("drop_object"));
        let check = check_security_rules("ALTER TABLE t DROP COLUMN c", &[]);
        assert!(!check.is_matched("drop_object"));
        let check = check_security_rules("SELECT 1; DROP VIEW v", &[]);
        assert!(check.is_matched("drop_object"));
    }
}
