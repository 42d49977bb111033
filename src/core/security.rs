// security analysis: warnings, permissions, data access, performance,
// recommendations, and the final risk / ai-executable verdict

use super::keywords::Keywords;
use super::rules::{RuleCheck, check_security_rules};
use super::types::{
    DataAccessPattern, DataClassification, DataSensitivity, ParsedQuery, PerformanceEstimate,
    PermissionType, Priority, QueryCategory, QueryComplexity, QueryRiskLevel,
    RecommendationType, RequiredPermission, SecurityRecommendation, SecurityReport,
    SecurityWarning, TimeCategory, WarningLevel,
};
use crate::config::SecurityConfig;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;
use tracing::debug;

const SENSITIVE_NAME_PARTS: &[&str] = &["password", "secret", "private"];

static EXPLICIT_PUBLIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bpublic\.").expect("valid regex"));

pub struct SecurityAnalyzer<'a> {
    query: &'a ParsedQuery,
    category: QueryCategory,
    complexity: QueryComplexity,
    config: SecurityConfig,
    default_schema: String,
    granted: Vec<String>,
}

impl<'a> SecurityAnalyzer<'a> {
    pub fn new(
        query: &'a ParsedQuery,
        category: QueryCategory,
        complexity: QueryComplexity,
        config: SecurityConfig,
    ) -> Self {
        Self {
            query,
            category,
            complexity,
            config,
            default_schema: "public".to_string(),
            granted: Vec::new(),
        }
    }

    /// Schema assumed for unqualified table names.
    pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
        self.default_schema = schema.into();
        self
    }

    /// Permissions the caller already holds, as "TYPE" or "TYPE:target".
    pub fn with_granted_permissions(mut self, granted: Vec<String>) -> Self {
        self.granted = granted;
        self
    }

    pub fn analyze(&self) -> SecurityReport {
        let rules = check_security_rules(&self.query.original_sql, &self.config.custom_rules);

        let required_permissions = self.permissions();
        let performance = self.performance();

        let mut warnings = self.warnings(&rules);
        warnings.extend(self.permission_warnings(&required_permissions));
        if performance.complexity_score > self.config.max_complexity {
            warnings.push(
                SecurityWarning::new(
                    WarningLevel::Warning,
                    format!(
                        "Query complexity {} exceeds the configured maximum of {}",
                        performance.complexity_score, self.config.max_complexity
                    ),
                )
                .with_suggestion("Simplify the query or raise max_complexity"),
            );
        }

        let recommendations = self.recommendations(&performance);
        let risk_level = self.risk_level(rules.highest_risk_level);
        let risk_score = self.risk_score();
        let ai_executable = self.ai_executable(risk_level, &rules);

        debug!(
            operation = %self.query.operation,
            risk_level = %risk_level,
            risk_score,
            ai_executable,
            matched_rules = rules.matched.len(),
            "security analysis done"
        );

        SecurityReport {
            risk_level,
            risk_score,
            required_permissions,
            warnings,
            performance,
            ai_executable,
            requires_elevated_privileges: self.requires_elevated_privileges(),
            data_access: self.data_access(),
            recommendations,
        }
    }

    fn warnings(&self, rules: &RuleCheck) -> Vec<SecurityWarning> {
        let kw = Keywords::get();
        let mut warnings = Vec::new();

        for m in &rules.matched {
            let rule = &m.rule;
            let message = rule
                .message
                .clone()
                .unwrap_or_else(|| format!("Security rule violated: {}", rule.name));
            let warning = if m.waived {
                SecurityWarning::new(WarningLevel::Info, format!("{message} (waived by policy)"))
            } else {
                SecurityWarning::new(WarningLevel::from_risk(rule.risk_level), message)
            };
            warnings.push(
                warning.with_suggestion(format!("Review {}", rule.description.to_lowercase())),
            );
        }

        for bad in &rules.invalid {
            warnings.push(
                SecurityWarning::new(
                    WarningLevel::Warning,
                    format!("Custom rule '{}' has an invalid pattern: {}", bad.id, bad.error),
                )
                .with_suggestion("Fix the rule's regular expression"),
            );
        }

        for func in &self.query.functions {
            if kw.is_dangerous_function(func) {
                warnings.push(
                    SecurityWarning::new(
                        WarningLevel::Error,
                        format!("Dangerous function detected: {func}"),
                    )
                    .with_suggestion("Avoid using system-level functions in user queries"),
                );
            }
        }

        for schema in &self.touched_schemas() {
            if kw.is_system_schema(schema) {
                warnings.push(
                    SecurityWarning::new(
                        WarningLevel::Warning,
                        format!("Access to system schema: {schema}"),
                    )
                    .with_suggestion("Be cautious when accessing system schemas"),
                );
            }
            if !self.config.allows_schema(schema) {
                let allowed: Vec<&str> =
                    self.config.allowed_schemas.iter().map(String::as_str).collect();
                warnings.push(
                    SecurityWarning::new(
                        WarningLevel::Warning,
                        format!("Access to restricted schema: {schema}"),
                    )
                    .with_suggestion(format!("Only schemas {} are allowed", allowed.join(", "))),
                );
            }
        }

        for table in &self.query.tables {
            if kw.is_system_catalog(table) {
                warnings.push(
                    SecurityWarning::new(
                        WarningLevel::Warning,
                        format!("Access to system catalog: {table}"),
                    )
                    .with_suggestion("Be cautious when accessing system catalogs"),
                );
            }
        }

        if self.config.read_only_mode && self.query.is_modifying {
            warnings.push(
                SecurityWarning::new(
                    WarningLevel::Error,
                    "Modifying operations are not allowed in read-only mode",
                )
                .with_suggestion("Use SELECT queries only in read-only mode"),
            );
        }

        warnings
    }

    fn permissions(&self) -> Vec<RequiredPermission> {
        let kw = Keywords::get();
        let mut permissions = Vec::new();

        let per_table = |kind: PermissionType, permissions: &mut Vec<RequiredPermission>| {
            for table in &self.query.tables {
                let (schema, target) = self.split_table(table);
                permissions.push(RequiredPermission {
                    kind,
                    target,
                    schema: Some(schema),
                    required: true,
                });
            }
        };

        if self.query.is_read_only {
            per_table(PermissionType::Select, &mut permissions);
        } else {
            let operation = self.query.operation.to_uppercase();
            if operation.starts_with("INSERT") {
                per_table(PermissionType::Insert, &mut permissions);
            }
            if operation.starts_with("UPDATE") {
                per_table(PermissionType::Update, &mut permissions);
            }
            if operation.starts_with("DELETE") {
                per_table(PermissionType::Delete, &mut permissions);
            }
            if operation.starts_with("CREATE") {
                let target = if operation.split_whitespace().any(|w| w == "TABLE") {
                    "TABLE"
                } else {
                    "OBJECT"
                };
                let schema = self
                    .query
                    .tables
                    .iter()
                    .find_map(|t| t.rsplit_once('.').map(|(s, _)| s.to_string()))
                    .unwrap_or_else(|| self.default_schema.clone());
                permissions.push(RequiredPermission {
                    kind: PermissionType::Create,
                    target: target.to_string(),
                    schema: Some(schema),
                    required: true,
                });
            }
        }

        for func in &self.query.functions {
            permissions.push(RequiredPermission {
                kind: PermissionType::Execute,
                target: func.clone(),
                schema: None,
                // unknown functions are never assumed safe
                required: !kw.is_safe_function(func),
            });
        }

        permissions
    }

    fn permission_warnings(&self, permissions: &[RequiredPermission]) -> Vec<SecurityWarning> {
        if !self.config.require_explicit_permissions {
            return Vec::new();
        }

        permissions
            .iter()
            .filter(|p| p.required && !self.is_granted(p))
            .map(|p| {
                let on = match &p.schema {
                    Some(schema) => format!("{schema}.{}", p.target),
                    None => p.target.clone(),
                };
                SecurityWarning::new(
                    WarningLevel::Warning,
                    format!("Missing permission: {} on {on}", p.kind.as_str()),
                )
                .with_suggestion("Grant the permission explicitly or adjust the query")
            })
            .collect()
    }

    fn is_granted(&self, permission: &RequiredPermission) -> bool {
        let kind = permission.kind.as_str();
        let qualified = permission
            .schema
            .as_ref()
            .map(|s| format!("{s}.{}", permission.target));

        self.granted.iter().any(|grant| {
            let grant = grant.trim();
            if grant.eq_ignore_ascii_case("ALL") || grant.eq_ignore_ascii_case(kind) {
                return true;
            }
            let Some((grant_kind, grant_target)) = grant.split_once(':') else {
                return false;
            };
            grant_kind.eq_ignore_ascii_case(kind)
                && (grant_target.eq_ignore_ascii_case(&permission.target)
                    || qualified
                        .as_deref()
                        .is_some_and(|q| grant_target.eq_ignore_ascii_case(q)))
        })
    }

    fn data_access(&self) -> DataAccessPattern {
        let tables: Vec<String> = self.query.tables.iter().cloned().collect();
        let (tables_read, tables_modified) = if self.query.is_read_only {
            (tables, Vec::new())
        } else {
            (Vec::new(), tables)
        };

        let data_classifications = self.classify_tables();
        let classified_sensitive = data_classifications
            .iter()
            .any(|c| c.level >= DataSensitivity::Confidential && !c.targets.is_empty());
        let named_sensitive = self.query.tables.iter().any(|t| {
            let lower = t.to_lowercase();
            SENSITIVE_NAME_PARTS.iter().any(|part| lower.contains(part))
        });

        // coarse guess, not an estimator
        let estimated_rows_affected = if self.query.original_sql.to_uppercase().contains("WHERE") {
            100
        } else {
            1000
        };

        DataAccessPattern {
            tables_read,
            tables_modified,
            estimated_rows_affected,
            accesses_sensitive_data: named_sensitive || classified_sensitive,
            data_classifications,
        }
    }

    fn classify_tables(&self) -> Vec<DataClassification> {
        let rules = &self.config.data_classification_rules;
        if rules.is_empty() {
            return vec![DataClassification {
                level: DataSensitivity::Public,
                targets: self.query.tables.iter().cloned().collect(),
            }];
        }

        let mut buckets: BTreeMap<DataSensitivity, Vec<String>> = BTreeMap::new();
        for table in &self.query.tables {
            let level = rules
                .iter()
                .filter(|r| r.matches(table))
                .map(|r| r.level)
                .max()
                .unwrap_or(DataSensitivity::Public);
            buckets.entry(level).or_default().push(table.clone());
        }
        if buckets.is_empty() {
            buckets.insert(DataSensitivity::Public, Vec::new());
        }

        buckets
            .into_iter()
            .map(|(level, targets)| DataClassification { level, targets })
            .collect()
    }

    fn performance(&self) -> PerformanceEstimate {
        let query = self.query;
        let mut score = 10;
        let mut factors = Vec::new();
        let mut optimizations = Vec::new();

        if query.has_subqueries {
            score += 20;
            factors.push("Contains subqueries".to_string());
        }
        if query.has_ctes {
            score += 15;
            factors.push("Uses Common Table Expressions (CTEs)".to_string());
        }
        if query.has_window_functions {
            score += 25;
            factors.push("Uses window functions".to_string());
        }

        let table_count = query.tables.len() as u32;
        if table_count > 3 {
            score += (table_count - 3) * 10;
            factors.push(format!("Joins {table_count} tables"));
            optimizations.push("Consider breaking into smaller queries".to_string());
        }

        let function_count = query.functions.len() as u32;
        if function_count > 5 {
            score += (function_count - 5) * 5;
            factors.push("Uses many functions".to_string());
        }

        let upper = query.original_sql.to_uppercase();
        if upper.contains("SELECT *") {
            score += 10;
            factors.push("Uses SELECT *".to_string());
            optimizations.push("Select only needed columns".to_string());
        }
        if query.is_modifying && !upper.contains("WHERE") {
            score += 30;
            factors.push("No WHERE clause on data modification".to_string());
            optimizations.push("Add WHERE clause to limit affected rows".to_string());
        }

        PerformanceEstimate {
            complexity_score: score,
            time_category: TimeCategory::from_score(score),
            factors,
            optimizations,
        }
    }

    fn recommendations(&self, performance: &PerformanceEstimate) -> Vec<SecurityRecommendation> {
        let mut recommendations = Vec::new();
        let security = |priority, message: String, implementation: &str| SecurityRecommendation {
            kind: RecommendationType::Security,
            priority,
            message,
            implementation: Some(implementation.to_string()),
        };

        if self.query.is_modifying && self.config.read_only_mode {
            recommendations.push(security(
                Priority::High,
                "Query modifies data but system is in read-only mode".to_string(),
                "Use read-only connection or enable write access",
            ));
        }

        for schema in &self.touched_schemas() {
            if !self.config.allows_schema(schema) {
                recommendations.push(security(
                    Priority::Medium,
                    format!("Access to schema '{schema}' may not be allowed"),
                    "Verify schema access permissions",
                ));
            }
        }

        for func in &self.query.functions {
            if self.config.blocks_function(func) {
                recommendations.push(security(
                    Priority::High,
                    format!("Function '{func}' is blocked by security policy"),
                    "Use alternative functions or request permission",
                ));
            }
        }

        if self.complexity == QueryComplexity::VeryComplex {
            recommendations.push(SecurityRecommendation {
                kind: RecommendationType::Performance,
                priority: Priority::Medium,
                message: "Query is very complex and may impact performance".to_string(),
                implementation: Some(
                    "Consider breaking into smaller queries or adding indexes".to_string(),
                ),
            });
        }

        if performance.complexity_score > self.config.max_complexity {
            recommendations.push(SecurityRecommendation {
                kind: RecommendationType::Performance,
                priority: Priority::Medium,
                message: format!(
                    "Estimated cost {} is above the allowed {}",
                    performance.complexity_score, self.config.max_complexity
                ),
                implementation: Some("Split the query or narrow it with filters".to_string()),
            });
        }

        recommendations
    }

    // max over every contributing factor, never lowered
    fn risk_level(&self, rule_level: QueryRiskLevel) -> QueryRiskLevel {
        let mut factors = vec![rule_level];

        match self.category {
            QueryCategory::Ddl => factors.push(QueryRiskLevel::Medium),
            QueryCategory::Dcl | QueryCategory::Utility => factors.push(QueryRiskLevel::High),
            _ => {}
        }
        if self.dangerous_function_count() > 0 {
            factors.push(QueryRiskLevel::Critical);
        }
        if self.system_catalog_count() > 0 {
            factors.push(QueryRiskLevel::High);
        }

        factors.into_iter().max().unwrap_or(QueryRiskLevel::Low)
    }

    fn risk_score(&self) -> u32 {
        let base = match self.category {
            QueryCategory::Dml if self.query.is_read_only => 10,
            QueryCategory::Dml => 30,
            QueryCategory::Ddl => 50,
            QueryCategory::Dcl => 70,
            QueryCategory::Utility => 80,
            _ => 20,
        };
        let complexity = match self.complexity {
            QueryComplexity::Simple => 0,
            QueryComplexity::Moderate => 10,
            QueryComplexity::Complex => 20,
            QueryComplexity::VeryComplex => 30,
        };
        let dangerous = self.dangerous_function_count() as u32 * 20;
        let catalogs = self.system_catalog_count() as u32 * 15;

        (base + complexity + dangerous + catalogs).min(100)
    }

    // DROP and write-without-WHERE come in through block rules;
    // unrecognised statements are never executable
    fn ai_executable(&self, risk_level: QueryRiskLevel, rules: &RuleCheck) -> bool {
        self.category != QueryCategory::Unknown
            && risk_level < QueryRiskLevel::High
            && !(self.config.read_only_mode && self.query.is_modifying)
            && !rules.blocks()
            && self.dangerous_function_count() == 0
    }

    fn requires_elevated_privileges(&self) -> bool {
        matches!(
            self.category,
            QueryCategory::Ddl | QueryCategory::Dcl | QueryCategory::Utility
        ) || self.dangerous_function_count() > 0
            || self.system_catalog_count() > 0
    }

    fn dangerous_function_count(&self) -> usize {
        let kw = Keywords::get();
        self.query
            .functions
            .iter()
            .filter(|f| kw.is_dangerous_function(f))
            .count()
    }

    fn system_catalog_count(&self) -> usize {
        let kw = Keywords::get();
        self.query
            .tables
            .iter()
            .filter(|t| kw.is_system_catalog(t))
            .count()
    }

    // the extractor falls back to "public" for unqualified names; policy
    // checks put those in the caller's default schema instead
    fn touched_schemas(&self) -> BTreeSet<String> {
        let query = self.query;
        let explicit_public = EXPLICIT_PUBLIC.is_match(&query.normalized_sql);
        let mut schemas: BTreeSet<String> = query
            .schemas
            .iter()
            .filter(|s| s.as_str() != "public" || explicit_public)
            .cloned()
            .collect();

        let has_unqualified = query.tables.iter().any(|t| !t.contains('.'));
        if has_unqualified || schemas.is_empty() {
            schemas.insert(self.default_schema.clone());
        }
        schemas
    }

    fn split_table(&self, table: &str) -> (String, String) {
        match table.rsplit_once('.') {
            Some((schema, name)) => (schema.to_string(), name.to_string()),
            None => (self.default_schema.clone(), table.to_string()),
        }
    }
}
