// public entry point: sql in, report out

use super::classify::{Classification, classify};
use super::extract::parse;
use super::security::SecurityAnalyzer;
use super::types::{ParsedQuery, QueryCategory, SecurityReport};
use crate::config::{SecurityConfig, SecurityConfigOverrides};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Postgresql,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzeOptions {
    pub dialect: Dialect,
    /// Default schema for unqualified table names.
    pub schema: Option<String>,
    /// Permissions the caller holds, "SELECT" or "SELECT:users".
    pub permissions: Vec<String>,
    pub read_only_mode: Option<bool>,
    pub security_config: SecurityConfigOverrides,
}

impl AnalyzeOptions {
    pub fn read_only() -> Self {
        Self {
            read_only_mode: Some(true),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    pub query: ParsedQuery,
    pub classification: Classification,
    pub security: SecurityReport,
    pub ai_executable: bool,
}

impl AnalysisResult {
    pub fn operation(&self) -> &str {
        &self.query.operation
    }

    pub fn category(&self) -> QueryCategory {
        self.classification.category
    }
}

/// Analyzer with a base policy that every call's options layer on top of.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    base: SecurityConfig,
}

impl Analyzer {
    pub fn new(base: SecurityConfig) -> Self {
        Self { base }
    }

    pub fn config(&self) -> &SecurityConfig {
        &self.base
    }

    pub fn analyze(&self, sql: &str, options: &AnalyzeOptions) -> AnalysisResult {
        let query = parse(sql);
        let classification = classify(&query);
        debug!(
            operation = %query.operation,
            category = %classification.category,
            subcategory = ?classification.subcategory,
            complexity = ?classification.complexity,
            tables = query.tables.len(),
            functions = query.functions.len(),
            "classified query"
        );

        let mut config = self.base.merged(&options.security_config);
        if let Some(read_only) = options.read_only_mode {
            config.read_only_mode = read_only;
        }

        let security = SecurityAnalyzer::new(
            &query,
            classification.category,
            classification.complexity,
            config,
        )
        .with_default_schema(options.schema.as_deref().unwrap_or("public"))
        .with_granted_permissions(options.permissions.clone())
        .analyze();

        let ai_executable = security.ai_executable;
        AnalysisResult {
            query,
            classification,
            security,
            ai_executable,
        }
    }

    pub fn is_query_safe_for_ai(&self, sql: &str, options: &AnalyzeOptions) -> bool {
        self.analyze(sql, options).ai_executable
    }
}

pub fn analyze(sql: &str, options: &AnalyzeOptions) -> AnalysisResult {
    Analyzer::default().analyze(sql, options)
}

pub fn is_query_safe_for_ai(sql: &str, options: &AnalyzeOptions) -> bool {
    Analyzer::default().is_query_safe_for_ai(sql, options)
}

pub fn ai_prompt_type(sql: &str) -> &'static str {
    classify(&parse(sql)).ai_prompt_type
}
