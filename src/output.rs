// output formatting - readable report or raw json

use crate::Error;
use crate::core::AnalysisResult;
use std::fmt;

pub struct Output;

// fixed layout report for humans
struct Report<'a>(&'a AnalysisResult);

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.0;
        let report = &result.security;

        writeln!(f, "SQL Security Analysis Report")?;
        writeln!(f)?;
        writeln!(f, "Query: {}", result.operation())?;
        writeln!(f, "Category: {}", result.category())?;
        writeln!(
            f,
            "Risk Level: {} (Score: {}/100)",
            report.risk_level, report.risk_score
        )?;
        let executable = if result.ai_executable { "Yes" } else { "No" };
        writeln!(f, "AI Executable: {executable}")?;
        writeln!(f)?;

        if !report.warnings.is_empty() {
            writeln!(f, "Warnings:")?;
            for warning in &report.warnings {
                writeln!(
                    f,
                    "  [{}] {}",
                    warning.level.as_str().to_uppercase(),
                    warning.message
                )?;
                if let Some(suggestion) = &warning.suggestion {
                    writeln!(f, "    Suggestion: {suggestion}")?;
                }
            }
            writeln!(f)?;
        }

        if !report.required_permissions.is_empty() {
            writeln!(f, "Required Permissions:")?;
            for permission in &report.required_permissions {
                let kind = permission.kind.as_str();
                match &permission.schema {
                    Some(schema) => writeln!(f, "  {kind} on {schema}.{}", permission.target)?,
                    None => writeln!(f, "  {kind} on {}", permission.target)?,
                }
            }
            writeln!(f)?;
        }

        let performance = &report.performance;
        writeln!(
            f,
            "Performance: {} ({}/100)",
            performance.time_category.as_str(),
            performance.complexity_score
        )?;
        if !performance.factors.is_empty() {
            writeln!(f, "Factors: {}", performance.factors.join(", "))?;
        }
        Ok(())
    }
}

impl Output {
    pub fn report(result: &AnalysisResult) -> String {
        Report(result).to_string()
    }

    // raw json for scripts
    pub fn raw(result: &AnalysisResult) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(result)?)
    }
}

pub fn format_security_report(result: &AnalysisResult) -> String {
    Output::report(result)
}
