// core logic - parsing, classification, rules and security analysis

mod analyzer;
mod classify;
mod complexity;
mod extract;
mod keywords;
mod normalize;
mod rules;
mod security;
mod types;

pub use analyzer::{
    AnalysisResult, AnalyzeOptions, Analyzer, Dialect, ai_prompt_type, analyze,
    is_query_safe_for_ai,
};
pub use classify::{
    Classification, category, classify, is_ai_executable, recommended_safety_level, subcategory,
};
pub use complexity::{bucket, complexity, complexity_score};
pub use extract::parse;
pub use keywords::Keywords;
pub use normalize::{detect_operation, normalize, tokenize};
pub use rules::{
    CompiledRule, InvalidRule, RuleAction, RuleCheck, RuleMatch, SecurityRule,
    check_security_rules, default_rules,
};
pub use security::SecurityAnalyzer;
pub use types::*;
