// shared data model for the analysis pipeline

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// what the extractor pulls out of one sql string
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedQuery {
    pub original_sql: String,
    pub normalized_sql: String,
    pub operation: String,
    pub tables: BTreeSet<String>,
    pub columns: BTreeSet<String>,
    pub functions: BTreeSet<String>,
    pub schemas: BTreeSet<String>,
    pub has_subqueries: bool,
    pub has_ctes: bool,
    pub has_window_functions: bool,
    pub is_modifying: bool,
    pub is_read_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueryCategory {
    Ddl,
    Dml,
    Dcl,
    Tcl,
    Utility,
    Function,
    Unknown,
}

impl QueryCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ddl => "DDL",
            Self::Dml => "DML",
            Self::Dcl => "DCL",
            Self::Tcl => "TCL",
            Self::Utility => "UTILITY",
            Self::Function => "FUNCTION",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for QueryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// every subcategory belongs to exactly one category, see `category()`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuerySubcategory {
    // ddl
    TableCreation,
    TableModification,
    TableDeletion,
    TableTruncation,
    IndexCreation,
    IndexDeletion,
    ViewCreation,
    ViewDeletion,
    FunctionCreation,
    FunctionDeletion,
    SchemaCreation,
    SchemaDeletion,
    TriggerCreation,
    RlsPolicy,
    OtherDdl,
    // dml
    DataQuery,
    DataInsert,
    DataUpdate,
    DataDelete,
    DataMerge,
    OtherDml,
    // dcl
    PermissionGrant,
    PermissionRevoke,
    OtherDcl,
    // tcl
    TransactionBegin,
    TransactionCommit,
    TransactionRollback,
    Savepoint,
    OtherTcl,
    // utility
    Explain,
    Maintenance,
    DataCopy,
    SessionSetting,
    OtherUtility,
    // function
    Aggregate,
    Window,
    Builtin,
    UserFunction,
    // unknown
    Unknown,
}

impl QuerySubcategory {
    pub fn category(self) -> QueryCategory {
        use QuerySubcategory::*;
        match self {
            TableCreation | TableModification | TableDeletion | TableTruncation | IndexCreation
            | IndexDeletion | ViewCreation | ViewDeletion | FunctionCreation | FunctionDeletion
            | SchemaCreation | SchemaDeletion | TriggerCreation | RlsPolicy | OtherDdl => {
                QueryCategory::Ddl
            }
            DataQuery | DataInsert | DataUpdate | DataDelete | DataMerge | OtherDml => {
                QueryCategory::Dml
            }
            PermissionGrant | PermissionRevoke | OtherDcl => QueryCategory::Dcl,
            TransactionBegin | TransactionCommit | TransactionRollback | Savepoint | OtherTcl => {
                QueryCategory::Tcl
            }
            Explain | Maintenance | DataCopy | SessionSetting | OtherUtility => {
                QueryCategory::Utility
            }
            Aggregate | Window | Builtin | UserFunction => QueryCategory::Function,
            Unknown => QueryCategory::Unknown,
        }
    }

    // fallback used when no specific pattern matches
    pub fn other_of(category: QueryCategory) -> Self {
        match category {
            QueryCategory::Ddl => Self::OtherDdl,
            QueryCategory::Dml => Self::OtherDml,
            QueryCategory::Dcl => Self::OtherDcl,
            QueryCategory::Tcl => Self::OtherTcl,
            QueryCategory::Utility => Self::OtherUtility,
            QueryCategory::Function => Self::UserFunction,
            QueryCategory::Unknown => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryComplexity {
    Simple,
    Moderate,
    Complex,
    VeryComplex,
}

// ordering matters: risk aggregation is a max over this enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueryRiskLevel {
    #[serde(alias = "low")]
    Low,
    #[serde(alias = "medium")]
    Medium,
    #[serde(alias = "high")]
    High,
    #[serde(alias = "critical")]
    Critical,
}

impl QueryRiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for QueryRiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyLevel {
    Allow,
    Review,
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningLevel {
    Info,
    Warning,
    Error,
}

impl WarningLevel {
    pub fn from_risk(risk: QueryRiskLevel) -> Self {
        match risk {
            QueryRiskLevel::Low => Self::Info,
            QueryRiskLevel::Medium => Self::Warning,
            QueryRiskLevel::High | QueryRiskLevel::Critical => Self::Error,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityWarning {
    pub level: WarningLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl SecurityWarning {
    pub fn new(level: WarningLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PermissionType {
    Select,
    Insert,
    Update,
    Delete,
    Create,
    Execute,
}

impl PermissionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Create => "CREATE",
            Self::Execute => "EXECUTE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequiredPermission {
    #[serde(rename = "type")]
    pub kind: PermissionType,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub required: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeCategory {
    Fast,
    Moderate,
    Slow,
    VerySlow,
}

impl TimeCategory {
    pub fn from_score(score: u32) -> Self {
        match score {
            0..=30 => Self::Fast,
            31..=60 => Self::Moderate,
            61..=90 => Self::Slow,
            _ => Self::VerySlow,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Moderate => "moderate",
            Self::Slow => "slow",
            Self::VerySlow => "very_slow",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PerformanceEstimate {
    pub complexity_score: u32,
    pub time_category: TimeCategory,
    pub factors: Vec<String>,
    pub optimizations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSensitivity {
    Public,
    Internal,
    Confidential,
    Restricted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataClassification {
    pub level: DataSensitivity,
    pub targets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataAccessPattern {
    pub tables_read: Vec<String>,
    pub tables_modified: Vec<String>,
    pub estimated_rows_affected: u64,
    pub accesses_sensitive_data: bool,
    pub data_classifications: Vec<DataClassification>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationType {
    Security,
    Performance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityRecommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationType,
    pub priority: Priority,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implementation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityReport {
    pub risk_level: QueryRiskLevel,
    pub risk_score: u32,
    pub required_permissions: Vec<RequiredPermission>,
    pub warnings: Vec<SecurityWarning>,
    pub performance: PerformanceEstimate,
    pub ai_executable: bool,
    pub requires_elevated_privileges: bool,
    pub data_access: DataAccessPattern,
    pub recommendations: Vec<SecurityRecommendation>,
}
