use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    #[error("Could not read config file {path}")]
    #[diagnostic(code(sqlgate::config::read))]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    #[diagnostic(
        code(sqlgate::config::parse),
        help(
            "known keys: allowed_schemas, blocked_functions, max_complexity, require_explicit_permissions, read_only_mode, custom_rules, data_classification_rules"
        )
    )]
    ConfigParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Server error: {0}")]
    Server(String),
}
