// command line interface

use crate::config::{self, SecurityConfig, SecurityConfigOverrides};
use crate::{AnalyzeOptions, Analyzer, Output, Server};
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sqlgate", about = "Check whether sql is safe for an ai agent to run")]
struct Cli {
    /// security policy file (toml)
    #[arg(long, short, env = "SQLGATE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// treat every modifying statement as not executable
    #[arg(long, global = true)]
    read_only: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// analyze one sql statement (reads stdin when omitted)
    Check {
        sql: Option<String>,

        /// print the full analysis as json
        #[arg(long)]
        json: bool,

        /// default schema for unqualified tables
        #[arg(long, short)]
        schema: Option<String>,

        /// allowed schema, repeatable ("*" allows all)
        #[arg(long = "allow-schema")]
        allow_schemas: Vec<String>,

        /// permission already held, repeatable ("SELECT" or "SELECT:users")
        #[arg(long = "permission")]
        permissions: Vec<String>,

        /// exit with an error when the query is not safe for ai execution
        #[arg(long)]
        fail_unsafe: bool,
    },

    /// start as http server
    Serve {
        /// port number
        #[arg(long, short, default_value = "3000")]
        port: u16,

        /// host to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut base = SecurityConfigOverrides::default();
    if let Some(path) = &cli.config {
        base = config::load(path)?;
    }
    if cli.read_only {
        base.read_only_mode = Some(true);
    }
    let analyzer = Analyzer::new(SecurityConfig::default().merged(&base));

    match cli.command {
        Commands::Serve { port, host } => Ok(Server::run(analyzer, &host, port).await?),

        Commands::Check {
            sql,
            json,
            schema,
            allow_schemas,
            permissions,
            fail_unsafe,
        } => {
            let sql = match sql {
                Some(sql) => sql,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf).into_diagnostic()?;
                    buf
                }
            };

            let mut options = AnalyzeOptions {
                schema,
                permissions,
                ..AnalyzeOptions::default()
            };
            if !allow_schemas.is_empty() {
                options.security_config.allowed_schemas = Some(allow_schemas.into_iter().collect());
            }

            let result = analyzer.analyze(&sql, &options);
            if json {
                println!("{}", Output::raw(&result)?);
            } else {
                print!("{}", Output::report(&result));
            }

            if fail_unsafe && !result.ai_executable {
                return Err(miette::miette!(
                    "query is not safe for automated execution (risk {})",
                    result.security.risk_level
                ));
            }
            Ok(())
        }
    }
}
