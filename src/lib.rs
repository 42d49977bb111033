// sqlgate library - decide if sql is safe for an ai agent to run

pub mod cli;
pub mod config;
mod core;
mod error;
mod output;
mod server;

pub use config::{DataClassificationRule, SecurityConfig, SecurityConfigOverrides};
pub use crate::core::*;
pub use error::Error;
pub use output::{Output, format_security_report};
pub use server::Server;
