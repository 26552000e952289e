//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function.

pub mod cache;
pub mod continuous;
pub mod discrete;
pub mod enzyme;
pub mod metabolite;
pub mod signed;

use crate::config::CliConfig;
use crate::error::{CliError, Result};
use crate::output::OutputFormat;
use std::path::Path;

/// Settings shared by every command
#[derive(Debug, Clone)]
pub struct Context {
    pub config: CliConfig,
    pub format: OutputFormat,
    pub quiet: bool,
}

/// Join inline identifier arguments and the contents of `input` into one
/// field for the resolver
pub fn read_ids(inline: &[String], input: Option<&Path>, what: &str) -> Result<String> {
    let mut field = inline.join(",");
    if let Some(path) = input {
        let contents = std::fs::read_to_string(path)?;
        if !field.is_empty() {
            field.push(',');
        }
        field.push_str(&contents);
    }

    if field.trim().is_empty() {
        return Err(CliError::no_input(format!("{} is empty", what)));
    }
    Ok(field)
}
