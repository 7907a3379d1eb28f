//! CLI surface and config-file layering (spec §6 "Invocation surface").
//!
//! Defaults are read from an optional TOML config file first, then
//! overridden by whatever flags the caller actually passed on the command
//! line — the same `ConfigInput`-then-resolve layering this codebase's own
//! `config::load_config` already uses, minus the parts that have no
//! counterpart in this tool's scope (env var merging, interactive prompts,
//! Docker/shadow-database settings).

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(
    name = "pg2rs",
    author,
    version,
    about = "Generates a typed async Rust client from PostgreSQL function and schema declarations"
)]
pub struct Cli {
    /// SQL source containing `CREATE [OR REPLACE] FUNCTION` statements.
    pub functions_file: String,

    /// Path the generated `.rs` source is written to.
    pub output_file: String,

    /// Optional SQL source of `CREATE TABLE`/`CREATE TYPE` statements,
    /// authoritative over any same-named definition in `functions_file`.
    #[arg(long)]
    pub schema: Option<String>,

    /// Fall back to a placeholder instead of aborting on a missing schema
    /// or unmappable type.
    #[arg(long)]
    pub permissive: bool,

    /// Suppress emission of `get_optional`/`get_required`.
    #[arg(long)]
    pub no_helpers: bool,

    /// Info-level logging.
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Error-level logging only.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Optional TOML file providing defaults for any of the flags above;
    /// CLI flags always take precedence over it.
    #[arg(long)]
    pub config: Option<String>,
}

/// Mirrors [`Cli`]'s optional flags so a TOML config file can supply
/// defaults for any of them.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConfigInput {
    pub schema: Option<String>,
    pub permissive: Option<bool>,
    pub no_helpers: Option<bool>,
    pub verbose: Option<bool>,
    pub quiet: Option<bool>,
}

pub fn load_config(config_file: &str) -> Result<ConfigInput> {
    if !Path::new(config_file).exists() {
        return Ok(ConfigInput::default());
    }
    let contents = std::fs::read_to_string(config_file)
        .with_context(|| format!("reading config file `{config_file}`"))?;
    toml::from_str(&contents).with_context(|| format!("parsing config file `{config_file}`"))
}

/// The fully-resolved set of options driving one run, CLI flags layered
/// over an optional config file (CLI always wins on a conflict).
pub struct ResolvedOptions {
    pub functions_file: String,
    pub output_file: String,
    pub schema_file: Option<String>,
    pub permissive: bool,
    pub no_helpers: bool,
    pub verbose: bool,
    pub quiet: bool,
}

impl Cli {
    pub fn resolve(self) -> Result<ResolvedOptions> {
        let file_config = match &self.config {
            Some(path) => load_config(path)?,
            None => ConfigInput::default(),
        };

        Ok(ResolvedOptions {
            functions_file: self.functions_file,
            output_file: self.output_file,
            schema_file: self.schema.or(file_config.schema),
            permissive: self.permissive || file_config.permissive.unwrap_or(false),
            no_helpers: self.no_helpers || file_config.no_helpers.unwrap_or(false),
            verbose: self.verbose || file_config.verbose.unwrap_or(false),
            quiet: self.quiet || file_config.quiet.unwrap_or(false),
        })
    }
}
