//! The pipeline's closed error taxonomy.
//!
//! `GeneratorError` covers everything that can go wrong inside the parser,
//! resolver, dependency sorter, and emitter. I/O around the pipeline (reading
//! input files, writing the output file) is handled with `anyhow::Context`
//! at the call sites in `src/generator.rs` and `src/main.rs` instead of being
//! folded into this enum, since those failures carry no pipeline-specific
//! structure worth matching on.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("type mapping failure: SQL type `{sql_type}` could not be resolved ({context})")]
    TypeMappingFailure { sql_type: String, context: String },

    #[error(
        "missing schema: function `{function}` returns `{sql_type}`, which has no known table or type definition"
    )]
    MissingSchema { function: String, sql_type: String },

    #[error("function parse failure: `{function}` ({reason})")]
    FunctionParseFailure { function: String, reason: String },

    #[error("table parse failure: `{table}` ({reason})")]
    TableParseFailure { table: String, reason: String },
}

impl GeneratorError {
    pub fn is_fatal(&self) -> bool {
        !matches!(self, GeneratorError::FunctionParseFailure { .. })
    }
}

/// Reported, never returned as an `Err`: a tolerated dependency cycle among
/// the emitted record types (spec: cycles are logged and emission proceeds).
#[derive(Debug, Clone)]
pub struct CycleWarning {
    pub members: Vec<String>,
}

impl std::fmt::Display for CycleWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "circular dependency detected among record types: {}",
            self.members.join(" -> ")
        )
    }
}

/// Wraps every fatal error collected during one generator run so
/// `src/generator.rs` can hand a single `std::error::Error` back to
/// `anyhow::Context`-based callers instead of a bare `Vec`.
#[derive(Debug)]
pub struct GenerationFailed(pub Vec<GeneratorError>);

impl std::fmt::Display for GenerationFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "generation failed with {} error(s):", self.0.len())?;
        for e in &self.0 {
            writeln!(f, "  - {e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for GenerationFailed {}
