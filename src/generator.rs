//! The top-level pipeline (spec §3 Lifecycles): parse, resolve, sort,
//! emit. Owns the one `SymbolTable` for the run and never reaches for
//! global state.

use std::collections::BTreeSet;

use crate::depgraph;
use crate::emit::{self, EmitInput};
use crate::error::{GenerationFailed, GeneratorError};
use crate::lexer::{strip_comments, LexedSource};
use crate::model::{EnumType, RecordSchema, RecordSchemaKind, ReturnShape};
use crate::parser::{functions, tables};
use crate::symbols::SymbolTable;

pub struct GenerateOptions {
    /// Missing-schema and type-mapping failures fall back to a placeholder
    /// instead of aborting the run (spec §7).
    pub permissive: bool,
    /// Suppresses emission of `get_optional`/`get_required` (spec §4.6.6).
    pub omit_helpers: bool,
}

pub struct GenerateOutcome {
    pub code: String,
    /// Survivable problems worth surfacing to the caller even on success:
    /// tolerated cycles, schema-file overrides, skipped functions.
    pub warnings: Vec<String>,
}

/// Runs the full pipeline. `functions_source` may itself contain
/// `CREATE TABLE`/`CREATE TYPE` statements; `schema_source`, when present,
/// is parsed second so its definitions win on any name collision (spec §9
/// schema-precedence resolution).
pub fn generate(
    functions_source: &str,
    functions_file_name: &str,
    schema_source: Option<&str>,
    schema_file_name: Option<&str>,
    options: &GenerateOptions,
) -> Result<GenerateOutcome, GenerationFailed> {
    let mut symbols = SymbolTable::new();
    let mut fatal: Vec<GeneratorError> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    let functions_stripped = strip_comments(functions_source);
    if let Err(e) = tables::parse_ddl(&functions_stripped, &mut symbols) {
        fatal.push(e);
    }

    if let Some(schema_source) = schema_source {
        let before: Vec<RecordSchema> = symbols.records_in_order().into_iter().cloned().collect();
        let schema_stripped = strip_comments(schema_source);
        if let Err(e) = tables::parse_ddl(&schema_stripped, &mut symbols) {
            fatal.push(e);
        }
        for after in symbols.records_in_order() {
            if let Some(prior) = before.iter().find(|r| r.struct_name == after.struct_name) {
                if prior != after {
                    tracing::debug!(
                        "schema file overrides record `{}` declared in the functions file",
                        after.struct_name
                    );
                    warnings.push(format!(
                        "schema file overrides record `{}` declared in the functions file",
                        after.struct_name
                    ));
                }
            }
        }
    }

    if !fatal.is_empty() {
        return Err(GenerationFailed(fatal));
    }

    let lexed = LexedSource::new(functions_source);
    let (parsed_functions, fn_errors) =
        functions::parse_functions(&functions_stripped, &lexed, &mut symbols, options.permissive);

    for e in fn_errors {
        if e.is_fatal() {
            tracing::error!("{e}");
            fatal.push(e);
        } else {
            tracing::warn!("{e}");
            warnings.push(e.to_string());
        }
    }

    if !fatal.is_empty() {
        return Err(GenerationFailed(fatal));
    }

    let mut initial: Vec<RecordSchema> = symbols.records_in_order().into_iter().cloned().collect();
    for f in &parsed_functions {
        if f.return_shape != ReturnShape::AdHocTable {
            continue;
        }
        let (Some(struct_name), Some(columns)) = (&f.return_type_name, &f.return_columns) else {
            continue;
        };
        if initial.iter().any(|r| &r.struct_name == struct_name) {
            continue;
        }
        initial.push(RecordSchema {
            struct_name: struct_name.clone(),
            sql_name: format!("{}()", f.sql_name),
            columns: columns.clone(),
            imports: BTreeSet::new(),
            kind: RecordSchemaKind::AdHoc,
        });
    }

    let (records, cycle) = depgraph::collect_and_sort(initial, &symbols);
    if let Some(cycle) = cycle {
        tracing::warn!("{cycle}");
        warnings.push(cycle.to_string());
    }

    let enums: Vec<EnumType> = symbols.enums_in_order().into_iter().cloned().collect();

    let code = emit::render(&EmitInput {
        functions_file: functions_file_name,
        schema_file: schema_file_name,
        enums: &enums,
        records: &records,
        functions: &parsed_functions,
        omit_helpers: options.omit_helpers,
    });

    Ok(GenerateOutcome { code, warnings })
}
