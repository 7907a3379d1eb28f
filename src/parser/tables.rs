//! Stage 2a: `CREATE TABLE`, `CREATE TYPE ... AS (...)`, and
//! `CREATE TYPE ... AS ENUM (...)` extraction (spec §4.2.1).
//!
//! Head identification uses `regex` (per spec §9, "reserving regexes for
//! head identification only"); the parenthesized body is then located with
//! a hand-written paren-depth scan so `numeric(10,2)`-style nested
//! parentheses inside a column list never truncate the match.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::GeneratorError;
use crate::model::{EnumType, RecordSchema, RecordSchemaKind, ReturnColumn};
use crate::naming::{self, DefaultPluralizer};
use crate::parser::columns::{find_matching_paren, parse_columns};
use crate::resolver::resolve_type;
use crate::symbols::SymbolTable;

static TABLE_HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)CREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?([\w".]+)\s*\("#).unwrap()
});

static TYPE_HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)CREATE\s+TYPE\s+([\w".]+)\s+AS\s+(ENUM\s*)?\("#).unwrap()
});

/// Parses every `CREATE TABLE`/`CREATE TYPE` declaration out of
/// comment-stripped `source`, inserting each into `symbols`. Tables and
/// composites are registered in two phases so that a field referencing
/// another table/composite declared later in the same source still
/// resolves (spec §4.5 closure requirement starts here).
pub fn parse_ddl(source: &str, symbols: &mut SymbolTable) -> Result<(), GeneratorError> {
    for m in TYPE_HEAD.captures_iter(source) {
        if m.get(2).is_some() {
            let sql_name = clean_name(&m[1]);
            let open_paren = m.get(0).unwrap().end() - 1;
            let close_paren = find_matching_paren(source, open_paren).ok_or_else(|| {
                GeneratorError::TableParseFailure {
                    table: sql_name.clone(),
                    reason: "unterminated ENUM body".to_string(),
                }
            })?;
            let body = &source[open_paren + 1..close_paren];
            let labels = parse_enum_labels(body);
            let enum_name = naming::enum_struct_name(&sql_name);
            symbols.insert_enum(EnumType {
                enum_name,
                sql_name,
                labels,
            });
        }
    }

    let mut raw_entries: Vec<(String, RecordSchemaKind, String)> = Vec::new();

    for m in TABLE_HEAD.captures_iter(source) {
        let sql_name = clean_name(&m[1]);
        let open_paren = m.get(0).unwrap().end() - 1;
        let close_paren = find_matching_paren(source, open_paren).ok_or_else(|| {
            GeneratorError::TableParseFailure {
                table: sql_name.clone(),
                reason: "unterminated column list".to_string(),
            }
        })?;
        let body = source[open_paren + 1..close_paren].to_string();
        raw_entries.push((sql_name, RecordSchemaKind::Table, body));
    }

    for m in TYPE_HEAD.captures_iter(source) {
        if m.get(2).is_some() {
            continue; // already handled as an enum above
        }
        let sql_name = clean_name(&m[1]);
        let open_paren = m.get(0).unwrap().end() - 1;
        let close_paren = find_matching_paren(source, open_paren).ok_or_else(|| {
            GeneratorError::TableParseFailure {
                table: sql_name.clone(),
                reason: "unterminated field list".to_string(),
            }
        })?;
        let body = source[open_paren + 1..close_paren].to_string();
        raw_entries.push((sql_name, RecordSchemaKind::Composite, body));
    }

    // Phase A: register struct-name placeholders so same-file forward
    // references between tables/composites resolve in phase B.
    let pluralizer = DefaultPluralizer;
    for (sql_name, kind, _) in &raw_entries {
        let struct_name = naming::record_struct_name(sql_name, &pluralizer);
        symbols.insert_record(RecordSchema {
            struct_name,
            sql_name: sql_name.clone(),
            columns: Vec::new(),
            imports: BTreeSet::new(),
            kind: *kind,
        });
    }

    // Phase B: resolve columns now that every name in this source is known.
    for (sql_name, kind, body) in raw_entries {
        let struct_name = naming::record_struct_name(&sql_name, &pluralizer);
        let raw_columns = parse_columns(&body);
        if raw_columns.is_empty() {
            return Err(GeneratorError::TableParseFailure {
                table: sql_name,
                reason: "no columns recognized".to_string(),
            });
        }
        let mut imports = BTreeSet::new();
        let mut columns = Vec::with_capacity(raw_columns.len());
        for raw in raw_columns {
            let descriptor = resolve_type(&raw.sql_type, raw.is_optional, symbols);
            imports.extend(descriptor.imports.iter().cloned());
            columns.push(ReturnColumn {
                name: raw.name,
                sql_type: raw.sql_type,
                rust_type: descriptor.rust_type,
                is_optional: raw.is_optional,
            });
        }
        symbols.insert_record(RecordSchema {
            struct_name,
            sql_name,
            columns,
            imports,
            kind,
        });
    }

    Ok(())
}

fn clean_name(raw: &str) -> String {
    raw.trim().trim_matches('"').to_string()
}

fn parse_enum_labels(body: &str) -> Vec<String> {
    crate::parser::columns::split_top_level_commas(body)
        .into_iter()
        .filter_map(|fragment| {
            let trimmed = fragment.trim();
            let unquoted = trimmed.strip_prefix('\'').and_then(|s| s.strip_suffix('\''))?;
            Some(unquoted.replace("''", "'"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_table() {
        let mut symbols = SymbolTable::new();
        parse_ddl(
            "CREATE TABLE public.companies (id SERIAL PRIMARY KEY, name TEXT NOT NULL, founded DATE);",
            &mut symbols,
        )
        .unwrap();
        let record = symbols.get_record("companies").unwrap();
        assert_eq!(record.struct_name, "Company");
        assert_eq!(record.columns.len(), 3);
        assert_eq!(record.columns[2].rust_type, "Option<chrono::NaiveDate>");
    }

    #[test]
    fn parses_composite_with_numeric_precision() {
        let mut symbols = SymbolTable::new();
        parse_ddl(
            "CREATE TABLE meters(id SERIAL PRIMARY KEY, is_on BOOLEAN, lat NUMERIC(10,7), data JSONB);",
            &mut symbols,
        )
        .unwrap();
        let record = symbols.get_record("meters").unwrap();
        let lat = record.columns.iter().find(|c| c.name == "lat").unwrap();
        assert_eq!(lat.rust_type, "Option<rust_decimal::Decimal>");
    }

    #[test]
    fn parses_enum_labels_verbatim() {
        let mut symbols = SymbolTable::new();
        parse_ddl(
            "CREATE TYPE status_type AS ENUM('pending','active','inactive');",
            &mut symbols,
        )
        .unwrap();
        let enum_type = symbols.get_enum("status_type").unwrap();
        assert_eq!(enum_type.enum_name, "StatusType");
        assert_eq!(enum_type.labels, vec!["pending", "active", "inactive"]);
    }

    #[test]
    fn resolves_nested_composite_reference() {
        let mut symbols = SymbolTable::new();
        parse_ddl(
            "CREATE TABLE meters(id SERIAL PRIMARY KEY);\nCREATE TYPE meter_upsert AS (meter meters, was_created BOOLEAN);",
            &mut symbols,
        )
        .unwrap();
        let composite = symbols.get_record("meter_upsert").unwrap();
        let meter_field = composite.columns.iter().find(|c| c.name == "meter").unwrap();
        assert_eq!(meter_field.rust_type, "Option<Meter>");
    }

    #[test]
    fn fails_on_unterminated_body() {
        let mut symbols = SymbolTable::new();
        let result = parse_ddl("CREATE TABLE broken (id SERIAL", &mut symbols);
        assert!(result.is_err());
    }
}
