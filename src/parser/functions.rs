//! Stage 2b: `CREATE [OR REPLACE] FUNCTION` extraction, including the
//! trivial `RETURNS record` body-recovery pass (spec §4.2.2).

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::GeneratorError;
use crate::lexer::LexedSource;
use crate::model::{ParsedFunction, RecordSchema, RecordSchemaKind, ReturnColumn, ReturnShape, SqlParameter};
use crate::naming;
use crate::parser::columns::{find_matching_paren, parse_parameters, split_top_level_commas, ParamMode};
use crate::resolver::resolve_type;
use crate::symbols::SymbolTable;

static FUNCTION_HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)CREATE\s+(?:OR\s+REPLACE\s+)?FUNCTION\s+([\w".]+)\s*\("#).unwrap()
});

static RETURNS_CLAUSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)^\s*RETURNS\s+(.*?)\s*(AS\b|LANGUAGE\b)").unwrap());

static DOLLAR_BODY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\$(\w*)\$(.*?)\$\1\$").unwrap());

static TRIVIAL_SELECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)^SELECT\s+(.+?)\s+FROM\s+([\w."]+)(?:\s+WHERE\b.*)?\s*;?\s*$"#).unwrap()
});

const PLPGSQL_MARKERS: &[&str] = &["DECLARE", "BEGIN", "FOR ", "IF "];

/// Parses every `CREATE [OR REPLACE] FUNCTION` declaration out of
/// comment-stripped `stripped` (whose byte offsets line up 1:1 with
/// `lexed.original`, see [`crate::lexer::strip_comments`]).
///
/// A function whose head cannot be recognized, or which declares an `OUT`/
/// `INOUT` parameter, is reported as a survivable [`GeneratorError`] in the
/// second element of the returned tuple rather than aborting the run (spec
/// §7: function-parse failures are logged and skip only the offending
/// function).
pub fn parse_functions(
    stripped: &str,
    lexed: &LexedSource,
    symbols: &mut SymbolTable,
    permissive: bool,
) -> (Vec<ParsedFunction>, Vec<GeneratorError>) {
    let mut functions = Vec::new();
    let mut errors = Vec::new();

    for m in FUNCTION_HEAD.captures_iter(stripped) {
        let whole_match = m.get(0).unwrap();
        let sql_name = m[1].trim().trim_matches('"').to_string();
        let open_paren = whole_match.end() - 1;

        let close_paren = match find_matching_paren(stripped, open_paren) {
            Some(idx) => idx,
            None => {
                errors.push(GeneratorError::FunctionParseFailure {
                    function: sql_name,
                    reason: "unterminated parameter list".to_string(),
                });
                continue;
            }
        };
        let params_body = &stripped[open_paren + 1..close_paren];

        let after_params = &stripped[close_paren + 1..];
        let returns_match = match RETURNS_CLAUSE.captures(after_params) {
            Some(c) => c,
            None => {
                errors.push(GeneratorError::FunctionParseFailure {
                    function: sql_name,
                    reason: "no recognizable RETURNS clause".to_string(),
                });
                continue;
            }
        };
        let return_text = returns_match[1].trim().to_string();
        let terminator_is_as = returns_match[2].trim().eq_ignore_ascii_case("as");

        let params = match build_parameters(params_body, &*symbols) {
            Ok(p) => p,
            Err(reason) => {
                errors.push(GeneratorError::FunctionParseFailure { function: sql_name, reason });
                continue;
            }
        };

        let body_start_abs = close_paren + 1 + returns_match.get(0).unwrap().end();
        let body_text = if terminator_is_as {
            DOLLAR_BODY
                .captures(&stripped[body_start_abs..])
                .map(|c| c[2].to_string())
        } else {
            None
        };

        let host_name = naming::function_host_name(&sql_name);
        let line_idx = lexed.line_at(whole_match.start());
        let doc_comment = lexed
            .preceding_comment(line_idx)
            .unwrap_or_else(|| format!("Call PostgreSQL function {sql_name}()."));

        match classify_return(&return_text, body_text.as_deref(), &*symbols) {
            Ok(mut classified) => {
                if classified.shape == ReturnShape::AdHocTable && classified.return_type_name.is_none() {
                    classified.return_type_name = Some(naming::adhoc_record_name(&host_name));
                }
                if classified.rust_return_type.is_empty() {
                    if let Some(type_name) = &classified.return_type_name {
                        classified.rust_return_type = if classified.setof {
                            format!("Vec<{type_name}>")
                        } else {
                            format!("Option<{type_name}>")
                        };
                    }
                }
                let mut imports = BTreeSet::new();
                for p in &params {
                    if p.rust_type.contains("chrono") {
                        imports.insert("chrono".to_string());
                    }
                    if p.rust_type.contains("uuid") {
                        imports.insert("uuid".to_string());
                    }
                    if p.rust_type.contains("rust_decimal") {
                        imports.insert("rust_decimal".to_string());
                    }
                    if p.rust_type.contains("serde_json") {
                        imports.insert("serde_json".to_string());
                    }
                }
                functions.push(ParsedFunction {
                    sql_name,
                    host_name,
                    params,
                    rust_return_type: classified.rust_return_type,
                    return_shape: classified.shape,
                    returns_setof: classified.setof,
                    named_return_sql_type: classified.named_sql_type,
                    return_columns: classified.return_columns,
                    return_type_name: classified.return_type_name,
                    needs_column_cast: classified.needs_column_cast,
                    doc_comment,
                    imports,
                });
            }
            Err(reason) => {
                if permissive {
                    if symbols.get_record(&reason).is_none() {
                        let struct_name = naming::record_struct_name(&reason, &naming::DefaultPluralizer);
                        symbols.insert_record(RecordSchema {
                            struct_name,
                            sql_name: reason.clone(),
                            columns: Vec::new(),
                            imports: BTreeSet::from(["serde_json".to_string()]),
                            kind: RecordSchemaKind::Placeholder,
                        });
                    }
                    functions.push(permissive_placeholder_function(
                        sql_name.clone(),
                        host_name,
                        params,
                        doc_comment,
                    ));
                } else {
                    errors.push(GeneratorError::MissingSchema {
                        function: sql_name,
                        sql_type: reason,
                    });
                }
            }
        }
    }

    (functions, errors)
}

fn build_parameters(body: &str, symbols: &SymbolTable) -> Result<Vec<SqlParameter>, String> {
    let raw_params = parse_parameters(body);
    let mut out = Vec::with_capacity(raw_params.len());
    for raw in raw_params {
        if raw.mode != ParamMode::In {
            return Err(format!(
                "parameter `{}` uses unsupported mode {:?}; OUT/INOUT parameters are rejected",
                raw.name, raw.mode
            ));
        }
        let descriptor = resolve_type(&raw.sql_type, raw.is_optional, symbols);
        out.push(SqlParameter {
            host_name: naming::parameter_host_name(&raw.name),
            sql_name: raw.name,
            sql_type: raw.sql_type,
            rust_type: descriptor.rust_type,
            is_optional: raw.is_optional,
            has_sql_default_non_null: raw.has_sql_default_non_null,
        });
    }
    Ok(out)
}

struct ClassifiedReturn {
    shape: ReturnShape,
    setof: bool,
    rust_return_type: String,
    named_sql_type: Option<String>,
    return_columns: Option<Vec<ReturnColumn>>,
    return_type_name: Option<String>,
    needs_column_cast: bool,
}

fn classify_return(
    return_text: &str,
    body_text: Option<&str>,
    symbols: &SymbolTable,
) -> Result<ClassifiedReturn, String> {
    let trimmed = return_text.trim();
    let (setof, rest) = match trimmed.strip_prefix("SETOF") {
        Some(r) => (true, r.trim()),
        None => match trimmed.to_uppercase().strip_prefix("SETOF") {
            Some(_) => (true, trimmed[5..].trim()),
            None => (false, trimmed),
        },
    };

    if rest.eq_ignore_ascii_case("void") {
        return Ok(ClassifiedReturn {
            shape: ReturnShape::Void,
            setof: false,
            rust_return_type: "()".to_string(),
            named_sql_type: None,
            return_columns: None,
            return_type_name: None,
            needs_column_cast: false,
        });
    }

    if rest.to_uppercase().starts_with("TABLE") {
        let open = rest.find('(').ok_or_else(|| "malformed RETURNS TABLE(...)".to_string())?;
        let close = find_matching_paren(rest, open).ok_or_else(|| "unterminated RETURNS TABLE(...)".to_string())?;
        let body = &rest[open + 1..close];
        let columns = parse_table_return_columns(body, symbols);
        return Ok(ClassifiedReturn {
            shape: ReturnShape::AdHocTable,
            setof: true, // RETURNS TABLE(...) is implicitly a set
            rust_return_type: String::new(), // filled in by the caller, which knows the function's host name
            named_sql_type: None,
            return_columns: Some(columns),
            return_type_name: None,
            needs_column_cast: false,
        });
    }

    if rest.eq_ignore_ascii_case("record") {
        if let Some(body) = body_text {
            if let Some(columns) = recover_trivial_record(body, symbols) {
                return Ok(ClassifiedReturn {
                    shape: ReturnShape::AdHocTable,
                    setof,
                    rust_return_type: String::new(),
                    named_sql_type: None,
                    return_columns: Some(columns),
                    return_type_name: None,
                    needs_column_cast: true,
                });
            }
        }
        return Ok(ClassifiedReturn {
            shape: ReturnShape::OpaqueRecord,
            setof,
            rust_return_type: if setof {
                "Vec<serde_json::Value>".to_string()
            } else {
                "Option<serde_json::Value>".to_string()
            },
            named_sql_type: None,
            return_columns: None,
            return_type_name: None,
            needs_column_cast: false,
        });
    }

    if let Some(enum_name) = symbols.lookup_enum_struct_name(rest) {
        return Ok(ClassifiedReturn {
            shape: ReturnShape::Enum,
            setof,
            rust_return_type: String::new(),
            named_sql_type: Some(rest.to_string()),
            return_columns: None,
            return_type_name: Some(enum_name),
            needs_column_cast: false,
        });
    }

    if let Some(record) = symbols.get_record(rest) {
        return Ok(ClassifiedReturn {
            shape: ReturnShape::NamedRecord,
            setof,
            rust_return_type: String::new(),
            named_sql_type: Some(rest.to_string()),
            return_columns: Some(record.columns.clone()),
            return_type_name: Some(record.struct_name.clone()),
            needs_column_cast: false,
        });
    }

    // Not an enum, not a known table/composite: either a primitive scalar
    // or an unresolvable named type (missing schema, spec §7).
    let descriptor = resolve_type(rest, false, symbols);
    if descriptor.rust_type == "serde_json::Value" && looks_like_identifier(rest) {
        return Err(rest.to_string());
    }
    Ok(ClassifiedReturn {
        shape: ReturnShape::Scalar,
        setof,
        rust_return_type: if setof {
            format!("Vec<{}>", descriptor.rust_type)
        } else {
            format!("Option<{}>", descriptor.rust_type)
        },
        named_sql_type: None,
        return_columns: None,
        return_type_name: None,
        needs_column_cast: false,
    })
}

fn looks_like_identifier(text: &str) -> bool {
    !text.is_empty()
        && text.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.')
        && text.chars().next().is_some_and(|c| c.is_alphabetic())
}

fn parse_table_return_columns(body: &str, symbols: &SymbolTable) -> Vec<ReturnColumn> {
    split_top_level_commas(body)
        .into_iter()
        .filter_map(|fragment| {
            let mut parts = fragment.trim().splitn(2, char::is_whitespace);
            let name = parts.next()?.trim().to_string();
            let sql_type = parts.next().unwrap_or("text").trim().to_string();
            let descriptor = resolve_type(&sql_type, true, symbols);
            Some(ReturnColumn {
                name,
                sql_type,
                rust_type: descriptor.rust_type,
                is_optional: true,
            })
        })
        .collect()
}

/// Recovers synthetic return columns for a `RETURNS record` function whose
/// body is exactly one trivial `SELECT col1, col2, ... FROM table` (spec
/// §4.2.2). Any deviation from that shape returns `None`.
fn recover_trivial_record(body: &str, symbols: &SymbolTable) -> Option<Vec<ReturnColumn>> {
    let trimmed = body.trim();
    let upper = trimmed.to_uppercase();
    if PLPGSQL_MARKERS.iter().any(|marker| upper.contains(marker)) {
        return None;
    }
    let captures = TRIVIAL_SELECT.captures(trimmed)?;
    let column_list = &captures[1];
    let table_name = captures[2].trim().trim_matches('"');
    let table = symbols.get_record(table_name);

    let columns: Vec<ReturnColumn> = split_top_level_commas(column_list)
        .into_iter()
        .filter_map(|fragment| {
            let fragment = fragment.trim();
            let (expr, cast_type) = match fragment.split_once("::") {
                Some((e, t)) => (e.trim(), Some(t.trim().to_string())),
                None => (fragment, None),
            };
            let name = naming::unqualified(expr).to_string();
            if let Some(cast) = cast_type {
                let descriptor = resolve_type(&cast, true, symbols);
                return Some(ReturnColumn {
                    name,
                    sql_type: cast,
                    rust_type: descriptor.rust_type,
                    is_optional: true,
                });
            }
            if let Some(table) = table {
                if let Some(col) = table.columns.iter().find(|c| c.name == name) {
                    return Some(ReturnColumn {
                        name,
                        sql_type: col.sql_type.clone(),
                        rust_type: format!("Option<{}>", col.rust_type.trim_start_matches("Option<").trim_end_matches('>')),
                        is_optional: true,
                    });
                }
            }
            Some(ReturnColumn {
                name,
                sql_type: "unknown".to_string(),
                rust_type: "Option<serde_json::Value>".to_string(),
                is_optional: true,
            })
        })
        .collect();
    if columns.is_empty() { None } else { Some(columns) }
}

fn permissive_placeholder_function(
    sql_name: String,
    host_name: String,
    params: Vec<SqlParameter>,
    doc_comment: String,
) -> ParsedFunction {
    ParsedFunction {
        sql_name,
        host_name,
        params,
        rust_return_type: "Vec<serde_json::Value>".to_string(),
        return_shape: ReturnShape::OpaqueRecord,
        returns_setof: true,
        named_return_sql_type: None,
        return_columns: None,
        return_type_name: None,
        needs_column_cast: false,
        doc_comment,
        imports: BTreeSet::from(["serde_json".to_string()]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{strip_comments, LexedSource};

    fn run(source: &str, symbols: &mut SymbolTable) -> (Vec<ParsedFunction>, Vec<GeneratorError>) {
        let lexed = LexedSource::new(source);
        let stripped = strip_comments(source);
        parse_functions(&stripped, &lexed, symbols, false)
    }

    #[test]
    fn parses_zero_parameter_void_function() {
        let mut symbols = SymbolTable::new();
        let (functions, errors) = run("CREATE FUNCTION noop() RETURNS void AS $$ BEGIN NULL; END; $$ LANGUAGE plpgsql;", &mut symbols);
        assert!(errors.is_empty());
        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].return_shape, ReturnShape::Void);
        assert!(functions[0].params.is_empty());
    }

    #[test]
    fn parses_scalar_function_with_defaults() {
        let mut symbols = SymbolTable::new();
        let (functions, errors) = run(
            "CREATE FUNCTION f(p_name TEXT, p_qty INT DEFAULT 10, p_cat INT DEFAULT 1) RETURNS TEXT AS $$ SELECT 1 $$ LANGUAGE sql;",
            &mut symbols,
        );
        assert!(errors.is_empty());
        let f = &functions[0];
        assert_eq!(f.params.len(), 3);
        assert!(!f.params[0].is_optional);
        assert!(f.params[1].is_optional);
        let ordered: Vec<&str> = f.ordered_params().iter().map(|p| p.host_name.as_str()).collect();
        assert_eq!(ordered, vec!["name", "qty", "cat"]);
        assert_eq!(f.rust_return_type, "Option<String>");
    }

    #[test]
    fn rejects_out_parameter() {
        let mut symbols = SymbolTable::new();
        let (functions, errors) = run(
            "CREATE FUNCTION f(p_id INT, OUT p_total INT) RETURNS INT AS $$ SELECT 1 $$ LANGUAGE sql;",
            &mut symbols,
        );
        assert!(functions.is_empty());
        assert_eq!(errors.len(), 1);
        assert!(!errors[0].is_fatal());
    }

    #[test]
    fn recovers_trivial_record_return() {
        let mut symbols = SymbolTable::new();
        crate::parser::tables::parse_ddl(
            "CREATE TABLE items(id SERIAL PRIMARY KEY, current_mood TEXT, created_at TIMESTAMP);",
            &mut symbols,
        )
        .unwrap();
        let (functions, errors) = run(
            "CREATE FUNCTION now_info() RETURNS record AS $$ SELECT current_mood, created_at::DATE FROM items WHERE id=1 $$ LANGUAGE sql;",
            &mut symbols,
        );
        assert!(errors.is_empty());
        let f = &functions[0];
        assert!(f.needs_column_cast);
        let columns = f.return_columns.as_ref().unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].name, "current_mood");
        assert_eq!(columns[1].sql_type, "DATE");
    }

    #[test]
    fn setof_named_table_resolves_named_record() {
        let mut symbols = SymbolTable::new();
        crate::parser::tables::parse_ddl(
            "CREATE TABLE public.companies(id SERIAL PRIMARY KEY, name TEXT NOT NULL, founded DATE);",
            &mut symbols,
        )
        .unwrap();
        let (functions, errors) = run(
            "CREATE FUNCTION list_companies() RETURNS SETOF public.companies AS $$ SELECT 1 $$ LANGUAGE sql;",
            &mut symbols,
        );
        assert!(errors.is_empty());
        let f = &functions[0];
        assert_eq!(f.return_shape, ReturnShape::NamedRecord);
        assert!(f.returns_setof);
        assert_eq!(f.return_type_name.as_deref(), Some("Company"));
        assert_eq!(f.rust_return_type, "Vec<Company>");
        assert!(!f.needs_column_cast);
    }

    #[test]
    fn missing_schema_fatal_without_permissive() {
        let mut symbols = SymbolTable::new();
        let lexed = LexedSource::new("CREATE FUNCTION get_x() RETURNS SETOF undefined_tab AS $$ SELECT 1 $$ LANGUAGE sql;");
        let stripped = strip_comments(lexed.original);
        let (functions, errors) = parse_functions(&stripped, &lexed, &mut symbols, false);
        assert!(functions.is_empty());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].is_fatal());
    }

    #[test]
    fn missing_schema_permissive_emits_placeholder() {
        let mut symbols = SymbolTable::new();
        let lexed = LexedSource::new("CREATE FUNCTION get_x() RETURNS SETOF undefined_tab AS $$ SELECT 1 $$ LANGUAGE sql;");
        let stripped = strip_comments(lexed.original);
        let (functions, errors) = parse_functions(&stripped, &lexed, &mut symbols, true);
        assert!(errors.is_empty());
        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].rust_return_type, "Vec<serde_json::Value>");
        let placeholder = symbols.get_record("undefined_tab").unwrap();
        assert_eq!(placeholder.kind, crate::model::RecordSchemaKind::Placeholder);
    }
}
