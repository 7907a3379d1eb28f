//! Emits one async wrapper per parsed function (spec §4.6.4), the central
//! contract of the generated client.
//!
//! Every wrapper follows the same four phases: side-value preparation for
//! enum parameters, dynamic call assembly (named-argument fragments plus a
//! value map), query composition, and a return-shape-driven execution branch
//! that maps the fetched rows into the wrapper's declared return type.

use std::collections::HashSet;
use std::fmt::Write as _;

use crate::model::{ParsedFunction, ReturnColumn, ReturnShape};
use crate::resolver;

fn strip_wrapper(rust_type: &str) -> &str {
    rust_type
        .trim_start_matches("Vec<")
        .trim_start_matches("Option<")
        .trim_end_matches('>')
}

fn param_base_type(rust_type: &str) -> &str {
    rust_type
        .strip_prefix("Option<")
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(rust_type)
}

fn cast_clause(columns: &[ReturnColumn]) -> String {
    let parts: Vec<String> = columns
        .iter()
        .map(|c| {
            let sql_type = resolver::rust_type_to_sql(param_base_type(&c.rust_type));
            format!("{} {}", c.name, sql_type.to_uppercase())
        })
        .collect();
    format!(" AS ({})", parts.join(", "))
}

pub fn render(out: &mut String, f: &ParsedFunction, enum_names: &HashSet<String>) {
    let _ = writeln!(out, "/// {}", f.doc_comment.replace('\n', "\n/// "));
    let _ = write!(out, "pub async fn {}(conn: &impl Connection", f.host_name);
    for p in f.ordered_params() {
        let _ = write!(out, ", {}: {}", p.host_name, p.rust_type);
    }
    let _ = writeln!(
        out,
        ") -> Result<{}, GeneratedClientError> {{",
        f.rust_return_type
    );

    let _ = writeln!(out, "    let mut fragments: Vec<String> = Vec::new();");
    let _ = writeln!(
        out,
        "    let mut bound: HashMap<&str, serde_json::Value> = HashMap::new();"
    );

    for p in &f.params {
        let is_enum = enum_names.contains(param_base_type(&p.rust_type));
        if p.is_optional {
            let _ = writeln!(out, "    if let Some(v) = &{} {{", p.host_name);
            if is_enum {
                let _ = writeln!(
                    out,
                    "        bound.insert(\"{name}\", serde_json::Value::String(v.value().to_string()));",
                    name = p.host_name
                );
            } else {
                let _ = writeln!(
                    out,
                    "        bound.insert(\"{name}\", bind_value(v));",
                    name = p.host_name
                );
            }
            let _ = writeln!(
                out,
                "        fragments.push(\"{sql} := %({name})s\".to_string());",
                sql = p.sql_name,
                name = p.host_name
            );
            let _ = writeln!(out, "    }}");
        } else if is_enum {
            let _ = writeln!(
                out,
                "    bound.insert(\"{name}\", serde_json::Value::String({name}.value().to_string()));",
                name = p.host_name
            );
            let _ = writeln!(
                out,
                "    fragments.push(\"{sql} := %({name})s\".to_string());",
                sql = p.sql_name,
                name = p.host_name
            );
        } else {
            let _ = writeln!(
                out,
                "    bound.insert(\"{name}\", bind_value(&{name}));",
                name = p.host_name
            );
            let _ = writeln!(
                out,
                "    fragments.push(\"{sql} := %({name})s\".to_string());",
                sql = p.sql_name,
                name = p.host_name
            );
        }
    }

    let as_clause = if f.needs_column_cast {
        cast_clause(f.return_columns.as_deref().unwrap_or_default())
    } else {
        String::new()
    };
    let _ = writeln!(
        out,
        "    let query = format!(\"SELECT * FROM {sql_name}({{}}){as_clause}\", fragments.join(\", \"));",
        sql_name = f.sql_name,
        as_clause = as_clause.replace('{', "{{").replace('}', "}}")
    );
    let _ = writeln!(out);

    render_execution(out, f);

    let _ = writeln!(out, "}}");
    let _ = writeln!(out);
}

fn render_execution(out: &mut String, f: &ParsedFunction) {
    match f.return_shape {
        ReturnShape::Void => {
            let _ = writeln!(out, "    conn.execute(&query, &bound).await?;");
            let _ = writeln!(out, "    Ok(())");
        }
        ReturnShape::Scalar => {
            let inner = strip_wrapper(&f.rust_return_type);
            if f.returns_setof {
                let _ = writeln!(out, "    let rows = conn.fetch_all(&query, &bound).await?;");
                let _ = writeln!(out, "    let mut out = Vec::with_capacity(rows.len());");
                let _ = writeln!(out, "    for row in rows {{");
                let _ = writeln!(out, "        let Some(value) = row.first().cloned() else {{ continue; }};");
                let _ = writeln!(
                    out,
                    "        let value: {inner} = serde_json::from_value(value).map_err(|_| GeneratedClientError::RowShape(\"{fn_name}\".to_string()))?;",
                    inner = inner,
                    fn_name = f.host_name
                );
                let _ = writeln!(out, "        out.push(value);");
                let _ = writeln!(out, "    }}");
                let _ = writeln!(out, "    Ok(out)");
            } else {
                let _ = writeln!(out, "    let row = conn.fetch_one(&query, &bound).await?;");
                let _ = writeln!(out, "    match row {{");
                let _ = writeln!(out, "        Some(row) => {{");
                let _ = writeln!(
                    out,
                    "            let value = row.first().cloned().unwrap_or(serde_json::Value::Null);"
                );
                let _ = writeln!(
                    out,
                    "            let value: {inner} = serde_json::from_value(value).map_err(|_| GeneratedClientError::RowShape(\"{fn_name}\".to_string()))?;",
                    inner = inner,
                    fn_name = f.host_name
                );
                let _ = writeln!(out, "            Ok(Some(value))");
                let _ = writeln!(out, "        }}");
                let _ = writeln!(out, "        None => Ok(None),");
                let _ = writeln!(out, "    }}");
            }
        }
        ReturnShape::OpaqueRecord => {
            if f.returns_setof {
                let _ = writeln!(out, "    let rows = conn.fetch_all(&query, &bound).await?;");
                let _ = writeln!(
                    out,
                    "    Ok(rows.into_iter().map(serde_json::Value::Array).collect())"
                );
            } else {
                let _ = writeln!(out, "    let row = conn.fetch_one(&query, &bound).await?;");
                let _ = writeln!(out, "    Ok(row.map(serde_json::Value::Array))");
            }
        }
        ReturnShape::AdHocTable | ReturnShape::NamedRecord => {
            let struct_name = f.return_type_name.as_deref().unwrap_or("serde_json::Value");
            if f.returns_setof {
                let _ = writeln!(out, "    let rows = conn.fetch_all(&query, &bound).await?;");
                let _ = writeln!(out, "    let mut out = Vec::with_capacity(rows.len());");
                let _ = writeln!(out, "    for row in rows {{");
                let _ = writeln!(out, "        out.push({struct_name}::from_row(&row)?);");
                let _ = writeln!(out, "    }}");
                let _ = writeln!(out, "    Ok(out)");
            } else {
                let _ = writeln!(out, "    let row = conn.fetch_one(&query, &bound).await?;");
                let _ = writeln!(out, "    match row {{");
                let _ = writeln!(
                    out,
                    "        Some(row) => Ok(Some({struct_name}::from_row(&row)?)),"
                );
                let _ = writeln!(out, "        None => Ok(None),");
                let _ = writeln!(out, "    }}");
            }
        }
        ReturnShape::Enum => {
            let enum_name = f.return_type_name.as_deref().unwrap_or("()");
            if f.returns_setof {
                let _ = writeln!(out, "    let rows = conn.fetch_all(&query, &bound).await?;");
                let _ = writeln!(out, "    let mut out = Vec::with_capacity(rows.len());");
                let _ = writeln!(out, "    for row in rows {{");
                let _ = writeln!(
                    out,
                    "        let label = row.first().and_then(|v| v.as_str()).ok_or_else(|| GeneratedClientError::RowShape(\"{fn_name}\".to_string()))?;",
                    fn_name = f.host_name
                );
                let _ = writeln!(out, "        out.push({enum_name}::from_label(label)?);");
                let _ = writeln!(out, "    }}");
                let _ = writeln!(out, "    Ok(out)");
            } else {
                let _ = writeln!(out, "    let row = conn.fetch_one(&query, &bound).await?;");
                let _ = writeln!(out, "    match row {{");
                let _ = writeln!(out, "        Some(row) => {{");
                let _ = writeln!(
                    out,
                    "            let label = row.first().and_then(|v| v.as_str()).ok_or_else(|| GeneratedClientError::RowShape(\"{fn_name}\".to_string()))?;",
                    fn_name = f.host_name
                );
                let _ = writeln!(out, "            Ok(Some({enum_name}::from_label(label)?))");
                let _ = writeln!(out, "        }}");
                let _ = writeln!(out, "        None => Ok(None),");
                let _ = writeln!(out, "    }}");
            }
        }
    }
}

pub fn render_all(out: &mut String, functions: &[ParsedFunction], enum_names: &HashSet<String>) {
    for f in functions {
        render(out, f, enum_names);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SqlParameter;
    use std::collections::BTreeSet;

    fn scalar_fn() -> ParsedFunction {
        ParsedFunction {
            sql_name: "get_count".to_string(),
            host_name: "get_count".to_string(),
            params: vec![SqlParameter {
                sql_name: "p_id".to_string(),
                host_name: "id".to_string(),
                sql_type: "integer".to_string(),
                rust_type: "i32".to_string(),
                is_optional: false,
                has_sql_default_non_null: false,
            }],
            rust_return_type: "Option<i64>".to_string(),
            return_shape: ReturnShape::Scalar,
            returns_setof: false,
            named_return_sql_type: None,
            return_columns: None,
            return_type_name: None,
            needs_column_cast: false,
            doc_comment: "Counts things.".to_string(),
            imports: BTreeSet::new(),
        }
    }

    #[test]
    fn emits_required_param_and_fragment() {
        let f = scalar_fn();
        let mut out = String::new();
        render(&mut out, &f, &HashSet::new());
        assert!(out.contains("pub async fn get_count(conn: &impl Connection, id: i32)"));
        assert!(out.contains("bound.insert(\"id\", bind_value(&id));"));
        assert!(out.contains("fragments.push(\"p_id := %(id)s\".to_string());"));
        assert!(out.contains("conn.fetch_one(&query, &bound).await?;"));
    }

    #[test]
    fn optional_param_guarded_with_if_let() {
        let mut f = scalar_fn();
        f.params[0].is_optional = true;
        f.params[0].rust_type = "Option<i32>".to_string();
        let mut out = String::new();
        render(&mut out, &f, &HashSet::new());
        assert!(out.contains("if let Some(v) = &id {"));
        assert!(out.contains("bound.insert(\"id\", bind_value(v));"));
    }

    #[test]
    fn enum_param_uses_value_method() {
        let mut f = scalar_fn();
        f.params[0].rust_type = "Status".to_string();
        let mut enums = HashSet::new();
        enums.insert("Status".to_string());
        let mut out = String::new();
        render(&mut out, &f, &enums);
        assert!(out.contains("bound.insert(\"id\", serde_json::Value::String(id.value().to_string()));"));
    }

    #[test]
    fn needs_column_cast_appends_as_clause() {
        let mut f = scalar_fn();
        f.return_shape = ReturnShape::AdHocTable;
        f.returns_setof = false;
        f.needs_column_cast = true;
        f.return_type_name = Some("NowInfoResult".to_string());
        f.rust_return_type = "Option<NowInfoResult>".to_string();
        f.return_columns = Some(vec![ReturnColumn {
            name: "current_mood".to_string(),
            sql_type: "TEXT".to_string(),
            rust_type: "Option<String>".to_string(),
            is_optional: true,
        }]);
        let mut out = String::new();
        render(&mut out, &f, &HashSet::new());
        assert!(out.contains("AS (current_mood TEXT)"));
        assert!(out.contains("NowInfoResult::from_row(&row)?"));
    }

    #[test]
    fn void_function_ignores_return_value() {
        let mut f = scalar_fn();
        f.return_shape = ReturnShape::Void;
        f.rust_return_type = "()".to_string();
        f.params.clear();
        let mut out = String::new();
        render(&mut out, &f, &HashSet::new());
        assert!(out.contains("conn.execute(&query, &bound).await?;"));
        assert!(out.contains("Ok(())"));
    }
}
