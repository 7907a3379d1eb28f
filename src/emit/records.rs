//! Emits one Rust struct per table/composite/ad-hoc record (spec §4.6.3)
//! plus its row-reconstruction methods (spec §4.6.5).

use std::collections::HashSet;
use std::fmt::Write as _;

use crate::model::{RecordSchema, RecordSchemaKind, ReturnColumn};

enum FieldKind {
    Enum,
    Record,
    Plain,
}

fn inner_type_name(rust_type: &str) -> &str {
    rust_type
        .trim_start_matches("Option<")
        .trim_start_matches("Vec<")
        .trim_start_matches("Box<")
        .trim_end_matches('>')
}

/// Strips only an outer `Option<...>` wrapper, leaving `Vec<...>` intact —
/// unlike [`inner_type_name`], which also strips `Vec`/`Box` to recover a
/// bare struct name for classification. Used to pick the concrete type
/// `coerce_composite_field` parses into.
fn composite_target_type(rust_type: &str) -> &str {
    rust_type
        .strip_prefix("Option<")
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(rust_type)
}

fn classify(rust_type: &str, enum_names: &HashSet<String>, record_names: &HashSet<String>) -> FieldKind {
    let inner = inner_type_name(rust_type);
    if enum_names.contains(inner) {
        FieldKind::Enum
    } else if record_names.contains(inner) {
        FieldKind::Record
    } else {
        FieldKind::Plain
    }
}

/// A direct `Option<Self>` field is boxed so the struct has a known size
/// (spec §4.6.3's narrow cycle-breaking rule: only the self-referential
/// case is boxed, not every cycle member — deeper mutual cycles rely on the
/// dependency sorter's tolerated-cycle warning instead).
fn field_decl_type(column: &ReturnColumn, struct_name: &str) -> String {
    let self_option = format!("Option<{struct_name}>");
    if column.rust_type == self_option {
        format!("Option<Box<{struct_name}>>")
    } else {
        column.rust_type.clone()
    }
}

pub fn render(out: &mut String, schema: &RecordSchema, enum_names: &HashSet<String>, record_names: &HashSet<String>) {
    if schema.kind == RecordSchemaKind::Placeholder {
        let _ = writeln!(out, "/// TODO: schema for `{}` was not found; this is a permissive-mode placeholder.", schema.sql_name);
        let _ = writeln!(out, "#[derive(Debug, Clone)]");
        let _ = writeln!(out, "pub struct {} {{", schema.struct_name);
        let _ = writeln!(out, "    pub value: serde_json::Value,");
        let _ = writeln!(out, "}}");
        let _ = writeln!(out);
        return;
    }

    let _ = writeln!(out, "#[derive(Debug, Clone)]");
    let _ = writeln!(out, "pub struct {} {{", schema.struct_name);
    for column in &schema.columns {
        let _ = writeln!(
            out,
            "    pub {}: {},",
            column.name,
            field_decl_type(column, &schema.struct_name)
        );
    }
    let _ = writeln!(out, "}}");
    let _ = writeln!(out);

    render_from_row(out, schema, enum_names, record_names);
    render_from_composite_string(out, schema, enum_names, record_names);
}

fn render_from_row(out: &mut String, schema: &RecordSchema, enum_names: &HashSet<String>, record_names: &HashSet<String>) {
    let _ = writeln!(out, "impl {} {{", schema.struct_name);
    let _ = writeln!(
        out,
        "    /// Builds this record from an ordered row tuple (spec's positional \
         reconstruction path)."
    );
    let _ = writeln!(
        out,
        "    pub fn from_row(row: &[serde_json::Value]) -> Result<Self, GeneratedClientError> {{"
    );
    let _ = writeln!(
        out,
        "        if row.len() < {} {{",
        schema.columns.len()
    );
    let _ = writeln!(
        out,
        "            return Err(GeneratedClientError::RowShape(format!(\"{}: expected {} columns, got {{}}\", row.len())));",
        schema.struct_name,
        schema.columns.len()
    );
    let _ = writeln!(out, "        }}");

    for (i, column) in schema.columns.iter().enumerate() {
        let is_boxed = field_decl_type(column, &schema.struct_name) != column.rust_type;
        match classify(&column.rust_type, enum_names, record_names) {
            FieldKind::Enum => {
                let enum_name = inner_type_name(&column.rust_type);
                let _ = writeln!(out, "        let {} = match row[{}].clone() {{", column.name, i);
                let _ = writeln!(out, "            serde_json::Value::Null => None,");
                let _ = writeln!(
                    out,
                    "            serde_json::Value::String(s) => Some({}::from_label(&s)?),",
                    enum_name
                );
                let _ = writeln!(
                    out,
                    "            other => return Err(GeneratedClientError::RowShape(format!(\"{}.{}: expected string label, got {{other:?}}\"))),",
                    schema.struct_name, column.name
                );
                let _ = writeln!(out, "        }};");
                if !column.is_optional {
                    let _ = writeln!(
                        out,
                        "        let {name} = {name}.ok_or_else(|| GeneratedClientError::RowShape(\"{struct}.{name}: required enum value was null\".to_string()))?;",
                        name = column.name,
                        struct = schema.struct_name
                    );
                }
            }
            FieldKind::Record => {
                let record_name = inner_type_name(&column.rust_type);
                let _ = writeln!(out, "        let {} = match row[{}].clone() {{", column.name, i);
                let _ = writeln!(out, "            serde_json::Value::Null => None,");
                let _ = writeln!(
                    out,
                    "            serde_json::Value::String(s) => {}::from_composite_string(&s)?,",
                    record_name
                );
                let _ = writeln!(
                    out,
                    "            serde_json::Value::Array(items) => Some({}::from_row(&items)?),",
                    record_name
                );
                let _ = writeln!(
                    out,
                    "            other => return Err(GeneratedClientError::RowShape(format!(\"{}.{}: expected string or array, got {{other:?}}\"))),",
                    schema.struct_name, column.name
                );
                let _ = writeln!(out, "        }};");
                if is_boxed {
                    let _ = writeln!(out, "        let {name} = {name}.map(Box::new);", name = column.name);
                }
                if !column.is_optional {
                    let _ = writeln!(
                        out,
                        "        let {name} = {name}.ok_or_else(|| GeneratedClientError::RowShape(\"{struct}.{name}: required record value was null\".to_string()))?;",
                        name = column.name,
                        struct = schema.struct_name
                    );
                }
            }
            FieldKind::Plain => {
                let _ = writeln!(
                    out,
                    "        let {name} = serde_json::from_value(row[{i}].clone()).map_err(|_| GeneratedClientError::RowShape(\"{struct}.{name}\".to_string()))?;",
                    name = column.name,
                    i = i,
                    struct = schema.struct_name
                );
            }
        }
    }

    let _ = writeln!(out, "        Ok({} {{", schema.struct_name);
    for column in &schema.columns {
        let _ = writeln!(out, "            {},", column.name);
    }
    let _ = writeln!(out, "        }})");
    let _ = writeln!(out, "    }}");
    let _ = writeln!(out);
    let _ = writeln!(out, "}}");
    let _ = writeln!(out);
}

fn render_from_composite_string(
    out: &mut String,
    schema: &RecordSchema,
    enum_names: &HashSet<String>,
    record_names: &HashSet<String>,
) {
    let _ = writeln!(out, "impl {} {{", schema.struct_name);
    let _ = writeln!(
        out,
        "    /// Builds this record from PostgreSQL's textual composite form \
         (spec's nested-composite reconstruction path). Returns `Ok(None)` \
         when every field position is `NULL` (the empty-composite case)."
    );
    let _ = writeln!(
        out,
        "    pub fn from_composite_string(input: &str) -> Result<Option<Self>, GeneratedClientError> {{"
    );
    let _ = writeln!(out, "        let fields = split_composite_fields(input);");
    let _ = writeln!(out, "        if fields.iter().all(|f| f.is_none()) {{");
    let _ = writeln!(out, "            return Ok(None);");
    let _ = writeln!(out, "        }}");

    for (i, column) in schema.columns.iter().enumerate() {
        let is_boxed = field_decl_type(column, &schema.struct_name) != column.rust_type;
        let slot = format!("fields.get({i}).cloned().flatten()");
        match classify(&column.rust_type, enum_names, record_names) {
            FieldKind::Enum => {
                let enum_name = inner_type_name(&column.rust_type);
                let _ = writeln!(
                    out,
                    "        let {name} = match {slot} {{",
                    name = column.name,
                    slot = slot
                );
                let _ = writeln!(out, "            None => None,");
                let _ = writeln!(out, "            Some(s) => Some({}::from_label(&s)?),", enum_name);
                let _ = writeln!(out, "        }};");
                if !column.is_optional {
                    let _ = writeln!(
                        out,
                        "        let {name} = {name}.ok_or_else(|| GeneratedClientError::RowShape(\"{struct}.{name}: required enum value was null\".to_string()))?;",
                        name = column.name,
                        struct = schema.struct_name
                    );
                }
            }
            FieldKind::Record => {
                let record_name = inner_type_name(&column.rust_type);
                let _ = writeln!(
                    out,
                    "        let {name} = match {slot} {{",
                    name = column.name,
                    slot = slot
                );
                let _ = writeln!(out, "            None => None,");
                let _ = writeln!(
                    out,
                    "            Some(s) => {}::from_composite_string(&s)?,",
                    record_name
                );
                let _ = writeln!(out, "        }};");
                if is_boxed {
                    let _ = writeln!(out, "        let {name} = {name}.map(Box::new);", name = column.name);
                }
                if !column.is_optional {
                    let _ = writeln!(
                        out,
                        "        let {name} = {name}.ok_or_else(|| GeneratedClientError::RowShape(\"{struct}.{name}: required record value was null\".to_string()))?;",
                        name = column.name,
                        struct = schema.struct_name
                    );
                }
            }
            FieldKind::Plain => {
                let target = composite_target_type(&column.rust_type);
                let coerce_fn = if target == "bool" {
                    "coerce_composite_bool".to_string()
                } else {
                    format!("coerce_composite_field::<{target}>")
                };
                let _ = writeln!(
                    out,
                    "        let {name} = {slot}.and_then(|raw| {coerce}(&raw));",
                    name = column.name,
                    slot = slot,
                    coerce = coerce_fn
                );
                if !column.is_optional {
                    let _ = writeln!(
                        out,
                        "        let {name} = {name}.ok_or_else(|| GeneratedClientError::RowShape(\"{struct}.{name}\".to_string()))?;",
                        name = column.name,
                        struct = schema.struct_name
                    );
                }
            }
        }
    }

    let _ = writeln!(out, "        Ok(Some({} {{", schema.struct_name);
    for column in &schema.columns {
        let _ = writeln!(out, "            {},", column.name);
    }
    let _ = writeln!(out, "        }}))");
    let _ = writeln!(out, "    }}");
    let _ = writeln!(out, "}}");
    let _ = writeln!(out);
}

pub fn render_all(out: &mut String, records: &[RecordSchema], enum_names: &HashSet<String>) {
    let record_names: HashSet<String> = records.iter().map(|r| r.struct_name.clone()).collect();
    for record in records {
        render(out, record, enum_names, &record_names);
    }
}
