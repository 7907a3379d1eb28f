//! Type resolver: SQL type text -> [`TypeDescriptor`] (spec §4.3).
//!
//! Resolution order, first match wins: enum reference, table/composite
//! reference, array, precision/qualifier stripping, primitive map, fallback
//! to `serde_json::Value`.

use crate::model::TypeDescriptor;
use crate::symbols::SymbolTable;

/// Resolves `sql_type` against the symbol table, producing the Rust type
/// text and its import set. `is_optional` controls whether the result is
/// `Option`-wrapped; array-ness always composes *inside* optionality (spec
/// §4.3 step 3).
pub fn resolve_type(sql_type: &str, is_optional: bool, symbols: &SymbolTable) -> TypeDescriptor {
    let normalized = sql_type.trim();
    let descriptor = resolve_unwrapped(normalized, symbols);
    if is_optional {
        descriptor.into_optional()
    } else {
        descriptor
    }
}

/// Resolves a type without applying the outer optional wrap, so callers that
/// need to compose it further (e.g. array element resolution) can do so.
fn resolve_unwrapped(sql_type: &str, symbols: &SymbolTable) -> TypeDescriptor {
    // Step 1: enum reference.
    if let Some(enum_name) = symbols.lookup_enum_struct_name(sql_type) {
        return TypeDescriptor::new(enum_name);
    }

    // Step 2: table or composite reference.
    if let Some(struct_name) = symbols.lookup_record_struct_name(sql_type) {
        return TypeDescriptor::new(struct_name);
    }

    // Step 3: array.
    if let Some(element) = sql_type.strip_suffix("[]") {
        return resolve_unwrapped(element.trim(), symbols).into_vec();
    }

    // Step 4: precision/qualifier stripping, then step 5: primitive map.
    if let Some(descriptor) = primitive_lookup(sql_type) {
        return descriptor;
    }
    if let Some(stripped) = strip_precision(sql_type) {
        if let Some(descriptor) = primitive_lookup(&stripped) {
            return descriptor;
        }
        // Re-check enum/record references against the precision-stripped
        // form too (covers schema-qualified domains wrapping a known type).
        if let Some(enum_name) = symbols.lookup_enum_struct_name(&stripped) {
            return TypeDescriptor::new(enum_name);
        }
        if let Some(struct_name) = symbols.lookup_record_struct_name(&stripped) {
            return TypeDescriptor::new(struct_name);
        }
    }
    if let Some(bare) = strip_parens_entirely(sql_type) {
        if let Some(descriptor) = primitive_lookup(&bare) {
            return descriptor;
        }
    }
    if let Some(first_word) = split_on_whitespace_or_paren(sql_type) {
        if let Some(descriptor) = primitive_lookup(&first_word) {
            return descriptor;
        }
    }

    // Step 6: fallback.
    TypeDescriptor::new("serde_json::Value").with_import("serde_json")
}

/// Strips a precision clause like `timestamp(6)` -> `timestamp`, leaving
/// `numeric(10,2)` alone since that precision is meaningful (handled instead
/// by the exact-match/primitive-map entries for `numeric`/`decimal`).
fn strip_precision(sql_type: &str) -> Option<String> {
    let lower = sql_type.to_lowercase();
    if lower.starts_with("numeric") || lower.starts_with("decimal") {
        return None;
    }
    if let Some(paren_idx) = sql_type.find('(') {
        if let Some(close_idx) = sql_type.rfind(')') {
            let mut result = sql_type[..paren_idx].to_string();
            result.push_str(&sql_type[close_idx + 1..]);
            return Some(result.trim().to_string());
        }
    }
    None
}

fn strip_parens_entirely(sql_type: &str) -> Option<String> {
    if !sql_type.contains('(') {
        return None;
    }
    let mut out = String::new();
    let mut depth = 0u32;
    for c in sql_type.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    Some(out.trim().to_string())
}

fn split_on_whitespace_or_paren(sql_type: &str) -> Option<String> {
    let idx = sql_type.find(|c: char| c.is_whitespace() || c == '(')?;
    Some(sql_type[..idx].to_string())
}

/// The fixed primitive map (spec §4.3 step 5). Normalizes the input to
/// lowercase and strips a trailing `[]` double-check so callers can pass
/// either the raw or precision-stripped text.
fn primitive_lookup(sql_type: &str) -> Option<TypeDescriptor> {
    let normalized = sql_type.trim().to_lowercase();
    let descriptor = match normalized.as_str() {
        "uuid" => TypeDescriptor::new("uuid::Uuid").with_import("uuid"),
        "text" | "varchar" | "character varying" | "character" | "char" | "bpchar" => {
            TypeDescriptor::new("String")
        }
        "integer" | "int" | "int4" | "serial" => TypeDescriptor::new("i32"),
        "bigint" | "int8" | "bigserial" => TypeDescriptor::new("i64"),
        "smallint" | "int2" | "smallserial" => TypeDescriptor::new("i16"),
        "boolean" | "bool" => TypeDescriptor::new("bool"),
        "timestamp" | "timestamp without time zone" => {
            TypeDescriptor::new("chrono::NaiveDateTime").with_import("chrono")
        }
        "timestamptz" | "timestamp with time zone" => {
            TypeDescriptor::new("chrono::DateTime<chrono::Utc>").with_import("chrono")
        }
        "date" => TypeDescriptor::new("chrono::NaiveDate").with_import("chrono"),
        "time" | "time without time zone" => {
            TypeDescriptor::new("chrono::NaiveTime").with_import("chrono")
        }
        "interval" => TypeDescriptor::new("chrono::Duration").with_import("chrono"),
        "numeric" | "decimal" => {
            TypeDescriptor::new("rust_decimal::Decimal").with_import("rust_decimal")
        }
        "double precision" | "float8" => TypeDescriptor::new("f64"),
        "real" | "float4" => TypeDescriptor::new("f32"),
        "json" | "jsonb" => TypeDescriptor::new("serde_json::Value").with_import("serde_json"),
        "bytea" => TypeDescriptor::new("Vec<u8>"),
        _ => return None,
    };
    Some(descriptor)
}

/// Re-maps a resolved Rust type back to a SQL type name, used by the
/// emitter to compose a synthetic `AS (col1 TYPE1, ...)` clause for
/// recovered trivial `record` functions (spec §4.6.4 step 3). Falls back to
/// `TEXT` for anything not in the small fixed reverse table.
pub fn rust_type_to_sql(rust_type: &str) -> &'static str {
    match rust_type {
        "uuid::Uuid" => "uuid",
        "String" => "text",
        "i16" => "smallint",
        "i32" => "integer",
        "i64" => "bigint",
        "bool" => "boolean",
        "chrono::NaiveDateTime" => "timestamp",
        "chrono::DateTime<chrono::Utc>" => "timestamptz",
        "chrono::NaiveDate" => "date",
        "chrono::NaiveTime" => "time",
        "chrono::Duration" => "interval",
        "rust_decimal::Decimal" => "numeric",
        "f64" => "double precision",
        "f32" => "real",
        "serde_json::Value" => "jsonb",
        "Vec<u8>" => "bytea",
        _ => "TEXT",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn empty_symbols() -> SymbolTable {
        SymbolTable::new()
    }

    #[rstest]
    #[case::text("text", "String")]
    #[case::varchar("character varying", "String")]
    #[case::integer("integer", "i32")]
    #[case::bigint("bigint", "i64")]
    #[case::smallint("smallint", "i16")]
    #[case::boolean("boolean", "bool")]
    #[case::timestamptz("timestamp with time zone", "chrono::DateTime<chrono::Utc>")]
    #[case::date("date", "chrono::NaiveDate")]
    #[case::interval("interval", "chrono::Duration")]
    #[case::numeric("numeric(10,2)", "rust_decimal::Decimal")]
    #[case::double("double precision", "f64")]
    #[case::jsonb("jsonb", "serde_json::Value")]
    #[case::bytea("bytea", "Vec<u8>")]
    #[case::uuid("uuid", "uuid::Uuid")]
    fn resolves_primitives(#[case] sql_type: &str, #[case] expected: &str) {
        let symbols = empty_symbols();
        assert_eq!(resolve_type(sql_type, false, &symbols).rust_type, expected);
    }

    #[test]
    fn wraps_optional_outside_array() {
        let symbols = empty_symbols();
        let descriptor = resolve_type("integer[]", true, &symbols);
        assert_eq!(descriptor.rust_type, "Option<Vec<i32>>");
    }

    #[test]
    fn strips_precision_clauses() {
        let symbols = empty_symbols();
        assert_eq!(
            resolve_type("timestamp(6)", false, &symbols).rust_type,
            "chrono::NaiveDateTime"
        );
        assert_eq!(
            resolve_type("varchar(255)", false, &symbols).rust_type,
            "String"
        );
    }

    #[test]
    fn keeps_numeric_precision_for_exact_match() {
        let symbols = empty_symbols();
        assert_eq!(
            resolve_type("numeric(10,2)", false, &symbols).rust_type,
            "rust_decimal::Decimal"
        );
    }

    #[test]
    fn falls_back_to_dynamic_value() {
        let symbols = empty_symbols();
        let descriptor = resolve_type("some_unknown_domain", false, &symbols);
        assert_eq!(descriptor.rust_type, "serde_json::Value");
        assert!(descriptor.imports.contains("serde_json"));
    }

    #[test]
    fn reverse_maps_known_types() {
        assert_eq!(rust_type_to_sql("i32"), "integer");
        assert_eq!(rust_type_to_sql("chrono::NaiveDate"), "date");
        assert_eq!(rust_type_to_sql("Vec<Foo>"), "TEXT");
    }
}
