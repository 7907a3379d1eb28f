//! Emits the runtime-support block common to every generated file: the
//! `Connection` driver contract (spec §6), the `GeneratedClientError` error
//! type (spec §7), and the optional `get_optional`/`get_required` row-count
//! helpers (spec §4.6.6).
//!
//! The `Connection` trait stands in for "an async connection object with a
//! scoped cursor acquisition" contract: rather than
//! modeling a separate cursor type with its own lifetime, the trait exposes
//! `execute`/`fetch_one`/`fetch_all` directly on the connection reference
//! passed into each wrapper, which is the simplification this generator
//! settled on for a trait meant to be implemented once per driver, not
//! specialized per call site (recorded as an Open Question decision in
//! `DESIGN.md`).

use std::fmt::Write as _;

pub fn render_connection_trait(out: &mut String) {
    let _ = write!(
        out,
        r#"
/// A row is an ordered tuple of column values; the generated wrappers never
/// assume a dict/map-shaped row.
pub type Row = Vec<serde_json::Value>;

/// Driver contract assumed by every generated wrapper (spec §6). Implement
/// this trait once against your database client; the generator never
/// implements it itself.
pub trait Connection {{
    fn execute<'a>(
        &'a self,
        query: &'a str,
        params: &'a std::collections::HashMap<&'a str, serde_json::Value>,
    ) -> impl std::future::Future<Output = Result<(), GeneratedClientError>> + Send + 'a;

    fn fetch_one<'a>(
        &'a self,
        query: &'a str,
        params: &'a std::collections::HashMap<&'a str, serde_json::Value>,
    ) -> impl std::future::Future<Output = Result<Option<Row>, GeneratedClientError>> + Send + 'a;

    fn fetch_all<'a>(
        &'a self,
        query: &'a str,
        params: &'a std::collections::HashMap<&'a str, serde_json::Value>,
    ) -> impl std::future::Future<Output = Result<Vec<Row>, GeneratedClientError>> + Send + 'a;
}}

/// Runtime errors raised by generated wrappers (spec §7's "Runtime mapping
/// mismatch").
#[derive(Debug, thiserror::Error)]
pub enum GeneratedClientError {{
    #[error("row shape mismatch decoding {{0}}: the driver must return ordered tuples, not dict/map rows")]
    RowShape(String),
    #[error("database driver error: {{0}}")]
    Driver(String),
}}

/// Serializes a bound parameter value for the named-argument map. Covers
/// every parameter type uniformly, including `json`/`jsonb` parameters whose
/// resolved type is already `serde_json::Value` (serializing a `Value`
/// through `Serialize` is a no-op clone). `chrono`/`uuid`/`rust_decimal`
/// types render through their own `Serialize` impls into the same wire
/// representation the driver expects (RFC 3339 timestamps, hyphenated UUID
/// text, decimal strings).
pub fn bind_value<T: serde::Serialize>(value: &T) -> serde_json::Value {{
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}}
"#
    );
}

pub fn render_row_helpers(out: &mut String) {
    let _ = write!(
        out,
        r#"
/// Collapses a fetched row set into `Some(row)` for 0-or-1 results,
/// erroring if the driver returned more than one row.
pub fn get_optional<T>(rows: Vec<T>, context: &str) -> Result<Option<T>, GeneratedClientError> {{
    let mut rows = rows;
    match rows.len() {{
        0 => Ok(None),
        1 => Ok(rows.pop()),
        _ => Err(GeneratedClientError::RowShape(format!(
            "{{context}}: expected at most one row, got {{}}",
            rows.len()
        ))),
    }}
}}

/// Collapses a fetched row set into exactly one required row, erroring on 0
/// or more than 1.
pub fn get_required<T>(rows: Vec<T>, context: &str) -> Result<T, GeneratedClientError> {{
    let mut rows = rows;
    match rows.len() {{
        1 => Ok(rows.pop().unwrap()),
        n => Err(GeneratedClientError::RowShape(format!(
            "{{context}}: expected exactly one row, got {{n}}"
        ))),
    }}
}}
"#
    );
}
