//! Value types produced by the parser and consumed by the resolver and emitter.
//!
//! Every type here is an immutable value once constructed; the parser builds
//! them, the emitter reads them, and nothing outlives a single generator run.

use std::collections::BTreeSet;

/// A resolved SQL type: the Rust type text plus the set of crate imports it
/// requires. Produced exclusively by [`crate::resolver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub rust_type: String,
    pub imports: BTreeSet<String>,
}

impl TypeDescriptor {
    pub fn new(rust_type: impl Into<String>) -> Self {
        Self {
            rust_type: rust_type.into(),
            imports: BTreeSet::new(),
        }
    }

    pub fn with_import(mut self, import: impl Into<String>) -> Self {
        self.imports.insert(import.into());
        self
    }

    /// Wraps this descriptor as `Option<T>`, a no-op if already optional.
    pub fn into_optional(mut self) -> Self {
        if !self.rust_type.starts_with("Option<") {
            self.rust_type = format!("Option<{}>", self.rust_type);
        }
        self
    }

    /// Wraps this descriptor as `Vec<T>`.
    pub fn into_vec(mut self) -> Self {
        self.rust_type = format!("Vec<{}>", self.rust_type);
        self
    }
}

/// A single SQL function parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlParameter {
    /// The name as written in SQL, e.g. `p_user_id`.
    pub sql_name: String,
    /// Derived Rust identifier: `p_`/`_` prefix stripped, sanitized.
    pub host_name: String,
    /// Original SQL type text, e.g. `numeric(10,2)`.
    pub sql_type: String,
    /// Resolved Rust type text (already `Option`-wrapped if optional).
    pub rust_type: String,
    /// True iff the parameter carries any `DEFAULT` clause.
    pub is_optional: bool,
    /// True iff the default clause's value is not literal `NULL`.
    pub has_sql_default_non_null: bool,
}

/// A single column of a table, composite type, or ad-hoc record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnColumn {
    pub name: String,
    pub sql_type: String,
    pub rust_type: String,
    /// True unless the column is `NOT NULL` or a `PRIMARY KEY`.
    pub is_optional: bool,
}

/// A parsed `CREATE TABLE` or `CREATE TYPE ... AS (...)` shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    /// Struct name to emit, e.g. `Company`.
    pub struct_name: String,
    /// The SQL name this schema was declared under (for diagnostics).
    pub sql_name: String,
    pub columns: Vec<ReturnColumn>,
    pub imports: BTreeSet<String>,
    pub kind: RecordSchemaKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSchemaKind {
    Table,
    Composite,
    /// Synthesized for `RETURNS TABLE(...)` or a recovered trivial record;
    /// every field is forced optional.
    AdHoc,
    /// Emitted when permissive mode papers over a missing schema.
    Placeholder,
}

/// A parsed `CREATE TYPE ... AS ENUM (...)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumType {
    pub enum_name: String,
    pub sql_name: String,
    /// Labels in declaration order, preserved verbatim.
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnShape {
    Void,
    /// A single scalar primitive column.
    Scalar,
    /// `RETURNS record` with no recoverable columns: an opaque tuple.
    OpaqueRecord,
    /// `RETURNS TABLE(...)` or a recovered trivial `record`.
    AdHocTable,
    /// `RETURNS <named table/composite>`.
    NamedRecord,
    /// `RETURNS <enum type>`.
    Enum,
}

/// A parsed `CREATE [OR REPLACE] FUNCTION`.
#[derive(Debug, Clone)]
pub struct ParsedFunction {
    /// SQL name, possibly schema-qualified.
    pub sql_name: String,
    /// Sanitized Rust identifier.
    pub host_name: String,
    pub params: Vec<SqlParameter>,
    pub rust_return_type: String,
    pub return_shape: ReturnShape,
    pub returns_setof: bool,
    /// Present when `return_shape` is `NamedRecord`: the original SQL type
    /// name, used to look the struct back up in the symbol table.
    pub named_return_sql_type: Option<String>,
    /// Present when `return_shape` is `AdHocTable` or `OpaqueRecord` with
    /// recovered columns: the ordered column list.
    pub return_columns: Option<Vec<ReturnColumn>>,
    /// The record/enum name used in the generated signature, when
    /// applicable (`NamedRecord`/`AdHocTable`/`Enum`).
    pub return_type_name: Option<String>,
    /// True iff this is a recovered trivial `RETURNS record` function: the
    /// composed query must append `AS (col1 TYPE1, col2 TYPE2, ...)` so
    /// PostgreSQL knows the column types of an otherwise opaque `record`
    /// (spec §4.6.4 step 3). False for a literal `RETURNS TABLE(...)`,
    /// which already carries its own column types.
    pub needs_column_cast: bool,
    pub doc_comment: String,
    pub imports: BTreeSet<String>,
}

impl ParsedFunction {
    pub fn required_params(&self) -> impl Iterator<Item = &SqlParameter> {
        self.params.iter().filter(|p| !p.is_optional)
    }

    pub fn optional_params(&self) -> impl Iterator<Item = &SqlParameter> {
        self.params.iter().filter(|p| p.is_optional)
    }

    /// Parameters in the order they must appear in the generated signature:
    /// required first, then optional, each group in original declaration
    /// order (see spec invariant on parameter ordering).
    pub fn ordered_params(&self) -> Vec<&SqlParameter> {
        self.required_params().chain(self.optional_params()).collect()
    }
}
