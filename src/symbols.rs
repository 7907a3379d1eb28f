//! The symbol table: tables, composites, and enums known so far, keyed by
//! both their unqualified and schema-qualified names (spec §3).
//!
//! Populated during Stage 2, read-only during Stage 3 (spec §3
//! Lifecycles). One instance is built per generator invocation and dropped
//! at the end — never a global/static table (spec §9).

use std::collections::HashMap;

use crate::model::{EnumType, RecordSchema};

#[derive(Debug, Default)]
pub struct SymbolTable {
    /// Canonical key (lowercased, unqualified name) -> schema.
    records: HashMap<String, RecordSchema>,
    /// Insertion order of canonical record keys, for closure/dependency
    /// iteration that must not depend on hash order.
    record_order: Vec<String>,
    /// Lowercased schema-qualified name -> canonical key, only populated
    /// when the qualified name differs from the unqualified one.
    record_aliases: HashMap<String, String>,

    enums: HashMap<String, EnumType>,
    enum_order: Vec<String>,
    enum_aliases: HashMap<String, String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites a table/composite schema. Returns the previous
    /// schema under the same canonical key, if any, so callers can detect
    /// and log an override (spec §9 schema-precedence resolution).
    pub fn insert_record(&mut self, schema: RecordSchema) -> Option<RecordSchema> {
        let canonical = crate::naming::unqualified(&schema.sql_name).to_lowercase();
        if !self.records.contains_key(&canonical) {
            self.record_order.push(canonical.clone());
        }
        let qualified_key = schema.sql_name.to_lowercase();
        if qualified_key != canonical {
            self.record_aliases.insert(qualified_key, canonical.clone());
        }
        self.records.insert(canonical, schema)
    }

    pub fn insert_enum(&mut self, enum_type: EnumType) -> Option<EnumType> {
        let canonical = crate::naming::unqualified(&enum_type.sql_name).to_lowercase();
        if !self.enums.contains_key(&canonical) {
            self.enum_order.push(canonical.clone());
        }
        let qualified_key = enum_type.sql_name.to_lowercase();
        if qualified_key != canonical {
            self.enum_aliases.insert(qualified_key, canonical.clone());
        }
        self.enums.insert(canonical, enum_type)
    }

    fn resolve_record_key(&self, sql_type: &str) -> Option<&str> {
        let key = sql_type.trim().to_lowercase();
        if self.records.contains_key(&key) {
            return self.records.get_key_value(&key).map(|(k, _)| k.as_str());
        }
        self.record_aliases.get(&key).map(|s| s.as_str())
    }

    fn resolve_enum_key(&self, sql_type: &str) -> Option<&str> {
        let key = sql_type.trim().to_lowercase();
        if self.enums.contains_key(&key) {
            return self.enums.get_key_value(&key).map(|(k, _)| k.as_str());
        }
        self.enum_aliases.get(&key).map(|s| s.as_str())
    }

    pub fn get_record(&self, sql_type: &str) -> Option<&RecordSchema> {
        let key = self.resolve_record_key(sql_type)?;
        self.records.get(key)
    }

    pub fn get_enum(&self, sql_type: &str) -> Option<&EnumType> {
        let key = self.resolve_enum_key(sql_type)?;
        self.enums.get(key)
    }

    pub fn lookup_record_struct_name(&self, sql_type: &str) -> Option<String> {
        self.get_record(sql_type).map(|r| r.struct_name.clone())
    }

    pub fn lookup_enum_struct_name(&self, sql_type: &str) -> Option<String> {
        self.get_enum(sql_type).map(|e| e.enum_name.clone())
    }

    /// All known table/composite schemas, in first-insertion order.
    pub fn records_in_order(&self) -> Vec<&RecordSchema> {
        self.record_order
            .iter()
            .filter_map(|key| self.records.get(key))
            .collect()
    }

    /// All known enums, in first-insertion order.
    pub fn enums_in_order(&self) -> Vec<&EnumType> {
        self.enum_order
            .iter()
            .filter_map(|key| self.enums.get(key))
            .collect()
    }
}
