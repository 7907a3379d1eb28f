//! Emits the header comment and import preamble that open every generated
//! file (spec §6 "Output (file)"). All resolved types are written
//! fully-qualified (`chrono::NaiveDate`, `uuid::Uuid`, …), so the preamble
//! needs no per-crate `use` beyond `std::collections::HashMap`, which the
//! wrapper signatures and the `Connection` trait both reference unqualified.

use std::fmt::Write as _;

pub fn render(out: &mut String, functions_file: &str, schema_file: Option<&str>) {
    let _ = writeln!(out, "// Generated by pg2rs. Do not edit by hand.");
    let _ = writeln!(out, "// Source: {functions_file}");
    if let Some(schema_file) = schema_file {
        let _ = writeln!(out, "// Schema: {schema_file}");
    }
    let _ = writeln!(out, "#![allow(dead_code, clippy::all)]");
    let _ = writeln!(out);
    let _ = writeln!(out, "use std::collections::HashMap;");
    let _ = writeln!(out);
}
