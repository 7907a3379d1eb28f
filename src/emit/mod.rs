//! Orchestrates full-file emission (spec §4.6 / §6 "Output (file)"):
//! preamble, runtime-support block, enum declarations, record declarations
//! in dependency order, the composite-string decoder (only if any record
//! needs it), the async wrappers in source order, and the optional row
//! helpers.

mod composite_decode;
mod enums;
mod functions;
mod helpers;
mod preamble;
mod records;

use std::collections::HashSet;

use crate::model::{EnumType, ParsedFunction, RecordSchema};

pub struct EmitInput<'a> {
    pub functions_file: &'a str,
    pub schema_file: Option<&'a str>,
    pub enums: &'a [EnumType],
    pub records: &'a [RecordSchema],
    pub functions: &'a [ParsedFunction],
    pub omit_helpers: bool,
}

pub fn render(input: &EmitInput) -> String {
    let mut out = String::new();

    preamble::render(&mut out, input.functions_file, input.schema_file);
    helpers::render_connection_trait(&mut out);

    let enum_names: HashSet<String> = input.enums.iter().map(|e| e.enum_name.clone()).collect();

    enums::render_all(&mut out, input.enums);
    records::render_all(&mut out, input.records, &enum_names);

    if !input.records.is_empty() {
        composite_decode::render(&mut out);
    }

    functions::render_all(&mut out, input.functions, &enum_names);

    if !input.omit_helpers {
        helpers::render_row_helpers(&mut out);
    }

    out
}
