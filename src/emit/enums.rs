//! Emits one Rust `enum` per SQL `CREATE TYPE ... AS ENUM (...)` (spec
//! §4.6.2).

use std::fmt::Write as _;

use crate::model::EnumType;
use crate::naming;

pub fn render(out: &mut String, enum_type: &EnumType) {
    let _ = writeln!(out, "#[derive(Debug, Clone, Copy, PartialEq, Eq)]");
    let _ = writeln!(out, "pub enum {} {{", enum_type.enum_name);
    for label in &enum_type.labels {
        let _ = writeln!(out, "    {},", naming::enum_variant_name(label));
    }
    let _ = writeln!(out, "}}");
    let _ = writeln!(out);
    let _ = writeln!(out, "impl {} {{", enum_type.enum_name);
    let _ = writeln!(out, "    /// The verbatim SQL label for this variant.");
    let _ = writeln!(out, "    pub fn value(&self) -> &'static str {{");
    let _ = writeln!(out, "        match self {{");
    for label in &enum_type.labels {
        let _ = writeln!(
            out,
            "            {}::{} => \"{}\",",
            enum_type.enum_name,
            naming::enum_variant_name(label),
            label.replace('"', "\\\"")
        );
    }
    let _ = writeln!(out, "        }}");
    let _ = writeln!(out, "    }}");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "    /// Builds a variant from its SQL label, tolerant of the \
         label arriving as an already-decoded string."
    );
    let _ = writeln!(
        out,
        "    pub fn from_label(label: &str) -> Result<Self, GeneratedClientError> {{"
    );
    let _ = writeln!(out, "        match label {{");
    for label in &enum_type.labels {
        let _ = writeln!(
            out,
            "            \"{}\" => Ok({}::{}),",
            label.replace('"', "\\\""),
            enum_type.enum_name,
            naming::enum_variant_name(label)
        );
    }
    let _ = writeln!(
        out,
        "            other => Err(GeneratedClientError::RowShape(format!(\"unknown {} label: {{other}}\"))),",
        enum_type.enum_name
    );
    let _ = writeln!(out, "        }}");
    let _ = writeln!(out, "    }}");
    let _ = writeln!(out, "}}");
    let _ = writeln!(out);
}

pub fn render_all(out: &mut String, enums: &[EnumType]) {
    for enum_type in enums {
        render(out, enum_type);
    }
}
