//! Identifier derivation: Pascal-casing, singularization, sanitization.
//!
//! Grounded on spec §4.4 and the Design Notes' instruction to factor
//! pluralization behind a small interface rather than hard-coding it at
//! every call site.

/// English-only singular/plural heuristic, overridable behind a trait so a
/// caller embedding this crate can swap in a real inflection library without
/// touching the naming call sites.
pub trait Pluralizer {
    fn singularize(&self, word: &str) -> String;
}

/// The default heuristic: a hard-coded irregular map plus common suffix
/// rules, per spec §9.
pub struct DefaultPluralizer;

const IRREGULARS: &[(&str, &str)] = &[
    ("people", "person"),
    ("children", "child"),
    ("men", "man"),
    ("women", "woman"),
    ("teeth", "tooth"),
    ("feet", "foot"),
    ("mice", "mouse"),
    ("geese", "goose"),
    ("data", "datum"),
    ("indices", "index"),
    ("matrices", "matrix"),
];

impl Pluralizer for DefaultPluralizer {
    fn singularize(&self, word: &str) -> String {
        let lower = word.to_lowercase();
        for (plural, singular) in IRREGULARS {
            if lower == *plural {
                return (*singular).to_string();
            }
        }
        if let Some(stem) = lower.strip_suffix("ies") {
            return format!("{stem}y");
        }
        if lower.ends_with("ses")
            || lower.ends_with("xes")
            || lower.ends_with("zes")
            || lower.ends_with("ches")
            || lower.ends_with("shes")
        {
            return lower[..lower.len() - 2].to_string();
        }
        if let Some(stem) = lower.strip_suffix('s') {
            if !stem.ends_with('s') {
                return stem.to_string();
            }
        }
        lower
    }
}

/// Converts `snake_case` (or any underscore-separated word list) to
/// `PascalCase`.
pub fn to_pascal_case(word: &str) -> String {
    word.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Strips a schema qualifier (`public.companies` -> `companies`), returning
/// the final dot segment.
pub fn unqualified(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// Record struct name derived from a SQL table/composite name (spec §4.4):
/// take the final dot segment, singularize, Pascal-case; prefix `T_` if the
/// result starts with a non-letter; default to `ResultRow` if empty.
pub fn record_struct_name(sql_name: &str, pluralizer: &dyn Pluralizer) -> String {
    let base = unqualified(sql_name);
    let singular = pluralizer.singularize(base);
    let pascal = to_pascal_case(&singular);
    if pascal.is_empty() {
        return "ResultRow".to_string();
    }
    if !pascal.chars().next().is_some_and(|c| c.is_alphabetic()) {
        format!("T_{pascal}")
    } else {
        pascal
    }
}

/// Enum struct name derived from a SQL enum type name (spec §4.4): split on
/// underscores, capitalize each, concatenate. Schema qualifiers are dropped
/// first, matching record naming.
pub fn enum_struct_name(sql_name: &str) -> String {
    to_pascal_case(unqualified(sql_name))
}

/// Ad-hoc record name for `RETURNS TABLE(...)` with no corresponding named
/// type: the function's host name, Pascal-cased, plus `Result`.
pub fn adhoc_record_name(function_host_name: &str) -> String {
    format!("{}Result", to_pascal_case(function_host_name))
}

/// Function host name: last dot segment, non-alphanumeric replaced with
/// underscore, underscore-prefixed if it starts with a digit.
pub fn function_host_name(sql_name: &str) -> String {
    sanitize_identifier(unqualified(sql_name))
}

/// Replaces every non-alphanumeric, non-underscore character with an
/// underscore, and prefixes an underscore if the first character is a
/// digit. Used for both function host names and parameter host names.
pub fn sanitize_identifier(raw: &str) -> String {
    let mut out: String = raw
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.is_empty() {
        out = "_".to_string();
    }
    if out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Parameter host identifier: strip a leading `p_` (if the remainder would
/// still be non-empty) or a leading `_` (if len > 1), then sanitize.
pub fn parameter_host_name(sql_name: &str) -> String {
    let stripped = if let Some(rest) = sql_name.strip_prefix("p_") {
        if !rest.is_empty() {
            rest
        } else {
            sql_name
        }
    } else if sql_name.len() > 1 {
        sql_name.strip_prefix('_').unwrap_or(sql_name)
    } else {
        sql_name
    };
    sanitize_identifier(stripped)
}

/// Sanitizes an enum label into a Rust variant identifier, e.g. `pending`
/// -> `Pending`, `in-progress` -> `InProgress`. PascalCase rather than
/// SCREAMING_CASE: idiomatic Rust enum variant casing, with the label's
/// own verbatim text still recoverable byte-for-byte through `value()`/
/// `from_label` regardless of how the variant identifier is cased.
pub fn enum_variant_name(label: &str) -> String {
    let pascal = to_pascal_case(label);
    if pascal.is_empty() {
        "Unknown".to_string()
    } else if pascal.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        format!("V{pascal}")
    } else {
        pascal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singularizes_common_table_names() {
        let p = DefaultPluralizer;
        assert_eq!(p.singularize("users"), "user");
        assert_eq!(p.singularize("companies"), "company");
        assert_eq!(p.singularize("order_items"), "order_item");
        assert_eq!(p.singularize("boxes"), "box");
        assert_eq!(p.singularize("people"), "person");
    }

    #[test]
    fn record_struct_name_handles_schema_qualification() {
        let p = DefaultPluralizer;
        assert_eq!(record_struct_name("public.companies", &p), "Company");
        assert_eq!(record_struct_name("order_items", &p), "OrderItem");
    }

    #[test]
    fn record_struct_name_falls_back_when_empty() {
        let p = DefaultPluralizer;
        assert_eq!(record_struct_name("", &p), "ResultRow");
    }

    #[test]
    fn enum_struct_name_concatenates_segments() {
        assert_eq!(enum_struct_name("status_type"), "StatusType");
        assert_eq!(enum_struct_name("public.member_role"), "MemberRole");
    }

    #[test]
    fn function_host_name_sanitizes() {
        assert_eq!(function_host_name("public.list_companies"), "list_companies");
        assert_eq!(function_host_name("my-func"), "my_func");
    }

    #[test]
    fn parameter_host_name_strips_prefix() {
        assert_eq!(parameter_host_name("p_user_id"), "user_id");
        assert_eq!(parameter_host_name("_internal"), "internal");
        assert_eq!(parameter_host_name("p_"), "p_");
        assert_eq!(parameter_host_name("_"), "_");
    }

    #[test]
    fn enum_variant_name_handles_digits() {
        assert_eq!(enum_variant_name("pending"), "Pending");
        assert_eq!(enum_variant_name("2fa"), "V2fa");
    }
}
