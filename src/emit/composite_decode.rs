//! Emits the composite-string decoder runtime support (spec §4.6.5a), a
//! fixed block of generated code written once per output file regardless of
//! how many records need it.
//!
//! Grounded on `composite_unpacker.py`'s one-pass scanner: the emitted Rust
//! function walks the PostgreSQL textual composite form `(a,"b, with
//! comma",(1,2),t)` tracking paren depth, quote state, and escape-next, and
//! returns each field as `Option<String>` (`None` for unquoted `NULL` or an
//! empty fragment).

use std::fmt::Write as _;

pub fn render(out: &mut String) {
    let _ = write!(
        out,
        r#"
/// Splits a PostgreSQL textual composite literal such as
/// `(a,"b, with comma",(1,2),t)` into its ordered field fragments.
/// Unquoted `NULL` (case-insensitive) and empty fragments decode to `None`.
/// A field's own parentheses and quoting are preserved for recursive
/// decoding into a nested composite.
pub fn split_composite_fields(input: &str) -> Vec<Option<String>> {{
    let trimmed = input.trim();
    let body = trimmed
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(trimmed);

    let mut fields = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut in_quotes = false;
    let mut quoted = false;
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {{
        match c {{
            '"' if in_quotes => {{
                if chars.peek() == Some(&'"') {{
                    current.push('"');
                    chars.next();
                }} else {{
                    in_quotes = false;
                }}
            }}
            '"' => {{
                in_quotes = true;
                quoted = true;
            }}
            '\\' if in_quotes => {{
                if let Some(next) = chars.next() {{
                    current.push(next);
                }}
            }}
            '(' if !in_quotes => {{
                depth += 1;
                current.push(c);
            }}
            ')' if !in_quotes => {{
                depth -= 1;
                current.push(c);
            }}
            ',' if !in_quotes && depth == 0 => {{
                fields.push(finish_field(std::mem::take(&mut current), quoted));
                quoted = false;
            }}
            _ => current.push(c),
        }}
    }}
    fields.push(finish_field(current, quoted));
    fields
}}

fn finish_field(raw: String, quoted: bool) -> Option<String> {{
    if quoted {{
        return Some(raw);
    }}
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {{
        None
    }} else {{
        Some(trimmed.to_string())
    }}
}}

/// PostgreSQL's textual boolean is `t`/`f`, not Rust's `true`/`false`.
fn coerce_composite_bool(s: &str) -> Option<bool> {{
    match s {{
        "t" | "true" => Some(true),
        "f" | "false" => Some(false),
        _ => None,
    }}
}}

/// Per-field coercer (spec §4.6.5b) for any plain scalar that implements
/// `FromStr`, covering the primitive map's integer, float, UUID, decimal,
/// chrono, and JSON targets uniformly.
fn coerce_composite_field<T: std::str::FromStr>(s: &str) -> Option<T> {{
    s.parse().ok()
}}
"#
    );
}
