//! Shared tokenizing primitives for column lists and parameter lists
//! (spec §4.2.3): top-level comma splitting, terminating-keyword scanning,
//! and the `numeric(p,s)` comma-reassembly heuristic.

const CONSTRAINT_PREFIXES: &[&str] = &[
    "CONSTRAINT",
    "PRIMARY KEY",
    "FOREIGN KEY",
    "UNIQUE",
    "CHECK",
    "LIKE",
    "INDEX",
    "EXCLUDE",
];

const COLUMN_TERMINATORS: &[&str] = &[
    "PRIMARY", "UNIQUE", "NOT", "NULL", "REFERENCES", "CHECK", "COLLATE", "DEFAULT", "GENERATED",
];

/// A raw, not-yet-type-resolved column or composite field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawColumn {
    pub name: String,
    pub sql_type: String,
    pub is_optional: bool,
}

/// A raw, not-yet-type-resolved function parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawParameter {
    pub name: String,
    pub sql_type: String,
    pub mode: ParamMode,
    pub is_optional: bool,
    pub has_sql_default_non_null: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamMode {
    In,
    Out,
    InOut,
}

/// Splits `text` on commas at parenthesis depth 0, ignoring commas inside
/// single-quoted string literals.
pub fn split_top_level_commas(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            '(' if !in_quotes => {
                depth += 1;
                current.push(c);
            }
            ')' if !in_quotes => {
                depth -= 1;
                current.push(c);
            }
            ',' if !in_quotes && depth == 0 => {
                out.push(current.trim().to_string());
                current = String::new();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        out.push(current.trim().to_string());
    }
    out
}

/// Applies the `numeric(10, 2)`-split-across-comma reassembly heuristic: if
/// a fragment's accumulated type starts with `numeric(`/`decimal(` and has
/// an unbalanced (odd) paren count, it was wrongly split by the top-level
/// comma splitter failing to see the opening paren was already counted
/// against a *previous* fragment boundary — in practice this only arises
/// when callers pass pre-split fragments without `split_top_level_commas`'s
/// own paren tracking. `split_top_level_commas` itself does not over-split
/// on `numeric(10, 2)` since it tracks depth, so this pass is a defensive
/// no-op for well-formed input and only fires on malformed fragments
/// surfaced by callers that re-split externally.
pub fn reassemble_numeric_splits(fragments: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(fragments.len());
    for fragment in fragments {
        if let Some(prev) = out.last_mut() {
            let prev_lower = prev.to_lowercase();
            let starts_numeric = prev_lower.contains("numeric(") || prev_lower.contains("decimal(");
            let unbalanced = prev.matches('(').count() > prev.matches(')').count();
            if starts_numeric && unbalanced {
                prev.push(',');
                prev.push(' ');
                prev.push_str(&fragment);
                continue;
            }
        }
        out.push(fragment);
    }
    out
}

/// True iff `fragment` begins with a table/type-level constraint keyword
/// that should be skipped entirely rather than parsed as a column.
pub fn is_constraint_fragment(fragment: &str) -> bool {
    let upper = fragment.trim().to_uppercase();
    CONSTRAINT_PREFIXES
        .iter()
        .any(|prefix| upper.starts_with(prefix))
}

/// Scans forward from `open_idx` (which must point at `(`) for the matching
/// close paren, tracking nesting depth and ignoring parens inside
/// single-quoted string literals. Shared by the table/type parser and the
/// function parser, both of which must not be fooled by nested parens like
/// `numeric(10, 2)` inside the body they are bracketing.
pub fn find_matching_paren(text: &str, open_idx: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.get(open_idx) != Some(&b'(') {
        return None;
    }
    let mut depth = 0i32;
    let mut in_quotes = false;
    for (idx, c) in text.char_indices().skip_while(|(i, _)| *i < open_idx) {
        match c {
            '\'' => in_quotes = !in_quotes,
            '(' if !in_quotes => depth += 1,
            ')' if !in_quotes => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

fn tokenize_words(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    for c in text.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth -= 1;
                current.push(c);
            }
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn strip_quotes(identifier: &str) -> String {
    identifier
        .trim()
        .trim_matches('"')
        .trim_matches('`')
        .to_string()
}

/// Parses one already-comma-isolated column/composite-field fragment.
/// Returns `None` if the fragment is a constraint and should be skipped.
pub fn parse_column_fragment(fragment: &str) -> Option<RawColumn> {
    let fragment = fragment.trim();
    if fragment.is_empty() || is_constraint_fragment(fragment) {
        return None;
    }
    let words = tokenize_words(fragment);
    let mut iter = words.into_iter();
    let name = strip_quotes(&iter.next()?);

    let mut type_tokens = Vec::new();
    let mut tail_tokens = Vec::new();
    let mut in_tail = false;
    let remaining: Vec<String> = iter.collect();
    let mut idx = 0;
    while idx < remaining.len() {
        let word = &remaining[idx];
        let upper = word.to_uppercase();
        if !in_tail && COLUMN_TERMINATORS.contains(&upper.as_str()) {
            in_tail = true;
        }
        if in_tail {
            tail_tokens.push(word.clone());
        } else {
            type_tokens.push(word.clone());
        }
        idx += 1;
    }

    let sql_type = type_tokens.join(" ");
    let tail_upper = tail_tokens.join(" ").to_uppercase();
    let is_optional = !(tail_upper.contains("NOT NULL") || tail_upper.contains("PRIMARY KEY"));

    Some(RawColumn {
        name,
        sql_type,
        is_optional,
    })
}

/// Parses one already-comma-isolated parameter fragment, including an
/// optional `IN|OUT|INOUT` mode prefix and a `DEFAULT <expr>` tail.
pub fn parse_parameter_fragment(fragment: &str) -> Option<RawParameter> {
    let fragment = fragment.trim();
    if fragment.is_empty() {
        return None;
    }
    let mut words = tokenize_words(fragment).into_iter().peekable();
    let mut mode = ParamMode::In;
    if let Some(first) = words.peek() {
        match first.to_uppercase().as_str() {
            "IN" => {
                mode = ParamMode::In;
                words.next();
            }
            "OUT" => {
                mode = ParamMode::Out;
                words.next();
            }
            "INOUT" => {
                mode = ParamMode::InOut;
                words.next();
            }
            _ => {}
        }
    }
    let name = strip_quotes(&words.next()?);

    let remaining: Vec<String> = words.collect();
    let mut type_tokens = Vec::new();
    let mut idx = 0;
    while idx < remaining.len() {
        let upper = remaining[idx].to_uppercase();
        if upper == "DEFAULT" {
            break;
        }
        type_tokens.push(remaining[idx].clone());
        idx += 1;
    }
    let sql_type = type_tokens.join(" ");

    let (is_optional, has_sql_default_non_null) = if idx < remaining.len() {
        // remaining[idx] == "DEFAULT"; whatever follows is the default expr.
        let default_expr = remaining[idx + 1..].join(" ");
        let is_null = default_expr.trim().eq_ignore_ascii_case("null");
        (true, !is_null)
    } else {
        (false, false)
    };

    Some(RawParameter {
        name,
        sql_type,
        mode,
        is_optional,
        has_sql_default_non_null,
    })
}

/// Parses a full column-list body (inside the outer parens of `CREATE
/// TABLE`/`CREATE TYPE AS (...)`), applying top-level comma splitting and
/// the numeric-split reassembly pass.
pub fn parse_columns(body: &str) -> Vec<RawColumn> {
    let fragments = reassemble_numeric_splits(split_top_level_commas(body));
    fragments
        .iter()
        .filter_map(|f| parse_column_fragment(f))
        .collect()
}

/// Parses a full parameter-list body (inside a function's parens).
pub fn parse_parameters(body: &str) -> Vec<RawParameter> {
    let fragments = reassemble_numeric_splits(split_top_level_commas(body));
    fragments
        .iter()
        .filter_map(|f| parse_parameter_fragment(f))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_top_level_commas_respecting_parens() {
        let fragments = split_top_level_commas("id SERIAL, price numeric(10, 2), name TEXT");
        assert_eq!(fragments.len(), 3);
        assert_eq!(fragments[1], "price numeric(10, 2)");
    }

    #[test]
    fn parses_not_null_column_as_required() {
        let col = parse_column_fragment("name TEXT NOT NULL").unwrap();
        assert_eq!(col.name, "name");
        assert_eq!(col.sql_type, "TEXT");
        assert!(!col.is_optional);
    }

    #[test]
    fn parses_primary_key_column_as_required() {
        let col = parse_column_fragment("id SERIAL PRIMARY KEY").unwrap();
        assert!(!col.is_optional);
    }

    #[test]
    fn parses_plain_column_as_optional() {
        let col = parse_column_fragment("founded DATE").unwrap();
        assert!(col.is_optional);
    }

    #[test]
    fn skips_constraint_fragments() {
        assert_eq!(parse_column_fragment("CONSTRAINT pk_id PRIMARY KEY (id)"), None);
        assert_eq!(parse_column_fragment("PRIMARY KEY (id, name)"), None);
    }

    #[test]
    fn preserves_numeric_precision_type() {
        let col = parse_column_fragment("lat numeric(10, 7)").unwrap();
        assert_eq!(col.sql_type, "numeric(10, 7)");
    }

    #[test]
    fn parses_default_null_parameter() {
        let param = parse_parameter_fragment("p_cat INT DEFAULT NULL").unwrap();
        assert!(param.is_optional);
        assert!(!param.has_sql_default_non_null);
    }

    #[test]
    fn parses_default_value_parameter() {
        let param = parse_parameter_fragment("p_qty INT DEFAULT 10").unwrap();
        assert!(param.is_optional);
        assert!(param.has_sql_default_non_null);
    }

    #[test]
    fn parses_mode_prefixed_parameter() {
        let param = parse_parameter_fragment("OUT p_total INT").unwrap();
        assert_eq!(param.mode, ParamMode::Out);
        assert_eq!(param.name, "p_total");
    }

    #[test]
    fn parses_required_parameter() {
        let param = parse_parameter_fragment("p_name TEXT").unwrap();
        assert!(!param.is_optional);
        assert_eq!(param.sql_type, "TEXT");
    }
}
