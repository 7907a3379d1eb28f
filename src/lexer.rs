//! Stage 1: comment stripping and preceding-comment extraction (spec §4.1).
//!
//! Comments inside dollar-quoted function bodies are irrelevant here (bodies
//! are not parsed except by the trivial-record recovery pass in
//! `src/parser/functions.rs`), so this lexer's comment detection is purely
//! literal — it does not track string or dollar-quote state.

/// A comment-stripped view of the source paired with the original,
/// line-indexed text so the parser can both match structurally against
/// stripped text and recover a function's preceding documentation comment
/// from the original.
pub struct LexedSource<'a> {
    pub original: &'a str,
    pub stripped: String,
    /// Byte offset of the start of each line in `original`.
    line_starts: Vec<usize>,
}

impl<'a> LexedSource<'a> {
    pub fn new(original: &'a str) -> Self {
        let stripped = strip_comments(original);
        let mut line_starts = vec![0];
        for (idx, byte) in original.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(idx + 1);
            }
        }
        Self {
            original,
            stripped,
            line_starts,
        }
    }

    /// Zero-based line index containing byte offset `pos`.
    pub fn line_at(&self, pos: usize) -> usize {
        match self.line_starts.binary_search(&pos) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        }
    }

    pub fn line_text(&self, line_idx: usize) -> &'a str {
        let start = match self.line_starts.get(line_idx) {
            Some(&s) => s,
            None => return "",
        };
        let end = self
            .line_starts
            .get(line_idx + 1)
            .copied()
            .unwrap_or(self.original.len());
        self.original[start..end].trim_end_matches(['\n', '\r'])
    }

    /// Extracts and cleans the documentation comment immediately preceding
    /// the line at `first_line_idx` (spec §4.1 preceding-comment algorithm).
    /// Returns `None` if no comment block is directly adjacent.
    pub fn preceding_comment(&self, first_line_idx: usize) -> Option<String> {
        if first_line_idx == 0 {
            return None;
        }
        let mut collected: Vec<String> = Vec::new();
        let mut idx = first_line_idx;
        loop {
            if idx == 0 {
                break;
            }
            idx -= 1;
            let line = self.line_text(idx).trim_end();
            let trimmed_start = line.trim_start();
            if trimmed_start.is_empty() {
                // A blank line kills the association unless we have not yet
                // collected anything directly below the function (in which
                // case there simply is no comment).
                break;
            }
            if let Some(stripped) = trimmed_start.strip_prefix("--") {
                collected.push(stripped.trim_start_matches(' ').to_string());
                continue;
            }
            if trimmed_start.ends_with("*/") {
                // Walk upward collecting the whole block-comment span.
                let mut block_lines = vec![line.to_string()];
                let mut block_idx = idx;
                let mut found_start = trimmed_start.starts_with("/*");
                while !found_start && block_idx > 0 {
                    block_idx -= 1;
                    let block_line = self.line_text(block_idx);
                    block_lines.push(block_line.to_string());
                    if block_line.trim_start().starts_with("/*") {
                        found_start = true;
                    }
                }
                if !found_start {
                    break;
                }
                block_lines.reverse();
                collected = block_lines
                    .iter()
                    .map(|l| clean_block_comment_line(l))
                    .collect();
                idx = block_idx;
                continue;
            }
            break;
        }
        if collected.is_empty() {
            return None;
        }
        collected.reverse();
        Some(dedent_and_trim(&collected))
    }
}

/// Strips `-- ...` and `/* ... */` comments, replacing every character of
/// a comment with a space (newlines excepted, which are kept verbatim).
/// This keeps `stripped` the same length and line layout as `original`, so
/// a byte offset found by matching against `stripped` is valid to look up
/// directly in `original` via [`LexedSource::line_at`].
pub fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.char_indices().peekable();
    let bytes = source.as_bytes();
    while let Some((i, c)) = chars.next() {
        if c == '-' && bytes.get(i + 1) == Some(&b'-') {
            while let Some((_, next)) = chars.peek() {
                if *next == '\n' {
                    break;
                }
                out.push(' ');
                chars.next();
            }
            continue;
        }
        if c == '/' && bytes.get(i + 1) == Some(&b'*') {
            out.push(' ');
            chars.next(); // consume '*'
            out.push(' ');
            while let Some((_, next)) = chars.next() {
                out.push(if next == '\n' { '\n' } else { ' ' });
                if next == '*' {
                    if let Some((_, following)) = chars.peek() {
                        if *following == '/' {
                            chars.next();
                            out.push(' ');
                            break;
                        }
                    }
                }
            }
            continue;
        }
        out.push(c);
    }
    out
}

fn clean_block_comment_line(line: &str) -> String {
    let trimmed = line.trim();
    let trimmed = trimmed.strip_prefix("/*").unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix("*/").unwrap_or(trimmed);
    let trimmed = trimmed.strip_prefix('*').unwrap_or(trimmed);
    trimmed.strip_prefix(' ').unwrap_or(trimmed).to_string()
}

fn dedent_and_trim(lines: &[String]) -> String {
    let min_indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    let dedented: Vec<&str> = lines
        .iter()
        .map(|l| {
            if l.len() >= min_indent {
                &l[min_indent..]
            } else {
                l.trim_start()
            }
        })
        .collect();
    dedented.join("\n").trim().to_string()
}
