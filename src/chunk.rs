//! Line-boundary source chunker.
//!
//! Splits a source file's text into [`Chunk`]s of at most `max_lines` lines
//! each, so that a single chunk fits in one analysis request. Splitting
//! happens on line boundaries only; the final chunk may be shorter.
//!
//! Each chunk records the 0-indexed file line at which it starts, so that
//! chunk-local line numbers reported by the analysis backend can be
//! translated back to file-global line numbers.

/// A bounded-size, line-numbered slice of one file's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 0-indexed file line at which this chunk starts.
    pub start_line: usize,
    pub text: String,
}

/// Split text into chunks of at most `max_lines` lines each.
///
/// Pure and deterministic. Empty input yields zero chunks; otherwise a text
/// of L lines yields `ceil(L / max_lines)` chunks whose concatenation (in
/// order, joined with `\n`) reconstructs the input exactly.
pub fn split_lines(text: &str, max_lines: usize) -> Vec<Chunk> {
    if text.is_empty() || max_lines == 0 {
        return Vec::new();
    }

    let lines: Vec<&str> = text.split('\n').collect();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < lines.len() {
        let end = (start + max_lines).min(lines.len());
        chunks.push(Chunk {
            start_line: start,
            text: lines[start..end].join("\n"),
        });
        start = end;
    }

    chunks
}
