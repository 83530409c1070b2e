#[cfg(test)]
mod tests;

use std::sync::LazyLock;

use fancy_regex::Regex;
use tracing::debug;

static DELIMITER_ROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\|?[\s:|-]*-[\s:|-]*\|?\s*$").expect("delimiter row pattern is valid")
});

/// One run of content within a header span, in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSegment {
    Prose(String),
    Table(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Prose,
    /// Saw a pipe-delimited row that may be a table header
    TableHeader,
    /// Confirmed table: header row plus delimiter row seen
    TableBody,
}

fn is_pipe_row(line: &str) -> bool {
    line.trim_start().starts_with('|')
}

fn is_delimiter_row(line: &str) -> bool {
    DELIMITER_ROW_RE
        .is_match(line.trim())
        .unwrap_or(false)
}

/// Segment content into interleaved prose and table runs.
///
/// A table starts at a pipe-delimited row immediately followed by a
/// `|---|`-style delimiter row, and ends at the first blank or non-pipe
/// line. Pipe rows without a delimiter row are treated as prose.
#[inline]
pub fn segment_content(content: &str) -> Vec<ContentSegment> {
    let mut segments = Vec::new();
    let mut prose_lines: Vec<&str> = Vec::new();
    let mut table_lines: Vec<&str> = Vec::new();
    let mut state = State::Prose;

    let mut flush_prose = |prose_lines: &mut Vec<&str>, segments: &mut Vec<ContentSegment>| {
        let text = prose_lines.join("\n");
        if !text.trim().is_empty() {
            segments.push(ContentSegment::Prose(text.trim().to_string()));
        }
        prose_lines.clear();
    };

    for line in content.lines() {
        match state {
            State::Prose => {
                if is_pipe_row(line) {
                    table_lines.push(line);
                    state = State::TableHeader;
                } else {
                    prose_lines.push(line);
                }
            }
            State::TableHeader => {
                if is_delimiter_row(line) {
                    flush_prose(&mut prose_lines, &mut segments);
                    table_lines.push(line);
                    state = State::TableBody;
                } else {
                    // Not a table after all; the held row was prose
                    prose_lines.append(&mut table_lines);
                    if is_pipe_row(line) {
                        table_lines.push(line);
                    } else {
                        prose_lines.push(line);
                        state = State::Prose;
                    }
                }
            }
            State::TableBody => {
                if is_pipe_row(line) {
                    table_lines.push(line);
                } else {
                    segments.push(ContentSegment::Table(table_lines.join("\n")));
                    table_lines.clear();
                    prose_lines.push(line);
                    state = State::Prose;
                }
            }
        }
    }

    match state {
        State::Prose => {}
        State::TableHeader => prose_lines.append(&mut table_lines),
        State::TableBody => {
            segments.push(ContentSegment::Table(table_lines.join("\n")));
            table_lines.clear();
        }
    }
    flush_prose(&mut prose_lines, &mut segments);

    segments
}

/// Split a markdown table into row batches bounded by content length.
///
/// The first two lines (header row and delimiter row) are duplicated onto
/// every batch; the bound applies to body rows only, so each batch may
/// exceed it by the header length. A single row longer than the bound is
/// emitted as its own batch, whole.
#[inline]
pub fn split_table(table_text: &str, max_table_chars: usize) -> Vec<String> {
    let lines: Vec<&str> = table_text.lines().collect();

    if lines.len() < 2 {
        return vec![table_text.to_string()];
    }

    let header = format!("{}\n{}", lines[0], lines[1]);
    let body = &lines[2..];

    if body.is_empty() {
        return vec![table_text.to_string()];
    }

    let mut batches = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0usize;

    for &row in body {
        let row_len = row.chars().count() + 1;

        if current_len + row_len > max_table_chars && !current.is_empty() {
            batches.push(format!("{header}\n{}", current.join("\n")));
            current.clear();
            current_len = 0;
        }

        current.push(row);
        current_len += row_len;
    }

    if !current.is_empty() {
        batches.push(format!("{header}\n{}", current.join("\n")));
    }

    debug!(
        "Split table of {} rows into {} batches",
        body.len(),
        batches.len()
    );
    batches
}
