
pub mod table;

use std::sync::LazyLock;

use fancy_regex::Regex;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

use table::ContentSegment;

/// Separators tried in priority order when a section needs splitting
const SEPARATORS: [&str; 6] = ["\n\n", "\n", ". ", "? ", "! ", " "];

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(#{1,6})\s+(.*\S)\s*$").expect("header pattern is valid")
});

/// Configuration for document chunking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Token estimate above which a section is split instead of emitted whole
    pub min_tokens_for_split: usize,
    /// Maximum chunk size in characters for recursive splitting
    pub max_chunk_chars: usize,
    /// Overlap in characters carried between adjacent chunks
    pub overlap_chars: usize,
    /// Maximum content characters per table row batch (header rows excluded)
    pub max_table_chars: usize,
    /// Chunks whose content is shorter than this are dropped
    pub min_chunk_chars: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            min_tokens_for_split: 150,
            max_chunk_chars: 600,
            overlap_chars: 200,
            max_table_chars: 1000,
            min_chunk_chars: 15,
        }
    }
}

/// The header levels active at one point in a document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderPath {
    pub title: Option<String>,
    pub section: Option<String>,
    pub subsection: Option<String>,
}

impl HeaderPath {
    /// Prefix string carried by every chunk under these headers,
    /// e.g. `"Cow > section Spawning. "`. Empty when no headers are active.
    #[inline]
    pub fn prefix(&self) -> String {
        let parts = [
            self.title.clone(),
            self.section.as_ref().map(|s| format!("section {s}")),
            self.subsection.as_ref().map(|s| format!("subsection {s}")),
        ];
        let joined = parts.iter().flatten().join(" > ");
        if joined.is_empty() {
            joined
        } else {
            format!("{joined}. ")
        }
    }

    fn set_level(&mut self, level: usize, text: String) {
        match level {
            1 => {
                self.title = Some(text);
                self.section = None;
                self.subsection = None;
            }
            2 => {
                self.section = Some(text);
                self.subsection = None;
            }
            _ => self.subsection = Some(text),
        }
    }
}

/// A content span between header boundaries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderChunk {
    pub headers: HeaderPath,
    pub content: String,
}

/// Split a markdown document at H1/H2/H3 boundaries.
///
/// Each returned chunk carries the full header path active at that point.
/// Header lines themselves are consumed, not emitted as content. Headers at
/// level 4 and deeper, and anything inside fenced code blocks, stay in the
/// content untouched. Spans that are empty after trimming are not emitted.
#[inline]
pub fn split_headers(text: &str) -> Vec<HeaderChunk> {
    let mut chunks = Vec::new();
    let mut headers = HeaderPath::default();
    let mut current = String::new();
    let mut in_code_fence = false;

    let mut flush = |headers: &HeaderPath, current: &mut String| {
        let content = current.trim();
        if !content.is_empty() {
            chunks.push(HeaderChunk {
                headers: headers.clone(),
                content: content.to_string(),
            });
        }
        current.clear();
    };

    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            in_code_fence = !in_code_fence;
        }

        let header = if in_code_fence {
            None
        } else {
            HEADER_RE.captures(line).ok().flatten()
        };

        if let Some(caps) = header {
            let level = caps.get(1).map_or(0, |m| m.as_str().len());
            if level <= 3 {
                flush(&headers, &mut current);
                let header_text = caps.get(2).map_or("", |m| m.as_str()).to_string();
                headers.set_level(level, header_text);
                continue;
            }
        }

        current.push_str(line);
        current.push('\n');
    }

    flush(&headers, &mut current);
    chunks
}

/// Chunk a full wiki document into storable text pieces.
///
/// Splits at header boundaries, segments each span into prose and table
/// runs, splits oversized prose recursively and tables by row batches, then
/// prefixes every piece with its header path. Pieces whose content (prefix
/// excluded) falls below the minimum floor are dropped.
#[inline]
pub fn chunk_document(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let header_chunks = split_headers(text);
    let mut out = Vec::new();

    for header_chunk in &header_chunks {
        let prefix = header_chunk.headers.prefix();

        for segment in table::segment_content(&header_chunk.content) {
            let pieces = match segment {
                ContentSegment::Prose(prose) => {
                    if estimate_token_count(&prose) > config.min_tokens_for_split {
                        split_recursive(&prose, config)
                    } else {
                        vec![prose]
                    }
                }
                ContentSegment::Table(table_text) => {
                    table::split_table(&table_text, config.max_table_chars)
                }
            };

            for piece in pieces {
                let piece = piece.trim();
                if piece.chars().count() < config.min_chunk_chars {
                    debug!("Dropping chunk below minimum floor: {:?}", piece);
                    continue;
                }
                out.push(format!("{prefix}{piece}"));
            }
        }
    }

    debug!("Chunked document into {} chunks", out.len());
    out
}

/// Recursively split text using an ordered list of separators.
///
/// Splits on the first separator present, packs adjacent pieces into chunks
/// of at most `max_chunk_chars` with `overlap_chars` of trailing overlap,
/// and recurses with the remaining separators on any piece that alone
/// exceeds the maximum. A piece no separator can shrink is emitted whole.
#[inline]
pub fn split_recursive(text: &str, config: &ChunkingConfig) -> Vec<String> {
    split_with_separators(text.trim(), &SEPARATORS, config)
}

fn split_with_separators(text: &str, separators: &[&str], config: &ChunkingConfig) -> Vec<String> {
    if char_count(text) <= config.max_chunk_chars {
        return vec![text.to_string()];
    }

    // Find the first separator that actually occurs in the text
    let Some(sep_index) = separators.iter().position(|sep| text.contains(sep)) else {
        // Atomic piece larger than the maximum: emit whole rather than
        // truncating mid-word
        return vec![text.to_string()];
    };
    let separator = separators[sep_index];
    let remaining = &separators[sep_index + 1..];

    let pieces: Vec<&str> = text
        .split(separator)
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect();

    let mut chunks = Vec::new();
    let mut pending: Vec<&str> = Vec::new();

    for piece in pieces {
        if char_count(piece) > config.max_chunk_chars {
            merge_pending(&mut chunks, &mut pending, separator, config);
            chunks.extend(split_with_separators(piece, remaining, config));
        } else {
            pending.push(piece);
        }
    }
    merge_pending(&mut chunks, &mut pending, separator, config);

    chunks
}

/// Pack accumulated pieces into separator-joined chunks bounded by
/// `max_chunk_chars`, keeping a tail of pieces as overlap for the next chunk.
fn merge_pending(
    chunks: &mut Vec<String>,
    pending: &mut Vec<&str>,
    separator: &str,
    config: &ChunkingConfig,
) {
    let sep_len = char_count(separator);
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0usize;

    for &piece in pending.iter() {
        let added_len = char_count(piece) + if current.is_empty() { 0 } else { sep_len };

        if current_len + added_len > config.max_chunk_chars && !current.is_empty() {
            chunks.push(current.join(separator));

            // Retain trailing pieces as overlap for the next chunk, trimming
            // further whenever the retained tail plus the incoming piece
            // would still overflow the maximum. The tail may empty out
            // entirely before a near-maximum piece.
            while !current.is_empty()
                && (current_len > config.overlap_chars
                    || current_len + sep_len + char_count(piece) > config.max_chunk_chars)
            {
                let removed = current.remove(0);
                current_len = current_len.saturating_sub(char_count(removed) + sep_len);
            }
        }

        current_len += char_count(piece) + if current.is_empty() { 0 } else { sep_len };
        current.push(piece);
    }

    if !current.is_empty() {
        chunks.push(current.join(separator));
    }
    pending.clear();
}

fn char_count(text: &str) -> usize {
    text.chars().count()
}

/// Estimate token count using a simple heuristic.
/// Roughly 1 token per 0.75 words of English text, with a small correction
/// for punctuation density.
#[inline]
pub fn estimate_token_count(text: &str) -> usize {
    let word_count = text.split_whitespace().count();
    let punct_count = text.chars().filter(|c| c.is_ascii_punctuation()).count();

    (punct_count as f64).mul_add(0.1, word_count as f64 / 0.75) as usize
}
