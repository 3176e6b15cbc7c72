//! Markdown-aware text splitting for large documents.
//!
//! Splits prefer heading boundaries, then paragraph breaks, then lines, then
//! words. Units are merged back into chunks of at most `chunk_size`
//! characters; trailing units of up to `chunk_overlap` characters are carried
//! into the next chunk, and a heading always starts a fresh chunk.

use crate::defaults::{CHUNK_OVERLAP, CHUNK_SIZE};

const SEPARATORS: &[&str] = &["\n## ", "\n### ", "\n#### ", "\n\n", "\n", " "];
const HEADING_SEPARATORS: &[&str] = &["\n## ", "\n### ", "\n#### "];

#[derive(Debug, Clone)]
pub struct MarkdownSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for MarkdownSplitter {
    fn default() -> Self {
        Self::new(CHUNK_SIZE, CHUNK_OVERLAP)
    }
}

impl MarkdownSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_overlap = chunk_overlap.min(chunk_size / 2);
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    /// Split `text` into chunks. Input that already fits stays whole.
    pub fn split(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }
        if char_len(text) <= self.chunk_size {
            return vec![text.to_string()];
        }
        let units = self.split_recursive(text, SEPARATORS);
        self.merge(units)
    }

    // Break text into units no longer than chunk_size, trying coarser
    // separators first.
    fn split_recursive(&self, text: &str, seps: &[&str]) -> Vec<String> {
        if char_len(text) <= self.chunk_size {
            return vec![text.to_string()];
        }
        let Some((sep, rest)) = seps.split_first() else {
            return self.hard_split(text);
        };
        let parts = split_keep_separator(text, sep);
        if parts.len() <= 1 {
            return self.split_recursive(text, rest);
        }
        let mut units = Vec::new();
        for part in parts {
            if char_len(part) > self.chunk_size {
                units.extend(self.split_recursive(part, rest));
            } else {
                units.push(part.to_string());
            }
        }
        units
    }

    // Pack whole units into chunks of at most chunk_size characters. The
    // overlap carried into the next chunk is made of trailing units, and is
    // shrunk further whenever the incoming unit would not fit otherwise. A
    // unit opening a heading never gets overlap prepended to it.
    fn merge(&self, units: Vec<String>) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: Vec<String> = Vec::new();
        let mut total = 0;
        // units in the window that are not part of an already emitted chunk
        let mut fresh = 0;
        for unit in units {
            let len = char_len(&unit);
            let at_heading = starts_with_heading(&unit);
            if !window.is_empty() && (at_heading || total + len > self.chunk_size) {
                if fresh > 0 {
                    push_chunk(&mut chunks, &window);
                    fresh = 0;
                }
                if at_heading {
                    window.clear();
                    total = 0;
                } else {
                    while !window.is_empty()
                        && (total > self.chunk_overlap || total + len > self.chunk_size)
                    {
                        total -= char_len(&window.remove(0));
                    }
                }
            }
            total += len;
            window.push(unit);
            fresh += 1;
        }
        if fresh > 0 {
            push_chunk(&mut chunks, &window);
        }
        chunks
    }

    // Last resort for unbreakable runs: fixed windows of chunk_size.
    fn hard_split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        chars
            .chunks(self.chunk_size.max(1))
            .map(|w| w.iter().collect())
            .collect()
    }
}

fn push_chunk(chunks: &mut Vec<String>, window: &[String]) {
    let chunk = window.concat().trim().to_string();
    if !chunk.is_empty() {
        chunks.push(chunk);
    }
}

fn starts_with_heading(unit: &str) -> bool {
    HEADING_SEPARATORS.iter().any(|sep| unit.starts_with(sep))
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

// Split on `sep`, keeping the separator attached to the piece that follows
// it, so headings stay with their section.
fn split_keep_separator<'a>(text: &'a str, sep: &str) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(sep) {
        if idx > start {
            parts.push(&text[start..idx]);
        }
        start = idx;
    }
    if start < text.len() {
        parts.push(&text[start..]);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_stays_whole() {
        let splitter = MarkdownSplitter::default();
        let chunks = splitter.split("just a short note");
        assert_eq!(chunks, vec!["just a short note".to_string()]);
    }

    #[test]
    fn test_empty_text_yields_nothing() {
        let splitter = MarkdownSplitter::default();
        assert!(splitter.split("   \n ").is_empty());
    }

    #[test]
    fn test_chunks_respect_size_bound() {
        let splitter = MarkdownSplitter::new(100, 20);
        let text = "word ".repeat(200);
        let chunks = splitter.split(&text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 100, "oversized chunk: {}", chunk.len());
        }
    }

    #[test]
    fn test_headings_start_their_chunk() {
        let splitter = MarkdownSplitter::new(80, 10);
        let text = format!(
            "{}\n## Deals\n{}",
            "intro text ".repeat(10),
            "deal details ".repeat(10)
        );
        let chunks = splitter.split(&text);
        assert!(chunks.iter().any(|c| c.starts_with("## Deals")));
    }

    #[test]
    fn test_unbreakable_run_is_hard_split() {
        let splitter = MarkdownSplitter::new(50, 10);
        let text = "x".repeat(200);
        let chunks = splitter.split(&text);
        assert!(chunks.len() >= 4);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 50);
        }
    }

    #[test]
    fn test_default_size_holds_for_unbreakable_runs() {
        let chunks = MarkdownSplitter::default().split(&"x".repeat(5000));
        assert_eq!(chunks.len(), 5);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= CHUNK_SIZE);
        }
    }

    #[test]
    fn test_consecutive_chunks_overlap() {
        let splitter = MarkdownSplitter::new(50, 10);
        let text: String = (0..60).map(|i| format!("w{i:02} ")).collect();
        let chunks = splitter.split(&text);
        assert!(chunks.len() >= 2);
        // The trailing words of one chunk open the next.
        let words: Vec<&str> = chunks[0].split_whitespace().collect();
        let carried = format!("{} {}", words[words.len() - 2], words[words.len() - 1]);
        assert!(
            chunks[1].starts_with(&carried),
            "chunk 2 does not carry '{carried}': {}",
            chunks[1]
        );
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 50);
        }
    }
}
