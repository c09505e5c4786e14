// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Markdown section chunker.
//!
//! Splits at `#`..`######` heading lines. Each section records its heading,
//! heading level, the nearest ancestor heading at a lower level, and any
//! fenced code blocks it contains. Sections larger than the docs chunk
//! budget are re-split by the fixed-size strategy, carrying the same
//! heading metadata.

use regex::Regex;
use std::sync::OnceLock;

use crate::domain::{Chunk, ChunkType, Language};

use super::{chunk_text_fixed, snap_to_prose_boundary, ChunkerConfig};

const MIN_SECTION_BYTES: usize = 30;
const CHARS_PER_TOKEN: usize = 4;

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(#{1,6})\s+(.+)$").expect("heading pattern"))
}

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^```(\w*)").expect("fence pattern"))
}

struct Section {
    content: String,
    heading: Option<String>,
    level: usize,
    parent_heading: Option<String>,
    line_start: usize,
    line_end: usize,
}

pub(crate) fn chunk_markdown(content: &str, language: Language, config: &ChunkerConfig) -> Vec<Chunk> {
    let sections = split_sections(content);

    // No headings at all: treat the document as plain prose.
    if sections.iter().all(|s| s.heading.is_none()) {
        return chunk_text_fixed(content, language, config);
    }

    let max_section_chars = config.chunk_size_docs * CHARS_PER_TOKEN;
    let mut chunks: Vec<Chunk> = Vec::new();

    for section in sections {
        if section.content.len() > max_section_chars {
            for piece in split_large_section(&section, config) {
                let chunk = section_chunk(&section, piece, chunks.len(), language);
                chunks.push(chunk);
            }
        } else {
            let chunk = section_chunk(&section, section.content.clone(), chunks.len(), language);
            chunks.push(chunk);
        }
    }

    chunks
}

fn section_chunk(section: &Section, content: String, index: usize, language: Language) -> Chunk {
    let fences: Vec<String> = fence_re()
        .captures_iter(&content)
        .map(|caps| caps[1].to_string())
        .collect();
    let has_code_blocks = !fences.is_empty();
    let code_languages: Vec<String> = fences.into_iter().filter(|f| !f.is_empty()).collect();

    let mut chunk = Chunk::new(content, ChunkType::Section, index, language);
    chunk.heading = section.heading.clone();
    chunk.heading_level = section.level;
    chunk.parent_heading = section.parent_heading.clone();
    chunk.line_start = section.line_start;
    chunk.line_end = section.line_end;
    chunk.has_code_blocks = has_code_blocks;
    chunk.code_languages = code_languages;
    chunk
}

fn split_sections(content: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current_lines: Vec<&str> = Vec::new();
    let mut current_heading: Option<String> = None;
    let mut current_level = 0usize;
    // level → most recent heading seen at that level
    let mut ancestors: Vec<Option<String>> = vec![None; 7];
    let mut section_start_line = 1usize;

    let flush = |sections: &mut Vec<Section>,
                 lines: &[&str],
                 heading: &Option<String>,
                 level: usize,
                 ancestors: &[Option<String>],
                 start_line: usize,
                 end_line: usize| {
        let body = lines.join("\n");
        if body.trim().len() <= MIN_SECTION_BYTES {
            return;
        }
        let parent_heading = (1..level)
            .rev()
            .find_map(|l| ancestors.get(l).cloned().flatten());
        sections.push(Section {
            content: body,
            heading: heading.clone(),
            level,
            parent_heading,
            line_start: start_line,
            line_end: end_line,
        });
    };

    for (i, line) in content.lines().enumerate() {
        if let Some(caps) = heading_re().captures(line) {
            flush(
                &mut sections,
                &current_lines,
                &current_heading,
                current_level,
                &ancestors,
                section_start_line,
                i,
            );

            current_level = caps[1].len();
            current_heading = Some(caps[2].trim().to_string());
            ancestors[current_level] = current_heading.clone();
            current_lines = vec![line];
            section_start_line = i + 1;
        } else {
            current_lines.push(line);
        }
    }

    let total_lines = content.lines().count();
    flush(
        &mut sections,
        &current_lines,
        &current_heading,
        current_level,
        &ancestors,
        section_start_line,
        total_lines,
    );

    sections
}

fn split_large_section(section: &Section, config: &ChunkerConfig) -> Vec<String> {
    let content = &section.content;
    let chars_per_chunk = config.chunk_size_docs * CHARS_PER_TOKEN;
    let overlap = config.chunk_overlap * CHARS_PER_TOKEN;

    let mut pieces = Vec::new();
    let mut pos = 0usize;

    while pos < content.len() {
        let target = super::ceil_char_boundary(content, (pos + chars_per_chunk).min(content.len()));
        let end = snap_to_prose_boundary(content, pos, target);

        let piece = &content[pos..end];
        if piece.trim().len() > MIN_SECTION_BYTES {
            pieces.push(piece.to_string());
        }

        if end >= content.len() || end <= overlap {
            break;
        }
        pos = super::floor_char_boundary(content, end - overlap);
    }

    if pieces.is_empty() {
        pieces.push(content.clone());
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ChunkerConfig {
        ChunkerConfig::default()
    }

    #[test]
    fn sections_split_at_headings() {
        let doc = "\
# Guide

Introductory paragraph that is long enough to pass the section filter.

## Installation

Run the installer and follow the prompts until the process completes.

## Usage

Invoke the binary with the configuration file path as its sole argument.
";
        let chunks = chunk_markdown(doc, Language::Markdown, &config());
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].heading.as_deref(), Some("Guide"));
        assert_eq!(chunks[0].heading_level, 1);
        assert_eq!(chunks[1].heading.as_deref(), Some("Installation"));
        assert_eq!(chunks[1].parent_heading.as_deref(), Some("Guide"));
        assert_eq!(chunks[2].index, 2);
    }

    #[test]
    fn parent_heading_tracks_nearest_lower_level() {
        let doc = "\
# Top

Opening words for the top section, padded to clear the length filter.

### Deep

Deep section content, also padded to clear the minimum length filter.
";
        let chunks = chunk_markdown(doc, Language::Markdown, &config());
        let deep = chunks.iter().find(|c| c.heading.as_deref() == Some("Deep")).unwrap();
        assert_eq!(deep.parent_heading.as_deref(), Some("Top"));
        assert_eq!(deep.heading_level, 3);
    }

    #[test]
    fn fenced_code_blocks_are_recorded() {
        let doc = "\
## Example

Some explanation before the code block, padded for the length filter.

```rust
fn main() {}
```

```
plain fence
```
";
        let chunks = chunk_markdown(doc, Language::Markdown, &config());
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].has_code_blocks);
        assert_eq!(chunks[0].code_languages, vec!["rust".to_string()]);
    }

    #[test]
    fn headingless_document_falls_back_to_text_chunks() {
        let doc = "Just a paragraph of prose without any headings, long enough to chunk.";
        let chunks = chunk_markdown(doc, Language::Markdown, &config());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_type, ChunkType::Paragraph);
    }

    #[test]
    fn oversized_section_is_resplit_with_heading_kept() {
        let body = "A sentence of filler content for the oversized section test. ".repeat(200);
        let doc = format!("## Big\n\n{body}");
        let chunks = chunk_markdown(&doc, Language::Markdown, &config());
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.heading.as_deref() == Some("Big")));
        let indices: Vec<_> = chunks.iter().map(|c| c.index).collect();
        assert_eq!(indices, (0..chunks.len()).collect::<Vec<_>>());
    }

    #[test]
    fn tiny_sections_are_dropped() {
        let doc = "# A\n\nx\n\n# B\n\nA second section with enough words to survive the filter.\n";
        let chunks = chunk_markdown(doc, Language::Markdown, &config());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].heading.as_deref(), Some("B"));
    }
}
