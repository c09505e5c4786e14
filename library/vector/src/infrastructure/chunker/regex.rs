// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Regex-based code chunker, the fallback when no AST grammar applies.
//!
//! Each language has a list of definition-header patterns. All header
//! matches are collected over the full source (multiline, dot-matches-
//! newline), sorted by offset, and each chunk spans from one header to the
//! next. This sidesteps lookahead, which the regex engine does not
//! support, while producing the same definition-to-definition slices.

use regex::RegexBuilder;
use std::sync::OnceLock;

use crate::domain::{Chunk, ChunkType, Language};

use super::line_of_offset;

const MIN_CHUNK_BYTES: usize = 50;
const IMPORT_SCAN_BYTES: usize = 5000;
const MAX_IMPORTS: usize = 20;

struct LangPatterns {
    headers: Vec<(regex::Regex, ChunkType)>,
}

fn build(pattern: &str) -> regex::Regex {
    RegexBuilder::new(pattern)
        .multi_line(true)
        .dot_matches_new_line(true)
        .build()
        .expect("static chunker pattern")
}

fn patterns_for(language: Language) -> Option<&'static LangPatterns> {
    static PYTHON: OnceLock<LangPatterns> = OnceLock::new();
    static JAVASCRIPT: OnceLock<LangPatterns> = OnceLock::new();
    static TYPESCRIPT: OnceLock<LangPatterns> = OnceLock::new();
    static GO: OnceLock<LangPatterns> = OnceLock::new();
    static RUST: OnceLock<LangPatterns> = OnceLock::new();
    static GENERIC: OnceLock<LangPatterns> = OnceLock::new();

    let patterns = match language {
        Language::Python => PYTHON.get_or_init(|| LangPatterns {
            headers: vec![
                (build(r"^class\s+\w+"), ChunkType::Class),
                (build(r"^(?:async\s+)?def\s+\w+"), ChunkType::Function),
            ],
        }),
        Language::Javascript => JAVASCRIPT.get_or_init(|| LangPatterns {
            headers: vec![
                (build(r"^(?:export\s+)?class\s+\w+"), ChunkType::Class),
                (build(r"^(?:export\s+)?(?:async\s+)?function\s+\w+"), ChunkType::Function),
                (
                    build(r"^(?:export\s+)?const\s+\w+\s*=\s*(?:async\s+)?\("),
                    ChunkType::Function,
                ),
            ],
        }),
        Language::Typescript => TYPESCRIPT.get_or_init(|| LangPatterns {
            headers: vec![
                (build(r"^(?:export\s+)?interface\s+\w+"), ChunkType::Class),
                (build(r"^(?:export\s+)?class\s+\w+"), ChunkType::Class),
                (build(r"^(?:export\s+)?(?:async\s+)?function\s+\w+"), ChunkType::Function),
                (build(r"^(?:export\s+)?type\s+\w+\s*="), ChunkType::Class),
            ],
        }),
        Language::Go => GO.get_or_init(|| LangPatterns {
            headers: vec![
                (build(r"^func\s+\(\w+\s+\*?\w+\)\s+\w+"), ChunkType::Method),
                (build(r"^func\s+\w+"), ChunkType::Function),
                (build(r"^type\s+\w+\s+struct\b"), ChunkType::Class),
            ],
        }),
        Language::Rust => RUST.get_or_init(|| LangPatterns {
            headers: vec![
                (build(r"^(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?fn\s+\w+"), ChunkType::Function),
                (build(r"^impl\b"), ChunkType::Class),
                (build(r"^(?:pub(?:\([^)]*\))?\s+)?struct\s+\w+"), ChunkType::Class),
                (build(r"^(?:pub(?:\([^)]*\))?\s+)?enum\s+\w+"), ChunkType::Class),
                (build(r"^(?:pub(?:\([^)]*\))?\s+)?trait\s+\w+"), ChunkType::Class),
            ],
        }),
        _ => GENERIC.get_or_init(|| LangPatterns {
            headers: vec![(build(r"^(?:function|def|fn|func)\s+\w+"), ChunkType::Function)],
        }),
    };

    Some(patterns)
}

/// Chunk code by definition headers. Returns an empty vector when nothing
/// matched, letting the dispatcher fall back to fixed-size chunking.
pub(crate) fn chunk_code_regex(content: &str, language: Language, imports: &[String]) -> Vec<Chunk> {
    let Some(patterns) = patterns_for(language) else {
        return Vec::new();
    };

    // Collect every header start with its chunk type, sorted by offset.
    let mut headers: Vec<(usize, ChunkType)> = Vec::new();
    for (pattern, chunk_type) in &patterns.headers {
        for m in pattern.find_iter(content) {
            headers.push((m.start(), *chunk_type));
        }
    }
    headers.sort_by_key(|(offset, _)| *offset);
    headers.dedup_by_key(|(offset, _)| *offset);

    let mut chunks = Vec::new();
    for (i, (start, chunk_type)) in headers.iter().enumerate() {
        let end = headers.get(i + 1).map_or(content.len(), |(next, _)| *next);
        let text = content[*start..end].trim_end();
        if text.trim().len() < MIN_CHUNK_BYTES {
            continue;
        }

        let line_start = line_of_offset(content, *start);
        let mut chunk = Chunk::new(text.to_string(), *chunk_type, chunks.len(), language);
        chunk.line_start = line_start;
        chunk.line_end = line_start + text.matches('\n').count();
        chunk.name = extract_definition_name(text);
        chunk.imports = imports.to_vec();
        chunks.push(chunk);
    }

    chunks
}

fn extract_definition_name(text: &str) -> Option<String> {
    static NAME: OnceLock<regex::Regex> = OnceLock::new();
    let re = NAME.get_or_init(|| {
        build(r"(?:class|def|function|fn|func|interface|type|const|struct|enum|trait)\s+(\w+)")
    });
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Extract imports from the head of the file, once per file.
pub(crate) fn extract_imports(content: &str, language: Language) -> Vec<String> {
    static PY: OnceLock<regex::Regex> = OnceLock::new();
    static JS: OnceLock<regex::Regex> = OnceLock::new();
    static GO: OnceLock<regex::Regex> = OnceLock::new();
    static RS: OnceLock<regex::Regex> = OnceLock::new();

    let head_end = super::ceil_char_boundary(content, IMPORT_SCAN_BYTES.min(content.len()));
    let head = &content[..head_end];

    let mut imports = Vec::new();
    match language {
        Language::Python => {
            let re = PY.get_or_init(|| build(r"(?:from\s+(\S+)\s+import|import\s+(\S+))"));
            for caps in re.captures_iter(head) {
                if let Some(m) = caps.get(1).or_else(|| caps.get(2)) {
                    imports.push(m.as_str().to_string());
                }
            }
        }
        Language::Javascript | Language::Typescript => {
            let re = JS.get_or_init(|| build(r#"import\s+.*?from\s+['"]([^'"]+)['"]"#));
            for caps in re.captures_iter(head) {
                imports.push(caps[1].to_string());
            }
        }
        Language::Go => {
            let re = GO.get_or_init(|| build(r#"import\s+(?:\(\s*)?"([\w/.\-]+)""#));
            for caps in re.captures_iter(head) {
                imports.push(caps[1].to_string());
            }
        }
        Language::Rust => {
            let re = RS.get_or_init(|| build(r"use\s+([\w:]+)"));
            for caps in re.captures_iter(head) {
                imports.push(caps[1].to_string());
            }
        }
        _ => {}
    }

    imports.truncate(MAX_IMPORTS);
    imports
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn python_definitions_split_at_headers() {
        let source = "\
def first_function(argument):
    result = argument * 2
    return result + len(str(argument))

def second_function(argument):
    return argument - 1 if argument else 0

class Holder:
    def __init__(self):
        self.value = None
";
        let chunks = chunk_code_regex(source, Language::Python, &[]);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].name.as_deref(), Some("first_function"));
        assert_eq!(chunks[2].chunk_type, ChunkType::Class);
        assert_eq!(chunks[2].name.as_deref(), Some("Holder"));
    }

    #[test]
    fn go_methods_are_distinguished_from_functions() {
        let source = "\
func Standalone(a int) int {
    return a + 1
}

func (s *Server) Handle(w http.ResponseWriter, r *http.Request) {
    s.count++
    w.WriteHeader(200)
}
";
        let chunks = chunk_code_regex(source, Language::Go, &[]);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chunk_type, ChunkType::Function);
        assert_eq!(chunks[1].chunk_type, ChunkType::Method);
    }

    #[test]
    fn line_numbers_computed_from_offsets() {
        let source = "// header comment\n// more\ndef reasonably_long_function(a, b):\n    return a + b + a * b\n";
        let chunks = chunk_code_regex(source, Language::Python, &[]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].line_start, 3);
    }

    #[test]
    fn no_matches_returns_empty_for_fallback() {
        assert!(chunk_code_regex("x = 1\ny = 2\n", Language::Python, &[]).is_empty());
    }

    #[test]
    fn python_imports() {
        let source = "import os\nfrom pathlib import Path\nimport sys\n";
        let imports = extract_imports(source, Language::Python);
        assert_eq!(imports, vec!["os", "pathlib", "sys"]);
    }

    #[test]
    fn javascript_imports() {
        let source = "import React from 'react';\nimport { useState } from \"react\";\n";
        let imports = extract_imports(source, Language::Javascript);
        assert_eq!(imports, vec!["react", "react"]);
    }

    #[test]
    fn rust_imports() {
        let source = "use std::collections::HashMap;\nuse serde::Serialize;\n";
        let imports = extract_imports(source, Language::Rust);
        assert_eq!(imports, vec!["std::collections::HashMap", "serde::Serialize"]);
    }

    #[test]
    fn import_list_is_capped() {
        let source = (0..40).map(|i| format!("import mod{i}\n")).collect::<String>();
        assert_eq!(extract_imports(&source, Language::Python).len(), MAX_IMPORTS);
    }
}
