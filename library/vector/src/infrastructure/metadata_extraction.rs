// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! File-level metadata extraction for filter/facet queries.
//!
//! Operates on the same extracted text the chunker sees. Code files yield
//! symbol inventories, framework signals, and hygiene indicators; document
//! files yield heading structure and link statistics.

use regex::{Regex, RegexBuilder};
use std::sync::OnceLock;

use crate::domain::{CodeMetadata, DocumentMetadata, Heading, Language};

/// framework tag → content patterns that indicate it.
const FRAMEWORK_PATTERNS: &[(&str, &[&str])] = &[
    ("fastapi", &[r"from fastapi", r"FastAPI\("]),
    ("flask", &[r"from flask", r"Flask\(__name__\)"]),
    ("django", &[r"from django", r"django\.db"]),
    ("pytest", &[r"import pytest", r"@pytest\.", r"def test_"]),
    ("react", &[r#"from ['"]react['"]"#, r"useState\(", r"useEffect\("]),
    ("vue", &[r#"from ['"]vue['"]"#, r"defineComponent\("]),
    ("express", &[r#"require\(['"]express['"]\)"#, r"express\(\)"]),
    ("axum", &[r"use axum", r"axum::Router"]),
    ("actix", &[r"use actix_web", r"actix_web::"]),
    ("tokio", &[r"#\[tokio::main\]", r"tokio::spawn"]),
];

fn re(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .multi_line(true)
        .build()
        .expect("static metadata pattern")
}

macro_rules! cached_re {
    ($pattern:expr) => {{
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| re($pattern))
    }};
}

/// Extracts structured signals from code and documentation files.
pub struct MetadataExtractor;

impl MetadataExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract_code_metadata(
        &self,
        content: &str,
        file_name: &str,
        language: Language,
    ) -> CodeMetadata {
        CodeMetadata {
            imports: super::chunker::extract_imports(content, language),
            exports: extract_exports(content, language),
            functions: extract_names(content, function_pattern(language)),
            classes: extract_names(content, class_pattern(language)),
            interfaces: extract_names(content, interface_pattern(language)),
            types: extract_names(content, type_pattern(language)),
            constants: extract_names(content, constant_pattern(language)),
            frameworks: detect_frameworks(content),
            has_tests: is_test_file(file_name, content),
            has_type_annotations: has_type_annotations(content, language),
            comment_ratio: comment_ratio(content, language),
        }
    }

    pub fn extract_document_metadata(&self, content: &str) -> DocumentMetadata {
        let heading_re = cached_re!(r"^(#{1,6})\s+(.+)$");
        let mut headings = Vec::new();
        let mut title = None;
        let mut has_tables = false;

        for (i, line) in content.lines().enumerate() {
            if let Some(caps) = heading_re.captures(line) {
                let level = caps[1].len();
                let text = caps[2].trim().to_string();
                if level == 1 && title.is_none() {
                    title = Some(text.clone());
                }
                headings.push(Heading { text, level, line: i + 1 });
            }
            if line.trim_start().starts_with('|') && line.matches('|').count() >= 2 {
                has_tables = true;
            }
        }

        let fences: Vec<String> = cached_re!(r"^```(\w*)")
            .captures_iter(content)
            .map(|caps| caps[1].to_string())
            .collect();
        let has_code_blocks = !fences.is_empty();
        let mut code_languages: Vec<String> = fences.into_iter().filter(|f| !f.is_empty()).collect();
        code_languages.dedup();

        let mut internal_links = 0usize;
        let mut external_links = 0usize;
        let mut has_images = false;
        for caps in cached_re!(r"(!?)\[[^\]]*\]\(([^)]+)\)").captures_iter(content) {
            if &caps[1] == "!" {
                has_images = true;
                continue;
            }
            if caps[2].contains("://") {
                external_links += 1;
            } else {
                internal_links += 1;
            }
        }

        let section_count = if headings.is_empty() { 1 } else { headings.len() };

        DocumentMetadata {
            title,
            section_count,
            headings,
            has_code_blocks,
            code_languages,
            has_tables,
            has_images,
            internal_links,
            external_links,
            word_count: content.split_whitespace().count(),
        }
    }
}

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn extract_names(content: &str, pattern: Option<&'static Regex>) -> Vec<String> {
    let Some(pattern) = pattern else {
        return Vec::new();
    };
    let mut names: Vec<String> = pattern
        .captures_iter(content)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect();
    names.dedup();
    names.truncate(50);
    names
}

fn function_pattern(language: Language) -> Option<&'static Regex> {
    Some(match language {
        Language::Python => cached_re!(r"^\s*(?:async\s+)?def\s+(\w+)"),
        Language::Javascript | Language::Typescript => {
            cached_re!(r"^\s*(?:export\s+)?(?:async\s+)?function\s+(\w+)")
        }
        Language::Go => cached_re!(r"^func\s+(?:\(\w+\s+\*?\w+\)\s+)?(\w+)"),
        Language::Rust => cached_re!(r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?fn\s+(\w+)"),
        _ => return None,
    })
}

fn class_pattern(language: Language) -> Option<&'static Regex> {
    Some(match language {
        Language::Python => cached_re!(r"^class\s+(\w+)"),
        Language::Javascript | Language::Typescript => cached_re!(r"^(?:export\s+)?class\s+(\w+)"),
        Language::Go => cached_re!(r"^type\s+(\w+)\s+struct\b"),
        Language::Rust => cached_re!(r"^(?:pub(?:\([^)]*\))?\s+)?(?:struct|enum)\s+(\w+)"),
        _ => return None,
    })
}

fn interface_pattern(language: Language) -> Option<&'static Regex> {
    Some(match language {
        Language::Typescript => cached_re!(r"^(?:export\s+)?interface\s+(\w+)"),
        Language::Go => cached_re!(r"^type\s+(\w+)\s+interface\b"),
        Language::Rust => cached_re!(r"^(?:pub(?:\([^)]*\))?\s+)?trait\s+(\w+)"),
        _ => return None,
    })
}

fn type_pattern(language: Language) -> Option<&'static Regex> {
    Some(match language {
        Language::Typescript => cached_re!(r"^(?:export\s+)?type\s+(\w+)\s*="),
        Language::Go => cached_re!(r"^type\s+(\w+)\s+"),
        Language::Rust => cached_re!(r"^(?:pub(?:\([^)]*\))?\s+)?type\s+(\w+)"),
        _ => return None,
    })
}

fn constant_pattern(language: Language) -> Option<&'static Regex> {
    Some(match language {
        Language::Python => cached_re!(r"^([A-Z][A-Z0-9_]{2,})\s*="),
        Language::Javascript | Language::Typescript => {
            cached_re!(r"^(?:export\s+)?const\s+([A-Z][A-Z0-9_]{2,})\s*=")
        }
        Language::Go => cached_re!(r"^const\s+(\w+)"),
        Language::Rust => cached_re!(r"^\s*(?:pub(?:\([^)]*\))?\s+)?const\s+(\w+)"),
        _ => return None,
    })
}

fn extract_exports(content: &str, language: Language) -> Vec<String> {
    let mut exports = match language {
        Language::Python => {
            // Names listed in __all__.
            let all_re = cached_re!(r#"__all__\s*=\s*\[([^\]]*)\]"#);
            match all_re.captures(content) {
                Some(caps) => {
                    let inner = caps[1].to_string();
                    cached_re!(r#"['"](\w+)['"]"#)
                        .captures_iter(&inner)
                        .map(|c| c[1].to_string())
                        .collect()
                }
                None => Vec::new(),
            }
        }
        Language::Javascript | Language::Typescript => {
            cached_re!(r"^export\s+(?:default\s+)?(?:async\s+)?(?:class|function|const|let|var|interface|type|enum)\s+(\w+)")
                .captures_iter(content)
                .map(|caps| caps[1].to_string())
                .collect()
        }
        Language::Rust => {
            cached_re!(r"^\s*pub(?:\([^)]*\))?\s+(?:async\s+)?(?:fn|struct|enum|trait|const|static|type|mod)\s+(\w+)")
                .captures_iter(content)
                .map(|caps| caps[1].to_string())
                .collect()
        }
        Language::Go => {
            // Exported identifiers are capitalized.
            cached_re!(r"^(?:func|type)\s+(?:\(\w+\s+\*?\w+\)\s+)?([A-Z]\w*)")
                .captures_iter(content)
                .map(|caps| caps[1].to_string())
                .collect()
        }
        _ => Vec::new(),
    };
    exports.dedup();
    exports.truncate(50);
    exports
}

fn detect_frameworks(content: &str) -> Vec<String> {
    let mut found = Vec::new();
    for (framework, patterns) in FRAMEWORK_PATTERNS {
        let hit = patterns.iter().any(|p| {
            static_regex(p).is_match(content)
        });
        if hit {
            found.push((*framework).to_string());
        }
    }
    found
}

fn static_regex(pattern: &str) -> Regex {
    // Framework patterns are few and scanned once per file; building on the
    // fly keeps the table declarative.
    re(pattern)
}

fn is_test_file(file_name: &str, content: &str) -> bool {
    let lower = file_name.to_lowercase();
    if lower.starts_with("test_")
        || lower.contains("_test.")
        || lower.contains(".test.")
        || lower.contains(".spec.")
        || lower.contains("/tests/")
    {
        return true;
    }
    cached_re!(r#"(?:^\s*def test_|#\[test\]|#\[tokio::test\]|\bit\(['"]|\bdescribe\(['"]|func Test[A-Z])"#)
        .is_match(content)
}

fn has_type_annotations(content: &str, language: Language) -> bool {
    match language {
        // Statically typed languages always qualify.
        Language::Rust | Language::Go | Language::Typescript | Language::Java
        | Language::Csharp | Language::Kotlin | Language::Swift | Language::Scala
        | Language::C | Language::Cpp => true,
        Language::Python => {
            cached_re!(r"def\s+\w+\([^)]*:\s*\w|->\s*\w").is_match(content)
        }
        _ => false,
    }
}

fn comment_ratio(content: &str, language: Language) -> f64 {
    let prefixes: &[&str] = match language {
        Language::Python | Language::Ruby | Language::Shell | Language::Yaml => &["#"],
        Language::Javascript | Language::Typescript | Language::Go | Language::Rust
        | Language::Java | Language::C | Language::Cpp | Language::Csharp
        | Language::Kotlin | Language::Swift | Language::Scala | Language::Php => &["//", "/*", "*"],
        Language::Sql => &["--"],
        _ => return 0.0,
    };

    let mut comment_lines = 0usize;
    let mut total_lines = 0usize;
    for line in content.lines() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            continue;
        }
        total_lines += 1;
        if prefixes.iter().any(|p| trimmed.starts_with(p)) {
            comment_lines += 1;
        }
    }

    if total_lines == 0 {
        0.0
    } else {
        comment_lines as f64 / total_lines as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PYTHON_SOURCE: &str = r#"
import os
from fastapi import FastAPI

__all__ = ["create_app", "Settings"]

MAX_RETRIES = 3

app = FastAPI()

class Settings:
    pass

def create_app(config: dict) -> FastAPI:
    # Wire up the application
    return app

def test_create_app():
    assert create_app({}) is app
"#;

    #[test]
    fn python_code_metadata() {
        let extractor = MetadataExtractor::new();
        let meta = extractor.extract_code_metadata(PYTHON_SOURCE, "app.py", Language::Python);

        assert!(meta.imports.contains(&"os".to_string()));
        assert_eq!(meta.exports, vec!["create_app", "Settings"]);
        assert!(meta.functions.contains(&"create_app".to_string()));
        assert!(meta.classes.contains(&"Settings".to_string()));
        assert!(meta.constants.contains(&"MAX_RETRIES".to_string()));
        assert!(meta.frameworks.contains(&"fastapi".to_string()));
        assert!(meta.has_tests);
        assert!(meta.has_type_annotations);
        assert!(meta.comment_ratio > 0.0);
    }

    #[test]
    fn rust_code_metadata() {
        let source = r#"
use serde::Serialize;

pub const DEFAULT_LIMIT: usize = 10;

pub struct Paginator {
    limit: usize,
}

pub trait Pager {
    fn page(&self) -> usize;
}

pub fn paginate(items: &[u32]) -> Vec<&[u32]> {
    items.chunks(DEFAULT_LIMIT).collect()
}
"#;
        let meta = MetadataExtractor::new().extract_code_metadata(source, "page.rs", Language::Rust);
        assert!(meta.functions.contains(&"paginate".to_string()));
        assert!(meta.classes.contains(&"Paginator".to_string()));
        assert!(meta.interfaces.contains(&"Pager".to_string()));
        assert!(meta.constants.contains(&"DEFAULT_LIMIT".to_string()));
        assert!(meta.exports.contains(&"paginate".to_string()));
        assert!(meta.has_type_annotations);
    }

    #[test]
    fn document_metadata_headings_and_links() {
        let doc = r#"# User Guide

Some intro text with a [local link](./setup.md) and an
[external link](https://example.com/docs).

![diagram](images/arch.png)

## Install

| step | command |
|------|---------|
| 1    | make    |

```bash
make install
```
"#;
        let meta = MetadataExtractor::new().extract_document_metadata(doc);
        assert_eq!(meta.title.as_deref(), Some("User Guide"));
        assert_eq!(meta.headings.len(), 2);
        assert_eq!(meta.headings[1].level, 2);
        assert!(meta.has_code_blocks);
        assert_eq!(meta.code_languages, vec!["bash".to_string()]);
        assert!(meta.has_tables);
        assert!(meta.has_images);
        assert_eq!(meta.internal_links, 1);
        assert_eq!(meta.external_links, 1);
        assert_eq!(meta.section_count, 2);
        assert!(meta.word_count > 10);
    }

    #[test]
    fn headingless_document_counts_one_section() {
        let meta = MetadataExtractor::new().extract_document_metadata("plain text only");
        assert_eq!(meta.section_count, 1);
        assert!(meta.title.is_none());
    }

    #[test]
    fn test_signal_from_filename() {
        let meta = MetadataExtractor::new().extract_code_metadata(
            "def helper():\n    return 1\n",
            "test_helpers.py",
            Language::Python,
        );
        assert!(meta.has_tests);
    }
}
