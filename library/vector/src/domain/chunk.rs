// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Chunk value objects and language detection.
//!
//! A [`Chunk`] is the unit of semantic indexing: a contiguous slice of a
//! file's extracted text paired with structural metadata. Chunks are
//! produced by the chunkers in `infrastructure::chunker` and stored in the
//! vector store with their metadata flattened into the point payload.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Structural kind of a content chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    Function,
    Class,
    Method,
    Module,
    Section,
    Paragraph,
    CodeBlock,
    Import,
}

impl ChunkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkType::Function => "function",
            ChunkType::Class => "class",
            ChunkType::Method => "method",
            ChunkType::Module => "module",
            ChunkType::Section => "section",
            ChunkType::Paragraph => "paragraph",
            ChunkType::CodeBlock => "code_block",
            ChunkType::Import => "import",
        }
    }
}

/// Languages recognised by the chunker and metadata extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Python,
    Javascript,
    Typescript,
    Go,
    Rust,
    Java,
    C,
    Cpp,
    Csharp,
    Ruby,
    Php,
    Swift,
    Kotlin,
    Scala,
    Shell,
    Sql,
    Html,
    Css,
    Yaml,
    Json,
    Toml,
    Xml,
    Markdown,
    Plaintext,
    Unknown,
}

/// File extension → language table. Extensions are matched with
/// `ends_with` against the lowercased file name, longest-suffix semantics
/// are not needed because none of these overlap.
const EXTENSION_TABLE: &[(&str, Language)] = &[
    (".py", Language::Python),
    (".pyw", Language::Python),
    (".pyi", Language::Python),
    (".js", Language::Javascript),
    (".mjs", Language::Javascript),
    (".cjs", Language::Javascript),
    (".jsx", Language::Javascript),
    (".ts", Language::Typescript),
    (".tsx", Language::Typescript),
    (".mts", Language::Typescript),
    (".cts", Language::Typescript),
    (".go", Language::Go),
    (".rs", Language::Rust),
    (".java", Language::Java),
    (".c", Language::C),
    (".h", Language::C),
    (".cpp", Language::Cpp),
    (".cc", Language::Cpp),
    (".cxx", Language::Cpp),
    (".hpp", Language::Cpp),
    (".hxx", Language::Cpp),
    (".cs", Language::Csharp),
    (".rb", Language::Ruby),
    (".rake", Language::Ruby),
    (".php", Language::Php),
    (".swift", Language::Swift),
    (".kt", Language::Kotlin),
    (".kts", Language::Kotlin),
    (".scala", Language::Scala),
    (".sh", Language::Shell),
    (".bash", Language::Shell),
    (".zsh", Language::Shell),
    (".sql", Language::Sql),
    (".html", Language::Html),
    (".htm", Language::Html),
    (".css", Language::Css),
    (".scss", Language::Css),
    (".sass", Language::Css),
    (".less", Language::Css),
    (".yaml", Language::Yaml),
    (".yml", Language::Yaml),
    (".json", Language::Json),
    (".toml", Language::Toml),
    (".xml", Language::Xml),
    (".md", Language::Markdown),
    (".markdown", Language::Markdown),
    (".rst", Language::Plaintext),
    (".txt", Language::Plaintext),
];

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Javascript => "javascript",
            Language::Typescript => "typescript",
            Language::Go => "go",
            Language::Rust => "rust",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Csharp => "csharp",
            Language::Ruby => "ruby",
            Language::Php => "php",
            Language::Swift => "swift",
            Language::Kotlin => "kotlin",
            Language::Scala => "scala",
            Language::Shell => "shell",
            Language::Sql => "sql",
            Language::Html => "html",
            Language::Css => "css",
            Language::Yaml => "yaml",
            Language::Json => "json",
            Language::Toml => "toml",
            Language::Xml => "xml",
            Language::Markdown => "markdown",
            Language::Plaintext => "plaintext",
            Language::Unknown => "unknown",
        }
    }

    /// Languages that are chunked as code (AST → regex → fixed).
    /// Markup, data formats, and unknown content fall through to the
    /// markdown or fixed-size strategies instead.
    pub fn is_code(&self) -> bool {
        !matches!(
            self,
            Language::Markdown
                | Language::Plaintext
                | Language::Yaml
                | Language::Json
                | Language::Toml
                | Language::Xml
                | Language::Html
                | Language::Css
                | Language::Unknown
        )
    }

    fn from_extension(file_name: &str) -> Option<Language> {
        let lower = file_name.to_lowercase();
        EXTENSION_TABLE
            .iter()
            .find(|(ext, _)| lower.ends_with(ext))
            .map(|(_, lang)| *lang)
    }
}

/// Detect the language of a file from its name, falling back to content
/// heuristics in order: shebang line, then keyword signals over the first
/// few KiB.
pub fn detect_language(file_name: &str, content: Option<&str>) -> Language {
    if let Some(lang) = Language::from_extension(file_name) {
        return lang;
    }

    let Some(content) = content else {
        return Language::Unknown;
    };

    if let Some(first_line) = content.strip_prefix("#!").and_then(|rest| rest.lines().next()) {
        let first_line = first_line.to_lowercase();
        if first_line.contains("python") {
            return Language::Python;
        }
        if first_line.contains("node") || first_line.contains("deno") {
            return Language::Javascript;
        }
        if first_line.contains("bash") || first_line.contains("sh") {
            return Language::Shell;
        }
        if first_line.contains("ruby") {
            return Language::Ruby;
        }
    }

    let head: String = content.chars().take(2048).collect::<String>().to_lowercase();

    if head.contains("def ") && head.contains("import ") {
        return Language::Python;
    }
    if head.contains("function ") || head.contains("const ") {
        if head.contains("interface ") || head.contains(": ") {
            return Language::Typescript;
        }
        return Language::Javascript;
    }
    if head.contains("package ") && head.contains("func ") {
        return Language::Go;
    }
    if head.contains("fn ") && head.contains("let ") {
        return Language::Rust;
    }

    Language::Unknown
}

/// A content chunk with position and structural metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub chunk_type: ChunkType,
    /// Dense, zero-based index within the file.
    pub index: usize,
    pub language: Language,
    /// Symbol name for code chunks (function, class, struct, ...).
    pub name: Option<String>,
    pub line_start: usize,
    pub line_end: usize,
    pub parent_name: Option<String>,
    /// Python docstring, when one is attached to the node.
    pub docstring: Option<String>,
    /// Imports extracted once per file, attached to every chunk.
    pub imports: Vec<String>,
    pub heading: Option<String>,
    pub heading_level: usize,
    pub parent_heading: Option<String>,
    pub has_code_blocks: bool,
    pub code_languages: Vec<String>,
}

impl Chunk {
    pub fn new(content: String, chunk_type: ChunkType, index: usize, language: Language) -> Self {
        Self {
            content,
            chunk_type,
            index,
            language,
            name: None,
            line_start: 0,
            line_end: 0,
            parent_name: None,
            docstring: None,
            imports: Vec::new(),
            heading: None,
            heading_level: 0,
            parent_heading: None,
            has_code_blocks: false,
            code_languages: Vec::new(),
        }
    }

    /// Flatten the chunk into a vector-store payload. Optional fields are
    /// omitted rather than written as nulls so filter queries stay simple.
    pub fn to_metadata(&self) -> Map<String, Value> {
        let mut meta = Map::new();
        meta.insert("chunk_type".into(), json!(self.chunk_type.as_str()));
        meta.insert("chunk_index".into(), json!(self.index));
        meta.insert("language".into(), json!(self.language.as_str()));
        meta.insert("line_start".into(), json!(self.line_start));
        meta.insert("line_end".into(), json!(self.line_end));

        if let Some(name) = &self.name {
            meta.insert("name".into(), json!(name));
        }
        if let Some(parent) = &self.parent_name {
            meta.insert("parent_name".into(), json!(parent));
        }
        if let Some(doc) = &self.docstring {
            let truncated: String = doc.chars().take(500).collect();
            meta.insert("docstring".into(), json!(truncated));
        }
        if !self.imports.is_empty() {
            let joined = self.imports.iter().take(20).cloned().collect::<Vec<_>>().join(",");
            meta.insert("imports".into(), json!(joined));
        }
        if let Some(heading) = &self.heading {
            meta.insert("heading".into(), json!(heading));
        }
        if self.heading_level > 0 {
            meta.insert("heading_level".into(), json!(self.heading_level));
        }
        if let Some(parent) = &self.parent_heading {
            meta.insert("parent_heading".into(), json!(parent));
        }
        if self.has_code_blocks {
            meta.insert("has_code_blocks".into(), json!(true));
        }
        if !self.code_languages.is_empty() {
            meta.insert("code_languages".into(), json!(self.code_languages.join(",")));
        }

        meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_table_wins_over_content() {
        let lang = detect_language("service.py", Some("function foo() {}"));
        assert_eq!(lang, Language::Python);
    }

    #[test]
    fn shebang_detection() {
        assert_eq!(
            detect_language("run", Some("#!/usr/bin/env python3\nprint('hi')")),
            Language::Python
        );
        assert_eq!(
            detect_language("deploy", Some("#!/bin/bash\nset -e")),
            Language::Shell
        );
    }

    #[test]
    fn keyword_detection() {
        assert_eq!(
            detect_language("noext", Some("package main\n\nfunc main() {}\n")),
            Language::Go
        );
        assert_eq!(
            detect_language("noext", Some("fn main() {\n    let x = 1;\n}\n")),
            Language::Rust
        );
        assert_eq!(detect_language("noext", Some("hello world")), Language::Unknown);
    }

    #[test]
    fn typescript_vs_javascript_heuristic() {
        assert_eq!(
            detect_language("noext", Some("interface Props {}\nconst x = 1")),
            Language::Typescript
        );
    }

    #[test]
    fn code_language_classification() {
        assert!(Language::Rust.is_code());
        assert!(Language::Python.is_code());
        assert!(!Language::Markdown.is_code());
        assert!(!Language::Yaml.is_code());
        assert!(!Language::Unknown.is_code());
    }

    #[test]
    fn metadata_omits_absent_fields() {
        let chunk = Chunk::new("fn x() {}".into(), ChunkType::Function, 0, Language::Rust);
        let meta = chunk.to_metadata();
        assert!(meta.contains_key("chunk_type"));
        assert!(!meta.contains_key("name"));
        assert!(!meta.contains_key("heading"));
    }

    #[test]
    fn docstring_is_truncated_in_metadata() {
        let mut chunk = Chunk::new("def f(): pass".into(), ChunkType::Function, 0, Language::Python);
        chunk.docstring = Some("x".repeat(900));
        let meta = chunk.to_metadata();
        assert_eq!(meta["docstring"].as_str().unwrap().len(), 500);
    }
}
