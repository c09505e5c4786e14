// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Extracted file metadata stored alongside chunks for filter/facet queries.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Signals extracted from a code file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeMetadata {
    pub imports: Vec<String>,
    pub exports: Vec<String>,
    pub functions: Vec<String>,
    pub classes: Vec<String>,
    pub interfaces: Vec<String>,
    pub types: Vec<String>,
    pub constants: Vec<String>,
    pub frameworks: Vec<String>,
    pub has_tests: bool,
    pub has_type_annotations: bool,
    /// Comment lines / total non-blank lines, in [0, 1].
    pub comment_ratio: f64,
}

impl CodeMetadata {
    pub fn to_payload(&self) -> Map<String, Value> {
        let mut meta = Map::new();
        let join = |items: &[String]| items.iter().take(20).cloned().collect::<Vec<_>>().join(",");

        if !self.imports.is_empty() {
            meta.insert("imports".into(), json!(join(&self.imports)));
        }
        if !self.exports.is_empty() {
            meta.insert("exports".into(), json!(join(&self.exports)));
        }
        if !self.functions.is_empty() {
            meta.insert("functions".into(), json!(join(&self.functions)));
        }
        if !self.classes.is_empty() {
            meta.insert("classes".into(), json!(join(&self.classes)));
        }
        if !self.interfaces.is_empty() {
            meta.insert("interfaces".into(), json!(join(&self.interfaces)));
        }
        if !self.types.is_empty() {
            meta.insert("types".into(), json!(join(&self.types)));
        }
        if !self.constants.is_empty() {
            meta.insert("constants".into(), json!(join(&self.constants)));
        }
        if !self.frameworks.is_empty() {
            meta.insert("frameworks".into(), json!(self.frameworks.join(",")));
        }
        meta.insert("has_tests".into(), json!(self.has_tests));
        meta.insert("has_type_annotations".into(), json!(self.has_type_annotations));
        meta.insert("comment_ratio".into(), json!((self.comment_ratio * 100.0).round() / 100.0));
        meta
    }
}

/// A heading occurrence in a documentation file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub text: String,
    pub level: usize,
    pub line: usize,
}

/// Signals extracted from a documentation file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// First H1, when present.
    pub title: Option<String>,
    pub headings: Vec<Heading>,
    pub has_code_blocks: bool,
    pub code_languages: Vec<String>,
    pub has_tables: bool,
    pub has_images: bool,
    pub internal_links: usize,
    pub external_links: usize,
    pub word_count: usize,
    pub section_count: usize,
}

impl DocumentMetadata {
    pub fn to_payload(&self) -> Map<String, Value> {
        let mut meta = Map::new();
        if let Some(title) = &self.title {
            meta.insert("title".into(), json!(title));
        }
        meta.insert("heading_count".into(), json!(self.headings.len()));
        meta.insert("has_code_blocks".into(), json!(self.has_code_blocks));
        if !self.code_languages.is_empty() {
            meta.insert("code_languages".into(), json!(self.code_languages.join(",")));
        }
        meta.insert("has_tables".into(), json!(self.has_tables));
        meta.insert("has_images".into(), json!(self.has_images));
        meta.insert("internal_links".into(), json!(self.internal_links));
        meta.insert("external_links".into(), json!(self.external_links));
        meta.insert("word_count".into(), json!(self.word_count));
        meta.insert("section_count".into(), json!(self.section_count));
        meta
    }
}
