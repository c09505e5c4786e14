// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Tree-sitter AST chunker.
//!
//! Emits one chunk per semantic node of interest (functions, methods,
//! classes, interfaces, structs, enums, traits, type aliases). Matched
//! nodes are not descended into, so a method inside an emitted class is
//! not emitted twice — except for languages where methods are the unit of
//! interest (Go, JS/TS `method_definition`).

use tree_sitter::{Node, Parser};

use crate::domain::{Chunk, ChunkType, Language};

const MIN_CHUNK_BYTES: usize = 50;
const NAME_KINDS: &[&str] = &[
    "identifier",
    "name",
    "property_identifier",
    "type_identifier",
    "field_identifier",
];

fn grammar_for(language: Language) -> Option<tree_sitter::Language> {
    match language {
        Language::Python => Some(tree_sitter_python::LANGUAGE.into()),
        Language::Javascript => Some(tree_sitter_javascript::LANGUAGE.into()),
        Language::Typescript => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
        Language::Go => Some(tree_sitter_go::LANGUAGE.into()),
        Language::Rust => Some(tree_sitter_rust::LANGUAGE.into()),
        _ => None,
    }
}

fn semantic_kinds(language: Language) -> &'static [&'static str] {
    match language {
        Language::Python => &["function_definition", "class_definition"],
        Language::Javascript => &[
            "function_declaration",
            "generator_function_declaration",
            "class_declaration",
            "method_definition",
        ],
        Language::Typescript => &[
            "function_declaration",
            "class_declaration",
            "method_definition",
            "interface_declaration",
            "type_alias_declaration",
            "enum_declaration",
        ],
        Language::Go => &["function_declaration", "method_declaration", "type_declaration"],
        Language::Rust => &[
            "function_item",
            "impl_item",
            "struct_item",
            "enum_item",
            "trait_item",
            "type_item",
        ],
        _ => &[],
    }
}

fn chunk_type_for(kind: &str) -> ChunkType {
    if kind.contains("class") || kind.contains("struct") || kind.contains("enum") {
        ChunkType::Class
    } else if kind.contains("method") {
        ChunkType::Method
    } else if kind.contains("interface")
        || kind.contains("trait")
        || kind.contains("impl")
        || kind.contains("type")
    {
        ChunkType::Class
    } else {
        ChunkType::Function
    }
}

/// Chunk code via tree-sitter. Returns an empty vector when no grammar is
/// available, parsing fails, or nothing of interest survives the minimum
/// size filter — the dispatcher falls back to the regex chunker then.
pub(crate) fn chunk_code_ast(content: &str, language: Language, imports: &[String]) -> Vec<Chunk> {
    let Some(grammar) = grammar_for(language) else {
        return Vec::new();
    };

    let mut parser = Parser::new();
    if parser.set_language(&grammar).is_err() {
        return Vec::new();
    }

    let Some(tree) = parser.parse(content, None) else {
        return Vec::new();
    };

    let kinds = semantic_kinds(language);
    let mut chunks = Vec::new();
    collect_semantic_nodes(tree.root_node(), kinds, content, language, imports, &mut chunks);
    chunks
}

fn collect_semantic_nodes(
    node: Node<'_>,
    kinds: &[&str],
    content: &str,
    language: Language,
    imports: &[String],
    chunks: &mut Vec<Chunk>,
) {
    if kinds.contains(&node.kind()) {
        if let Some(chunk) = chunk_from_node(node, content, language, imports, chunks.len()) {
            chunks.push(chunk);
        }
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_semantic_nodes(child, kinds, content, language, imports, chunks);
    }
}

fn chunk_from_node(
    node: Node<'_>,
    content: &str,
    language: Language,
    imports: &[String],
    index: usize,
) -> Option<Chunk> {
    let text = content.get(node.start_byte()..node.end_byte())?;
    if text.trim().len() < MIN_CHUNK_BYTES {
        return None;
    }

    let mut chunk = Chunk::new(text.to_string(), chunk_type_for(node.kind()), index, language);
    chunk.line_start = node.start_position().row + 1;
    chunk.line_end = node.end_position().row + 1;
    chunk.name = node_name(node, content);
    chunk.imports = imports.to_vec();
    if language == Language::Python {
        chunk.docstring = python_docstring(node, content);
    }
    Some(chunk)
}

fn node_name(node: Node<'_>, content: &str) -> Option<String> {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if NAME_KINDS.contains(&child.kind()) {
            return content
                .get(child.start_byte()..child.end_byte())
                .map(str::to_string);
        }
    }
    None
}

/// First string expression in the body block of a Python def/class.
fn python_docstring(node: Node<'_>, content: &str) -> Option<String> {
    let mut cursor = node.walk();
    let block = node.children(&mut cursor).find(|c| c.kind() == "block")?;

    let mut block_cursor = block.walk();
    let stmt = block
        .children(&mut block_cursor)
        .find(|c| c.kind() == "expression_statement")?;

    let mut stmt_cursor = stmt.walk();
    let string = stmt.children(&mut stmt_cursor).find(|c| c.kind() == "string")?;

    let raw = content.get(string.start_byte()..string.end_byte())?;
    let doc = raw.trim_matches(|c| c == '"' || c == '\'');
    Some(doc.chars().take(500).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn python_functions_and_docstrings() {
        let source = r#"
import os

def compute_total(values):
    """Sum the values, skipping anything that is not a number at all."""
    return sum(v for v in values if isinstance(v, (int, float)))

class Ledger:
    def __init__(self):
        self.entries = []
"#;
        let chunks = chunk_code_ast(source, Language::Python, &["os".to_string()]);
        assert!(chunks.len() >= 2);

        let func = chunks.iter().find(|c| c.name.as_deref() == Some("compute_total")).unwrap();
        assert_eq!(func.chunk_type, ChunkType::Function);
        assert!(func.docstring.as_deref().unwrap().starts_with("Sum the values"));
        assert_eq!(func.imports, vec!["os".to_string()]);

        let class = chunks.iter().find(|c| c.name.as_deref() == Some("Ledger")).unwrap();
        assert_eq!(class.chunk_type, ChunkType::Class);
    }

    #[test]
    fn class_members_are_not_emitted_twice() {
        let source = r#"
class Outer:
    def method_one(self):
        return 1

    def method_two(self):
        return 2
"#;
        let chunks = chunk_code_ast(source, Language::Python, &[]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].name.as_deref(), Some("Outer"));
    }

    #[test]
    fn rust_items_are_chunked() {
        let source = r#"
pub struct Inventory {
    items: Vec<String>,
    capacity: usize,
}

pub trait Pricer {
    fn price_of(&self, item: &str) -> Option<u64>;
    fn currency(&self) -> &'static str;
}

fn helper_function_with_some_body(input: &str) -> String {
    input.trim().to_lowercase()
}
"#;
        let chunks = chunk_code_ast(source, Language::Rust, &[]);
        let names: Vec<_> = chunks.iter().filter_map(|c| c.name.as_deref()).collect();
        assert!(names.contains(&"Inventory"));
        assert!(names.contains(&"Pricer"));
        assert!(names.contains(&"helper_function_with_some_body"));
    }

    #[test]
    fn tiny_nodes_are_dropped() {
        let source = "def f():\n    pass\n";
        let chunks = chunk_code_ast(source, Language::Python, &[]);
        assert!(chunks.is_empty());
    }

    #[test]
    fn unsupported_language_returns_empty() {
        assert!(chunk_code_ast("SELECT 1;", Language::Sql, &[]).is_empty());
    }

    #[test]
    fn line_numbers_are_one_based() {
        let source = "\n\ndef long_enough_function_name(argument_one, argument_two):\n    return argument_one + argument_two\n";
        let chunks = chunk_code_ast(source, Language::Python, &[]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].line_start, 3);
    }
}
