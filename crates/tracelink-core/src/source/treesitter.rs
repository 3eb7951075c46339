//! Tree-sitter based Java parsing into the owned syntax arena.

use std::path::PathBuf;

use sha2::{Digest, Sha256};
use tree_sitter::{Language, Parser as TSParser, Tree};

use super::tree::{NodeId, SourceFile, SyntaxNode};
use super::SourceOrigin;
use crate::error::SourceError;
use crate::text::TextRange;

/// Java parser using tree-sitter.
pub struct JavaParser {
    language: Language,
}

impl JavaParser {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_java::LANGUAGE.into(),
        }
    }

    /// Parse source code into a tree-sitter tree.
    pub fn parse_tree(&self, content: &str) -> Result<Tree, String> {
        let mut parser = TSParser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| format!("Failed to set language: {}", e))?;

        parser
            .parse(content, None)
            .ok_or_else(|| "Failed to parse content".to_string())
    }

    /// Parse a file into a [`SourceFile`].
    ///
    /// Syntax errors do not fail the parse; tree-sitter recovers and the
    /// broken region shows up as `ERROR` nodes.
    pub fn parse_file(
        &self,
        path: impl Into<PathBuf>,
        content: String,
        origin: SourceOrigin,
    ) -> Result<SourceFile, SourceError> {
        let path = path.into();
        let tree = self.parse_tree(&content).map_err(|message| SourceError::Parse {
            path: path.display().to_string(),
            message,
        })?;
        let (nodes, leaves) = convert(&tree);
        let fingerprint = fingerprint(&content);
        Ok(SourceFile::from_parts(
            path,
            content,
            origin,
            fingerprint,
            nodes,
            leaves,
        ))
    }
}

impl Default for JavaParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Hex sha256 of a file's content.
pub fn fingerprint(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Flatten a tree-sitter tree into pre-order arena nodes, skipping extras.
fn convert(tree: &Tree) -> (Vec<SyntaxNode>, Vec<NodeId>) {
    let mut nodes: Vec<SyntaxNode> = Vec::new();
    let mut leaves: Vec<NodeId> = Vec::new();
    let mut parents: Vec<NodeId> = Vec::new();
    let mut cursor = tree.walk();

    'walk: loop {
        let node = cursor.node();
        if !node.is_extra() {
            let id = NodeId(nodes.len() as u32);
            let parent = parents.last().copied();
            let range = TextRange::new(node.start_byte(), node.end_byte());
            let is_leaf = node.child_count() == 0;
            let leaf_span = if is_leaf && !range.is_empty() {
                let idx = leaves.len() as u32;
                leaves.push(id);
                Some((idx, idx + 1))
            } else {
                None
            };

            nodes.push(SyntaxNode {
                kind: node.kind(),
                field: cursor.field_name(),
                named: node.is_named(),
                range,
                start_line: node.start_position().row as u32 + 1,
                end_line: node.end_position().row as u32 + 1,
                parent,
                children: Vec::new(),
                leaf_span,
            });
            if let Some(parent) = parent {
                nodes[parent.index()].children.push(id);
            }

            if !is_leaf && cursor.goto_first_child() {
                parents.push(id);
                continue;
            }
        }

        loop {
            if cursor.goto_next_sibling() {
                continue 'walk;
            }
            if !cursor.goto_parent() {
                break 'walk;
            }
            parents.pop();
        }
    }

    (nodes, leaves)
}
