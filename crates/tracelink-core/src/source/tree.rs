//! Immutable syntax arena for one source file.
//!
//! Nodes are stored in document pre-order, so a parent always has a smaller
//! [`NodeId`] than its children and leaves appear in source order. Comments
//! are not part of the arena.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::SourceOrigin;
use crate::text::TextRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub struct SyntaxNode {
    /// Grammar kind; for anonymous tokens this is the token text (`new`, `.`, `[`).
    pub kind: &'static str,
    /// Field name under which the parent holds this node.
    pub field: Option<&'static str>,
    pub named: bool,
    pub range: TextRange,
    /// 1-based line of the first byte.
    pub start_line: u32,
    pub end_line: u32,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Leaf indices `[first, end)` covered by this node.
    pub(crate) leaf_span: Option<(u32, u32)>,
}

#[derive(Debug)]
pub struct SourceFile {
    path: PathBuf,
    text: String,
    origin: SourceOrigin,
    fingerprint: String,
    nodes: Vec<SyntaxNode>,
    leaves: Vec<NodeId>,
    line_starts: Vec<usize>,
}

impl SourceFile {
    pub(crate) fn from_parts(
        path: PathBuf,
        text: String,
        origin: SourceOrigin,
        fingerprint: String,
        mut nodes: Vec<SyntaxNode>,
        leaves: Vec<NodeId>,
    ) -> Self {
        // Children always follow their parent, so a reverse pass sees every
        // child span before the parent needs it.
        for idx in (0..nodes.len()).rev() {
            if nodes[idx].leaf_span.is_some() {
                continue;
            }
            let span = nodes[idx]
                .children
                .iter()
                .filter_map(|child| nodes[child.index()].leaf_span)
                .fold(None, |acc: Option<(u32, u32)>, (start, end)| match acc {
                    None => Some((start, end)),
                    Some((s, e)) => Some((s.min(start), e.max(end))),
                });
            nodes[idx].leaf_span = span;
        }

        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(idx, _)| idx + 1))
            .collect();

        Self {
            path,
            text,
            origin,
            fingerprint,
            nodes,
            leaves,
            line_starts,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn origin(&self) -> SourceOrigin {
        self.origin
    }

    /// Hex sha256 of the file content.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &'static str {
        self.node(id).kind
    }

    pub fn range(&self, id: NodeId) -> TextRange {
        self.node(id).range
    }

    pub fn text_of(&self, id: NodeId) -> &str {
        self.node(id).range.substring(&self.text)
    }

    pub fn start_line(&self, id: NodeId) -> u32 {
        self.node(id).start_line
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Named children, skipping punctuation and keywords.
    pub fn named_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |c| self.node(*c).named)
    }

    pub fn child_by_field(&self, id: NodeId, field: &str) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|c| self.node(*c).field == Some(field))
    }

    pub fn children_by_field<'a>(
        &'a self,
        id: NodeId,
        field: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.children(id)
            .iter()
            .copied()
            .filter(move |c| self.node(*c).field == Some(field))
    }

    pub fn child_of_kind(&self, id: NodeId, kind: &str) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|c| self.node(*c).kind == kind)
    }

    /// Strict ancestors, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |n| self.parent(*n))
    }

    /// Nearest strict ancestor of one of the given kinds.
    pub fn parent_of_kind(&self, id: NodeId, kinds: &[&str]) -> Option<NodeId> {
        self.ancestors(id).find(|n| kinds.contains(&self.kind(*n)))
    }

    /// Next sibling under the same parent, tokens included.
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|c| *c == id)?;
        siblings.get(pos + 1).copied()
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|c| *c == id)?;
        pos.checked_sub(1).map(|p| siblings[p])
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.node(id).children.is_empty() && self.node(id).leaf_span.is_some()
    }

    pub fn first_leaf(&self, id: NodeId) -> Option<NodeId> {
        let (start, _) = self.node(id).leaf_span?;
        Some(self.leaves[start as usize])
    }

    pub fn last_leaf(&self, id: NodeId) -> Option<NodeId> {
        let (_, end) = self.node(id).leaf_span?;
        Some(self.leaves[end as usize - 1])
    }

    /// Leaf right after the end of `id`.
    pub fn next_leaf(&self, id: NodeId) -> Option<NodeId> {
        let (_, end) = self.node(id).leaf_span?;
        self.leaves.get(end as usize).copied()
    }

    /// Leaf right before the start of `id`.
    pub fn prev_leaf(&self, id: NodeId) -> Option<NodeId> {
        let (start, _) = self.node(id).leaf_span?;
        let idx = (start as usize).checked_sub(1)?;
        Some(self.leaves[idx])
    }

    /// Leaves of `id` in source order.
    pub fn leaves_of(&self, id: NodeId) -> &[NodeId] {
        match self.node(id).leaf_span {
            Some((start, end)) => &self.leaves[start as usize..end as usize],
            None => &[],
        }
    }

    /// Leaf containing the byte offset.
    pub fn node_at_offset(&self, offset: usize) -> Option<NodeId> {
        let idx = self
            .leaves
            .partition_point(|leaf| self.node(*leaf).range.end <= offset);
        let leaf = *self.leaves.get(idx)?;
        self.node(leaf).range.contains(offset).then_some(leaf)
    }

    /// Leaves starting on the 1-based `line`, in source order.
    pub fn leaves_on_line(&self, line: u32) -> &[NodeId] {
        let start = self
            .leaves
            .partition_point(|leaf| self.node(*leaf).start_line < line);
        let end = self
            .leaves
            .partition_point(|leaf| self.node(*leaf).start_line <= line);
        &self.leaves[start..end]
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Byte range of the 1-based `line`, without its terminator.
    pub fn line_range(&self, line: u32) -> Option<TextRange> {
        let idx = (line as usize).checked_sub(1)?;
        let start = *self.line_starts.get(idx)?;
        let end = self
            .line_starts
            .get(idx + 1)
            .map(|next| next - 1)
            .unwrap_or(self.text.len());
        let end = if self.text[start..end].ends_with('\r') { end - 1 } else { end };
        Some(TextRange::new(start, end))
    }

    pub fn line_text(&self, line: u32) -> Option<&str> {
        self.line_range(line).map(|r| r.substring(&self.text))
    }

    /// Descendants of `id` (including itself) in pre-order.
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut stack = vec![id];
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(self.children(next).iter().rev().copied());
            Some(next)
        })
    }
}
