//! Snapshot tree mirroring the live presentation model tree

use crate::pm::description::PmDescription;
use crate::state::saver::MapStateSaver;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sequence of tags from the root to a node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagPath(Vec<String>);

impl TagPath {
    pub fn root(tag: impl Into<String>) -> Self {
        Self(vec![tag.into()])
    }

    pub fn child(&self, tag: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(tag.into());
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn tag(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or("")
    }
}

impl From<Vec<String>> for TagPath {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

impl fmt::Display for TagPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// One node of a persisted tree: how to rebuild it, what it saved, and its
/// children in creation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "D: Serialize", deserialize = "D: serde::de::DeserializeOwned"))]
pub struct PmSnapshot<D> {
    pub tag: String,
    pub description: D,
    #[serde(default)]
    pub state: MapStateSaver,
    #[serde(default)]
    pub children: Vec<PmSnapshot<D>>,
}

impl<D: PmDescription> PmSnapshot<D> {
    pub fn new(tag: impl Into<String>, description: D) -> Self {
        Self {
            tag: tag.into(),
            description,
            state: MapStateSaver::new(),
            children: Vec::new(),
        }
    }

    pub fn child(&self, tag: &str) -> Option<&PmSnapshot<D>> {
        self.children.iter().find(|child| child.tag == tag)
    }

    /// Locate the node at `path`. The first segment must match this node's tag.
    pub fn find(&self, path: &TagPath) -> Option<&PmSnapshot<D>> {
        let (first, rest) = path.segments().split_first()?;
        if *first != self.tag {
            return None;
        }
        let mut node = self;
        for tag in rest {
            node = node.child(tag)?;
        }
        Some(node)
    }

    /// Total number of nodes in this subtree
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(PmSnapshot::node_count).sum::<usize>()
    }

    /// Pre-order list of paths, for structural comparison
    pub fn paths(&self) -> Vec<TagPath> {
        let mut out = Vec::new();
        self.collect_paths(&TagPath::root(self.tag.clone()), &mut out);
        out
    }

    fn collect_paths(&self, path: &TagPath, out: &mut Vec<TagPath>) {
        out.push(path.clone());
        for child in &self.children {
            child.collect_paths(&path.child(child.tag.clone()), out);
        }
    }
}
