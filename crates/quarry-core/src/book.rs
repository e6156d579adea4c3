//! Books: named collections of items with a hierarchy and a fulltext cache.
//!
//! A book owns everything a search reads. It answers reachability questions
//! through its table of contents and hands out borrowed [`Record`]s, one per
//! fulltext segment of each candidate item.

use crate::query::Scope;
use crate::scope::{resolve_roots, Reachability};
use crate::types::{FulltextSegment, ItemMeta, Record};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Parent id to ordered child ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Toc(pub HashMap<String, Vec<String>>);

impl Toc {
    pub fn new() -> Self {
        Toc::default()
    }

    pub fn add_child(&mut self, parent: impl Into<String>, child: impl Into<String>) {
        self.0.entry(parent.into()).or_default().push(child.into());
    }

    pub fn children(&self, parent: &str) -> &[String] {
        self.0.get(parent).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Reachability for Toc {
    /// Depth-first, parents before children; an item reachable through
    /// several parents (or through a cycle) is listed once.
    fn reachable(&self, root: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![root];

        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            order.push(id.to_string());
            stack.extend(self.children(id).iter().rev().map(String::as_str));
        }

        order
    }
}

/// State of a book's fulltext cache when the book was loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheStatus {
    #[default]
    Current,

    /// No fulltext was cached; content searches find nothing
    Missing,

    /// The book changed after its cache was built
    Outdated,

    /// The cache file exceeded the size limit and was not loaded
    Blocked { size: u64 },
}

/// A loaded book.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Book {
    /// Stable identifier
    pub id: String,

    /// Display name, matched by `book:` terms
    pub name: String,

    /// Books without a tree are never searched
    pub no_tree: bool,

    /// Item id to metadata
    pub meta: HashMap<String, ItemMeta>,

    /// Item hierarchy
    pub toc: Toc,

    /// Item id to segment key to extracted text
    pub fulltext: HashMap<String, BTreeMap<String, FulltextSegment>>,

    /// Set while loading from a library directory
    #[serde(skip)]
    pub cache: CacheStatus,
}

impl Book {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Book {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add an item under `parent`.
    pub fn with_item(mut self, parent: &str, id: &str, meta: ItemMeta) -> Self {
        self.toc.add_child(parent, id);
        self.meta.insert(id.to_string(), meta);
        self
    }

    /// Attach a fulltext segment to an item.
    pub fn with_segment(mut self, id: &str, file: &str, content: &str) -> Self {
        self.fulltext
            .entry(id.to_string())
            .or_default()
            .insert(file.to_string(), FulltextSegment::new(content));
        self
    }

    /// Whether any fulltext has been cached for this book
    pub fn has_fulltext(&self) -> bool {
        !self.fulltext.is_empty()
    }

    /// Records for one item: one per fulltext segment, or a single record
    /// without content when the item has none.
    ///
    /// Items without metadata can never match, so they yield nothing.
    pub fn records(&self, id: &str) -> Vec<Record<'_>> {
        let Some((id, meta)) = self.meta.get_key_value(id) else {
            return Vec::new();
        };
        let base = Record::new(id, Some(meta));

        match self.fulltext.get(id).filter(|segments| !segments.is_empty()) {
            Some(segments) => segments
                .iter()
                .map(|(file, segment)| base.with_segment(file, segment))
                .collect(),
            None => vec![base],
        }
    }

    /// Every record under the given root scope, in hierarchy order.
    pub fn candidates(&self, roots: &Scope) -> Vec<Record<'_>> {
        resolve_roots(roots, &self.toc)
            .iter()
            .flat_map(|id| self.records(id))
            .collect()
    }
}

impl Reachability for Book {
    fn reachable(&self, root: &str) -> Vec<String> {
        self.toc.reachable(root)
    }
}
