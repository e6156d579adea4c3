//! Core data types for Quarry.
//!
//! These are the read-only shapes the query engine consumes: item metadata,
//! fulltext segments, and the `Record` view that pins one item to one of its
//! segments. Records borrow from the book that owns the data, so a search
//! never copies page content.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// The top-level root specifier; reaches every item in a book.
pub const ROOT_ID: &str = "root";

/// Metadata of one archived item.
///
/// Timestamps are 17-digit `YYYYMMDDHHMMSSmmm` strings so they compare
/// chronologically as plain strings. Keys this type does not model are kept
/// in `extra` and remain available as sort keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemMeta {
    #[serde(deserialize_with = "lenient::text")]
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub comment: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub source: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub icon: Option<String>,
    #[serde(rename = "type", deserialize_with = "lenient::text")]
    pub item_type: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub create: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub modify: Option<String>,
    #[serde(deserialize_with = "lenient::flag")]
    pub marked: bool,
    #[serde(deserialize_with = "lenient::flag")]
    pub locked: bool,

    /// Any other metadata keys
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ItemMeta {
    /// Look up a metadata field by its name.
    ///
    /// Flags resolve to `"true"` when set and to nothing otherwise.
    pub fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        fn text(v: &Option<String>) -> Option<Cow<'_, str>> {
            v.as_deref().map(Cow::Borrowed)
        }
        fn flag(b: bool) -> Option<Cow<'static, str>> {
            b.then_some(Cow::Borrowed("true"))
        }

        match name {
            "title" => text(&self.title),
            "comment" => text(&self.comment),
            "source" => text(&self.source),
            "icon" => text(&self.icon),
            "type" => text(&self.item_type),
            "create" => text(&self.create),
            "modify" => text(&self.modify),
            "marked" => flag(self.marked),
            "locked" => flag(self.locked),
            other => match self.extra.get(other)? {
                serde_json::Value::Null => None,
                serde_json::Value::String(s) => Some(Cow::Borrowed(s.as_str())),
                value => Some(Cow::Owned(value.to_string())),
            },
        }
    }
}

/// Decoders for metadata written by other tools, where a value may be
/// `null` or of an unexpected JSON type.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Strings as they are, other scalars in their JSON form, `null` as absent.
    pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        })
    }

    /// Any value by truthiness: `null`, `false`, `0` and `""` are unset.
    pub fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Null => false,
            Value::Bool(b) => b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        })
    }
}

/// Extracted text of one page or frame of an item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FulltextSegment {
    pub content: Option<String>,
}

impl FulltextSegment {
    pub fn new(content: impl Into<String>) -> Self {
        FulltextSegment {
            content: Some(content.into()),
        }
    }
}

/// One item paired with one of its fulltext segments.
///
/// An item without any fulltext yields exactly one record with an empty
/// `file` and no segment.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    /// Item identifier
    pub id: &'a str,

    /// Segment key within the item (empty for the main page)
    pub file: &'a str,

    /// Item metadata; records without metadata never match
    pub meta: Option<&'a ItemMeta>,

    /// The pinned fulltext segment
    pub fulltext: Option<&'a FulltextSegment>,
}

impl<'a> Record<'a> {
    /// Create a record for the main page of an item.
    pub fn new(id: &'a str, meta: Option<&'a ItemMeta>) -> Self {
        Record {
            id,
            file: "",
            meta,
            fulltext: None,
        }
    }

    /// Pin a fulltext segment to this record
    pub fn with_segment(mut self, file: &'a str, segment: &'a FulltextSegment) -> Self {
        self.file = file;
        self.fulltext = Some(segment);
        self
    }

    /// Fulltext content of the pinned segment (empty if absent)
    pub fn content(&self) -> &'a str {
        self.fulltext
            .and_then(|f| f.content.as_deref())
            .unwrap_or("")
    }

    /// Title, comment and content joined by newlines.
    pub fn tcc_text(&self) -> String {
        let (title, comment) = match self.meta {
            Some(m) => (
                m.title.as_deref().unwrap_or(""),
                m.comment.as_deref().unwrap_or(""),
            ),
            None => ("", ""),
        };
        [title, comment, self.content()].join("\n")
    }
}
