//! The parsed form of a search.
//!
//! A [`Query`] is produced once by the parser and then only read: the
//! matcher walks its rules, the sorter its sort keys, and the engine its
//! book and root scopes.

use crate::error::ParseError;
use crate::pattern::{DateRange, MatchMode, TextPattern};
use std::collections::BTreeMap;
use std::fmt;

/// Default field for bare terms: title, comment and content together.
pub const DEFAULT_FIELD: &str = "tcc";

/// A field that filter terms can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Id,
    Type,
    File,
    Source,
    Icon,
    Tcc,
    Title,
    Comment,
    Content,
    Create,
    Modify,
    Marked,
    Locked,
}

/// Fields whose terms are text patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextField {
    Id,
    Type,
    File,
    Source,
    Icon,
    Tcc,
    Title,
    Comment,
    Content,
}

impl TextField {
    /// `id` and `type` must match the whole value; the rest match anywhere.
    pub fn match_mode(&self) -> MatchMode {
        match self {
            TextField::Id | TextField::Type => MatchMode::Exact,
            TextField::File
            | TextField::Source
            | TextField::Icon
            | TextField::Tcc
            | TextField::Title
            | TextField::Comment
            | TextField::Content => MatchMode::Substring,
        }
    }
}

/// Fields whose terms are timestamp ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateField {
    Create,
    Modify,
}

/// Fields whose terms only assert that a flag is set or unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagField {
    Marked,
    Locked,
}

impl Field {
    pub const ALL: [Field; 13] = [
        Field::Id,
        Field::Type,
        Field::File,
        Field::Source,
        Field::Icon,
        Field::Tcc,
        Field::Title,
        Field::Comment,
        Field::Content,
        Field::Create,
        Field::Modify,
        Field::Marked,
        Field::Locked,
    ];

    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Type => "type",
            Field::File => "file",
            Field::Source => "source",
            Field::Icon => "icon",
            Field::Tcc => "tcc",
            Field::Title => "title",
            Field::Comment => "comment",
            Field::Content => "content",
            Field::Create => "create",
            Field::Modify => "modify",
            Field::Marked => "marked",
            Field::Locked => "locked",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Terms that must match (`include`) and must not match (`exclude`).
#[derive(Debug, Clone)]
pub struct Terms<T> {
    pub include: Vec<T>,
    pub exclude: Vec<T>,
}

impl<T> Default for Terms<T> {
    fn default() -> Self {
        Terms {
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

impl<T> Terms<T> {
    pub fn push(&mut self, positive: bool, term: T) {
        if positive {
            self.include.push(term);
        } else {
            self.exclude.push(term);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}

/// The compiled terms for one field, tagged with the field they test.
#[derive(Debug, Clone)]
pub enum RulePredicate {
    /// Regular expressions for text fields
    Text(TextField, Terms<TextPattern>),

    /// Timestamp ranges for date fields
    Date(DateField, Terms<DateRange>),

    /// Polarity markers for flag fields
    Presence(FlagField, Terms<()>),
}

impl RulePredicate {
    /// An empty predicate of the shape a field expects.
    pub fn for_field(field: Field) -> Self {
        let text = |f| RulePredicate::Text(f, Terms::default());
        match field {
            Field::Id => text(TextField::Id),
            Field::Type => text(TextField::Type),
            Field::File => text(TextField::File),
            Field::Source => text(TextField::Source),
            Field::Icon => text(TextField::Icon),
            Field::Tcc => text(TextField::Tcc),
            Field::Title => text(TextField::Title),
            Field::Comment => text(TextField::Comment),
            Field::Content => text(TextField::Content),
            Field::Create => RulePredicate::Date(DateField::Create, Terms::default()),
            Field::Modify => RulePredicate::Date(DateField::Modify, Terms::default()),
            Field::Marked => RulePredicate::Presence(FlagField::Marked, Terms::default()),
            Field::Locked => RulePredicate::Presence(FlagField::Locked, Terms::default()),
        }
    }

    /// Whether no term has been added yet.
    pub fn is_empty(&self) -> bool {
        match self {
            RulePredicate::Text(_, t) => t.is_empty(),
            RulePredicate::Date(_, t) => t.is_empty(),
            RulePredicate::Presence(_, t) => t.is_empty(),
        }
    }
}

/// What a sort key compares on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortField {
    Id,
    File,
    Content,
    /// A metadata key, such as `title` or `create`
    Meta(String),
}

impl SortField {
    pub fn from_name(name: &str) -> SortField {
        match name {
            "id" => SortField::Id,
            "file" => SortField::File,
            "content" => SortField::Content,
            other => SortField::Meta(other.to_string()),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortField::Id => f.write_str("id"),
            SortField::File => f.write_str("file"),
            SortField::Content => f.write_str("content"),
            SortField::Meta(key) => write!(f, "meta.{}", key),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub order: SortOrder,
}

impl SortKey {
    pub fn new(field: SortField, order: SortOrder) -> Self {
        SortKey { field, order }
    }
}

/// Names or ids to search in and to leave out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl Scope {
    pub fn push(&mut self, positive: bool, value: impl Into<String>) {
        if positive {
            self.include.push(value.into());
        } else {
            self.exclude.push(value.into());
        }
    }

    /// Whether `name` passes this scope by literal comparison.
    pub fn admits(&self, name: &str) -> bool {
        (self.include.is_empty() || self.include.iter().any(|n| n == name))
            && !self.exclude.iter().any(|n| n == name)
    }
}

/// A parsed search.
#[derive(Debug, Clone)]
pub struct Query {
    /// Per-field predicates; every one must pass
    pub rules: BTreeMap<Field, RulePredicate>,

    /// Sort keys, primary first
    pub sorts: Vec<SortKey>,

    /// Books to search, by name
    pub book_scope: Scope,

    /// Subtrees to search, by root id
    pub root_scope: Scope,

    /// Case sensitivity in effect at the end of the query
    pub case_sensitive: bool,

    /// Regex mode in effect at the end of the query
    pub use_regex: bool,

    /// Default field in effect at the end of the query
    pub default_field: String,

    /// Problems that make the query unusable
    pub errors: Vec<ParseError>,

    /// Commands that were not understood and had no effect
    pub warnings: Vec<String>,
}

impl Default for Query {
    fn default() -> Self {
        Query {
            rules: BTreeMap::new(),
            sorts: Vec::new(),
            book_scope: Scope::default(),
            root_scope: Scope::default(),
            case_sensitive: false,
            use_regex: false,
            default_field: DEFAULT_FIELD.to_string(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl Query {
    /// A query is valid when parsing collected no errors.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Human-readable parse errors, in the order they were found
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.to_string()).collect()
    }

    pub fn rule(&self, field: Field) -> Option<&RulePredicate> {
        self.rules.get(&field)
    }
}
