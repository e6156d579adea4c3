//! # Quarry Core Library
//!
//! This crate provides the query language and evaluation engine for Quarry,
//! a search tool for personal web archives. Items carry structured metadata
//! and previously extracted fulltext; a compact, field-aware query string
//! selects and orders them.
//!
//! ## Architecture
//!
//! - **Date** (`date`): 17-digit timestamp encoding and time-zone conversion
//! - **Pattern** (`pattern`): Compilation of terms into regexes and date ranges
//! - **Parser** (`parser`): Tokenizing query strings into a `Query`
//! - **Matcher** (`matcher`): Per-field rule evaluation against a record
//! - **Sort** (`sort`): Stable multi-key ordering of results
//! - **Scope** (`scope`): Expanding root scopes into candidate ids
//! - **Book / Library** (`book`, `library`): The data a search reads
//! - **Engine** (`engine`): Running a query over books
//! - **Config** (`config`): Configuration management
//!
//! ## Example
//!
//! ```rust
//! use quarry_core::{parse_query, search, Book, ItemMeta, SearchOptions, ROOT_ID};
//!
//! let book = Book::new("main", "Main").with_item(
//!     ROOT_ID,
//!     "item1",
//!     ItemMeta { title: Some("Rust notes".to_string()), ..Default::default() },
//! );
//! let books = vec![book];
//!
//! let query = parse_query("title:rust sort:title");
//! for results in search(&query, &books, SearchOptions::default()).unwrap() {
//!     for record in &results.records {
//!         println!("{} {}", results.book.name, record.id);
//!     }
//! }
//! ```

pub mod book;
pub mod config;
pub mod date;
pub mod engine;
pub mod error;
pub mod library;
pub mod matcher;
pub mod parser;
pub mod pattern;
pub mod query;
pub mod scope;
pub mod sort;
pub mod types;

// Re-export commonly used types
pub use book::{Book, CacheStatus, Toc};
pub use config::Config;
pub use date::DateNormalizer;
pub use engine::{search, search_book, BookResults, SearchOptions};
pub use error::{ParseError, QuarryError, Result};
pub use library::{Library, LoadOptions};
pub use matcher::matches;
pub use parser::{compose_query, parse_query, quote_term, QueryParser};
pub use pattern::{DateRange, TextPattern};
pub use query::{
    DateField, Field, FlagField, Query, RulePredicate, Scope, SortField, SortKey, SortOrder,
    TextField,
};
pub use scope::{resolve_roots, Reachability};
pub use sort::sort_records;
pub use types::{FulltextSegment, ItemMeta, Record, ROOT_ID};
