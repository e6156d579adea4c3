//! Running a parsed query over books.
//!
//! For each book in scope the engine resolves the root scope into candidate
//! records, keeps the ones the matcher accepts, and orders them with the
//! query's sort keys. Books are independent of each other, so they can be
//! evaluated in parallel via Rayon.

use crate::book::Book;
use crate::error::{QuarryError, Result};
use crate::matcher::matches;
use crate::query::Query;
use crate::sort::sort_records;
use crate::types::Record;
use rayon::prelude::*;
use tracing::{debug, info, instrument};

/// Matched records of one book, in final order.
#[derive(Debug, Clone)]
pub struct BookResults<'a> {
    pub book: &'a Book,
    pub records: Vec<Record<'a>>,
}

impl<'a> BookResults<'a> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// How the engine spreads work across books.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Evaluate books on the Rayon thread pool
    pub parallel: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions { parallel: true }
    }
}

/// Books a query may search: those with a tree that pass the book scope.
pub fn books_in_scope<'a>(query: &Query, books: &'a [Book]) -> Vec<&'a Book> {
    books
        .iter()
        .filter(|b| !b.no_tree && query.book_scope.admits(&b.name))
        .collect()
}

/// Evaluate a query against one book.
///
/// The query is assumed valid; see [`search`] for the checked entry point.
pub fn search_book<'a>(query: &Query, book: &'a Book) -> Vec<Record<'a>> {
    let mut results: Vec<Record<'a>> = book
        .candidates(&query.root_scope)
        .into_iter()
        .filter(|record| matches(query, record))
        .collect();

    sort_records(&mut results, &query.sorts);

    debug!(book = %book.name, matched = results.len(), "Book searched");
    results
}

/// Evaluate a query against every book in its scope.
///
/// Returns [`QuarryError::InvalidQuery`] without evaluating anything if the
/// query collected parse errors. Results come back in the order of `books`.
#[instrument(skip_all, fields(books = books.len()))]
pub fn search<'a>(
    query: &Query,
    books: &'a [Book],
    options: SearchOptions,
) -> Result<Vec<BookResults<'a>>> {
    if !query.is_valid() {
        return Err(QuarryError::InvalidQuery {
            messages: query.error_messages(),
        });
    }

    let selected = books_in_scope(query, books);
    let run = |book: &&'a Book| BookResults {
        book: *book,
        records: search_book(query, *book),
    };

    let results: Vec<BookResults<'a>> = if options.parallel && selected.len() > 1 {
        selected.par_iter().map(run).collect()
    } else {
        selected.iter().map(run).collect()
    };

    info!(
        books = results.len(),
        matched = results.iter().map(BookResults::len).sum::<usize>(),
        "Search complete"
    );
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::DateNormalizer;
    use crate::parser::{parse_query, QueryParser};
    use crate::types::{ItemMeta, ROOT_ID};

    fn item(title: &str, create: &str) -> ItemMeta {
        ItemMeta {
            title: Some(title.to_string()),
            create: Some(create.to_string()),
            ..Default::default()
        }
    }

    fn main_book() -> Book {
        Book::new("main", "Main")
            .with_item(ROOT_ID, "f1", item("Rust folder", "20200101000000000"))
            .with_item("f1", "p1", item("Ownership", "20200301000000000"))
            .with_item("f1", "p2", item("Borrowing", "20210301000000000"))
            .with_item(ROOT_ID, "p3", item("Cooking", "20190101000000000"))
            .with_segment("p1", "index.html", "rust ownership rules")
            .with_segment("p2", "index.html", "rust borrow checker")
            .with_segment("p2", "frame.html", "embedded rust frame")
    }

    fn side_book() -> Book {
        Book::new("side", "Side").with_item(
            ROOT_ID,
            "s1",
            item("Rust side note", "20200501000000000"),
        )
    }

    fn ids(results: &BookResults<'_>) -> Vec<String> {
        results
            .records
            .iter()
            .map(|r| format!("{}/{}", r.id, r.file))
            .collect()
    }

    #[test]
    fn test_search_each_segment_is_a_record() {
        let books = vec![main_book()];
        let query = parse_query("content:rust");
        let results = search(&query, &books, SearchOptions::default()).unwrap();
        assert_eq!(
            ids(&results[0]),
            vec!["p1/index.html", "p2/frame.html", "p2/index.html"]
        );
    }

    #[test]
    fn test_search_book_scope() {
        let books = vec![main_book(), side_book()];

        let results = search(&parse_query("rust"), &books, SearchOptions::default()).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].book.name, "Side");

        let results = search(&parse_query("rust book:Side"), &books, SearchOptions::default())
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].book.id, "side");

        let results = search(&parse_query("rust -book:Side"), &books, SearchOptions::default())
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].book.id, "main");
    }

    #[test]
    fn test_no_tree_books_are_skipped() {
        let mut hidden = side_book();
        hidden.no_tree = true;
        let books = vec![main_book(), hidden];
        let results = search(&parse_query(""), &books, SearchOptions::default()).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_search_root_scope() {
        let books = vec![main_book()];
        let query = parse_query("root:f1 -root:p2 sort:id");
        let results = search(&query, &books, SearchOptions::default()).unwrap();
        assert_eq!(ids(&results[0]), vec!["f1/", "p1/index.html"]);
    }

    #[test]
    fn test_search_sorted_by_date_descending() {
        let books = vec![main_book()];
        let parser = QueryParser::new().with_normalizer(DateNormalizer::utc());
        let query = parser.parse("create:2020- -sort:create -file:frame");
        let results = search(&query, &books, SearchOptions::default()).unwrap();
        assert_eq!(ids(&results[0]), vec!["p2/index.html", "p1/index.html", "f1/"]);
    }

    #[test]
    fn test_invalid_query_is_not_evaluated() {
        let books = vec![main_book()];
        let query = parse_query("create:abc re: title:(");
        let err = search(&query, &books, SearchOptions::default()).unwrap_err();
        match err {
            QuarryError::InvalidQuery { messages } => {
                assert_eq!(
                    messages,
                    vec!["invalid date: abc", "invalid regular expression: ("]
                );
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let books = vec![main_book(), side_book()];
        let query = parse_query("rust sort:title");
        let parallel = search(&query, &books, SearchOptions { parallel: true }).unwrap();
        let sequential = search(&query, &books, SearchOptions { parallel: false }).unwrap();
        let a: Vec<Vec<String>> = parallel.iter().map(ids).collect();
        let b: Vec<Vec<String>> = sequential.iter().map(ids).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_search_book_directly() {
        let book = main_book();
        let results = search_book(&parse_query("title:cooking"), &book);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "p3");
    }
}
