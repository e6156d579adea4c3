//! The set of books available for searching.
//!
//! A library is a directory holding one `*.json` file per book. Loading
//! produces an immutable snapshot that searches share; reloading swaps in a
//! new snapshot without disturbing searches that still hold the old one.
//!
//! ## Book File Format
//!
//! ```json
//! {
//!   "id": "main",
//!   "name": "Main",
//!   "no_tree": false,
//!   "meta": { "20200101000000000": { "title": "...", "type": "", "create": "..." } },
//!   "toc": { "root": ["20200101000000000"] },
//!   "fulltext": { "20200101000000000": { "index.html": { "content": "..." } } }
//! }
//! ```
//!
//! The fulltext cache may instead live next to the book as
//! `<stem>.fulltext.json`, holding only the `fulltext` object. A cache file
//! replaces any inline fulltext. Its modification time is compared with the
//! book file's to detect a stale cache, and its size is checked against
//! [`LoadOptions::cache_size_limit`] before it is read.

use crate::book::{Book, CacheStatus};
use crate::error::{QuarryError, Result};
use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, instrument, warn};

/// File name suffix of a separate fulltext cache.
pub const FULLTEXT_SUFFIX: &str = ".fulltext.json";

/// Fulltext cache checks applied while loading books.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Report a cache as outdated once the book is newer than the cache
    /// and the cache is older than this (None = never)
    pub cache_update_threshold: Option<Duration>,

    /// Skip cache files larger than this many bytes (None = no limit)
    pub cache_size_limit: Option<u64>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            cache_update_threshold: Some(Duration::from_secs(5 * 24 * 3600)),
            cache_size_limit: None,
        }
    }
}

/// Books loaded from a library directory.
pub struct Library {
    /// Directory the books are read from
    dir: PathBuf,

    /// Checks applied on every (re)load
    options: LoadOptions,

    /// Current snapshot, ordered by book id
    books: RwLock<Arc<Vec<Book>>>,

    /// Incremented on every reload
    generation: AtomicU64,
}

impl Library {
    /// Open a library directory and load every book in it.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with(dir, LoadOptions::default())
    }

    /// Open a library directory with explicit cache checks.
    pub fn open_with(dir: impl Into<PathBuf>, options: LoadOptions) -> Result<Self> {
        let dir = dir.into();
        let books = load_books(&dir, &options)?;
        Ok(Library {
            dir,
            options,
            books: RwLock::new(Arc::new(books)),
            generation: AtomicU64::new(0),
        })
    }

    /// Build a library from books already in memory.
    pub fn from_books(mut books: Vec<Book>) -> Self {
        books.sort_by(|a, b| a.id.cmp(&b.id));
        Library {
            dir: PathBuf::new(),
            options: LoadOptions::default(),
            books: RwLock::new(Arc::new(books)),
            generation: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The current set of books.
    ///
    /// The snapshot stays valid and unchanged even if the library is
    /// reloaded while it is held.
    pub fn snapshot(&self) -> Arc<Vec<Book>> {
        Arc::clone(&self.books.read())
    }

    pub fn len(&self) -> usize {
        self.books.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.read().is_empty()
    }

    /// Get the current generation (reload counter).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Find a book by id.
    pub fn get(&self, id: &str) -> Option<Book> {
        self.books.read().iter().find(|b| b.id == id).cloned()
    }

    /// Re-read every book from disk and swap in the new snapshot.
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    pub fn reload(&self) -> Result<()> {
        let books = load_books(&self.dir, &self.options)?;
        *self.books.write() = Arc::new(books);
        self.generation.fetch_add(1, Ordering::Release);
        Ok(())
    }
}

impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("dir", &self.dir)
            .field("options", &self.options)
            .field("books", &self.len())
            .field("generation", &self.generation())
            .finish()
    }
}

/// Path of the separate fulltext cache belonging to a book file.
pub fn fulltext_path(book_path: &Path) -> PathBuf {
    let stem = book_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    book_path.with_file_name(format!("{}{}", stem, FULLTEXT_SUFFIX))
}

fn is_fulltext_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(FULLTEXT_SUFFIX))
}

fn corrupted(path: &Path, err: serde_json::Error) -> QuarryError {
    QuarryError::BookCorrupted {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

/// Read a single book file and its fulltext cache.
pub fn load_book(path: &Path, options: &LoadOptions) -> Result<Book> {
    let contents = fs::read_to_string(path)?;
    let mut book: Book = serde_json::from_str(&contents).map_err(|e| corrupted(path, e))?;

    let cache_path = fulltext_path(path);
    book.cache = if cache_path.is_file() {
        load_fulltext(&mut book, path, &cache_path, options)?
    } else if book.has_fulltext() {
        CacheStatus::Current
    } else {
        CacheStatus::Missing
    };

    match book.cache {
        CacheStatus::Current => {}
        CacheStatus::Missing => warn!(
            book = %book.name,
            "Fulltext cache missing; content searches will not match in this book"
        ),
        CacheStatus::Outdated => warn!(
            book = %book.name,
            "Fulltext cache is outdated; content searches may miss recent changes"
        ),
        CacheStatus::Blocked { size } => warn!(
            book = %book.name,
            size = %format_size(size),
            "Fulltext cache exceeds the size limit and was not loaded"
        ),
    }
    debug!(
        book = %book.name,
        items = book.meta.len(),
        "Loaded book"
    );
    Ok(book)
}

fn load_fulltext(
    book: &mut Book,
    book_path: &Path,
    cache_path: &Path,
    options: &LoadOptions,
) -> Result<CacheStatus> {
    let cache_meta = fs::metadata(cache_path)?;
    let size = cache_meta.len();
    if options.cache_size_limit.is_some_and(|limit| size > limit) {
        book.fulltext.clear();
        return Ok(CacheStatus::Blocked { size });
    }

    let contents = fs::read_to_string(cache_path)?;
    book.fulltext = serde_json::from_str(&contents).map_err(|e| corrupted(cache_path, e))?;

    // Filesystems without modification times never report a stale cache.
    let book_mtime = fs::metadata(book_path).and_then(|m| m.modified());
    let (Some(threshold), Ok(book_mtime), Ok(cache_mtime)) =
        (options.cache_update_threshold, book_mtime, cache_meta.modified())
    else {
        return Ok(CacheStatus::Current);
    };

    let expired = cache_mtime
        .checked_add(threshold)
        .is_some_and(|deadline| SystemTime::now() > deadline);
    if book_mtime > cache_mtime && expired {
        Ok(CacheStatus::Outdated)
    } else {
        Ok(CacheStatus::Current)
    }
}

/// Human-readable size: MiB, KiB or bytes, whichever reads above 0.1.
pub fn format_size(bytes: u64) -> String {
    let mib = bytes as f64 / (1024.0 * 1024.0);
    if mib > 0.1 {
        format!("{:.1} MiB", mib)
    } else if mib * 1024.0 > 0.1 {
        format!("{:.1} KiB", mib * 1024.0)
    } else {
        format!("{} B", bytes)
    }
}

/// Read every `*.json` book in a directory, ordered by book id.
pub fn load_books(dir: &Path, options: &LoadOptions) -> Result<Vec<Book>> {
    if !dir.is_dir() {
        return Err(QuarryError::LibraryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let mut books = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "json") && !is_fulltext_file(&path) {
            books.push(load_book(&path, options)?);
        }
    }
    books.sort_by(|a, b| a.id.cmp(&b.id));

    info!(dir = %dir.display(), books = books.len(), "Library loaded");
    Ok(books)
}

/// Write a book file into a library directory, named after the book id.
pub fn save_book(dir: &Path, book: &Book) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.json", book.id));
    let contents = serde_json::to_string_pretty(book)?;
    fs::write(&path, contents)?;
    Ok(path)
}

/// Write a book's fulltext as a separate cache file next to its book file.
pub fn save_fulltext(dir: &Path, book: &Book) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}{}", book.id, FULLTEXT_SUFFIX));
    let contents = serde_json::to_string(&book.fulltext)?;
    fs::write(&path, contents)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ItemMeta, ROOT_ID};
    use tempfile::TempDir;

    fn book(id: &str, name: &str) -> Book {
        Book::new(id, name)
            .with_item(
                ROOT_ID,
                "item",
                ItemMeta {
                    title: Some(format!("{} item", name)),
                    ..Default::default()
                },
            )
            .with_segment("item", "index.html", "content")
    }

    fn without_fulltext(mut book: Book) -> Book {
        book.fulltext.clear();
        book
    }

    fn set_mtime(path: &Path, age: Duration) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    const DAY: Duration = Duration::from_secs(24 * 3600);

    #[test]
    fn test_open_missing_dir() {
        let temp_dir = TempDir::new().unwrap();
        let err = Library::open(temp_dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, QuarryError::LibraryNotFound { .. }));
    }

    #[test]
    fn test_save_and_open() {
        let temp_dir = TempDir::new().unwrap();
        save_book(temp_dir.path(), &book("b", "Second")).unwrap();
        save_book(temp_dir.path(), &book("a", "First")).unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "not a book").unwrap();

        let library = Library::open(temp_dir.path()).unwrap();
        let books = library.snapshot();
        assert_eq!(books.len(), 2);
        assert_eq!(books[0].id, "a");
        assert_eq!(books[1].name, "Second");
        assert_eq!(books[0].cache, CacheStatus::Current);
        assert_eq!(library.get("a").unwrap().name, "First");
        assert!(library.get("zzz").is_none());
    }

    #[test]
    fn test_corrupted_book() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("bad.json"), "{ not json").unwrap();
        let err = Library::open(temp_dir.path()).unwrap_err();
        assert!(matches!(err, QuarryError::BookCorrupted { .. }));
    }

    #[test]
    fn test_loose_meta_values_do_not_reject_book() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("loose.json"),
            r#"{
                "id": "loose",
                "name": "Loose",
                "meta": {
                    "a": {"title": "A", "marked": null},
                    "b": {"title": null, "marked": "true", "locked": 1}
                },
                "toc": {"root": ["a", "b"]}
            }"#,
        )
        .unwrap();

        let library = Library::open(temp_dir.path()).unwrap();
        let book = library.get("loose").unwrap();
        assert!(!book.meta["a"].marked);
        assert!(book.meta["b"].marked);
        assert!(book.meta["b"].locked);
        assert_eq!(book.cache, CacheStatus::Missing);
    }

    #[test]
    fn test_reload_keeps_old_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        save_book(temp_dir.path(), &book("a", "First")).unwrap();

        let library = Library::open(temp_dir.path()).unwrap();
        let before = library.snapshot();
        let gen1 = library.generation();

        save_book(temp_dir.path(), &book("b", "Second")).unwrap();
        library.reload().unwrap();

        assert_eq!(before.len(), 1);
        assert_eq!(library.len(), 2);
        assert!(library.generation() > gen1);
    }

    #[test]
    fn test_from_books_sorted() {
        let library = Library::from_books(vec![book("z", "Z"), book("m", "M")]);
        let ids: Vec<String> = library.snapshot().iter().map(|b| b.id.clone()).collect();
        assert_eq!(ids, vec!["m", "z"]);
        assert!(!library.is_empty());
    }

    #[test]
    fn test_separate_fulltext_cache() {
        let temp_dir = TempDir::new().unwrap();
        let full = book("a", "First");
        save_book(temp_dir.path(), &without_fulltext(full.clone())).unwrap();
        let cache = save_fulltext(temp_dir.path(), &full).unwrap();
        assert_eq!(cache, fulltext_path(&temp_dir.path().join("a.json")));

        let library = Library::open(temp_dir.path()).unwrap();
        assert_eq!(library.len(), 1);
        let loaded = library.get("a").unwrap();
        assert_eq!(loaded.cache, CacheStatus::Current);
        assert_eq!(loaded.records("item")[0].content(), "content");
    }

    #[test]
    fn test_missing_cache() {
        let temp_dir = TempDir::new().unwrap();
        let path = save_book(temp_dir.path(), &without_fulltext(book("a", "First"))).unwrap();
        let loaded = load_book(&path, &LoadOptions::default()).unwrap();
        assert_eq!(loaded.cache, CacheStatus::Missing);
    }

    #[test]
    fn test_outdated_cache() {
        let temp_dir = TempDir::new().unwrap();
        let full = book("a", "First");
        let path = save_book(temp_dir.path(), &without_fulltext(full.clone())).unwrap();
        let cache = save_fulltext(temp_dir.path(), &full).unwrap();
        set_mtime(&cache, 10 * DAY);
        set_mtime(&path, DAY);

        let options = LoadOptions {
            cache_update_threshold: Some(5 * DAY),
            cache_size_limit: None,
        };
        let loaded = load_book(&path, &options).unwrap();
        assert_eq!(loaded.cache, CacheStatus::Outdated);
        // Still searchable, only reported.
        assert!(loaded.has_fulltext());

        let lenient = LoadOptions {
            cache_update_threshold: Some(20 * DAY),
            ..options
        };
        assert_eq!(load_book(&path, &lenient).unwrap().cache, CacheStatus::Current);

        let disabled = LoadOptions {
            cache_update_threshold: None,
            ..options
        };
        assert_eq!(load_book(&path, &disabled).unwrap().cache, CacheStatus::Current);
    }

    #[test]
    fn test_cache_newer_than_book_is_current() {
        let temp_dir = TempDir::new().unwrap();
        let full = book("a", "First");
        let path = save_book(temp_dir.path(), &without_fulltext(full.clone())).unwrap();
        let cache = save_fulltext(temp_dir.path(), &full).unwrap();
        set_mtime(&path, 30 * DAY);
        set_mtime(&cache, 10 * DAY);

        let loaded = load_book(&path, &LoadOptions::default()).unwrap();
        assert_eq!(loaded.cache, CacheStatus::Current);
    }

    #[test]
    fn test_cache_over_size_limit_is_blocked() {
        let temp_dir = TempDir::new().unwrap();
        let full = book("a", "First");
        // Inline fulltext is dropped too once a blocked cache file exists.
        let path = save_book(temp_dir.path(), &full).unwrap();
        let cache = save_fulltext(temp_dir.path(), &full).unwrap();
        let size = fs::metadata(&cache).unwrap().len();

        let options = LoadOptions {
            cache_update_threshold: None,
            cache_size_limit: Some(size - 1),
        };
        let loaded = load_book(&path, &options).unwrap();
        assert_eq!(loaded.cache, CacheStatus::Blocked { size });
        assert!(!loaded.has_fulltext());
        assert_eq!(loaded.records("item")[0].content(), "");

        let options = LoadOptions {
            cache_size_limit: Some(size),
            ..options
        };
        let loaded = load_book(&path, &options).unwrap();
        assert_eq!(loaded.cache, CacheStatus::Current);
        assert!(loaded.has_fulltext());
    }

    #[test]
    fn test_library_applies_options_on_reload() {
        let temp_dir = TempDir::new().unwrap();
        let full = book("a", "First");
        save_book(temp_dir.path(), &without_fulltext(full.clone())).unwrap();

        let options = LoadOptions {
            cache_update_threshold: None,
            cache_size_limit: Some(1),
        };
        let library = Library::open_with(temp_dir.path(), options).unwrap();
        assert_eq!(library.get("a").unwrap().cache, CacheStatus::Missing);

        save_fulltext(temp_dir.path(), &full).unwrap();
        library.reload().unwrap();
        assert!(matches!(
            library.get("a").unwrap().cache,
            CacheStatus::Blocked { .. }
        ));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(50), "50 B");
        assert_eq!(format_size(2048), "2.0 KiB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MiB");
    }
}
