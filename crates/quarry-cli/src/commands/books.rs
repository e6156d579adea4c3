//! Books command - list the books in the library.

use crate::app::App;
use quarry_core::library::format_size;
use quarry_core::{Book, CacheStatus, Config};

/// Run the books command.
pub fn run(config: Config) -> anyhow::Result<()> {
    let app = App::new(config)?;
    let books = app.library.snapshot();

    println!("Quarry Library");
    println!("==============");
    println!();

    if books.is_empty() {
        println!("No books found.");
    }

    for book in books.iter() {
        println!(
            "  {} [{}] {} items, {} with fulltext {}",
            book.name,
            book.id,
            book.meta.len(),
            book.fulltext.len(),
            status(book)
        );
    }

    println!();
    println!("Library directory: {}", app.library.dir().display());

    Ok(())
}

fn status(book: &Book) -> String {
    if book.no_tree {
        return "(no tree, not searched)".to_string();
    }
    match book.cache {
        CacheStatus::Current => String::new(),
        CacheStatus::Missing => "(no fulltext cache)".to_string(),
        CacheStatus::Outdated => "(fulltext cache outdated)".to_string(),
        CacheStatus::Blocked { size } => {
            format!("(fulltext cache of {} over size limit, not loaded)", format_size(size))
        }
    }
}
