//! Search command - run a query over the library.

use crate::app::App;
use crate::OutputFormat;
use quarry_core::{compose_query, search, Book, Config, Record};
use std::time::Instant;
use tracing::warn;

/// Run the search command.
pub fn run(
    config: Config,
    input: &str,
    books: &[String],
    roots: &[String],
    limit: Option<usize>,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let app = App::new(config)?;

    if app.library.is_empty() {
        eprintln!(
            "No books found in {}. Add book files first.",
            app.library.dir().display()
        );
        return Ok(());
    }

    let books: Vec<&str> = books.iter().map(String::as_str).collect();
    let roots: Vec<&str> = roots.iter().map(String::as_str).collect();
    let text = compose_query(&books, &roots, &app.config.search.default_search, input);
    let query = app.parser.parse(&text);

    for warning in &query.warnings {
        warn!("{}", warning);
    }

    let limit = limit.unwrap_or(app.config.general.max_results);
    let snapshot = app.library.snapshot();

    let start = Instant::now();
    let results = match search(&query, &snapshot, app.config.search_options()) {
        Ok(results) => results,
        Err(err) if err.is_query_error() => {
            for message in query.error_messages() {
                eprintln!("error: {}", message);
            }
            anyhow::bail!("query could not be parsed");
        }
        Err(err) => return Err(err.into()),
    };
    let elapsed = start.elapsed();

    match output {
        OutputFormat::Text => {
            let mut total = 0;
            for book_results in &results {
                total += book_results.len();
                println!("{} ({})", book_results.book.name, book_results.len());
                for record in book_results.records.iter().take(limit) {
                    println!("  {}", text_line(record));
                }
                if book_results.len() > limit {
                    println!("  ... {} more", book_results.len() - limit);
                }
            }

            eprintln!();
            eprintln!(
                "Found {} results in {} books in {:.3}ms",
                total,
                results.len(),
                elapsed.as_secs_f64() * 1000.0
            );
        }
        OutputFormat::Json => {
            let json_results: Vec<serde_json::Value> = results
                .iter()
                .flat_map(|r| {
                    r.records
                        .iter()
                        .take(limit)
                        .map(move |record| record_json(r.book, record))
                })
                .collect();

            println!("{}", serde_json::to_string_pretty(&json_results)?);
        }
    }

    Ok(())
}

fn text_line(record: &Record<'_>) -> String {
    let title = record
        .meta
        .and_then(|m| m.title.as_deref())
        .unwrap_or("");
    if record.file.is_empty() {
        format!("{}  {}", record.id, title)
    } else {
        format!("{}  {}  [{}]", record.id, title, record.file)
    }
}

fn record_json(book: &Book, record: &Record<'_>) -> serde_json::Value {
    let meta = record.meta;
    serde_json::json!({
        "book": book.name,
        "id": record.id,
        "file": record.file,
        "title": meta.and_then(|m| m.title.as_deref()),
        "type": meta.and_then(|m| m.item_type.as_deref()),
        "source": meta.and_then(|m| m.source.as_deref()),
        "create": meta.and_then(|m| m.create.as_deref()),
        "modify": meta.and_then(|m| m.modify.as_deref()),
    })
}
