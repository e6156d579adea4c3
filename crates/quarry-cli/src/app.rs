//! Application state management.

use quarry_core::{Config, Library, QueryParser};
use tracing::info;

/// Shared application state.
pub struct App {
    /// Configuration
    pub config: Config,

    /// Parser carrying the configured time zone and default field
    pub parser: QueryParser,

    /// The loaded books
    pub library: Library,
}

impl App {
    /// Create a new application instance.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let parser = config.parser()?;
        let library_dir = config.library_dir()?;
        let library = Library::open_with(&library_dir, config.load_options())?;

        info!(
            library = %library_dir.display(),
            books = library.len(),
            timezone = %parser.normalizer(),
            "Application initialized"
        );

        Ok(App {
            config,
            parser,
            library,
        })
    }
}
