//! Tokenizer and parser for query strings.
//!
//! ## Query Syntax
//!
//! ```text
//! query   = (field | bare)*            separated by whitespace
//! field   = "-"* NAME ":" value        NAME is ASCII letters, case-sensitive
//! bare    = "-"* value                 routed to the current default field
//! value   = '"' chars '"' | chars      `""` inside quotes is one `"`
//! ```
//!
//! An odd number of leading dashes negates a term, an even number leaves it
//! positive. The flag commands `mc:`, `re:` and `default:` change how the
//! *following* terms are parsed; terms before them are unaffected:
//!
//! - `title:ABC mc: title:abc` compiles the first term case-insensitively
//!   and the second case-sensitively.
//! - `default:title foo` searches `foo` in titles only.
//!
//! Parsing never fails. Terms that cannot be compiled are dropped and
//! reported in [`Query::errors`]; unknown commands are dropped and reported
//! in [`Query::warnings`].

use crate::date::DateNormalizer;
use crate::pattern::{DateRange, PatternFlags, TextPattern};
use crate::query::{Field, Query, RulePredicate, SortField, SortKey, SortOrder, DEFAULT_FIELD};
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;
use tracing::debug;

/// One command-or-term per match.
///
/// Groups: 1 = command (dashes, name and colon, or a bare dash run),
/// 2/3 = quoted/unquoted command value, 4/5 = quoted/unquoted bare term.
static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(-*[A-Za-z]+:|-+)(?:"([^"]*(?:""[^"]*)*)"|([^"\s]*))|(?:"([^"]*(?:""[^"]*)*)"|([^"\s]+))"#,
    )
    .expect("valid token regex")
});

/// A single token of a query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    /// Command name without dashes or colon; `None` for bare terms
    pub command: Option<&'a str>,

    /// False when the term carried an odd number of leading dashes
    pub positive: bool,

    /// The decoded value
    pub value: Cow<'a, str>,
}

/// Split a query string into tokens.
///
/// Text that fits no token shape (such as an unmatched `"`) is skipped.
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    TOKEN
        .captures_iter(input)
        .map(|caps| {
            let group = |i: usize| caps.get(i).map(|m| m.as_str());

            let (prefix, quoted, plain) = match group(1) {
                Some(prefix) => (Some(prefix), group(2), group(3)),
                None => (None, group(4), group(5)),
            };

            let value = match quoted {
                Some(q) if q.contains("\"\"") => Cow::Owned(q.replace("\"\"", "\"")),
                Some(q) => Cow::Borrowed(q),
                None => Cow::Borrowed(plain.unwrap_or("")),
            };

            let (positive, command) = match prefix {
                Some(prefix) => {
                    let name = prefix.trim_start_matches('-');
                    let dashes = prefix.len() - name.len();
                    let command = name.strip_suffix(':').filter(|n| !n.is_empty());
                    (dashes % 2 == 0, command)
                }
                None => (true, None),
            };

            Token {
                command,
                positive,
                value,
            }
        })
        .collect()
}

/// A recognized command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Default,
    MatchCase,
    Regex,
    Book,
    Root,
    Sort,
    Rule(Field),
}

impl Command {
    fn from_name(name: &str) -> Option<Command> {
        match name {
            "default" => Some(Command::Default),
            "mc" => Some(Command::MatchCase),
            "re" => Some(Command::Regex),
            "book" => Some(Command::Book),
            "root" => Some(Command::Root),
            "sort" => Some(Command::Sort),
            other => Field::from_name(other).map(Command::Rule),
        }
    }
}

/// Parser state that flag commands change as tokens are consumed.
#[derive(Debug, Clone)]
struct ParserContext {
    flags: PatternFlags,
    default_field: String,
}

/// Parses query strings into [`Query`] values.
///
/// The parser itself holds only settings; all state that changes while a
/// string is parsed lives in a per-call context, so one parser can be shared
/// freely.
#[derive(Debug, Clone)]
pub struct QueryParser {
    normalizer: DateNormalizer,
    default_field: String,
}

impl Default for QueryParser {
    fn default() -> Self {
        QueryParser {
            normalizer: DateNormalizer::default(),
            default_field: DEFAULT_FIELD.to_string(),
        }
    }
}

impl QueryParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the time zone that date filters are converted into.
    pub fn with_normalizer(mut self, normalizer: DateNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Set the field bare terms go to before any `default:` command.
    pub fn with_default_field(mut self, field: impl Into<String>) -> Self {
        self.default_field = field.into();
        self
    }

    pub fn normalizer(&self) -> DateNormalizer {
        self.normalizer
    }

    /// Parse a query string.
    pub fn parse(&self, input: &str) -> Query {
        let mut query = Query::default();
        let mut ctx = ParserContext {
            flags: PatternFlags::default(),
            default_field: self.default_field.clone(),
        };

        for token in tokenize(input) {
            self.apply(&mut query, &mut ctx, token);
        }

        query.case_sensitive = ctx.flags.case_sensitive;
        query.use_regex = ctx.flags.use_regex;
        query.default_field = ctx.default_field;

        debug!(
            rules = query.rules.len(),
            sorts = query.sorts.len(),
            errors = query.errors.len(),
            "Parsed query"
        );

        query
    }

    fn apply(&self, query: &mut Query, ctx: &mut ParserContext, token: Token<'_>) {
        let name = token.command.unwrap_or(ctx.default_field.as_str());
        let positive = token.positive;
        let value = token.value;

        let Some(command) = Command::from_name(name) else {
            debug!(command = %name, "Ignoring unknown command");
            query
                .warnings
                .push(format!("unknown command ignored: {}:", name));
            return;
        };

        match command {
            Command::Default => ctx.default_field = value.into_owned(),
            Command::MatchCase => ctx.flags.case_sensitive = positive,
            Command::Regex => ctx.flags.use_regex = positive,
            Command::Book => query.book_scope.push(positive, value),
            Command::Root => query.root_scope.push(positive, value),
            Command::Sort => {
                let order = if positive {
                    SortOrder::Ascending
                } else {
                    SortOrder::Descending
                };
                query
                    .sorts
                    .push(SortKey::new(SortField::from_name(&value), order));
            }
            Command::Rule(field) => self.add_rule(query, ctx, field, positive, &value),
        }
    }

    fn add_rule(
        &self,
        query: &mut Query,
        ctx: &ParserContext,
        field: Field,
        positive: bool,
        value: &str,
    ) {
        let mut rule = query
            .rules
            .remove(&field)
            .unwrap_or_else(|| RulePredicate::for_field(field));

        let added = match &mut rule {
            RulePredicate::Text(text, terms) => {
                TextPattern::compile(value, text.match_mode(), ctx.flags)
                    .map(|pattern| terms.push(positive, pattern))
            }
            RulePredicate::Date(_, terms) => DateRange::parse(value, &self.normalizer)
                .map(|range| terms.push(positive, range)),
            RulePredicate::Presence(_, terms) => {
                terms.push(positive, ());
                Ok(())
            }
        };

        if let Err(err) = added {
            debug!(field = %field, term = %err.term(), "Dropping term");
            query.errors.push(err);
        }
        if !rule.is_empty() {
            query.rules.insert(field, rule);
        }
    }
}

/// Parse a query string with default settings.
pub fn parse_query(input: &str) -> Query {
    QueryParser::default().parse(input)
}

/// Quote a value so it reads back as a single token.
pub fn quote_term(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Build the effective query string for a search.
///
/// Selected books come first as `book:` terms, then `root:` terms for
/// explicitly requested subtrees, then the configured default search, and
/// finally the user's own input, so user terms see any flags the default
/// search sets.
pub fn compose_query(books: &[&str], roots: &[&str], default_search: &str, input: &str) -> String {
    let scoped = books
        .iter()
        .map(|b| format!("book:{}", quote_term(b)))
        .chain(roots.iter().map(|r| format!("root:{}", quote_term(r))));

    scoped
        .chain([default_search.to_string(), input.to_string()])
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
