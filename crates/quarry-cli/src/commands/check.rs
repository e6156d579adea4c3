//! Check command - show how a query is understood without running it.

use quarry_core::{Config, Query, RulePredicate, Scope, SortOrder};

/// Run the check command.
pub fn run(config: Config, input: &str) -> anyhow::Result<()> {
    let parser = config.parser()?;
    let query = parser.parse(input);

    for line in describe(&query) {
        println!("{}", line);
    }

    if !query.is_valid() {
        anyhow::bail!("query has {} error(s)", query.errors.len());
    }
    Ok(())
}

/// Render a parsed query as readable lines.
pub fn describe(query: &Query) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push("Rules:".to_string());
    if query.rules.is_empty() {
        lines.push("  (none, every item matches)".to_string());
    }
    for (field, predicate) in &query.rules {
        match predicate {
            RulePredicate::Text(_, terms) => {
                for pattern in &terms.include {
                    lines.push(format!("  {} ~ {}", field, pattern));
                }
                for pattern in &terms.exclude {
                    lines.push(format!("  {} !~ {}", field, pattern));
                }
            }
            RulePredicate::Date(_, terms) => {
                for range in &terms.include {
                    lines.push(format!("  {} in {}..={}", field, range.since, range.until));
                }
                for range in &terms.exclude {
                    lines.push(format!("  {} not in {}..={}", field, range.since, range.until));
                }
            }
            RulePredicate::Presence(_, terms) => {
                if !terms.include.is_empty() {
                    lines.push(format!("  {} is set", field));
                }
                if !terms.exclude.is_empty() {
                    lines.push(format!("  {} is unset", field));
                }
            }
        }
    }

    if !query.sorts.is_empty() {
        lines.push("Sort:".to_string());
        for key in &query.sorts {
            let order = match key.order {
                SortOrder::Ascending => "ascending",
                SortOrder::Descending => "descending",
            };
            lines.push(format!("  {} {}", key.field, order));
        }
    }

    push_scope(&mut lines, "Books", &query.book_scope);
    push_scope(&mut lines, "Roots", &query.root_scope);

    lines.push(format!(
        "Flags: case_sensitive={} regex={} default={}",
        query.case_sensitive, query.use_regex, query.default_field
    ));

    for warning in &query.warnings {
        lines.push(format!("warning: {}", warning));
    }
    for message in query.error_messages() {
        lines.push(format!("error: {}", message));
    }

    lines
}

fn push_scope(lines: &mut Vec<String>, label: &str, scope: &Scope) {
    if scope.include.is_empty() && scope.exclude.is_empty() {
        return;
    }
    lines.push(format!("{}:", label));
    for name in &scope.include {
        lines.push(format!("  + {}", name));
    }
    for name in &scope.exclude {
        lines.push(format!("  - {}", name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_core::parse_query;

    #[test]
    fn test_describe_empty_query() {
        let lines = describe(&parse_query(""));
        assert_eq!(lines[0], "Rules:");
        assert_eq!(lines[1], "  (none, every item matches)");
        assert_eq!(
            lines.last().unwrap(),
            "Flags: case_sensitive=false regex=false default=tcc"
        );
    }

    #[test]
    fn test_describe_scopes_and_sorts() {
        let lines = describe(&parse_query("book:Main -root:trash -sort:create"));
        assert!(lines.contains(&"Sort:".to_string()));
        assert!(lines.contains(&"  meta.create descending".to_string()));
        assert!(lines.contains(&"Books:".to_string()));
        assert!(lines.contains(&"  + Main".to_string()));
        assert!(lines.contains(&"  - trash".to_string()));
    }

    #[test]
    fn test_describe_errors() {
        let lines = describe(&parse_query("create:abc"));
        assert_eq!(lines.last().unwrap(), "error: invalid date: abc");
    }
}
