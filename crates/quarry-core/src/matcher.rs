//! Evaluation of a query's rules against one record.
//!
//! Every rule in the query must pass. How a rule passes depends on its
//! field:
//!
//! | fields | includes | excludes |
//! |---|---|---|
//! | substring text (`title`, `tcc`, ...) | all must match | none may match |
//! | exact text (`id`, `type`) | any may match | none may match |
//! | dates (`create`, `modify`) | value inside every range | value outside every range |
//! | flags (`marked`, `locked`) | flag set | flag unset |
//!
//! Missing text is treated as the empty string; a missing timestamp never
//! passes a date rule.

use crate::pattern::{DateRange, MatchMode, TextPattern};
use crate::query::{DateField, FlagField, Query, RulePredicate, Terms, TextField};
use crate::types::{ItemMeta, Record};
use std::borrow::Cow;

/// Check whether a record satisfies every rule of a query.
///
/// Records without metadata never match.
pub fn matches(query: &Query, record: &Record<'_>) -> bool {
    let Some(meta) = record.meta else {
        return false;
    };

    query
        .rules
        .values()
        .all(|rule| match_rule(rule, record, meta))
}

fn match_rule(rule: &RulePredicate, record: &Record<'_>, meta: &ItemMeta) -> bool {
    match rule {
        RulePredicate::Text(field, terms) => {
            let text = field_text(*field, record, meta);
            match field.match_mode() {
                MatchMode::Exact => match_text_any(terms, &text),
                MatchMode::Substring => match_text_all(terms, &text),
            }
        }
        RulePredicate::Date(field, terms) => {
            let value = match field {
                DateField::Create => meta.create.as_deref(),
                DateField::Modify => meta.modify.as_deref(),
            };
            match_date(terms, value)
        }
        RulePredicate::Presence(field, terms) => {
            let flag = match field {
                FlagField::Marked => meta.marked,
                FlagField::Locked => meta.locked,
            };
            match_flag(terms, flag)
        }
    }
}

fn field_text<'a>(field: TextField, record: &Record<'a>, meta: &'a ItemMeta) -> Cow<'a, str> {
    let text = |v: &'a Option<String>| Cow::Borrowed(v.as_deref().unwrap_or(""));
    match field {
        TextField::Tcc => Cow::Owned(record.tcc_text()),
        TextField::Content => Cow::Borrowed(record.content()),
        TextField::Id => Cow::Borrowed(record.id),
        TextField::File => Cow::Borrowed(record.file),
        TextField::Title => text(&meta.title),
        TextField::Comment => text(&meta.comment),
        TextField::Source => text(&meta.source),
        TextField::Icon => text(&meta.icon),
        TextField::Type => text(&meta.item_type),
    }
}

/// No exclude may match and every include must match.
pub fn match_text_all(terms: &Terms<TextPattern>, text: &str) -> bool {
    !terms.exclude.iter().any(|p| p.is_match(text))
        && terms.include.iter().all(|p| p.is_match(text))
}

/// No exclude may match and, if there are includes, at least one must.
pub fn match_text_any(terms: &Terms<TextPattern>, text: &str) -> bool {
    if terms.exclude.iter().any(|p| p.is_match(text)) {
        return false;
    }
    terms.include.is_empty() || terms.include.iter().any(|p| p.is_match(text))
}

/// The timestamp must exist, fall outside every exclude range and inside
/// every include range.
pub fn match_date(terms: &Terms<DateRange>, value: Option<&str>) -> bool {
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return false;
    };
    !terms.exclude.iter().any(|r| r.contains(value))
        && terms.include.iter().all(|r| r.contains(value))
}

/// Only the presence of include or exclude terms matters.
pub fn match_flag(terms: &Terms<()>, flag: bool) -> bool {
    if !terms.exclude.is_empty() && flag {
        return false;
    }
    if !terms.include.is_empty() && !flag {
        return false;
    }
    true
}
