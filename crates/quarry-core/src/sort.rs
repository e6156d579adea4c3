//! Multi-key ordering of matched records.

use crate::query::{SortField, SortKey, SortOrder};
use crate::types::Record;
use std::borrow::Cow;
use std::cmp::Ordering;

/// The value a sort key compares on; absent values compare as `""`.
pub fn sort_value<'a>(record: &Record<'a>, field: &SortField) -> Cow<'a, str> {
    match field {
        SortField::Id => Cow::Borrowed(record.id),
        SortField::File => Cow::Borrowed(record.file),
        SortField::Content => Cow::Borrowed(record.content()),
        SortField::Meta(key) => record
            .meta
            .and_then(|m| m.field(key))
            .unwrap_or(Cow::Borrowed("")),
    }
}

/// Compare two records by a list of keys, the first key being primary.
pub fn compare(a: &Record<'_>, b: &Record<'_>, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let ord = sort_value(a, &key.field).cmp(&sort_value(b, &key.field));
        let ord = match key.order {
            SortOrder::Ascending => ord,
            SortOrder::Descending => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Stable sort; records equal on every key keep their relative order.
pub fn sort_records(records: &mut [Record<'_>], keys: &[SortKey]) {
    if keys.is_empty() {
        return;
    }
    records.sort_by(|a, b| compare(a, b, keys));
}
