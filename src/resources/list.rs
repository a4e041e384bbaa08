// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! The list pipeline: filter, then sort, then paginate
//!
//! [`default_list`] works on an already materialized collection and never
//! fails. The comparer and filterer are supplied by the caller; the
//! metadata-based defaults live here as well.

use serde::Serialize;
use std::cmp::Ordering;

use crate::kubernetes::ObjectMetaAccessor;
use crate::query::{Filter, Query, field};

/// One page of a filtered, sorted collection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResult<T> {
    pub items: Vec<T>,
    /// Number of items that passed the filters, before pagination
    pub total_items: usize,
}

impl<T> ListResult<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> ListResult<U> {
        ListResult {
            items: self.items.into_iter().map(f).collect(),
            total_items: self.total_items,
        }
    }
}

/// Apply `query` to `items`.
///
/// `compare` returns the ascending order of two items for a field;
/// `filter` decides whether an item satisfies one filter.
pub fn default_list<T, C, F>(mut items: Vec<T>, query: &Query, compare: C, filter: F) -> ListResult<T>
where
    C: Fn(&T, &T, &str) -> Ordering,
    F: Fn(&T, &Filter<'_>) -> bool,
{
    if !query.filters.is_empty() {
        items.retain(|item| query.iter_filters().all(|f| filter(item, &f)));
    }

    // sort_by is stable; reversing an Equal keeps ties in input order
    items.sort_by(|l, r| {
        let ordering = compare(l, r, &query.sort_by);
        if query.ascending { ordering } else { ordering.reverse() }
    });

    let total_items = items.len();
    let (start, end) = query.pagination.range(total_items);
    items.truncate(end);
    items.drain(..start);

    ListResult { items, total_items }
}

/// Compare two strings treating runs of ASCII digits as numbers,
/// so `item-2` sorts before `item-10`
pub fn natural_cmp(left: &str, right: &str) -> Ordering {
    let (mut l, mut r) = (left.as_bytes(), right.as_bytes());

    loop {
        match (l.first(), r.first()) {
            (None, None) => return left.cmp(right),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(a), Some(b)) if a.is_ascii_digit() && b.is_ascii_digit() => {
                let (ld, lrest) = split_digits(l);
                let (rd, rrest) = split_digits(r);
                let (lt, rt) = (trim_zeros(ld), trim_zeros(rd));
                let ordering = lt.len().cmp(&rt.len()).then_with(|| lt.cmp(rt));
                if ordering != Ordering::Equal {
                    return ordering;
                }
                (l, r) = (lrest, rrest);
            }
            (Some(a), Some(b)) => {
                if a != b {
                    return a.cmp(b);
                }
                (l, r) = (&l[1..], &r[1..]);
            }
        }
    }
}

fn split_digits(s: &[u8]) -> (&[u8], &[u8]) {
    let n = s.iter().take_while(|b| b.is_ascii_digit()).count();
    s.split_at(n)
}

fn trim_zeros(digits: &[u8]) -> &[u8] {
    let n = digits.iter().take_while(|&&b| b == b'0').count();
    &digits[n..]
}

/// Metadata-based comparer.
///
/// `name` orders by name; every other field orders by creation time with
/// the name breaking ties. Objects without a creation time sort first.
pub fn default_compare<T: ObjectMetaAccessor + ?Sized>(left: &T, right: &T, sort_by: &str) -> Ordering {
    match sort_by {
        field::NAME => natural_cmp(left.name(), right.name()),
        _ => left
            .creation_timestamp()
            .cmp(&right.creation_timestamp())
            .then_with(|| natural_cmp(left.name(), right.name())),
    }
}

/// Match a `key`, `key=value` or `key!=value` expression against a map
fn match_key_value(map: &std::collections::BTreeMap<String, String>, expr: &str) -> bool {
    if let Some((key, value)) = expr.split_once("!=") {
        return map.get(key).is_none_or(|v| v != value);
    }
    match expr.split_once('=') {
        Some((key, value)) => map.get(key).is_some_and(|v| v == value),
        None => map.contains_key(expr),
    }
}

/// Metadata-based filterer.
///
/// Returns `None` for fields outside its vocabulary so the caller can
/// decide what an unrecognized field means.
pub fn default_filter<T: ObjectMetaAccessor + ?Sized>(obj: &T, filter: &Filter<'_>) -> Option<bool> {
    let value = filter.value;
    let matched = match filter.field {
        field::NAME => obj.name().contains(value),
        field::NAMES => value.split(',').any(|n| n.trim() == obj.name()),
        field::UID => obj.uid() == value,
        field::NAMESPACE => obj.namespace() == Some(value),
        field::OWNER_REFERENCE => obj.owner_references().iter().any(|o| o.uid == value),
        field::OWNER_KIND => obj.owner_references().iter().any(|o| o.kind == value),
        field::LABEL => match_key_value(obj.labels(), value),
        field::ANNOTATION => match_key_value(obj.annotations(), value),
        field::KEYWORD => obj.name().to_lowercase().contains(&value.to_lowercase()),
        _ => return None,
    };
    Some(matched)
}
