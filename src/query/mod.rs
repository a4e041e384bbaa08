// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Declarative list requests
//!
//! A [`Query`] describes which objects of a collection a caller wants:
//! a label selector pushed down to the cache, field filters evaluated in
//! process, a sort key with direction, and a page window. It carries no
//! mutable state and can be shared between concurrent list calls.

pub mod params;
pub mod selector;

pub use params::{DEFAULT_LIMIT, parse_query};
pub use selector::LabelSelector;

use std::collections::BTreeMap;

/// Filter and sort field names understood by the default comparer/filterer
pub mod field {
    pub const NAME: &str = "name";
    pub const NAMES: &str = "names";
    pub const UID: &str = "uid";
    pub const NAMESPACE: &str = "namespace";
    pub const STATUS: &str = "status";
    pub const OWNER_REFERENCE: &str = "ownerReference";
    pub const OWNER_KIND: &str = "ownerKind";
    pub const ANNOTATION: &str = "annotation";
    pub const LABEL: &str = "label";
    pub const KEYWORD: &str = "keyword";
    pub const TYPE: &str = "type";
    pub const CREATION_TIMESTAMP: &str = "creationTimestamp";
    pub const CREATE_TIME: &str = "createTime";
}

/// A single field predicate handed to a filterer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Filter<'a> {
    pub field: &'a str,
    pub value: &'a str,
}

/// Page window over a filtered, sorted collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Maximum number of items; `<= 0` returns everything after `offset`
    pub limit: i64,
    pub offset: i64,
}

impl Pagination {
    pub const ALL: Pagination = Pagination {
        limit: 0,
        offset: 0,
    };

    pub fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }

    /// Slice bounds for a collection of `total` items. Never out of range.
    pub fn range(&self, total: usize) -> (usize, usize) {
        let offset = usize::try_from(self.offset.max(0)).unwrap_or(usize::MAX);
        let start = offset.min(total);
        let end = if self.limit <= 0 {
            total
        } else {
            let limit = usize::try_from(self.limit).unwrap_or(usize::MAX);
            start.saturating_add(limit).min(total)
        };
        (start, end)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::ALL
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub label_selector: Option<LabelSelector>,
    pub filters: BTreeMap<String, String>,
    pub sort_by: String,
    pub ascending: bool,
    pub pagination: Pagination,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            label_selector: None,
            filters: BTreeMap::new(),
            sort_by: field::CREATION_TIMESTAMP.to_string(),
            ascending: false,
            pagination: Pagination::ALL,
        }
    }
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>) -> Self {
        self.sort_by = field.into();
        self
    }

    pub fn ascending(mut self, ascending: bool) -> Self {
        self.ascending = ascending;
        self
    }

    pub fn paginate(mut self, limit: i64, offset: i64) -> Self {
        self.pagination = Pagination::new(limit, offset);
        self
    }

    pub fn with_label_selector(mut self, selector: LabelSelector) -> Self {
        self.label_selector = if selector.is_empty() {
            None
        } else {
            Some(selector)
        };
        self
    }

    /// Filters as predicates, in key order
    pub fn iter_filters(&self) -> impl Iterator<Item = Filter<'_>> {
        self.filters.iter().map(|(field, value)| Filter {
            field: field.as_str(),
            value: value.as_str(),
        })
    }
}
