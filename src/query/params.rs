// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Query-string parsing
//!
//! Two parameter dialects are accepted:
//!
//! - Legacy: `conditions=k1=v1,k2=v2`, `orderBy=name`, `reverse=true`,
//!   `paging=limit=10,page=2`. Selected when any of these keys is present.
//! - Current: `limit=10&page=2&sortBy=name&ascending=true`, where every
//!   other key becomes a filter (`?name=web&status=running`).
//!
//! `labelSelector` is honored by both. Malformed paging, page, limit or
//! boolean values never fail: the default for that parameter applies.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use super::{LabelSelector, Pagination, Query, field};
use crate::error::Result;

/// Page size applied by the legacy dialect when `paging` is absent or malformed
pub const DEFAULT_LIMIT: i64 = 65535;

pub const PARAM_CONDITIONS: &str = "conditions";
pub const PARAM_ORDER_BY: &str = "orderBy";
pub const PARAM_REVERSE: &str = "reverse";
pub const PARAM_PAGING: &str = "paging";

pub const PARAM_LIMIT: &str = "limit";
pub const PARAM_PAGE: &str = "page";
pub const PARAM_SORT_BY: &str = "sortBy";
pub const PARAM_ASCENDING: &str = "ascending";
pub const PARAM_LABEL_SELECTOR: &str = "labelSelector";

const LEGACY_PARAMS: &[&str] = &[PARAM_CONDITIONS, PARAM_ORDER_BY, PARAM_REVERSE, PARAM_PAGING];

const RESERVED_PARAMS: &[&str] = &[
    PARAM_LIMIT,
    PARAM_PAGE,
    PARAM_SORT_BY,
    PARAM_ASCENDING,
    PARAM_LABEL_SELECTOR,
];

static PAGING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^limit=(\d+),page=(\d+)$").expect("paging pattern is valid"));

/// Build a [`Query`] from decoded query-string pairs.
///
/// Only an unparseable `labelSelector` is an error.
pub fn parse_query(params: &[(String, String)]) -> Result<Query> {
    let legacy = params
        .iter()
        .any(|(k, _)| LEGACY_PARAMS.contains(&k.as_str()));

    let mut query = if legacy {
        parse_legacy(params)
    } else {
        parse_current(params)
    };

    if let Some(raw) = lookup(params, PARAM_LABEL_SELECTOR) {
        query = query.with_label_selector(LabelSelector::parse(raw)?);
    }

    debug!(
        legacy,
        sort_by = %query.sort_by,
        ascending = query.ascending,
        limit = query.pagination.limit,
        offset = query.pagination.offset,
        filters = query.filters.len(),
        "Parsed list query"
    );

    Ok(query)
}

fn parse_legacy(params: &[(String, String)]) -> Query {
    let mut query = Query::new();

    if let Some(conditions) = lookup(params, PARAM_CONDITIONS) {
        for (key, value) in parse_conditions(conditions) {
            query.filters.insert(key.to_string(), value.to_string());
        }
    }

    if let Some(order_by) = lookup(params, PARAM_ORDER_BY).filter(|v| !v.is_empty()) {
        query.sort_by = order_by.to_string();
    }

    if let Some(reverse) = lookup(params, PARAM_REVERSE).and_then(parse_bool) {
        query.ascending = !reverse;
    }

    let (limit, offset) = lookup(params, PARAM_PAGING)
        .and_then(parse_paging)
        .unwrap_or((DEFAULT_LIMIT, 0));
    query.pagination = Pagination::new(limit, offset);

    query
}

fn parse_current(params: &[(String, String)]) -> Query {
    let mut query = Query::new();

    let limit = lookup(params, PARAM_LIMIT)
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(0);
    let page = lookup(params, PARAM_PAGE)
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(1)
        .max(1);
    let offset = if limit > 0 {
        (page - 1).saturating_mul(limit)
    } else {
        0
    };
    query.pagination = Pagination::new(limit, offset);

    query.sort_by = lookup(params, PARAM_SORT_BY)
        .filter(|v| !v.is_empty())
        .unwrap_or(field::CREATION_TIMESTAMP)
        .to_string();
    query.ascending = lookup(params, PARAM_ASCENDING)
        .and_then(parse_bool)
        .unwrap_or(false);

    for (key, value) in params {
        if !RESERVED_PARAMS.contains(&key.as_str()) {
            query.filters.insert(key.clone(), value.clone());
        }
    }

    query
}

/// `limit=<N>,page=<M>` into `(limit, offset)`; `None` when malformed
pub fn parse_paging(paging: &str) -> Option<(i64, i64)> {
    let caps = PAGING_RE.captures(paging)?;
    let limit: i64 = caps[1].parse().ok()?;
    let page: i64 = caps[2].parse().ok()?;
    let page = page.max(1);
    Some((limit, (page - 1).saturating_mul(limit)))
}

/// `k1=v1,k2=v2` pairs. Items without `=` or with an empty key are skipped.
pub fn parse_conditions(conditions: &str) -> Vec<(&str, &str)> {
    conditions
        .split(',')
        .filter_map(|item| item.split_once('='))
        .map(|(k, v)| (k.trim(), v.trim()))
        .filter(|(k, _)| !k.is_empty())
        .collect()
}

/// Boolean spellings accepted by the API (`1`, `t`, `TRUE`, `false`, ...)
fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// Last value wins for repeated keys
fn lookup<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_paging_second_page() {
        let q = parse_query(&params(&[("paging", "limit=10,page=2")])).unwrap();
        assert_eq!(q.pagination, Pagination::new(10, 10));
    }

    #[test]
    fn test_paging_page_zero_clamped() {
        let q = parse_query(&params(&[("paging", "limit=5,page=0")])).unwrap();
        assert_eq!(q.pagination, Pagination::new(5, 0));
    }

    #[test]
    fn test_paging_garbage_uses_defaults() {
        let q = parse_query(&params(&[("paging", "garbage")])).unwrap();
        assert_eq!(q.pagination, Pagination::new(DEFAULT_LIMIT, 0));

        let q = parse_query(&params(&[("paging", "limit=-1,page=2")])).unwrap();
        assert_eq!(q.pagination, Pagination::new(DEFAULT_LIMIT, 0));
    }

    #[test]
    fn test_paging_absent_in_legacy_mode() {
        let q = parse_query(&params(&[("orderBy", "name")])).unwrap();
        assert_eq!(q.pagination, Pagination::new(DEFAULT_LIMIT, 0));
        assert_eq!(q.sort_by, "name");
    }

    #[test]
    fn test_paging_overflow_is_malformed() {
        assert_eq!(parse_paging("limit=99999999999999999999,page=1"), None);
    }

    #[test]
    fn test_reverse() {
        let q = parse_query(&params(&[("reverse", "true")])).unwrap();
        assert!(!q.ascending);
        let q = parse_query(&params(&[("reverse", "false")])).unwrap();
        assert!(q.ascending);
        let q = parse_query(&params(&[("reverse", "maybe")])).unwrap();
        assert!(!q.ascending);
    }

    #[test]
    fn test_conditions() {
        let q = parse_query(&params(&[(
            "conditions",
            "name=web,status=running,bogus,=empty",
        )]))
        .unwrap();
        assert_eq!(q.filters.len(), 2);
        assert_eq!(q.filters["name"], "web");
        assert_eq!(q.filters["status"], "running");
    }

    #[test]
    fn test_current_dialect() {
        let q = parse_query(&params(&[
            ("limit", "10"),
            ("page", "3"),
            ("sortBy", "name"),
            ("ascending", "true"),
            ("namespace", "default"),
            ("label", "app=web"),
        ]))
        .unwrap();
        assert_eq!(q.pagination, Pagination::new(10, 20));
        assert_eq!(q.sort_by, "name");
        assert!(q.ascending);
        assert_eq!(q.filters.len(), 2);
        assert_eq!(q.filters["label"], "app=web");
    }

    #[test]
    fn test_current_dialect_defaults() {
        let q = parse_query(&[]).unwrap();
        assert_eq!(q, Query::default());

        let q = parse_query(&params(&[("limit", "x"), ("page", "y")])).unwrap();
        assert_eq!(q.pagination, Pagination::ALL);
    }

    #[test]
    fn test_label_selector_both_dialects() {
        let q = parse_query(&params(&[("labelSelector", "app=web")])).unwrap();
        assert_eq!(q.label_selector.unwrap().to_string(), "app=web");
        assert!(q.filters.is_empty());

        let q = parse_query(&params(&[("paging", "limit=1,page=1"), ("labelSelector", "app")]))
            .unwrap();
        assert!(q.label_selector.is_some());
    }

    #[test]
    fn test_invalid_label_selector_is_error() {
        let err = parse_query(&params(&[("labelSelector", "env in (a")])).unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_repeated_key_last_wins() {
        let q = parse_query(&params(&[("sortBy", "name"), ("sortBy", "createTime")])).unwrap();
        assert_eq!(q.sort_by, "createTime");
    }
}
