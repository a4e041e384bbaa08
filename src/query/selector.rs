// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Kubernetes label selectors
//!
//! Supports the string form accepted by `kubectl -l` and the `labelSelector`
//! query parameter:
//!
//! - Equality: `app=nginx`, `app==nginx`, `tier!=cache`
//! - Set-based: `env in (prod, staging)`, `env notin (dev)`
//! - Existence: `release`, `!release`
//!
//! Requirements are comma-separated and ANDed together. Commas inside a
//! set `( ... )` belong to the set.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};

/// Operator of a single label requirement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelOperator {
    Equals(String),
    NotEquals(String),
    In(Vec<String>),
    NotIn(Vec<String>),
    Exists,
    DoesNotExist,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRequirement {
    pub key: String,
    pub operator: LabelOperator,
}

impl LabelRequirement {
    fn new(key: &str, operator: LabelOperator) -> Self {
        Self {
            key: key.to_string(),
            operator,
        }
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        let actual = labels.get(&self.key);
        match &self.operator {
            LabelOperator::Equals(expected) => actual == Some(expected),
            // A missing label satisfies `!=`, as in Kubernetes
            LabelOperator::NotEquals(expected) => actual != Some(expected),
            LabelOperator::In(values) => actual.is_some_and(|v| values.contains(v)),
            LabelOperator::NotIn(values) => actual.is_none_or(|v| !values.contains(v)),
            LabelOperator::Exists => actual.is_some(),
            LabelOperator::DoesNotExist => actual.is_none(),
        }
    }
}

impl fmt::Display for LabelRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operator {
            LabelOperator::Equals(v) => write!(f, "{}={}", self.key, v),
            LabelOperator::NotEquals(v) => write!(f, "{}!={}", self.key, v),
            LabelOperator::In(vs) => write!(f, "{} in ({})", self.key, vs.join(",")),
            LabelOperator::NotIn(vs) => write!(f, "{} notin ({})", self.key, vs.join(",")),
            LabelOperator::Exists => write!(f, "{}", self.key),
            LabelOperator::DoesNotExist => write!(f, "!{}", self.key),
        }
    }
}

/// A conjunction of label requirements. The empty selector matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    requirements: Vec<LabelRequirement>,
}

impl LabelSelector {
    pub fn parse(raw: &str) -> Result<Self> {
        let mut requirements = Vec::new();
        for term in split_terms(raw) {
            requirements.push(parse_requirement(term)?);
        }
        Ok(Self { requirements })
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn requirements(&self) -> &[LabelRequirement] {
        &self.requirements
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements.iter().all(|r| r.matches(labels))
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.requirements.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

fn invalid(term: &str, reason: &str) -> Error {
    Error::InvalidLabelSelector(format!("'{}': {}", term, reason))
}

fn parse_requirement(term: &str) -> Result<LabelRequirement> {
    if let Some(key) = term.strip_prefix('!') {
        let key = key.trim();
        validate_key(term, key)?;
        return Ok(LabelRequirement::new(key, LabelOperator::DoesNotExist));
    }

    if let Some(open) = term.find('(') {
        return parse_set(term, open);
    }

    // Order matters: `!=` and `==` before `=`
    if let Some((key, value)) = term.split_once("!=") {
        let key = key.trim();
        validate_key(term, key)?;
        return Ok(LabelRequirement::new(
            key,
            LabelOperator::NotEquals(value.trim().to_string()),
        ));
    }
    if let Some((key, value)) = term.split_once("==").or_else(|| term.split_once('=')) {
        let key = key.trim();
        validate_key(term, key)?;
        return Ok(LabelRequirement::new(
            key,
            LabelOperator::Equals(value.trim().to_string()),
        ));
    }

    validate_key(term, term)?;
    Ok(LabelRequirement::new(term, LabelOperator::Exists))
}

fn parse_set(term: &str, open: usize) -> Result<LabelRequirement> {
    let close = term
        .rfind(')')
        .filter(|&close| close > open)
        .ok_or_else(|| invalid(term, "unbalanced parentheses"))?;
    if !term[close + 1..].trim().is_empty() {
        return Err(invalid(term, "unexpected characters after ')'"));
    }

    let head: Vec<&str> = term[..open].split_whitespace().collect();
    let [key, op] = head.as_slice() else {
        return Err(invalid(term, "expected '<key> in|notin (...)'"));
    };
    validate_key(term, key)?;

    let values: Vec<String> = term[open + 1..close]
        .split(',')
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    if values.is_empty() {
        return Err(invalid(term, "empty value set"));
    }

    let operator = match *op {
        "in" => LabelOperator::In(values),
        "notin" => LabelOperator::NotIn(values),
        other => return Err(invalid(term, &format!("unknown operator '{}'", other))),
    };
    Ok(LabelRequirement::new(key, operator))
}

fn validate_key(term: &str, key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(invalid(term, "missing key"));
    }
    if key.chars().any(char::is_whitespace) {
        return Err(invalid(term, "key contains whitespace"));
    }
    Ok(())
}

/// Split on top-level commas, keeping `in (a,b)` sets intact
fn split_terms(raw: &str) -> Vec<&str> {
    let mut terms = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (idx, ch) in raw.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                terms.push(raw[start..idx].trim());
                start = idx + 1;
            }
            _ => {}
        }
    }
    terms.push(raw[start..].trim());
    terms.retain(|t| !t.is_empty());
    terms
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_empty() {
        let sel = LabelSelector::parse("").unwrap();
        assert!(sel.is_empty());
        assert!(sel.matches(&labels(&[])));
        assert!(sel.matches(&labels(&[("app", "web")])));
    }

    #[test]
    fn test_equality() {
        let sel = LabelSelector::parse("app=web, tier==frontend").unwrap();
        assert!(sel.matches(&labels(&[("app", "web"), ("tier", "frontend")])));
        assert!(!sel.matches(&labels(&[("app", "web")])));
    }

    #[test]
    fn test_not_equals_matches_missing_label() {
        let sel = LabelSelector::parse("tier!=cache").unwrap();
        assert!(sel.matches(&labels(&[])));
        assert!(sel.matches(&labels(&[("tier", "web")])));
        assert!(!sel.matches(&labels(&[("tier", "cache")])));
    }

    #[test]
    fn test_set_based() {
        let sel = LabelSelector::parse("env in (prod, staging),tier notin (cache)").unwrap();
        assert_eq!(sel.requirements().len(), 2);
        assert!(sel.matches(&labels(&[("env", "prod")])));
        assert!(sel.matches(&labels(&[("env", "staging"), ("tier", "web")])));
        assert!(!sel.matches(&labels(&[("env", "dev")])));
        assert!(!sel.matches(&labels(&[("env", "prod"), ("tier", "cache")])));
    }

    #[test]
    fn test_existence() {
        let sel = LabelSelector::parse("release,!canary").unwrap();
        assert!(sel.matches(&labels(&[("release", "1")])));
        assert!(!sel.matches(&labels(&[("release", "1"), ("canary", "true")])));
        assert!(!sel.matches(&labels(&[])));
    }

    #[test]
    fn test_display_roundtrips_through_parse() {
        let sel = LabelSelector::parse("app=web,env in (a,b),!canary").unwrap();
        let rendered = sel.to_string();
        assert_eq!(rendered, "app=web,env in (a,b),!canary");
        assert_eq!(LabelSelector::parse(&rendered).unwrap(), sel);
    }

    #[test]
    fn test_invalid_selectors() {
        assert!(LabelSelector::parse("=web").is_err());
        assert!(LabelSelector::parse("env in (a,b").is_err());
        assert!(LabelSelector::parse("env within (a)").is_err());
        assert!(LabelSelector::parse("env in ()").is_err());
        assert!(LabelSelector::parse("bad key").is_err());
    }
}
