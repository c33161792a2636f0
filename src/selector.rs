//! Label selector parsing and matching for filtering tracked resources
//!
//! Supports the common declarative-API selector syntax:
//! - Equality: `key=value` or `key==value`
//! - Inequality: `key!=value`
//! - Set-based: `key in (value1,value2)` or `key notin (value1,value2)`
//! - Existence: `key` or `!key`
//! - Multiple requirements combined with commas: `key1=value1,key2 in (v2,v3)`

use crate::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};

/// A single selector requirement.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    In(String, BTreeSet<String>),
    NotIn(String, BTreeSet<String>),
    Exists(String),
    DoesNotExist(String),
}

impl Expression {
    fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match self {
            Expression::In(key, values) => {
                labels.get(key).is_some_and(|v| values.contains(v))
            }
            Expression::NotIn(key, values) => {
                labels.get(key).is_none_or(|v| !values.contains(v))
            }
            Expression::Exists(key) => labels.contains_key(key),
            Expression::DoesNotExist(key) => !labels.contains_key(key),
        }
    }
}

/// A parsed selector: a conjunction of requirements. The empty selector
/// matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selector {
    expressions: Vec<Expression>,
}

impl Selector {
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.expressions.iter().all(|e| e.matches(labels))
    }

    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }
}

impl FromIterator<Expression> for Selector {
    fn from_iter<T: IntoIterator<Item = Expression>>(iter: T) -> Self {
        Self {
            expressions: iter.into_iter().collect(),
        }
    }
}

/// Split a selector string by commas, but not inside parentheses
fn split_preserving_parentheses(selector: &str) -> Vec<&str> {
    let mut result = Vec::new();
    let mut start = 0;
    let mut depth = 0;

    for (i, ch) in selector.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                result.push(&selector[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    if start < selector.len() {
        result.push(&selector[start..]);
    }

    result
}

fn parse_set_values(requirement: &str, rest: &str) -> Result<BTreeSet<String>> {
    let rest = rest.trim();
    if !rest.starts_with('(') || !rest.ends_with(')') {
        return Err(Error::Invalid(format!(
            "invalid set selector syntax: {}",
            requirement
        )));
    }
    Ok(rest[1..rest.len() - 1]
        .split(',')
        .map(|v| v.trim().to_string())
        .collect())
}

/// Parse a label selector string.
///
/// # Examples
///
/// ```
/// use fake_clientset::selector::parse_selector;
///
/// let selector = parse_selector("app=myapp").unwrap();
/// let selector = parse_selector("env in (production,staging)").unwrap();
/// let selector = parse_selector("app=myapp,env in (production,staging)").unwrap();
/// ```
pub fn parse_selector(selector: &str) -> Result<Selector> {
    if selector.trim().is_empty() {
        return Ok(Selector::default());
    }

    let mut expressions = Vec::new();

    for requirement in split_preserving_parentheses(selector) {
        let requirement = requirement.trim();
        if requirement.is_empty() {
            continue;
        }

        if let Some((key, rest)) = requirement.split_once(" in ") {
            let values = parse_set_values(requirement, rest)?;
            expressions.push(Expression::In(key.trim().to_string(), values));
        } else if let Some((key, rest)) = requirement.split_once(" notin ") {
            let values = parse_set_values(requirement, rest)?;
            expressions.push(Expression::NotIn(key.trim().to_string(), values));
        } else if let Some(key) = requirement.strip_prefix('!') {
            expressions.push(Expression::DoesNotExist(key.trim().to_string()));
        } else if let Some((key, value)) = requirement.split_once("!=") {
            let values = BTreeSet::from([value.trim().to_string()]);
            expressions.push(Expression::NotIn(key.trim().to_string(), values));
        } else if let Some((key, value)) = requirement.split_once("==") {
            let values = BTreeSet::from([value.trim().to_string()]);
            expressions.push(Expression::In(key.trim().to_string(), values));
        } else if let Some((key, value)) = requirement.split_once('=') {
            let values = BTreeSet::from([value.trim().to_string()]);
            expressions.push(Expression::In(key.trim().to_string(), values));
        } else {
            // Only a bare label key can reach here. Residual whitespace or
            // parentheses mean a set-based requirement failed to parse.
            if requirement.contains(char::is_whitespace)
                || requirement.contains('(')
                || requirement.contains(')')
            {
                return Err(Error::Invalid(format!(
                    "invalid selector requirement: {}",
                    requirement
                )));
            }
            expressions.push(Expression::Exists(requirement.to_string()));
        }
    }

    Ok(Selector::from_iter(expressions))
}

/// Match labels against a label selector string.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use fake_clientset::selector::matches_selector;
///
/// let labels = BTreeMap::from([
///     ("app".to_string(), "myapp".to_string()),
///     ("env".to_string(), "production".to_string()),
/// ]);
///
/// assert!(matches_selector(&labels, "app=myapp").unwrap());
/// assert!(matches_selector(&labels, "env in (production,staging)").unwrap());
/// assert!(!matches_selector(&labels, "app=other").unwrap());
/// ```
pub fn matches_selector(labels: &BTreeMap<String, String>, selector: &str) -> Result<bool> {
    let selector = parse_selector(selector)?;
    Ok(selector.matches(labels))
}
