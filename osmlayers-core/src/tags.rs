//! Declarative OSM tag filters.
//!
//! A [`TagFilter`] is a union of [`TagClause`]s and each clause is a
//! conjunction of [`TagCondition`]s on distinct keys. All parts borrow
//! `'static` data so layer configurations can live in a `static` table.

use std::fmt;

use crate::table::Feature;

/// Predicate applied to the value of one tag key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagMatch {
    /// The key is present with any value.
    Any,
    /// The value equals the given string.
    Equals(&'static str),
    /// The value is one of the given strings.
    OneOf(&'static [&'static str]),
    /// The key is absent or its value is none of the given strings.
    NoneOf(&'static [&'static str]),
}

impl TagMatch {
    /// Test an optional tag value against this predicate.
    pub fn matches(self, value: Option<&str>) -> bool {
        match (self, value) {
            (Self::NoneOf(_), None) => true,
            (_, None) => false,
            (Self::Any, Some(_)) => true,
            (Self::Equals(expected), Some(actual)) => expected == actual,
            (Self::OneOf(allowed), Some(actual)) => allowed.contains(&actual),
            (Self::NoneOf(denied), Some(actual)) => !denied.contains(&actual),
        }
    }
}

/// A single `key` predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagCondition {
    /// OSM tag key.
    pub key: &'static str,
    /// Predicate on the key's value.
    pub matcher: TagMatch,
}

impl TagCondition {
    /// Match any value of `key`.
    pub const fn any(key: &'static str) -> Self {
        Self {
            key,
            matcher: TagMatch::Any,
        }
    }

    /// Match `key=value`.
    pub const fn equals(key: &'static str, value: &'static str) -> Self {
        Self {
            key,
            matcher: TagMatch::Equals(value),
        }
    }

    /// Match `key` against a value list.
    pub const fn one_of(key: &'static str, values: &'static [&'static str]) -> Self {
        Self {
            key,
            matcher: TagMatch::OneOf(values),
        }
    }

    /// Match `key` when its value is outside a value list.
    pub const fn none_of(key: &'static str, values: &'static [&'static str]) -> Self {
        Self {
            key,
            matcher: TagMatch::NoneOf(values),
        }
    }
}

impl fmt::Display for TagCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.matcher {
            TagMatch::Any => write!(f, "{}=*", self.key),
            TagMatch::Equals(value) => write!(f, "{}={value}", self.key),
            TagMatch::OneOf(values) => write!(f, "{}=[{}]", self.key, values.join("|")),
            TagMatch::NoneOf(values) => write!(f, "{}!=[{}]", self.key, values.join("|")),
        }
    }
}

/// Conditions that must all hold for an element to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagClause {
    /// Conjunctive conditions.
    pub conditions: &'static [TagCondition],
}

impl TagClause {
    /// Create a clause from its conditions.
    pub const fn new(conditions: &'static [TagCondition]) -> Self {
        Self { conditions }
    }

    /// Test a tag lookup against every condition.
    pub fn matches<'t, F>(&self, lookup: F) -> bool
    where
        F: Fn(&str) -> Option<&'t str>,
    {
        self.conditions
            .iter()
            .all(|condition| condition.matcher.matches(lookup(condition.key)))
    }
}

/// A union of clauses.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use osmlayers_core::{TagClause, TagCondition, TagFilter};
///
/// static ATM: TagFilter = TagFilter::new(&[
///     TagClause::new(&[TagCondition::equals("amenity", "atm")]),
///     TagClause::new(&[
///         TagCondition::equals("amenity", "bank"),
///         TagCondition::equals("atm", "yes"),
///     ]),
/// ]);
///
/// let tags = HashMap::from([("amenity", "bank"), ("atm", "yes")]);
/// assert!(ATM.matches(|key| tags.get(key).copied()));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagFilter {
    /// Alternative clauses; an element matching any clause is selected.
    pub clauses: &'static [TagClause],
}

impl TagFilter {
    /// Create a filter from its clauses.
    pub const fn new(clauses: &'static [TagClause]) -> Self {
        Self { clauses }
    }

    /// Test a tag lookup against the filter.
    pub fn matches<'t, F>(&self, lookup: F) -> bool
    where
        F: Fn(&str) -> Option<&'t str>,
    {
        self.clauses.iter().any(|clause| clause.matches(&lookup))
    }

    /// Test a feature's text attributes against the filter.
    pub fn matches_feature(&self, feature: &Feature) -> bool {
        self.matches(|key| feature.value(key).as_str())
    }

    /// Every key referenced by the filter, in first-seen order.
    pub fn keys(&self) -> Vec<&'static str> {
        let mut keys: Vec<&'static str> = Vec::new();
        for condition in self.clauses.iter().flat_map(|clause| clause.conditions) {
            if !keys.contains(&condition.key) {
                keys.push(condition.key);
            }
        }
        keys
    }
}

impl fmt::Display for TagFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clauses: Vec<String> = self
            .clauses
            .iter()
            .map(|clause| {
                clause
                    .conditions
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" AND ")
            })
            .collect();
        f.write_str(&clauses.join(" OR "))
    }
}
