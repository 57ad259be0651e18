//! Scan filters: conjunctions of equality and range predicates over field values.

use crate::core::{format_date, parse_date};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(Value),
    Lt(Value),
    Le(Value),
    Gt(Value),
    Ge(Value),
}

impl Predicate {
    fn matches(&self, actual: &Value) -> bool {
        match self {
            Self::Eq(expected) => {
                compare_values(actual, expected) == Some(Ordering::Equal) || actual == expected
            }
            Self::Lt(bound) => compare_values(actual, bound) == Some(Ordering::Less),
            Self::Le(bound) => matches!(
                compare_values(actual, bound),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Self::Gt(bound) => compare_values(actual, bound) == Some(Ordering::Greater),
            Self::Ge(bound) => matches!(
                compare_values(actual, bound),
                Some(Ordering::Greater | Ordering::Equal)
            ),
        }
    }
}

/// All conditions must hold for a record to match. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Predicate)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, predicate: Predicate) -> Self {
        self.conditions.push((field.into(), predicate));
        self
    }

    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Predicate::Eq(value.into()))
    }

    pub fn lt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Predicate::Lt(value.into()))
    }

    pub fn le(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Predicate::Le(value.into()))
    }

    pub fn gt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Predicate::Gt(value.into()))
    }

    pub fn ge(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Predicate::Ge(value.into()))
    }

    /// `field < cutoff` for a `Date` field.
    pub fn before(self, field: impl Into<String>, cutoff: DateTime<Utc>) -> Self {
        self.lt(field, format_date(&cutoff))
    }

    pub fn conditions(&self) -> &[(String, Predicate)] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// A record lacking a filtered field never matches.
    pub fn matches(&self, fields: &Map<String, Value>) -> bool {
        self.conditions.iter().all(|(field, predicate)| {
            fields
                .get(field)
                .is_some_and(|actual| predicate.matches(actual))
        })
    }
}

/// Orders two field values.
///
/// Text that parses as RFC 3339 on both sides compares chronologically, other
/// text lexically, numbers numerically, booleans false < true. Mixed or
/// structured values are not ordered.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(a), Value::String(b)) => match (parse_date(a), parse_date(b)) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => Some(a.cmp(b)),
        },
        (Value::Number(a), Value::Number(b)) => {
            if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
                return Some(a.cmp(&b));
            }
            a.as_f64()?.partial_cmp(&b.as_f64()?)
        }
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}
