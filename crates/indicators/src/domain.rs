//! Identifier domains for subset and treatment sequences.
//!
//! A domain decides which values of an input sequence are recognized. Open
//! domains accept every value; closed domains accept only an explicitly
//! enumerated list. The placeholder (`None` in an input slice) is handled by
//! the domain's [`PlaceholderPolicy`].

use std::fmt;
use std::hash::Hash;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{IndicatorError, Sequence};

/// What to do with a placeholder (`None`) value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderPolicy {
    /// Placeholder is a domain violation.
    #[default]
    Reject,
    /// Placeholder is tabulated as its own key.
    Tabulate,
    /// Unit is left out of the table and counted as skipped.
    Skip,
}

impl fmt::Display for PlaceholderPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reject => write!(f, "reject"),
            Self::Tabulate => write!(f, "tabulate"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

/// Outcome of offering one value to a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Admission {
    Count,
    Skip,
    Reject,
}

#[derive(Debug, Clone)]
pub struct Domain<T> {
    /// `None` = open domain.
    values: Option<Vec<T>>,
    index: FxHashMap<T, usize>,
    placeholder: PlaceholderPolicy,
}

impl<T: Eq + Hash + Clone> Domain<T> {
    /// Every non-placeholder value is recognized.
    pub fn open() -> Self {
        Self {
            values: None,
            index: FxHashMap::default(),
            placeholder: PlaceholderPolicy::default(),
        }
    }

    /// Only the given values are recognized. Duplicates are dropped, first
    /// occurrence wins.
    pub fn closed<I: IntoIterator<Item = T>>(values: I) -> Self {
        let mut list = Vec::new();
        let mut index = FxHashMap::default();
        for value in values {
            if !index.contains_key(&value) {
                index.insert(value.clone(), list.len());
                list.push(value);
            }
        }
        Self {
            values: Some(list),
            index,
            placeholder: PlaceholderPolicy::default(),
        }
    }

    pub fn with_placeholder(mut self, policy: PlaceholderPolicy) -> Self {
        self.placeholder = policy;
        self
    }

    pub fn placeholder(&self) -> PlaceholderPolicy {
        self.placeholder
    }

    pub fn is_closed(&self) -> bool {
        self.values.is_some()
    }

    /// Enumerated values of a closed domain, in declaration order.
    pub fn values(&self) -> Option<&[T]> {
        self.values.as_deref()
    }

    pub fn recognizes(&self, value: &T) -> bool {
        !self.is_closed() || self.index.contains_key(value)
    }

    pub(crate) fn admit(&self, value: Option<&T>) -> Admission {
        match value {
            None => match self.placeholder {
                PlaceholderPolicy::Reject => Admission::Reject,
                PlaceholderPolicy::Tabulate => Admission::Count,
                PlaceholderPolicy::Skip => Admission::Skip,
            },
            Some(v) if self.recognizes(v) => Admission::Count,
            Some(_) => Admission::Reject,
        }
    }
}

impl<T: Eq + Hash + Clone> Default for Domain<T> {
    fn default() -> Self {
        Self::open()
    }
}

impl Domain<usize> {
    /// Closed integer domain `0..len`, the usual numbering of matched sets.
    pub fn range(len: usize) -> Self {
        Self::closed(0..len)
    }
}

/// Build the error for a rejected value.
pub(crate) fn violation<T: fmt::Debug>(
    sequence: Sequence,
    index: usize,
    value: Option<&T>,
) -> IndicatorError {
    IndicatorError::DomainViolation {
        sequence,
        index,
        value: match value {
            Some(v) => format!("{v:?}"),
            None => "<placeholder>".to_string(),
        },
    }
}
