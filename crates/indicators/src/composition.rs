//! Group-composition checks over an indicator table.
//!
//! A matching procedure typically requires every matched set to reach a
//! minimum size and to hold a minimum number of units from each treatment
//! arm. These helpers report where a table falls short; what to do with a
//! violating partition is the caller's decision.

use std::hash::Hash;

use serde::Serialize;

use crate::model::IndicatorTable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionRule<T> {
    /// Minimum number of tabulated units per subset.
    pub min_size: usize,
    /// `(label, minimum count)` per subset.
    pub min_per_label: Vec<(Option<T>, usize)>,
}

impl<T> Default for CompositionRule<T> {
    fn default() -> Self {
        Self {
            min_size: 0,
            min_per_label: Vec::new(),
        }
    }
}

impl<T> CompositionRule<T> {
    /// At least one unit of every listed arm in every subset.
    pub fn one_of_each<I: IntoIterator<Item = T>>(labels: I) -> Self {
        Self {
            min_size: 0,
            min_per_label: labels.into_iter().map(|l| (Some(l), 1)).collect(),
        }
    }

    pub fn with_min_size(mut self, min_size: usize) -> Self {
        self.min_size = min_size;
        self
    }

    pub fn require(mut self, label: T, min: usize) -> Self {
        self.min_per_label.push((Some(label), min));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationKind<T> {
    TooSmall {
        size: usize,
        required: usize,
    },
    LabelShortfall {
        label: Option<T>,
        found: usize,
        required: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation<S, T> {
    pub subset: Option<S>,
    #[serde(flatten)]
    pub kind: ViolationKind<T>,
}

/// Every violation of `rule`, in row order. A required label absent from the
/// table counts as zero in every subset.
pub fn check_composition<S, T>(
    table: &IndicatorTable<S, T>,
    rule: &CompositionRule<T>,
) -> Vec<Violation<S, T>>
where
    S: Eq + Hash + Clone,
    T: Eq + Hash + Clone,
{
    let columns: Vec<Option<usize>> = rule
        .min_per_label
        .iter()
        .map(|(label, _)| table.label_position(label))
        .collect();

    let mut violations = Vec::new();
    for (subset, row) in table.rows() {
        let size: usize = row.iter().sum();
        if size < rule.min_size {
            violations.push(Violation {
                subset: subset.clone(),
                kind: ViolationKind::TooSmall {
                    size,
                    required: rule.min_size,
                },
            });
        }
        for ((label, required), col) in rule.min_per_label.iter().zip(&columns) {
            let found = col.map_or(0, |c| row[c]);
            if found < *required {
                violations.push(Violation {
                    subset: subset.clone(),
                    kind: ViolationKind::LabelShortfall {
                        label: label.clone(),
                        found,
                        required: *required,
                    },
                });
            }
        }
    }
    violations
}

/// True iff the table has no violations of `rule`.
pub fn satisfies<S, T>(table: &IndicatorTable<S, T>, rule: &CompositionRule<T>) -> bool
where
    S: Eq + Hash + Clone,
    T: Eq + Hash + Clone,
{
    check_composition(table, rule).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::tabulate;
    use crate::domain::Domain;

    fn table(subsets: &[&'static str], labels: &[&'static str]) -> IndicatorTable<&'static str, &'static str> {
        let s: Vec<_> = subsets.iter().copied().map(Some).collect();
        let l: Vec<_> = labels.iter().copied().map(Some).collect();
        tabulate(&s, &l, &Domain::open(), &Domain::open()).unwrap()
    }

    #[test]
    fn every_set_has_both_arms() {
        let t = table(&["A", "A", "B", "B", "B"], &["t", "c", "t", "c", "c"]);
        assert!(satisfies(&t, &CompositionRule::one_of_each(["t", "c"])));
    }

    #[test]
    fn missing_arm_reported() {
        let t = table(&["A", "A", "B", "B"], &["t", "c", "c", "c"]);
        let v = check_composition(&t, &CompositionRule::one_of_each(["t", "c"]));
        assert_eq!(
            v,
            vec![Violation {
                subset: Some("B"),
                kind: ViolationKind::LabelShortfall {
                    label: Some("t"),
                    found: 0,
                    required: 1,
                },
            }]
        );
    }

    #[test]
    fn unobserved_label_counts_as_zero() {
        let t = table(&["A", "B"], &["c", "c"]);
        let v = check_composition(&t, &CompositionRule::default().require("t", 1));
        assert_eq!(v.len(), 2);
    }

    #[test]
    fn min_size() {
        let t = table(&["A", "A", "B"], &["t", "c", "t"]);
        let v = check_composition(&t, &CompositionRule::default().with_min_size(2));
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].subset, Some("B"));
        assert_eq!(v[0].kind, ViolationKind::TooSmall { size: 1, required: 2 });
    }

    #[test]
    fn empty_table_satisfies_anything() {
        let t = table(&[], &[]);
        assert!(satisfies(&t, &CompositionRule::one_of_each(["t"]).with_min_size(3)));
    }
}
