use std::fmt::Debug;
use std::hash::Hash;

use crate::domain::{violation, Admission, Domain};
use crate::error::{IndicatorError, Result, Sequence};
use crate::model::IndicatorTable;

/// Cross-tabulate subset assignment against treatment label.
///
/// One linear pass. Fails with `InvalidArgument` on a length mismatch and
/// with `DomainViolation` on the first unit whose subset or treatment value
/// its domain rejects; no table is returned in either case.
pub fn tabulate<S, T>(
    subsets: &[Option<S>],
    treatments: &[Option<T>],
    subset_domain: &Domain<S>,
    treatment_domain: &Domain<T>,
) -> Result<IndicatorTable<S, T>>
where
    S: Eq + Hash + Clone + Debug,
    T: Eq + Hash + Clone + Debug,
{
    check_lengths(subsets, treatments)?;
    let table = tabulate_from(0, subsets, treatments, subset_domain, treatment_domain)?;
    log::debug!(
        "tabulated {} unit(s) into {} subset(s) x {} label(s), {} skipped",
        subsets.len(),
        table.num_subsets(),
        table.num_labels(),
        table.skipped()
    );
    Ok(table)
}

pub(crate) fn check_lengths<S, T>(subsets: &[S], treatments: &[T]) -> Result<()> {
    if subsets.len() != treatments.len() {
        return Err(IndicatorError::length_mismatch(subsets.len(), treatments.len()));
    }
    Ok(())
}

/// Tabulate aligned slices whose first unit has index `offset` in the full
/// input. The offset only affects error reporting.
pub(crate) fn tabulate_from<S, T>(
    offset: usize,
    subsets: &[Option<S>],
    treatments: &[Option<T>],
    subset_domain: &Domain<S>,
    treatment_domain: &Domain<T>,
) -> Result<IndicatorTable<S, T>>
where
    S: Eq + Hash + Clone + Debug,
    T: Eq + Hash + Clone + Debug,
{
    debug_assert_eq!(subsets.len(), treatments.len());
    let mut table = IndicatorTable::new();

    for (i, (subset, label)) in subsets.iter().zip(treatments).enumerate() {
        let subset = subset.as_ref();
        let label = label.as_ref();

        let s = subset_domain.admit(subset);
        if s == Admission::Reject {
            return Err(violation(Sequence::Subset, offset + i, subset));
        }
        let t = treatment_domain.admit(label);
        if t == Admission::Reject {
            return Err(violation(Sequence::Treatment, offset + i, label));
        }

        if s == Admission::Skip || t == Admission::Skip {
            table.record_skip();
        } else {
            table.record(subset, label);
        }
    }

    table.pad();
    Ok(table)
}
