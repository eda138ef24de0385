use std::fmt::Debug;
use std::hash::Hash;

use rustc_hash::FxHashSet;

use crate::domain::{violation, Admission, Domain};
use crate::error::{IndicatorError, Result, Sequence};

/// Indices (ascending, zero-based) of units whose treatment label is one of
/// `targets`. Placeholder units are never targets.
pub fn target_units<T>(
    treatments: &[Option<T>],
    domain: &Domain<T>,
    targets: &[T],
) -> Result<Vec<usize>>
where
    T: Eq + Hash + Clone + Debug,
{
    for target in targets {
        if !domain.recognizes(target) {
            return Err(IndicatorError::InvalidArgument(format!(
                "target {target:?} is not a treatment in the domain"
            )));
        }
    }
    let wanted: FxHashSet<&T> = targets.iter().collect();

    let mut indices = Vec::new();
    for (i, label) in treatments.iter().enumerate() {
        let label = label.as_ref();
        if domain.admit(label) == Admission::Reject {
            return Err(violation(Sequence::Treatment, i, label));
        }
        if label.is_some_and(|l| wanted.contains(l)) {
            indices.push(i);
        }
    }
    Ok(indices)
}
