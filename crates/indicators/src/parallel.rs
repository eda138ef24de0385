use std::fmt::Debug;
use std::hash::Hash;

use rayon::prelude::*;

use crate::aggregate::{check_lengths, tabulate_from};
use crate::domain::Domain;
use crate::error::{IndicatorError, Result};
use crate::model::IndicatorTable;

/// Default number of units per worker chunk.
pub const DEFAULT_CHUNK_LEN: usize = 64 * 1024;

/// Chunked, data-parallel [`tabulate`](crate::aggregate::tabulate).
///
/// Each chunk is tabulated into a private table on the rayon pool; partial
/// tables are merged in chunk order, so row/column order and the reported
/// error (lowest failing unit) match the sequential pass.
pub fn tabulate_par<S, T>(
    subsets: &[Option<S>],
    treatments: &[Option<T>],
    subset_domain: &Domain<S>,
    treatment_domain: &Domain<T>,
    chunk_len: usize,
) -> Result<IndicatorTable<S, T>>
where
    S: Eq + Hash + Clone + Debug + Send + Sync,
    T: Eq + Hash + Clone + Debug + Send + Sync,
{
    check_lengths(subsets, treatments)?;
    if chunk_len == 0 {
        return Err(IndicatorError::InvalidArgument("chunk_len must be positive".into()));
    }

    let chunks = subsets.len().div_ceil(chunk_len);
    log::debug!(
        "parallel tabulation: {} unit(s) in {} chunk(s) of {}",
        subsets.len(),
        chunks,
        chunk_len
    );

    let partials: Vec<Result<IndicatorTable<S, T>>> = subsets
        .par_chunks(chunk_len)
        .zip(treatments.par_chunks(chunk_len))
        .enumerate()
        .map(|(k, (s, t))| tabulate_from(k * chunk_len, s, t, subset_domain, treatment_domain))
        .collect();

    let mut table = IndicatorTable::new();
    for partial in partials {
        table = table.merge(partial?);
    }

    log::debug!(
        "merged {} chunk table(s) into {} subset(s) x {} label(s), {} skipped",
        chunks,
        table.num_subsets(),
        table.num_labels(),
        table.skipped()
    );
    Ok(table)
}
