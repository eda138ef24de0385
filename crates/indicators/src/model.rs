use std::hash::Hash;

use rustc_hash::FxHashMap;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Indicator table
// ---------------------------------------------------------------------------

/// Per-(subset, treatment) unit counts.
///
/// Dense: every row holds a count for every column, unobserved combinations
/// are an explicit `0`. Keys are `Option<_>` so a tabulated placeholder has
/// its own row or column (`None`). Rows and columns appear in first-occurrence
/// order; lookups of keys that were never observed return `None`.
#[derive(Debug, Clone, Serialize)]
pub struct IndicatorTable<S, T> {
    subsets: Vec<Option<S>>,
    labels: Vec<Option<T>>,
    /// `counts[row][col]`.
    counts: Vec<Vec<usize>>,
    skipped: usize,
    #[serde(skip)]
    subset_index: FxHashMap<Option<S>, usize>,
    #[serde(skip)]
    label_index: FxHashMap<Option<T>, usize>,
}

impl<S, T> Default for IndicatorTable<S, T> {
    fn default() -> Self {
        Self {
            subsets: Vec::new(),
            labels: Vec::new(),
            counts: Vec::new(),
            skipped: 0,
            subset_index: FxHashMap::default(),
            label_index: FxHashMap::default(),
        }
    }
}

impl<S, T> IndicatorTable<S, T>
where
    S: Eq + Hash + Clone,
    T: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// No rows. A table can be empty and still have skipped units.
    pub fn is_empty(&self) -> bool {
        self.subsets.is_empty()
    }

    pub fn num_subsets(&self) -> usize {
        self.subsets.len()
    }

    pub fn num_labels(&self) -> usize {
        self.labels.len()
    }

    /// Row keys in first-occurrence order.
    pub fn subsets(&self) -> &[Option<S>] {
        &self.subsets
    }

    /// Column keys in first-occurrence order.
    pub fn labels(&self) -> &[Option<T>] {
        &self.labels
    }

    /// Units left out of the table by a `Skip` placeholder policy.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Units counted in the table.
    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    pub fn subset_position(&self, subset: &Option<S>) -> Option<usize> {
        self.subset_index.get(subset).copied()
    }

    pub fn label_position(&self, label: &Option<T>) -> Option<usize> {
        self.label_index.get(label).copied()
    }

    /// Count for a cell. `None` when either key was never observed,
    /// `Some(0)` when both were but never together.
    pub fn get(&self, subset: &Option<S>, label: &Option<T>) -> Option<usize> {
        let row = self.subset_position(subset)?;
        let col = self.label_position(label)?;
        Some(self.counts[row][col])
    }

    /// [`get`](Self::get) for non-placeholder keys.
    pub fn count(&self, subset: &S, label: &T) -> Option<usize> {
        self.get(&Some(subset.clone()), &Some(label.clone()))
    }

    /// True iff subset `s` holds at least one unit labelled `t`.
    pub fn contains(&self, subset: &Option<S>, label: &Option<T>) -> bool {
        self.get(subset, label).is_some_and(|c| c > 0)
    }

    /// Counts for one subset, aligned with [`labels`](Self::labels).
    pub fn row(&self, subset: &Option<S>) -> Option<&[usize]> {
        self.subset_position(subset).map(|r| self.counts[r].as_slice())
    }

    pub fn rows(&self) -> impl Iterator<Item = (&Option<S>, &[usize])> + '_ {
        self.subsets
            .iter()
            .zip(self.counts.iter().map(|r| r.as_slice()))
    }

    /// Every cell, zeros included, row-major.
    pub fn cells(&self) -> impl Iterator<Item = (&Option<S>, &Option<T>, usize)> + '_ {
        self.rows().flat_map(move |(s, row)| {
            self.labels.iter().zip(row.iter()).map(move |(t, &c)| (s, t, c))
        })
    }

    /// Number of tabulated units in a subset.
    pub fn subset_size(&self, subset: &Option<S>) -> Option<usize> {
        self.row(subset).map(|r| r.iter().sum())
    }

    /// Number of tabulated units carrying a label, across all subsets.
    pub fn label_total(&self, label: &Option<T>) -> Option<usize> {
        let col = self.label_position(label)?;
        Some(self.counts.iter().map(|r| r[col]).sum())
    }

    /// Elementwise sum of two tables. Rows and columns of `self` keep their
    /// positions; keys first seen in `other` are appended in its order.
    pub fn merge(mut self, other: Self) -> Self {
        let col_map: Vec<usize> = other
            .labels
            .into_iter()
            .map(|label| self.intern_label(label))
            .collect();

        for (subset, row) in other.subsets.into_iter().zip(other.counts) {
            let r = self.intern_subset(subset);
            for (c, n) in row.into_iter().enumerate() {
                if n > 0 {
                    self.bump(r, col_map[c], n);
                }
            }
        }
        self.skipped += other.skipped;
        self.pad();
        self
    }

    // -- building -----------------------------------------------------------

    pub(crate) fn record(&mut self, subset: Option<&S>, label: Option<&T>) {
        let r = self.intern_subset(subset.cloned());
        let c = self.intern_label(label.cloned());
        self.bump(r, c, 1);
    }

    pub(crate) fn record_skip(&mut self) {
        self.skipped += 1;
    }

    /// Restore density after building: every row gets a slot per column.
    pub(crate) fn pad(&mut self) {
        let cols = self.labels.len();
        for row in &mut self.counts {
            row.resize(cols, 0);
        }
    }

    fn intern_subset(&mut self, subset: Option<S>) -> usize {
        if let Some(&r) = self.subset_index.get(&subset) {
            return r;
        }
        let r = self.subsets.len();
        self.subset_index.insert(subset.clone(), r);
        self.subsets.push(subset);
        self.counts.push(Vec::new());
        r
    }

    fn intern_label(&mut self, label: Option<T>) -> usize {
        if let Some(&c) = self.label_index.get(&label) {
            return c;
        }
        let c = self.labels.len();
        self.label_index.insert(label.clone(), c);
        self.labels.push(label);
        c
    }

    fn bump(&mut self, row: usize, col: usize, by: usize) {
        let cells = &mut self.counts[row];
        if cells.len() <= col {
            cells.resize(col + 1, 0);
        }
        cells[col] += by;
    }
}

/// Key-wise equality: row and column order do not matter.
impl<S, T> PartialEq for IndicatorTable<S, T>
where
    S: Eq + Hash + Clone,
    T: Eq + Hash + Clone,
{
    fn eq(&self, other: &Self) -> bool {
        self.skipped == other.skipped
            && self.subsets.len() == other.subsets.len()
            && self.labels.len() == other.labels.len()
            && self
                .cells()
                .all(|(s, t, c)| other.get(s, t) == Some(c))
    }
}

impl<S, T> Eq for IndicatorTable<S, T>
where
    S: Eq + Hash + Clone,
    T: Eq + Hash + Clone,
{
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(&'static str, &'static str)]) -> IndicatorTable<&'static str, &'static str> {
        let mut t = IndicatorTable::new();
        for (s, l) in pairs {
            t.record(Some(s), Some(l));
        }
        t.pad();
        t
    }

    #[test]
    fn dense_zero_vs_absent() {
        let t = table(&[("A", "t0"), ("B", "t1")]);
        assert_eq!(t.count(&"A", &"t0"), Some(1));
        assert_eq!(t.count(&"A", &"t1"), Some(0));
        assert_eq!(t.count(&"A", &"t2"), None);
        assert_eq!(t.count(&"C", &"t0"), None);
        assert!(!t.contains(&Some("A"), &Some("t1")));
        assert_eq!(t.row(&Some("A")).unwrap(), &[1, 0]);
    }

    #[test]
    fn sums() {
        let t = table(&[("A", "t0"), ("A", "t1"), ("B", "t0"), ("B", "t0"), ("B", "t1")]);
        assert_eq!(t.total(), 5);
        assert_eq!(t.subset_size(&Some("B")), Some(3));
        assert_eq!(t.label_total(&Some("t0")), Some(3));
        assert_eq!(t.cells().count(), 4);
    }

    #[test]
    fn merge_appends_new_keys_in_order() {
        let left = table(&[("A", "t0")]);
        let right = table(&[("B", "t1"), ("A", "t1")]);
        let merged = left.merge(right);
        assert_eq!(merged.subsets(), &[Some("A"), Some("B")]);
        assert_eq!(merged.labels(), &[Some("t0"), Some("t1")]);
        assert_eq!(merged.row(&Some("A")).unwrap(), &[1, 1]);
        assert_eq!(merged.row(&Some("B")).unwrap(), &[0, 1]);
    }

    #[test]
    fn equality_ignores_order() {
        let a = table(&[("A", "t0"), ("B", "t1")]);
        let b = table(&[("B", "t1"), ("A", "t0")]);
        assert_eq!(a, b);
        let c = table(&[("B", "t1"), ("A", "t1")]);
        assert_ne!(a, c);
    }

    #[test]
    fn placeholder_keys() {
        let mut t: IndicatorTable<&str, &str> = IndicatorTable::new();
        t.record(None, Some(&"t0"));
        t.record(Some(&"A"), None);
        t.pad();
        assert_eq!(t.get(&None, &Some("t0")), Some(1));
        assert_eq!(t.get(&Some("A"), &None), Some(1));
        assert_eq!(t.get(&None, &None), Some(0));
    }
}
