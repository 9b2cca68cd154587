//! Sparse vectors and the doubly-indexed constraint matrix store.
//!
//! Every non-zero lives once in a slot array. Rows and columns keep lists of slot
//! ids; the most recently linked slot sits at the end of its list and is treated
//! as the list head, so iterating a line yields the newest entries first.

use crate::error::{LpResult, ensure};

/// Sparse vector stored as parallel index/value arrays.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVec {
    /// Indices of the stored entries
    pub ind: Vec<usize>,
    /// Values of the stored entries
    pub val: Vec<f64>,
}

impl SparseVec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            ind: Vec::with_capacity(cap),
            val: Vec::with_capacity(cap),
        }
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (usize, f64)>) -> Self {
        let mut vec = Self::new();
        for (k, v) in pairs {
            vec.push(k, v);
        }
        vec
    }

    pub fn push(&mut self, k: usize, v: f64) {
        self.ind.push(k);
        self.val.push(v);
    }

    pub fn len(&self) -> usize {
        self.ind.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ind.is_empty()
    }

    pub fn clear(&mut self) {
        self.ind.clear();
        self.val.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.ind.iter().copied().zip(self.val.iter().copied())
    }

    /// Fail unless `ind` and `val` have the same length.
    pub(crate) fn check(&self, op: &'static str) -> LpResult<()> {
        ensure!(
            self.ind.len() == self.val.len(),
            op,
            "{} indices but {} values",
            self.ind.len(),
            self.val.len()
        );
        Ok(())
    }

    /// Value stored at index `k`, if any (linear scan).
    pub fn get(&self, k: usize) -> Option<f64> {
        self.iter().find(|&(t, _)| t == k).map(|(_, v)| v)
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    row: usize,
    col: usize,
    val: f64,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct MatrixStore {
    slots: Vec<Option<Entry>>,
    free: Vec<usize>,
    rows: Vec<Vec<usize>>,
    cols: Vec<Vec<usize>>,
}

impl MatrixStore {
    pub(crate) fn add_rows(&mut self, count: usize) {
        self.rows.resize_with(self.rows.len() + count, Vec::new);
    }

    pub(crate) fn add_cols(&mut self, count: usize) {
        self.cols.resize_with(self.cols.len() + count, Vec::new);
    }

    pub(crate) fn nnz(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    fn entry(&self, slot: usize) -> Entry {
        match self.slots[slot] {
            Some(e) => e,
            None => unreachable!("slot {slot} is linked but empty"),
        }
    }

    /// Entries of row `i` as `(col, val)`, head first.
    pub(crate) fn row(&self, i: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.rows[i].iter().rev().map(move |&s| {
            let e = self.entry(s);
            (e.col, e.val)
        })
    }

    /// Entries of column `j` as `(row, val)`, head first.
    pub(crate) fn col(&self, j: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.cols[j].iter().rev().map(move |&s| {
            let e = self.entry(s);
            (e.row, e.val)
        })
    }

    /// Row index of the head entry of column `j`.
    pub(crate) fn col_head_row(&self, j: usize) -> Option<usize> {
        self.cols[j].last().map(|&s| self.entry(s).row)
    }

    fn alloc(&mut self, e: Entry) -> usize {
        match self.free.pop() {
            Some(s) => {
                self.slots[s] = Some(e);
                s
            }
            None => {
                self.slots.push(Some(e));
                self.slots.len() - 1
            }
        }
    }

    /// Link a new entry at the head of both its row and column lists.
    pub(crate) fn insert(&mut self, row: usize, col: usize, val: f64) {
        let s = self.alloc(Entry { row, col, val });
        self.rows[row].push(s);
        self.cols[col].push(s);
    }

    /// Link a new entry into its row list only; see `link_cols`.
    pub(crate) fn insert_row_only(&mut self, row: usize, col: usize, val: f64) {
        let s = self.alloc(Entry { row, col, val });
        self.rows[row].push(s);
    }

    /// Rebuild every column list from the row lists, visiting rows in ascending
    /// order. Fails with the `(row, col)` pair of the first duplicate seen.
    pub(crate) fn link_cols(&mut self) -> Result<(), (usize, usize)> {
        for list in &mut self.cols {
            list.clear();
        }
        for i in 0..self.rows.len() {
            for t in (0..self.rows[i].len()).rev() {
                let s = self.rows[i][t];
                let col = self.entry(s).col;
                if self.col_head_row(col) == Some(i) {
                    return Err((i, col));
                }
                self.cols[col].push(s);
            }
        }
        Ok(())
    }

    pub(crate) fn clear_row(&mut self, i: usize) {
        let list = std::mem::take(&mut self.rows[i]);
        for s in list {
            let col = self.entry(s).col;
            self.cols[col].retain(|&t| t != s);
            self.slots[s] = None;
            self.free.push(s);
        }
    }

    pub(crate) fn clear_col(&mut self, j: usize) {
        let list = std::mem::take(&mut self.cols[j]);
        for s in list {
            let row = self.entry(s).row;
            self.rows[row].retain(|&t| t != s);
            self.slots[s] = None;
            self.free.push(s);
        }
    }

    /// Drop the rows flagged in `gone` (which must already be empty) and renumber
    /// the surviving entries.
    pub(crate) fn remove_rows(&mut self, gone: &[bool]) {
        let map = compact_map(gone);
        let mut keep = gone.iter();
        self.rows.retain(|_| !keep.next().copied().unwrap_or(false));
        for e in self.slots.iter_mut().flatten() {
            if let Some(r) = map[e.row] {
                e.row = r;
            }
        }
    }

    /// Drop the columns flagged in `gone` (which must already be empty) and
    /// renumber the surviving entries.
    pub(crate) fn remove_cols(&mut self, gone: &[bool]) {
        let map = compact_map(gone);
        let mut keep = gone.iter();
        self.cols.retain(|_| !keep.next().copied().unwrap_or(false));
        for e in self.slots.iter_mut().flatten() {
            if let Some(c) = map[e.col] {
                e.col = c;
            }
        }
    }

    /// Reorder both views: row lists by ascending column, column lists by
    /// ascending row.
    pub(crate) fn order(&mut self) {
        let slots = &self.slots;
        let key = |s: &usize| slots[*s].map_or((0, 0), |e| (e.row, e.col));
        // heads sit at the end of each list
        for list in &mut self.rows {
            list.sort_by(|a, b| key(b).1.cmp(&key(a).1));
        }
        for list in &mut self.cols {
            list.sort_by(|a, b| key(b).0.cmp(&key(a).0));
        }
    }
}

fn compact_map(gone: &[bool]) -> Vec<Option<usize>> {
    let mut next = 0;
    gone.iter()
        .map(|&g| {
            if g {
                None
            } else {
                next += 1;
                Some(next - 1)
            }
        })
        .collect()
}
