//! Implicit scaling of the constraint matrix.
//!
//! The routines never touch the stored coefficients. They work on diagonal
//! factors `R` (rows) and `S` (columns) so that the effective matrix is `R*A*S`,
//! reading the unscaled matrix line by line through a [`MatrixSource`].
//!
//! - Equilibration divides every row (column) by its largest scaled magnitude,
//!   leaving each line's largest entry at 1.
//! - Geometric mean scaling repeatedly divides every row (column) by
//!   `sqrt(min * max)` of its scaled non-zero magnitudes, driving the quality
//!   `max / min` over the whole matrix towards 1.

use log::info;

use crate::error::{LpResult, ensure};
use crate::params::{ScaleMode, ScaleOrder};
use crate::problem::Problem;
use crate::sparse::SparseVec;

/// Selects one line of the constraint matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    Row(usize),
    Col(usize),
}

/// Read access to the unscaled constraint matrix, one line at a time.
///
/// For `Line::Row(i)` the buffer receives column indices and values of row `i`,
/// for `Line::Col(j)` row indices and values of column `j`. Repeated calls with
/// the same selector must give the same answer.
pub trait MatrixSource {
    fn line(&self, line: Line, out: &mut SparseVec);
}

impl MatrixSource for Problem {
    fn line(&self, line: Line, out: &mut SparseVec) {
        out.clear();
        match line {
            Line::Row(i) => self.matrix.row(i).for_each(|(j, v)| out.push(j, v)),
            Line::Col(j) => self.matrix.col(j).for_each(|(i, v)| out.push(i, v)),
        }
    }
}

impl<F> MatrixSource for F
where
    F: Fn(Line, &mut SparseVec),
{
    fn line(&self, line: Line, out: &mut SparseVec) {
        out.clear();
        self(line, out);
    }
}

struct Scaler<'a, M: MatrixSource + ?Sized> {
    m: usize,
    n: usize,
    source: &'a M,
    buf: SparseVec,
}

impl<'a, M: MatrixSource + ?Sized> Scaler<'a, M> {
    fn new(op: &'static str, m: usize, n: usize, source: &'a M, r: &[f64], s: &[f64]) -> LpResult<Self> {
        ensure!(m > 0 && n > 0, op, "m = {}; n = {}; invalid parameters", m, n);
        ensure!(r.len() == m, op, "row factors have length {}, expected {}", r.len(), m);
        ensure!(s.len() == n, op, "column factors have length {}, expected {}", s.len(), n);
        Ok(Self {
            m,
            n,
            source,
            buf: SparseVec::with_capacity(m.max(n)),
        })
    }

    /// Fetch `line` into the buffer and check its shape.
    fn fetch(&mut self, op: &'static str, line: Line) -> LpResult<()> {
        self.source.line(line, &mut self.buf);
        let (limit, what) = match line {
            Line::Row(_) => (self.n, "column"),
            Line::Col(_) => (self.m, "row"),
        };
        ensure!(
            self.buf.ind.len() == self.buf.val.len(),
            op,
            "{:?}: {} indices but {} values",
            line,
            self.buf.ind.len(),
            self.buf.val.len()
        );
        ensure!(self.buf.len() <= limit, op, "{:?}: len = {}; invalid line length", line, self.buf.len());
        for &k in &self.buf.ind {
            ensure!(k < limit, op, "{:?}: {} index {} out of range", line, what, k);
        }
        Ok(())
    }

    /// Smallest and largest non-zero scaled magnitude of `line`.
    fn extremes(&mut self, op: &'static str, line: Line, r: &[f64], s: &[f64]) -> LpResult<Option<(f64, f64)>> {
        self.fetch(op, line)?;
        let mut range: Option<(f64, f64)> = None;
        for (k, v) in self.buf.iter() {
            let temp = match line {
                Line::Row(i) => r[i] * v.abs() * s[k],
                Line::Col(j) => r[k] * v.abs() * s[j],
            };
            if temp == 0.0 {
                continue;
            }
            range = Some(match range {
                None => (temp, temp),
                Some((lo, hi)) => (lo.min(temp), hi.max(temp)),
            });
        }
        Ok(range)
    }

    fn quality(&mut self, op: &'static str, r: &[f64], s: &[f64]) -> LpResult<f64> {
        let mut range: Option<(f64, f64)> = None;
        for i in 0..self.m {
            if let Some((lo, hi)) = self.extremes(op, Line::Row(i), r, s)? {
                range = Some(match range {
                    None => (lo, hi),
                    Some((a, b)) => (a.min(lo), b.max(hi)),
                });
            }
        }
        Ok(range.map_or(1.0, |(lo, hi)| hi / lo))
    }

    fn pass(
        &mut self,
        op: &'static str,
        r: &mut [f64],
        s: &mut [f64],
        order: ScaleOrder,
        divisor: fn(f64, f64) -> f64,
    ) -> LpResult<()> {
        let rows_first = order == ScaleOrder::RowsFirst;
        for rows in [rows_first, !rows_first] {
            if rows {
                for i in 0..self.m {
                    if let Some((lo, hi)) = self.extremes(op, Line::Row(i), r, s)? {
                        r[i] /= divisor(lo, hi);
                    }
                }
            } else {
                for j in 0..self.n {
                    if let Some((lo, hi)) = self.extremes(op, Line::Col(j), r, s)? {
                        s[j] /= divisor(lo, hi);
                    }
                }
            }
        }
        Ok(())
    }
}

/// One equilibration pass over `R*A*S`, updating `r` and `s` in place.
pub fn eq_scal<M: MatrixSource + ?Sized>(
    m: usize,
    n: usize,
    source: &M,
    r: &mut [f64],
    s: &mut [f64],
    order: ScaleOrder,
) -> LpResult<()> {
    const OP: &str = "eq_scal";
    let mut scaler = Scaler::new(OP, m, n, source, r, s)?;
    scaler.pass(OP, r, s, order, |_, hi| hi)
}

/// Iterated geometric mean scaling of `R*A*S`, updating `r` and `s` in place.
///
/// Runs at most `it_max` iterations and stops early once an iteration improves
/// the quality by less than `eps` relative to the previous one. An iteration
/// that makes the quality worse is undone. A matrix whose quality is already 1
/// (in particular one without non-zeros) is left alone. Returns the quality
/// before the first iteration followed by the quality after each kept iteration.
pub fn gm_scal<M: MatrixSource + ?Sized>(
    m: usize,
    n: usize,
    source: &M,
    r: &mut [f64],
    s: &mut [f64],
    order: ScaleOrder,
    it_max: usize,
    eps: f64,
) -> LpResult<Vec<f64>> {
    const OP: &str = "gm_scal";
    let mut scaler = Scaler::new(OP, m, n, source, r, s)?;
    let mut told = scaler.quality(OP, r, s)?;
    let mut history = vec![told];
    info!("gm_scal: max / min = {:9.3e}", told);
    for _ in 0..it_max {
        if told <= 1.0 {
            break;
        }
        let (r_prev, s_prev) = (r.to_vec(), s.to_vec());
        scaler.pass(OP, r, s, order, |lo, hi| (lo * hi).sqrt())?;
        let tnew = scaler.quality(OP, r, s)?;
        if tnew > told {
            r.copy_from_slice(&r_prev);
            s.copy_from_slice(&s_prev);
            break;
        }
        history.push(tnew);
        if told - tnew < eps * told {
            break;
        }
        told = tnew;
    }
    info!("gm_scal: max / min = {:9.3e}", history[history.len() - 1]);
    Ok(history)
}

impl Problem {
    /// Compute scale factors with the configured routine, starting from unit
    /// factors. An empty problem keeps unit factors.
    pub fn scale_prob(&mut self) -> LpResult<()> {
        let (m, n) = (self.num_rows(), self.num_cols());
        let mut r = vec![1.0; m];
        let mut s = vec![1.0; n];
        if m > 0 && n > 0 {
            let p = self.params.clone();
            match p.scale {
                ScaleMode::None => {}
                ScaleMode::Equilibrate => eq_scal(m, n, &*self, &mut r, &mut s, p.scale_order)?,
                ScaleMode::GeometricMean => {
                    gm_scal(m, n, &*self, &mut r, &mut s, p.scale_order, p.scale_max_iter, p.scale_eps)?;
                }
                ScaleMode::GeometricMeanThenEquilibrate => {
                    gm_scal(m, n, &*self, &mut r, &mut s, p.scale_order, p.scale_max_iter, p.scale_eps)?;
                    eq_scal(m, n, &*self, &mut r, &mut s, p.scale_order)?;
                }
            }
        }
        for (i, &rii) in r.iter().enumerate() {
            self.set_rii(i, rii)?;
        }
        for (j, &sjj) in s.iter().enumerate() {
            self.set_sjj(j, sjj)?;
        }
        self.invalidate_basis();
        Ok(())
    }

    /// Reset every scale factor to 1.
    pub fn unscale_prob(&mut self) {
        for var in self.rows.iter_mut().chain(self.cols.iter_mut()) {
            var.scale = 1.0;
        }
        self.invalidate_basis();
    }
}
