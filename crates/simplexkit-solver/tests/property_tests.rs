//! Property-based tests for basis solves and scaling

use proptest::prelude::*;
use simplexkit_solver::*;

const M: usize = 3;

/// Square problem whose basis is made of all columns, with a diagonally
/// dominant matrix so that the basis is never singular.
fn column_basis(a: &[f64], r: &[f64], s: &[f64]) -> Problem {
    let mut lp = Problem::new();
    lp.add_rows(M).unwrap();
    lp.add_cols(M).unwrap();
    for i in 0..M {
        let val: Vec<f64> = (0..M).map(|j| if i == j { 4.0 } else { a[i * M + j] }).collect();
        let ind: Vec<usize> = (0..M).collect();
        lp.set_mat_row(i, &ind, &val).unwrap();
        lp.set_row_bnds(i, Bounds::Fixed(0.0)).unwrap();
        lp.set_row_stat(i, VarStatus::NonbasicFixed).unwrap();
        lp.set_col_stat(i, VarStatus::Basic).unwrap();
        lp.set_rii(i, r[i]).unwrap();
        lp.set_sjj(i, s[i]).unwrap();
    }
    assert_eq!(lp.invert(), InvertStatus::Success);
    lp
}

fn dot(x: &[f64], y: &[f64]) -> f64 {
    x.iter().zip(y).map(|(a, b)| a * b).sum()
}

fn dense_source(a: Vec<f64>, n: usize) -> impl Fn(Line, &mut SparseVec) {
    move |line: Line, out: &mut SparseVec| {
        let m = a.len() / n;
        match line {
            Line::Row(i) => (0..n).filter(|&j| a[i * n + j] != 0.0).for_each(|j| out.push(j, a[i * n + j])),
            Line::Col(j) => (0..m).filter(|&i| a[i * n + j] != 0.0).for_each(|i| out.push(i, a[i * n + j])),
        }
    }
}

proptest! {
    #[test]
    fn ftran_solves_basis_system(
        a in prop::collection::vec(-1.0f64..1.0, M * M),
        r in prop::collection::vec(0.25f64..4.0, M),
        s in prop::collection::vec(0.25f64..4.0, M),
        u in prop::collection::vec(-10.0f64..10.0, M),
    ) {
        let lp = column_basis(&a, &r, &s);
        let mut x = u.clone();
        lp.ftran(&mut x).unwrap();
        // B = -A for an all-column basis
        for i in 0..M {
            let row = lp.get_mat_row(i).unwrap();
            let bx: f64 = row.iter().map(|(j, v)| -v * x[j]).sum();
            prop_assert!((bx - u[i]).abs() <= 1e-9 * (1.0 + u[i].abs()));
        }
    }

    #[test]
    fn ftran_and_btran_are_adjoint(
        a in prop::collection::vec(-1.0f64..1.0, M * M),
        r in prop::collection::vec(0.25f64..4.0, M),
        s in prop::collection::vec(0.25f64..4.0, M),
        u in prop::collection::vec(-10.0f64..10.0, M),
        v in prop::collection::vec(-10.0f64..10.0, M),
    ) {
        let lp = column_basis(&a, &r, &s);
        let mut x = u.clone();
        lp.ftran(&mut x).unwrap();
        let mut y = v.clone();
        lp.btran(&mut y).unwrap();
        // v' * inv(B) * u computed both ways
        let lhs = dot(&v, &x);
        let rhs = dot(&y, &u);
        prop_assert!((lhs - rhs).abs() <= 1e-9 * (1.0 + lhs.abs()));
    }

    #[test]
    fn gm_scal_quality_never_increases(
        a in prop::collection::vec(prop_oneof![Just(0.0), 0.001f64..1000.0, -1000.0f64..-0.001], 12),
    ) {
        let (m, n) = (3, 4);
        prop_assume!((0..m).all(|i| (0..n).any(|j| a[i * n + j] != 0.0)));
        prop_assume!((0..n).all(|j| (0..m).any(|i| a[i * n + j] != 0.0)));
        let source = dense_source(a, n);
        let mut r = vec![1.0; m];
        let mut s = vec![1.0; n];
        let history = gm_scal(m, n, &source, &mut r, &mut s, ScaleOrder::RowsFirst, 20, 0.01).unwrap();
        prop_assert!(!history.is_empty());
        for pair in history.windows(2) {
            prop_assert!(pair[1] <= pair[0]);
        }
        prop_assert!(r.iter().chain(&s).all(|f| f.is_finite() && *f > 0.0));
    }

    #[test]
    fn equilibration_bounds_every_entry(
        a in prop::collection::vec(prop_oneof![Just(0.0), 0.001f64..1000.0, -1000.0f64..-0.001], 12),
        cols_first in any::<bool>(),
    ) {
        let (m, n) = (4, 3);
        let order = if cols_first { ScaleOrder::ColsFirst } else { ScaleOrder::RowsFirst };
        let source = dense_source(a.clone(), n);
        let mut r = vec![1.0; m];
        let mut s = vec![1.0; n];
        eq_scal(m, n, &source, &mut r, &mut s, order).unwrap();
        for i in 0..m {
            for j in 0..n {
                prop_assert!((r[i] * a[i * n + j] * s[j]).abs() <= 1.0 + 1e-12);
            }
        }
    }
}
