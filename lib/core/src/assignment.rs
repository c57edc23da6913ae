//! Optimal bipartite assignment
//!
//! Pairs ground-truth items with predicted items so that the total
//! similarity of the chosen pairs is maximal. The solver is the
//! classic O(n³) Hungarian algorithm in its potentials form, run on
//! negated similarities; the shorter side is always oriented as rows,
//! which guarantees an assignment of size `min(|gt|, |pred|)` without
//! dummy padding.
//!
//! Ties between equal-total assignments are broken deterministically:
//! rows are processed in index order and equal reduced costs resolve to
//! the lowest column index. Tie-breaking changes which pairs witness a
//! non-match report, never the emitted counts.

use ordered_float::OrderedFloat;

/// Result of matching two item lists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Matched `(gt_index, pred_index)` pairs, sorted by gt index
    pub pairs: Vec<(usize, usize)>,
    /// Ground-truth indices left unmatched (`|gt| > |pred|` only)
    pub unmatched_gt: Vec<usize>,
    /// Prediction indices left unmatched (`|pred| > |gt|` only)
    pub unmatched_pred: Vec<usize>,
}

/// Solve the maximum-similarity assignment for a `|gt| x |pred|` matrix
///
/// `matrix[i][j]` is the similarity of `gt[i]` to `pred[j]`. Rows of
/// unequal length are a caller bug; scores are expected in [0,1] but
/// any finite values work.
pub fn solve(matrix: &[Vec<f64>]) -> Assignment {
    let rows = matrix.len();
    let cols = matrix.first().map_or(0, Vec::len);

    if rows == 0 || cols == 0 {
        return Assignment {
            pairs: Vec::new(),
            unmatched_gt: (0..rows).collect(),
            unmatched_pred: (0..cols).collect(),
        };
    }

    if rows <= cols {
        let row_to_col = hungarian(rows, cols, |i, j| -matrix[i][j]);
        build(rows, cols, &row_to_col, false)
    } else {
        // Transpose so the solver sees rows <= cols, then swap back.
        let row_to_col = hungarian(cols, rows, |i, j| -matrix[j][i]);
        build(cols, rows, &row_to_col, true)
    }
}

fn build(rows: usize, cols: usize, row_to_col: &[usize], transposed: bool) -> Assignment {
    let mut matched_cols = vec![false; cols];
    let mut pairs: Vec<(usize, usize)> = row_to_col
        .iter()
        .enumerate()
        .map(|(r, &c)| {
            matched_cols[c] = true;
            if transposed {
                (c, r)
            } else {
                (r, c)
            }
        })
        .collect();
    pairs.sort_unstable();

    let leftover: Vec<usize> = (0..cols).filter(|&c| !matched_cols[c]).collect();
    if transposed {
        Assignment {
            pairs,
            unmatched_gt: leftover,
            unmatched_pred: Vec::new(),
        }
    } else {
        Assignment {
            pairs,
            unmatched_gt: Vec::new(),
            unmatched_pred: leftover,
        }
    }
}

/// Potentials-form Hungarian algorithm, minimizing `cost` over an
/// `n x m` matrix with `n <= m`. Returns the assigned column per row.
fn hungarian<F>(n: usize, m: usize, cost: F) -> Vec<usize>
where
    F: Fn(usize, usize) -> f64,
{
    // 1-based arrays; index 0 is the virtual start column/row.
    let mut u = vec![0.0f64; n + 1];
    let mut v = vec![0.0f64; m + 1];
    let mut col_to_row = vec![0usize; m + 1];
    let mut way = vec![0usize; m + 1];

    for i in 1..=n {
        col_to_row[0] = i;
        let mut j0 = 0usize;
        let mut minv = vec![f64::INFINITY; m + 1];
        let mut used = vec![false; m + 1];

        loop {
            used[j0] = true;
            let i0 = col_to_row[j0];
            for j in 1..=m {
                if !used[j] {
                    let reduced = cost(i0 - 1, j - 1) - u[i0] - v[j];
                    if reduced < minv[j] {
                        minv[j] = reduced;
                        way[j] = j0;
                    }
                }
            }

            // Lowest column index wins equal reduced costs.
            let (j1, delta) = (1..=m)
                .filter(|&j| !used[j])
                .map(|j| (j, minv[j]))
                .min_by_key(|&(_, value)| OrderedFloat(value))
                .expect("n <= m leaves a free column on every augmenting step");

            for j in 0..=m {
                if used[j] {
                    u[col_to_row[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }

            j0 = j1;
            if col_to_row[j0] == 0 {
                break;
            }
        }

        // Walk the augmenting path back, flipping assignments.
        loop {
            let j1 = way[j0];
            col_to_row[j0] = col_to_row[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut row_to_col = vec![0usize; n];
    for j in 1..=m {
        if col_to_row[j] != 0 {
            row_to_col[col_to_row[j] - 1] = j - 1;
        }
    }
    row_to_col
}
