// Least-squares polynomial fitting on a uniform grid
//
// Small dense normal-equation solver used by the Savitzky-Golay stage. The
// grid is centred and scaled to [-1, 1] before fitting so the normal matrix
// stays well conditioned for windows of a hundred or more points.

/// Uniform sample grid `0..len` mapped onto `[-1, 1]`
pub(crate) struct PolyGrid {
    len: usize,
    order: usize,
    centre: f64,
    half_span: f64,
    normal: Vec<Vec<f64>>,
}

impl PolyGrid {
    /// Grid of `len` points for a polynomial of `order` (`order < len`)
    pub(crate) fn new(len: usize, order: usize) -> Self {
        debug_assert!(order < len);
        let centre = (len as f64 - 1.0) / 2.0;
        let half_span = centre.max(1.0);
        let mut grid = Self {
            len,
            order,
            centre,
            half_span,
            normal: Vec::new(),
        };

        let terms = order + 1;
        let mut normal = vec![vec![0.0; terms]; terms];
        for j in 0..len {
            let powers = grid.powers(j as f64);
            for a in 0..terms {
                for b in 0..terms {
                    normal[a][b] += powers[a] * powers[b];
                }
            }
        }
        grid.normal = normal;
        grid
    }

    fn scaled(&self, t: f64) -> f64 {
        (t - self.centre) / self.half_span
    }

    fn powers(&self, t: f64) -> Vec<f64> {
        let u = self.scaled(t);
        let mut out = Vec::with_capacity(self.order + 1);
        let mut p = 1.0;
        for _ in 0..=self.order {
            out.push(p);
            p *= u;
        }
        out
    }

    /// Convolution weights giving the fitted value at the grid centre
    pub(crate) fn centre_weights(&self) -> Vec<f64> {
        let mut e0 = vec![0.0; self.order + 1];
        e0[0] = 1.0;
        let z = solve(self.normal.clone(), e0);
        (0..self.len)
            .map(|j| {
                self.powers(j as f64)
                    .iter()
                    .zip(&z)
                    .map(|(p, c)| p * c)
                    .sum()
            })
            .collect()
    }

    /// Fit `values` (one per grid point) and evaluate the polynomial at `t`
    pub(crate) fn fit(&self, values: &[f64]) -> FittedPoly<'_> {
        debug_assert_eq!(values.len(), self.len);
        let terms = self.order + 1;
        let mut rhs = vec![0.0; terms];
        for (j, &y) in values.iter().enumerate() {
            for (a, p) in self.powers(j as f64).into_iter().enumerate() {
                rhs[a] += p * y;
            }
        }
        FittedPoly {
            grid: self,
            coeffs: solve(self.normal.clone(), rhs),
        }
    }
}

pub(crate) struct FittedPoly<'a> {
    grid: &'a PolyGrid,
    coeffs: Vec<f64>,
}

impl FittedPoly<'_> {
    pub(crate) fn eval(&self, t: f64) -> f64 {
        let u = self.grid.scaled(t);
        // Horner
        self.coeffs.iter().rev().fold(0.0, |acc, &c| acc * u + c)
    }
}

/// Gaussian elimination with partial pivoting; the matrix is SPD here
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Vec<f64> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        a.swap(col, pivot);
        b.swap(col, pivot);

        let diag = a[col][col];
        if diag.abs() < f64::EPSILON {
            continue;
        }
        for row in col + 1..n {
            let factor = a[row][col] / diag;
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        let diag = a[row][row];
        x[row] = if diag.abs() < f64::EPSILON {
            0.0
        } else {
            (b[row] - tail) / diag
        };
    }
    x
}
