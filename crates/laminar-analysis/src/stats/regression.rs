// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Ordinary least squares without an intercept.

Class probabilities of a region sum to one per subject, so a constant column
would be collinear with the design matrix. Goodness of fit is therefore the
uncentered form:

- `R^2 = 1 - SSR / sum(y^2)`
- `adjusted R^2 = 1 - n / (n - p) * (1 - R^2)`

Coefficient p-values are two-sided Student t tests with `n - p` degrees of
freedom.

The fit runs on a thin QR factorization `X = QR`; `(X'X)^-1 = R^-1 R^-T`
gives the coefficient variances.
*/

use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Relative size of a diagonal entry of `R` below which the design is
/// treated as rank deficient
const RANK_TOLERANCE: f64 = 1e-10;

/// Fit summary of one region
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionRow {
    pub rsquared: f64,
    pub rsquared_adj: f64,
    /// One per class
    pub pvalues: Vec<f64>,
    pub coefficients: Vec<f64>,
    pub n_obs: usize,
}

impl RegressionRow {
    /// Row for a fit that could not be estimated
    pub fn degenerate(n_classes: usize, n_obs: usize) -> Self {
        Self {
            rsquared: f64::NAN,
            rsquared_adj: f64::NAN,
            pvalues: vec![f64::NAN; n_classes],
            coefficients: vec![f64::NAN; n_classes],
            n_obs,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.rsquared.is_nan()
    }

    /// Smallest class p-value, NaN for a degenerate row
    pub fn min_pvalue(&self) -> f64 {
        self.pvalues
            .iter()
            .copied()
            .filter(|p| !p.is_nan())
            .reduce(f64::min)
            .unwrap_or(f64::NAN)
    }
}

/// Regress `y` on the columns of `x`.
///
/// Degenerate when `X` is rank deficient, there are no residual degrees of
/// freedom, or `y` is all zeros; such rows are all-NaN apart from `n_obs`.
pub fn fit_ols_no_intercept(x: &Array2<f64>, y: &Array1<f64>) -> RegressionRow {
    let (n_obs, n_params) = x.dim();
    if n_obs <= n_params || n_params == 0 {
        return RegressionRow::degenerate(n_params, n_obs);
    }

    let design = DMatrix::from_fn(n_obs, n_params, |i, j| x[[i, j]]);
    let scores = DVector::from_iterator(n_obs, y.iter().copied());

    let total_ss = scores.norm_squared();
    if total_ss == 0.0 || !total_ss.is_finite() {
        return RegressionRow::degenerate(n_params, n_obs);
    }

    let Some(fit) = LeastSquaresFit::solve(&design, &scores) else {
        return RegressionRow::degenerate(n_params, n_obs);
    };

    let residuals = &scores - &design * &fit.beta;
    let residual_ss = residuals.norm_squared();
    let df_resid = (n_obs - n_params) as f64;

    let rsquared = 1.0 - residual_ss / total_ss;
    let rsquared_adj = 1.0 - (n_obs as f64 / df_resid) * (1.0 - rsquared);

    let sigma2 = residual_ss / df_resid;
    let pvalues = match StudentsT::new(0.0, 1.0, df_resid) {
        Ok(dist) => fit
            .beta
            .iter()
            .enumerate()
            .map(|(j, b)| {
                let se = (sigma2 * fit.xtx_inv[(j, j)]).sqrt();
                two_sided_p(&dist, b / se)
            })
            .collect(),
        Err(e) => {
            tracing::debug!("No t distribution for df={}: {}", df_resid, e);
            vec![f64::NAN; n_params]
        }
    };

    RegressionRow {
        rsquared,
        rsquared_adj,
        pvalues,
        coefficients: fit.beta.iter().copied().collect(),
        n_obs,
    }
}

struct LeastSquaresFit {
    beta: DVector<f64>,
    /// `(X'X)^-1`
    xtx_inv: DMatrix<f64>,
}

impl LeastSquaresFit {
    /// `None` when `design` is not finite or its columns are (numerically)
    /// linearly dependent.
    fn solve(design: &DMatrix<f64>, scores: &DVector<f64>) -> Option<Self> {
        if design.iter().any(|v| !v.is_finite()) {
            return None;
        }

        let qr = design.clone().qr();
        let r = qr.r();
        let diagonal = r.diagonal().abs();
        let scale = diagonal.max();
        if scale == 0.0 || diagonal.min() <= scale * RANK_TOLERANCE {
            return None;
        }

        let qty = qr.q().transpose() * scores;
        let beta = r.solve_upper_triangular(&qty)?;
        let r_inv = r.try_inverse()?;
        let xtx_inv = &r_inv * r_inv.transpose();
        Some(Self { beta, xtx_inv })
    }
}

fn two_sided_p(dist: &StudentsT, t: f64) -> f64 {
    if t.is_nan() {
        f64::NAN
    } else if t.is_infinite() {
        0.0
    } else {
        (2.0 * dist.sf(t.abs())).min(1.0)
    }
}

/// Fit region `region` from `(matrix, score)` observations.
///
/// A subject whose score or any class value at this region is NaN is left
/// out of this fit only.
pub(crate) fn regress_region(
    region: usize,
    observations: &[(ArrayView2<'_, f64>, f64)],
    n_classes: usize,
) -> RegressionRow {
    let mut design = Vec::with_capacity(observations.len() * n_classes);
    let mut scores = Vec::with_capacity(observations.len());
    for (matrix, score) in observations {
        let row = matrix.row(region);
        if score.is_nan() || row.iter().any(|v| v.is_nan()) {
            continue;
        }
        design.extend(row.iter().copied());
        scores.push(*score);
    }

    let n_obs = scores.len();
    match Array2::from_shape_vec((n_obs, n_classes), design) {
        Ok(x) => fit_ols_no_intercept(&x, &Array1::from(scores)),
        Err(_) => RegressionRow::degenerate(n_classes, n_obs),
    }
}
