//! Binary-choice maximum likelihood: logit and probit.
//!
//! Newton–Raphson from `β = 0` with step halving on the observed
//! information. The classical covariance is the inverse information; the
//! robust and cluster variants use the generalized residuals `∂ℓ_i/∂η_i` as
//! scores.

use nalgebra::{DMatrix, DVector};
use sa_core::{Dataset, Error, FitStats, Method, ModelSpec, Result, StatKind};
use sa_prob::math::{inverse_mills, log1pexp, sigmoid, std_normal_log_cdf};

use crate::covariance::{AdjustedCovariance, Sandwich, adjust, ensure_full_rank};
use crate::normalize::RawFit;
use crate::sample::EstimationSample;

/// Newton iteration budget.
pub const MLE_MAX_ITER: usize = 100;

/// Convergence tolerance on the largest Newton step.
pub const MLE_TOL: f64 = 1e-8;

const MAX_HALVINGS: usize = 40;

/// Link function of a binary-choice model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    /// Logistic CDF.
    Logit,
    /// Standard normal CDF.
    Probit,
}

impl Link {
    fn method(self) -> Method {
        match self {
            Link::Logit => Method::Logit,
            Link::Probit => Method::Probit,
        }
    }

    /// Log-likelihood contribution, generalized residual and information
    /// weight of one observation.
    #[inline]
    fn contribution(self, y: f64, eta: f64) -> (f64, f64, f64) {
        match self {
            Link::Logit => {
                let p = sigmoid(eta);
                (y * eta - log1pexp(eta), y - p, p * (1.0 - p))
            }
            Link::Probit => {
                let q = 2.0 * y - 1.0;
                let lambda = q * inverse_mills(q * eta);
                (std_normal_log_cdf(q * eta), lambda, lambda * (lambda + eta))
            }
        }
    }
}

/// Log-likelihood, score, information and generalized residuals at `beta`.
struct Evaluation {
    ll: f64,
    score: DVector<f64>,
    info: DMatrix<f64>,
    residuals: DVector<f64>,
}

fn evaluate(link: Link, x: &DMatrix<f64>, y: &[f64], beta: &DVector<f64>) -> Evaluation {
    let eta = x * beta;
    let n = y.len();
    let mut ll = 0.0;
    let mut residuals = DVector::zeros(n);
    let mut weights = DVector::zeros(n);
    for i in 0..n {
        let (l, g, w) = link.contribution(y[i], eta[i]);
        ll += l;
        residuals[i] = g;
        weights[i] = w;
    }
    let score = x.transpose() * &residuals;
    let mut xw = x.clone();
    for (i, mut row) in xw.row_iter_mut().enumerate() {
        row *= weights[i];
    }
    let info = x.transpose() * xw;
    Evaluation { ll, score, info, residuals }
}

fn log_likelihood(link: Link, x: &DMatrix<f64>, y: &[f64], beta: &DVector<f64>) -> f64 {
    let eta = x * beta;
    y.iter().zip(eta.iter()).map(|(&yi, &e)| link.contribution(yi, e).0).sum()
}

/// Maximize the binary-choice likelihood on `[X, 1]`.
///
/// Returns the estimate and the evaluation at it.
fn newton(link: Link, x: &DMatrix<f64>, y: &[f64]) -> Result<(DVector<f64>, Evaluation)> {
    let method = link.method().label();
    let mut beta = DVector::zeros(x.ncols());
    let mut eval = evaluate(link, x, y, &beta);

    for iter in 1..=MLE_MAX_ITER {
        let Some(chol) = eval.info.clone().cholesky() else {
            // Weights are constant at β = 0, so only a singular design fails
            // there; later the likelihood is running off to a boundary.
            if iter == 1 {
                return Err(Error::SingularDesign {
                    context: format!("{method}: information matrix is not positive definite"),
                });
            }
            log::warn!("{method}: information matrix degenerated at iteration {iter} (separation?)");
            return Err(Error::Convergence { method: method.to_string(), iterations: iter });
        };
        let step = chol.solve(&eval.score);

        let mut scale = 1.0;
        let mut candidate = &beta + &step;
        let mut ll_new = log_likelihood(link, x, y, &candidate);
        let mut halvings = 0;
        while !(ll_new.is_finite() && ll_new >= eval.ll - 1e-12 * eval.ll.abs().max(1.0)) {
            halvings += 1;
            if halvings > MAX_HALVINGS {
                break;
            }
            scale *= 0.5;
            candidate = &beta + &step * scale;
            ll_new = log_likelihood(link, x, y, &candidate);
        }

        let max_step = (&step * scale).amax();
        let max_beta = candidate.amax();
        beta = candidate;
        eval = evaluate(link, x, y, &beta);

        if max_step <= MLE_TOL * (1.0 + max_beta) {
            log::debug!("{method}: converged after {iter} iterations, ll={:.6}", eval.ll);
            return Ok((beta, eval));
        }
    }
    Err(Error::Convergence { method: method.to_string(), iterations: MLE_MAX_ITER })
}

/// Fit a logit or probit model.
pub fn fit_binary(ds: &Dataset, spec: &ModelSpec, link: Link) -> Result<RawFit> {
    let sample = EstimationSample::build(ds, spec, &[], None)?;
    if let Some(bad) = sample.y.iter().find(|&&v| v != 0.0 && v != 1.0) {
        return Err(Error::InvalidDependentVariable {
            variable: sample.dependent.clone(),
            reason: format!("values must be 0 or 1, found {bad}"),
        });
    }
    let n = sample.n();
    let nf = n as f64;
    let p_bar = sample.y.iter().sum::<f64>() / nf;
    if p_bar == 0.0 || p_bar == 1.0 {
        return Err(Error::InvalidDependentVariable {
            variable: sample.dependent.clone(),
            reason: "outcome does not vary".into(),
        });
    }

    let x = sample.design_with_constant();
    ensure_full_rank(&x, link.method().label())?;
    let (beta, eval) = newton(link, &x, &sample.y)?;

    let chol = eval.info.clone().cholesky().ok_or_else(|| Error::SingularDesign {
        context: format!("{}: information matrix is singular at the optimum", link.method().label()),
    })?;
    let cov_raw = chol.inverse();
    let k = x.ncols() as f64;
    let df_resid = nf - k;
    let AdjustedCovariance { cov, n_clusters } = adjust(
        &cov_raw,
        &Sandwich { bread: &cov_raw, design: &x, residuals: &eval.residuals, df_resid },
        &sample.policy,
    )?;

    // Intercept-only likelihood: fitted probability is the sample mean for
    // both links.
    let ll0 = nf * (p_bar * p_bar.ln() + (1.0 - p_bar) * (1.0 - p_bar).ln());
    let ll = eval.ll;
    let stats = FitStats {
        n_obs: n,
        pseudo_r_squared: Some(1.0 - ll / ll0),
        lr_chi2: Some(2.0 * (ll - ll0)),
        log_likelihood: Some(ll),
        null_log_likelihood: Some(ll0),
        aic: Some(-2.0 * ll + 2.0 * k),
        bic: Some(-2.0 * ll + nf.ln() * k),
        n_clusters,
        ..Default::default()
    };

    let rss = eval.residuals.norm_squared();
    Ok(RawFit {
        method: link.method(),
        dependent: sample.dependent.clone(),
        names: sample.term_names(),
        beta,
        cov_raw,
        cov,
        se_kind: sample.policy.kind(),
        stat_kind: StatKind::Z,
        residuals: eval.residuals,
        rss,
        df_resid,
        stats,
        absorbed: Vec::new(),
    })
}
