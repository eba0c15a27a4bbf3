//! Small numerically-stable link-function helpers used by the binary-choice
//! likelihoods.

use std::f64::consts::SQRT_2;

/// Natural log of `sqrt(2π)`.
const LN_SQRT_2PI: f64 = 0.918_938_533_204_672_7;

/// Stable `log(1 + exp(x))`.
///
/// Branchless: `log(1+exp(x)) = max(x,0) + log(1+exp(-|x|))`.
#[inline]
pub fn log1pexp(x: f64) -> f64 {
    let e = (-x.abs()).exp();
    x.max(0.0) + e.ln_1p()
}

/// Stable sigmoid: `1 / (1 + exp(-x))`.
#[inline]
pub fn sigmoid(x: f64) -> f64 {
    let e = (-x.abs()).exp();
    let recip = 1.0 / (1.0 + e);
    if x >= 0.0 { recip } else { e * recip }
}

/// Stable `log(sigmoid(x))`.
#[inline]
pub fn log_sigmoid(x: f64) -> f64 {
    if x >= 0.0 { -(-x).exp().ln_1p() } else { x - x.exp().ln_1p() }
}

/// Standard normal density.
#[inline]
pub fn std_normal_pdf(x: f64) -> f64 {
    (-0.5 * x * x - LN_SQRT_2PI).exp()
}

/// Standard normal CDF, `Φ(x) = 0.5 * erfc(-x / sqrt(2))`.
///
/// erfc keeps relative accuracy in the lower tail.
#[inline]
pub fn std_normal_cdf(x: f64) -> f64 {
    0.5 * statrs::function::erf::erfc(-x / SQRT_2)
}

/// `log Φ(x)`, finite far into the lower tail.
///
/// Below `x = -30` the Mills-ratio asymptote is used instead of logging an
/// underflowed CDF.
pub fn std_normal_log_cdf(x: f64) -> f64 {
    if x > -30.0 {
        return std_normal_cdf(x).ln();
    }
    let x2 = x * x;
    -0.5 * x2 - LN_SQRT_2PI - (-x).ln() + (1.0 - 1.0 / x2 + 3.0 / (x2 * x2)).ln()
}

/// Inverse Mills ratio `φ(x) / Φ(x)`, stable for very negative `x`.
pub fn inverse_mills(x: f64) -> f64 {
    if x > -30.0 {
        return std_normal_pdf(x) / std_normal_cdf(x);
    }
    (-0.5 * x * x - LN_SQRT_2PI - std_normal_log_cdf(x)).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_log1pexp_matches_naive_moderate_values() {
        for x in [-10.0_f64, -2.0, -0.1, 0.0, 0.1, 2.0, 10.0] {
            let naive = (1.0 + x.exp()).ln();
            assert_abs_diff_eq!(log1pexp(x), naive, epsilon = 1e-12);
        }
        assert!((log1pexp(1e6) - 1e6).abs() < 1e-6);
        assert!(log1pexp(-1e6).is_finite());
    }

    #[test]
    fn test_sigmoid_bounds_and_symmetry() {
        for x in [-50.0, -10.0, -1.0, 0.0, 1.0, 10.0, 50.0] {
            let s = sigmoid(x);
            assert!((0.0..=1.0).contains(&s), "sigmoid({})={}", x, s);
            assert!((s + sigmoid(-x) - 1.0).abs() < 1e-15, "symmetry failed at {}", x);
            assert_abs_diff_eq!(log_sigmoid(x), s.ln(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_normal_cdf_known_values() {
        assert_abs_diff_eq!(std_normal_cdf(0.0), 0.5, epsilon = 1e-15);
        assert_abs_diff_eq!(std_normal_cdf(1.959_963_984_540_054), 0.975, epsilon = 1e-12);
        assert_abs_diff_eq!(std_normal_pdf(0.0), 0.398_942_280_401_432_7, epsilon = 1e-15);
    }

    #[test]
    fn test_log_cdf_and_mills_continuous_across_switch() {
        let below = std_normal_log_cdf(-30.0 - 1e-9);
        let above = std_normal_log_cdf(-30.0 + 1e-9);
        assert!((below - above).abs() < 1e-3, "{} vs {}", below, above);
        assert!(std_normal_log_cdf(-200.0).is_finite());

        // φ(x)/Φ(x) ≈ -x for very negative x.
        let m = inverse_mills(-60.0);
        assert!((m - 60.0).abs() / 60.0 < 1e-3, "mills={}", m);
        assert_abs_diff_eq!(inverse_mills(0.0), 2.0 * std_normal_pdf(0.0), epsilon = 1e-14);
    }
}
