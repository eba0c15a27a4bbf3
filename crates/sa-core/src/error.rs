//! Error types for STATAU

use thiserror::Error;

/// STATAU error type.
///
/// Every variant is a recoverable failure of a single analysis request.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// One or more requested variables are not columns of the dataset.
    #[error("variable(s) not found in dataset: {}", names.join(", "))]
    MissingVariable {
        /// Offending variable names, in request order.
        names: Vec<String>,
    },

    /// No rows remain after dropping missing values.
    #[error("no complete observations for: {}", variables.join(", "))]
    EmptySample {
        /// Variables that were required to be jointly non-missing.
        variables: Vec<String>,
    },

    /// Design matrix (or an auxiliary regression) is rank-deficient.
    #[error("singular design: {context}")]
    SingularDesign {
        /// Where the singularity was detected.
        context: String,
    },

    /// Cluster-robust covariance needs at least two clusters.
    #[error("cluster variable '{variable}' has {found} distinct cluster(s); at least 2 required")]
    InsufficientClusters {
        /// Cluster variable name.
        variable: String,
        /// Number of distinct clusters in the estimation sample.
        found: usize,
    },

    /// Dependent variable does not satisfy the estimator's contract.
    #[error("invalid dependent variable '{variable}': {reason}")]
    InvalidDependentVariable {
        /// Dependent variable name.
        variable: String,
        /// Human-readable reason.
        reason: String,
    },

    /// Iterative estimator did not converge within its iteration budget.
    #[error("{method} did not converge after {iterations} iterations")]
    Convergence {
        /// Estimator label.
        method: String,
        /// Iterations performed.
        iterations: usize,
    },

    /// Hausman covariance difference is not positive (semi-)definite.
    #[error(
        "V_fe - V_re is not positive definite (min eigenvalue {min_eigenvalue:e}); \
         non-positive variances for: {}; rerun with sigmamore",
        variables.join(", ")
    )]
    NonPositiveDefiniteCovariance {
        /// Terms whose variance difference is non-positive.
        variables: Vec<String>,
        /// Smallest eigenvalue of the covariance difference.
        min_eigenvalue: f64,
    },

    /// A numeric operation was requested on a categorical column.
    #[error("variable '{name}' is not numeric")]
    NonNumericVariable {
        /// Column name.
        name: String,
    },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context() {
        let e = Error::MissingVariable { names: vec!["gdp".into(), "pop".into()] };
        assert_eq!(e.to_string(), "variable(s) not found in dataset: gdp, pop");

        let e = Error::InsufficientClusters { variable: "region".into(), found: 1 };
        assert!(e.to_string().contains("region"));
        assert!(e.to_string().contains("1 distinct"));

        let e = Error::Convergence { method: "logit".into(), iterations: 100 };
        assert_eq!(e.to_string(), "logit did not converge after 100 iterations");
    }
}
