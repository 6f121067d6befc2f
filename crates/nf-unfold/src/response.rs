//! Response-matrix construction and the two unfolding solvers.

use nalgebra::{DMatrix, DVector};
use nf_core::{Error, Result};

/// Solver selection. Negative iteration counts (the CLI's convention)
/// select inversion; see [`Method::from_iterations`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Direct inversion of the response matrix: single pass, no
    /// regularization. Requires a square, non-singular response.
    Inversion,
    /// d'Agostini iterative Bayesian refinement for exactly `iterations`
    /// rounds, starting from the migration's truth projection as prior.
    /// Zero rounds returns the prior itself.
    Bayes {
        /// Number of refinement rounds.
        iterations: usize,
    },
}

impl Method {
    /// Map the pipeline's iteration parameter onto a solver:
    /// `n < 0` means inversion, `n >= 0` means `n` Bayesian rounds.
    pub fn from_iterations(n: i64) -> Self {
        if n < 0 {
            Method::Inversion
        } else {
            Method::Bayes { iterations: n as usize }
        }
    }
}

/// A column-normalized response matrix built from one migration plane:
/// `r[(reco, truth)]` is the probability for an event in truth bin `truth`
/// to be reconstructed in reco bin `reco`. The raw truth projection is kept
/// as the Bayesian prior.
#[derive(Debug, Clone)]
pub struct ResponseMatrix {
    r: DMatrix<f64>,
    prior: DVector<f64>,
}

impl ResponseMatrix {
    /// Build from a reco-major migration plane of raw event counts.
    pub fn build(plane: &[f64], n_reco: usize, n_truth: usize) -> Result<Self> {
        if plane.len() != n_reco * n_truth {
            return Err(Error::Unfolding(format!(
                "migration plane has {} cells, expected {n_reco}×{n_truth}",
                plane.len()
            )));
        }
        if plane.iter().any(|v| !v.is_finite()) {
            return Err(Error::Unfolding("migration plane contains non-finite cells".into()));
        }

        let mut prior = DVector::zeros(n_truth);
        for i in 0..n_reco {
            for j in 0..n_truth {
                prior[j] += plane[i * n_truth + j];
            }
        }
        if prior.iter().all(|&v| v == 0.0) {
            return Err(Error::Unfolding("migration plane is empty".into()));
        }

        let mut r = DMatrix::zeros(n_reco, n_truth);
        for j in 0..n_truth {
            if prior[j] == 0.0 {
                continue;
            }
            for i in 0..n_reco {
                r[(i, j)] = plane[i * n_truth + j] / prior[j];
            }
        }

        Ok(ResponseMatrix { r, prior })
    }

    /// Number of reconstructed bins.
    pub fn n_reco(&self) -> usize {
        self.r.nrows()
    }

    /// Number of true bins.
    pub fn n_truth(&self) -> usize {
        self.r.ncols()
    }

    /// The raw truth projection of the migration plane.
    pub fn prior(&self) -> &DVector<f64> {
        &self.prior
    }

    /// Unfold a measured spectrum, returning the truth-binned estimate.
    pub fn unfold(&self, folded: &[f64], method: Method) -> Result<Vec<f64>> {
        Ok(self.solve(folded, method)?.0)
    }

    /// Unfold and also return the linearized unfolding matrix `U`
    /// (`n_truth × n_reco`, the estimate is `U · folded`), used for
    /// statistical-covariance propagation.
    pub fn solve(&self, folded: &[f64], method: Method) -> Result<(Vec<f64>, DMatrix<f64>)> {
        if folded.len() != self.n_reco() {
            return Err(Error::Unfolding(format!(
                "folded spectrum has {} bins, response expects {}",
                folded.len(),
                self.n_reco()
            )));
        }
        let m = DVector::from_column_slice(folded);

        let (x, u) = match method {
            Method::Inversion => self.invert(&m)?,
            Method::Bayes { iterations } => self.bayes(&m, iterations),
        };

        if x.iter().any(|v| !v.is_finite()) {
            return Err(Error::Unfolding("solver produced non-finite bin contents".into()));
        }
        Ok((x.iter().copied().collect(), u))
    }

    fn invert(&self, m: &DVector<f64>) -> Result<(DVector<f64>, DMatrix<f64>)> {
        if self.n_reco() != self.n_truth() {
            return Err(Error::Unfolding(format!(
                "inversion needs a square response, got {}×{}",
                self.n_reco(),
                self.n_truth()
            )));
        }
        let u = self
            .r
            .clone()
            .lu()
            .try_inverse()
            .ok_or_else(|| Error::Unfolding("response matrix is singular".into()))?;
        let x = &u * m;
        Ok((x, u))
    }

    /// Successive approximation toward the maximum-likelihood solution.
    /// Each round rebuilds the Bayes matrix from the current truth estimate
    /// and applies it to the measured spectrum. With zero rounds the
    /// estimate is the prior and does not depend on the data at all, so the
    /// returned `U` is zero.
    fn bayes(&self, m: &DVector<f64>, iterations: usize) -> (DVector<f64>, DMatrix<f64>) {
        let (n_reco, n_truth) = (self.n_reco(), self.n_truth());
        let mut theta = self.prior.clone();
        let mut u = DMatrix::zeros(n_truth, n_reco);

        for _ in 0..iterations {
            let f = &self.r * &theta;
            u.fill(0.0);
            for i in 0..n_reco {
                if f[i] == 0.0 {
                    continue;
                }
                for j in 0..n_truth {
                    u[(j, i)] = theta[j] * self.r[(i, j)] / f[i];
                }
            }
            theta = &u * m;
        }

        (theta, u)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn identity_plane(n: usize, counts: &[f64]) -> Vec<f64> {
        let mut plane = vec![0.0; n * n];
        for (i, &c) in counts.iter().enumerate() {
            plane[i * n + i] = c;
        }
        plane
    }

    #[test]
    fn from_iterations_selects_solver() {
        assert_eq!(Method::from_iterations(-1), Method::Inversion);
        assert_eq!(Method::from_iterations(0), Method::Bayes { iterations: 0 });
        assert_eq!(Method::from_iterations(4), Method::Bayes { iterations: 4 });
    }

    #[test]
    fn identity_migration_returns_input_under_inversion() {
        let response = ResponseMatrix::build(&identity_plane(3, &[5.0, 8.0, 2.0]), 3, 3).unwrap();
        let x = response.unfold(&[10.0, 20.0, 10.0], Method::Inversion).unwrap();
        for (got, want) in x.iter().zip([10.0, 20.0, 10.0]) {
            assert_relative_eq!(*got, want, epsilon = 1e-10);
        }
    }

    #[test]
    fn identity_migration_returns_input_under_bayes_for_any_iteration_count() {
        let response = ResponseMatrix::build(&identity_plane(3, &[5.0, 8.0, 2.0]), 3, 3).unwrap();
        for iterations in [1usize, 4, 10, 100] {
            let x = response.unfold(&[10.0, 20.0, 10.0], Method::Bayes { iterations }).unwrap();
            for (got, want) in x.iter().zip([10.0, 20.0, 10.0]) {
                assert_relative_eq!(*got, want, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn zero_bayes_rounds_return_the_prior() {
        let plane = vec![8.0, 2.0, 2.0, 8.0];
        let response = ResponseMatrix::build(&plane, 2, 2).unwrap();
        let x = response.unfold(&[100.0, 100.0], Method::Bayes { iterations: 0 }).unwrap();
        assert_eq!(x, vec![10.0, 10.0]);
    }

    #[test]
    fn inversion_recovers_a_smeared_truth_exactly() {
        // Response columns: 80% stay, 20% migrate to the neighbor.
        let plane = vec![80.0, 10.0, 20.0, 40.0];
        let response = ResponseMatrix::build(&plane, 2, 2).unwrap();
        let truth = [100.0, 50.0];
        let folded = [0.8 * 100.0 + 0.2 * 50.0, 0.2 * 100.0 + 0.8 * 50.0];

        let x = response.unfold(&folded, Method::Inversion).unwrap();
        assert_relative_eq!(x[0], truth[0], epsilon = 1e-9);
        assert_relative_eq!(x[1], truth[1], epsilon = 1e-9);
    }

    #[test]
    fn bayes_converges_toward_the_inversion_solution() {
        let plane = vec![80.0, 10.0, 20.0, 40.0];
        let response = ResponseMatrix::build(&plane, 2, 2).unwrap();
        let folded = [0.8 * 100.0 + 0.2 * 50.0, 0.2 * 100.0 + 0.8 * 50.0];

        let x = response.unfold(&folded, Method::Bayes { iterations: 200 }).unwrap();
        assert_relative_eq!(x[0], 100.0, epsilon = 1e-3);
        assert_relative_eq!(x[1], 50.0, epsilon = 1e-3);
    }

    #[test]
    fn singular_response_fails_inversion() {
        // Two truth bins reconstructed identically: not invertible.
        let plane = vec![5.0, 5.0, 5.0, 5.0];
        let response = ResponseMatrix::build(&plane, 2, 2).unwrap();
        assert!(matches!(
            response.unfold(&[10.0, 10.0], Method::Inversion),
            Err(Error::Unfolding(_))
        ));
    }

    #[test]
    fn non_square_response_fails_inversion_but_not_bayes() {
        // 3 reco × 2 truth.
        let plane = vec![10.0, 0.0, 2.0, 2.0, 0.0, 10.0];
        let response = ResponseMatrix::build(&plane, 3, 2).unwrap();
        assert!(response.unfold(&[5.0, 2.0, 5.0], Method::Inversion).is_err());
        assert!(response.unfold(&[5.0, 2.0, 5.0], Method::Bayes { iterations: 3 }).is_ok());
    }

    #[test]
    fn empty_migration_is_rejected() {
        assert!(ResponseMatrix::build(&[0.0; 4], 2, 2).is_err());
    }
}
