//! The classical-optimizer contract and a gradient-descent implementation.

use tracing::debug;

/// The outcome of one optimization run.
#[derive(Debug, Clone)]
pub struct Optimum {
    /// The best point found.
    pub point: Vec<f64>,
    /// The cost at that point.
    pub value: f64,
    /// Number of cost-function evaluations consumed.
    pub evaluations: usize,
}

/// Batched cost function: receives `k · num_params` flattened parameter
/// values (`k ≥ 1` simultaneous points) and returns `k` cost values.
pub type CostFn<'a> = dyn FnMut(&[f64]) -> Vec<f64> + 'a;

/// Gradient function: receives one point, returns the partial derivatives.
pub type GradientFn<'a> = dyn FnMut(&[f64]) -> Vec<f64> + 'a;

/// A classical black-box optimizer.
///
/// Capability flags let the driver validate a configuration before any
/// cost evaluation happens: an optimizer that requires bounds fails fast
/// on an unbounded problem, and vice versa.
pub trait Optimizer {
    /// Whether variable bounds are honored.
    fn supports_bounds(&self) -> bool {
        false
    }

    /// Whether variable bounds are mandatory.
    fn requires_bounds(&self) -> bool {
        false
    }

    /// Whether an initial point is honored.
    fn supports_initial_point(&self) -> bool {
        true
    }

    /// Whether an initial point is mandatory.
    fn requires_initial_point(&self) -> bool {
        false
    }

    /// Whether a gradient function is consumed.
    fn supports_gradient(&self) -> bool {
        false
    }

    /// Maximum number of points this optimizer evaluates simultaneously.
    ///
    /// The driver batches that many bindings through the sampler per
    /// backend call.
    fn max_evals_grouped(&self) -> usize {
        1
    }

    /// Minimize `cost` over `num_params` variables.
    ///
    /// `initial_point` is `None` only when
    /// [`Optimizer::requires_initial_point`] is false. A cost value of NaN
    /// signals an aborted evaluation; implementations terminate on it.
    fn optimize(
        &self,
        num_params: usize,
        cost: &mut CostFn<'_>,
        gradient: Option<&mut GradientFn<'_>>,
        bounds: &[Option<(f64, f64)>],
        initial_point: Option<&[f64]>,
    ) -> Optimum;
}

/// Plain gradient descent with a fixed learning rate.
///
/// Uses the supplied gradient function when one is given; otherwise falls
/// back to central finite differences evaluated as one batched cost call.
#[derive(Debug, Clone)]
pub struct GradientDescent {
    maxiter: usize,
    learning_rate: f64,
    tol: f64,
    fd_eps: f64,
}

impl GradientDescent {
    /// Create an optimizer with the given iteration limit.
    pub fn new(maxiter: usize) -> Self {
        Self {
            maxiter,
            learning_rate: 0.1,
            tol: 1e-6,
            fd_eps: 1e-4,
        }
    }

    /// Set the learning rate.
    #[must_use]
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Set the convergence tolerance on the cost decrease.
    #[must_use]
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }
}

impl Optimizer for GradientDescent {
    fn requires_initial_point(&self) -> bool {
        true
    }

    fn supports_gradient(&self) -> bool {
        true
    }

    fn max_evals_grouped(&self) -> usize {
        // Finite-difference fallback probes 2n points at once.
        64
    }

    fn optimize(
        &self,
        num_params: usize,
        cost: &mut CostFn<'_>,
        mut gradient: Option<&mut GradientFn<'_>>,
        _bounds: &[Option<(f64, f64)>],
        initial_point: Option<&[f64]>,
    ) -> Optimum {
        let mut point: Vec<f64> = initial_point.map_or_else(|| vec![0.0; num_params], <[f64]>::to_vec);
        let mut evaluations = 0usize;

        let mut value = cost(&point)[0];
        evaluations += 1;

        for iteration in 0..self.maxiter {
            if !value.is_finite() {
                break;
            }

            let grad = match gradient.as_deref_mut() {
                Some(g) => g(&point),
                None => {
                    // One batched call: all 2n probe points at once.
                    let mut probes = Vec::with_capacity(2 * num_params * num_params);
                    for i in 0..num_params {
                        for sign in [1.0, -1.0] {
                            let mut p = point.clone();
                            p[i] += sign * self.fd_eps;
                            probes.extend_from_slice(&p);
                        }
                    }
                    let values = cost(&probes);
                    evaluations += 2 * num_params;
                    (0..num_params)
                        .map(|i| (values[2 * i] - values[2 * i + 1]) / (2.0 * self.fd_eps))
                        .collect()
                }
            };
            if grad.iter().any(|g| !g.is_finite()) {
                break;
            }

            for (p, g) in point.iter_mut().zip(&grad) {
                *p -= self.learning_rate * g;
            }

            let new_value = cost(&point)[0];
            evaluations += 1;
            let decrease = value - new_value;
            value = new_value;
            if decrease.abs() < self.tol {
                debug!(iteration, value, "gradient descent converged");
                break;
            }
        }

        Optimum {
            point,
            value,
            evaluations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimizes_quadratic() {
        let optimizer = GradientDescent::new(500).with_learning_rate(0.2);
        let mut cost = |flat: &[f64]| -> Vec<f64> {
            flat.chunks(2)
                .map(|p| (p[0] - 1.0).powi(2) + (p[1] + 2.0).powi(2))
                .collect()
        };
        let result = optimizer.optimize(2, &mut cost, None, &[None, None], Some(&[0.0, 0.0]));
        assert!((result.point[0] - 1.0).abs() < 1e-2);
        assert!((result.point[1] + 2.0).abs() < 1e-2);
        assert!(result.value < 1e-3);
    }

    #[test]
    fn test_uses_supplied_gradient() {
        let optimizer = GradientDescent::new(200).with_learning_rate(0.2);
        let mut cost = |flat: &[f64]| -> Vec<f64> {
            flat.chunks(1).map(|p| p[0] * p[0]).collect()
        };
        let mut gradient = |p: &[f64]| -> Vec<f64> { vec![2.0 * p[0]] };
        let result = optimizer.optimize(
            1,
            &mut cost,
            Some(&mut gradient),
            &[None],
            Some(&[3.0]),
        );
        assert!(result.point[0].abs() < 1e-2);
    }

    #[test]
    fn test_nan_aborts() {
        let optimizer = GradientDescent::new(100);
        let mut cost = |flat: &[f64]| -> Vec<f64> { vec![f64::NAN; flat.len()] };
        let result = optimizer.optimize(1, &mut cost, None, &[None], Some(&[0.0]));
        assert!(result.value.is_nan());
        assert_eq!(result.evaluations, 1);
    }
}
