//! Scalar Newton-Raphson with a fixed fallback step.

/// Newton solver configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NewtonConfig {
    /// Maximum number of updates
    pub max_iterations: usize,
    /// Absolute tolerance on |f(x)|
    pub abs_tol: f64,
    /// Decrement applied when f'(x) is exactly zero
    pub zero_derivative_step: f64,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            max_iterations: 30,
            abs_tol: 1e-6,
            zero_derivative_step: 1e-4,
        }
    }
}

/// Newton iteration result.
///
/// Running out of iterations is not an error: the last iterate is returned
/// with `converged == false`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NewtonOutcome {
    /// Last iterate
    pub x: f64,
    /// |f(x)| at the last iterate
    pub residual: f64,
    /// Number of updates applied
    pub iterations: usize,
    /// Converged flag
    pub converged: bool,
}

/// Solve `f(x) = 0` starting from `x0`.
pub fn newton_scalar<F, D>(x0: f64, f: F, df: D, config: &NewtonConfig) -> NewtonOutcome
where
    F: Fn(f64) -> f64,
    D: Fn(f64) -> f64,
{
    let mut x = x0;

    for iter in 0..config.max_iterations {
        let r = f(x);
        if r.abs() < config.abs_tol {
            return NewtonOutcome {
                x,
                residual: r.abs(),
                iterations: iter,
                converged: true,
            };
        }
        if !r.is_finite() {
            return NewtonOutcome {
                x,
                residual: r.abs(),
                iterations: iter,
                converged: false,
            };
        }

        let slope = df(x);
        if slope != 0.0 {
            x -= r / slope;
        } else {
            x -= config.zero_derivative_step;
        }
    }

    let residual = f(x).abs();
    NewtonOutcome {
        x,
        residual,
        iterations: config.max_iterations,
        converged: residual < config.abs_tol,
    }
}
