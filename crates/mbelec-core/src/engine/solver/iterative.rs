use super::{DipoleProblem, DipoleSolver, SolveReport};
use crate::core::models::sites::SiteVectors;
use crate::engine::config::DipoleMethod;
use tracing::{instrument, trace, warn};

/// Jacobi fixed-point iteration `μ ← α (E_q + T μ)`.
///
/// Converges when the largest squared per-site change drops below the tolerance.
#[derive(Debug, Clone, Copy, Default)]
pub struct IterativeSolver;

impl DipoleSolver for IterativeSolver {
    #[instrument(skip_all, name = "iterative_dipole_solve")]
    fn solve(&mut self, problem: &DipoleProblem, dipoles: &mut SiteVectors) -> SolveReport {
        let mut residual = f64::INFINITY;
        for iteration in 1..=problem.max_iterations {
            let updated = problem.jacobi_update(dipoles);
            residual = updated.max_sq_diff(dipoles);
            *dipoles = updated;
            trace!(iteration, residual, "Jacobi step.");

            if residual < problem.tolerance {
                return SolveReport {
                    method: DipoleMethod::Iterative,
                    converged: true,
                    iterations: iteration,
                    residual,
                };
            }
        }

        warn!(
            max_iterations = problem.max_iterations,
            residual, "Iterative dipole solve did not converge; keeping best estimate."
        );
        SolveReport {
            method: DipoleMethod::Iterative,
            converged: false,
            iterations: problem.max_iterations,
            residual,
        }
    }
}
