use super::{DipoleProblem, DipoleSolver, SolveReport};
use crate::core::models::sites::SiteVectors;
use crate::engine::config::DipoleMethod;
use tracing::{instrument, trace, warn};

/// Conjugate gradient on `(I - α^½ T α^½) ν = α^½ E_q` with `μ = α^½ ν`.
///
/// The scaled system is symmetric, and positive definite for any physically damped
/// configuration. Converges when the squared residual norm drops below the tolerance.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConjugateGradientSolver;

impl ConjugateGradientSolver {
    fn apply(problem: &DipoleProblem, sqrt_pol: &[f64], v: &SiteVectors) -> SiteVectors {
        let induced = problem
            .operator
            .induced_field(&v.scaled_per_site(sqrt_pol))
            .scaled_per_site(sqrt_pol);
        let mut out = v.clone();
        out.axpy(-1.0, &induced);
        out
    }

    fn report(iterations: usize, converged: bool, residual: f64) -> SolveReport {
        SolveReport {
            method: DipoleMethod::ConjugateGradient,
            converged,
            iterations,
            residual,
        }
    }
}

impl DipoleSolver for ConjugateGradientSolver {
    #[instrument(skip_all, name = "cg_dipole_solve")]
    fn solve(&mut self, problem: &DipoleProblem, dipoles: &mut SiteVectors) -> SolveReport {
        let sqrt_pol = problem.sqrt_polarizabilities();
        let inv_sqrt_pol: Vec<f64> = sqrt_pol
            .iter()
            .map(|&s| if s > 0.0 { 1.0 / s } else { 0.0 })
            .collect();

        let rhs = problem.permanent_field.scaled_per_site(&sqrt_pol);
        let mut nu = dipoles.scaled_per_site(&inv_sqrt_pol);
        let mut residual = rhs;
        residual.axpy(-1.0, &Self::apply(problem, &sqrt_pol, &nu));
        let mut direction = residual.clone();
        let mut rr = residual.dot(&residual);

        let mut outcome = Self::report(0, rr < problem.tolerance, rr);
        if !outcome.converged {
            for iteration in 1..=problem.max_iterations {
                let a_dir = Self::apply(problem, &sqrt_pol, &direction);
                let curvature = direction.dot(&a_dir);
                if curvature <= 0.0 {
                    warn!(iteration, curvature, "Conjugate gradient broke down on a non-positive direction.");
                    outcome = Self::report(iteration, false, rr);
                    break;
                }

                let step = rr / curvature;
                nu.axpy(step, &direction);
                residual.axpy(-step, &a_dir);
                let rr_next = residual.dot(&residual);
                trace!(iteration, residual = rr_next, "CG step.");

                if rr_next < problem.tolerance {
                    outcome = Self::report(iteration, true, rr_next);
                    break;
                }

                let beta = rr_next / rr;
                let mut next = residual.clone();
                next.axpy(beta, &direction);
                direction = next;
                rr = rr_next;
                outcome = Self::report(iteration, false, rr);
            }
        }

        *dipoles = nu.scaled_per_site(&sqrt_pol);
        if !outcome.converged {
            warn!(
                max_iterations = problem.max_iterations,
                residual = outcome.residual,
                "CG dipole solve did not converge; keeping best estimate."
            );
        }
        outcome
    }
}
