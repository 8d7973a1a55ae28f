use super::cg::ConjugateGradientSolver;
use super::history::DipoleHistory;
use super::{DipoleProblem, DipoleSolver, SolveReport};
use crate::core::models::sites::SiteVectors;
use crate::engine::config::DipoleMethod;
use tracing::{debug, instrument};

/// Always-stable predictor-corrector (Kolafa) extrapolation.
///
/// Until the history holds `k + 2` entries every step is a full conjugate gradient solve.
/// Afterwards the dipoles are predicted from the history and corrected with a single field
/// evaluation, `μ = ω α (E_q + T μ_p) + (1 - ω) μ_p`, with no convergence test.
#[derive(Debug, Clone)]
pub struct AspcSolver {
    history: DipoleHistory,
}

impl AspcSolver {
    pub fn new(order: usize) -> Self {
        Self {
            history: DipoleHistory::new(order),
        }
    }

    #[inline]
    pub fn history(&self) -> &DipoleHistory {
        &self.history
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }
}

impl DipoleSolver for AspcSolver {
    #[instrument(skip_all, name = "aspc_dipole_solve", fields(history = self.history.len()))]
    fn solve(&mut self, problem: &DipoleProblem, dipoles: &mut SiteVectors) -> SolveReport {
        let Some(predicted) = self.history.predict() else {
            debug!(
                filled = self.history.len(),
                needed = self.history.capacity(),
                "Warming up ASPC history with a full solve."
            );
            let report = ConjugateGradientSolver.solve(problem, dipoles);
            self.history.push(dipoles.clone());
            return SolveReport {
                method: DipoleMethod::Aspc,
                ..report
            };
        };

        let omega = self.history.omega();
        let mut corrected = problem.jacobi_update(&predicted);
        let residual = corrected.max_sq_diff(&predicted);
        corrected.scale(omega);
        corrected.axpy(1.0 - omega, &predicted);
        *dipoles = corrected;
        self.history.push(dipoles.clone());

        SolveReport {
            method: DipoleMethod::Aspc,
            converged: true,
            iterations: 1,
            residual,
        }
    }
}
