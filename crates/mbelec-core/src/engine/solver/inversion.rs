use super::cg::ConjugateGradientSolver;
use super::{DipoleProblem, DipoleSolver, SolveReport};
use crate::core::models::sites::SiteVectors;
use crate::engine::config::DipoleMethod;
use nalgebra::{DMatrix, DVector};
use tracing::{debug, instrument, warn};

/// Direct solve of `(I - α^½ T α^½) ν = α^½ E_q` by dense factorisation.
///
/// The matrix is assembled column by column from the field operator, so the cost is
/// `3N` operator applications plus an `O(N³)` factorisation.
#[derive(Debug, Clone, Copy, Default)]
pub struct InversionSolver;

impl InversionSolver {
    fn assemble(problem: &DipoleProblem, sqrt_pol: &[f64]) -> DMatrix<f64> {
        let n = problem.num_sites();
        let dim = 3 * n;
        let mut matrix = DMatrix::<f64>::identity(dim, dim);
        for column in 0..dim {
            if sqrt_pol[column % n] == 0.0 {
                continue;
            }
            let mut unit = vec![0.0; dim];
            unit[column] = 1.0;
            let Some(unit) = SiteVectors::from_component_major(unit) else {
                continue;
            };
            let induced = problem
                .operator
                .induced_field(&unit.scaled_per_site(sqrt_pol))
                .scaled_per_site(sqrt_pol);
            for (row, value) in induced.as_slice().iter().enumerate() {
                matrix[(row, column)] -= value;
            }
        }
        matrix
    }
}

impl DipoleSolver for InversionSolver {
    #[instrument(skip_all, name = "inversion_dipole_solve")]
    fn solve(&mut self, problem: &DipoleProblem, dipoles: &mut SiteVectors) -> SolveReport {
        let sqrt_pol = problem.sqrt_polarizabilities();
        let matrix = Self::assemble(problem, &sqrt_pol);
        let rhs = DVector::from_column_slice(
            problem.permanent_field.scaled_per_site(&sqrt_pol).as_slice(),
        );

        let solution = match matrix.clone().cholesky() {
            Some(cholesky) => Some(cholesky.solve(&rhs)),
            None => {
                debug!("Polarization matrix is not positive definite; falling back to LU.");
                matrix.clone().lu().solve(&rhs)
            }
        };

        let Some(nu) = solution else {
            warn!("Polarization matrix is singular; falling back to conjugate gradient.");
            let report = ConjugateGradientSolver.solve(problem, dipoles);
            return SolveReport {
                method: DipoleMethod::Inversion,
                ..report
            };
        };

        let residual = (&matrix * &nu - &rhs).norm_squared();
        let Some(nu) = SiteVectors::from_component_major(nu.as_slice().to_vec()) else {
            return SolveReport {
                method: DipoleMethod::Inversion,
                converged: false,
                iterations: 0,
                residual,
            };
        };
        *dipoles = nu.scaled_per_site(&sqrt_pol);

        SolveReport {
            method: DipoleMethod::Inversion,
            converged: true,
            iterations: 1,
            residual,
        }
    }
}
