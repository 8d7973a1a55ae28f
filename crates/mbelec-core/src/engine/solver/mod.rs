//! # Induced Dipole Solvers
//!
//! Strategies for the self-consistent induced dipoles `μ = α (E_q + T μ)`.
//!
//! ## Overview
//!
//! All strategies see the system through a [`FieldOperator`], which maps a dipole set to the
//! field it induces at every site, plus the per-site polarizabilities and the permanent field.
//! They share one contract: [`DipoleSolver::solve`] refines the dipoles in place, starting
//! from whatever the caller stored there, and returns a [`SolveReport`]. Failing to converge
//! within the iteration budget is not an error: the best estimate is kept, the report says
//! `converged: false` and a warning is emitted.
//!
//! ## Key Components
//!
//! - [`iterative`] - Jacobi fixed-point iteration on the per-site dipole change
//! - [`cg`] - Conjugate gradient on the symmetrised system `(I - α^½ T α^½) ν = α^½ E_q`
//! - [`aspc`] - Always-stable predictor-corrector extrapolation from a dipole history
//! - [`inversion`] - Dense factorisation of the symmetrised matrix
//! - [`history`] - The bounded dipole history and its extrapolation coefficients

pub mod aspc;
pub mod cg;
pub mod history;
pub mod inversion;
pub mod iterative;

use crate::core::models::sites::SiteVectors;
use crate::engine::config::DipoleMethod;

pub use aspc::AspcSolver;
pub use cg::ConjugateGradientSolver;
pub use history::DipoleHistory;
pub use inversion::InversionSolver;
pub use iterative::IterativeSolver;

/// Linear map from a dipole set to the field those dipoles induce at every site.
pub trait FieldOperator: Sync {
    fn induced_field(&self, dipoles: &SiteVectors) -> SiteVectors;
}

/// Everything a strategy needs to solve for the dipoles of one configuration.
pub struct DipoleProblem<'a> {
    pub operator: &'a dyn FieldOperator,
    pub polarizabilities: &'a [f64],
    pub permanent_field: &'a SiteVectors,
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl DipoleProblem<'_> {
    #[inline]
    pub fn num_sites(&self) -> usize {
        self.polarizabilities.len()
    }

    /// Direct polarization `α E_q`, the standard starting guess.
    pub fn direct_dipoles(&self) -> SiteVectors {
        self.permanent_field.scaled_per_site(self.polarizabilities)
    }

    /// One Jacobi update `α (E_q + T μ)`.
    pub fn jacobi_update(&self, dipoles: &SiteVectors) -> SiteVectors {
        let mut total = self.operator.induced_field(dipoles);
        total.axpy(1.0, self.permanent_field);
        total.scaled_per_site(self.polarizabilities)
    }

    /// Square roots of the polarizabilities.
    pub fn sqrt_polarizabilities(&self) -> Vec<f64> {
        self.polarizabilities.iter().map(|a| a.max(0.0).sqrt()).collect()
    }
}

/// Outcome of one dipole solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveReport {
    pub method: DipoleMethod,
    pub converged: bool,
    pub iterations: usize,
    /// Final value of the method's convergence metric.
    pub residual: f64,
}

pub trait DipoleSolver {
    /// Refines `dipoles` in place. On entry `dipoles` holds the initial guess.
    fn solve(&mut self, problem: &DipoleProblem, dipoles: &mut SiteVectors) -> SolveReport;
}

/// The configured strategy, owning any state that must persist between solves.
#[derive(Debug, Clone)]
pub enum SolverStrategy {
    Iterative(IterativeSolver),
    ConjugateGradient(ConjugateGradientSolver),
    Aspc(AspcSolver),
    Inversion(InversionSolver),
}

impl SolverStrategy {
    pub fn new(method: DipoleMethod, aspc_order: usize) -> Self {
        match method {
            DipoleMethod::Iterative => SolverStrategy::Iterative(IterativeSolver),
            DipoleMethod::ConjugateGradient => {
                SolverStrategy::ConjugateGradient(ConjugateGradientSolver)
            }
            DipoleMethod::Aspc => SolverStrategy::Aspc(AspcSolver::new(aspc_order)),
            DipoleMethod::Inversion => SolverStrategy::Inversion(InversionSolver),
        }
    }

    pub fn method(&self) -> DipoleMethod {
        match self {
            SolverStrategy::Iterative(_) => DipoleMethod::Iterative,
            SolverStrategy::ConjugateGradient(_) => DipoleMethod::ConjugateGradient,
            SolverStrategy::Aspc(_) => DipoleMethod::Aspc,
            SolverStrategy::Inversion(_) => DipoleMethod::Inversion,
        }
    }

    pub fn history(&self) -> Option<&DipoleHistory> {
        match self {
            SolverStrategy::Aspc(solver) => Some(solver.history()),
            _ => None,
        }
    }

    pub fn reset_history(&mut self) {
        if let SolverStrategy::Aspc(solver) = self {
            solver.reset();
        }
    }
}

impl DipoleSolver for SolverStrategy {
    fn solve(&mut self, problem: &DipoleProblem, dipoles: &mut SiteVectors) -> SolveReport {
        match self {
            SolverStrategy::Iterative(solver) => solver.solve(problem, dipoles),
            SolverStrategy::ConjugateGradient(solver) => solver.solve(problem, dipoles),
            SolverStrategy::Aspc(solver) => solver.solve(problem, dipoles),
            SolverStrategy::Inversion(solver) => solver.solve(problem, dipoles),
        }
    }
}
