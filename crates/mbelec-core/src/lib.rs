//! # mbelec
//!
//! Many-body polarizable electrostatics for molecular simulation: permanent point charges,
//! Thole-damped induced point dipoles, optional Ewald summation under periodic boundaries,
//! and analytic gradients and virial.
//!
//! ## Architectural Philosophy
//!
//! The library follows a two-layer architecture.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`MonomerTopology`, `SiteLayout`,
//!   `PeriodicBox`) and the pure interaction kernels: radial tensors, Thole damping,
//!   smooth switching and the reciprocal-space Ewald sum.
//!
//! - **[`engine`]: The Logic Core.** Builds interaction lists, evaluates fields, solves for
//!   the induced dipoles and assembles energies, gradients and the virial. Its
//!   [`Electrostatics`] facade is the entry point for callers.
//!
//! Energies are reported in kcal/mol, lengths in Å, charges in elementary charges and
//! polarizabilities in Å³.

pub mod core;
pub mod engine;

pub use crate::core::models::cell::PeriodicBox;
pub use crate::core::models::topology::MonomerTopology;
pub use crate::engine::config::{CalculationOptions, DipoleMethod, ElectrostaticsConfig};
pub use crate::engine::electrostatics::{Electrostatics, SiteData};
pub use crate::engine::error::ElectrostaticsError;
pub use crate::engine::solver::SolveReport;
