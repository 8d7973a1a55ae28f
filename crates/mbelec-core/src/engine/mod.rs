//! # Engine Module
//!
//! Stateful layer that turns the pure kernels of [`crate::core`] into a full polarizable
//! electrostatics evaluation.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Thole factors, cutoff and Ewald settings, per-call options
//! - **Interactions** ([`interactions`]) - Damped, switched pair tensors within the cutoff
//! - **Fields** ([`fields`]) - Permanent fields, the induced-field operator, gradients and virial
//! - **Solvers** ([`solver`]) - Induced dipoles by Jacobi iteration, CG, ASPC or inversion
//! - **Facade** ([`electrostatics`]) - Input validation, site reordering and result accessors
//! - **Error Handling** ([`error`]) - Errors surfaced to callers
//!
//! Pair loops run on rayon when the `parallel` feature is enabled.

pub mod config;
pub mod electrostatics;
pub mod error;
pub mod fields;
pub mod interactions;
pub mod solver;
