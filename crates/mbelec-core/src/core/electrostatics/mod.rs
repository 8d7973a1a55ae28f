//! # Electrostatic Kernels Module
//!
//! Stateless pairwise kernels for polarizable point-charge/point-dipole electrostatics.
//!
//! ## Overview
//!
//! Every pair interaction is expressed through a radial sequence `B0..B3` (see
//! [`tensors::RadialTensor`]). The bare Coulomb sequence is modified in three independent,
//! composable ways:
//!
//! - **Thole damping** ([`damping`]) - Smeared-distribution screening factors `s_n` with
//!   separate strengths for charge-charge, charge-dipole and dipole-dipole pairs
//! - **Switching** ([`switching`]) - A smooth cutoff applied to the potential, with the higher
//!   terms rederived so that fields and gradients stay consistent
//! - **Ewald splitting** ([`ewald`]) - An `erfc`-screened real-space sequence and a
//!   reciprocal-space sum over k-vectors for periodic systems
//!
//! ## Units
//!
//! Kernels are unit-agnostic. Callers fold [`constants::COULOMB_CONSTANT`] into the charges
//! (see [`constants::SQRT_COULOMB`]) so energies come out in kcal/mol.

pub mod constants;
pub mod damping;
pub mod ewald;
pub mod switching;
pub mod tensors;
