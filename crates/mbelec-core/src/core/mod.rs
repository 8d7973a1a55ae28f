//! # Core Module
//!
//! Stateless building blocks of the polarizable electrostatics engine.
//!
//! ## Overview
//!
//! Nothing in this layer owns per-call state. It provides the pairwise kernels and the data
//! models that the [`crate::engine`] layer composes into a full energy, gradient and
//! induced-dipole evaluation.
//!
//! ## Architecture
//!
//! - **Pair Kernels** ([`electrostatics`]) - Thole-damped, switched and Ewald-split radial
//!   sequences, plus the reciprocal-space sum
//! - **Data Models** ([`models`]) - Monomer topology, the system ↔ site-major permutation,
//!   per-site vector storage and periodic boxes

pub mod electrostatics;
pub mod models;
