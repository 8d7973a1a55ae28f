//! # Core Models Module
//!
//! Data structures describing the sites of a polarizable system and the two orders in which
//! per-site quantities are stored.
//!
//! ## Overview
//!
//! External collaborators hand over per-site data in *system order*: one entry per site as it
//! appears in the input, vector quantities interleaved `x, y, z`. The pairwise kernels work in
//! *site-major order*, where equivalent sites of all monomers of one type sit next to each
//! other and vector quantities are split into component blocks. These models are designed to:
//!
//! - **Validate topology once** - Inconsistent monomer lists are caught before any arrays are built
//! - **Keep both orders in sync** - A single permutation object converts in both directions
//! - **Describe periodicity** - Triclinic boxes with fractional/Cartesian conversion
//!
//! ## Key Components
//!
//! - [`topology`] - Monomer identifiers, site counts and first-site offsets
//! - [`layout`] - The system ↔ site-major permutation
//! - [`sites`] - Component-major storage for per-site 3-vectors
//! - [`cell`] - Periodic box vectors, minimum image and reciprocal lattice

pub mod cell;
pub mod layout;
pub mod sites;
pub mod topology;
