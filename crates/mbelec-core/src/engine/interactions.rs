use super::config::TholeConfig;
use crate::core::electrostatics::constants::DEFAULT_PERIODIC_CUTOFF;
use crate::core::electrostatics::damping::{InteractionKind, combined_width, kind_screening};
use crate::core::electrostatics::switching::SwitchingFunction;
use crate::core::electrostatics::tensors::RadialTensor;
use crate::core::models::cell::PeriodicBox;
use crate::core::models::sites::SiteVectors;
use itertools::iproduct;
use kiddo::{ImmutableKdTree, SquaredEuclidean};
use nalgebra::Vector3;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Squared distance below which two sites are treated as coincident and skipped.
const COINCIDENT_SQ: f64 = 1e-20;

/// One directed neighbour of a site, with the radial sequences of every interaction kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairEntry {
    /// Site-major index of the partner.
    pub j: usize,
    /// Displacement `r_i - r_j` to the interacting image of the partner.
    pub r: Vector3<f64>,
    pub cc: RadialTensor,
    pub cd: RadialTensor,
    pub dd: RadialTensor,
    /// The partner is a periodic image of the site itself.
    pub self_image: bool,
}

/// Geometry and damping parameters shared by every pair of one evaluation.
#[derive(Debug, Clone)]
pub struct PairGeometry<'a> {
    pub cutoff: Option<f64>,
    pub switching: SwitchingFunction,
    pub exclusion_distance: f64,
    pub thole: &'a TholeConfig,
    pub ewald: Option<(&'a PeriodicBox, f64)>,
}

impl PairGeometry<'_> {
    fn strength(&self, kind: InteractionKind) -> f64 {
        match kind {
            InteractionKind::ChargeCharge => self.thole.a_cc,
            InteractionKind::ChargeDipole => self.thole.a_cd,
            InteractionKind::DipoleDipole => self.thole.a_dd,
        }
    }

    fn damped(&self, kind: InteractionKind, dist: f64, width: f64) -> RadialTensor {
        let s = kind_screening(kind, dist, self.strength(kind), width);
        let tensor = match self.ewald {
            Some((_, alpha)) => {
                RadialTensor::erfc(dist, alpha) + RadialTensor::screening_correction(dist, s)
            }
            None => RadialTensor::screened(dist, s),
        };
        tensor.switched(dist, self.switching.evaluate(dist))
    }

    fn interacting(
        &self,
        j: usize,
        r: Vector3<f64>,
        dist: f64,
        width: f64,
        self_image: bool,
    ) -> PairEntry {
        PairEntry {
            j,
            r,
            cc: self.damped(InteractionKind::ChargeCharge, dist, width),
            cd: self.damped(InteractionKind::ChargeDipole, dist, width),
            dd: self.damped(InteractionKind::DipoleDipole, dist, width),
            self_image,
        }
    }

    /// Removes the reciprocal-space image of an excluded pair.
    fn excluded(&self, j: usize, r: Vector3<f64>, dist: f64, alpha: f64) -> PairEntry {
        let correction = RadialTensor::erfc(dist, alpha) - RadialTensor::bare(dist);
        PairEntry {
            j,
            r,
            cc: correction,
            cd: correction,
            dd: correction,
            self_image: false,
        }
    }
}

/// Per-site neighbour lists for all pairwise kernels of one evaluation.
#[derive(Debug, Clone, Default)]
pub struct InteractionList {
    entries: Vec<Vec<PairEntry>>,
}

impl InteractionList {
    /// Builds the lists from site-major positions and polarizability factors.
    ///
    /// `monomers[k]` identifies the monomer owning slot `k`. Monomers must be whole: an
    /// intra-monomer pair is only excluded at its raw displacement.
    pub fn build(
        positions: &SiteVectors,
        polfacs: &[f64],
        monomers: &[usize],
        geometry: &PairGeometry,
    ) -> Self {
        let entries = match geometry.ewald {
            Some((cell, alpha)) => Self::build_periodic(positions, polfacs, monomers, geometry, cell, alpha),
            None => Self::build_cluster(positions, polfacs, monomers, geometry),
        };
        Self { entries }
    }

    #[inline]
    pub fn neighbors(&self, i: usize) -> &[PairEntry] {
        &self.entries[i]
    }

    pub fn num_entries(&self) -> usize {
        self.entries.iter().map(Vec::len).sum()
    }

    fn build_cluster(
        positions: &SiteVectors,
        polfacs: &[f64],
        monomers: &[usize],
        geometry: &PairGeometry,
    ) -> Vec<Vec<PairEntry>> {
        let n = positions.len();
        let points: Vec<[f64; 3]> = positions.iter().map(|p| [p.x, p.y, p.z]).collect();
        let tree = geometry
            .cutoff
            .filter(|_| n > 0)
            .map(|_| ImmutableKdTree::<f64, 3>::new_from_slice(&points));

        #[cfg(not(feature = "parallel"))]
        let iterator = 0..n;

        #[cfg(feature = "parallel")]
        let iterator = (0..n).into_par_iter();

        iterator
            .map(|i| {
                let candidates: Vec<usize> = match (&tree, geometry.cutoff) {
                    (Some(tree), Some(cutoff)) => {
                        let mut found: Vec<usize> = tree
                            .within_unsorted::<SquaredEuclidean>(&points[i], cutoff * cutoff)
                            .into_iter()
                            .map(|neighbour| neighbour.item as usize)
                            .collect();
                        found.sort_unstable();
                        found
                    }
                    _ => (0..n).collect(),
                };

                let p_i = positions.get(i);
                candidates
                    .into_iter()
                    .filter(|&j| j != i)
                    .filter_map(|j| {
                        let r = p_i - positions.get(j);
                        let r2 = r.norm_squared();
                        if r2 < COINCIDENT_SQ {
                            return None;
                        }
                        let dist = r2.sqrt();
                        if monomers[i] == monomers[j] && dist < geometry.exclusion_distance {
                            return None;
                        }
                        if geometry.cutoff.is_some_and(|c| dist >= c) {
                            return None;
                        }
                        let width = combined_width(polfacs[i], polfacs[j]);
                        Some(geometry.interacting(j, r, dist, width, false))
                    })
                    .collect()
            })
            .collect()
    }

    /// Periodic lists found by a tree search over lattice images.
    ///
    /// Without a cutoff the default periodic cutoff applies. Sites are wrapped into the home
    /// cell and replicated over every translation that can reach the cutoff. Displacements
    /// are still taken from the unwrapped positions so that intra-monomer exclusions see the
    /// raw geometry.
    fn build_periodic(
        positions: &SiteVectors,
        polfacs: &[f64],
        monomers: &[usize],
        geometry: &PairGeometry,
        cell: &PeriodicBox,
        alpha: f64,
    ) -> Vec<Vec<PairEntry>> {
        let n = positions.len();
        if n == 0 {
            return Vec::new();
        }
        let cutoff = geometry.cutoff.unwrap_or(DEFAULT_PERIODIC_CUTOFF);
        let radius = cutoff.max(geometry.exclusion_distance);
        let reach = cell
            .perpendicular_widths()
            .map(|w| (radius / w).ceil() as i32 + 1);

        let shifts: Vec<[i32; 3]> = positions
            .iter()
            .map(|p| {
                let s = cell.to_fractional(&p).map(f64::floor);
                [s.x as i32, s.y as i32, s.z as i32]
            })
            .collect();
        let wrapped: Vec<Vector3<f64>> = positions
            .iter()
            .zip(&shifts)
            .map(|(p, &shift)| p - cell.translation(shift))
            .collect();

        let images: Vec<[i32; 3]> = iproduct!(
            -reach[0]..=reach[0],
            -reach[1]..=reach[1],
            -reach[2]..=reach[2]
        )
        .map(|(a, b, c)| [a, b, c])
        .collect();
        let points: Vec<[f64; 3]> = iproduct!(images.iter(), wrapped.iter())
            .map(|(&image, w)| {
                let p = w + cell.translation(image);
                [p.x, p.y, p.z]
            })
            .collect();
        let tree = ImmutableKdTree::<f64, 3>::new_from_slice(&points);
        let query_sq = (radius * (1.0 + 1e-12)).powi(2);

        #[cfg(not(feature = "parallel"))]
        let iterator = 0..n;

        #[cfg(feature = "parallel")]
        let iterator = (0..n).into_par_iter();

        iterator
            .map(|i| {
                let w_i = wrapped[i];
                let mut found: Vec<usize> = tree
                    .within_unsorted::<SquaredEuclidean>(&[w_i.x, w_i.y, w_i.z], query_sq)
                    .into_iter()
                    .map(|neighbour| neighbour.item as usize)
                    .collect();
                found.sort_unstable();

                let p_i = positions.get(i);
                let mut list = Vec::with_capacity(found.len());
                for item in found {
                    let (image, j) = (images[item / n], item % n);
                    let offset = [0, 1, 2].map(|d| shifts[i][d] - shifts[j][d] + image[d]);
                    let is_raw = offset == [0, 0, 0];
                    if i == j && is_raw {
                        continue;
                    }
                    let r = p_i - positions.get(j) - cell.translation(offset);
                    let r2 = r.norm_squared();
                    if r2 < COINCIDENT_SQ {
                        continue;
                    }
                    let dist = r2.sqrt();
                    if monomers[i] == monomers[j] && is_raw && dist < geometry.exclusion_distance {
                        list.push(geometry.excluded(j, r, dist, alpha));
                    } else if dist < cutoff {
                        let width = combined_width(polfacs[i], polfacs[j]);
                        list.push(geometry.interacting(j, r, dist, width, i == j));
                    }
                }
                list
            })
            .collect()
    }
}
