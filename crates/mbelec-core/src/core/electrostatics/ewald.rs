use crate::core::models::cell::PeriodicBox;
use crate::core::models::sites::SiteVectors;
use itertools::iproduct;
use nalgebra::{Complex, Matrix3, Vector3};
use std::f64::consts::PI;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Ewald splitting parameter giving a real-space error of about `tolerance` at `cutoff`.
#[inline]
pub fn default_alpha(cutoff: f64, tolerance: f64) -> f64 {
    (-tolerance.ln()).sqrt() / cutoff
}

/// Largest reciprocal vector kept for a given splitting and tolerance.
#[inline]
pub fn reciprocal_cutoff(alpha: f64, tolerance: f64) -> f64 {
    2.0 * alpha * (-tolerance.ln()).sqrt()
}

/// Potential a Gaussian-screened charge exerts on its own site, to be removed.
#[inline]
pub fn self_potential(alpha: f64, charge: f64) -> f64 {
    -2.0 * alpha * charge / PI.sqrt()
}

/// Prefactor of the self field `4α³/(3√π) μ` of a screened dipole.
#[inline]
pub fn self_dipole_field_factor(alpha: f64) -> f64 {
    4.0 * alpha.powi(3) / (3.0 * PI.sqrt())
}

/// Potential of the uniform background neutralising a net charge `total_charge`.
#[inline]
pub fn background_potential(alpha: f64, volume: f64, total_charge: f64) -> f64 {
    -PI * total_charge / (volume * alpha * alpha)
}

#[derive(Debug, Clone, Copy)]
struct KVector {
    k: Vector3<f64>,
    k2: f64,
    weight: f64,
}

/// Structure factors `S(k) = Σ_j (q_j + i k·μ_j) e^{i k·r_j}`, one per half-space k-vector.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureFactors(Vec<Complex<f64>>);

/// Reciprocal-space part of the Ewald sum over a half-space of k-vectors.
#[derive(Debug, Clone)]
pub struct ReciprocalSum {
    kvectors: Vec<KVector>,
    volume: f64,
    alpha: f64,
}

impl ReciprocalSum {
    pub fn new(cell: &PeriodicBox, alpha: f64, tolerance: f64) -> Self {
        let k_max = reciprocal_cutoff(alpha, tolerance);
        let k_max2 = k_max * k_max;
        let n_max = [0, 1, 2].map(|i| (k_max * cell.vector(i).norm() / (2.0 * PI)).ceil() as i32);

        let kvectors = iproduct!(
            0..=n_max[0],
            -n_max[1]..=n_max[1],
            -n_max[2]..=n_max[2]
        )
        .filter(|&(n1, n2, n3)| n1 > 0 || (n1 == 0 && (n2 > 0 || (n2 == 0 && n3 > 0))))
        .filter_map(|(n1, n2, n3)| {
            let k = cell.reciprocal([n1, n2, n3]);
            let k2 = k.norm_squared();
            (k2 <= k_max2).then(|| KVector {
                k,
                k2,
                weight: (-k2 / (4.0 * alpha * alpha)).exp() / k2,
            })
        })
        .collect();

        Self {
            kvectors,
            volume: cell.volume(),
            alpha,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.kvectors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.kvectors.is_empty()
    }

    fn phase(k: &Vector3<f64>, r: &Vector3<f64>) -> Complex<f64> {
        let (s, c) = k.dot(r).sin_cos();
        Complex::new(c, s)
    }

    fn source(kv: &KVector, charge: f64, dipole: Option<Vector3<f64>>) -> Complex<f64> {
        Complex::new(charge, dipole.map_or(0.0, |mu| kv.k.dot(&mu)))
    }

    /// Computes `S(k)` for charges and, when given, dipoles.
    pub fn structure_factors(
        &self,
        positions: &SiteVectors,
        charges: &[f64],
        dipoles: Option<&SiteVectors>,
    ) -> StructureFactors {
        #[cfg(not(feature = "parallel"))]
        let iterator = self.kvectors.iter();

        #[cfg(feature = "parallel")]
        let iterator = self.kvectors.par_iter();

        let values = iterator
            .map(|kv| {
                (0..positions.len())
                    .map(|j| {
                        Self::source(kv, charges[j], dipoles.map(|d| d.get(j)))
                            * Self::phase(&kv.k, &positions.get(j))
                    })
                    .sum::<Complex<f64>>()
            })
            .collect();
        StructureFactors(values)
    }

    /// Reciprocal energy `(4π/V) Σ_half w(k) |S(k)|²`.
    pub fn energy(&self, sf: &StructureFactors) -> f64 {
        let sum: f64 = self
            .kvectors
            .iter()
            .zip(&sf.0)
            .map(|(kv, s)| kv.weight * s.norm_sqr())
            .sum();
        4.0 * PI / self.volume * sum
    }

    /// Potential and field at each position generated by the sources in `sf`.
    pub fn potential_and_field(
        &self,
        positions: &SiteVectors,
        sf: &StructureFactors,
    ) -> (Vec<f64>, SiteVectors) {
        let prefactor = 8.0 * PI / self.volume;

        #[cfg(not(feature = "parallel"))]
        let iterator = 0..positions.len();

        #[cfg(feature = "parallel")]
        let iterator = (0..positions.len()).into_par_iter();

        let per_site: Vec<(f64, Vector3<f64>)> = iterator
            .map(|i| {
                let r = positions.get(i);
                let mut phi = 0.0;
                let mut field = Vector3::zeros();
                for (kv, s) in self.kvectors.iter().zip(&sf.0) {
                    let z = Self::phase(&kv.k, &r) * s.conj();
                    phi += kv.weight * z.re;
                    field += kv.k * (kv.weight * z.im);
                }
                (prefactor * phi, prefactor * field)
            })
            .collect();

        let mut field = SiteVectors::zeros(positions.len());
        let phi = per_site
            .into_iter()
            .enumerate()
            .map(|(i, (p, e))| {
                field.set(i, e);
                p
            })
            .collect();
        (phi, field)
    }

    /// Gradient of the reciprocal energy with respect to each source position, dipoles
    /// held fixed.
    pub fn gradient(
        &self,
        positions: &SiteVectors,
        charges: &[f64],
        dipoles: Option<&SiteVectors>,
        sf: &StructureFactors,
    ) -> SiteVectors {
        let prefactor = -8.0 * PI / self.volume;

        #[cfg(not(feature = "parallel"))]
        let iterator = 0..positions.len();

        #[cfg(feature = "parallel")]
        let iterator = (0..positions.len()).into_par_iter();

        let per_site: Vec<Vector3<f64>> = iterator
            .map(|i| {
                let r = positions.get(i);
                let mu = dipoles.map(|d| d.get(i));
                let mut grad = Vector3::zeros();
                for (kv, s) in self.kvectors.iter().zip(&sf.0) {
                    let w = Self::source(kv, charges[i], mu) * Self::phase(&kv.k, &r);
                    grad += kv.k * (kv.weight * (s.conj() * w).im);
                }
                prefactor * grad
            })
            .collect();

        SiteVectors::from_fn(positions.len(), |i| per_site[i])
    }

    /// Virial `W_ab = -∂E/∂ε_ab` of the reciprocal energy under homogeneous strain, with
    /// dipoles held fixed.
    pub fn virial(
        &self,
        positions: &SiteVectors,
        dipoles: Option<&SiteVectors>,
        sf: &StructureFactors,
    ) -> Matrix3<f64> {
        let prefactor = 4.0 * PI / self.volume;
        let inv_4a2 = 1.0 / (4.0 * self.alpha * self.alpha);

        let mut virial = Matrix3::zeros();
        for (kv, s) in self.kvectors.iter().zip(&sf.0) {
            let e_k = prefactor * kv.weight * s.norm_sqr();
            let mut d_energy =
                kv.k * kv.k.transpose() * (2.0 * e_k * (inv_4a2 + 1.0 / kv.k2))
                    - Matrix3::identity() * e_k;

            if let Some(mu) = dipoles {
                let mut m = [Complex::new(0.0, 0.0); 3];
                for j in 0..positions.len() {
                    let phase = Self::phase(&kv.k, &positions.get(j));
                    let mu_j = mu.get(j);
                    for b in 0..3 {
                        m[b] += phase * mu_j[b];
                    }
                }
                for a in 0..3 {
                    for b in 0..3 {
                        d_energy[(a, b)] +=
                            2.0 * prefactor * kv.weight * kv.k[a] * (s.conj() * m[b]).im;
                    }
                }
            }
            virial -= d_energy;
        }
        virial
    }
}
