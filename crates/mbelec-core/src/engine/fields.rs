use super::interactions::InteractionList;
use super::solver::FieldOperator;
use crate::core::electrostatics::ewald::{
    ReciprocalSum, background_potential, self_dipole_field_factor, self_potential,
};
use crate::core::models::cell::PeriodicBox;
use crate::core::models::sites::SiteVectors;
use nalgebra::{Matrix3, Vector3};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Per-site physical data in site-major order, charges already scaled by `sqrt(k_e)`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SiteState {
    pub positions: SiteVectors,
    pub charges: Vec<f64>,
    pub polarizabilities: Vec<f64>,
    pub polfacs: Vec<f64>,
}

impl SiteState {
    #[inline]
    pub fn num_sites(&self) -> usize {
        self.charges.len()
    }

    pub fn total_charge(&self) -> f64 {
        self.charges.iter().sum()
    }
}

/// Ewald parameters and k-vectors of a periodic evaluation.
#[derive(Debug, Clone)]
pub struct PeriodicContext {
    pub cell: PeriodicBox,
    pub alpha: f64,
    pub reciprocal: ReciprocalSum,
}

impl PeriodicContext {
    pub fn new(cell: PeriodicBox, alpha: f64, tolerance: f64) -> Self {
        let reciprocal = ReciprocalSum::new(&cell, alpha, tolerance);
        Self {
            cell,
            alpha,
            reciprocal,
        }
    }

    fn background_energy(&self, total_charge: f64) -> f64 {
        0.5 * total_charge * background_potential(self.alpha, self.cell.volume(), total_charge)
    }
}

/// Field and potential of the fixed charges at every site.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PermanentField {
    pub field: SiteVectors,
    pub potential: Vec<f64>,
}

/// Position gradient and virial of the electrostatic energy at fixed dipoles.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientTerms {
    pub gradient: SiteVectors,
    pub virial: Matrix3<f64>,
}

/// Evaluates fields, potentials and gradients over a prepared interaction list.
pub struct FieldEngine<'a> {
    sites: &'a SiteState,
    list: &'a InteractionList,
    periodic: Option<&'a PeriodicContext>,
}

impl<'a> FieldEngine<'a> {
    pub fn new(
        sites: &'a SiteState,
        list: &'a InteractionList,
        periodic: Option<&'a PeriodicContext>,
    ) -> Self {
        Self {
            sites,
            list,
            periodic,
        }
    }

    fn per_site<T, F>(&self, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        let n = self.sites.num_sites();

        #[cfg(not(feature = "parallel"))]
        let iterator = 0..n;

        #[cfg(feature = "parallel")]
        let iterator = (0..n).into_par_iter();

        iterator.map(f).collect()
    }

    pub fn permanent(&self) -> PermanentField {
        let q = &self.sites.charges;
        let pairs: Vec<(f64, Vector3<f64>)> = self.per_site(|i| {
            self.list
                .neighbors(i)
                .iter()
                .fold((0.0, Vector3::zeros()), |(phi, field), e| {
                    (phi + q[e.j] * e.cc.b0, field + e.cd.field(&e.r) * q[e.j])
                })
        });

        let n = self.sites.num_sites();
        let mut potential: Vec<f64> = pairs.iter().map(|(phi, _)| *phi).collect();
        let mut field = SiteVectors::from_fn(n, |i| pairs[i].1);

        if let Some(ctx) = self.periodic {
            let sf = ctx
                .reciprocal
                .structure_factors(&self.sites.positions, q, None);
            let (phi_k, field_k) = ctx
                .reciprocal
                .potential_and_field(&self.sites.positions, &sf);
            let background =
                background_potential(ctx.alpha, ctx.cell.volume(), self.sites.total_charge());
            for i in 0..n {
                potential[i] += phi_k[i] + self_potential(ctx.alpha, q[i]) + background;
                field.add(i, field_k.get(i));
            }
        }

        PermanentField { field, potential }
    }

    /// Potential of the dipoles at every site.
    pub fn dipole_potential(&self, dipoles: &SiteVectors) -> Vec<f64> {
        let mut potential: Vec<f64> = self.per_site(|i| {
            self.list
                .neighbors(i)
                .iter()
                .map(|e| dipoles.get(e.j).dot(&e.r) * e.cd.b1)
                .sum()
        });

        if let Some(ctx) = self.periodic {
            let zeros = vec![0.0; self.sites.num_sites()];
            let sf = ctx
                .reciprocal
                .structure_factors(&self.sites.positions, &zeros, Some(dipoles));
            let (phi_k, _) = ctx
                .reciprocal
                .potential_and_field(&self.sites.positions, &sf);
            potential.iter_mut().zip(phi_k).for_each(|(p, k)| *p += k);
        }
        potential
    }

    /// Gradient of the full charge + dipole Coulomb energy with respect to site positions,
    /// dipoles and charges held fixed, together with the virial `-∂E/∂ε`.
    pub fn gradients(&self, dipoles: &SiteVectors) -> GradientTerms {
        let q = &self.sites.charges;
        let per_site: Vec<(Vector3<f64>, Matrix3<f64>)> = self.per_site(|i| {
            let mu_i = dipoles.get(i);
            let mut grad = Vector3::zeros();
            let mut virial = Matrix3::zeros();
            for e in self.list.neighbors(i) {
                let mu_j = dipoles.get(e.j);
                let r = e.r;

                let mut g = -r * (q[i] * q[e.j] * e.cc.b1);

                let d = mu_j * q[i] - mu_i * q[e.j];
                g += d * e.cd.b1 - r * (d.dot(&r) * e.cd.b2);

                g -= e.dd.rank3_contract(&r, &mu_i, &mu_j);

                if !e.self_image {
                    grad += g;
                }
                virial -= g * r.transpose() * 0.5;
            }
            (grad, virial)
        });

        let n = self.sites.num_sites();
        let mut gradient = SiteVectors::from_fn(n, |i| per_site[i].0);
        let mut virial: Matrix3<f64> = per_site.iter().map(|(_, w)| w).sum();

        if let Some(ctx) = self.periodic {
            let sf = ctx
                .reciprocal
                .structure_factors(&self.sites.positions, q, Some(dipoles));
            let recip = ctx
                .reciprocal
                .gradient(&self.sites.positions, q, Some(dipoles), &sf);
            for i in 0..n {
                gradient.add(i, recip.get(i));
            }
            virial += ctx
                .reciprocal
                .virial(&self.sites.positions, Some(dipoles), &sf);
            virial += Matrix3::identity() * ctx.background_energy(self.sites.total_charge());
        }

        GradientTerms { gradient, virial }
    }
}

impl FieldOperator for FieldEngine<'_> {
    fn induced_field(&self, dipoles: &SiteVectors) -> SiteVectors {
        let pairs: Vec<Vector3<f64>> = self.per_site(|i| {
            self.list
                .neighbors(i)
                .iter()
                .map(|e| e.dd.dipole_field(&e.r, &dipoles.get(e.j)))
                .sum()
        });
        let mut field = SiteVectors::from_fn(self.sites.num_sites(), |i| pairs[i]);

        if let Some(ctx) = self.periodic {
            let zeros = vec![0.0; self.sites.num_sites()];
            let sf = ctx
                .reciprocal
                .structure_factors(&self.sites.positions, &zeros, Some(dipoles));
            let (_, field_k) = ctx
                .reciprocal
                .potential_and_field(&self.sites.positions, &sf);
            let self_factor = self_dipole_field_factor(ctx.alpha);
            for i in 0..self.sites.num_sites() {
                field.add(i, field_k.get(i) + dipoles.get(i) * self_factor);
            }
        }
        field
    }
}

/// Permanent energy `½ Σ q φ`.
pub fn permanent_energy(charges: &[f64], potential: &[f64]) -> f64 {
    0.5 * charges.iter().zip(potential).map(|(q, p)| q * p).sum::<f64>()
}

/// Induced energy `-½ Σ μ·E_q` at a converged dipole set.
pub fn induced_energy(dipoles: &SiteVectors, permanent_field: &SiteVectors) -> f64 {
    -0.5 * dipoles.dot(permanent_field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::electrostatics::switching::SwitchingFunction;
    use crate::engine::config::TholeConfig;
    use crate::engine::interactions::PairGeometry;

    fn f64_approx_equal(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol * (1.0 + a.abs().max(b.abs()))
    }

    fn cluster_state() -> SiteState {
        let coords = [
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(0.8, 0.6, 0.0),
            Vector3::new(2.9, 0.1, 0.3),
            Vector3::new(3.4, -0.7, 0.9),
            Vector3::new(-1.2, 2.8, -0.4),
        ];
        SiteState {
            positions: SiteVectors::from_fn(5, |k| coords[k]),
            charges: vec![-0.8, 0.4, 0.5, -0.3, 0.2],
            polarizabilities: vec![1.3, 0.3, 1.1, 0.4, 0.9],
            polfacs: vec![1.3, 0.3, 1.1, 0.4, 0.9],
        }
    }

    const MONOMERS: [usize; 5] = [0, 0, 1, 1, 2];

    fn build_list(sites: &SiteState, thole: &TholeConfig, periodic: Option<&PeriodicContext>) -> InteractionList {
        let geometry = PairGeometry {
            cutoff: periodic.map(|_| 4.5),
            switching: match periodic {
                Some(_) => SwitchingFunction::new(4.5, 0.0),
                None => SwitchingFunction::none(),
            },
            exclusion_distance: 2.0,
            thole,
            ewald: periodic.map(|ctx| (&ctx.cell, ctx.alpha)),
        };
        InteractionList::build(&sites.positions, &sites.polfacs, &MONOMERS, &geometry)
    }

    fn trial_dipoles() -> SiteVectors {
        SiteVectors::from_fn(5, |k| Vector3::new(0.1 * k as f64, -0.05, 0.03 * (k as f64 - 2.0)))
    }

    fn coulomb_energy(
        sites: &SiteState,
        thole: &TholeConfig,
        periodic: Option<&PeriodicContext>,
        dipoles: &SiteVectors,
    ) -> f64 {
        let list = build_list(sites, thole, periodic);
        let engine = FieldEngine::new(sites, &list, periodic);
        let permanent = engine.permanent();
        permanent_energy(&sites.charges, &permanent.potential) - dipoles.dot(&permanent.field)
            - 0.5 * dipoles.dot(&engine.induced_field(dipoles))
    }

    #[test]
    fn undamped_point_charges_give_coulomb_potential() {
        let sites = SiteState {
            positions: SiteVectors::from_fn(2, |k| Vector3::new(3.0 * k as f64, 0.0, 0.0)),
            charges: vec![1.0, -2.0],
            polarizabilities: vec![0.0; 2],
            polfacs: vec![0.0; 2],
        };
        let thole = TholeConfig::default();
        let geometry = PairGeometry {
            cutoff: None,
            switching: SwitchingFunction::none(),
            exclusion_distance: 2.0,
            thole: &thole,
            ewald: None,
        };
        let list = InteractionList::build(&sites.positions, &sites.polfacs, &[0, 1], &geometry);
        let permanent = FieldEngine::new(&sites, &list, None).permanent();
        assert!(f64_approx_equal(permanent.potential[0], -2.0 / 3.0, 1e-14));
        assert!(f64_approx_equal(
            permanent_energy(&sites.charges, &permanent.potential),
            -2.0 / 3.0,
            1e-14
        ));
        assert!(f64_approx_equal(permanent.field.get(0).x, 2.0 / 9.0, 1e-14));
    }

    #[test]
    fn dipole_potential_is_consistent_with_charge_field() {
        let sites = cluster_state();
        let thole = TholeConfig::default();
        let list = build_list(&sites, &thole, None);
        let engine = FieldEngine::new(&sites, &list, None);
        let dipoles = trial_dipoles();
        let lhs: f64 = engine
            .dipole_potential(&dipoles)
            .iter()
            .zip(&sites.charges)
            .map(|(p, q)| p * q)
            .sum();
        let rhs = dipoles.dot(&engine.permanent().field);
        assert!(f64_approx_equal(lhs, rhs, 1e-12));
    }

    #[test]
    fn induced_field_operator_is_symmetric() {
        let sites = cluster_state();
        let thole = TholeConfig::default();
        let list = build_list(&sites, &thole, None);
        let engine = FieldEngine::new(&sites, &list, None);
        let a = trial_dipoles();
        let b = SiteVectors::from_fn(5, |k| Vector3::new(-0.02, 0.07 * k as f64, 0.04));
        let ab = b.dot(&engine.induced_field(&a));
        let ba = a.dot(&engine.induced_field(&b));
        assert!(f64_approx_equal(ab, ba, 1e-12));
    }

    fn check_gradients(periodic: Option<&PeriodicContext>) {
        let sites = cluster_state();
        let thole = TholeConfig::default();
        let dipoles = trial_dipoles();
        let list = build_list(&sites, &thole, periodic);
        let analytic = FieldEngine::new(&sites, &list, periodic).gradients(&dipoles);

        let h = 1e-5;
        for i in 0..sites.num_sites() {
            for a in 0..3 {
                let mut delta = Vector3::zeros();
                delta[a] = h;
                let mut plus = sites.clone();
                let mut minus = sites.clone();
                plus.positions.add(i, delta);
                minus.positions.add(i, -delta);
                let numeric = (coulomb_energy(&plus, &thole, periodic, &dipoles)
                    - coulomb_energy(&minus, &thole, periodic, &dipoles))
                    / (2.0 * h);
                assert!(
                    f64_approx_equal(numeric, analytic.gradient.get(i)[a], 1e-6),
                    "site {i} axis {a}: {numeric} vs {}",
                    analytic.gradient.get(i)[a]
                );
            }
        }
    }

    #[test]
    fn cluster_gradients_match_finite_differences() {
        check_gradients(None);
    }

    #[test]
    fn periodic_gradients_match_finite_differences() {
        let cell = PeriodicBox::new([9.0, 0.0, 0.0, 0.5, 9.5, 0.0, -0.3, 0.4, 10.0]).unwrap();
        let ctx = PeriodicContext::new(cell, 0.7, 1e-12);
        check_gradients(Some(&ctx));
    }

    #[test]
    fn cluster_virial_matches_strain_derivative() {
        let sites = cluster_state();
        let thole = TholeConfig::default();
        let dipoles = trial_dipoles();
        let list = build_list(&sites, &thole, None);
        let virial = FieldEngine::new(&sites, &list, None).gradients(&dipoles).virial;

        let h = 1e-6;
        for a in 0..3 {
            for b in 0..3 {
                let strained = |sign: f64| {
                    let mut strain = Matrix3::zeros();
                    strain[(a, b)] = sign * h;
                    let mut state = sites.clone();
                    state.positions = SiteVectors::from_fn(5, |k| {
                        (Matrix3::identity() + strain) * sites.positions.get(k)
                    });
                    coulomb_energy(&state, &thole, None, &dipoles)
                };
                let numeric = -(strained(1.0) - strained(-1.0)) / (2.0 * h);
                assert!(
                    f64_approx_equal(numeric, virial[(a, b)], 1e-5),
                    "W[{a},{b}]: {numeric} vs {}",
                    virial[(a, b)]
                );
            }
        }
    }
}
