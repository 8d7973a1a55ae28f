use super::config::{CalculationOptions, DipoleMethod, ElectrostaticsConfig};
use super::error::ElectrostaticsError;
use super::fields::{
    FieldEngine, GradientTerms, PeriodicContext, PermanentField, SiteState, induced_energy,
    permanent_energy,
};
use super::interactions::{InteractionList, PairGeometry};
use super::solver::{DipoleProblem, DipoleSolver, SolveReport, SolverStrategy};
use crate::core::electrostatics::constants::SQRT_COULOMB;
use crate::core::electrostatics::ewald::default_alpha;
use crate::core::electrostatics::switching::SwitchingFunction;
use crate::core::models::cell::PeriodicBox;
use crate::core::models::layout::SiteLayout;
use crate::core::models::sites::SiteVectors;
use crate::core::models::topology::{MonomerTopology, TopologyError};
use nalgebra::{Matrix3, Vector3};
use tracing::{debug, info, instrument, warn};

/// Raw per-site input in system order.
///
/// `positions` is interleaved `x, y, z` per site. `charge_gradients` is either empty
/// (constant charges) or one `n × n × 3` block per monomer, in system monomer order, where
/// element `(i * n + k) * 3 + c` is `∂q_i / ∂r_{k,c}`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SiteData {
    pub charges: Vec<f64>,
    pub charge_gradients: Vec<f64>,
    pub polarizability_factors: Vec<f64>,
    pub polarizabilities: Vec<f64>,
    pub positions: Vec<f64>,
}

impl SiteData {
    fn validate(&self, topology: &MonomerTopology) -> Result<(), ElectrostaticsError> {
        let n = topology.num_sites();
        let check = |field: &'static str, found: usize, expected: usize| {
            if found == expected {
                Ok(())
            } else {
                Err(TopologyError::LengthMismatch {
                    field,
                    expected,
                    found,
                })
            }
        };
        check("charges", self.charges.len(), n)?;
        check("polarizabilities", self.polarizabilities.len(), n)?;
        check("polarizability_factors", self.polarizability_factors.len(), n)?;
        check("positions", self.positions.len(), 3 * n)?;
        if !self.charge_gradients.is_empty() {
            check(
                "charge_gradients",
                self.charge_gradients.len(),
                topology.charge_gradient_len(),
            )?;
        }

        for (name, values) in [
            ("charges", &self.charges),
            ("positions", &self.positions),
            ("charge_gradients", &self.charge_gradients),
        ] {
            if values.iter().any(|v| !v.is_finite()) {
                return Err(ElectrostaticsError::invalid(name, "contains a non-finite value"));
            }
        }
        for (name, values) in [
            ("polarizabilities", &self.polarizabilities),
            ("polarizability_factors", &self.polarizability_factors),
        ] {
            if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
                return Err(ElectrostaticsError::invalid(
                    name,
                    "values must be finite and non-negative",
                ));
            }
        }
        Ok(())
    }

    fn to_site_major(&self, layout: &SiteLayout) -> Result<SiteState, TopologyError> {
        let positions = layout.reorder(&self.positions, 3)?;
        let charges = layout
            .reorder(&self.charges, 1)?
            .into_iter()
            .map(|q| q * SQRT_COULOMB)
            .collect();
        Ok(SiteState {
            positions: SiteVectors::from_component_major(positions).unwrap_or_default(),
            charges,
            polarizabilities: layout.reorder(&self.polarizabilities, 1)?,
            polfacs: layout.reorder(&self.polarizability_factors, 1)?,
        })
    }

    fn scaled_charge_gradients(&self) -> Vec<f64> {
        self.charge_gradients.iter().map(|g| g * SQRT_COULOMB).collect()
    }
}

#[derive(Debug, Clone)]
struct SystemState {
    topology: MonomerTopology,
    layout: SiteLayout,
    sites: SiteState,
    charge_gradients: Vec<f64>,
    options: CalculationOptions,
}

impl SystemState {
    /// Adds `Σ_i φ_i ∂q_i/∂r` to the gradient and the matching strain term to the virial.
    fn add_charge_gradient_terms(&self, potential: &[f64], terms: &mut GradientTerms) {
        if self.charge_gradients.is_empty() {
            return;
        }
        let offsets = self.topology.charge_gradient_offsets();
        for m in 0..self.topology.num_monomers() {
            let n = self.topology.site_counts[m];
            let first = self.topology.first_indices[m];
            let block = &self.charge_gradients[offsets[m]..offsets[m] + n * n * 3];
            let origin = self.sites.positions.get(self.layout.slot(first));

            for i in 0..n {
                let phi = potential[self.layout.slot(first + i)];
                for k in 0..n {
                    let slot_k = self.layout.slot(first + k);
                    let base = (i * n + k) * 3;
                    let dq = Vector3::new(block[base], block[base + 1], block[base + 2]);
                    terms.gradient.add(slot_k, dq * phi);
                    let relative = self.sites.positions.get(slot_k) - origin;
                    terms.virial -= dq * relative.transpose() * phi;
                }
            }
        }
    }
}

/// Polarizable electrostatics of one system, evaluated repeatedly along a trajectory.
///
/// The facade owns every per-site array, the interaction settings and, through the ASPC
/// strategy, the dipole history. A typical session is [`Electrostatics::initialize`]
/// followed by alternating [`Electrostatics::set_new_parameters`] and
/// [`Electrostatics::get_electrostatics`] calls.
#[derive(Debug, Clone)]
pub struct Electrostatics {
    config: ElectrostaticsConfig,
    state: Option<SystemState>,
    solver: SolverStrategy,
    cutoff_override: Option<f64>,
    dipoles: SiteVectors,
    permanent: PermanentField,
    permanent_energy: f64,
    induced_energy: f64,
    virial: Matrix3<f64>,
    last_report: Option<SolveReport>,
}

impl Default for Electrostatics {
    fn default() -> Self {
        let config = ElectrostaticsConfig::default();
        let solver = SolverStrategy::new(DipoleMethod::default(), config.aspc.order);
        Self {
            config,
            state: None,
            solver,
            cutoff_override: None,
            dipoles: SiteVectors::default(),
            permanent: PermanentField::default(),
            permanent_energy: 0.0,
            induced_energy: 0.0,
            virial: Matrix3::zeros(),
            last_report: None,
        }
    }
}

impl Electrostatics {
    pub fn new(config: ElectrostaticsConfig) -> Result<Self, ElectrostaticsError> {
        config.validate()?;
        let solver = SolverStrategy::new(DipoleMethod::default(), config.aspc.order);
        Ok(Self {
            config,
            solver,
            ..Self::default()
        })
    }

    /// Validates and stores a new system, replacing any previous one and clearing all
    /// per-call state, the cutoff override and the dipole history.
    #[instrument(skip_all, name = "electrostatics_initialize")]
    pub fn initialize(
        &mut self,
        site_data: SiteData,
        topology: MonomerTopology,
        options: CalculationOptions,
    ) -> Result<(), ElectrostaticsError> {
        options.validate()?;
        let layout = SiteLayout::new(&topology)?;
        site_data.validate(&topology)?;
        let sites = site_data.to_site_major(&layout)?;

        info!(
            num_sites = sites.num_sites(),
            num_monomers = topology.num_monomers(),
            method = %options.dipole_method,
            periodic = options.periodic_box.is_some(),
            "Electrostatics initialized."
        );

        self.solver = SolverStrategy::new(options.dipole_method, self.config.aspc.order);
        self.state = Some(SystemState {
            topology,
            layout,
            sites,
            charge_gradients: site_data.scaled_charge_gradients(),
            options,
        });
        self.cutoff_override = None;
        self.clear_results();
        Ok(())
    }

    /// Replaces per-site data and per-call options of the current system in place.
    ///
    /// The dipole history survives unless `dipole_method` differs from the active one.
    #[instrument(skip_all, name = "electrostatics_set_new_parameters")]
    pub fn set_new_parameters(
        &mut self,
        site_data: SiteData,
        dipole_method: DipoleMethod,
        do_grads: bool,
        periodic_box: Option<PeriodicBox>,
    ) -> Result<(), ElectrostaticsError> {
        let state = self.state.as_mut().ok_or(ElectrostaticsError::NotInitialized)?;
        site_data.validate(&state.topology)?;
        let sites = site_data.to_site_major(&state.layout)?;

        state.sites = sites;
        state.charge_gradients = site_data.scaled_charge_gradients();
        state.options.do_grads = do_grads;
        state.options.periodic_box = periodic_box;
        state.options.dipole_method = dipole_method;

        if self.solver.method() != dipole_method {
            debug!(
                from = %self.solver.method(),
                to = %dipole_method,
                "Dipole method changed; rebuilding solver strategy."
            );
            self.solver = SolverStrategy::new(dipole_method, self.config.aspc.order);
        }
        Ok(())
    }

    /// Clears the ASPC dipole history. Calling it repeatedly is harmless.
    pub fn reset_aspc_history(&mut self) {
        self.solver.reset_history();
    }

    /// Overrides the pair cutoff until the next [`Electrostatics::initialize`].
    pub fn set_cutoff(&mut self, cutoff: f64) -> Result<(), ElectrostaticsError> {
        if !(cutoff > 0.0) || !cutoff.is_finite() {
            return Err(ElectrostaticsError::invalid(
                "cutoff",
                format!("must be positive and finite, got {cutoff}"),
            ));
        }
        let exclusion = self.config.cutoff.exclusion_distance;
        if cutoff <= exclusion {
            return Err(ElectrostaticsError::invalid(
                "cutoff",
                format!("must exceed the exclusion distance {exclusion}, got {cutoff}"),
            ));
        }
        self.cutoff_override = Some(cutoff);
        Ok(())
    }

    /// Computes the electrostatic energy in kcal/mol. When gradients are enabled they are
    /// added into `grad` (system order, `3 × nsites` values) in kcal/(mol·Å).
    #[instrument(skip_all, name = "electrostatics_evaluation")]
    pub fn get_electrostatics(&mut self, grad: &mut [f64]) -> Result<f64, ElectrostaticsError> {
        let state = self.state.as_ref().ok_or(ElectrostaticsError::NotInitialized)?;
        let n = state.sites.num_sites();
        if state.options.do_grads && grad.len() != 3 * n {
            return Err(ElectrostaticsError::invalid(
                "grad",
                format!("expected {} values, got {}", 3 * n, grad.len()),
            ));
        }

        let cutoff = self.effective_cutoff(state.options.periodic_box.is_some());
        let periodic = state.options.periodic_box.clone().map(|cell| {
            let tolerance = self.config.ewald.tolerance;
            let alpha = self.config.ewald.alpha.unwrap_or_else(|| {
                default_alpha(cutoff.unwrap_or(self.config.cutoff.periodic_default), tolerance)
            });
            PeriodicContext::new(cell, alpha, tolerance)
        });

        let geometry = PairGeometry {
            cutoff,
            switching: cutoff.map_or(SwitchingFunction::none(), |c| {
                SwitchingFunction::new(c, self.config.cutoff.switch_width)
            }),
            exclusion_distance: self.config.cutoff.exclusion_distance,
            thole: &self.config.thole,
            ewald: periodic.as_ref().map(|ctx| (&ctx.cell, ctx.alpha)),
        };
        let list = InteractionList::build(
            &state.sites.positions,
            &state.sites.polfacs,
            state.layout.slot_monomers(),
            &geometry,
        );
        debug!(
            pairs = list.num_entries(),
            kvectors = periodic.as_ref().map_or(0, |ctx| ctx.reciprocal.len()),
            "Interaction list built."
        );

        let engine = FieldEngine::new(&state.sites, &list, periodic.as_ref());
        let permanent = engine.permanent();

        let problem = DipoleProblem {
            operator: &engine,
            polarizabilities: &state.sites.polarizabilities,
            permanent_field: &permanent.field,
            tolerance: state.options.tolerance,
            max_iterations: state.options.max_iterations,
        };
        let mut dipoles = if self.dipoles.len() == n {
            self.dipoles.clone()
        } else {
            problem.direct_dipoles()
        };
        let report = self.solver.solve(&problem, &mut dipoles);
        if !report.converged {
            warn!(
                method = %report.method,
                iterations = report.iterations,
                residual = report.residual,
                "Induced dipoles not converged; continuing with best estimate."
            );
        }

        let e_perm = permanent_energy(&state.sites.charges, &permanent.potential);
        let e_ind = induced_energy(&dipoles, &permanent.field);

        let virial = if state.options.do_grads {
            let mut terms = engine.gradients(&dipoles);
            if !state.charge_gradients.is_empty() {
                let total_potential: Vec<f64> = permanent
                    .potential
                    .iter()
                    .zip(engine.dipole_potential(&dipoles))
                    .map(|(p, d)| p + d)
                    .collect();
                state.add_charge_gradient_terms(&total_potential, &mut terms);
            }
            state.layout.unreorder_add(terms.gradient.as_slice(), 3, grad)?;
            terms.virial
        } else {
            Matrix3::zeros()
        };

        debug!(
            permanent = e_perm,
            induced = e_ind,
            iterations = report.iterations,
            "Electrostatics evaluated."
        );

        self.permanent = permanent;
        self.dipoles = dipoles;
        self.permanent_energy = e_perm;
        self.induced_energy = e_ind;
        self.virial = virial;
        self.last_report = Some(report);
        Ok(e_perm + e_ind)
    }

    fn clear_results(&mut self) {
        self.dipoles = SiteVectors::default();
        self.permanent = PermanentField::default();
        self.permanent_energy = 0.0;
        self.induced_energy = 0.0;
        self.virial = Matrix3::zeros();
        self.last_report = None;
    }

    fn effective_cutoff(&self, periodic: bool) -> Option<f64> {
        self.cutoff_override
            .or(self.config.cutoff.cutoff)
            .or(periodic.then_some(self.config.cutoff.periodic_default))
    }

    fn state(&self) -> Result<&SystemState, ElectrostaticsError> {
        self.state.as_ref().ok_or(ElectrostaticsError::NotInitialized)
    }

    /// Converts a scaled site-major quantity back to system order in physical units.
    fn export(&self, values: &[f64], components: usize) -> Result<Vec<f64>, ElectrostaticsError> {
        let state = self.state()?;
        let n = state.sites.num_sites();
        if values.len() != n * components {
            return Ok(vec![0.0; n * components]);
        }
        let unscaled: Vec<f64> = values.iter().map(|v| v / SQRT_COULOMB).collect();
        Ok(state.layout.unreorder(&unscaled, components)?)
    }

    pub fn config(&self) -> &ElectrostaticsConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    pub fn dipole_method(&self) -> DipoleMethod {
        self.solver.method()
    }

    /// Cutoff applied to the next evaluation, `None` when every pair interacts.
    pub fn cutoff(&self) -> Option<f64> {
        let periodic = self
            .state
            .as_ref()
            .is_some_and(|s| s.options.periodic_box.is_some());
        self.effective_cutoff(periodic)
    }

    pub fn permanent_energy(&self) -> f64 {
        self.permanent_energy
    }

    pub fn induced_energy(&self) -> f64 {
        self.induced_energy
    }

    /// Induced dipoles in e·Å, system order, interleaved.
    pub fn induced_dipoles(&self) -> Result<Vec<f64>, ElectrostaticsError> {
        self.export(self.dipoles.as_slice(), 3)
    }

    /// Field of the permanent charges in e/Å², system order, interleaved.
    pub fn permanent_field(&self) -> Result<Vec<f64>, ElectrostaticsError> {
        self.export(self.permanent.field.as_slice(), 3)
    }

    /// Potential of the permanent charges in e/Å, system order.
    pub fn potential(&self) -> Result<Vec<f64>, ElectrostaticsError> {
        self.export(&self.permanent.potential, 1)
    }

    /// Virial `W_ab = -∂E/∂ε_ab` in kcal/mol, row-major. Zero unless gradients are enabled.
    pub fn virial(&self) -> [f64; 9] {
        let mut out = [0.0; 9];
        for a in 0..3 {
            for b in 0..3 {
                out[a * 3 + b] = self.virial[(a, b)];
            }
        }
        out
    }

    pub fn last_solve_report(&self) -> Option<SolveReport> {
        self.last_report
    }

    pub fn aspc_history_len(&self) -> usize {
        self.solver.history().map_or(0, |h| h.len())
    }

    /// Stored ASPC dipole sets, oldest first, in the units of [`Self::induced_dipoles`].
    pub fn aspc_history(&self) -> Result<Vec<Vec<f64>>, ElectrostaticsError> {
        let Some(history) = self.solver.history() else {
            return Ok(Vec::new());
        };
        history
            .iter()
            .map(|entry| self.export(entry.as_slice(), 3))
            .collect()
    }
}
