#![allow(dead_code)]

use mbelec::{
    CalculationOptions, DipoleMethod, Electrostatics, ElectrostaticsConfig, MonomerTopology,
    PeriodicBox, SiteData,
};
use nalgebra::{Matrix3, Vector3};
use std::sync::Once;
use tracing_subscriber::filter::LevelFilter;

static TRACING: Once = Once::new();

pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(LevelFilter::DEBUG)
            .try_init();
    });
}

pub const KCAL_COULOMB: f64 = 332.0637;

/// Sites in order O, H, H, M.
const WATER_CHARGES: [f64; 4] = [0.0, 0.52, 0.52, -1.04];
const WATER_POLARIZABILITIES: [f64; 4] = [1.310, 0.294, 0.294, 0.0];
const WATER_POLFACS: [f64; 4] = [1.310, 0.294, 0.294, 1.310];

#[derive(Debug, Clone)]
pub struct Monomer {
    pub kind: &'static str,
    pub charges: Vec<f64>,
    pub polarizabilities: Vec<f64>,
    pub polarizability_factors: Vec<f64>,
    pub positions: Vec<f64>,
}

impl Monomer {
    pub fn water(positions: [f64; 12]) -> Self {
        Self {
            kind: "h2o",
            charges: WATER_CHARGES.to_vec(),
            polarizabilities: WATER_POLARIZABILITIES.to_vec(),
            polarizability_factors: WATER_POLFACS.to_vec(),
            positions: positions.to_vec(),
        }
    }

    pub fn ion(kind: &'static str, charge: f64, polarizability: f64, position: [f64; 3]) -> Self {
        Self {
            kind,
            charges: vec![charge],
            polarizabilities: vec![polarizability],
            polarizability_factors: vec![polarizability],
            positions: position.to_vec(),
        }
    }

    pub fn num_sites(&self) -> usize {
        self.charges.len()
    }
}

pub fn water_a() -> Monomer {
    Monomer::water([
        0.000, 0.000, 0.000, //
        0.757, 0.586, 0.000, //
        -0.757, 0.586, 0.000, //
        0.000, 0.155, 0.000,
    ])
}

pub fn water_b() -> Monomer {
    Monomer::water([
        0.100, -0.250, 2.900, //
        0.820, 0.180, 3.350, //
        -0.620, 0.310, 3.150, //
        0.100, -0.123, 2.990,
    ])
}

pub fn water_c() -> Monomer {
    Monomer::water([
        2.800, 0.400, 1.200, //
        3.350, -0.330, 1.450, //
        3.300, 1.150, 1.500, //
        2.930, 0.410, 1.320,
    ])
}

pub fn sodium() -> Monomer {
    Monomer::ion("na", 1.0, 0.147, [-2.600, -1.200, 1.700])
}

#[derive(Debug, Clone)]
pub struct System {
    pub data: SiteData,
    pub topology: MonomerTopology,
}

impl System {
    pub fn num_sites(&self) -> usize {
        self.data.charges.len()
    }

    /// Applies `(I + strain)` to every position.
    pub fn strained(&self, strain: &Matrix3<f64>) -> Self {
        let mut out = self.clone();
        let deformation = Matrix3::identity() + strain;
        for site in out.data.positions.chunks_exact_mut(3) {
            let r = deformation * Vector3::new(site[0], site[1], site[2]);
            site.copy_from_slice(r.as_slice());
        }
        out
    }
}

/// Concatenates monomers in the given order; types are declared in order of first appearance.
pub fn assemble(monomers: &[Monomer]) -> System {
    let mut data = SiteData::default();
    let mut ids = Vec::new();
    let mut counts = Vec::new();
    let mut firsts = Vec::new();
    let mut type_counts: Vec<(String, usize)> = Vec::new();

    for monomer in monomers {
        ids.push(monomer.kind.to_string());
        counts.push(monomer.num_sites());
        firsts.push(data.charges.len());
        match type_counts.iter_mut().find(|(kind, _)| kind == monomer.kind) {
            Some((_, count)) => *count += 1,
            None => type_counts.push((monomer.kind.to_string(), 1)),
        }
        data.charges.extend(&monomer.charges);
        data.polarizabilities.extend(&monomer.polarizabilities);
        data.polarizability_factors
            .extend(&monomer.polarizability_factors);
        data.positions.extend(&monomer.positions);
    }

    System {
        data,
        topology: MonomerTopology::new(ids, counts, firsts, type_counts),
    }
}

pub fn water_dimer() -> System {
    assemble(&[water_a(), water_b()])
}

/// Rock-salt conventional cell with nearest-neighbour distance `r0`, as single-site monomers.
pub fn rock_salt(r0: f64) -> (System, PeriodicBox) {
    let mut monomers = Vec::new();
    for (i, j, k) in itertools::iproduct!(0..2, 0..2, 0..2) {
        let position = [i as f64 * r0, j as f64 * r0, k as f64 * r0];
        if (i + j + k) % 2 == 0 {
            monomers.push(Monomer::ion("na", 1.0, 0.0, position));
        } else {
            monomers.push(Monomer::ion("cl", -1.0, 0.0, position));
        }
    }
    let cell = PeriodicBox::orthorhombic(2.0 * r0, 2.0 * r0, 2.0 * r0).expect("valid box");
    (assemble(&monomers), cell)
}

/// Geometry-dependent water charges: each hydrogen charge varies linearly with its O-H
/// bond length and the M site balances them. Fills `charge_gradients` to match.
pub fn apply_bond_charge_model(system: &mut System) {
    const Q_H: f64 = 0.52;
    const R_EQ: f64 = 0.9572;
    const SLOPE: f64 = 0.35;

    let topology = &system.topology;
    let data = &mut system.data;
    data.charge_gradients = vec![0.0; topology.charge_gradient_len()];
    let mut offset = 0;
    for m in 0..topology.num_monomers() {
        let n = topology.site_counts[m];
        let first = topology.first_indices[m];
        if topology.monomer_ids[m] == "h2o" {
            let site = |s: usize| {
                let p = &data.positions[3 * (first + s)..3 * (first + s) + 3];
                Vector3::new(p[0], p[1], p[2])
            };
            let oxygen = site(0);
            let mut balance = 0.0;
            let mut rows = Vec::new();
            for h in [1, 2] {
                let bond = site(h) - oxygen;
                let length = bond.norm();
                let q = Q_H + SLOPE * (length - R_EQ);
                balance += q;
                rows.push((h, q, bond / length * SLOPE));
            }
            data.charges[first] = 0.0;
            data.charges[first + 3] = -balance;

            let block = &mut data.charge_gradients[offset..offset + n * n * 3];
            let mut set = |i: usize, k: usize, v: Vector3<f64>| {
                for c in 0..3 {
                    block[(i * n + k) * 3 + c] += v[c];
                }
            };
            for (h, q, dq) in rows {
                data.charges[first + h] = q;
                set(h, h, dq);
                set(h, 0, -dq);
                set(3, h, -dq);
                set(3, 0, dq);
            }
        }
        offset += n * n * 3;
    }
}

pub fn options(method: DipoleMethod, periodic_box: Option<PeriodicBox>) -> CalculationOptions {
    CalculationOptions {
        do_grads: true,
        tolerance: 1e-20,
        max_iterations: 500,
        dipole_method: method,
        periodic_box,
    }
}

pub struct Evaluation {
    pub energy: f64,
    pub gradient: Vec<f64>,
    pub engine: Electrostatics,
}

pub fn evaluate(
    config: &ElectrostaticsConfig,
    system: &System,
    options: CalculationOptions,
) -> Evaluation {
    let mut engine = Electrostatics::new(config.clone()).expect("valid config");
    engine
        .initialize(system.data.clone(), system.topology.clone(), options)
        .expect("valid system");
    let mut gradient = vec![0.0; 3 * system.num_sites()];
    let energy = engine
        .get_electrostatics(&mut gradient)
        .expect("evaluation succeeds");
    Evaluation {
        energy,
        gradient,
        engine,
    }
}

pub fn assert_close(actual: f64, expected: f64, relative: f64, floor: f64, context: &str) {
    let scale = actual.abs().max(expected.abs()).max(floor);
    assert!(
        (actual - expected).abs() <= relative * scale,
        "{context}: {actual} vs {expected}"
    );
}

/// Compares analytic gradients with central differences, rebuilding geometry-dependent
/// inputs through `prepare` after every displacement.
pub fn assert_gradients_match(
    config: &ElectrostaticsConfig,
    system: &System,
    options: &CalculationOptions,
    prepare: impl Fn(&mut System),
) {
    let h = 1e-5;
    let mut reference = system.clone();
    prepare(&mut reference);
    let analytic = evaluate(config, &reference, options.clone()).gradient;

    for i in 0..analytic.len() {
        let displaced = |delta: f64| {
            let mut moved = reference.clone();
            moved.data.positions[i] += delta;
            prepare(&mut moved);
            evaluate(config, &moved, options.clone()).energy
        };
        let numeric = (displaced(h) - displaced(-h)) / (2.0 * h);
        assert_close(
            analytic[i],
            numeric,
            1e-4,
            0.05,
            &format!("gradient component {i}"),
        );
    }
}

/// Compares the virial with `-∂E/∂ε_ab` under a homogeneous deformation of positions and
/// box.
pub fn assert_virial_matches_strain(
    config: &ElectrostaticsConfig,
    system: &System,
    options: &CalculationOptions,
    prepare: impl Fn(&mut System),
) {
    let h = 1e-5;
    let mut reference = system.clone();
    prepare(&mut reference);
    let virial = evaluate(config, &reference, options.clone()).engine.virial();

    for a in 0..3 {
        for b in 0..3 {
            let strained = |sign: f64| {
                let mut strain = Matrix3::zeros();
                strain[(a, b)] = sign * h;
                let mut moved = reference.strained(&strain);
                prepare(&mut moved);
                let mut opts = options.clone();
                opts.periodic_box = options
                    .periodic_box
                    .as_ref()
                    .map(|cell| cell.deformed(&strain).expect("small strain"));
                evaluate(config, &moved, opts).energy
            };
            let numeric = -(strained(1.0) - strained(-1.0)) / (2.0 * h);
            assert_close(
                virial[a * 3 + b],
                numeric,
                1e-4,
                0.05,
                &format!("virial component ({a}, {b})"),
            );
        }
    }
}
