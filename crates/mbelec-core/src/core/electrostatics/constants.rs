pub const COULOMB_CONSTANT: f64 = 332.0637; // In kcal·Å/(mol·e²)

/// Charges are carried internally in units of `e · sqrt(COULOMB_CONSTANT)`.
pub const SQRT_COULOMB: f64 = 18.22261507029109;

pub const DEFAULT_A_CC: f64 = 0.4;
pub const DEFAULT_A_CD: f64 = 0.4;
pub const DEFAULT_A_DD: f64 = 0.055;

pub const DEFAULT_EXCLUSION_DISTANCE: f64 = 2.0; // In Å
pub const DEFAULT_PERIODIC_CUTOFF: f64 = 9.0; // In Å
pub const DEFAULT_EWALD_TOLERANCE: f64 = 1e-8;

pub const DEFAULT_DIPOLE_TOLERANCE: f64 = 1e-16;
pub const DEFAULT_MAX_ITERATIONS: usize = 100;
pub const DEFAULT_ASPC_ORDER: usize = 4;

/// Thole exponent for charge-charge and charge-dipole screening.
pub const THOLE_EXPONENT_CHARGE: i32 = 4;
/// Thole exponent for dipole-dipole screening.
pub const THOLE_EXPONENT_DIPOLE: i32 = 3;
