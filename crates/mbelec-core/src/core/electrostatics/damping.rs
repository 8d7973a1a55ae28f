use super::constants::{THOLE_EXPONENT_CHARGE, THOLE_EXPONENT_DIPOLE};
use statrs::function::gamma::{gamma, gamma_ur};

/// Beyond this value of `a u^p` the damping correction is below double precision.
const SCREENING_SATURATION: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    ChargeCharge,
    ChargeDipole,
    DipoleDipole,
}

impl InteractionKind {
    #[inline]
    pub fn exponent(self) -> i32 {
        match self {
            InteractionKind::ChargeCharge | InteractionKind::ChargeDipole => THOLE_EXPONENT_CHARGE,
            InteractionKind::DipoleDipole => THOLE_EXPONENT_DIPOLE,
        }
    }
}

/// Combined Thole width `A = (polfac_i · polfac_j)^(1/6)`.
#[inline]
pub fn combined_width(polfac_i: f64, polfac_j: f64) -> f64 {
    let product = polfac_i * polfac_j;
    if product <= 0.0 {
        0.0
    } else {
        product.powf(1.0 / 6.0)
    }
}

/// Upper incomplete gamma function `Γ(s, x)`.
#[inline]
fn upper_incomplete_gamma(s: f64, x: f64) -> f64 {
    gamma(s) * gamma_ur(s, x)
}

/// Screening factors `[s0, s1, s2, s3]` multiplying the bare radial sequence
/// `1/r, 1/r³, 3/r⁵, 15/r⁷` for a Thole-damped pair at distance `r`.
///
/// `a` is the Thole strength, `width` the combined width `A` and `p` the exponent of the
/// smeared distribution. A zero width or zero strength leaves the pair undamped.
pub fn thole_screening(r: f64, a: f64, width: f64, p: i32) -> [f64; 4] {
    if width <= 0.0 || a <= 0.0 {
        return [1.0; 4];
    }

    let pf = p as f64;
    let u = r / width;
    let x = a * u.powi(p);
    if x > SCREENING_SATURATION {
        return [1.0; 4];
    }

    let e = (-x).exp();
    let s1 = -(-x).exp_m1();
    let s0 = s1 + a.powf(1.0 / pf) * u * upper_incomplete_gamma(1.0 - 1.0 / pf, x);
    let s2 = s1 - (pf / 3.0) * x * e;
    let s3 = s2 - (pf * x * e / 15.0) * (3.0 - pf + pf * x);
    [s0, s1, s2, s3]
}

/// Screening for one interaction kind with its Thole strength.
#[inline]
pub fn kind_screening(kind: InteractionKind, r: f64, a: f64, width: f64) -> [f64; 4] {
    thole_screening(r, a, width, kind.exponent())
}
