use super::switching::SwitchValue;
use nalgebra::{Matrix3, Vector3};
use std::f64::consts::PI;

/// Radial sequence `B0..B3` of a pair Green's function, with `B_{n+1} = -B_n'/r`.
///
/// Every Cartesian interaction tensor of a pair follows from this sequence: the potential is
/// `B0`, the field `r B1`, the dipole tensor `r rᵀ B2 - I B1` and the third-rank tensor
/// `(δ_ab r_c + δ_ac r_b + δ_bc r_a) B2 - r_a r_b r_c B3`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RadialTensor {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub b3: f64,
}

impl RadialTensor {
    pub const ZERO: RadialTensor = RadialTensor {
        b0: 0.0,
        b1: 0.0,
        b2: 0.0,
        b3: 0.0,
    };

    /// Undamped Coulomb sequence `1/r, 1/r³, 3/r⁵, 15/r⁷`.
    #[inline]
    pub fn bare(r: f64) -> Self {
        let inv_r = 1.0 / r;
        let inv_r2 = inv_r * inv_r;
        let b0 = inv_r;
        let b1 = b0 * inv_r2;
        let b2 = 3.0 * b1 * inv_r2;
        let b3 = 5.0 * b2 * inv_r2;
        Self { b0, b1, b2, b3 }
    }

    /// Bare sequence multiplied term by term by screening factors.
    #[inline]
    pub fn screened(r: f64, s: [f64; 4]) -> Self {
        let bare = Self::bare(r);
        Self {
            b0: s[0] * bare.b0,
            b1: s[1] * bare.b1,
            b2: s[2] * bare.b2,
            b3: s[3] * bare.b3,
        }
    }

    /// The screening correction `(s_n - 1) B_n^bare` alone.
    #[inline]
    pub fn screening_correction(r: f64, s: [f64; 4]) -> Self {
        Self::screened(r, [s[0] - 1.0, s[1] - 1.0, s[2] - 1.0, s[3] - 1.0])
    }

    /// Ewald real-space sequence of `erfc(αr)/r`.
    pub fn erfc(r: f64, alpha: f64) -> Self {
        let r2 = r * r;
        let inv_r2 = 1.0 / r2;
        let gauss = (-alpha * alpha * r2).exp() / (alpha * PI.sqrt());
        let two_a2 = 2.0 * alpha * alpha;

        let b0 = statrs::function::erf::erfc(alpha * r) / r;
        let b1 = (b0 + two_a2 * gauss) * inv_r2;
        let b2 = (3.0 * b1 + two_a2 * two_a2 * gauss) * inv_r2;
        let b3 = (5.0 * b2 + two_a2 * two_a2 * two_a2 * gauss) * inv_r2;
        Self { b0, b1, b2, b3 }
    }

    /// Applies a switching function to the potential `B0` and rederives `B1..B3` by the
    /// product rule.
    pub fn switched(self, r: f64, sw: SwitchValue) -> Self {
        if sw.is_one() {
            return self;
        }
        if sw.value == 0.0 && sw.d1 == 0.0 && sw.d2 == 0.0 && sw.d3 == 0.0 {
            return Self::ZERO;
        }

        let r2 = r * r;
        let r3 = r2 * r;
        let phi = self.b0;
        let phi1 = -r * self.b1;
        let phi2 = -self.b1 + r2 * self.b2;
        let phi3 = 3.0 * r * self.b2 - r3 * self.b3;

        let f = sw.value * phi;
        let f1 = sw.d1 * phi + sw.value * phi1;
        let f2 = sw.d2 * phi + 2.0 * sw.d1 * phi1 + sw.value * phi2;
        let f3 = sw.d3 * phi + 3.0 * sw.d2 * phi1 + 3.0 * sw.d1 * phi2 + sw.value * phi3;

        let inv_r = 1.0 / r;
        let inv_r2 = inv_r * inv_r;
        let inv_r3 = inv_r2 * inv_r;
        Self {
            b0: f,
            b1: -f1 * inv_r,
            b2: f2 * inv_r2 - f1 * inv_r3,
            b3: -f3 * inv_r3 + 3.0 * f2 * inv_r2 * inv_r2 - 3.0 * f1 * inv_r3 * inv_r2,
        }
    }

    /// Field `r B1` of a unit source at `-r`.
    #[inline]
    pub fn field(&self, r: &Vector3<f64>) -> Vector3<f64> {
        r * self.b1
    }

    /// Rank-2 dipole tensor `r rᵀ B2 - I B1`.
    #[inline]
    pub fn dipole_tensor(&self, r: &Vector3<f64>) -> Matrix3<f64> {
        r * r.transpose() * self.b2 - Matrix3::identity() * self.b1
    }

    /// Field of dipole `mu` at displacement `r`: `T·mu`.
    #[inline]
    pub fn dipole_field(&self, r: &Vector3<f64>, mu: &Vector3<f64>) -> Vector3<f64> {
        r * (r.dot(mu) * self.b2) - mu * self.b1
    }

    /// Contraction of the rank-3 tensor with two vectors: `Σ_bc T_abc u_b v_c`.
    #[inline]
    pub fn rank3_contract(&self, r: &Vector3<f64>, u: &Vector3<f64>, v: &Vector3<f64>) -> Vector3<f64> {
        let ru = r.dot(u);
        let rv = r.dot(v);
        (u * rv + v * ru + r * u.dot(v)) * self.b2 - r * (ru * rv * self.b3)
    }
}

impl std::ops::Add for RadialTensor {
    type Output = RadialTensor;

    fn add(self, rhs: Self) -> Self {
        Self {
            b0: self.b0 + rhs.b0,
            b1: self.b1 + rhs.b1,
            b2: self.b2 + rhs.b2,
            b3: self.b3 + rhs.b3,
        }
    }
}

impl std::ops::Sub for RadialTensor {
    type Output = RadialTensor;

    fn sub(self, rhs: Self) -> Self {
        Self {
            b0: self.b0 - rhs.b0,
            b1: self.b1 - rhs.b1,
            b2: self.b2 - rhs.b2,
            b3: self.b3 - rhs.b3,
        }
    }
}
