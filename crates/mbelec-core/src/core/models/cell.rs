use nalgebra::{Matrix3, Vector3};
use std::f64::consts::PI;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BoxError {
    #[error("A periodic box needs 0 or 9 values, got {0}")]
    WrongLength(usize),
    #[error("Box vectors contain a non-finite value")]
    NonFinite,
    #[error("Box vectors are degenerate (volume {0:.3e})")]
    Degenerate(f64),
}

/// Triclinic periodic cell.
///
/// The three box vectors are the columns of `cell`, so a fractional coordinate `s` maps to
/// the Cartesian point `cell * s`.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodicBox {
    cell: Matrix3<f64>,
    inverse: Matrix3<f64>,
    volume: f64,
}

impl PeriodicBox {
    /// Builds a box from `{v1x, v1y, v1z, v2x, v2y, v2z, v3x, v3y, v3z}`.
    pub fn new(vectors: [f64; 9]) -> Result<Self, BoxError> {
        if vectors.iter().any(|v| !v.is_finite()) {
            return Err(BoxError::NonFinite);
        }
        let cell = Matrix3::new(
            vectors[0], vectors[3], vectors[6], //
            vectors[1], vectors[4], vectors[7], //
            vectors[2], vectors[5], vectors[8],
        );
        let volume = cell.determinant().abs();
        if volume < 1e-10 {
            return Err(BoxError::Degenerate(volume));
        }
        let inverse = cell.try_inverse().ok_or(BoxError::Degenerate(volume))?;
        Ok(Self {
            cell,
            inverse,
            volume,
        })
    }

    /// Orthorhombic box with edge lengths `a`, `b`, `c`.
    pub fn orthorhombic(a: f64, b: f64, c: f64) -> Result<Self, BoxError> {
        Self::new([a, 0.0, 0.0, 0.0, b, 0.0, 0.0, 0.0, c])
    }

    /// Empty input means no periodicity.
    pub fn from_flat(values: &[f64]) -> Result<Option<Self>, BoxError> {
        match values.len() {
            0 => Ok(None),
            9 => {
                let mut vectors = [0.0; 9];
                vectors.copy_from_slice(values);
                Self::new(vectors).map(Some)
            }
            n => Err(BoxError::WrongLength(n)),
        }
    }

    pub fn to_flat(&self) -> [f64; 9] {
        let mut out = [0.0; 9];
        for v in 0..3 {
            for c in 0..3 {
                out[v * 3 + c] = self.cell[(c, v)];
            }
        }
        out
    }

    #[inline]
    pub fn volume(&self) -> f64 {
        self.volume
    }

    #[inline]
    pub fn vector(&self, i: usize) -> Vector3<f64> {
        self.cell.column(i).into_owned()
    }

    #[inline]
    pub fn to_fractional(&self, r: &Vector3<f64>) -> Vector3<f64> {
        self.inverse * r
    }

    #[inline]
    pub fn to_cartesian(&self, s: &Vector3<f64>) -> Vector3<f64> {
        self.cell * s
    }

    /// Distances between opposite faces of the cell.
    pub fn perpendicular_widths(&self) -> [f64; 3] {
        [0, 1, 2].map(|i| 1.0 / self.inverse.row(i).norm())
    }

    /// Wraps a displacement into the cell centred on the origin.
    pub fn minimum_image(&self, d: &Vector3<f64>) -> Vector3<f64> {
        let s = self.to_fractional(d);
        let wrapped = s.map(|v| v - v.round());
        self.to_cartesian(&wrapped)
    }

    /// Lattice translation for integer image indices `n`.
    #[inline]
    pub fn translation(&self, n: [i32; 3]) -> Vector3<f64> {
        self.cell * Vector3::new(n[0] as f64, n[1] as f64, n[2] as f64)
    }

    /// Reciprocal-lattice vector `2π H⁻ᵀ n`.
    #[inline]
    pub fn reciprocal(&self, n: [i32; 3]) -> Vector3<f64> {
        2.0 * PI * self.inverse.transpose() * Vector3::new(n[0] as f64, n[1] as f64, n[2] as f64)
    }

    /// Applies the homogeneous deformation `(I + strain)` to the box vectors.
    pub fn deformed(&self, strain: &Matrix3<f64>) -> Result<Self, BoxError> {
        let cell = (Matrix3::identity() + strain) * self.cell;
        let volume = cell.determinant().abs();
        let inverse = cell.try_inverse().ok_or(BoxError::Degenerate(volume))?;
        if volume < 1e-10 {
            return Err(BoxError::Degenerate(volume));
        }
        Ok(Self {
            cell,
            inverse,
            volume,
        })
    }
}
