use nalgebra::Vector3;

/// Per-site 3-vectors stored component-major: all x, then all y, then all z.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SiteVectors {
    n: usize,
    data: Vec<f64>,
}

impl SiteVectors {
    pub fn zeros(n: usize) -> Self {
        Self {
            n,
            data: vec![0.0; 3 * n],
        }
    }

    /// Wraps component-major data. Returns `None` when the length is not a multiple of 3.
    pub fn from_component_major(data: Vec<f64>) -> Option<Self> {
        if data.len() % 3 != 0 {
            return None;
        }
        Some(Self {
            n: data.len() / 3,
            data,
        })
    }

    pub fn from_fn(n: usize, mut f: impl FnMut(usize) -> Vector3<f64>) -> Self {
        let mut out = Self::zeros(n);
        for k in 0..n {
            out.set(k, f(k));
        }
        out
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    #[inline]
    pub fn get(&self, k: usize) -> Vector3<f64> {
        Vector3::new(self.data[k], self.data[self.n + k], self.data[2 * self.n + k])
    }

    #[inline]
    pub fn set(&mut self, k: usize, v: Vector3<f64>) {
        self.data[k] = v.x;
        self.data[self.n + k] = v.y;
        self.data[2 * self.n + k] = v.z;
    }

    #[inline]
    pub fn add(&mut self, k: usize, v: Vector3<f64>) {
        self.data[k] += v.x;
        self.data[self.n + k] += v.y;
        self.data[2 * self.n + k] += v.z;
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| a * b)
            .sum()
    }

    /// Largest squared per-site displacement between two sets of vectors.
    pub fn max_sq_diff(&self, other: &Self) -> f64 {
        (0..self.n)
            .map(|k| (self.get(k) - other.get(k)).norm_squared())
            .fold(0.0, f64::max)
    }

    /// Scales every site's vector by the matching per-site factor.
    pub fn scaled_per_site(&self, factors: &[f64]) -> Self {
        Self::from_fn(self.n, |k| self.get(k) * factors[k])
    }

    pub fn scale(&mut self, factor: f64) {
        self.data.iter_mut().for_each(|v| *v *= factor);
    }

    /// `self += alpha * other`.
    pub fn axpy(&mut self, alpha: f64, other: &Self) {
        self.data
            .iter_mut()
            .zip(&other.data)
            .for_each(|(a, b)| *a += alpha * b);
    }

    pub fn iter(&self) -> impl Iterator<Item = Vector3<f64>> + '_ {
        (0..self.n).map(move |k| self.get(k))
    }
}
