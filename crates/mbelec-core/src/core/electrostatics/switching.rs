/// Value of the switching function and its first three radial derivatives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwitchValue {
    pub value: f64,
    pub d1: f64,
    pub d2: f64,
    pub d3: f64,
}

impl SwitchValue {
    pub const ONE: SwitchValue = SwitchValue {
        value: 1.0,
        d1: 0.0,
        d2: 0.0,
        d3: 0.0,
    };
    pub const ZERO: SwitchValue = SwitchValue {
        value: 0.0,
        d1: 0.0,
        d2: 0.0,
        d3: 0.0,
    };

    #[inline]
    pub fn is_one(&self) -> bool {
        *self == Self::ONE
    }
}

/// Smooth cutoff going from 1 at `inner` to 0 at `outer` through a septic smoothstep,
/// continuous up to the third derivative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwitchingFunction {
    inner: f64,
    outer: f64,
}

impl SwitchingFunction {
    pub fn new(cutoff: f64, width: f64) -> Self {
        Self {
            inner: (cutoff - width.max(0.0)).max(0.0),
            outer: cutoff,
        }
    }

    /// No switching at any distance.
    pub fn none() -> Self {
        Self {
            inner: f64::INFINITY,
            outer: f64::INFINITY,
        }
    }

    #[inline]
    pub fn inner(&self) -> f64 {
        self.inner
    }

    #[inline]
    pub fn outer(&self) -> f64 {
        self.outer
    }

    pub fn evaluate(&self, r: f64) -> SwitchValue {
        if r >= self.outer {
            return SwitchValue::ZERO;
        }
        if r <= self.inner {
            return SwitchValue::ONE;
        }

        let delta = self.outer - self.inner;
        let t = (r - self.inner) / delta;
        let t2 = t * t;
        let t3 = t2 * t;
        let omt = 1.0 - t;

        let s = t3 * t * (35.0 - 84.0 * t + 70.0 * t2 - 20.0 * t3);
        let ds = 140.0 * t3 * omt * omt * omt;
        let d2s = 420.0 * t2 * omt * omt * (1.0 - 2.0 * t);
        let d3s = 840.0 * t * omt * (5.0 * t2 - 5.0 * t + 1.0);

        SwitchValue {
            value: 1.0 - s,
            d1: -ds / delta,
            d2: -d2s / (delta * delta),
            d3: -d3s / (delta * delta * delta),
        }
    }
}
