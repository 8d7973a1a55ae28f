use crate::core::models::sites::SiteVectors;
use std::collections::VecDeque;

fn binomial(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }
    (0..k.min(n - k)).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}

/// Bounded history of converged dipole sets, oldest evicted first, with the Kolafa
/// predictor-corrector coefficients of order `k`.
#[derive(Debug, Clone, PartialEq)]
pub struct DipoleHistory {
    order: usize,
    entries: VecDeque<SiteVectors>,
    coefficients: Vec<f64>,
    omega: f64,
}

impl DipoleHistory {
    pub fn new(order: usize) -> Self {
        let k = order;
        let denominator = binomial(2 * k + 2, k + 1);
        let coefficients = (1..=k + 2)
            .map(|j| {
                let sign = if j % 2 == 1 { 1.0 } else { -1.0 };
                sign * j as f64 * binomial(2 * k + 4, k + 2 - j) / denominator
            })
            .collect();
        Self {
            order,
            entries: VecDeque::with_capacity(k + 2),
            coefficients,
            omega: (k as f64 + 2.0) / (2.0 * k as f64 + 3.0),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.order + 2
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity()
    }

    /// Predictor coefficients `b_1..b_{k+2}`, `b_1` weighting the most recent entry.
    #[inline]
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Corrector mixing weight `ω = (k + 2) / (2k + 3)`.
    #[inline]
    pub fn omega(&self) -> f64 {
        self.omega
    }

    pub fn push(&mut self, dipoles: SiteVectors) {
        if self.is_full() {
            self.entries.pop_front();
        }
        self.entries.push_back(dipoles);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries from oldest to most recent.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &SiteVectors> {
        self.entries.iter()
    }

    /// `Σ_j b_j μ(t - j)`, or `None` until the history is full.
    pub fn predict(&self) -> Option<SiteVectors> {
        if !self.is_full() {
            return None;
        }
        let newest = self.entries.back()?;
        let mut predicted = SiteVectors::zeros(newest.len());
        for (b, entry) in self.coefficients.iter().zip(self.entries.iter().rev()) {
            predicted.axpy(*b, entry);
        }
        Some(predicted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn constant(n: usize, v: f64) -> SiteVectors {
        SiteVectors::from_fn(n, |_| Vector3::new(v, v, v))
    }

    #[test]
    fn coefficients_of_order_zero_are_linear_extrapolation() {
        let history = DipoleHistory::new(0);
        assert_eq!(history.coefficients(), &[2.0, -1.0]);
        assert!((history.omega() - 2.0 / 3.0).abs() < 1e-15);
    }

    #[test]
    fn coefficients_of_default_order_match_kolafa_table() {
        let history = DipoleHistory::new(4);
        let expected = [22.0 / 7.0, -55.0 / 14.0, 55.0 / 21.0, -22.0 / 21.0, 5.0 / 21.0, -1.0 / 42.0];
        for (b, e) in history.coefficients().iter().zip(expected) {
            assert!((b - e).abs() < 1e-12, "{b} vs {e}");
        }
        assert!((history.omega() - 6.0 / 11.0).abs() < 1e-15);
    }

    #[test]
    fn coefficients_sum_to_one_for_every_order() {
        for k in 0..8 {
            let sum: f64 = DipoleHistory::new(k).coefficients().iter().sum();
            assert!((sum - 1.0).abs() < 1e-10, "order {k}: {sum}");
        }
    }

    #[test]
    fn push_evicts_oldest_beyond_capacity() {
        let mut history = DipoleHistory::new(1);
        for v in 0..5 {
            history.push(constant(2, v as f64));
        }
        assert_eq!(history.len(), 3);
        let firsts: Vec<f64> = history.iter().map(|e| e.get(0).x).collect();
        assert_eq!(firsts, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn prediction_waits_for_full_history() {
        let mut history = DipoleHistory::new(1);
        history.push(constant(1, 1.0));
        history.push(constant(1, 2.0));
        assert!(history.predict().is_none());
        history.push(constant(1, 3.0));
        let predicted = history.predict().unwrap();
        assert!((predicted.get(0).x - 4.0).abs() < 1e-12);
    }

    #[test]
    fn clear_empties_history() {
        let mut history = DipoleHistory::new(2);
        history.push(constant(1, 1.0));
        history.clear();
        assert!(history.is_empty());
        assert!(!history.is_full());
    }
}
