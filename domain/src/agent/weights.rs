//! Signal weights - how much each signal family drives an agent's view.
//!
//! Four weights (technical, news, on-chain, sentiment) always satisfy:
//!
//! - each weight lies in `[MIN_WEIGHT, MAX_WEIGHT]`
//! - the weights sum to 1.0
//!
//! Adjustments add deltas, clamp, and renormalize. When proportional
//! renormalization would push a weight back out of the band, the result is
//! the Euclidean projection onto the bounded simplex instead.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

pub const MIN_WEIGHT: f64 = 0.05;
pub const MAX_WEIGHT: f64 = 0.80;

const BAND_EPSILON: f64 = 1e-12;
const BISECTION_STEPS: usize = 200;

/// Normalized signal weights of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalWeights {
    pub technical: f64,
    pub news: f64,
    pub onchain: f64,
    pub sentiment: f64,
}

/// Additive deltas proposed by the learning step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightAdjustment {
    pub technical: f64,
    pub news: f64,
    pub onchain: f64,
    pub sentiment: f64,
}

impl WeightAdjustment {
    pub fn is_noop(&self) -> bool {
        self.as_array().iter().all(|d| *d == 0.0 || !d.is_finite())
    }

    fn as_array(&self) -> [f64; 4] {
        [self.technical, self.news, self.onchain, self.sentiment]
    }
}

impl SignalWeights {
    /// Build weights from raw values, normalizing them into the band.
    ///
    /// Non-finite or negative values are a configuration error.
    pub fn new(
        technical: f64,
        news: f64,
        onchain: f64,
        sentiment: f64,
    ) -> Result<Self, DomainError> {
        let raw = [technical, news, onchain, sentiment];
        if let Some(bad) = raw.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(DomainError::InvalidWeights(format!(
                "weights must be finite and non-negative, got {}",
                bad
            )));
        }
        if raw.iter().sum::<f64>() <= 0.0 {
            return Err(DomainError::InvalidWeights(
                "at least one weight must be positive".to_string(),
            ));
        }
        Ok(Self::from_array(normalize_bounded(raw)))
    }

    /// Equal weights (0.25 each)
    pub fn equal() -> Self {
        Self::from_array([0.25; 4])
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.technical, self.news, self.onchain, self.sentiment]
    }

    fn from_array(w: [f64; 4]) -> Self {
        Self {
            technical: w[0],
            news: w[1],
            onchain: w[2],
            sentiment: w[3],
        }
    }

    pub fn sum(&self) -> f64 {
        self.as_array().iter().sum()
    }

    /// Apply additive deltas, then clamp and renormalize.
    ///
    /// Non-finite deltas are ignored.
    pub fn adjusted(&self, adjustment: &WeightAdjustment) -> Self {
        let current = self.as_array();
        let deltas = adjustment.as_array();
        let mut raw = [0.0; 4];
        for i in 0..4 {
            let delta = if deltas[i].is_finite() { deltas[i] } else { 0.0 };
            raw[i] = current[i] + delta;
        }
        Self::from_array(normalize_bounded(raw))
    }

    /// Whether both weight invariants hold (within `tolerance`)
    pub fn is_normalized(&self, tolerance: f64) -> bool {
        (self.sum() - 1.0).abs() <= tolerance
            && self
                .as_array()
                .iter()
                .all(|w| *w >= MIN_WEIGHT - tolerance && *w <= MAX_WEIGHT + tolerance)
    }
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self::equal()
    }
}

/// Clamp to the band and renormalize to a sum of 1.0.
pub fn normalize_bounded(raw: [f64; 4]) -> [f64; 4] {
    let clamped = raw.map(|w| {
        if w.is_finite() {
            w.clamp(MIN_WEIGHT, MAX_WEIGHT)
        } else {
            MIN_WEIGHT
        }
    });

    let total: f64 = clamped.iter().sum();
    let proportional = clamped.map(|w| w / total);
    let in_band = proportional
        .iter()
        .all(|w| *w >= MIN_WEIGHT - BAND_EPSILON && *w <= MAX_WEIGHT + BAND_EPSILON);

    let weights = if in_band {
        proportional.map(|w| w.clamp(MIN_WEIGHT, MAX_WEIGHT))
    } else {
        project_onto_band(clamped)
    };

    absorb_residual(weights)
}

/// Find `t` such that `sum(clamp(w + t))` equals 1.0.
///
/// The sum is monotone in `t` and ranges over `[4 * MIN, 4 * MAX]`, which
/// contains 1.0, so bisection always converges.
fn project_onto_band(w: [f64; 4]) -> [f64; 4] {
    let shifted = |t: f64| w.map(|x| (x + t).clamp(MIN_WEIGHT, MAX_WEIGHT));
    let sum_at = |t: f64| shifted(t).iter().sum::<f64>();

    let (mut lo, mut hi) = (-1.0_f64, 1.0_f64);
    for _ in 0..BISECTION_STEPS {
        let mid = (lo + hi) / 2.0;
        if sum_at(mid) < 1.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    shifted((lo + hi) / 2.0)
}

/// Push the floating-point residual into a weight that can take it.
fn absorb_residual(mut w: [f64; 4]) -> [f64; 4] {
    let residual = 1.0 - w.iter().sum::<f64>();
    if residual == 0.0 {
        return w;
    }
    if let Some(slot) = w
        .iter_mut()
        .find(|x| (MIN_WEIGHT..=MAX_WEIGHT).contains(&(**x + residual)))
    {
        *slot += residual;
    }
    w
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invariants(w: &SignalWeights) {
        assert!(
            (w.sum() - 1.0).abs() <= 1e-9,
            "sum was {} for {:?}",
            w.sum(),
            w
        );
        for x in w.as_array() {
            assert!(
                (MIN_WEIGHT - 1e-9..=MAX_WEIGHT + 1e-9).contains(&x),
                "{} out of band in {:?}",
                x,
                w
            );
        }
    }

    #[test]
    fn test_new_normalizes() {
        let w = SignalWeights::new(2.0, 1.0, 1.0, 0.0).unwrap();
        assert_invariants(&w);
        assert!(w.technical > w.news);
    }

    #[test]
    fn test_new_rejects_invalid() {
        assert!(SignalWeights::new(f64::NAN, 0.1, 0.1, 0.1).is_err());
        assert!(SignalWeights::new(-0.1, 0.5, 0.3, 0.3).is_err());
        assert!(SignalWeights::new(0.0, 0.0, 0.0, 0.0).is_err());
    }

    #[test]
    fn test_dominant_weight_is_capped() {
        // Proportional normalization of [0.8, 0.05, 0.05, 0.05] would leave
        // technical above the cap, so the projection path kicks in.
        let w = SignalWeights::equal().adjusted(&WeightAdjustment {
            technical: 5.0,
            news: -1.0,
            onchain: -1.0,
            sentiment: -1.0,
        });
        assert_invariants(&w);
        assert!((w.technical - 0.80).abs() < 1e-9);
    }

    #[test]
    fn test_adjustment_grid_preserves_invariants() {
        let deltas = [-1.0, -0.3, -0.05, 0.0, 0.02, 0.2, 0.9, 3.0];
        let start = [
            SignalWeights::equal(),
            SignalWeights::new(0.7, 0.1, 0.1, 0.1).unwrap(),
            SignalWeights::new(0.05, 0.05, 0.05, 0.85).unwrap(),
        ];
        for base in start {
            for a in deltas {
                for b in deltas {
                    for c in deltas {
                        let adj = WeightAdjustment {
                            technical: a,
                            news: b,
                            onchain: c,
                            sentiment: -a,
                        };
                        assert_invariants(&base.adjusted(&adj));
                    }
                }
            }
        }
    }

    #[test]
    fn test_non_finite_delta_ignored() {
        let base = SignalWeights::equal();
        let w = base.adjusted(&WeightAdjustment {
            technical: f64::INFINITY,
            ..Default::default()
        });
        assert_eq!(w, base);
    }

    #[test]
    fn test_is_noop() {
        assert!(WeightAdjustment::default().is_noop());
        assert!(
            !WeightAdjustment {
                news: 0.1,
                ..Default::default()
            }
            .is_noop()
        );
    }
}
