//! Position risk arithmetic behind the `estimate_risk` capability.

use serde::{Deserialize, Serialize};

/// Maintenance margin assumed for the liquidation estimate, in percent
pub const MAINTENANCE_MARGIN_PCT: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskEstimate {
    /// Margin committed, in account currency
    pub margin: f64,
    /// Position notional (margin × leverage)
    pub notional: f64,
    /// Loss if the stop is hit, in account currency
    pub loss_at_stop: f64,
    /// Loss at stop as a percentage of the balance
    pub loss_at_stop_pct: f64,
    /// Adverse move that liquidates the position, in percent
    pub liquidation_distance_pct: f64,
    /// The stop sits beyond the liquidation price
    pub stop_beyond_liquidation: bool,
}

impl RiskEstimate {
    pub fn compute(balance: f64, size_pct: f64, leverage: f64, stop_loss_pct: f64) -> Self {
        let balance = balance.max(0.0);
        let size_pct = size_pct.clamp(0.0, 100.0);
        let leverage = leverage.max(1.0);
        let stop_loss_pct = stop_loss_pct.max(0.0);

        let margin = balance * size_pct / 100.0;
        let notional = margin * leverage;
        let liquidation_distance_pct = (100.0 / leverage - MAINTENANCE_MARGIN_PCT).max(0.0);
        let stop_beyond_liquidation = stop_loss_pct >= liquidation_distance_pct;
        // a stop past liquidation loses the whole margin
        let loss_at_stop = if stop_beyond_liquidation {
            margin
        } else {
            notional * stop_loss_pct / 100.0
        };

        Self {
            margin,
            notional,
            loss_at_stop,
            loss_at_stop_pct: if balance > 0.0 { loss_at_stop / balance * 100.0 } else { 0.0 },
            liquidation_distance_pct,
            stop_beyond_liquidation,
        }
    }

    pub fn describe(&self) -> String {
        format!(
            "margin {:.2}, notional {:.2}, loss at stop {:.2} ({:.2}% of balance), liquidation {:.2}% away{}",
            self.margin,
            self.notional,
            self.loss_at_stop,
            self.loss_at_stop_pct,
            self.liquidation_distance_pct,
            if self.stop_beyond_liquidation { " - STOP BEYOND LIQUIDATION" } else { "" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_risk() {
        let risk = RiskEstimate::compute(10_000.0, 10.0, 5.0, 2.0);
        assert!((risk.margin - 1_000.0).abs() < 1e-9);
        assert!((risk.notional - 5_000.0).abs() < 1e-9);
        assert!((risk.loss_at_stop - 100.0).abs() < 1e-9);
        assert!((risk.loss_at_stop_pct - 1.0).abs() < 1e-9);
        assert!((risk.liquidation_distance_pct - 19.5).abs() < 1e-9);
        assert!(!risk.stop_beyond_liquidation);
    }

    #[test]
    fn test_stop_beyond_liquidation_caps_loss() {
        let risk = RiskEstimate::compute(1_000.0, 20.0, 50.0, 5.0);
        assert!(risk.stop_beyond_liquidation);
        assert!((risk.loss_at_stop - risk.margin).abs() < 1e-9);
        assert!(risk.describe().contains("STOP BEYOND LIQUIDATION"));
    }
}
