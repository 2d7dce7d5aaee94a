//! Indicator math over closing prices.
//!
//! All functions return `None` when there are not enough bars.

use crate::reasoning::signals::Candle;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    Rsi,
    Macd,
    Sma,
    Ema,
    Atr,
}

impl Indicator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Indicator::Rsi => "rsi",
            Indicator::Macd => "macd",
            Indicator::Sma => "sma",
            Indicator::Ema => "ema",
            Indicator::Atr => "atr",
        }
    }

    pub fn default_period(&self) -> usize {
        match self {
            Indicator::Rsi | Indicator::Atr => 14,
            Indicator::Macd => 26,
            Indicator::Sma | Indicator::Ema => 20,
        }
    }

    /// Latest value of this indicator. MACD yields the histogram.
    pub fn compute(&self, candles: &[Candle], period: Option<usize>) -> Option<f64> {
        let period = period.unwrap_or_else(|| self.default_period()).max(1);
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        match self {
            Indicator::Rsi => rsi(&closes, period),
            Indicator::Macd => macd_histogram(&closes),
            Indicator::Sma => sma(&closes, period),
            Indicator::Ema => ema(&closes, period).last().copied(),
            Indicator::Atr => atr(candles, period),
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Indicator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rsi" => Ok(Indicator::Rsi),
            "macd" => Ok(Indicator::Macd),
            "sma" | "ma" => Ok(Indicator::Sma),
            "ema" => Ok(Indicator::Ema),
            "atr" => Ok(Indicator::Atr),
            other => Err(format!("unsupported indicator: {}", other)),
        }
    }
}

pub fn sma(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period {
        return None;
    }
    let window = &closes[closes.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

/// EMA series seeded with the SMA of the first `period` values.
pub fn ema(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.len() < period {
        return Vec::new();
    }
    let k = 2.0 / (period as f64 + 1.0);
    let seed = closes[..period].iter().sum::<f64>() / period as f64;
    let mut out = Vec::with_capacity(closes.len() - period + 1);
    out.push(seed);
    for close in &closes[period..] {
        let prev = out[out.len() - 1];
        out.push(close * k + prev * (1.0 - k));
    }
    out
}

/// Wilder's RSI.
pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() <= period {
        return None;
    }
    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let (mut gain, mut loss) = deltas[..period].iter().fold((0.0, 0.0), |(g, l), d| {
        if *d >= 0.0 { (g + d, l) } else { (g, l - d) }
    });
    gain /= period as f64;
    loss /= period as f64;
    for d in &deltas[period..] {
        let (g, l) = if *d >= 0.0 { (*d, 0.0) } else { (0.0, -d) };
        gain = (gain * (period as f64 - 1.0) + g) / period as f64;
        loss = (loss * (period as f64 - 1.0) + l) / period as f64;
    }
    if loss == 0.0 {
        return Some(if gain == 0.0 { 50.0 } else { 100.0 });
    }
    Some(100.0 - 100.0 / (1.0 + gain / loss))
}

/// MACD(12, 26, 9) histogram.
pub fn macd_histogram(closes: &[f64]) -> Option<f64> {
    let fast = ema(closes, 12);
    let slow = ema(closes, 26);
    if slow.is_empty() {
        return None;
    }
    // fast starts 14 bars earlier than slow
    let offset = fast.len() - slow.len();
    let macd: Vec<f64> = slow
        .iter()
        .enumerate()
        .map(|(i, s)| fast[i + offset] - s)
        .collect();
    let signal = ema(&macd, 9);
    Some(macd.last()? - signal.last()?)
}

pub fn atr(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || candles.len() <= period {
        return None;
    }
    let ranges: Vec<f64> = candles
        .windows(2)
        .map(|w| {
            let prev_close = w[0].close;
            let c = &w[1];
            (c.high - c.low)
                .max((c.high - prev_close).abs())
                .max((c.low - prev_close).abs())
        })
        .collect();
    sma(&ranges, period)
}
