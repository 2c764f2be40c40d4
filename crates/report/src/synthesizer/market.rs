//! Deterministic analytics derived from a reference snapshot.
//!
//! Every value here is a pure function of an [`Instrument`] (and sometimes a
//! timeframe label), so re-synthesizing a section always yields identical
//! figures.

use folio_core::Instrument;

const TRADING_DAYS: f64 = 252.0;

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ── Technicals ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Bullish,
    Bearish,
    Neutral,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bullish => "Bullish",
            Self::Bearish => "Bearish",
            Self::Neutral => "Neutral",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Technicals {
    pub rsi: f64,
    pub sma_50: f64,
    pub sma_200: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub bollinger_upper: f64,
    pub bollinger_lower: f64,
    pub trend: Trend,
}

impl Technicals {
    pub fn momentum(&self) -> &'static str {
        if self.rsi >= 70.0 {
            "overbought"
        } else if self.rsi <= 30.0 {
            "oversold"
        } else {
            "neutral"
        }
    }
}

pub fn technicals(inst: &Instrument) -> Technicals {
    let pos = inst.range_position();
    let span = inst.high_52w - inst.low_52w;

    let rsi = (50.0 + inst.change_pct * 6.0 + (pos - 0.5) * 30.0).clamp(5.0, 95.0);
    let sma_200 = inst.low_52w + span * 0.45;
    let sma_50 = inst.low_52w + span * (0.35 + pos * 0.5);
    let macd = if sma_200 > 0.0 {
        (sma_50 - sma_200) / sma_200 * 100.0
    } else {
        0.0
    };
    let band = inst.price * daily_volatility(inst) / 100.0 * 2.0 * 20f64.sqrt();

    let trend = if inst.price > sma_50 && sma_50 > sma_200 {
        Trend::Bullish
    } else if inst.price < sma_50 && sma_50 < sma_200 {
        Trend::Bearish
    } else {
        Trend::Neutral
    };

    Technicals {
        rsi: round2(rsi),
        sma_50: round2(sma_50),
        sma_200: round2(sma_200),
        macd: round2(macd),
        macd_signal: round2(macd * 0.8),
        bollinger_upper: round2(sma_50 + band),
        bollinger_lower: round2((sma_50 - band).max(0.0)),
        trend,
    }
}

// ── Volatility & risk ─────────────────────────────────────────────────────

/// Annualized volatility, percent.
pub fn annual_volatility(inst: &Instrument) -> f64 {
    round2(inst.beta * 18.0 + inst.change_pct.abs() * 2.0)
}

/// Daily volatility, percent.
pub fn daily_volatility(inst: &Instrument) -> f64 {
    annual_volatility(inst) / TRADING_DAYS.sqrt()
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskProfile {
    pub beta: f64,
    pub volatility: f64,
    pub max_drawdown: f64,
    /// One-day 95% value at risk per share, in dollars.
    pub var_95: f64,
    pub rating: &'static str,
}

pub fn risk_profile(inst: &Instrument) -> RiskProfile {
    let volatility = annual_volatility(inst);
    let rating = if volatility >= 35.0 {
        "High"
    } else if volatility >= 22.0 {
        "Elevated"
    } else {
        "Moderate"
    };
    RiskProfile {
        beta: inst.beta,
        volatility,
        max_drawdown: round2(inst.drawdown_pct()),
        var_95: round2(1.65 * daily_volatility(inst) / 100.0 * inst.price),
        rating,
    }
}

// ── Forecasts ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub bear: f64,
    pub base: f64,
    pub bull: f64,
    pub confidence: &'static str,
}

impl Forecast {
    pub fn upside_pct(&self, price: f64) -> f64 {
        if price <= 0.0 {
            return 0.0;
        }
        round2((self.base - price) / price * 100.0)
    }
}

/// Twelve-month scenario targets.
pub fn forecast(inst: &Instrument) -> Forecast {
    let earnings_yield = if inst.pe > 0.0 { 100.0 / inst.pe } else { 0.0 };
    let growth = (earnings_yield * 0.6 + inst.change_pct * 0.5 + inst.dividend_yield * 0.5)
        .clamp(-15.0, 30.0)
        / 100.0;
    let vol = annual_volatility(inst) / 100.0;

    let base = inst.price * (1.0 + growth);
    let confidence = if inst.beta < 0.9 {
        "High"
    } else if inst.beta < 1.4 {
        "Moderate"
    } else {
        "Low"
    };

    Forecast {
        bear: round2(base * (1.0 - vol * 0.6)),
        base: round2(base),
        bull: round2(base * (1.0 + vol * 0.5)),
        confidence,
    }
}

// ── Price history ─────────────────────────────────────────────────────────

/// Horizon in years for a canonical timeframe label.
pub fn timeframe_years(label: &str) -> f64 {
    match label {
        "1 Week" => 1.0 / 52.0,
        "1 Month" => 1.0 / 12.0,
        "3 Month" => 0.25,
        "6 Month" => 0.5,
        "YTD" => 0.75,
        "3 Year" => 3.0,
        "5 Year" => 5.0,
        "10 Year" => 10.0,
        _ => 1.0,
    }
}

fn point_count(label: &str) -> usize {
    match label {
        "1 Week" => 5,
        "1 Month" => 8,
        "10 Year" | "5 Year" => 10,
        _ => 12,
    }
}

fn symbol_seed(symbol: &str) -> f64 {
    let hash = symbol
        .bytes()
        .fold(7u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
    (hash % 628) as f64 / 100.0
}

/// A synthetic closing-price series over `timeframe`, ending at the current price.
pub fn price_series(inst: &Instrument, timeframe: &str) -> Vec<f64> {
    let years = timeframe_years(timeframe);
    let points = point_count(timeframe);

    let growth = if inst.low_52w > 0.0 {
        ((inst.price - inst.low_52w) / inst.low_52w).clamp(-0.5, 1.0) * 0.6 + 0.04
    } else {
        0.04
    };
    let start = inst.price / (1.0 + growth).powf(years);
    let amplitude = inst.price * annual_volatility(inst) / 100.0 * 0.05 * years.sqrt().min(2.0);
    let seed = symbol_seed(&inst.symbol);
    let last = (points - 1) as f64;

    (0..points)
        .map(|i| {
            let t = i as f64 / last;
            let wave = if i + 1 == points {
                0.0
            } else {
                amplitude * (i as f64 * 1.3 + seed).sin()
            };
            round2((start + (inst.price - start) * t + wave).max(0.01))
        })
        .collect()
}

/// Return from first to last point, percent.
pub fn period_return(series: &[f64]) -> f64 {
    match (series.first(), series.last()) {
        (Some(&first), Some(&last)) if first > 0.0 => round2((last - first) / first * 100.0),
        _ => 0.0,
    }
}

/// Rebase a series so its first point is 100.
pub fn rebase(series: &[f64]) -> Vec<f64> {
    match series.first() {
        Some(&first) if first > 0.0 => series.iter().map(|v| round2(v / first * 100.0)).collect(),
        _ => series.to_vec(),
    }
}
