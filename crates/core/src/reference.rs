//! Reference data — static symbol → instrument metrics table.
//!
//! In production this table would be fed by market-data adapters. The
//! built-in snapshot is read-only and fixed for the process lifetime, which
//! keeps every synthesized section reproducible.

use serde::{Deserialize, Serialize};

/// Metrics for a single listed instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instrument {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change_pct: f64,
    /// Market capitalization in billions of USD.
    pub market_cap: f64,
    pub pe: f64,
    pub volume: u64,
    pub sector: String,
    pub beta: f64,
    pub dividend_yield: f64,
    pub high_52w: f64,
    pub low_52w: f64,
}

impl Instrument {
    /// Distance below the 52-week high, as a percentage.
    pub fn drawdown_pct(&self) -> f64 {
        if self.high_52w <= 0.0 {
            return 0.0;
        }
        (self.high_52w - self.price) / self.high_52w * 100.0
    }

    /// Position of the price within its 52-week range, 0.0–1.0.
    pub fn range_position(&self) -> f64 {
        let span = self.high_52w - self.low_52w;
        if span <= 0.0 {
            return 0.5;
        }
        ((self.price - self.low_52w) / span).clamp(0.0, 1.0)
    }
}

/// Read-only lookup of instrument metrics by symbol.
pub trait ReferenceData: Send + Sync {
    /// Case-insensitive lookup.
    fn lookup(&self, symbol: &str) -> Option<&Instrument>;

    /// All known symbols, in table order.
    fn symbols(&self) -> Vec<&str>;

    /// Other symbols in the same sector, in table order.
    fn peers(&self, symbol: &str) -> Vec<&str> {
        let Some(inst) = self.lookup(symbol) else {
            return Vec::new();
        };
        let sector = inst.sector.clone();
        self.symbols()
            .into_iter()
            .filter(|s| !s.eq_ignore_ascii_case(symbol))
            .filter(|s| self.lookup(s).is_some_and(|i| i.sector == sector))
            .collect()
    }
}

/// An in-memory table of instruments.
pub struct StaticReferenceData {
    instruments: Vec<Instrument>,
}

impl StaticReferenceData {
    pub fn new(instruments: Vec<Instrument>) -> Self {
        Self { instruments }
    }

    /// The bundled snapshot.
    pub fn builtin() -> Self {
        #[rustfmt::skip]
        let rows: [(&str, &str, f64, f64, f64, f64, u64, &str, f64, f64, f64, f64); 16] = [
            ("AAPL", "Apple Inc.", 189.84, 1.25, 2950.0, 29.6, 52_340_000, "Technology", 1.24, 0.51, 199.62, 164.08),
            ("MSFT", "Microsoft Corporation", 415.26, 0.82, 3085.0, 36.2, 20_110_000, "Technology", 0.89, 0.72, 430.82, 309.45),
            ("GOOGL", "Alphabet Inc.", 141.80, -0.45, 1780.0, 24.1, 25_600_000, "Technology", 1.05, 0.0, 153.78, 115.83),
            ("NVDA", "NVIDIA Corporation", 875.28, 3.12, 2190.0, 72.4, 41_200_000, "Technology", 1.68, 0.02, 974.00, 403.11),
            ("META", "Meta Platforms Inc.", 492.96, -1.10, 1250.0, 33.5, 14_800_000, "Technology", 1.21, 0.41, 531.49, 274.38),
            ("AMZN", "Amazon.com Inc.", 178.22, 0.64, 1850.0, 61.3, 38_900_000, "Consumer", 1.15, 0.0, 189.77, 118.35),
            ("TSLA", "Tesla Inc.", 175.79, -2.35, 560.0, 40.7, 98_400_000, "Consumer", 2.31, 0.0, 299.29, 152.37),
            ("JPM", "JPMorgan Chase & Co.", 198.48, 0.37, 570.0, 12.1, 9_100_000, "Financials", 1.09, 2.32, 200.94, 135.19),
            ("BAC", "Bank of America Corp.", 37.12, -0.21, 292.0, 11.4, 35_700_000, "Financials", 1.36, 2.59, 38.35, 24.96),
            ("GS", "Goldman Sachs Group Inc.", 452.10, 0.55, 148.0, 17.8, 2_300_000, "Financials", 1.38, 2.43, 467.56, 289.36),
            ("XOM", "Exxon Mobil Corporation", 118.65, 1.42, 471.0, 13.9, 17_400_000, "Energy", 0.88, 3.21, 123.75, 95.77),
            ("CVX", "Chevron Corporation", 158.04, 0.96, 293.0, 14.6, 8_200_000, "Energy", 1.02, 4.12, 171.70, 139.62),
            ("JNJ", "Johnson & Johnson", 152.33, -0.33, 367.0, 10.2, 7_600_000, "Healthcare", 0.54, 3.12, 175.97, 143.13),
            ("PFE", "Pfizer Inc.", 27.41, -0.88, 155.0, 74.3, 40_100_000, "Healthcare", 0.63, 6.13, 36.49, 25.20),
            ("SPY", "SPDR S&P 500 ETF Trust", 520.84, 0.48, 478.0, 24.8, 72_000_000, "Index", 1.00, 1.31, 524.61, 409.21),
            ("QQQ", "Invesco QQQ Trust", 444.12, 0.71, 262.0, 32.5, 43_000_000, "Index", 1.12, 0.55, 449.34, 342.35),
        ];

        let instruments = rows
            .into_iter()
            .map(
                |(symbol, name, price, change_pct, market_cap, pe, volume, sector, beta, dividend_yield, high_52w, low_52w)| {
                    Instrument {
                        symbol: symbol.into(),
                        name: name.into(),
                        price,
                        change_pct,
                        market_cap,
                        pe,
                        volume,
                        sector: sector.into(),
                        beta,
                        dividend_yield,
                        high_52w,
                        low_52w,
                    }
                },
            )
            .collect();

        Self::new(instruments)
    }
}

impl Default for StaticReferenceData {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ReferenceData for StaticReferenceData {
    fn lookup(&self, symbol: &str) -> Option<&Instrument> {
        self.instruments
            .iter()
            .find(|i| i.symbol.eq_ignore_ascii_case(symbol))
    }

    fn symbols(&self) -> Vec<&str> {
        self.instruments.iter().map(|i| i.symbol.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let data = StaticReferenceData::builtin();
        let inst = data.lookup("aapl").unwrap();
        assert_eq!(inst.name, "Apple Inc.");
        assert!(data.lookup("ZZZZ").is_none());
    }

    #[test]
    fn symbols_keep_table_order() {
        let data = StaticReferenceData::builtin();
        let symbols = data.symbols();
        assert_eq!(symbols[0], "AAPL");
        assert_eq!(symbols[1], "MSFT");
        assert_eq!(symbols.len(), 16);
    }

    #[test]
    fn peers_share_sector() {
        let data = StaticReferenceData::builtin();
        assert_eq!(data.peers("XOM"), vec!["CVX"]);
        assert!(data.peers("AAPL").contains(&"MSFT"));
        assert!(!data.peers("AAPL").contains(&"AAPL"));
        assert!(data.peers("NOPE").is_empty());
    }

    #[test]
    fn drawdown_and_range() {
        let data = StaticReferenceData::builtin();
        let nvda = data.lookup("NVDA").unwrap();
        assert!(nvda.drawdown_pct() > 0.0);
        let pos = nvda.range_position();
        assert!((0.0..=1.0).contains(&pos));
    }
}
