//! Prompt classification.
//!
//! Rule tables, evaluated top to bottom with the first match winning:
//!
//! ```text
//! no existing report  → report type   comparison > portfolio > sector > market > single
//! existing report     → enhancement   technical > comparison > timeframe > predictions
//!                                     > risks > layout > generic
//! ```
//!
//! Matching is case-insensitive. Short keywords (`vs`, `rsi`, `ytd`) match
//! whole words only; longer stems match anywhere in the prompt.

use std::collections::HashSet;

use folio_core::{AssetList, EnhancementKind, Intent, ReferenceData, ReportType};
use serde::Serialize;

/// One keyword rule.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Pattern {
    /// Matches a whole token.
    Word(&'static str),
    /// Matches anywhere in the lowercased prompt.
    Stem(&'static str),
}

use Pattern::{Stem, Word};

/// A lowercased prompt and its alphanumeric tokens.
pub(crate) struct Normalized {
    text: String,
    tokens: Vec<String>,
}

impl Normalized {
    pub(crate) fn new(prompt: &str) -> Self {
        let text = prompt
            .to_lowercase()
            .replace(['-', '_'], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let tokens = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();
        Self { text, tokens }
    }

    fn matches(&self, pattern: &Pattern) -> bool {
        match pattern {
            Word(word) => self.tokens.iter().any(|t| t == word),
            Stem(stem) => self.text.contains(stem),
        }
    }

    fn matches_any(&self, patterns: &[Pattern]) -> bool {
        patterns.iter().any(|p| self.matches(p))
    }
}

// ── Rule tables ───────────────────────────────────────────────────────────

const REPORT_RULES: &[(ReportType, &[Pattern])] = &[
    (
        ReportType::Comparison,
        &[Stem("compar"), Word("vs"), Stem("versus"), Word("against")],
    ),
    (
        ReportType::Portfolio,
        &[Stem("portfolio"), Stem("holding"), Stem("allocation"), Stem("diversif")],
    ),
    (
        ReportType::Sector,
        &[Stem("sector"), Stem("industry"), Stem("industries")],
    ),
    (
        ReportType::Market,
        &[Stem("market"), Stem("overview"), Stem("economy"), Stem("indices"), Word("index")],
    ),
];

const ENHANCEMENT_RULES: &[(EnhancementKind, &[Pattern])] = &[
    (
        EnhancementKind::AddTechnical,
        &[
            Stem("technical"),
            Stem("indicator"),
            Word("rsi"),
            Word("macd"),
            Stem("moving average"),
            Stem("bollinger"),
            Word("sma"),
            Word("ema"),
        ],
    ),
    (
        EnhancementKind::AddComparison,
        &[Stem("compar"), Word("vs"), Stem("versus"), Word("against")],
    ),
    (
        EnhancementKind::AddTimeframe,
        &[Stem("histor"), Stem("year"), Stem("trend"), Stem("timeframe"), Word("ytd")],
    ),
    (
        EnhancementKind::AddPredictions,
        &[Stem("predict"), Stem("forecast"), Stem("future"), Stem("outlook"), Stem("projection")],
    ),
    (
        EnhancementKind::AddRisks,
        &[Stem("risk"), Stem("volatil"), Stem("drawdown")],
    ),
    (
        EnhancementKind::ModifyLayout,
        &[
            Stem("layout"),
            Stem("dashboard"),
            Word("view"),
            Stem("theme"),
            Word("hide"),
            Word("unhide"),
        ],
    ),
];

/// Canonical timeframe labels, first match wins.
const TIMEFRAMES: &[(&[Pattern], &str)] = &[
    (&[Stem("10 year"), Word("10y"), Stem("ten year"), Stem("decade")], "10 Year"),
    (&[Stem("5 year"), Word("5y"), Stem("five year")], "5 Year"),
    (&[Stem("3 year"), Word("3y"), Stem("three year")], "3 Year"),
    (&[Word("ytd"), Stem("year to date")], "YTD"),
    (&[Stem("12 month"), Stem("twelve month")], "1 Year"),
    (&[Stem("6 month"), Word("6m"), Stem("six month"), Stem("half year")], "6 Month"),
    (&[Stem("3 month"), Word("3m"), Stem("three month"), Stem("quarter")], "3 Month"),
    (&[Stem("month")], "1 Month"),
    (&[Stem("week")], "1 Week"),
    (&[Stem("year"), Stem("annual")], "1 Year"),
];

pub const DEFAULT_TIMEFRAME: &str = "1 Year";

/// Thematic baskets used when a prompt names no symbol.
const BASKETS: &[(&[Pattern], &[&str])] = &[
    (
        &[Stem("tech"), Stem("software"), Stem("semiconductor")],
        &["AAPL", "MSFT", "GOOGL", "NVDA"],
    ),
    (&[Stem("bank"), Stem("financial")], &["JPM", "BAC", "GS"]),
    (&[Stem("energy"), Word("oil")], &["XOM", "CVX"]),
    (&[Stem("health"), Stem("pharma")], &["JNJ", "PFE"]),
    (&[Word("ev"), Word("evs"), Stem("electric vehicle")], &["TSLA"]),
    (
        &[Stem("market"), Stem("index"), Stem("indices"), Stem("s&p")],
        &["SPY", "QQQ"],
    ),
];

// ── Pure classification ───────────────────────────────────────────────────

/// Classify a prompt. Without an existing report the result is always a
/// report type; with one it is always an enhancement kind.
pub fn classify(prompt: &str, has_existing_context: bool) -> Intent {
    let normalized = Normalized::new(prompt);
    if has_existing_context {
        let kind = ENHANCEMENT_RULES
            .iter()
            .find(|(_, patterns)| normalized.matches_any(patterns))
            .map(|(kind, _)| *kind)
            .unwrap_or(EnhancementKind::Generic);
        Intent::Enhance(kind)
    } else {
        let report_type = REPORT_RULES
            .iter()
            .find(|(_, patterns)| normalized.matches_any(patterns))
            .map(|(report_type, _)| *report_type)
            .unwrap_or(ReportType::Single);
        Intent::Report(report_type)
    }
}

/// Canonical timeframe label named by a prompt, or `"1 Year"`.
pub fn extract_timeframe(prompt: &str) -> &'static str {
    let normalized = Normalized::new(prompt);
    TIMEFRAMES
        .iter()
        .find(|(patterns, _)| normalized.matches_any(patterns))
        .map(|(_, label)| *label)
        .unwrap_or(DEFAULT_TIMEFRAME)
}

// ── Classifier with asset extraction ──────────────────────────────────────

/// Everything the engine derives from a prompt before synthesis.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub intent: Intent,
    pub assets: AssetList,
    pub timeframe: String,
}

/// Classifies prompts and resolves the symbols they name against reference data.
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    symbols: Vec<String>,
    known: HashSet<String>,
    default_symbol: String,
}

impl IntentClassifier {
    pub fn new(reference: &dyn ReferenceData, default_symbol: impl Into<String>) -> Self {
        let symbols: Vec<String> = reference
            .symbols()
            .into_iter()
            .map(|s| s.to_uppercase())
            .collect();
        let known = symbols.iter().cloned().collect();
        Self {
            symbols,
            known,
            default_symbol: default_symbol.into().to_uppercase(),
        }
    }

    pub fn classify(&self, prompt: &str, has_existing_context: bool) -> Intent {
        classify(prompt, has_existing_context)
    }

    /// Symbols named by the prompt, in prompt order; falls back to the first
    /// matching thematic basket. Empty when nothing matches.
    pub fn find_assets(&self, prompt: &str) -> AssetList {
        let mut found = AssetList::new();
        for token in prompt.split(|c: char| !c.is_ascii_alphanumeric()) {
            let upper = token.to_ascii_uppercase();
            if self.known.contains(&upper) {
                found.insert(upper);
            }
        }
        if !found.is_empty() {
            return found;
        }

        let normalized = Normalized::new(prompt);
        BASKETS
            .iter()
            .find(|(patterns, _)| normalized.matches_any(patterns))
            .map(|(_, basket)| {
                basket
                    .iter()
                    .filter(|s| self.known.contains(**s))
                    .collect::<AssetList>()
            })
            .unwrap_or_default()
    }

    /// Like [`find_assets`](Self::find_assets), but never empty: falls back
    /// to the configured default symbol.
    pub fn extract_assets(&self, prompt: &str) -> AssetList {
        let found = self.find_assets(prompt);
        if found.is_empty() {
            std::iter::once(self.default_symbol.as_str()).collect()
        } else {
            found
        }
    }

    pub fn analyze(&self, prompt: &str, has_existing_context: bool) -> Classification {
        let intent = self.classify(prompt, has_existing_context);
        let assets = match intent {
            Intent::Report(_) => self.extract_assets(prompt),
            Intent::Enhance(EnhancementKind::AddComparison) => self.find_assets(prompt),
            Intent::Enhance(_) => AssetList::new(),
        };
        Classification {
            intent,
            assets,
            timeframe: extract_timeframe(prompt).to_string(),
        }
    }

    /// Known symbols in reference table order.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn default_symbol(&self) -> &str {
        &self.default_symbol
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::StaticReferenceData;

    fn classifier() -> IntentClassifier {
        IntentClassifier::new(&StaticReferenceData::builtin(), "AAPL")
    }

    #[test]
    fn first_prompt_is_always_a_report() {
        assert_eq!(classify("Analyze AAPL", false), Intent::Report(ReportType::Single));
        assert_eq!(
            classify("Compare AAPL vs MSFT", false),
            Intent::Report(ReportType::Comparison)
        );
        assert_eq!(
            classify("Review my portfolio holdings", false),
            Intent::Report(ReportType::Portfolio)
        );
        assert_eq!(
            classify("Energy sector outlook", false),
            Intent::Report(ReportType::Sector)
        );
        assert_eq!(
            classify("Give me a market overview", false),
            Intent::Report(ReportType::Market)
        );
        assert_eq!(classify("", false), Intent::Report(ReportType::Single));
    }

    #[test]
    fn comparison_beats_later_report_rules() {
        assert_eq!(
            classify("compare sector performance", false),
            Intent::Report(ReportType::Comparison)
        );
    }

    #[test]
    fn follow_ups_are_always_enhancements() {
        let cases = [
            ("Add technical indicators", EnhancementKind::AddTechnical),
            ("show RSI please", EnhancementKind::AddTechnical),
            ("Compare with MSFT", EnhancementKind::AddComparison),
            ("TSLA vs. the rest", EnhancementKind::AddComparison),
            ("show me 5 year trends", EnhancementKind::AddTimeframe),
            ("what about YTD", EnhancementKind::AddTimeframe),
            ("forecast next quarter", EnhancementKind::AddPredictions),
            ("how volatile is it", EnhancementKind::AddRisks),
            ("switch to dashboard layout", EnhancementKind::ModifyLayout),
            ("thanks!", EnhancementKind::Generic),
        ];
        for (prompt, kind) in cases {
            assert_eq!(classify(prompt, true), Intent::Enhance(kind), "{prompt}");
        }
    }

    #[test]
    fn rule_order_is_first_match() {
        // technical precedes risk
        assert_eq!(
            classify("technical risk view", true),
            Intent::Enhance(EnhancementKind::AddTechnical)
        );
        // timeframe precedes predictions
        assert_eq!(
            classify("10 year forecast", true),
            Intent::Enhance(EnhancementKind::AddTimeframe)
        );
    }

    #[test]
    fn short_keywords_need_whole_words() {
        // "vs" inside "canvas", "rsi" inside "versify"
        assert_eq!(classify("draw on the canvas", true), Intent::Enhance(EnhancementKind::Generic));
        assert_eq!(classify("canvas", false), Intent::Report(ReportType::Single));
    }

    #[test]
    fn timeframes() {
        assert_eq!(extract_timeframe("show me 5 year trends"), "5 Year");
        assert_eq!(extract_timeframe("5-year view"), "5 Year");
        assert_eq!(extract_timeframe("last decade"), "10 Year");
        assert_eq!(extract_timeframe("YTD please"), "YTD");
        assert_eq!(extract_timeframe("past 12 months"), "1 Year");
        assert_eq!(extract_timeframe("6 month chart"), "6 Month");
        assert_eq!(extract_timeframe("last quarter"), "3 Month");
        assert_eq!(extract_timeframe("this month"), "1 Month");
        assert_eq!(extract_timeframe("past week"), "1 Week");
        assert_eq!(extract_timeframe("nothing here"), DEFAULT_TIMEFRAME);
    }

    #[test]
    fn assets_are_whole_tokens_in_prompt_order() {
        let c = classifier();
        assert_eq!(c.find_assets("Compare msft and AAPL").join(","), "MSFT,AAPL");
        // BAC must not match inside "feedback"
        assert!(c.find_assets("thanks for the feedback").is_empty());
    }

    #[test]
    fn baskets_fill_when_no_symbol() {
        let c = classifier();
        assert_eq!(c.find_assets("top tech names").join(","), "AAPL,MSFT,GOOGL,NVDA");
        assert_eq!(c.find_assets("oil majors").join(","), "XOM,CVX");
    }

    #[test]
    fn extract_falls_back_to_default() {
        let c = classifier();
        assert_eq!(c.extract_assets("Analyze something").join(","), "AAPL");
        let nvda = IntentClassifier::new(&StaticReferenceData::builtin(), "nvda");
        assert_eq!(nvda.extract_assets("hello").join(","), "NVDA");
    }

    #[test]
    fn extraction_is_idempotent_on_joined_output() {
        let c = classifier();
        let first = c.extract_assets("Compare AAPL vs MSFT and GOOGL");
        let second = c.extract_assets(&first.join(", "));
        assert_eq!(first, second);
    }

    #[test]
    fn analyze_bundles_everything() {
        let c = classifier();
        let a = c.analyze("Compare with MSFT over 3 years", true);
        assert_eq!(a.intent, Intent::Enhance(EnhancementKind::AddComparison));
        assert_eq!(a.assets.join(","), "MSFT");
        assert_eq!(a.timeframe, "3 Year");
    }
}
