//! Enhancement generators. Each one extends the existing section list and
//! returns the patch variant for its kind.

use folio_core::{AssetList, Instrument, ReportType, SectionKind, StatePatch};

use super::initial::comparison_matrix;
use super::{Draft, base_slug, html, market};

const TECHNICAL_METRICS: &[&str] = &["rsi", "macd", "sma_50", "sma_200"];
const RISK_METRICS: &[&str] = &["beta", "volatility", "max_drawdown"];

/// Layout keywords, first match wins.
const LAYOUTS: &[(&[&str], &str)] = &[
    (&["dashboard"], "dashboard"),
    (&["grid", "two column", "side by side", "tiles"], "grid"),
    (&["compact", "condensed", "dense"], "compact"),
    (&["standard", "default", "single column", "list"], "standard"),
];

const HIDE_WORDS: &[&str] = &["hide", "remove", "drop", "collapse"];
const SHOW_WORDS: &[&str] = &["show", "unhide", "restore", "bring"];

fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty())
}

fn has_any_word(lower: &str, candidates: &[&str]) -> bool {
    words(lower).any(|w| candidates.contains(&w))
}

fn with_metrics(existing: &[String], extra: &[&str]) -> Vec<String> {
    let mut metrics = existing.to_vec();
    for m in extra {
        if !metrics.iter().any(|e| e == m) {
            metrics.push((*m).to_string());
        }
    }
    metrics
}

/// Whether a prompt names a section by its leading slug segment or title word.
fn mentions_section(lower: &str, id: &str, title: &str) -> bool {
    let slug_word = base_slug(id).split('-').next().unwrap_or_default();
    let title_word = title
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_lowercase();
    [slug_word, title_word.as_str()]
        .into_iter()
        .filter(|w| w.len() >= 3)
        .any(|w| lower.contains(w))
}

impl Draft<'_> {
    fn current_assets(&self) -> AssetList {
        self.state.assets.clone()
    }

    pub(super) fn technical(&mut self) -> StatePatch {
        let assets = self.current_assets();
        let instruments = self.instruments(&assets);
        let metrics = with_metrics(&self.state.metrics, TECHNICAL_METRICS);

        let mut rows = Vec::new();
        let mut notes = String::new();
        for inst in &instruments {
            let t = market::technicals(inst);
            self.compute(&inst.symbol, "rsi", t.rsi);
            self.compute(&inst.symbol, "macd", t.macd);
            self.compute(&inst.symbol, "sma_50", t.sma_50);
            self.compute(&inst.symbol, "sma_200", t.sma_200);

            rows.push(vec![
                inst.symbol.clone(),
                html::number(t.rsi),
                html::money(t.sma_50),
                html::money(t.sma_200),
                html::number(t.macd),
                html::number(t.macd_signal),
                format!(
                    "{} to {}",
                    html::money(t.bollinger_lower),
                    html::money(t.bollinger_upper)
                ),
                t.trend.as_str().to_string(),
            ]);

            let tone = match t.trend {
                market::Trend::Bullish => "positive",
                market::Trend::Bearish => "negative",
                market::Trend::Neutral => "neutral",
            };
            let relation = if inst.price >= t.sma_50 { "above" } else { "below" };
            notes.push_str(&html::callout(
                tone,
                &format!(
                    "{}: RSI {:.1} reads {}; price is {relation} the 50-day average with a {} structure.",
                    inst.symbol,
                    t.rsi,
                    t.momentum(),
                    t.trend.as_str().to_lowercase()
                ),
            ));
        }

        let mut body = html::table(
            &["Symbol", "RSI (14)", "SMA 50", "SMA 200", "MACD", "Signal", "Bollinger band", "Trend"],
            &rows,
        );
        body.push_str(&notes);

        let (_, added) = self.upsert_section("technical-analysis", SectionKind::Table, body);
        self.changes.push(format!(
            "{} technical indicators (RSI, MACD, moving averages) for {}",
            if added { "Added" } else { "Refreshed" },
            assets.join(", ")
        ));

        StatePatch::Technical {
            metrics,
            sections: self.plan.sections(),
        }
    }

    pub(super) fn comparison(&mut self, requested: &AssetList) -> StatePatch {
        let existing = self.current_assets();
        let mut requested = requested.clone();
        if requested.is_empty() {
            let reference = self.reference;
            if let Some(first) = existing.first() {
                for peer in reference
                    .peers(first)
                    .into_iter()
                    .filter(|p| !existing.contains(p))
                    .take(2)
                {
                    requested.insert(peer);
                }
            }
        }

        let union = existing.union(&requested);
        let added: Vec<&str> = requested.iter().filter(|s| !existing.contains(s)).collect();
        let instruments = self.instruments(&union);
        let metrics = self.state.metrics.clone();
        self.record_quotes(&instruments, &metrics);

        let mut body = comparison_matrix(&instruments, &metrics);
        if instruments.len() > 1 {
            body.push_str(&comparison_insights(&instruments));
        }
        self.upsert_section("comparison-analysis", SectionKind::Table, body);

        if added.is_empty() {
            self.changes
                .push(format!("Refreshed comparison of {}", union.join(", ")));
        } else {
            self.changes
                .push(format!("Added {} to the comparison", added.join(", ")));
        }

        let report_type = if union.len() > 1 {
            ReportType::Comparison
        } else {
            self.state.report_type.unwrap_or(ReportType::Single)
        };

        StatePatch::Comparison {
            assets: union,
            report_type,
            sections: self.plan.sections(),
        }
    }

    pub(super) fn timeframe(&mut self, timeframe: &str) -> StatePatch {
        let assets = self.current_assets();
        let instruments = self.instruments(&assets);

        let mut rows = Vec::new();
        let mut series = std::collections::BTreeMap::new();
        for inst in &instruments {
            let points = self.record_series(inst, timeframe);
            let high = points.iter().copied().fold(f64::MIN, f64::max);
            let low = points.iter().copied().fold(f64::MAX, f64::min);
            let period = market::period_return(&points);
            self.compute(&inst.symbol, &format!("return_{}", timeframe.replace(' ', "_")), period);
            rows.push(vec![
                inst.symbol.clone(),
                html::money(points.first().copied().unwrap_or_default()),
                html::money(inst.price),
                html::pct(period),
                html::money(high),
                html::money(low),
            ]);
            series.insert(inst.symbol.clone(), points);
        }

        let mut body = html::chart("line", &format!("Price history, {timeframe}"), &series);
        body.push_str(&html::table(
            &["Symbol", "Start", "Latest", "Period return", "Period high", "Period low"],
            &rows,
        ));
        self.upsert_section("historical-performance", SectionKind::Chart, body);

        if self.plan.is_visible("price-performance") {
            if let Some(chart) = self.price_chart(&instruments, timeframe) {
                self.plan.replace("price-performance", chart);
            }
        }

        self.changes.push(format!("Set timeframe to {timeframe}"));
        self.changes
            .push(format!("Charted historical performance over {timeframe}"));

        StatePatch::Timeframe {
            timeframe: timeframe.to_string(),
            sections: self.plan.sections(),
        }
    }

    pub(super) fn predictions(&mut self) -> StatePatch {
        let assets = self.current_assets();
        let instruments = self.instruments(&assets);

        let mut rows = Vec::new();
        for inst in &instruments {
            let f = market::forecast(inst);
            self.compute(&inst.symbol, "target_bear", f.bear);
            self.compute(&inst.symbol, "target_base", f.base);
            self.compute(&inst.symbol, "target_bull", f.bull);
            rows.push(vec![
                inst.symbol.clone(),
                html::money(inst.price),
                html::money(f.bear),
                html::money(f.base),
                html::money(f.bull),
                html::pct(f.upside_pct(inst.price)),
                f.confidence.to_string(),
            ]);
        }

        let mut body = html::table(
            &["Symbol", "Price", "Bear", "Base", "Bull", "Base upside", "Confidence"],
            &rows,
        );
        body.push_str(&html::callout(
            "note",
            "Twelve-month scenario targets are model estimates derived from valuation, momentum and income. They are not investment advice.",
        ));
        self.upsert_section("predictions", SectionKind::Insight, body);
        self.changes
            .push(format!("Added twelve-month scenarios for {}", assets.join(", ")));

        StatePatch::Predictions {
            sections: self.plan.sections(),
        }
    }

    pub(super) fn risks(&mut self) -> StatePatch {
        let assets = self.current_assets();
        let instruments = self.instruments(&assets);
        let metrics = with_metrics(&self.state.metrics, RISK_METRICS);

        let mut rows = Vec::new();
        let mut notes = String::new();
        let mut profiles = Vec::new();
        for inst in &instruments {
            let r = market::risk_profile(inst);
            self.compute(&inst.symbol, "volatility", r.volatility);
            self.compute(&inst.symbol, "var_95", r.var_95);
            rows.push(vec![
                inst.symbol.clone(),
                html::number(r.beta),
                format!("{:.2}%", r.volatility),
                format!("{:.2}%", r.max_drawdown),
                html::money(r.var_95),
                r.rating.to_string(),
            ]);
            if r.rating == "High" {
                notes.push_str(&html::callout(
                    "negative",
                    &format!(
                        "{} carries high risk: annualized volatility of {:.1}% and beta of {:.2}.",
                        inst.symbol, r.volatility, r.beta
                    ),
                ));
            }
            profiles.push((inst.symbol.clone(), r));
        }

        let mut body = String::new();
        if profiles.len() > 1 {
            let n = profiles.len() as f64;
            let beta = profiles.iter().map(|(_, r)| r.beta).sum::<f64>() / n;
            let vol = profiles.iter().map(|(_, r)| r.volatility).sum::<f64>() / n;
            let riskiest = profiles
                .iter()
                .max_by(|a, b| a.1.volatility.total_cmp(&b.1.volatility))
                .map(|(s, _)| s.clone())
                .unwrap_or_default();
            body.push_str(&html::metric_cards(&[
                ("Average beta".to_string(), html::number(beta)),
                ("Average volatility".to_string(), format!("{vol:.2}%")),
                ("Highest risk".to_string(), riskiest),
            ]));
        }
        body.push_str(&html::table(
            &["Symbol", "Beta", "Volatility (ann.)", "Drawdown from high", "1-day VaR (95%)", "Rating"],
            &rows,
        ));
        body.push_str(&notes);

        self.upsert_section("risk-assessment", SectionKind::Metric, body);
        self.changes
            .push(format!("Assessed volatility and drawdown risk for {}", assets.join(", ")));

        StatePatch::Risks {
            metrics,
            sections: self.plan.sections(),
        }
    }

    pub(super) fn layout(&mut self) -> StatePatch {
        let lower = self.prompt.to_lowercase();

        let layout = LAYOUTS
            .iter()
            .find(|(keys, _)| keys.iter().any(|k| lower.contains(k)))
            .map(|(_, layout)| (*layout).to_string())
            .unwrap_or_else(|| self.state.layout.clone());
        let theme = if has_any_word(&lower, &["dark", "night"]) {
            "dark".to_string()
        } else if has_any_word(&lower, &["light", "bright"]) {
            "light".to_string()
        } else {
            self.state.theme.clone()
        };

        if layout != self.state.layout {
            self.changes.push(format!("Switched layout to {layout}"));
        }
        if theme != self.state.theme {
            self.changes.push(format!("Switched theme to {theme}"));
        }

        let hiding = has_any_word(&lower, HIDE_WORDS);
        let showing = has_any_word(&lower, SHOW_WORDS);
        if hiding || showing {
            for (id, title, visible) in self.plan.section_ids() {
                if !mentions_section(&lower, &id, &title) {
                    continue;
                }
                if visible && hiding && self.plan.hide(&id) {
                    self.changes.push(format!("Hid section {id}"));
                } else if !visible && showing && self.plan.show(&id) {
                    self.changes.push(format!("Restored section {id}"));
                }
            }
        }

        if self.changes.is_empty() {
            self.changes.push("Layout unchanged".to_string());
        }

        StatePatch::Layout {
            layout,
            theme,
            sections: self.plan.sections(),
        }
    }

    pub(super) fn generic(&mut self) -> StatePatch {
        let assets = self.current_assets();
        let instruments = self.instruments(&assets);

        let mut body = html::paragraph(&format!("Requested: {}", self.prompt.trim()));
        if let Some(first) = instruments.first() {
            body.push_str(&html::paragraph(&super::describe(first)));
        }
        let rows: Vec<Vec<String>> = instruments
            .iter()
            .map(|inst| snapshot_row(inst))
            .collect();
        if !rows.is_empty() {
            body.push_str(&html::table(&["Symbol", "Price", "Day change", "P/E"], &rows));
        }

        let id = self.add_section("additional-analysis", SectionKind::Insight, body);
        self.changes.push(format!("Added notes in {id}"));

        StatePatch::Generic {
            sections: self.plan.sections(),
        }
    }
}

fn snapshot_row(inst: &Instrument) -> Vec<String> {
    vec![
        inst.symbol.clone(),
        html::money(inst.price),
        html::pct(inst.change_pct),
        format!("{:.1}x", inst.pe),
    ]
}

fn comparison_insights(instruments: &[&Instrument]) -> String {
    let mut out = String::new();
    if let Some(cheapest) = instruments
        .iter()
        .filter(|i| i.pe > 0.0)
        .min_by(|a, b| a.pe.total_cmp(&b.pe))
    {
        out.push_str(&html::callout(
            "neutral",
            &format!(
                "{} is the cheapest on earnings at {:.1}x.",
                cheapest.symbol, cheapest.pe
            ),
        ));
    }
    if let Some(strongest) = instruments
        .iter()
        .max_by(|a, b| a.change_pct.total_cmp(&b.change_pct))
    {
        out.push_str(&html::callout(
            "positive",
            &format!(
                "{} shows the strongest session at {}.",
                strongest.symbol,
                html::pct(strongest.change_pct)
            ),
        ));
    }
    if let Some(largest) = instruments
        .iter()
        .max_by(|a, b| a.market_cap.total_cmp(&b.market_cap))
    {
        out.push_str(&html::callout(
            "neutral",
            &format!(
                "{} is the largest by market value at {}.",
                largest.symbol,
                html::cap(largest.market_cap)
            ),
        ));
    }
    out
}
