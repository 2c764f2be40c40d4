//! Section synthesis.
//!
//! Maps a classified intent to the section operations that express it and a
//! typed [`StatePatch`] carrying the full post-operation section list. Every
//! generator reads the context and reference data only; nothing here mutates
//! shared state, so a synthesis can be discarded without side effects.
//!
//! Section ids are the kind slug (`technical-analysis`) while it is free and
//! `{slug}-{seq}` once taken, where `seq` is the caller's monotonic counter.

mod enhance;
pub mod html;
mod initial;
pub mod market;

use std::collections::BTreeMap;
use std::sync::Arc;

use folio_core::{
    AssetList, CacheFill, Context, EnhancementKind, Instrument, Intent, ReferenceData,
    ReportState, Section, SectionAction, SectionKind, SectionOperation, StatePatch,
};
use tracing::debug;

/// Title used for sections whose slug is not in the title table.
pub const GENERIC_TITLE: &str = "Additional Analysis";

const TITLES: &[(&str, &str)] = &[
    ("main-analysis", "Analysis Overview"),
    ("price-performance", "Price Performance"),
    ("relative-performance", "Relative Performance"),
    ("allocation-breakdown", "Allocation Breakdown"),
    ("portfolio-metrics", "Portfolio Metrics"),
    ("sector-leaders", "Sector Leaders & Laggards"),
    ("market-breadth", "Market Breadth"),
    ("technical-analysis", "Technical Analysis"),
    ("comparison-analysis", "Comparative Analysis"),
    ("historical-performance", "Historical Performance"),
    ("predictions", "Forecast & Outlook"),
    ("risk-assessment", "Risk Assessment"),
    ("additional-analysis", GENERIC_TITLE),
];

/// Strip any trailing `-<digits>` sequence suffixes from a section id.
pub fn base_slug(id: &str) -> &str {
    let mut slug = id;
    while let Some((head, tail)) = slug.rsplit_once('-') {
        if !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) {
            slug = head;
        } else {
            break;
        }
    }
    slug
}

/// Display title for a section id.
pub fn section_title(id: &str) -> &'static str {
    let slug = base_slug(id);
    TITLES
        .iter()
        .find(|(s, _)| *s == slug)
        .map(|(_, title)| *title)
        .unwrap_or(GENERIC_TITLE)
}

// ── Inputs & outputs ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SynthesisInput<'a> {
    pub prompt: &'a str,
    pub intent: Intent,
    /// Symbols named by the prompt. For an initial report these are the
    /// report's assets; for a comparison, the symbols to add.
    pub assets: AssetList,
    /// Canonical timeframe label extracted from the prompt.
    pub timeframe: &'a str,
    /// Monotonic counter used to disambiguate section ids.
    pub seq: u64,
    /// Insert new sections at this visible position instead of appending.
    pub insert_at: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Synthesis {
    pub operations: Vec<SectionOperation>,
    pub patch: StatePatch,
    pub cache: CacheFill,
    pub changes: Vec<String>,
}

impl Synthesis {
    /// Ids of the sections the operations target, in first-touch order.
    pub fn touched_section_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for op in &self.operations {
            if !ids.contains(&op.section_id) {
                ids.push(op.section_id.clone());
            }
        }
        ids
    }
}

// ── Section plan ──────────────────────────────────────────────────────────

/// Working copy of the section list plus the operations applied to it.
#[derive(Debug, Clone)]
pub(crate) struct SectionPlan {
    sections: Vec<Section>,
    operations: Vec<SectionOperation>,
    seq: u64,
}

impl SectionPlan {
    pub(crate) fn new(existing: &[Section], seq: u64) -> Self {
        Self {
            sections: existing.to_vec(),
            operations: Vec::new(),
            seq,
        }
    }

    fn has(&self, id: &str) -> bool {
        self.sections.iter().any(|s| s.id == id)
    }

    pub(crate) fn is_visible(&self, id: &str) -> bool {
        self.sections.iter().any(|s| s.id == id && s.visible)
    }

    fn unique_id(&self, slug: &str) -> String {
        if !self.has(slug) {
            return slug.to_string();
        }
        let base = format!("{slug}-{}", self.seq);
        if !self.has(&base) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}-{n}");
            if !self.has(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    fn next_order(&self) -> u32 {
        self.sections
            .iter()
            .map(|s| s.order + 1)
            .max()
            .unwrap_or(0)
    }

    /// Order value of the `index`-th visible section.
    fn order_at_visible_index(&self, index: usize) -> Option<u32> {
        let mut orders: Vec<u32> = self
            .sections
            .iter()
            .filter(|s| s.visible)
            .map(|s| s.order)
            .collect();
        orders.sort_unstable();
        orders.get(index).copied()
    }

    /// Open a gap at `target` by shifting every section at or after it.
    fn shift_from(&mut self, target: u32, except: Option<&str>) {
        for section in &mut self.sections {
            if section.order >= target && Some(section.id.as_str()) != except {
                section.order += 1;
            }
        }
    }

    /// Add a new section. Appends unless `position` names an existing
    /// visible slot. Returns the assigned id.
    pub(crate) fn add(
        &mut self,
        slug: &str,
        kind: SectionKind,
        content: String,
        position: Option<usize>,
    ) -> String {
        let id = self.unique_id(slug);
        let (order, explicit) = match position.and_then(|p| self.order_at_visible_index(p)) {
            Some(target) => {
                self.shift_from(target, None);
                (target, Some(target))
            }
            None => (self.next_order(), None),
        };

        self.sections.push(Section::new(
            id.clone(),
            kind,
            section_title(&id),
            content.clone(),
            order,
        ));
        self.operations
            .push(SectionOperation::add(id.clone(), content, explicit));
        id
    }

    /// Substitute the body of a visible section.
    pub(crate) fn replace(&mut self, id: &str, content: String) -> bool {
        let Some(section) = self.sections.iter_mut().find(|s| s.id == id && s.visible) else {
            return false;
        };
        section.content = content.clone();
        self.operations.push(SectionOperation::replace(id, content));
        true
    }

    /// Substitute the body of a visible section and optionally move it.
    pub(crate) fn update(&mut self, id: &str, content: String, order: Option<u32>) -> bool {
        if !self.is_visible(id) {
            return false;
        }
        if let Some(target) = order {
            self.shift_from(target, Some(id));
        }
        if let Some(section) = self.sections.iter_mut().find(|s| s.id == id) {
            section.content = content.clone();
            if let Some(target) = order {
                section.order = target;
            }
        }
        self.operations
            .push(SectionOperation::update(id, content, order));
        true
    }

    pub(crate) fn hide(&mut self, id: &str) -> bool {
        let Some(section) = self.sections.iter_mut().find(|s| s.id == id && s.visible) else {
            return false;
        };
        section.visible = false;
        self.operations.push(SectionOperation::remove(id));
        true
    }

    /// Make a hidden section visible again at its previous position.
    pub(crate) fn show(&mut self, id: &str) -> bool {
        let Some(section) = self.sections.iter_mut().find(|s| s.id == id && !s.visible) else {
            return false;
        };
        section.visible = true;
        self.operations.push(SectionOperation::add(
            id,
            section.content.clone(),
            Some(section.order),
        ));
        true
    }

    pub(crate) fn sections(&self) -> Vec<Section> {
        self.sections.clone()
    }

    pub(crate) fn section_ids(&self) -> Vec<(String, String, bool)> {
        self.sections
            .iter()
            .map(|s| (s.id.clone(), s.title.clone(), s.visible))
            .collect()
    }
}

// ── Metric cells ──────────────────────────────────────────────────────────

pub(crate) struct MetricCell {
    pub label: &'static str,
    pub display: String,
    pub raw: f64,
}

/// Display value for a named metric, or `None` for unknown metric names.
pub(crate) fn metric_cell(inst: &Instrument, metric: &str) -> Option<MetricCell> {
    let (label, display, raw) = match metric {
        "price" => ("Price", html::money(inst.price), inst.price),
        "change_pct" => ("Day change", html::pct(inst.change_pct), inst.change_pct),
        "market_cap" => ("Market cap", html::cap(inst.market_cap), inst.market_cap),
        "pe" => ("P/E", format!("{:.1}x", inst.pe), inst.pe),
        "volume" => ("Volume", html::volume(inst.volume), inst.volume as f64),
        "beta" => ("Beta", html::number(inst.beta), inst.beta),
        "dividend_yield" => (
            "Dividend yield",
            format!("{:.2}%", inst.dividend_yield),
            inst.dividend_yield,
        ),
        "high_52w" => ("52-week high", html::money(inst.high_52w), inst.high_52w),
        "low_52w" => ("52-week low", html::money(inst.low_52w), inst.low_52w),
        "rsi" => {
            let rsi = market::technicals(inst).rsi;
            ("RSI (14)", html::number(rsi), rsi)
        }
        "macd" => {
            let macd = market::technicals(inst).macd;
            ("MACD", html::number(macd), macd)
        }
        "sma_50" => {
            let sma = market::technicals(inst).sma_50;
            ("SMA 50", html::money(sma), sma)
        }
        "sma_200" => {
            let sma = market::technicals(inst).sma_200;
            ("SMA 200", html::money(sma), sma)
        }
        "volatility" => {
            let vol = market::annual_volatility(inst);
            ("Volatility (ann.)", format!("{vol:.2}%"), vol)
        }
        "max_drawdown" => {
            let dd = market::round2(inst.drawdown_pct());
            ("Drawdown from high", format!("{dd:.2}%"), dd)
        }
        _ => return None,
    };
    Some(MetricCell {
        label,
        display,
        raw,
    })
}

/// One-sentence summary of an instrument.
pub(crate) fn describe(inst: &Instrument) -> String {
    let direction = if inst.change_pct >= 0.0 { "up" } else { "down" };
    format!(
        "{} ({}) last traded at {}, {} {:.2}% on the session. The price sits {:.0}% of the way through its 52-week range ({} to {}) at {:.1}x earnings, with a market capitalization of {}.",
        inst.name,
        inst.symbol,
        html::money(inst.price),
        direction,
        inst.change_pct.abs(),
        inst.range_position() * 100.0,
        html::money(inst.low_52w),
        html::money(inst.high_52w),
        inst.pe,
        html::cap(inst.market_cap),
    )
}

// ── Draft ─────────────────────────────────────────────────────────────────

/// Mutable scratch space shared by the generators of one synthesis.
struct Draft<'a> {
    reference: &'a dyn ReferenceData,
    state: &'a ReportState,
    prompt: &'a str,
    insert_at: Option<usize>,
    plan: SectionPlan,
    cache: CacheFill,
    changes: Vec<String>,
}

impl<'a> Draft<'a> {
    fn instruments(&self, assets: &AssetList) -> Vec<&'a Instrument> {
        let reference = self.reference;
        assets.iter().filter_map(|s| reference.lookup(s)).collect()
    }

    fn record_quotes(&mut self, instruments: &[&Instrument], metrics: &[String]) {
        for inst in instruments {
            self.cache.prices.insert(inst.symbol.clone(), inst.price);
            for metric in metrics {
                if let Some(cell) = metric_cell(inst, metric) {
                    self.cache
                        .metrics
                        .insert(format!("{}:{metric}", inst.symbol), cell.raw);
                }
            }
        }
    }

    fn record_series(&mut self, inst: &Instrument, timeframe: &str) -> Vec<f64> {
        let series = market::price_series(inst, timeframe);
        self.cache
            .charts
            .insert(format!("{}:{timeframe}", inst.symbol), series.clone());
        series
    }

    fn compute(&mut self, symbol: &str, name: &str, value: f64) {
        self.cache
            .computed
            .insert(format!("{symbol}:{name}"), value);
    }

    /// Price chart over `timeframe` for the given instruments.
    fn price_chart(&mut self, instruments: &[&Instrument], timeframe: &str) -> Option<String> {
        if instruments.is_empty() {
            return None;
        }
        let mut series = BTreeMap::new();
        let mut returns = Vec::new();
        for inst in instruments {
            let points = self.record_series(inst, timeframe);
            returns.push(format!(
                "{} {}",
                inst.symbol,
                html::pct(market::period_return(&points))
            ));
            series.insert(inst.symbol.clone(), points);
        }
        let mut content = html::chart("line", &format!("Closing price, {timeframe}"), &series);
        content.push_str(&html::paragraph(&format!(
            "Return over the period: {}.",
            returns.join(", ")
        )));
        Some(content)
    }

    /// Add a new section, honoring a requested insertion point.
    fn add_section(&mut self, slug: &str, kind: SectionKind, content: String) -> String {
        let position = self.insert_at;
        self.insert_at = position.map(|p| p + 1);
        self.plan.add(slug, kind, content, position)
    }

    /// Refresh a visible section in place, or add it. Returns the id and
    /// whether it was newly added.
    fn upsert_section(&mut self, slug: &str, kind: SectionKind, content: String) -> (String, bool) {
        if self.plan.replace(slug, content.clone()) {
            return (slug.to_string(), false);
        }
        (self.add_section(slug, kind, content), true)
    }

    fn finish(self, patch: StatePatch) -> Synthesis {
        Synthesis {
            operations: self.plan.operations,
            patch,
            cache: self.cache,
            changes: self.changes,
        }
    }
}

// ── Synthesizer ───────────────────────────────────────────────────────────

/// Turns intents into section operations using read-only reference data.
pub struct SectionSynthesizer {
    reference: Arc<dyn ReferenceData>,
}

impl SectionSynthesizer {
    pub fn new(reference: Arc<dyn ReferenceData>) -> Self {
        Self { reference }
    }

    pub fn reference(&self) -> &dyn ReferenceData {
        self.reference.as_ref()
    }

    pub fn synthesize(&self, context: &Context, input: &SynthesisInput<'_>) -> Synthesis {
        let existing: &[Section] = match input.intent {
            Intent::Report(_) => &[],
            Intent::Enhance(_) => &context.state.sections,
        };
        let mut draft = Draft {
            reference: self.reference.as_ref(),
            state: &context.state,
            prompt: input.prompt,
            insert_at: input.insert_at,
            plan: SectionPlan::new(existing, input.seq),
            cache: CacheFill::default(),
            changes: Vec::new(),
        };

        let patch = match input.intent {
            Intent::Report(report_type) => {
                draft.initial_report(report_type, &input.assets, input.timeframe)
            }
            Intent::Enhance(EnhancementKind::AddTechnical) => draft.technical(),
            Intent::Enhance(EnhancementKind::AddComparison) => draft.comparison(&input.assets),
            Intent::Enhance(EnhancementKind::AddTimeframe) => draft.timeframe(input.timeframe),
            Intent::Enhance(EnhancementKind::AddPredictions) => draft.predictions(),
            Intent::Enhance(EnhancementKind::AddRisks) => draft.risks(),
            Intent::Enhance(EnhancementKind::ModifyLayout) => draft.layout(),
            Intent::Enhance(EnhancementKind::Generic) => draft.generic(),
        };

        debug!(
            intent = %input.intent,
            patch = patch.name(),
            operations = draft.plan.operations.len(),
            "Synthesized sections"
        );
        draft.finish(patch)
    }

    /// Fold externally generated operations into the context's sections.
    ///
    /// `add` ops get a unique id and treat `order` as a visible position;
    /// `update`, `replace` and `remove` ops naming no visible section are
    /// dropped. The returned operations are the normalized, applied ones.
    pub fn merge_operations(
        &self,
        context: &Context,
        operations: Vec<SectionOperation>,
        seq: u64,
    ) -> Synthesis {
        let mut plan = SectionPlan::new(&context.state.sections, seq);
        let mut changes = Vec::new();

        for op in operations {
            let section_id = op.section_id;
            let applied = match op.action {
                SectionAction::Add => {
                    let id = plan.add(
                        &section_id,
                        SectionKind::Custom,
                        op.content,
                        op.order.map(|o| o as usize),
                    );
                    changes.push(format!("Added section {id}"));
                    continue;
                }
                SectionAction::Replace => plan.replace(&section_id, op.content),
                SectionAction::Update => plan.update(&section_id, op.content, op.order),
                SectionAction::Remove => plan.hide(&section_id),
            };

            if applied {
                let verb = match op.action {
                    SectionAction::Remove => "Removed",
                    SectionAction::Replace => "Replaced",
                    _ => "Updated",
                };
                changes.push(format!("{verb} section {section_id}"));
            } else {
                debug!(
                    section = %section_id,
                    action = %op.action,
                    "Skipping operation on unknown section"
                );
            }
        }

        Synthesis {
            patch: StatePatch::Generated {
                sections: plan.sections(),
            },
            operations: plan.operations,
            cache: CacheFill::default(),
            changes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::{ReportType, StateDefaults, StaticReferenceData};

    fn synthesizer() -> SectionSynthesizer {
        SectionSynthesizer::new(Arc::new(StaticReferenceData::builtin()))
    }

    fn assets(symbols: &[&str]) -> AssetList {
        symbols.iter().collect()
    }

    fn input<'a>(prompt: &'a str, intent: Intent, symbols: &[&str], seq: u64) -> SynthesisInput<'a> {
        SynthesisInput {
            prompt,
            intent,
            assets: assets(symbols),
            timeframe: "1 Year",
            seq,
            insert_at: None,
        }
    }

    /// Synthesize and apply, the way the store would.
    fn apply(context: &mut Context, synthesis: &Synthesis) {
        synthesis.patch.clone().apply(&mut context.state);
        context.metadata.version += 1;
    }

    fn initialized(symbols: &[&str]) -> Context {
        let mut ctx = Context::new("conv", "Analyze", &StateDefaults::default());
        let s = synthesizer().synthesize(
            &ctx,
            &input("Analyze", Intent::Report(ReportType::Single), symbols, 1),
        );
        s.patch.apply(&mut ctx.state);
        ctx
    }

    #[test]
    fn base_slug_strips_sequence_suffixes() {
        assert_eq!(base_slug("technical-analysis"), "technical-analysis");
        assert_eq!(base_slug("technical-analysis-4"), "technical-analysis");
        assert_eq!(base_slug("additional-analysis-7-2"), "additional-analysis");
        assert_eq!(base_slug("esg-outlook"), "esg-outlook");
    }

    #[test]
    fn unknown_slug_gets_generic_title() {
        assert_eq!(section_title("predictions"), "Forecast & Outlook");
        assert_eq!(section_title("risk-assessment-9"), "Risk Assessment");
        assert_eq!(section_title("esg-summary"), GENERIC_TITLE);
    }

    #[test]
    fn single_report_creates_main_analysis() {
        let ctx = Context::new("conv", "Analyze AAPL", &StateDefaults::default());
        let s = synthesizer().synthesize(
            &ctx,
            &input("Analyze AAPL", Intent::Report(ReportType::Single), &["AAPL"], 1),
        );

        assert_eq!(s.operations[0].section_id, "main-analysis");
        assert_eq!(s.operations[0].action, SectionAction::Add);
        assert!(s.operations[0].content.contains("Apple Inc."));
        assert!(matches!(s.patch, StatePatch::Initial { report_type: ReportType::Single, .. }));
        assert_eq!(s.cache.prices.get("AAPL"), Some(&189.84));
        assert!(s.cache.charts.contains_key("AAPL:1 Year"));
    }

    #[test]
    fn every_report_type_produces_main_analysis() {
        let ctx = Context::new("conv", "q", &StateDefaults::default());
        for report_type in [
            ReportType::Single,
            ReportType::Comparison,
            ReportType::Portfolio,
            ReportType::Sector,
            ReportType::Market,
        ] {
            let s = synthesizer().synthesize(
                &ctx,
                &input("q", Intent::Report(report_type), &["AAPL", "MSFT"], 1),
            );
            assert!(
                s.patch.sections().iter().any(|sec| sec.id == "main-analysis"),
                "{report_type}"
            );
        }
    }

    #[test]
    fn unknown_symbol_still_renders() {
        let ctx = Context::new("conv", "q", &StateDefaults::default());
        let s = synthesizer().synthesize(
            &ctx,
            &input("q", Intent::Report(ReportType::Single), &["ZZZZ"], 1),
        );
        assert_eq!(s.patch.sections().len(), 1);
        assert!(s.patch.sections()[0].content.contains("ZZZZ"));
    }

    #[test]
    fn touched_ids_exist_in_patch() {
        let mut ctx = initialized(&["AAPL"]);
        for (seq, kind) in [
            EnhancementKind::AddTechnical,
            EnhancementKind::AddComparison,
            EnhancementKind::AddTimeframe,
            EnhancementKind::AddPredictions,
            EnhancementKind::AddRisks,
            EnhancementKind::ModifyLayout,
            EnhancementKind::Generic,
        ]
        .into_iter()
        .enumerate()
        {
            let s = synthesizer().synthesize(
                &ctx,
                &input("more please", Intent::Enhance(kind), &["MSFT"], seq as u64 + 2),
            );
            for id in s.touched_section_ids() {
                assert!(
                    s.patch.sections().iter().any(|sec| sec.id == id),
                    "{kind}: {id} not in patch"
                );
            }
            apply(&mut ctx, &s);
        }
    }

    #[test]
    fn technical_adds_then_refreshes() {
        let mut ctx = initialized(&["AAPL"]);
        let first = synthesizer().synthesize(
            &ctx,
            &input("Add technical indicators", Intent::Enhance(EnhancementKind::AddTechnical), &[], 2),
        );
        assert_eq!(first.operations.len(), 1);
        assert_eq!(first.operations[0].section_id, "technical-analysis");
        assert_eq!(first.operations[0].action, SectionAction::Add);
        let StatePatch::Technical { metrics, .. } = &first.patch else {
            panic!("expected technical patch");
        };
        assert!(metrics.contains(&"rsi".to_string()));
        apply(&mut ctx, &first);

        let again = synthesizer().synthesize(
            &ctx,
            &input("more technicals", Intent::Enhance(EnhancementKind::AddTechnical), &[], 3),
        );
        assert_eq!(again.operations[0].action, SectionAction::Replace);
        assert_eq!(again.operations[0].section_id, "technical-analysis");
        assert_eq!(
            again
                .patch
                .sections()
                .iter()
                .filter(|s| s.id.starts_with("technical-analysis"))
                .count(),
            1
        );
    }

    #[test]
    fn generic_sections_get_sequenced_ids() {
        let mut ctx = initialized(&["AAPL"]);
        let first = synthesizer().synthesize(
            &ctx,
            &input("tell me a story", Intent::Enhance(EnhancementKind::Generic), &[], 2),
        );
        assert_eq!(first.operations[0].section_id, "additional-analysis");
        apply(&mut ctx, &first);

        let second = synthesizer().synthesize(
            &ctx,
            &input("and another", Intent::Enhance(EnhancementKind::Generic), &[], 3),
        );
        assert_eq!(second.operations[0].section_id, "additional-analysis-3");
        assert_eq!(
            section_title(&second.operations[0].section_id),
            GENERIC_TITLE
        );
    }

    #[test]
    fn comparison_unions_assets() {
        let ctx = initialized(&["AAPL"]);
        let s = synthesizer().synthesize(
            &ctx,
            &input("Compare with MSFT", Intent::Enhance(EnhancementKind::AddComparison), &["MSFT"], 2),
        );
        let StatePatch::Comparison {
            assets,
            report_type,
            ..
        } = &s.patch
        else {
            panic!("expected comparison patch");
        };
        assert_eq!(assets.join(","), "AAPL,MSFT");
        assert_eq!(*report_type, ReportType::Comparison);
        assert_eq!(s.operations[0].section_id, "comparison-analysis");
    }

    #[test]
    fn comparison_without_symbols_uses_peers() {
        let ctx = initialized(&["XOM"]);
        let s = synthesizer().synthesize(
            &ctx,
            &input("compare it", Intent::Enhance(EnhancementKind::AddComparison), &[], 2),
        );
        let StatePatch::Comparison { assets, .. } = &s.patch else {
            panic!("expected comparison patch");
        };
        assert_eq!(assets.join(","), "XOM,CVX");
    }

    #[test]
    fn timeframe_refreshes_price_chart() {
        let ctx = initialized(&["AAPL"]);
        let mut i = input("5 year trends", Intent::Enhance(EnhancementKind::AddTimeframe), &[], 2);
        i.timeframe = "5 Year";
        let s = synthesizer().synthesize(&ctx, &i);

        let StatePatch::Timeframe { timeframe, .. } = &s.patch else {
            panic!("expected timeframe patch");
        };
        assert_eq!(timeframe, "5 Year");
        assert!(s.operations.iter().any(|op| op.section_id == "historical-performance"));
        assert!(
            s.operations
                .iter()
                .any(|op| op.section_id == "price-performance" && op.action == SectionAction::Replace)
        );
        assert!(s.cache.charts.contains_key("AAPL:5 Year"));
    }

    #[test]
    fn insert_at_shifts_following_sections() {
        let ctx = initialized(&["AAPL"]);
        let mut i = input("risk", Intent::Enhance(EnhancementKind::AddRisks), &[], 2);
        i.insert_at = Some(0);
        let s = synthesizer().synthesize(&ctx, &i);

        assert_eq!(s.operations[0].order, Some(0));
        let mut sections = s.patch.sections().to_vec();
        sections.sort_by_key(|s| s.order);
        assert_eq!(sections[0].id, "risk-assessment");
        assert_eq!(sections[1].id, "main-analysis");
        let mut orders: Vec<u32> = sections.iter().map(|s| s.order).collect();
        orders.dedup();
        assert_eq!(orders.len(), sections.len());
    }

    #[test]
    fn layout_switches_and_hides() {
        let ctx = initialized(&["AAPL"]);
        let s = synthesizer().synthesize(
            &ctx,
            &input(
                "switch to a dark dashboard view and hide the main section",
                Intent::Enhance(EnhancementKind::ModifyLayout),
                &[],
                2,
            ),
        );
        let StatePatch::Layout { layout, theme, sections } = &s.patch else {
            panic!("expected layout patch");
        };
        assert_eq!(layout, "dashboard");
        assert_eq!(theme, "dark");
        let main = sections.iter().find(|s| s.id == "main-analysis").unwrap();
        assert!(!main.visible);
        assert_eq!(s.operations, vec![SectionOperation::remove("main-analysis")]);
    }

    #[test]
    fn merge_drops_unknown_targets() {
        let ctx = initialized(&["AAPL"]);
        let s = synthesizer().merge_operations(
            &ctx,
            vec![
                SectionOperation::add("main-analysis", "<p>dup</p>", None),
                SectionOperation::replace("nope", "<p>x</p>"),
                SectionOperation::remove("price-performance"),
            ],
            4,
        );
        let ids: Vec<&str> = s.operations.iter().map(|o| o.section_id.as_str()).collect();
        assert_eq!(ids, vec!["main-analysis-4", "price-performance"]);
        let hidden = s
            .patch
            .sections()
            .iter()
            .find(|s| s.id == "price-performance")
            .unwrap();
        assert!(!hidden.visible);
    }

    #[test]
    fn update_moves_section() {
        let ctx = initialized(&["AAPL"]);
        let s = synthesizer().merge_operations(
            &ctx,
            vec![SectionOperation::update("price-performance", "<p>moved</p>", Some(0))],
            2,
        );
        let mut sections = s.patch.sections().to_vec();
        sections.sort_by_key(|s| s.order);
        assert_eq!(sections[0].id, "price-performance");
        assert_eq!(sections[0].content, "<p>moved</p>");
        assert_eq!(sections[1].id, "main-analysis");
    }
}
