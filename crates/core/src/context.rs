//! Per-conversation report context.
//!
//! A [`Context`] tracks everything needed to extend a generated report
//! without regenerating it:
//!
//! - **State**: assets, metrics, timeframe, report type, sections, theme, layout
//! - **Enhancements**: append-only log of the prompts that changed the report
//! - **Data cache**: memoized reference lookups keyed by symbol / metric
//! - **Metadata**: version, token usage, size, compaction flag
//!
//! The wire form is camelCase JSON with ISO-8601 timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::assets::AssetList;
use crate::intent::ReportType;
use crate::section::Section;

// ── State ─────────────────────────────────────────────────────────────────

/// Initial values for a fresh [`ReportState`].
#[derive(Debug, Clone, PartialEq)]
pub struct StateDefaults {
    pub metrics: Vec<String>,
    pub timeframe: String,
    pub theme: String,
    pub layout: String,
}

impl Default for StateDefaults {
    fn default() -> Self {
        Self {
            metrics: ["price", "change_pct", "market_cap", "pe", "volume"]
                .into_iter()
                .map(String::from)
                .collect(),
            timeframe: "1 Year".into(),
            theme: "light".into(),
            layout: "standard".into(),
        }
    }
}

/// The report as currently shaped by all applied enhancements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportState {
    pub assets: AssetList,
    pub metrics: Vec<String>,
    pub timeframe: String,
    /// `None` until the first prompt has been classified.
    pub report_type: Option<ReportType>,
    pub sections: Vec<Section>,
    pub theme: String,
    pub layout: String,
}

impl ReportState {
    pub fn new(defaults: &StateDefaults) -> Self {
        Self {
            assets: AssetList::new(),
            metrics: defaults.metrics.clone(),
            timeframe: defaults.timeframe.clone(),
            report_type: None,
            sections: Vec::new(),
            theme: defaults.theme.clone(),
            layout: defaults.layout.clone(),
        }
    }

    /// Visible sections sorted by `order`.
    pub fn visible_sections(&self) -> Vec<&Section> {
        let mut visible: Vec<&Section> = self.sections.iter().filter(|s| s.visible).collect();
        visible.sort_by_key(|s| s.order);
        visible
    }

    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    pub fn has_section(&self, id: &str) -> bool {
        self.section(id).is_some()
    }

    /// Order value that places a new section after every existing one.
    pub fn next_order(&self) -> u32 {
        self.sections
            .iter()
            .map(|s| s.order + 1)
            .max()
            .unwrap_or(0)
    }
}

// ── Data cache ────────────────────────────────────────────────────────────

/// Memoized reference lookups. Ordered maps keep serialization stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataCache {
    /// Last price per symbol.
    #[serde(default)]
    pub prices: BTreeMap<String, f64>,
    /// Metric snapshots keyed by `SYMBOL:metric`.
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
    /// Chart series keyed by `SYMBOL:timeframe`.
    #[serde(default)]
    pub charts: BTreeMap<String, Vec<f64>>,
    /// Derived values (indicators, forecasts) keyed by `SYMBOL:name`.
    #[serde(default)]
    pub computed: BTreeMap<String, f64>,
}

/// Entries produced alongside a synthesis, merged into the [`DataCache`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheFill {
    pub prices: BTreeMap<String, f64>,
    pub metrics: BTreeMap<String, f64>,
    pub charts: BTreeMap<String, Vec<f64>>,
    pub computed: BTreeMap<String, f64>,
}

impl CacheFill {
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
            && self.metrics.is_empty()
            && self.charts.is_empty()
            && self.computed.is_empty()
    }

    /// Fold another fill into this one; later entries win.
    pub fn extend(&mut self, other: CacheFill) {
        self.prices.extend(other.prices);
        self.metrics.extend(other.metrics);
        self.charts.extend(other.charts);
        self.computed.extend(other.computed);
    }
}

impl DataCache {
    pub fn merge(&mut self, fill: CacheFill) {
        self.prices.extend(fill.prices);
        self.metrics.extend(fill.metrics);
        self.charts.extend(fill.charts);
        self.computed.extend(fill.computed);
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
            && self.metrics.is_empty()
            && self.charts.is_empty()
            && self.computed.is_empty()
    }
}

// ── Enhancements ──────────────────────────────────────────────────────────

/// One user-driven change to the report. Immutable once logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enhancement {
    pub id: String,
    pub prompt: String,
    pub change_descriptions: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub estimated_token_cost: u64,
    pub touched_section_ids: Vec<String>,
}

impl Enhancement {
    pub fn new(id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            change_descriptions: Vec::new(),
            timestamp: Utc::now(),
            estimated_token_cost: 0,
            touched_section_ids: Vec::new(),
        }
    }

    pub fn with_changes(mut self, changes: Vec<String>) -> Self {
        self.change_descriptions = changes;
        self
    }

    pub fn with_token_cost(mut self, tokens: u64) -> Self {
        self.estimated_token_cost = tokens;
        self
    }

    pub fn touching(mut self, section_ids: Vec<String>) -> Self {
        self.touched_section_ids = section_ids;
        self
    }
}

// ── Metadata ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextMetadata {
    /// Starts at 1, +1 per successful update.
    pub version: u64,
    pub total_tokens_consumed: u64,
    pub created_at: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
    /// Size in characters of the last assembled document.
    pub document_size: usize,
    /// Set once compaction has pruned this context. Never cleared.
    pub compressed: bool,
}

// ── Context ───────────────────────────────────────────────────────────────

/// Per-conversation record tracking report state and enhancement history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    pub id: String,
    pub conversation_id: String,
    pub base_query: String,
    pub state: ReportState,
    pub enhancements: Vec<Enhancement>,
    #[serde(default)]
    pub data_cache: DataCache,
    pub metadata: ContextMetadata,
}

impl Context {
    /// A fresh, unclassified context at version 1.
    pub fn new(
        conversation_id: impl Into<String>,
        base_query: impl Into<String>,
        defaults: &StateDefaults,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.into(),
            base_query: base_query.into(),
            state: ReportState::new(defaults),
            enhancements: Vec::new(),
            data_cache: DataCache::default(),
            metadata: ContextMetadata {
                version: 1,
                total_tokens_consumed: 0,
                created_at: now,
                last_update: now,
                document_size: 0,
                compressed: false,
            },
        }
    }

    /// Whether the first prompt has been classified and rendered.
    pub fn is_initialized(&self) -> bool {
        self.state.report_type.is_some()
    }

    /// Length of the compact JSON serialization, the unit of the size ceiling.
    pub fn serialized_size(&self) -> usize {
        serde_json::to_string(self).map_or(0, |s| s.len())
    }

    pub fn last_enhancement(&self) -> Option<&Enhancement> {
        self.enhancements.last()
    }

    /// Prompts of the last `n` enhancements, oldest first.
    pub fn recent_prompts(&self, n: usize) -> Vec<&str> {
        let skip = self.enhancements.len().saturating_sub(n);
        self.enhancements[skip..]
            .iter()
            .map(|e| e.prompt.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::SectionKind;

    fn fresh() -> Context {
        Context::new("C1", "Analyze AAPL", &StateDefaults::default())
    }

    #[test]
    fn new_context_starts_at_version_one() {
        let ctx = fresh();
        assert_eq!(ctx.metadata.version, 1);
        assert!(ctx.state.sections.is_empty());
        assert!(!ctx.is_initialized());
        assert!(!ctx.metadata.compressed);
        assert_eq!(ctx.state.metrics.len(), 5);
    }

    #[test]
    fn visible_sections_sorted_and_filtered() {
        let mut ctx = fresh();
        ctx.state.sections.push(Section::new("b", SectionKind::Text, "B", "", 2));
        ctx.state.sections.push(Section::new("a", SectionKind::Text, "A", "", 1));
        let mut hidden = Section::new("h", SectionKind::Text, "H", "", 0);
        hidden.visible = false;
        ctx.state.sections.push(hidden);

        let ids: Vec<&str> = ctx.state.visible_sections().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(ctx.state.next_order(), 3);
    }

    #[test]
    fn timestamps_roundtrip_as_iso8601() {
        let ctx = fresh();
        let json = serde_json::to_value(&ctx).unwrap();
        let stamp = json["metadata"]["lastUpdate"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(stamp).is_ok());

        let back: Context = serde_json::from_value(json).unwrap();
        assert_eq!(back, ctx);
    }

    #[test]
    fn recent_prompts_takes_tail() {
        let mut ctx = fresh();
        for i in 0..5 {
            ctx.enhancements.push(Enhancement::new(format!("e{i}"), format!("p{i}")));
        }
        assert_eq!(ctx.recent_prompts(3), vec!["p2", "p3", "p4"]);
        assert_eq!(ctx.recent_prompts(10).len(), 5);
    }

    #[test]
    fn cache_merge_overwrites_keys() {
        let mut cache = DataCache::default();
        cache.prices.insert("AAPL".into(), 1.0);
        let mut fill = CacheFill::default();
        fill.prices.insert("AAPL".into(), 2.0);
        fill.computed.insert("AAPL:rsi".into(), 55.0);
        cache.merge(fill);
        assert_eq!(cache.prices["AAPL"], 2.0);
        assert_eq!(cache.computed["AAPL:rsi"], 55.0);
    }
}
