//! State patches — one named variant per kind of change.
//!
//! Every variant lists the top-level [`ReportState`] keys it replaces.
//! Applying a patch replaces those keys wholesale; nothing is deep-merged
//! and keys a variant does not name are left untouched.

use crate::assets::AssetList;
use crate::context::ReportState;
use crate::intent::ReportType;
use crate::section::Section;

#[derive(Debug, Clone, PartialEq)]
pub enum StatePatch {
    /// First report of a conversation.
    Initial {
        report_type: ReportType,
        assets: AssetList,
        timeframe: String,
        sections: Vec<Section>,
    },
    Technical {
        metrics: Vec<String>,
        sections: Vec<Section>,
    },
    /// `assets` is the full union of existing and requested symbols.
    Comparison {
        assets: AssetList,
        report_type: ReportType,
        sections: Vec<Section>,
    },
    Timeframe {
        timeframe: String,
        sections: Vec<Section>,
    },
    Predictions {
        sections: Vec<Section>,
    },
    Risks {
        metrics: Vec<String>,
        sections: Vec<Section>,
    },
    Layout {
        layout: String,
        theme: String,
        sections: Vec<Section>,
    },
    Generic {
        sections: Vec<Section>,
    },
    /// Sections produced by an external generation call.
    Generated {
        sections: Vec<Section>,
    },
}

impl StatePatch {
    /// Replace the keys this variant names.
    pub fn apply(self, state: &mut ReportState) {
        match self {
            Self::Initial {
                report_type,
                assets,
                timeframe,
                sections,
            } => {
                state.report_type = Some(report_type);
                state.assets = assets;
                state.timeframe = timeframe;
                state.sections = sections;
            }
            Self::Technical { metrics, sections } | Self::Risks { metrics, sections } => {
                state.metrics = metrics;
                state.sections = sections;
            }
            Self::Comparison {
                assets,
                report_type,
                sections,
            } => {
                state.assets = assets;
                state.report_type = Some(report_type);
                state.sections = sections;
            }
            Self::Timeframe {
                timeframe,
                sections,
            } => {
                state.timeframe = timeframe;
                state.sections = sections;
            }
            Self::Layout {
                layout,
                theme,
                sections,
            } => {
                state.layout = layout;
                state.theme = theme;
                state.sections = sections;
            }
            Self::Predictions { sections }
            | Self::Generic { sections }
            | Self::Generated { sections } => {
                state.sections = sections;
            }
        }
    }

    /// The section list this patch installs.
    pub fn sections(&self) -> &[Section] {
        match self {
            Self::Initial { sections, .. }
            | Self::Technical { sections, .. }
            | Self::Comparison { sections, .. }
            | Self::Timeframe { sections, .. }
            | Self::Predictions { sections }
            | Self::Risks { sections, .. }
            | Self::Layout { sections, .. }
            | Self::Generic { sections }
            | Self::Generated { sections } => sections,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Initial { .. } => "initial",
            Self::Technical { .. } => "technical",
            Self::Comparison { .. } => "comparison",
            Self::Timeframe { .. } => "timeframe",
            Self::Predictions { .. } => "predictions",
            Self::Risks { .. } => "risks",
            Self::Layout { .. } => "layout",
            Self::Generic { .. } => "generic",
            Self::Generated { .. } => "generated",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StateDefaults;
    use crate::section::SectionKind;

    #[test]
    fn timeframe_patch_leaves_other_keys() {
        let mut state = ReportState::new(&StateDefaults::default());
        state.assets.insert("AAPL");
        let before_metrics = state.metrics.clone();

        StatePatch::Timeframe {
            timeframe: "5 Year".into(),
            sections: vec![Section::new("h", SectionKind::Chart, "H", "", 0)],
        }
        .apply(&mut state);

        assert_eq!(state.timeframe, "5 Year");
        assert_eq!(state.sections.len(), 1);
        assert_eq!(state.metrics, before_metrics);
        assert_eq!(state.assets.join(","), "AAPL");
    }

    #[test]
    fn comparison_patch_replaces_assets_wholesale() {
        let mut state = ReportState::new(&StateDefaults::default());
        state.assets.insert("TSLA");
        let assets: AssetList = ["AAPL", "MSFT"].into_iter().collect();

        StatePatch::Comparison {
            assets,
            report_type: ReportType::Comparison,
            sections: vec![],
        }
        .apply(&mut state);

        assert_eq!(state.assets.join(","), "AAPL,MSFT");
        assert_eq!(state.report_type, Some(ReportType::Comparison));
    }

    #[test]
    fn sections_accessor_matches_variant() {
        let patch = StatePatch::Generic {
            sections: vec![Section::new("g", SectionKind::Insight, "G", "", 0)],
        };
        assert_eq!(patch.sections().len(), 1);
        assert_eq!(patch.name(), "generic");
    }
}
