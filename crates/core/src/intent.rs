//! Structured intents a free-text prompt is classified into.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The shape of the report requested by the first prompt of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    Single,
    Comparison,
    Portfolio,
    Sector,
    Market,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Comparison => "comparison",
            Self::Portfolio => "portfolio",
            Self::Sector => "sector",
            Self::Market => "market",
        }
    }

    /// Human-readable heading used in the document header.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Single => "Single Asset Analysis",
            Self::Comparison => "Comparative Analysis",
            Self::Portfolio => "Portfolio Review",
            Self::Sector => "Sector Analysis",
            Self::Market => "Market Overview",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of change requested against an existing report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnhancementKind {
    AddTechnical,
    AddComparison,
    AddTimeframe,
    AddPredictions,
    AddRisks,
    ModifyLayout,
    Generic,
}

impl EnhancementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AddTechnical => "add_technical",
            Self::AddComparison => "add_comparison",
            Self::AddTimeframe => "add_timeframe",
            Self::AddPredictions => "add_predictions",
            Self::AddRisks => "add_risks",
            Self::ModifyLayout => "modify_layout",
            Self::Generic => "generic",
        }
    }
}

impl fmt::Display for EnhancementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", content = "kind", rename_all = "snake_case")]
pub enum Intent {
    /// First prompt of a conversation: build a new report of this type.
    Report(ReportType),
    /// Follow-up prompt: enhance the existing report.
    Enhance(EnhancementKind),
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Report(t) => write!(f, "report:{t}"),
            Self::Enhance(k) => write!(f, "enhance:{k}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_serializes_tagged() {
        let json = serde_json::to_string(&Intent::Enhance(EnhancementKind::AddRisks)).unwrap();
        assert_eq!(json, r#"{"intent":"enhance","kind":"add_risks"}"#);
    }

    #[test]
    fn display_uses_wire_names() {
        assert_eq!(Intent::Report(ReportType::Comparison).to_string(), "report:comparison");
        assert_eq!(EnhancementKind::ModifyLayout.to_string(), "modify_layout");
    }
}
