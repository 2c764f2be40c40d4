//! Sections and the transient operations that change them.
//!
//! A [`Section`] is an addressable, ordered fragment of the report. Its
//! `content` is the rendered markup, so the stored section list doubles as
//! the content registry the assembler rebuilds documents from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What a section renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Chart,
    Table,
    Text,
    Metric,
    Insight,
    Custom,
}

impl SectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chart => "chart",
            Self::Table => "table",
            Self::Text => "text",
            Self::Metric => "metric",
            Self::Insight => "insight",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An addressable fragment of the report document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    pub kind: SectionKind,
    pub title: String,
    /// Rendered section body (opaque HTML).
    pub content: String,
    pub order: u32,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

impl Section {
    pub fn new(
        id: impl Into<String>,
        kind: SectionKind,
        title: impl Into<String>,
        content: impl Into<String>,
        order: u32,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            title: title.into(),
            content: content.into(),
            order,
            visible: true,
        }
    }
}

/// The action carried by a [`SectionOperation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionAction {
    /// Insert a new section (appended unless an explicit order is given).
    Add,
    /// Substitute the body of an existing section, optionally moving it.
    Update,
    /// Substitute the body of an existing section in place.
    Replace,
    /// Omit an existing section from the document.
    Remove,
}

impl SectionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Update => "update",
            Self::Replace => "replace",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for SectionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "add" | "insert" | "append" => Ok(Self::Add),
            "update" | "modify" => Ok(Self::Update),
            "replace" => Ok(Self::Replace),
            "remove" | "delete" => Ok(Self::Remove),
            other => Err(format!("unknown section action '{other}'")),
        }
    }
}

/// A transient add/update/replace/remove instruction. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionOperation {
    pub section_id: String,
    pub action: SectionAction,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
}

impl SectionOperation {
    pub fn add(section_id: impl Into<String>, content: impl Into<String>, order: Option<u32>) -> Self {
        Self {
            section_id: section_id.into(),
            action: SectionAction::Add,
            content: content.into(),
            order,
        }
    }

    pub fn update(section_id: impl Into<String>, content: impl Into<String>, order: Option<u32>) -> Self {
        Self {
            section_id: section_id.into(),
            action: SectionAction::Update,
            content: content.into(),
            order,
        }
    }

    pub fn replace(section_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            section_id: section_id.into(),
            action: SectionAction::Replace,
            content: content.into(),
            order: None,
        }
    }

    pub fn remove(section_id: impl Into<String>) -> Self {
        Self {
            section_id: section_id.into(),
            action: SectionAction::Remove,
            content: String::new(),
            order: None,
        }
    }
}
