//! Document assembly.
//!
//! Renders a context plus the operations of the latest synthesis into one
//! self-contained HTML document. Stored sections are the content registry:
//! rendering a context with no operations reproduces the full document.
//!
//! Values that change on every render (the generation timestamp) are wrapped
//! in a live region, `<!--live-->…<!--/live-->`, so callers can compare two
//! renders with [`strip_live_regions`].

use std::collections::{HashMap, HashSet};
use std::fmt::Write;

use chrono::{DateTime, SecondsFormat, Utc};
use folio_core::{Context, Section, SectionAction, SectionOperation};

use crate::synthesizer::html::escape;
use crate::synthesizer::section_title;

pub const LIVE_OPEN: &str = "<!--live-->";
pub const LIVE_CLOSE: &str = "<!--/live-->";

const STYLE: &str = "body{font-family:system-ui,sans-serif;margin:0;padding:2rem;line-height:1.5}\
.theme-dark{background:#14171c;color:#e6e8eb}.theme-light{background:#fff;color:#1d2329}\
.report-section{margin:1.5rem 0;padding:1rem;border-radius:6px;border:1px solid #8884}\
.layout-dashboard .report-body,.layout-grid .report-body{display:grid;grid-template-columns:repeat(auto-fit,minmax(28rem,1fr));gap:1rem}\
.layout-compact .report-section{margin:.5rem 0;padding:.5rem}\
.data-table{border-collapse:collapse;width:100%}.data-table th,.data-table td{padding:.3rem .6rem;border-bottom:1px solid #8884;text-align:left}\
.metric-cards{display:flex;flex-wrap:wrap;gap:.75rem}.metric-card{display:flex;flex-direction:column;padding:.5rem 1rem;border:1px solid #8884;border-radius:4px}\
.metric-label{font-size:.8rem;opacity:.7}.metric-value{font-size:1.2rem;font-weight:600}\
.callout{margin:.5rem 0;padding:.5rem .75rem;border-left:4px solid #888}\
.callout-positive{border-color:#2e9d5b}.callout-negative{border-color:#d24c4c}.callout-note{font-size:.85rem;opacity:.8}\
.chart-canvas{min-height:12rem}.report-meta{display:grid;grid-template-columns:max-content auto;gap:.2rem 1rem}";

/// Remove every live region so two renders can be compared.
pub fn strip_live_regions(document: &str) -> String {
    let mut out = String::with_capacity(document.len());
    let mut rest = document;
    while let Some(start) = rest.find(LIVE_OPEN) {
        out.push_str(&rest[..start]);
        let after = &rest[start + LIVE_OPEN.len()..];
        match after.find(LIVE_CLOSE) {
            Some(end) => rest = &after[end + LIVE_CLOSE.len()..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Renders report documents.
#[derive(Debug, Default, Clone)]
pub struct DocumentAssembler;

impl DocumentAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Assemble the document, stamping it with the current time.
    pub fn assemble(&self, context: &Context, operations: &[SectionOperation]) -> String {
        self.assemble_at(context, operations, Utc::now())
    }

    pub fn assemble_at(
        &self,
        context: &Context,
        operations: &[SectionOperation],
        generated_at: DateTime<Utc>,
    ) -> String {
        let body = self.render_body(context, operations);
        let mut doc = String::with_capacity(body.len() + 2048);
        self.render_head(&mut doc, context);
        self.render_header(&mut doc, context, generated_at);
        doc.push_str("<main class=\"report-body\">\n");
        doc.push_str(&body);
        doc.push_str("</main>\n");
        doc.push_str(
            "<footer class=\"report-footer\"><p>Figures are drawn from a static reference snapshot and are indicative only.</p></footer>\n",
        );
        doc.push_str("</body>\n</html>\n");
        doc
    }

    fn render_head(&self, doc: &mut String, context: &Context) {
        let state = &context.state;
        let _ = write!(
            doc,
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{STYLE}</style>\n</head>\n<body class=\"theme-{} layout-{}\">\n",
            escape(&self.title(context)),
            escape(&state.theme),
            escape(&state.layout),
        );
    }

    fn render_header(&self, doc: &mut String, context: &Context, generated_at: DateTime<Utc>) {
        let state = &context.state;
        let report_type = state
            .report_type
            .map(|t| t.label())
            .unwrap_or("Unclassified Report");
        let _ = write!(
            doc,
            "<header class=\"report-header\" data-version=\"{version}\">\n<h1>{title}</h1>\n<dl class=\"report-meta\">\n\
<dt>Report type</dt><dd>{report_type}</dd>\n<dt>Assets</dt><dd>{assets}</dd>\n<dt>Timeframe</dt><dd>{timeframe}</dd>\n\
<dt>Version</dt><dd>{version}</dd>\n<dt>Enhancements</dt><dd>{enhancements}</dd>\n</dl>\n\
<p class=\"generated\">Generated {LIVE_OPEN}{stamp}{LIVE_CLOSE}</p>\n</header>\n",
            version = context.metadata.version,
            title = escape(&self.title(context)),
            assets = escape(&state.assets.join(", ")),
            timeframe = escape(&state.timeframe),
            enhancements = context.enhancements.len(),
            stamp = generated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        );
    }

    fn title(&self, context: &Context) -> String {
        let state = &context.state;
        match (state.report_type, state.assets.is_empty()) {
            (Some(t), false) => format!("{}: {}", t.label(), state.assets.join(", ")),
            (Some(t), true) => t.label().to_string(),
            (None, _) => "Financial Report".to_string(),
        }
    }

    /// Visible sections in order, with `operations` overriding stored bodies.
    fn render_body(&self, context: &Context, operations: &[SectionOperation]) -> String {
        let added: HashSet<&str> = operations
            .iter()
            .filter(|op| op.action == SectionAction::Add)
            .map(|op| op.section_id.as_str())
            .collect();
        let overrides: HashMap<&str, &SectionOperation> = operations
            .iter()
            .filter(|op| op.action != SectionAction::Add)
            .map(|op| (op.section_id.as_str(), op))
            .collect();

        let mut blocks: Vec<(u32, String)> = Vec::new();
        for section in context.state.visible_sections() {
            if added.contains(section.id.as_str()) {
                continue;
            }
            let (order, body) = match overrides.get(section.id.as_str()) {
                Some(op) if op.action == SectionAction::Remove => continue,
                Some(op) if op.action == SectionAction::Update => {
                    (op.order.unwrap_or(section.order), op.content.as_str())
                }
                Some(op) => (section.order, op.content.as_str()),
                None => (section.order, section.content.as_str()),
            };
            blocks.push((order, render_section(section, order, body)));
        }
        blocks.sort_by_key(|(order, _)| *order);

        let mut rendered: HashSet<&str> = HashSet::new();
        for op in operations.iter().filter(|op| op.action == SectionAction::Add) {
            if !rendered.insert(op.section_id.as_str()) {
                continue;
            }
            let html = match context.state.section(&op.section_id) {
                Some(stored) if !stored.visible => continue,
                Some(stored) => render_section(stored, op.order.unwrap_or(stored.order), &op.content),
                None => {
                    let placeholder = Section::new(
                        op.section_id.clone(),
                        folio_core::SectionKind::Custom,
                        section_title(&op.section_id),
                        String::new(),
                        op.order.unwrap_or(u32::MAX),
                    );
                    render_section(&placeholder, placeholder.order, &op.content)
                }
            };
            match op.order {
                Some(order) => {
                    let at = blocks
                        .iter()
                        .position(|(o, _)| *o >= order)
                        .unwrap_or(blocks.len());
                    blocks.insert(at, (order, html));
                }
                None => blocks.push((u32::MAX, html)),
            }
        }

        blocks.into_iter().map(|(_, html)| html).collect()
    }
}

fn render_section(section: &Section, order: u32, body: &str) -> String {
    let mut out = String::with_capacity(body.len() + 160);
    let _ = write!(
        out,
        "<section class=\"report-section section-{}\" id=\"{}\" data-order=\"{order}\">\n<h2>{}</h2>\n",
        section.kind,
        escape(&section.id),
        escape(&section.title),
    );
    out.push_str(body);
    if !body.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("</section>\n");
    out
}
