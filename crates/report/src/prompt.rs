//! Prompts for external generation, and parsing of what comes back.
//!
//! The prompt carries a compact JSON summary of the report (not the report
//! itself), the last few requests, and an output contract: the model must
//! answer with delimited blocks, one operation each.
//!
//! ```text
//! <<<ENHANCEMENT
//! {"action": "add", "section": "esg-summary", "content": "<p>…</p>"}
//! ENHANCEMENT>>>
//! ```

use std::sync::LazyLock;

use folio_core::{BlockError, Context, SectionAction, SectionOperation};
use regex_lite::Regex;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

pub const BLOCK_OPEN: &str = "<<<ENHANCEMENT";
pub const BLOCK_CLOSE: &str = "ENHANCEMENT>>>";

/// Requests quoted back to the model.
pub const RECENT_PROMPTS: usize = 3;

static NON_SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("slug pattern is valid"));

// ── Building ──────────────────────────────────────────────────────────────

/// Minified JSON summary of the report state.
pub fn context_summary(context: &Context) -> String {
    let state = &context.state;
    let sections: Vec<_> = state
        .visible_sections()
        .into_iter()
        .map(|s| json!({ "id": s.id, "kind": s.kind, "title": s.title }))
        .collect();

    json!({
        "assets": state.assets,
        "reportType": state.report_type,
        "timeframe": state.timeframe,
        "layout": state.layout,
        "sections": sections,
        "lastEnhancement": context.last_enhancement().map(|e| e.prompt.as_str()),
        "cachedPrices": context.data_cache.prices,
    })
    .to_string()
}

/// Prompt asking an external generator for incremental section operations.
pub fn build_prompt(context: &Context, new_prompt: &str) -> String {
    let mut prompt = String::from(
        "You are extending an existing financial analysis report. \
Do not regenerate the report; describe only the changes.\n\n",
    );

    prompt.push_str("## Report context\n");
    prompt.push_str(&context_summary(context));
    prompt.push_str("\n\n");

    let recent = context.recent_prompts(RECENT_PROMPTS);
    if !recent.is_empty() {
        prompt.push_str("## Recent requests (oldest first)\n");
        for (i, p) in recent.iter().enumerate() {
            prompt.push_str(&format!("{}. {}\n", i + 1, p));
        }
        prompt.push('\n');
    }

    prompt.push_str("## New request\n");
    prompt.push_str(new_prompt.trim());
    prompt.push_str("\n\n");

    prompt.push_str("## Output format\n");
    prompt.push_str("Answer with one or more blocks, each holding a single JSON object:\n");
    prompt.push_str(BLOCK_OPEN);
    prompt.push_str(
        "\n{\"action\": \"add|update|replace|remove\", \"section\": \"<section id>\", \"content\": \"<HTML fragment>\"}\n",
    );
    prompt.push_str(BLOCK_CLOSE);
    prompt.push_str(
        "\n\n- \"add\" creates a section; choose a short kebab-case id and optionally an integer \"order\" (0 = first).\n\
- \"update\" and \"replace\" must name a section id listed in the report context.\n\
- \"remove\" needs no content.\n\
- Text outside the blocks is ignored.\n",
    );
    prompt
}

// ── Parsing ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawBlock {
    action: String,
    section: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    order: Option<u32>,
}

/// Operations recovered from generated text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockExtraction {
    pub operations: Vec<SectionOperation>,
    /// Blocks that were malformed or never closed.
    pub skipped: usize,
}

/// Lowercase kebab-case id; `None` when nothing usable remains.
fn normalize_section_id(raw: &str) -> Option<String> {
    let lowered = raw.to_lowercase();
    let id = NON_SLUG_RE.replace_all(&lowered, "-");
    let id = id.trim_matches('-');
    (!id.is_empty()).then(|| id.to_string())
}

fn parse_block(index: usize, body: &str) -> Result<SectionOperation, BlockError> {
    let malformed = |reason: String| BlockError::Malformed { index, reason };

    let raw: RawBlock = serde_json::from_str(body).map_err(|e| malformed(e.to_string()))?;
    let action: SectionAction = raw.action.parse().map_err(malformed)?;
    let section_id = normalize_section_id(&raw.section)
        .ok_or_else(|| malformed("section id is empty".into()))?;
    if action != SectionAction::Remove && raw.content.trim().is_empty() {
        return Err(malformed(format!("{action} requires content")));
    }

    Ok(SectionOperation {
        section_id,
        action,
        content: raw.content,
        order: raw.order,
    })
}

/// Extract section operations from generated text. Malformed or
/// unterminated blocks are logged and counted, never fatal; each block is
/// judged on its own.
pub fn parse_enhancement_blocks(text: &str) -> BlockExtraction {
    let mut extraction = BlockExtraction::default();

    for (index, segment) in text.split(BLOCK_OPEN).skip(1).enumerate() {
        let Some(end) = segment.find(BLOCK_CLOSE) else {
            warn!(index, "Skipping unterminated enhancement block");
            extraction.skipped += 1;
            continue;
        };
        match parse_block(index, segment[..end].trim()) {
            Ok(op) => extraction.operations.push(op),
            Err(e) => {
                warn!(error = %e, "Skipping enhancement block");
                extraction.skipped += 1;
            }
        }
    }
    extraction
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::{Enhancement, ReportType, Section, SectionKind, StateDefaults};

    fn context() -> Context {
        let mut ctx = Context::new("conv", "Analyze AAPL", &StateDefaults::default());
        ctx.state.report_type = Some(ReportType::Single);
        ctx.state.assets.insert("AAPL");
        ctx.state.sections = vec![Section::new(
            "main-analysis",
            SectionKind::Text,
            "Analysis Overview",
            "<p>a very long body that must not leak into the prompt</p>",
            0,
        )];
        ctx.data_cache.prices.insert("AAPL".into(), 189.84);
        for p in ["Analyze AAPL", "Add technical indicators", "Compare with MSFT", "show me 5 year trends"] {
            ctx.enhancements.push(Enhancement::new("e", p));
        }
        ctx
    }

    #[test]
    fn summary_is_minified_json() {
        let summary = context_summary(&context());
        let value: serde_json::Value = serde_json::from_str(&summary).unwrap();
        assert_eq!(value["assets"][0], "AAPL");
        assert_eq!(value["reportType"], "single");
        assert_eq!(value["sections"][0]["id"], "main-analysis");
        assert_eq!(value["lastEnhancement"], "show me 5 year trends");
        assert_eq!(value["cachedPrices"]["AAPL"], 189.84);
        assert!(!summary.contains('\n'));
        assert!(!summary.contains("very long body"));
    }

    #[test]
    fn prompt_quotes_last_three_requests() {
        let prompt = build_prompt(&context(), "Add ESG scores");
        assert!(!prompt.contains("1. Analyze AAPL"));
        assert!(prompt.contains("1. Add technical indicators"));
        assert!(prompt.contains("3. show me 5 year trends"));
        assert!(prompt.contains("## New request\nAdd ESG scores"));
        assert!(prompt.contains(BLOCK_OPEN));
        assert!(prompt.contains(BLOCK_CLOSE));
    }

    #[test]
    fn parses_valid_blocks_and_skips_bad_ones() {
        let text = r#"Sure! Here are the changes.
<<<ENHANCEMENT
{"action": "add", "section": "ESG Summary", "content": "<p>esg</p>", "order": 1}
ENHANCEMENT>>>
<<<ENHANCEMENT
{"action": "explode", "section": "x", "content": "y"}
ENHANCEMENT>>>
<<<ENHANCEMENT
not json at all
ENHANCEMENT>>>
<<<ENHANCEMENT
{"action": "remove", "section": "price-performance"}
ENHANCEMENT>>>
<<<ENHANCEMENT
{"action": "replace", "section": "main-analysis", "content": "  "}
ENHANCEMENT>>>
Hope that helps."#;

        let extraction = parse_enhancement_blocks(text);
        assert_eq!(extraction.skipped, 3);
        assert_eq!(
            extraction.operations,
            vec![
                SectionOperation::add("esg-summary", "<p>esg</p>", Some(1)),
                SectionOperation::remove("price-performance"),
            ]
        );
    }

    #[test]
    fn unterminated_block_is_counted() {
        let text = "<<<ENHANCEMENT\n{\"action\":\"remove\",\"section\":\"a\"}\nENHANCEMENT>>>\n<<<ENHANCEMENT\n{\"action\":\"remove\"";
        let extraction = parse_enhancement_blocks(text);
        assert_eq!(extraction.operations.len(), 1);
        assert_eq!(extraction.skipped, 1);
    }

    #[test]
    fn unterminated_block_does_not_swallow_the_next_one() {
        let text = "<<<ENHANCEMENT\n{\"action\":\"remove\"\n\n<<<ENHANCEMENT\n{\"action\":\"add\",\"section\":\"esg\",\"content\":\"<p>e</p>\"}\nENHANCEMENT>>>";
        let extraction = parse_enhancement_blocks(text);
        assert_eq!(extraction.skipped, 1);
        assert_eq!(
            extraction.operations,
            vec![SectionOperation::add("esg", "<p>e</p>", None)]
        );
    }

    #[test]
    fn stray_closer_is_ignored() {
        let text = "ENHANCEMENT>>>\n<<<ENHANCEMENT{\"action\":\"remove\",\"section\":\"a\"}ENHANCEMENT>>>";
        let extraction = parse_enhancement_blocks(text);
        assert_eq!(extraction.operations, vec![SectionOperation::remove("a")]);
        assert_eq!(extraction.skipped, 0);
    }

    #[test]
    fn no_blocks_is_empty() {
        assert_eq!(parse_enhancement_blocks("nothing to see"), BlockExtraction::default());
    }

    #[test]
    fn action_aliases_are_accepted() {
        let text = "<<<ENHANCEMENT{\"action\":\"Modify\",\"section\":\"main-analysis\",\"content\":\"<p>m</p>\"}ENHANCEMENT>>>";
        let extraction = parse_enhancement_blocks(text);
        assert_eq!(extraction.operations[0].action, SectionAction::Update);
    }

    #[test]
    fn section_ids_are_normalized() {
        assert_eq!(normalize_section_id("  Risk / Reward "), Some("risk-reward".into()));
        assert_eq!(normalize_section_id("---"), None);
    }
}
