//! HTML fragment builders and number formatting for section bodies.

use std::collections::BTreeMap;
use std::fmt::Write;

/// Escape text for use in element content or a double-quoted attribute.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn heading(text: &str) -> String {
    format!("<h3>{}</h3>\n", escape(text))
}

pub fn paragraph(text: &str) -> String {
    format!("<p>{}</p>\n", escape(text))
}

/// `tone` is one of `positive`, `negative`, `neutral` or `note`.
pub fn callout(tone: &str, text: &str) -> String {
    format!(
        "<aside class=\"callout callout-{tone}\">{}</aside>\n",
        escape(text)
    )
}

pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut out = String::from("<table class=\"data-table\">\n<thead><tr>");
    for h in headers {
        let _ = write!(out, "<th>{}</th>", escape(h));
    }
    out.push_str("</tr></thead>\n<tbody>\n");
    for row in rows {
        out.push_str("<tr>");
        for cell in row {
            let _ = write!(out, "<td>{}</td>", escape(cell));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</tbody>\n</table>\n");
    out
}

/// Key figures rendered as a row of cards.
pub fn metric_cards(cards: &[(String, String)]) -> String {
    let mut out = String::from("<div class=\"metric-cards\">\n");
    for (label, value) in cards {
        let _ = writeln!(
            out,
            "<div class=\"metric-card\"><span class=\"metric-label\">{}</span><span class=\"metric-value\">{}</span></div>",
            escape(label),
            escape(value)
        );
    }
    out.push_str("</div>\n");
    out
}

/// A chart placeholder carrying its series as a JSON data attribute.
pub fn chart(chart_type: &str, caption: &str, series: &BTreeMap<String, Vec<f64>>) -> String {
    let data = serde_json::to_string(series).unwrap_or_else(|_| "{}".into());
    format!(
        "<figure class=\"chart chart-{chart_type}\">\n<div class=\"chart-canvas\" data-chart=\"{chart_type}\" data-series=\"{}\"></div>\n<figcaption>{}</figcaption>\n</figure>\n",
        escape(&data),
        escape(caption)
    )
}

// ── Formatting ────────────────────────────────────────────────────────────

pub fn money(value: f64) -> String {
    format!("${value:.2}")
}

/// Signed percentage, e.g. `+1.25%`.
pub fn pct(value: f64) -> String {
    format!("{value:+.2}%")
}

/// Market capitalization given in billions.
pub fn cap(billions: f64) -> String {
    if billions >= 1000.0 {
        format!("${:.2}T", billions / 1000.0)
    } else {
        format!("${billions:.1}B")
    }
}

pub fn volume(shares: u64) -> String {
    let v = shares as f64;
    if v >= 1e9 {
        format!("{:.2}B", v / 1e9)
    } else if v >= 1e6 {
        format!("{:.1}M", v / 1e6)
    } else if v >= 1e3 {
        format!("{:.1}K", v / 1e3)
    } else {
        shares.to_string()
    }
}

pub fn number(value: f64) -> String {
    format!("{value:.2}")
}
