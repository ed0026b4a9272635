use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;

use crate::detection::Detection;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCount {
    pub name: String,
    pub count: usize,
}

/// Rows per class name, ascending by name.
pub fn summarize(log: &[Detection]) -> Vec<ClassCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for det in log {
        *counts.entry(det.class_name.as_str()).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(name, count)| ClassCount { name: name.to_string(), count })
        .collect()
}

const WIDTH: usize = 640;
const HEIGHT: usize = 400;
const MARGIN_LEFT: usize = 60;
const MARGIN_RIGHT: usize = 20;
const MARGIN_TOP: usize = 40;
const MARGIN_BOTTOM: usize = 80;

/// Renders the summary as a standalone SVG bar chart.
pub fn render_bar_chart(summary: &[ClassCount], source: &str) -> String {
    let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let base_y = MARGIN_TOP + plot_h;

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif" font-size="12">"#
    );
    let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="24" text-anchor="middle" font-size="15">Class counts in {}</text>"#,
        WIDTH / 2,
        escape(source)
    );

    // axes
    let _ = writeln!(
        svg,
        r#"<line x1="{MARGIN_LEFT}" y1="{MARGIN_TOP}" x2="{MARGIN_LEFT}" y2="{base_y}" stroke="black"/>"#
    );
    let _ = writeln!(
        svg,
        r#"<line x1="{MARGIN_LEFT}" y1="{base_y}" x2="{}" y2="{base_y}" stroke="black"/>"#,
        MARGIN_LEFT + plot_w
    );
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="middle">Class</text>"#,
        MARGIN_LEFT + plot_w / 2,
        HEIGHT - 10
    );
    let _ = writeln!(
        svg,
        r#"<text x="16" y="{0}" text-anchor="middle" transform="rotate(-90 16 {0})">Count</text>"#,
        MARGIN_TOP + plot_h / 2
    );

    let max = summary.iter().map(|c| c.count).max().unwrap_or(0);
    if max == 0 {
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="middle" fill="gray">no predictions</text>"#,
            MARGIN_LEFT + plot_w / 2,
            MARGIN_TOP + plot_h / 2
        );
        svg.push_str("</svg>\n");
        return svg;
    }

    let _ = writeln!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="end">{max}</text>"#,
        MARGIN_LEFT - 6,
        MARGIN_TOP + 4
    );
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="end">0</text>"#,
        MARGIN_LEFT - 6,
        base_y + 4
    );

    let slot = plot_w as f32 / summary.len() as f32;
    let bar_w = (slot * 0.7).max(1.0);
    for (i, c) in summary.iter().enumerate() {
        let h = c.count as f32 / max as f32 * plot_h as f32;
        let x = MARGIN_LEFT as f32 + slot * i as f32 + (slot - bar_w) / 2.0;
        let y = base_y as f32 - h;
        let cx = x + bar_w / 2.0;
        let _ = writeln!(
            svg,
            r##"<rect x="{x:.1}" y="{y:.1}" width="{bar_w:.1}" height="{h:.1}" fill="#1f77b4"><title>{}: {}</title></rect>"##,
            escape(&c.name),
            c.count
        );
        let _ = writeln!(
            svg,
            r#"<text x="{cx:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
            y - 4.0,
            c.count
        );
        let _ = writeln!(
            svg,
            r#"<text x="{cx:.1}" y="{0}" text-anchor="end" transform="rotate(-45 {cx:.1} {0})">{1}</text>"#,
            base_y + 14,
            escape(&c.name)
        );
    }

    svg.push_str("</svg>\n");
    svg
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
