// src/tools/report.rs
// Best-effort section extraction for generated reports

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Section labels, English or Chinese, followed by a colon.
/// Tolerates markdown emphasis around the label (`**FINDINGS:**`, `**Findings**:`).
static SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    // SAFETY: This is a static literal regex pattern; compilation cannot fail.
    #[allow(clippy::expect_used)]
    Regex::new(
        r"(?i)(?:\b(findings|impressions?|recommendations?)\b|(检查发现|诊断印象|建议))[ \t]*(?:\*\*)?[ \t]*[:：][ \t]*(?:\*\*)?",
    )
    .expect("report section regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Findings,
    Impression,
    Recommendation,
}

impl Section {
    pub const ALL: [Section; 3] = [Section::Findings, Section::Impression, Section::Recommendation];

    fn from_label(label: &str) -> Option<Self> {
        let lower = label.to_lowercase();
        if lower.starts_with("finding") || label == "检查发现" {
            Some(Self::Findings)
        } else if lower.starts_with("impression") || label == "诊断印象" {
            Some(Self::Impression)
        } else if lower.starts_with("recommendation") || label == "建议" {
            Some(Self::Recommendation)
        } else {
            None
        }
    }
}

/// Sections found in a report. The raw text stays the authoritative payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSections {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub findings: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    /// Expected sections that were not found
    pub missing: Vec<Section>,
}

impl ReportSections {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn get(&self, section: Section) -> Option<&str> {
        match section {
            Section::Findings => self.findings.as_deref(),
            Section::Impression => self.impression.as_deref(),
            Section::Recommendation => self.recommendation.as_deref(),
        }
    }

    fn slot(&mut self, section: Section) -> &mut Option<String> {
        match section {
            Section::Findings => &mut self.findings,
            Section::Impression => &mut self.impression,
            Section::Recommendation => &mut self.recommendation,
        }
    }
}

/// Split report text into findings / impression / recommendation.
///
/// Each section body runs until the next recognised label. The first
/// occurrence of a label wins; empty bodies count as missing.
pub fn parse_sections(text: &str) -> ReportSections {
    let marks: Vec<(Section, usize, usize)> = SECTION_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let label = caps.get(1).or_else(|| caps.get(2))?;
            Section::from_label(label.as_str()).map(|s| (s, whole.start(), whole.end()))
        })
        .collect();

    let mut sections = ReportSections::default();
    for (i, (section, _, body_start)) in marks.iter().enumerate() {
        let body_end = marks.get(i + 1).map(|(_, start, _)| *start).unwrap_or(text.len());
        let body = clean_body(&text[*body_start..body_end]);
        let slot = sections.slot(*section);
        if slot.is_none() && !body.is_empty() {
            *slot = Some(body);
        }
    }

    sections.missing = Section::ALL
        .into_iter()
        .filter(|s| sections.get(*s).is_none())
        .collect();
    sections
}

fn clean_body(raw: &str) -> String {
    raw.trim_matches(|c: char| c.is_whitespace() || c == '*' || c == '#')
        .to_string()
}
