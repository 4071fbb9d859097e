//! Annotation directives: the figure requests embedded in an article draft.
//!
//! A draft marks where an image should go with a bold inline marker:
//!
//! ```text
//! **【配图建议：第3页，Figure 1 - 展示T5的text-to-text统一框架】**
//! ```
//!
//! ("illustration suggestion: page 3, Figure 1 — description"). The marker
//! text is kept verbatim in [`AnnotationDirective::raw_text`] so the
//! rewriter can replace exactly that substring later.

use super::caption::CaptionKind;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One figure/table request parsed from markdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationDirective {
    /// 1-based page number as written in the directive.
    pub page_number: usize,
    pub kind: CaptionKind,
    pub identifier: String,
    pub description: String,
    /// The exact matched substring, bold markers included.
    pub raw_text: String,
}

impl AnnotationDirective {
    /// `"Figure 1"`, `"Table IV"`.
    pub fn label(&self) -> String {
        format!("{} {}", self.kind, self.identifier)
    }
}

static RE_DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\*\*【配图建议：第(\d+)页，(Figure|Table)\s*([0-9]+|[IVX]+)\s*-\s*([^】]+)】\*\*")
        .unwrap()
});

/// All directives in `markdown`, in document order.
///
/// A page number too large for `usize` is kept as `usize::MAX` so it is
/// reported as out of range rather than silently dropped.
pub fn parse_directives(markdown: &str) -> Vec<AnnotationDirective> {
    RE_DIRECTIVE
        .captures_iter(markdown)
        .filter_map(|caps| {
            let kind = CaptionKind::parse(&caps[2])?;
            Some(AnnotationDirective {
                page_number: caps[1].parse().unwrap_or(usize::MAX),
                kind,
                identifier: caps[3].to_string(),
                description: caps[4].trim().to_string(),
                raw_text: caps[0].to_string(),
            })
        })
        .collect()
}
