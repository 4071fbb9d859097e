//! Caption location: find "Figure 3:" / "Fig. 3." / "Table IV." on a page.
//!
//! Two strategies, one per extraction mode:
//!
//! * **Scan** ([`scan_captions`]) — blind mode. Run every pattern in
//!   [`CAPTION_PATTERNS`] over the page text and report each
//!   `(kind, identifier, offset)`. The caption's bounding box is then looked
//!   up with [`locate_occurrence`].
//! * **Lookup** ([`locate_caption`]) — targeted mode. The kind and identifier
//!   are already known from a directive, so a literal search for
//!   `"Figure 1"`, `"Figure 1:"`, `"Figure 1."` is enough.
//!
//! Neither strategy raises on a miss: absence is `Ok(None)` and the caller
//! records the item as not found.

use crate::document::{DocumentAccess, Rect};
use crate::error::PdfFigError;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// What a caption labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CaptionKind {
    Figure,
    Table,
}

impl CaptionKind {
    /// Normalise a caption word: `Figure`, `FIGURE`, `Fig.`, `fig` → Figure.
    pub fn parse(word: &str) -> Option<Self> {
        let w = word.trim().trim_end_matches('.').to_ascii_lowercase();
        match w.as_str() {
            "figure" | "fig" => Some(CaptionKind::Figure),
            "table" => Some(CaptionKind::Table),
            _ => None,
        }
    }

    /// Canonical caption word, as used in search terms.
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptionKind::Figure => "Figure",
            CaptionKind::Table => "Table",
        }
    }

    /// Lower-case form, as used in file names.
    pub fn slug(&self) -> &'static str {
        match self {
            CaptionKind::Figure => "figure",
            CaptionKind::Table => "table",
        }
    }
}

impl fmt::Display for CaptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A caption found in page text, before its box is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionOccurrence {
    pub kind: CaptionKind,
    pub identifier: String,
    /// Byte offset of the match in the page text.
    pub offset: usize,
    /// The matched text, e.g. `"Fig. 3."`.
    pub text: String,
}

/// A caption with its position on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionMatch {
    pub kind: CaptionKind,
    pub identifier: String,
    pub page_index: usize,
    pub bounds: Rect,
    pub raw_match_text: String,
}

// Identifier: digits, or an upper-case roman numeral built from I, V and X
// (case-sensitive even under `(?i)`). Same set as the directive grammar, so
// appendix labels like "Figure C.1:" are not read as roman numerals.
const IDENTIFIER: &str = r"(\d+|(?-i:[IVX]+))";

/// Recognised caption variants per kind, compiled once.
pub static CAPTION_PATTERNS: Lazy<Vec<(CaptionKind, Regex)>> = Lazy::new(|| {
    let variants: [(CaptionKind, &str); 3] = [
        (CaptionKind::Figure, r"Figure"),
        (CaptionKind::Figure, r"Fig\."),
        (CaptionKind::Table, r"Table"),
    ];
    variants
        .iter()
        .map(|(kind, word)| {
            let pattern = format!(r"(?i)\b{word}\s+{IDENTIFIER}\s*[:.]");
            (*kind, Regex::new(&pattern).unwrap())
        })
        .collect()
});

/// Every caption-like occurrence on a page, in pattern order.
///
/// Callers that need one entry per item run the result through
/// [`crate::pipeline::dedup::dedup_page`].
pub fn scan_captions(text: &str) -> Vec<CaptionOccurrence> {
    CAPTION_PATTERNS
        .iter()
        .flat_map(|(kind, re)| scan_with(*kind, re, text))
        .collect()
}

/// Caption occurrences of a single kind, in reading order.
pub fn scan_captions_of(text: &str, kind: CaptionKind) -> Vec<CaptionOccurrence> {
    let mut found: Vec<CaptionOccurrence> = CAPTION_PATTERNS
        .iter()
        .filter(|(k, _)| *k == kind)
        .flat_map(|(k, re)| scan_with(*k, re, text))
        .collect();
    found.sort_by_key(|o| o.offset);
    found
}

fn scan_with(kind: CaptionKind, re: &Regex, text: &str) -> Vec<CaptionOccurrence> {
    re.captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(CaptionOccurrence {
                kind,
                identifier: caps[1].to_string(),
                offset: whole.start(),
                text: whole.as_str().to_string(),
            })
        })
        .collect()
}

/// Find the bounding box of a scanned occurrence.
///
/// The page is searched for the occurrence's exact text. If the same text
/// appears earlier on the page (a prose reference ending in a full stop,
/// say), the hit with the matching rank is used so the box belongs to the
/// occurrence at `offset`; when the search engine reports fewer hits, the
/// first one is used.
pub fn locate_occurrence(
    doc: &dyn DocumentAccess,
    page_index: usize,
    page_text: &str,
    occurrence: &CaptionOccurrence,
) -> Result<Option<CaptionMatch>, PdfFigError> {
    let hits = doc.search_text(page_index, &occurrence.text)?;
    if hits.is_empty() {
        return Ok(None);
    }

    let rank = occurrence_rank(page_text, &occurrence.text, occurrence.offset);
    let bounds = hits.get(rank).copied().unwrap_or(hits[0]);
    debug!(
        "Page {}: '{}' at offset {} → rank {} of {} hits",
        page_index + 1,
        occurrence.text,
        occurrence.offset,
        rank,
        hits.len()
    );

    Ok(Some(CaptionMatch {
        kind: occurrence.kind,
        identifier: occurrence.identifier.clone(),
        page_index,
        bounds,
        raw_match_text: occurrence.text.clone(),
    }))
}

/// Number of case-insensitive occurrences of `needle` in `text[..offset]`.
fn occurrence_rank(text: &str, needle: &str, offset: usize) -> usize {
    // Counted on the original text: lowercasing can change byte lengths.
    let head = match text.get(..offset) {
        Some(h) => h,
        None => return 0,
    };
    match RegexBuilder::new(&regex::escape(needle))
        .case_insensitive(true)
        .build()
    {
        Ok(re) => re.find_iter(head).count(),
        Err(_) => 0,
    }
}

/// Search terms tried, in order, for a known kind and identifier.
pub fn search_terms(kind: CaptionKind, identifier: &str) -> [String; 3] {
    let base = format!("{} {}", kind.as_str(), identifier);
    [base.clone(), format!("{base}:"), format!("{base}.")]
}

/// Targeted lookup: the first hit of the first search term that matches.
pub fn locate_caption(
    doc: &dyn DocumentAccess,
    page_index: usize,
    kind: CaptionKind,
    identifier: &str,
) -> Result<Option<CaptionMatch>, PdfFigError> {
    for term in search_terms(kind, identifier) {
        let hits = doc.search_text(page_index, &term)?;
        if let Some(bounds) = hits.first() {
            debug!("Page {}: found '{}' at {:?}", page_index + 1, term, bounds);
            return Ok(Some(CaptionMatch {
                kind,
                identifier: identifier.to_string(),
                page_index,
                bounds: *bounds,
                raw_match_text: term,
            }));
        }
    }
    Ok(None)
}
