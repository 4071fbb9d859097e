//! Region resolution: turn a caption box into a crop rectangle.
//!
//! There is no layout tree to consult, so the crop is a fixed-geometry guess
//! anchored on the caption:
//!
//! | Kind   | Mode     | Horizontal      | Vertical                                   |
//! |--------|----------|-----------------|--------------------------------------------|
//! | Figure | blind    | 8 %–92 % of W   | `max(0, y0−500)` … `min(H, y1+30)`         |
//! | Figure | targeted | 5 %–95 % of W   | `max(0, y0−500)` … `y1+20`                 |
//! | Table  | blind    | 8 %–92 % of W   | `max(0, y0−20)` … `min(H, y1+400)`         |
//! | Table  | targeted | 5 %–95 % of W   | keyword anchor (below) … `y1+20`           |
//!
//! Targeted tables look for column-header words (`Model`, `Method`, `Task`,
//! `Dataset`) within 500pt above the caption; the highest one, less a 20pt
//! margin, becomes the top edge. Without a keyword the top is `y0−300`.
//!
//! Targeted rectangles may extend past the page bottom; the renderer clamps
//! every rectangle to the page before rasterising.

use super::caption::{CaptionKind, CaptionMatch};
use crate::document::{DocumentAccess, PageSize, Rect};
use crate::error::PdfFigError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which heuristic family to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractionMode {
    /// Full-document caption scan.
    Blind,
    /// Directive-driven lookup.
    Targeted,
}

/// Column-header words used to find the top of a table.
pub const TABLE_KEYWORDS: [&str; 4] = ["Model", "Method", "Task", "Dataset"];

const FIGURE_REACH_ABOVE: f32 = 500.0;
const KEYWORD_WINDOW: f32 = 500.0;
const KEYWORD_MARGIN: f32 = 20.0;
const TABLE_DEFAULT_REACH: f32 = 300.0;

fn horizontal_bounds(mode: ExtractionMode, width: f32) -> (f32, f32) {
    match mode {
        ExtractionMode::Blind => (width * 0.08, width * 0.92),
        ExtractionMode::Targeted => (width * 0.05, width * 0.95),
    }
}

/// Blind-mode crop, already inside the page.
pub fn resolve_blind(kind: CaptionKind, caption: &Rect, size: PageSize) -> Rect {
    let (x0, x1) = horizontal_bounds(ExtractionMode::Blind, size.width);
    let (y0, y1) = match kind {
        CaptionKind::Figure => (
            (caption.y0 - FIGURE_REACH_ABOVE).max(0.0),
            (caption.y1 + 30.0).min(size.height),
        ),
        CaptionKind::Table => (
            (caption.y0 - 20.0).max(0.0),
            (caption.y1 + 400.0).min(size.height),
        ),
    };
    Rect::new(x0, y0, x1, y1)
}

/// Targeted-mode crop. Only the top edge is floored at zero.
///
/// `keyword_tops` are the top coordinates of every table keyword occurrence
/// on the page; ignored for figures.
pub fn resolve_targeted(
    kind: CaptionKind,
    caption: &Rect,
    size: PageSize,
    keyword_tops: &[f32],
) -> Rect {
    let (x0, x1) = horizontal_bounds(ExtractionMode::Targeted, size.width);
    let y0 = match kind {
        CaptionKind::Figure => (caption.y0 - FIGURE_REACH_ABOVE).max(0.0),
        CaptionKind::Table => table_top(caption.y0, keyword_tops).max(0.0),
    };
    Rect::new(x0, y0, x1, caption.y1 + 20.0)
}

/// Top edge of a table whose caption starts at `caption_y0`.
pub fn table_top(caption_y0: f32, keyword_tops: &[f32]) -> f32 {
    let window_start = caption_y0 - KEYWORD_WINDOW;
    keyword_tops
        .iter()
        .copied()
        .filter(|&y| y > window_start && y < caption_y0)
        .reduce(f32::min)
        .map(|y| y - KEYWORD_MARGIN)
        .unwrap_or(caption_y0 - TABLE_DEFAULT_REACH)
}

/// Tops of all [`TABLE_KEYWORDS`] occurrences on a page.
pub fn table_keyword_tops(
    doc: &dyn DocumentAccess,
    page_index: usize,
) -> Result<Vec<f32>, PdfFigError> {
    let mut tops = Vec::new();
    for keyword in TABLE_KEYWORDS {
        tops.extend(doc.search_text(page_index, keyword)?.iter().map(|r| r.y0));
    }
    Ok(tops)
}

/// Resolve a located caption into a crop rectangle for `mode`.
pub fn resolve_region(
    doc: &dyn DocumentAccess,
    caption: &CaptionMatch,
    mode: ExtractionMode,
) -> Result<Rect, PdfFigError> {
    let size = doc.page_size(caption.page_index)?;
    let region = match mode {
        ExtractionMode::Blind => resolve_blind(caption.kind, &caption.bounds, size),
        ExtractionMode::Targeted => {
            let tops = match caption.kind {
                CaptionKind::Table => table_keyword_tops(doc, caption.page_index)?,
                CaptionKind::Figure => Vec::new(),
            };
            resolve_targeted(caption.kind, &caption.bounds, size, &tops)
        }
    };
    debug!(
        "{} {} on page {}: caption {:?} → region {:?}",
        caption.kind,
        caption.identifier,
        caption.page_index + 1,
        caption.bounds,
        region
    );
    Ok(region)
}
