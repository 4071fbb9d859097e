//! In-memory documents built from positioned text lines.
//!
//! Useful when the text layout is already known (a previous extraction, a
//! fixture) and for exercising the caption heuristics without pdfium.
//! Rasterisation yields a white image of the requested pixel size, so the
//! whole pipeline — including file output — runs unchanged.

use super::{DocumentAccess, DocumentEngine, PageSize, Rect};
use crate::error::PdfFigError;
use image::{DynamicImage, Rgba, RgbaImage};
use std::path::Path;

/// A single line of text placed on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub bounds: Rect,
}

/// One synthetic page.
#[derive(Debug, Clone, PartialEq)]
pub struct InMemoryPage {
    size: PageSize,
    lines: Vec<TextLine>,
}

impl InMemoryPage {
    /// An empty page of `width × height` points.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            size: PageSize::new(width, height),
            lines: Vec::new(),
        }
    }

    /// Add a line whose box starts at `(x, y)` (top-left), 10pt tall, with a
    /// width of 5pt per character.
    pub fn with_line(self, text: impl Into<String>, x: f32, y: f32) -> Self {
        let text = text.into();
        let width = text.chars().count() as f32 * 5.0;
        self.with_line_at(text, Rect::new(x, y, x + width, y + 10.0))
    }

    /// Add a line with an explicit bounding box.
    pub fn with_line_at(mut self, text: impl Into<String>, bounds: Rect) -> Self {
        self.lines.push(TextLine {
            text: text.into(),
            bounds,
        });
        self
    }

    pub fn lines(&self) -> &[TextLine] {
        &self.lines
    }
}

/// A document whose pages are held in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InMemoryDocument {
    pages: Vec<InMemoryPage>,
}

impl InMemoryDocument {
    pub fn from_pages(pages: Vec<InMemoryPage>) -> Self {
        Self { pages }
    }

    /// `count` blank US-letter pages.
    pub fn blank(count: usize) -> Self {
        Self::from_pages(vec![InMemoryPage::new(612.0, 792.0); count])
    }

    /// Replace page `index` (0-based). Out-of-range indices are ignored.
    pub fn with_page(mut self, index: usize, page: InMemoryPage) -> Self {
        if let Some(slot) = self.pages.get_mut(index) {
            *slot = page;
        }
        self
    }

    fn page(&self, index: usize) -> Result<&InMemoryPage, PdfFigError> {
        self.pages.get(index).ok_or(PdfFigError::PageOutOfRange {
            page: index + 1,
            total: self.pages.len(),
        })
    }
}

impl DocumentAccess for InMemoryDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, page: usize) -> Result<String, PdfFigError> {
        let page = self.page(page)?;
        Ok(page
            .lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn search_text(&self, page: usize, term: &str) -> Result<Vec<Rect>, PdfFigError> {
        let page = self.page(page)?;
        let needle = term.to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits = Vec::new();
        for line in &page.lines {
            let haystack = line.text.to_lowercase();
            let total_chars = haystack.chars().count().max(1) as f32;
            let char_width = line.bounds.width() / total_chars;

            for (byte_idx, _) in haystack.match_indices(&needle) {
                // Interpolate the horizontal extent from character positions.
                let start = haystack[..byte_idx].chars().count() as f32;
                let len = needle.chars().count() as f32;
                hits.push(Rect::new(
                    line.bounds.x0 + start * char_width,
                    line.bounds.y0,
                    line.bounds.x0 + (start + len) * char_width,
                    line.bounds.y1,
                ));
            }
        }
        Ok(hits)
    }

    fn page_size(&self, page: usize) -> Result<PageSize, PdfFigError> {
        Ok(self.page(page)?.size)
    }

    fn rasterize(
        &self,
        page: usize,
        region: &Rect,
        scale: f32,
    ) -> Result<DynamicImage, PdfFigError> {
        self.page(page)?;
        if region.is_empty() {
            return Err(PdfFigError::RasterisationFailed {
                page: page + 1,
                detail: format!("empty region {region:?}"),
            });
        }
        let width = (region.width() * scale).round().max(1.0) as u32;
        let height = (region.height() * scale).round().max(1.0) as u32;
        Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba([255, 255, 255, 255]),
        )))
    }
}

impl DocumentEngine for InMemoryDocument {
    fn open<'a>(&'a self, _path: &Path) -> Result<Box<dyn DocumentAccess + 'a>, PdfFigError> {
        Ok(Box::new(self))
    }
}
