//! Result types returned by the extraction entry points.

use crate::document::Rect;
use crate::error::ItemError;
use crate::pipeline::caption::CaptionKind;
use crate::pipeline::region::ExtractionMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Final state of one figure or table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemStatus {
    /// An image exists under `output_path` (rendered now or by an earlier run).
    Success,
    /// The caption could not be found on the page.
    NotFound,
    /// The directive names a page the document does not have.
    OutOfRange,
    /// The region was resolved but rasterising or saving failed.
    RenderFailed,
}

/// One extracted (or attempted) figure or table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionItem {
    pub kind: CaptionKind,
    pub identifier: String,
    /// 0-based page index.
    pub page_index: usize,
    /// Crop rectangle in page points, clipped to the page. `None` when the
    /// image was reused rather than rendered from this item.
    pub crop_region: Option<Rect>,
    /// Deterministic file name, set even when extraction failed.
    pub output_filename: String,
    /// Where the image lives; `None` unless `status` is `Success`.
    pub output_path: Option<PathBuf>,
    pub status: ItemStatus,
    pub error: Option<ItemError>,
    /// The image was already on disk and was not re-rendered.
    pub reused_existing: bool,
    /// Directive description (targeted mode only).
    pub description: Option<String>,
}

impl ExtractionItem {
    pub fn is_success(&self) -> bool {
        self.status == ItemStatus::Success
    }

    /// 1-based page number.
    pub fn page_number(&self) -> usize {
        self.page_index.saturating_add(1)
    }

    /// `"Figure 3"`, `"Table IV"`.
    pub fn label(&self) -> String {
        format!("{} {}", self.kind, self.identifier)
    }
}

/// Aggregate statistics for a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Pages in the document.
    pub total_pages: usize,
    /// Items attempted (captions found in blind mode, directives in targeted mode).
    pub total_items: usize,
    /// Images rendered during this run.
    pub rendered: usize,
    /// Images found from an earlier run and kept.
    pub reused: usize,
    pub not_found: usize,
    pub out_of_range: usize,
    pub render_failed: usize,
    pub total_duration_ms: u64,
}

impl ExtractionStats {
    /// Items that ended with an image on disk.
    pub fn succeeded(&self) -> usize {
        self.rendered + self.reused
    }

    /// Items that ended without one.
    pub fn failed(&self) -> usize {
        self.not_found + self.out_of_range + self.render_failed
    }

    pub(crate) fn record(&mut self, item: &ExtractionItem) {
        self.total_items += 1;
        match item.status {
            ItemStatus::Success if item.reused_existing => self.reused += 1,
            ItemStatus::Success => self.rendered += 1,
            ItemStatus::NotFound => self.not_found += 1,
            ItemStatus::OutOfRange => self.out_of_range += 1,
            ItemStatus::RenderFailed => self.render_failed += 1,
        }
    }
}

/// Ordered record of every item attempted in a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionManifest {
    pub mode: ExtractionMode,
    pub output_dir: PathBuf,
    pub items: Vec<ExtractionItem>,
    /// Blind mode: where the reference list was written, if anywhere.
    pub reference_list: Option<PathBuf>,
    pub stats: ExtractionStats,
}

impl ExtractionManifest {
    pub fn successes(&self) -> impl Iterator<Item = &ExtractionItem> {
        self.items.iter().filter(|i| i.is_success())
    }
}

/// A directive that was replaced by an image embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedRecord {
    /// The directive text as it appeared in the markdown.
    pub raw_text: String,
    /// Image path written into the embed.
    pub image_path: String,
}

/// Result of a targeted (directive-driven) run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedOutput {
    pub manifest: ExtractionManifest,
    /// Directive → image mapping, in document order.
    pub embeds: Vec<EmbedRecord>,
    /// Where the rewritten markdown was written.
    pub markdown_path: PathBuf,
    /// The rewritten markdown.
    #[serde(skip)]
    pub markdown: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(status: ItemStatus, reused: bool) -> ExtractionItem {
        ExtractionItem {
            kind: CaptionKind::Figure,
            identifier: "1".into(),
            page_index: 0,
            crop_region: None,
            output_filename: "figure1.png".into(),
            output_path: None,
            status,
            error: None,
            reused_existing: reused,
            description: None,
        }
    }

    #[test]
    fn stats_record_each_status() {
        let mut stats = ExtractionStats::default();
        for i in [
            item(ItemStatus::Success, false),
            item(ItemStatus::Success, true),
            item(ItemStatus::NotFound, false),
            item(ItemStatus::OutOfRange, false),
            item(ItemStatus::RenderFailed, false),
        ] {
            stats.record(&i);
        }
        assert_eq!(stats.total_items, 5);
        assert_eq!(stats.succeeded(), 2);
        assert_eq!(stats.failed(), 3);
        assert_eq!(stats.reused, 1);
    }

    #[test]
    fn item_label_and_page_number() {
        let mut i = item(ItemStatus::Success, false);
        i.kind = CaptionKind::Table;
        i.identifier = "IV".into();
        i.page_index = 2;
        assert_eq!(i.label(), "Table IV");
        assert_eq!(i.page_number(), 3);
    }
}
