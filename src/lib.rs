//! # edgequake-pdffig
//!
//! Extract figures and tables from PDF papers as PNG images, either by
//! scanning every caption or by following directives embedded in an article
//! draft.
//!
//! ## Why captions?
//!
//! Research PDFs rarely expose figures as standalone objects: a chart is a
//! mix of vector paths, text and embedded bitmaps, and a table is just text.
//! The caption (`Figure 3:`, `Table II.`) is the one reliable anchor, so this
//! crate finds the caption, guesses the surrounding region with fixed
//! geometry, and rasterises that region through pdfium.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF (+ markdown draft)
//!  │
//!  ├─ 1. Input       validate paths, %PDF magic, read the draft
//!  ├─ 2. Directives  parse **【配图建议：第N页，Figure K - …】** (targeted mode)
//!  ├─ 3. Captions    scan page text / search for "Figure K" and get its box
//!  ├─ 4. Dedup       one caption per (kind, identifier) per page (blind mode)
//!  ├─ 5. Region      caption box → crop rectangle, clamped to the page
//!  ├─ 6. Render      rasterise via pdfium (spawn_blocking), save PNG atomically
//!  └─ 7. Output      reference list (blind) or rewritten markdown (targeted)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdffig::{extract_annotated, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::builder()
//!         .output_dir("images")
//!         .prefix("T5")
//!         .build()?;
//!     let out = extract_annotated("t5.pdf", "T5论文_解读.md", &config).await?;
//!     eprintln!(
//!         "{} of {} directives replaced",
//!         out.embeds.len(),
//!         out.manifest.stats.total_items
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdffig` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdffig = { version = "0.1", default-features = false }
//! ```
//!
//! ## pdfium
//!
//! The default backend chain binds pdfium from `PDFIUM_LIB_PATH` (a
//! directory or the library file itself) or the working directory, then
//! falls back to the system library. Supply your own chain with
//! [`ExtractionConfigBuilder::backends`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder};
pub use document::{
    default_backends, DocumentAccess, DocumentBackend, DocumentEngine, InMemoryDocument,
    InMemoryPage, PageSize, PdfiumBackend, Rect,
};
pub use error::{ItemError, PdfFigError};
pub use extract::{
    extract_all, extract_all_from, extract_all_sync, extract_annotated, extract_annotated_from,
    extract_annotated_sync,
};
pub use output::{
    AnnotatedOutput, EmbedRecord, ExtractionItem, ExtractionManifest, ExtractionStats, ItemStatus,
};
pub use pipeline::annotation::{parse_directives, AnnotationDirective};
pub use pipeline::caption::{CaptionKind, CaptionMatch};
pub use pipeline::region::ExtractionMode;
pub use pipeline::render::derive_prefix;
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
