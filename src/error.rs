//! Error types for the edgequake-pdffig library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PdfFigError`] — **Fatal**: the run cannot proceed at all (missing
//!   input file, no annotation directives, no usable pdfium backend).
//!   Returned as `Err(PdfFigError)` from the top-level `extract*` functions.
//!
//! * [`ItemError`] — **Non-fatal**: a single figure or table could not be
//!   extracted (caption not on the page, page out of range, rasterisation
//!   glitch) but every other item is fine. Stored inside
//!   [`crate::output::ExtractionItem`] so callers can inspect partial
//!   success rather than losing the whole document to one bad caption.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdffig library.
///
/// Item-level failures use [`ItemError`] and are stored in
/// [`crate::output::ExtractionItem`] rather than propagated here.
#[derive(Debug, Error)]
pub enum PdfFigError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// PDF or markdown input was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    MissingInputFile { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// The markdown file could not be read as UTF-8 text.
    #[error("Failed to read markdown '{path}': {source}")]
    MarkdownReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Targeted mode found no `**【配图建议：…】**` directive in the markdown.
    #[error(
        "No figure directives found in '{path}'\n\
Expected markers of the form **【配图建议：第3页，Figure 1 - description】**"
    )]
    NoDirectivesFound { path: PathBuf },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' could not be opened: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// A page index beyond the document length was requested.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium returned an error while reading or rendering a page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── Backend errors ────────────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error("Failed to bind to pdfium library: {0}")]
    PdfiumBindingFailed(String),

    /// Every configured backend failed to bind or to open the document.
    #[error(
        "No document backend available after {attempts} attempt(s).\nLast error: {last_error}\n\n\
pdffig needs the pdfium shared library. You can:\n\
  • Place libpdfium next to the working directory.\n\
  • Set PDFIUM_LIB_PATH=/dir/containing/libpdfium.\n\
  • Install pdfium system-wide.\n"
    )]
    RenderBackendUnavailable { attempts: usize, last_error: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output image, list, or markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single figure or table.
///
/// Stored alongside [`crate::output::ExtractionItem`] when an item fails.
/// The run continues with the next item.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum ItemError {
    /// The directive points at a page the document does not have.
    #[error("{label}: page {page} is out of range (document has {total} pages)")]
    PageOutOfRange {
        label: String,
        page: usize,
        total: usize,
    },

    /// None of the caption search terms matched on the page.
    #[error("{label}: caption not found on page {page}")]
    CaptionNotFound { label: String, page: usize },

    /// The region was resolved but rasterising or saving it failed.
    #[error("{label}: render failed on page {page}: {detail}")]
    RenderFailed {
        label: String,
        page: usize,
        detail: String,
    },
}
