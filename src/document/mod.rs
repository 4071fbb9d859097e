//! Document access: the only window the extractor has onto a PDF.
//!
//! Everything above this module talks to [`DocumentAccess`] — page count,
//! page text, text search with bounding boxes, page size, and rasterisation
//! of a rectangle. Concrete engines live in submodules:
//!
//! * [`pdfium`] — pdfium-render, bound either from an explicit directory or
//!   from the system library
//! * [`memory`] — synthetic pages with positioned text lines
//!
//! ## Coordinates
//!
//! All rectangles are in PDF points with a **top-left** origin and y growing
//! downwards, the way captions are reasoned about ("500pt above the
//! caption"). Engines with a bottom-left origin convert at the boundary.
//!
//! ## Backend selection
//!
//! Binding a PDF engine can fail at runtime (missing shared library, wrong
//! architecture). Rather than probing, callers inject an ordered list of
//! [`DocumentBackend`]s; [`with_document`] tries them in order and runs the
//! extraction against the first one that binds *and* opens the file.

pub mod memory;
pub mod pdfium;

use crate::error::PdfFigError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

pub use memory::{InMemoryDocument, InMemoryPage};
pub use pdfium::PdfiumBackend;

/// Maximum number of backends tried before a run is declared failed.
pub const MAX_BACKEND_ATTEMPTS: usize = 3;

/// An axis-aligned rectangle in page points (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// True when the rectangle encloses a positive area.
    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Clip to `[0, width] × [0, height]`.
    pub fn clamp_to(&self, size: PageSize) -> Rect {
        Rect {
            x0: self.x0.clamp(0.0, size.width),
            y0: self.y0.clamp(0.0, size.height),
            x1: self.x1.clamp(0.0, size.width),
            y1: self.y1.clamp(0.0, size.height),
        }
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

/// Page dimensions in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Read access to an opened PDF document.
///
/// Page indices are 0-based. Implementations return
/// [`PdfFigError::PageOutOfRange`] for indices `>= page_count()`.
pub trait DocumentAccess {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Plain text of a page in reading order.
    fn page_text(&self, page: usize) -> Result<String, PdfFigError>;

    /// Bounding boxes of every occurrence of `term` on the page, in reading
    /// order. Matching is case-insensitive.
    fn search_text(&self, page: usize, term: &str) -> Result<Vec<Rect>, PdfFigError>;

    /// Page dimensions in points.
    fn page_size(&self, page: usize) -> Result<PageSize, PdfFigError>;

    /// Rasterise `region` (already clipped to the page) at `scale` pixels per
    /// point.
    fn rasterize(&self, page: usize, region: &Rect, scale: f32)
        -> Result<DynamicImage, PdfFigError>;
}

impl<T: DocumentAccess + ?Sized> DocumentAccess for &T {
    fn page_count(&self) -> usize {
        (**self).page_count()
    }

    fn page_text(&self, page: usize) -> Result<String, PdfFigError> {
        (**self).page_text(page)
    }

    fn search_text(&self, page: usize, term: &str) -> Result<Vec<Rect>, PdfFigError> {
        (**self).search_text(page, term)
    }

    fn page_size(&self, page: usize) -> Result<PageSize, PdfFigError> {
        (**self).page_size(page)
    }

    fn rasterize(
        &self,
        page: usize,
        region: &Rect,
        scale: f32,
    ) -> Result<DynamicImage, PdfFigError> {
        (**self).rasterize(page, region, scale)
    }
}

/// A bound PDF engine that can open documents.
///
/// Opened documents may borrow the engine (pdfium documents do), hence the
/// lifetime on the returned trait object.
pub trait DocumentEngine {
    fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn DocumentAccess + 'a>, PdfFigError>;
}

/// A way of obtaining a [`DocumentEngine`]. Binding may fail at runtime.
pub trait DocumentBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Initialise the engine (load shared libraries etc.).
    fn bind(&self) -> Result<Box<dyn DocumentEngine>, PdfFigError>;
}

/// Default backend chain: pdfium from `PDFIUM_LIB_PATH` (or the working
/// directory), then the system pdfium library.
pub fn default_backends() -> Vec<Arc<dyn DocumentBackend>> {
    vec![
        Arc::new(PdfiumBackend::from_env_or_cwd()),
        Arc::new(PdfiumBackend::system()),
    ]
}

/// Open `path` with the first backend that binds and run `f` against it.
///
/// At most [`MAX_BACKEND_ATTEMPTS`] backends are tried. Only bind failures
/// move on to the next backend; an `open` error (e.g. [`PdfFigError::CorruptPdf`])
/// and errors returned by `f` are propagated unchanged.
pub fn with_document<T>(
    backends: &[Arc<dyn DocumentBackend>],
    path: &Path,
    f: impl FnOnce(&dyn DocumentAccess) -> Result<T, PdfFigError>,
) -> Result<T, PdfFigError> {
    let mut attempts = 0;
    let mut last_error = String::from("no backends configured");

    for backend in backends.iter().take(MAX_BACKEND_ATTEMPTS) {
        attempts += 1;

        let engine = match backend.bind() {
            Ok(engine) => engine,
            Err(e) => {
                warn!("Backend '{}' failed to initialise: {}", backend.name(), e);
                last_error = e.to_string();
                continue;
            }
        };

        // A bound engine that rejects the file says nothing about the
        // other backends; report the open error as-is.
        let document = engine.open(path)?;

        debug!(
            "Using backend '{}' ({} pages)",
            backend.name(),
            document.page_count()
        );
        return f(document.as_ref());
    }

    Err(PdfFigError::RenderBackendUnavailable {
        attempts,
        last_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct BrokenBackend {
        binds: Arc<AtomicUsize>,
    }

    impl DocumentBackend for BrokenBackend {
        fn name(&self) -> &str {
            "broken"
        }

        fn bind(&self) -> Result<Box<dyn DocumentEngine>, PdfFigError> {
            self.binds.fetch_add(1, Ordering::SeqCst);
            Err(PdfFigError::PdfiumBindingFailed("no library".into()))
        }
    }

    struct MemoryBackend;

    impl DocumentBackend for MemoryBackend {
        fn name(&self) -> &str {
            "memory"
        }

        fn bind(&self) -> Result<Box<dyn DocumentEngine>, PdfFigError> {
            Ok(Box::new(InMemoryDocument::from_pages(vec![
                InMemoryPage::new(612.0, 792.0),
                InMemoryPage::new(612.0, 792.0),
            ])))
        }
    }

    struct RejectingBackend {
        binds: Arc<AtomicUsize>,
    }

    struct RejectingEngine;

    impl DocumentEngine for RejectingEngine {
        fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn DocumentAccess + 'a>, PdfFigError> {
            Err(PdfFigError::CorruptPdf {
                path: path.to_path_buf(),
                detail: "bad xref".into(),
            })
        }
    }

    impl DocumentBackend for RejectingBackend {
        fn name(&self) -> &str {
            "rejecting"
        }

        fn bind(&self) -> Result<Box<dyn DocumentEngine>, PdfFigError> {
            self.binds.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(RejectingEngine))
        }
    }

    #[test]
    fn clamp_clips_every_edge() {
        let r = Rect::new(-10.0, -5.0, 700.0, 900.0).clamp_to(PageSize::new(612.0, 792.0));
        assert_eq!(r, Rect::new(0.0, 0.0, 612.0, 792.0));
    }

    #[test]
    fn union_covers_both() {
        let a = Rect::new(10.0, 10.0, 20.0, 20.0);
        let b = Rect::new(15.0, 5.0, 30.0, 12.0);
        assert_eq!(a.union(&b), Rect::new(10.0, 5.0, 30.0, 20.0));
    }

    #[test]
    fn falls_back_to_second_backend() {
        let binds = Arc::new(AtomicUsize::new(0));
        let backends: Vec<Arc<dyn DocumentBackend>> = vec![
            Arc::new(BrokenBackend {
                binds: Arc::clone(&binds),
            }),
            Arc::new(MemoryBackend),
        ];
        let pages = with_document(&backends, Path::new("unused.pdf"), |doc| {
            Ok(doc.page_count())
        })
        .expect("fallback should succeed");
        assert_eq!(pages, 2);
        assert_eq!(binds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let binds = Arc::new(AtomicUsize::new(0));
        let backends: Vec<Arc<dyn DocumentBackend>> = (0..5)
            .map(|_| {
                Arc::new(BrokenBackend {
                    binds: Arc::clone(&binds),
                }) as Arc<dyn DocumentBackend>
            })
            .collect();
        let err = with_document(&backends, Path::new("unused.pdf"), |_| Ok(()))
            .expect_err("every backend is broken");
        assert!(matches!(
            err,
            PdfFigError::RenderBackendUnavailable { attempts: 3, .. }
        ));
        assert_eq!(binds.load(Ordering::SeqCst), MAX_BACKEND_ATTEMPTS);
    }

    #[test]
    fn open_failure_is_not_a_backend_failure() {
        let binds = Arc::new(AtomicUsize::new(0));
        let backends: Vec<Arc<dyn DocumentBackend>> = vec![
            Arc::new(RejectingBackend {
                binds: Arc::clone(&binds),
            }),
            Arc::new(RejectingBackend {
                binds: Arc::clone(&binds),
            }),
        ];
        let err = with_document(&backends, Path::new("broken.pdf"), |_| Ok(()))
            .expect_err("the file cannot be opened");
        match err {
            PdfFigError::CorruptPdf { path, detail } => {
                assert_eq!(path, Path::new("broken.pdf"));
                assert_eq!(detail, "bad xref");
            }
            other => panic!("expected CorruptPdf, got {other}"),
        }
        assert_eq!(binds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_backend_list_is_unavailable() {
        let err = with_document(&[], Path::new("unused.pdf"), |_| Ok(()))
            .expect_err("nothing to try");
        assert!(matches!(
            err,
            PdfFigError::RenderBackendUnavailable { attempts: 0, .. }
        ));
    }
}
