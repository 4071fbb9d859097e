//! pdfium-backed document access.
//!
//! ## Why two bindings?
//!
//! pdfium is a C++ shared library loaded at runtime. A copy shipped next to
//! the binary (or pointed at by `PDFIUM_LIB_PATH`) is preferred because its
//! version is known; a system-wide install is the fallback. Each is a
//! separate [`PdfiumBackend`] so the orchestrator can try them in order.
//!
//! ## Coordinates
//!
//! pdfium reports rectangles with a bottom-left origin. Search hits are
//! flipped into the top-left space used by the rest of the crate, and crop
//! regions are flipped back implicitly by cropping the rendered bitmap, whose
//! rows already run top to bottom.

use super::{DocumentAccess, DocumentBackend, DocumentEngine, PageSize, Rect};
use crate::error::PdfFigError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where to load the pdfium shared library from.
#[derive(Debug, Clone, PartialEq)]
pub enum LibrarySource {
    /// The platform library name inside this directory.
    Directory(PathBuf),
    /// The dynamic loader's default search path.
    System,
}

/// A [`DocumentBackend`] that binds pdfium from a [`LibrarySource`].
#[derive(Debug, Clone)]
pub struct PdfiumBackend {
    source: LibrarySource,
    name: String,
}

impl PdfiumBackend {
    /// Bind `libpdfium` from `dir`.
    pub fn from_directory(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            name: format!("pdfium:{}", dir.display()),
            source: LibrarySource::Directory(dir),
        }
    }

    /// Bind from a library file or the directory containing it.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if path.is_file() {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("./"));
            Self::from_directory(dir)
        } else {
            Self::from_directory(path)
        }
    }

    /// Bind from `PDFIUM_LIB_PATH` when set, else from the working directory.
    ///
    /// `PDFIUM_LIB_PATH` may name the library file itself or its directory.
    pub fn from_env_or_cwd() -> Self {
        match std::env::var("PDFIUM_LIB_PATH") {
            Ok(p) if !p.is_empty() => Self::from_path(p),
            _ => Self::from_directory("./"),
        }
    }

    /// Bind the system-wide pdfium library.
    pub fn system() -> Self {
        Self {
            source: LibrarySource::System,
            name: "pdfium:system".to_string(),
        }
    }

    pub fn source(&self) -> &LibrarySource {
        &self.source
    }
}

impl DocumentBackend for PdfiumBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn bind(&self) -> Result<Box<dyn DocumentEngine>, PdfFigError> {
        let bindings = match &self.source {
            LibrarySource::Directory(dir) => Pdfium::bind_to_library(
                Pdfium::pdfium_platform_library_name_at_path(dir),
            ),
            LibrarySource::System => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| PdfFigError::PdfiumBindingFailed(format!("{}: {:?}", self.name, e)))?;

        debug!("Bound {}", self.name);
        Ok(Box::new(PdfiumEngine {
            pdfium: Pdfium::new(bindings),
        }))
    }
}

/// A bound pdfium instance.
pub struct PdfiumEngine {
    pdfium: Pdfium,
}

impl DocumentEngine for PdfiumEngine {
    fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn DocumentAccess + 'a>, PdfFigError> {
        let document =
            self.pdfium
                .load_pdf_from_file(path, None)
                .map_err(|e| PdfFigError::CorruptPdf {
                    path: path.to_path_buf(),
                    detail: format!("{:?}", e),
                })?;
        Ok(Box::new(PdfiumDocument { document }))
    }
}

/// An open pdfium document.
pub struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl PdfiumDocument<'_> {
    fn with_page<T>(
        &self,
        index: usize,
        f: impl FnOnce(&PdfPage) -> Result<T, PdfFigError>,
    ) -> Result<T, PdfFigError> {
        let pages = self.document.pages();
        let total = pages.len() as usize;
        if index >= total {
            return Err(PdfFigError::PageOutOfRange {
                page: index + 1,
                total,
            });
        }
        let page = pages
            .get(index as u16)
            .map_err(|e| PdfFigError::RasterisationFailed {
                page: index + 1,
                detail: format!("{:?}", e),
            })?;
        f(&page)
    }
}

fn text_error(page: usize, e: PdfiumError) -> PdfFigError {
    PdfFigError::RasterisationFailed {
        page: page + 1,
        detail: format!("text layer: {:?}", e),
    }
}

impl DocumentAccess for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page_text(&self, index: usize) -> Result<String, PdfFigError> {
        self.with_page(index, |page| {
            let text = page.text().map_err(|e| text_error(index, e))?;
            Ok(text.all())
        })
    }

    fn search_text(&self, index: usize, term: &str) -> Result<Vec<Rect>, PdfFigError> {
        self.with_page(index, |page| {
            let page_height = page.height().value;
            let text = page.text().map_err(|e| text_error(index, e))?;
            let search = text
                .search(term, &PdfSearchOptions::new())
                .map_err(|e| text_error(index, e))?;

            let mut hits = Vec::new();
            for segments in search.iter(PdfSearchDirection::SearchForward) {
                // A hit spanning a line break comes back as several segments.
                let merged = segments
                    .iter()
                    .map(|segment| {
                        let bounds = segment.bounds();
                        Rect::new(
                            bounds.left().value,
                            page_height - bounds.top().value,
                            bounds.right().value,
                            page_height - bounds.bottom().value,
                        )
                    })
                    .reduce(|a, b| a.union(&b));
                if let Some(rect) = merged {
                    hits.push(rect);
                }
            }
            Ok(hits)
        })
    }

    fn page_size(&self, index: usize) -> Result<PageSize, PdfFigError> {
        self.with_page(index, |page| {
            Ok(PageSize::new(page.width().value, page.height().value))
        })
    }

    fn rasterize(
        &self,
        index: usize,
        region: &Rect,
        scale: f32,
    ) -> Result<DynamicImage, PdfFigError> {
        self.with_page(index, |page| {
            let target_width = (page.width().value * scale).round() as i32;
            let target_height = (page.height().value * scale).round() as i32;
            let render_config = PdfRenderConfig::new()
                .set_target_width(target_width)
                .set_maximum_height(target_height);

            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                PdfFigError::RasterisationFailed {
                    page: index + 1,
                    detail: format!("{:?}", e),
                }
            })?;
            let image = bitmap.as_image();

            // The bitmap may be a pixel off the requested size; derive the
            // effective scale from what pdfium actually produced.
            let sx = image.width() as f32 / page.width().value;
            let sy = image.height() as f32 / page.height().value;
            let x = (region.x0 * sx).floor().max(0.0) as u32;
            let y = (region.y0 * sy).floor().max(0.0) as u32;
            let right = ((region.x1 * sx).ceil() as u32).min(image.width());
            let bottom = ((region.y1 * sy).ceil() as u32).min(image.height());

            if right <= x || bottom <= y {
                return Err(PdfFigError::RasterisationFailed {
                    page: index + 1,
                    detail: format!("empty crop region {region:?}"),
                });
            }

            debug!(
                "Page {}: crop {}x{} px at ({}, {})",
                index + 1,
                right - x,
                bottom - y,
                x,
                y
            );
            Ok(image.crop_imm(x, y, right - x, bottom - y))
        })
    }
}
