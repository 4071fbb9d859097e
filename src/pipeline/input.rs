//! Input resolution: validate the user-supplied PDF and markdown paths.
//!
//! We check the PDF magic bytes (`%PDF`) before handing the path to a
//! backend so callers get a meaningful error rather than a pdfium failure
//! that would also trigger backend fallback.

use crate::error::PdfFigError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate that `path` exists, is readable, and starts with `%PDF`.
pub fn resolve_pdf(path: &Path) -> Result<PathBuf, PdfFigError> {
    let mut file = open_readable(path)?;

    let mut magic = [0u8; 4];
    if file.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
        return Err(PdfFigError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path.to_path_buf())
}

/// Validate that `path` exists and read it as UTF-8.
pub fn read_markdown(path: &Path) -> Result<String, PdfFigError> {
    open_readable(path)?;
    let content =
        std::fs::read_to_string(path).map_err(|source| PdfFigError::MarkdownReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
    debug!("Read {} bytes of markdown from {}", content.len(), path.display());
    Ok(content)
}

fn open_readable(path: &Path) -> Result<std::fs::File, PdfFigError> {
    if !path.is_file() {
        return Err(PdfFigError::MissingInputFile {
            path: path.to_path_buf(),
        });
    }
    match std::fs::File::open(path) {
        Ok(f) => Ok(f),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(PdfFigError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(_) => Err(PdfFigError::MissingInputFile {
            path: path.to_path_buf(),
        }),
    }
}
