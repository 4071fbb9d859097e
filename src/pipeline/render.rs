//! Rendering: rasterise a crop region and persist it as PNG.
//!
//! ## Naming
//!
//! Output files are named `{prefix}_{kind}{identifier}.png` (`figure3.png`
//! without a prefix). The name depends only on its inputs, so a re-run finds
//! the files of the previous run and can skip them.
//!
//! ## Why temp file + rename?
//!
//! The PNG is encoded in memory and written to a temporary file in the
//! output directory, which is then renamed over the final name. A failed
//! rasterisation writes nothing, and an interrupted write never leaves a
//! truncated image under the final name.

use super::caption::CaptionKind;
use crate::document::{DocumentAccess, Rect};
use crate::error::PdfFigError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Deterministic output file name for an item.
pub fn output_filename(prefix: &str, kind: CaptionKind, identifier: &str) -> String {
    if prefix.is_empty() {
        format!("{}{}.png", kind.slug(), identifier)
    } else {
        format!("{}_{}{}.png", prefix, kind.slug(), identifier)
    }
}

static RE_UNSAFE_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\-]").unwrap());

/// Stem separators tried in order when deriving a prefix ("T5论文_解读.md").
const PREFIX_SEPARATORS: [&str; 5] = ["_解读", "_论文", "论文", "解读", "_"];
const PREFIX_MAX_CHARS: usize = 20;

/// Derive a file-name prefix from an article's file name.
///
/// `T5论文_解读.md` → `T5论文`, `BERT_Pretraining_解读.md` → `BERT_Pretraining`.
/// The stem is cut before the first separator found (see
/// `PREFIX_SEPARATORS`), else truncated to 20 characters; anything outside
/// `[\w-]` becomes `_`.
pub fn derive_prefix(markdown_path: &Path) -> String {
    let stem = markdown_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let cut = PREFIX_SEPARATORS
        .iter()
        .find_map(|sep| stem.find(sep).map(|idx| stem[..idx].to_string()))
        .unwrap_or_else(|| stem.chars().take(PREFIX_MAX_CHARS).collect());

    RE_UNSAFE_PREFIX.replace_all(&cut, "_").into_owned()
}

/// Whether [`render_to_file`] produced a new image or found one already there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered,
    Reused,
}

/// Create `dir` (and parents) if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PdfFigError> {
    std::fs::create_dir_all(dir).map_err(|e| PdfFigError::OutputWriteFailed {
        path: dir.to_path_buf(),
        source: e,
    })
}

/// Rasterise `region` on `page_index` and save it as PNG at `path`.
///
/// `region` must already be clipped to the page. When `path` exists and
/// `overwrite` is false nothing is rendered.
pub fn render_to_file(
    doc: &dyn DocumentAccess,
    page_index: usize,
    region: &Rect,
    scale: f32,
    path: &Path,
    overwrite: bool,
) -> Result<RenderOutcome, PdfFigError> {
    if !overwrite && path.exists() {
        debug!("Keeping existing {}", path.display());
        return Ok(RenderOutcome::Reused);
    }

    let image = doc.rasterize(page_index, region, scale)?;

    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| PdfFigError::RasterisationFailed {
            page: page_index + 1,
            detail: format!("PNG encoding failed: {e}"),
        })?;

    write_atomic(path, &buf)?;
    info!(
        "Saved {} ({}x{} px)",
        path.display(),
        image.width(),
        image.height()
    );
    Ok(RenderOutcome::Rendered)
}

/// Write `bytes` to `path` via a temporary sibling file and a rename.
///
/// A replaced file keeps its permissions; a new one gets the usual
/// umask-derived mode rather than the private mode of a temp file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PdfFigError> {
    let write_err = |source: std::io::Error| PdfFigError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    #[cfg_attr(not(unix), allow(unused_mut))]
    let mut builder = tempfile::Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    let mut tmp = builder.tempfile_in(&dir).map_err(write_err)?;

    if let Ok(existing) = std::fs::metadata(path) {
        tmp.as_file()
            .set_permissions(existing.permissions())
            .map_err(write_err)?;
    }
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}
