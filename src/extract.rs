//! Extraction entry points.
//!
//! Two modes share one per-item path (locate → resolve → clamp → render):
//!
//! * **Blind** ([`extract_all`]): every page is scanned for `Figure N:`,
//!   `Fig. N.` and `Table N:` captions; each distinct caption per page is
//!   rendered and listed in a reference list.
//! * **Targeted** ([`extract_annotated`]): an article draft names the items
//!   it wants via `**【配图建议：…】**` directives; each one is rendered and
//!   its directive replaced by an image embed.
//!
//! A failed item never aborts the run: it is recorded with a non-success
//! [`ItemStatus`] and the next item is processed. Only input validation and
//! backend selection are fatal.
//!
//! pdfium is not async-safe, so the async functions run the `*_sync`
//! versions on tokio's blocking pool.

use crate::config::ExtractionConfig;
use crate::document::{with_document, DocumentAccess};
use crate::error::{ItemError, PdfFigError};
use crate::output::{
    AnnotatedOutput, EmbedRecord, ExtractionItem, ExtractionManifest, ExtractionStats, ItemStatus,
};
use crate::pipeline::annotation::{parse_directives, AnnotationDirective};
use crate::pipeline::caption::{locate_caption, locate_occurrence, scan_captions, CaptionMatch};
use crate::pipeline::dedup::dedup_page;
use crate::pipeline::region::{resolve_region, ExtractionMode};
use crate::pipeline::render::{
    ensure_output_dir, output_filename, render_to_file, write_atomic, RenderOutcome,
};
use crate::pipeline::rewrite::{embed_path, reference_list, replace_directives};
use crate::pipeline::{caption::CaptionKind, input};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

// ── Blind mode ───────────────────────────────────────────────────────────

/// Extract every captioned figure and table in a PDF.
///
/// # Errors
/// Returns `Err(PdfFigError)` only for fatal errors: the PDF is missing or
/// not a PDF, no backend could open it, or the output directory could not
/// be written. Per-item failures are reported in the manifest.
pub async fn extract_all(
    pdf: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionManifest, PdfFigError> {
    let pdf = pdf.as_ref().to_path_buf();
    let config = config.clone();
    tokio::task::spawn_blocking(move || extract_all_sync(&pdf, &config))
        .await
        .map_err(|e| PdfFigError::Internal(format!("extraction task failed: {e}")))?
}

/// Blocking version of [`extract_all`].
pub fn extract_all_sync(
    pdf: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionManifest, PdfFigError> {
    let pdf = input::resolve_pdf(pdf.as_ref())?;
    info!("Scanning {} for figures and tables", pdf.display());
    with_document(&config.backends, &pdf, |doc| extract_all_from(doc, config))
}

/// Blind extraction over an already opened document.
pub fn extract_all_from(
    doc: &dyn DocumentAccess,
    config: &ExtractionConfig,
) -> Result<ExtractionManifest, PdfFigError> {
    let start = Instant::now();
    ensure_output_dir(&config.output_dir)?;

    let total_pages = doc.page_count();
    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_start(total_pages);
    }

    let mut items = Vec::new();
    let mut stats = ExtractionStats {
        total_pages,
        ..Default::default()
    };
    // Output file name → page that first produced it in this run.
    let mut first_page: HashMap<String, usize> = HashMap::new();

    for page_index in 0..total_pages {
        if let Some(ref cb) = config.progress_callback {
            cb.on_unit_start(page_index + 1, total_pages);
        }

        let text = match doc.page_text(page_index) {
            Ok(t) => t,
            Err(e) => {
                warn!("Skipping page {}: {}", page_index + 1, e);
                continue;
            }
        };

        let captions = dedup_page(scan_captions(&text));
        debug!("Page {}: {} caption(s)", page_index + 1, captions.len());

        for occurrence in &captions {
            let mut item =
                pending_item(config, occurrence.kind, &occurrence.identifier, page_index);
            match locate_occurrence(doc, page_index, &text, occurrence) {
                Ok(Some(caption)) => {
                    render_item(doc, &caption, ExtractionMode::Blind, config, &mut item)
                }
                Ok(None) => mark_not_found(&mut item),
                Err(e) => mark_render_failed(&mut item, &e),
            }
            if item.is_success() {
                match first_page.get(&item.output_filename) {
                    Some(&page) if page != item.page_index => warn!(
                        "{} on page {} shares {} with page {}; keeping the page {} image",
                        item.label(),
                        item.page_number(),
                        item.output_filename,
                        page + 1,
                        if config.overwrite { item.page_number() } else { page + 1 },
                    ),
                    Some(_) => {}
                    None => {
                        first_page.insert(item.output_filename.clone(), item.page_index);
                    }
                }
            }
            finish_item(config, &mut stats, &item);
            items.push(item);
        }

        if let Some(ref cb) = config.progress_callback {
            cb.on_unit_complete(page_index + 1, total_pages);
        }
    }

    let reference_path = match config.reference_list {
        Some(ref name) if items.iter().any(ExtractionItem::is_success) => {
            let path = config.output_dir.join(name);
            write_atomic(&path, reference_list(&items).as_bytes())?;
            info!("Reference list written to {}", path.display());
            Some(path)
        }
        _ => None,
    };

    stats.total_duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Extraction complete: {}/{} items across {} pages, {}ms",
        stats.succeeded(),
        stats.total_items,
        total_pages,
        stats.total_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_complete(stats.succeeded(), stats.failed());
    }

    Ok(ExtractionManifest {
        mode: ExtractionMode::Blind,
        output_dir: config.output_dir.clone(),
        items,
        reference_list: reference_path,
        stats,
    })
}

// ── Targeted mode ────────────────────────────────────────────────────────

/// Extract the figures and tables requested by directives in `markdown`,
/// then replace each fulfilled directive with an image embed.
///
/// The markdown is rewritten in place unless
/// [`ExtractionConfig::output_markdown`] is set. Directives that could not
/// be fulfilled are left untouched.
///
/// # Errors
/// Fatal errors: either input is missing, the markdown has no directives,
/// no backend could open the PDF, or an output file could not be written.
pub async fn extract_annotated(
    pdf: impl AsRef<Path>,
    markdown: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<AnnotatedOutput, PdfFigError> {
    let pdf = pdf.as_ref().to_path_buf();
    let markdown = markdown.as_ref().to_path_buf();
    let config = config.clone();
    tokio::task::spawn_blocking(move || extract_annotated_sync(&pdf, &markdown, &config))
        .await
        .map_err(|e| PdfFigError::Internal(format!("extraction task failed: {e}")))?
}

/// Blocking version of [`extract_annotated`].
pub fn extract_annotated_sync(
    pdf: impl AsRef<Path>,
    markdown: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<AnnotatedOutput, PdfFigError> {
    let markdown_path = markdown.as_ref();
    let pdf = input::resolve_pdf(pdf.as_ref())?;
    let content = input::read_markdown(markdown_path)?;

    // Fail before touching the PDF when there is nothing to do.
    let directives = parse_directives(&content);
    if directives.is_empty() {
        return Err(PdfFigError::NoDirectivesFound {
            path: markdown_path.to_path_buf(),
        });
    }
    info!(
        "Found {} directive(s) in {}",
        directives.len(),
        markdown_path.display()
    );

    with_document(&config.backends, &pdf, |doc| {
        annotate(doc, markdown_path, &content, &directives, config)
    })
}

/// Targeted extraction over an already opened document.
///
/// `markdown_path` is where the rewritten text goes when
/// [`ExtractionConfig::output_markdown`] is unset; `markdown` is its content.
pub fn extract_annotated_from(
    doc: &dyn DocumentAccess,
    markdown_path: &Path,
    markdown: &str,
    config: &ExtractionConfig,
) -> Result<AnnotatedOutput, PdfFigError> {
    let directives = parse_directives(markdown);
    if directives.is_empty() {
        return Err(PdfFigError::NoDirectivesFound {
            path: markdown_path.to_path_buf(),
        });
    }
    annotate(doc, markdown_path, markdown, &directives, config)
}

fn annotate(
    doc: &dyn DocumentAccess,
    markdown_path: &Path,
    markdown: &str,
    directives: &[AnnotationDirective],
    config: &ExtractionConfig,
) -> Result<AnnotatedOutput, PdfFigError> {
    let start = Instant::now();
    ensure_output_dir(&config.output_dir)?;

    let total_pages = doc.page_count();
    let total = directives.len();
    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_start(total);
    }

    let mut items = Vec::with_capacity(total);
    let mut stats = ExtractionStats {
        total_pages,
        ..Default::default()
    };
    let mut replacements: Vec<(&AnnotationDirective, String)> = Vec::new();

    for (i, directive) in directives.iter().enumerate() {
        if let Some(ref cb) = config.progress_callback {
            cb.on_unit_start(i + 1, total);
        }

        let item = process_directive(doc, directive, total_pages, config);
        if let Some(ref path) = item.output_path {
            replacements.push((directive, embed_path(path)));
        }
        finish_item(config, &mut stats, &item);
        items.push(item);

        if let Some(ref cb) = config.progress_callback {
            cb.on_unit_complete(i + 1, total);
        }
    }

    let (rewritten, replaced) = replace_directives(markdown, &replacements);
    let target = config
        .output_markdown
        .clone()
        .unwrap_or_else(|| markdown_path.to_path_buf());

    if replaced > 0 || config.output_markdown.is_some() {
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_output_dir(parent)?;
        }
        write_atomic(&target, rewritten.as_bytes())?;
        info!(
            "Replaced {}/{} directive(s); markdown written to {}",
            replaced,
            total,
            target.display()
        );
    } else {
        warn!(
            "No directive could be fulfilled; {} left unchanged",
            target.display()
        );
    }

    let embeds = replacements
        .iter()
        .map(|(d, image_path)| EmbedRecord {
            raw_text: d.raw_text.clone(),
            image_path: image_path.clone(),
        })
        .collect();

    stats.total_duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Extraction complete: {}/{} directives, {}ms",
        stats.succeeded(),
        total,
        stats.total_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_complete(stats.succeeded(), stats.failed());
    }

    Ok(AnnotatedOutput {
        manifest: ExtractionManifest {
            mode: ExtractionMode::Targeted,
            output_dir: config.output_dir.clone(),
            items,
            reference_list: None,
            stats,
        },
        embeds,
        markdown_path: target,
        markdown: rewritten,
    })
}

fn process_directive(
    doc: &dyn DocumentAccess,
    directive: &AnnotationDirective,
    total_pages: usize,
    config: &ExtractionConfig,
) -> ExtractionItem {
    let page_index = directive.page_number.saturating_sub(1);
    let mut item = pending_item(config, directive.kind, &directive.identifier, page_index);
    item.description = Some(directive.description.clone());

    if directive.page_number == 0 || directive.page_number > total_pages {
        item.status = ItemStatus::OutOfRange;
        item.error = Some(ItemError::PageOutOfRange {
            label: directive.label(),
            page: directive.page_number,
            total: total_pages,
        });
        return item;
    }

    // A previous run already produced this image: keep it and only redo the
    // markdown insertion.
    let path = config.output_dir.join(&item.output_filename);
    if !config.overwrite && path.exists() {
        info!("{}: reusing {}", directive.label(), path.display());
        item.status = ItemStatus::Success;
        item.reused_existing = true;
        item.output_path = Some(path);
        return item;
    }

    match locate_caption(doc, page_index, directive.kind, &directive.identifier) {
        Ok(Some(caption)) => {
            render_item(doc, &caption, ExtractionMode::Targeted, config, &mut item)
        }
        Ok(None) => mark_not_found(&mut item),
        Err(e) => mark_render_failed(&mut item, &e),
    }
    item
}

// ── Shared per-item steps ────────────────────────────────────────────────

fn pending_item(
    config: &ExtractionConfig,
    kind: CaptionKind,
    identifier: &str,
    page_index: usize,
) -> ExtractionItem {
    ExtractionItem {
        kind,
        identifier: identifier.to_string(),
        page_index,
        crop_region: None,
        output_filename: output_filename(&config.prefix, kind, identifier),
        output_path: None,
        status: ItemStatus::NotFound,
        error: None,
        reused_existing: false,
        description: None,
    }
}

fn render_item(
    doc: &dyn DocumentAccess,
    caption: &CaptionMatch,
    mode: ExtractionMode,
    config: &ExtractionConfig,
    item: &mut ExtractionItem,
) {
    let page_index = caption.page_index;
    let region = match resolve_region(doc, caption, mode)
        .and_then(|r| doc.page_size(page_index).map(|size| r.clamp_to(size)))
    {
        Ok(r) => r,
        Err(e) => return mark_render_failed(item, &e),
    };

    let path: PathBuf = config.output_dir.join(&item.output_filename);
    match render_to_file(doc, page_index, &region, config.scale, &path, config.overwrite) {
        Ok(RenderOutcome::Rendered) => {
            item.status = ItemStatus::Success;
            item.crop_region = Some(region);
            item.output_path = Some(path);
        }
        // The file on disk came from an earlier crop, not from `region`.
        Ok(RenderOutcome::Reused) => {
            item.status = ItemStatus::Success;
            item.reused_existing = true;
            item.output_path = Some(path);
        }
        Err(e) => mark_render_failed(item, &e),
    }
}

fn mark_not_found(item: &mut ExtractionItem) {
    item.status = ItemStatus::NotFound;
    item.error = Some(ItemError::CaptionNotFound {
        label: item.label(),
        page: item.page_number(),
    });
}

fn mark_render_failed(item: &mut ExtractionItem, err: &PdfFigError) {
    item.status = ItemStatus::RenderFailed;
    item.output_path = None;
    item.error = Some(ItemError::RenderFailed {
        label: item.label(),
        page: item.page_number(),
        detail: err.to_string(),
    });
}

fn finish_item(config: &ExtractionConfig, stats: &mut ExtractionStats, item: &ExtractionItem) {
    stats.record(item);
    if let Some(ref e) = item.error {
        warn!("{}", e);
    }
    if let Some(ref cb) = config.progress_callback {
        if item.is_success() {
            cb.on_item_extracted(item);
        } else {
            cb.on_item_failed(item);
        }
    }
}
