//! Integration tests for both extraction modes.
//!
//! Documents are synthetic [`InMemoryDocument`]s served through a test
//! backend, so these run without a pdfium library. The PDF path only has to
//! exist and start with `%PDF`.

use edgequake_pdffig::pipeline::rewrite::embed_path;
use edgequake_pdffig::{
    extract_all, extract_all_sync, extract_annotated, extract_annotated_sync, DocumentBackend,
    DocumentEngine, ExtractionConfig, ExtractionItem, ExtractionProgressCallback,
    InMemoryDocument, InMemoryPage, ItemStatus, PdfFigError,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

// ── Test helpers ─────────────────────────────────────────────────────────────

struct MemoryBackend {
    doc: InMemoryDocument,
    binds: AtomicUsize,
}

impl MemoryBackend {
    fn new(doc: InMemoryDocument) -> Arc<Self> {
        Arc::new(Self {
            doc,
            binds: AtomicUsize::new(0),
        })
    }
}

impl DocumentBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn bind(&self) -> Result<Box<dyn DocumentEngine>, PdfFigError> {
        self.binds.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.doc.clone()))
    }
}

struct BrokenBackend;

impl DocumentBackend for BrokenBackend {
    fn name(&self) -> &str {
        "broken"
    }

    fn bind(&self) -> Result<Box<dyn DocumentEngine>, PdfFigError> {
        Err(PdfFigError::PdfiumBindingFailed("library not found".into()))
    }
}

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn pdf(&self) -> PathBuf {
        let path = self.dir.path().join("paper.pdf");
        std::fs::write(&path, b"%PDF-1.7\n%synthetic\n").unwrap();
        path
    }

    fn markdown(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn images(&self) -> PathBuf {
        self.dir.path().join("images")
    }

    fn config(&self, backend: Arc<dyn DocumentBackend>) -> ExtractionConfig {
        ExtractionConfig::builder()
            .output_dir(self.images())
            .backends(vec![backend])
            .build()
            .unwrap()
    }

    fn image_count(&self) -> usize {
        std::fs::read_dir(self.images())
            .map(|rd| {
                rd.filter_map(|e| e.ok())
                    .filter(|e| e.path().extension().is_some_and(|x| x == "png"))
                    .count()
            })
            .unwrap_or(0)
    }
}

/// Ten US-letter pages; page 3 carries a figure caption.
fn t5_document() -> InMemoryDocument {
    InMemoryDocument::blank(10).with_page(
        2,
        InMemoryPage::new(612.0, 792.0)
            .with_line("Our model follows the encoder-decoder design.", 72.0, 100.0)
            .with_line("Figure 1: Architecture", 72.0, 420.0),
    )
}

const T5_DIRECTIVE: &str = "**【配图建议：第3页，Figure 1 - 展示架构图】**";

fn expected_embed(image: &Path, description: &str) -> String {
    format!(
        "![{description}]({})\n\n*{description}*",
        embed_path(image)
    )
}

// ── Targeted mode ────────────────────────────────────────────────────────────

#[test]
fn test_targeted_replaces_directive_with_embed() {
    let ws = Workspace::new();
    let md = ws.markdown("T5论文_解读.md", &format!("# T5\n\n{T5_DIRECTIVE}\n\n正文。\n"));
    let config = ExtractionConfig {
        prefix: "T5".into(),
        ..ws.config(MemoryBackend::new(t5_document()))
    };

    let out = extract_annotated_sync(ws.pdf(), &md, &config).unwrap();

    let image = ws.images().join("T5_figure1.png");
    assert!(image.exists(), "expected {}", image.display());
    assert_eq!(out.manifest.items.len(), 1);
    assert_eq!(out.manifest.items[0].status, ItemStatus::Success);
    assert_eq!(out.manifest.items[0].output_filename, "T5_figure1.png");

    let written = std::fs::read_to_string(&md).unwrap();
    assert!(!written.contains(T5_DIRECTIVE));
    assert!(written.contains(&expected_embed(&image, "展示架构图")));
    assert_eq!(written, out.markdown);
    assert_eq!(out.markdown_path, md);
    assert_eq!(out.embeds.len(), 1);
    assert_eq!(out.embeds[0].raw_text, T5_DIRECTIVE);
    assert!(out.embeds[0].image_path.ends_with("images/T5_figure1.png"));
}

#[test]
fn test_targeted_out_of_range_leaves_markdown_untouched() {
    let ws = Workspace::new();
    let original = "前言\n\n**【配图建议：第999页，Figure 2 - 不存在】**\n";
    let md = ws.markdown("draft.md", original);
    let config = ws.config(MemoryBackend::new(InMemoryDocument::blank(10)));

    let out = extract_annotated_sync(ws.pdf(), &md, &config).unwrap();

    let item = &out.manifest.items[0];
    assert_eq!(item.status, ItemStatus::OutOfRange);
    assert_eq!(item.output_path, None);
    assert_eq!(out.manifest.stats.out_of_range, 1);
    assert_eq!(std::fs::read_to_string(&md).unwrap(), original);
    assert_eq!(ws.image_count(), 0);
}

#[test]
fn test_targeted_partial_success_keeps_failed_directive() {
    let ws = Workspace::new();
    let missing = "**【配图建议：第3页，Figure 9 - 找不到】**";
    let md = ws.markdown(
        "draft.md",
        &format!("{T5_DIRECTIVE}\n\n中间\n\n{missing}\n"),
    );
    let config = ws.config(MemoryBackend::new(t5_document()));

    let out = extract_annotated_sync(ws.pdf(), &md, &config).unwrap();

    let statuses: Vec<_> = out.manifest.items.iter().map(|i| i.status).collect();
    assert_eq!(statuses, vec![ItemStatus::Success, ItemStatus::NotFound]);
    let written = std::fs::read_to_string(&md).unwrap();
    assert!(!written.contains(T5_DIRECTIVE));
    assert!(written.contains(missing));
}

#[test]
fn test_targeted_is_idempotent_with_separate_output() {
    let ws = Workspace::new();
    let md = ws.markdown("draft.md", &format!("{T5_DIRECTIVE}\n"));
    let target = ws.dir.path().join("out/final.md");
    let backend = MemoryBackend::new(t5_document());
    let config = ExtractionConfig {
        output_markdown: Some(target.clone()),
        ..ws.config(backend)
    };

    let first = extract_annotated_sync(ws.pdf(), &md, &config).unwrap();
    let first_md = std::fs::read_to_string(&target).unwrap();
    let second = extract_annotated_sync(ws.pdf(), &md, &config).unwrap();
    let second_md = std::fs::read_to_string(&target).unwrap();

    assert_eq!(first_md, second_md);
    assert_eq!(first.manifest.stats.rendered, 1);
    assert_eq!(second.manifest.stats.rendered, 0);
    assert_eq!(second.manifest.stats.reused, 1);
    assert!(second.manifest.items[0].reused_existing);
    assert_eq!(ws.image_count(), 1);
    // The draft itself is never modified when an output path is given.
    assert_eq!(std::fs::read_to_string(&md).unwrap(), format!("{T5_DIRECTIVE}\n"));
}

#[test]
fn test_targeted_in_place_second_run_has_nothing_to_do() {
    let ws = Workspace::new();
    let md = ws.markdown("draft.md", &format!("{T5_DIRECTIVE}\n"));
    let config = ws.config(MemoryBackend::new(t5_document()));

    extract_annotated_sync(ws.pdf(), &md, &config).unwrap();
    let after_first = std::fs::read_to_string(&md).unwrap();

    let err = extract_annotated_sync(ws.pdf(), &md, &config).unwrap_err();
    assert!(matches!(err, PdfFigError::NoDirectivesFound { .. }));
    assert_eq!(std::fs::read_to_string(&md).unwrap(), after_first);
}

#[test]
fn test_targeted_table_uses_keyword_anchor() {
    let ws = Workspace::new();
    let doc = InMemoryDocument::from_pages(vec![InMemoryPage::new(612.0, 792.0)
        .with_line("Model   Params   Score", 72.0, 260.0)
        .with_line("Table 2: Main results", 72.0, 420.0)]);
    let md = ws.markdown("draft.md", "**【配图建议：第1页，Table 2 - 主要结果】**");
    let config = ws.config(MemoryBackend::new(doc));

    let out = extract_annotated_sync(ws.pdf(), &md, &config).unwrap();

    let region = out.manifest.items[0].crop_region.expect("region");
    assert_eq!(region.y0, 240.0);
    assert_eq!(region.y1, 450.0);
    assert!(ws.images().join("table2.png").exists());
}

#[test]
fn test_identical_directives_each_replaced_once() {
    let ws = Workspace::new();
    let md = ws.markdown("draft.md", &format!("{T5_DIRECTIVE}\n\n{T5_DIRECTIVE}\n"));
    let config = ws.config(MemoryBackend::new(t5_document()));

    let out = extract_annotated_sync(ws.pdf(), &md, &config).unwrap();

    assert_eq!(out.embeds.len(), 2);
    assert!(!out.markdown.contains(T5_DIRECTIVE));
    assert_eq!(out.markdown.matches("*展示架构图*").count(), 2);
    assert_eq!(ws.image_count(), 1);
}

// ── Fatal errors ─────────────────────────────────────────────────────────────

#[test]
fn test_missing_inputs_fail_before_binding() {
    let ws = Workspace::new();
    let backend = MemoryBackend::new(t5_document());
    let config = ws.config(backend.clone());

    let err =
        extract_annotated_sync(ws.dir.path().join("nope.pdf"), "x.md", &config).unwrap_err();
    assert!(matches!(err, PdfFigError::MissingInputFile { .. }));

    let err =
        extract_annotated_sync(ws.pdf(), ws.dir.path().join("nope.md"), &config).unwrap_err();
    match err {
        PdfFigError::MissingInputFile { path } => assert!(path.ends_with("nope.md")),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(backend.binds.load(Ordering::SeqCst), 0);
}

#[test]
fn test_no_directives_is_fatal() {
    let ws = Workspace::new();
    let backend = MemoryBackend::new(t5_document());
    let md = ws.markdown("plain.md", "# Just prose\n\nSee Figure 1.\n");

    let err = extract_annotated_sync(ws.pdf(), &md, &ws.config(backend.clone())).unwrap_err();
    assert!(matches!(err, PdfFigError::NoDirectivesFound { .. }));
    assert_eq!(backend.binds.load(Ordering::SeqCst), 0);
}

#[test]
fn test_not_a_pdf() {
    let ws = Workspace::new();
    let fake = ws.markdown("fake.pdf", "hello world");
    let err = extract_all_sync(&fake, &ws.config(MemoryBackend::new(t5_document()))).unwrap_err();
    assert!(matches!(err, PdfFigError::NotAPdf { .. }));
}

#[test]
fn test_backend_fallback() {
    let ws = Workspace::new();
    let backends: Vec<Arc<dyn DocumentBackend>> =
        vec![Arc::new(BrokenBackend), MemoryBackend::new(t5_document())];
    let config = ExtractionConfig::builder()
        .output_dir(ws.images())
        .backends(backends)
        .build()
        .unwrap();

    let manifest = extract_all_sync(ws.pdf(), &config).unwrap();
    assert_eq!(manifest.stats.total_pages, 10);
}

#[test]
fn test_all_backends_failing_is_fatal() {
    let ws = Workspace::new();
    let backends: Vec<Arc<dyn DocumentBackend>> = vec![
        Arc::new(BrokenBackend),
        Arc::new(BrokenBackend),
        Arc::new(BrokenBackend),
        MemoryBackend::new(t5_document()),
    ];
    let config = ExtractionConfig::builder()
        .output_dir(ws.images())
        .backends(backends)
        .build()
        .unwrap();

    match extract_all_sync(ws.pdf(), &config).unwrap_err() {
        PdfFigError::RenderBackendUnavailable {
            attempts,
            last_error,
        } => {
            assert_eq!(attempts, 3);
            assert!(last_error.contains("library not found"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

// ── Blind mode ───────────────────────────────────────────────────────────────

fn paper() -> InMemoryDocument {
    InMemoryDocument::from_pages(vec![
        InMemoryPage::new(612.0, 792.0)
            .with_line("Table 3: Ablations", 72.0, 120.0)
            .with_line("Figure 1: Overview of the pipeline", 72.0, 600.0),
        InMemoryPage::new(612.0, 792.0)
            .with_line("Results in Table 3. are discussed below", 72.0, 340.0)
            .with_line("Fig. 2. Training curves", 72.0, 500.0),
        InMemoryPage::new(612.0, 792.0).with_line("References", 72.0, 72.0),
    ])
}

#[test]
fn test_blind_extracts_every_caption() {
    let ws = Workspace::new();
    let config = ExtractionConfig {
        prefix: "paper".into(),
        ..ws.config(MemoryBackend::new(paper()))
    };

    let manifest = extract_all_sync(ws.pdf(), &config).unwrap();

    let names: Vec<_> = manifest
        .items
        .iter()
        .map(|i| i.output_filename.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "paper_table3.png",
            "paper_figure1.png",
            "paper_table3.png",
            "paper_figure2.png"
        ]
    );
    assert!(manifest.items.iter().all(ExtractionItem::is_success));
    // Page 2's "Table 3." collides with page 1's file and keeps it. The
    // image is page 1's crop, so the reused item carries no region.
    assert!(manifest.items[2].reused_existing);
    assert_eq!(manifest.items[2].crop_region, None);
    assert_eq!(ws.image_count(), 3);

    for item in manifest.items.iter().filter(|i| !i.reused_existing) {
        let r = item.crop_region.expect("region");
        assert!(0.0 <= r.y0 && r.y0 < r.y1 && r.y1 <= 792.0, "{r:?}");
        assert!(0.0 <= r.x0 && r.x0 < r.x1 && r.x1 <= 612.0, "{r:?}");
    }

    let list_path = manifest.reference_list.expect("reference list");
    let list = std::fs::read_to_string(list_path).unwrap();
    assert!(list.contains("## Figure 2 (page 2)"));
    assert!(list.contains("paper_figure2.png"));
}

#[test]
fn test_blind_collision_with_overwrite_keeps_last_page() {
    let ws = Workspace::new();
    let config = ExtractionConfig {
        prefix: "paper".into(),
        overwrite: true,
        ..ws.config(MemoryBackend::new(paper()))
    };

    let manifest = extract_all_sync(ws.pdf(), &config).unwrap();

    assert!(manifest.items.iter().all(|i| !i.reused_existing));
    let first = manifest.items[0].crop_region.expect("region");
    let second = manifest.items[2].crop_region.expect("region");
    assert_eq!(manifest.items[2].page_index, 1);
    assert_ne!(first, second);
    assert_eq!(manifest.stats.rendered, 4);
    assert_eq!(ws.image_count(), 3);
}

#[test]
fn test_blind_without_captions_writes_no_list() {
    let ws = Workspace::new();
    let config = ws.config(MemoryBackend::new(InMemoryDocument::blank(2)));

    let manifest = extract_all_sync(ws.pdf(), &config).unwrap();
    assert!(manifest.items.is_empty());
    assert_eq!(manifest.reference_list, None);
    assert!(!ws.images().join("figure_list.md").exists());
}

// ── Progress callback ────────────────────────────────────────────────────────

#[derive(Default)]
struct Counting {
    started: AtomicUsize,
    units: AtomicUsize,
    extracted: AtomicUsize,
    failed: AtomicUsize,
    completed: AtomicUsize,
}

impl ExtractionProgressCallback for Counting {
    fn on_extraction_start(&self, total_units: usize) {
        self.started.store(total_units, Ordering::SeqCst);
    }

    fn on_unit_start(&self, _unit: usize, _total: usize) {
        self.units.fetch_add(1, Ordering::SeqCst);
    }

    fn on_item_extracted(&self, _item: &ExtractionItem) {
        self.extracted.fetch_add(1, Ordering::SeqCst);
    }

    fn on_item_failed(&self, _item: &ExtractionItem) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    fn on_extraction_complete(&self, extracted: usize, failed: usize) {
        self.completed.store(extracted * 100 + failed, Ordering::SeqCst);
    }
}

#[test]
fn test_progress_events_per_directive() {
    let ws = Workspace::new();
    let md = ws.markdown(
        "draft.md",
        &format!("{T5_DIRECTIVE}\n**【配图建议：第42页，Table 1 - x】**\n"),
    );
    let counting = Arc::new(Counting::default());
    let config = ExtractionConfig {
        progress_callback: Some(counting.clone()),
        ..ws.config(MemoryBackend::new(t5_document()))
    };

    extract_annotated_sync(ws.pdf(), &md, &config).unwrap();

    assert_eq!(counting.started.load(Ordering::SeqCst), 2);
    assert_eq!(counting.units.load(Ordering::SeqCst), 2);
    assert_eq!(counting.extracted.load(Ordering::SeqCst), 1);
    assert_eq!(counting.failed.load(Ordering::SeqCst), 1);
    assert_eq!(counting.completed.load(Ordering::SeqCst), 101);
}

// ── Async wrappers ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_async_wrappers_match_sync() {
    let ws = Workspace::new();
    let config = ws.config(MemoryBackend::new(t5_document()));

    let manifest = extract_all(ws.pdf(), &config).await.unwrap();
    assert_eq!(manifest.items.len(), 1);
    assert_eq!(manifest.items[0].output_filename, "figure1.png");

    let md = ws.markdown("draft.md", &format!("{T5_DIRECTIVE}\n"));
    let out = extract_annotated(ws.pdf(), &md, &config).await.unwrap();
    // Blind mode already rendered figure1.png.
    assert!(out.manifest.items[0].reused_existing);
    assert!(!out.markdown.contains(T5_DIRECTIVE));
}

#[test]
fn test_manifest_is_json_serialisable() {
    let ws = Workspace::new();
    let manifest = extract_all_sync(ws.pdf(), &ws.config(MemoryBackend::new(paper()))).unwrap();
    let json = serde_json::to_string(&manifest).expect("serialise");
    assert!(json.contains("\"Blind\""));
    assert!(json.contains("figure2.png"));
}
