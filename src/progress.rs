//! Progress-callback trait for per-item extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the orchestrator works through the document. A *unit* is a page
//! in blind mode and a directive in targeted mode.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdffig::{ExtractionConfig, ExtractionItem, ExtractionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counter(AtomicUsize);
//!
//! impl ExtractionProgressCallback for Counter {
//!     fn on_item_extracted(&self, item: &ExtractionItem) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("saved {}", item.output_filename);
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(Counter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::ExtractionItem;
use std::sync::Arc;

/// Called by the orchestrator as it processes each unit and item.
///
/// All methods have default no-op implementations. `Send + Sync` because the
/// async entry points run the extraction on tokio's blocking pool.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once before the first unit.
    fn on_extraction_start(&self, total_units: usize) {
        let _ = total_units;
    }

    /// Called before a page (blind) or directive (targeted) is processed.
    ///
    /// `unit` is 1-based.
    fn on_unit_start(&self, unit: usize, total_units: usize) {
        let _ = (unit, total_units);
    }

    /// Called when an item ends with an image on disk.
    fn on_item_extracted(&self, item: &ExtractionItem) {
        let _ = item;
    }

    /// Called when an item ends without an image.
    fn on_item_failed(&self, item: &ExtractionItem) {
        let _ = item;
    }

    /// Called after a unit is done.
    fn on_unit_complete(&self, unit: usize, total_units: usize) {
        let _ = (unit, total_units);
    }

    /// Called once after every unit has been attempted.
    fn on_extraction_complete(&self, extracted: usize, failed: usize) {
        let _ = (extracted, failed);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
