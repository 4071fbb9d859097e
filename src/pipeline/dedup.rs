//! Per-page deduplication of caption occurrences.
//!
//! A paper mentions "Figure 1." in prose as well as in the caption itself.
//! The scan reports every such occurrence; this step keeps one per
//! `(kind, identifier)` — the one with the smallest text offset, on the
//! assumption that the caption precedes later references in reading order.
//!
//! The grouping map lives only for the duration of one call. There is no
//! cross-page merging: "Figure 1" on page 2 and on page 5 are two items.

use super::caption::{CaptionKind, CaptionOccurrence};
use std::collections::HashMap;

/// Keep the earliest occurrence per `(kind, identifier)`, in offset order.
pub fn dedup_page(occurrences: Vec<CaptionOccurrence>) -> Vec<CaptionOccurrence> {
    let mut earliest: HashMap<(CaptionKind, String), CaptionOccurrence> = HashMap::new();

    for occ in occurrences {
        let key = (occ.kind, occ.identifier.clone());
        match earliest.get(&key) {
            Some(kept) if kept.offset <= occ.offset => {}
            _ => {
                earliest.insert(key, occ);
            }
        }
    }

    let mut kept: Vec<CaptionOccurrence> = earliest.into_values().collect();
    kept.sort_by_key(|o| o.offset);
    kept
}
