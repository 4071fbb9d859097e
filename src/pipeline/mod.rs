//! Pipeline stages for figure and table extraction.
//!
//! Each submodule implements one step and is independently testable
//! against an [`crate::document::InMemoryDocument`].
//!
//! ## Data Flow
//!
//! ```text
//! blind:     input ──▶ caption scan ──▶ dedup ──▶ region ──▶ render ──▶ reference list
//! targeted:  input ──▶ annotation ──▶ caption lookup ──▶ region ──▶ render ──▶ rewrite
//! ```
//!
//! 1. [`input`]      — validate the PDF and markdown paths
//! 2. [`annotation`] — parse `**【配图建议：…】**` directives from a draft
//! 3. [`caption`]    — find caption text and its bounding box on a page
//! 4. [`dedup`]      — keep one caption per (kind, identifier) per page
//! 5. [`region`]     — caption box → crop rectangle
//! 6. [`render`]     — rasterise the crop and save it as PNG
//! 7. [`rewrite`]    — swap directives for image embeds; build the reference list

pub mod annotation;
pub mod caption;
pub mod dedup;
pub mod input;
pub mod region;
pub mod render;
pub mod rewrite;
