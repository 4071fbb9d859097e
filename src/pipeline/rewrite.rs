//! Markdown output: directive replacement and the blind-mode reference list.
//!
//! Replacement is literal, not regex-based: each directive's `raw_text` is
//! replaced once, in document order, so two identical directives each get
//! their own embed and a directive that failed is left untouched.

use super::annotation::AnnotationDirective;
use crate::output::ExtractionItem;
use std::fmt::Write as _;

/// Markdown path for an image, with forward slashes on every platform.
pub fn embed_path(path: &std::path::Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// The block that replaces a directive: image, blank line, italic caption.
pub fn embed_block(description: &str, image_path: &str) -> String {
    format!("![{description}]({image_path})\n\n*{description}*")
}

/// Replace each `(directive, image_path)` pair's raw text once.
///
/// Returns the rewritten text and how many replacements were made.
pub fn replace_directives(
    markdown: &str,
    embeds: &[(&AnnotationDirective, String)],
) -> (String, usize) {
    let mut content = markdown.to_string();
    let mut replaced = 0;
    for (directive, image_path) in embeds {
        if content.contains(&directive.raw_text) {
            content = content.replacen(
                &directive.raw_text,
                &embed_block(&directive.description, image_path),
                1,
            );
            replaced += 1;
        }
    }
    (content, replaced)
}

/// Reference list of extracted items, ready to paste into an article.
///
/// ````text
/// # Extracted figures and tables
///
/// ## Figure 1 (page 3)
///
/// ```markdown
/// ![Figure 1](images/figure1.png)
/// ```
/// ````
pub fn reference_list(items: &[ExtractionItem]) -> String {
    let mut out = String::from("# Extracted figures and tables\n\n");
    out.push_str("Copy the snippets below into your article:\n\n");

    for item in items.iter().filter(|i| i.is_success()) {
        let Some(ref path) = item.output_path else {
            continue;
        };
        let label = item.label();
        let _ = writeln!(out, "## {} (page {})\n", label, item.page_number());
        out.push_str("```markdown\n");
        let _ = writeln!(out, "![{}]({})", label, embed_path(path));
        out.push_str("```\n\n");
    }
    out
}
