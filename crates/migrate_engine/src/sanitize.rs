use crate::config::SanitizeRules;
use crate::dom::{DomTree, SelectorError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SanitizeStats {
    pub removed: usize,
    pub script_links_replaced: usize,
}

/// Strip legacy chrome and scripting in place. Must run before content selection,
/// which scores candidates by their remaining text.
pub fn sanitize(tree: &mut DomTree, rules: &SanitizeRules) -> Result<SanitizeStats, SelectorError> {
    let mut stats = SanitizeStats::default();

    if !rules.remove_selectors.is_empty() {
        for node in tree.select(&rules.remove_selectors.join(", "))? {
            // An ancestor matched earlier in the same pass may already have taken it out.
            if tree.is_attached(node) {
                tree.detach(node);
                stats.removed += 1;
            }
        }
    }

    let prefix = rules.script_href_prefix.to_ascii_lowercase();
    for anchor in tree.select("a[href]")? {
        let is_script = tree
            .attr(anchor, "href")
            .map(|href| href.trim_start().to_ascii_lowercase().starts_with(&prefix))
            .unwrap_or(false);
        if !is_script || !tree.is_attached(anchor) {
            continue;
        }
        let text = tree.text(anchor);
        let span = tree.create_element("span");
        let text_node = tree.create_text(text);
        tree.append_child(span, text_node);
        tree.replace_with(anchor, span);
        stats.script_links_replaced += 1;
    }

    Ok(stats)
}
