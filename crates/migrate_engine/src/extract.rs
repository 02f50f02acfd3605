use std::sync::Arc;

use engine_logging::{engine_debug, engine_info};

use crate::assets::{AssetStore, LocalizeStats};
use crate::dom::{DomTree, NodeId, SelectorError};
use crate::fetch::Fetcher;
use crate::sanitize::sanitize;
use crate::select::{select_main, text_len};
use crate::spam::SpamFilter;
use crate::{ExtractError, MigrationConfig};

/// Elements that carry content without any text of their own.
const MEDIA_ELEMENTS: &[&str] = &[
    "img", "video", "iframe", "audio", "picture", "embed", "object", "source", "svg", "canvas",
];
/// Never pruned even though they have no content.
const VOID_ELEMENTS: &[&str] = &["br", "hr", "input", "wbr", "col", "track", "param"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPage {
    pub html: String,
    pub text_len: usize,
    /// Keyword that flagged the main text, if any. Standalone pages are kept regardless.
    pub spam_keyword: Option<String>,
    pub images: LocalizeStats,
}

/// Turns one legacy page into fragment HTML: sanitize, pick the main node,
/// localize its images, prune leftovers and serialize.
#[derive(Clone)]
pub struct PageExtractor {
    config: Arc<MigrationConfig>,
    fetcher: Arc<dyn Fetcher>,
    assets: Arc<AssetStore>,
    spam: SpamFilter,
}

impl PageExtractor {
    pub fn new(config: Arc<MigrationConfig>, fetcher: Arc<dyn Fetcher>, assets: Arc<AssetStore>) -> Self {
        let spam = SpamFilter::new(&config.spam_keywords);
        Self {
            config,
            fetcher,
            assets,
            spam,
        }
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    pub fn fetcher(&self) -> &dyn Fetcher {
        self.fetcher.as_ref()
    }

    pub fn spam_filter(&self) -> &SpamFilter {
        &self.spam
    }

    pub async fn extract_page(&self, url: &str) -> Result<ExtractedPage, ExtractError> {
        let decoded = self.fetcher.fetch_text(url).await?;
        let (mut tree, main) = self.prepare(&decoded.html)?;

        let spam_keyword = self
            .spam
            .matched_keyword(&tree.text(main))
            .map(str::to_string);
        if let Some(keyword) = &spam_keyword {
            engine_info!("Page text matches spam keyword {:?}, keeping it: {}", keyword, url);
        }

        let images = self
            .assets
            .localize(&mut tree, main, self.fetcher.as_ref())
            .await?;
        let text_len = text_len(&tree, main);
        let html = self.finish(&mut tree, main);
        Ok(ExtractedPage {
            html,
            text_len,
            spam_keyword,
            images,
        })
    }

    /// Board post body, or `None` when the extracted text is spam.
    pub async fn extract_item(&self, url: &str) -> Result<Option<String>, ExtractError> {
        let decoded = self.fetcher.fetch_text(url).await?;
        let (mut tree, main) = self.prepare(&decoded.html)?;
        if let Some(keyword) = self.spam.matched_keyword(&tree.text(main)) {
            engine_info!("Skipping spam post ({:?}): {}", keyword, url);
            return Ok(None);
        }
        self.assets
            .localize(&mut tree, main, self.fetcher.as_ref())
            .await?;
        Ok(Some(self.finish(&mut tree, main)))
    }

    /// Parse, sanitize, select the main node and drop breadcrumb icons.
    pub fn prepare(&self, html: &str) -> Result<(DomTree, NodeId), SelectorError> {
        let mut tree = DomTree::parse(html);
        let stats = sanitize(&mut tree, &self.config.sanitize)?;
        engine_debug!(
            "Sanitized removed={} script_links={}",
            stats.removed,
            stats.script_links_replaced
        );
        let main = select_main(&tree, &self.config.content_candidates)?;
        for selector in &self.config.breadcrumb_selectors {
            for icon in tree.select_within(main, selector)? {
                tree.detach(icon);
            }
        }
        Ok((tree, main))
    }

    /// Prune, strip the footer attribution and serialize the main node's children.
    pub fn finish(&self, tree: &mut DomTree, main: NodeId) -> String {
        prune_empty(tree, main);
        strip_marker(tree, main, &self.config.footer_attribution);
        collapse_blank_lines(&tree.inner_html(main))
    }
}

/// Remove elements below `scope` with no text and no media, children first, so
/// wrappers emptied by the pass go too. Returns the number removed.
pub fn prune_empty(tree: &mut DomTree, scope: NodeId) -> usize {
    let mut removed = 0;
    for node in tree.descendants(scope).into_iter().rev() {
        let Some(name) = tree.name(node) else {
            continue;
        };
        if MEDIA_ELEMENTS.contains(&name) || VOID_ELEMENTS.contains(&name) {
            continue;
        }
        if tree.child_elements(node).next().is_some() || !tree.text(node).trim().is_empty() {
            continue;
        }
        tree.detach(node);
        removed += 1;
    }
    removed
}

/// Detach the innermost nodes below `scope` whose text contains `marker`.
pub fn strip_marker(tree: &mut DomTree, scope: NodeId, marker: &str) -> usize {
    if marker.is_empty() {
        return 0;
    }
    let mut removed = 0;
    let mut stack = vec![scope];
    while let Some(node) = stack.pop() {
        for child in tree.children(node).to_vec() {
            if !tree.text(child).contains(marker) {
                continue;
            }
            let deeper = tree
                .child_elements(child)
                .any(|grandchild| tree.text(grandchild).contains(marker));
            if deeper {
                stack.push(child);
            } else {
                tree.detach(child);
                removed += 1;
            }
        }
    }
    removed
}

/// Collapse every run of three or more newlines into exactly two.
pub fn collapse_blank_lines(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut newlines = 0;
    for ch in html.chars() {
        if ch == '\n' {
            newlines += 1;
            continue;
        }
        out.push_str(if newlines >= 3 { "\n\n" } else { &"\n\n"[..newlines] });
        newlines = 0;
        out.push(ch);
    }
    out.push_str(if newlines >= 3 { "\n\n" } else { &"\n\n"[..newlines] });
    out
}
