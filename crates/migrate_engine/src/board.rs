use engine_logging::{engine_debug, engine_info, engine_warn};

use crate::dom::{escape_html, DomTree};
use crate::extract::PageExtractor;
use crate::links::discover_post_links;
use crate::sanitize::sanitize;
use crate::ExtractError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardItem {
    pub title: String,
    pub body_html: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardFragment {
    pub html: String,
    pub items: Vec<BoardItem>,
    /// Candidates skipped by the spam screen, before or after fetching.
    pub screened: usize,
    /// Candidates lost to fetch or parse failures.
    pub dropped: usize,
}

/// Crawls a legacy listing page into one fragment of post cards.
#[derive(Clone)]
pub struct BoardCrawler {
    pages: PageExtractor,
}

impl BoardCrawler {
    pub fn new(pages: PageExtractor) -> Self {
        Self { pages }
    }

    pub async fn crawl_board(&self, list_url: &str, item_limit: usize) -> Result<BoardFragment, ExtractError> {
        let config = self.pages.config();
        let listing = self.pages.fetcher().fetch_text(list_url).await?;
        let mut tree = DomTree::parse(&listing.html);
        sanitize(&mut tree, &config.sanitize)?;
        let links = discover_post_links(&tree, &config.site_root, item_limit)?;
        engine_debug!("Board {} candidates={}", list_url, links.len());

        let mut items = Vec::new();
        let mut screened = 0;
        let mut dropped = 0;
        for link in links {
            // Screen the anchor text first so obvious spam costs no request.
            if self.pages.spam_filter().is_spam(&link.title) {
                engine_info!("Skipping spam link {:?}: {}", link.title, link.url);
                screened += 1;
                continue;
            }
            match self.pages.extract_item(link.url.as_str()).await {
                Ok(Some(body_html)) => items.push(BoardItem {
                    title: if link.title.is_empty() {
                        config.default_board_title.clone()
                    } else {
                        link.title
                    },
                    body_html,
                }),
                Ok(None) => screened += 1,
                Err(err) => {
                    engine_warn!("Dropping board item {}: {}", link.url, err);
                    dropped += 1;
                }
            }
        }

        Ok(BoardFragment {
            html: render_board(&items),
            items,
            screened,
            dropped,
        })
    }
}

/// One list container with a card per item, in order.
pub fn render_board(items: &[BoardItem]) -> String {
    let mut lines = Vec::with_capacity(items.len() + 2);
    lines.push(r#"<div class="board-list">"#.to_string());
    for item in items {
        lines.push(format!(
            r#"<article class="card"><h2>{}</h2><div class="content">{}</div></article>"#,
            escape_html(&item.title),
            item.body_html
        ));
    }
    lines.push("</div>".to_string());
    lines.join("\n")
}
