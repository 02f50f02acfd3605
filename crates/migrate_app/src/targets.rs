//! Compiled-in migration targets.

use migrate_engine::{BoardTarget, MigrationConfig, PageTarget};

const PAGES: &[&str] = &[
    "sub06", "sub07", "sub06_02", "sub02", "sub02_04", "sub02_06", "sub02_02", "sub02_05",
    "sub09_02", "sub09_03",
    // product page
    "ham",
];

const BOARDS: &[&str] = &["file", "data", "data02", "data03", "data04"];

/// Standalone pages; each fragment is named after its site path.
pub fn pages(config: &MigrationConfig) -> Vec<PageTarget> {
    PAGES
        .iter()
        .map(|name| PageTarget::new(*name, config.site_url(name)))
        .collect()
}

pub fn boards(config: &MigrationConfig) -> Vec<BoardTarget> {
    BOARDS
        .iter()
        .map(|name| BoardTarget::new(*name, config.site_url(name)).with_limit(config.default_item_limit))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_point_at_the_site_root() {
        let config = MigrationConfig::default();
        let pages = pages(&config);
        assert_eq!(pages.len(), 11);
        assert_eq!(pages[0].url, "http://www.hanuljari.com/sub06");
        assert_eq!(pages.last().unwrap().fragment_name, "ham");

        let boards = boards(&config);
        assert_eq!(boards.len(), 5);
        assert!(boards.iter().all(|b| b.item_limit == 20));
    }
}
