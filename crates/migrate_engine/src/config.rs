use std::path::{Path, PathBuf};

use url::Url;

use crate::fetch::FetchSettings;

pub const DEFAULT_SITE_ROOT: &str = "http://www.hanuljari.com";
pub const DEFAULT_ITEM_LIMIT: usize = 20;

/// Selectors removed from every loaded document before content selection.
#[derive(Debug, Clone)]
pub struct SanitizeRules {
    pub remove_selectors: Vec<String>,
    pub script_href_prefix: String,
}

impl Default for SanitizeRules {
    fn default() -> Self {
        Self {
            remove_selectors: to_strings(&[
                // scripting and presentation
                "script",
                "style",
                "noscript",
                r#"link[rel="stylesheet"]"#,
                // page chrome
                "header",
                "nav",
                "footer",
                "iframe",
                ".skip",
                ".skipToContent",
                // legacy framework scaffolding
                "#slideWrap",
                ".layout_head",
                ".layout_foot",
                ".layout_topmenu",
                ".logo_line",
                ".leftside",
                ".lnb",
                ".s_location",
                ".update_news",
                ".bottom_menu_copy",
                ".wfsr",
                ".xe-widget-wrapper",
                ".xe_content",
                ".clear",
                // image maps
                "map",
                "area",
            ]),
            script_href_prefix: "javascript:".to_string(),
        }
    }
}

/// A standalone page persisted as one fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTarget {
    pub fragment_name: String,
    pub url: String,
}

impl PageTarget {
    pub fn new(fragment_name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            fragment_name: fragment_name.into(),
            url: url.into(),
        }
    }
}

/// A listing page crawled into one fragment of cards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardTarget {
    pub fragment_name: String,
    pub url: String,
    pub item_limit: usize,
}

impl BoardTarget {
    pub fn new(fragment_name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            fragment_name: fragment_name.into(),
            url: url.into(),
            item_limit: DEFAULT_ITEM_LIMIT,
        }
    }

    pub fn with_limit(mut self, item_limit: usize) -> Self {
        self.item_limit = item_limit;
        self
    }
}

/// Everything the pipeline needs, built once at start and handed to each component.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    pub site_root: Url,
    pub fragments_dir: PathBuf,
    pub images_dir: PathBuf,
    pub public_image_prefix: String,
    pub fetch: FetchSettings,
    pub sanitize: SanitizeRules,
    /// Known content containers, evaluated in order.
    pub content_candidates: Vec<String>,
    pub breadcrumb_selectors: Vec<String>,
    pub footer_attribution: String,
    pub default_alt: String,
    pub default_board_title: String,
    pub spam_keywords: Vec<String>,
    pub default_item_limit: usize,
}

impl MigrationConfig {
    /// Configuration for `site_root` writing below `output_root`
    /// (`public/fragments` and `public/images/imported`).
    pub fn for_site(site_root: Url, output_root: &Path) -> Self {
        Self {
            site_root,
            fragments_dir: output_root.join("public").join("fragments"),
            images_dir: output_root.join("public").join("images").join("imported"),
            public_image_prefix: "/images/imported".to_string(),
            fetch: FetchSettings::default(),
            sanitize: SanitizeRules::default(),
            content_candidates: to_strings(&[
                ".main_content",
                "#content",
                "#xe_content",
                "article",
                "section",
                ".content",
                ".contents",
                "#wrap",
                "#container",
            ]),
            breadcrumb_selectors: to_strings(&[r#"img[alt*="홈페이지"]"#, r#"img[src*="btnHome"]"#]),
            footer_attribution: "Skin By WebEngine".to_string(),
            default_alt: "이미지".to_string(),
            default_board_title: "제목 없음".to_string(),
            spam_keywords: to_strings(&[
                "마사지",
                "안마",
                "성인",
                "섹스",
                "porn",
                "카지노",
                "바카라",
                "토토",
                "먹튀",
                "비아그라",
                "viagra",
                "에로",
                "escort",
                "대출",
                "텔레그램",
                "선물거래",
                "주식 리딩",
                "해외직구",
                "도박",
                "유흥",
            ]),
            default_item_limit: DEFAULT_ITEM_LIMIT,
        }
    }

    /// Absolute URL for a path on the configured site.
    pub fn site_url(&self, path: &str) -> String {
        format!("{}/{}", self.site_root.as_str().trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        let root = Url::parse(DEFAULT_SITE_ROOT).expect("default site root is a valid url");
        Self::for_site(root, Path::new("."))
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
