//! Migration engine: turns legacy site pages and boards into HTML fragments
//! with locally stored images.
mod assets;
mod board;
mod config;
mod decode;
mod dom;
mod engine;
mod extract;
mod fetch;
mod links;
mod persist;
mod sanitize;
mod select;
mod spam;
mod types;

pub use assets::{asset_filename, sanitize_filename, short_sha1, AssetError, AssetRecord, AssetStore, LocalizeStats};
pub use board::{render_board, BoardCrawler, BoardFragment, BoardItem};
pub use config::{
    BoardTarget, MigrationConfig, PageTarget, SanitizeRules, DEFAULT_ITEM_LIMIT, DEFAULT_SITE_ROOT,
};
pub use decode::{decode, decode_html, is_legacy_korean, resolve_encoding, DecodedHtml};
pub use dom::{escape_html, DomTree, ElementData, NodeId, NodeKind, SelectorError};
pub use engine::Migrator;
pub use extract::{collapse_blank_lines, prune_empty, strip_marker, ExtractedPage, PageExtractor};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher};
pub use links::{discover_post_links, is_under_root, looks_like_post, resolve_url, PostLink};
pub use persist::{ensure_output_dir, fragment_filename, AtomicFileWriter, FragmentWriter, PersistError};
pub use sanitize::{sanitize, SanitizeStats};
pub use select::{select_main, text_len};
pub use spam::SpamFilter;
pub use types::{
    ExtractError, FailureKind, FetchError, FetchMetadata, FetchOutput, MigrationReport,
    TargetError, TargetKind, TargetOutcome, TargetReport,
};
