//! Content-addressed image localization.
//!
//! Every `<img src>` under the selected content node is downloaded once per
//! run, stored as `<stem>_<sha1 prefix><ext>` in the images directory and
//! rewritten to its public path. The store outlives single pages: repeated
//! references to a URL reuse the first download, concurrent requests for a URL
//! share one in-flight fetch, and a destination file is written at most once.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use engine_logging::{engine_debug, engine_warn};
use futures_util::future::join_all;
use sha1::{Digest, Sha1};
use tokio::sync::OnceCell;
use url::Url;

use crate::dom::{DomTree, NodeId, SelectorError};
use crate::fetch::Fetcher;
use crate::links::resolve_url;
use crate::persist::{AtomicFileWriter, PersistError};
use crate::{FetchError, MigrationConfig};

const MAX_FILENAME_LEN: usize = 100;
const MAX_EXTENSION_LEN: usize = 16;
const RESPONSIVE_STYLE: &str = "max-width:100%;height:auto;";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    pub remote_url: String,
    pub file_name: String,
    pub local_path: String,
    pub content_hash: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("download failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("store failed: {0}")]
    Persist(#[from] PersistError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalizeStats {
    pub images: usize,
    pub localized: usize,
    pub failed: usize,
}

pub struct AssetStore {
    site_root: Url,
    public_prefix: String,
    default_alt: String,
    writer: AtomicFileWriter,
    by_url: Mutex<HashMap<String, Arc<OnceCell<AssetRecord>>>>,
    by_file: Mutex<HashMap<String, Arc<OnceCell<()>>>>,
    files_written: AtomicUsize,
}

impl AssetStore {
    pub fn new(config: &MigrationConfig) -> Self {
        Self {
            site_root: config.site_root.clone(),
            public_prefix: config.public_image_prefix.trim_end_matches('/').to_string(),
            default_alt: config.default_alt.clone(),
            writer: AtomicFileWriter::new(config.images_dir.clone()),
            by_url: Mutex::new(HashMap::new()),
            by_file: Mutex::new(HashMap::new()),
            files_written: AtomicUsize::new(0),
        }
    }

    pub fn dir(&self) -> PathBuf {
        self.writer.dir().to_path_buf()
    }

    /// Files written to disk by this store during the run.
    pub fn files_written(&self) -> usize {
        self.files_written.load(Ordering::Relaxed)
    }

    /// Every asset localized so far, sorted by remote URL.
    pub fn records(&self) -> Vec<AssetRecord> {
        let by_url = self.by_url.lock().unwrap_or_else(PoisonError::into_inner);
        let mut records: Vec<AssetRecord> =
            by_url.values().filter_map(|cell| cell.get().cloned()).collect();
        records.sort_by(|a, b| a.remote_url.cmp(&b.remote_url));
        records
    }

    /// Download and rewrite every `img[src]` below `scope`.
    ///
    /// Downloads run concurrently. A failed image keeps its original `src` but
    /// still gets the lazy-loading, alt and sizing treatment.
    pub async fn localize(
        &self,
        tree: &mut DomTree,
        scope: NodeId,
        fetcher: &dyn Fetcher,
    ) -> Result<LocalizeStats, SelectorError> {
        let images: Vec<(NodeId, Option<Url>)> = tree
            .select_within(scope, "img[src]")?
            .into_iter()
            .map(|img| {
                let url = tree
                    .attr(img, "src")
                    .and_then(|src| resolve_url(src, &self.site_root));
                (img, url)
            })
            .collect();

        let mut unique: Vec<&Url> = Vec::new();
        for url in images.iter().filter_map(|(_, url)| url.as_ref()) {
            if !unique.contains(&url) {
                unique.push(url);
            }
        }
        let results = join_all(unique.iter().map(|url| self.localize_url(url, fetcher))).await;
        let resolved: HashMap<&str, Result<AssetRecord, AssetError>> = unique
            .iter()
            .map(|url| url.as_str())
            .zip(results)
            .collect();

        let mut stats = LocalizeStats {
            images: images.len(),
            ..LocalizeStats::default()
        };
        for (img, url) in &images {
            match url.as_ref().and_then(|url| resolved.get(url.as_str())) {
                Some(Ok(record)) => {
                    tree.set_attr(*img, "src", record.local_path.clone());
                    stats.localized += 1;
                }
                Some(Err(err)) => {
                    let url = url.as_ref().map_or("", |u| u.as_str());
                    engine_warn!("Image not localized url={} error={}", url, err);
                    stats.failed += 1;
                }
                None => {
                    engine_debug!("Image src not resolvable: {:?}", tree.attr(*img, "src"));
                    stats.failed += 1;
                }
            }
            self.apply_presentation(tree, *img);
        }
        Ok(stats)
    }

    async fn localize_url(&self, url: &Url, fetcher: &dyn Fetcher) -> Result<AssetRecord, AssetError> {
        let cell = {
            let mut by_url = self.by_url.lock().unwrap_or_else(PoisonError::into_inner);
            by_url.entry(url.to_string()).or_default().clone()
        };
        cell.get_or_try_init(|| self.download(url, fetcher))
            .await
            .cloned()
    }

    async fn download(&self, url: &Url, fetcher: &dyn Fetcher) -> Result<AssetRecord, AssetError> {
        let output = fetcher.fetch_raw(url.as_str()).await?;
        let content_hash = short_sha1(&output.bytes);
        let file_name = asset_filename(url, &content_hash);
        self.store(&file_name, output.bytes).await?;
        Ok(AssetRecord {
            remote_url: url.to_string(),
            local_path: format!("{}/{}", self.public_prefix, file_name),
            file_name,
            content_hash,
        })
    }

    /// Write `bytes` unless this run or an earlier one already produced the file.
    /// Concurrent stores of one file name share a single write.
    async fn store(&self, file_name: &str, bytes: Vec<u8>) -> Result<(), PersistError> {
        let cell = {
            let mut by_file = self.by_file.lock().unwrap_or_else(PoisonError::into_inner);
            by_file.entry(file_name.to_string()).or_default().clone()
        };
        cell.get_or_try_init(|| self.write_new(file_name, bytes))
            .await?;
        Ok(())
    }

    async fn write_new(&self, file_name: &str, bytes: Vec<u8>) -> Result<(), PersistError> {
        let writer = self.writer.clone();
        let name = file_name.to_string();
        let written = tokio::task::spawn_blocking(move || {
            if writer.dir().join(&name).is_file() {
                return Ok::<_, PersistError>(false);
            }
            writer.write_bytes(&name, &bytes)?;
            Ok(true)
        })
        .await
        .map_err(|err| PersistError::Io(io::Error::other(err)))??;
        if written {
            self.files_written.fetch_add(1, Ordering::Relaxed);
            engine_debug!("Stored asset {}", file_name);
        }
        Ok(())
    }

    fn apply_presentation(&self, tree: &mut DomTree, img: NodeId) {
        tree.set_attr(img, "loading", "lazy");
        if tree.attr(img, "alt").map_or(true, |alt| alt.trim().is_empty()) {
            tree.set_attr(img, "alt", self.default_alt.clone());
        }
        tree.remove_attr(img, "width");
        tree.remove_attr(img, "height");
        let style = tree.attr(img, "style").unwrap_or("").trim().to_string();
        if !has_responsive_width(&style) {
            let style = if style.is_empty() {
                RESPONSIVE_STYLE.to_string()
            } else {
                format!("{};{}", style.trim_end_matches(';'), RESPONSIVE_STYLE)
            };
            tree.set_attr(img, "style", style);
        }
    }
}

fn has_responsive_width(style: &str) -> bool {
    let compact: String = style
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    compact.contains("max-width:100%")
}

/// First 8 hex characters of the SHA-1 of `bytes`.
pub fn short_sha1(bytes: &[u8]) -> String {
    let digest = Sha1::digest(bytes);
    let mut hex = String::with_capacity(8);
    for byte in digest.iter().take(4) {
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}

/// `<stem>_<hash><ext>` from the URL's last path segment. Stem and extension
/// are sanitized separately and only the stem is shortened, so the result stays
/// within 100 chars and always ends in the hash and extension.
pub fn asset_filename(url: &Url, hash: &str) -> String {
    let base = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .unwrap_or("file");
    let (stem, ext) = match base.rfind('.') {
        Some(idx) if idx > 0 => (&base[..idx], &base[idx..]),
        _ => (base, ".bin"),
    };
    let mut ext = sanitize_filename(ext);
    ext.truncate(MAX_EXTENSION_LEN);
    let mut stem = sanitize_filename(stem);
    stem.truncate(MAX_FILENAME_LEN.saturating_sub(1 + hash.len() + ext.len()));
    format!("{stem}_{hash}{ext}")
}

/// Collapse each run of characters outside `[A-Za-z0-9._-]` into `_`, then truncate.
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_run = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
            out.push(ch);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }
    out.truncate(MAX_FILENAME_LEN);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha1_prefix_is_eight_hex_chars() {
        // sha1("abc") = a9993e36...
        assert_eq!(short_sha1(b"abc"), "a9993e36");
    }

    #[test]
    fn filename_keeps_extension_after_hash() {
        let url = Url::parse("http://www.example.com/files/photo.01.JPG").unwrap();
        assert_eq!(asset_filename(&url, "deadbeef"), "photo.01_deadbeef.JPG");
    }

    #[test]
    fn filename_defaults_for_bare_paths() {
        let url = Url::parse("http://www.example.com/").unwrap();
        assert_eq!(asset_filename(&url, "0badf00d"), "file_0badf00d.bin");
        let url = Url::parse("http://www.example.com/img/logo").unwrap();
        assert_eq!(asset_filename(&url, "0badf00d"), "logo_0badf00d.bin");
    }

    #[test]
    fn filename_sanitizes_encoded_names() {
        let url = Url::parse("http://www.example.com/img/사진 1.png").unwrap();
        let name = asset_filename(&url, "12345678");
        assert!(name.ends_with("_12345678.png"), "{name}");
        assert!(name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')));
    }

    #[test]
    fn long_names_keep_hash_and_extension() {
        let url = Url::parse("http://www.example.com/img/한울자리 2019년 정기총회 현장 사진.jpg").unwrap();
        let name = asset_filename(&url, "deadbeef");
        assert_eq!(name.len(), MAX_FILENAME_LEN);
        assert!(name.ends_with("_deadbeef.jpg"), "{name}");

        let a = Url::parse(&format!("http://www.example.com/a/{}.png", "p".repeat(120))).unwrap();
        let b = Url::parse(&format!("http://www.example.com/b/{}.png", "p".repeat(120))).unwrap();
        assert_ne!(asset_filename(&a, "11111111"), asset_filename(&b, "22222222"));
    }

    #[test]
    fn sanitize_truncates_to_limit() {
        let long = "a".repeat(150);
        assert_eq!(sanitize_filename(&long).len(), MAX_FILENAME_LEN);
        assert_eq!(sanitize_filename("a b  c"), "a_b_c");
    }

    #[test]
    fn responsive_rule_detection_ignores_spacing() {
        assert!(has_responsive_width("border:0; MAX-WIDTH : 100%"));
        assert!(!has_responsive_width("max-width:50%"));
    }
}
