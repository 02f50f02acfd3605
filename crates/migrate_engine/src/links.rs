use url::Url;

use crate::dom::{DomTree, SelectorError};

/// Minimum run of trailing digits that marks a post URL on the legacy boards.
const POST_ID_MIN_DIGITS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostLink {
    pub url: Url,
    pub title: String,
}

/// Resolve an `href`/`src` value against the site root.
///
/// Handles absolute, protocol-relative (`//host/x`, taken as `http:`), root-relative
/// and document-relative forms. Anything that does not end up as an HTTP(S) URL is
/// rejected.
pub fn resolve_url(reference: &str, site_root: &Url) -> Option<Url> {
    let trimmed = reference.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let resolved = if let Some(rest) = trimmed.strip_prefix("//") {
        Url::parse(&format!("http://{rest}")).ok()?
    } else {
        directory_base(site_root)
            .join(trimmed.strip_prefix("./").unwrap_or(trimmed))
            .ok()?
    };
    matches!(resolved.scheme(), "http" | "https").then_some(resolved)
}

/// Root URL with a trailing slash so relative joins stay below it.
fn directory_base(site_root: &Url) -> Url {
    let mut base = site_root.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

/// Same origin as the site root and below its path.
pub fn is_under_root(url: &Url, site_root: &Url) -> bool {
    url.scheme() == site_root.scheme()
        && url.host_str() == site_root.host_str()
        && url.port_or_known_default() == site_root.port_or_known_default()
        && path_is_under(url.path(), site_root.path())
}

/// Segment-wise prefix test: `/foo` covers `/foo` and `/foo/1`, not `/foobar`.
fn path_is_under(path: &str, root: &str) -> bool {
    let root = root.trim_end_matches('/');
    match path.strip_prefix(root) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Board post heuristic: the full URL ends in at least three digits.
pub fn looks_like_post(url: &Url) -> bool {
    url.as_str()
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .count()
        >= POST_ID_MIN_DIGITS
}

/// Post links of a listing page, deduplicated by URL in first-seen order and capped at `limit`.
pub fn discover_post_links(
    tree: &DomTree,
    site_root: &Url,
    limit: usize,
) -> Result<Vec<PostLink>, SelectorError> {
    let mut links: Vec<PostLink> = Vec::new();
    for anchor in tree.select("a[href]")? {
        let Some(url) = tree
            .attr(anchor, "href")
            .and_then(|href| resolve_url(href, site_root))
        else {
            continue;
        };
        if !is_under_root(&url, site_root) || !looks_like_post(&url) {
            continue;
        }
        if links.iter().any(|link| link.url == url) {
            continue;
        }
        links.push(PostLink {
            url,
            title: tree.text(anchor).trim().to_string(),
        });
    }
    links.truncate(limit);
    Ok(links)
}
