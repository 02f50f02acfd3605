use encoding_rs::{EUC_KR, UTF_8};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedHtml {
    pub html: String,
    pub encoding_label: String,
    /// Malformed sequences were replaced with U+FFFD.
    pub had_errors: bool,
}

const DEFAULT_CHARSET: &str = "utf-8";

/// Charset labels the legacy site used for its Korean pages.
const LEGACY_KOREAN_LABELS: &[&str] = &["euc-kr", "ks_c_5601", "cp949", "windows-949"];

/// Decode raw bytes using the Content-Type charset: legacy Korean -> EUC-KR, anything else -> UTF-8.
pub fn decode_html(bytes: &[u8], content_type: Option<&str>) -> DecodedHtml {
    let label = resolve_encoding(content_type.unwrap_or(""));
    decode(bytes, &label)
}

/// Lowercased `charset=` label from a Content-Type header, `utf-8` when missing.
pub fn resolve_encoding(content_type: &str) -> String {
    extract_charset(content_type).unwrap_or_else(|| DEFAULT_CHARSET.to_string())
}

pub fn is_legacy_korean(label: &str) -> bool {
    let label = label.to_ascii_lowercase();
    LEGACY_KOREAN_LABELS
        .iter()
        .any(|legacy| label.contains(legacy))
}

/// Never fails; invalid sequences decode as U+FFFD.
pub fn decode(bytes: &[u8], encoding_label: &str) -> DecodedHtml {
    let encoding = if is_legacy_korean(encoding_label) {
        EUC_KR
    } else {
        UTF_8
    };
    let (text, used, had_errors) = encoding.decode(bytes);
    DecodedHtml {
        html: text.into_owned(),
        encoding_label: used.name().to_string(),
        had_errors,
    }
}

fn extract_charset(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .filter_map(|part| {
            let (key, value) = part.split_once('=')?;
            if !key.trim().eq_ignore_ascii_case("charset") {
                return None;
            }
            let value = value.trim().trim_matches(['"', '\''].as_ref()).trim();
            (!value.is_empty()).then(|| value.to_ascii_lowercase())
        })
        .next()
}
