//! Scanning font CSS: `@import`, `@font-face`, `url()` and `unicode-range`.
//!
//! Only the pieces needed for font subsetting are extracted; everything else
//! in the stylesheet is ignored.

use regex::Regex;
use sha2::{Digest, Sha256};
use std::ops::RangeInclusive;
use std::sync::OnceLock;
use url::Url;

/// Identifier prefix for mappings built from inline `@font-face` text
pub const INLINE_PREFIX: &str = "inline-style:";

const URL_PATTERN: &str = r#"url\(\s*(?:"([^"]*)"|'([^']*)'|([^)"'\s]*))\s*\)"#;

fn font_face_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)@font-face\s*\{([^}]*)\}").expect("font-face pattern"))
}

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(URL_PATTERN).expect("url pattern"))
}

fn import_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(&format!(r"(?i)@import\s+{}\s*;?", URL_PATTERN)).expect("import pattern"))
}

fn unicode_range_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)unicode-range\s*:\s*([^;}]*)").expect("unicode-range pattern"))
}

fn font_family_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)font-family\s*:\s*([^;}]*)").expect("font-family pattern"))
}

fn comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)/\*.*?\*/").expect("comment pattern"))
}

/// A `url(...)` token inside a rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRef {
    /// The whole token as written, e.g. `url("a.woff2")`
    pub token: String,
    /// The unquoted locator
    pub value: String,
}

/// One `@font-face { ... }` block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontFaceRule {
    /// The full rule text
    pub text: String,
    /// First `url()` in the block, if well-formed
    pub url: Option<UrlRef>,
    /// Raw `unicode-range` value
    pub unicode_range: Option<String>,
    /// Raw `font-family` value with quotes removed
    pub family: Option<String>,
}

impl FontFaceRule {
    /// Every `url()` in the block, in order
    pub fn urls(&self) -> Vec<UrlRef> {
        url_refs(&self.text)
    }
}

fn url_ref_from(caps: &regex::Captures<'_>) -> Option<UrlRef> {
    let value = caps
        .get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))
        .map(|m| m.as_str().trim())?;
    if value.is_empty() {
        return None;
    }
    Some(UrlRef {
        token: caps.get(0)?.as_str().to_string(),
        value: value.to_string(),
    })
}

/// All well-formed `url()` tokens in `text`
pub fn url_refs(text: &str) -> Vec<UrlRef> {
    url_re().captures_iter(text).filter_map(|c| url_ref_from(&c)).collect()
}

/// All `@font-face` blocks in source order. Comments are dropped first.
pub fn font_face_rules(css: &str) -> Vec<FontFaceRule> {
    let css = comment_re().replace_all(css, "");
    font_face_re()
        .captures_iter(&css)
        .filter_map(|caps| {
            let text = caps.get(0)?.as_str().to_string();
            let body = caps.get(1)?.as_str();
            let url = url_re().captures(body).and_then(|c| url_ref_from(&c));
            let unicode_range = unicode_range_re()
                .captures(body)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
                .filter(|s| !s.is_empty());
            let family = font_family_re()
                .captures(body)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().trim_matches(|c| c == '"' || c == '\'').to_string());
            Some(FontFaceRule {
                text,
                url,
                unicode_range,
                family,
            })
        })
        .collect()
}

fn parse_hex(s: &str) -> Option<u32> {
    if s.is_empty() || s.len() > 6 {
        return None;
    }
    u32::from_str_radix(s, 16).ok().filter(|cp| *cp <= 0x10FFFF)
}

/// Parse a `unicode-range` value into inclusive code point ranges.
///
/// Accepts single points (`U+41`), intervals (`U+0-7F`) and wildcards
/// (`U+4??`). Malformed entries are skipped.
pub fn parse_unicode_range(value: &str) -> Vec<RangeInclusive<u32>> {
    value
        .split(',')
        .filter_map(|part| {
            let part = part.trim().to_ascii_uppercase();
            let hex = part.strip_prefix("U+")?;
            if let Some((start, end)) = hex.split_once('-') {
                let (start, end) = (parse_hex(start.trim())?, parse_hex(end.trim())?);
                (start <= end).then_some(start..=end)
            } else if hex.contains('?') {
                let start = parse_hex(&hex.replace('?', "0"))?;
                let end = parse_hex(&hex.replace('?', "F"))?;
                Some(start..=end)
            } else {
                let cp = parse_hex(hex)?;
                Some(cp..=cp)
            }
        })
        .collect()
}

/// Where the user's font CSS comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontSource {
    /// `@import url(...)` of a remote stylesheet
    Remote { url: String },
    /// Literal `@font-face` rules in the style element
    Inline { css: String },
    /// Nothing font-related
    None,
}

impl FontSource {
    /// Detect the source kind; `@import` takes precedence over inline rules.
    /// Relative import locators resolve against `document_url`.
    pub fn detect(raw_css: &str, document_url: &Url) -> FontSource {
        if let Some(import) = import_re().captures(raw_css).and_then(|c| url_ref_from(&c)) {
            let url = document_url
                .join(&import.value)
                .map(|u| u.to_string())
                .unwrap_or(import.value);
            return FontSource::Remote { url };
        }
        if raw_css.to_ascii_lowercase().contains("@font-face") {
            return FontSource::Inline {
                css: raw_css.to_string(),
            };
        }
        FontSource::None
    }

    /// Stable identifier used as the mapping's store key.
    ///
    /// Inline sources hash their trimmed text, so any edit yields a new key.
    pub fn identifier(&self) -> Option<String> {
        match self {
            FontSource::Remote { url } => Some(url.clone()),
            FontSource::Inline { css } => {
                let digest = Sha256::digest(css.trim().as_bytes());
                Some(format!("{}{}", INLINE_PREFIX, hex::encode(digest)))
            }
            FontSource::None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CSS: &str = r#"
        /* @font-face { src: url(commented.woff2) } */
        @font-face {
            font-family: "Noto Sans SC";
            src: url('./sc.0.woff2') format('woff2');
            unicode-range: U+4E00-4E01, U+41;
        }
        @font-face{font-family:Base;src:url(base.woff2)}
        @font-face { font-family: Broken; src: url() }
    "#;

    #[test]
    fn rules_are_found_in_source_order() {
        let rules = font_face_rules(CSS);
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0].family.as_deref(), Some("Noto Sans SC"));
        assert_eq!(rules[0].url.as_ref().unwrap().value, "./sc.0.woff2");
        assert_eq!(rules[0].url.as_ref().unwrap().token, "url('./sc.0.woff2')");
        assert_eq!(rules[0].unicode_range.as_deref(), Some("U+4E00-4E01, U+41"));
        assert_eq!(rules[1].url.as_ref().unwrap().value, "base.woff2");
        assert_eq!(rules[1].unicode_range, None);
        assert_eq!(rules[2].url, None);
    }

    #[test]
    fn unicode_ranges_parse() {
        assert_eq!(
            parse_unicode_range("U+0-7F, u+41 ,U+4??, U+ZZ, 41, U+20-10"),
            vec![0..=0x7F, 0x41..=0x41, 0x400..=0x4FF]
        );
    }

    #[test]
    fn import_takes_precedence() {
        let doc = Url::parse("https://chat.example/app/").unwrap();
        let src = FontSource::detect(
            "@import url(\"fonts/site.css\");\n@font-face{src:url(x.woff)}",
            &doc,
        );
        assert_eq!(
            src,
            FontSource::Remote {
                url: "https://chat.example/app/fonts/site.css".into()
            }
        );
        assert_eq!(src.identifier().as_deref(), Some("https://chat.example/app/fonts/site.css"));
    }

    #[test]
    fn inline_identifier_tracks_content() {
        let doc = Url::parse("https://chat.example/").unwrap();
        let a = FontSource::detect("@font-face{src:url(a.woff)}", &doc);
        let b = FontSource::detect("  @font-face{src:url(a.woff)}\n", &doc);
        let c = FontSource::detect("@font-face{src:url(b.woff)}", &doc);
        assert!(a.identifier().unwrap().starts_with(INLINE_PREFIX));
        assert_eq!(a.identifier(), b.identifier());
        assert_ne!(a.identifier(), c.identifier());
        assert_eq!(FontSource::detect("body{color:red}", &doc), FontSource::None);
    }
}
