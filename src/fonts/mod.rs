//! Custom font handling
//!
//! - `css`: scanning `@import`, `@font-face`, `url()` and `unicode-range`
//! - `mapping`: the code point -> font file mapping
//! - `subset`: rewriting rules with inlined font data
//!
//! [`FontManager`] owns the active mapping for a session and produces the CSS
//! injected into every render.

pub mod css;
pub mod mapping;
pub mod subset;

pub use css::FontSource;
pub use mapping::FontMapping;

use crate::fetch::ResourceFetcher;
use crate::page::StyleSheet;
use crate::store::Namespace;
use futures::future::join_all;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use url::Url;

/// The mapping currently used for subsetting, with the source it came from
#[derive(Debug, Clone)]
pub struct ActiveFontMapping {
    pub identifier: String,
    pub source: FontSource,
    pub mapping: Rc<FontMapping>,
}

/// What a call to [`FontManager::process_style`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingOutcome {
    /// No `@import` or `@font-face` found; the active mapping was cleared
    NoCustomFont,
    /// The mapping for this source was already active
    AlreadyActive,
    /// Adopted a mapping persisted by an earlier session
    LoadedFromStore,
    /// Built, persisted and adopted a new mapping
    Built { entries: usize },
    /// Construction failed; the active mapping was cleared
    Failed,
}

pub struct FontManager {
    fetcher: Rc<ResourceFetcher>,
    active: RefCell<Option<ActiveFontMapping>>,
    icon_css: RefCell<Option<String>>,
}

impl FontManager {
    pub fn new(fetcher: Rc<ResourceFetcher>) -> Self {
        Self {
            fetcher,
            active: RefCell::new(None),
            icon_css: RefCell::new(None),
        }
    }

    pub fn active(&self) -> Option<ActiveFontMapping> {
        self.active.borrow().clone()
    }

    pub fn clear(&self) {
        self.active.borrow_mut().take();
    }

    fn adopt(&self, identifier: String, source: FontSource, mapping: FontMapping) {
        *self.active.borrow_mut() = Some(ActiveFontMapping {
            identifier,
            source,
            mapping: Rc::new(mapping),
        });
    }

    /// Base URL and CSS text of a source
    async fn source_css(&self, source: &FontSource) -> crate::Result<(Url, String)> {
        match source {
            FontSource::Remote { url } => {
                let text = self.fetcher.css_text(url).await?;
                Ok((Url::parse(url)?, text))
            }
            FontSource::Inline { css } => Ok((self.fetcher.document_url().clone(), css.clone())),
            FontSource::None => Err(crate::Error::FontMapping("no font source".into())),
        }
    }

    /// Make the mapping for the user's font CSS active.
    ///
    /// Re-running with unchanged CSS is a no-op. Otherwise the store is
    /// consulted before any stylesheet is downloaded or parsed.
    pub async fn process_style(&self, raw_css: Option<&str>) -> MappingOutcome {
        let raw_css = match raw_css.map(str::trim) {
            Some(css) if !css.is_empty() => css,
            _ => {
                log::warn!("Font Diagnosis: no custom style text found. System fonts will be used.");
                self.clear();
                return MappingOutcome::NoCustomFont;
            }
        };

        let source = FontSource::detect(raw_css, self.fetcher.document_url());
        let Some(identifier) = source.identifier() else {
            log::warn!("Font Diagnosis: no @import or inline @font-face rules found. System fonts will be used.");
            self.clear();
            return MappingOutcome::NoCustomFont;
        };
        let short: String = identifier.chars().take(70).collect();

        if self.active.borrow().as_ref().map(|a| a.identifier == identifier).unwrap_or(false) {
            log::info!("Font Diagnosis: mapping for \"{}\" is already active. Skipping.", short);
            return MappingOutcome::AlreadyActive;
        }

        let cache = self.fetcher.cache();
        if let Some(stored) = cache.get(Namespace::FontMappings, &identifier).await {
            match serde_json::from_str::<FontMapping>(&stored) {
                Ok(mapping) if !mapping.is_empty() => {
                    log::info!("Font Diagnosis: mapping loaded from store: {}", short);
                    self.adopt(identifier, source, mapping);
                    return MappingOutcome::LoadedFromStore;
                }
                Ok(_) => log::warn!("Font Diagnosis: stored mapping for {} is empty; rebuilding", short),
                Err(e) => log::warn!("Font Diagnosis: stored mapping for {} is unreadable ({}); rebuilding", short, e),
            }
        }

        let (base, css) = match self.source_css(&source).await {
            Ok(found) => found,
            Err(e) => {
                log::error!("Font Diagnosis: FAILED to download font CSS {}: {}", short, e);
                self.clear();
                return MappingOutcome::Failed;
            }
        };
        if css.trim().is_empty() {
            log::warn!("Font Diagnosis: font CSS {} is empty. System fonts will be used.", short);
            self.clear();
            return MappingOutcome::NoCustomFont;
        }

        log::info!("Font Diagnosis: creating new font mapping for {}", short);
        let mapping = FontMapping::build(&css, &base);
        if mapping.is_empty() {
            log::error!("Font Diagnosis: FAILED. No usable font URLs in {}", short);
            self.clear();
            return MappingOutcome::Failed;
        }

        let entries = mapping.len();
        match serde_json::to_string(&mapping) {
            Ok(json) => {
                cache.put(Namespace::FontMappings, &identifier, &json).await;
            }
            Err(e) => log::warn!("Font Diagnosis: could not serialize mapping: {}", e),
        }
        log::info!("Font Diagnosis: SUCCESS. Mapping with {} entries saved.", entries);
        self.adopt(identifier, source, mapping);
        MappingOutcome::Built { entries }
    }

    /// CSS with only the `@font-face` rules needed for `text`, fonts inlined.
    ///
    /// Fonts that fail to download are left out. Returns an empty string when
    /// no mapping is active.
    pub async fn subset_css(&self, text: &str) -> String {
        let Some(active) = self.active() else {
            return String::new();
        };
        let required: Vec<String> = active
            .mapping
            .required_locators(text)
            .into_iter()
            .map(str::to_string)
            .collect();
        if required.is_empty() {
            return String::new();
        }

        let fetched = join_all(required.iter().map(|url| async move {
            self.fetcher.font_data_url(url).await.map(|d| (url.clone(), d))
        }))
        .await;
        let resolved: HashMap<String, String> = fetched.into_iter().flatten().collect();
        if resolved.len() < required.len() {
            log::warn!(
                "{} of {} required fonts unavailable; falling back to system fonts for them",
                required.len() - resolved.len(),
                required.len()
            );
        }

        match self.source_css(&active.source).await {
            Ok((base, css)) => subset::rewrite_rules(&css, &base, &resolved),
            Err(e) => {
                log::error!("Font subsetting: could not load font CSS {}: {}", active.identifier, e);
                String::new()
            }
        }
    }

    /// `@font-face` rules of the icon font family with every `url()` inlined.
    ///
    /// Computed once per session; an empty result is not cached.
    pub async fn icon_font_css(&self, sheets: &[StyleSheet], family_marker: &str) -> String {
        if let Some(css) = self.icon_css.borrow().as_ref() {
            return css.clone();
        }

        let mut rules = Vec::new();
        for sheet in sheets {
            for rule in css::font_face_rules(&sheet.text) {
                if rule.family.as_deref().map(|f| f.contains(family_marker)).unwrap_or(false) {
                    rules.push((sheet.href.clone(), rule));
                }
            }
        }
        if rules.is_empty() {
            return String::new();
        }

        let processed = join_all(rules.iter().map(|(href, rule)| async move {
            let mut resolved = Vec::new();
            for url in rule.urls() {
                let Ok(absolute) = self.fetcher.resolve(&url.value, href.as_deref()) else {
                    continue;
                };
                if let Some(data_url) = self.fetcher.font_data_url(absolute.as_str()).await {
                    resolved.push((url.token, data_url));
                }
            }
            subset::inline_urls(&rule.text, &resolved)
        }))
        .await;

        let css = processed.join("\n");
        *self.icon_css.borrow_mut() = Some(css.clone());
        css
    }
}
