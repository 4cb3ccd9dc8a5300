//! Code point -> font file mapping built from `@font-face` rules.

use super::css::{font_face_rules, parse_unicode_range};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;
use url::Url;

/// Maps code points (and a fallback) to absolute font file locators.
///
/// Locators are interned; each code point stores an index into `locators`.
/// A mapping is immutable once built and shared behind an `Rc`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontMapping {
    locators: Vec<String>,
    codepoints: BTreeMap<u32, usize>,
    fallback: Option<usize>,
}

impl FontMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from CSS text. Relative locators resolve against `base`.
    ///
    /// Rules with a `unicode-range` map every covered code point; rules
    /// without one become the fallback. Later rules win on overlap.
    pub fn build(css: &str, base: &Url) -> FontMapping {
        let mut mapping = FontMapping::new();
        for rule in font_face_rules(css) {
            let Some(url) = rule.url else { continue };
            let locator = match base.join(&url.value) {
                Ok(u) => u.to_string(),
                Err(e) => {
                    log::warn!("Font Diagnosis: skipping unresolvable url '{}': {}", url.value, e);
                    continue;
                }
            };
            match rule.unicode_range {
                Some(ranges) => {
                    for range in parse_unicode_range(&ranges) {
                        mapping.insert_range(range, &locator);
                    }
                }
                None => mapping.set_fallback(&locator),
            }
        }
        mapping
    }

    fn intern(&mut self, locator: &str) -> usize {
        match self.locators.iter().position(|l| l == locator) {
            Some(idx) => idx,
            None => {
                self.locators.push(locator.to_string());
                self.locators.len() - 1
            }
        }
    }

    pub fn insert_range(&mut self, range: RangeInclusive<u32>, locator: &str) {
        let idx = self.intern(locator);
        for cp in range {
            self.codepoints.insert(cp, idx);
        }
    }

    pub fn set_fallback(&mut self, locator: &str) {
        let idx = self.intern(locator);
        self.fallback = Some(idx);
    }

    /// Locator for a code point, ignoring the fallback
    pub fn get(&self, codepoint: u32) -> Option<&str> {
        let idx = *self.codepoints.get(&codepoint)?;
        self.locators.get(idx).map(|s| s.as_str())
    }

    pub fn fallback(&self) -> Option<&str> {
        self.fallback.and_then(|idx| self.locators.get(idx)).map(|s| s.as_str())
    }

    /// Number of entries, counting the fallback as one
    pub fn len(&self) -> usize {
        self.codepoints.len() + usize::from(self.fallback.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Font files needed to render `text`: the fallback (if any) plus the
    /// file of every mapped code point in the text.
    pub fn required_locators(&self, text: &str) -> BTreeSet<&str> {
        let mut required: BTreeSet<&str> = self.fallback().into_iter().collect();
        for ch in text.chars() {
            if let Some(locator) = self.get(ch as u32) {
                required.insert(locator);
            }
        }
        required
    }
}
