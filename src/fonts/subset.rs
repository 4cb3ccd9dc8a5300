//! Rewriting `@font-face` rules to inline only the fonts a text needs.

use super::css::font_face_rules;
use std::collections::HashMap;
use url::Url;

/// Keep the `@font-face` rules of `css` whose resolved locator has an entry
/// in `resolved`, with the rule's `url()` replaced by the data URL.
///
/// Output follows source order, rules separated by newlines. Rules declared twice are
/// emitted twice.
pub fn rewrite_rules(css: &str, base: &Url, resolved: &HashMap<String, String>) -> String {
    let mut kept = Vec::new();
    for rule in font_face_rules(css) {
        let Some(url) = rule.url.as_ref() else { continue };
        let Ok(locator) = base.join(&url.value) else { continue };
        if let Some(data_url) = resolved.get(locator.as_str()) {
            kept.push(rule.text.replacen(&url.token, &format!("url(\"{}\")", data_url), 1));
        }
    }
    kept.join("\n")
}

/// Replace the first occurrence of each `(token, data_url)` pair's token.
pub fn inline_urls(rule_text: &str, resolved: &[(String, String)]) -> String {
    let mut out = rule_text.to_string();
    for (token, data_url) in resolved {
        out = out.replacen(token.as_str(), &format!("url(\"{}\")", data_url), 1);
    }
    out
}
