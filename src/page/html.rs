//! Snapshot of a chat page backed by `scraper`.
//!
//! Layout cannot be computed from markup alone, so geometry comes from
//! attributes recorded when the snapshot was taken:
//!
//! - `data-rect="x y width height"` bounding box in CSS pixels
//! - `data-client-width` (defaults to the rect width)
//! - `data-offset-height` (defaults to the rect height)
//!
//! Computed style is approximated by the inline `style` attribute plus any
//! inline changes made through [`ChatPage::set_inline_style`].

use super::{parse_declarations, ChatPage, NodeId, Rect, StyleSheet};
use scraper::{ElementRef, Html, Selector};
use std::cell::RefCell;
use std::collections::HashMap;

pub struct HtmlPage {
    url: String,
    document: Html,
    // (node, property) -> Some(value) set / None removed
    inline_overrides: RefCell<HashMap<(NodeId, String), Option<String>>>,
    external_sheets: Vec<StyleSheet>,
}

impl HtmlPage {
    pub fn parse(url: &str, html: &str) -> Self {
        Self {
            url: url.to_string(),
            document: Html::parse_document(html),
            inline_overrides: RefCell::new(HashMap::new()),
            external_sheets: Vec::new(),
        }
    }

    /// Attach an external stylesheet (as if linked with `<link rel=stylesheet>`)
    pub fn with_stylesheet(mut self, href: &str, text: &str) -> Self {
        self.external_sheets.push(StyleSheet {
            href: Some(href.to_string()),
            text: text.to_string(),
        });
        self
    }

    fn elements(&self) -> Vec<ElementRef<'_>> {
        self.document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .collect()
    }

    fn element(&self, node: NodeId) -> Option<ElementRef<'_>> {
        self.elements().get(node.0).copied()
    }

    fn attr_f64(&self, node: NodeId, name: &str) -> Option<f64> {
        self.element(node)?.value().attr(name)?.trim().parse().ok()
    }

    fn declared_style(&self, node: NodeId, property: &str) -> Option<String> {
        let el = self.element(node)?;
        let style = el.value().attr("style")?;
        parse_declarations(style)
            .into_iter()
            .rev()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value)
    }
}

impl ChatPage for HtmlPage {
    fn document_url(&self) -> String {
        self.url.clone()
    }

    fn query_selector_all(&self, selector: &str) -> Vec<NodeId> {
        let sel = match Selector::parse(selector) {
            Ok(s) => s,
            Err(e) => {
                log::warn!("Invalid selector '{}': {:?}", selector, e);
                return Vec::new();
            }
        };
        let all = self.elements();
        self.document
            .select(&sel)
            .filter_map(|found| all.iter().position(|el| *el == found).map(NodeId))
            .collect()
    }

    fn bounding_rect(&self, node: NodeId) -> Rect {
        let Some(raw) = self.element(node).and_then(|el| el.value().attr("data-rect")) else {
            return Rect::default();
        };
        let nums: Vec<f64> = raw
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.parse().ok())
            .collect();
        match nums.as_slice() {
            [x, y, w, h] => Rect::new(*x, *y, *w, *h),
            _ => Rect::default(),
        }
    }

    fn client_width(&self, node: NodeId) -> f64 {
        self.attr_f64(node, "data-client-width")
            .unwrap_or_else(|| self.bounding_rect(node).width)
    }

    fn offset_height(&self, node: NodeId) -> f64 {
        self.attr_f64(node, "data-offset-height")
            .unwrap_or_else(|| self.bounding_rect(node).height)
    }

    fn text_content(&self, node: NodeId) -> String {
        self.element(node)
            .map(|el| el.text().collect::<String>())
            .unwrap_or_default()
    }

    fn computed_style(&self, node: NodeId, property: &str) -> Option<String> {
        self.inline_style(node, property)
    }

    fn inline_style(&self, node: NodeId, property: &str) -> Option<String> {
        let key = (node, property.to_ascii_lowercase());
        if let Some(value) = self.inline_overrides.borrow().get(&key) {
            return value.clone();
        }
        self.declared_style(node, &key.1)
    }

    fn set_inline_style(&self, node: NodeId, property: &str, value: Option<&str>) {
        self.inline_overrides
            .borrow_mut()
            .insert((node, property.to_ascii_lowercase()), value.map(|v| v.to_string()));
    }

    fn stylesheets(&self) -> Vec<StyleSheet> {
        let mut sheets: Vec<StyleSheet> = match Selector::parse("style") {
            Ok(sel) => self
                .document
                .select(&sel)
                .map(|el| StyleSheet {
                    href: None,
                    text: el.text().collect(),
                })
                .collect(),
            Err(_) => Vec::new(),
        };
        sheets.extend(self.external_sheets.iter().cloned());
        sheets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><style id="custom-style">body{}</style></head><body>
        <div id="chat" data-rect="10 20 800 600" data-client-width="780">
            <div class="mes" data-rect="10 20 780 100">first</div>
            <div class="mes" data-rect="10 125 780 50" style="visibility: visible">second</div>
        </div>
        <div id="form_sheld" data-rect="0 560 800 60" data-offset-height="60"></div>
    </body></html>"#;

    #[test]
    fn queries_return_document_order() {
        let page = HtmlPage::parse("https://chat.example/", PAGE);
        let msgs = page.query_selector_all(".mes");
        assert_eq!(msgs.len(), 2);
        assert!(msgs[0] < msgs[1]);
        assert_eq!(page.text_content(msgs[1]), "second");
        assert!(page.query_selector_all("##bad").is_empty());
    }

    #[test]
    fn geometry_comes_from_attributes() {
        let page = HtmlPage::parse("https://chat.example/", PAGE);
        let chat = page.query_selector("#chat").unwrap();
        assert_eq!(page.bounding_rect(chat), Rect::new(10.0, 20.0, 800.0, 600.0));
        assert_eq!(page.client_width(chat), 780.0);
        assert_eq!(page.offset_height(chat), 600.0);
        let form = page.query_selector("#form_sheld").unwrap();
        assert_eq!(page.offset_height(form), 60.0);
    }

    #[test]
    fn inline_style_overrides_are_reversible() {
        let page = HtmlPage::parse("https://chat.example/", PAGE);
        let second = page.query_selector_all(".mes")[1];
        assert_eq!(page.inline_style(second, "visibility").as_deref(), Some("visible"));
        page.set_inline_style(second, "visibility", Some("hidden"));
        assert_eq!(page.computed_style(second, "visibility").as_deref(), Some("hidden"));
        page.set_inline_style(second, "visibility", None);
        assert_eq!(page.inline_style(second, "visibility"), None);
    }

    #[test]
    fn stylesheets_include_external() {
        let page = HtmlPage::parse("https://chat.example/", PAGE)
            .with_stylesheet("https://cdn.example/fa.css", "@font-face{}");
        let sheets = page.stylesheets();
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].href, None);
        assert_eq!(sheets[1].href.as_deref(), Some("https://cdn.example/fa.css"));
    }
}
