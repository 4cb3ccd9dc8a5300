//! The live chat document, as seen by the capture pipeline
//!
//! [`ChatPage`] is the seam to the host page: element lookup, geometry,
//! text, computed style and reversible inline style changes. Node handles are
//! identities, never owners; a node that left the document simply stops
//! showing up in query results.

#[cfg(feature = "html")]
pub mod html;

#[cfg(feature = "html")]
pub use html::HtmlPage;

/// Opaque identity of an element in the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Bounding box in CSS pixels, relative to the viewport
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }
}

/// A stylesheet attached to the document
#[derive(Debug, Clone, PartialEq)]
pub struct StyleSheet {
    /// Location of an external sheet; `None` for `<style>` blocks
    pub href: Option<String>,
    pub text: String,
}

/// Read access to the chat document plus reversible inline style writes
pub trait ChatPage {
    /// URL of the document, used as the base for relative locators
    fn document_url(&self) -> String;

    /// All elements matching `selector`, in document order
    fn query_selector_all(&self, selector: &str) -> Vec<NodeId>;

    /// First element matching `selector`
    fn query_selector(&self, selector: &str) -> Option<NodeId> {
        self.query_selector_all(selector).into_iter().next()
    }

    fn bounding_rect(&self, node: NodeId) -> Rect;

    /// Inner width without borders and scrollbar
    fn client_width(&self, node: NodeId) -> f64;

    /// Layout height including borders
    fn offset_height(&self, node: NodeId) -> f64;

    fn text_content(&self, node: NodeId) -> String;

    /// Resolved value of a CSS property, if the page knows it
    fn computed_style(&self, node: NodeId, property: &str) -> Option<String>;

    /// Value of a property set on the element's inline style
    fn inline_style(&self, node: NodeId, property: &str) -> Option<String>;

    /// Set (`Some`) or remove (`None`) an inline style property
    fn set_inline_style(&self, node: NodeId, property: &str, value: Option<&str>);

    fn stylesheets(&self) -> Vec<StyleSheet>;
}

/// Parse `prop: value; ...` declarations into lowercase-name pairs
pub fn parse_declarations(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim();
            if name.is_empty() {
                None
            } else {
                Some((name, value.to_string()))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declarations_keep_urls_with_colons() {
        let decls = parse_declarations("display:none; Background-Image: url(https://x/y.png);;");
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0], ("display".to_string(), "none".to_string()));
        assert_eq!(decls[1].0, "background-image");
        assert_eq!(decls[1].1, "url(https://x/y.png)");
    }
}
