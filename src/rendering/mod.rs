//! Rendering: the DOM-to-raster seam and the compositors built on it
//!
//! - `raster`: canvas primitives (tiling, pasting, cropping, encoding)
//! - `background`: the cached unit background tile
//! - `compositor`: canvas planning and per-section render-and-paste

pub mod background;
pub mod compositor;
pub mod raster;

use crate::fetch::FetchOverride;
use crate::page::NodeId;
use crate::Result;
use async_trait::async_trait;
use image::RgbaImage;
use std::rc::Rc;

/// Computed style properties worth copying into an off-DOM render
pub const STYLE_PROPERTY_ALLOW_LIST: &[&str] = &[
    "display", "position", "top", "right", "bottom", "left", "float", "clear",
    "width", "height", "min-width", "min-height", "max-width", "max-height",
    "margin", "margin-top", "margin-right", "margin-bottom", "margin-left",
    "padding", "padding-top", "padding-right", "padding-bottom", "padding-left",
    "border", "border-width", "border-style", "border-color", "border-radius",
    "border-top-left-radius", "border-top-right-radius", "border-bottom-left-radius",
    "border-bottom-right-radius", "border-collapse", "border-spacing", "box-sizing",
    "overflow", "overflow-x", "overflow-y",
    "flex", "flex-basis", "flex-direction", "flex-flow", "flex-grow", "flex-shrink", "flex-wrap",
    "align-content", "align-items", "align-self", "justify-content", "justify-items", "justify-self",
    "gap", "row-gap", "column-gap",
    "grid", "grid-area", "grid-template", "grid-template-areas", "grid-template-rows",
    "grid-template-columns", "grid-row", "grid-row-start", "grid-row-end", "grid-column",
    "grid-column-start", "grid-column-end",
    "color", "font", "font-family", "font-size", "font-weight", "font-style", "font-variant",
    "line-height", "letter-spacing", "word-spacing", "text-align", "text-decoration",
    "text-indent", "text-transform", "text-shadow", "white-space", "vertical-align",
    "background", "background-color", "background-image", "background-repeat",
    "background-position", "background-size", "background-clip",
    "opacity", "visibility", "box-shadow", "outline", "outline-offset", "cursor",
    "transform", "transform-origin", "transform-style", "transition", "animation", "filter",
    "list-style", "list-style-type", "list-style-position", "list-style-image",
];

/// Appended to the injected CSS so `<q>` elements render without generated quotes
pub const QUOTE_SUPPRESSION_CSS: &str = "q::before, q::after { content: none !important; }";

/// Configuration handed to the renderer
#[derive(Clone)]
pub struct RenderOptions {
    pub scale: f64,
    /// Let the renderer embed page fonts itself; off when fonts arrive via `injected_css`
    pub embed_fonts: bool,
    pub include_style_properties: Vec<String>,
    /// Style overrides applied to the cloned root, e.g. `margin: 0`
    pub style: Vec<(String, String)>,
    pub restore_scroll_position: bool,
    /// Called for every remote resource instead of a direct fetch
    pub fetch: Option<Rc<dyn FetchOverride>>,
    /// CSS placed in the rendered document's `<defs>`
    pub injected_css: Option<String>,
    pub worker_url: Option<String>,
    /// Release the renderer's state after one render
    pub auto_destruct: bool,
}

impl RenderOptions {
    pub fn new(scale: f64) -> Self {
        Self {
            scale,
            embed_fonts: true,
            include_style_properties: Vec::new(),
            style: Vec::new(),
            restore_scroll_position: false,
            fetch: None,
            injected_css: None,
            worker_url: None,
            auto_destruct: true,
        }
    }
}

impl std::fmt::Debug for RenderOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderOptions")
            .field("scale", &self.scale)
            .field("embed_fonts", &self.embed_fonts)
            .field("include_style_properties", &self.include_style_properties.len())
            .field("style", &self.style)
            .field("restore_scroll_position", &self.restore_scroll_position)
            .field("fetch", &self.fetch.is_some())
            .field("injected_css", &self.injected_css.as_ref().map(|c| c.len()))
            .field("worker_url", &self.worker_url)
            .field("auto_destruct", &self.auto_destruct)
            .finish()
    }
}

/// Reusable render state for a sequence of nodes.
///
/// Retarget it by writing `node`, `width` and `height` between renders. It is
/// released by passing it to [`Renderer::destroy_context`], which consumes it.
#[derive(Debug)]
pub struct RenderContext {
    pub node: NodeId,
    pub width: f64,
    pub height: f64,
    pub options: RenderOptions,
    /// Renderer-private handle to its cached state
    pub handle: u64,
}

/// DOM-to-raster capability of the host page.
///
/// Given the same node geometry and options the output size is deterministic:
/// `width * scale` by `height * scale`, rounded down.
#[async_trait(?Send)]
pub trait Renderer {
    /// Render a node once and return it as an image data URL
    async fn render_data_url(&self, node: NodeId, options: &RenderOptions) -> Result<String>;

    /// Prepare state for rendering several nodes with the same options
    async fn create_context(&self, node: NodeId, options: RenderOptions) -> Result<RenderContext>;

    /// Render the context's current target
    async fn render_context(&self, ctx: &mut RenderContext) -> Result<RgbaImage>;

    fn destroy_context(&self, ctx: RenderContext);
}

/// Put `css` into the `<defs>` of a rendered SVG document, creating `<defs>`
/// after the opening `<svg>` tag when there is none.
pub fn inject_style_defs(svg: &str, css: &str) -> String {
    let style = format!("<style>{}</style>", css);
    if let Some(pos) = svg.find("<defs>") {
        let at = pos + "<defs>".len();
        return format!("{}{}{}", &svg[..at], style, &svg[at..]);
    }
    if let Some(open) = svg.find("<svg") {
        if let Some(close) = svg[open..].find('>') {
            let at = open + close + 1;
            return format!("{}<defs>{}</defs>{}", &svg[..at], style, &svg[at..]);
        }
    }
    format!("<defs>{}</defs>{}", style, svg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_has_no_duplicates() {
        let mut v: Vec<_> = STYLE_PROPERTY_ALLOW_LIST.to_vec();
        v.sort();
        v.dedup();
        assert_eq!(v.len(), STYLE_PROPERTY_ALLOW_LIST.len());
    }

    #[test]
    fn style_goes_into_existing_defs() {
        let out = inject_style_defs("<svg a=\"1\"><defs></defs><g/></svg>", "b{}");
        assert_eq!(out, "<svg a=\"1\"><defs><style>b{}</style></defs><g/></svg>");
    }

    #[test]
    fn defs_created_when_missing() {
        let out = inject_style_defs("<svg><g/></svg>", "b{}");
        assert_eq!(out, "<svg><defs><style>b{}</style></defs><g/></svg>");
    }
}
