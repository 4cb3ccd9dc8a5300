//! Multi-section compositing
//!
//! Sections are rendered one at a time through a single reusable render
//! context and pasted centered at a running vertical cursor.

use super::raster::{paste_centered, scaled_px};
use super::{RenderOptions, Renderer, QUOTE_SUPPRESSION_CSS};
use crate::fetch::FetchOverride;
use crate::page::{ChatPage, NodeId};
use crate::{CaptureConfig, Error, ImageFormat, Result};
use image::RgbaImage;
use std::rc::Rc;

/// Geometry of one selected element, measured just before capture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectionGeometry {
    pub node: NodeId,
    /// Bounding box size in CSS pixels
    pub width: f64,
    pub height: f64,
    pub client_width: f64,
}

impl SectionGeometry {
    pub fn measure(page: &dyn ChatPage, node: NodeId) -> Self {
        let rect = page.bounding_rect(node);
        Self {
            node,
            width: rect.width,
            height: rect.height,
            client_width: page.client_width(node),
        }
    }
}

/// Final canvas size and encoding for a set of sections
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasPlan {
    pub width: u32,
    pub height: u32,
    /// Gap between sections in CSS pixels; zero for a single section
    pub margin: f64,
    pub format: ImageFormat,
    /// The requested format could not hold this size and was replaced
    pub format_downgraded: bool,
}

impl CanvasPlan {
    pub fn compute(
        sections: &[SectionGeometry],
        scale: f64,
        message_margin: f64,
        requested: ImageFormat,
        ceiling: u32,
    ) -> Self {
        let margin = if sections.len() > 1 { message_margin } else { 0.0 };
        let total_height: f64 = sections.iter().map(|s| s.height).sum::<f64>()
            + sections.len().saturating_sub(1) as f64 * margin;
        let max_width = sections.iter().map(|s| s.client_width).fold(0.0, f64::max);

        let (css_w, css_h) = (max_width * scale, total_height * scale);
        let too_big = css_w > ceiling as f64 || css_h > ceiling as f64;
        let (format, format_downgraded) = match requested {
            ImageFormat::Webp if too_big => (ImageFormat::Jpeg, true),
            other => (other, false),
        };

        Self {
            width: scaled_px(max_width, scale),
            height: scaled_px(total_height, scale),
            margin,
            format,
            format_downgraded,
        }
    }
}

/// Options for the per-section render context.
///
/// Fonts arrive through `css` instead of the renderer's own embedding; the
/// quote suppression rule is always appended.
pub fn section_render_options(
    config: &CaptureConfig,
    scale: f64,
    fetch: Option<Rc<dyn FetchOverride>>,
    css: &str,
) -> RenderOptions {
    RenderOptions {
        scale,
        embed_fonts: false,
        include_style_properties: config.style_properties.clone(),
        style: vec![("margin".to_string(), "0".to_string())],
        restore_scroll_position: true,
        fetch,
        injected_css: Some(format!("{}\n{}", css, QUOTE_SUPPRESSION_CSS)),
        worker_url: config.worker_url.clone(),
        auto_destruct: false,
    }
}

/// Render every section into `canvas`.
///
/// One context serves all sections and is destroyed exactly once, whether
/// or not a section fails.
pub async fn compose_sections(
    renderer: &dyn Renderer,
    canvas: &mut RgbaImage,
    sections: &[SectionGeometry],
    options: RenderOptions,
    margin: f64,
) -> Result<()> {
    let first = sections.first().ok_or(Error::NothingToCapture)?;
    let scale = options.scale;
    let mut ctx = renderer.create_context(first.node, options).await?;
    let painted = paint_sections(renderer, &mut ctx, canvas, sections, scale, margin).await;
    renderer.destroy_context(ctx);
    painted
}

async fn paint_sections(
    renderer: &dyn Renderer,
    ctx: &mut super::RenderContext,
    canvas: &mut RgbaImage,
    sections: &[SectionGeometry],
    scale: f64,
    margin: f64,
) -> Result<()> {
    let mut cursor = 0.0_f64;
    for (i, section) in sections.iter().enumerate() {
        ctx.node = section.node;
        ctx.width = section.width;
        ctx.height = section.height;
        let raster = renderer.render_context(ctx).await?;
        log::debug!(
            "section {}/{}: {}x{} at y={}",
            i + 1,
            sections.len(),
            raster.width(),
            raster.height(),
            cursor
        );
        paste_centered(canvas, &raster, cursor.round() as i64);
        cursor += section.height * scale + margin * scale;
    }
    Ok(())
}
