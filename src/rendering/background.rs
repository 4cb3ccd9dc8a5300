//! Unit background: one tile of the page background behind a message unit
//!
//! The tile is the chat viewport width by the chat viewport height minus the
//! input bar. It is rendered once per scale and reused as a vertically
//! repeating fill until the viewport is resized.

use super::raster::{crop_exact, decode_data_url, scaled_px};
use super::{RenderOptions, Renderer};
use crate::fetch::FetchOverride;
use crate::page::{ChatPage, NodeId};
use crate::{CaptureConfig, Error, Result, Settings};
use image::RgbaImage;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Message unit geometry in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitGeometry {
    /// Chat container position in the viewport
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

struct CachedTile {
    scale: f64,
    tile: Rc<RgbaImage>,
}

/// Hides elements through their inline `visibility` and puts the previous
/// value back when dropped.
pub struct HiddenElements<'a> {
    page: &'a dyn ChatPage,
    saved: Vec<(NodeId, Option<String>)>,
}

impl<'a> HiddenElements<'a> {
    /// Hide everything matching `selectors` that is not hidden already
    pub fn hide(page: &'a dyn ChatPage, selectors: &[String]) -> Self {
        let mut saved = Vec::new();
        for selector in selectors {
            for node in page.query_selector_all(selector) {
                let previous = page.inline_style(node, "visibility");
                if previous.as_deref() == Some("hidden") || saved.iter().any(|(n, _)| *n == node) {
                    continue;
                }
                page.set_inline_style(node, "visibility", Some("hidden"));
                saved.push((node, previous));
            }
        }
        Self { page, saved }
    }

    pub fn len(&self) -> usize {
        self.saved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.saved.is_empty()
    }
}

impl Drop for HiddenElements<'_> {
    fn drop(&mut self) {
        for (node, previous) in self.saved.drain(..).rev() {
            self.page.set_inline_style(node, "visibility", previous.as_deref());
        }
    }
}

/// Owner of the cached unit background
#[derive(Default)]
pub struct BackgroundCompositor {
    cached: RefCell<Option<CachedTile>>,
}

impl BackgroundCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidate(&self) {
        if self.cached.borrow_mut().take().is_some() {
            log::info!("Cache invalidation: Unit background has been cleared.");
        }
    }

    pub fn is_cached(&self) -> bool {
        self.cached.borrow().is_some()
    }

    /// Current unit geometry; fails when the chat container is missing
    pub fn unit_geometry(page: &dyn ChatPage, config: &CaptureConfig) -> Result<UnitGeometry> {
        let chat = page
            .query_selector(&config.chat_selector)
            .ok_or_else(|| Error::BackgroundCapture(format!("cannot find {} element", config.chat_selector)))?;
        let rect = page.bounding_rect(chat);
        let input_bar = page
            .query_selector(&config.input_bar_selector)
            .map(|n| page.offset_height(n))
            .unwrap_or(0.0);
        Ok(UnitGeometry {
            left: rect.x,
            top: rect.y,
            width: page.client_width(chat),
            height: (rect.height - input_bar).max(0.0),
        })
    }

    /// First visible candidate that carries a background image, else the chat container
    pub fn find_background_holder(page: &dyn ChatPage, config: &CaptureConfig) -> Option<NodeId> {
        for selector in &config.background_selectors {
            let Some(node) = page.query_selector(selector) else {
                continue;
            };
            let displayed = page.computed_style(node, "display").as_deref() != Some("none");
            let has_image = page
                .computed_style(node, "background-image")
                .map(|v| !v.trim().is_empty() && v.trim() != "none")
                .unwrap_or(false);
            if displayed && has_image {
                return Some(node);
            }
        }
        page.query_selector(&config.chat_selector)
    }

    /// The unit background at `settings.screenshot_scale`.
    ///
    /// With `no_background` set this is a transparent tile of the same size and
    /// nothing is rendered. Any failure is reported as `BackgroundCapture`.
    pub async fn unit_background(
        &self,
        page: &dyn ChatPage,
        renderer: &dyn Renderer,
        fetch: Option<Rc<dyn FetchOverride>>,
        config: &CaptureConfig,
        settings: &Settings,
    ) -> Result<Rc<RgbaImage>> {
        let scale = settings.screenshot_scale;
        let unit = Self::unit_geometry(page, config)?;
        let (width, height) = (scaled_px(unit.width, scale), scaled_px(unit.height, scale));

        if settings.no_background {
            return Ok(Rc::new(RgbaImage::new(width, height)));
        }
        if let Some(cached) = self.cached.borrow().as_ref() {
            if cached.scale == scale {
                return Ok(cached.tile.clone());
            }
        }
        if width == 0 || height == 0 {
            return Err(Error::BackgroundCapture(format!("message unit is empty ({}x{})", width, height)));
        }

        let holder = Self::find_background_holder(page, config)
            .ok_or_else(|| Error::BackgroundCapture("no background element".into()))?;

        let mut options = RenderOptions::new(scale);
        options.include_style_properties = config.style_properties.clone();
        options.fetch = fetch;

        let rendered = {
            let hidden = HiddenElements::hide(page, &config.chrome_selectors);
            log::debug!("Hid {} elements for background capture", hidden.len());
            tokio::time::sleep(Duration::from_millis(config.settle_delay_ms)).await;
            renderer.render_data_url(holder, &options).await
        };
        let data_url = rendered.map_err(|e| Error::BackgroundCapture(e.to_string()))?;
        let full = decode_data_url(&data_url).map_err(|e| Error::BackgroundCapture(e.to_string()))?;

        let holder_rect = page.bounding_rect(holder);
        let x = ((unit.left - holder_rect.x) * scale).floor() as i64;
        let y = ((unit.top - holder_rect.y) * scale).floor() as i64;
        let tile = Rc::new(crop_exact(&full, x, y, width, height));

        *self.cached.borrow_mut() = Some(CachedTile {
            scale,
            tile: tile.clone(),
        });
        Ok(tile)
    }
}
