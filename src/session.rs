//! Session-scoped capture service
//!
//! A [`ScreenshotSession`] owns every cache that lives for one page session:
//! the active font mapping, the unit background, the in-memory asset layer
//! and the range selection. Invalidation is explicit ([`ScreenshotSession::on_resize`],
//! [`ScreenshotSession::refresh_fonts`], [`ScreenshotSession::set_settings`]).

use crate::fetch::{FetchOverride, Fetcher, ResourceFetcher};
use crate::fonts::{FontManager, MappingOutcome};
use crate::notify::Notifier;
use crate::page::{ChatPage, NodeId};
use crate::rendering::background::BackgroundCompositor;
use crate::rendering::compositor::{compose_sections, section_render_options, CanvasPlan, SectionGeometry};
use crate::rendering::raster::{encode, fill_repeat_y};
use crate::rendering::Renderer;
use crate::selection::{SelectionEvent, SelectionRange, Transition};
use crate::store::{AssetCache, AssetStore, Namespace};
use crate::{CaptureConfig, Error, ImageFormat, Result, Settings};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use image::RgbaImage;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// An encoded capture ready to be downloaded
#[derive(Debug, Clone, PartialEq)]
pub struct Screenshot {
    /// Encoding actually used, after any size fallback
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
    prefix: String,
}

impl Screenshot {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.format.mime_type(), STANDARD.encode(&self.bytes))
    }

    /// `<prefix>_<YYYYMMDDHHMMSS>.<ext>`
    pub fn file_name(&self, at: DateTime<Utc>) -> String {
        format!("{}_{}.{}", self.prefix, at.format("%Y%m%d%H%M%S"), self.format.extension())
    }

    /// Write into `dir` under [`Screenshot::file_name`]
    pub fn save(&self, dir: &Path, at: DateTime<Utc>) -> Result<PathBuf> {
        let path = dir.join(self.file_name(at));
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

pub struct ScreenshotSession {
    config: CaptureConfig,
    settings: RefCell<Settings>,
    page: Rc<dyn ChatPage>,
    renderer: Rc<dyn Renderer>,
    notifier: Rc<dyn Notifier>,
    fetcher: Rc<ResourceFetcher>,
    fonts: FontManager,
    background: BackgroundCompositor,
    selection: RefCell<SelectionRange>,
}

impl ScreenshotSession {
    /// Build the session, open the asset store and load the user's font mapping.
    ///
    /// Only invalid settings or an unparseable document URL fail; an
    /// unavailable store or missing fonts degrade silently.
    pub async fn open(
        config: CaptureConfig,
        settings: Settings,
        page: Rc<dyn ChatPage>,
        renderer: Rc<dyn Renderer>,
        net: Rc<dyn Fetcher>,
        store: Rc<dyn AssetStore>,
        notifier: Rc<dyn Notifier>,
    ) -> Result<Self> {
        settings.validate()?;
        let cache = Rc::new(AssetCache::new(store));
        let fetcher = Rc::new(ResourceFetcher::new(cache, net, &page.document_url())?);
        let session = Self {
            fonts: FontManager::new(fetcher.clone()),
            config,
            settings: RefCell::new(settings),
            page,
            renderer,
            notifier,
            fetcher,
            background: BackgroundCompositor::new(),
            selection: RefCell::new(SelectionRange::new()),
        };

        let known = session.fetcher.cache().get_all(Namespace::FontMappings).await.len();
        log::info!("Session opened for {} ({} stored font mappings)", session.fetcher.document_url(), known);
        session.refresh_fonts().await;
        Ok(session)
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn settings(&self) -> Settings {
        self.settings.borrow().clone()
    }

    pub fn set_settings(&self, settings: Settings) -> Result<()> {
        settings.validate()?;
        let scale_changed = self.settings.borrow().screenshot_scale != settings.screenshot_scale;
        *self.settings.borrow_mut() = settings;
        if scale_changed {
            self.background.invalidate();
        }
        Ok(())
    }

    pub fn fonts(&self) -> &FontManager {
        &self.fonts
    }

    /// The chat viewport changed size
    pub fn on_resize(&self) {
        self.background.invalidate();
    }

    /// Re-read the custom style element and update the active font mapping
    pub async fn refresh_fonts(&self) -> MappingOutcome {
        let raw = self
            .page
            .query_selector(&self.config.custom_style_selector)
            .map(|node| self.page.text_content(node));
        self.fonts.process_style(raw.as_deref()).await
    }

    fn messages(&self) -> Vec<NodeId> {
        self.page.query_selector_all(&self.config.message_selector)
    }

    /// Feed a UI event to the range selection
    pub fn handle(&self, event: SelectionEvent) -> Transition {
        let transition = self.selection.borrow_mut().apply(event);
        match transition {
            Transition::Armed(crate::SelectionMode::PickingStart) => {
                self.notifier.info("Click a message to use as the start of the screenshot.")
            }
            Transition::Armed(crate::SelectionMode::PickingEnd) => {
                self.notifier.info("Click a message to use as the end of the screenshot.")
            }
            Transition::StartPicked(_) => self.notifier.success("Start set."),
            Transition::EndPicked(_) => self.notifier.success("End set."),
            Transition::Armed(crate::SelectionMode::Idle) | Transition::Cleared | Transition::Ignored => {}
        }
        transition
    }

    pub fn selection(&self) -> SelectionRange {
        self.selection.borrow().clone()
    }

    /// Messages to highlight for the current selection
    pub fn highlighted(&self) -> Vec<NodeId> {
        self.selection.borrow().highlighted(&self.messages())
    }

    /// The picked range in document order
    pub fn selected_elements(&self) -> Result<Vec<NodeId>> {
        let selection = self.selection.borrow();
        if !selection.is_complete() {
            return Err(Error::RangeUnresolved);
        }
        let elements = selection.resolve(&self.messages());
        if elements.is_empty() {
            return Err(Error::RangeUnresolved);
        }
        Ok(elements)
    }

    /// Capture the picked range. The selection is reset once a capture was attempted.
    pub async fn capture_selection(&self) -> Result<Screenshot> {
        let elements = match self.selected_elements() {
            Ok(elements) => elements,
            Err(e) => {
                if self.selection.borrow().is_complete() {
                    self.notifier.error("The picked messages are no longer in the chat. Pick the range again.");
                } else {
                    self.notifier.error("Pick a start and an end message first.");
                }
                return Err(e);
            }
        };
        let shot = self.execute_screenshot(&elements).await;
        *self.selection.borrow_mut() = SelectionRange::new();
        shot
    }

    /// Capture `elements`, reporting the outcome to the user
    pub async fn execute_screenshot(&self, elements: &[NodeId]) -> Result<Screenshot> {
        if elements.is_empty() {
            self.notifier.warning("There are no messages to capture.");
            return Err(Error::NothingToCapture);
        }
        match self.capture_long_screenshot(elements).await {
            Ok(shot) => {
                log::info!(
                    "Screenshot ready: {} sections, {}x{} {}",
                    elements.len(),
                    shot.width,
                    shot.height,
                    shot.format.extension()
                );
                Ok(shot)
            }
            Err(e) => {
                log::error!("Screenshot execution failed: {}", e);
                self.notifier.error("Screenshot failed; see the log for details.");
                Err(e)
            }
        }
    }

    /// Render `elements` into one image over the repeating unit background
    pub async fn capture_long_screenshot(&self, elements: &[NodeId]) -> Result<Screenshot> {
        if elements.is_empty() {
            return Err(Error::NothingToCapture);
        }
        let settings = self.settings();
        let scale = settings.screenshot_scale;
        let page = self.page.as_ref();

        let text: String = elements.iter().map(|&n| page.text_content(n)).collect();
        let sheets = page.stylesheets();
        let (subset_css, icon_css) = futures::join!(
            self.fonts.subset_css(&text),
            self.fonts.icon_font_css(&sheets, &self.config.icon_font_family)
        );
        let combined_css = format!("{}\n{}", subset_css, icon_css);

        let sections: Vec<SectionGeometry> = elements.iter().map(|&n| SectionGeometry::measure(page, n)).collect();
        let plan = CanvasPlan::compute(
            &sections,
            scale,
            self.config.message_margin,
            settings.image_format,
            self.config.format_fallback_ceiling,
        );
        if plan.format_downgraded {
            log::warn!(
                "{}x{} exceeds {}px for {}; using {}",
                plan.width,
                plan.height,
                self.config.format_fallback_ceiling,
                settings.image_format.extension(),
                plan.format.extension()
            );
            self.notifier.warning("Screenshot is too long; switched to JPEG.");
        }

        let fetch: Rc<dyn FetchOverride> = self.fetcher.clone();
        let tile = self
            .background
            .unit_background(page, self.renderer.as_ref(), Some(fetch.clone()), &self.config, &settings)
            .await?;

        let mut canvas = RgbaImage::new(plan.width, plan.height);
        if !settings.no_background {
            fill_repeat_y(&mut canvas, &tile);
        }

        let options = section_render_options(&self.config, scale, Some(fetch), &combined_css);
        compose_sections(self.renderer.as_ref(), &mut canvas, &sections, options, plan.margin).await?;

        let bytes = encode(&canvas, plan.format, settings.image_quality)?;
        Ok(Screenshot {
            format: plan.format,
            width: plan.width,
            height: plan.height,
            bytes,
            prefix: self.config.file_prefix.clone(),
        })
    }

    /// Drop every session cache
    pub fn dispose(self) {
        self.background.invalidate();
        self.fonts.clear();
        log::info!("Session for {} disposed", self.fetcher.document_url());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn artifact_name_and_data_url() {
        let shot = Screenshot {
            format: ImageFormat::Webp,
            width: 1,
            height: 1,
            bytes: vec![1, 2, 3],
            prefix: "SillyTavern_Range".into(),
        };
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        assert_eq!(shot.file_name(at), "SillyTavern_Range_20240305070809.webp");
        assert_eq!(shot.data_url(), "data:image/webp;base64,AQID");

        let dir = tempfile::tempdir().unwrap();
        let path = shot.save(dir.path(), at).unwrap();
        assert_eq!(std::fs::read(path).unwrap(), vec![1, 2, 3]);
    }
}
