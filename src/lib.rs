//! Rangeshot
//!
//! Range screenshots for chat pages. The user picks a start and an end
//! message, and the selected messages are rendered one by one and stitched
//! into a single tall image over a repeating background tile.
//!
//! # Features
//!
//! - **Asset cache**: font mappings, font data and image data are kept in a
//!   persistent store with an in-memory layer in front of it
//! - **Font subsetting**: only the `@font-face` rules needed by the captured
//!   text are inlined into the render
//! - **Multi-section compositing**: sections are pasted centered at a running
//!   vertical offset onto a canvas painted with the unit background
//!
//! # Example
//!
//! ```no_run
//! use std::rc::Rc;
//! use rangeshot::{CaptureConfig, ScreenshotSession, Settings};
//! use rangeshot::notify::LogNotifier;
//! use rangeshot::page::HtmlPage;
//! use rangeshot::store::FsAssetStore;
//! # use rangeshot::rendering::Renderer;
//! # async fn run(renderer: Rc<dyn Renderer>) -> rangeshot::Result<()> {
//! let page = Rc::new(HtmlPage::parse(
//!     "https://chat.example/",
//!     r#"<div id="chat" data-rect="0 0 800 600"><div class="mes">hi</div></div>"#,
//! ));
//! let fetcher = Rc::new(rangeshot::fetch::HttpFetcher::new()?);
//! let store = Rc::new(FsAssetStore::new("/tmp/rangeshot-cache", 2));
//! let session = ScreenshotSession::open(
//!     CaptureConfig::default(),
//!     Settings::default(),
//!     page,
//!     renderer,
//!     fetcher,
//!     store,
//!     Rc::new(LogNotifier),
//! )
//! .await?;
//! let shot = session.capture_selection().await?;
//! println!("{} ({}x{})", shot.file_name(chrono::Utc::now()), shot.width, shot.height);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{Error, Result};

pub mod fetch;
pub mod fonts;
pub mod notify;
pub mod page;
pub mod rendering;
pub mod selection;
pub mod session;
pub mod settings;
pub mod store;

pub use selection::{SelectionEvent, SelectionMode, SelectionRange};
pub use session::{Screenshot, ScreenshotSession};
pub use settings::Settings;

/// Output encodings supported for the final image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Webp,
}

impl ImageFormat {
    /// Filename extension, matching the MIME subtype
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Webp => "webp",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Webp => "image/webp",
        }
    }
}

impl std::str::FromStr for ImageFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            "png" => Ok(ImageFormat::Png),
            "webp" => Ok(ImageFormat::Webp),
            other => Err(Error::Config(format!("unknown image format '{}'", other))),
        }
    }
}

/// Configuration for the capture pipeline
///
/// These values describe the host chat page and the fixed constants of the
/// compositor. User-facing knobs (scale, format, quality, background) live in
/// [`Settings`] instead.
///
/// # Examples
///
/// ```
/// let cfg = rangeshot::CaptureConfig::default();
/// assert_eq!(cfg.format_fallback_ceiling, 16000);
/// assert_eq!(cfg.message_selector, ".mes");
/// ```
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Selector of the chat viewport container
    pub chat_selector: String,
    /// Selector matching every chat message element, in document order
    pub message_selector: String,
    /// Selector of the input bar below the chat viewport
    pub input_bar_selector: String,
    /// Selector of the `<style>` element carrying user font CSS
    pub custom_style_selector: String,
    /// Background-bearing candidates, most specific first
    pub background_selectors: Vec<String>,
    /// Chat and UI chrome hidden while the background is captured
    pub chrome_selectors: Vec<String>,
    /// Computed style properties copied into each render
    pub style_properties: Vec<String>,
    /// Vertical gap between sections in CSS pixels
    pub message_margin: f64,
    /// Largest dimension in pixels the lossless tiled format may use
    pub format_fallback_ceiling: u32,
    /// Delay after hiding chrome before the background is captured
    pub settle_delay_ms: u64,
    /// `font-family` marker of the icon font whose rules are always inlined
    pub icon_font_family: String,
    /// Worker script location handed to the renderer
    pub worker_url: Option<String>,
    /// Prefix of the downloadable artifact's filename
    pub file_prefix: String,
    /// Schema version of the persistent asset store
    pub store_version: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            chat_selector: "#chat".to_string(),
            message_selector: ".mes".to_string(),
            input_bar_selector: "#form_sheld".to_string(),
            custom_style_selector: "#custom-style".to_string(),
            background_selectors: [
                "#bg_animation_container > div[id^=\"bg\"]",
                "#background > div[id^=\"bg\"]",
                "#bg1",
                "#bg_animation_container",
                "#background",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            chrome_selectors: [
                "#chat",
                "#form_sheld",
                ".header",
                "#right-panel",
                "#left-panel",
                "#character-popup",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            style_properties: rendering::STYLE_PROPERTY_ALLOW_LIST
                .iter()
                .map(|s| s.to_string())
                .collect(),
            message_margin: 5.0,
            format_fallback_ceiling: 16000,
            settle_delay_ms: 100,
            icon_font_family: "Font Awesome".to_string(),
            worker_url: Some("/scripts/extensions/third-party/html2canvas-pro/worker.js".to_string()),
            file_prefix: "SillyTavern_Range".to_string(),
            store_version: 2,
        }
    }
}
