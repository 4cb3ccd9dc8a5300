//! Shared fakes for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{Rgba, RgbaImage};
use rangeshot::fetch::{FetchedResource, Fetcher};
use rangeshot::notify::{NoticeLevel, Notifier};
use rangeshot::page::{ChatPage, HtmlPage, NodeId};
use rangeshot::rendering::raster::{encode, scaled_px};
use rangeshot::rendering::{RenderContext, RenderOptions, Renderer};
use rangeshot::store::FsAssetStore;
use rangeshot::{CaptureConfig, Error, ImageFormat, Result, ScreenshotSession, Settings};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const CHAT_URL: &str = "https://chat.example/";

/// Three messages: 380x100, 360x50, 380x70 CSS pixels
pub const CHAT_HTML: &str = r#"<html><head>
<style id="custom-style">@font-face{font-family:Chat;src:url(fonts/latin.woff2);unicode-range:U+41-5A}
@font-face{font-family:Chat;src:url(fonts/base.woff2)}</style>
</head><body>
<div id="bg1" style="background-image: url(img/bg.png)" data-rect="0 0 400 600"></div>
<div id="chat" data-rect="0 0 400 500" data-client-width="380">
  <div class="mes" data-rect="0 0 380 100">Alpha</div>
  <div class="mes" data-rect="0 105 360 50">beta</div>
  <div class="mes" data-rect="0 160 380 70">Gamma</div>
</div>
<div id="form_sheld" data-offset-height="100"></div>
</body></html>"#;

/// Serves every URL with its own bytes, except those marked missing
#[derive(Default)]
pub struct MapFetcher {
    pub requests: RefCell<Vec<String>>,
    pub missing: HashSet<String>,
}

impl MapFetcher {
    pub fn count(&self) -> usize {
        self.requests.borrow().len()
    }
}

#[async_trait(?Send)]
impl Fetcher for MapFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedResource> {
        self.requests.borrow_mut().push(url.to_string());
        if self.missing.contains(url) {
            return Ok(FetchedResource { status: 404, content_type: None, body: Vec::new() });
        }
        Ok(FetchedResource { status: 200, content_type: None, body: url.as_bytes().to_vec() })
    }
}

/// Paints every node as a solid block of its scaled bounding box
pub struct BlockRenderer {
    pub page: Rc<HtmlPage>,
    pub fail_background: bool,
    pub background_renders: Cell<usize>,
    pub created: Cell<usize>,
    pub destroyed: Cell<usize>,
    pub sections: RefCell<Vec<NodeId>>,
    pub injected_css: RefCell<Option<String>>,
    next_handle: Cell<u64>,
}

impl BlockRenderer {
    pub fn new(page: Rc<HtmlPage>) -> Self {
        Self {
            page,
            fail_background: false,
            background_renders: Cell::new(0),
            created: Cell::new(0),
            destroyed: Cell::new(0),
            sections: RefCell::new(Vec::new()),
            injected_css: RefCell::new(None),
            next_handle: Cell::new(1),
        }
    }
}

#[async_trait(?Send)]
impl Renderer for BlockRenderer {
    async fn render_data_url(&self, node: NodeId, options: &RenderOptions) -> Result<String> {
        self.background_renders.set(self.background_renders.get() + 1);
        if self.fail_background {
            return Err(Error::Render("background layer exploded".into()));
        }
        let r = self.page.bounding_rect(node);
        let img = RgbaImage::from_pixel(
            scaled_px(r.width, options.scale),
            scaled_px(r.height, options.scale),
            Rgba([20, 40, 60, 255]),
        );
        let png = encode(&img, ImageFormat::Png, 1.0)?;
        Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
    }

    async fn create_context(&self, node: NodeId, options: RenderOptions) -> Result<RenderContext> {
        self.created.set(self.created.get() + 1);
        *self.injected_css.borrow_mut() = options.injected_css.clone();
        let handle = self.next_handle.get();
        self.next_handle.set(handle + 1);
        Ok(RenderContext { node, width: 0.0, height: 0.0, options, handle })
    }

    async fn render_context(&self, ctx: &mut RenderContext) -> Result<RgbaImage> {
        self.sections.borrow_mut().push(ctx.node);
        let s = ctx.options.scale;
        Ok(RgbaImage::from_pixel(
            scaled_px(ctx.width, s),
            scaled_px(ctx.height, s),
            Rgba([200, 200, 200, 255]),
        ))
    }

    fn destroy_context(&self, _ctx: RenderContext) {
        self.destroyed.set(self.destroyed.get() + 1);
    }
}

#[derive(Default)]
pub struct Notices(pub RefCell<Vec<(NoticeLevel, String)>>);

impl Notices {
    pub fn levels(&self) -> Vec<NoticeLevel> {
        self.0.borrow().iter().map(|(l, _)| *l).collect()
    }

    pub fn has(&self, level: NoticeLevel) -> bool {
        self.0.borrow().iter().any(|(l, _)| *l == level)
    }
}

impl Notifier for Notices {
    fn notify(&self, level: NoticeLevel, message: &str) {
        self.0.borrow_mut().push((level, message.to_string()));
    }
}

/// A session over [`CHAT_HTML`] with fakes for every collaborator
pub struct Harness {
    pub session: ScreenshotSession,
    pub page: Rc<HtmlPage>,
    pub renderer: Rc<BlockRenderer>,
    pub net: Rc<MapFetcher>,
    pub notices: Rc<Notices>,
    pub dir: tempfile::TempDir,
}

impl Harness {
    pub fn messages(&self) -> Vec<NodeId> {
        self.page.query_selector_all(".mes")
    }
}

pub async fn harness_with(config: CaptureConfig, settings: Settings, fail_background: bool) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let page = Rc::new(HtmlPage::parse(CHAT_URL, CHAT_HTML));
    let mut renderer = BlockRenderer::new(page.clone());
    renderer.fail_background = fail_background;
    let renderer = Rc::new(renderer);
    let net = Rc::new(MapFetcher::default());
    let notices = Rc::new(Notices::default());
    let session = ScreenshotSession::open(
        config,
        settings,
        page.clone(),
        renderer.clone(),
        net.clone(),
        Rc::new(FsAssetStore::new(dir.path(), 2)),
        notices.clone(),
    )
    .await
    .unwrap();
    Harness { session, page, renderer, net, notices, dir }
}

pub async fn harness() -> Harness {
    let config = CaptureConfig { settle_delay_ms: 0, ..CaptureConfig::default() };
    let settings = Settings { screenshot_scale: 1.0, image_format: ImageFormat::Png, ..Settings::default() };
    harness_with(config, settings, false).await
}

/// Local HTTP server; `hits` counts every request it answers
pub struct TestServer {
    pub base: String,
    pub hits: Arc<AtomicUsize>,
    pub paths: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn hits_for(&self, path: &str) -> usize {
        self.paths.lock().unwrap().iter().filter(|p| p.as_str() == path).count()
    }
}

/// Serve `routes` (path -> (content type, body)); anything else is a 404
pub fn start_server(routes: Vec<(&'static str, &'static str, Vec<u8>)>) -> TestServer {
    let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let base = format!("http://{}", server.server_addr());
    let hits = Arc::new(AtomicUsize::new(0));
    let paths = Arc::new(Mutex::new(Vec::new()));
    let (h, p) = (hits.clone(), paths.clone());
    std::thread::spawn(move || {
        for request in server.incoming_requests() {
            h.fetch_add(1, Ordering::SeqCst);
            let path = request.url().to_string();
            p.lock().unwrap().push(path.clone());
            let response = match routes.iter().find(|(route, _, _)| *route == path) {
                Some((_, content_type, body)) => tiny_http::Response::from_data(body.clone()).with_header(
                    format!("Content-Type: {}", content_type).parse::<tiny_http::Header>().unwrap(),
                ),
                None => tiny_http::Response::from_data(b"not found".to_vec()).with_status_code(404),
            };
            let _ = request.respond(response);
        }
    });
    TestServer { base, hits, paths }
}
