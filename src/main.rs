use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use rangeshot::fetch::{HttpFetcher, ResourceFetcher};
use rangeshot::fonts::{FontManager, MappingOutcome};
use rangeshot::page::{ChatPage, HtmlPage};
use rangeshot::store::{AssetCache, AssetStore, FsAssetStore, Namespace};
use rangeshot::{CaptureConfig, SelectionEvent, SelectionRange};
use std::path::PathBuf;
use std::rc::Rc;

#[derive(Parser)]
#[command(name = "rangeshot", version, about = "Font mapping, subsetting and range tools for chat screenshots")]
struct Cli {
    /// Asset store directory
    #[arg(long, default_value = ".rangeshot-cache")]
    cache_dir: PathBuf,

    /// Base URL for relative font locators
    #[arg(long, default_value = "http://localhost/")]
    document_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build (or load) the font mapping for a CSS file or stylesheet URL
    Mapping {
        source: String,
        /// Print the mapping as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the inlined @font-face rules needed to render TEXT
    Subset { source: String, text: String },
    /// Resolve a message range in an HTML snapshot (indices into the message list)
    Range {
        html: PathBuf,
        start: usize,
        end: usize,
        #[arg(long, default_value = ".mes")]
        message_selector: String,
    },
    /// Count persisted records per namespace
    Cache,
}

fn font_manager(cli: &Cli) -> anyhow::Result<FontManager> {
    let store: Rc<dyn AssetStore> = Rc::new(FsAssetStore::new(&cli.cache_dir, CaptureConfig::default().store_version));
    let cache = Rc::new(AssetCache::new(store));
    let net = Rc::new(HttpFetcher::new()?);
    let fetcher = ResourceFetcher::new(cache, net, &cli.document_url)?;
    Ok(FontManager::new(Rc::new(fetcher)))
}

/// A stylesheet URL becomes an `@import`; anything else is read as a CSS file
fn style_text(source: &str) -> anyhow::Result<String> {
    if source.starts_with("http://") || source.starts_with("https://") {
        return Ok(format!("@import url(\"{}\");", source));
    }
    std::fs::read_to_string(source).with_context(|| format!("reading {}", source))
}

async fn load_mapping(cli: &Cli, fonts: &FontManager, source: &str) -> anyhow::Result<()> {
    let css = style_text(source)?;
    match fonts.process_style(Some(&css)).await {
        MappingOutcome::NoCustomFont => bail!("no @import or @font-face rules in {}", source),
        MappingOutcome::Failed => bail!("font mapping construction failed for {}", source),
        outcome => log::info!("{:?} (store: {})", outcome, cli.cache_dir.display()),
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match &cli.command {
        Command::Mapping { source, json } => {
            let fonts = font_manager(&cli)?;
            load_mapping(&cli, &fonts, source).await?;
            let active = fonts.active().context("no active mapping")?;
            if *json {
                println!("{}", serde_json::to_string_pretty(active.mapping.as_ref())?);
            } else {
                println!("identifier: {}", active.identifier);
                println!("entries:    {}", active.mapping.len());
                println!("fallback:   {}", active.mapping.fallback().unwrap_or("-"));
            }
        }
        Command::Subset { source, text } => {
            let fonts = font_manager(&cli)?;
            load_mapping(&cli, &fonts, source).await?;
            println!("{}", fonts.subset_css(text).await);
        }
        Command::Range { html, start, end, message_selector } => {
            let markup = std::fs::read_to_string(html).with_context(|| format!("reading {}", html.display()))?;
            let page = HtmlPage::parse(&cli.document_url, &markup);
            let messages = page.query_selector_all(message_selector);
            let pick = |i: usize| {
                messages
                    .get(i)
                    .copied()
                    .with_context(|| format!("message {} out of range ({} messages)", i, messages.len()))
            };

            let mut selection = SelectionRange::new();
            selection.apply(SelectionEvent::SetStart);
            selection.apply(SelectionEvent::MessageClicked(pick(*start)?));
            selection.apply(SelectionEvent::SetEnd);
            selection.apply(SelectionEvent::MessageClicked(pick(*end)?));

            for node in selection.resolve(&messages) {
                let text = page.text_content(node);
                let index = messages.iter().position(|n| *n == node).unwrap_or_default();
                println!("{:>4}  {}", index, text.split_whitespace().collect::<Vec<_>>().join(" "));
            }
        }
        Command::Cache => {
            let store = FsAssetStore::new(&cli.cache_dir, CaptureConfig::default().store_version);
            for ns in Namespace::ALL {
                let records = store.get_all(ns).await?;
                let bytes: usize = records.iter().map(|r| r.payload.len()).sum();
                println!("{:<14} {:>6} records {:>10} bytes", ns.name(), records.len(), bytes);
            }
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    run(Cli::parse()).await
}
