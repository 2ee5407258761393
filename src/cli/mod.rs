//! Command-line interface for shelf.
//!
//! Provides commands for listing and searching saved content, opening
//! items in their viewer, playing videos, working with transcripts,
//! downloading documents and requesting moves between lists.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;

use crate::adapters::{
    HttpDocumentEngine, HttpTranscriptProvider, MockTranscriptProvider, SimulatedPlatform,
    TranscriptProvider,
};
use crate::config::{self, ProviderKind, ResolvedConfig};
use crate::domain::{format_timestamp, ContentItem, ContentType, ItemStatus};
use crate::export::Exporter;
use crate::library::{Catalog, ListQuery, SortOrder, EMPTY_LIST_MESSAGE};
use crate::viewer::pdf::LOADING_MESSAGE;
use crate::viewer::transcript::{highlight_spans, TranscriptPanel, NO_MATCHES_MESSAGE};
use crate::viewer::video::INVALID_VIDEO_MESSAGE;
use crate::viewer::{
    extract_video_id, ContentViewer, PdfSurface, TranscriptPhase, TranscriptSession, VideoPane,
    ViewerContext,
};

/// shelf - Read-it-later content viewer
#[derive(Parser, Debug)]
#[command(name = "shelf")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Catalog JSON to use instead of the configured or built-in one
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List saved content
    List {
        /// Only items in this list
        #[arg(short, long, value_enum)]
        status: Option<StatusArg>,

        /// Only items of this type
        #[arg(short = 't', long = "type", value_enum)]
        content_type: Option<TypeArg>,

        /// Sort order
        #[arg(long, value_enum, default_value = "newest")]
        sort: SortArg,
    },

    /// Search titles, descriptions and sources
    Search {
        /// Search query
        query: String,
    },

    /// Open an item in its viewer
    Show {
        /// Item ID
        id: String,

        /// Go to this page (PDF)
        #[arg(long)]
        page: Option<i64>,

        /// Zoom in this many steps (PDF)
        #[arg(long, default_value = "0")]
        zoom_in: u32,

        /// Zoom out this many steps (PDF)
        #[arg(long, default_value = "0")]
        zoom_out: u32,

        /// Rotate clockwise this many quarter turns (PDF)
        #[arg(long, default_value = "0")]
        rotate: u32,

        /// Show the transcript (video)
        #[arg(long)]
        transcript: bool,

        /// Search the transcript (video)
        #[arg(short, long)]
        query: Option<String>,
    },

    /// Play a video for a while
    Play {
        /// Item ID
        id: String,

        /// How long to play, in seconds
        #[arg(short, long, default_value = "3")]
        seconds: u64,

        /// Skip forward this many times before playing
        #[arg(long, default_value = "0")]
        skip_forward: u32,
    },

    /// Fetch, search and export a video transcript
    Transcript {
        /// Item ID or video URL
        target: String,

        /// Only show segments containing this text
        #[arg(short, long)]
        search: Option<String>,

        /// Save the transcript as a text file
        #[arg(short, long)]
        export: bool,
    },

    /// Download the original document of a PDF item
    Download {
        /// Item ID
        id: String,
    },

    /// Move an item to the archive
    Archive {
        /// Item ID
        id: String,
    },

    /// Move an item to Read Later
    Later {
        /// Item ID
        id: String,
    },

    /// Move an item back to the inbox
    Inbox {
        /// Item ID
        id: String,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// List filter for the CLI (maps to ItemStatus)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusArg {
    Inbox,
    Later,
    Archive,
}

impl From<StatusArg> for ItemStatus {
    fn from(s: StatusArg) -> Self {
        match s {
            StatusArg::Inbox => ItemStatus::Inbox,
            StatusArg::Later => ItemStatus::Later,
            StatusArg::Archive => ItemStatus::Archive,
        }
    }
}

/// Content type for the CLI (maps to ContentType)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TypeArg {
    Article,
    Pdf,
    Newsletter,
    Video,
}

impl From<TypeArg> for ContentType {
    fn from(t: TypeArg) -> Self {
        match t {
            TypeArg::Article => ContentType::Article,
            TypeArg::Pdf => ContentType::Pdf,
            TypeArg::Newsletter => ContentType::Newsletter,
            TypeArg::Video => ContentType::Video,
        }
    }
}

/// Sort order for the CLI (maps to SortOrder)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortArg {
    Newest,
    Oldest,
    Title,
    Source,
}

impl From<SortArg> for SortOrder {
    fn from(s: SortArg) -> Self {
        match s {
            SortArg::Newest => SortOrder::Newest,
            SortArg::Oldest => SortOrder::Oldest,
            SortArg::Title => SortOrder::Title,
            SortArg::Source => SortOrder::Source,
        }
    }
}

/// PDF operations requested on the command line
#[derive(Debug, Clone, Copy, Default)]
struct PdfActions {
    page: Option<i64>,
    zoom_in: u32,
    zoom_out: u32,
    rotate: u32,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let cfg = config::config()?;
        let catalog_path = self.catalog.or_else(|| cfg.catalog.clone());

        match self.command {
            Commands::List {
                status,
                content_type,
                sort,
            } => {
                let catalog = load_catalog(catalog_path).await?;
                let query = ListQuery {
                    status: status.map(Into::into),
                    content_type: content_type.map(Into::into),
                    sort: sort.into(),
                };
                list_items(&catalog, &query)
            }
            Commands::Search { query } => {
                let catalog = load_catalog(catalog_path).await?;
                search_items(&catalog, &query)
            }
            Commands::Show {
                id,
                page,
                zoom_in,
                zoom_out,
                rotate,
                transcript,
                query,
            } => {
                let catalog = load_catalog(catalog_path).await?;
                let actions = PdfActions {
                    page,
                    zoom_in,
                    zoom_out,
                    rotate,
                };
                show_item(&catalog, cfg, &id, actions, transcript, query.as_deref()).await
            }
            Commands::Play {
                id,
                seconds,
                skip_forward,
            } => {
                let catalog = load_catalog(catalog_path).await?;
                play_video(&catalog, cfg, &id, seconds, skip_forward).await
            }
            Commands::Transcript {
                target,
                search,
                export,
            } => {
                let catalog = load_catalog(catalog_path).await?;
                show_transcript(&catalog, cfg, &target, search.as_deref(), export).await
            }
            Commands::Download { id } => {
                let catalog = load_catalog(catalog_path).await?;
                download_document(&catalog, cfg, &id).await
            }
            Commands::Archive { id } => {
                let catalog = load_catalog(catalog_path).await?;
                request_move(&catalog, &id, ItemStatus::Archive)
            }
            Commands::Later { id } => {
                let catalog = load_catalog(catalog_path).await?;
                request_move(&catalog, &id, ItemStatus::Later)
            }
            Commands::Inbox { id } => {
                let catalog = load_catalog(catalog_path).await?;
                request_move(&catalog, &id, ItemStatus::Inbox)
            }
            Commands::Config => show_config(cfg),
        }
    }
}

/// Load the catalog from `path`, or the built-in samples
async fn load_catalog(path: Option<PathBuf>) -> Result<Catalog> {
    match path {
        Some(path) => Catalog::from_json_file(&path).await,
        None => Catalog::sample(),
    }
}

/// Build the transcript source the configuration asks for
pub fn transcript_provider(cfg: &ResolvedConfig) -> Result<Arc<dyn TranscriptProvider>> {
    let settings = &cfg.transcript;
    match settings.provider {
        ProviderKind::Mock => Ok(Arc::new(MockTranscriptProvider::new(settings.mock_delay))),
        ProviderKind::Http => {
            let endpoint = settings
                .endpoint
                .clone()
                .context("transcript.provider is http but no endpoint is configured")?;
            Ok(Arc::new(HttpTranscriptProvider::new(endpoint, settings.timeout)))
        }
    }
}

/// Collaborators for the viewers, built from the configuration
pub fn viewer_context(cfg: &ResolvedConfig) -> Result<ViewerContext> {
    Ok(ViewerContext {
        documents: Arc::new(HttpDocumentEngine::new(cfg.document_timeout)),
        videos: Arc::new(SimulatedPlatform::new(cfg.video_duration)),
        transcripts: transcript_provider(cfg)?,
        settings: cfg.viewer,
    })
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

fn print_table(items: &[&ContentItem]) {
    println!(
        "{:<10} {:<11} {:<8} {:<44} {:<10}",
        "ID", "TYPE", "STATUS", "TITLE", "ADDED"
    );
    println!("{}", "-".repeat(88));

    for item in items {
        println!(
            "{:<10} {:<11} {:<8} {:<44} {:<10}",
            item.id.as_str(),
            item.content_type.to_string(),
            item.status.to_string(),
            truncate(&item.title, 44),
            item.added_at.format("%Y-%m-%d")
        );
    }
}

/// List catalog items
fn list_items(catalog: &Catalog, query: &ListQuery) -> Result<()> {
    let items = catalog.list(query);

    if items.is_empty() {
        println!("{}", EMPTY_LIST_MESSAGE);
        return Ok(());
    }

    print_table(&items);
    println!("\nTotal: {} items", items.len());

    Ok(())
}

/// Search the catalog
fn search_items(catalog: &Catalog, query: &str) -> Result<()> {
    let results = catalog.search(query);

    if results.is_empty() {
        println!("No results found for: {}", query);
        return Ok(());
    }

    println!("Found {} result(s) for \"{}\":\n", results.len(), query);
    print_table(&results);

    Ok(())
}

fn print_item_header(item: &ContentItem) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("  ID: {}", item.id);
    println!("  Title: {}", item.title);
    println!("  Type: {}", item.content_type);
    println!("  Status: {}", item.status);
    if let Some(ref url) = item.original_url {
        println!("  URL: {}", url);
    }
    if let Some(ref description) = item.description {
        println!("  Description: {}", description);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
}

/// Open an item in its viewer and print what the viewer shows
async fn show_item(
    catalog: &Catalog,
    cfg: &ResolvedConfig,
    id: &str,
    actions: PdfActions,
    transcript: bool,
    query: Option<&str>,
) -> Result<()> {
    let item = catalog.find(id)?;
    let context = viewer_context(cfg)?;

    print_item_header(item);

    match ContentViewer::open(item, &context).await? {
        ContentViewer::Pdf(mut surface) => {
            apply_pdf_actions(&mut surface, actions).await;
            print_pdf(&surface);
        }
        ContentViewer::Video(mut pane) => {
            print_video(&pane);
            if transcript {
                if !pane.toggle_transcript().await {
                    println!("\nNo transcript available for this video.");
                } else {
                    print_pane_transcript(&mut pane, query);
                }
            }
            if let Some(transport) = pane.viewer.transport_mut() {
                transport.unmount();
            }
        }
        ContentViewer::Markup(view) => {
            println!();
            for line in view.header_lines(chrono::Utc::now()) {
                println!("  {}", line);
            }
            println!();
            println!("{}", view.plain_text());
        }
    }

    Ok(())
}

async fn apply_pdf_actions(surface: &mut PdfSurface, actions: PdfActions) {
    let mut jobs = Vec::new();

    if let Some(page) = actions.page {
        match surface.go_to_page(page) {
            Some(job) => jobs.push(job),
            None => eprintln!("⚠️  Page {} is outside the document", page),
        }
    }
    for _ in 0..actions.zoom_in {
        jobs.extend(surface.zoom_in());
    }
    for _ in 0..actions.zoom_out {
        jobs.extend(surface.zoom_out());
    }
    for _ in 0..actions.rotate {
        jobs.extend(surface.rotate());
    }

    // Every job but the newest is superseded
    if let Some(job) = jobs.pop() {
        debug!(superseded = jobs.len(), "Rendering latest view");
        surface.render(job).await;
    }
}

fn print_pdf(surface: &PdfSurface) {
    let state = surface.state();
    println!();

    if let Some(message) = surface.status_message() {
        println!("{}", message);
        return;
    }

    for line in state.metadata.display_lines() {
        println!("  {}", line);
    }
    println!("  Page:     {}", state.page_label());
    println!("  Zoom:     {}", state.scale);
    println!("  Rotation: {}°", state.rotation.degrees());

    match (surface.surface(), surface.last_render_error()) {
        (_, Some(error)) => println!("  Render:   {}", error),
        (Some(raster), None) => println!("  Render:   {}x{} px", raster.width, raster.height),
        (None, None) => println!("  Render:   {}", LOADING_MESSAGE),
    }
}

fn print_video(pane: &VideoPane) {
    println!();
    match pane.viewer.transport() {
        Some(transport) => {
            let state = transport.state();
            println!("  Video:    {}", transport.video_id());
            println!("  Player:   {:?}", state.phase);
            println!("  Progress: {}", transport.progress_label());
            println!(
                "  Volume:   {}{}",
                state.volume.value(),
                if state.muted { " (muted)" } else { "" }
            );
            if let Some(ref error) = state.error {
                println!("  Error:    {}", error);
            }
        }
        None => println!("{}", INVALID_VIDEO_MESSAGE),
    }
}

fn print_pane_transcript(pane: &mut VideoPane, query: Option<&str>) {
    if let Some(message) = pane.transcript_session().status_message() {
        println!("\n{}", message);
        return;
    }
    if let Some(panel) = pane.panel_mut() {
        print_panel(panel, query);
    }
}

/// Print matching segments, marking search hits with `**`
fn print_panel(panel: &mut TranscriptPanel, query: Option<&str>) {
    let query = query.unwrap_or("");
    let segments = panel.search(query);
    println!();

    if segments.is_empty() {
        println!("{}", NO_MATCHES_MESSAGE);
        return;
    }

    for segment in segments {
        let text: String = highlight_spans(&segment.text, query)
            .into_iter()
            .map(|span| {
                if span.matched {
                    format!("**{}**", span.text)
                } else {
                    span.text
                }
            })
            .collect();
        println!("  {}  {}", segment.time_range_label(), text);
    }
}

/// Play a video item on the simulated platform
async fn play_video(
    catalog: &Catalog,
    cfg: &ResolvedConfig,
    id: &str,
    seconds: u64,
    skip_forward: u32,
) -> Result<()> {
    let item = catalog.find(id)?;
    if item.content_type != ContentType::Video {
        bail!("Item {} is a {}, not a video", id, item.content_type);
    }

    let context = viewer_context(cfg)?;
    let ContentViewer::Video(mut pane) = ContentViewer::open(item, &context).await? else {
        bail!("Item {} did not open in the video viewer", id);
    };

    let Some(transport) = pane.viewer.transport_mut() else {
        bail!("{}: {}", INVALID_VIDEO_MESSAGE, item.original_url.as_deref().unwrap_or(""));
    };

    eprintln!("▶️  Playing: {}", item.title);
    for _ in 0..skip_forward {
        transport.skip_forward();
    }
    transport.toggle_play();

    let mut position = transport.subscribe_position();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(seconds);

    loop {
        tokio::select! {
            changed = position.changed() => {
                if changed.is_err() {
                    break;
                }
                let now = *position.borrow_and_update();
                eprintln!(
                    "   {} / {}",
                    format_timestamp(now),
                    format_timestamp(transport.state().duration)
                );
            }
            event = transport.next_event() => {
                if event.is_none() || !transport.state().playing {
                    break;
                }
            }
            _ = tokio::time::sleep_until(deadline) => break,
        }
    }

    if transport.state().playing {
        transport.toggle_play();
    }

    println!("\n  Stopped at {}", transport.progress_label());
    println!("  Player:   {:?}", transport.state().phase);
    transport.unmount();

    Ok(())
}

/// Video URL for an item ID, or the argument itself when it is a URL
fn resolve_video_url(catalog: &Catalog, target: &str) -> Result<String> {
    if let Some(item) = catalog.get(target) {
        if item.content_type != ContentType::Video {
            bail!("Item {} is a {}, not a video", target, item.content_type);
        }
        return item
            .original_url
            .clone()
            .with_context(|| format!("Item {} has no video URL", target));
    }
    Ok(target.to_string())
}

/// Fetch a transcript, optionally search and export it
async fn show_transcript(
    catalog: &Catalog,
    cfg: &ResolvedConfig,
    target: &str,
    search: Option<&str>,
    export: bool,
) -> Result<()> {
    let url = resolve_video_url(catalog, target)?;
    let video_id = extract_video_id(&url)
        .with_context(|| format!("{}: {}", INVALID_VIDEO_MESSAGE, url))?;

    eprintln!("📜 Fetching transcript for {}", video_id);
    let mut session = TranscriptSession::new(transcript_provider(cfg)?);

    let transcript = match session.load(&video_id).await {
        TranscriptPhase::Loaded(transcript) => transcript.clone(),
        TranscriptPhase::Failed(message) => bail!("{}", message),
        TranscriptPhase::Idle | TranscriptPhase::Loading => bail!("Transcript did not load"),
    };

    let mut panel = TranscriptPanel::new(transcript);
    print_panel(&mut panel, search);

    if export {
        let exporter = Exporter::new(cfg.exports.clone());
        let path = panel.export(&exporter).await?;
        eprintln!("\n✅ Transcript saved to {}", path.display());
    }

    Ok(())
}

/// Save the original document of a PDF item
async fn download_document(catalog: &Catalog, cfg: &ResolvedConfig, id: &str) -> Result<()> {
    let item = catalog.find(id)?;
    if item.content_type != ContentType::Pdf {
        bail!("Item {} is a {}, not a PDF", id, item.content_type);
    }
    let url = item
        .original_url
        .clone()
        .with_context(|| format!("Item {} has no document URL", id))?;

    let surface = PdfSurface::new(Arc::new(HttpDocumentEngine::new(cfg.document_timeout)), url);
    let request = surface.download();

    eprintln!("📥 Downloading {}", request.url);
    let path = Exporter::new(cfg.exports.clone()).save_download(&request).await?;
    eprintln!("✅ Saved to {}", path.display());

    Ok(())
}

/// Request a move and print the notification
fn request_move(catalog: &Catalog, id: &str, target: ItemStatus) -> Result<()> {
    let notice = catalog.request_move(id, target)?;
    println!("{}", notice.title);
    println!("{}", notice.description);
    if notice.already_there {
        println!("(item {} was already in {})", notice.id, notice.target);
    }
    Ok(())
}

/// Show the resolved configuration (for debugging)
fn show_config(cfg: &ResolvedConfig) -> Result<()> {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("  Shelf Configuration");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:    {}", cfg.home.display());
    println!("  Exports: {}", cfg.exports.display());
    println!(
        "  Catalog: {}",
        cfg.catalog
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(built-in samples)".to_string())
    );
    println!();
    println!("Viewer:");
    println!("  Initial page:   {}", cfg.viewer.initial_page);
    println!(
        "  Poll interval:  {}ms",
        cfg.viewer.transport.poll_interval.as_millis()
    );
    println!("  Skip:           {}s", cfg.viewer.transport.skip_seconds);
    println!(
        "  Initial volume: {}",
        cfg.viewer.transport.initial_volume.value()
    );
    println!("  Video duration: {}s", cfg.video_duration);
    println!();
    println!("Transcript:");
    println!("  Provider: {:?}", cfg.transcript.provider);
    println!(
        "  Endpoint: {}",
        cfg.transcript.endpoint.as_deref().unwrap_or("(none)")
    );
    println!("  Mock delay: {}ms", cfg.transcript.mock_delay.as_millis());
    println!("  Timeout:    {}s", cfg.transcript.timeout.as_secs());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_show_flags() {
        let cli = Cli::try_parse_from([
            "shelf", "show", "pdf-1", "--page", "3", "--zoom-in", "2", "--rotate", "1",
        ])
        .unwrap();

        match cli.command {
            Commands::Show {
                id,
                page,
                zoom_in,
                rotate,
                ..
            } => {
                assert_eq!(id, "pdf-1");
                assert_eq!(page, Some(3));
                assert_eq!(zoom_in, 2);
                assert_eq!(rotate, 1);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_parses_list_filters() {
        let cli = Cli::try_parse_from([
            "shelf", "list", "--status", "later", "--type", "pdf", "--sort", "title",
        ])
        .unwrap();

        assert!(matches!(
            cli.command,
            Commands::List {
                status: Some(StatusArg::Later),
                content_type: Some(TypeArg::Pdf),
                sort: SortArg::Title,
            }
        ));
    }

    #[test]
    fn test_global_catalog_flag() {
        let cli = Cli::try_parse_from(["shelf", "search", "rust", "--catalog", "/tmp/items.json"])
            .unwrap();
        assert_eq!(cli.catalog, Some(PathBuf::from("/tmp/items.json")));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer title", 10), "a much ...");
    }

    #[test]
    fn test_resolve_video_url() {
        let catalog = Catalog::sample().unwrap();

        assert_eq!(
            resolve_video_url(&catalog, "video-1").unwrap(),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
        assert_eq!(
            resolve_video_url(&catalog, "https://youtu.be/dQw4w9WgXcQ").unwrap(),
            "https://youtu.be/dQw4w9WgXcQ"
        );
        assert!(resolve_video_url(&catalog, "1").is_err());
    }
}
