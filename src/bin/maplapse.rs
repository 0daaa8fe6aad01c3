use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;

use maplapse::{
    CaptionStyle, ChromeDriver, Compositor, Config, DateTextParser, FontRaster,
    LocaleCalendarNames, MapPage, ScrapeOptions, Scraper, Size, VideoEncoder,
};

const DEFAULT_FONT_SIZE: f32 = 64.0;
const DEFAULT_ANNOTATION_SIZE: f32 = 48.0;
const CAPTION_PADDING: i32 = 48;

#[derive(Parser, Debug)]
#[command(name = "maplapse", version)]
#[command(about = "Capture daily map timeline snapshots and encode them into a video")]
struct Cli {
    /// Number of days to capture.
    #[arg(short, long)]
    number: u64,

    /// Image and video resolution as WxH, e.g. 1280x720.
    #[arg(short, long, value_parser = parse_size)]
    size: Size,

    /// Encoder frame rate.
    #[arg(short, long, default_value_t = 1)]
    framerate: u32,

    /// Browser profile directory (overrides config).
    #[arg(short, long)]
    profile: Option<PathBuf>,

    /// Directory where images are saved (overrides config).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// First sequence number; lets an interrupted run be resumed.
    #[arg(short, long, default_value_t = 0)]
    begin: u64,

    /// Output only images; do not encode a video.
    #[arg(short = 'I', long)]
    images_only: bool,

    /// Burn configured per-date annotations into the frames.
    #[arg(long)]
    annotations: bool,

    /// Settings file.
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Encoded video path.
    #[arg(long, default_value = "out.webm")]
    out: PathBuf,

    /// URL of the first map view to capture.
    url: String,
}

fn parse_size(s: &str) -> Result<Size, String> {
    let (w, h) = s
        .to_lowercase()
        .split_once('x')
        .map(|(w, h)| (w.to_string(), h.to_string()))
        .ok_or_else(|| format!("'{s}' is not a WxH resolution"))?;
    let width = w.parse().map_err(|_| format!("invalid width '{w}'"))?;
    let height = h.parse().map_err(|_| format!("invalid height '{h}'"))?;
    Ok(Size::new(width, height))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();
    let cli = Cli::parse();

    let config = Config::load_or_init(&cli.config)
        .with_context(|| format!("load settings '{}'", cli.config.display()))?;

    let locale = config
        .locale
        .clone()
        .or_else(|| std::env::var("LANG").ok())
        .unwrap_or_else(|| "en_US".to_string());
    let names = LocaleCalendarNames::from_identifier(&locale)?;
    let parser = DateTextParser::new(names);

    let font_path = config
        .font
        .as_deref()
        .context("a caption font is required ('font' in config.json)")?;
    let raster = FontRaster::from_file(font_path)?;
    let date_style = CaptionStyle::new(
        config.font_size.unwrap_or(DEFAULT_FONT_SIZE),
        CAPTION_PADDING,
    );
    let note_style = CaptionStyle::new(
        config.annotation_size.unwrap_or(DEFAULT_ANNOTATION_SIZE),
        CAPTION_PADDING,
    );

    let mut compositor = Compositor::new(raster, date_style, note_style);
    if let Some(path) = config.annotation_font.as_deref() {
        compositor = compositor.with_note_raster(FontRaster::from_file(path)?);
    }

    let out_dir = cli
        .output
        .clone()
        .or_else(|| config.dir.clone())
        .unwrap_or_else(|| PathBuf::from("maps"));

    let mut opts = ScrapeOptions::new(cli.size, cli.begin, cli.number, &out_dir);
    if cli.annotations {
        opts.annotations = config.annotation_table()?;
    }

    let profile = cli.profile.clone().or_else(|| config.profile.clone());
    let driver = ChromeDriver::launch(profile.as_deref())?;
    let mut scraper = Scraper::new(MapPage::new(driver), parser, compositor, opts);

    scraper.open(&cli.url)?;
    scraper.run()?;

    if !cli.images_only {
        VideoEncoder::new(&out_dir).encode(
            &cli.out,
            cli.size,
            cli.framerate,
            &config.ffmpeg_arguments,
            config.ffmpeg_override_arguments,
        )?;
        eprintln!("wrote {}", cli.out.display());
    } else {
        eprintln!("wrote image sequence to {}", out_dir.display());
    }

    Ok(())
}
