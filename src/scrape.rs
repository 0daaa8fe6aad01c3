use std::{collections::HashMap, path::PathBuf, time::Duration};

use anyhow::Context as _;

use crate::{
    caption::{Annotation, Compositor, DATE_FORMAT},
    date::DateTextParser,
    driver::{PageDriver, Size},
    error::MaplapseResult,
    page::MapPage,
    text::TextRaster,
};

/// Zero-padded sequence name the encoder's `%06d.png` pattern depends on.
pub fn frame_filename(index: u64) -> String {
    format!("{index:06}.png")
}

#[derive(Clone, Debug)]
pub struct ScrapeOptions {
    /// Target canvas geometry, asserted before every capture.
    pub size: Size,
    /// First sequence number; frames land at `out_dir/{begin..begin+count}`.
    pub begin: u64,
    pub count: u64,
    pub out_dir: PathBuf,
    /// `YYYY-MM-DD` keyed event markers; `None` disables annotation lookup.
    pub annotations: Option<HashMap<String, Annotation>>,
    /// Delay after the per-iteration zoom nudge, letting tiles settle.
    pub zoom_settle: Duration,
}

impl ScrapeOptions {
    pub fn new(size: Size, begin: u64, count: u64, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            size,
            begin,
            count,
            out_dir: out_dir.into(),
            annotations: None,
            zoom_settle: Duration::from_millis(1500),
        }
    }
}

/// Orchestrates the capture sequence: one composited, numbered frame per
/// simulated day. Strictly sequential; the first fatal error aborts the run
/// and already-written frames stay on disk for inspection.
pub struct Scraper<D: PageDriver, R: TextRaster> {
    page: MapPage<D>,
    parser: DateTextParser,
    compositor: Compositor<R>,
    opts: ScrapeOptions,
}

impl<D: PageDriver, R: TextRaster> Scraper<D, R> {
    pub fn new(
        page: MapPage<D>,
        parser: DateTextParser,
        compositor: Compositor<R>,
        opts: ScrapeOptions,
    ) -> Self {
        Self {
            page,
            parser,
            compositor,
            opts,
        }
    }

    /// Open the timeline and settle the session geometry. Geometry failures
    /// surface here, before any capture begins.
    pub fn open(&mut self, url: &str) -> MaplapseResult<()> {
        self.page.open(url)?;
        self.page.resize_window(self.opts.size)
    }

    pub fn run(&mut self) -> MaplapseResult<()> {
        std::fs::create_dir_all(&self.opts.out_dir).with_context(|| {
            format!(
                "failed to create output directory '{}'",
                self.opts.out_dir.display()
            )
        })?;

        for i in self.opts.begin..self.opts.begin + self.opts.count {
            self.capture_one(i)?;
        }

        self.page.close()
    }

    fn capture_one(&mut self, index: u64) -> MaplapseResult<()> {
        // Prior-iteration interactions may have perturbed the canvas, so the
        // geometry is re-asserted every time.
        self.page.zoom_in()?;
        if !self.opts.zoom_settle.is_zero() {
            std::thread::sleep(self.opts.zoom_settle);
        }
        self.page.resize_map(self.opts.size)?;

        self.page.hide_chrome()?;
        let mut frame = self.page.capture_frame()?;

        let date = self.parser.parse(&frame.date_text)?;
        let drawn = self.compositor.draw_date(&mut frame.image, date);

        if let Some(table) = &self.opts.annotations {
            let key = date.format(DATE_FORMAT).to_string();
            if let Some(annotation) = table.get(&key) {
                tracing::debug!(%date, ?annotation, "drawing annotation");
                self.compositor
                    .draw_annotation(&mut frame.image, &drawn, annotation)?;
            }
        }

        let path = self.opts.out_dir.join(frame_filename(index));
        frame
            .image
            .save(&path)
            .with_context(|| format!("failed to write frame '{}'", path.display()))?;
        tracing::info!(frame = index, %date, path = %path.display(), "captured");

        self.page.show_chrome()?;
        self.page.advance_day()
    }
}
