use std::path::PathBuf;

use chrono::NaiveDate;
use image::{Rgba, RgbaImage, imageops};

use crate::{
    error::{MaplapseError, MaplapseResult},
    text::{BBox, TextRaster},
};

/// Caption format burned into every frame.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone, Debug)]
pub struct CaptionStyle {
    pub px: f32,
    pub padding: i32,
    pub fill: Rgba<u8>,
    pub stroke_width: i32,
    pub stroke_fill: Rgba<u8>,
}

impl CaptionStyle {
    /// White fill over a 2px black outline, readable on arbitrary map tiles.
    pub fn new(px: f32, padding: i32) -> Self {
        Self {
            px,
            padding,
            fill: Rgba([255, 255, 255, 255]),
            stroke_width: 2,
            stroke_fill: Rgba([0, 0, 0, 255]),
        }
    }
}

/// Per-date event marker, resolved from the annotation table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Annotation {
    Text(String),
    Icon(PathBuf),
}

/// Metrics of a caption that was actually drawn. `length` is the advance
/// width, `bbox` the stroke-inclusive box, `baseline` the anchor it was drawn
/// at. All come from the same measurement the drawing used, so annotation
/// placement is pixel-consistent with the rendered caption.
#[derive(Clone, Copy, Debug)]
pub struct DrawnCaption {
    pub length: f32,
    pub bbox: BBox,
    pub baseline: (i32, i32),
}

/// Burns date captions and optional annotations into captured frames.
pub struct Compositor<R: TextRaster> {
    raster: R,
    /// Independent face for text annotations; falls back to `raster`.
    note_raster: Option<R>,
    date_style: CaptionStyle,
    note_style: CaptionStyle,
}

impl<R: TextRaster> Compositor<R> {
    pub fn new(raster: R, date_style: CaptionStyle, note_style: CaptionStyle) -> Self {
        Self {
            raster,
            note_raster: None,
            date_style,
            note_style,
        }
    }

    pub fn with_note_raster(mut self, raster: R) -> Self {
        self.note_raster = Some(raster);
        self
    }

    /// Draw the `YYYY-MM-DD` caption anchored baseline-left, offset by the
    /// style's padding from the image's bottom-left corner.
    pub fn draw_date(&self, img: &mut RgbaImage, date: NaiveDate) -> DrawnCaption {
        let caption = date.format(DATE_FORMAT).to_string();
        let style = &self.date_style;
        let baseline = (style.padding, img.height() as i32 - style.padding);

        let length = self.raster.text_length(&caption, style.px);
        let bbox = self
            .raster
            .text_bbox(baseline, &caption, style.px, style.stroke_width);
        self.raster.draw_text(
            img,
            baseline,
            &caption,
            style.px,
            style.fill,
            style.stroke_width,
            style.stroke_fill,
        );

        DrawnCaption {
            length,
            bbox,
            baseline,
        }
    }

    /// Place an annotation adjacent to an already-drawn date caption.
    pub fn draw_annotation(
        &self,
        img: &mut RgbaImage,
        date: &DrawnCaption,
        annotation: &Annotation,
    ) -> MaplapseResult<()> {
        match annotation {
            Annotation::Text(text) => {
                let style = &self.note_style;
                // Same baseline as the date caption, starting at its right edge.
                let pos = (date.bbox.right, date.baseline.1);
                let raster = self.note_raster.as_ref().unwrap_or(&self.raster);
                raster.draw_text(
                    img,
                    pos,
                    text,
                    style.px,
                    style.fill,
                    style.stroke_width,
                    style.stroke_fill,
                );
                Ok(())
            }
            Annotation::Icon(path) => {
                // The icon is opened, composited, and dropped within this arm;
                // it cannot outlive a failed composite.
                let icon = image::open(path)
                    .map_err(|e| {
                        MaplapseError::annotation(format!(
                            "failed to open icon '{}': {e}",
                            path.display()
                        ))
                    })?
                    .to_rgba8();
                let (x, y) = icon_anchor(&date.bbox, icon.height());
                imageops::overlay(img, &icon, i64::from(x), i64::from(y));
                Ok(())
            }
        }
    }
}

/// Anchor for an icon placed flush with the caption's right edge and
/// vertically centered on the caption's bbox.
pub fn icon_anchor(bbox: &BBox, icon_height: u32) -> (i32, i32) {
    let y = bbox.top + (bbox.height() - icon_height as i32) / 2;
    (bbox.right, y)
}
