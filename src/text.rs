use std::path::Path;

use image::{Rgba, RgbaImage};
use rusttype::{Font, Scale, point};

use crate::error::{MaplapseError, MaplapseResult};

/// Bounding box in image pixel coordinates, stroke inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BBox {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl BBox {
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

/// Text measurement and drawing capability.
///
/// Positions are `(x, baseline_y)`: the anchor is the left end of the
/// baseline, and the reported bbox includes the stroke outline. The same
/// layout drives measurement and drawing, so a caller can measure, draw, and
/// place adjacent content without sub-pixel drift between the two.
pub trait TextRaster {
    /// Advance width of `text` at `px` pixels, ignoring stroke.
    fn text_length(&self, text: &str, px: f32) -> f32;

    /// Rendered bounding box of `text` drawn at `pos`, expanded by
    /// `stroke_width` on every side.
    fn text_bbox(&self, pos: (i32, i32), text: &str, px: f32, stroke_width: i32) -> BBox;

    /// Draw `text` at `pos` with a filled face over a stroked outline.
    fn draw_text(
        &self,
        img: &mut RgbaImage,
        pos: (i32, i32),
        text: &str,
        px: f32,
        fill: Rgba<u8>,
        stroke_width: i32,
        stroke_fill: Rgba<u8>,
    );
}

/// [`TextRaster`] backed by a TrueType font.
#[derive(Clone)]
pub struct FontRaster {
    font: Font<'static>,
}

impl FontRaster {
    pub fn from_bytes(bytes: Vec<u8>) -> MaplapseResult<Self> {
        let font = Font::try_from_vec(bytes)
            .ok_or_else(|| MaplapseError::annotation("font data is not a usable TrueType font"))?;
        Ok(Self { font })
    }

    pub fn from_file(path: &Path) -> MaplapseResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            MaplapseError::annotation(format!("failed to read font '{}': {e}", path.display()))
        })?;
        Self::from_bytes(bytes)
    }

    fn draw_pass(&self, img: &mut RgbaImage, pos: (f32, f32), text: &str, px: f32, color: Rgba<u8>) {
        let scale = Scale::uniform(px);
        for glyph in self.font.layout(text, scale, point(pos.0, pos.1)) {
            let Some(bb) = glyph.pixel_bounding_box() else {
                continue;
            };
            glyph.draw(|gx, gy, v| {
                let x = gx as i32 + bb.min.x;
                let y = gy as i32 + bb.min.y;
                if x < 0 || y < 0 || x >= img.width() as i32 || y >= img.height() as i32 {
                    return;
                }
                let a = (v * 255.0).round() as u32;
                if a == 0 {
                    return;
                }
                let dst = img.get_pixel_mut(x as u32, y as u32);
                for c in 0..3 {
                    let blended =
                        u32::from(color.0[c]) * a + u32::from(dst.0[c]) * (255 - a) + 127;
                    dst.0[c] = (blended / 255) as u8;
                }
                dst.0[3] = dst.0[3].max(a as u8);
            });
        }
    }
}

impl TextRaster for FontRaster {
    fn text_length(&self, text: &str, px: f32) -> f32 {
        let scale = Scale::uniform(px);
        self.font
            .layout(text, scale, point(0.0, 0.0))
            .map(|g| g.unpositioned().h_metrics().advance_width)
            .sum()
    }

    fn text_bbox(&self, pos: (i32, i32), text: &str, px: f32, stroke_width: i32) -> BBox {
        let scale = Scale::uniform(px);
        let mut bbox: Option<BBox> = None;
        for glyph in self
            .font
            .layout(text, scale, point(pos.0 as f32, pos.1 as f32))
        {
            let Some(bb) = glyph.pixel_bounding_box() else {
                continue;
            };
            let b = bbox.get_or_insert(BBox {
                left: bb.min.x,
                top: bb.min.y,
                right: bb.max.x,
                bottom: bb.max.y,
            });
            b.left = b.left.min(bb.min.x);
            b.top = b.top.min(bb.min.y);
            b.right = b.right.max(bb.max.x);
            b.bottom = b.bottom.max(bb.max.y);
        }

        let mut bbox = bbox.unwrap_or(BBox {
            left: pos.0,
            top: pos.1,
            right: pos.0 + self.text_length(text, px).ceil() as i32,
            bottom: pos.1,
        });
        bbox.left -= stroke_width;
        bbox.top -= stroke_width;
        bbox.right += stroke_width;
        bbox.bottom += stroke_width;
        bbox
    }

    fn draw_text(
        &self,
        img: &mut RgbaImage,
        pos: (i32, i32),
        text: &str,
        px: f32,
        fill: Rgba<u8>,
        stroke_width: i32,
        stroke_fill: Rgba<u8>,
    ) {
        let (x, y) = (pos.0 as f32, pos.1 as f32);
        if stroke_width > 0 {
            // Round outline: one pass per offset inside the stroke radius.
            let r = stroke_width;
            for dy in -r..=r {
                for dx in -r..=r {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    if dx * dx + dy * dy > r * r {
                        continue;
                    }
                    self.draw_pass(img, (x + dx as f32, y + dy as f32), text, px, stroke_fill);
                }
            }
        }
        self.draw_pass(img, (x, y), text, px, fill);
    }
}

/// A synthetic raster with fixed-size box glyphs. Used by the unit and
/// integration tests so drawing behavior stays checkable without a font file;
/// not part of the public API.
#[doc(hidden)]
pub mod test_support {
    use super::*;

    pub struct BlockRaster {
        pub cell: i32,
    }

    impl TextRaster for BlockRaster {
        fn text_length(&self, text: &str, _px: f32) -> f32 {
            (text.chars().count() as i32 * self.cell) as f32
        }

        fn text_bbox(&self, pos: (i32, i32), text: &str, px: f32, stroke_width: i32) -> BBox {
            BBox {
                left: pos.0 - stroke_width,
                top: pos.1 - self.cell - stroke_width,
                right: pos.0 + self.text_length(text, px) as i32 + stroke_width,
                bottom: pos.1 + stroke_width,
            }
        }

        fn draw_text(
            &self,
            img: &mut RgbaImage,
            pos: (i32, i32),
            text: &str,
            px: f32,
            fill: Rgba<u8>,
            stroke_width: i32,
            stroke_fill: Rgba<u8>,
        ) {
            let bbox = self.text_bbox(pos, text, px, stroke_width);
            for y in bbox.top..bbox.bottom {
                for x in bbox.left..bbox.right {
                    if x < 0 || y < 0 || x >= img.width() as i32 || y >= img.height() as i32 {
                        continue;
                    }
                    let inner = x >= pos.0
                        && x < bbox.right - stroke_width
                        && y >= bbox.top + stroke_width
                        && y < pos.1;
                    img.put_pixel(x as u32, y as u32, if inner { fill } else { stroke_fill });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::BlockRaster;
    use super::*;

    #[test]
    fn block_raster_length_is_per_char() {
        let r = BlockRaster { cell: 8 };
        assert_eq!(r.text_length("2021-01-08", 0.0), 80.0);
    }

    #[test]
    fn block_raster_bbox_includes_stroke() {
        let r = BlockRaster { cell: 8 };
        let bbox = r.text_bbox((10, 50), "ab", 0.0, 2);
        assert_eq!(
            bbox,
            BBox {
                left: 8,
                top: 40,
                right: 28,
                bottom: 52
            }
        );
    }

    #[test]
    fn bbox_width_height() {
        let b = BBox {
            left: 10,
            top: 20,
            right: 90,
            bottom: 60,
        };
        assert_eq!(b.width(), 80);
        assert_eq!(b.height(), 40);
    }
}
