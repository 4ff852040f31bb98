//! Drawing surfaces for the piano roll
//!
//! The renderer only needs filled rectangles and axis-aligned lines, so it
//! talks to a small [`RollCanvas`] trait. On screen that is an egui
//! [`Painter`]; offscreen (snapshots, tests) it is a `tiny_skia::Pixmap`.
//! All coordinates are local to the roll: origin at its top-left corner,
//! y growing downward.

use std::path::Path;

use egui::{Color32, Painter, Pos2, Rangef, Rect, Stroke, Vec2};
use tiny_skia::{Paint, Pixmap, Transform};

use crate::error::{Result, RollError};

pub trait RollCanvas {
    fn size(&self) -> Vec2;
    fn fill_rect(&mut self, rect: Rect, color: Color32);
    fn hline(&mut self, x: Rangef, y: f32, stroke: Stroke);
    fn vline(&mut self, x: f32, y: Rangef, stroke: Stroke);
}

/// On-screen canvas: an egui painter clipped to the roll's rect.
pub struct EguiCanvas {
    painter: Painter,
    origin: Pos2,
    size: Vec2,
}

impl EguiCanvas {
    pub fn new(painter: &Painter, rect: Rect) -> Self {
        Self {
            painter: painter.with_clip_rect(rect),
            origin: rect.min,
            size: rect.size(),
        }
    }
}

impl RollCanvas for EguiCanvas {
    fn size(&self) -> Vec2 {
        self.size
    }

    fn fill_rect(&mut self, rect: Rect, color: Color32) {
        self.painter
            .rect_filled(rect.translate(self.origin.to_vec2()), 0.0, color);
    }

    fn hline(&mut self, x: Rangef, y: f32, stroke: Stroke) {
        let x = Rangef::new(x.min + self.origin.x, x.max + self.origin.x);
        self.painter.hline(x, y + self.origin.y, stroke);
    }

    fn vline(&mut self, x: f32, y: Rangef, stroke: Stroke) {
        let y = Rangef::new(y.min + self.origin.y, y.max + self.origin.y);
        self.painter.vline(x + self.origin.x, y, stroke);
    }
}

/// Offscreen canvas backed by a tiny-skia pixmap.
pub struct PixmapCanvas {
    pixmap: Pixmap,
}

impl PixmapCanvas {
    /// Fails with [`RollError::MissingSurface`] for a zero-sized surface.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let pixmap = Pixmap::new(width, height).ok_or(RollError::MissingSurface)?;
        Ok(Self { pixmap })
    }

    /// Surface matching an on-screen size, rounded to whole pixels.
    pub fn with_size(size: Vec2) -> Result<Self> {
        if !(size.x.is_finite() && size.y.is_finite()) {
            return Err(RollError::MissingSurface);
        }
        Self::new(size.x.max(0.0).round() as u32, size.y.max(0.0).round() as u32)
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Color at pixel (x, y), or None outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color32> {
        // Pixmap::pixel only checks the flat index, so x past the edge
        // would land in the next row.
        if x >= self.width() || y >= self.height() {
            return None;
        }
        self.pixmap.pixel(x, y).map(|p| {
            let c = p.demultiply();
            Color32::from_rgba_unmultiplied(c.red(), c.green(), c.blue(), c.alpha())
        })
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        self.pixmap
            .encode_png()
            .map_err(|e| RollError::Encode(e.to_string()))
    }

    pub fn save_png(&self, path: &Path) -> Result<()> {
        let bytes = self.encode_png()?;
        std::fs::write(path, bytes)?;
        log::info!("saved roll snapshot to {}", path.display());
        Ok(())
    }
}

fn paint_for(color: Color32) -> Paint<'static> {
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = false;
    paint
}

impl RollCanvas for PixmapCanvas {
    fn size(&self) -> Vec2 {
        Vec2::new(self.pixmap.width() as f32, self.pixmap.height() as f32)
    }

    fn fill_rect(&mut self, rect: Rect, color: Color32) {
        // tiny-skia fills a hairline for zero-area rects; egui draws nothing.
        if !(rect.width() > 0.0 && rect.height() > 0.0) {
            return;
        }
        if let Some(r) = tiny_skia::Rect::from_xywh(rect.min.x, rect.min.y, rect.width(), rect.height()) {
            self.pixmap
                .fill_rect(r, &paint_for(color), Transform::identity(), None);
        }
    }

    fn hline(&mut self, x: Rangef, y: f32, stroke: Stroke) {
        let half = stroke.width / 2.0;
        let rect = Rect::from_min_max(Pos2::new(x.min, y - half), Pos2::new(x.max, y + half));
        self.fill_rect(rect, stroke.color);
    }

    fn vline(&mut self, x: f32, y: Rangef, stroke: Stroke) {
        let half = stroke.width / 2.0;
        let rect = Rect::from_min_max(Pos2::new(x - half, y.min), Pos2::new(x + half, y.max));
        self.fill_rect(rect, stroke.color);
    }
}
