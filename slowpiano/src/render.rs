//! Piano roll painting
//!
//! One call to [`paint_frame`] draws a whole frame: background, scrolling
//! time grid, note columns, then one beam per tracked span. A span's beam
//! sits `position - start` pixels above the bottom edge and is as tall as
//! its effective length, so a held key's beam grows in lockstep with the
//! grid and never drifts from it.

use egui::{Pos2, Rangef, Rect, Stroke, Vec2};

use crate::canvas::RollCanvas;
use crate::config::{NoteRange, RollConfig};
use crate::tracker::{NoteSpan, NoteSpanTracker, SpanId};

const LINE_WIDTH: f32 = 1.0;

/// C#, D#, F#, G#, A#
pub fn is_black_key(note: u8) -> bool {
    matches!(note % 12, 1 | 3 | 6 | 8 | 10)
}

/// Screen placement of one span.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Beam {
    pub span: SpanId,
    pub x_center: f32,
    pub width: f32,
    pub y_top: f64,
    pub y_bottom: f64,
}

impl Beam {
    /// Whether any part of the beam overlaps `0..=height`.
    pub fn is_visible(&self, height: f64) -> bool {
        self.y_top <= height && self.y_bottom >= 0.0
    }

    /// Rect clipped to just outside the viewport so huge offsets stay
    /// representable in f32.
    pub fn rect(&self, height: f64) -> Rect {
        let top = self.y_top.clamp(-1.0, height + 1.0) as f32;
        let bottom = self.y_bottom.clamp(-1.0, height + 1.0) as f32;
        Rect::from_min_max(
            Pos2::new(self.x_center - self.width / 2.0, top),
            Pos2::new(self.x_center + self.width / 2.0, bottom),
        )
    }
}

/// Column geometry for a roll of a given size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollLayout {
    range: NoteRange,
    size: Vec2,
    column_width: f32,
}

impl RollLayout {
    /// None when there is nothing to draw into.
    pub fn new(range: NoteRange, size: Vec2) -> Option<Self> {
        if !(size.x > 0.0 && size.y > 0.0) {
            return None;
        }
        Some(Self {
            range,
            size,
            column_width: size.x / range.len() as f32,
        })
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn column_width(&self) -> f32 {
        self.column_width
    }

    /// Left edge of a note's column.
    pub fn column_x(&self, note: u8) -> Option<f32> {
        self.range
            .index_of(note)
            .map(|i| i as f32 * self.column_width)
    }

    /// Note under an x coordinate, if any.
    pub fn note_at(&self, x: f32) -> Option<u8> {
        if !(0.0..self.size.x).contains(&x) {
            return None;
        }
        let index = (x / self.column_width) as usize;
        let note = self.range.first as usize + index;
        (note <= self.range.last as usize).then_some(note as u8)
    }

    pub fn beam(&self, span: &NoteSpan, position: f64, thickness: f32) -> Option<Beam> {
        let x = self.column_x(span.note())?;
        let height = self.size.y as f64;
        let y_bottom = span.bottom_edge(position, height);
        Some(Beam {
            span: span.id(),
            x_center: x + self.column_width / 2.0,
            width: self.column_width * thickness,
            y_top: y_bottom - span.effective_length(position),
            y_bottom,
        })
    }
}

/// y coordinates of the horizontal time lines, bottom to top.
pub fn grid_lines(height: f32, spacing: f32, position: f64) -> impl Iterator<Item = f32> {
    let offset = position.rem_euclid(spacing as f64) as f32;
    let first = height - offset;
    (0..)
        .map(move |i| first - i as f32 * spacing)
        .take_while(|y| *y >= 0.0)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub grid_lines: usize,
    pub painted: usize,
    pub culled: usize,
}

/// Paint one frame of the roll at scroll `position`.
pub fn paint_frame(
    canvas: &mut dyn RollCanvas,
    config: &RollConfig,
    range: NoteRange,
    position: f64,
    tracker: &NoteSpanTracker,
) -> FrameStats {
    let mut stats = FrameStats::default();
    let Some(layout) = RollLayout::new(range, canvas.size()) else {
        log::trace!("roll has no area, skipping paint");
        return stats;
    };
    let size = layout.size();
    let height = size.y as f64;
    let palette = &config.palette;
    let grid = Stroke::new(LINE_WIDTH, palette.grid());

    canvas.fill_rect(Rect::from_min_size(Pos2::ZERO, size), palette.background());

    for y in grid_lines(size.y, config.grid_spacing, position) {
        canvas.hline(Rangef::new(0.0, size.x), y, grid);
        stats.grid_lines += 1;
    }

    for note in range.notes() {
        let Some(x) = layout.column_x(note) else { continue };
        canvas.vline(x, Rangef::new(0.0, size.y), grid);
        if is_black_key(note) {
            canvas.fill_rect(
                Rect::from_min_size(Pos2::new(x, 0.0), Vec2::new(layout.column_width(), size.y)),
                palette.black_key(),
            );
        }
    }

    let beam_color = palette.beam();
    for span in tracker.spans() {
        let Some(beam) = layout.beam(span, position, config.beam_thickness) else {
            continue;
        };
        if beam.is_visible(height) {
            canvas.fill_rect(beam.rect(height), beam_color);
            stats.painted += 1;
        } else {
            stats.culled += 1;
        }
    }

    stats
}
