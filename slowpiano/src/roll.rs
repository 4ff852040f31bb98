//! The piano roll component
//!
//! `PianoRoll` ties the pieces together: it owns a scroll clock and a span
//! tracker, and while mounted it holds a bus subscription and a frame-loop
//! token. Every frame it
//!
//! 1. applies the note events that arrived since the last frame, in order,
//! 2. advances the clock,
//! 3. paints,
//! 4. evicts spans that scrolled away.
//!
//! Unmounting cancels the loop and detaches from the bus. Nothing happens
//! between mount and unmount that the roll does not own.

use egui::{Response, Sense, Ui, Vec2};
use slowcore::repaint::{LoopToken, RepaintController};

use crate::bus::{NoteBus, NoteEvent, Subscription};
use crate::canvas::{EguiCanvas, RollCanvas};
use crate::clock::ScrollClock;
use crate::config::{NoteRange, RollConfig};
use crate::error::{Result, RollError};
use crate::render::{paint_frame, FrameStats};
use crate::tracker::{NoteSpanTracker, SpanId};

struct Mount {
    subscription: Subscription,
    token: LoopToken,
}

pub struct PianoRoll {
    config: RollConfig,
    range: NoteRange,
    clock: ScrollClock,
    tracker: NoteSpanTracker,
    mount: Option<Mount>,
    /// Last positive viewport height; eviction keeps using it while the
    /// roll is collapsed.
    viewport_height: f32,
    last_stats: FrameStats,
}

impl PianoRoll {
    pub fn new(config: RollConfig) -> Result<Self> {
        config.validate()?;
        let range = config.note_range()?;
        Ok(Self {
            clock: ScrollClock::new(config.scroll_rate),
            tracker: NoteSpanTracker::new(range, config.retrigger),
            viewport_height: config.canvas_height,
            range,
            config,
            mount: None,
            last_stats: FrameStats::default(),
        })
    }

    pub fn config(&self) -> &RollConfig {
        &self.config
    }

    pub fn range(&self) -> NoteRange {
        self.range
    }

    pub fn clock(&self) -> &ScrollClock {
        &self.clock
    }

    pub fn tracker(&self) -> &NoteSpanTracker {
        &self.tracker
    }

    pub fn last_stats(&self) -> FrameStats {
        self.last_stats
    }

    pub fn is_mounted(&self) -> bool {
        self.mount
            .as_ref()
            .map(|m| !m.token.is_cancelled())
            .unwrap_or(false)
    }

    /// Attach to `bus` and start the frame loop.
    ///
    /// Without a drawing surface the roll stays unmounted and no loop is
    /// started.
    pub fn mount(
        &mut self,
        bus: &NoteBus,
        repaint: &mut RepaintController,
        canvas: Option<&dyn RollCanvas>,
    ) -> Result<()> {
        if self.is_mounted() {
            return Ok(());
        }
        let Some(canvas) = canvas else {
            log::error!("piano roll has no drawing surface, not starting");
            return Err(RollError::MissingSurface);
        };
        self.clock.reset_anchor();
        self.mount = Some(Mount {
            subscription: bus.subscribe(),
            token: repaint.attach_loop(),
        });
        log::info!(
            "piano roll mounted: notes {}..={}, {} px/s, surface {:?}",
            self.range.first, self.range.last, self.clock.rate(), canvas.size()
        );
        Ok(())
    }

    /// Cancel the frame loop and detach from the bus. Held notes are
    /// released at the current position since their note-offs will never
    /// arrive.
    pub fn unmount(&mut self) {
        if let Some(mount) = self.mount.take() {
            mount.token.cancel();
            drop(mount.subscription);
            let released = self.tracker.release_all(self.clock.position());
            log::info!("piano roll unmounted ({} held note(s) released)", released);
        }
    }

    /// Apply a note event at the current scroll position.
    pub fn apply(&mut self, event: NoteEvent) -> Option<SpanId> {
        let at = self.clock.position();
        match event {
            NoteEvent::On(note) => self.tracker.note_on(note, at),
            NoteEvent::Off(note) => self.tracker.note_off(note, at),
        }
    }

    fn pump_events(&mut self) -> usize {
        let Some(mount) = &self.mount else { return 0 };
        let events: Vec<NoteEvent> = mount.subscription.drain().collect();
        for event in &events {
            self.apply(*event);
        }
        events.len()
    }

    /// Run one frame at timestamp `now` (seconds). Returns None when the
    /// roll is not mounted; no frame work is done then.
    pub fn frame(&mut self, now: f64, canvas: &mut dyn RollCanvas) -> Option<FrameStats> {
        if !self.is_mounted() {
            return None;
        }
        self.pump_events();
        self.clock.advance(now);
        let position = self.clock.position();

        let stats = paint_frame(canvas, &self.config, self.range, position, &self.tracker);

        let height = canvas.size().y;
        if height > 0.0 && height.is_finite() {
            self.viewport_height = height;
        }
        let margin = self.config.evict_margin(self.viewport_height);
        self.tracker
            .evict(position, self.viewport_height as f64, margin as f64);

        self.last_stats = stats;
        Some(stats)
    }

    /// Paint the current state without advancing time or evicting.
    pub fn paint(&self, canvas: &mut dyn RollCanvas) -> FrameStats {
        paint_frame(canvas, &self.config, self.range, self.clock.position(), &self.tracker)
    }

    /// Drop every span, held or not.
    pub fn clear(&mut self) {
        self.tracker.clear();
    }

    /// Allocate the roll in `ui` (full available width, configured height)
    /// and run a frame into it.
    pub fn show(&mut self, ui: &mut Ui) -> Response {
        let size = Vec2::new(ui.available_width(), self.config.canvas_height);
        let (response, painter) = ui.allocate_painter(size, Sense::hover());
        let now = ui.input(|i| i.time);
        let mut canvas = EguiCanvas::new(&painter, response.rect);
        slowcore::safety::catch_or(None, || self.frame(now, &mut canvas));
        response
    }
}

impl Default for PianoRoll {
    fn default() -> Self {
        let config = RollConfig::default();
        let range = NoteRange::default();
        Self {
            clock: ScrollClock::new(config.scroll_rate),
            tracker: NoteSpanTracker::new(range, config.retrigger),
            viewport_height: config.canvas_height,
            range,
            config,
            mount: None,
            last_stats: FrameStats::default(),
        }
    }
}

impl Drop for PianoRoll {
    fn drop(&mut self) {
        self.unmount();
    }
}
