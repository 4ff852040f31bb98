//! Repaint controller and frame loops
//!
//! egui is an immediate-mode GUI: a frame only runs when something asks
//! for one. Input wakes egui on its own; `RepaintController` covers the
//! other case, components that animate against the wall clock.
//!
//! A frame loop is an explicit task: a component calls
//! [`RepaintController::attach_loop`] when it mounts and keeps the returned
//! [`LoopToken`]. While any loop is live, [`RepaintController::end_frame`]
//! schedules the next frame after the controller's interval. Cancelling the
//! token (on unmount) stops the loop; the controller forgets cancelled
//! tokens at the next frame boundary. With no live loop the app idles until
//! the next input event.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

/// Default repaint interval for timed updates (e-ink friendly ~4 Hz).
const DEFAULT_REPAINT_INTERVAL: Duration = Duration::from_millis(250);

/// Repaint interval for animation loops that track wall-clock time.
const FAST_REPAINT_INTERVAL: Duration = Duration::from_millis(16);

/// Cancellation handle for a frame loop.
///
/// Clones share the same flag. Once cancelled a token stays cancelled;
/// start a new loop with [`RepaintController::attach_loop`].
#[derive(Debug, Clone, Default)]
pub struct LoopToken {
    cancelled: Rc<Cell<bool>>,
}

impl LoopToken {
    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

/// Keeps frames coming while a loop is live.
///
/// Drop this into your app struct and call [`end_frame`] at the bottom of
/// `update()`.
///
/// [`end_frame`]: RepaintController::end_frame
pub struct RepaintController {
    /// Live frame loops, in registration order.
    loops: Vec<LoopToken>,
    /// Repaint interval while a loop is running.
    interval: Duration,
}

impl Default for RepaintController {
    fn default() -> Self {
        Self::new()
    }
}

impl RepaintController {
    pub fn new() -> Self {
        Self::with_interval(DEFAULT_REPAINT_INTERVAL)
    }

    /// Controller for apps that animate against the wall clock
    /// (the piano roll). Loops run at ~60 fps.
    pub fn with_fast_interval() -> Self {
        Self::with_interval(FAST_REPAINT_INTERVAL)
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            loops: Vec::new(),
            interval,
        }
    }

    /// Start a frame loop. Frames keep coming until the token is cancelled.
    pub fn attach_loop(&mut self) -> LoopToken {
        let token = LoopToken::default();
        self.loops.push(token.clone());
        log::debug!("frame loop attached ({} live)", self.live_loops());
        token
    }

    /// Number of loops that have not been cancelled.
    pub fn live_loops(&self) -> usize {
        self.loops.iter().filter(|t| !t.is_cancelled()).count()
    }

    /// Returns whether any frame loop is running.
    pub fn is_continuous(&self) -> bool {
        self.live_loops() > 0
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Call at the **end** of your `update()` method. Returns whether the
    /// next frame was scheduled.
    pub fn end_frame(&mut self, ctx: &egui::Context) -> bool {
        self.prune();
        let continuous = self.is_continuous();
        if continuous {
            ctx.request_repaint_after(self.interval);
        }
        continuous
    }

    fn prune(&mut self) {
        let before = self.loops.len();
        self.loops.retain(|t| !t.is_cancelled());
        if self.loops.len() != before {
            log::debug!("dropped {} cancelled frame loop(s)", before - self.loops.len());
        }
    }
}
