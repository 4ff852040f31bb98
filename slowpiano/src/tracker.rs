//! Note span tracker
//!
//! One [`NoteSpan`] per key press. A span opens on note-on at the current
//! scroll position, closes on the matching note-off, and is evicted once it
//! has scrolled off the top of the roll. The tracker is the only owner of
//! the span list; the renderer just reads it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::NoteRange;

/// Identity of one press. The serial keeps repeated presses of the same
/// note apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpanId {
    pub note: u8,
    pub serial: u64,
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.note, self.serial)
    }
}

/// What a second press of a note that is still held does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetriggerPolicy {
    /// Open another span; a release closes the newest one.
    #[default]
    Stack,
    /// Close the held span first, so each note has at most one open span.
    CloseHeld,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoteSpan {
    id: SpanId,
    start_position: f64,
    /// None while the key is held
    length: Option<f64>,
}

impl NoteSpan {
    pub fn id(&self) -> SpanId {
        self.id
    }

    pub fn note(&self) -> u8 {
        self.id.note
    }

    pub fn start_position(&self) -> f64 {
        self.start_position
    }

    /// Frozen length of a released span.
    pub fn length(&self) -> Option<f64> {
        self.length
    }

    pub fn is_active(&self) -> bool {
        self.length.is_none()
    }

    /// Distance scrolled since the press.
    pub fn age(&self, position: f64) -> f64 {
        (position - self.start_position).max(0.0)
    }

    /// Length to draw at `position`: live for held keys, frozen otherwise.
    pub fn effective_length(&self, position: f64) -> f64 {
        self.length.unwrap_or_else(|| self.age(position))
    }

    /// Lower edge in viewport coordinates (y grows downward).
    pub fn bottom_edge(&self, position: f64, viewport_height: f64) -> f64 {
        viewport_height - (position - self.start_position)
    }

    pub fn top_edge(&self, position: f64, viewport_height: f64) -> f64 {
        self.bottom_edge(position, viewport_height) - self.effective_length(position)
    }
}

#[derive(Debug, Clone)]
pub struct NoteSpanTracker {
    range: NoteRange,
    policy: RetriggerPolicy,
    spans: Vec<NoteSpan>,
    next_serial: u64,
}

impl NoteSpanTracker {
    pub fn new(range: NoteRange, policy: RetriggerPolicy) -> Self {
        Self {
            range,
            policy,
            spans: Vec::new(),
            next_serial: 0,
        }
    }

    pub fn range(&self) -> NoteRange {
        self.range
    }

    pub fn policy(&self) -> RetriggerPolicy {
        self.policy
    }

    /// Spans in creation order.
    pub fn spans(&self) -> &[NoteSpan] {
        &self.spans
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.spans.iter().filter(|s| s.is_active()).count()
    }

    pub fn get(&self, id: SpanId) -> Option<&NoteSpan> {
        self.spans.iter().find(|s| s.id == id)
    }

    /// Open a span for `note` at scroll position `at`.
    ///
    /// Notes outside the range are ignored.
    pub fn note_on(&mut self, note: u8, at: f64) -> Option<SpanId> {
        if !self.range.contains(note) {
            log::debug!(
                "note {} outside {}..={}, ignored",
                note, self.range.first, self.range.last
            );
            return None;
        }
        if self.policy == RetriggerPolicy::CloseHeld {
            for held in self.spans.iter_mut().filter(|s| s.note() == note && s.is_active()) {
                held.length = Some(held.age(at));
                log::trace!("span {} closed by retrigger", held.id);
            }
        }
        let id = SpanId {
            note,
            serial: self.next_serial,
        };
        self.next_serial += 1;
        self.spans.push(NoteSpan {
            id,
            start_position: at,
            length: None,
        });
        log::trace!("span {} opened at {:.1}", id, at);
        Some(id)
    }

    /// Close the newest held span for `note`. A release with nothing held
    /// is a no-op.
    pub fn note_off(&mut self, note: u8, at: f64) -> Option<SpanId> {
        let span = self
            .spans
            .iter_mut()
            .rev()
            .find(|s| s.note() == note && s.is_active());
        match span {
            Some(span) => {
                let length = span.age(at);
                span.length = Some(length);
                log::trace!("span {} closed, length {:.1}", span.id, length);
                Some(span.id)
            }
            None => {
                log::debug!("unmatched note-off for {}", note);
                None
            }
        }
    }

    /// Drop every span whose bottom edge has gone more than `margin`
    /// pixels above the top of the viewport. Returns how many were dropped.
    pub fn evict(&mut self, position: f64, viewport_height: f64, margin: f64) -> usize {
        let before = self.spans.len();
        self.spans
            .retain(|s| s.bottom_edge(position, viewport_height) >= -margin);
        let evicted = before - self.spans.len();
        if evicted > 0 {
            log::trace!("evicted {} span(s), {} left", evicted, self.spans.len());
        }
        evicted
    }

    /// Close everything that is still held.
    pub fn release_all(&mut self, at: f64) -> usize {
        let mut closed = 0;
        for span in self.spans.iter_mut().filter(|s| s.is_active()) {
            span.length = Some(span.age(at));
            closed += 1;
        }
        closed
    }

    pub fn clear(&mut self) {
        self.spans.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ScrollClock;

    const EPS: f64 = 1e-9;

    fn tracker() -> NoteSpanTracker {
        NoteSpanTracker::new(NoteRange::new(48, 65).unwrap(), RetriggerPolicy::Stack)
    }

    #[test]
    fn test_hold_half_second() {
        let mut clock = ScrollClock::new(100.0);
        let mut t = tracker();
        clock.advance(0.0);
        let id = t.note_on(60, clock.position()).unwrap();
        clock.advance(0.25);
        clock.advance(0.5);
        assert_eq!(t.note_off(60, clock.position()), Some(id));

        assert_eq!(t.len(), 1);
        let span = &t.spans()[0];
        assert_eq!(span.start_position(), 0.0);
        assert!((span.length().unwrap() - 50.0).abs() < EPS);
        assert!(!span.is_active());
    }

    #[test]
    fn test_press_release_press() {
        let mut clock = ScrollClock::new(100.0);
        let mut t = tracker();
        clock.advance(0.0);
        t.note_on(60, clock.position());
        clock.advance(0.2);
        t.note_off(60, clock.position());
        clock.advance(0.3);
        let second = t.note_on(60, clock.position()).unwrap();

        assert_eq!(t.len(), 2);
        let closed = &t.spans()[0];
        assert!((closed.length().unwrap() - 20.0).abs() < EPS);
        let open = t.get(second).unwrap();
        assert!(open.is_active());
        assert!((open.start_position() - 30.0).abs() < EPS);

        // effective length grows linearly from zero
        assert!(open.effective_length(clock.position()).abs() < EPS);
        let mut previous = 0.0;
        for i in 1..=10 {
            clock.advance(0.3 + i as f64 * 0.1);
            let len = open_len(&t, second, clock.position());
            assert!((len - i as f64 * 10.0).abs() < 1e-6);
            assert!(len >= previous);
            previous = len;
        }
    }

    fn open_len(t: &NoteSpanTracker, id: SpanId, position: f64) -> f64 {
        t.get(id).unwrap().effective_length(position)
    }

    #[test]
    fn test_unmatched_note_off_is_noop() {
        let mut t = tracker();
        assert_eq!(t.note_off(61, 10.0), None);
        assert!(t.is_empty());

        t.note_on(60, 0.0);
        let snapshot = t.spans().to_vec();
        assert_eq!(t.note_off(61, 10.0), None);
        assert_eq!(t.spans(), snapshot.as_slice());
    }

    #[test]
    fn test_double_release_only_closes_once() {
        let mut t = tracker();
        t.note_on(60, 0.0);
        t.note_off(60, 20.0);
        assert_eq!(t.note_off(60, 90.0), None);
        assert_eq!(t.spans()[0].length(), Some(20.0));
    }

    #[test]
    fn test_out_of_range_is_ignored() {
        let mut t = tracker();
        assert_eq!(t.note_on(47, 0.0), None);
        assert_eq!(t.note_on(66, 0.0), None);
        assert!(t.is_empty());
        assert!(t.note_on(48, 0.0).is_some());
        assert!(t.note_on(65, 0.0).is_some());
    }

    #[test]
    fn test_stack_policy_closes_newest_first() {
        let mut t = tracker();
        let first = t.note_on(60, 0.0).unwrap();
        let second = t.note_on(60, 5.0).unwrap();
        assert_ne!(first, second);
        assert_eq!(t.active_count(), 2);

        assert_eq!(t.note_off(60, 15.0), Some(second));
        assert_eq!(t.get(second).unwrap().length(), Some(10.0));
        assert!(t.get(first).unwrap().is_active());
        assert_eq!(t.note_off(60, 25.0), Some(first));
        assert_eq!(t.get(first).unwrap().length(), Some(25.0));
    }

    #[test]
    fn test_close_held_policy_keeps_one_open_span() {
        let mut t = NoteSpanTracker::new(NoteRange::default(), RetriggerPolicy::CloseHeld);
        let first = t.note_on(60, 0.0).unwrap();
        let second = t.note_on(60, 5.0).unwrap();
        assert_eq!(t.active_count(), 1);
        assert_eq!(t.get(first).unwrap().length(), Some(5.0));
        assert!(t.get(second).unwrap().is_active());
    }

    #[test]
    fn test_start_position_is_fixed() {
        let mut t = tracker();
        let id = t.note_on(50, 12.0).unwrap();
        t.note_off(50, 40.0);
        t.evict(40.0, 400.0, 400.0);
        assert_eq!(t.get(id).unwrap().start_position(), 12.0);
    }

    #[test]
    fn test_span_ids_display_and_differ() {
        let mut t = tracker();
        let a = t.note_on(60, 0.0).unwrap();
        t.note_off(60, 1.0);
        let b = t.note_on(60, 1.0).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.to_string(), "60-0");
        assert_eq!(b.to_string(), "60-1");
    }

    #[test]
    fn test_edges() {
        let mut t = tracker();
        t.note_on(60, 100.0);
        let span = &t.spans()[0];
        // held for 30px
        assert_eq!(span.bottom_edge(130.0, 400.0), 370.0);
        assert_eq!(span.top_edge(130.0, 400.0), 340.0);
        t.note_off(60, 110.0);
        let span = &t.spans()[0];
        assert_eq!(span.top_edge(130.0, 400.0), 360.0);
    }

    #[test]
    fn test_far_scrolled_span_is_evicted() {
        let mut clock = ScrollClock::new(100.0);
        let mut t = tracker();
        let height = 1000.0;
        clock.advance(0.0);
        t.note_on(60, clock.position());
        clock.advance(0.1);
        t.note_off(60, clock.position());

        let mut frame = 0;
        while clock.position() < 5000.0 {
            frame += 1;
            clock.advance(frame as f64 / 60.0 + 0.1);
            t.evict(clock.position(), height, height);
        }
        assert!(t.is_empty());
    }

    #[test]
    fn test_eviction_is_monotone_and_keeps_visible_spans() {
        let mut t = tracker();
        let height = 400.0;
        let margin = 100.0;
        for i in 0..10u8 {
            let at = i as f64 * 50.0;
            t.note_on(48 + i, at);
            t.note_off(48 + i, at + 20.0);
        }

        let mut gone = std::collections::HashSet::new();
        let mut position = 500.0;
        while position < 1500.0 {
            let before: Vec<SpanId> = t.spans().iter().map(|s| s.id()).collect();
            t.evict(position, height, margin);
            for span in t.spans() {
                assert!(!gone.contains(&span.id()));
                assert!(span.bottom_edge(position, height) >= -margin);
            }
            for id in before {
                if t.get(id).is_none() {
                    gone.insert(id);
                }
            }
            position += 17.0;
        }
        assert_eq!(gone.len(), 10);
    }

    #[test]
    fn test_release_all() {
        let mut t = tracker();
        t.note_on(50, 0.0);
        t.note_on(52, 10.0);
        assert_eq!(t.release_all(30.0), 2);
        assert_eq!(t.active_count(), 0);
        assert_eq!(t.spans()[1].length(), Some(20.0));
    }
}
