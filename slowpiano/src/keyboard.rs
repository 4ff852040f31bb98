//! On-screen keyboard
//!
//! One key per note in the range, all the same width, so each key sits
//! right under its column in the roll. Keys are played with the pointer or
//! with the home row of the computer keyboard (`a w s e d f t g y h u j k o
//! l p ;`, chromatic from the first note). Every press and release goes out
//! on the note bus.

use std::collections::HashMap;

use egui::{Align2, Color32, Event, FontId, Key, Pos2, Rect, Response, Sense, Stroke, Ui, Vec2};
use slowcore::theme::SlowColors;

use crate::bus::NoteBus;
use crate::config::NoteRange;
use crate::render::{is_black_key, RollLayout};

/// Home-row layout, one chromatic step per key. egui has no key for the
/// apostrophe, so the row stops at `;`.
const HOME_ROW: &[&str] = &[
    "A", "W", "S", "E", "D", "F", "T", "G", "Y", "H", "U", "J", "K", "O", "L", "P", ";",
];

const KEY_HEIGHT: f32 = 80.0;
const NOTE_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

/// "C4" for 60.
pub fn note_name(note: u8) -> String {
    let octave = (note as i32 / 12) - 1;
    format!("{}{}", NOTE_NAMES[(note % 12) as usize], octave)
}

/// Why a note is sounding. A note is released only when nothing holds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Source {
    Pointer,
    Key(Key),
}

pub struct PianoKeyboard {
    range: NoteRange,
    shortcuts: HashMap<Key, u8>,
    holds: HashMap<Source, u8>,
}

impl PianoKeyboard {
    pub fn new(range: NoteRange) -> Self {
        let shortcuts = HOME_ROW
            .iter()
            .zip(range.notes())
            .filter_map(|(name, note)| match Key::from_name(name) {
                Some(key) => Some((key, note)),
                None => {
                    log::warn!("no key named {:?}, note {} has no shortcut", name, note);
                    None
                }
            })
            .collect();
        Self {
            range,
            shortcuts,
            holds: HashMap::new(),
        }
    }

    pub fn range(&self) -> NoteRange {
        self.range
    }

    pub fn shortcut_note(&self, key: Key) -> Option<u8> {
        self.shortcuts.get(&key).copied()
    }

    /// Notes currently held down, lowest first.
    pub fn held_notes(&self) -> Vec<u8> {
        let mut notes: Vec<u8> = self.holds.values().copied().collect();
        notes.sort_unstable();
        notes.dedup();
        notes
    }

    pub fn is_held(&self, note: u8) -> bool {
        self.holds.values().any(|n| *n == note)
    }

    fn hold(&mut self, source: Source, note: u8, bus: &NoteBus) {
        if self.holds.get(&source) == Some(&note) {
            return;
        }
        self.unhold(source, bus);
        let sounding = self.is_held(note);
        self.holds.insert(source, note);
        if !sounding {
            bus.note_on(note);
        }
    }

    fn unhold(&mut self, source: Source, bus: &NoteBus) {
        if let Some(note) = self.holds.remove(&source) {
            if !self.is_held(note) {
                bus.note_off(note);
            }
        }
    }

    pub fn key_down(&mut self, key: Key, bus: &NoteBus) {
        if let Some(note) = self.shortcut_note(key) {
            self.hold(Source::Key(key), note, bus);
        }
    }

    pub fn key_up(&mut self, key: Key, bus: &NoteBus) {
        self.unhold(Source::Key(key), bus);
    }

    /// Move the pointer onto `note`, or off the keyboard with None.
    pub fn pointer_to(&mut self, note: Option<u8>, bus: &NoteBus) {
        match note.filter(|n| self.range.contains(*n)) {
            Some(note) => self.hold(Source::Pointer, note, bus),
            None => self.unhold(Source::Pointer, bus),
        }
    }

    /// Release everything, e.g. when the window loses focus.
    pub fn release_all(&mut self, bus: &NoteBus) {
        let sources: Vec<Source> = self.holds.keys().copied().collect();
        for source in sources {
            self.unhold(source, bus);
        }
    }

    /// Feed this frame's key events.
    pub fn handle_input(&mut self, ctx: &egui::Context, bus: &NoteBus) {
        let (events, focused) = ctx.input(|i| (i.events.clone(), i.focused));
        if !focused {
            if !self.holds.is_empty() {
                log::debug!("window lost focus, releasing {} note(s)", self.holds.len());
            }
            self.release_all(bus);
            return;
        }
        self.apply_key_events(&events, bus);
    }

    /// Presses with a command modifier are shortcuts, not notes, and key
    /// repeat never retriggers. Releases always count.
    fn apply_key_events(&mut self, events: &[Event], bus: &NoteBus) {
        for event in events {
            if let Event::Key { key, pressed, repeat, modifiers, .. } = event {
                if !pressed {
                    self.key_up(*key, bus);
                } else if !*repeat && !modifiers.command {
                    self.key_down(*key, bus);
                }
            }
        }
    }

    /// Key under `pos` for a keyboard drawn in `rect`, using the roll's
    /// column layout.
    pub fn note_under(&self, rect: Rect, pos: Pos2) -> Option<u8> {
        if !rect.y_range().contains(pos.y) {
            return None;
        }
        RollLayout::new(self.range, rect.size())?.note_at(pos.x - rect.min.x)
    }

    /// Draw the keyboard across the full available width and play notes
    /// from pointer presses.
    pub fn show(&mut self, ui: &mut Ui, bus: &NoteBus) -> Response {
        let size = Vec2::new(ui.available_width(), KEY_HEIGHT);
        let (response, painter) = ui.allocate_painter(size, Sense::click_and_drag());
        let rect = response.rect;
        // Same columns as the roll, so each key sits under its beam.
        if let Some(layout) = RollLayout::new(self.range, rect.size()) {
            for note in self.range.notes() {
                let Some(x) = layout.column_x(note) else { continue };
                let key_rect = Rect::from_min_size(
                    Pos2::new(rect.min.x + x, rect.min.y),
                    Vec2::new(layout.column_width(), rect.height()),
                );
                let black = is_black_key(note);
                let (fill, text) = match (self.is_held(note), black) {
                    (true, true) => (Color32::GRAY, SlowColors::BLACK),
                    (true, false) => (Color32::DARK_GRAY, SlowColors::WHITE),
                    (false, true) => (SlowColors::BLACK, SlowColors::WHITE),
                    (false, false) => (SlowColors::WHITE, SlowColors::BLACK),
                };
                painter.rect_filled(key_rect, 0.0, fill);
                painter.rect_stroke(key_rect, 0.0, Stroke::new(1.0, SlowColors::BLACK));
                if note % 12 == 0 {
                    painter.text(
                        key_rect.center_bottom() - Vec2::new(0.0, 4.0),
                        Align2::CENTER_BOTTOM,
                        note_name(note),
                        FontId::proportional(9.0),
                        text,
                    );
                }
            }
        }

        let pointer_note = if response.is_pointer_button_down_on() {
            response
                .interact_pointer_pos()
                .and_then(|pos| self.note_under(rect, pos))
        } else {
            None
        };
        self.pointer_to(pointer_note, bus);

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{NoteEvent, Subscription};

    fn setup() -> (PianoKeyboard, NoteBus, Subscription) {
        let bus = NoteBus::new();
        let sub = bus.subscribe();
        (PianoKeyboard::new(NoteRange::new(48, 65).unwrap()), bus, sub)
    }

    fn events(sub: &Subscription) -> Vec<NoteEvent> {
        sub.drain().collect()
    }

    #[test]
    fn test_note_names() {
        assert_eq!(note_name(60), "C4");
        assert_eq!(note_name(48), "C3");
        assert_eq!(note_name(61), "C#4");
        assert_eq!(note_name(0), "C-1");
    }

    #[test]
    fn test_home_row_starts_at_first_note() {
        let (kb, _, _) = setup();
        assert_eq!(kb.shortcut_note(Key::A), Some(48));
        assert_eq!(kb.shortcut_note(Key::W), Some(49));
        assert_eq!(kb.shortcut_note(Key::S), Some(50));
        assert_eq!(kb.shortcut_note(Key::K), Some(60));
        assert_eq!(kb.shortcut_note(Key::Z), None);
    }

    #[test]
    fn test_every_home_row_key_is_mapped() {
        let (kb, _, _) = setup();
        let keys = [
            Key::A, Key::W, Key::S, Key::E, Key::D, Key::F, Key::T, Key::G, Key::Y,
            Key::H, Key::U, Key::J, Key::K, Key::O, Key::L, Key::P, Key::Semicolon,
        ];
        for (key, note) in keys.iter().zip(48u8..) {
            assert_eq!(kb.shortcut_note(*key), Some(note), "{:?}", key);
        }
        assert_eq!(kb.shortcut_note(Key::L), Some(62));
        assert_eq!(kb.shortcut_note(Key::P), Some(63));
        assert_eq!(kb.shortcut_note(Key::Semicolon), Some(64));
        // 65 is pointer-only
        assert!(!kb.shortcuts.values().any(|n| *n == 65));
        assert_eq!(kb.shortcuts.len(), 17);
    }

    #[test]
    fn test_short_range_leaves_keys_unmapped() {
        let kb = PianoKeyboard::new(NoteRange::new(60, 62).unwrap());
        assert_eq!(kb.shortcut_note(Key::A), Some(60));
        assert_eq!(kb.shortcut_note(Key::S), Some(62));
        assert_eq!(kb.shortcut_note(Key::E), None);
    }

    #[test]
    fn test_key_press_and_release() {
        let (mut kb, bus, sub) = setup();
        kb.key_down(Key::A, &bus);
        kb.key_down(Key::A, &bus);
        assert_eq!(kb.held_notes(), vec![48]);
        kb.key_up(Key::A, &bus);
        kb.key_up(Key::A, &bus);
        assert_eq!(events(&sub), vec![NoteEvent::On(48), NoteEvent::Off(48)]);
        assert!(kb.held_notes().is_empty());
    }

    #[test]
    fn test_unmapped_key_is_silent() {
        let (mut kb, bus, sub) = setup();
        kb.key_down(Key::Z, &bus);
        kb.key_up(Key::Z, &bus);
        assert!(events(&sub).is_empty());
    }

    #[test]
    fn test_pointer_drag_across_keys() {
        let (mut kb, bus, sub) = setup();
        kb.pointer_to(Some(60), &bus);
        kb.pointer_to(Some(60), &bus);
        kb.pointer_to(Some(61), &bus);
        kb.pointer_to(None, &bus);
        assert_eq!(
            events(&sub),
            vec![
                NoteEvent::On(60),
                NoteEvent::Off(60),
                NoteEvent::On(61),
                NoteEvent::Off(61),
            ]
        );
    }

    #[test]
    fn test_pointer_outside_range_releases() {
        let (mut kb, bus, sub) = setup();
        kb.pointer_to(Some(50), &bus);
        kb.pointer_to(Some(100), &bus);
        assert_eq!(events(&sub), vec![NoteEvent::On(50), NoteEvent::Off(50)]);
    }

    #[test]
    fn test_shared_note_released_last() {
        let (mut kb, bus, sub) = setup();
        kb.key_down(Key::K, &bus);
        kb.pointer_to(Some(60), &bus);
        kb.key_up(Key::K, &bus);
        assert!(kb.is_held(60));
        kb.pointer_to(None, &bus);
        assert_eq!(events(&sub), vec![NoteEvent::On(60), NoteEvent::Off(60)]);
    }

    fn key_event(key: Key, pressed: bool, modifiers: egui::Modifiers) -> Event {
        Event::Key {
            key,
            physical_key: None,
            pressed,
            repeat: false,
            modifiers,
        }
    }

    fn run_frame(ctx: &egui::Context, kb: &mut PianoKeyboard, bus: &NoteBus, raw: egui::RawInput) {
        let _ = ctx.run(raw, |ctx| kb.handle_input(ctx, bus));
    }

    fn with_events(events: Vec<Event>) -> egui::RawInput {
        egui::RawInput {
            events,
            focused: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_release_counts_with_command_held() {
        let (mut kb, bus, sub) = setup();
        let ctx = egui::Context::default();
        run_frame(&ctx, &mut kb, &bus, with_events(vec![key_event(Key::A, true, egui::Modifiers::NONE)]));
        run_frame(&ctx, &mut kb, &bus, with_events(vec![key_event(Key::A, false, egui::Modifiers::COMMAND)]));
        assert_eq!(events(&sub), vec![NoteEvent::On(48), NoteEvent::Off(48)]);
        assert!(kb.held_notes().is_empty());
    }

    #[test]
    fn test_command_press_and_repeat_do_not_play() {
        let (mut kb, bus, sub) = setup();
        let ctx = egui::Context::default();
        let repeat = Event::Key {
            key: Key::S,
            physical_key: None,
            pressed: true,
            repeat: true,
            modifiers: egui::Modifiers::NONE,
        };
        run_frame(
            &ctx,
            &mut kb,
            &bus,
            with_events(vec![key_event(Key::A, true, egui::Modifiers::COMMAND), repeat]),
        );
        assert!(events(&sub).is_empty());
        assert!(kb.held_notes().is_empty());
    }

    #[test]
    fn test_focus_loss_releases_keys() {
        let (mut kb, bus, sub) = setup();
        let ctx = egui::Context::default();
        run_frame(&ctx, &mut kb, &bus, with_events(vec![key_event(Key::D, true, egui::Modifiers::NONE)]));
        let unfocused = egui::RawInput {
            focused: false,
            ..Default::default()
        };
        run_frame(&ctx, &mut kb, &bus, unfocused);
        assert_eq!(events(&sub), vec![NoteEvent::On(52), NoteEvent::Off(52)]);
    }

    #[test]
    fn test_keys_line_up_with_roll_columns() {
        let (kb, _, _) = setup();
        let keys = Rect::from_min_size(Pos2::new(40.0, 500.0), Vec2::new(180.0, KEY_HEIGHT));
        let roll = RollLayout::new(kb.range(), Vec2::new(180.0, 400.0)).unwrap();
        for x in [0.0, 9.9, 10.0, 125.0, 179.9] {
            let pos = Pos2::new(keys.min.x + x, keys.center().y);
            assert_eq!(kb.note_under(keys, pos), roll.note_at(x), "x = {}", x);
        }
        assert_eq!(kb.note_under(keys, Pos2::new(165.0, 520.0)), Some(60));
        assert_eq!(kb.note_under(keys, Pos2::new(39.0, 520.0)), None);
        assert_eq!(kb.note_under(keys, Pos2::new(165.0, 499.0)), None);
        assert_eq!(kb.note_under(Rect::from_min_size(Pos2::ZERO, Vec2::ZERO), Pos2::ZERO), None);
    }

    #[test]
    fn test_release_all() {
        let (mut kb, bus, sub) = setup();
        kb.key_down(Key::A, &bus);
        kb.key_down(Key::D, &bus);
        kb.pointer_to(Some(55), &bus);
        sub.drain().count();
        kb.release_all(&bus);
        let mut offs: Vec<u8> = events(&sub).iter().map(|e| e.note()).collect();
        offs.sort_unstable();
        assert_eq!(offs, vec![48, 52, 55]);
        assert!(kb.held_notes().is_empty());
    }
}
