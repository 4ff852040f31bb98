//! Custom widgets, pure black and white

use egui::Ui;
use crate::theme::SlowColors;

/// Action returned by window control buttons
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowAction {
    None,
    Close,
    Minimize,
}

/// Draw close and minimize buttons at the left of the menu bar.
/// Call this at the start of your `menu_bar` closure.
pub fn window_control_buttons(ui: &mut Ui) -> WindowAction {
    let btn_size = egui::vec2(14.0, 14.0);
    let stroke = egui::Stroke::new(1.0, SlowColors::BLACK);
    let mut action = WindowAction::None;

    let (close_rect, close_resp) = ui.allocate_exact_size(btn_size, egui::Sense::click());
    if ui.is_rect_visible(close_rect) {
        let painter = ui.painter();
        let fill = if close_resp.hovered() { SlowColors::BLACK } else { SlowColors::WHITE };
        painter.rect_filled(close_rect, 0.0, fill);
        painter.rect_stroke(close_rect, 0.0, stroke);
        let mark = egui::Stroke::new(1.0, if close_resp.hovered() { SlowColors::WHITE } else { SlowColors::BLACK });
        let m = 3.0;
        painter.line_segment(
            [close_rect.left_top() + egui::vec2(m, m), close_rect.right_bottom() - egui::vec2(m, m)],
            mark,
        );
        painter.line_segment(
            [close_rect.right_top() + egui::vec2(-m, m), close_rect.left_bottom() + egui::vec2(m, -m)],
            mark,
        );
    }
    if close_resp.clicked() {
        action = WindowAction::Close;
    }

    ui.add_space(2.0);

    let (min_rect, min_resp) = ui.allocate_exact_size(btn_size, egui::Sense::click());
    if ui.is_rect_visible(min_rect) {
        let painter = ui.painter();
        let fill = if min_resp.hovered() { SlowColors::BLACK } else { SlowColors::WHITE };
        painter.rect_filled(min_rect, 0.0, fill);
        painter.rect_stroke(min_rect, 0.0, stroke);
        let mark = egui::Stroke::new(1.0, if min_resp.hovered() { SlowColors::WHITE } else { SlowColors::BLACK });
        let m = 3.0;
        painter.hline(min_rect.left() + m..=min_rect.right() - m, min_rect.center().y, mark);
    }
    if min_resp.clicked() {
        action = WindowAction::Minimize;
    }

    ui.add_space(8.0);
    action
}

/// Status bar: white bg, 1px black top border
pub fn status_bar(ui: &mut Ui, text: &str) {
    egui::Frame::none()
        .fill(SlowColors::WHITE)
        .stroke(egui::Stroke::new(1.0, SlowColors::BLACK))
        .inner_margin(egui::Margin::symmetric(8.0, 2.0))
        .show(ui, |ui| {
            ui.label(text);
        });
}
