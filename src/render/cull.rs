use eframe::egui::{Pos2, Rect};

pub(super) fn circle_visible(rect: Rect, center: Pos2, radius: f32) -> bool {
    rect.expand(radius).contains(center)
}

/// Whether the segment `start..end`, thickened by `padding`, touches `rect`.
pub(super) fn edge_visible(rect: Rect, start: Pos2, end: Pos2, padding: f32) -> bool {
    let bounds = Rect::from_two_pos(start, end).expand(padding);
    if !bounds.intersects(rect) {
        return false;
    }
    if rect.contains(start) || rect.contains(end) {
        return true;
    }

    let corners = [
        rect.left_top(),
        rect.right_top(),
        rect.right_bottom(),
        rect.left_bottom(),
    ];
    (0..4).any(|side| crosses(start, end, corners[side], corners[(side + 1) % 4]))
}

fn orientation(origin: Pos2, a: Pos2, b: Pos2) -> f32 {
    (a - origin).x * (b - origin).y - (a - origin).y * (b - origin).x
}

fn crosses(a1: Pos2, a2: Pos2, b1: Pos2, b2: Pos2) -> bool {
    let straddles = |first: f32, second: f32| first * second <= 0.0;
    straddles(orientation(a1, a2, b1), orientation(a1, a2, b2))
        && straddles(orientation(b1, b2, a1), orientation(b1, b2, a2))
}
