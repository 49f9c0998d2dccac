use eframe::egui::{
    self, Align2, Color32, FontId, Painter, Pos2, Rect, Sense, Shape, Stroke, Ui, Vec2,
};

use relgraph::GraphEvent;
use relgraph::render::{DrawPrimitive, Scene, TextAnchor};

use super::ViewModel;

const DASH_LENGTH: f32 = 8.0;
const GAP_LENGTH: f32 = 6.0;

fn align_for(anchor: TextAnchor) -> Align2 {
    match anchor {
        TextAnchor::Center => Align2::CENTER_CENTER,
        TextAnchor::TopCenter => Align2::CENTER_TOP,
        TextAnchor::LeftTop => Align2::LEFT_TOP,
    }
}

fn paint_scene(painter: &Painter, origin: Vec2, scene: &Scene) {
    let at = |position: Pos2| position + origin;
    painter.rect_filled(
        Rect::from_min_size(origin.to_pos2(), scene.size),
        0.0,
        scene.background,
    );

    for primitive in &scene.primitives {
        match primitive {
            DrawPrimitive::Link {
                from,
                to,
                color,
                width,
                dashed,
                ..
            } => {
                let stroke = Stroke::new(*width, *color);
                if *dashed {
                    painter.extend(Shape::dashed_line(
                        &[at(*from), at(*to)],
                        stroke,
                        DASH_LENGTH,
                        GAP_LENGTH,
                    ));
                } else {
                    painter.line_segment([at(*from), at(*to)], stroke);
                }
            }
            DrawPrimitive::StrengthMark {
                center,
                radius,
                color,
                ..
            } => {
                painter.circle_filled(at(*center), *radius, *color);
            }
            DrawPrimitive::LinkLabel {
                position,
                text,
                size,
                color,
                ..
            } => {
                painter.text(
                    at(*position),
                    Align2::CENTER_BOTTOM,
                    text,
                    FontId::proportional(*size),
                    *color,
                );
            }
            DrawPrimitive::Node {
                center,
                radius,
                fill,
                stroke,
                ..
            } => {
                painter.circle_filled(at(*center), *radius, *fill);
                painter.circle_stroke(at(*center), *radius, *stroke);
            }
            DrawPrimitive::NodeLabel {
                position,
                text,
                size,
                color,
                anchor,
                ..
            } => {
                painter.text(
                    at(*position),
                    align_for(*anchor),
                    text,
                    FontId::proportional(*size),
                    *color,
                );
            }
            DrawPrimitive::Tooltip {
                position, lines, ..
            } => {
                let galley = painter.layout_no_wrap(
                    lines.join("\n"),
                    FontId::proportional(13.0),
                    Color32::from_gray(240),
                );
                let top_left = at(*position);
                let background = Rect::from_min_size(top_left, galley.size()).expand(6.0);
                painter.rect_filled(
                    background,
                    4.0,
                    Color32::from_rgba_unmultiplied(12, 14, 18, 230),
                );
                painter.galley(top_left, galley, Color32::from_gray(240));
            }
        }
    }
}

impl ViewModel {
    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);
        let origin = rect.min.to_vec2();
        self.view.set_viewport_size(rect.size());

        if self.view.is_empty() {
            painter.rect_filled(rect, 0.0, relgraph::render::BACKGROUND);
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "No characters to show yet",
                FontId::proportional(16.0),
                Color32::from_gray(160),
            );
            return;
        }

        let mut repaint = self.handle_pointer(ui, rect, &response);

        let frame_delta_seconds = ui
            .ctx()
            .input(|input| input.stable_dt)
            .clamp(1.0 / 240.0, 1.0 / 20.0);
        repaint |= self.view.frame(frame_delta_seconds);

        for event in self.view.take_events() {
            match event {
                GraphEvent::SelectionChanged(selected) => {
                    tracing::debug!(?selected, "selection changed");
                }
                GraphEvent::TransformChanged(_) => repaint = true,
            }
        }

        if self.view.hovered().is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        }

        paint_scene(&painter, origin, &self.view.scene());

        if repaint {
            ui.ctx().request_repaint();
        }
    }

    /// Feeds pointer input in canvas-local coordinates. Returns whether the
    /// frame should be repainted.
    fn handle_pointer(&mut self, ui: &Ui, rect: Rect, response: &egui::Response) -> bool {
        let (hover, pressed, released, scroll) = ui.input(|input| {
            (
                input.pointer.hover_pos(),
                input.pointer.primary_pressed(),
                input.pointer.primary_released(),
                input.raw_scroll_delta.y,
            )
        });
        let local = |position: Pos2| (position - rect.min).to_pos2();

        let Some(pointer) = hover else {
            return self.view.pointer_leave();
        };
        let inside = response.hovered();
        let mut repaint = false;

        if pressed && inside {
            self.view.pointer_down(local(pointer));
        }
        if inside || response.dragged() {
            repaint |= self.view.pointer_move(local(pointer));
        } else {
            repaint |= self.view.pointer_leave();
        }
        if released {
            self.view.pointer_up(local(pointer));
            repaint = true;
        }
        if inside && scroll.abs() > f32::EPSILON {
            self.view.wheel(local(pointer), scroll);
        }

        repaint
    }
}

pub(in crate::app) fn zoom_step(zoom_in: bool) -> f32 {
    if zoom_in { 1.25 } else { 0.8 }
}
