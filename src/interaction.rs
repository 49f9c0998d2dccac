//! Pointer handling for the graph canvas: hit-testing, hover, drag-to-pin,
//! click-to-select, background pan and wheel zoom.

use eframe::egui::Pos2;

use crate::physics::{DRAG_ALPHA_TARGET, Simulation};
use crate::viewport::{Viewport, ViewportTransform};

/// Screen pixels the pointer must travel before a press becomes a drag.
pub const DRAG_THRESHOLD: f32 = 3.0;
pub const HOVER_RADIUS_SCALE: f32 = 1.2;

#[derive(Clone, Debug, PartialEq)]
pub enum GraphEvent {
    SelectionChanged(Option<String>),
    TransformChanged(ViewportTransform),
}

#[derive(Clone, Debug, PartialEq)]
enum PointerState {
    Idle,
    Pressed {
        node: Option<String>,
        origin: Pos2,
    },
    Dragging {
        node: String,
    },
    Panning {
        last: Pos2,
    },
}

#[derive(Clone, Debug)]
pub struct InteractionController {
    pointer: PointerState,
    hovered: Option<String>,
    selected: Option<String>,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionController {
    pub fn new() -> Self {
        Self {
            pointer: PointerState::Idle,
            hovered: None,
            selected: None,
        }
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn dragging(&self) -> Option<&str> {
        match &self.pointer {
            PointerState::Dragging { node } => Some(node.as_str()),
            _ => None,
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(
            self.pointer,
            PointerState::Dragging { .. } | PointerState::Panning { .. }
        )
    }

    /// Topmost node under `screen`. Hovered nodes hit with their enlarged
    /// radius.
    pub fn hit_test(
        &self,
        simulation: &Simulation,
        transform: &ViewportTransform,
        screen: Pos2,
    ) -> Option<usize> {
        let graph = simulation.graph();
        if graph.is_empty() {
            return None;
        }

        let world = transform.screen_to_world(screen);
        let max_radius = graph
            .nodes
            .iter()
            .map(|node| node.radius)
            .fold(0.0_f32, f32::max)
            * HOVER_RADIUS_SCALE;
        let index = simulation.spatial_index();

        index
            .query_within(world, max_radius)
            .into_iter()
            .filter_map(|candidate| {
                let node = &graph.nodes[candidate];
                let scale = if self.hovered.as_deref() == Some(node.id.as_str()) {
                    HOVER_RADIUS_SCALE
                } else {
                    1.0
                };
                let distance = (node.world_pos - world).length();
                (distance <= node.radius * scale).then_some((candidate, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1).then(b.0.cmp(&a.0)))
            .map(|(candidate, _)| candidate)
    }

    pub fn pointer_down(
        &mut self,
        simulation: &Simulation,
        viewport: &Viewport,
        screen: Pos2,
    ) {
        let transform = viewport.transform();
        let node = self
            .hit_test(simulation, &transform, screen)
            .map(|index| simulation.graph().nodes[index].id.clone());
        self.pointer = PointerState::Pressed {
            node,
            origin: screen,
        };
    }

    /// Returns whether anything visible changed.
    pub fn pointer_move(
        &mut self,
        simulation: &mut Simulation,
        viewport: &mut Viewport,
        screen: Pos2,
        events: &mut Vec<GraphEvent>,
    ) -> bool {
        match self.pointer.clone() {
            PointerState::Idle => self.update_hover(simulation, viewport, Some(screen)),
            PointerState::Pressed { node, origin } => {
                if (screen - origin).length() <= DRAG_THRESHOLD {
                    return false;
                }
                match node {
                    Some(id) => {
                        simulation.set_alpha_target(DRAG_ALPHA_TARGET);
                        self.pointer = PointerState::Dragging { node: id };
                        self.drag_to(simulation, viewport, screen);
                    }
                    None => {
                        self.pointer = PointerState::Panning { last: origin };
                        self.pan_to(viewport, screen, events);
                    }
                }
                true
            }
            PointerState::Dragging { .. } => {
                self.drag_to(simulation, viewport, screen);
                true
            }
            PointerState::Panning { .. } => {
                self.pan_to(viewport, screen, events);
                true
            }
        }
    }

    pub fn pointer_up(
        &mut self,
        simulation: &mut Simulation,
        viewport: &Viewport,
        screen: Pos2,
        events: &mut Vec<GraphEvent>,
    ) {
        let state = std::mem::replace(&mut self.pointer, PointerState::Idle);
        match state {
            PointerState::Dragging { node } => {
                if let Some(index) = simulation.graph().index_of(&node) {
                    simulation.unpin(index);
                }
                simulation.set_alpha_target(0.0);
            }
            PointerState::Pressed {
                node: Some(node), ..
            } => {
                self.toggle_selection(&node, events);
            }
            PointerState::Pressed { node: None, .. } => {
                self.set_selected(None, events);
            }
            PointerState::Panning { .. } | PointerState::Idle => {}
        }
        self.update_hover(simulation, viewport, Some(screen));
    }

    pub fn pointer_leave(&mut self) -> bool {
        if matches!(self.pointer, PointerState::Pressed { .. }) {
            self.pointer = PointerState::Idle;
        }
        self.hovered.take().is_some()
    }

    pub fn wheel(
        &mut self,
        viewport: &mut Viewport,
        screen: Pos2,
        scroll: f32,
        events: &mut Vec<GraphEvent>,
    ) {
        if scroll.abs() <= f32::EPSILON {
            return;
        }
        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        viewport.update(|transform| transform.zoom_at(zoom_factor, screen));
        events.push(GraphEvent::TransformChanged(viewport.transform()));
    }

    /// Toggles selection of `id`: a different node replaces the selection,
    /// the selected node clears it.
    pub fn toggle_selection(&mut self, id: &str, events: &mut Vec<GraphEvent>) {
        let next = if self.selected.as_deref() == Some(id) {
            None
        } else {
            Some(id.to_owned())
        };
        self.set_selected(next, events);
    }

    pub fn set_selected(&mut self, selected: Option<String>, events: &mut Vec<GraphEvent>) {
        if self.selected == selected {
            return;
        }
        self.selected = selected;
        events.push(GraphEvent::SelectionChanged(self.selected.clone()));
    }

    /// Forgets ids that vanished in a rebuild.
    pub fn retain_existing(
        &mut self,
        simulation: &mut Simulation,
        events: &mut Vec<GraphEvent>,
    ) {
        let graph = simulation.graph();
        let missing = |id: &Option<String>| {
            id.as_deref()
                .is_some_and(|id| graph.index_of(id).is_none())
        };
        if missing(&self.selected) {
            self.set_selected(None, events);
        }
        if missing(&self.hovered) {
            self.hovered = None;
        }

        let lost_node = match &self.pointer {
            PointerState::Dragging { node }
            | PointerState::Pressed {
                node: Some(node), ..
            } => graph.index_of(node).is_none(),
            _ => false,
        };
        if lost_node {
            if matches!(self.pointer, PointerState::Dragging { .. }) {
                simulation.set_alpha_target(0.0);
            }
            self.pointer = PointerState::Idle;
        }
    }

    /// Drops hover, drag and selection. Ends any drag cleanly.
    pub fn reset(&mut self, simulation: &mut Simulation, events: &mut Vec<GraphEvent>) {
        if let PointerState::Dragging { node } = &self.pointer {
            if let Some(index) = simulation.graph().index_of(node) {
                simulation.unpin(index);
            }
            simulation.set_alpha_target(0.0);
        }
        self.pointer = PointerState::Idle;
        self.hovered = None;
        self.set_selected(None, events);
    }

    fn update_hover(
        &mut self,
        simulation: &Simulation,
        viewport: &Viewport,
        screen: Option<Pos2>,
    ) -> bool {
        let transform = viewport.transform();
        let hovered = screen
            .and_then(|screen| self.hit_test(simulation, &transform, screen))
            .map(|index| simulation.graph().nodes[index].id.clone());
        if hovered == self.hovered {
            return false;
        }
        self.hovered = hovered;
        true
    }

    fn drag_to(&mut self, simulation: &mut Simulation, viewport: &Viewport, screen: Pos2) {
        let PointerState::Dragging { node } = &self.pointer else {
            return;
        };
        if let Some(index) = simulation.graph().index_of(node) {
            let world = viewport.transform().screen_to_world(screen);
            simulation.pin(index, world);
        }
    }

    fn pan_to(&mut self, viewport: &mut Viewport, screen: Pos2, events: &mut Vec<GraphEvent>) {
        let PointerState::Panning { last } = &mut self.pointer else {
            return;
        };
        let delta = screen - *last;
        *last = screen;
        viewport.update(|transform| transform.pan_by(delta.x, delta.y));
        events.push(GraphEvent::TransformChanged(viewport.transform()));
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::{Vec2, pos2, vec2};

    use super::*;
    use crate::graph::build_graph;
    use crate::model::{Entity, GraphOptions};

    fn setup() -> (Simulation, Viewport) {
        let entities = vec![Entity::new("a", "Alice"), Entity::new("b", "Bob")];
        let mut graph = build_graph(&entities, &[], &GraphOptions::default(), None, Vec2::ZERO);
        graph.nodes[0].world_pos = vec2(100.0, 100.0);
        graph.nodes[1].world_pos = vec2(300.0, 100.0);

        let mut simulation = Simulation::default();
        simulation.replace_graph(graph);
        (simulation, Viewport::new(vec2(800.0, 600.0)))
    }

    fn click(
        controller: &mut InteractionController,
        simulation: &mut Simulation,
        viewport: &mut Viewport,
        at: Pos2,
        events: &mut Vec<GraphEvent>,
    ) {
        controller.pointer_down(simulation, viewport, at);
        controller.pointer_up(simulation, viewport, at, events);
    }

    #[test]
    fn test_hit_test_uses_world_coordinates() {
        let (simulation, mut viewport) = setup();
        let controller = InteractionController::new();
        viewport.update(|transform| transform.zoom_to(2.0, 10.0, 0.0));
        let transform = viewport.transform();

        let hit = controller.hit_test(&simulation, &transform, pos2(210.0, 200.0));
        assert_eq!(hit, Some(0));
        let miss = controller.hit_test(&simulation, &transform, pos2(400.0, 400.0));
        assert_eq!(miss, None);
    }

    #[test]
    fn test_click_toggles_selection() {
        let (mut simulation, mut viewport) = setup();
        let mut controller = InteractionController::new();
        let mut events = Vec::new();

        click(&mut controller, &mut simulation, &mut viewport, pos2(100.0, 100.0), &mut events);
        assert_eq!(controller.selected(), Some("a"));
        click(&mut controller, &mut simulation, &mut viewport, pos2(300.0, 100.0), &mut events);
        assert_eq!(controller.selected(), Some("b"));
        click(&mut controller, &mut simulation, &mut viewport, pos2(300.0, 100.0), &mut events);
        assert_eq!(controller.selected(), None);

        assert_eq!(
            events,
            vec![
                GraphEvent::SelectionChanged(Some("a".into())),
                GraphEvent::SelectionChanged(Some("b".into())),
                GraphEvent::SelectionChanged(None),
            ]
        );
    }

    #[test]
    fn test_background_click_clears_selection() {
        let (mut simulation, mut viewport) = setup();
        let mut controller = InteractionController::new();
        let mut events = Vec::new();
        click(&mut controller, &mut simulation, &mut viewport, pos2(100.0, 100.0), &mut events);
        click(&mut controller, &mut simulation, &mut viewport, pos2(600.0, 500.0), &mut events);
        assert_eq!(controller.selected(), None);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_drag_pins_and_release_unpins() {
        let (mut simulation, mut viewport) = setup();
        let mut controller = InteractionController::new();
        let mut events = Vec::new();

        controller.pointer_down(&simulation, &viewport, pos2(100.0, 100.0));
        controller.pointer_move(&mut simulation, &mut viewport, pos2(101.0, 101.0), &mut events);
        assert_eq!(controller.dragging(), None);
        controller.pointer_move(&mut simulation, &mut viewport, pos2(150.0, 180.0), &mut events);
        assert_eq!(controller.dragging(), Some("a"));
        assert_eq!(simulation.alpha_target(), DRAG_ALPHA_TARGET);
        assert_eq!(simulation.graph().nodes[0].pinned, Some(vec2(150.0, 180.0)));

        controller.pointer_up(&mut simulation, &mut viewport, pos2(150.0, 180.0), &mut events);
        assert_eq!(controller.dragging(), None);
        assert_eq!(simulation.alpha_target(), 0.0);
        assert_eq!(simulation.graph().nodes[0].world_pos, vec2(150.0, 180.0));
        assert!(!simulation.graph().nodes[0].is_pinned());
        // a drag is not a click
        assert_eq!(controller.selected(), None);
        assert!(events.is_empty());
    }

    #[test]
    fn test_background_drag_pans() {
        let (mut simulation, mut viewport) = setup();
        let mut controller = InteractionController::new();
        let mut events = Vec::new();

        controller.pointer_down(&simulation, &viewport, pos2(600.0, 500.0));
        controller.pointer_move(&mut simulation, &mut viewport, pos2(620.0, 490.0), &mut events);
        controller.pointer_move(&mut simulation, &mut viewport, pos2(640.0, 480.0), &mut events);
        controller.pointer_up(&mut simulation, &mut viewport, pos2(640.0, 480.0), &mut events);

        assert_eq!(viewport.transform().translation(), vec2(40.0, -20.0));
        assert!(matches!(events.last(), Some(GraphEvent::TransformChanged(_))));
    }

    #[test]
    fn test_hover_follows_pointer() {
        let (mut simulation, mut viewport) = setup();
        let mut controller = InteractionController::new();
        let mut events = Vec::new();

        assert!(controller.pointer_move(&mut simulation, &mut viewport, pos2(102.0, 98.0), &mut events));
        assert_eq!(controller.hovered(), Some("a"));
        assert!(!controller.pointer_move(&mut simulation, &mut viewport, pos2(103.0, 98.0), &mut events));
        assert!(controller.pointer_leave());
        assert_eq!(controller.hovered(), None);
    }

    #[test]
    fn test_wheel_zoom_keeps_focal_point() {
        let (_simulation, mut viewport) = setup();
        let mut controller = InteractionController::new();
        let mut events = Vec::new();
        let focal = pos2(250.0, 125.0);
        let before = viewport.transform().screen_to_world(focal);
        controller.wheel(&mut viewport, focal, 120.0, &mut events);
        let after = viewport.transform().screen_to_world(focal);
        assert!(viewport.transform().k > 1.0);
        assert!((before - after).length() < 1e-3);
        assert_eq!(events.len(), 1);
    }
}
