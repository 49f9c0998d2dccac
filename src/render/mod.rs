//! Projection of simulation state into an ordered list of draw primitives.
//!
//! [`build_scene`] reads the graph, the transform and the hover/selection/
//! highlight state and returns a [`Scene`]. It never mutates anything; the
//! egui canvas and the PNG exporter both consume the same scene.

mod cull;

use std::collections::HashSet;

use eframe::egui::{Color32, Pos2, Rect, Stroke, Vec2, vec2};

use crate::graph::RelationGraph;
use crate::graph::style::{dim_color, with_opacity};
use crate::interaction::HOVER_RADIUS_SCALE;
use crate::model::GraphOptions;
use crate::viewport::ViewportTransform;
use cull::{circle_visible, edge_visible};

pub const BACKGROUND: Color32 = Color32::from_rgb(19, 23, 29);
pub const HIGH_STRENGTH_THRESHOLD: u8 = 80;
pub const LINK_OPACITY: f32 = 0.6;
pub const DIMMED_LINK_OPACITY: f32 = 0.15;
const SELECTED_STROKE: Color32 = Color32::from_rgb(245, 206, 93);
const NODE_STROKE: Color32 = Color32::from_rgb(240, 240, 240);
const LABEL_COLOR: Color32 = Color32::from_gray(238);
const LINK_LABEL_COLOR: Color32 = Color32::from_gray(190);
const CULL_PADDING: f32 = 24.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextAnchor {
    Center,
    TopCenter,
    LeftTop,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawPrimitive {
    Link {
        id: String,
        from: Pos2,
        to: Pos2,
        color: Color32,
        width: f32,
        dashed: bool,
    },
    StrengthMark {
        link_id: String,
        center: Pos2,
        radius: f32,
        color: Color32,
    },
    LinkLabel {
        link_id: String,
        position: Pos2,
        text: String,
        size: f32,
        color: Color32,
    },
    Node {
        id: String,
        center: Pos2,
        radius: f32,
        fill: Color32,
        stroke: Stroke,
    },
    NodeLabel {
        node_id: String,
        position: Pos2,
        text: String,
        size: f32,
        color: Color32,
        anchor: TextAnchor,
    },
    Tooltip {
        node_id: String,
        position: Pos2,
        lines: Vec<String>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    pub size: Vec2,
    pub background: Color32,
    pub primitives: Vec<DrawPrimitive>,
}

impl Scene {
    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &DrawPrimitive> {
        self.primitives
            .iter()
            .filter(|primitive| matches!(primitive, DrawPrimitive::Node { .. }))
    }

    pub fn links(&self) -> impl Iterator<Item = &DrawPrimitive> {
        self.primitives
            .iter()
            .filter(|primitive| matches!(primitive, DrawPrimitive::Link { .. }))
    }

    pub fn node(&self, node_id: &str) -> Option<&DrawPrimitive> {
        self.nodes().find(
            |primitive| matches!(primitive, DrawPrimitive::Node { id, .. } if id == node_id),
        )
    }

    pub fn link(&self, link_id: &str) -> Option<&DrawPrimitive> {
        self.links().find(
            |primitive| matches!(primitive, DrawPrimitive::Link { id, .. } if id == link_id),
        )
    }
}

/// Everything the projection reads.
#[derive(Clone, Copy)]
pub struct SceneInput<'a> {
    pub graph: &'a RelationGraph,
    pub transform: ViewportTransform,
    pub size: Vec2,
    pub options: &'a GraphOptions,
    pub hovered: Option<&'a str>,
    pub selected: Option<&'a str>,
    /// Search matches; when present, other nodes are dimmed.
    pub highlighted: Option<&'a HashSet<usize>>,
}

/// Shortens `name` so it roughly fits a node of `radius` world units.
pub fn truncate_label(name: &str, radius: f32) -> String {
    let max_chars = ((radius * 0.9).floor() as usize).max(3);
    let count = name.chars().count();
    if count <= max_chars {
        return name.to_owned();
    }
    let mut truncated = name.chars().take(max_chars - 1).collect::<String>();
    truncated.push('…');
    truncated
}

pub fn build_scene(input: SceneInput<'_>) -> Scene {
    let SceneInput {
        graph,
        transform,
        size,
        options,
        hovered,
        selected,
        highlighted,
    } = input;
    let k = transform.k;
    let rect = Rect::from_min_size(Pos2::ZERO, size).expand(CULL_PADDING);
    let hovered_index = hovered.and_then(|id| graph.index_of(id));
    let selected_index = selected.and_then(|id| graph.index_of(id));
    let focus_index = hovered_index.or(selected_index);
    let search_active = highlighted.is_some_and(|matches| !matches.is_empty());

    let screen = graph
        .nodes
        .iter()
        .map(|node| transform.world_to_screen(node.world_pos))
        .collect::<Vec<_>>();

    let mut links = Vec::new();
    let mut marks = Vec::new();
    let mut link_labels = Vec::new();
    for link in &graph.links {
        let (start, end) = (screen[link.source], screen[link.target]);
        if !edge_visible(rect, start, end, link.width * k) {
            continue;
        }

        let opacity = match focus_index {
            Some(focus) if link.touches(focus) => 1.0,
            Some(_) if hovered_index.is_some() => DIMMED_LINK_OPACITY,
            _ => LINK_OPACITY,
        };
        let color = with_opacity(link.color, opacity);
        links.push(DrawPrimitive::Link {
            id: link.id.clone(),
            from: start,
            to: end,
            color,
            width: (link.width * k).max(0.5),
            dashed: link.dashed,
        });

        let midpoint = start + (end - start) * 0.5;
        let high_strength = link.strength > HIGH_STRENGTH_THRESHOLD;
        if high_strength {
            marks.push(DrawPrimitive::StrengthMark {
                link_id: link.id.clone(),
                center: midpoint,
                radius: (3.0 * k).clamp(2.0, 6.0),
                color: with_opacity(link.color, opacity.max(LINK_OPACITY)),
            });
        }

        if options.show_relationship_types {
            let lift = if high_strength { 8.0 } else { 4.0 };
            link_labels.push(DrawPrimitive::LinkLabel {
                link_id: link.id.clone(),
                position: midpoint - vec2(0.0, lift),
                text: link.type_label.clone(),
                size: (10.0 * k).clamp(8.0, 14.0),
                color: with_opacity(LINK_LABEL_COLOR, opacity.max(LINK_OPACITY)),
            });
        }
    }

    let mut draw_order = (0..graph.nodes.len()).collect::<Vec<_>>();
    draw_order.sort_by_key(|&index| {
        (
            Some(index) == hovered_index,
            Some(index) == selected_index,
        )
    });

    let mut nodes = Vec::with_capacity(graph.nodes.len());
    let mut labels = Vec::new();
    let mut tooltip = None;
    for index in draw_order {
        let node = &graph.nodes[index];
        let is_hovered = Some(index) == hovered_index;
        let is_selected = Some(index) == selected_index;
        let world_radius = if is_hovered {
            node.radius * HOVER_RADIUS_SCALE
        } else {
            node.radius
        };
        let radius = world_radius * k;
        let center = screen[index];
        if !circle_visible(rect, center, radius) {
            continue;
        }

        let matched = highlighted.is_some_and(|matches| matches.contains(&index));
        let fill = if search_active && !matched && !is_hovered && !is_selected {
            dim_color(node.color, 0.38)
        } else {
            node.color
        };
        let stroke = if is_selected {
            Stroke::new(3.0, SELECTED_STROKE)
        } else if is_hovered || matched {
            Stroke::new(3.0, NODE_STROKE)
        } else {
            Stroke::new(1.5, NODE_STROKE)
        };

        nodes.push(DrawPrimitive::Node {
            id: node.id.clone(),
            center,
            radius,
            fill,
            stroke,
        });

        if options.show_labels {
            labels.push(DrawPrimitive::NodeLabel {
                node_id: node.id.clone(),
                position: center + vec2(0.0, radius + 4.0),
                text: truncate_label(&node.name, node.radius),
                size: (12.0 * k).clamp(9.0, 16.0),
                color: LABEL_COLOR,
                anchor: TextAnchor::TopCenter,
            });
        }

        if is_hovered {
            let mut lines = vec![node.name.clone()];
            if let Some(description) = node.description.as_ref().filter(|text| !text.is_empty()) {
                lines.push(description.clone());
            }
            lines.push(format!("{} relationships", node.degree));
            tooltip = Some(DrawPrimitive::Tooltip {
                node_id: node.id.clone(),
                position: center + vec2(radius + 8.0, -radius),
                lines,
            });
        }
    }

    let mut primitives = links;
    primitives.append(&mut marks);
    primitives.append(&mut link_labels);
    primitives.append(&mut nodes);
    primitives.append(&mut labels);
    primitives.extend(tooltip);

    Scene {
        size,
        background: BACKGROUND,
        primitives,
    }
}
