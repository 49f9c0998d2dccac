//! Derived node and link sets.
//!
//! Entities and relations from the host are turned into [`GraphNode`]s and
//! [`GraphLink`]s here. Style (radius, color, stroke) is a pure function of
//! the source records and the incident-relation counts, so a rebuild never
//! drifts from the data it was made from.

use std::collections::HashMap;

use eframe::egui::{Color32, Vec2, vec2};

use crate::model::{Entity, GraphOptions, Relation};

pub mod style;

use style::{RelationKind, link_width, node_color, node_radius};

/// Number of cosmetic groups nodes are spread over.
pub const GROUP_COUNT: usize = 5;
const INITIAL_SPACING: f32 = 10.0;

#[derive(Clone, Debug)]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub world_pos: Vec2,
    pub velocity: Vec2,
    /// Drag pin (`fx`, `fy`). While set, the simulator leaves the node here.
    pub pinned: Option<Vec2>,
    pub radius: f32,
    pub color: Color32,
    pub group: usize,
    pub degree: usize,
}

impl GraphNode {
    pub fn is_pinned(&self) -> bool {
        self.pinned.is_some()
    }
}

#[derive(Clone, Debug)]
pub struct GraphLink {
    pub id: String,
    pub source: usize,
    pub target: usize,
    pub kind: RelationKind,
    pub type_label: String,
    pub strength: u8,
    pub normalized_strength: f32,
    pub color: Color32,
    pub width: f32,
    pub dashed: bool,
    pub description: Option<String>,
}

impl GraphLink {
    pub fn touches(&self, node: usize) -> bool {
        self.source == node || self.target == node
    }
}

#[derive(Clone, Debug, Default)]
pub struct RelationGraph {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
    pub index_by_id: HashMap<String, usize>,
    pub incident: Vec<Vec<usize>>,
    pub dropped_relations: usize,
}

impl RelationGraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index_by_id.get(id).map(|&index| &self.nodes[index])
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }
}

/// Seed position for the `index`-th node: a sunflower spiral around `center`.
pub fn initial_position(index: usize, center: Vec2) -> Vec2 {
    let radius = INITIAL_SPACING * (0.5 + index as f32).sqrt();
    let angle = index as f32 * std::f32::consts::PI * (3.0 - 5.0_f32.sqrt());
    center + vec2(radius * angle.cos(), radius * angle.sin())
}

/// Builds a fresh graph from host data.
///
/// Nodes that survive from `prior` keep their position and pin; everything
/// else about them is recomputed. New nodes start on the seed spiral with
/// zero velocity.
pub fn build_graph(
    entities: &[Entity],
    relations: &[Relation],
    options: &GraphOptions,
    prior: Option<&RelationGraph>,
    center: Vec2,
) -> RelationGraph {
    let mut index_by_id = HashMap::with_capacity(entities.len());
    let mut kept_entities = Vec::with_capacity(entities.len());
    for entity in entities {
        if index_by_id.contains_key(&entity.id) {
            tracing::debug!(id = %entity.id, "skipping duplicate entity id");
            continue;
        }
        index_by_id.insert(entity.id.clone(), kept_entities.len());
        kept_entities.push(entity);
    }

    let mut links = Vec::with_capacity(relations.len());
    let mut degree = vec![0usize; kept_entities.len()];
    let mut incident = vec![Vec::new(); kept_entities.len()];
    let mut dropped_relations = 0usize;
    for relation in relations {
        let (Some(&source), Some(&target)) = (
            index_by_id.get(&relation.from),
            index_by_id.get(&relation.to),
        ) else {
            tracing::debug!(
                relation = %relation.id,
                from = %relation.from,
                to = %relation.to,
                "dropping relation with unknown endpoint"
            );
            dropped_relations += 1;
            continue;
        };

        let strength = relation.strength.clamp(0, 100) as u8;
        let normalized_strength = f32::from(strength) / 100.0;
        let kind = RelationKind::parse(&relation.kind);
        let link_index = links.len();

        degree[source] += 1;
        incident[source].push(link_index);
        if target != source {
            degree[target] += 1;
            incident[target].push(link_index);
        }

        links.push(GraphLink {
            id: relation.id.clone(),
            source,
            target,
            kind,
            type_label: relation.kind.clone(),
            strength,
            normalized_strength,
            color: kind.color(),
            width: link_width(normalized_strength),
            dashed: kind.dashed(),
            description: relation.description.clone(),
        });
    }

    let base_radius = options.node_size.base_radius();
    let nodes = kept_entities
        .iter()
        .enumerate()
        .map(|(index, entity)| {
            let previous = prior.and_then(|graph| graph.node(&entity.id));
            let (world_pos, pinned) = match previous {
                Some(node) => (node.world_pos, node.pinned),
                None => (initial_position(index, center), None),
            };

            GraphNode {
                id: entity.id.clone(),
                name: entity.name.clone(),
                description: entity.description.clone(),
                world_pos,
                velocity: Vec2::ZERO,
                pinned,
                radius: node_radius(base_radius, degree[index]),
                color: node_color(&entity.name, entity.color.as_deref()),
                group: index % GROUP_COUNT,
                degree: degree[index],
            }
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        nodes = nodes.len(),
        links = links.len(),
        dropped = dropped_relations,
        "rebuilt relationship graph"
    );

    RelationGraph {
        nodes,
        links,
        index_by_id,
        incident,
        dropped_relations,
    }
}
