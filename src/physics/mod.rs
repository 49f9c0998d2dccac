//! Force-directed layout simulator.
//!
//! Each tick cools `alpha` toward `alpha_target`, applies link, charge,
//! centering and collision forces to node velocities, then integrates
//! positions with velocity decay. Pinned nodes are held at their pin.

mod forces;
mod quadtree;

use eframe::egui::Vec2;

use crate::graph::RelationGraph;
use crate::model::{LinkDistance, PhysicsStrength};
use forces::{
    ChargeParams, CollisionParams, accumulate_charge_for_node, accumulate_collision_pairs, jiggle,
};
pub use quadtree::QuadTree;

pub const ALPHA_START: f32 = 1.0;
pub const ALPHA_MIN: f32 = 0.001;
/// Per-tick fraction of the gap to `alpha_target` that is closed; at rest
/// this is a x0.99 geometric decay.
pub const ALPHA_DECAY: f32 = 0.01;
pub const DRAG_ALPHA_TARGET: f32 = 0.3;
pub const VELOCITY_DECAY: f32 = 0.4;
pub const CHARGE_STRENGTH: f32 = -400.0;
pub const CENTER_STRENGTH: f32 = 0.1;
pub const COLLISION_MARGIN: f32 = 15.0;
pub const COLLISION_STRENGTH: f32 = 0.7;
const BARNES_HUT_THETA: f32 = 0.9;
const STRENGTH_DISTANCE_SLACK: f32 = 50.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationConfig {
    pub link_distance: LinkDistance,
    pub physics: PhysicsStrength,
    /// World-space point the centering force pulls toward.
    pub center: Vec2,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            link_distance: LinkDistance::Medium,
            physics: PhysicsStrength::Medium,
            center: Vec2::ZERO,
        }
    }
}

impl SimulationConfig {
    /// Rest length for a link of the given normalized strength.
    pub fn target_distance(&self, normalized_strength: f32) -> f32 {
        self.link_distance.base_distance()
            + (1.0 - normalized_strength.clamp(0.0, 1.0)) * STRENGTH_DISTANCE_SLACK
    }

    pub fn link_stiffness(&self, normalized_strength: f32) -> f32 {
        normalized_strength.clamp(0.0, 1.0) * self.physics.coefficient()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodePosition {
    pub id: String,
    pub position: Vec2,
    pub pinned: bool,
}

/// Owned copy of every node position at one instant.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayoutSnapshot {
    pub alpha: f32,
    pub tick: u64,
    pub nodes: Vec<NodePosition>,
}

impl LayoutSnapshot {
    pub fn position_of(&self, id: &str) -> Option<Vec2> {
        self.nodes
            .iter()
            .find(|node| node.id == id)
            .map(|node| node.position)
    }
}

#[derive(Default)]
struct PhysicsScratch {
    positions: Vec<Vec2>,
    predicted: Vec<Vec2>,
    radii: Vec<f32>,
    charge_tree: QuadTree,
    collision_tree: QuadTree,
}

pub struct Simulation {
    graph: RelationGraph,
    config: SimulationConfig,
    alpha: f32,
    alpha_target: f32,
    tick_count: u64,
    scratch: PhysicsScratch,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            graph: RelationGraph::default(),
            config,
            alpha: ALPHA_START,
            alpha_target: 0.0,
            tick_count: 0,
            scratch: PhysicsScratch::default(),
        }
    }

    pub fn graph(&self) -> &RelationGraph {
        &self.graph
    }

    pub fn config(&self) -> SimulationConfig {
        self.config
    }

    pub fn set_config(&mut self, config: SimulationConfig) {
        self.config = config;
    }

    pub fn set_center(&mut self, center: Vec2) {
        self.config.center = center;
    }

    /// Swaps in a new topology in one step and reheats the layout.
    pub fn replace_graph(&mut self, graph: RelationGraph) {
        self.graph = graph;
        self.scratch.charge_tree.clear();
        self.scratch.collision_tree.clear();
        self.alpha = ALPHA_START;
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn alpha_target(&self) -> f32 {
        self.alpha_target
    }

    pub fn set_alpha_target(&mut self, target: f32) {
        self.alpha_target = target.clamp(0.0, 1.0);
    }

    pub fn restart(&mut self) {
        self.alpha = ALPHA_START;
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// True while ticks still need scheduling. An empty graph is inert.
    pub fn is_active(&self) -> bool {
        !self.graph.is_empty() && (self.alpha >= ALPHA_MIN || self.alpha_target >= ALPHA_MIN)
    }

    pub fn pin(&mut self, index: usize, world: Vec2) {
        if let Some(node) = self.graph.nodes.get_mut(index) {
            node.pinned = Some(world);
            node.world_pos = world;
            node.velocity = Vec2::ZERO;
        }
    }

    /// Clears the pin, leaving the node exactly where it was pinned.
    pub fn unpin(&mut self, index: usize) {
        if let Some(node) = self.graph.nodes.get_mut(index)
            && let Some(pin) = node.pinned.take()
        {
            node.world_pos = pin;
            node.velocity = Vec2::ZERO;
        }
    }

    pub fn snapshot(&self) -> LayoutSnapshot {
        LayoutSnapshot {
            alpha: self.alpha,
            tick: self.tick_count,
            nodes: self
                .graph
                .nodes
                .iter()
                .map(|node| NodePosition {
                    id: node.id.clone(),
                    position: node.world_pos,
                    pinned: node.is_pinned(),
                })
                .collect(),
        }
    }

    /// Spatial index over current positions, for hit-testing.
    pub fn spatial_index(&self) -> QuadTree {
        let positions = self
            .graph
            .nodes
            .iter()
            .map(|node| node.world_pos)
            .collect::<Vec<_>>();
        let mut tree = QuadTree::new();
        tree.rebuild(&positions);
        tree
    }

    /// Advances one tick if the simulation is active. Returns whether it is
    /// still active afterwards.
    pub fn tick(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }

        self.alpha += (self.alpha_target - self.alpha) * ALPHA_DECAY;
        self.tick_count += 1;

        self.apply_link_forces();
        self.apply_charge_forces();
        self.apply_center_force();
        self.apply_collision_forces();
        self.integrate();

        let active = self.is_active();
        if !active {
            tracing::info!(
                ticks = self.tick_count,
                nodes = self.graph.nodes.len(),
                "layout cooled to rest"
            );
        }
        active
    }

    /// Ticks until the layout rests or `max_ticks` is reached.
    pub fn run_to_rest(&mut self, max_ticks: usize) -> usize {
        let mut ticks = 0;
        while ticks < max_ticks && self.tick() {
            ticks += 1;
        }
        ticks
    }

    fn apply_link_forces(&mut self) {
        let alpha = self.alpha;
        let config = self.config;
        let graph = &mut self.graph;

        for link in &graph.links {
            let (source, target) = (link.source, link.target);
            if source == target {
                continue;
            }

            let stiffness = config.link_stiffness(link.normalized_strength);
            if stiffness <= 0.0 {
                continue;
            }

            let source_node = &graph.nodes[source];
            let target_node = &graph.nodes[target];
            let mut delta = (target_node.world_pos + target_node.velocity)
                - (source_node.world_pos + source_node.velocity);
            if delta.length_sq() == 0.0 {
                delta = jiggle(source, target);
            }

            let distance = delta.length();
            let scale = (distance - config.target_distance(link.normalized_strength)) / distance
                * alpha
                * stiffness;
            let correction = delta * scale;

            let source_degree = source_node.degree.max(1) as f32;
            let target_degree = target_node.degree.max(1) as f32;
            let bias = source_degree / (source_degree + target_degree);

            graph.nodes[target].velocity -= correction * bias;
            graph.nodes[source].velocity += correction * (1.0 - bias);
        }
    }

    fn apply_charge_forces(&mut self) {
        let scratch = &mut self.scratch;
        scratch.positions.clear();
        scratch
            .positions
            .extend(self.graph.nodes.iter().map(|node| node.world_pos));
        scratch.charge_tree.rebuild(&scratch.positions);

        let Some(root) = scratch.charge_tree.root() else {
            return;
        };
        let params = ChargeParams {
            strength: CHARGE_STRENGTH,
            alpha: self.alpha,
            theta: BARNES_HUT_THETA,
        };
        let positions = scratch.charge_tree.positions();
        for (index, node) in self.graph.nodes.iter_mut().enumerate() {
            accumulate_charge_for_node(root, index, positions, params, &mut node.velocity);
        }
    }

    fn apply_center_force(&mut self) {
        let pull = CENTER_STRENGTH * self.alpha;
        let center = self.config.center;
        for node in &mut self.graph.nodes {
            node.velocity += (center - node.world_pos) * pull;
        }
    }

    fn apply_collision_forces(&mut self) {
        let scratch = &mut self.scratch;
        scratch.predicted.clear();
        scratch.radii.clear();
        let mut max_radius = 0.0_f32;
        for node in &self.graph.nodes {
            scratch.predicted.push(node.world_pos + node.velocity);
            let radius = node.radius + COLLISION_MARGIN;
            scratch.radii.push(radius);
            max_radius = max_radius.max(radius);
        }
        scratch.collision_tree.rebuild(&scratch.predicted);

        let Some(root) = scratch.collision_tree.root() else {
            return;
        };

        let mut velocities = self
            .graph
            .nodes
            .iter()
            .map(|node| node.velocity)
            .collect::<Vec<_>>();
        let max_collision_distance = max_radius * 2.0;
        accumulate_collision_pairs(
            root,
            root,
            true,
            scratch.collision_tree.positions(),
            &scratch.radii,
            CollisionParams {
                strength: COLLISION_STRENGTH,
                max_collision_distance_sq: max_collision_distance * max_collision_distance,
            },
            &mut velocities,
        );
        for (node, velocity) in self.graph.nodes.iter_mut().zip(velocities) {
            node.velocity = velocity;
        }
    }

    fn integrate(&mut self) {
        let keep = 1.0 - VELOCITY_DECAY;
        for node in &mut self.graph.nodes {
            if let Some(pin) = node.pinned {
                node.world_pos = pin;
                node.velocity = Vec2::ZERO;
                continue;
            }

            node.velocity *= keep;
            if !node.velocity.x.is_finite() || !node.velocity.y.is_finite() {
                node.velocity = Vec2::ZERO;
            }
            node.world_pos += node.velocity;
        }
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::egui::vec2;

    use crate::graph::build_graph;
    use crate::model::{Entity, GraphOptions, Relation};

    fn simulation_for(entities: &[Entity], relations: &[Relation]) -> Simulation {
        let mut simulation = Simulation::default();
        simulation.replace_graph(build_graph(
            entities,
            relations,
            &GraphOptions::default(),
            None,
            Vec2::ZERO,
        ));
        simulation
    }

    fn cast(count: usize) -> Vec<Entity> {
        (0..count)
            .map(|index| Entity::new(format!("n{index}"), format!("Node {index}")))
            .collect()
    }

    fn assert_no_overlap(simulation: &Simulation) {
        let nodes = &simulation.graph().nodes;
        for i in 0..nodes.len() {
            for j in (i + 1)..nodes.len() {
                let distance = (nodes[i].world_pos - nodes[j].world_pos).length();
                assert!(
                    distance >= nodes[i].radius + nodes[j].radius,
                    "nodes {i} and {j} overlap at distance {distance}"
                );
            }
        }
    }

    #[test]
    fn test_empty_graph_is_inert() {
        let mut simulation = Simulation::default();
        assert!(!simulation.is_active());
        assert!(!simulation.tick());
        assert_eq!(simulation.tick_count(), 0);
    }

    #[test]
    fn test_alpha_decays_to_rest() {
        let mut simulation = simulation_for(&cast(4), &[]);
        assert_eq!(simulation.alpha(), ALPHA_START);
        simulation.tick();
        assert!((simulation.alpha() - 0.99).abs() < 1e-6);

        let ticks = simulation.run_to_rest(5_000);
        assert!(ticks < 5_000);
        assert!(simulation.alpha() < ALPHA_MIN);
        assert!(!simulation.is_active());
    }

    #[test]
    fn test_alpha_target_keeps_warm() {
        let mut simulation = simulation_for(&cast(3), &[]);
        simulation.run_to_rest(5_000);
        simulation.set_alpha_target(DRAG_ALPHA_TARGET);
        assert!(simulation.is_active());
        for _ in 0..2_000 {
            simulation.tick();
        }
        assert!((simulation.alpha() - DRAG_ALPHA_TARGET).abs() < 0.01);

        simulation.set_alpha_target(0.0);
        simulation.run_to_rest(5_000);
        assert!(!simulation.is_active());
    }

    #[test]
    fn test_coincident_nodes_are_separated() {
        let mut simulation = simulation_for(&cast(6), &[]);
        for node in &mut simulation.graph.nodes {
            node.world_pos = vec2(42.0, 42.0);
        }
        simulation.restart();
        simulation.run_to_rest(5_000);

        for node in &simulation.graph().nodes {
            assert!(node.world_pos.x.is_finite() && node.world_pos.y.is_finite());
        }
        assert_no_overlap(&simulation);
    }

    #[test]
    fn test_links_settle_near_target_distance() {
        let relations = vec![Relation::new("r", "n0", "n1", "ally", 100)];
        let mut simulation = simulation_for(&cast(2), &relations);
        simulation.run_to_rest(5_000);

        let nodes = &simulation.graph().nodes;
        let distance = (nodes[0].world_pos - nodes[1].world_pos).length();
        assert!(distance > 60.0 && distance < 400.0, "distance {distance}");
    }

    #[test]
    fn test_pinned_node_does_not_move() {
        let mut simulation = simulation_for(&cast(5), &[]);
        simulation.pin(2, vec2(100.0, 200.0));
        for _ in 0..50 {
            simulation.tick();
        }
        assert_eq!(simulation.graph().nodes[2].world_pos, vec2(100.0, 200.0));

        simulation.unpin(2);
        assert_eq!(simulation.graph().nodes[2].world_pos, vec2(100.0, 200.0));
        assert!(!simulation.graph().nodes[2].is_pinned());
    }

    #[test]
    fn test_centering_pulls_toward_center() {
        let mut simulation = simulation_for(&cast(1), &[]);
        simulation.set_center(vec2(400.0, 300.0));
        simulation.run_to_rest(5_000);
        let position = simulation.graph().nodes[0].world_pos;
        assert!((position - vec2(400.0, 300.0)).length() < 5.0);
    }

    #[test]
    fn test_medium_sized_graph_converges_without_overlap() {
        let entities = cast(40);
        let relations = (0..39)
            .map(|index| {
                Relation::new(
                    format!("r{index}"),
                    format!("n{index}"),
                    format!("n{}", (index * 7 + 3) % 40),
                    "ally",
                    50,
                )
            })
            .collect::<Vec<_>>();
        let mut simulation = simulation_for(&entities, &relations);
        simulation.run_to_rest(5_000);
        assert!(!simulation.is_active());
        assert_no_overlap(&simulation);
    }

    #[test]
    fn test_snapshot_is_an_owned_copy() {
        let mut simulation = simulation_for(&cast(2), &[]);
        let before = simulation.snapshot();
        simulation.tick();
        let after = simulation.snapshot();
        assert_eq!(before.tick, 0);
        assert_eq!(after.tick, 1);
        assert_ne!(before.position_of("n0"), after.position_of("n0"));
    }
}
