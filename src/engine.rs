//! [`GraphView`]: one mounted relationship graph.
//!
//! The view owns the simulator, the viewport and the interaction state and
//! is driven entirely by its host: data and option changes, pointer input,
//! and one [`GraphView::frame`] call per display refresh. Observable changes
//! are queued as [`GraphEvent`]s and drained with [`GraphView::take_events`].

use std::collections::HashSet;

use eframe::egui::{Pos2, Vec2};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::export::{ExportError, export_png};
use crate::graph::{RelationGraph, build_graph};
use crate::interaction::{GraphEvent, InteractionController};
use crate::model::{Entity, GraphOptions, Relation};
use crate::physics::{LayoutSnapshot, Simulation, SimulationConfig};
use crate::render::{Scene, SceneInput, build_scene};
use crate::viewport::{RESET_DURATION_SECS, Viewport, ViewportTransform};

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_lowercase(), &query.to_lowercase()))
}

fn simulation_config(options: &GraphOptions, size: Vec2) -> SimulationConfig {
    SimulationConfig {
        link_distance: options.link_strength,
        physics: options.physics,
        center: size * 0.5,
    }
}

pub struct GraphView {
    options: GraphOptions,
    entities: Vec<Entity>,
    relations: Vec<Relation>,
    simulation: Simulation,
    viewport: Viewport,
    interaction: InteractionController,
    events: Vec<GraphEvent>,
    search_query: String,
    search_matches: Option<HashSet<usize>>,
    disposed: bool,
}

impl GraphView {
    pub fn new(options: GraphOptions, size: Vec2) -> Self {
        let mut viewport = Viewport::new(size);
        viewport.set_size(size);
        Self {
            options,
            entities: Vec::new(),
            relations: Vec::new(),
            simulation: Simulation::new(simulation_config(&options, viewport.size())),
            viewport,
            interaction: InteractionController::new(),
            events: Vec::new(),
            search_query: String::new(),
            search_matches: None,
            disposed: false,
        }
    }

    /// Replaces the entity and relation collections and rebuilds the graph
    /// in one step. Surviving nodes keep their layout position; selection
    /// survives unless its node is gone.
    pub fn set_data(&mut self, entities: Vec<Entity>, relations: Vec<Relation>) {
        self.entities = entities;
        self.relations = relations;
        self.rebuild();
    }

    pub fn options(&self) -> GraphOptions {
        self.options
    }

    /// Applies new options. Only size, link distance and physics changes
    /// rebuild the graph; label toggles take effect on the next scene.
    pub fn set_options(&mut self, options: GraphOptions) {
        let rebuild = self.options.affects_geometry(&options);
        self.options = options;
        if rebuild {
            self.simulation
                .set_config(simulation_config(&options, self.viewport.size()));
            self.rebuild();
        }
    }

    pub fn set_viewport_size(&mut self, size: Vec2) {
        if self.viewport.size() == size {
            return;
        }
        self.viewport.set_size(size);
        self.simulation.set_center(self.viewport.size() * 0.5);
    }

    fn rebuild(&mut self) {
        let graph = build_graph(
            &self.entities,
            &self.relations,
            &self.options,
            Some(self.simulation.graph()),
            self.simulation.config().center,
        );
        self.simulation.replace_graph(graph);
        self.interaction
            .retain_existing(&mut self.simulation, &mut self.events);
        self.refresh_search();
    }

    /// Advances one animation frame: the viewport transition by `delta_seconds`
    /// and the layout by a single tick. Returns whether the host should keep
    /// scheduling frames.
    pub fn frame(&mut self, delta_seconds: f32) -> bool {
        if self.disposed {
            return false;
        }

        if self.viewport.is_animating() {
            self.viewport.advance(delta_seconds);
            self.events
                .push(GraphEvent::TransformChanged(self.viewport.transform()));
        }
        self.simulation.tick();

        self.is_active()
    }

    pub fn is_active(&self) -> bool {
        !self.disposed
            && (self.simulation.is_active()
                || self.viewport.is_animating()
                || self.interaction.is_busy())
    }

    /// Ticks the layout until it rests or `max_ticks` is reached.
    pub fn settle(&mut self, max_ticks: usize) -> usize {
        if self.disposed {
            return 0;
        }
        self.simulation.run_to_rest(max_ticks)
    }

    pub fn scene(&self) -> Scene {
        build_scene(SceneInput {
            graph: self.simulation.graph(),
            transform: self.viewport.transform(),
            size: self.viewport.size(),
            options: &self.options,
            hovered: self.interaction.hovered(),
            selected: self.interaction.selected(),
            highlighted: self.search_matches.as_ref(),
        })
    }

    pub fn pointer_down(&mut self, screen: Pos2) {
        if self.disposed {
            return;
        }
        self.interaction
            .pointer_down(&self.simulation, &self.viewport, screen);
    }

    /// Returns whether the frame needs repainting.
    pub fn pointer_move(&mut self, screen: Pos2) -> bool {
        if self.disposed {
            return false;
        }
        self.interaction.pointer_move(
            &mut self.simulation,
            &mut self.viewport,
            screen,
            &mut self.events,
        )
    }

    pub fn pointer_up(&mut self, screen: Pos2) {
        if self.disposed {
            return;
        }
        self.interaction.pointer_up(
            &mut self.simulation,
            &self.viewport,
            screen,
            &mut self.events,
        );
    }

    pub fn pointer_leave(&mut self) -> bool {
        !self.disposed && self.interaction.pointer_leave()
    }

    pub fn wheel(&mut self, screen: Pos2, scroll: f32) {
        if self.disposed {
            return;
        }
        self.interaction
            .wheel(&mut self.viewport, screen, scroll, &mut self.events);
    }

    pub fn zoom_by(&mut self, factor: f32) {
        let size = self.viewport.size();
        self.update_transform(|transform| transform.zoom_by(factor, size));
    }

    pub fn zoom_to(&mut self, k: f32, tx: f32, ty: f32) {
        self.update_transform(|transform| transform.zoom_to(k, tx, ty));
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.update_transform(|transform| transform.pan_by(dx, dy));
    }

    fn update_transform(&mut self, change: impl FnOnce(&mut ViewportTransform)) {
        if self.disposed {
            return;
        }
        let before = self.viewport.transform();
        self.viewport.update(change);
        if self.viewport.transform() != before {
            self.events
                .push(GraphEvent::TransformChanged(self.viewport.transform()));
        }
    }

    /// Reheats the layout, clears selection and eases the transform back to
    /// identity.
    pub fn reset(&mut self) {
        if self.disposed {
            return;
        }
        self.simulation.restart();
        self.interaction.reset(&mut self.simulation, &mut self.events);
        self.viewport
            .animate_to(ViewportTransform::IDENTITY, RESET_DURATION_SECS);
        tracing::debug!("graph view reset");
    }

    /// Rasterizes the current frame as PNG. Failure leaves every piece of
    /// view state as it was.
    pub fn export_image(&self) -> Result<Vec<u8>, ExportError> {
        export_png(&self.scene()).inspect_err(|err| {
            tracing::warn!(error = %err, "graph export failed");
        })
    }

    /// Stops the view for good. Later frames and input are ignored.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.events.clear();
        tracing::debug!(ticks = self.simulation.tick_count(), "graph view disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn take_events(&mut self) -> Vec<GraphEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn select(&mut self, id: Option<&str>) {
        let id = id.filter(|id| self.simulation.graph().index_of(id).is_some());
        self.interaction
            .set_selected(id.map(str::to_owned), &mut self.events);
    }

    pub fn selected(&self) -> Option<&str> {
        self.interaction.selected()
    }

    pub fn hovered(&self) -> Option<&str> {
        self.interaction.hovered()
    }

    pub fn transform(&self) -> ViewportTransform {
        self.viewport.transform()
    }

    /// Transform the view rests at once any running transition finishes.
    pub fn settled_transform(&self) -> ViewportTransform {
        self.viewport.settled_transform()
    }

    pub fn graph(&self) -> &RelationGraph {
        self.simulation.graph()
    }

    /// True when there are no entities; hosts show a placeholder instead.
    pub fn is_empty(&self) -> bool {
        self.simulation.graph().is_empty()
    }

    pub fn alpha(&self) -> f32 {
        self.simulation.alpha()
    }

    pub fn snapshot(&self) -> LayoutSnapshot {
        self.simulation.snapshot()
    }

    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.id == id)
    }

    pub fn relations_of<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Relation> + 'a {
        self.relations
            .iter()
            .filter(move |relation| relation.from == id || relation.to == id)
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn search_matches(&self) -> Option<&HashSet<usize>> {
        self.search_matches.as_ref()
    }

    /// Highlights nodes whose name fuzzy-matches `query`. An empty query
    /// clears the highlight.
    pub fn set_search(&mut self, query: &str) {
        let query = query.trim();
        if query == self.search_query {
            return;
        }
        self.search_query = query.to_owned();
        self.refresh_search();
    }

    fn refresh_search(&mut self) {
        if self.search_query.is_empty() {
            self.search_matches = None;
            return;
        }
        let matcher = SkimMatcherV2::default();
        let matches = self
            .simulation
            .graph()
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(index, node)| {
                fuzzy_match_score(&matcher, &node.name, &self.search_query).map(|_| index)
            })
            .collect::<HashSet<_>>();
        self.search_matches = Some(matches);
    }
}
