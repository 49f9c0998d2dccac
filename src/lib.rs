//! Force-directed relationship graph engine.
//!
//! Hosts feed [`model::Entity`] and [`model::Relation`] collections into an
//! [`engine::GraphView`], forward pointer input, call
//! [`engine::GraphView::frame`] once per display refresh and paint the
//! returned [`render::Scene`].

pub mod dataset;
pub mod engine;
pub mod export;
pub mod graph;
pub mod interaction;
pub mod model;
pub mod physics;
pub mod render;
pub mod viewport;

pub use engine::GraphView;
pub use export::ExportError;
pub use interaction::GraphEvent;
pub use model::{Entity, GraphOptions, Relation};
