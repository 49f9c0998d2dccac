use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use anyhow::{Context as _, Result};
use eframe::egui::{self, Context, Vec2, vec2};

use relgraph::GraphView;
use relgraph::dataset::{Dataset, demo_dataset, load_dataset};
use relgraph::model::GraphOptions;

mod canvas;
mod ui;

const INITIAL_CANVAS_SIZE: Vec2 = vec2(960.0, 720.0);

pub struct RelGraphApp {
    data_path: Option<PathBuf>,
    overrides: OptionOverrides,
    state: AppState,
    reload_rx: Option<Receiver<Result<Dataset, String>>>,
}

/// Options given on the command line. They win over a dataset's own
/// `options` block.
#[derive(Clone, Copy, Debug, Default)]
pub struct OptionOverrides {
    pub node_size: Option<relgraph::model::NodeSize>,
    pub link_distance: Option<relgraph::model::LinkDistance>,
    pub physics: Option<relgraph::model::PhysicsStrength>,
    pub hide_labels: bool,
    pub show_types: bool,
}

impl OptionOverrides {
    pub fn apply(&self, base: Option<GraphOptions>) -> GraphOptions {
        let mut options = base.unwrap_or_default();
        if let Some(node_size) = self.node_size {
            options.node_size = node_size;
        }
        if let Some(link_distance) = self.link_distance {
            options.link_strength = link_distance;
        }
        if let Some(physics) = self.physics {
            options.physics = physics;
        }
        if self.hide_labels {
            options.show_labels = false;
        }
        if self.show_types {
            options.show_relationship_types = true;
        }
        options
    }
}

enum AppState {
    Loading {
        rx: Receiver<Result<Dataset, String>>,
    },
    Ready(Box<ViewModel>),
    Error(String),
}

struct StatusMessage {
    text: String,
    is_error: bool,
}

struct ViewModel {
    view: GraphView,
    source_label: String,
    search: String,
    export_path: PathBuf,
    status: Option<StatusMessage>,
    character_count: usize,
    relationship_count: usize,
}

/// Reads a dataset from `path`, or hands back the built-in cast.
pub fn read_dataset(path: Option<&Path>) -> Result<Dataset> {
    match path {
        Some(path) => load_dataset(path),
        None => Ok(demo_dataset()),
    }
}

pub fn build_view(dataset: Dataset, overrides: &OptionOverrides, size: Vec2) -> GraphView {
    let options = overrides.apply(dataset.options);
    let mut view = GraphView::new(options, size);
    view.set_data(dataset.characters, dataset.relationships);
    view
}

/// Writes the view's current frame to `path` as PNG. Returns the byte count.
pub fn export_to_file(view: &GraphView, path: &Path) -> Result<usize> {
    let bytes = view
        .export_image()
        .context("failed to render graph snapshot")?;
    fs::write(path, &bytes)
        .with_context(|| format!("failed to write snapshot to {}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "exported graph snapshot");
    Ok(bytes.len())
}

impl RelGraphApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        data_path: Option<PathBuf>,
        overrides: OptionOverrides,
    ) -> Self {
        let state = Self::start_load(data_path.clone());
        Self {
            data_path,
            overrides,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(data_path: Option<PathBuf>) -> Receiver<Result<Dataset, String>> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = read_dataset(data_path.as_deref()).map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(data_path: Option<PathBuf>) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(data_path),
        }
    }

    fn source_label(&self) -> String {
        self.data_path
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "built-in demo cast".to_owned())
    }

    fn ready_state(&self, dataset: Dataset) -> AppState {
        AppState::Ready(Box::new(ViewModel::new(
            dataset,
            &self.overrides,
            self.source_label(),
        )))
    }
}

impl eframe::App for RelGraphApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(Ok(dataset)) => transition = Some(Ok(dataset)),
                    Ok(Err(error)) => transition = Some(Err(error)),
                    Err(TryRecvError::Empty) => ctx.request_repaint(),
                    Err(TryRecvError::Disconnected) => {
                        transition = Some(Err("Background load worker disconnected".to_owned()));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading relationship data...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                let mut retry = false;
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load relationship data");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    retry = ui.button("Retry").clicked();
                });
                if retry {
                    self.state = Self::start_load(self.data_path.clone());
                    return;
                }
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                model.show(ctx, &mut reload_requested, is_reloading);

                if reload_requested && self.reload_rx.is_none() {
                    self.reload_rx = Some(Self::spawn_load(self.data_path.clone()));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(Ok(dataset)) => {
                            model.replace_data(dataset);
                        }
                        Ok(Err(error)) => {
                            model.set_status(format!("Reload failed: {error}"), true);
                        }
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                            ctx.request_repaint();
                        }
                        Err(TryRecvError::Disconnected) => {
                            model.set_status("Background load worker disconnected", true);
                        }
                    }
                }
            }
        }

        if let Some(result) = transition {
            self.reload_rx = None;
            self.state = match result {
                Ok(dataset) => self.ready_state(dataset),
                Err(error) => {
                    tracing::warn!(%error, "dataset load failed");
                    AppState::Error(error)
                }
            };
        }
    }
}

impl Drop for RelGraphApp {
    fn drop(&mut self) {
        if let AppState::Ready(model) = &mut self.state {
            model.view.dispose();
        }
    }
}

impl ViewModel {
    fn new(dataset: Dataset, overrides: &OptionOverrides, source_label: String) -> Self {
        let character_count = dataset.characters.len();
        let relationship_count = dataset.relationships.len();
        Self {
            view: build_view(dataset, overrides, INITIAL_CANVAS_SIZE),
            source_label,
            search: String::new(),
            export_path: PathBuf::from("relgraph-snapshot.png"),
            status: None,
            character_count,
            relationship_count,
        }
    }

    /// Swaps in reloaded data. Options chosen in the panel are kept.
    fn replace_data(&mut self, dataset: Dataset) {
        self.character_count = dataset.characters.len();
        self.relationship_count = dataset.relationships.len();
        self.view
            .set_data(dataset.characters, dataset.relationships);
        self.set_status("Reloaded relationship data", false);
    }

    fn set_status(&mut self, text: impl Into<String>, is_error: bool) {
        self.status = Some(StatusMessage {
            text: text.into(),
            is_error,
        });
    }
}
