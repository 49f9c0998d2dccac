mod app;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use eframe::egui::vec2;
use tracing_subscriber::EnvFilter;

use relgraph::model::{LinkDistance, NodeSize, PhysicsStrength};

const HEADLESS_MAX_TICKS: usize = 2_000;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Dataset JSON with `characters`, `relationships` and optional `options`.
    #[arg(long)]
    data: Option<PathBuf>,

    #[arg(long, value_enum)]
    node_size: Option<NodeSize>,

    #[arg(long, value_enum)]
    link_distance: Option<LinkDistance>,

    #[arg(long, value_enum)]
    physics: Option<PhysicsStrength>,

    #[arg(long)]
    hide_labels: bool,

    #[arg(long)]
    show_types: bool,

    /// Lay the graph out without a window and write a PNG snapshot here.
    #[arg(long)]
    export: Option<PathBuf>,

    #[arg(long, default_value_t = 1280)]
    width: u32,

    #[arg(long, default_value_t = 900)]
    height: u32,
}

impl Args {
    fn overrides(&self) -> app::OptionOverrides {
        app::OptionOverrides {
            node_size: self.node_size,
            link_distance: self.link_distance,
            physics: self.physics,
            hide_labels: self.hide_labels,
            show_types: self.show_types,
        }
    }
}

fn init_tracing() -> Result<()> {
    let directive = "relgraph=info"
        .parse()
        .context("invalid default log directive")?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .init();
    Ok(())
}

fn run_headless(args: &Args, output: &std::path::Path) -> Result<()> {
    let dataset = app::read_dataset(args.data.as_deref())?;
    let size = vec2(args.width as f32, args.height as f32);
    let mut view = app::build_view(dataset, &args.overrides(), size);
    let ticks = view.settle(HEADLESS_MAX_TICKS);
    tracing::info!(ticks, "layout settled for export");
    app::export_to_file(&view, output)?;
    view.dispose();
    Ok(())
}

fn main() -> Result<()> {
    init_tracing()?;
    let args = Args::parse();

    if let Some(output) = args.export.clone() {
        return run_headless(&args, &output);
    }

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };
    let data_path = args.data.clone();
    let overrides = args.overrides();

    eframe::run_native(
        "relgraph",
        options,
        Box::new(move |cc| Ok(Box::new(app::RelGraphApp::new(cc, data_path, overrides)))),
    )
    .map_err(|error| anyhow::anyhow!("failed to start the viewer: {error}"))
}
