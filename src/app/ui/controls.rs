use eframe::egui::{self, Color32, RichText, Ui};

use relgraph::model::{GraphOptions, LinkDistance, NodeSize, PhysicsStrength};

use super::super::canvas::zoom_step;
use super::super::{ViewModel, export_to_file};

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Graph Controls");
        ui.separator();
        ui.add_space(4.0);

        ui.label("Search characters")
            .on_hover_text("Fuzzy-highlight matching characters without changing the layout.");
        if ui.text_edit_singleline(&mut self.search).changed() {
            self.view.set_search(&self.search);
        }
        if let Some(matches) = self.view.search_matches() {
            ui.small(format!("{} matching", matches.len()));
        }

        ui.separator();

        let mut options = self.view.options();
        let before = options;
        draw_option_pickers(ui, &mut options);
        if options != before {
            self.view.set_options(options);
        }

        ui.separator();

        ui.horizontal(|ui| {
            if ui.button("Zoom in").clicked() {
                self.view.zoom_by(zoom_step(true));
            }
            if ui.button("Zoom out").clicked() {
                self.view.zoom_by(zoom_step(false));
            }
        });
        let transform = self.view.transform();
        ui.small(format!(
            "zoom {:.2}  offset ({:.0}, {:.0})",
            transform.k, transform.tx, transform.ty
        ));

        if ui
            .button("Reset view")
            .on_hover_text("Restart the layout, clear the selection and return to the default zoom.")
            .clicked()
        {
            self.view.reset();
        }

        ui.separator();

        ui.label("Snapshot file");
        let mut path_text = self.export_path.display().to_string();
        if ui.text_edit_singleline(&mut path_text).changed() {
            self.export_path = path_text.into();
        }
        if ui.button("Export PNG").clicked() {
            match export_to_file(&self.view, &self.export_path) {
                Ok(bytes) => self.set_status(
                    format!("Saved {} ({bytes} bytes)", self.export_path.display()),
                    false,
                ),
                Err(error) => self.set_status(format!("{error:#}"), true),
            }
        }

        if let Some(status) = &self.status {
            let color = if status.is_error {
                Color32::from_rgb(239, 68, 68)
            } else {
                Color32::from_gray(190)
            };
            ui.add_space(4.0);
            ui.label(RichText::new(status.text.as_str()).color(color));
        }
    }
}

fn draw_option_pickers(ui: &mut Ui, options: &mut GraphOptions) {
    ui.checkbox(&mut options.show_labels, "Show names");
    ui.checkbox(&mut options.show_relationship_types, "Show relationship types");
    ui.add_space(4.0);

    ui.label("Node size");
    ui.horizontal(|ui| {
        for size in [NodeSize::Small, NodeSize::Medium, NodeSize::Large] {
            ui.selectable_value(&mut options.node_size, size, size.label());
        }
    });

    ui.label("Link distance");
    ui.horizontal(|ui| {
        for distance in [LinkDistance::Short, LinkDistance::Medium, LinkDistance::Long] {
            ui.selectable_value(&mut options.link_strength, distance, distance.label());
        }
    });

    ui.label("Physics");
    ui.horizontal(|ui| {
        for physics in [
            PhysicsStrength::Weak,
            PhysicsStrength::Medium,
            PhysicsStrength::Strong,
        ] {
            ui.selectable_value(&mut options.physics, physics, physics.label())
                .on_hover_text("How firmly links hold their rest length.");
        }
    });

    egui::CollapsingHeader::new("Legend")
        .default_open(false)
        .show(ui, |ui| {
            for kind in relgraph::graph::style::RelationKind::ALL {
                ui.horizontal(|ui| {
                    let (rect, _) =
                        ui.allocate_exact_size(egui::vec2(14.0, 14.0), egui::Sense::hover());
                    ui.painter().circle_filled(rect.center(), 6.0, kind.color());
                    let label = if kind.dashed() {
                        format!("{} (dashed)", kind.label())
                    } else {
                        kind.label().to_owned()
                    };
                    ui.label(label);
                });
            }
        });
}
