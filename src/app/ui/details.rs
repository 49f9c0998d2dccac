use eframe::egui::{self, RichText, Ui};

use relgraph::graph::style::RelationKind;

use super::super::ViewModel;

fn format_trait_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Selection Details");
        ui.add_space(6.0);

        let Some(selected_id) = self.view.selected().map(str::to_owned) else {
            ui.label("Click a character in the graph to select it.");
            return;
        };

        let Some(node) = self.view.graph().node(&selected_id) else {
            ui.label("Selected character no longer exists in the graph.");
            return;
        };
        let name = node.name.clone();
        let degree = node.degree;
        let group = node.group;
        let pinned = node.is_pinned();

        ui.label(RichText::new(name).strong());
        ui.small(selected_id.as_str());
        ui.add_space(6.0);

        ui.label(format!("Relationships: {degree}"));
        ui.label(format!("Group: {}", group + 1));
        if pinned {
            ui.label("Pinned while dragging");
        }

        let Some(entity) = self.view.entity(&selected_id) else {
            return;
        };
        if let Some(description) = &entity.description {
            ui.add_space(4.0);
            ui.label(description.as_str());
        }

        if !entity.traits.is_empty() {
            ui.separator();
            ui.label(RichText::new("Traits").strong());
            let mut traits = entity.traits.iter().collect::<Vec<_>>();
            traits.sort_by(|a, b| a.0.cmp(b.0));
            for (key, value) in traits {
                ui.label(format!("{key}: {}", format_trait_value(value)));
            }
        }

        ui.separator();
        ui.label(RichText::new("Relationships").strong());

        let mut next_selection = None;
        let rows = self
            .view
            .relations_of(&selected_id)
            .map(|relation| {
                let other = if relation.from == selected_id {
                    relation.to.clone()
                } else {
                    relation.from.clone()
                };
                let direction = if relation.from == selected_id { "->" } else { "<-" };
                (relation.clone(), other, direction)
            })
            .collect::<Vec<_>>();

        if rows.is_empty() {
            ui.label("No relationships recorded for this character.");
        }

        egui::ScrollArea::vertical()
            .id_salt("relationship_rows")
            .max_height(360.0)
            .auto_shrink([false, true])
            .show(ui, |ui| {
                for (relation, other, direction) in &rows {
                    let other_name = self
                        .view
                        .graph()
                        .node(other)
                        .map(|node| node.name.clone());
                    let kind = RelationKind::parse(&relation.kind);
                    let text = RichText::new(format!(
                        "{direction} {}  {} ({})",
                        other_name.as_deref().unwrap_or(other.as_str()),
                        relation.kind,
                        relation.strength.clamp(0, 100)
                    ))
                    .color(kind.color());

                    match other_name {
                        Some(_) => {
                            let mut response = ui.link(text);
                            if let Some(description) = &relation.description {
                                response = response.on_hover_text(description.as_str());
                            }
                            if response.clicked() {
                                next_selection = Some(other.clone());
                            }
                        }
                        None => {
                            ui.label(text).on_hover_text("Unknown character; not drawn");
                        }
                    }
                }
            });

        if let Some(id) = next_selection {
            self.view.select(Some(&id));
        }
    }
}
