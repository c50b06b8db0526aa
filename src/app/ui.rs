use eframe::egui::{ComboBox, Key, RichText, TextEdit, Ui};

use super::scene::ClusterFilter;
use super::search::{SearchAction, resolve_query};
use super::{HostRequests, ViewModel};

impl ViewModel {
    pub(in crate::app) fn draw_top_bar(&mut self, ui: &mut Ui, requests: &mut HostRequests) {
        let now = ui.ctx().input(|input| input.time);

        ui.add_space(4.0);
        ui.horizontal(|ui| {
            ui.heading("Product Substitution Explorer");
            ui.separator();

            let search = ui.add(
                TextEdit::singleline(&mut self.search)
                    .hint_text("Search aisle, cluster, or product")
                    .desired_width(220.0),
            );
            if search.lost_focus() && ui.input(|input| input.key_pressed(Key::Enter)) {
                self.submit_search(now);
            }

            self.draw_cluster_selector(ui, now);

            if ui.button("Fit View").clicked() {
                self.fit_view(now);
            }
            if ui.button("Hierarchical Layout").clicked() {
                requests.switch_layout = true;
            }
            if ui.button("Close").clicked() {
                requests.close = true;
            }
        });

        if !self.status.is_empty() {
            ui.label(RichText::new(self.status.as_str()).italics().weak());
        }
        ui.add_space(4.0);
    }

    fn draw_cluster_selector(&mut self, ui: &mut Ui, now: f64) {
        // Owned labels so the combo body never borrows the scene.
        let entries: Vec<(u32, String)> = {
            let Some(scene) = &self.scene else {
                return;
            };
            let mut entries: Vec<(u32, String)> = scene
                .clusters
                .iter()
                .filter_map(|marker| {
                    marker.number.map(|number| {
                        (
                            number,
                            format!(
                                "{} ({})",
                                marker.name,
                                marker.aisle_name.as_deref().unwrap_or("Unknown Aisle")
                            ),
                        )
                    })
                })
                .collect();
            entries.sort_by_key(|entry| entry.0);
            entries
        };

        let selected_text = match self.filter {
            ClusterFilter::All => "All Clusters".to_owned(),
            ClusterFilter::Only(id) => entries
                .iter()
                .find(|entry| entry.0 == id)
                .map(|entry| entry.1.clone())
                .unwrap_or_else(|| format!("Cluster {id}")),
        };

        let mut picked = None;
        ComboBox::from_id_salt("cluster_filter")
            .selected_text(selected_text)
            .width(240.0)
            .show_ui(ui, |ui| {
                if ui
                    .selectable_label(self.filter == ClusterFilter::All, "All Clusters")
                    .clicked()
                {
                    picked = Some(ClusterFilter::All);
                }
                for (number, label) in &entries {
                    let selected = self.filter == ClusterFilter::Only(*number);
                    if ui.selectable_label(selected, label).clicked() {
                        picked = Some(ClusterFilter::Only(*number));
                    }
                }
            });

        if let Some(filter) = picked {
            self.filter = filter;
            if let ClusterFilter::Only(id) = filter
                && let Some(index) = self
                    .scene
                    .as_ref()
                    .and_then(|scene| scene.index_by_number.get(&id).copied())
            {
                self.focus_cluster(index, now);
            }
        }
    }

    pub(in crate::app) fn submit_search(&mut self, now: f64) {
        let action = {
            let Some(scene) = &self.scene else {
                return;
            };
            resolve_query(&self.search, scene, &self.model)
        };

        match action {
            SearchAction::ClearStatus => self.status.clear(),
            SearchAction::NotFound => {
                self.status = format!(
                    "No aisle, cluster, or product matches \"{}\".",
                    self.search.trim()
                );
            }
            SearchAction::FocusAisle(index) => {
                let name = self
                    .scene
                    .as_ref()
                    .and_then(|scene| scene.aisles.get(index))
                    .map(|aisle| aisle.name.clone())
                    .unwrap_or_default();
                self.focus_aisle(index, now);
                self.status = format!("Focused aisle \"{name}\".");
            }
            SearchAction::FocusCluster {
                index,
                open_panel,
                via_product,
            } => {
                let name = self
                    .scene
                    .as_ref()
                    .and_then(|scene| scene.clusters.get(index))
                    .map(|marker| marker.name.clone())
                    .unwrap_or_default();
                self.focus_cluster(index, now);
                if open_panel {
                    self.open_cluster(index, now);
                }
                self.status = if via_product {
                    format!("Found a matching product in {name}.")
                } else {
                    format!("Focused {name}.")
                };
            }
        }
    }
}
