mod drilldown;
mod layout;
mod physics;
mod scene;
mod search;
mod ui;
mod viewport;

use std::path::PathBuf;
use std::sync::mpsc::{Receiver, TryRecvError, channel};
use std::thread;

use eframe::egui::{self, CentralPanel, Context, RichText, TopBottomPanel, ViewportCommand};

use crate::data::{GraphModel, load_model};

use drilldown::DrilldownPanel;
use scene::{ClusterFilter, Scene};
use viewport::{SCENE_SCALE_RANGE, Viewport};

/// How long the red focus ring stays on a cluster marker.
const HIGHLIGHT_SECS: f64 = 1.8;

#[derive(Clone, Copy)]
struct Highlight {
    cluster: usize,
    until: f64,
}

/// Requests the view hands back to the host shell each frame.
#[derive(Default)]
struct HostRequests {
    close: bool,
    switch_layout: bool,
}

/// Everything derived from one loaded model: the built scene, camera,
/// filter, search box, and the optional drilldown panel.
struct ViewModel {
    model: GraphModel,
    scene: Option<Scene>,
    viewport: Viewport,
    search: String,
    status: String,
    filter: ClusterFilter,
    drag: Option<usize>,
    highlight: Option<Highlight>,
    drilldown: Option<DrilldownPanel>,
}

impl ViewModel {
    fn new(model: GraphModel) -> Self {
        Self {
            model,
            scene: None,
            viewport: Viewport::new(SCENE_SCALE_RANGE),
            search: String::new(),
            status: String::new(),
            filter: ClusterFilter::All,
            drag: None,
            highlight: None,
            drilldown: None,
        }
    }

    fn show(&mut self, ctx: &Context, requests: &mut HostRequests) {
        TopBottomPanel::top("top_bar").show(ctx, |ui| self.draw_top_bar(ui, requests));
        CentralPanel::default().show(ctx, |ui| self.draw_scene(ui));

        if let Some(panel) = self.drilldown.as_mut()
            && !panel.show(ctx)
        {
            self.drilldown = None;
        }
    }

    fn open_cluster(&mut self, index: usize, now: f64) {
        let panel = {
            let Some(scene) = &self.scene else {
                return;
            };
            let Some(marker) = scene.clusters.get(index) else {
                return;
            };
            DrilldownPanel::open(index, marker, &self.model)
        };

        self.drilldown = Some(panel);
        self.highlight = Some(Highlight {
            cluster: index,
            until: now + HIGHLIGHT_SECS,
        });
    }

    fn note_layout_switch(&mut self) {
        self.status =
            "Hierarchical layout is rendered by the host shell; this view stays on GMM placement."
                .to_owned();
    }
}

enum AppState {
    Loading(Receiver<Result<GraphModel, String>>),
    Ready(Box<ViewModel>),
    Error(String),
}

pub struct GmmExplorerApp {
    graph_path: PathBuf,
    gmm_path: Option<PathBuf>,
    state: AppState,
}

impl GmmExplorerApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        graph_path: PathBuf,
        gmm_path: Option<PathBuf>,
    ) -> Self {
        let state = spawn_load(graph_path.clone(), gmm_path.clone());
        Self {
            graph_path,
            gmm_path,
            state,
        }
    }
}

/// Parse off the UI thread; the frame loop polls the channel.
fn spawn_load(graph_path: PathBuf, gmm_path: Option<PathBuf>) -> AppState {
    let (tx, rx) = channel();
    thread::spawn(move || {
        let result =
            load_model(&graph_path, gmm_path.as_deref()).map_err(|error| format!("{error:#}"));
        let _ = tx.send(result);
    });
    AppState::Loading(rx)
}

impl eframe::App for GmmExplorerApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        if let AppState::Loading(rx) = &self.state {
            match rx.try_recv() {
                Ok(Ok(model)) => {
                    log::info!(
                        "graph loaded: {} nodes, {} edges, augmented: {}",
                        model.nodes.len(),
                        model.edges.len(),
                        model.augmented
                    );
                    self.state = AppState::Ready(Box::new(ViewModel::new(model)));
                }
                Ok(Err(error)) => {
                    log::error!("graph load failed: {error}");
                    self.state = AppState::Error(error);
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    self.state =
                        AppState::Error("graph loader thread exited unexpectedly".to_owned());
                }
            }
        }

        let mut retry = false;
        match &mut self.state {
            AppState::Loading(_) => {
                CentralPanel::default().show(ctx, |ui| {
                    ui.centered_and_justified(|ui| {
                        ui.horizontal(|ui| {
                            ui.spinner();
                            ui.label("Loading product graph...");
                        });
                    });
                });
                ctx.request_repaint();
            }
            AppState::Ready(view) => {
                let mut requests = HostRequests::default();
                view.show(ctx, &mut requests);

                if requests.switch_layout {
                    log::info!("hierarchical layout requested; delegated to the host shell");
                    view.note_layout_switch();
                }
                if requests.close {
                    ctx.send_viewport_cmd(ViewportCommand::Close);
                }
            }
            AppState::Error(message) => {
                CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(ui.available_height() * 0.3);
                        ui.label(
                            RichText::new("Failed to load the product graph")
                                .heading()
                                .color(egui::Color32::from_rgb(214, 39, 40)),
                        );
                        ui.label(message.as_str());
                        ui.add_space(8.0);
                        if ui.button("Retry").clicked() {
                            retry = true;
                        }
                    });
                });
            }
        }

        if retry {
            self.state = spawn_load(self.graph_path.clone(), self.gmm_path.clone());
        }
    }
}
