mod app;
mod data;
mod util;

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Three-tier product graph document.
    #[arg(long, default_value = "data/processed/drilldown_graph.json")]
    graph_path: PathBuf,

    /// Optional GMM augmentation document; the view degrades to
    /// jittered placement without it.
    #[arg(long, default_value = "data/processed/drilldown_graph_gmm.json")]
    gmm_path: PathBuf,
}

fn main() -> eframe::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "gmm-explorer",
        options,
        Box::new(move |cc| {
            Ok(Box::new(app::GmmExplorerApp::new(
                cc,
                args.graph_path.clone(),
                Some(args.gmm_path.clone()),
            )))
        }),
    )
}
