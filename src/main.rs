use dovekie::app::EditorApp;
use dovekie::config::EditorOptions;
use dovekie::model::{DemoModel, ModelClient};
use dovekie::session::EditorSession;
use eframe::egui;
use std::sync::{mpsc, Arc};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "DOVEKIE_LOG";

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let options = EditorOptions::load()?;
    let store = options.history_store();
    tracing::info!(history = %store.path().display(), "starting editor");

    let (tx, rx) = mpsc::channel();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("dovekie-runtime")
        .build()?;

    let client = runtime.block_on(async { ModelClient::new(Arc::new(DemoModel::new()), tx) })?;
    let session = EditorSession::new(&options, Box::new(store));
    let app = EditorApp::new(rx, client, session, options);
    let _runtime = runtime;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 760.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Dovekie",
        native_options,
        Box::new(move |_creation_context| Ok(Box::new(app))),
    )?;

    Ok(())
}
