use std::sync::Arc;

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::background::FileBackground;
use crate::error::StartupError;
use crate::routes::AppState;
use crate::settings::Settings;
use crate::store::JsonStore;

mod background;
mod canvas;
mod coordinates;
mod error;
mod font_metrics;
mod model;
mod render;
mod routes;
mod settings;
mod store;
mod table;
mod text_fit;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        error!(error = %e, "server stopped");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    let settings = Settings::load()?;
    let store = JsonStore::open(&settings.data_dir)?;

    let mut state = AppState::new(store);
    state.show_grid = settings.form222.show_grid;
    if let Some(path) = &settings.form222.background {
        warn!(path = %path.display(), "form 222 background overlay enabled");
        state.background = Some(Arc::new(
            FileBackground::new(path).with_opacity(settings.form222.background_opacity),
        ));
    }

    // Any origin for now
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(settings.addr).await?;
    info!(addr = %settings.addr, "rxreturns listening");

    axum::serve(listener, app).await?;
    Ok(())
}
