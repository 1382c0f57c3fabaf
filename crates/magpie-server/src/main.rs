use anyhow::Result;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

mod configuration;
mod routes;
mod state;

use configuration::Settings;
use state::{AppState, Dispatch};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    let settings = Settings::new()?;
    let state = AppState::new(&settings, configuration::openai_api_key());

    match &state.dispatch {
        Dispatch::Augmented(_) => info!("completion credential found, running in augmented mode"),
        Dispatch::Fallback => info!("OPENAI_API_KEY not set, running in offline fallback mode"),
    }

    // Create router with CORS support
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::configure(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(settings.server.socket_addr()).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
