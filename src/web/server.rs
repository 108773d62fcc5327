use axum::{routing::post, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::{api, AppState};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(api::predict))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_prediction_server(state: AppState, addr: &str) -> anyhow::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Prediction server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
