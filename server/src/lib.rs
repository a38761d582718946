//! `tracker-server`: HTTP surface for the agenda tracker.
//!
//! | Method | Path                          | Body                                  |
//! |--------|-------------------------------|---------------------------------------|
//! | GET    | `/api/predictions`            | `{predictions}`                       |
//! | POST   | `/api/predictions/score`      | `{predictions, message}`              |
//! | GET    | `/api/predictions/scorecard`  | `Scorecard`                           |
//! | GET    | `/api/progress`               | `{items}`                             |
//! | POST   | `/api/progress/analyze`       | `{items}`                             |
//! | GET    | `/api/alerts`                 | `{triggered, reason}`                 |
//! | GET    | `/api/geopolitical`           | `{articles}`                          |
//! | GET    | `/api/report/pdf`             | `application/pdf` attachment          |
//! | GET    | `/health`                     | `{status: "healthy"}`                 |

mod error;
mod handlers;
mod request_tracing;
mod shutdown;
pub mod telemetry;

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracker_core::Tracker;

pub use error::AppError;
pub use shutdown::shutdown_signal;

#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<Tracker>,
}

impl AppState {
    pub fn new(tracker: Tracker) -> Self {
        Self {
            tracker: Arc::new(tracker),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/predictions", get(handlers::list_predictions))
        .route("/api/predictions/score", post(handlers::score_predictions))
        .route("/api/predictions/scorecard", get(handlers::scorecard))
        .route("/api/progress", get(handlers::list_progress))
        .route("/api/progress/analyze", post(handlers::analyze_progress))
        .route("/api/alerts", get(handlers::alerts))
        .route("/api/geopolitical", get(handlers::geopolitical))
        .route("/api/report/pdf", get(handlers::report_pdf))
        .layer(axum::middleware::from_fn(request_tracing::trace_requests))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until `shutdown` resolves, then drain in-flight requests.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
