use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracker_core::report::REPORT_FILENAME;
use tracker_core::{AlertStatus, GeopoliticalArticle, Prediction, ProgressEntry, Scorecard};

use crate::AppState;
use crate::error::AppError;

pub(crate) const SCORING_COMPLETE: &str = "Scoring complete";

#[derive(Debug, Serialize)]
pub(crate) struct PredictionsResponse {
    predictions: Vec<Prediction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProgressResponse {
    items: Vec<ProgressEntry>,
}

#[derive(Debug, Serialize)]
pub(crate) struct FeedResponse {
    articles: Vec<GeopoliticalArticle>,
}

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

pub(crate) async fn list_predictions(State(state): State<AppState>) -> Json<PredictionsResponse> {
    Json(PredictionsResponse {
        predictions: state.tracker.predictions().await,
        message: None,
    })
}

pub(crate) async fn score_predictions(
    State(state): State<AppState>,
) -> Json<PredictionsResponse> {
    Json(PredictionsResponse {
        predictions: state.tracker.score_predictions().await,
        message: Some(SCORING_COMPLETE),
    })
}

pub(crate) async fn scorecard(State(state): State<AppState>) -> Json<Scorecard> {
    Json(state.tracker.scorecard().await)
}

pub(crate) async fn list_progress(State(state): State<AppState>) -> Json<ProgressResponse> {
    Json(ProgressResponse {
        items: state.tracker.progress().await,
    })
}

pub(crate) async fn analyze_progress(State(state): State<AppState>) -> Json<ProgressResponse> {
    Json(ProgressResponse {
        items: state.tracker.analyze_progress().await,
    })
}

pub(crate) async fn alerts(State(state): State<AppState>) -> Json<AlertStatus> {
    Json(state.tracker.alerts().await)
}

pub(crate) async fn geopolitical(State(state): State<AppState>) -> Json<FeedResponse> {
    Json(FeedResponse {
        articles: state.tracker.geopolitical_feed().await,
    })
}

/// Render to a temp file, read it back, and let the handle drop (deleting
/// the file) before the bytes go out.
pub(crate) async fn report_pdf(State(state): State<AppState>) -> Result<Response, AppError> {
    let file = state
        .tracker
        .report_file()
        .await
        .map_err(AppError::internal)?;
    let bytes = tokio::fs::read(file.path())
        .await
        .map_err(AppError::internal)?;
    file.close().map_err(AppError::internal)?;

    tracing::info!(bytes = bytes.len(), "report rendered");
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{REPORT_FILENAME}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}
