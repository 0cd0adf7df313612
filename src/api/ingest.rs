use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use std::path::PathBuf;

use crate::ingest::run_ingest;
use crate::models::{IngestRequest, IngestStatus};
use crate::state::AppState;

/// POST /api/ingest - Index a directory or zip archive (runs in the background)
pub async fn ingest(
    State(state): State<AppState>,
    Json(req): Json<IngestRequest>,
) -> Result<(StatusCode, Json<IngestStatus>), (StatusCode, String)> {
    let path = req.path.trim().to_string();
    if path.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Path is required".to_string()));
    }

    let root = PathBuf::from(&path);
    if !root.exists() {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Path not found: {path}"),
        ));
    }

    // Only one ingestion run at a time
    {
        let status = state.ingest_status.read();
        if matches!(
            *status,
            IngestStatus::Collecting | IngestStatus::Summarizing { .. }
        ) {
            return Err((
                StatusCode::CONFLICT,
                "An ingestion run is already in progress".to_string(),
            ));
        }
    }

    state.set_ingest_status(IngestStatus::Collecting);

    let state_clone = state.clone();
    tokio::spawn(async move {
        let err_state = state_clone.clone();
        if let Err(e) = run_ingest(state_clone, root).await {
            tracing::error!("Ingestion failed for {path}: {e:#}");
            err_state.set_ingest_status(IngestStatus::Error {
                message: format!("{e:#}"),
            });
        }
    });

    let status = state.ingest_status.read().clone();
    Ok((StatusCode::ACCEPTED, Json(status)))
}

/// GET /api/status - Current ingestion status
pub async fn status(State(state): State<AppState>) -> Json<IngestStatus> {
    Json(state.ingest_status.read().clone())
}
