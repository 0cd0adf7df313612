use axum::extract::State;
use axum::Json;

use crate::agent;
use crate::models::{ExplainRequest, FileContentRequest, SearchToolRequest, ToolResponse};
use crate::state::AppState;

/// POST /api/tools/search_code
pub async fn search_code(
    State(state): State<AppState>,
    Json(req): Json<SearchToolRequest>,
) -> Json<ToolResponse> {
    let result = agent::search_code(&state, req.query.trim(), req.max_results).await;
    Json(ToolResponse { result })
}

/// POST /api/tools/file_content
pub async fn file_content(
    State(state): State<AppState>,
    Json(req): Json<FileContentRequest>,
) -> Json<ToolResponse> {
    let catalog = state.catalog.read();
    let result = agent::get_file_content(&catalog, req.file_path.trim());
    Json(ToolResponse { result })
}

/// POST /api/tools/structure
pub async fn structure(State(state): State<AppState>) -> Json<ToolResponse> {
    let catalog = state.catalog.read();
    let result = agent::list_project_structure(&catalog);
    Json(ToolResponse { result })
}

/// POST /api/tools/explain_function
pub async fn explain_function(
    State(state): State<AppState>,
    Json(req): Json<ExplainRequest>,
) -> Json<ToolResponse> {
    let result = agent::explain_function(&state, req.name.trim()).await;
    Json(ToolResponse { result })
}

/// POST /api/tools/explain_class
pub async fn explain_class(
    State(state): State<AppState>,
    Json(req): Json<ExplainRequest>,
) -> Json<ToolResponse> {
    let result = agent::explain_class(&state, req.name.trim()).await;
    Json(ToolResponse { result })
}
