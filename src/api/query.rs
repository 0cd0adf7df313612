use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use std::collections::HashMap;

use crate::models::{QueryRequest, QueryResponse};
use crate::router;
use crate::state::AppState;

const MAX_RESULTS_CAP: usize = 20;

/// POST /api/query - Confidence-gated question answering
pub async fn query(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, (StatusCode, String)> {
    let query = req.query.trim().to_string();
    if query.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Query is required".to_string()));
    }

    let max_results = req.max_results.clamp(1, MAX_RESULTS_CAP);
    let response = router::answer_query(&state, &query, max_results).await;
    Ok(Json(response))
}

/// Summary collection statistics
#[derive(serde::Serialize)]
pub struct StatsResponse {
    pub total_summaries: usize,
    pub file_types: HashMap<String, usize>,
    pub languages: HashMap<String, usize>,
    pub average_complexity: f64,
    pub ai_generated: usize,
    pub most_common_queries: Vec<(String, u64)>,
    pub confidence_threshold: f32,
    pub structured_threshold: f32,
}

/// GET /api/stats - Statistics over the indexed summaries
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let records = state.store.get_all();

    let mut file_types: HashMap<String, usize> = HashMap::new();
    let mut languages: HashMap<String, usize> = HashMap::new();
    let mut complexity_total = 0u64;
    let mut ai_generated = 0usize;

    for record in &records {
        *file_types
            .entry(record.file_type.as_str().to_string())
            .or_insert(0) += 1;
        *languages.entry(record.language.clone()).or_insert(0) += 1;
        complexity_total += u64::from(record.complexity_score);
        if record.ai_generated {
            ai_generated += 1;
        }
    }

    let average_complexity = if records.is_empty() {
        0.0
    } else {
        (complexity_total as f64 / records.len() as f64 * 10.0).round() / 10.0
    };

    Json(StatsResponse {
        total_summaries: records.len(),
        file_types,
        languages,
        average_complexity,
        ai_generated,
        most_common_queries: state.query_stats.most_common(5),
        confidence_threshold: state.config.confidence_threshold,
        structured_threshold: state.config.structured_threshold,
    })
}
