use super::{ApiResponse, AppState, ErrorBody};
use crate::client::{Expense, ProcessRequest, ProcessResponse};
use crate::encoder::EncodedImage;
use crate::ledger::tally;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use futures::future::join_all;

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
pub async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// POST /process-bills - Extract and categorize every submitted bill
pub async fn process_bills(
    State(state): State<AppState>,
    payload: Result<Json<ProcessRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            tracing::warn!("Rejected request body: {}", rejection.body_text());
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody {
                    error: rejection.body_text(),
                }),
            )
                .into_response();
        }
    };

    tracing::info!("Processing {} bill image(s)", request.images.len());

    let per_image = join_all(
        request
            .images
            .iter()
            .enumerate()
            .map(|(index, image)| extract_one(&state, index, image)),
    )
    .await;

    let raw_expenses: Vec<Expense> = per_image.into_iter().flatten().collect();
    let category_totals = tally(&raw_expenses);

    tracing::info!(
        "Extracted {} expense(s), total {:.2}",
        raw_expenses.len(),
        category_totals.total()
    );

    (
        StatusCode::OK,
        Json(ProcessResponse {
            category_totals,
            raw_expenses,
            processed_at: Some(Utc::now()),
        }),
    )
        .into_response()
}

/// A bill that can't be read contributes nothing; the rest of the batch goes on
async fn extract_one(state: &AppState, index: usize, image: &EncodedImage) -> Vec<Expense> {
    match state.extractor.extract(image).await {
        Ok(expenses) => expenses,
        Err(e) => {
            tracing::warn!("Error processing image {}: {}", index, e);
            Vec::new()
        }
    }
}
