use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::common::response::{ApiError, ApiResponse, ApiSuccess};
use crate::error::EncoderError;
use crate::state::AppState;

/// Get video by ID
pub async fn get_video(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match state.videos.find(id).await {
        Ok(video) => ApiSuccess(
            ApiResponse::success(video, "Video retrieved successfully"),
            StatusCode::OK,
        )
        .into_response(),
        Err(e @ EncoderError::NotFound(_)) => {
            ApiError(e.to_string(), StatusCode::NOT_FOUND).into_response()
        }
        Err(e) => ApiError(e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}
