//! HTTP API endpoints.
//!
//! Read-only room lookups, used by clients to check a code before joining.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::state::AppState;

/// Look up a room by code.
///
/// GET /api/rooms/{code}
///
/// Returns the room's phase and roster, or 404 if no such room is open.
pub async fn room_info(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Response {
    match state.room_info(&code).await {
        Some(info) => Json(info).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "code": "ROOM_NOT_FOUND",
                "msg": format!("Room {} not found", code),
            })),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, routing::get, Router};
    use tower::ServiceExt;

    fn app(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/api/rooms/{code}", get(room_info))
            .with_state(state)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_room_info() {
        let state = Arc::new(AppState::new());
        let (code, _rx) = state.create_session(&"host".to_string()).await.unwrap();
        state
            .join_session(&code, "Ann", &"a".to_string())
            .await
            .unwrap();

        let (status, body) = get_json(app(state), &format!("/api/rooms/{}", code)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], code.as_str());
        assert_eq!(body["phase"], "ANSWERING");
        assert_eq!(body["started"], false);
        assert_eq!(body["players"], serde_json::json!(["Ann"]));
    }

    #[tokio::test]
    async fn test_unknown_room() {
        let state = Arc::new(AppState::new());
        let (status, body) = get_json(app(state), "/api/rooms/ZZZZ").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "ROOM_NOT_FOUND");
    }
}
