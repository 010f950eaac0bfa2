//! API route configuration.

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::metrics::{metrics_handler, track_requests};
use crate::state::AppState;

/// Creates the API router with all routes configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))

        // Users
        .route("/user", post(handlers::create_user).put(handlers::update_user))
        .route("/user/:id", get(handlers::get_user).delete(handlers::delete_user))

        // Observability
        .route("/cache/stats", get(handlers::cache_stats))
        .route("/metrics", get(metrics_handler))

        .route_layer(middleware::from_fn_with_state(state.clone(), track_requests))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::dto::CreateUserResponse;
    use crate::state::ApiConfig;

    fn test_state() -> Arc<AppState> {
        Arc::new(AppState::in_memory(ApiConfig::default()).unwrap())
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn read_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn alice() -> Value {
        json!({
            "name": "Alice",
            "age": 30,
            "gender": "female",
            "email": "alice@example.com"
        })
    }

    async fn create_alice(app: &Router) -> String {
        let response = send(app, json_request("POST", "/user", alice())).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let created: CreateUserResponse = serde_json::from_slice(&bytes).unwrap();
        created.id.to_string()
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = create_router(test_state());

        let response = send(&app, get_request("/health")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["status"], "ok");
    }

    #[tokio::test(start_paused = true)]
    async fn test_uptime_counts_from_state_construction() {
        let app = create_router(test_state());
        tokio::time::advance(std::time::Duration::from_secs(7)).await;

        // First health request comes well after startup.
        let response = send(&app, get_request("/health")).await;
        assert_eq!(read_json(response).await["uptime_seconds"], 7);
    }

    #[tokio::test]
    async fn test_user_lifecycle() {
        let state = test_state();
        let app = create_router(state.clone());
        let id = create_alice(&app).await;

        let response = send(&app, get_request(&format!("/user/{}", id))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let user = read_json(response).await;
        assert_eq!(user["name"], "Alice");
        assert_eq!(user["id"], id.as_str());

        let mut updated = alice();
        updated["id"] = json!(id);
        updated["age"] = json!(31);
        let response = send(&app, json_request("PUT", "/user", updated)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&app, get_request(&format!("/user/{}", id))).await;
        assert_eq!(read_json(response).await["age"], 31);

        let delete = Request::builder()
            .method("DELETE")
            .uri(format!("/user/{}", id))
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&app, delete).await.status(), StatusCode::OK);

        let response = send(&app, get_request(&format!("/user/{}", id))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(read_json(response).await["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_reads_are_served_from_cache() {
        let state = test_state();
        let app = create_router(state.clone());
        let id = create_alice(&app).await;

        for _ in 0..3 {
            let response = send(&app, get_request(&format!("/user/{}", id))).await;
            assert_eq!(response.status(), StatusCode::OK);
        }

        // Create populated the cache, so no read reached the store.
        assert_eq!(state.metrics.cache_hits(), 3);
        assert_eq!(state.metrics.cache_misses(), 0);
        assert_eq!(state.metrics.cache_size(), 1);
    }

    #[tokio::test]
    async fn test_invalid_id_is_bad_request() {
        let app = create_router(test_state());

        let response = send(&app, get_request("/user/not-a-uuid")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let app = create_router(test_state());

        let request = Request::builder()
            .method("POST")
            .uri("/user")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        assert_eq!(send(&app, request).await.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_user_is_unprocessable() {
        let app = create_router(test_state());

        let mut user = alice();
        user["age"] = json!(200);
        let response = send(&app, json_request("POST", "/user", user)).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_update_unknown_user_not_found() {
        let app = create_router(test_state());

        let mut user = alice();
        user["id"] = json!("6f1c1d7e-2a4b-4c7e-9f0a-1b2c3d4e5f60");
        let response = send(&app, json_request("PUT", "/user", user)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cache_stats() {
        let app = create_router(test_state());
        create_alice(&app).await;

        let response = send(&app, get_request("/cache/stats")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let stats = read_json(response).await;
        assert_eq!(stats["total_entries"], 1);
        assert_eq!(stats["ttl_secs"], 300);
    }

    #[tokio::test]
    async fn test_metrics_endpoint_counts_requests() {
        let app = create_router(test_state());
        send(&app, get_request("/health")).await;

        let response = send(&app, get_request("/metrics")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("endpoint=\"/health\""));
        assert!(text.contains("cache_hits_total"));
    }
}
