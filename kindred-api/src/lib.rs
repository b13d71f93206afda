use axum::routing::{get, post, put};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod config;
pub mod models;
pub mod routes;
pub mod schema;
pub mod services;
pub mod store;

#[cfg(test)]
mod test_support;

use config::AppConfig;
use store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: AppConfig,
    /// Set when the Prometheus recorder is installed; `/metrics` is 404 otherwise.
    pub metrics: Option<PrometheusHandle>,
}

pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/users", post(routes::users::create_user))
        .route("/users/:id", get(routes::users::get_user))
        .route("/users/:id/reports", get(routes::moderation::list_reports))
        .route("/profiles", post(routes::profiles::create_profile).get(routes::profiles::list_profiles))
        .route("/profiles/search", get(routes::profiles::search_profiles))
        .route("/profiles/user/:user_id", get(routes::profiles::get_profile_by_user))
        .route("/profiles/:id", put(routes::profiles::update_profile))
        .route("/likes", post(routes::likes::send_like))
        .route("/likes/:user_id", get(routes::likes::list_likes))
        .route("/matches/:user_id", get(routes::matches::list_matches))
        .route("/messages", post(routes::messages::send_message))
        .route("/messages/:id/read", put(routes::messages::mark_read))
        .route("/messages/:id/:other_id", get(routes::messages::list_messages_between))
        .route("/conversations/:user_id", get(routes::messages::list_conversations))
        .route("/conversations/:user_id/summary", get(routes::messages::conversation_summary))
        .route("/blocks", post(routes::moderation::block_user))
        .route("/blocks/:user_id", get(routes::moderation::list_blocks))
        .route("/reports", post(routes::moderation::report_user))
        .route("/reports/:id/status", put(routes::moderation::update_report_status));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        .nest("/api", api)
        .route_layer(axum::middleware::from_fn(kindred_shared::middleware::metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        router(Arc::new(AppState {
            store: Arc::new(MemoryStore::new()),
            config: AppConfig::default(),
            metrics: None,
        }))
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn member(app: &Router, name: &str) -> i64 {
        let (status, body) = call(
            app,
            Method::POST,
            "/api/users",
            Some(json!({
                "username": name,
                "email": format!("{name}@example.com"),
                "password": "hunter2hunter2",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let id = body["data"]["id"].as_i64().unwrap();

        let (status, body) = call(
            app,
            Method::POST,
            "/api/profiles",
            Some(json!({
                "user_id": id,
                "name": name,
                "age": 31,
                "location": "Leeds",
                "bio": "Hello there",
                "interests": ["hiking"],
                "communication_preferences": ["text"],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        id
    }

    #[tokio::test]
    async fn health_reports_store_check() {
        let (status, body) = call(&app(), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["checks"][0]["name"], "store");
    }

    #[tokio::test]
    async fn metrics_endpoint_is_absent_without_recorder() {
        let (status, _) = call(&app(), Method::GET, "/metrics", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn password_hash_is_never_returned() {
        let app = app();
        let id = member(&app, "dana").await;
        let (status, body) = call(&app, Method::GET, &format!("/api/users/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["username"], "dana");
        assert!(body["data"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn mutual_likes_match_over_http() {
        let app = app();
        let alice = member(&app, "alice").await;
        let bob = member(&app, "bob").await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/likes",
            Some(json!({ "sender_id": alice, "receiver_id": bob })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["match"].is_null());

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/likes",
            Some(json!({ "sender_id": bob, "receiver_id": alice })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["match"]["user_id_1"], bob);

        for user in [alice, bob] {
            let (status, body) = call(&app, Method::GET, &format!("/api/matches/{user}"), None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["data"].as_array().unwrap().len(), 1);
            assert_eq!(body["data"][0]["profile1"]["user"]["id"], bob);
        }
    }

    #[tokio::test]
    async fn duplicate_like_is_conflict() {
        let app = app();
        let a = member(&app, "ann").await;
        let b = member(&app, "bea").await;
        let like = json!({ "sender_id": a, "receiver_id": b });

        call(&app, Method::POST, "/api/likes", Some(like.clone())).await;
        let (status, body) = call(&app, Method::POST, "/api/likes", Some(like)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "E2001");
    }

    #[tokio::test]
    async fn messaging_round_trip_and_summary() {
        let app = app();
        let u = member(&app, "uma").await;
        let v = member(&app, "vic").await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/messages",
            Some(json!({ "sender_id": v, "receiver_id": u, "content": "hey!" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["message_type"], "text");
        let message_id = body["data"]["id"].as_i64().unwrap();

        let (_, body) = call(&app, Method::GET, &format!("/api/conversations/{u}/summary"), None).await;
        assert_eq!(body["data"][0]["user_id"], v);
        assert_eq!(body["data"][0]["unread_count"], 1);

        let (status, body) = call(&app, Method::PUT, &format!("/api/messages/{message_id}/read"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["updated"], true);

        let (_, body) = call(&app, Method::GET, &format!("/api/messages/{u}/{v}"), None).await;
        assert_eq!(body["data"][0]["is_read"], true);
        assert_eq!(body["data"][0]["sender"]["username"], "vic");
    }

    #[tokio::test]
    async fn malformed_input_uses_the_error_envelope() {
        let app = app();

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/likes",
            Some(json!({ "sender_id": "abc", "receiver_id": 2 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "E0002");
        assert!(body["error"]["details"]["reason"].is_string());

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/messages",
            Some(json!({ "sender_id": 1, "receiver_id": 2 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "E0002");

        let (status, body) = call(&app, Method::GET, "/api/matches/notanumber", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "E0002");
        assert_eq!(body["error"]["message"], "invalid request path");

        let (status, body) = call(&app, Method::GET, "/api/profiles?exclude_user_id=me", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "invalid request query");
    }

    #[tokio::test]
    async fn mark_read_of_unknown_message_is_ok() {
        let (status, body) = call(&app(), Method::PUT, "/api/messages/999/read", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["updated"], false);
    }

    #[tokio::test]
    async fn unknown_message_type_is_rejected() {
        let app = app();
        let u = member(&app, "uma").await;
        let v = member(&app, "vic").await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/messages",
            Some(json!({ "sender_id": u, "receiver_id": v, "content": "hi", "message_type": "fax" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "E3002");
    }

    #[tokio::test]
    async fn block_then_message_is_forbidden() {
        let app = app();
        let u = member(&app, "uma").await;
        let v = member(&app, "vic").await;

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/blocks",
            Some(json!({ "blocker_id": u, "blocked_id": v })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/messages",
            Some(json!({ "sender_id": v, "receiver_id": u, "content": "hi" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "E4001");
    }

    #[tokio::test]
    async fn report_status_moves_forward() {
        let app = app();
        let a = member(&app, "ann").await;
        let b = member(&app, "bea").await;

        let (_, body) = call(
            &app,
            Method::POST,
            "/api/reports",
            Some(json!({ "reporter_id": a, "reported_id": b, "reason": "spam" })),
        )
        .await;
        let id = body["data"]["id"].as_i64().unwrap();
        assert_eq!(body["data"]["status"], "pending");

        let uri = format!("/api/reports/{id}/status");
        let (status, body) = call(&app, Method::PUT, &uri, Some(json!({ "status": "resolved" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "resolved");

        let (status, _) = call(&app, Method::PUT, &uri, Some(json!({ "status": "reviewed" }))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, body) = call(&app, Method::GET, &format!("/api/users/{a}/reports"), None).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn profile_search_excludes_viewer() {
        let app = app();
        let alice = member(&app, "alice").await;
        let bob = member(&app, "bob").await;

        let (status, body) = call(
            &app,
            Method::GET,
            &format!("/api/profiles/search?q=leeds&exclude_user_id={alice}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<_> = body["data"].as_array().unwrap().iter().map(|p| p["user"]["id"].clone()).collect();
        assert_eq!(ids, vec![json!(bob)]);
    }
}
