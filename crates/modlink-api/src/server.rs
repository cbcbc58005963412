// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! API server construction and serving.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use modlink_core::{BridgeError, BridgeResult};
use modlink_engine::Engine;

use crate::handlers;

/// The HTTP admin server.
pub struct ApiServer {
    engine: Arc<Engine>,
    port: u16,
}

impl ApiServer {
    /// Creates a server over the engine on the given port.
    pub fn new(engine: Arc<Engine>, port: u16) -> Self {
        Self { engine, port }
    }

    /// Builds the router with all admin routes and middleware.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/api/devices", get(handlers::list_devices).post(handlers::add_device))
            .route("/api/devices/{id}", delete(handlers::remove_device))
            .route("/api/values", get(handlers::list_values))
            .route("/api/connections", get(handlers::list_connections))
            .route("/api/write", post(handlers::write_tag))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .with_state(self.engine.clone())
    }

    /// Runs the server until the shutdown future resolves.
    pub async fn run_with_shutdown(
        self,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> BridgeResult<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let router = self.router();

        info!(%addr, "HTTP admin server starting");
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| BridgeError::internal(format!("cannot bind HTTP port {}: {}", self.port, e)))?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| BridgeError::internal(format!("HTTP server error: {}", e)))?;

        info!("HTTP admin server stopped");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use modlink_config::{DeviceCatalog, Settings};
    use modlink_core::{DeviceValues, NullAddressSpace, TagStore};
    use modlink_modbus::{ClientOptions, ClientPool, ConnectionRegistry, ModemRouteTable};

    fn test_server() -> (ApiServer, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.catalog_path = dir.path().join("devices.json");
        let catalog = DeviceCatalog::new(&settings.catalog_path);

        let engine = Engine::new(
            settings,
            catalog,
            Arc::new(TagStore::new()),
            Arc::new(ClientPool::new(ClientOptions::default())),
            Arc::new(ModemRouteTable::new()),
            Arc::new(ConnectionRegistry::new()),
            Arc::new(NullAddressSpace),
        );
        (ApiServer::new(engine, 0), dir)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn empty_listings() {
        let (server, _dir) = test_server();
        let router = server.router();

        let response = router
            .clone()
            .oneshot(Request::get("/api/devices").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!([]));

        let response = router
            .clone()
            .oneshot(Request::get("/api/values").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let values: BTreeMap<String, DeviceValues> =
            serde_json::from_value(body_json(response).await).unwrap();
        assert!(values.is_empty());

        let response = router
            .oneshot(Request::get("/api/connections").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await, serde_json::json!([]));
    }

    #[tokio::test]
    async fn add_list_and_remove_device() {
        let (server, _dir) = test_server();
        let router = server.router();

        let body = serde_json::json!({
            "name": "meter",
            "type": "tcp-modem",
            "port": 8000,
            "deviceId": 7,
            "tags": [
                {"name": "x", "address": 10, "registerType": "holding", "dataType": "uint16"}
            ]
        });
        let response = router
            .clone()
            .oneshot(
                Request::post("/api/devices")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let added = body_json(response).await;
        let id = added["id"].as_str().unwrap().to_string();
        assert!(!id.is_empty());

        let response = router
            .clone()
            .oneshot(Request::get("/api/devices").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let listed = body_json(response).await;
        assert_eq!(listed[0]["name"], "meter");
        assert_eq!(listed[0]["connected"], false);

        let response = router
            .clone()
            .oneshot(
                Request::delete(format!("/api/devices/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(
                Request::delete(format!("/api/devices/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_device_is_bad_request() {
        let (server, _dir) = test_server();
        let router = server.router();

        // Modem port outside the listener range.
        let body = serde_json::json!({
            "name": "meter",
            "type": "tcp-modem",
            "port": 7000,
            "tags": [
                {"name": "x", "address": 10, "registerType": "holding", "dataType": "uint16"}
            ]
        });
        let response = router
            .oneshot(
                Request::post("/api/devices")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "validation");
    }

    #[tokio::test]
    async fn write_to_unknown_device_is_not_found() {
        let (server, _dir) = test_server();
        let router = server.router();

        let body = serde_json::json!({"deviceId": "ghost", "tagName": "t", "value": 1});
        let response = router
            .oneshot(
                Request::post("/api/write")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn write_to_modem_is_rejected() {
        let (server, _dir) = test_server();
        let router = server.router();

        let body = serde_json::json!({
            "id": "m1",
            "name": "meter",
            "type": "tcp-modem",
            "port": 8000,
            "tags": [
                {"name": "x", "address": 10, "registerType": "holding", "dataType": "uint16"}
            ]
        });
        router
            .clone()
            .oneshot(
                Request::post("/api/devices")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let body = serde_json::json!({"deviceId": "m1", "tagName": "x", "value": 1});
        let response = router
            .oneshot(
                Request::post("/api/write")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "not-writable");
    }
}
