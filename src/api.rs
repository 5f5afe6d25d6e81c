use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::Router;
use snafu::ResultExt as _;
use tower_http::trace::TraceLayer;

use crate::error::{ApplicationError, BindAddressSnafu, WebServerSnafu};
use crate::store::RecordStore;

mod error;
mod state;
mod views;

pub use error::*;
pub use state::*;

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

pub fn create_router<S>(app: App<S>) -> Router
where
    S: RecordStore + 'static,
{
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/views", post(views::record::<S>))
        .route("/views/amount", get(views::amount::<S>))
        .route("/views/resources", get(views::viewed_resources::<S>))
        .route("/views/one", get(views::one::<S>))
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}

pub async fn serve(app: App, address: SocketAddr) -> std::result::Result<(), ApplicationError> {
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .context(BindAddressSnafu { address })?;

    tracing::info!(%address, "listening for view events");
    axum::serve(listener, create_router(app))
        .await
        .context(WebServerSnafu)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::json;

    use super::*;
    use crate::database::{Database, DatabaseConfig};
    use crate::model::{ResourceType, ViewRecord};
    use crate::store::OfflineStore;
    use crate::time::DebounceWindow;

    async fn server() -> TestServer {
        let database = Database::connect(&DatabaseConfig::memory()).await.unwrap();
        let app = create_app(database, DebounceWindow::default());
        TestServer::new(create_router(app)).unwrap()
    }

    async fn view(server: &TestServer, resource: &str, resource_type: &str, user: &str) {
        server
            .post("/views")
            .json(&json!({ "resource": resource, "resourceType": resource_type, "user": user }))
            .await
            .assert_status(StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn health_check() {
        let server = server().await;
        server.get("/health").await.assert_text("ok");
    }

    #[tokio::test]
    async fn record_then_fetch_one() {
        let server = server().await;
        view(&server, "abc", "VIDEO", "user@domain").await;
        view(&server, "abc", "VIDEO", "user@domain").await;

        let response = server
            .get("/views/one")
            .add_query_param("resource", "abc")
            .add_query_param("user", "user@domain")
            .await;
        response.assert_status_ok();

        let record: ViewRecord = response.json();
        assert_eq!(record.amount, 1, "second view inside the window is debounced");
        assert_eq!(record.resource_type, ResourceType::Video);
    }

    #[tokio::test]
    async fn missing_view_is_not_found() {
        let server = server().await;

        let response = server
            .get("/views/one")
            .add_query_param("resource", "abc")
            .add_query_param("user", "nobody")
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.json::<serde_json::Value>()["error"], "view_not_found");
    }

    #[tokio::test]
    async fn invalid_views_are_rejected() {
        let server = server().await;

        let response = server
            .post("/views")
            .json(&json!({ "resource": "abc", "resourceType": "PLAYLIST", "user": "1@1" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<serde_json::Value>()["error"], "invalid_view");

        let response = server
            .post("/views")
            .json(&json!({ "resource": "", "resourceType": "VIDEO", "user": "1@1" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn storage_outage_is_unavailable() {
        let store = OfflineStore::default();
        let app = App::with_store(store.clone(), DebounceWindow::default());
        let server = TestServer::new(create_router(app)).unwrap();

        let response = server
            .post("/views")
            .json(&json!({ "resource": "abc", "resourceType": "VIDEO", "user": "1@1" }))
            .await;
        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.json::<serde_json::Value>()["error"], "unavailable");
        assert_eq!(store.attempts(), 1);

        server
            .get("/views/amount")
            .add_query_param("resource", "abc")
            .await
            .assert_status(StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn amount_and_viewed_resources() {
        let server = server().await;
        view(&server, "1", "VIDEO", "1@1").await;
        view(&server, "1", "VIDEO", "2@2").await;
        view(&server, "abc", "CHANNEL", "1@1").await;
        view(&server, "abc", "VIDEO", "2@2").await;

        let amount: u64 = server
            .get("/views/amount")
            .add_query_param("resource", "1")
            .add_query_param("resource", "abc")
            .await
            .json();
        assert_eq!(amount, 4);

        let amount: u64 = server.get("/views/amount").await.json();
        assert_eq!(amount, 0, "no resources means no views");

        let resources: Vec<String> = server
            .get("/views/resources")
            .add_query_param("user", "1@1")
            .add_query_param("resourceType", "VIDEO")
            .await
            .json();
        assert_eq!(resources, vec!["1".to_string()]);
    }
}
