use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use vitals_server::app::{AppContext, create_router};
use vitals_server::configs::Settings;
use vitals_server::services::AnalysisModel;
use vitals_server::tests::{setup_test_db, test_settings};

pub struct MockApp {
    pub router: Router,
    pub context: AppContext,
    pub settings: Settings,
}

impl MockApp {
    pub async fn new() -> Self {
        Self::with_model(None).await
    }

    pub async fn with_model(model: Option<Arc<dyn AnalysisModel>>) -> Self {
        let settings = test_settings();
        let storage = setup_test_db().await;
        let context = AppContext::new(&settings, storage, model);

        Self {
            router: create_router(&context),
            context,
            settings,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(uri)
            .method(method)
            .header("Content-Type", "application/json")
            .body(match body {
                Some(body) => Body::from(serde_json::to_string(&body).unwrap()),
                None => Body::empty(),
            })
            .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn reading_count(&self) -> i64 {
        self.context.reading_repository.count().await.unwrap()
    }
}
