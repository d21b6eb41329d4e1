//! FormGuide gateway: HTTP surface for the guided form-filling assistant.
//! Schema, sessions, submissions and per-field AI guidance under `/api/*`.

mod handlers;

use axum::{
    body::Body,
    http::Request,
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use formguide_core::{FormGuide, GatewayConfig};
use handlers::AppState;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Failed to read .env: {e}");
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = GatewayConfig::load()?;
    let guide = Arc::new(FormGuide::from_config(&config)?);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(
        "FormGuide gateway v{} listening on {}",
        formguide_core::version(),
        config.bind_addr()
    );

    axum::serve(listener, app(guide)).await?;
    Ok(())
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/scheme", get(handlers::scheme))
        .route("/api/create_session", get(handlers::create_session))
        .route("/api/submit_form", post(handlers::submit_form))
        .route("/api/get_form_data", get(handlers::get_form_data))
        .route("/api/gpt_helper", get(handlers::gpt_helper))
        .with_state(state)
        .layer(axum::middleware::from_fn(log_request))
        .layer(CorsLayer::permissive())
}

async fn log_request(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(request).await;
    tracing::info!(
        %method,
        %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request served"
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use formguide_core::{
        AssistConfig, Generation, GenerationError, GenerationRequest, Generator, MockGenerator,
        SchemaRegistry,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_app() -> Router {
        app(Arc::new(FormGuide::new(
            SchemaRegistry::builtin(),
            Arc::new(MockGenerator::new()),
            AssistConfig::default(),
        )))
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, String) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn new_session(app: &Router) -> String {
        let (status, body) = send(app, get_req("/api/create_session")).await;
        assert_eq!(status, StatusCode::OK);
        let v: Value = serde_json::from_str(&body).unwrap();
        v["session_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app();
        assert_eq!(send(&app, get_req("/health")).await, (StatusCode::OK, "OK".to_string()));
    }

    #[tokio::test]
    async fn test_scheme_lists_fields_in_order() {
        let app = test_app();
        let (status, body) = send(&app, get_req("/api/scheme")).await;
        assert_eq!(status, StatusCode::OK);
        let v: Value = serde_json::from_str(&body).unwrap();
        let obj = v.as_object().unwrap();
        assert_eq!(obj.len(), 12);
        assert_eq!(obj.keys().next().unwrap(), "name");
        assert_eq!(v["age"], json!({"type": "integer", "question": "What is your age?"}));
    }

    #[tokio::test]
    async fn test_create_session_ids_differ() {
        let app = test_app();
        let a = new_session(&app).await;
        let b = new_session(&app).await;
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_submit_then_get_round_trip() {
        let app = test_app();
        let id = new_session(&app).await;
        let (status, body) =
            send(&app, post_json(&format!("/api/submit_form?session_id={id}"), r#"{"name":"Ada"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_str::<Value>(&body).unwrap(), json!({"name": "Ada"}));

        let (status, body) = send(&app, get_req(&format!("/api/get_form_data?session_id={id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_str::<Value>(&body).unwrap(), json!({"name": "Ada"}));
    }

    #[tokio::test]
    async fn test_submit_rejections() {
        let app = test_app();
        let (status, _) = send(&app, post_json("/api/submit_form?session_id=ghost", r#"{"name":"Ada"}"#)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let id = new_session(&app).await;
        let uri = format!("/api/submit_form?session_id={id}");
        let (status, body) = send(&app, post_json(&uri, "")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(serde_json::from_str::<Value>(&body).unwrap(), json!({"error": "Form data is required"}));

        let (status, _) = send(&app, post_json(&uri, r#"{"age":"old"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_form_data_distinguishes_missing_session_and_missing_data() {
        let app = test_app();
        let (status, unknown) = send(&app, get_req("/api/get_form_data?session_id=ghost")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let id = new_session(&app).await;
        let (status, empty) = send(&app, get_req(&format!("/api/get_form_data?session_id={id}"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_ne!(unknown, empty);
        assert!(empty.contains("No data found"));
    }

    #[tokio::test]
    async fn test_gpt_helper_flow() {
        let app = test_app();
        let id = new_session(&app).await;

        let (status, _) = send(&app, get_req(&format!("/api/gpt_helper?session_id={id}&field=shoe_size&first=true"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, get_req(&format!("/api/gpt_helper?session_id={id}&field=name&first=false"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, first) = send(&app, get_req(&format!("/api/gpt_helper?session_id={id}&field=name&first=True"))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!first.contains("continuing"));

        let (status, follow) = send(
            &app,
            get_req(&format!("/api/gpt_helper?session_id={id}&field=name&question=Middle%20name%3F")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(follow.contains("continuing mock_resp_1"));
        assert!(follow.ends_with("Middle name?"));
    }

    #[tokio::test]
    async fn test_gpt_helper_accepts_browser_client_query_shape() {
        let app = test_app();
        let id = new_session(&app).await;

        let (status, first) = send(
            &app,
            get_req(&format!(
                "/api/gpt_helper?session_id={id}&current_question=name&current_question=%7B%7D&first=true"
            )),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{first}");
        assert!(first.contains("What is your full name?"));

        let (status, follow) = send(
            &app,
            get_req(&format!(
                "/api/gpt_helper?session_id={id}&current_question=name&current_question=Middle%20name%3F"
            )),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(follow.contains("continuing mock_resp_1"));
        assert!(follow.ends_with("Middle name?"));
    }

    #[tokio::test]
    async fn test_repeated_question_param_uses_first_value() {
        let app = test_app();
        let id = new_session(&app).await;
        let (status, body) = send(
            &app,
            get_req(&format!("/api/gpt_helper?session_id={id}&field=age&question=one&question=two")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.ends_with("one"));
    }

    #[tokio::test]
    async fn test_gpt_helper_unknown_session() {
        let app = test_app();
        let (status, _) = send(&app, get_req("/api/gpt_helper?session_id=ghost&field=name&question=hi")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    struct Offline;

    #[async_trait]
    impl Generator for Offline {
        async fn generate(&self, _: GenerationRequest) -> Result<Generation, GenerationError> {
            Err(GenerationError::NotConfigured("offline".into()))
        }

        fn name(&self) -> &str {
            "offline"
        }
    }

    #[tokio::test]
    async fn test_generation_failure_is_bad_gateway() {
        let app = app(Arc::new(FormGuide::new(
            SchemaRegistry::builtin(),
            Arc::new(Offline),
            AssistConfig::default(),
        )));
        let id = new_session(&app).await;
        let (status, body) = send(&app, get_req(&format!("/api/gpt_helper?session_id={id}&field=name&first=true"))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.contains("Generation unavailable"));
    }
}
