pub mod config;
pub mod db;
pub mod error;
pub mod estimations;
pub mod extract;
pub mod prediction;
mod utils;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use clap::{Parser, Subcommand};
use log::{info, warn};
use serde_json::{json, Value};

use config::ServerConfig;
use db::Database;
use estimations::handlers::{delete_estimation, get_estimation, list_estimations, save_estimation};
use prediction::{handlers::estimate_handler, ModelRegistry};

/// Shared by every request. Both members are cheap to clone and read-only
/// from the handlers' point of view.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub models: ModelRegistry,
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let (status, models) = match state.models.models() {
        Ok(_) => ("ok", "ready".to_string()),
        Err(err) => ("degraded", err.to_string()),
    };
    Json(json!({ "status": status, "models": models }))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/estimate/", post(estimate_handler))
        .route("/api/save-estimation/", post(save_estimation))
        .route("/api/estimations", get(list_estimations))
        .route(
            "/api/estimations/:id",
            get(get_estimation).delete(delete_estimation),
        )
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {err}");
    }
    info!("Shutdown requested");
}

async fn serve(bind_addr: String, state: AppState) -> Result<()> {
    if !state.models.is_ready() {
        warn!("Serving without models; /api/estimate/ will answer 503");
    }

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!("Listening on {bind_addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

/// House program and floor-plan estimation service
#[derive(Parser, Debug)]
#[command(name = "estimator")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Serve the HTTP API (default)
    Serve,

    /// Create a user and print its bearer token
    CreateUser {
        /// Name of the new account
        username: String,
    },
}

/// Entry point for the binary.
pub fn run(cli: Cli) -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::load()?;
    let runtime = tokio::runtime::Runtime::new().context("failed to create runtime")?;

    // The database worker is started and joined outside the runtime; its
    // constructor and drop both block.
    let database = Database::new(config.database_path.clone())?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            info!("Estimator starting up...");
            let state = AppState {
                db: database.clone(),
                models: ModelRegistry::load(&config.model_dir),
            };
            runtime.block_on(serve(config.bind_addr, state))
        }
        Commands::CreateUser { username } => {
            let provisioned = runtime.block_on(database.create_user(username))?;
            info!("Created user {}", provisioned.user.username);
            println!("{}", provisioned.api_token);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{
            header::{AUTHORIZATION, CONTENT_TYPE},
            Method, Request, StatusCode,
        },
    };
    use tower::ServiceExt;

    use crate::prediction::registry::fixtures;

    struct Harness {
        app: Router,
        owner_token: String,
        other_token: String,
    }

    async fn harness(models: ModelRegistry) -> Harness {
        let db = Database::in_memory().unwrap();
        let owner_token = db.create_user("owner".into()).await.unwrap().api_token;
        let other_token = db.create_user("other".into()).await.unwrap().api_token;

        Harness {
            app: router(AppState { db, models }),
            owner_token,
            other_token,
        }
    }

    async fn ready_harness() -> Harness {
        harness(ModelRegistry::ready(fixtures::models())).await
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<String>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn estimate_body() -> String {
        json!({
            "m2_terreno": 120,
            "cantidad_personas": 4,
            "orientacion": 2,
            "forma_terreno": "cuadrado"
        })
        .to_string()
    }

    fn save_body(project_name: &str) -> String {
        json!({
            "project_name": project_name,
            "m2_terreno": 120,
            "cantidad_personas": 4,
            "orientacion": 2,
            "forma_terreno": "cuadrado",
            "cantidad_dormitorio": 3,
            "cantidad_bano": 1,
            "m2_cocina": 8.3,
            "m2_estar_comedor": 22.5,
            "m2_dormitorios_total": 31.0,
            "m2_banos_total": 10.0,
            "costo_estimado": 45230.7,
            "tiempo_meses": 5.6,
            "layout_key": "plano_cuadrado"
        })
        .to_string()
    }

    #[tokio::test]
    async fn estimate_returns_formatted_program() {
        let h = ready_harness().await;

        let (status, body) = send(
            &h.app,
            Method::POST,
            "/api/estimate/",
            Some(h.owner_token.as_str()),
            Some(estimate_body()),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cantidad_dormitorio"], 3);
        assert_eq!(body["cantidad_bano"], 1);
        assert_eq!(body["m2_cocina"], 8.3);
        assert_eq!(body["m2_estar_comedor"], 22.5);
        assert_eq!(body["costo_estimado"], 45230.7);
        assert_eq!(body["tiempo_meses"], 5.6);
        assert_eq!(body["url_plano_sugerido"], "estimator/plano_cuadrado.jpg");
        assert_eq!(body["layout_key"], "plano_cuadrado");
    }

    #[tokio::test]
    async fn missing_shape_is_a_client_error_naming_it() {
        let h = ready_harness().await;
        let body = json!({ "m2_terreno": 120, "cantidad_personas": 4, "orientacion": 2 });

        let (status, body) = send(
            &h.app,
            Method::POST,
            "/api/estimate/",
            Some(h.owner_token.as_str()),
            Some(body.to_string()),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("forma_terreno"));
    }

    #[tokio::test]
    async fn malformed_json_is_a_client_error() {
        let h = ready_harness().await;

        let (status, body) = send(
            &h.app,
            Method::POST,
            "/api/estimate/",
            Some(h.owner_token.as_str()),
            Some("{\"m2_terreno\": ".into()),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("malformed JSON"));
    }

    #[tokio::test]
    async fn requests_without_a_valid_token_are_rejected() {
        let h = ready_harness().await;

        let (status, _) = send(&h.app, Method::POST, "/api/estimate/", None, Some(estimate_body())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(
            &h.app,
            Method::GET,
            "/api/estimations",
            Some("forged"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unavailable_models_answer_service_unavailable() {
        let h = harness(ModelRegistry::Unavailable {
            reason: "failed to read model artifact models/model_program.json".into(),
        })
        .await;

        let (status, body) = send(
            &h.app,
            Method::POST,
            "/api/estimate/",
            Some(h.owner_token.as_str()),
            Some("not json".into()),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].as_str().unwrap().contains("model_program.json"));

        let (status, health) = send(&h.app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(health["status"], "degraded");
    }

    #[tokio::test]
    async fn health_reports_ready_models() {
        let h = ready_harness().await;
        let (_, health) = send(&h.app, Method::GET, "/health", None, None).await;
        assert_eq!(health, json!({ "status": "ok", "models": "ready" }));
    }

    #[tokio::test]
    async fn saved_estimations_are_private_to_their_owner() {
        let h = ready_harness().await;

        let (status, first) = send(
            &h.app,
            Method::POST,
            "/api/save-estimation/",
            Some(h.owner_token.as_str()),
            Some(save_body("Casa Norte")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["success"], true);
        let first_id = first["estimation_id"].as_i64().unwrap();

        let (_, second) = send(
            &h.app,
            Method::POST,
            "/api/save-estimation/",
            Some(h.owner_token.as_str()),
            Some(save_body("Casa Norte")),
        )
        .await;
        assert_ne!(second["estimation_id"].as_i64().unwrap(), first_id);

        let uri = format!("/api/estimations/{first_id}");
        let (status, _) = send(&h.app, Method::GET, &uri, Some(h.other_token.as_str()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&h.app, Method::DELETE, &uri, Some(h.other_token.as_str()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (_, others) = send(&h.app, Method::GET, "/api/estimations", Some(h.other_token.as_str()), None).await;
        assert_eq!(others, json!([]));

        let (status, detail) = send(&h.app, Method::GET, &uri, Some(h.owner_token.as_str()), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["project_name"], "Casa Norte");
        assert_eq!(detail["costo_estimado"], 45230.7);
        assert_eq!(detail["url_plano_sugerido"], "estimator/plano_cuadrado.jpg");

        let (status, _) = send(&h.app, Method::DELETE, &uri, Some(h.owner_token.as_str()), None).await;
        assert_eq!(status, StatusCode::OK);
        let (_, mine) = send(&h.app, Method::GET, "/api/estimations", Some(h.owner_token.as_str()), None).await;
        assert_eq!(mine.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn save_without_layout_key_names_the_field() {
        let h = ready_harness().await;
        let mut body: Value = serde_json::from_str(&save_body("Sin plano")).unwrap();
        body.as_object_mut().unwrap().remove("layout_key");

        let (status, response) = send(
            &h.app,
            Method::POST,
            "/api/save-estimation/",
            Some(h.owner_token.as_str()),
            Some(body.to_string()),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"], "missing field: layout_key");
    }

    #[tokio::test]
    async fn estimate_inputs_can_be_saved_as_sent() {
        let h = ready_harness().await;
        let inputs = json!({
            "m2_terreno": "120",
            "cantidad_personas": "4",
            "orientacion": "2",
            "forma_terreno": "cuadrado"
        });

        let (status, mut result) = send(
            &h.app,
            Method::POST,
            "/api/estimate/",
            Some(h.owner_token.as_str()),
            Some(inputs.to_string()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let body = result.as_object_mut().unwrap();
        body.extend(inputs.as_object().unwrap().clone());
        body.insert("project_name".into(), json!("Casa Centro"));

        let (status, saved) = send(
            &h.app,
            Method::POST,
            "/api/save-estimation/",
            Some(h.owner_token.as_str()),
            Some(result.to_string()),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{saved}");

        let uri = format!("/api/estimations/{}", saved["estimation_id"]);
        let (_, detail) = send(&h.app, Method::GET, &uri, Some(h.owner_token.as_str()), None).await;
        assert_eq!(detail["cantidad_personas"], 4);
        assert_eq!(detail["orientacion"], 2);
        assert_eq!(detail["m2_terreno"], 120.0);
    }

    #[tokio::test]
    async fn non_numeric_ids_get_a_json_error() {
        let h = ready_harness().await;

        for method in [Method::GET, Method::DELETE] {
            let (status, body) = send(
                &h.app,
                method,
                "/api/estimations/abc",
                Some(h.owner_token.as_str()),
                None,
            )
            .await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(body["error"].as_str().unwrap().contains("abc"), "{body}");
        }
    }

    #[test]
    fn cli_defaults_to_serve() {
        let cli = Cli::try_parse_from(["estimator"]).unwrap();
        assert_eq!(cli.command, None);

        let cli = Cli::try_parse_from(["estimator", "serve"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Serve));
    }

    #[test]
    fn cli_parses_create_user() {
        let cli = Cli::try_parse_from(["estimator", "create-user", "ana"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::CreateUser {
                username: "ana".into()
            })
        );

        assert!(Cli::try_parse_from(["estimator", "create-user"]).is_err());
        assert!(Cli::try_parse_from(["estimator", "frobnicate"]).is_err());
        assert_eq!(
            Cli::try_parse_from(["estimator", "--help"]).unwrap_err().kind(),
            clap::error::ErrorKind::DisplayHelp
        );
    }
}
