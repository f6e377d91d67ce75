use std::sync::Arc;

use axum::{
  extract::{FromRequest, FromRequestParts, State},
  http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
  },
  response::IntoResponse,
  routing::get,
  Router,
};
use error::ApiError;
use serde_json::json;
use sqlx::SqlitePool;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

use handlers::{
  admin::init_admin_routes, categories::init_categories_routes, projects::init_projects_routes,
  users::init_users_routes,
};

pub mod config;
pub mod entities;
pub mod error;
mod handlers;
pub mod response;
pub mod service;

pub use config::Config;
pub use handlers::auth::Keys;

const DEVSHOWCASE_TAG: &str = "devshowcase";

/// Shared state of every handler.
#[derive(Clone)]
pub struct AppState {
  pub pool: SqlitePool,
  pub keys: Arc<Keys>,
}

impl AppState {
  pub fn new(pool: SqlitePool, keys: Keys) -> Self {
    Self {
      pool,
      keys: Arc::new(keys),
    }
  }
}

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
struct AppJson<T>(T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
struct AppPath<T>(T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
struct AppQuery<T>(T);

/// Applies the embedded schema migrations.
pub async fn migrate(pool: &SqlitePool) -> anyhow::Result<()> {
  sqlx::migrate!().run(pool).await?;
  Ok(())
}

/// Seeds the default categories and promotes the configured admin account.
pub async fn bootstrap(pool: &SqlitePool, admin_email: Option<&str>) -> anyhow::Result<()> {
  service::mutation::categories::seed_defaults(pool).await?;

  if let Some(email) = admin_email {
    if service::mutation::users::promote_admin(pool, email).await?.is_none() {
      warn!("Admin account {} is not registered yet", email);
    }
  }

  Ok(())
}

/// Handle health check requests
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
  let res = sqlx::query("SELECT 1").execute(&state.pool).await;
  match res {
    Ok(_) => json!({
      "code": "200",
      "success": true,
    })
    .to_string(),
    Err(_) => json!({
      "code": "500",
      "success": false,
    })
    .to_string(),
  }
}

/// Builds the HTTP application: API routes, OpenAPI document and Swagger UI.
pub fn router(state: AppState, cors_origin: &str) -> anyhow::Result<Router> {
  // Initialize cors settings
  let cors = CorsLayer::new()
    .allow_origin(cors_origin.parse::<HeaderValue>()?)
    .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
    .allow_credentials(true)
    .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE]);

  #[derive(OpenApi)]
  #[openapi(
    tags(
      (name = DEVSHOWCASE_TAG, description = "Project showcase API")
    )
  )]
  struct ApiDoc;

  let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
    .route("/health", get(health_handler))
    .nest("/api/users", init_users_routes(state.clone()))
    .nest("/api/categories", init_categories_routes())
    .nest("/api/projects", init_projects_routes(state.clone()))
    .nest("/api/admin", init_admin_routes(state.clone()))
    .layer(cors)
    .with_state(state)
    .split_for_parts();

  Ok(router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api)))
}

pub async fn run(state: AppState, config: &Config, cancel_token: CancellationToken) -> anyhow::Result<()> {
  let router = router(state, &config.cors_origin)?;

  info!("Starting api server on {}...", config.server_url());

  let listener = TcpListener::bind(config.server_url()).await?;
  axum::serve(listener, router.into_make_service())
    .with_graceful_shutdown(Box::pin(async move { cancel_token.cancelled().await }))
    .await?;

  info!("Stopped api server");

  Ok(())
}
