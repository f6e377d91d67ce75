use std::str::FromStr;

use anyhow::Result;
use devshowcase_api::{AppState, Config, Keys};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
  dotenvy::dotenv().ok();

  let config = Config::from_env()?;

  let env_filter = EnvFilter::from_default_env().add_directive(config.log_level.parse()?);

  // Initialize tracing subscriber with the environment filter
  tracing_subscriber::fmt().with_env_filter(env_filter).init();

  let cancel_token = CancellationToken::new();

  // Start task for catching interrupt
  tokio::spawn({
    let cancel_token = cancel_token.clone();
    async move {
      let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
          error!("Failed to install Ctrl+C handler: {}", err);
          std::future::pending::<()>().await;
        }
      };

      #[cfg(unix)]
      let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
          Ok(mut stream) => {
            stream.recv().await;
          }
          Err(err) => {
            error!("Failed to install signal handler: {}", err);
            std::future::pending::<()>().await;
          }
        }
      };

      #[cfg(not(unix))]
      let terminate = std::future::pending::<()>();

      tokio::select! {
        _ = ctrl_c => {
          info!("Received Ctrl-C, shutting down...");
          cancel_token.cancel()
        },
        _ = terminate => {
          info!("Received terminate, shutting down...");
          cancel_token.cancel()
        },
      }
    }
  });

  let options = SqliteConnectOptions::from_str(&config.database_url)?
    .create_if_missing(true)
    .foreign_keys(true);

  let pool = SqlitePoolOptions::new()
    .max_connections(100)
    .min_connections(5)
    .connect_with(options)
    .await?;

  devshowcase_api::migrate(&pool).await?;
  devshowcase_api::bootstrap(&pool, config.admin_email.as_deref()).await?;

  let state = AppState::new(pool.clone(), Keys::new(&config.jwt_secret, config.jwt_maxage));

  if let Err(err) = devshowcase_api::run(state, &config, cancel_token).await {
    error!("Api server stopped with error: {:?}", err);
  }

  pool.close().await;

  Ok(())
}
