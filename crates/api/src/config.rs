use std::env;

use anyhow::{Context, Result};
use secrecy::SecretBox;

const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

/// Runtime settings read from the environment (and `.env` via `dotenvy`).
#[derive(Debug)]
pub struct Config {
  pub database_url: String,
  pub log_level: String,
  pub host: String,
  pub port: u16,
  pub jwt_secret: SecretBox<String>,
  /// Session lifetime in minutes.
  pub jwt_maxage: i64,
  pub cors_origin: String,
  pub admin_email: Option<String>,
}

impl Config {
  pub fn from_env() -> Result<Self> {
    Ok(Self {
      database_url: required("DATABASE_URL")?,
      log_level: required("DEVSHOWCASE_LOG_LEVEL")?,
      host: required("HOST")?,
      port: required("PORT")?.parse().context("PORT must be a port number")?,
      jwt_secret: SecretBox::new(Box::new(required("JWT_SECRET")?)),
      jwt_maxage: required("JWT_MAXAGE")?
        .parse()
        .context("JWT_MAXAGE must be a number of minutes")?,
      cors_origin: env::var("CORS_ORIGIN").unwrap_or_else(|_| DEFAULT_CORS_ORIGIN.to_string()),
      admin_email: env::var("DEVSHOWCASE_ADMIN_EMAIL").ok().filter(|email| !email.trim().is_empty()),
    })
  }

  pub fn server_url(&self) -> String {
    format!("{}:{}", self.host, self.port)
  }
}

fn required(name: &str) -> Result<String> {
  env::var(name).with_context(|| format!("{name} is not set in .env file"))
}
