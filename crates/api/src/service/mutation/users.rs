use anyhow::Context;
use argon2::{
  password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Algorithm, Argon2, Params, Version,
};
use rand_core::OsRng;
use secrecy::{ExposeSecret, SecretBox};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
  entities::user::{Role, User},
  error::{ApiError, ApiResult},
  service::query,
};

const INSERT_ACCOUNT: &str = r#"
  INSERT INTO users (id, full_name, full_name_folded, email, password)
  VALUES (?1, ?2, ?3, ?4, ?5)
  RETURNING *
"#;
const SET_ROLE: &str = r#"
  UPDATE users
  SET role = ?1, updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
  WHERE email = ?2
  RETURNING *
"#;

// argon2id: 15 MiB, 2 passes, 1 lane
const HASH_MEMORY_KIB: u32 = 15_000;
const HASH_PASSES: u32 = 2;
const HASH_LANES: u32 = 1;

#[derive(Debug, Deserialize)]
pub struct LoginParams {
  pub email: String,
  pub password: SecretBox<String>,
}

/// Checks the credentials and returns the matching account.
///
/// An unknown email and a wrong password fail the same way.
pub async fn login(pool: &SqlitePool, params: LoginParams) -> ApiResult<User> {
  let Some(user) = query::users::find_by_email(pool, &params.email).await? else {
    return Err(ApiError::InvalidCredentials);
  };

  let stored = SecretBox::new(Box::new(user.password.clone()));
  check_password(stored, params.password).await?;

  Ok(user)
}

#[derive(Debug, Deserialize)]
pub struct CreateUserParams {
  pub full_name: String,
  pub email: String,
  pub password: SecretBox<String>,
}

/// Registers a new account with the `USER` role. Emails are stored
/// lowercased.
///
/// # Errors
/// - UserAlreadyExist if the email is already registered
/// - DatabaseError for any database-related issues
pub async fn create(pool: &SqlitePool, params: CreateUserParams) -> ApiResult<User> {
  let CreateUserParams {
    full_name,
    email,
    password,
  } = params;
  let full_name = full_name.trim();
  let email = email.trim().to_ascii_lowercase();

  if query::users::find_by_email(pool, &email).await?.is_some() {
    return Err(ApiError::UserAlreadyExist(email));
  }

  let digest = digest_password(password).await?;

  let inserted = sqlx::query_as::<_, User>(INSERT_ACCOUNT)
    .bind(Uuid::new_v4())
    .bind(full_name)
    .bind(query::projects::fold_case(full_name))
    .bind(&email)
    .bind(digest)
    .fetch_one(pool)
    .await;

  match inserted {
    Ok(user) => {
      info!("Account {} registered", user.id);
      Ok(user)
    },
    // Lost a race against a concurrent sign-up with the same email.
    Err(sqlx::Error::Database(err)) if err.is_unique_violation() => Err(ApiError::UserAlreadyExist(email)),
    Err(err) => Err(err.into()),
  }
}

/// Grants the `ADMIN` role to the account registered under `email`.
///
/// Returns `None` when no such account exists yet.
pub async fn promote_admin(pool: &SqlitePool, email: &str) -> ApiResult<Option<User>> {
  let user = sqlx::query_as::<_, User>(SET_ROLE)
    .bind(Role::Admin)
    .bind(email.trim().to_ascii_lowercase())
    .fetch_optional(pool)
    .await?;

  if let Some(user) = &user {
    info!("User {} promoted to admin", user.id);
  }

  Ok(user)
}

fn hasher() -> ApiResult<Argon2<'static>> {
  let params = Params::new(HASH_MEMORY_KIB, HASH_PASSES, HASH_LANES, None)
    .map_err(|err| anyhow::anyhow!("invalid argon2 params: {err}"))?;
  Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Runs on the blocking pool.
async fn digest_password(password: SecretBox<String>) -> ApiResult<String> {
  tokio::task::spawn_blocking(move || {
    let salt = SaltString::generate(&mut OsRng);

    hasher()?
      .hash_password(password.expose_secret().as_bytes(), &salt)
      .map(|digest| digest.to_string())
      .map_err(|err| {
        error!("Password hashing failed: {}", err);
        ApiError::Anyhow(anyhow::anyhow!("password hashing failed"))
      })
  })
  .await
  .context("password hashing task panicked")?
}

/// The parameters are read back from the stored PHC string.
async fn check_password(stored: SecretBox<String>, candidate: SecretBox<String>) -> ApiResult<()> {
  tokio::task::spawn_blocking(move || {
    let digest = PasswordHash::new(stored.expose_secret()).map_err(|err| {
      warn!("Stored password digest is unreadable: {}", err);
      ApiError::InvalidCredentials
    })?;

    Argon2::default()
      .verify_password(candidate.expose_secret().as_bytes(), &digest)
      .map_err(|_| ApiError::InvalidCredentials)
  })
  .await
  .context("password check task panicked")?
}
