use axum::{
  extract::{Request, State},
  http::header,
  middleware::Next,
  response::IntoResponse,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretBox};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::entities::user::{Caller, User};
use crate::error::ApiError;
use crate::service::query;
use crate::AppState;

pub const AUTH_COOKIE_NAME: &str = "token";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
  pub sub: String, // User associated with token
  pub iat: usize,  // Issued at time of the token
  pub exp: usize,  // Expiry time of the token
}

pub struct Keys {
  pub encoding: EncodingKey,
  pub decoding: DecodingKey,
  /// Session lifetime in minutes.
  pub maxage: i64,
}

impl Keys {
  pub fn new(secret: &SecretBox<String>, maxage: i64) -> Self {
    let secret = secret.expose_secret().as_bytes();
    Self {
      encoding: EncodingKey::from_secret(secret),
      decoding: DecodingKey::from_secret(secret),
      maxage,
    }
  }
}

pub fn encode_jwt(keys: &Keys, user_id: Uuid) -> Result<String, ApiError> {
  let now = chrono::Utc::now();
  let iat = now.timestamp() as usize;
  let exp = (now + chrono::Duration::minutes(keys.maxage)).timestamp() as usize;
  let claims: Claims = Claims {
    sub: user_id.to_string(),
    exp,
    iat,
  };

  encode(&Header::default(), &claims, &keys.encoding)
    .map_err(|_| ApiError::Anyhow(anyhow::anyhow!("Can't encode token")))
}

/// Rejects the request unless it carries a valid session. On success the
/// `User` and its `Caller` are stored in the request extensions.
pub async fn auth_guard(
  cookie_jar: CookieJar,
  State(state): State<AppState>,
  mut req: Request,
  next: Next,
) -> Result<impl IntoResponse, ApiError> {
  let token = extract_token(&cookie_jar, &req).ok_or(ApiError::Unauthorized)?;
  let user = resolve_user(&state, &token).await?.ok_or(ApiError::Unauthorized)?;

  debug!("fetch user model from db {:?}", user.id);

  req.extensions_mut().insert(Caller::from(&user));
  req.extensions_mut().insert(user);
  Ok(next.run(req).await)
}

/// Like `auth_guard` but lets anonymous requests through; handlers read the
/// identity as `Option<Extension<Caller>>`.
pub async fn resolve_caller(
  cookie_jar: CookieJar,
  State(state): State<AppState>,
  mut req: Request,
  next: Next,
) -> Result<impl IntoResponse, ApiError> {
  if let Some(token) = extract_token(&cookie_jar, &req) {
    if let Some(user) = resolve_user(&state, &token).await? {
      req.extensions_mut().insert(Caller::from(&user));
      req.extensions_mut().insert(user);
    }
  }

  Ok(next.run(req).await)
}

fn extract_token(cookie_jar: &CookieJar, req: &Request) -> Option<String> {
  cookie_jar
    .get(AUTH_COOKIE_NAME)
    .map(|cookie| cookie.value().to_string())
    .filter(|token| !token.is_empty())
    .or_else(|| {
      req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|auth_header| auth_header.to_str().ok())
        .and_then(|auth_value| {
          auth_value
            .strip_prefix("Bearer ")
            .map(|auth_value| auth_value.to_owned())
        })
    })
}

/// Maps a token to its user. Invalid or expired tokens and tokens of deleted
/// users resolve to `None`; the role is always read fresh from the store.
async fn resolve_user(state: &AppState, token: &str) -> Result<Option<User>, ApiError> {
  let Ok(data) = decode::<Claims>(token, &state.keys.decoding, &Validation::default()) else {
    return Ok(None);
  };
  let Ok(user_id) = Uuid::parse_str(&data.claims.sub) else {
    return Ok(None);
  };

  query::users::find_by_id(&state.pool, user_id).await
}
