use axum::{
  extract::State,
  http::{header, StatusCode},
  middleware::from_fn_with_state,
  response::AppendHeaders,
  Extension,
};
use secrecy::SecretBox;
use serde::{Deserialize, Serialize};
use tower_cookies::{
  cookie::{time::Duration, SameSite},
  Cookie,
};
use tracing::{debug, instrument};
use utoipa::ToSchema;
use utoipa_axum::{
  router::{OpenApiRouter, UtoipaMethodRouterExt},
  routes,
};
use validator::{Validate, ValidationError};

use crate::{
  entities::user::User,
  error::ApiResult,
  handlers::auth::{encode_jwt, AUTH_COOKIE_NAME},
  response::ActionResponse,
  service::mutation,
  AppJson, AppState,
};

use super::auth::auth_guard;

const USERS_TAG: &str = "users";

pub fn init_users_routes(state: AppState) -> OpenApiRouter<AppState> {
  OpenApiRouter::new()
    .routes(routes!(sign_up))
    .routes(routes!(sign_in))
    .routes(routes!(sign_out))
    .routes(routes!(get_me).layer(from_fn_with_state(state, auth_guard)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignUp {
  #[validate(custom(function = "validate_full_name"))]
  full_name: String,
  #[validate(email(message = "Please enter a valid email address"))]
  email: String,
  #[validate(
    length(min = 8, message = "Password must be at least 8 characters"),
    custom(function = "validate_password_strength")
  )]
  password: String,
  #[validate(must_match(other = "password", message = "Passwords do not match"))]
  confirm_password: String,
  #[validate(custom(function = "validate_terms_accepted"))]
  #[serde(default)]
  agree_to_terms: bool,
}

fn validate_full_name(full_name: &str) -> Result<(), ValidationError> {
  mutation::char_bounds(
    full_name,
    2,
    50,
    "Name must be at least 2 characters",
    "Name must be at most 50 characters",
  )
}

fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
  let lower = password.chars().any(|c| c.is_ascii_lowercase());
  let upper = password.chars().any(|c| c.is_ascii_uppercase());
  let digit = password.chars().any(|c| c.is_ascii_digit());

  if lower && upper && digit {
    Ok(())
  } else {
    Err(ValidationError::new("password_strength").with_message("Must contain uppercase, lowercase, and a number".into()))
  }
}

fn validate_terms_accepted(agree: &bool) -> Result<(), ValidationError> {
  if *agree {
    Ok(())
  } else {
    Err(ValidationError::new("terms").with_message("You must agree to the terms".into()))
  }
}

#[utoipa::path(
  post,
  path = "/sign-up",
  tag = USERS_TAG,
  request_body = SignUp,
  responses(
    (status = 201, description = "Account created", body = User),
    (status = 400, description = "Validation error"),
    (status = 409, description = "Email already registered")
  )
)]
#[instrument(skip(state, input))]
async fn sign_up(
  State(state): State<AppState>,
  AppJson(input): AppJson<SignUp>,
) -> ApiResult<(StatusCode, ActionResponse<User>)> {
  input.validate()?;

  let params = mutation::users::CreateUserParams {
    full_name: input.full_name,
    email: input.email,
    password: SecretBox::new(Box::new(input.password)),
  };

  debug!("Register new user with request: {:?}", params);

  let user = mutation::users::create(&state.pool, params).await?;

  Ok((StatusCode::CREATED, ActionResponse::data(user)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignIn {
  #[validate(email(message = "Please enter a valid email address"))]
  email: String,
  #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
  password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SignInResponse {
  token: String,
  user: User,
}

#[utoipa::path(
  post,
  path = "/sign-in",
  tag = USERS_TAG,
  request_body = SignIn,
  responses(
    (status = 200, description = "Signed in", body = SignInResponse),
    (status = 401, description = "Invalid credentials"),
    (status = 400, description = "Validation error")
  )
)]
#[instrument(skip(state, input))]
async fn sign_in(
  State(state): State<AppState>,
  AppJson(input): AppJson<SignIn>,
) -> ApiResult<(SetCookie, ActionResponse<SignInResponse>)> {
  input.validate()?;

  let params = mutation::users::LoginParams {
    email: input.email,
    password: SecretBox::new(Box::new(input.password)),
  };

  debug!("Try login user with params {:?}", params);

  let user = mutation::users::login(&state.pool, params).await?;
  let token = encode_jwt(&state.keys, user.id)?;

  let cookie = build_auth_cookie(token.clone(), Duration::minutes(state.keys.maxage));

  Ok((set_cookie(cookie), ActionResponse::data(SignInResponse { token, user })))
}

#[utoipa::path(
  post,
  path = "/sign-out",
  tag = USERS_TAG,
  responses(
    (status = 200, description = "Signed out")
  )
)]
async fn sign_out() -> ApiResult<(SetCookie, ActionResponse<()>)> {
  let cookie = build_auth_cookie(String::new(), Duration::ZERO);

  Ok((set_cookie(cookie), ActionResponse::message("Signed out")))
}

#[utoipa::path(
  get,
  path = "/me",
  tag = USERS_TAG,
  responses(
    (status = OK, description = "Return current signed in user", body = User),
    (status = 401, description = "Unauthorized")
  )
)]
async fn get_me(Extension(user): Extension<User>) -> ApiResult<ActionResponse<User>> {
  Ok(ActionResponse::data(user))
}

type SetCookie = AppendHeaders<[(header::HeaderName, String); 1]>;

fn set_cookie(cookie: Cookie<'static>) -> SetCookie {
  AppendHeaders([(header::SET_COOKIE, cookie.to_string())])
}

fn build_auth_cookie(token: String, max_age: Duration) -> Cookie<'static> {
  Cookie::build((AUTH_COOKIE_NAME, token))
    .path("/")
    .max_age(max_age)
    .same_site(SameSite::Lax)
    .http_only(true)
    .build()
}
