use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::response::{IntoResponse, Response};
use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use sqlx::Error as SqlxError;
use thiserror::Error;
use utoipa::ToSchema;

pub type ApiResult<T = ()> = Result<T, ApiError>;

const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("Unauthorized")]
  Unauthorized,
  #[error("Invalid email or password")]
  InvalidCredentials,
  #[error("User with this email already exists")]
  UserAlreadyExist(String),
  #[error("Category `{0}` already exists")]
  CategoryAlreadyExist(String),
  #[error("{0} not found")]
  ResourceNotFound(&'static str),
  #[error("Project has already been reviewed")]
  AlreadyReviewed,
  #[error("Invalid vote value")]
  InvalidVote(i64),
  #[error("Comment cannot be empty")]
  EmptyComment,
  #[error("Invalid data")]
  Validation(FieldErrors),
  #[error("Database error: {0}")]
  DatabaseError(#[from] SqlxError),
  #[error(transparent)]
  JsonRejection(JsonRejection),
  #[error(transparent)]
  PathRejection(PathRejection),
  #[error(transparent)]
  QueryRejection(QueryRejection),
  #[error("an internal server error occurred")]
  Anyhow(#[from] anyhow::Error),
}

impl ApiError {
  pub fn response(self) -> (StatusCode, AppResponseError) {
    use ApiError::*;
    let message = self.to_string();

    let (kind, message, details, status_code) = match self {
      Unauthorized => ("UNAUTHORIZED", message, vec![], StatusCode::UNAUTHORIZED),
      InvalidCredentials => ("INVALID_CREDENTIALS", message, vec![], StatusCode::UNAUTHORIZED),
      UserAlreadyExist(_) | CategoryAlreadyExist(_) => ("ALREADY_EXISTS", message, vec![], StatusCode::CONFLICT),
      ResourceNotFound(_) => ("RESOURCE_NOT_FOUND", message, vec![], StatusCode::NOT_FOUND),
      AlreadyReviewed => ("INVALID_TRANSITION", message, vec![], StatusCode::CONFLICT),
      InvalidVote(_) | EmptyComment => ("INVALID_INPUT_ERROR", message, vec![], StatusCode::BAD_REQUEST),
      Validation(errors) => ("INVALID_INPUT_ERROR", message, errors.0, StatusCode::BAD_REQUEST),
      JsonRejection(rejection) => (
        "INVALID_INPUT_ERROR",
        rejection.body_text(),
        vec![],
        StatusCode::BAD_REQUEST,
      ),
      PathRejection(rejection) => ("INVALID_INPUT_ERROR", rejection.body_text(), vec![], StatusCode::BAD_REQUEST),
      QueryRejection(rejection) => ("INVALID_INPUT_ERROR", rejection.body_text(), vec![], StatusCode::BAD_REQUEST),
      DatabaseError(ref e) => {
        tracing::error!("Database error: {:?}", e);

        (
          "INTERNAL_SERVER_ERROR",
          GENERIC_FAILURE.to_string(),
          vec![],
          StatusCode::INTERNAL_SERVER_ERROR,
        )
      },
      Anyhow(ref e) => {
        tracing::error!("Generic error: {:?}", e);

        (
          "INTERNAL_SERVER_ERROR",
          GENERIC_FAILURE.to_string(),
          vec![],
          StatusCode::INTERNAL_SERVER_ERROR,
        )
      },
    };

    (status_code, AppResponseError::new(kind, message, details))
  }

  pub(crate) fn field(field: &str, message: &str) -> Self {
    let mut errors = FieldErrors::default();
    errors.push(field, message);
    Self::Validation(errors)
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status_code, body) = self.response();
    (status_code, Json(body)).into_response()
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    Self::JsonRejection(rejection)
  }
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self {
    Self::PathRejection(rejection)
  }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self {
    Self::QueryRejection(rejection)
  }
}

impl From<validator::ValidationErrors> for ApiError {
  fn from(errors: validator::ValidationErrors) -> Self {
    Self::Validation(errors.into())
  }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
pub struct FieldError {
  pub field: String,
  pub message: String,
}

/// Ordered per-field validation messages, at most one per field.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq, ToSchema)]
pub struct FieldErrors(pub Vec<FieldError>);

impl FieldErrors {
  /// Records `message` for `field` unless the field already has one.
  pub fn push(&mut self, field: &str, message: &str) {
    if self.get(field).is_none() {
      self.0.push(FieldError {
        field: field.to_string(),
        message: message.to_string(),
      });
    }
  }

  pub fn get(&self, field: &str) -> Option<&str> {
    self.0.iter().find(|e| e.field == field).map(|e| e.message.as_str())
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl From<validator::ValidationErrors> for FieldErrors {
  fn from(errors: validator::ValidationErrors) -> Self {
    let mut fields: Vec<_> = errors
      .field_errors()
      .into_iter()
      .map(|(field, errs)| (wire_name(&field), errs.first().cloned()))
      .collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    let mut out = FieldErrors::default();
    for (field, err) in fields {
      if let Some(err) = err {
        let message = err
          .message
          .map(|m| m.to_string())
          .unwrap_or_else(|| err.code.to_string());
        out.push(&field, &message);
      }
    }
    out
  }
}

/// `github_url` -> `githubUrl`, matching the JSON field names.
fn wire_name(field: &str) -> String {
  let mut out = String::with_capacity(field.len());
  let mut upper = false;
  for c in field.chars() {
    if c == '_' {
      upper = true;
    } else if upper {
      out.extend(c.to_uppercase());
      upper = false;
    } else {
      out.push(c);
    }
  }
  out
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
pub struct AppResponseError {
  pub success: bool,
  pub kind: String,
  pub error: String,
  #[serde(skip_serializing_if = "Vec::is_empty", default)]
  pub details: Vec<FieldError>,
}

impl AppResponseError {
  pub fn new(kind: impl Into<String>, message: impl Into<String>, details: Vec<FieldError>) -> Self {
    Self {
      success: false,
      kind: kind.into(),
      error: message.into(),
      details,
    }
  }
}
