use axum::{
  response::{IntoResponse, Response},
  Json,
};
use serde::Serialize;

/// Success envelope shared by every endpoint: `{success, data?, message?, pagination?}`.
///
/// Failures are rendered by `ApiError` with the same `success` flag.
#[derive(Debug, Serialize)]
pub struct ActionResponse<T, P = ()> {
  pub success: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub data: Option<T>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub pagination: Option<P>,
}

impl<T> ActionResponse<T> {
  pub fn data(data: T) -> Self {
    Self {
      success: true,
      data: Some(data),
      message: None,
      pagination: None,
    }
  }
}

impl ActionResponse<()> {
  pub fn message(message: impl Into<String>) -> Self {
    Self {
      success: true,
      data: None,
      message: Some(message.into()),
      pagination: None,
    }
  }
}

impl<T, P> ActionResponse<T, P> {
  pub fn paginated(data: T, pagination: P) -> Self {
    Self {
      success: true,
      data: Some(data),
      message: None,
      pagination: Some(pagination),
    }
  }

  pub fn with_message(mut self, message: impl Into<String>) -> Self {
    self.message = Some(message.into());
    self
  }
}

impl<T: Serialize, P: Serialize> IntoResponse for ActionResponse<T, P> {
  fn into_response(self) -> Response {
    Json(self).into_response()
  }
}
