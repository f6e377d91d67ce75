use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

#[derive(Serialize, Deserialize, sqlx::Type, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum Role {
  User,
  Admin,
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Role::User => write!(f, "USER"),
      Role::Admin => write!(f, "ADMIN"),
    }
  }
}

impl FromStr for Role {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "USER" => Ok(Role::User),
      "ADMIN" => Ok(Role::Admin),
      _ => Err(format!("'{}' is not a valid variant", s)),
    }
  }
}

#[derive(Serialize, Deserialize, FromRow, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id: Uuid,
  pub full_name: String,
  pub email: String,
  pub role: Role,
  #[serde(skip_serializing)]
  pub password: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Identity of the authenticated party of a request.
///
/// Every service operation that depends on who is asking takes a `Caller`
/// explicitly; nothing below the handlers reads session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
  pub user_id: Uuid,
  pub role: Role,
}

impl Caller {
  pub fn new(user_id: Uuid, role: Role) -> Self {
    Self { user_id, role }
  }

  pub fn is_admin(&self) -> bool {
    self.role == Role::Admin
  }

  pub fn require_admin(&self) -> ApiResult<()> {
    if self.is_admin() {
      Ok(())
    } else {
      Err(ApiError::Unauthorized)
    }
  }

  /// Owners and admins may mutate a project.
  pub fn can_manage(&self, author_id: Uuid) -> bool {
    self.is_admin() || self.user_id == author_id
  }
}

impl From<&User> for Caller {
  fn from(user: &User) -> Self {
    Self::new(user.id, user.role)
  }
}
