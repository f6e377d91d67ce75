use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Serialize, Deserialize, FromRow, Debug, Clone)]
pub struct CategoryRow {
  pub id: Uuid,
  pub name: String,
  pub color: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Category as attached to a project.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRef {
  pub id: Uuid,
  pub name: String,
  pub slug: String,
  pub color: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Category {
  pub id: Uuid,
  pub name: String,
  pub slug: String,
  pub color: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub project_count: Option<i64>,
  pub created_at: DateTime<Utc>,
}

impl Category {
  pub fn from_row(row: CategoryRow, project_count: Option<i64>) -> Self {
    Self {
      slug: category_slug(&row.name),
      id: row.id,
      name: row.name,
      color: row.color,
      project_count,
      created_at: row.created_at,
    }
  }
}

pub fn category_slug(name: &str) -> String {
  slug::slugify(name)
}
