use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
  entities::{
    category::{Category, CategoryRow},
    user::Caller,
  },
  error::{ApiError, ApiResult},
  service::mutation::char_bounds,
};

// SQL Query Constants
const INSERT_CATEGORY: &str = "INSERT INTO categories (id, name, color) VALUES (?1, ?2, ?3) RETURNING *";
const UPDATE_CATEGORY: &str = r#"
  UPDATE categories
  SET name = ?1, color = ?2, updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
  WHERE id = ?3
  RETURNING *
"#;
const DELETE_CATEGORY: &str = "DELETE FROM categories WHERE id = ?1";
const SEED_CATEGORY: &str = r#"
  INSERT INTO categories (id, name, color)
  VALUES (?1, ?2, ?3)
  ON CONFLICT (name) DO UPDATE SET color = excluded.color
"#;

const DEFAULT_CATEGORIES: [(&str, &str); 8] = [
  ("Frontend", "bg-emerald-500/15 text-emerald-700 dark:text-emerald-400"),
  ("Backend", "bg-blue-500/15 text-blue-700 dark:text-blue-400"),
  ("Full Stack", "bg-amber-500/15 text-amber-700 dark:text-amber-400"),
  ("Mobile", "bg-rose-500/15 text-rose-700 dark:text-rose-400"),
  ("DevOps", "bg-cyan-500/15 text-cyan-700 dark:text-cyan-400"),
  ("AI / ML", "bg-fuchsia-500/15 text-fuchsia-700 dark:text-fuchsia-400"),
  ("Open Source", "bg-teal-500/15 text-teal-700 dark:text-teal-400"),
  ("CLI Tools", "bg-orange-500/15 text-orange-700 dark:text-orange-400"),
];

#[derive(Debug, Clone, Validate, Deserialize, Serialize, ToSchema)]
pub struct CategoryParams {
  #[validate(custom(function = "validate_name"))]
  pub name: String,
  #[validate(length(min = 1, message = "Please select a color"))]
  pub color: String,
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
  char_bounds(
    name,
    2,
    30,
    "Category name must be at least 2 characters",
    "Category name must be at most 30 characters",
  )
}

impl CategoryParams {
  fn into_checked(mut self) -> ApiResult<Self> {
    self.name = self.name.trim().to_string();
    self.color = self.color.trim().to_string();
    self.validate()?;
    Ok(self)
  }
}

/// Creates a category. Admin only.
///
/// # Errors
/// - Unauthorized if the caller is not an admin
/// - CategoryAlreadyExist if the name is taken
pub async fn create(pool: &SqlitePool, caller: &Caller, params: CategoryParams) -> ApiResult<Category> {
  caller.require_admin()?;
  let params = params.into_checked()?;

  let row = sqlx::query_as::<_, CategoryRow>(INSERT_CATEGORY)
    .bind(Uuid::new_v4())
    .bind(&params.name)
    .bind(&params.color)
    .fetch_one(pool)
    .await
    .map_err(|err| map_unique_violation(err, &params.name))?;

  info!("Category {} created by admin {}", row.name, caller.user_id);

  Ok(Category::from_row(row, None))
}

/// Renames or recolors a category. Admin only.
///
/// # Errors
/// - Unauthorized if the caller is not an admin
/// - ResourceNotFound if the category doesn't exist
/// - CategoryAlreadyExist if the new name is taken
pub async fn update(pool: &SqlitePool, caller: &Caller, id: Uuid, params: CategoryParams) -> ApiResult<Category> {
  caller.require_admin()?;
  let params = params.into_checked()?;

  let row = sqlx::query_as::<_, CategoryRow>(UPDATE_CATEGORY)
    .bind(&params.name)
    .bind(&params.color)
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|err| map_unique_violation(err, &params.name))?
    .ok_or(ApiError::ResourceNotFound("Category"))?;

  debug!("Category {} updated by admin {}", id, caller.user_id);

  Ok(Category::from_row(row, None))
}

/// Deletes a category and detaches it from every project. Admin only.
pub async fn delete(pool: &SqlitePool, caller: &Caller, id: Uuid) -> ApiResult<()> {
  caller.require_admin()?;

  let affected = sqlx::query(DELETE_CATEGORY).bind(id).execute(pool).await?.rows_affected();
  if affected == 0 {
    return Err(ApiError::ResourceNotFound("Category"));
  }

  debug!("Category {} deleted by admin {}", id, caller.user_id);

  Ok(())
}

/// Upserts the default category catalogue, keyed by name.
pub async fn seed_defaults(pool: &SqlitePool) -> ApiResult<()> {
  for (name, color) in DEFAULT_CATEGORIES {
    sqlx::query(SEED_CATEGORY)
      .bind(Uuid::new_v4())
      .bind(name)
      .bind(color)
      .execute(pool)
      .await?;
  }

  debug!("Seeded {} default categories", DEFAULT_CATEGORIES.len());

  Ok(())
}

fn map_unique_violation(err: sqlx::Error, name: &str) -> ApiError {
  match err {
    sqlx::Error::Database(db_err) if db_err.is_unique_violation() => ApiError::CategoryAlreadyExist(name.to_string()),
    err => err.into(),
  }
}
