use std::collections::HashSet;

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
  entities::{
    project::{Decision, Project, ProjectRow, ProjectStatus},
    user::Caller,
  },
  error::{ApiError, ApiResult},
  service::{mutation::char_bounds, query},
};

// SQL Query Constants
const FIND_PROJECT_BY_ID: &str = "SELECT * FROM projects WHERE id = ?1";
const INSERT_PROJECT: &str = r#"
    INSERT INTO projects (id, title, slug, description, github_url, website_url, author_id, title_folded, description_folded)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
    RETURNING *
"#;
const UPDATE_PROJECT: &str = r#"
    UPDATE projects
    SET title = ?1, description = ?2, github_url = ?3, website_url = ?4,
        title_folded = ?5, description_folded = ?6,
        updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
    WHERE id = ?7
"#;
const REVIEW_PROJECT: &str = r#"
    UPDATE projects
    SET status = ?1, updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
    WHERE id = ?2 AND status = 'pending'
    RETURNING *
"#;
const DELETE_PROJECT: &str = "DELETE FROM projects WHERE id = ?";
const UNLINK_CATEGORIES: &str = "DELETE FROM project_categories WHERE project_id = ?1";

const SLUG_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const SLUG_SUFFIX_LEN: usize = 5;
const SLUG_ATTEMPTS: usize = 5;
const MAX_CATEGORIES: usize = 3;

static GITHUB_URL: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^https?://(www\.)?github\.com/.+").expect("GitHub URL pattern is valid"));

/// Content of a project as submitted or edited by its author or an admin.
#[derive(Debug, Clone, Validate, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectParams {
  #[validate(custom(function = "validate_title"))]
  pub title: String,
  #[validate(custom(function = "validate_description"))]
  pub description: String,
  #[validate(
    url(message = "Please enter a valid URL"),
    regex(path = *GITHUB_URL, message = "Must be a valid GitHub URL")
  )]
  pub github_url: String,
  #[validate(url(message = "Please enter a valid URL"))]
  #[serde(default)]
  pub website_url: Option<String>,
  #[validate(custom(function = "validate_category_count"))]
  pub category_ids: Vec<Uuid>,
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
  char_bounds(
    title,
    3,
    100,
    "Title must be at least 3 characters",
    "Title must be at most 100 characters",
  )
}

fn validate_description(description: &str) -> Result<(), ValidationError> {
  char_bounds(
    description,
    20,
    500,
    "Description must be at least 20 characters",
    "Description must be at most 500 characters",
  )
}

fn validate_category_count(ids: &[Uuid]) -> Result<(), ValidationError> {
  match ids.len() {
    0 => Err(ValidationError::new("categories").with_message("Select at least one category".into())),
    1..=MAX_CATEGORIES => Ok(()),
    _ => Err(ValidationError::new("categories").with_message("You can select up to 3 categories".into())),
  }
}

impl ProjectParams {
  /// Trims text fields, treats an empty website as none and drops duplicate
  /// category ids, then validates.
  fn into_checked(mut self) -> ApiResult<Self> {
    self.title = self.title.trim().to_string();
    self.description = self.description.trim().to_string();
    self.github_url = self.github_url.trim().to_string();
    self.website_url = self
      .website_url
      .map(|url| url.trim().to_string())
      .filter(|url| !url.is_empty());

    let mut seen = HashSet::new();
    self.category_ids.retain(|id| seen.insert(*id));

    self.validate()?;
    Ok(self)
  }
}

/// Submits a new project on behalf of the caller.
///
/// The project starts `pending` and gets a slug derived from its title plus a
/// random suffix.
///
/// # Errors
/// - Validation if the content or the category ids are invalid
/// - DatabaseError for any database-related issues
pub async fn submit(pool: &SqlitePool, caller: &Caller, params: ProjectParams) -> ApiResult<Project> {
  let params = params.into_checked()?;

  let mut tx = pool.begin().await?;
  ensure_categories_exist(&mut tx, &params.category_ids).await?;
  let project = insert_project_row(&mut tx, caller, &params).await?;
  link_categories(&mut tx, project.id, &params.category_ids).await?;
  tx.commit().await?;

  info!("Project {} submitted by user {}", project.slug, caller.user_id);

  query::projects::find_by_slug(pool, Some(caller), &project.slug).await
}

/// Replaces the content and category set of a project. Owners may edit their
/// own projects, admins any project. Status and slug are kept.
///
/// # Errors
/// - Validation if the content or the category ids are invalid
/// - ResourceNotFound if the project doesn't exist or the caller may not edit it
/// - DatabaseError for any database-related issues
pub async fn update(pool: &SqlitePool, caller: &Caller, id: Uuid, params: ProjectParams) -> ApiResult<Project> {
  let params = params.into_checked()?;
  let existing = get_managed_project(pool, caller, id).await?;

  let mut tx = pool.begin().await?;
  ensure_categories_exist(&mut tx, &params.category_ids).await?;
  sqlx::query(UPDATE_PROJECT)
    .bind(&params.title)
    .bind(&params.description)
    .bind(&params.github_url)
    .bind(&params.website_url)
    .bind(query::projects::fold_case(&params.title))
    .bind(query::projects::fold_case(&params.description))
    .bind(id)
    .execute(&mut *tx)
    .await?;
  sqlx::query(UNLINK_CATEGORIES).bind(id).execute(&mut *tx).await?;
  link_categories(&mut tx, id, &params.category_ids).await?;
  tx.commit().await?;

  debug!("Project {} updated by user {}", id, caller.user_id);

  query::projects::find_by_slug(pool, Some(caller), &existing.slug).await
}

/// Deletes a project together with its votes, comments and category links
///
/// # Errors
/// - ResourceNotFound if the project doesn't exist or the caller may not delete it
/// - DatabaseError for any database-related issues
pub async fn delete(pool: &SqlitePool, caller: &Caller, id: Uuid) -> ApiResult<()> {
  get_managed_project(pool, caller, id).await?;

  sqlx::query(DELETE_PROJECT).bind(id).execute(pool).await?;

  debug!("Project {} deleted by user {}", id, caller.user_id);

  Ok(())
}

/// Moves a pending project to `approved` or `rejected`. Admin only.
///
/// A project leaves `pending` at most once; reviewing it again fails and
/// leaves the row untouched.
///
/// # Errors
/// - Unauthorized if the caller is not an admin
/// - ResourceNotFound if the project doesn't exist
/// - AlreadyReviewed if the project is no longer pending
pub async fn review(pool: &SqlitePool, caller: &Caller, id: Uuid, decision: Decision) -> ApiResult<Project> {
  caller.require_admin()?;

  let status = ProjectStatus::from(decision);
  let reviewed = sqlx::query_as::<_, ProjectRow>(REVIEW_PROJECT)
    .bind(status)
    .bind(id)
    .fetch_optional(pool)
    .await?;

  match reviewed {
    Some(project) => {
      info!("Project {} {} by admin {}", project.slug, status, caller.user_id);
      query::projects::find_by_slug(pool, Some(caller), &project.slug).await
    },
    None => {
      get_project(pool, id).await?;
      Err(ApiError::AlreadyReviewed)
    },
  }
}

async fn get_project(pool: &SqlitePool, id: Uuid) -> ApiResult<ProjectRow> {
  sqlx::query_as::<_, ProjectRow>(FIND_PROJECT_BY_ID)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(ApiError::ResourceNotFound("Project"))
}

/// Missing projects and projects the caller does not own look the same.
async fn get_managed_project(pool: &SqlitePool, caller: &Caller, id: Uuid) -> ApiResult<ProjectRow> {
  let project = get_project(pool, id).await?;

  if caller.can_manage(project.author_id) {
    Ok(project)
  } else {
    Err(ApiError::ResourceNotFound("Project"))
  }
}

async fn ensure_categories_exist(conn: &mut SqliteConnection, ids: &[Uuid]) -> ApiResult<()> {
  let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM categories WHERE id IN (");
  let mut separated = builder.separated(", ");
  for id in ids {
    separated.push_bind(*id);
  }
  builder.push(")");

  let found: i64 = builder.build_query_scalar().fetch_one(&mut *conn).await?;
  if found as usize == ids.len() {
    Ok(())
  } else {
    Err(ApiError::field("categoryIds", "Select valid categories"))
  }
}

async fn insert_project_row(conn: &mut SqliteConnection, caller: &Caller, params: &ProjectParams) -> ApiResult<ProjectRow> {
  let mut attempt = 0;
  loop {
    attempt += 1;
    let slug = generate_slug(&params.title);

    let inserted = sqlx::query_as::<_, ProjectRow>(INSERT_PROJECT)
      .bind(Uuid::new_v4())
      .bind(&params.title)
      .bind(&slug)
      .bind(&params.description)
      .bind(&params.github_url)
      .bind(&params.website_url)
      .bind(caller.user_id)
      .bind(query::projects::fold_case(&params.title))
      .bind(query::projects::fold_case(&params.description))
      .fetch_one(&mut *conn)
      .await;

    match inserted {
      Err(sqlx::Error::Database(err)) if err.is_unique_violation() && attempt < SLUG_ATTEMPTS => {
        debug!("Slug {} is taken, retrying", slug);
      },
      result => return result.map_err(Into::into),
    }
  }
}

async fn link_categories(conn: &mut SqliteConnection, project_id: Uuid, category_ids: &[Uuid]) -> ApiResult<()> {
  let mut builder = QueryBuilder::<Sqlite>::new("INSERT INTO project_categories (project_id, category_id) ");
  builder.push_values(category_ids, |mut row, category_id| {
    row.push_bind(project_id).push_bind(*category_id);
  });

  builder.build().execute(&mut *conn).await?;
  Ok(())
}

/// `slugify(title)` followed by a dash and five random `[a-z0-9]` characters
fn generate_slug(title: &str) -> String {
  let base = slug::slugify(title);
  let base = if base.is_empty() { "project".to_string() } else { base };

  let mut rng = rand::thread_rng();
  let suffix: String = (0..SLUG_SUFFIX_LEN)
    .map(|_| SLUG_ALPHABET[rng.gen_range(0..SLUG_ALPHABET.len())] as char)
    .collect();

  format!("{base}-{suffix}")
}
