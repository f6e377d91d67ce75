use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::{
  entities::{comment::Comment, user::Caller},
  error::{ApiError, ApiResult},
};

const PROJECT_EXISTS: &str = "SELECT EXISTS (SELECT 1 FROM projects WHERE id = ?1)";
const INSERT_COMMENT: &str = "INSERT INTO comments (id, content, user_id, project_id) VALUES (?1, ?2, ?3, ?4)";
const FIND_COMMENT: &str = r#"
  SELECT
    c.id,
    c.content,
    c.user_id,
    u.full_name AS author_name,
    c.created_at
  FROM comments AS c
  INNER JOIN users AS u ON c.user_id = u.id
  WHERE c.id = ?1
"#;

/// Appends a comment to a project. Comments are never edited afterwards.
///
/// # Errors
/// - EmptyComment if the content is blank
/// - ResourceNotFound if the project does not exist
/// - DatabaseError for any database-related issues
pub async fn add(pool: &SqlitePool, caller: &Caller, project_id: Uuid, content: &str) -> ApiResult<Comment> {
  let content = content.trim();
  if content.is_empty() {
    return Err(ApiError::EmptyComment);
  }

  let exists: bool = sqlx::query_scalar(PROJECT_EXISTS).bind(project_id).fetch_one(pool).await?;
  if !exists {
    return Err(ApiError::ResourceNotFound("Project"));
  }

  let id = Uuid::new_v4();
  sqlx::query(INSERT_COMMENT)
    .bind(id)
    .bind(content)
    .bind(caller.user_id)
    .bind(project_id)
    .execute(pool)
    .await?;

  let comment = sqlx::query_as::<_, Comment>(FIND_COMMENT).bind(id).fetch_one(pool).await?;

  debug!("User {} commented on project {}", caller.user_id, project_id);

  Ok(comment)
}
