use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
  entities::comment::{Comment, CommentPagination},
  error::ApiResult,
};

use super::paging;

const LIST_COMMENTS_QUERY: &str = r#"
  SELECT
    c.id,
    c.content,
    c.user_id,
    u.full_name AS author_name,
    c.created_at
  FROM comments AS c
  INNER JOIN users AS u ON c.user_id = u.id
  WHERE c.project_id = ?1
  ORDER BY c.created_at DESC, c.rowid DESC
  LIMIT ?2 OFFSET ?3
"#;
const COUNT_COMMENTS_QUERY: &str = "SELECT COUNT(*) FROM comments WHERE project_id = ?1";

/// Fetches a newest-first page of a project's comments
///
/// # Arguments
/// * `pool` - The database connection pool
/// * `project_id` - Project whose comments are listed
/// * `page` - The page number (1-based)
/// * `limit` - The number of comments per page
///
/// # Returns
/// The comments of the page and whether more comments follow it
pub async fn list(
  pool: &SqlitePool,
  project_id: Uuid,
  page: i64,
  limit: i64,
) -> ApiResult<(Vec<Comment>, CommentPagination)> {
  let (page, limit) = paging::normalize(page, limit);
  let skip = paging::offset(page, limit);

  let (total_count, comments) = tokio::try_join!(
    get_total_count(pool, project_id),
    fetch_comments(pool, project_id, limit, skip)
  )?;

  let pagination = CommentPagination::new(total_count, skip, comments.len());
  Ok((comments, pagination))
}

async fn fetch_comments(pool: &SqlitePool, project_id: Uuid, limit: i64, skip: i64) -> ApiResult<Vec<Comment>> {
  sqlx::query_as::<_, Comment>(LIST_COMMENTS_QUERY)
    .bind(project_id)
    .bind(limit)
    .bind(skip)
    .fetch_all(pool)
    .await
    .map_err(Into::into)
}

async fn get_total_count(pool: &SqlitePool, project_id: Uuid) -> ApiResult<i64> {
  let (count,): (i64,) = sqlx::query_as(COUNT_COMMENTS_QUERY)
    .bind(project_id)
    .fetch_one(pool)
    .await?;
  Ok(count)
}
