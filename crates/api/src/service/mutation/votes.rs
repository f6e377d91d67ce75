use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::{
  entities::{
    user::Caller,
    vote::{VoteState, VoteValue},
  },
  error::{ApiError, ApiResult},
  service::query,
};

const PROJECT_EXISTS: &str = "SELECT EXISTS (SELECT 1 FROM projects WHERE id = ?1)";
const UPSERT_VOTE: &str = r#"
  INSERT INTO votes (id, user_id, project_id, value)
  VALUES (?1, ?2, ?3, ?4)
  ON CONFLICT (user_id, project_id) DO UPDATE SET
    value = excluded.value,
    updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
"#;
const DELETE_VOTE: &str = "DELETE FROM votes WHERE user_id = ?1 AND project_id = ?2";

/// Sets the caller's vote on a project.
///
/// `Up` and `Down` create or overwrite the single vote row of the
/// (caller, project) pair; `Clear` deletes it and succeeds when there is
/// nothing to delete.
///
/// # Returns
/// The caller's resulting vote together with the fresh tally
///
/// # Errors
/// - ResourceNotFound if the project does not exist
/// - DatabaseError for any database-related issues
pub async fn set(pool: &SqlitePool, caller: &Caller, project_id: Uuid, value: VoteValue) -> ApiResult<VoteState> {
  ensure_project_exists(pool, project_id).await?;

  match value {
    VoteValue::Clear => {
      let removed = sqlx::query(DELETE_VOTE)
        .bind(caller.user_id)
        .bind(project_id)
        .execute(pool)
        .await?
        .rows_affected();

      debug!("Cleared {} vote(s) of user {} on project {}", removed, caller.user_id, project_id);
    },
    VoteValue::Up | VoteValue::Down => {
      sqlx::query(UPSERT_VOTE)
        .bind(Uuid::new_v4())
        .bind(caller.user_id)
        .bind(project_id)
        .bind(value.as_i64())
        .execute(pool)
        .await?;

      debug!("User {} voted {} on project {}", caller.user_id, value.as_i64(), project_id);
    },
  }

  let tally = query::votes::tally(pool, project_id).await?;
  Ok(VoteState::new(value, tally))
}

async fn ensure_project_exists(pool: &SqlitePool, project_id: Uuid) -> ApiResult<()> {
  let exists: bool = sqlx::query_scalar(PROJECT_EXISTS).bind(project_id).fetch_one(pool).await?;

  if exists {
    Ok(())
  } else {
    Err(ApiError::ResourceNotFound("Project"))
  }
}
