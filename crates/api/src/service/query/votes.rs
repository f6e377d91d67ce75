use std::collections::HashMap;

use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::{
  entities::{
    user::Caller,
    vote::{VoteTally, VoteValue},
  },
  error::ApiResult,
};

const TALLY_VOTES: &str = "SELECT value, COUNT(*) FROM votes WHERE project_id = ?1 GROUP BY value";
const FIND_USER_VOTE: &str = "SELECT value FROM votes WHERE user_id = ?1 AND project_id = ?2";

/// Counts the up and down votes of a single project.
pub async fn tally(pool: &SqlitePool, project_id: Uuid) -> ApiResult<VoteTally> {
  let rows: Vec<(i64, i64)> = sqlx::query_as(TALLY_VOTES).bind(project_id).fetch_all(pool).await?;

  let mut tally = VoteTally::default();
  for (value, count) in rows {
    tally.record(value, count);
  }
  Ok(tally)
}

/// Counts votes for a batch of projects with one grouped query.
///
/// Projects without any vote are present in the result with an empty tally.
pub async fn tallies(pool: &SqlitePool, project_ids: &[Uuid]) -> ApiResult<HashMap<Uuid, VoteTally>> {
  let mut out: HashMap<Uuid, VoteTally> = project_ids.iter().map(|id| (*id, VoteTally::default())).collect();
  if project_ids.is_empty() {
    return Ok(out);
  }

  let mut builder = QueryBuilder::<Sqlite>::new("SELECT project_id, value, COUNT(*) FROM votes WHERE project_id IN (");
  let mut ids = builder.separated(", ");
  for id in project_ids {
    ids.push_bind(*id);
  }
  builder.push(") GROUP BY project_id, value");

  let rows: Vec<(Uuid, i64, i64)> = builder.build_query_as().fetch_all(pool).await?;
  for (project_id, value, count) in rows {
    out.entry(project_id).or_default().record(value, count);
  }

  Ok(out)
}

/// Returns the caller's current vote, `Clear` when there is none or the
/// request is anonymous.
pub async fn user_vote(pool: &SqlitePool, caller: Option<&Caller>, project_id: Uuid) -> ApiResult<VoteValue> {
  let Some(caller) = caller else {
    return Ok(VoteValue::Clear);
  };

  let value: Option<i64> = sqlx::query_scalar(FIND_USER_VOTE)
    .bind(caller.user_id)
    .bind(project_id)
    .fetch_optional(pool)
    .await?;

  match value {
    Some(value) => VoteValue::try_from(value),
    None => Ok(VoteValue::Clear),
  }
}
