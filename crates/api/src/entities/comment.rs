use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Serialize, Deserialize, FromRow, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
  pub id: Uuid,
  pub content: String,
  pub user_id: Uuid,
  pub author_name: String,
  pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentPagination {
  pub total_count: i64,
  pub has_more: bool,
}

impl CommentPagination {
  /// `skip` is the offset of the page and `page_len` the number of rows it holds.
  pub fn new(total_count: i64, skip: i64, page_len: usize) -> Self {
    Self {
      total_count,
      has_more: total_count > skip.saturating_add(page_len as i64),
    }
  }
}
