use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{category::CategoryRef, vote::VoteTally};

#[derive(Serialize, Deserialize, sqlx::Type, Debug, Clone, Copy, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ProjectStatus {
  Pending,
  Approved,
  Rejected,
}

impl fmt::Display for ProjectStatus {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      ProjectStatus::Pending => write!(f, "pending"),
      ProjectStatus::Approved => write!(f, "approved"),
      ProjectStatus::Rejected => write!(f, "rejected"),
    }
  }
}

impl FromStr for ProjectStatus {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "pending" => Ok(ProjectStatus::Pending),
      "approved" => Ok(ProjectStatus::Approved),
      "rejected" => Ok(ProjectStatus::Rejected),
      _ => Err(format!("'{}' is not a valid variant", s)),
    }
  }
}

/// Outcome of an admin review of a pending project.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
  Approved,
  Rejected,
}

impl From<Decision> for ProjectStatus {
  fn from(decision: Decision) -> Self {
    match decision {
      Decision::Approved => ProjectStatus::Approved,
      Decision::Rejected => ProjectStatus::Rejected,
    }
  }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
  #[default]
  Newest,
  Oldest,
  Alphabetical,
}

impl SortBy {
  pub(crate) fn order_clause(self) -> &'static str {
    match self {
      SortBy::Newest => " ORDER BY p.created_at DESC, p.rowid DESC",
      SortBy::Oldest => " ORDER BY p.created_at ASC, p.rowid ASC",
      SortBy::Alphabetical => " ORDER BY p.title COLLATE NOCASE ASC, p.rowid ASC",
    }
  }
}

#[derive(Serialize, Deserialize, FromRow, Debug, Clone)]
pub struct ProjectRow {
  pub id: Uuid,
  pub title: String,
  pub slug: String,
  pub description: String,
  pub github_url: String,
  pub website_url: Option<String>,
  pub status: ProjectStatus,
  pub author_id: Uuid,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Author {
  pub id: Uuid,
  pub full_name: String,
  pub email: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
  pub upvotes: i64,
  pub downvotes: i64,
  pub comment_count: i64,
}

impl ProjectStats {
  pub fn new(tally: VoteTally, comment_count: i64) -> Self {
    Self {
      upvotes: tally.upvotes,
      downvotes: tally.downvotes,
      comment_count,
    }
  }
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Project {
  pub id: Uuid,
  pub title: String,
  pub slug: String,
  pub description: String,
  pub github_url: String,
  pub website_url: Option<String>,
  pub status: ProjectStatus,
  pub author: Author,
  pub categories: Vec<CategoryRef>,
  pub stats: ProjectStats,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
  pub total_count: i64,
  pub total_pages: i64,
  pub current_page: i64,
}

/// Per-status project counts of a single author.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, ToSchema)]
pub struct StatusCounts {
  pub all: i64,
  pub pending: i64,
  pub approved: i64,
  pub rejected: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MyProjects {
  pub projects: Vec<Project>,
  pub status_counts: StatusCounts,
}
