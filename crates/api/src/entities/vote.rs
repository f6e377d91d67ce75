use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiError;

/// A requested vote. `Clear` removes the caller's vote and is never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteValue {
  Down,
  Clear,
  Up,
}

impl VoteValue {
  pub fn as_i64(self) -> i64 {
    match self {
      VoteValue::Down => -1,
      VoteValue::Clear => 0,
      VoteValue::Up => 1,
    }
  }
}

impl TryFrom<i64> for VoteValue {
  type Error = ApiError;

  fn try_from(value: i64) -> Result<Self, Self::Error> {
    match value {
      -1 => Ok(VoteValue::Down),
      0 => Ok(VoteValue::Clear),
      1 => Ok(VoteValue::Up),
      other => Err(ApiError::InvalidVote(other)),
    }
  }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoteTally {
  pub upvotes: i64,
  pub downvotes: i64,
}

impl VoteTally {
  pub fn score(&self) -> i64 {
    self.upvotes - self.downvotes
  }

  /// Adds `count` rows of the stored vote `value` to the tally.
  pub(crate) fn record(&mut self, value: i64, count: i64) {
    match value {
      1 => self.upvotes += count,
      -1 => self.downvotes += count,
      _ => {},
    }
  }
}

/// The caller's vote on a project together with the live tally.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoteState {
  pub value: i64,
  pub upvotes: i64,
  pub downvotes: i64,
  pub score: i64,
}

impl VoteState {
  pub fn new(value: VoteValue, tally: VoteTally) -> Self {
    Self {
      value: value.as_i64(),
      upvotes: tally.upvotes,
      downvotes: tally.downvotes,
      score: tally.score(),
    }
  }
}
