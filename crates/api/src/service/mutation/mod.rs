use validator::ValidationError;

pub mod categories;
pub mod comments;
pub mod projects;
pub mod users;
pub mod votes;

/// Character-count bounds with distinct messages for each side.
pub(crate) fn char_bounds(
  value: &str,
  min: usize,
  max: usize,
  too_short: &'static str,
  too_long: &'static str,
) -> Result<(), ValidationError> {
  let len = value.chars().count();
  if len < min {
    Err(ValidationError::new("length").with_message(too_short.into()))
  } else if len > max {
    Err(ValidationError::new("length").with_message(too_long.into()))
  } else {
    Ok(())
  }
}
