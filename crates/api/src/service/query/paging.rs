pub const MAX_PAGE_SIZE: i64 = 50;

/// Highest page whose offset still fits an `i64` at the largest page size.
pub const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE;

/// Clamps a requested page window to sane bounds: pages run from 1 to
/// `MAX_PAGE` and a page holds between 1 and `MAX_PAGE_SIZE` rows.
pub fn normalize(page: i64, page_size: i64) -> (i64, i64) {
  (page.clamp(1, MAX_PAGE), page_size.clamp(1, MAX_PAGE_SIZE))
}

pub fn offset(page: i64, limit: i64) -> i64 {
  page.saturating_sub(1).saturating_mul(limit)
}

pub fn calculate_total_pages(total_count: i64, limit: i64) -> i64 {
  (total_count as f64 / limit as f64).ceil() as i64
}
