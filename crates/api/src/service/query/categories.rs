use std::collections::HashMap;

use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::{
  entities::{
    category::{category_slug, Category, CategoryRef, CategoryRow},
    user::Caller,
  },
  error::ApiResult,
};

const LIST_CATEGORIES_QUERY: &str = "SELECT * FROM categories ORDER BY name ASC";
const COUNT_PROJECTS_PER_CATEGORY: &str =
  "SELECT category_id, COUNT(*) FROM project_categories GROUP BY category_id";

/// Lists every category in name order
pub async fn list(pool: &SqlitePool) -> ApiResult<Vec<Category>> {
  let rows = fetch_rows(pool).await?;
  Ok(rows.into_iter().map(|row| Category::from_row(row, None)).collect())
}

/// Lists every category together with the number of projects filed under it.
/// Admin only.
pub async fn list_with_counts(pool: &SqlitePool, caller: &Caller) -> ApiResult<Vec<Category>> {
  caller.require_admin()?;

  let (rows, counts) = tokio::try_join!(fetch_rows(pool), fetch_project_counts(pool))?;

  Ok(
    rows
      .into_iter()
      .map(|row| {
        let count = counts.get(&row.id).copied().unwrap_or(0);
        Category::from_row(row, Some(count))
      })
      .collect(),
  )
}

/// Loads the categories attached to each of `project_ids` with one query.
pub async fn for_projects(pool: &SqlitePool, project_ids: &[Uuid]) -> ApiResult<HashMap<Uuid, Vec<CategoryRef>>> {
  let mut out: HashMap<Uuid, Vec<CategoryRef>> = HashMap::new();
  if project_ids.is_empty() {
    return Ok(out);
  }

  let mut builder = QueryBuilder::<Sqlite>::new(
    "SELECT pc.project_id, c.id, c.name, c.color FROM project_categories AS pc \
     INNER JOIN categories AS c ON pc.category_id = c.id WHERE pc.project_id IN (",
  );
  let mut ids = builder.separated(", ");
  for id in project_ids {
    ids.push_bind(*id);
  }
  builder.push(") ORDER BY c.name ASC");

  let rows: Vec<(Uuid, Uuid, String, String)> = builder.build_query_as().fetch_all(pool).await?;
  for (project_id, id, name, color) in rows {
    out.entry(project_id).or_default().push(CategoryRef {
      slug: category_slug(&name),
      id,
      name,
      color,
    });
  }

  Ok(out)
}

async fn fetch_rows(pool: &SqlitePool) -> ApiResult<Vec<CategoryRow>> {
  sqlx::query_as::<_, CategoryRow>(LIST_CATEGORIES_QUERY)
    .fetch_all(pool)
    .await
    .map_err(Into::into)
}

async fn fetch_project_counts(pool: &SqlitePool) -> ApiResult<HashMap<Uuid, i64>> {
  let rows: Vec<(Uuid, i64)> = sqlx::query_as(COUNT_PROJECTS_PER_CATEGORY).fetch_all(pool).await?;
  Ok(rows.into_iter().collect())
}
