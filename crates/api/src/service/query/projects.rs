use std::collections::HashMap;

use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, Row, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::{
  entities::{
    project::{Author, MyProjects, Pagination, Project, ProjectRow, ProjectStats, ProjectStatus, SortBy, StatusCounts},
    user::Caller,
  },
  error::{ApiError, ApiResult},
};

use super::{categories, paging, votes};

pub const DEFAULT_PAGE_SIZE: i64 = 6;

const SELECT_PROJECTS: &str = r#"
  SELECT
    p.*,
    u.full_name AS author_full_name,
    u.email AS author_email
  FROM projects AS p
  INNER JOIN users AS u ON p.author_id = u.id
"#;
const COUNT_PROJECTS: &str = "SELECT COUNT(*) FROM projects AS p INNER JOIN users AS u ON p.author_id = u.id";
const COUNT_BY_STATUS: &str = "SELECT status, COUNT(*) FROM projects WHERE author_id = ?1 GROUP BY status";

/// Listing parameters shared by the explore, personal and moderation views.
#[derive(Debug, Clone)]
pub struct ListFilter {
  pub search: Option<String>,
  pub category_ids: Vec<Uuid>,
  pub status: Option<ProjectStatus>,
  pub sort_by: SortBy,
  pub page: i64,
  pub page_size: i64,
}

impl Default for ListFilter {
  fn default() -> Self {
    Self {
      search: None,
      category_ids: vec![],
      status: None,
      sort_by: SortBy::Newest,
      page: 1,
      page_size: DEFAULT_PAGE_SIZE,
    }
  }
}

/// Restrictions applied on top of a `ListFilter` by the view itself.
#[derive(Debug, Clone, Copy)]
struct Scope {
  status: Option<ProjectStatus>,
  author_id: Option<Uuid>,
  search_authors: bool,
}

/// Public explore listing. Only approved projects are ever returned,
/// whatever status the filter asks for.
///
/// # Returns
/// The projects of the requested page and the pagination window
pub async fn list_approved(pool: &SqlitePool, filter: ListFilter) -> ApiResult<(Vec<Project>, Pagination)> {
  let scope = Scope {
    status: Some(ProjectStatus::Approved),
    author_id: None,
    search_authors: true,
  };
  list(pool, scope, filter).await
}

/// Moderation listing over every project. Admin only.
pub async fn list_all(pool: &SqlitePool, caller: &Caller, filter: ListFilter) -> ApiResult<(Vec<Project>, Pagination)> {
  caller.require_admin()?;

  let scope = Scope {
    status: filter.status,
    author_id: None,
    search_authors: true,
  };
  list(pool, scope, filter).await
}

/// The caller's own projects, newest first, with per-status counts.
///
/// Search covers title and description only; category filter and sort order
/// of `filter` are ignored.
pub async fn list_mine(pool: &SqlitePool, caller: &Caller, filter: ListFilter) -> ApiResult<(MyProjects, Pagination)> {
  let scope = Scope {
    status: filter.status,
    author_id: Some(caller.user_id),
    search_authors: false,
  };
  let filter = ListFilter {
    category_ids: vec![],
    sort_by: SortBy::Newest,
    ..filter
  };

  let ((projects, pagination), status_counts) =
    tokio::try_join!(list(pool, scope, filter), count_by_status(pool, caller.user_id))?;

  Ok((
    MyProjects {
      projects,
      status_counts,
    },
    pagination,
  ))
}

/// Fetches a project with its stats by slug.
///
/// Projects that are not approved are only visible to their author and to
/// admins; anyone else gets `ResourceNotFound`.
pub async fn find_by_slug(pool: &SqlitePool, caller: Option<&Caller>, slug: &str) -> ApiResult<Project> {
  let row = sqlx::query(&format!("{SELECT_PROJECTS} WHERE p.slug = ?1"))
    .bind(slug)
    .fetch_optional(pool)
    .await?
    .ok_or(ApiError::ResourceNotFound("Project"))?;
  let (project, author) = map_row(&row)?;

  let visible = project.status == ProjectStatus::Approved || caller.is_some_and(|c| c.can_manage(project.author_id));
  if !visible {
    return Err(ApiError::ResourceNotFound("Project"));
  }

  let mut projects = hydrate(pool, vec![(project, author)]).await?;
  projects.pop().ok_or(ApiError::ResourceNotFound("Project"))
}

async fn list(pool: &SqlitePool, scope: Scope, filter: ListFilter) -> ApiResult<(Vec<Project>, Pagination)> {
  let (page, limit) = paging::normalize(filter.page, filter.page_size);

  let (total_count, rows) = tokio::try_join!(
    get_total_count(pool, scope, &filter),
    fetch_page(pool, scope, &filter, page, limit)
  )?;

  let projects = hydrate(pool, rows).await?;
  let pagination = Pagination {
    total_count,
    total_pages: paging::calculate_total_pages(total_count, limit),
    current_page: page,
  };

  Ok((projects, pagination))
}

async fn get_total_count(pool: &SqlitePool, scope: Scope, filter: &ListFilter) -> ApiResult<i64> {
  let mut builder = QueryBuilder::<Sqlite>::new(COUNT_PROJECTS);
  push_conditions(&mut builder, scope, filter);

  let count: i64 = builder.build_query_scalar().fetch_one(pool).await?;
  Ok(count)
}

async fn fetch_page(
  pool: &SqlitePool,
  scope: Scope,
  filter: &ListFilter,
  page: i64,
  limit: i64,
) -> ApiResult<Vec<(ProjectRow, Author)>> {
  let mut builder = QueryBuilder::<Sqlite>::new(SELECT_PROJECTS);
  push_conditions(&mut builder, scope, filter);
  builder.push(filter.sort_by.order_clause());
  builder.push(" LIMIT ");
  builder.push_bind(limit);
  builder.push(" OFFSET ");
  builder.push_bind(paging::offset(page, limit));

  let rows = builder.build().fetch_all(pool).await?;
  rows.iter().map(map_row).collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

fn push_conditions(builder: &mut QueryBuilder<'_, Sqlite>, scope: Scope, filter: &ListFilter) {
  builder.push(" WHERE 1 = 1");

  if let Some(status) = scope.status {
    builder.push(" AND p.status = ");
    builder.push_bind(status);
  }

  if let Some(author_id) = scope.author_id {
    builder.push(" AND p.author_id = ");
    builder.push_bind(author_id);
  }

  if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
    let pattern = format!("%{}%", escape_like(&fold_case(search)));

    builder.push(" AND (p.title_folded LIKE ");
    builder.push_bind(pattern.clone());
    builder.push(" ESCAPE '\\' OR p.description_folded LIKE ");
    builder.push_bind(pattern.clone());
    builder.push(" ESCAPE '\\'");
    if scope.search_authors {
      builder.push(" OR u.full_name_folded LIKE ");
      builder.push_bind(pattern);
      builder.push(" ESCAPE '\\'");
    }
    builder.push(")");
  }

  if !filter.category_ids.is_empty() {
    builder.push(
      " AND EXISTS (SELECT 1 FROM project_categories AS pc WHERE pc.project_id = p.id AND pc.category_id IN (",
    );
    let mut ids = builder.separated(", ");
    for id in &filter.category_ids {
      ids.push_bind(*id);
    }
    builder.push("))");
  }
}

/// Lowercase form stored next to every searchable column. SQLite only folds
/// ASCII in `LIKE`, so both sides are folded here instead.
pub fn fold_case(text: &str) -> String {
  text.to_lowercase()
}

/// Wildcards in user input are matched literally.
fn escape_like(input: &str) -> String {
  let mut out = String::with_capacity(input.len());
  for c in input.chars() {
    if matches!(c, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(c);
  }
  out
}

/// Attaches categories, vote tallies and comment counts to a page of rows.
/// Each aggregate is loaded with a single query keyed by the page's ids.
async fn hydrate(pool: &SqlitePool, rows: Vec<(ProjectRow, Author)>) -> ApiResult<Vec<Project>> {
  let ids: Vec<Uuid> = rows.iter().map(|(row, _)| row.id).collect();

  let (mut categories, tallies, comment_counts) = tokio::try_join!(
    categories::for_projects(pool, &ids),
    votes::tallies(pool, &ids),
    fetch_comment_counts(pool, &ids)
  )?;

  Ok(
    rows
      .into_iter()
      .map(|(row, author)| {
        let tally = tallies.get(&row.id).copied().unwrap_or_default();
        let comment_count = comment_counts.get(&row.id).copied().unwrap_or(0);

        Project {
          categories: categories.remove(&row.id).unwrap_or_default(),
          stats: ProjectStats::new(tally, comment_count),
          id: row.id,
          title: row.title,
          slug: row.slug,
          description: row.description,
          github_url: row.github_url,
          website_url: row.website_url,
          status: row.status,
          author,
          created_at: row.created_at,
          updated_at: row.updated_at,
        }
      })
      .collect(),
  )
}

async fn fetch_comment_counts(pool: &SqlitePool, project_ids: &[Uuid]) -> ApiResult<HashMap<Uuid, i64>> {
  if project_ids.is_empty() {
    return Ok(HashMap::new());
  }

  let mut builder = QueryBuilder::<Sqlite>::new("SELECT project_id, COUNT(*) FROM comments WHERE project_id IN (");
  let mut ids = builder.separated(", ");
  for id in project_ids {
    ids.push_bind(*id);
  }
  builder.push(") GROUP BY project_id");

  let rows: Vec<(Uuid, i64)> = builder.build_query_as().fetch_all(pool).await?;
  Ok(rows.into_iter().collect())
}

async fn count_by_status(pool: &SqlitePool, author_id: Uuid) -> ApiResult<StatusCounts> {
  let rows: Vec<(ProjectStatus, i64)> = sqlx::query_as(COUNT_BY_STATUS).bind(author_id).fetch_all(pool).await?;

  let mut counts = StatusCounts::default();
  for (status, count) in rows {
    counts.all += count;
    match status {
      ProjectStatus::Pending => counts.pending = count,
      ProjectStatus::Approved => counts.approved = count,
      ProjectStatus::Rejected => counts.rejected = count,
    }
  }
  Ok(counts)
}

fn map_row(row: &SqliteRow) -> Result<(ProjectRow, Author), sqlx::Error> {
  let project = ProjectRow::from_row(row)?;
  let author = Author {
    id: project.author_id,
    full_name: row.try_get("author_full_name")?,
    email: row.try_get("author_email")?,
  };
  Ok((project, author))
}
