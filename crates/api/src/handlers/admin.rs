use axum::{
  extract::State,
  http::StatusCode,
  middleware::from_fn_with_state,
  Extension,
};
use serde::Deserialize;
use tracing::{debug, instrument};
use utoipa::ToSchema;
use utoipa_axum::{
  router::{OpenApiRouter, UtoipaMethodRouterExt},
  routes,
};
use uuid::Uuid;

use crate::{
  entities::{
    category::Category,
    project::{Decision, Pagination, Project},
    user::Caller,
  },
  error::ApiResult,
  response::ActionResponse,
  service::{
    mutation::{self, categories::CategoryParams, projects::ProjectParams},
    query,
  },
  AppJson, AppPath, AppQuery, AppState,
};

use super::{auth::auth_guard, projects::ListProjectsParams};

const ADMIN_TAG: &str = "admin";

/// Moderation routes. Every route requires a session; the admin role is
/// checked by the service layer against the caller.
pub fn init_admin_routes(state: AppState) -> OpenApiRouter<AppState> {
  let guard = || from_fn_with_state(state.clone(), auth_guard);

  OpenApiRouter::new()
    .routes(routes!(list_projects).layer(guard()))
    .routes(routes!(review_project).layer(guard()))
    .routes(routes!(update_project).layer(guard()))
    .routes(routes!(delete_project).layer(guard()))
    .routes(routes!(list_categories).layer(guard()))
    .routes(routes!(create_category).layer(guard()))
    .routes(routes!(update_category).layer(guard()))
    .routes(routes!(delete_category).layer(guard()))
}

#[utoipa::path(
  get,
  path = "/projects",
  tag = ADMIN_TAG,
  params(
    ListProjectsParams
  ),
  responses(
    (status = 200, description = "Projects of every status", body = [Project]),
    (status = 401, description = "Unauthorized")
  )
)]
#[instrument(skip(state), fields(user_id = %caller.user_id))]
async fn list_projects(
  State(state): State<AppState>,
  Extension(caller): Extension<Caller>,
  AppQuery(params): AppQuery<ListProjectsParams>,
) -> ApiResult<ActionResponse<Vec<Project>, Pagination>> {
  let filter = params.into_filter()?;

  let (projects, pagination) = query::projects::list_all(&state.pool, &caller, filter).await?;

  Ok(ActionResponse::paginated(projects, pagination))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewProject {
  status: Decision,
}

#[utoipa::path(
  patch,
  path = "/projects/{id}/status",
  tag = ADMIN_TAG,
  request_body = ReviewProject,
  params(
    ("id" = Uuid, Path, description = "Project id")
  ),
  responses(
    (status = 200, description = "Project reviewed", body = Project),
    (status = 401, description = "Unauthorized"),
    (status = 404, description = "Project not found"),
    (status = 409, description = "Project has already been reviewed")
  )
)]
#[instrument(skip(state), fields(project_id = %id, user_id = %caller.user_id))]
async fn review_project(
  State(state): State<AppState>,
  Extension(caller): Extension<Caller>,
  AppPath(id): AppPath<Uuid>,
  AppJson(input): AppJson<ReviewProject>,
) -> ApiResult<ActionResponse<Project>> {
  let project = mutation::projects::review(&state.pool, &caller, id, input.status).await?;

  let message = match input.status {
    Decision::Approved => "Project approved successfully",
    Decision::Rejected => "Project rejected successfully",
  };

  Ok(ActionResponse::data(project).with_message(message))
}

#[utoipa::path(
  put,
  path = "/projects/{id}",
  tag = ADMIN_TAG,
  request_body = ProjectParams,
  params(
    ("id" = Uuid, Path, description = "Project id")
  ),
  responses(
    (status = 200, description = "Project updated successfully", body = Project),
    (status = 400, description = "Validation error"),
    (status = 404, description = "Project not found")
  )
)]
#[instrument(skip(state, input), fields(project_id = %id, user_id = %caller.user_id))]
async fn update_project(
  State(state): State<AppState>,
  Extension(caller): Extension<Caller>,
  AppPath(id): AppPath<Uuid>,
  AppJson(input): AppJson<ProjectParams>,
) -> ApiResult<ActionResponse<Project>> {
  caller.require_admin()?;

  let project = mutation::projects::update(&state.pool, &caller, id, input).await?;

  Ok(ActionResponse::data(project).with_message("Project updated successfully"))
}

#[utoipa::path(
  delete,
  path = "/projects/{id}",
  tag = ADMIN_TAG,
  params(
    ("id" = Uuid, Path, description = "Project id")
  ),
  responses(
    (status = 200, description = "Project successfully deleted"),
    (status = 401, description = "Unauthorized"),
    (status = 404, description = "Project not found")
  )
)]
#[instrument(skip(state), fields(project_id = %id, user_id = %caller.user_id))]
async fn delete_project(
  State(state): State<AppState>,
  Extension(caller): Extension<Caller>,
  AppPath(id): AppPath<Uuid>,
) -> ApiResult<ActionResponse<()>> {
  caller.require_admin()?;

  mutation::projects::delete(&state.pool, &caller, id).await?;

  Ok(ActionResponse::message("Project deleted successfully"))
}

#[utoipa::path(
  get,
  path = "/categories",
  tag = ADMIN_TAG,
  responses(
    (status = 200, description = "Categories with the number of projects using them", body = [Category]),
    (status = 401, description = "Unauthorized")
  )
)]
#[instrument(skip(state), fields(user_id = %caller.user_id))]
async fn list_categories(
  State(state): State<AppState>,
  Extension(caller): Extension<Caller>,
) -> ApiResult<ActionResponse<Vec<Category>>> {
  let categories = query::categories::list_with_counts(&state.pool, &caller).await?;

  Ok(ActionResponse::data(categories))
}

#[utoipa::path(
  post,
  path = "/categories",
  tag = ADMIN_TAG,
  request_body = CategoryParams,
  responses(
    (status = 201, description = "Category created", body = Category),
    (status = 400, description = "Validation error"),
    (status = 401, description = "Unauthorized"),
    (status = 409, description = "Category already exists")
  )
)]
#[instrument(skip(state), fields(user_id = %caller.user_id))]
async fn create_category(
  State(state): State<AppState>,
  Extension(caller): Extension<Caller>,
  AppJson(input): AppJson<CategoryParams>,
) -> ApiResult<(StatusCode, ActionResponse<Category>)> {
  debug!("Create category with request: {:?}", input);

  let category = mutation::categories::create(&state.pool, &caller, input).await?;

  Ok((
    StatusCode::CREATED,
    ActionResponse::data(category).with_message("Category created successfully"),
  ))
}

#[utoipa::path(
  put,
  path = "/categories/{id}",
  tag = ADMIN_TAG,
  request_body = CategoryParams,
  params(
    ("id" = Uuid, Path, description = "Category id")
  ),
  responses(
    (status = 200, description = "Category updated", body = Category),
    (status = 401, description = "Unauthorized"),
    (status = 404, description = "Category not found"),
    (status = 409, description = "Category already exists")
  )
)]
#[instrument(skip(state), fields(category_id = %id, user_id = %caller.user_id))]
async fn update_category(
  State(state): State<AppState>,
  Extension(caller): Extension<Caller>,
  AppPath(id): AppPath<Uuid>,
  AppJson(input): AppJson<CategoryParams>,
) -> ApiResult<ActionResponse<Category>> {
  let category = mutation::categories::update(&state.pool, &caller, id, input).await?;

  Ok(ActionResponse::data(category).with_message("Category updated successfully"))
}

#[utoipa::path(
  delete,
  path = "/categories/{id}",
  tag = ADMIN_TAG,
  params(
    ("id" = Uuid, Path, description = "Category id")
  ),
  responses(
    (status = 200, description = "Category deleted"),
    (status = 401, description = "Unauthorized"),
    (status = 404, description = "Category not found")
  )
)]
#[instrument(skip(state), fields(category_id = %id, user_id = %caller.user_id))]
async fn delete_category(
  State(state): State<AppState>,
  Extension(caller): Extension<Caller>,
  AppPath(id): AppPath<Uuid>,
) -> ApiResult<ActionResponse<()>> {
  mutation::categories::delete(&state.pool, &caller, id).await?;

  Ok(ActionResponse::message("Category deleted successfully"))
}
