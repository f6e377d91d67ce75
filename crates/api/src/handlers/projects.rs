use axum::{
  extract::State,
  http::StatusCode,
  middleware::from_fn_with_state,
  Extension,
};
use serde::Deserialize;
use tracing::{debug, instrument};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{
  router::{OpenApiRouter, UtoipaMethodRouterExt},
  routes,
};
use uuid::Uuid;

use crate::{
  entities::{
    comment::{Comment, CommentPagination},
    project::{MyProjects, Pagination, Project, ProjectStatus, SortBy},
    user::Caller,
    vote::{VoteState, VoteValue},
  },
  error::{ApiError, ApiResult},
  response::ActionResponse,
  service::{
    mutation::{self, projects::ProjectParams},
    query::{self, projects::ListFilter},
  },
  AppJson, AppPath, AppQuery, AppState,
};

use super::auth::{auth_guard, resolve_caller};

const PROJECTS_TAG: &str = "projects";
const DEFAULT_PAGE: i64 = 1;
const DEFAULT_COMMENTS_PER_PAGE: i64 = 5;

pub fn init_projects_routes(state: AppState) -> OpenApiRouter<AppState> {
  let guard = || from_fn_with_state(state.clone(), auth_guard);
  let soft_guard = || from_fn_with_state(state.clone(), resolve_caller);

  OpenApiRouter::new()
    .routes(routes!(list_projects))
    .routes(routes!(submit_project).layer(guard()))
    .routes(routes!(list_my_projects).layer(guard()))
    .routes(routes!(get_project).layer(soft_guard()))
    .routes(routes!(update_project).layer(guard()))
    .routes(routes!(delete_project).layer(guard()))
    .routes(routes!(get_vote).layer(soft_guard()))
    .routes(routes!(set_vote).layer(guard()))
    .routes(routes!(list_comments))
    .routes(routes!(add_comment).layer(guard()))
}

/// Query string of the project listings. `categoryIds` is a comma separated
/// list and `status` accepts `all`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub(super) struct ListProjectsParams {
  search: Option<String>,
  category_ids: Option<String>,
  status: Option<String>,
  #[param(value_type = Option<String>)]
  sort_by: Option<SortBy>,
  page: Option<i64>,
  page_size: Option<i64>,
}

impl ListProjectsParams {
  pub(super) fn into_filter(self) -> ApiResult<ListFilter> {
    let category_ids = match self.category_ids.as_deref().map(str::trim).filter(|ids| !ids.is_empty()) {
      Some(ids) => ids
        .split(',')
        .map(|id| Uuid::parse_str(id.trim()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ApiError::field("categoryIds", "Select valid categories"))?,
      None => vec![],
    };

    let status = match self.status.as_deref() {
      None | Some("") | Some("all") => None,
      Some(status) => Some(
        status
          .parse::<ProjectStatus>()
          .map_err(|_| ApiError::field("status", "Unknown status"))?,
      ),
    };

    let defaults = ListFilter::default();
    Ok(ListFilter {
      search: self.search,
      category_ids,
      status,
      sort_by: self.sort_by.unwrap_or_default(),
      page: self.page.unwrap_or(defaults.page),
      page_size: self.page_size.unwrap_or(defaults.page_size),
    })
  }
}

#[utoipa::path(
  get,
  path = "",
  tag = PROJECTS_TAG,
  params(
    ListProjectsParams
  ),
  responses(
    (status = 200, description = "Approved projects of the requested page", body = [Project])
  )
)]
#[instrument(skip(state))]
async fn list_projects(
  State(state): State<AppState>,
  AppQuery(params): AppQuery<ListProjectsParams>,
) -> ApiResult<ActionResponse<Vec<Project>, Pagination>> {
  let filter = params.into_filter()?;

  let (projects, pagination) = query::projects::list_approved(&state.pool, filter).await?;

  Ok(ActionResponse::paginated(projects, pagination))
}

#[utoipa::path(
  post,
  path = "",
  tag = PROJECTS_TAG,
  request_body = ProjectParams,
  responses(
    (status = 201, description = "Project submitted for review", body = Project),
    (status = 400, description = "Validation error"),
    (status = 401, description = "Unauthorized")
  )
)]
#[instrument(skip(state, input), fields(user_id = %caller.user_id))]
async fn submit_project(
  State(state): State<AppState>,
  Extension(caller): Extension<Caller>,
  AppJson(input): AppJson<ProjectParams>,
) -> ApiResult<(StatusCode, ActionResponse<Project>)> {
  debug!("Submit new project with request: {:?}", input);

  let project = mutation::projects::submit(&state.pool, &caller, input).await?;

  Ok((
    StatusCode::CREATED,
    ActionResponse::data(project).with_message("Project submitted successfully! It will be visible after approval."),
  ))
}

#[utoipa::path(
  get,
  path = "/mine",
  tag = PROJECTS_TAG,
  params(
    ListProjectsParams
  ),
  responses(
    (status = 200, description = "Projects of the signed in user", body = MyProjects),
    (status = 401, description = "Unauthorized")
  )
)]
#[instrument(skip(state), fields(user_id = %caller.user_id))]
async fn list_my_projects(
  State(state): State<AppState>,
  Extension(caller): Extension<Caller>,
  AppQuery(params): AppQuery<ListProjectsParams>,
) -> ApiResult<ActionResponse<MyProjects, Pagination>> {
  let filter = params.into_filter()?;

  let (projects, pagination) = query::projects::list_mine(&state.pool, &caller, filter).await?;

  Ok(ActionResponse::paginated(projects, pagination))
}

#[utoipa::path(
  get,
  path = "/by-slug/{slug}",
  tag = PROJECTS_TAG,
  params(
    ("slug" = String, Path, description = "Project slug")
  ),
  responses(
    (status = 200, description = "Project details with stats", body = Project),
    (status = 404, description = "Project not found")
  )
)]
#[instrument(skip(state, caller))]
async fn get_project(
  State(state): State<AppState>,
  caller: Option<Extension<Caller>>,
  AppPath(slug): AppPath<String>,
) -> ApiResult<ActionResponse<Project>> {
  let caller = caller.map(|Extension(caller)| caller);

  let project = query::projects::find_by_slug(&state.pool, caller.as_ref(), &slug).await?;

  Ok(ActionResponse::data(project))
}

#[utoipa::path(
  put,
  path = "/{id}",
  tag = PROJECTS_TAG,
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
  debug!("Update project with id {} and params {:?}", id, input);

  let project = mutation::projects::update(&state.pool, &caller, id, input).await?;

  Ok(ActionResponse::data(project).with_message("Project updated successfully"))
}

#[utoipa::path(
  delete,
  path = "/{id}",
  tag = PROJECTS_TAG,
  params(
    ("id" = Uuid, Path, description = "Project id")
  ),
  responses(
    (status = 200, description = "Project successfully deleted"),
    (status = 404, description = "Project not found")
  )
)]
#[instrument(skip(state), fields(project_id = %id, user_id = %caller.user_id))]
async fn delete_project(
  State(state): State<AppState>,
  Extension(caller): Extension<Caller>,
  AppPath(id): AppPath<Uuid>,
) -> ApiResult<ActionResponse<()>> {
  debug!("Remove project with id {}", id);

  mutation::projects::delete(&state.pool, &caller, id).await?;

  Ok(ActionResponse::message("Project deleted successfully"))
}

#[utoipa::path(
  get,
  path = "/{id}/vote",
  tag = PROJECTS_TAG,
  params(
    ("id" = Uuid, Path, description = "Project id")
  ),
  responses(
    (status = 200, description = "Vote of the caller (0 when anonymous) and the live tally", body = VoteState)
  )
)]
#[instrument(skip(state, caller), fields(project_id = %id))]
async fn get_vote(
  State(state): State<AppState>,
  caller: Option<Extension<Caller>>,
  AppPath(id): AppPath<Uuid>,
) -> ApiResult<ActionResponse<VoteState>> {
  let caller = caller.map(|Extension(caller)| caller);

  let (value, tally) = tokio::try_join!(
    query::votes::user_vote(&state.pool, caller.as_ref(), id),
    query::votes::tally(&state.pool, id)
  )?;

  Ok(ActionResponse::data(VoteState::new(value, tally)))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetVote {
  /// -1, 0 (remove the vote) or 1
  value: i64,
}

#[utoipa::path(
  put,
  path = "/{id}/vote",
  tag = PROJECTS_TAG,
  request_body = SetVote,
  params(
    ("id" = Uuid, Path, description = "Project id")
  ),
  responses(
    (status = 200, description = "Vote recorded", body = VoteState),
    (status = 400, description = "Invalid vote value"),
    (status = 401, description = "Unauthorized"),
    (status = 404, description = "Project not found")
  )
)]
#[instrument(skip(state), fields(project_id = %id, user_id = %caller.user_id))]
async fn set_vote(
  State(state): State<AppState>,
  Extension(caller): Extension<Caller>,
  AppPath(id): AppPath<Uuid>,
  AppJson(input): AppJson<SetVote>,
) -> ApiResult<ActionResponse<VoteState>> {
  let value = VoteValue::try_from(input.value)?;

  let vote = mutation::votes::set(&state.pool, &caller, id, value).await?;

  Ok(ActionResponse::data(vote))
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
struct ListCommentsParams {
  page: Option<i64>,
  page_size: Option<i64>,
}

#[utoipa::path(
  get,
  path = "/{id}/comments",
  tag = PROJECTS_TAG,
  params(
    ("id" = Uuid, Path, description = "Project id"),
    ListCommentsParams
  ),
  responses(
    (status = 200, description = "Newest first page of comments", body = [Comment])
  )
)]
#[instrument(skip(state), fields(project_id = %id))]
async fn list_comments(
  State(state): State<AppState>,
  AppPath(id): AppPath<Uuid>,
  AppQuery(params): AppQuery<ListCommentsParams>,
) -> ApiResult<ActionResponse<Vec<Comment>, CommentPagination>> {
  let page = params.page.unwrap_or(DEFAULT_PAGE);
  let comments_per_page = params.page_size.unwrap_or(DEFAULT_COMMENTS_PER_PAGE);

  let (comments, pagination) = query::comments::list(&state.pool, id, page, comments_per_page).await?;

  Ok(ActionResponse::paginated(comments, pagination))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddComment {
  content: String,
}

#[utoipa::path(
  post,
  path = "/{id}/comments",
  tag = PROJECTS_TAG,
  request_body = AddComment,
  params(
    ("id" = Uuid, Path, description = "Project id")
  ),
  responses(
    (status = 201, description = "Comment added", body = Comment),
    (status = 400, description = "Comment cannot be empty"),
    (status = 401, description = "Unauthorized"),
    (status = 404, description = "Project not found")
  )
)]
#[instrument(skip(state, input), fields(project_id = %id, user_id = %caller.user_id))]
async fn add_comment(
  State(state): State<AppState>,
  Extension(caller): Extension<Caller>,
  AppPath(id): AppPath<Uuid>,
  AppJson(input): AppJson<AddComment>,
) -> ApiResult<(StatusCode, ActionResponse<Comment>)> {
  let comment = mutation::comments::add(&state.pool, &caller, id, &input.content).await?;

  Ok((StatusCode::CREATED, ActionResponse::data(comment)))
}
