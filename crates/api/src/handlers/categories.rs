use axum::extract::State;
use tracing::instrument;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::{entities::category::Category, error::ApiResult, response::ActionResponse, service::query, AppState};

const CATEGORIES_TAG: &str = "categories";

pub fn init_categories_routes() -> OpenApiRouter<AppState> {
  OpenApiRouter::new().routes(routes!(list_categories))
}

#[utoipa::path(
  get,
  path = "",
  tag = CATEGORIES_TAG,
  responses(
    (status = 200, description = "All categories ordered by name", body = [Category])
  )
)]
#[instrument(skip(state))]
async fn list_categories(State(state): State<AppState>) -> ApiResult<ActionResponse<Vec<Category>>> {
  let categories = query::categories::list(&state.pool).await?;

  Ok(ActionResponse::data(categories))
}
