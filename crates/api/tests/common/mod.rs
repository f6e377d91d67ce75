#![allow(dead_code)]

use devshowcase_api::{
  entities::{
    category::Category,
    project::{Decision, Project},
    user::{Caller, Role},
  },
  service::{
    mutation::{
      self,
      categories::CategoryParams,
      projects::ProjectParams,
    },
    query,
  },
};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use uuid::Uuid;

const INSERT_USER: &str =
  "INSERT INTO users (id, full_name, full_name_folded, email, password, role) VALUES (?1, ?2, ?3, ?4, 'not-a-hash', ?5)";

/// A single-connection in-memory database with the schema applied.
///
/// Every connection of `sqlite::memory:` is its own database, so the pool
/// must never open a second one.
pub async fn pool() -> SqlitePool {
  let pool = SqlitePoolOptions::new()
    .max_connections(1)
    .idle_timeout(None)
    .max_lifetime(None)
    .connect("sqlite::memory:")
    .await
    .expect("in-memory database");

  devshowcase_api::migrate(&pool).await.expect("migrations apply");
  pool
}

pub async fn user(pool: &SqlitePool, full_name: &str, role: Role) -> Caller {
  let id = Uuid::new_v4();
  let email = format!("{}@example.com", full_name.to_ascii_lowercase().replace(' ', "."));

  sqlx::query(INSERT_USER)
    .bind(id)
    .bind(full_name)
    .bind(full_name.to_lowercase())
    .bind(email)
    .bind(role)
    .execute(pool)
    .await
    .expect("user inserted");

  Caller::new(id, role)
}

pub async fn admin(pool: &SqlitePool) -> Caller {
  user(pool, "Grace Hopper", Role::Admin).await
}

pub async fn category(pool: &SqlitePool, admin: &Caller, name: &str) -> Category {
  mutation::categories::create(
    pool,
    admin,
    CategoryParams {
      name: name.to_string(),
      color: "#3b82f6".to_string(),
    },
  )
  .await
  .expect("category created")
}

pub fn project_params(title: &str, category_ids: Vec<Uuid>) -> ProjectParams {
  ProjectParams {
    title: title.to_string(),
    description: format!("{title} is a small project built for the showcase."),
    github_url: format!("https://github.com/acme/{}", title.to_ascii_lowercase().replace(' ', "-")),
    website_url: None,
    category_ids,
  }
}

pub async fn submit(pool: &SqlitePool, author: &Caller, title: &str, category_ids: Vec<Uuid>) -> Project {
  mutation::projects::submit(pool, author, project_params(title, category_ids))
    .await
    .expect("project submitted")
}

/// Submits a project and has `admin` approve it.
pub async fn approved(pool: &SqlitePool, author: &Caller, admin: &Caller, title: &str, category_ids: Vec<Uuid>) -> Project {
  let project = submit(pool, author, title, category_ids).await;
  mutation::projects::review(pool, admin, project.id, Decision::Approved)
    .await
    .expect("project approved")
}

pub async fn vote_rows(pool: &SqlitePool, project_id: Uuid) -> Vec<i64> {
  sqlx::query_scalar("SELECT value FROM votes WHERE project_id = ?1 ORDER BY value")
    .bind(project_id)
    .fetch_all(pool)
    .await
    .expect("votes fetched")
}

pub async fn find(pool: &SqlitePool, caller: Option<&Caller>, slug: &str) -> Project {
  query::projects::find_by_slug(pool, caller, slug).await.expect("project found")
}
