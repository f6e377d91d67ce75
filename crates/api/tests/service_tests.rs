mod common;

use std::collections::HashSet;

use devshowcase_api::{
  entities::{
    project::{Decision, ProjectStatus, SortBy},
    user::Role,
    vote::VoteValue,
  },
  error::ApiError,
  service::{
    mutation::{self, categories::CategoryParams, projects::ProjectParams},
    query::{self, paging, projects::ListFilter},
  },
};
use uuid::Uuid;

#[tokio::test]
async fn test_vote_is_upserted_per_user() {
  let pool = common::pool().await;
  let admin = common::admin(&pool).await;
  let author = common::user(&pool, "Ada Lovelace", Role::User).await;
  let voter = common::user(&pool, "Alan Turing", Role::User).await;
  let web = common::category(&pool, &admin, "Web").await;
  let project = common::approved(&pool, &author, &admin, "Rust Parser", vec![web.id]).await;

  let state = mutation::votes::set(&pool, &voter, project.id, VoteValue::Up).await.unwrap();
  assert_eq!((state.value, state.upvotes, state.downvotes, state.score), (1, 1, 0, 1));

  let state = mutation::votes::set(&pool, &voter, project.id, VoteValue::Down).await.unwrap();
  assert_eq!((state.value, state.upvotes, state.downvotes, state.score), (-1, 0, 1, -1));
  assert_eq!(common::vote_rows(&pool, project.id).await, vec![-1]);

  let state = mutation::votes::set(&pool, &author, project.id, VoteValue::Up).await.unwrap();
  assert_eq!((state.upvotes, state.downvotes, state.score), (1, 1, 0));
  assert_eq!(common::vote_rows(&pool, project.id).await, vec![-1, 1]);

  let found = common::find(&pool, None, &project.slug).await;
  assert_eq!((found.stats.upvotes, found.stats.downvotes), (1, 1));
}

#[tokio::test]
async fn test_clearing_a_vote() {
  let pool = common::pool().await;
  let admin = common::admin(&pool).await;
  let voter = common::user(&pool, "Alan Turing", Role::User).await;
  let web = common::category(&pool, &admin, "Web").await;
  let project = common::approved(&pool, &admin, &admin, "Rust Parser", vec![web.id]).await;

  // Nothing to clear yet.
  let state = mutation::votes::set(&pool, &voter, project.id, VoteValue::Clear).await.unwrap();
  assert_eq!((state.value, state.score), (0, 0));

  mutation::votes::set(&pool, &voter, project.id, VoteValue::Up).await.unwrap();
  assert_eq!(
    query::votes::user_vote(&pool, Some(&voter), project.id).await.unwrap(),
    VoteValue::Up
  );

  let state = mutation::votes::set(&pool, &voter, project.id, VoteValue::Clear).await.unwrap();
  assert_eq!((state.value, state.upvotes, state.downvotes), (0, 0, 0));
  assert!(common::vote_rows(&pool, project.id).await.is_empty());
  assert_eq!(
    query::votes::user_vote(&pool, Some(&voter), project.id).await.unwrap(),
    VoteValue::Clear
  );
  assert_eq!(query::votes::user_vote(&pool, None, project.id).await.unwrap(), VoteValue::Clear);
}

#[tokio::test]
async fn test_vote_on_missing_project() {
  let pool = common::pool().await;
  let voter = common::user(&pool, "Alan Turing", Role::User).await;

  let err = mutation::votes::set(&pool, &voter, Uuid::new_v4(), VoteValue::Up).await.unwrap_err();
  assert!(matches!(err, ApiError::ResourceNotFound("Project")));
}

#[tokio::test]
async fn test_comment_pages_are_disjoint() {
  let pool = common::pool().await;
  let admin = common::admin(&pool).await;
  let reader = common::user(&pool, "Alan Turing", Role::User).await;
  let web = common::category(&pool, &admin, "Web").await;
  let project = common::approved(&pool, &admin, &admin, "Rust Parser", vec![web.id]).await;

  for i in 0..7 {
    mutation::comments::add(&pool, &reader, project.id, &format!("  comment {i}  "))
      .await
      .unwrap();
  }

  let (first, pagination) = query::comments::list(&pool, project.id, 1, 5).await.unwrap();
  assert_eq!(first.len(), 5);
  assert_eq!(pagination.total_count, 7);
  assert!(pagination.has_more);
  assert_eq!(first[0].content, "comment 6");
  assert_eq!(first[0].author_name, "Alan Turing");

  let (second, pagination) = query::comments::list(&pool, project.id, 2, 5).await.unwrap();
  assert_eq!(second.len(), 2);
  assert!(!pagination.has_more);
  assert_eq!(second[1].content, "comment 0");

  let ids: HashSet<Uuid> = first.iter().chain(second.iter()).map(|c| c.id).collect();
  assert_eq!(ids.len(), 7);

  let found = common::find(&pool, None, &project.slug).await;
  assert_eq!(found.stats.comment_count, 7);
}

#[tokio::test]
async fn test_blank_comment_is_rejected() {
  let pool = common::pool().await;
  let admin = common::admin(&pool).await;
  let web = common::category(&pool, &admin, "Web").await;
  let project = common::approved(&pool, &admin, &admin, "Rust Parser", vec![web.id]).await;

  let err = mutation::comments::add(&pool, &admin, project.id, "   \n ").await.unwrap_err();
  assert!(matches!(err, ApiError::EmptyComment));

  let (comments, pagination) = query::comments::list(&pool, project.id, 1, 5).await.unwrap();
  assert!(comments.is_empty());
  assert_eq!(pagination.total_count, 0);
}

#[tokio::test]
async fn test_submitted_project_is_hidden_until_approved() {
  let pool = common::pool().await;
  let admin = common::admin(&pool).await;
  let author = common::user(&pool, "Ada Lovelace", Role::User).await;
  let stranger = common::user(&pool, "Alan Turing", Role::User).await;
  let web = common::category(&pool, &admin, "Web").await;

  let project = common::submit(&pool, &author, "Rust Parser", vec![web.id]).await;
  assert_eq!(project.status, ProjectStatus::Pending);
  assert!(project.slug.starts_with("rust-parser-"));
  assert_eq!(project.slug.len(), "rust-parser-".len() + 5);
  assert_eq!(project.author.full_name, "Ada Lovelace");
  assert_eq!(project.categories[0].slug, "web");

  let (listed, pagination) = query::projects::list_approved(&pool, ListFilter::default()).await.unwrap();
  assert!(listed.is_empty());
  assert_eq!(pagination.total_count, 0);

  let err = query::projects::find_by_slug(&pool, None, &project.slug).await.unwrap_err();
  assert!(matches!(err, ApiError::ResourceNotFound(_)));
  let err = query::projects::find_by_slug(&pool, Some(&stranger), &project.slug)
    .await
    .unwrap_err();
  assert!(matches!(err, ApiError::ResourceNotFound(_)));
  common::find(&pool, Some(&author), &project.slug).await;
  common::find(&pool, Some(&admin), &project.slug).await;

  mutation::projects::review(&pool, &admin, project.id, Decision::Approved)
    .await
    .unwrap();

  let (listed, _) = query::projects::list_approved(&pool, ListFilter::default()).await.unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].status, ProjectStatus::Approved);
  assert_eq!(common::find(&pool, None, &project.slug).await.id, project.id);
}

#[tokio::test]
async fn test_submit_with_unknown_category() {
  let pool = common::pool().await;
  let author = common::user(&pool, "Ada Lovelace", Role::User).await;

  let err = mutation::projects::submit(&pool, &author, common::project_params("Rust Parser", vec![Uuid::new_v4()]))
    .await
    .unwrap_err();

  let ApiError::Validation(errors) = err else {
    panic!("expected validation error");
  };
  assert_eq!(errors.get("categoryIds"), Some("Select valid categories"));

  let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects").fetch_one(&pool).await.unwrap();
  assert_eq!(count, 0);
}

#[tokio::test]
async fn test_explore_search_filter_and_sort() {
  let pool = common::pool().await;
  let admin = common::admin(&pool).await;
  let author = common::user(&pool, "Ada Lovelace", Role::User).await;
  let web = common::category(&pool, &admin, "Web").await;
  let ml = common::category(&pool, &admin, "Machine Learning").await;

  let parser = common::approved(&pool, &author, &admin, "Rust Parser", vec![web.id]).await;
  let assistant = common::approved(&pool, &author, &admin, "AI Assistant", vec![ml.id, web.id]).await;
  let tracker = common::approved(&pool, &author, &admin, "Budget Tracker", vec![ml.id]).await;
  common::submit(&pool, &author, "Pending AI Tool", vec![ml.id]).await;

  let search = |s: &str| ListFilter {
    search: Some(s.to_string()),
    ..Default::default()
  };

  let (found, _) = query::projects::list_approved(&pool, search("ai")).await.unwrap();
  assert_eq!(found.iter().map(|p| p.id).collect::<Vec<_>>(), vec![assistant.id]);

  let (found, _) = query::projects::list_approved(&pool, search("lovelace")).await.unwrap();
  assert_eq!(found.len(), 3);

  let (found, _) = query::projects::list_approved(&pool, search("100%")).await.unwrap();
  assert!(found.is_empty());

  let filter = ListFilter {
    category_ids: vec![ml.id],
    ..Default::default()
  };
  let (found, pagination) = query::projects::list_approved(&pool, filter).await.unwrap();
  assert_eq!(found.iter().map(|p| p.id).collect::<Vec<_>>(), vec![tracker.id, assistant.id]);
  assert_eq!(pagination.total_count, 2);

  let filter = ListFilter {
    sort_by: SortBy::Alphabetical,
    ..Default::default()
  };
  let (found, _) = query::projects::list_approved(&pool, filter).await.unwrap();
  let titles: Vec<_> = found.iter().map(|p| p.title.as_str()).collect();
  assert_eq!(titles, vec!["AI Assistant", "Budget Tracker", "Rust Parser"]);

  let filter = ListFilter {
    sort_by: SortBy::Oldest,
    page_size: 2,
    page: 2,
    ..Default::default()
  };
  let (found, pagination) = query::projects::list_approved(&pool, filter).await.unwrap();
  assert_eq!(found.iter().map(|p| p.id).collect::<Vec<_>>(), vec![tracker.id]);
  assert_eq!(pagination.total_pages, 2);
  assert_eq!(pagination.current_page, 2);

  // Status asked by the client never widens the public listing.
  let filter = ListFilter {
    status: Some(ProjectStatus::Pending),
    ..Default::default()
  };
  let (found, _) = query::projects::list_approved(&pool, filter).await.unwrap();
  assert_eq!(found.len(), 3);
  assert!(found.iter().any(|p| p.id == parser.id));
}

#[tokio::test]
async fn test_my_projects_with_status_counts() {
  let pool = common::pool().await;
  let admin = common::admin(&pool).await;
  let author = common::user(&pool, "Ada Lovelace", Role::User).await;
  let other = common::user(&pool, "Alan Turing", Role::User).await;
  let web = common::category(&pool, &admin, "Web").await;

  common::approved(&pool, &author, &admin, "Rust Parser", vec![web.id]).await;
  let rejected = common::submit(&pool, &author, "Budget Tracker", vec![web.id]).await;
  mutation::projects::review(&pool, &admin, rejected.id, Decision::Rejected)
    .await
    .unwrap();
  common::submit(&pool, &author, "Chess Engine", vec![web.id]).await;
  common::submit(&pool, &other, "Weather Station", vec![web.id]).await;

  let (mine, pagination) = query::projects::list_mine(&pool, &author, ListFilter::default())
    .await
    .unwrap();
  assert_eq!(pagination.total_count, 3);
  assert_eq!(mine.projects[0].title, "Chess Engine");
  assert_eq!(mine.status_counts.all, 3);
  assert_eq!(mine.status_counts.pending, 1);
  assert_eq!(mine.status_counts.approved, 1);
  assert_eq!(mine.status_counts.rejected, 1);

  let filter = ListFilter {
    status: Some(ProjectStatus::Rejected),
    ..Default::default()
  };
  let (mine, _) = query::projects::list_mine(&pool, &author, filter).await.unwrap();
  assert_eq!(mine.projects.len(), 1);
  assert_eq!(mine.projects[0].id, rejected.id);
  assert_eq!(mine.status_counts.all, 3);
}

#[tokio::test]
async fn test_only_owner_or_admin_manage_a_project() {
  let pool = common::pool().await;
  let admin = common::admin(&pool).await;
  let author = common::user(&pool, "Ada Lovelace", Role::User).await;
  let stranger = common::user(&pool, "Alan Turing", Role::User).await;
  let web = common::category(&pool, &admin, "Web").await;
  let ml = common::category(&pool, &admin, "Machine Learning").await;
  let project = common::approved(&pool, &author, &admin, "Rust Parser", vec![web.id]).await;

  let err = mutation::projects::update(&pool, &stranger, project.id, common::project_params("Hijacked", vec![web.id]))
    .await
    .unwrap_err();
  assert!(matches!(err, ApiError::ResourceNotFound(_)));
  let err = mutation::projects::delete(&pool, &stranger, project.id).await.unwrap_err();
  assert!(matches!(err, ApiError::ResourceNotFound(_)));

  let updated = mutation::projects::update(&pool, &author, project.id, common::project_params("Rust Lexer", vec![ml.id]))
    .await
    .unwrap();
  assert_eq!(updated.title, "Rust Lexer");
  assert_eq!(updated.slug, project.slug);
  assert_eq!(updated.status, ProjectStatus::Approved);
  assert_eq!(updated.categories.len(), 1);
  assert_eq!(updated.categories[0].id, ml.id);

  mutation::projects::update(&pool, &admin, project.id, common::project_params("Rust Compiler", vec![web.id]))
    .await
    .unwrap();
}

#[tokio::test]
async fn test_delete_removes_votes_and_comments() {
  let pool = common::pool().await;
  let admin = common::admin(&pool).await;
  let author = common::user(&pool, "Ada Lovelace", Role::User).await;
  let web = common::category(&pool, &admin, "Web").await;
  let project = common::approved(&pool, &author, &admin, "Rust Parser", vec![web.id]).await;

  mutation::votes::set(&pool, &admin, project.id, VoteValue::Up).await.unwrap();
  mutation::comments::add(&pool, &admin, project.id, "Great work").await.unwrap();

  mutation::projects::delete(&pool, &author, project.id).await.unwrap();

  for table in ["votes", "comments", "project_categories"] {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
      .fetch_one(&pool)
      .await
      .unwrap();
    assert_eq!(count, 0, "{table} still has rows");
  }

  let err = query::projects::find_by_slug(&pool, Some(&admin), &project.slug)
    .await
    .unwrap_err();
  assert!(matches!(err, ApiError::ResourceNotFound(_)));
}

#[tokio::test]
async fn test_review_requires_admin() {
  let pool = common::pool().await;
  let admin = common::admin(&pool).await;
  let author = common::user(&pool, "Ada Lovelace", Role::User).await;
  let web = common::category(&pool, &admin, "Web").await;
  let project = common::submit(&pool, &author, "Rust Parser", vec![web.id]).await;

  let err = mutation::projects::review(&pool, &author, project.id, Decision::Approved)
    .await
    .unwrap_err();
  assert!(matches!(err, ApiError::Unauthorized));
  assert_eq!(
    common::find(&pool, Some(&author), &project.slug).await.status,
    ProjectStatus::Pending
  );

  let err = query::projects::list_all(&pool, &author, ListFilter::default())
    .await
    .unwrap_err();
  assert!(matches!(err, ApiError::Unauthorized));
}

#[tokio::test]
async fn test_project_is_reviewed_once() {
  let pool = common::pool().await;
  let admin = common::admin(&pool).await;
  let author = common::user(&pool, "Ada Lovelace", Role::User).await;
  let web = common::category(&pool, &admin, "Web").await;
  let project = common::submit(&pool, &author, "Rust Parser", vec![web.id]).await;

  let reviewed = mutation::projects::review(&pool, &admin, project.id, Decision::Rejected)
    .await
    .unwrap();
  assert_eq!(reviewed.status, ProjectStatus::Rejected);

  let err = mutation::projects::review(&pool, &admin, project.id, Decision::Approved)
    .await
    .unwrap_err();
  assert!(matches!(err, ApiError::AlreadyReviewed));
  assert_eq!(
    common::find(&pool, Some(&admin), &project.slug).await.status,
    ProjectStatus::Rejected
  );

  let err = mutation::projects::review(&pool, &admin, Uuid::new_v4(), Decision::Approved)
    .await
    .unwrap_err();
  assert!(matches!(err, ApiError::ResourceNotFound(_)));

  let filter = ListFilter {
    status: Some(ProjectStatus::Rejected),
    ..Default::default()
  };
  let (all, _) = query::projects::list_all(&pool, &admin, filter).await.unwrap();
  assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn test_category_management() {
  let pool = common::pool().await;
  let admin = common::admin(&pool).await;
  let author = common::user(&pool, "Ada Lovelace", Role::User).await;

  let params = |name: &str| CategoryParams {
    name: name.to_string(),
    color: "#10b981".to_string(),
  };

  let err = mutation::categories::create(&pool, &author, params("Games")).await.unwrap_err();
  assert!(matches!(err, ApiError::Unauthorized));

  let err = mutation::categories::create(&pool, &admin, params(" G ")).await.unwrap_err();
  let ApiError::Validation(errors) = err else {
    panic!("expected validation error");
  };
  assert_eq!(errors.get("name"), Some("Category name must be at least 2 characters"));

  let games = mutation::categories::create(&pool, &admin, params("  Games ")).await.unwrap();
  assert_eq!(games.name, "Games");
  assert_eq!(games.slug, "games");

  let err = mutation::categories::create(&pool, &admin, params("Games")).await.unwrap_err();
  assert!(matches!(err, ApiError::CategoryAlreadyExist(_)));

  let web = common::category(&pool, &admin, "Web").await;
  common::submit(&pool, &author, "Rust Parser", vec![web.id, games.id]).await;

  let renamed = mutation::categories::update(&pool, &admin, games.id, params("Game Dev")).await.unwrap();
  assert_eq!(renamed.slug, "game-dev");

  let counted = query::categories::list_with_counts(&pool, &admin).await.unwrap();
  let names: Vec<_> = counted.iter().map(|c| (c.name.as_str(), c.project_count)).collect();
  assert_eq!(names, vec![("Game Dev", Some(1)), ("Web", Some(1))]);

  mutation::categories::delete(&pool, &admin, games.id).await.unwrap();
  let err = mutation::categories::delete(&pool, &admin, games.id).await.unwrap_err();
  assert!(matches!(err, ApiError::ResourceNotFound("Category")));

  let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM project_categories")
    .fetch_one(&pool)
    .await
    .unwrap();
  assert_eq!(links, 1);
}

#[tokio::test]
async fn test_bootstrap_seeds_categories_and_admin() {
  let pool = common::pool().await;
  let user = common::user(&pool, "Ada Lovelace", Role::User).await;

  devshowcase_api::bootstrap(&pool, Some("ADA.lovelace@example.com")).await.unwrap();
  devshowcase_api::bootstrap(&pool, Some("ghost@example.com")).await.unwrap();

  let categories = query::categories::list(&pool).await.unwrap();
  assert_eq!(categories.len(), 8);

  let promoted = query::users::find_by_id(&pool, user.user_id).await.unwrap().unwrap();
  assert_eq!(promoted.role, Role::Admin);
}

#[tokio::test]
async fn test_huge_page_numbers_return_empty_pages() {
  let pool = common::pool().await;
  let admin = common::admin(&pool).await;
  let web = common::category(&pool, &admin, "Web").await;
  let project = common::approved(&pool, &admin, &admin, "Rust Parser", vec![web.id]).await;
  mutation::comments::add(&pool, &admin, project.id, "first").await.unwrap();

  let filter = ListFilter {
    page: i64::MAX,
    page_size: 6,
    ..Default::default()
  };
  let (found, pagination) = query::projects::list_approved(&pool, filter).await.unwrap();
  assert!(found.is_empty());
  assert_eq!(pagination.total_count, 1);
  assert_eq!(pagination.current_page, paging::MAX_PAGE);

  let (comments, pagination) = query::comments::list(&pool, project.id, i64::MAX, i64::MAX).await.unwrap();
  assert!(comments.is_empty());
  assert_eq!(pagination.total_count, 1);
  assert!(!pagination.has_more);
}

#[tokio::test]
async fn test_search_folds_non_ascii_case() {
  let pool = common::pool().await;
  let admin = common::admin(&pool).await;
  let author = common::user(&pool, "Zoë Émile", Role::User).await;
  let web = common::category(&pool, &admin, "Web").await;
  common::approved(&pool, &admin, &admin, "Rust Parser", vec![web.id]).await;

  let params = ProjectParams {
    github_url: "https://github.com/zoe/elan-tracker".to_string(),
    ..common::project_params("Élan Tracker", vec![web.id])
  };
  let project = mutation::projects::submit(&pool, &author, params).await.unwrap();
  let tracker = mutation::projects::review(&pool, &admin, project.id, Decision::Approved)
    .await
    .unwrap();

  for term in ["élan", "ÉLAN", "Élan", "émile", "ZOË"] {
    let filter = ListFilter {
      search: Some(term.to_string()),
      ..Default::default()
    };
    let (found, _) = query::projects::list_approved(&pool, filter).await.unwrap();
    assert_eq!(found.iter().map(|p| p.id).collect::<Vec<_>>(), vec![tracker.id], "{term}");
  }

  // Edits keep the folded copy in step with the title.
  let params = ProjectParams {
    github_url: "https://github.com/zoe/elan-tracker".to_string(),
    ..common::project_params("Øresund Bridge Log", vec![web.id])
  };
  mutation::projects::update(&pool, &author, tracker.id, params).await.unwrap();

  let search = |term: &str| ListFilter {
    search: Some(term.to_string()),
    ..Default::default()
  };
  let (found, _) = query::projects::list_approved(&pool, search("øresund")).await.unwrap();
  assert_eq!(found.len(), 1);
  let (found, _) = query::projects::list_approved(&pool, search("élan")).await.unwrap();
  assert!(found.is_empty());
}

#[tokio::test]
async fn test_listing_stats_match_vote_rows() {
  let pool = common::pool().await;
  let admin = common::admin(&pool).await;
  let author = common::user(&pool, "Ada Lovelace", Role::User).await;
  let alan = common::user(&pool, "Alan Turing", Role::User).await;
  let barbara = common::user(&pool, "Barbara Liskov", Role::User).await;
  let web = common::category(&pool, &admin, "Web").await;

  let parser = common::approved(&pool, &author, &admin, "Rust Parser", vec![web.id]).await;
  let tracker = common::approved(&pool, &author, &admin, "Budget Tracker", vec![web.id]).await;
  let quiet = common::approved(&pool, &author, &admin, "Quiet Project", vec![web.id]).await;

  mutation::votes::set(&pool, &alan, parser.id, VoteValue::Up).await.unwrap();
  mutation::votes::set(&pool, &barbara, parser.id, VoteValue::Down).await.unwrap();
  mutation::votes::set(&pool, &alan, tracker.id, VoteValue::Up).await.unwrap();
  mutation::votes::set(&pool, &barbara, tracker.id, VoteValue::Up).await.unwrap();
  mutation::votes::set(&pool, &author, tracker.id, VoteValue::Down).await.unwrap();
  mutation::comments::add(&pool, &alan, parser.id, "nice").await.unwrap();
  mutation::comments::add(&pool, &barbara, tracker.id, "neat").await.unwrap();
  mutation::comments::add(&pool, &alan, tracker.id, "agreed").await.unwrap();

  let expected = [(parser.id, 1, 1, 1), (tracker.id, 2, 1, 2), (quiet.id, 0, 0, 0)];

  let (public, _) = query::projects::list_approved(&pool, ListFilter::default()).await.unwrap();
  let (moderated, _) = query::projects::list_all(&pool, &admin, ListFilter::default()).await.unwrap();

  for listing in [&public, &moderated] {
    assert_eq!(listing.len(), 3);
    for (id, upvotes, downvotes, comments) in expected {
      let project = listing.iter().find(|p| p.id == id).unwrap();
      let rows = common::vote_rows(&pool, id).await;

      assert_eq!(project.stats.upvotes, upvotes);
      assert_eq!(project.stats.downvotes, downvotes);
      assert_eq!(project.stats.upvotes, rows.iter().filter(|v| **v == 1).count() as i64);
      assert_eq!(project.stats.downvotes, rows.iter().filter(|v| **v == -1).count() as i64);
      assert_eq!(project.stats.comment_count, comments);
    }
  }
}
