pub mod categories;
pub mod comments;
pub mod paging;
pub mod projects;
pub mod users;
pub mod votes;
