pub mod category;
pub mod comment;
pub mod project;
pub mod user;
pub mod vote;
