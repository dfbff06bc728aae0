pub mod activity;
pub mod issue;
pub mod user;
