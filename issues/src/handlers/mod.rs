pub mod issue;
pub mod query;
