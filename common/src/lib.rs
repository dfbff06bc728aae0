pub mod auth;
pub mod auth_session;
pub mod entities;
pub mod error;
pub mod repository;

use chrono::Utc;

pub fn default_timestamp() -> i64 {
    Utc::now().timestamp_micros()
}
