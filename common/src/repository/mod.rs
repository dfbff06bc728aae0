pub mod mongo_repository;
pub mod test_repository;

use std::sync::Arc;

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use crate::entities::activity::Activity;
use crate::entities::issue::{Issue, IssueStatus, Priority, Severity};
use crate::entities::user::User;
use crate::error;

#[derive(Debug, Clone, Default)]
pub struct IssueFilter {
    pub search: Option<String>,
    pub status: Option<IssueStatus>,
    pub priority: Option<Priority>,
    pub severity: Option<Severity>,
    pub assigned_to: Option<ObjectId>,
    pub created_by: Option<ObjectId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    DueDate,
    Title,
    Status,
    Priority,
}

impl SortField {
    pub fn stored_name(self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::DueDate => "due_date",
            SortField::Title => "title",
            SortField::Status => "status",
            SortField::Priority => "priority",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy)]
pub struct IssueSort {
    pub field: SortField,
    pub order: SortOrder,
}

impl Default for IssueSort {
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            order: SortOrder::Desc,
        }
    }
}

#[async_trait]
pub trait UserRepository {
    async fn insert(&self, user: &User) -> error::Result<()>;
    async fn find(&self, id: ObjectId) -> error::Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> error::Result<Option<User>>;
    async fn find_by_ids(&self, ids: &[ObjectId]) -> error::Result<Vec<User>>;
    async fn find_all(&self) -> error::Result<Vec<User>>;
}

/// Issue store. Every mutating operation takes the activity entry that
/// records it and persists both atomically, so an issue write can never
/// land without its audit trail.
#[async_trait]
pub trait IssueRepository {
    async fn create(&self, issue: &Issue, activity: &Activity) -> error::Result<()>;
    async fn find(&self, id: ObjectId) -> error::Result<Option<Issue>>;
    async fn replace(&self, issue: &Issue, activity: &Activity) -> error::Result<()>;
    /// Deletes the issue's activities then the issue itself. The cascade is
    /// explicit; nothing is assumed of the storage layer.
    async fn delete_cascade(&self, id: ObjectId) -> error::Result<Option<Issue>>;
    /// Returns one page plus the total count of the whole filtered set.
    async fn find_page(
        &self,
        filter: &IssueFilter,
        sort: IssueSort,
        skip: u64,
        limit: i64,
    ) -> error::Result<(Vec<Issue>, u64)>;
    async fn find_filtered(
        &self,
        filter: &IssueFilter,
        sort: IssueSort,
    ) -> error::Result<Vec<Issue>>;
    async fn activities(&self, issue_id: ObjectId) -> error::Result<Vec<Activity>>;
}

pub type UserRepositoryObject = Arc<dyn UserRepository + Send + Sync>;
pub type IssueRepositoryObject = Arc<dyn IssueRepository + Send + Sync>;
