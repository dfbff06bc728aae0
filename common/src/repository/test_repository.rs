use std::sync::Mutex;

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use crate::entities::activity::Activity;
use crate::entities::issue::Issue;
use crate::entities::user::User;
use crate::error::{self, ServiceError};

use super::{IssueFilter, IssueRepository, IssueSort, SortField, SortOrder, UserRepository};

/// In-memory stand-ins for the Mongo repositories, used by handler tests.

#[derive(Default)]
pub struct TestUserRepository {
    db: Mutex<Vec<User>>,
}

impl TestUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for TestUserRepository {
    async fn insert(&self, user: &User) -> error::Result<()> {
        self.db.lock().unwrap().push(user.clone());
        Ok(())
    }

    async fn find(&self, id: ObjectId) -> error::Result<Option<User>> {
        Ok(self
            .db
            .lock()
            .unwrap()
            .iter()
            .find(|user| user.id == id)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> error::Result<Option<User>> {
        Ok(self
            .db
            .lock()
            .unwrap()
            .iter()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn find_by_ids(&self, ids: &[ObjectId]) -> error::Result<Vec<User>> {
        Ok(self
            .db
            .lock()
            .unwrap()
            .iter()
            .filter(|user| ids.contains(&user.id))
            .cloned()
            .collect())
    }

    async fn find_all(&self) -> error::Result<Vec<User>> {
        Ok(self.db.lock().unwrap().clone())
    }
}

#[derive(Default)]
struct IssueDb {
    issues: Vec<Issue>,
    activities: Vec<Activity>,
}

#[derive(Default)]
pub struct TestIssueRepository {
    db: Mutex<IssueDb>,
}

impl TestIssueRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(issue: &Issue, filter: &IssueFilter) -> bool {
    if filter.status.map_or(false, |status| issue.status != status) {
        return false;
    }
    if filter
        .priority
        .map_or(false, |priority| issue.priority != priority)
    {
        return false;
    }
    if filter
        .severity
        .map_or(false, |severity| issue.severity != severity)
    {
        return false;
    }
    if filter
        .assigned_to
        .map_or(false, |id| issue.assigned_to != Some(id))
    {
        return false;
    }
    if filter
        .created_by
        .map_or(false, |id| issue.created_by != id)
    {
        return false;
    }
    if let Some(search) = &filter.search {
        let needle = search.to_lowercase();
        if !issue.title.to_lowercase().contains(&needle)
            && !issue.description.to_lowercase().contains(&needle)
        {
            return false;
        }
    }
    true
}

fn sort_issues(issues: &mut [Issue], sort: IssueSort) {
    match sort.field {
        SortField::CreatedAt => issues.sort_by_key(|issue| issue.created_at),
        SortField::DueDate => issues.sort_by_key(|issue| issue.due_date),
        SortField::Title => issues.sort_by(|a, b| a.title.cmp(&b.title)),
        SortField::Status => issues.sort_by_key(|issue| issue.status),
        SortField::Priority => issues.sort_by_key(|issue| issue.priority),
    }
    if sort.order == SortOrder::Desc {
        issues.reverse();
    }
}

#[async_trait]
impl IssueRepository for TestIssueRepository {
    async fn create(&self, issue: &Issue, activity: &Activity) -> error::Result<()> {
        let mut db = self.db.lock().unwrap();
        db.issues.push(issue.clone());
        db.activities.push(activity.clone());
        Ok(())
    }

    async fn find(&self, id: ObjectId) -> error::Result<Option<Issue>> {
        Ok(self
            .db
            .lock()
            .unwrap()
            .issues
            .iter()
            .find(|issue| issue.id == id)
            .cloned())
    }

    async fn replace(&self, issue: &Issue, activity: &Activity) -> error::Result<()> {
        let mut db = self.db.lock().unwrap();
        let Some(slot) = db.issues.iter_mut().find(|stored| stored.id == issue.id) else {
            return Err(ServiceError::not_found("Issue not found"));
        };
        *slot = issue.clone();
        db.activities.push(activity.clone());
        Ok(())
    }

    async fn delete_cascade(&self, id: ObjectId) -> error::Result<Option<Issue>> {
        let mut db = self.db.lock().unwrap();
        db.activities.retain(|activity| activity.issue_id != id);

        let pos = db.issues.iter().position(|issue| issue.id == id);
        Ok(pos.map(|pos| db.issues.remove(pos)))
    }

    async fn find_page(
        &self,
        filter: &IssueFilter,
        sort: IssueSort,
        skip: u64,
        limit: i64,
    ) -> error::Result<(Vec<Issue>, u64)> {
        let mut filtered = self.find_filtered(filter, sort).await?;
        let total = filtered.len() as u64;
        let page = filtered
            .drain(..)
            .skip(skip as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn find_filtered(
        &self,
        filter: &IssueFilter,
        sort: IssueSort,
    ) -> error::Result<Vec<Issue>> {
        let mut filtered: Vec<Issue> = self
            .db
            .lock()
            .unwrap()
            .issues
            .iter()
            .filter(|issue| matches(issue, filter))
            .cloned()
            .collect();
        sort_issues(&mut filtered, sort);
        Ok(filtered)
    }

    async fn activities(&self, issue_id: ObjectId) -> error::Result<Vec<Activity>> {
        let mut entries: Vec<Activity> = self
            .db
            .lock()
            .unwrap()
            .activities
            .iter()
            .filter(|activity| activity.issue_id == issue_id)
            .cloned()
            .collect();
        entries.sort_by_key(|activity| activity.timestamp);
        Ok(entries)
    }
}
