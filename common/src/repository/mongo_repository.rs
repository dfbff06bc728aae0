use async_trait::async_trait;
use futures::StreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    options::FindOptions,
    Client, ClientSession, Collection,
};

use crate::entities::activity::Activity;
use crate::entities::issue::Issue;
use crate::entities::user::User;
use crate::error::{self, ServiceError};

use super::{IssueFilter, IssueRepository, IssueSort, SortOrder, UserRepository};

const DATABASE: &str = "tracker";

#[derive(Debug, Clone)]
pub struct MongoUserRepository {
    inner: Collection<User>,
}

impl MongoUserRepository {
    const COLLECTION: &'static str = "users";

    pub async fn new(mongo_uri: &str) -> Self {
        let client = Client::with_uri_str(mongo_uri).await.unwrap();
        let inner = client.database(DATABASE).collection(Self::COLLECTION);
        Self { inner }
    }
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    async fn insert(&self, user: &User) -> error::Result<()> {
        self.inner.insert_one(user, None).await?;
        Ok(())
    }

    async fn find(&self, id: ObjectId) -> error::Result<Option<User>> {
        Ok(self.inner.find_one(doc! {"id": id}, None).await?)
    }

    async fn find_by_email(&self, email: &str) -> error::Result<Option<User>> {
        Ok(self.inner.find_one(doc! {"email": email}, None).await?)
    }

    async fn find_by_ids(&self, ids: &[ObjectId]) -> error::Result<Vec<User>> {
        let cursor = self
            .inner
            .find(doc! {"id": {"$in": ids.to_vec()}}, None)
            .await?;
        collect(cursor).await
    }

    async fn find_all(&self) -> error::Result<Vec<User>> {
        let cursor = self.inner.find(None, None).await?;
        collect(cursor).await
    }
}

#[derive(Debug, Clone)]
pub struct MongoIssueRepository {
    client: Client,
    issues: Collection<Issue>,
    activities: Collection<Activity>,
}

impl MongoIssueRepository {
    const ISSUES: &'static str = "issues";
    const ACTIVITIES: &'static str = "activities";

    pub async fn new(mongo_uri: &str) -> Self {
        let client = Client::with_uri_str(mongo_uri).await.unwrap();
        let db = client.database(DATABASE);
        Self {
            issues: db.collection(Self::ISSUES),
            activities: db.collection(Self::ACTIVITIES),
            client,
        }
    }

    async fn transaction(&self) -> error::Result<ClientSession> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;
        Ok(session)
    }

    async fn append_and_commit(
        &self,
        mut session: ClientSession,
        activity: &Activity,
    ) -> error::Result<()> {
        if let Err(err) = self
            .activities
            .insert_one_with_session(activity, None, &mut session)
            .await
        {
            let _ = session.abort_transaction().await;
            return Err(err.into());
        }
        session.commit_transaction().await?;
        Ok(())
    }
}

#[async_trait]
impl IssueRepository for MongoIssueRepository {
    async fn create(&self, issue: &Issue, activity: &Activity) -> error::Result<()> {
        let mut session = self.transaction().await?;

        if let Err(err) = self
            .issues
            .insert_one_with_session(issue, None, &mut session)
            .await
        {
            let _ = session.abort_transaction().await;
            return Err(err.into());
        }
        self.append_and_commit(session, activity).await
    }

    async fn find(&self, id: ObjectId) -> error::Result<Option<Issue>> {
        Ok(self.issues.find_one(doc! {"id": id}, None).await?)
    }

    async fn replace(&self, issue: &Issue, activity: &Activity) -> error::Result<()> {
        let mut session = self.transaction().await?;

        let replaced = self
            .issues
            .find_one_and_replace_with_session(doc! {"id": issue.id}, issue, None, &mut session)
            .await;
        match replaced {
            Ok(Some(_)) => {}
            Ok(None) => {
                let _ = session.abort_transaction().await;
                return Err(ServiceError::not_found("Issue not found"));
            }
            Err(err) => {
                let _ = session.abort_transaction().await;
                return Err(err.into());
            }
        }
        self.append_and_commit(session, activity).await
    }

    async fn delete_cascade(&self, id: ObjectId) -> error::Result<Option<Issue>> {
        let mut session = self.transaction().await?;

        if let Err(err) = self
            .activities
            .delete_many_with_session(doc! {"issue_id": id}, None, &mut session)
            .await
        {
            let _ = session.abort_transaction().await;
            return Err(err.into());
        }

        let deleted = self
            .issues
            .find_one_and_delete_with_session(doc! {"id": id}, None, &mut session)
            .await;
        match deleted {
            Ok(issue) => {
                session.commit_transaction().await?;
                Ok(issue)
            }
            Err(err) => {
                let _ = session.abort_transaction().await;
                Err(err.into())
            }
        }
    }

    async fn find_page(
        &self,
        filter: &IssueFilter,
        sort: IssueSort,
        skip: u64,
        limit: i64,
    ) -> error::Result<(Vec<Issue>, u64)> {
        let query = filter_document(filter);
        let find_options = FindOptions::builder()
            .skip(skip)
            .limit(limit)
            .sort(sort_document(sort))
            .build();

        let cursor = self.issues.find(query.clone(), find_options).await?;
        let issues = collect(cursor).await?;
        let total = self.issues.count_documents(query, None).await?;

        Ok((issues, total))
    }

    async fn find_filtered(
        &self,
        filter: &IssueFilter,
        sort: IssueSort,
    ) -> error::Result<Vec<Issue>> {
        let find_options = FindOptions::builder().sort(sort_document(sort)).build();
        let cursor = self
            .issues
            .find(filter_document(filter), find_options)
            .await?;
        collect(cursor).await
    }

    async fn activities(&self, issue_id: ObjectId) -> error::Result<Vec<Activity>> {
        let find_options = FindOptions::builder().sort(doc! {"timestamp": 1}).build();
        let cursor = self
            .activities
            .find(doc! {"issue_id": issue_id}, find_options)
            .await?;
        collect(cursor).await
    }
}

async fn collect<T>(cursor: mongodb::Cursor<T>) -> error::Result<Vec<T>>
where
    T: serde::de::DeserializeOwned + Unpin + Send + Sync,
{
    let results: Vec<mongodb::error::Result<T>> = cursor.collect().await;
    Ok(results
        .into_iter()
        .collect::<mongodb::error::Result<_>>()?)
}

fn filter_document(filter: &IssueFilter) -> Document {
    let mut query = Document::new();

    if let Some(status) = filter.status {
        query.insert("status", status.as_str());
    }
    if let Some(priority) = filter.priority {
        query.insert("priority", priority.as_str());
    }
    if let Some(severity) = filter.severity {
        query.insert("severity", severity.as_str());
    }
    if let Some(assigned_to) = filter.assigned_to {
        query.insert("assigned_to", assigned_to);
    }
    if let Some(created_by) = filter.created_by {
        query.insert("created_by", created_by);
    }

    if let Some(search) = &filter.search {
        // user input, never a pattern
        let pattern = regex::escape(search);
        query.insert(
            "$or",
            vec![
                doc! {"title": {"$regex": pattern.as_str(), "$options": "i"}},
                doc! {"description": {"$regex": pattern.as_str(), "$options": "i"}},
            ],
        );
    }

    query
}

fn sort_document(sort: IssueSort) -> Document {
    let order = match sort.order {
        SortOrder::Asc => 1,
        SortOrder::Desc => -1,
    };
    doc! { sort.field.stored_name(): order }
}
