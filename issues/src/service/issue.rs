use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use common::auth_session::AuthSession;
use common::default_timestamp;
use common::entities::activity::{Activity, ActivityAction};
use common::entities::issue::{Attachment, Issue, IssueStatus, Priority, Severity};
use common::error::{Result, ServiceError};
use common::repository::{
    IssueRepository, IssueRepositoryObject, UserRepository, UserRepositoryObject,
};

use super::to_datetime;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentInput {
    pub name: String,
    pub url: String,
    pub uploaded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateIssue {
    pub title: String,
    pub description: String,
    pub status: Option<IssueStatus>,
    pub priority: Option<Priority>,
    pub severity: Option<Severity>,
    pub assigned_to_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub estimated_hours: Option<i64>,
    #[serde(default)]
    pub attachments: Vec<AttachmentInput>,
}

/// Full-replace payload: omitted fields fall back to creation defaults, by
/// contract. Callers that want to keep a value must send it.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIssue {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: Option<IssueStatus>,
    pub priority: Option<Priority>,
    pub severity: Option<Severity>,
    pub assigned_to_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub estimated_hours: Option<i64>,
    pub actual_hours: Option<i64>,
    #[serde(default)]
    pub attachments: Vec<AttachmentInput>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateIssueStatus {
    pub id: String,
    pub status: IssueStatus,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignIssue {
    pub issue_id: Option<String>,
    pub assignee_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteIssue {
    pub id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserRef {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentView {
    pub name: String,
    pub url: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityView {
    pub id: String,
    pub user_id: String,
    pub action: ActivityAction,
    pub comment: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: IssueStatus,
    pub priority: Priority,
    pub severity: Severity,
    pub tags: Vec<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub estimated_hours: Option<i64>,
    pub actual_hours: Option<i64>,
    pub attachments: Vec<AttachmentView>,
    pub created_by: Option<UserRef>,
    pub last_edited_by_id: Option<String>,
    pub assigned_to: Option<UserRef>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activities: Option<Vec<ActivityView>>,
}

pub struct IssueService {
    issues: IssueRepositoryObject,
    users: UserRepositoryObject,
}

impl IssueService {
    pub fn new(issues: IssueRepositoryObject, users: UserRepositoryObject) -> Self {
        Self { issues, users }
    }

    fn parse_id(raw: &str, message: &str) -> Result<ObjectId> {
        raw.parse()
            .map_err(|_| ServiceError::validation(message.to_string()))
    }

    fn parse_assignee(raw: &Option<String>) -> Result<Option<ObjectId>> {
        match raw {
            None => Ok(None),
            Some(raw) => Self::parse_id(raw, "Invalid assignee id").map(Some),
        }
    }

    fn validate_fields(
        title: &str,
        description: &str,
        estimated_hours: Option<i64>,
        actual_hours: Option<i64>,
    ) -> Result<()> {
        if title.trim().is_empty() {
            return Err(ServiceError::validation("Title is required"));
        }
        if description.trim().is_empty() {
            return Err(ServiceError::validation("Description is required"));
        }
        if estimated_hours.map_or(false, |hours| hours <= 0) {
            return Err(ServiceError::validation(
                "Estimated hours must be a positive number",
            ));
        }
        if actual_hours.map_or(false, |hours| hours <= 0) {
            return Err(ServiceError::validation(
                "Actual hours must be a positive number",
            ));
        }
        Ok(())
    }

    fn build_attachments(inputs: Vec<AttachmentInput>, now: i64) -> Vec<Attachment> {
        inputs
            .into_iter()
            .map(|input| Attachment {
                name: input.name,
                url: input.url,
                uploaded_at: input
                    .uploaded_at
                    .map(|at| at.timestamp_micros())
                    .unwrap_or(now),
            })
            .collect()
    }

    /// `resolved_at`/`closed_at` follow the status: entering a state stamps
    /// it, leaving clears it, staying keeps the original stamp.
    fn derived_timestamps(
        old: Option<&Issue>,
        status: IssueStatus,
        now: i64,
    ) -> (Option<i64>, Option<i64>) {
        if let Some(old) = old {
            if old.status == status {
                return (old.resolved_at, old.closed_at);
            }
        }
        (
            (status == IssueStatus::Resolved).then_some(now),
            (status == IssueStatus::Closed).then_some(now),
        )
    }

    pub async fn create(&self, actor: &AuthSession, data: CreateIssue) -> Result<IssueResponse> {
        Self::validate_fields(&data.title, &data.description, data.estimated_hours, None)?;
        let assigned_to = Self::parse_assignee(&data.assigned_to_id)?;

        let now = default_timestamp();
        let status = data.status.unwrap_or(IssueStatus::Open);
        let (resolved_at, closed_at) = Self::derived_timestamps(None, status, now);

        let issue = Issue {
            id: ObjectId::new(),
            title: data.title,
            description: data.description,
            status,
            priority: data.priority.unwrap_or(Priority::Medium),
            severity: data.severity.unwrap_or(Severity::Minor),
            tags: data.tags,
            due_date: data.due_date.map(|date| date.timestamp_micros()),
            estimated_hours: data.estimated_hours,
            actual_hours: None,
            attachments: Self::build_attachments(data.attachments, now),
            created_by: actor.user_id,
            last_edited_by: None,
            assigned_to,
            resolved_at,
            closed_at,
            created_at: now,
        };
        let activity = Activity::new(
            issue.id,
            actor.user_id,
            ActivityAction::Created,
            "Issue created",
        );

        self.issues.create(&issue, &activity).await?;
        log::info!("issue {} created by {}", issue.id.to_hex(), actor.user_id.to_hex());

        self.respond(issue, None).await
    }

    pub async fn update(&self, actor: &AuthSession, data: UpdateIssue) -> Result<()> {
        let id = Self::parse_id(&data.id, "Invalid issue id")?;
        Self::validate_fields(
            &data.title,
            &data.description,
            data.estimated_hours,
            data.actual_hours,
        )?;
        let assigned_to = Self::parse_assignee(&data.assigned_to_id)?;

        let Some(existing) = self.issues.find(id).await? else {
            return Err(ServiceError::not_found("Issue not found"));
        };

        let now = default_timestamp();
        let status = data.status.unwrap_or(IssueStatus::Open);
        let (resolved_at, closed_at) = Self::derived_timestamps(Some(&existing), status, now);

        let issue = Issue {
            id,
            title: data.title,
            description: data.description,
            status,
            priority: data.priority.unwrap_or(Priority::Medium),
            severity: data.severity.unwrap_or(Severity::Minor),
            tags: data.tags,
            due_date: data.due_date.map(|date| date.timestamp_micros()),
            estimated_hours: data.estimated_hours,
            actual_hours: data.actual_hours,
            attachments: Self::build_attachments(data.attachments, now),
            created_by: existing.created_by,
            last_edited_by: Some(actor.user_id),
            assigned_to,
            resolved_at,
            closed_at,
            created_at: existing.created_at,
        };
        let activity = Activity::new(id, actor.user_id, ActivityAction::Updated, "Issue updated");

        self.issues.replace(&issue, &activity).await
    }

    pub async fn update_status(
        &self,
        actor: &AuthSession,
        data: UpdateIssueStatus,
    ) -> Result<()> {
        let id = Self::parse_id(&data.id, "Invalid issue id")?;

        let Some(mut issue) = self.issues.find(id).await? else {
            return Err(ServiceError::not_found("Issue not found"));
        };

        let now = default_timestamp();
        let (resolved_at, closed_at) = Self::derived_timestamps(Some(&issue), data.status, now);
        issue.status = data.status;
        issue.resolved_at = resolved_at;
        issue.closed_at = closed_at;

        let activity = Activity::new(
            id,
            actor.user_id,
            ActivityAction::StatusChanged,
            format!("Status changed to {}", data.status),
        );

        self.issues.replace(&issue, &activity).await
    }

    pub async fn assign(&self, actor: &AuthSession, data: AssignIssue) -> Result<()> {
        let (Some(issue_id), Some(assignee_id)) = (&data.issue_id, &data.assignee_id) else {
            return Err(ServiceError::validation("Missing required fields"));
        };
        let issue_id = Self::parse_id(issue_id, "Invalid issue id")?;
        let assignee_id = Self::parse_id(assignee_id, "Invalid assignee id")?;

        let Some(mut issue) = self.issues.find(issue_id).await? else {
            return Err(ServiceError::not_found("Issue not found"));
        };
        issue.assigned_to = Some(assignee_id);

        let activity = Activity::new(
            issue_id,
            actor.user_id,
            ActivityAction::Assigned,
            "Issue assigned",
        );

        self.issues.replace(&issue, &activity).await
    }

    pub async fn delete(&self, data: DeleteIssue) -> Result<()> {
        let Some(id) = &data.id else {
            return Err(ServiceError::validation("Issue id is required"));
        };
        let id = Self::parse_id(id, "Invalid issue id")?;

        if self.issues.delete_cascade(id).await?.is_none() {
            return Err(ServiceError::not_found("Issue not found"));
        }
        Ok(())
    }

    pub async fn get(&self, raw_id: &str) -> Result<IssueResponse> {
        let id = Self::parse_id(raw_id, "Invalid issue id")?;

        let Some(issue) = self.issues.find(id).await? else {
            return Err(ServiceError::not_found("Issue not found"));
        };
        let activities = self.issues.activities(id).await?;

        self.respond(issue, Some(activities)).await
    }

    async fn user_ref(&self, id: ObjectId) -> Result<Option<UserRef>> {
        Ok(self.users.find(id).await?.map(|user| UserRef {
            id: user.id.to_hex(),
            name: user.name,
            email: user.email,
        }))
    }

    async fn respond(
        &self,
        issue: Issue,
        activities: Option<Vec<Activity>>,
    ) -> Result<IssueResponse> {
        let created_by = self.user_ref(issue.created_by).await?;
        let assigned_to = match issue.assigned_to {
            Some(id) => self.user_ref(id).await?,
            None => None,
        };

        Ok(IssueResponse {
            id: issue.id.to_hex(),
            title: issue.title,
            description: issue.description,
            status: issue.status,
            priority: issue.priority,
            severity: issue.severity,
            tags: issue.tags,
            due_date: issue.due_date.map(to_datetime),
            estimated_hours: issue.estimated_hours,
            actual_hours: issue.actual_hours,
            attachments: issue
                .attachments
                .into_iter()
                .map(|attachment| AttachmentView {
                    name: attachment.name,
                    url: attachment.url,
                    uploaded_at: to_datetime(attachment.uploaded_at),
                })
                .collect(),
            created_by,
            last_edited_by_id: issue.last_edited_by.map(|id| id.to_hex()),
            assigned_to,
            resolved_at: issue.resolved_at.map(to_datetime),
            closed_at: issue.closed_at.map(to_datetime),
            created_at: to_datetime(issue.created_at),
            activities: activities.map(|entries| {
                entries
                    .into_iter()
                    .map(|activity| ActivityView {
                        id: activity.id.to_hex(),
                        user_id: activity.user_id.to_hex(),
                        action: activity.action,
                        comment: activity.comment,
                        timestamp: to_datetime(activity.timestamp),
                    })
                    .collect()
            }),
        })
    }
}
