use std::collections::HashMap;

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use common::entities::issue::{Issue, IssueStatus, Priority, Severity};
use common::error::{Result, ServiceError};
use common::repository::{
    IssueFilter, IssueRepository, IssueRepositoryObject, IssueSort, SortField, SortOrder,
    UserRepository, UserRepositoryObject,
};

use super::to_datetime;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct IssueListQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub severity: Option<String>,
    pub assigned_to: Option<String>,
    pub created_by: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

// Not flattened into IssueListQuery: urlencoded deserialization cannot
// handle serde(flatten).
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ExportQuery {
    pub format: Option<String>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub severity: Option<String>,
    pub assigned_to: Option<String>,
    pub created_by: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl ExportQuery {
    pub fn filters(self) -> IssueListQuery {
        IssueListQuery {
            search: self.search,
            status: self.status,
            priority: self.priority,
            severity: self.severity,
            assigned_to: self.assigned_to,
            created_by: self.created_by,
            page: None,
            limit: None,
            sort_by: self.sort_by,
            sort_order: self.sort_order,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueRow {
    pub id: String,
    pub title: String,
    pub status: String,
    pub priority: String,
    pub severity: Severity,
    pub due_date: Option<DateTime<Utc>>,
    pub assigned_to_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListMeta {
    pub total: u64,
    pub page: u64,
    pub limit: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IssueList {
    pub data: Vec<IssueRow>,
    pub meta: ListMeta,
}

/// Flat row for export, one per issue. Field order is the CSV column order.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExportRow {
    pub id: String,
    pub title: String,
    pub status: String,
    pub priority: String,
    pub severity: String,
    pub assigned_to: String,
    pub due_date: String,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserPick {
    pub id: String,
    pub name: String,
}

pub struct QueryService {
    issues: IssueRepositoryObject,
    users: UserRepositoryObject,
}

fn parse_filter(query: &IssueListQuery) -> Result<IssueFilter> {
    let mut filter = IssueFilter {
        search: query.search.clone(),
        ..Default::default()
    };

    if let Some(status) = &query.status {
        filter.status = Some(
            status
                .parse::<IssueStatus>()
                .map_err(|_| ServiceError::validation("Invalid status filter"))?,
        );
    }
    if let Some(priority) = &query.priority {
        filter.priority = Some(
            priority
                .parse::<Priority>()
                .map_err(|_| ServiceError::validation("Invalid priority filter"))?,
        );
    }
    if let Some(severity) = &query.severity {
        filter.severity = Some(
            severity
                .parse::<Severity>()
                .map_err(|_| ServiceError::validation("Invalid severity filter"))?,
        );
    }
    if let Some(assigned_to) = &query.assigned_to {
        filter.assigned_to = Some(
            assigned_to
                .parse()
                .map_err(|_| ServiceError::validation("Invalid assignedTo id"))?,
        );
    }
    if let Some(created_by) = &query.created_by {
        filter.created_by = Some(
            created_by
                .parse()
                .map_err(|_| ServiceError::validation("Invalid createdBy id"))?,
        );
    }

    Ok(filter)
}

fn parse_sort(query: &IssueListQuery) -> Result<IssueSort> {
    let field = match query.sort_by.as_deref() {
        None | Some("createdAt") => SortField::CreatedAt,
        Some("dueDate") => SortField::DueDate,
        Some("title") => SortField::Title,
        Some("status") => SortField::Status,
        Some("priority") => SortField::Priority,
        Some(_) => return Err(ServiceError::validation("Invalid sort field")),
    };
    let order = match query.sort_order.as_deref() {
        None | Some("desc") => SortOrder::Desc,
        Some("asc") => SortOrder::Asc,
        Some(_) => return Err(ServiceError::validation("Invalid sort order")),
    };
    Ok(IssueSort { field, order })
}

fn format_day(micros: Option<i64>) -> String {
    match micros {
        Some(micros) => to_datetime(micros).format("%Y-%m-%d").to_string(),
        None => "-".to_string(),
    }
}

impl QueryService {
    pub fn new(issues: IssueRepositoryObject, users: UserRepositoryObject) -> Self {
        Self { issues, users }
    }

    async fn assignee_names(&self, issues: &[Issue]) -> Result<HashMap<ObjectId, String>> {
        let mut ids: Vec<ObjectId> = issues.iter().filter_map(|issue| issue.assigned_to).collect();
        ids.sort();
        ids.dedup();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let users = self.users.find_by_ids(&ids).await?;
        Ok(users.into_iter().map(|user| (user.id, user.name)).collect())
    }

    pub async fn list(&self, query: IssueListQuery) -> Result<IssueList> {
        let filter = parse_filter(&query)?;
        let sort = parse_sort(&query)?;
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(20).max(1);
        let skip = (page - 1) * limit as u64;

        let (issues, total) = self.issues.find_page(&filter, sort, skip, limit).await?;
        let names = self.assignee_names(&issues).await?;

        let data = issues
            .into_iter()
            .map(|issue| IssueRow {
                id: issue.id.to_hex(),
                title: issue.title,
                status: issue.status.label().to_string(),
                priority: issue.priority.label().to_string(),
                severity: issue.severity,
                due_date: issue.due_date.map(to_datetime),
                assigned_to_name: issue
                    .assigned_to
                    .and_then(|id| names.get(&id).cloned()),
                created_at: to_datetime(issue.created_at),
            })
            .collect();

        Ok(IssueList {
            data,
            meta: ListMeta { total, page, limit },
        })
    }

    /// Applies the same filter set as `list`, without pagination.
    pub async fn export(&self, query: IssueListQuery) -> Result<Vec<ExportRow>> {
        let filter = parse_filter(&query)?;
        let sort = parse_sort(&query)?;

        let issues = self.issues.find_filtered(&filter, sort).await?;
        let names = self.assignee_names(&issues).await?;

        Ok(issues
            .into_iter()
            .map(|issue| ExportRow {
                id: issue.id.to_hex(),
                title: issue.title,
                status: issue.status.label().to_string(),
                priority: issue.priority.label().to_string(),
                severity: issue.severity.as_str().to_string(),
                assigned_to: issue
                    .assigned_to
                    .and_then(|id| names.get(&id).cloned())
                    .unwrap_or_default(),
                due_date: format_day(issue.due_date),
                created_at: format_day(Some(issue.created_at)),
            })
            .collect())
    }

    pub async fn all_users(&self) -> Result<Vec<UserPick>> {
        let users = self.users.find_all().await?;
        Ok(users
            .into_iter()
            .map(|user| UserPick {
                id: user.id.to_hex(),
                name: user.name,
            })
            .collect())
    }
}

impl ExportFormat {
    /// Anything other than an explicit `json` exports as csv.
    pub fn from_query(raw: Option<&str>) -> Self {
        match raw {
            Some("json") => ExportFormat::Json,
            _ => ExportFormat::Csv,
        }
    }
}

pub fn to_csv(rows: &[ExportRow]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer
            .serialize(row)
            .map_err(|err| ServiceError::Inner(err.into()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| ServiceError::Inner(anyhow::anyhow!("csv flush failed: {}", err)))?;
    String::from_utf8(bytes).map_err(|err| ServiceError::Inner(err.into()))
}
