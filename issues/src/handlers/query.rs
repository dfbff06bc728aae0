use actix_web::{get, web, HttpResponse};
use serde_json::json;

use common::auth_session::AuthSession;
use common::error::Result;
use common::repository::{IssueRepositoryObject, UserRepositoryObject};

use crate::service::query::{
    to_csv, ExportFormat, ExportQuery, IssueListQuery, QueryService,
};

fn service(
    issues: &web::Data<IssueRepositoryObject>,
    users: &web::Data<UserRepositoryObject>,
) -> QueryService {
    QueryService::new(issues.get_ref().clone(), users.get_ref().clone())
}

#[utoipa::path(
    params(
        IssueListQuery,
    ),
    responses(
        (status = 200, description = "One page of issues with display labels plus the total filtered count")
    )
)]
#[get("/api/issues/all-issues")]
pub async fn all_issues(
    _session: AuthSession,
    query: web::Query<IssueListQuery>,
    issues: web::Data<IssueRepositoryObject>,
    users: web::Data<UserRepositoryObject>,
) -> Result<HttpResponse> {
    let list = service(&issues, &users).list(query.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": list.data,
        "meta": list.meta,
    })))
}

#[get("/api/issues/all-users")]
pub async fn all_users(
    _session: AuthSession,
    issues: web::Data<IssueRepositoryObject>,
    users: web::Data<UserRepositoryObject>,
) -> Result<HttpResponse> {
    let picks = service(&issues, &users).all_users().await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": picks,
    })))
}

#[utoipa::path(
    params(
        ExportQuery,
    ),
    responses(
        (status = 200, description = "Filtered issues as csv (default) or a json array")
    )
)]
#[get("/api/issues/export")]
pub async fn export_issues(
    _session: AuthSession,
    query: web::Query<ExportQuery>,
    issues: web::Data<IssueRepositoryObject>,
    users: web::Data<UserRepositoryObject>,
) -> Result<HttpResponse> {
    let query = query.into_inner();
    let format = ExportFormat::from_query(query.format.as_deref());
    let rows = service(&issues, &users).export(query.filters()).await?;

    match format {
        ExportFormat::Csv => Ok(HttpResponse::Ok()
            .content_type("text/csv")
            .body(to_csv(&rows)?)),
        ExportFormat::Json => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Issues export successfully",
            "data": rows,
        }))),
    }
}
