use actix_web::{
    get, post,
    web::{self, Json},
    HttpResponse,
};
use serde_json::json;

use common::auth_session::AuthSession;
use common::error::Result;
use common::repository::{IssueRepositoryObject, UserRepositoryObject};

use crate::service::issue::{
    AssignIssue, CreateIssue, DeleteIssue, IssueResponse, IssueService, UpdateIssue,
    UpdateIssueStatus,
};

fn service(
    issues: &web::Data<IssueRepositoryObject>,
    users: &web::Data<UserRepositoryObject>,
) -> IssueService {
    IssueService::new(issues.get_ref().clone(), users.get_ref().clone())
}

#[utoipa::path(
    request_body(
        content = CreateIssue
    ),
    responses(
        (status = 201, description = "Created issue with creator and assignee projections", body = IssueResponse)
    )
)]
#[post("/api/issues/create-issue")]
pub async fn create_issue(
    session: AuthSession,
    Json(data): web::Json<CreateIssue>,
    issues: web::Data<IssueRepositoryObject>,
    users: web::Data<UserRepositoryObject>,
) -> Result<HttpResponse> {
    let issue = service(&issues, &users).create(&session, data).await?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "data": issue,
        "message": "Issue created successfully",
    })))
}

#[utoipa::path(
    request_body(
        content = UpdateIssue
    ),
    responses(
        (status = 200, description = "Issue replaced"),
        (status = 404, description = "Unknown issue id")
    )
)]
#[post("/api/issues/update-issue")]
pub async fn update_issue(
    session: AuthSession,
    Json(data): web::Json<UpdateIssue>,
    issues: web::Data<IssueRepositoryObject>,
    users: web::Data<UserRepositoryObject>,
) -> Result<HttpResponse> {
    service(&issues, &users).update(&session, data).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Issue updated successfully",
    })))
}

#[post("/api/issues/update-issue-status")]
pub async fn update_issue_status(
    session: AuthSession,
    Json(data): web::Json<UpdateIssueStatus>,
    issues: web::Data<IssueRepositoryObject>,
    users: web::Data<UserRepositoryObject>,
) -> Result<HttpResponse> {
    service(&issues, &users).update_status(&session, data).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Issue status updated successfully",
    })))
}

#[post("/api/issues/assign-issue")]
pub async fn assign_issue(
    session: AuthSession,
    Json(data): web::Json<AssignIssue>,
    issues: web::Data<IssueRepositoryObject>,
    users: web::Data<UserRepositoryObject>,
) -> Result<HttpResponse> {
    service(&issues, &users).assign(&session, data).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Issue assignment updated successfully",
    })))
}

#[post("/api/issues/delete-issue")]
pub async fn delete_issue(
    _session: AuthSession,
    Json(data): web::Json<DeleteIssue>,
    issues: web::Data<IssueRepositoryObject>,
    users: web::Data<UserRepositoryObject>,
) -> Result<HttpResponse> {
    service(&issues, &users).delete(data).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Issue deleted successfully",
    })))
}

#[utoipa::path(
    responses(
        (status = 200, description = "Issue with its activity log", body = IssueResponse),
        (status = 404, description = "Unknown issue id")
    )
)]
#[get("/api/issues/get-issue/{id}")]
pub async fn get_issue(
    _session: AuthSession,
    id: web::Path<String>,
    issues: web::Data<IssueRepositoryObject>,
    users: web::Data<UserRepositoryObject>,
) -> Result<HttpResponse> {
    let issue = service(&issues, &users).get(&id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": issue,
        "message": "Data retrieved successfully",
    })))
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use actix_web::cookie::Cookie;
    use actix_web::http::StatusCode;
    use actix_web::test::{self, init_service};
    use mongodb::bson::oid::ObjectId;
    use serde_json::{json, Value};

    use common::auth::issue_token;
    use common::entities::activity::ActivityAction;
    use common::entities::issue::IssueStatus;
    use common::entities::user::{Role, User};
    use common::repository::test_repository::{TestIssueRepository, TestUserRepository};
    use common::repository::{
        IssueRepository, IssueRepositoryObject, UserRepository, UserRepositoryObject,
    };

    use crate::create_app;

    fn repos() -> (IssueRepositoryObject, UserRepositoryObject) {
        std::env::set_var("JWT_SECRET", "test-secret");
        (
            Arc::new(TestIssueRepository::new()),
            Arc::new(TestUserRepository::new()),
        )
    }

    async fn seed_user(users: &UserRepositoryObject, name: &str, email: &str) -> (User, String) {
        let user = User {
            id: ObjectId::new(),
            name: name.to_string(),
            email: email.to_string(),
            password: String::new(),
            salt: String::new(),
            role: Role::User,
            created_at: common::default_timestamp(),
        };
        users.insert(&user).await.unwrap();
        let token = issue_token(&user).unwrap();
        (user, token)
    }

    #[actix_web::test]
    async fn create_applies_defaults_and_logs_activity() {
        let (issues, users) = repos();
        let (user, token) = seed_user(&users, "Uma", "uma@example.com").await;
        let app = init_service(create_app(issues.clone(), users.clone())).await;

        let req = test::TestRequest::post()
            .uri("/api/issues/create-issue")
            .cookie(Cookie::new("token", token))
            .set_json(json!({"title": "Bug A", "description": "x"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["status"], json!("open"));
        assert_eq!(body["data"]["priority"], json!("medium"));
        assert_eq!(body["data"]["severity"], json!("minor"));
        assert_eq!(body["data"]["createdBy"]["email"], json!("uma@example.com"));

        let id: ObjectId = body["data"]["id"].as_str().unwrap().parse().unwrap();
        let log = issues.activities(id).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].action, ActivityAction::Created);
        assert_eq!(log[0].user_id, user.id);
    }

    #[actix_web::test]
    async fn create_without_token_is_unauthorized() {
        let (issues, users) = repos();
        let app = init_service(create_app(issues, users)).await;

        let req = test::TestRequest::post()
            .uri("/api/issues/create-issue")
            .set_json(json!({"title": "Bug A", "description": "x"}))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNAUTHORIZED
        );
    }

    fn create_req(token: &str, body: Value) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/api/issues/create-issue")
            .cookie(Cookie::new("token", token.to_string()))
            .set_json(body)
    }

    fn id_of(body: &Value) -> ObjectId {
        body["data"]["id"].as_str().unwrap().parse().unwrap()
    }

    #[actix_web::test]
    async fn status_transitions_drive_derived_timestamps() {
        let (issues, users) = repos();
        let (_, token) = seed_user(&users, "Uma", "uma@example.com").await;
        let app = init_service(create_app(issues.clone(), users.clone())).await;

        let resp = test::call_service(
            &app,
            create_req(&token, json!({"title": "Bug A", "description": "x"})).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(resp).await;
        let id = id_of(&created);

        for (status, resolved, closed) in [
            ("resolved", true, false),
            ("closed", false, true),
            ("open", false, false),
        ] {
            let req = test::TestRequest::post()
                .uri("/api/issues/update-issue-status")
                .cookie(Cookie::new("token", token.clone()))
                .set_json(json!({"id": id.to_hex(), "status": status}))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

            let stored = issues.find(id).await.unwrap().unwrap();
            assert_eq!(stored.resolved_at.is_some(), resolved, "status {}", status);
            assert_eq!(stored.closed_at.is_some(), closed, "status {}", status);
        }

        let log = issues.activities(id).await.unwrap();
        assert_eq!(log.len(), 4); // created + three status changes
        assert_eq!(log[1].comment, "Status changed to resolved");
        assert_eq!(log[1].action, ActivityAction::StatusChanged);
    }

    #[actix_web::test]
    async fn repeating_a_status_keeps_its_original_stamp() {
        let (issues, users) = repos();
        let (_, token) = seed_user(&users, "Uma", "uma@example.com").await;
        let app = init_service(create_app(issues.clone(), users.clone())).await;

        let resp = test::call_service(
            &app,
            create_req(&token, json!({"title": "Bug A", "description": "x"})).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(resp).await;
        let id = id_of(&created);

        let req = test::TestRequest::post()
            .uri("/api/issues/update-issue-status")
            .cookie(Cookie::new("token", token.clone()))
            .set_json(json!({"id": id.to_hex(), "status": "resolved"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let first_stamp = issues.find(id).await.unwrap().unwrap().resolved_at;
        assert!(first_stamp.is_some());

        let req = test::TestRequest::post()
            .uri("/api/issues/update-issue-status")
            .cookie(Cookie::new("token", token))
            .set_json(json!({"id": id.to_hex(), "status": "resolved"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let stored = issues.find(id).await.unwrap().unwrap();
        assert_eq!(stored.resolved_at, first_stamp);
    }

    #[actix_web::test]
    async fn attachment_without_upload_time_defaults_to_now() {
        let (issues, users) = repos();
        let (_, token) = seed_user(&users, "Uma", "uma@example.com").await;
        let app = init_service(create_app(issues.clone(), users.clone())).await;

        let before = common::default_timestamp();
        let resp = test::call_service(
            &app,
            create_req(
                &token,
                json!({
                    "title": "Bug A",
                    "description": "x",
                    "attachments": [{"name": "trace.log", "url": "https://files.example.com/trace.log"}],
                }),
            )
            .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(resp).await;
        let id = id_of(&created);

        assert_eq!(created["data"]["attachments"][0]["name"], json!("trace.log"));
        assert!(created["data"]["attachments"][0]["uploadedAt"].is_string());

        let stored = issues.find(id).await.unwrap().unwrap();
        assert_eq!(stored.attachments.len(), 1);
        assert!(stored.attachments[0].uploaded_at >= before);
    }

    #[actix_web::test]
    async fn full_update_recomputes_derived_timestamps() {
        let (issues, users) = repos();
        let (_, token) = seed_user(&users, "Uma", "uma@example.com").await;
        let app = init_service(create_app(issues.clone(), users.clone())).await;

        let resp = test::call_service(
            &app,
            create_req(&token, json!({"title": "Bug A", "description": "x"})).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(resp).await;
        let id = id_of(&created);

        let req = test::TestRequest::post()
            .uri("/api/issues/update-issue")
            .cookie(Cookie::new("token", token.clone()))
            .set_json(json!({
                "id": id.to_hex(),
                "title": "Bug A",
                "description": "x",
                "status": "resolved",
            }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let stored = issues.find(id).await.unwrap().unwrap();
        assert!(stored.resolved_at.is_some());
        assert!(stored.closed_at.is_none());

        let req = test::TestRequest::post()
            .uri("/api/issues/update-issue")
            .cookie(Cookie::new("token", token))
            .set_json(json!({
                "id": id.to_hex(),
                "title": "Bug A",
                "description": "x",
                "status": "closed",
            }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let stored = issues.find(id).await.unwrap().unwrap();
        assert!(stored.resolved_at.is_none());
        assert!(stored.closed_at.is_some());
    }

    #[actix_web::test]
    async fn update_is_full_replace_and_keeps_creator() {
        let (issues, users) = repos();
        let (author, author_token) = seed_user(&users, "Author", "author@example.com").await;
        let (editor, editor_token) = seed_user(&users, "Editor", "editor@example.com").await;
        let app = init_service(create_app(issues.clone(), users.clone())).await;

        let resp = test::call_service(
            &app,
            create_req(
                &author_token,
                json!({
                    "title": "Bug A",
                    "description": "x",
                    "priority": "high",
                    "tags": ["backend"],
                }),
            )
            .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(resp).await;
        let id = id_of(&created);

        let req = test::TestRequest::post()
            .uri("/api/issues/update-issue")
            .cookie(Cookie::new("token", editor_token))
            .set_json(json!({
                "id": id.to_hex(),
                "title": "Bug A (edited)",
                "description": "y",
                "actualHours": 3,
            }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let stored = issues.find(id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Bug A (edited)");
        // omitted fields reset to defaults
        assert_eq!(stored.priority, common::entities::issue::Priority::Medium);
        assert!(stored.tags.is_empty());
        assert_eq!(stored.actual_hours, Some(3));
        // attribution: creator kept, editor recorded separately
        assert_eq!(stored.created_by, author.id);
        assert_eq!(stored.last_edited_by, Some(editor.id));

        let log = issues.activities(id).await.unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[1].action, ActivityAction::Updated);
    }

    #[actix_web::test]
    async fn update_unknown_issue_is_not_found() {
        let (issues, users) = repos();
        let (_, token) = seed_user(&users, "Uma", "uma@example.com").await;
        let app = init_service(create_app(issues, users)).await;

        let req = test::TestRequest::post()
            .uri("/api/issues/update-issue")
            .cookie(Cookie::new("token", token))
            .set_json(json!({
                "id": ObjectId::new().to_hex(),
                "title": "ghost",
                "description": "y",
            }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[actix_web::test]
    async fn assign_requires_both_ids() {
        let (issues, users) = repos();
        let (_, token) = seed_user(&users, "Uma", "uma@example.com").await;
        let app = init_service(create_app(issues.clone(), users.clone())).await;

        let req = test::TestRequest::post()
            .uri("/api/issues/assign-issue")
            .cookie(Cookie::new("token", token.clone()))
            .set_json(json!({"issueId": ObjectId::new().to_hex()}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], json!("Missing required fields"));

        let req = test::TestRequest::post()
            .uri("/api/issues/assign-issue")
            .cookie(Cookie::new("token", token))
            .set_json(json!({
                "issueId": ObjectId::new().to_hex(),
                "assigneeId": ObjectId::new().to_hex(),
            }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[actix_web::test]
    async fn assign_sets_assignee_and_logs_activity() {
        let (issues, users) = repos();
        let (_, token) = seed_user(&users, "Uma", "uma@example.com").await;
        let (assignee, _) = seed_user(&users, "Ada", "ada@example.com").await;
        let app = init_service(create_app(issues.clone(), users.clone())).await;

        let resp = test::call_service(
            &app,
            create_req(&token, json!({"title": "Bug A", "description": "x"})).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(resp).await;
        let id = id_of(&created);

        let req = test::TestRequest::post()
            .uri("/api/issues/assign-issue")
            .cookie(Cookie::new("token", token))
            .set_json(json!({
                "issueId": id.to_hex(),
                "assigneeId": assignee.id.to_hex(),
            }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let stored = issues.find(id).await.unwrap().unwrap();
        assert_eq!(stored.assigned_to, Some(assignee.id));

        let log = issues.activities(id).await.unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[1].action, ActivityAction::Assigned);
    }

    #[actix_web::test]
    async fn delete_cascades_to_activities() {
        let (issues, users) = repos();
        let (_, token) = seed_user(&users, "Uma", "uma@example.com").await;
        let app = init_service(create_app(issues.clone(), users.clone())).await;

        let resp = test::call_service(
            &app,
            create_req(&token, json!({"title": "Bug A", "description": "x"})).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(resp).await;
        let id = id_of(&created);

        let req = test::TestRequest::post()
            .uri("/api/issues/delete-issue")
            .cookie(Cookie::new("token", token.clone()))
            .set_json(json!({"id": id.to_hex()}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        assert!(issues.find(id).await.unwrap().is_none());
        assert!(issues.activities(id).await.unwrap().is_empty());

        let req = test::TestRequest::get()
            .uri(&format!("/api/issues/get-issue/{}", id.to_hex()))
            .cookie(Cookie::new("token", token))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[actix_web::test]
    async fn delete_without_id_is_bad_request() {
        let (issues, users) = repos();
        let (_, token) = seed_user(&users, "Uma", "uma@example.com").await;
        let app = init_service(create_app(issues, users)).await;

        let req = test::TestRequest::post()
            .uri("/api/issues/delete-issue")
            .cookie(Cookie::new("token", token))
            .set_json(json!({}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], json!("Issue id is required"));
    }

    #[actix_web::test]
    async fn get_issue_includes_activity_log() {
        let (issues, users) = repos();
        let (_, token) = seed_user(&users, "Uma", "uma@example.com").await;
        let app = init_service(create_app(issues.clone(), users.clone())).await;

        let resp = test::call_service(
            &app,
            create_req(&token, json!({"title": "Bug A", "description": "x"})).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(resp).await;
        let id = id_of(&created);

        let req = test::TestRequest::post()
            .uri("/api/issues/update-issue-status")
            .cookie(Cookie::new("token", token.clone()))
            .set_json(json!({"id": id.to_hex(), "status": "resolved"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri(&format!("/api/issues/get-issue/{}", id.to_hex()))
            .cookie(Cookie::new("token", token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["status"], json!("resolved"));
        assert!(body["data"]["resolvedAt"].is_string());
        assert!(body["data"]["closedAt"].is_null());

        let activities = body["data"]["activities"].as_array().unwrap();
        assert_eq!(activities.len(), 2);
        assert_eq!(activities[0]["action"], json!("created"));
        assert_eq!(activities[1]["action"], json!("status_changed"));
    }

    #[actix_web::test]
    async fn create_rejects_non_positive_hours() {
        let (issues, users) = repos();
        let (_, token) = seed_user(&users, "Uma", "uma@example.com").await;
        let app = init_service(create_app(issues, users)).await;

        let req = test::TestRequest::post()
            .uri("/api/issues/create-issue")
            .cookie(Cookie::new("token", token))
            .set_json(json!({
                "title": "Bug A",
                "description": "x",
                "estimatedHours": 0,
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(
            body["message"],
            json!("Estimated hours must be a positive number")
        );
    }
}
