use actix_web::{
    get, post,
    web::{self, Json},
    HttpResponse,
};
use serde_json::json;

use common::auth::{removal_cookie, session_cookie};
use common::auth_session::{AdminSession, AuthSession};
use common::error::Result;
use common::repository::UserRepositoryObject;

use crate::service::auth::{AuthService, Login, RegisterRequest, RegisterResponse};
use crate::AppSettings;

#[utoipa::path(
    request_body(
        content = RegisterRequest
    ),
    responses(
        (status = 201, description = "Token and public profile of the new user", body = RegisterResponse),
        (status = 409, description = "Email already registered")
    )
)]
#[post("/api/auth/register")]
pub async fn register(
    Json(data): web::Json<RegisterRequest>,
    users: web::Data<UserRepositoryObject>,
    settings: web::Data<AppSettings>,
) -> Result<HttpResponse> {
    let registered = AuthService::new(users.get_ref().clone(), settings.password_policy)
        .register(data)
        .await?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "data": registered,
        "message": "User registered successfully",
    })))
}

#[utoipa::path(
    request_body(
        content = Login
    ),
    responses(
        (status = 200, description = "Session cookie set"),
        (status = 401, description = "Invalid email or password")
    )
)]
#[post("/api/auth/login")]
pub async fn login(
    Json(data): web::Json<Login>,
    users: web::Data<UserRepositoryObject>,
    settings: web::Data<AppSettings>,
) -> Result<HttpResponse> {
    let (token, _user) = AuthService::new(users.get_ref().clone(), settings.password_policy)
        .login(&data)
        .await?;

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(token, settings.secure_cookies))
        .json(json!({
            "success": true,
            "message": "User login successfully",
        })))
}

#[post("/api/auth/logout")]
pub async fn logout(_session: AuthSession) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().cookie(removal_cookie()).json(json!({
        "success": true,
        "message": "Logged out successfully",
    })))
}

#[get("/api/auth/me")]
pub async fn me(session: AuthSession) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "user": {
            "id": session.user_id.to_hex(),
            "email": session.email,
        },
    })))
}

#[utoipa::path(
    responses(
        (status = 200, description = "All users, public fields only"),
        (status = 403, description = "Caller is not an admin")
    )
)]
#[get("/api/auth/users")]
pub async fn get_all_users(
    _admin: AdminSession,
    users: web::Data<UserRepositoryObject>,
    settings: web::Data<AppSettings>,
) -> Result<HttpResponse> {
    let all = AuthService::new(users.get_ref().clone(), settings.password_policy)
        .all_users()
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": all,
    })))
}
