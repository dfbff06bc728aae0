use actix_web::{dev::Payload, web::Data, FromRequest, HttpRequest};
use anyhow::anyhow;
use futures_util::future::LocalBoxFuture;
use mongodb::bson::oid::ObjectId;

use crate::auth::{self, TOKEN_COOKIE};
use crate::entities::user::Role;
use crate::error::{self, ServiceError};
use crate::repository::{UserRepository, UserRepositoryObject};

/// Identity attached to a request by the access guard. Populated once from
/// the token and passed to handlers, never re-derived downstream.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user_id: ObjectId,
    pub email: String,
}

fn extract_token(req: &HttpRequest) -> error::Result<String> {
    if let Some(cookie) = req.cookie(TOKEN_COOKIE) {
        return Ok(cookie.value().to_string());
    }

    req.headers()
        .get("Authorization")
        .and_then(|x| x.to_str().ok())
        .and_then(|x| x.strip_prefix("Bearer "))
        .map(|x| x.to_string())
        .ok_or_else(|| ServiceError::unauthorized("Not authenticated"))
}

fn session_from_request(req: &HttpRequest) -> error::Result<AuthSession> {
    let token = extract_token(req)?;
    let claims = auth::verify_token(&token)?;
    let user_id = claims
        .user_id
        .parse()
        .map_err(|_| ServiceError::forbidden("Invalid or expired token"))?;

    Ok(AuthSession {
        user_id,
        email: claims.email,
    })
}

impl FromRequest for AuthSession {
    type Error = ServiceError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = session_from_request(req);
        Box::pin(async move { result })
    }
}

/// Admin-gated variant. The role is re-read from the user store on every
/// request rather than trusted from token claims, so revoking admin takes
/// effect immediately.
#[derive(Debug, Clone)]
pub struct AdminSession(pub AuthSession);

impl FromRequest for AdminSession {
    type Error = ServiceError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let session = session_from_request(req);
        let users = req.app_data::<Data<UserRepositoryObject>>().cloned();

        Box::pin(async move {
            let session = session?;
            let Some(users) = users else {
                return Err(ServiceError::Inner(anyhow!("no user repository in app data")));
            };

            let Some(user) = users.find(session.user_id).await? else {
                return Err(ServiceError::forbidden("User not found"));
            };
            if user.role != Role::Admin {
                return Err(ServiceError::forbidden(
                    "Access denied. Admin privileges required",
                ));
            }

            Ok(AdminSession(session))
        })
    }
}
