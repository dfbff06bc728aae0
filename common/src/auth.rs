use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::entities::user::{Role, User};
use crate::error::{self, ServiceError};

pub const TOKEN_COOKIE: &str = "token";

const TOKEN_TTL_DAYS: i64 = 2;

static ENCODING_KEY: Lazy<EncodingKey> = Lazy::new(|| {
    let secret = std::env::var("JWT_SECRET").expect("JWT_SECRET must be set");
    EncodingKey::from_secret(secret.as_bytes())
});

static DECODING_KEY: Lazy<DecodingKey> = Lazy::new(|| {
    let secret = std::env::var("JWT_SECRET").expect("JWT_SECRET must be set");
    DecodingKey::from_secret(secret.as_bytes())
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub exp: i64,
}

impl Claims {
    fn for_user(user: &User) -> Self {
        Self {
            user_id: user.id.to_hex(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            exp: (Utc::now() + Duration::days(TOKEN_TTL_DAYS)).timestamp(),
        }
    }
}

pub fn issue_token(user: &User) -> error::Result<String> {
    let header = Header {
        alg: Algorithm::HS512,
        ..Default::default()
    };
    encode(&header, &Claims::for_user(user), &ENCODING_KEY)
        .map_err(|err| ServiceError::Inner(err.into()))
}

/// Signature and expiry failures are indistinguishable to the caller.
pub fn verify_token(token: &str) -> error::Result<Claims> {
    decode::<Claims>(token, &DECODING_KEY, &Validation::new(Algorithm::HS512))
        .map(|data| data.claims)
        .map_err(|err| {
            log::error!("token rejected: {:?}", err);
            ServiceError::forbidden("Invalid or expired token")
        })
}

pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build(TOKEN_COOKIE, token)
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .max_age(CookieDuration::days(TOKEN_TTL_DAYS))
        .finish()
}

pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(TOKEN_COOKIE, "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .finish();
    cookie.make_removal();
    cookie
}
