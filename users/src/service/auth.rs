use lazy_static::lazy_static;
use mongodb::bson::oid::ObjectId;
use rand::{distributions::Alphanumeric, Rng};
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use common::auth;
use common::default_timestamp;
use common::entities::user::{PublicUser, Role, User};
use common::error::{Result, ServiceError};
use common::repository::{UserRepository, UserRepositoryObject};

lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

/// Strict additionally requires mixed case, a digit and a symbol; some
/// deployments run Lenient with only the length rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordPolicy {
    Lenient,
    Strict,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub token: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Login {
    pub email: String,
    pub password: String,
}

pub struct AuthService {
    users: UserRepositoryObject,
    policy: PasswordPolicy,
}

impl AuthService {
    pub fn new(users: UserRepositoryObject, policy: PasswordPolicy) -> Self {
        Self { users, policy }
    }

    fn validate_registration(&self, data: &RegisterRequest) -> Result<()> {
        let name_len = data.name.chars().count();
        if name_len < 2 {
            return Err(ServiceError::validation(
                "Name must be at least 2 characters",
            ));
        }
        if name_len > 50 {
            return Err(ServiceError::validation("Name cannot exceed 50 characters"));
        }
        if !EMAIL_REGEX.is_match(&data.email) {
            return Err(ServiceError::validation(
                "Please enter a valid email address",
            ));
        }
        self.validate_password(&data.password)
    }

    fn validate_password(&self, password: &str) -> Result<()> {
        let len = password.chars().count();
        if len < 6 {
            return Err(ServiceError::validation(
                "Password must be at least 6 characters",
            ));
        }
        if len > 100 {
            return Err(ServiceError::validation(
                "Password cannot exceed 100 characters",
            ));
        }

        if self.policy == PasswordPolicy::Strict {
            let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
            let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
            let has_digit = password.chars().any(|c| c.is_ascii_digit());
            let has_symbol = password.chars().any(|c| !c.is_alphanumeric());
            if !(has_upper && has_lower && has_digit && has_symbol) {
                return Err(ServiceError::validation(
                    "Password must contain uppercase, lowercase, number, and special character",
                ));
            }
        }
        Ok(())
    }

    pub(crate) fn hash_password(password: &str, salt: &str) -> String {
        let mut salted = password.to_string();
        salted.push_str(salt);
        sha256::digest(salted)
    }

    fn verify_password(password: &str, user: &User) -> bool {
        Self::hash_password(password, &user.salt) == user.password
    }

    pub async fn register(&self, data: RegisterRequest) -> Result<RegisterResponse> {
        self.validate_registration(&data)?;

        if self.users.find_by_email(&data.email).await?.is_some() {
            return Err(ServiceError::conflict("User already exists"));
        }

        let salt: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(10)
            .map(char::from)
            .collect();

        let user = User {
            id: ObjectId::new(),
            name: data.name,
            email: data.email,
            password: Self::hash_password(&data.password, &salt),
            salt,
            role: Role::User,
            created_at: default_timestamp(),
        };

        self.users.insert(&user).await?;
        log::info!("registered user {}", user.id.to_hex());

        let token = auth::issue_token(&user)?;
        Ok(RegisterResponse {
            token,
            name: user.name,
            email: user.email,
        })
    }

    /// Unknown email and wrong password answer with the same message, so a
    /// caller cannot probe which addresses are registered.
    pub async fn login(&self, login: &Login) -> Result<(String, PublicUser)> {
        let Some(user) = self.users.find_by_email(&login.email).await? else {
            return Err(ServiceError::not_found("Invalid email or password"));
        };
        if !Self::verify_password(&login.password, &user) {
            return Err(ServiceError::unauthorized("Invalid email or password"));
        }

        let token = auth::issue_token(&user)?;
        Ok((token, user.into()))
    }

    pub async fn all_users(&self) -> Result<Vec<PublicUser>> {
        let users = self.users.find_all().await?;
        Ok(users.into_iter().map(PublicUser::from).collect())
    }
}
