use std::env;
use std::sync::Arc;

use actix_web::HttpServer;

use common::repository::mongo_repository::MongoUserRepository;
use common::repository::UserRepositoryObject;
use users::service::auth::PasswordPolicy;
use users::{create_app, AppSettings};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let mongo_uri = env::var("MONGOURI").expect("MONGOURI must be set");
    let port = env::var("PORT")
        .ok()
        .and_then(|port| port.parse().ok())
        .unwrap_or(3001);

    let password_policy = match env::var("STRICT_PASSWORDS").as_deref() {
        Ok("1") | Ok("true") => PasswordPolicy::Strict,
        _ => PasswordPolicy::Lenient,
    };
    let settings = AppSettings {
        password_policy,
        secure_cookies: env::var("ENVIRONMENT").as_deref() == Ok("production"),
    };

    let users: UserRepositoryObject = Arc::new(MongoUserRepository::new(&mongo_uri).await);

    HttpServer::new(move || create_app(users.clone(), settings))
        .bind(("0.0.0.0", port))?
        .run()
        .await
}
