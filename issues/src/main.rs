use std::env;
use std::sync::Arc;

use actix_web::HttpServer;

use common::repository::mongo_repository::{MongoIssueRepository, MongoUserRepository};
use common::repository::{IssueRepositoryObject, UserRepositoryObject};
use issues::create_app;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let mongo_uri = env::var("MONGOURI").expect("MONGOURI must be set");
    let port = env::var("PORT")
        .ok()
        .and_then(|port| port.parse().ok())
        .unwrap_or(3002);

    let issues: IssueRepositoryObject = Arc::new(MongoIssueRepository::new(&mongo_uri).await);
    let users: UserRepositoryObject = Arc::new(MongoUserRepository::new(&mongo_uri).await);

    HttpServer::new(move || create_app(issues.clone(), users.clone()))
        .bind(("0.0.0.0", port))?
        .run()
        .await
}
