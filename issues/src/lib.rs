pub mod handlers;
pub mod service;

use actix_cors::Cors;
use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{middleware, web, App};

use common::repository::{IssueRepositoryObject, UserRepositoryObject};

pub use crate::handlers::issue::*;
pub use crate::handlers::query::*;

pub fn create_app(
    issues: IssueRepositoryObject,
    users: UserRepositoryObject,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Response = ServiceResponse<impl MessageBody>,
        Config = (),
        InitError = (),
        Error = actix_web::Error,
    >,
> {
    let cors = Cors::permissive();
    App::new()
        .wrap(cors)
        .wrap(middleware::Logger::default())
        .app_data(web::Data::new(issues))
        .app_data(web::Data::new(users))
        .service(create_issue)
        .service(update_issue)
        .service(update_issue_status)
        .service(assign_issue)
        .service(delete_issue)
        .service(get_issue)
        .service(all_issues)
        .service(all_users)
        .service(export_issues)
}
