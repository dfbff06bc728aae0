pub mod handlers;
pub mod service;

use actix_cors::Cors;
use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{middleware, web, App};

use common::repository::UserRepositoryObject;

use crate::service::auth::PasswordPolicy;

pub use crate::handlers::auth::*;

#[derive(Debug, Clone, Copy)]
pub struct AppSettings {
    pub password_policy: PasswordPolicy,
    pub secure_cookies: bool,
}

pub fn create_app(
    users: UserRepositoryObject,
    settings: AppSettings,
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
        .app_data(web::Data::new(users))
        .app_data(web::Data::new(settings))
        .service(register)
        .service(login)
        .service(logout)
        .service(me)
        .service(get_all_users)
}
