mod auth;
mod config;
mod db;
mod entity;
mod error;
mod gravatar;
mod pagination;
mod password;
mod response;
mod routes;
mod store;
#[cfg(test)]
mod test_support;
mod validation;

use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    middleware, web, App, HttpServer,
};
use config::AppConfig;
use db::connect_db;
use log::info;
use response::{json_error_handler, path_error_handler, query_error_handler};
use sea_orm::DatabaseConnection;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();
    let config = AppConfig::from_env();
    let db = connect_db(&config).await;
    db::seed_admin(&db, &config).await;
    let server_port = config.server_port;

    let server = HttpServer::new(move || build_app(config.clone(), db.clone()))
        .bind(("0.0.0.0", server_port))?;
    info!("server started at http://0.0.0.0:{}", server_port);
    server.run().await
}

pub(crate) fn build_app(
    config: AppConfig,
    db: DatabaseConnection,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(config))
        .app_data(web::Data::new(db))
        .app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .app_data(web::PathConfig::default().error_handler(path_error_handler))
        .wrap(middleware::Logger::default())
        .wrap(middleware::from_fn(routes::cors::cors_handler))
        .configure(routes::configure)
}
