use actix_web::web;
use log::error;
use sea_orm::DbErr;
use serde::Serialize;

use crate::error::AppError;
use crate::store::StoreError;

pub mod cors;
pub mod microposts;
pub mod pages;
pub mod relationships;
pub mod sessions;
pub mod users;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.configure(pages::config)
        .configure(sessions::config)
        .service(web::resource("/signup").route(web::get().to(users::new_user)))
        .service(web::scope("/users").configure(users::config))
        .service(web::scope("/microposts").configure(microposts::config))
        .service(web::scope("/relationships").configure(relationships::config));
}

/// Blank or pre-filled form a client renders for a create/update action.
#[derive(Serialize)]
pub(crate) struct FormDto {
    action: String,
    method: &'static str,
    fields: Vec<FieldDto>,
}

#[derive(Serialize)]
struct FieldDto {
    name: &'static str,
    value: String,
}

impl FormDto {
    pub(crate) fn new(action: impl Into<String>, method: &'static str) -> Self {
        Self {
            action: action.into(),
            method,
            fields: Vec::new(),
        }
    }

    pub(crate) fn field(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.fields.push(FieldDto {
            name,
            value: value.into(),
        });
        self
    }
}

pub(crate) fn db_error(err: DbErr) -> AppError {
    error!("database error: {}", err);
    AppError::system_exception()
}

/// Maps store failures, re-rendering `render` on validation errors.
pub(crate) fn store_error(render: &'static str) -> impl Fn(StoreError) -> AppError {
    move |err| match err {
        StoreError::Invalid(errors) => AppError::invalid(render, errors),
        StoreError::Db(e) => db_error(e),
        StoreError::Hash(e) => {
            error!("password hashing failed: {}", e);
            AppError::system_exception()
        }
    }
}

pub(crate) fn to_rfc3339(dt: chrono::DateTime<chrono::Utc>) -> String {
    dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, false)
}
