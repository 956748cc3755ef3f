use actix_web::{web, HttpResponse};
use log::info;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};

use super::{db_error, FormDto};
use crate::auth::{self, OptionalAuthUser};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::response::{see_other, ResponseDto};
use crate::store;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/signin").route(web::get().to(new_session)))
        .service(web::resource("/sessions").route(web::post().to(create)))
        .service(web::resource("/signout").route(web::delete().to(destroy)));
}

#[derive(Deserialize)]
struct SessionForm {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionDto {
    token: String,
    user_id: i32,
    name: String,
    admin: bool,
}

async fn new_session() -> Result<HttpResponse, AppError> {
    let form = FormDto::new("/sessions", "POST")
        .field("email", "")
        .field("password", "");
    Ok(HttpResponse::Ok().json(ResponseDto::success(Some(form))))
}

async fn create(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    payload: web::Json<SessionForm>,
) -> Result<HttpResponse, AppError> {
    let email = payload.email.clone().unwrap_or_default();
    let password = payload.password.clone().unwrap_or_default();

    let user = store::user::authenticate(db.get_ref(), &email, &password)
        .await
        .map_err(db_error)?
        .ok_or_else(|| {
            AppError::invalid("new", vec!["Invalid email/password combination.".to_string()])
        })?;
    info!("user {} signed in", user.id);

    let token = auth::session_token(&config, &user)?;
    let location = format!("/users/{}", user.id);
    let dto = SessionDto {
        token: token.clone(),
        user_id: user.id,
        name: user.name,
        admin: user.admin,
    };
    Ok(see_other(&location)
        .cookie(auth::session_cookie(&config, token))
        .json(ResponseDto::success(Some(dto))))
}

/// Clears the cookie and rotates the remember token so outstanding sessions stop working.
async fn destroy(
    auth: OptionalAuthUser,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, AppError> {
    if let Some(auth) = auth.0 {
        store::user::remember_me(db.get_ref(), auth.user_id)
            .await
            .map_err(db_error)?;
        info!("user {} signed out", auth.user_id);
    }
    Ok(see_other("/")
        .cookie(auth::removal_cookie(&config))
        .json(ResponseDto::<()>::success(None)))
}
