use actix_web::{web, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::Serialize;

use super::microposts::{with_authors, MicropostDto};
use super::users::{to_user_dto, UserDto};
use super::db_error;
use crate::auth::OptionalAuthUser;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::pagination::{PageDto, PageQuery};
use crate::response::ResponseDto;
use crate::store;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(home)));
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HomeDto {
    user: UserDto,
    micropost_count: u64,
    following_count: u64,
    followers_count: u64,
    feed: PageDto<MicropostDto>,
}

/// Signed-in visitors get their feed; anonymous visitors get `data: null`.
async fn home(
    auth: OptionalAuthUser,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    let Some(auth) = auth.0 else {
        return Ok(HttpResponse::Ok().json(ResponseDto::<HomeDto>::success(None)));
    };

    let user = store::user::find(db.get_ref(), auth.user_id)
        .await
        .map_err(db_error)?
        .ok_or_else(AppError::need_login)?;
    let micropost_count = store::micropost::count_for_user(db.get_ref(), user.id)
        .await
        .map_err(db_error)?;
    let following_count = store::relationship::following_count(db.get_ref(), user.id)
        .await
        .map_err(db_error)?;
    let followers_count = store::relationship::followers_count(db.get_ref(), user.id)
        .await
        .map_err(db_error)?;
    let feed = store::micropost::feed(db.get_ref(), user.id, query.page(), config.per_page)
        .await
        .map_err(db_error)?;

    let dto = HomeDto {
        feed: with_authors(db.get_ref(), feed, "/").await?,
        user: to_user_dto(user),
        micropost_count,
        following_count,
        followers_count,
    };
    Ok(HttpResponse::Ok().json(ResponseDto::success(Some(dto))))
}
