use actix_web::{web, HttpResponse};
use log::{debug, info};
use sea_orm::DatabaseConnection;
use serde::Serialize;

use super::microposts::{to_micropost_dto, MicropostDto};
use super::{db_error, store_error, to_rfc3339, FormDto};
use crate::auth::{self, AuthUser, OptionalAuthUser};
use crate::config::AppConfig;
use crate::entity::user;
use crate::error::AppError;
use crate::gravatar;
use crate::pagination::{PageDto, PageQuery};
use crate::response::{see_other, Flash, ResponseDto};
use crate::store;
use crate::store::user::UserForm;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("")
            .route(web::get().to(index))
            .route(web::post().to(create)),
    )
    .service(web::resource("/new").route(web::get().to(new_user)))
    .service(
        web::resource("/{id:\\d+}")
            .route(web::get().to(show))
            .route(web::put().to(update))
            .route(web::delete().to(destroy)),
    )
    .service(web::resource("/{id:\\d+}/edit").route(web::get().to(edit)))
    .service(web::resource("/{id:\\d+}/following").route(web::get().to(following)))
    .service(web::resource("/{id:\\d+}/followers").route(web::get().to(followers)));
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UserDto {
    id: i32,
    name: String,
    admin: bool,
    gravatar_url: String,
    created_at: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileDto {
    user: UserDto,
    micropost_count: u64,
    following_count: u64,
    followers_count: u64,
    /// Whether the viewer follows this user; absent for anonymous viewers.
    #[serde(skip_serializing_if = "Option::is_none")]
    followed_by_viewer: Option<bool>,
    microposts: PageDto<MicropostDto>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EditUserDto {
    user: UserDto,
    email: String,
    form: FormDto,
    gravatar_edit_url: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FollowListDto {
    user: UserDto,
    users: PageDto<UserDto>,
}

#[derive(Clone, Copy)]
enum Direction {
    Following,
    Followers,
}

impl Direction {
    fn segment(self) -> &'static str {
        match self {
            Direction::Following => "following",
            Direction::Followers => "followers",
        }
    }
}

pub(crate) async fn new_user() -> Result<HttpResponse, AppError> {
    let form = FormDto::new("/users", "POST")
        .field("name", "")
        .field("email", "")
        .field("password", "")
        .field("passwordConfirmation", "");
    Ok(HttpResponse::Ok().json(ResponseDto::success(Some(form))))
}

async fn create(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    payload: web::Json<UserForm>,
) -> Result<HttpResponse, AppError> {
    let user = store::user::create(db.get_ref(), &payload, config.bcrypt_cost)
        .await
        .map_err(store_error("new"))?;
    info!("user {} signed up", user.id);

    let token = auth::session_token(&config, &user)?;
    let location = format!("/users/{}", user.id);
    Ok(see_other(&location)
        .cookie(auth::session_cookie(&config, token))
        .json(
            ResponseDto::success(Some(to_user_dto(user)))
                .with_flash(Flash::Success("Welcome to ServerTracker!".to_string())),
        ))
}

async fn show(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    auth: OptionalAuthUser,
    path: web::Path<i32>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    let user = find_user(db.get_ref(), path.into_inner()).await?;
    let microposts = store::micropost::for_user(db.get_ref(), user.id, query.page(), config.per_page)
        .await
        .map_err(db_error)?;
    let micropost_count = microposts.total;
    let following_count = store::relationship::following_count(db.get_ref(), user.id)
        .await
        .map_err(db_error)?;
    let followers_count = store::relationship::followers_count(db.get_ref(), user.id)
        .await
        .map_err(db_error)?;
    let followed_by_viewer = match auth.0 {
        Some(viewer) if !viewer.is_user(user.id) => Some(
            store::relationship::is_following(db.get_ref(), viewer.user_id, user.id)
                .await
                .map_err(db_error)?,
        ),
        _ => None,
    };

    let base = format!("/users/{}", user.id);
    let dto = ProfileDto {
        microposts: microposts.into_dto(&base, to_micropost_dto),
        user: to_user_dto(user),
        micropost_count,
        following_count,
        followers_count,
        followed_by_viewer,
    };
    Ok(HttpResponse::Ok().json(ResponseDto::success(Some(dto))))
}

async fn edit(
    auth: AuthUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let user = correct_user(db.get_ref(), &auth, path.into_inner()).await?;

    let form = FormDto::new(format!("/users/{}", user.id), "PUT")
        .field("name", user.name.clone())
        .field("email", user.email.clone())
        .field("password", "")
        .field("passwordConfirmation", "");
    let dto = EditUserDto {
        email: user.email.clone(),
        user: to_user_dto(user),
        form,
        gravatar_edit_url: gravatar::EDIT_URL,
    };
    Ok(HttpResponse::Ok().json(ResponseDto::success(Some(dto))))
}

async fn update(
    auth: AuthUser,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    path: web::Path<i32>,
    payload: web::Json<UserForm>,
) -> Result<HttpResponse, AppError> {
    let user = correct_user(db.get_ref(), &auth, path.into_inner()).await?;
    let updated = store::user::update(db.get_ref(), user, &payload, config.bcrypt_cost)
        .await
        .map_err(store_error("edit"))?;

    let location = format!("/users/{}", updated.id);
    Ok(see_other(&location).json(
        ResponseDto::success(Some(to_user_dto(updated)))
            .with_flash(Flash::Success("Profile updated.".to_string())),
    ))
}

async fn index(
    _auth: AuthUser,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    let page = store::user::paginate(db.get_ref(), query.page(), config.per_page)
        .await
        .map_err(db_error)?;
    Ok(HttpResponse::Ok().json(ResponseDto::success(Some(page.into_dto("/users", to_user_dto)))))
}

async fn destroy(
    auth: AuthUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    if !auth.admin {
        debug!("user {} is not an admin", auth.user_id);
        return Err(AppError::access_denied());
    }

    let user_id = path.into_inner();
    let removed = store::user::destroy(db.get_ref(), user_id)
        .await
        .map_err(db_error)?;
    if !removed {
        return Err(AppError::fail("User not found"));
    }
    info!("user {} destroyed by admin {}", user_id, auth.user_id);

    Ok(see_other("/users").json(
        ResponseDto::<()>::success(None).with_flash(Flash::Success("User destroyed.".to_string())),
    ))
}

async fn following(
    auth: AuthUser,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    path: web::Path<i32>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    follow_list(auth, db, config, path, query, Direction::Following).await
}

async fn followers(
    auth: AuthUser,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    path: web::Path<i32>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    follow_list(auth, db, config, path, query, Direction::Followers).await
}

async fn follow_list(
    _auth: AuthUser,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    path: web::Path<i32>,
    query: web::Query<PageQuery>,
    direction: Direction,
) -> Result<HttpResponse, AppError> {
    let user = find_user(db.get_ref(), path.into_inner()).await?;
    let page = match direction {
        Direction::Following => {
            store::relationship::following(db.get_ref(), user.id, query.page(), config.per_page).await
        }
        Direction::Followers => {
            store::relationship::followers(db.get_ref(), user.id, query.page(), config.per_page).await
        }
    }
    .map_err(db_error)?;

    let base = format!("/users/{}/{}", user.id, direction.segment());
    let dto = FollowListDto {
        user: to_user_dto(user),
        users: page.into_dto(&base, to_user_dto),
    };
    Ok(HttpResponse::Ok().json(ResponseDto::success(Some(dto))))
}

async fn find_user(db: &DatabaseConnection, user_id: i32) -> Result<user::Model, AppError> {
    store::user::find(db, user_id)
        .await
        .map_err(db_error)?
        .ok_or_else(|| AppError::fail("User not found"))
}

/// Only the signed-in user may edit their own profile.
async fn correct_user(
    db: &DatabaseConnection,
    auth: &AuthUser,
    user_id: i32,
) -> Result<user::Model, AppError> {
    if !auth.is_user(user_id) {
        debug!("user {} may not edit user {}", auth.user_id, user_id);
        return Err(AppError::access_denied());
    }
    store::user::find(db, user_id)
        .await
        .map_err(db_error)?
        .ok_or_else(AppError::access_denied)
}

pub(crate) fn to_user_dto(model: user::Model) -> UserDto {
    UserDto {
        id: model.id,
        gravatar_url: gravatar::gravatar_url(&model.email, 50),
        name: model.name,
        admin: model.admin,
        created_at: model.created_at.map(to_rfc3339),
    }
}
