use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use log::debug;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};

use super::{db_error, store_error, to_rfc3339};
use crate::auth::AuthUser;
use crate::entity::{micropost, user};
use crate::error::AppError;
use crate::gravatar;
use crate::pagination::{Page, PageDto};
use crate::response::{see_other, Flash, ResponseDto};
use crate::store;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("").route(web::post().to(create)))
        .service(web::resource("/{id:\\d+}").route(web::delete().to(destroy)));
}

#[derive(Deserialize)]
struct MicropostForm {
    content: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MicropostDto {
    id: i32,
    content: String,
    user_id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    author_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    author_gravatar_url: Option<String>,
    created_at: Option<String>,
}

async fn create(
    auth: AuthUser,
    db: web::Data<DatabaseConnection>,
    payload: web::Json<MicropostForm>,
) -> Result<HttpResponse, AppError> {
    let content = payload.content.clone().unwrap_or_default();
    let post = store::micropost::create(db.get_ref(), auth.user_id, &content)
        .await
        .map_err(store_error("home"))?;
    debug!("micropost {} created by user {}", post.id, auth.user_id);

    Ok(see_other("/").json(
        ResponseDto::success(Some(to_micropost_dto(post)))
            .with_flash(Flash::Success("Micropost created!".to_string())),
    ))
}

async fn destroy(
    auth: AuthUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let post = store::micropost::find(db.get_ref(), path.into_inner())
        .await
        .map_err(db_error)?
        .ok_or_else(AppError::access_denied)?;
    if !auth.is_user(post.user_id) {
        debug!("user {} may not delete micropost {}", auth.user_id, post.id);
        return Err(AppError::access_denied());
    }

    store::micropost::destroy(db.get_ref(), post.id)
        .await
        .map_err(db_error)?;
    Ok(see_other("/").json(ResponseDto::<()>::success(None)))
}

pub(crate) fn to_micropost_dto(model: micropost::Model) -> MicropostDto {
    MicropostDto {
        id: model.id,
        content: model.content,
        user_id: model.user_id,
        author_name: None,
        author_gravatar_url: None,
        created_at: model.created_at.map(to_rfc3339),
    }
}

/// Renders a page of microposts written by several users, naming each author.
pub(crate) async fn with_authors(
    db: &DatabaseConnection,
    page: Page<micropost::Model>,
    base_path: &str,
) -> Result<PageDto<MicropostDto>, AppError> {
    let mut ids: Vec<i32> = page.items.iter().map(|m| m.user_id).collect();
    ids.sort_unstable();
    ids.dedup();
    let authors: HashMap<i32, user::Model> = store::user::find_many(db, ids)
        .await
        .map_err(db_error)?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    Ok(page.into_dto(base_path, |model| {
        let author = authors.get(&model.user_id);
        let mut dto = to_micropost_dto(model);
        dto.author_name = author.map(|u| u.name.clone());
        dto.author_gravatar_url = author.map(|u| gravatar::gravatar_url(&u.email, 50));
        dto
    }))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};
    use serde_json::{json, Value};

    use crate::build_app;
    use crate::store;
    use crate::test_support::{create_user, location, memory_db, sign_in_cookie, test_config};

    #[actix_web::test]
    async fn anonymous_visitors_cannot_post() {
        let db = memory_db().await;
        let app = test::init_service(build_app(test_config(), db)).await;

        let req = test::TestRequest::post()
            .uri("/microposts")
            .set_json(json!({"content": "Lorem ipsum"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/signin");
    }

    #[actix_web::test]
    async fn blank_content_renders_home() {
        let db = memory_db().await;
        let config = test_config();
        let user = create_user(&db, "tester", "tester@example.com").await;
        let app = test::init_service(build_app(config.clone(), db.clone())).await;

        let req = test::TestRequest::post()
            .uri("/microposts")
            .cookie(sign_in_cookie(&config, &user))
            .set_json(json!({"content": "  "}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["code"], 1);
        assert_eq!(body["data"]["render"], "home");
        assert_eq!(store::micropost::count_for_user(&db, user.id).await.unwrap(), 0);
    }

    #[actix_web::test]
    async fn valid_content_is_posted() {
        let db = memory_db().await;
        let config = test_config();
        let user = create_user(&db, "tester", "tester@example.com").await;
        let app = test::init_service(build_app(config.clone(), db.clone())).await;

        let req = test::TestRequest::post()
            .uri("/microposts")
            .cookie(sign_in_cookie(&config, &user))
            .set_json(json!({"content": "Lorem ipsum"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/");
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["content"], "Lorem ipsum");
        assert_eq!(body["data"]["userId"], user.id);
        assert!(body["flash"]["success"].is_string());
        assert_eq!(store::micropost::count_for_user(&db, user.id).await.unwrap(), 1);
    }

    #[actix_web::test]
    async fn only_the_author_deletes_a_micropost() {
        let db = memory_db().await;
        let config = test_config();
        let author = create_user(&db, "author", "author@example.com").await;
        let other = create_user(&db, "other", "other@example.com").await;
        let post = store::micropost::create(&db, author.id, "Lorem ipsum").await.unwrap();
        let app = test::init_service(build_app(config.clone(), db.clone())).await;

        let req = test::TestRequest::delete()
            .uri(&format!("/microposts/{}", post.id))
            .cookie(sign_in_cookie(&config, &other))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/");
        assert!(store::micropost::find(&db, post.id).await.unwrap().is_some());

        let req = test::TestRequest::delete()
            .uri(&format!("/microposts/{}", post.id))
            .cookie(sign_in_cookie(&config, &author))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert!(store::micropost::find(&db, post.id).await.unwrap().is_none());
    }
}
