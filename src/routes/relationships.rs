use actix_web::{web, HttpResponse};
use log::debug;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};

use super::{db_error, store_error};
use crate::auth::AuthUser;
use crate::entity::relationship;
use crate::error::AppError;
use crate::response::ResponseDto;
use crate::store;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("").route(web::post().to(create)))
        .service(web::resource("/{id:\\d+}").route(web::delete().to(destroy)));
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelationshipForm {
    #[serde(alias = "followed_id")]
    followed_id: Option<i32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RelationshipDto {
    id: i32,
    follower_id: i32,
    followed_id: i32,
    following: bool,
    followers_count: u64,
}

async fn create(
    auth: AuthUser,
    db: web::Data<DatabaseConnection>,
    payload: web::Json<RelationshipForm>,
) -> Result<HttpResponse, AppError> {
    if let Some(followed_id) = payload.followed_id {
        store::user::find(db.get_ref(), followed_id)
            .await
            .map_err(db_error)?
            .ok_or_else(|| AppError::fail("User not found"))?;
    }

    let edge = store::relationship::follow(db.get_ref(), auth.user_id, payload.followed_id)
        .await
        .map_err(store_error("show"))?;
    debug!("user {} follows user {}", edge.follower_id, edge.followed_id);

    let dto = to_relationship_dto(db.get_ref(), edge, true).await?;
    Ok(HttpResponse::Ok().json(ResponseDto::success(Some(dto))))
}

async fn destroy(
    auth: AuthUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let edge = store::relationship::find(db.get_ref(), path.into_inner())
        .await
        .map_err(db_error)?
        .ok_or_else(AppError::access_denied)?;
    if !auth.is_user(edge.follower_id) {
        debug!("user {} may not remove relationship {}", auth.user_id, edge.id);
        return Err(AppError::access_denied());
    }

    store::relationship::unfollow(db.get_ref(), edge.follower_id, edge.followed_id)
        .await
        .map_err(db_error)?;
    debug!("user {} unfollowed user {}", edge.follower_id, edge.followed_id);

    let dto = to_relationship_dto(db.get_ref(), edge, false).await?;
    Ok(HttpResponse::Ok().json(ResponseDto::success(Some(dto))))
}

async fn to_relationship_dto(
    db: &DatabaseConnection,
    edge: relationship::Model,
    following: bool,
) -> Result<RelationshipDto, AppError> {
    let followers_count = store::relationship::followers_count(db, edge.followed_id)
        .await
        .map_err(db_error)?;
    Ok(RelationshipDto {
        id: edge.id,
        follower_id: edge.follower_id,
        followed_id: edge.followed_id,
        following,
        followers_count,
    })
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};
    use serde_json::{json, Value};

    use crate::build_app;
    use crate::store;
    use crate::test_support::{create_user, location, memory_db, sign_in_cookie, test_config};

    #[actix_web::test]
    async fn anonymous_visitors_cannot_follow() {
        let db = memory_db().await;
        let other = create_user(&db, "other", "other@example.com").await;
        let app = test::init_service(build_app(test_config(), db)).await;

        let req = test::TestRequest::post()
            .uri("/relationships")
            .set_json(json!({"followedId": other.id}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/signin");
    }

    #[actix_web::test]
    async fn follow_then_unfollow() {
        let db = memory_db().await;
        let config = test_config();
        let user = create_user(&db, "tester", "tester@example.com").await;
        let other = create_user(&db, "other", "other@example.com").await;
        let app = test::init_service(build_app(config.clone(), db.clone())).await;

        let req = test::TestRequest::post()
            .uri("/relationships")
            .cookie(sign_in_cookie(&config, &user))
            .set_json(json!({"followed_id": other.id}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["code"], 0);
        assert_eq!(body["data"]["following"], true);
        assert_eq!(body["data"]["followersCount"], 1);
        assert!(store::relationship::is_following(&db, user.id, other.id).await.unwrap());
        let edge_id = body["data"]["id"].as_i64().unwrap();

        let req = test::TestRequest::delete()
            .uri(&format!("/relationships/{}", edge_id))
            .cookie(sign_in_cookie(&config, &user))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["following"], false);
        assert_eq!(body["data"]["followersCount"], 0);
        assert!(!store::relationship::is_following(&db, user.id, other.id).await.unwrap());
    }

    #[actix_web::test]
    async fn missing_followed_id_is_invalid() {
        let db = memory_db().await;
        let config = test_config();
        let user = create_user(&db, "tester", "tester@example.com").await;
        let app = test::init_service(build_app(config.clone(), db)).await;

        let req = test::TestRequest::post()
            .uri("/relationships")
            .cookie(sign_in_cookie(&config, &user))
            .set_json(json!({}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["code"], 1);

        let req = test::TestRequest::post()
            .uri("/relationships")
            .cookie(sign_in_cookie(&config, &user))
            .set_json(json!({"followedId": 9999}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["code"], 2);
    }

    #[actix_web::test]
    async fn only_the_follower_removes_a_relationship() {
        let db = memory_db().await;
        let config = test_config();
        let user = create_user(&db, "tester", "tester@example.com").await;
        let other = create_user(&db, "other", "other@example.com").await;
        let edge = store::relationship::follow(&db, user.id, Some(other.id)).await.unwrap();
        let app = test::init_service(build_app(config.clone(), db.clone())).await;

        let req = test::TestRequest::delete()
            .uri(&format!("/relationships/{}", edge.id))
            .cookie(sign_in_cookie(&config, &other))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/");
        assert!(store::relationship::is_following(&db, user.id, other.id).await.unwrap());
    }
}
