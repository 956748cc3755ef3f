use actix_web::{
    cookie::{time, Cookie, SameSite},
    dev::Payload,
    web, FromRequest, HttpRequest,
};
use chrono::{Duration, Utc};
use futures_util::future::LocalBoxFuture;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::{debug, error};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::entity::user;
use crate::error::AppError;
use crate::store;

/// The signed-in user, resolved from the session cookie or the token header.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: i32,
    pub admin: bool,
}

#[derive(Clone, Debug)]
pub struct OptionalAuthUser(pub Option<AuthUser>);

#[derive(Serialize, Deserialize)]
struct Claims {
    #[serde(rename = "loginId")]
    login_id: i32,
    #[serde(rename = "rememberToken")]
    remember_token: String,
    exp: usize,
}

impl AuthUser {
    pub fn is_user(&self, user_id: i32) -> bool {
        self.user_id == user_id
    }
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let db = match req.app_data::<web::Data<DatabaseConnection>>() {
            Some(db) => db.clone(),
            None => {
                return Box::pin(async { Err(AppError::system_exception().into()) });
            }
        };
        let config = match req.app_data::<web::Data<AppConfig>>() {
            Some(cfg) => cfg.clone(),
            None => {
                return Box::pin(async { Err(AppError::system_exception().into()) });
            }
        };
        let token = extract_token(req, &config);

        Box::pin(async move {
            let token = token.ok_or_else(AppError::need_login)?;
            let auth = authenticate_token(&db, &config, &token).await?;
            Ok(auth)
        })
    }
}

impl FromRequest for OptionalAuthUser {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let db = match req.app_data::<web::Data<DatabaseConnection>>() {
            Some(db) => db.clone(),
            None => {
                return Box::pin(async { Ok(OptionalAuthUser(None)) });
            }
        };
        let config = match req.app_data::<web::Data<AppConfig>>() {
            Some(cfg) => cfg.clone(),
            None => {
                return Box::pin(async { Ok(OptionalAuthUser(None)) });
            }
        };
        let token = extract_token(req, &config);

        Box::pin(async move {
            if let Some(token) = token {
                let auth = authenticate_token(&db, &config, &token).await.ok();
                return Ok(OptionalAuthUser(auth));
            }
            Ok(OptionalAuthUser(None))
        })
    }
}

/// Signs `user` in: a JWT carrying the user id and current remember token.
pub fn session_token(config: &AppConfig, user: &user::Model) -> Result<String, AppError> {
    let remember_token = user
        .remember_token
        .clone()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            error!("user {} has no remember token", user.id);
            AppError::system_exception()
        })?;
    let exp = (Utc::now() + Duration::days(config.remember_days)).timestamp() as usize;
    let claims = Claims {
        login_id: user.id,
        remember_token,
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.session_secret.as_bytes()),
    )
    .map_err(|e| {
        error!("session token encode failed: {}", e);
        AppError::system_exception()
    })
}

pub fn session_cookie(config: &AppConfig, token: String) -> Cookie<'static> {
    Cookie::build(config.session_key.clone(), token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(config.remember_days))
        .finish()
}

pub fn removal_cookie(config: &AppConfig) -> Cookie<'static> {
    let mut cookie = Cookie::build(config.session_key.clone(), "")
        .path("/")
        .finish();
    cookie.make_removal();
    cookie
}

fn extract_token(req: &HttpRequest, config: &AppConfig) -> Option<String> {
    if let Some(cookie) = req.cookie(&config.session_key) {
        let value = cookie.value().trim();
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }
    req.headers()
        .get(config.token_header.as_str())
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

async fn authenticate_token(
    db: &DatabaseConnection,
    config: &AppConfig,
    token: &str,
) -> Result<AuthUser, AppError> {
    let claims = decode_jwt(config, token)?;
    let user = store::user::find(db, claims.login_id)
        .await
        .map_err(|e| {
            error!("session user lookup failed: {}", e);
            AppError::system_exception()
        })?
        .ok_or_else(AppError::need_login)?;

    if user.remember_token.as_deref() != Some(claims.remember_token.as_str()) {
        debug!("stale session for user {}", user.id);
        return Err(AppError::need_login());
    }

    Ok(AuthUser {
        user_id: user.id,
        admin: user.admin,
    })
}

fn decode_jwt(config: &AppConfig, token: &str) -> Result<Claims, AppError> {
    let key = DecodingKey::from_secret(config.session_secret.as_bytes());
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|_| AppError::need_login())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    use crate::test_support::{create_user, memory_db, test_config};

    #[actix_web::test]
    async fn session_cookie_resolves_to_the_user() {
        let db = memory_db().await;
        let config = test_config();
        let user = create_user(&db, "tester", "tester@example.com").await;

        let token = session_token(&config, &user).unwrap();
        let auth = authenticate_token(&db, &config, &token).await.unwrap();
        assert_eq!(auth.user_id, user.id);
        assert!(!auth.admin);
    }

    #[actix_web::test]
    async fn rotated_remember_token_invalidates_the_session() {
        let db = memory_db().await;
        let config = test_config();
        let user = create_user(&db, "tester", "tester@example.com").await;
        let token = session_token(&config, &user).unwrap();

        store::user::remember_me(&db, user.id).await.unwrap();
        let err = authenticate_token(&db, &config, &token).await.unwrap_err();
        assert!(matches!(err, AppError::Redirect { ref location, .. } if location == "/signin"));
    }

    #[actix_web::test]
    async fn token_signed_with_another_secret_is_rejected() {
        let db = memory_db().await;
        let config = test_config();
        let user = create_user(&db, "tester", "tester@example.com").await;
        let mut other = test_config();
        other.session_secret = "another-secret".to_string();

        let token = session_token(&other, &user).unwrap();
        assert!(authenticate_token(&db, &config, &token).await.is_err());
    }

    #[test]
    fn token_is_read_from_cookie_then_header() {
        let config = test_config();
        let req = TestRequest::default()
            .cookie(Cookie::new(config.session_key.clone(), "from-cookie"))
            .insert_header((config.token_header.as_str(), "from-header"))
            .to_http_request();
        assert_eq!(extract_token(&req, &config).as_deref(), Some("from-cookie"));

        let req = TestRequest::default()
            .insert_header((config.token_header.as_str(), " from-header "))
            .to_http_request();
        assert_eq!(extract_token(&req, &config).as_deref(), Some("from-header"));

        let req = TestRequest::default().to_http_request();
        assert_eq!(extract_token(&req, &config), None);
    }
}
