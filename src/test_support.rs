use actix_web::{cookie::Cookie, dev::ServiceResponse, http::header};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};

use crate::auth;
use crate::config::AppConfig;
use crate::db;
use crate::entity::user;
use crate::store;
use crate::store::user::UserForm;

pub const TEST_COST: u32 = 4;

pub fn test_config() -> AppConfig {
    AppConfig {
        server_port: 0,
        sqlite_path: ":memory:".to_string(),
        database_url: Some("sqlite::memory:".to_string()),
        session_secret: "test-session-secret".to_string(),
        session_key: "_servertracker_session".to_string(),
        token_header: "token".to_string(),
        front_domain: String::new(),
        per_page: 30,
        bcrypt_cost: TEST_COST,
        remember_days: 1,
        seed_admin: None,
    }
}

/// Fresh in-memory database with the schema loaded. One pooled connection
/// keeps every query on the same SQLite memory instance.
pub async fn memory_db() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_string());
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let conn = Database::connect(opt).await.unwrap();
    db::init_schema(&conn).await.unwrap();
    conn
}

pub fn user_form(name: &str, email: &str) -> UserForm {
    UserForm {
        name: Some(name.to_string()),
        email: Some(email.to_string()),
        password: Some("foobar".to_string()),
        password_confirmation: Some("foobar".to_string()),
    }
}

/// A valid user whose password is `foobar`.
pub async fn create_user<C: ConnectionTrait>(db: &C, name: &str, email: &str) -> user::Model {
    store::user::create(db, &user_form(name, email), TEST_COST)
        .await
        .unwrap()
}

pub async fn create_admin<C: ConnectionTrait>(db: &C, name: &str, email: &str) -> user::Model {
    let user = create_user(db, name, email).await;
    store::user::set_admin(db, user.id, true).await.unwrap();
    store::user::find(db, user.id).await.unwrap().unwrap()
}

/// Session cookie for `user`, as if they had signed in.
pub fn sign_in_cookie(config: &AppConfig, user: &user::Model) -> Cookie<'static> {
    let token = auth::session_token(config, user).unwrap();
    auth::session_cookie(config, token)
}

pub fn location<B>(resp: &ServiceResponse<B>) -> String {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// The session cookie a response set, if any.
pub fn issued_session<B>(resp: &ServiceResponse<B>, config: &AppConfig) -> Option<Cookie<'static>> {
    resp.response()
        .cookies()
        .find(|c| c.name() == config.session_key && !c.value().is_empty())
        .map(|c| c.into_owned())
}
