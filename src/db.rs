use log::{error, info, warn};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};
use std::fs;
use std::path::Path;

use crate::config::AppConfig;
use crate::store::{self, StoreError};
use crate::store::user::UserForm;

pub async fn connect_db(config: &AppConfig) -> DatabaseConnection {
    let url = config.database_url();
    ensure_sqlite_dir(&url);
    let db = Database::connect(&url)
        .await
        .unwrap_or_else(|e| panic!("db connect failed: {}", e));
    if let Err(e) = init_schema(&db).await {
        panic!("db schema init failed: {}", e);
    }
    db
}

fn ensure_sqlite_dir(url: &str) {
    let Some(path) = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
    else {
        return;
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path.starts_with(":memory:") {
        return;
    }
    if let Some(parent) = Path::new(path).parent() {
        let _ = fs::create_dir_all(parent);
    }
}

/// Creates the tables from the embedded schema unless `t_user` already exists.
pub async fn init_schema<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let exists_stmt = Statement::from_string(
        backend,
        "SELECT name FROM sqlite_master WHERE type='table' AND name='t_user' LIMIT 1",
    );
    let exists = db.query_one(exists_stmt).await?.is_some();
    if exists {
        return Ok(());
    }

    let sql = include_str!("../schema-sqlite.sql");
    for stmt in split_sql(sql) {
        db.execute(Statement::from_string(backend, stmt)).await?;
    }
    info!("database schema created");
    Ok(())
}

pub async fn seed_admin(db: &DatabaseConnection, config: &AppConfig) {
    let Some(seed) = &config.seed_admin else {
        return;
    };

    let existing = match store::user::find_by_email(db, &seed.email).await {
        Ok(existing) => existing,
        Err(e) => {
            error!("seed admin lookup failed: {}", e);
            return;
        }
    };

    let user = match existing {
        Some(user) => user,
        None => {
            let form = UserForm {
                name: Some(seed.name.clone()),
                email: Some(seed.email.clone()),
                password: Some(seed.password.clone()),
                password_confirmation: Some(seed.password.clone()),
            };
            match store::user::create(db, &form, config.bcrypt_cost).await {
                Ok(user) => user,
                Err(StoreError::Invalid(errors)) => {
                    warn!("seed admin rejected: {}", errors.join(", "));
                    return;
                }
                Err(e) => {
                    error!("seed admin insert failed: {}", e);
                    return;
                }
            }
        }
    };

    if !user.admin {
        if let Err(e) = store::user::set_admin(db, user.id, true).await {
            error!("seed admin promote failed: {}", e);
            return;
        }
    }
    info!("admin account ready: {}", user.email);
}

fn split_sql(input: &str) -> Vec<String> {
    let mut buf = String::new();
    for line in input.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("--") || trimmed.is_empty() {
            continue;
        }
        buf.push_str(line);
        buf.push('\n');
    }
    buf.split(';')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
