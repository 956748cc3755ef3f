use chrono::Utc;
use log::debug;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;

use super::{flatten_tx_error, is_unique_violation, StoreError};
use crate::entity::{micropost, relationship, user};
use crate::pagination::{clamp_page, Page};
use crate::password;
use crate::validation::{validate_user, PasswordRule};

const EMAIL_TAKEN: &str = "Email has already been taken";

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(alias = "password_confirmation")]
    pub password_confirmation: Option<String>,
}

pub async fn create<C: ConnectionTrait>(
    db: &C,
    form: &UserForm,
    cost: u32,
) -> Result<user::Model, StoreError> {
    let name = form.name.clone().unwrap_or_default();
    let email = form.email.clone().unwrap_or_default();
    let password = form.password.clone().unwrap_or_default();
    let confirmation = form.password_confirmation.clone().unwrap_or_default();

    let mut errors = validate_user(&name, &email, &password, &confirmation, PasswordRule::Required)
        .err()
        .unwrap_or_default();
    if !email.is_empty() && email_taken(db, &email, None).await? {
        errors.push(EMAIL_TAKEN.to_string());
    }
    if !errors.is_empty() {
        return Err(StoreError::Invalid(errors));
    }

    let stored = password::encrypt(&password, cost)?;
    let now = Utc::now();
    let model = user::ActiveModel {
        name: Set(name),
        email: Set(email.to_lowercase()),
        encrypted_password: Set(stored.encrypted_password),
        salt: Set(stored.salt),
        remember_token: Set(Some(password::generate_remember_token())),
        admin: Set(false),
        created_at: Set(Some(now)),
        updated_at: Set(Some(now)),
        ..Default::default()
    };

    model.insert(db).await.map_err(map_write_error)
}

/// Applies `form` to `existing`. Absent fields keep their value; the password
/// is only replaced when one is submitted.
pub async fn update<C: ConnectionTrait>(
    db: &C,
    existing: user::Model,
    form: &UserForm,
    cost: u32,
) -> Result<user::Model, StoreError> {
    let name = form.name.clone().unwrap_or_else(|| existing.name.clone());
    let email = form.email.clone().unwrap_or_else(|| existing.email.clone());
    let password = form.password.clone().unwrap_or_default();
    let confirmation = form.password_confirmation.clone().unwrap_or_default();

    let mut errors = validate_user(&name, &email, &password, &confirmation, PasswordRule::IfPresent)
        .err()
        .unwrap_or_default();
    if !email.is_empty() && email_taken(db, &email, Some(existing.id)).await? {
        errors.push(EMAIL_TAKEN.to_string());
    }
    if !errors.is_empty() {
        return Err(StoreError::Invalid(errors));
    }

    let mut active: user::ActiveModel = existing.into();
    active.name = Set(name);
    active.email = Set(email.to_lowercase());
    if !password.is_empty() {
        let stored = password::encrypt(&password, cost)?;
        active.encrypted_password = Set(stored.encrypted_password);
        active.salt = Set(stored.salt);
    }
    active.updated_at = Set(Some(Utc::now()));

    active.update(db).await.map_err(map_write_error)
}

pub async fn find<C: ConnectionTrait>(db: &C, id: i32) -> Result<Option<user::Model>, DbErr> {
    user::Entity::find_by_id(id).one(db).await
}

pub async fn find_many<C: ConnectionTrait>(db: &C, ids: Vec<i32>) -> Result<Vec<user::Model>, DbErr> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    user::Entity::find()
        .filter(user::Column::Id.is_in(ids))
        .all(db)
        .await
}

pub async fn find_by_email<C: ConnectionTrait>(
    db: &C,
    email: &str,
) -> Result<Option<user::Model>, DbErr> {
    user::Entity::find()
        .filter(user::Column::Email.eq(email.trim().to_lowercase()))
        .one(db)
        .await
}

/// `None` when the email is unknown or the password does not match.
pub async fn authenticate<C: ConnectionTrait>(
    db: &C,
    email: &str,
    submitted_password: &str,
) -> Result<Option<user::Model>, DbErr> {
    let Some(user) = find_by_email(db, email).await? else {
        debug!("authenticate: no user for {}", email);
        return Ok(None);
    };
    if password::has_password(&user.encrypted_password, submitted_password) {
        Ok(Some(user))
    } else {
        debug!("authenticate: password mismatch for user {}", user.id);
        Ok(None)
    }
}

/// Replaces the remember token, invalidating every session issued with the old one.
pub async fn remember_me<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<String, DbErr> {
    let token = password::generate_remember_token();
    let active = user::ActiveModel {
        id: Set(user_id),
        remember_token: Set(Some(token.clone())),
        ..Default::default()
    };
    user::Entity::update(active).exec(db).await?;
    Ok(token)
}

pub async fn set_admin<C: ConnectionTrait>(db: &C, user_id: i32, admin: bool) -> Result<(), DbErr> {
    let active = user::ActiveModel {
        id: Set(user_id),
        admin: Set(admin),
        updated_at: Set(Some(Utc::now())),
        ..Default::default()
    };
    user::Entity::update(active).exec(db).await?;
    Ok(())
}

pub async fn paginate<C: ConnectionTrait>(
    db: &C,
    page: u64,
    per_page: u64,
) -> Result<Page<user::Model>, DbErr> {
    let paginator = user::Entity::find()
        .order_by_asc(user::Column::Id)
        .paginate(db, per_page);
    let total = paginator.num_items().await?;
    let page = clamp_page(page, total, per_page);
    let items = paginator.fetch_page(page.saturating_sub(1)).await?;
    Ok(Page::new(items, total, page, per_page))
}

/// Deletes the user with their microposts and every relationship touching them.
/// Returns `false` when no such user exists.
pub async fn destroy(db: &DatabaseConnection, user_id: i32) -> Result<bool, DbErr> {
    db.transaction::<_, bool, DbErr>(|txn| {
        Box::pin(async move {
            micropost::Entity::delete_many()
                .filter(micropost::Column::UserId.eq(user_id))
                .exec(txn)
                .await?;
            relationship::Entity::delete_many()
                .filter(
                    relationship::Column::FollowerId
                        .eq(user_id)
                        .or(relationship::Column::FollowedId.eq(user_id)),
                )
                .exec(txn)
                .await?;
            let result = user::Entity::delete_by_id(user_id).exec(txn).await?;
            Ok(result.rows_affected > 0)
        })
    })
    .await
    .map_err(flatten_tx_error)
}

async fn email_taken<C: ConnectionTrait>(
    db: &C,
    email: &str,
    except_id: Option<i32>,
) -> Result<bool, DbErr> {
    let mut query = user::Entity::find().filter(user::Column::Email.eq(email.to_lowercase()));
    if let Some(id) = except_id {
        query = query.filter(user::Column::Id.ne(id));
    }
    Ok(query.count(db).await? > 0)
}

fn map_write_error(err: DbErr) -> StoreError {
    if is_unique_violation(&err) {
        StoreError::Invalid(vec![EMAIL_TAKEN.to_string()])
    } else {
        StoreError::Db(err)
    }
}
