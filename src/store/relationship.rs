use chrono::Utc;
use sea_orm::sea_query::{Query, SelectStatement};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};

use super::{is_unique_violation, StoreError};
use crate::entity::{relationship, user};
use crate::pagination::{clamp_page, Page};
use crate::validation::validate_relationship;

/// Makes `follower_id` follow `followed_id`. Following twice returns the existing edge.
pub async fn follow<C: ConnectionTrait>(
    db: &C,
    follower_id: i32,
    followed_id: Option<i32>,
) -> Result<relationship::Model, StoreError> {
    validate_relationship(Some(follower_id), followed_id)?;
    let Some(followed_id) = followed_id else {
        return Err(StoreError::Invalid(vec!["Followed can't be blank".to_string()]));
    };

    if let Some(existing) = find_edge(db, follower_id, followed_id).await? {
        return Ok(existing);
    }

    let now = Utc::now();
    let model = relationship::ActiveModel {
        follower_id: Set(follower_id),
        followed_id: Set(followed_id),
        created_at: Set(Some(now)),
        updated_at: Set(Some(now)),
        ..Default::default()
    };
    match model.insert(db).await {
        Ok(inserted) => Ok(inserted),
        Err(e) if is_unique_violation(&e) => find_edge(db, follower_id, followed_id)
            .await?
            .ok_or(StoreError::Db(e)),
        Err(e) => Err(StoreError::Db(e)),
    }
}

pub async fn unfollow<C: ConnectionTrait>(
    db: &C,
    follower_id: i32,
    followed_id: i32,
) -> Result<bool, DbErr> {
    let result = relationship::Entity::delete_many()
        .filter(relationship::Column::FollowerId.eq(follower_id))
        .filter(relationship::Column::FollowedId.eq(followed_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

pub async fn find<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<Option<relationship::Model>, DbErr> {
    relationship::Entity::find_by_id(id).one(db).await
}

pub async fn is_following<C: ConnectionTrait>(
    db: &C,
    follower_id: i32,
    followed_id: i32,
) -> Result<bool, DbErr> {
    Ok(find_edge(db, follower_id, followed_id).await?.is_some())
}

/// Users `user_id` follows.
pub async fn following<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    page: u64,
    per_page: u64,
) -> Result<Page<user::Model>, DbErr> {
    let ids = edge_ids(
        relationship::Column::FollowedId,
        relationship::Column::FollowerId,
        user_id,
    );
    paginate_users_in(db, ids, page, per_page).await
}

/// Users following `user_id`.
pub async fn followers<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    page: u64,
    per_page: u64,
) -> Result<Page<user::Model>, DbErr> {
    let ids = edge_ids(
        relationship::Column::FollowerId,
        relationship::Column::FollowedId,
        user_id,
    );
    paginate_users_in(db, ids, page, per_page).await
}

pub async fn following_count<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<u64, DbErr> {
    relationship::Entity::find()
        .filter(relationship::Column::FollowerId.eq(user_id))
        .count(db)
        .await
}

pub async fn followers_count<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<u64, DbErr> {
    relationship::Entity::find()
        .filter(relationship::Column::FollowedId.eq(user_id))
        .count(db)
        .await
}

async fn find_edge<C: ConnectionTrait>(
    db: &C,
    follower_id: i32,
    followed_id: i32,
) -> Result<Option<relationship::Model>, DbErr> {
    relationship::Entity::find()
        .filter(relationship::Column::FollowerId.eq(follower_id))
        .filter(relationship::Column::FollowedId.eq(followed_id))
        .one(db)
        .await
}

fn edge_ids(
    select: relationship::Column,
    matching: relationship::Column,
    user_id: i32,
) -> SelectStatement {
    Query::select()
        .column(select)
        .from(relationship::Entity)
        .and_where(matching.eq(user_id))
        .to_owned()
}

async fn paginate_users_in<C: ConnectionTrait>(
    db: &C,
    ids: SelectStatement,
    page: u64,
    per_page: u64,
) -> Result<Page<user::Model>, DbErr> {
    let paginator = user::Entity::find()
        .filter(user::Column::Id.in_subquery(ids))
        .order_by_asc(user::Column::Id)
        .paginate(db, per_page);
    let total = paginator.num_items().await?;
    let page = clamp_page(page, total, per_page);
    let items = paginator.fetch_page(page.saturating_sub(1)).await?;
    Ok(Page::new(items, total, page, per_page))
}
