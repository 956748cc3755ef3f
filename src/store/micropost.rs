use chrono::Utc;
use sea_orm::sea_query::Query;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Select, Set,
};

use super::StoreError;
use crate::entity::{micropost, relationship};
use crate::pagination::{clamp_page, Page};
use crate::validation::validate_micropost;

pub async fn create<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    content: &str,
) -> Result<micropost::Model, StoreError> {
    validate_micropost(content)?;
    let now = Utc::now();
    let model = micropost::ActiveModel {
        content: Set(content.to_string()),
        user_id: Set(user_id),
        created_at: Set(Some(now)),
        updated_at: Set(Some(now)),
        ..Default::default()
    };
    Ok(model.insert(db).await?)
}

pub async fn find<C: ConnectionTrait>(db: &C, id: i32) -> Result<Option<micropost::Model>, DbErr> {
    micropost::Entity::find_by_id(id).one(db).await
}

pub async fn destroy<C: ConnectionTrait>(db: &C, id: i32) -> Result<(), DbErr> {
    micropost::Entity::delete_by_id(id).exec(db).await?;
    Ok(())
}

pub async fn count_for_user<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<u64, DbErr> {
    micropost::Entity::find()
        .filter(micropost::Column::UserId.eq(user_id))
        .count(db)
        .await
}

pub async fn for_user<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    page: u64,
    per_page: u64,
) -> Result<Page<micropost::Model>, DbErr> {
    let query = micropost::Entity::find().filter(micropost::Column::UserId.eq(user_id));
    paginate_newest_first(db, query, page, per_page).await
}

/// The user's own microposts together with those of everyone they follow.
pub async fn feed<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    page: u64,
    per_page: u64,
) -> Result<Page<micropost::Model>, DbErr> {
    let followed_ids = Query::select()
        .column(relationship::Column::FollowedId)
        .from(relationship::Entity)
        .and_where(relationship::Column::FollowerId.eq(user_id))
        .to_owned();
    let query = micropost::Entity::find().filter(
        Condition::any()
            .add(micropost::Column::UserId.eq(user_id))
            .add(micropost::Column::UserId.in_subquery(followed_ids)),
    );
    paginate_newest_first(db, query, page, per_page).await
}

async fn paginate_newest_first<C: ConnectionTrait>(
    db: &C,
    query: Select<micropost::Entity>,
    page: u64,
    per_page: u64,
) -> Result<Page<micropost::Model>, DbErr> {
    let paginator = query
        .order_by_desc(micropost::Column::CreatedAt)
        .order_by_desc(micropost::Column::Id)
        .paginate(db, per_page);
    let total = paginator.num_items().await?;
    let page = clamp_page(page, total, per_page);
    let items = paginator.fetch_page(page.saturating_sub(1)).await?;
    Ok(Page::new(items, total, page, per_page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::store::relationship as relationships;
    use crate::test_support::{create_user, memory_db};

    async fn post_at<C: ConnectionTrait>(
        db: &C,
        user_id: i32,
        content: &str,
        age: Duration,
    ) -> micropost::Model {
        let at = Utc::now() - age;
        micropost::ActiveModel {
            content: Set(content.to_string()),
            user_id: Set(user_id),
            created_at: Set(Some(at)),
            updated_at: Set(Some(at)),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    #[actix_web::test]
    async fn rejects_blank_and_overlong_content() {
        let db = memory_db().await;
        let user = create_user(&db, "tester", "tester@example.com").await;
        assert!(matches!(create(&db, user.id, " ").await, Err(StoreError::Invalid(_))));
        assert!(matches!(
            create(&db, user.id, &"a".repeat(141)).await,
            Err(StoreError::Invalid(_))
        ));
        let post = create(&db, user.id, "lorem ipsum").await.unwrap();
        assert_eq!(post.user_id, user.id);
    }

    #[actix_web::test]
    async fn lists_a_users_microposts_newest_first() {
        let db = memory_db().await;
        let user = create_user(&db, "tester", "tester@example.com").await;
        let older = post_at(&db, user.id, "older", Duration::days(1)).await;
        let newer = post_at(&db, user.id, "newer", Duration::hours(1)).await;

        let page = for_user(&db, user.id, 1, 30).await.unwrap();
        let ids: Vec<_> = page.items.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
        assert_eq!(count_for_user(&db, user.id).await.unwrap(), 2);
    }

    #[actix_web::test]
    async fn feed_includes_own_and_followed_posts_only() {
        let db = memory_db().await;
        let user = create_user(&db, "tester", "tester@example.com").await;
        let followed = create_user(&db, "followed", "followed@example.com").await;
        let stranger = create_user(&db, "stranger", "stranger@example.com").await;
        relationships::follow(&db, user.id, Some(followed.id)).await.unwrap();

        let own = post_at(&db, user.id, "own", Duration::hours(3)).await;
        let theirs = post_at(&db, followed.id, "theirs", Duration::hours(2)).await;
        let other = post_at(&db, stranger.id, "other", Duration::hours(1)).await;

        let page = feed(&db, user.id, 1, 30).await.unwrap();
        let ids: Vec<_> = page.items.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![theirs.id, own.id]);
        assert!(!ids.contains(&other.id));
    }

    #[actix_web::test]
    async fn destroy_removes_the_post() {
        let db = memory_db().await;
        let user = create_user(&db, "tester", "tester@example.com").await;
        let post = create(&db, user.id, "lorem ipsum").await.unwrap();
        destroy(&db, post.id).await.unwrap();
        assert!(find(&db, post.id).await.unwrap().is_none());
    }
}
