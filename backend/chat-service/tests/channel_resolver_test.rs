mod common;

use chat_service::error::AppError;
use chat_service::services::channel_service::ChannelService;

#[tokio::test]
async fn resolving_the_same_pair_is_idempotent_and_symmetric() {
    let Some(pool) = common::test_pool().await else { return };
    let alice = common::seed_user(&pool, "alice").await;
    let bob = common::seed_user(&pool, "bob").await;

    let first = ChannelService::get_or_create_direct_channel(&pool, alice, bob)
        .await
        .unwrap();
    let second = ChannelService::get_or_create_direct_channel(&pool, alice, bob)
        .await
        .unwrap();
    let reversed = ChannelService::get_or_create_direct_channel(&pool, bob, alice)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first, reversed);
}

#[tokio::test]
async fn concurrent_resolution_yields_one_surviving_channel() {
    let Some(pool) = common::test_pool().await else { return };
    let alice = common::seed_user(&pool, "alice").await;
    let bob = common::seed_user(&pool, "bob").await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            ChannelService::get_or_create_direct_channel(&pool, alice, bob).await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap());
    }
    let first = ids[0];
    assert!(ids.iter().all(|id| *id == first));

    // Exactly one channel row for the pair, with exactly two members.
    let members: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM channel_members WHERE channel_id = $1")
            .bind(first)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(members, 2);
}

#[tokio::test]
async fn a_pair_channel_is_not_confused_with_a_larger_channel() {
    let Some(pool) = common::test_pool().await else { return };
    let alice = common::seed_user(&pool, "alice").await;
    let bob = common::seed_user(&pool, "bob").await;
    let carol = common::seed_user(&pool, "carol").await;

    // A three-member channel containing both alice and bob must never
    // satisfy the pair lookup.
    let big = uuid::Uuid::new_v4();
    sqlx::query("INSERT INTO channels (id, pair_key) VALUES ($1, $2)")
        .bind(big)
        .bind(format!("group:{big}"))
        .execute(&pool)
        .await
        .unwrap();
    for member in [alice, bob, carol] {
        sqlx::query("INSERT INTO channel_members (channel_id, user_id) VALUES ($1, $2)")
            .bind(big)
            .bind(member)
            .execute(&pool)
            .await
            .unwrap();
    }

    assert_eq!(
        ChannelService::find_direct_channel(&pool, alice, bob)
            .await
            .unwrap(),
        None
    );

    let created = ChannelService::get_or_create_direct_channel(&pool, alice, bob)
        .await
        .unwrap();
    assert_ne!(created, big);
}

#[tokio::test]
async fn unknown_identities_read_as_not_found() {
    let Some(pool) = common::test_pool().await else { return };
    let alice = common::seed_user(&pool, "alice").await;
    let ghost = uuid::Uuid::new_v4();

    // Either side missing a user row fails before any channel is made.
    assert!(matches!(
        ChannelService::assert_identities_exist(&pool, alice, ghost).await,
        Err(AppError::NotFound)
    ));
    assert!(matches!(
        ChannelService::assert_identities_exist(&pool, ghost, alice).await,
        Err(AppError::NotFound)
    ));

    let bob = common::seed_user(&pool, "bob").await;
    ChannelService::assert_identities_exist(&pool, alice, bob)
        .await
        .unwrap();
}

#[tokio::test]
async fn self_conversation_is_rejected() {
    let Some(pool) = common::test_pool().await else { return };
    let alice = common::seed_user(&pool, "alice").await;

    let result = ChannelService::get_or_create_direct_channel(&pool, alice, alice).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
}
