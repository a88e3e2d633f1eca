//! Migration tests: the migrator must build a usable schema from scratch
//! and be idempotent when run again.

use sea_orm::{Database, EntityTrait};
use sea_orm_migration::MigratorTrait;

mod common;

use gelaender::migrations::Migrator;
use gelaender::models::prelude::*;

#[tokio::test]
async fn test_migrations_run_from_scratch() {
    let db = Database::connect("sqlite::memory:").await.unwrap();

    Migrator::up(&db, None)
        .await
        .expect("Migrations must run on an empty database");

    // All tables must be queryable
    assert!(User::find().all(&db).await.is_ok());
    assert!(Profile::find().all(&db).await.is_ok());
    assert!(Place::find().all(&db).await.is_ok());
    assert!(Activity::find().all(&db).await.is_ok());
    assert!(FriendshipInvite::find().all(&db).await.is_ok());
    assert!(Friendship::find().all(&db).await.is_ok());
    assert!(Event::find().all(&db).await.is_ok());
    assert!(EventAttendee::find().all(&db).await.is_ok());
}

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let db = Database::connect("sqlite::memory:").await.unwrap();

    Migrator::up(&db, None).await.unwrap();
    Migrator::up(&db, None)
        .await
        .expect("Re-running the migrator must be a no-op");
}

#[tokio::test]
async fn test_schema_accepts_full_object_graph() {
    let db = common::create_test_db().await;

    let user = common::create_test_user(&db, "seed", "seed@example.com", "password123").await;
    common::create_test_profile(&db, user.id, "Seed User").await;
    let place = common::create_test_place(&db, "Campus", user.id).await;

    // An activity referencing both foreign keys inserts cleanly
    {
        use gelaender::models::activity;
        use sea_orm::{ActiveModelTrait, Set};

        let row = activity::ActiveModel {
            user_id: Set(user.id),
            place_id: Set(place.id),
            photo_url: Set(None),
            recorded_at: Set(chrono::Utc::now()),
            ..Default::default()
        };
        row.insert(&db).await.expect("Activity insert must succeed");
    }
}
