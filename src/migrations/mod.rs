pub use sea_orm_migration::prelude::*;

mod m20260301_000001_create_users;
mod m20260301_000002_create_profiles;
mod m20260301_000003_create_places;
mod m20260301_000004_create_activities;
mod m20260301_000005_create_friendship_invites;
mod m20260301_000006_create_friendships;
mod m20260301_000007_create_events;
mod m20260301_000008_create_event_attendees;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_users::Migration),
            Box::new(m20260301_000002_create_profiles::Migration),
            Box::new(m20260301_000003_create_places::Migration),
            Box::new(m20260301_000004_create_activities::Migration),
            Box::new(m20260301_000005_create_friendship_invites::Migration),
            Box::new(m20260301_000006_create_friendships::Migration),
            Box::new(m20260301_000007_create_events::Migration),
            Box::new(m20260301_000008_create_event_attendees::Migration),
        ]
    }
}
