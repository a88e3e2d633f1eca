//! Migration: Create friendship_invites table

use sea_orm_migration::prelude::*;

use super::m20260301_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FriendshipInvites::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FriendshipInvites::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(FriendshipInvites::SenderId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FriendshipInvites::RecipientId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FriendshipInvites::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(FriendshipInvites::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FriendshipInvites::RespondedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(FriendshipInvites::Table, FriendshipInvites::SenderId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(FriendshipInvites::Table, FriendshipInvites::RecipientId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_friendship_invites_recipient_status")
                    .table(FriendshipInvites::Table)
                    .col(FriendshipInvites::RecipientId)
                    .col(FriendshipInvites::Status)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_friendship_invites_sender_status")
                    .table(FriendshipInvites::Table)
                    .col(FriendshipInvites::SenderId)
                    .col(FriendshipInvites::Status)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(FriendshipInvites::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}

#[derive(Iden)]
#[iden = "friendship_invites"]
pub enum FriendshipInvites {
    Table,
    Id,
    #[iden = "sender_id"]
    SenderId,
    #[iden = "recipient_id"]
    RecipientId,
    Status,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "responded_at"]
    RespondedAt,
}
