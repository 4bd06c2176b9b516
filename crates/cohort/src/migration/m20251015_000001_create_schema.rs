//! Initial migration: actors, their interaction edges, and crawl checkpoints.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.create_actors(manager).await?;
        self.create_actor_interactions(manager).await?;
        self.create_crawl_checkpoints(manager).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CrawlCheckpoints::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ActorInteractions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Actors::Table).to_owned())
            .await?;
        Ok(())
    }
}

impl Migration {
    async fn create_actors(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Actors::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Actors::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Actors::Login).string().not_null())
                    // Primary profile
                    .col(ColumnDef::new(Actors::ProfileUrl).string().null())
                    .col(ColumnDef::new(Actors::Name).string().null())
                    .col(ColumnDef::new(Actors::Bio).text().null())
                    .col(ColumnDef::new(Actors::Company).string().null())
                    .col(ColumnDef::new(Actors::Blog).string().null())
                    .col(ColumnDef::new(Actors::Location).string().null())
                    .col(ColumnDef::new(Actors::Email).string().null())
                    .col(ColumnDef::new(Actors::TwitterUsername).string().null())
                    .col(ColumnDef::new(Actors::Followers).big_integer().null())
                    .col(ColumnDef::new(Actors::Following).big_integer().null())
                    .col(ColumnDef::new(Actors::PublicRepos).big_integer().null())
                    .col(
                        ColumnDef::new(Actors::AccountCreatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    // Secondary social profile
                    .col(ColumnDef::new(Actors::SocialUrl).string().null())
                    .col(ColumnDef::new(Actors::SocialBio).text().null())
                    .col(ColumnDef::new(Actors::SocialName).string().null())
                    .col(ColumnDef::new(Actors::SocialLocation).string().null())
                    // Bookkeeping
                    .col(
                        ColumnDef::new(Actors::FirstSeenAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Actors::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_actors_login")
                    .table(Actors::Table)
                    .col(Actors::Login)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_actor_interactions(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ActorInteractions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ActorInteractions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ActorInteractions::ActorLogin)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ActorInteractions::InteractionType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ActorInteractions::RepositoryOwner)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ActorInteractions::RepositoryName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ActorInteractions::Weight)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ActorInteractions::FirstSeenAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_actor_interactions_actor_login")
                            .from(ActorInteractions::Table, ActorInteractions::ActorLogin)
                            .to(Actors::Table, Actors::Login)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One edge per (actor, kind, repository)
        manager
            .create_index(
                Index::create()
                    .name("idx_actor_interactions_edge")
                    .table(ActorInteractions::Table)
                    .col(ActorInteractions::ActorLogin)
                    .col(ActorInteractions::InteractionType)
                    .col(ActorInteractions::RepositoryOwner)
                    .col(ActorInteractions::RepositoryName)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Reconciliation counts by repository and kind
        manager
            .create_index(
                Index::create()
                    .name("idx_actor_interactions_repo_kind")
                    .table(ActorInteractions::Table)
                    .col(ActorInteractions::RepositoryOwner)
                    .col(ActorInteractions::RepositoryName)
                    .col(ActorInteractions::InteractionType)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_crawl_checkpoints(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CrawlCheckpoints::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CrawlCheckpoints::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CrawlCheckpoints::RepositoryOwner)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CrawlCheckpoints::RepositoryName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CrawlCheckpoints::InteractionType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CrawlCheckpoints::LastCompletedCursor)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(CrawlCheckpoints::LastCompletedPage)
                            .integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(CrawlCheckpoints::PagesCompleted)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CrawlCheckpoints::LastScrapedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_crawl_checkpoints_key")
                    .table(CrawlCheckpoints::Table)
                    .col(CrawlCheckpoints::RepositoryOwner)
                    .col(CrawlCheckpoints::RepositoryName)
                    .col(CrawlCheckpoints::InteractionType)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
#[sea_orm(iden = "actors")]
enum Actors {
    Table,
    Id,
    Login,
    ProfileUrl,
    Name,
    Bio,
    Company,
    Blog,
    Location,
    Email,
    TwitterUsername,
    Followers,
    Following,
    PublicRepos,
    AccountCreatedAt,
    SocialUrl,
    SocialBio,
    SocialName,
    SocialLocation,
    FirstSeenAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "actor_interactions")]
enum ActorInteractions {
    Table,
    Id,
    ActorLogin,
    InteractionType,
    RepositoryOwner,
    RepositoryName,
    Weight,
    FirstSeenAt,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "crawl_checkpoints")]
enum CrawlCheckpoints {
    Table,
    Id,
    RepositoryOwner,
    RepositoryName,
    InteractionType,
    LastCompletedCursor,
    LastCompletedPage,
    PagesCompleted,
    LastScrapedAt,
}
