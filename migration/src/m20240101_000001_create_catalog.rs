use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Films::Table)
                    .if_not_exists()
                    .col(pk_auto(Films::Id))
                    .col(string_uniq(Films::Uuid))
                    .col(string(Films::Title))
                    .col(string(Films::TitleOriginal))
                    .col(string(Films::ReleaseDate))
                    .col(text(Films::Description))
                    .col(string(Films::DistributedBy))
                    .col(integer(Films::Length))
                    .col(double(Films::Rating))
                    .col(string(Films::Budget))
                    .col(string(Films::Poster))
                    .col(string(Films::Trailer))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_films_release_date")
                    .table(Films::Table)
                    .col(Films::ReleaseDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_films_title_original")
                    .table(Films::Table)
                    .col(Films::TitleOriginal)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Actors::Table)
                    .if_not_exists()
                    .col(pk_auto(Actors::Id))
                    .col(string_uniq(Actors::Name))
                    .col(string_null(Actors::Birthday))
                    .col(boolean(Actors::IsActive).default(false))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Genres::Table)
                    .if_not_exists()
                    .col(pk_auto(Genres::Id))
                    .col(string_uniq(Genres::Name))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MoviesActors::Table)
                    .if_not_exists()
                    .col(integer(MoviesActors::ActorId))
                    .col(integer(MoviesActors::FilmId))
                    .primary_key(Index::create().col(MoviesActors::ActorId).col(MoviesActors::FilmId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movies_actors_actor")
                            .from(MoviesActors::Table, MoviesActors::ActorId)
                            .to(Actors::Table, Actors::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movies_actors_film")
                            .from(MoviesActors::Table, MoviesActors::FilmId)
                            .to(Films::Table, Films::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MoviesGenres::Table)
                    .if_not_exists()
                    .col(integer(MoviesGenres::FilmId))
                    .col(integer(MoviesGenres::GenreId))
                    .primary_key(Index::create().col(MoviesGenres::FilmId).col(MoviesGenres::GenreId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movies_genres_film")
                            .from(MoviesGenres::Table, MoviesGenres::FilmId)
                            .to(Films::Table, Films::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movies_genres_genre")
                            .from(MoviesGenres::Table, MoviesGenres::GenreId)
                            .to(Genres::Table, Genres::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(MoviesGenres::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(MoviesActors::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Genres::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Actors::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Films::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
pub(crate) enum Films {
    Table,
    Id,
    Uuid,
    Title,
    TitleOriginal,
    ReleaseDate,
    Description,
    DistributedBy,
    Length,
    Rating,
    Budget,
    Poster,
    Trailer,
}

#[derive(DeriveIden)]
enum Actors {
    Table,
    Id,
    Name,
    Birthday,
    IsActive,
}

#[derive(DeriveIden)]
enum Genres {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
enum MoviesActors {
    Table,
    ActorId,
    FilmId,
}

#[derive(DeriveIden)]
enum MoviesGenres {
    Table,
    FilmId,
    GenreId,
}
