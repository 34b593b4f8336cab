use std::collections::{HashMap, HashSet};

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Set, TransactionTrait,
};
use tracing::{debug, info};

use crate::{
    entities::{actor, film, film_actor, film_genre, genre},
    index_sync::{self, SyncReport},
    models::{FilmRecord, NewFilm, ValidationError},
    search::SearchIndex,
};

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error(transparent)]
    Db(#[from] DbErr),
    #[error("invalid film record {title_original:?}: {source}")]
    Invalid {
        title_original: String,
        #[source]
        source: ValidationError,
    },
}

/// Name → row maps for actors and genres, scoped to one batch. A name is
/// inserted at most once per table no matter how many records mention it.
#[derive(Debug, Default)]
pub struct LookupTable {
    actors: HashMap<String, actor::Model>,
    genres: HashMap<String, genre::Model>,
    seeded: bool,
    created_actors: usize,
    created_genres: usize,
}

impl LookupTable {
    /// Seeds both maps with every existing row.
    pub async fn load<C: ConnectionTrait>(conn: &C) -> Result<Self, DbErr> {
        let actors = actor::Entity::find().all(conn).await?;
        let genres = genre::Entity::find().all(conn).await?;
        Ok(Self {
            actors: actors.into_iter().map(|a| (a.name.clone(), a)).collect(),
            genres: genres.into_iter().map(|g| (g.name.clone(), g)).collect(),
            seeded: true,
            ..Default::default()
        })
    }

    pub async fn actor<C: ConnectionTrait>(
        &mut self,
        conn: &C,
        name: &str,
    ) -> Result<actor::Model, DbErr> {
        if let Some(found) = self.actors.get(name) {
            return Ok(found.clone());
        }
        let existing = if self.seeded {
            None
        } else {
            actor::Entity::find().filter(actor::Column::Name.eq(name)).one(conn).await?
        };
        let model = match existing {
            Some(model) => model,
            None => {
                let model = actor::ActiveModel {
                    name: Set(name.to_string()),
                    is_active: Set(false),
                    ..Default::default()
                }
                .insert(conn)
                .await?;
                self.created_actors += 1;
                debug!(name = %name, id = model.id, "created actor");
                model
            },
        };
        self.actors.insert(name.to_string(), model.clone());
        Ok(model)
    }

    pub async fn genre<C: ConnectionTrait>(
        &mut self,
        conn: &C,
        name: &str,
    ) -> Result<genre::Model, DbErr> {
        if let Some(found) = self.genres.get(name) {
            return Ok(found.clone());
        }
        let existing = if self.seeded {
            None
        } else {
            genre::Entity::find().filter(genre::Column::Name.eq(name)).one(conn).await?
        };
        let model = match existing {
            Some(model) => model,
            None => {
                let model =
                    genre::ActiveModel { name: Set(name.to_string()), ..Default::default() }
                        .insert(conn)
                        .await?;
                self.created_genres += 1;
                debug!(name = %name, id = model.id, "created genre");
                model
            },
        };
        self.genres.insert(name.to_string(), model.clone());
        Ok(model)
    }

    pub async fn actors<C: ConnectionTrait>(
        &mut self,
        conn: &C,
        names: &[String],
    ) -> Result<Vec<actor::Model>, DbErr> {
        let mut out = Vec::with_capacity(names.len());
        for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
            out.push(self.actor(conn, name).await?);
        }
        Ok(out)
    }

    pub async fn genres<C: ConnectionTrait>(
        &mut self,
        conn: &C,
        names: &[String],
    ) -> Result<Vec<genre::Model>, DbErr> {
        let mut out = Vec::with_capacity(names.len());
        for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
            out.push(self.genre(conn, name).await?);
        }
        Ok(out)
    }

    /// Rows this table inserted, actors and genres together.
    pub fn created(&self) -> usize {
        self.created_actors + self.created_genres
    }
}

#[derive(Debug, Default)]
pub struct ImportOutcome {
    /// New films plus new actors plus new genres.
    pub created: usize,
    pub films: Vec<film::Model>,
}

/// Inserts every record whose original title is not in the catalog yet.
/// Runs on the caller's connection; pass a transaction so a failure leaves
/// nothing behind.
pub async fn bulk_create_films<C: ConnectionTrait>(
    conn: &C,
    records: Vec<FilmRecord>,
) -> Result<ImportOutcome, ImportError> {
    let mut lookup = LookupTable::load(conn).await?;
    let mut films = Vec::new();

    for record in records {
        let existing = film::Entity::find()
            .filter(film::Column::TitleOriginal.eq(record.title_original.as_str()))
            .one(conn)
            .await?;
        if existing.is_some() {
            debug!(title_original = %record.title_original, "film already in catalog, skipping");
            continue;
        }

        let new_film = NewFilm::from_record(&record).map_err(|source| ImportError::Invalid {
            title_original: record.title_original.clone(),
            source,
        })?;

        let actors = lookup.actors(conn, &record.actors).await?;
        let genres = lookup.genres(conn, &record.genres).await?;

        let film = new_film.into_active_model().insert(conn).await?;
        link_film(conn, film.id, &actors, &genres).await?;

        debug!(uuid = %film.uuid, title = %film.title, "created film");
        films.push(film);
    }

    Ok(ImportOutcome { created: films.len() + lookup.created(), films })
}

/// Adds junction rows; duplicate ids in either list are linked once.
pub async fn link_film<C: ConnectionTrait>(
    conn: &C,
    film_id: i32,
    actors: &[actor::Model],
    genres: &[genre::Model],
) -> Result<(), DbErr> {
    let actor_ids: Vec<i32> = unique_ids(actors.iter().map(|a| a.id));
    if !actor_ids.is_empty() {
        film_actor::Entity::insert_many(actor_ids.into_iter().map(|actor_id| {
            film_actor::ActiveModel { actor_id: Set(actor_id), film_id: Set(film_id) }
        }))
        .exec_without_returning(conn)
        .await?;
    }

    let genre_ids: Vec<i32> = unique_ids(genres.iter().map(|g| g.id));
    if !genre_ids.is_empty() {
        film_genre::Entity::insert_many(genre_ids.into_iter().map(|genre_id| {
            film_genre::ActiveModel { film_id: Set(film_id), genre_id: Set(genre_id) }
        }))
        .exec_without_returning(conn)
        .await?;
    }

    Ok(())
}

fn unique_ids(ids: impl Iterator<Item = i32>) -> Vec<i32> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id)).collect()
}

/// One batch end to end: write in a single transaction, commit, then mirror
/// the new films into the search index.
pub async fn import_films(
    db: &DatabaseConnection,
    index: &dyn SearchIndex,
    records: Vec<FilmRecord>,
) -> Result<(ImportOutcome, SyncReport), ImportError> {
    let total = records.len();
    let txn = db.begin().await?;
    let outcome = bulk_create_films(&txn, records).await?;
    txn.commit().await?;

    info!(records = total, films = outcome.films.len(), created = outcome.created, "import committed");

    let report = index_sync::sync_created(index, &outcome.films).await;
    Ok((outcome, report))
}
