use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, JoinType, ModelTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
    Set, TransactionTrait,
    sea_query::{Expr, Func},
};
use tracing::debug;

use crate::{
    entities::{actor, comment, film, film_actor, film_genre, genre, user},
    error::{AppError, AppResult},
    importer::{LookupTable, link_film},
    models::{
        ActorPayload, ActorView, CommentPayload, CommentView, FilmDetail, FilmListQuery,
        FilmPayload, FilmSummary, FilmView, NamedRef, NewFilm, PageQuery, UserPayload, ValidationError,
    },
};

pub const MAX_PAGE_SIZE: u64 = 60;
pub const DEFAULT_PAGE_SIZE: u64 = 20;

fn page_window(page: Option<u64>, offset: Option<u64>) -> AppResult<(u64, u64)> {
    let offset = offset.unwrap_or(DEFAULT_PAGE_SIZE);
    if offset > MAX_PAGE_SIZE {
        return Err(AppError::bad_request(format!(
            "Offset must not be greater than {MAX_PAGE_SIZE}"
        )));
    }
    let skip = page
        .unwrap_or(0)
        .checked_mul(offset)
        .filter(|skip| i64::try_from(*skip).is_ok())
        .ok_or_else(|| AppError::bad_request("Page is out of range"))?;
    Ok((skip, offset))
}

fn names(refs: &Option<Vec<NamedRef>>) -> Option<Vec<String>> {
    refs.as_ref().map(|list| list.iter().map(|r| r.name.clone()).collect())
}

pub async fn list_films(db: &DatabaseConnection, q: &FilmListQuery) -> AppResult<Vec<FilmSummary>> {
    let (skip, take) = page_window(q.page, q.offset)?;

    let mut query = film::Entity::find()
        .select_only()
        .columns([
            film::Column::Title,
            film::Column::Uuid,
            film::Column::TitleOriginal,
            film::Column::Poster,
            film::Column::Rating,
            film::Column::Description,
            film::Column::ReleaseDate,
        ])
        .join(JoinType::InnerJoin, film::Relation::FilmGenre.def())
        .group_by(film::Column::Id);

    if let Some(name) = q.genre.as_deref().map(str::trim).filter(|g| !g.is_empty()) {
        query = query
            .join(JoinType::InnerJoin, film_genre::Relation::Genre.def())
            .filter(
                Expr::expr(Func::lower(Expr::col((genre::Entity, genre::Column::Name))))
                    .eq(name.to_lowercase()),
            );
    }
    if let Some(year) = q.year_from {
        query = query.filter(film::Column::ReleaseDate.gte(format!("{year:04}-01-01")));
    }
    if let Some(year) = q.year_to {
        query = query.filter(film::Column::ReleaseDate.lte(format!("{year:04}-12-31")));
    }
    if let Some(rating) = q.rating_from {
        query = query.filter(film::Column::Rating.gte(rating));
    }

    let films = query
        .order_by_asc(film::Column::Id)
        .offset(skip)
        .limit(take)
        .into_model::<FilmSummary>()
        .all(db)
        .await?;
    Ok(films)
}

pub async fn film_by_uuid<C: ConnectionTrait>(conn: &C, uuid: &str) -> AppResult<Option<film::Model>> {
    Ok(film::Entity::find().filter(film::Column::Uuid.eq(uuid)).one(conn).await?)
}

async fn film_view<C: ConnectionTrait>(conn: &C, film: film::Model) -> AppResult<FilmView> {
    let actors = film.find_related(actor::Entity).order_by_asc(actor::Column::Id).all(conn).await?;
    let genres = film.find_related(genre::Entity).order_by_asc(genre::Column::Id).all(conn).await?;
    Ok(FilmView {
        film,
        actors: actors.into_iter().map(|a| NamedRef { name: a.name }).collect(),
        genres: genres.into_iter().map(|g| NamedRef { name: g.name }).collect(),
    })
}

pub async fn film_detail(db: &DatabaseConnection, uuid: &str) -> AppResult<FilmDetail> {
    let film = film_by_uuid(db, uuid).await?.ok_or_else(|| AppError::not_found("Film not found"))?;

    let comments = comment::Entity::find()
        .filter(comment::Column::FilmId.eq(film.id))
        .order_by_asc(comment::Column::Id)
        .find_also_related(user::Entity)
        .all(db)
        .await?
        .into_iter()
        .map(|(c, u)| CommentView {
            username: u.map(|u| u.username).unwrap_or_default(),
            created_at: c.created_at,
            text: c.text,
        })
        .collect();

    Ok(FilmDetail { film: film_view(db, film).await?, comments })
}

async fn attach_people<C: ConnectionTrait>(
    conn: &C,
    film_id: i32,
    payload: &FilmPayload,
    replace: bool,
) -> AppResult<()> {
    let actor_names = names(&payload.actors);
    let genre_names = names(&payload.genres);
    if actor_names.is_none() && genre_names.is_none() {
        return Ok(());
    }

    let mut lookup = LookupTable::default();
    let actors = match &actor_names {
        Some(list) => {
            if replace {
                film_actor::Entity::delete_many()
                    .filter(film_actor::Column::FilmId.eq(film_id))
                    .exec(conn)
                    .await?;
            }
            lookup.actors(conn, list).await?
        },
        None => Vec::new(),
    };
    let genres = match &genre_names {
        Some(list) => {
            if replace {
                film_genre::Entity::delete_many()
                    .filter(film_genre::Column::FilmId.eq(film_id))
                    .exec(conn)
                    .await?;
            }
            lookup.genres(conn, list).await?
        },
        None => Vec::new(),
    };
    link_film(conn, film_id, &actors, &genres).await?;
    Ok(())
}

/// Inserts a film from an API payload; actors and genres are matched by name.
pub async fn create_film(db: &DatabaseConnection, payload: &FilmPayload) -> AppResult<FilmView> {
    let new_film = NewFilm::from_payload(payload)?;

    let txn = db.begin().await?;
    let film = new_film.into_active_model().insert(&txn).await?;
    attach_people(&txn, film.id, payload, false).await?;
    let view = film_view(&txn, film).await?;
    txn.commit().await?;

    debug!(uuid = %view.film.uuid, "created film");
    Ok(view)
}

/// PUT semantics: overwrite the film with this uuid, or create a new one
/// (with a fresh uuid) when there is none. The bool is true on create.
pub async fn replace_film(
    db: &DatabaseConnection,
    uuid: &str,
    payload: &FilmPayload,
) -> AppResult<(FilmView, bool)> {
    let txn = db.begin().await?;
    let (view, created) = match film_by_uuid(&txn, uuid).await? {
        Some(existing) => (update_film(&txn, existing, payload).await?, false),
        None => {
            let film = NewFilm::from_payload(payload)?.into_active_model().insert(&txn).await?;
            attach_people(&txn, film.id, payload, false).await?;
            (film_view(&txn, film).await?, true)
        },
    };
    txn.commit().await?;

    Ok((view, created))
}

/// Merges the patch into the stored film. A film that is gone by the time
/// the transaction reads it is a 404, never a fresh insert.
pub async fn patch_film(
    db: &DatabaseConnection,
    uuid: &str,
    patch: crate::models::FilmPatch,
) -> AppResult<FilmView> {
    let txn = db.begin().await?;
    let existing =
        film_by_uuid(&txn, uuid).await?.ok_or_else(|| AppError::not_found("Film not found"))?;
    let payload = patch.apply(FilmPayload::from(&existing));
    let view = update_film(&txn, existing, &payload).await?;
    txn.commit().await?;
    Ok(view)
}

async fn update_film<C: ConnectionTrait>(
    conn: &C,
    existing: film::Model,
    payload: &FilmPayload,
) -> AppResult<FilmView> {
    let new_film = NewFilm::from_payload(payload)?;
    let mut model = existing.into_active_model();
    new_film.apply_to(&mut model);
    let film = model.update(conn).await?;
    attach_people(conn, film.id, payload, true).await?;
    film_view(conn, film).await
}

/// Removes the film with its junction rows and comments. Returns the uuid
/// so the caller can drop it from the search index after commit.
pub async fn delete_film(db: &DatabaseConnection, uuid: &str) -> AppResult<String> {
    let txn = db.begin().await?;
    let film = film_by_uuid(&txn, uuid).await?.ok_or_else(|| AppError::not_found("Film not found"))?;

    film_actor::Entity::delete_many().filter(film_actor::Column::FilmId.eq(film.id)).exec(&txn).await?;
    film_genre::Entity::delete_many().filter(film_genre::Column::FilmId.eq(film.id)).exec(&txn).await?;
    comment::Entity::delete_many().filter(comment::Column::FilmId.eq(film.id)).exec(&txn).await?;
    let uuid = film.uuid.clone();
    film.delete(&txn).await?;
    txn.commit().await?;

    debug!(uuid = %uuid, "deleted film");
    Ok(uuid)
}

pub async fn list_actors(db: &DatabaseConnection, q: &PageQuery) -> AppResult<Vec<actor::Model>> {
    let (skip, take) = page_window(q.page, q.offset)?;
    let actors = actor::Entity::find()
        .join(JoinType::InnerJoin, actor::Relation::FilmActor.def())
        .group_by(actor::Column::Id)
        .order_by_asc(actor::Column::Id)
        .offset(skip)
        .limit(take)
        .all(db)
        .await?;
    Ok(actors)
}

pub async fn actor_detail(db: &DatabaseConnection, id: i32) -> AppResult<ActorView> {
    let actor = actor::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("Actor not found"))?;
    let films = actor.find_related(film::Entity).order_by_asc(film::Column::Id).all(db).await?;
    Ok(ActorView { actor, films: films.into_iter().map(Into::into).collect() })
}

async fn ensure_actor_name_free<C: ConnectionTrait>(
    conn: &C,
    name: &str,
    except: Option<i32>,
) -> AppResult<()> {
    let clash = actor::Entity::find().filter(actor::Column::Name.eq(name)).one(conn).await?;
    match clash {
        Some(other) if Some(other.id) != except => {
            Err(AppError::Conflict(format!("Actor {name:?} already exists")))
        },
        _ => Ok(()),
    }
}

pub async fn create_actor(db: &DatabaseConnection, payload: &ActorPayload) -> AppResult<actor::Model> {
    insert_actor(db, payload).await
}

async fn insert_actor<C: ConnectionTrait>(conn: &C, payload: &ActorPayload) -> AppResult<actor::Model> {
    let (name, birthday) = payload.validate()?;
    ensure_actor_name_free(conn, &name, None).await?;
    let actor = actor::ActiveModel {
        name: Set(name),
        birthday: Set(birthday),
        is_active: Set(payload.is_active),
        ..Default::default()
    }
    .insert(conn)
    .await?;
    Ok(actor)
}

async fn update_actor<C: ConnectionTrait>(
    conn: &C,
    existing: actor::Model,
    payload: &ActorPayload,
) -> AppResult<actor::Model> {
    let (name, birthday) = payload.validate()?;
    ensure_actor_name_free(conn, &name, Some(existing.id)).await?;

    let mut model = existing.into_active_model();
    model.name = Set(name);
    model.birthday = Set(birthday);
    model.is_active = Set(payload.is_active);
    Ok(model.update(conn).await?)
}

/// PUT semantics, like [`replace_film`]. The bool is true on create.
pub async fn replace_actor(
    db: &DatabaseConnection,
    id: i32,
    payload: &ActorPayload,
) -> AppResult<(actor::Model, bool)> {
    let txn = db.begin().await?;
    let result = match actor::Entity::find_by_id(id).one(&txn).await? {
        Some(existing) => (update_actor(&txn, existing, payload).await?, false),
        None => (insert_actor(&txn, payload).await?, true),
    };
    txn.commit().await?;
    Ok(result)
}

pub async fn patch_actor(
    db: &DatabaseConnection,
    id: i32,
    patch: crate::models::ActorPatch,
) -> AppResult<actor::Model> {
    let txn = db.begin().await?;
    let existing = actor::Entity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Actor not found"))?;
    let payload = patch.apply(&existing);
    let actor = update_actor(&txn, existing, &payload).await?;
    txn.commit().await?;
    Ok(actor)
}

pub async fn delete_actor(db: &DatabaseConnection, id: i32) -> AppResult<()> {
    let txn = db.begin().await?;
    let actor = actor::Entity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Actor not found"))?;
    film_actor::Entity::delete_many().filter(film_actor::Column::ActorId.eq(actor.id)).exec(&txn).await?;
    actor.delete(&txn).await?;
    txn.commit().await?;
    Ok(())
}

/// Genres that at least one film uses.
pub async fn list_genres(db: &DatabaseConnection) -> AppResult<Vec<genre::Model>> {
    let genres = genre::Entity::find()
        .join(JoinType::InnerJoin, genre::Relation::FilmGenre.def())
        .group_by(genre::Column::Id)
        .order_by_asc(genre::Column::Id)
        .all(db)
        .await?;
    Ok(genres)
}

pub async fn add_comment(
    db: &DatabaseConnection,
    film_uuid: &str,
    payload: &CommentPayload,
) -> AppResult<comment::Model> {
    let film = film_by_uuid(db, film_uuid).await?.ok_or_else(|| AppError::not_found("Film not found"))?;
    let user = user::Entity::find_by_id(payload.user_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    if payload.text.trim().is_empty() {
        return Err(ValidationError::Empty("text").into());
    }

    let comment = comment::ActiveModel {
        text: Set(payload.text.clone()),
        created_at: Set(jiff::Timestamp::now().to_string()),
        user_id: Set(user.id),
        film_id: Set(film.id),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(comment)
}

pub async fn list_users(db: &DatabaseConnection) -> AppResult<Vec<user::Model>> {
    Ok(user::Entity::find().order_by_asc(user::Column::Id).all(db).await?)
}

pub async fn user_by_id(db: &DatabaseConnection, id: i32) -> AppResult<user::Model> {
    user::Entity::find_by_id(id).one(db).await?.ok_or_else(|| AppError::not_found("User not found"))
}

pub async fn create_user(db: &DatabaseConnection, payload: &UserPayload) -> AppResult<user::Model> {
    let username = payload.username.trim();
    if username.is_empty() {
        return Err(ValidationError::Empty("username").into());
    }
    let taken = user::Entity::find().filter(user::Column::Username.eq(username)).one(db).await?;
    if taken.is_some() {
        return Err(AppError::Conflict(format!("User {username:?} already exists")));
    }
    let user = user::ActiveModel {
        username: Set(username.to_string()),
        email: Set(payload.email.trim().to_string()),
        created_at: Set(jiff::Timestamp::now().to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(user)
}

/// Empties every catalog table in one transaction.
pub async fn clear_catalog(db: &DatabaseConnection) -> AppResult<()> {
    let txn = db.begin().await?;
    film_actor::Entity::delete_many().exec(&txn).await?;
    film_genre::Entity::delete_many().exec(&txn).await?;
    comment::Entity::delete_many().exec(&txn).await?;
    actor::Entity::delete_many().exec(&txn).await?;
    genre::Entity::delete_many().exec(&txn).await?;
    film::Entity::delete_many().exec(&txn).await?;
    txn.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use sea_orm::PaginatorTrait;

    use super::*;
    use crate::{db, importer, models::{FilmRecord, ReleaseDate}};

    fn payload(title: &str) -> FilmPayload {
        FilmPayload {
            title: title.to_string(),
            title_original: title.to_string(),
            release_date: "2023-09-26".to_string(),
            distributed_by: "Distributor".to_string(),
            description: "Film description".to_string(),
            length: 120,
            rating: 7.5,
            budget: "Budget".to_string(),
            poster: "poster_url".to_string(),
            trailer: "trailer_url".to_string(),
            actors: Some(vec![NamedRef { name: "Actor 1".to_string() }]),
            genres: Some(vec![
                NamedRef { name: "Genre 1".to_string() },
                NamedRef { name: "Genre 2".to_string() },
            ]),
        }
    }

    async fn seed(db: &DatabaseConnection) {
        let txn = db.begin().await.unwrap();
        let records = [
            ("Seven Samurai", 1954, 8.6, "Action"),
            ("Yojimbo", 1961, 8.2, "Action"),
            ("Tokyo Story", 1953, 8.1, "Drama"),
        ]
        .into_iter()
        .map(|(title, year, rating, genre)| FilmRecord {
            title: title.to_string(),
            title_original: title.to_string(),
            release_date: ReleaseDate { year, month: 4, day: 26 },
            rating,
            distributed_by: "Toho".to_string(),
            genres: vec![genre.to_string()],
            ..Default::default()
        })
        .collect();
        importer::bulk_create_films(&txn, records).await.unwrap();
        txn.commit().await.unwrap();
    }

    fn list_query() -> FilmListQuery {
        FilmListQuery {
            page: None,
            offset: None,
            genre: None,
            year_from: None,
            year_to: None,
            rating_from: None,
        }
    }

    #[tokio::test]
    async fn list_filters_by_genre_case_insensitively() {
        let db = db::memory().await;
        seed(&db).await;

        let q = FilmListQuery { genre: Some("action".to_string()), ..list_query() };
        let films = list_films(&db, &q).await.unwrap();
        let titles: Vec<_> = films.iter().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, vec!["Seven Samurai", "Yojimbo"]);

        let q = FilmListQuery { genre: Some("Crime".to_string()), ..list_query() };
        assert!(list_films(&db, &q).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_filters_by_year_and_rating() {
        let db = db::memory().await;
        seed(&db).await;

        let q = FilmListQuery { year_from: Some(1954), year_to: Some(1960), ..list_query() };
        let films = list_films(&db, &q).await.unwrap();
        assert_eq!(films.len(), 1);
        assert_eq!(films[0].title, "Seven Samurai");

        let q = FilmListQuery { rating_from: Some(8.15), ..list_query() };
        assert_eq!(list_films(&db, &q).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn list_pages_through_results() {
        let db = db::memory().await;
        seed(&db).await;

        let q = FilmListQuery { page: Some(1), offset: Some(2), ..list_query() };
        let films = list_films(&db, &q).await.unwrap();
        assert_eq!(films.len(), 1);
        assert_eq!(films[0].title, "Tokyo Story");
    }

    #[tokio::test]
    async fn huge_page_number_is_rejected() {
        let db = db::memory().await;
        let q = FilmListQuery { page: Some(u64::MAX / 2), offset: Some(20), ..list_query() };
        assert!(matches!(list_films(&db, &q).await, Err(AppError::BadRequest(_))));

        let q = PageQuery { page: Some(u64::MAX / 20), offset: Some(20) };
        assert!(matches!(list_actors(&db, &q).await, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn oversized_page_is_rejected() {
        let db = db::memory().await;
        let q = FilmListQuery { offset: Some(61), ..list_query() };
        assert!(matches!(list_films(&db, &q).await, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn create_film_links_people_by_name() {
        let db = db::memory().await;
        let view = create_film(&db, &payload("Test Film 1")).await.unwrap();
        assert_eq!(view.actors.len(), 1);
        assert_eq!(view.genres.len(), 2);

        create_film(&db, &payload("Test Film 2")).await.unwrap();
        assert_eq!(genre::Entity::find().count(&db).await.unwrap(), 2);
        assert_eq!(list_genres(&db).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn replace_updates_existing_and_keeps_uuid() {
        let db = db::memory().await;
        let created = create_film(&db, &payload("Before")).await.unwrap();
        let uuid = created.film.uuid.clone();

        let mut update = payload("After");
        update.genres = Some(vec![NamedRef { name: "Genre 3".to_string() }]);
        let (view, was_created) = replace_film(&db, &uuid, &update).await.unwrap();

        assert!(!was_created);
        assert_eq!(view.film.uuid, uuid);
        assert_eq!(view.film.title, "After");
        assert_eq!(view.genres, vec![NamedRef { name: "Genre 3".to_string() }]);
    }

    #[tokio::test]
    async fn replace_unknown_uuid_creates() {
        let db = db::memory().await;
        let (view, was_created) = replace_film(&db, "nonexistent", &payload("New")).await.unwrap();
        assert!(was_created);
        assert_ne!(view.film.uuid, "nonexistent");
    }

    #[tokio::test]
    async fn patch_of_missing_film_is_not_found() {
        let db = db::memory().await;
        let patch = crate::models::FilmPatch { rating: Some(5.0), ..Default::default() };
        let result = patch_film(&db, "nonexistent", patch).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(film::Entity::find().count(&db).await.unwrap(), 0);

        let result = patch_actor(&db, 42, crate::models::ActorPatch::default()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(actor::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn patch_changes_only_given_fields() {
        let db = db::memory().await;
        let created = create_film(&db, &payload("Patched")).await.unwrap();
        let patch = crate::models::FilmPatch {
            description: Some("updated".to_string()),
            rating: Some(9.9),
            ..Default::default()
        };
        let view = patch_film(&db, &created.film.uuid, patch).await.unwrap();
        assert_eq!(view.film.description, "updated");
        assert_eq!(view.film.rating, 9.9);
        assert_eq!(view.film.title, "Patched");
        assert_eq!(view.actors.len(), 1);
    }

    #[tokio::test]
    async fn delete_removes_links_and_comments() {
        let db = db::memory().await;
        let created = create_film(&db, &payload("Doomed")).await.unwrap();
        let user = create_user(
            &db,
            &UserPayload { username: "admin".to_string(), email: "admin@example.com".to_string() },
        )
        .await
        .unwrap();
        add_comment(&db, &created.film.uuid, &CommentPayload { text: "meh".to_string(), user_id: user.id })
            .await
            .unwrap();

        let uuid = delete_film(&db, &created.film.uuid).await.unwrap();
        assert_eq!(uuid, created.film.uuid);
        assert_eq!(film::Entity::find().count(&db).await.unwrap(), 0);
        assert_eq!(film_actor::Entity::find().count(&db).await.unwrap(), 0);
        assert_eq!(film_genre::Entity::find().count(&db).await.unwrap(), 0);
        assert_eq!(comment::Entity::find().count(&db).await.unwrap(), 0);
        assert_eq!(actor::Entity::find().count(&db).await.unwrap(), 1);

        assert!(matches!(delete_film(&db, &uuid).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn detail_includes_comments_with_username() {
        let db = db::memory().await;
        let created = create_film(&db, &payload("Talked About")).await.unwrap();
        let user = create_user(
            &db,
            &UserPayload { username: "critic".to_string(), email: "c@example.com".to_string() },
        )
        .await
        .unwrap();
        add_comment(
            &db,
            &created.film.uuid,
            &CommentPayload { text: "Test comment text".to_string(), user_id: user.id },
        )
        .await
        .unwrap();

        let detail = film_detail(&db, &created.film.uuid).await.unwrap();
        assert_eq!(detail.comments.len(), 1);
        assert_eq!(detail.comments[0].username, "critic");
        assert_eq!(detail.comments[0].text, "Test comment text");
    }

    #[tokio::test]
    async fn comment_on_unknown_film_is_not_found() {
        let db = db::memory().await;
        let payload = CommentPayload { text: "hi".to_string(), user_id: 1 };
        assert!(matches!(add_comment(&db, "invalid_uuid", &payload).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn actor_crud_round() {
        let db = db::memory().await;
        let actor = create_actor(
            &db,
            &ActorPayload { name: "Toshiro Mifune".to_string(), birthday: None, is_active: false },
        )
        .await
        .unwrap();

        let dup = create_actor(
            &db,
            &ActorPayload { name: "Toshiro Mifune".to_string(), birthday: None, is_active: true },
        )
        .await;
        assert!(matches!(dup, Err(AppError::Conflict(_))));

        let patched = patch_actor(
            &db,
            actor.id,
            crate::models::ActorPatch { is_active: Some(true), ..Default::default() },
        )
        .await
        .unwrap();
        assert!(patched.is_active);
        assert_eq!(patched.name, "Toshiro Mifune");

        delete_actor(&db, actor.id).await.unwrap();
        assert!(matches!(actor_detail(&db, actor.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn actor_list_only_shows_cast_members() {
        let db = db::memory().await;
        create_film(&db, &payload("Cast")).await.unwrap();
        create_actor(&db, &ActorPayload { name: "Extra".to_string(), birthday: None, is_active: false })
            .await
            .unwrap();

        let actors = list_actors(&db, &PageQuery { page: None, offset: None }).await.unwrap();
        assert_eq!(actors.len(), 1);
        assert_eq!(actors[0].name, "Actor 1");

        let detail = actor_detail(&db, actors[0].id).await.unwrap();
        assert_eq!(detail.films.len(), 1);
        assert_eq!(detail.films[0].title, "Cast");
    }

    #[tokio::test]
    async fn clear_empties_catalog() {
        let db = db::memory().await;
        seed(&db).await;
        clear_catalog(&db).await.unwrap();
        assert_eq!(film::Entity::find().count(&db).await.unwrap(), 0);
        assert_eq!(genre::Entity::find().count(&db).await.unwrap(), 0);
    }
}
